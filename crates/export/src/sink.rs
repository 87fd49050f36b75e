//! File sink: write through a handle or trigger a browser download

use std::rc::Rc;
use std::time::Duration;

use chart_export_shared::{Blob, ExportError, ExportResult};

use crate::acquire::HandleRef;
use crate::host::{DownloadHost, FileHandle, Sleeper};

#[derive(Clone)]
pub struct FileSink {
    downloads: Rc<dyn DownloadHost>,
    sleeper: Rc<dyn Sleeper>,
    /// How long the object URL outlives the anchor click
    revoke_delay: Duration,
}

impl FileSink {
    pub fn new(
        downloads: Rc<dyn DownloadHost>,
        sleeper: Rc<dyn Sleeper>,
        revoke_delay: Duration,
    ) -> Self {
        Self {
            downloads,
            sleeper,
            revoke_delay,
        }
    }

    /// Write `blob` to exactly one destination: the handle, or a download
    pub async fn write(&self, blob: Blob, filename: &str, handle: HandleRef) -> ExportResult<()> {
        match handle {
            HandleRef::Handle(handle) => write_handle(handle.as_ref(), &blob).await,
            HandleRef::Inaccessible => {
                log::warn!(
                    "{}, downloading {filename} instead",
                    ExportError::HandleInaccessible
                );
                self.download(&blob, filename).await
            }
            HandleRef::Absent => self.download(&blob, filename).await,
        }
    }

    async fn download(&self, blob: &Blob, filename: &str) -> ExportResult<()> {
        let url = self.downloads.create_object_url(blob)?;
        let result = self
            .downloads
            .append_hidden_anchor(&url, filename)
            .map(|anchor| {
                anchor.click();
                anchor.remove();
            });

        // The URL has to stay valid until the browser has started the download.
        if result.is_ok() {
            self.sleeper.sleep(self.revoke_delay).await;
        }
        self.downloads.revoke_object_url(&url);

        if result.is_ok() {
            log::info!("Triggered download of {filename} ({} bytes)", blob.len());
        }
        result
    }
}

/// Open, write, close. The stream is closed even when the write fails.
async fn write_handle(handle: &dyn FileHandle, blob: &Blob) -> ExportResult<()> {
    let stream = handle.create_writable().await.map_err(into_write_failure)?;
    let written = stream.write(blob).await;
    let closed = stream.close().await;

    written.map_err(into_write_failure)?;
    closed.map_err(into_write_failure)?;
    log::info!("Wrote {} bytes to {}", blob.len(), handle.name());
    Ok(())
}

fn into_write_failure(err: ExportError) -> ExportError {
    match err {
        ExportError::WriteFailed { .. } => err,
        other => ExportError::WriteFailed {
            message: other.to_string(),
        },
    }
}
