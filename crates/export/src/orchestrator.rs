//! Export orchestration: CSV download, image download and vector save
//!
//! Every entry point runs its steps strictly in order on the event loop:
//! acquire a handle, show the overlay, capture or serialize, write, hide the
//! overlay. One export may be in flight per `Exporter`; a second request fails
//! with `ExportError::Busy` before touching the chart.

use std::cell::{Cell, RefCell};
use std::rc::Rc;

use chart_export_shared::{
    Blob, ChartGlobals, ExportError, ExportResult, ImageDownloadOptions, Layout,
};
use futures::future::LocalBoxFuture;
use futures::FutureExt;

use crate::acquire::{acquire, HandleRef};
use crate::config::ExportConfig;
use crate::csv;
use crate::debounce::Debounced;
use crate::host::{DomCapture, ExportHost, UiCallbacks};
use crate::overlay::{saving_message, LoadingOverlay};
use crate::sink::FileSink;
use crate::table::Table;
use crate::watermark::{WatermarkState, WatermarkToggler};

/// Format requested from the charting library for vector exports
const VECTOR_FORMAT: &str = "svg";

/// Export phases
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum ExportPhase {
    #[default]
    Idle,
    AcquiringHandle,
    ShowingOverlay,
    Capturing,
    Writing,
    HidingOverlay,
    Failed,
}

impl ExportPhase {
    pub fn is_in_flight(&self) -> bool {
        !matches!(self, ExportPhase::Idle | ExportPhase::Failed)
    }
}

#[derive(Debug, Default)]
struct PhaseTracker {
    current: Cell<ExportPhase>,
    history: RefCell<Vec<ExportPhase>>,
}

impl PhaseTracker {
    fn current(&self) -> ExportPhase {
        self.current.get()
    }

    fn set(&self, phase: ExportPhase) {
        let old = self.current.replace(phase);
        if old != phase {
            log::debug!("Export phase {old:?} -> {phase:?}");
            self.history.borrow_mut().push(phase);
        }
    }

    fn start(&self, phase: ExportPhase) {
        self.history.borrow_mut().clear();
        self.set(phase);
    }
}

/// Unit of work handed to the debounced save step
enum SaveJob {
    Blob {
        blob: Blob,
        filename: String,
        handle: HandleRef,
    },
    Capture {
        chart_id: String,
        filename: String,
        handle: HandleRef,
    },
}

type SaveFn = Box<dyn Fn(SaveJob) -> LocalBoxFuture<'static, ExportResult<()>>>;

fn save_fn(sink: FileSink, capture: Rc<dyn DomCapture>, phases: Rc<PhaseTracker>) -> SaveFn {
    Box::new(move |job| {
        let sink = sink.clone();
        let capture = capture.clone();
        let phases = phases.clone();
        async move {
            let (blob, filename, handle) = match job {
                SaveJob::Blob {
                    blob,
                    filename,
                    handle,
                } => (blob, filename, handle),
                SaveJob::Capture {
                    chart_id,
                    filename,
                    handle,
                } => {
                    phases.set(ExportPhase::Capturing);
                    let blob = capture.capture_to_blob(&chart_id).await?;
                    (blob, filename, handle)
                }
            };
            phases.set(ExportPhase::Writing);
            sink.write(blob, &filename, handle).await
        }
        .boxed_local()
    })
}

pub struct Exporter {
    host: ExportHost,
    config: ExportConfig,
    overlay: LoadingOverlay,
    watermark: WatermarkToggler,
    debounced_save: Debounced<SaveFn>,
    phases: Rc<PhaseTracker>,
}

impl Exporter {
    pub fn new(host: ExportHost, config: ExportConfig) -> ExportResult<Self> {
        config.validate()?;

        let phases = Rc::new(PhaseTracker::default());
        let sink = FileSink::new(
            host.downloads.clone(),
            host.sleeper.clone(),
            config.revoke_delay(),
        );
        let debounced_save = Debounced::new(
            save_fn(sink, host.capture.clone(), phases.clone()),
            config.debounce_delay(),
            host.sleeper.clone(),
        );

        Ok(Self {
            overlay: LoadingOverlay::new(host.overlay.clone()),
            watermark: WatermarkToggler::new(config.watermark.clone()),
            host,
            config,
            debounced_save,
            phases,
        })
    }

    pub fn config(&self) -> &ExportConfig {
        &self.config
    }

    pub fn phase(&self) -> ExportPhase {
        self.phases.current()
    }

    /// Phases entered by the most recent export, in order
    pub fn phase_history(&self) -> Vec<ExportPhase> {
        self.phases.history.borrow().clone()
    }

    /// Export the chart's series as CSV
    pub async fn download_csv(&self, chart_id: &str) -> ExportResult<()> {
        self.begin(ExportPhase::AcquiringHandle)?;

        let result = match self
            .host
            .dom
            .figure(chart_id)
            .and_then(|figure| Table::from_figure(&figure))
        {
            Ok(table) => self.save_table(table).await,
            Err(err) => Err(err),
        };

        self.finish(result, None).await
    }

    /// Serialize `table` and save it as `<page title>.csv`
    pub async fn download_data(&self, table: Table) -> ExportResult<()> {
        self.begin(ExportPhase::AcquiringHandle)?;
        let result = self.save_table(table).await;
        self.finish(result, None).await
    }

    /// Save the chart as an image, offering the picker first
    pub async fn download_image(&self, chart_id: &str, ui: &UiCallbacks) -> ExportResult<()> {
        self.begin(ExportPhase::AcquiringHandle)?;

        let filename = format!("{}.png", self.host.title.title());

        let result = async {
            let handle = self.acquire_handle(&filename, true).await;
            let extension = handle
                .extension()
                .unwrap_or_else(|| self.config.default_extension.clone());

            ui.set_loading(true);
            self.phases.set(ExportPhase::ShowingOverlay);
            self.overlay.show(&saving_message(&extension)).await;

            if self.config.is_vector(&extension) {
                if handle.is_handle() {
                    log::debug!("Vector export is downloaded by the renderer, handle unused");
                }
                self.save_vector(chart_id).await?;
            } else {
                self.save(SaveJob::Capture {
                    chart_id: chart_id.to_string(),
                    filename: filename.clone(),
                    handle,
                })
                .await?;

                self.phases.set(ExportPhase::HidingOverlay);
                self.overlay.hide().await;
            }

            ui.hide_modebar(false);
            ui.set_loading(false);
            Ok::<(), ExportError>(())
        }
        .await;

        self.finish(result, Some(ui)).await
    }

    /// Save without a picker: vector formats through the renderer, anything
    /// else as a captured raster downloaded by the browser
    pub async fn save_image(&self, chart_id: &str, filename: &str, extension: &str) -> ExportResult<()> {
        self.begin(ExportPhase::Capturing)?;

        let result = if self.config.is_vector(extension) {
            self.save_vector(chart_id).await
        } else {
            self.save(SaveJob::Capture {
                chart_id: chart_id.to_string(),
                filename: filename.to_string(),
                handle: HandleRef::Inaccessible,
            })
            .await
        };

        self.finish(result, None).await
    }

    fn begin(&self, first: ExportPhase) -> ExportResult<()> {
        if self.phases.current().is_in_flight() {
            log::warn!("Export requested while {:?} is in progress", self.phases.current());
            return Err(ExportError::Busy);
        }
        self.phases.start(first);
        Ok(())
    }

    async fn finish(&self, result: ExportResult<()>, ui: Option<&UiCallbacks>) -> ExportResult<()> {
        match result {
            Ok(()) => {
                self.phases.set(ExportPhase::Idle);
                Ok(())
            }
            Err(err) => {
                log::error!("Export failed: {err}");
                self.phases.set(ExportPhase::Failed);
                self.overlay.hide().await;
                if let Some(ui) = ui {
                    ui.hide_modebar(false);
                    ui.set_loading(false);
                }
                Err(err)
            }
        }
    }

    /// Picker failures, including dismissal, continue without a handle
    async fn acquire_handle(&self, filename: &str, is_image: bool) -> HandleRef {
        match acquire(self.host.picker.as_ref(), filename, is_image).await {
            Ok(handle) => handle,
            Err(err) => {
                log::warn!("Could not acquire save handle for {filename}: {err}");
                HandleRef::Absent
            }
        }
    }

    async fn save_table(&self, table: Table) -> ExportResult<()> {
        let blob = csv::to_blob(&table);
        let filename = format!("{}.csv", self.host.title.title());

        let handle = self.acquire_handle(&filename, false).await;
        // The CSV path reports the image default when no handle was chosen.
        let extension = handle
            .extension()
            .unwrap_or_else(|| self.config.default_extension.clone());

        self.phases.set(ExportPhase::ShowingOverlay);
        self.overlay.show(&saving_message(&extension)).await;

        self.save(SaveJob::Blob {
            blob,
            filename,
            handle,
        })
        .await?;

        self.phases.set(ExportPhase::HidingOverlay);
        self.overlay.hide().await;
        Ok(())
    }

    async fn save(&self, job: SaveJob) -> ExportResult<()> {
        match self.debounced_save.call(job).await {
            Some(result) => result,
            None => {
                log::debug!("Save superseded by a later request");
                Ok(())
            }
        }
    }

    /// Watermark, render through the charting library, restore, hide overlay
    async fn save_vector(&self, chart_id: &str) -> ExportResult<()> {
        let mut layout = self.host.dom.figure(chart_id)?.layout;
        let globals = self.host.dom.globals(chart_id)?;
        let state = WatermarkState::capture(&layout);

        self.phases.set(ExportPhase::Capturing);
        let rendered = self
            .render_vector(chart_id, &mut layout, &globals, &state)
            .await;

        // Restore even when rendering failed; the chart must not keep the watermark.
        let patch = self.watermark.restore(&mut layout, &globals, &state);
        let restored = match self.host.dom.set_annotations(chart_id, &layout.annotations) {
            Ok(()) => self.host.renderer.relayout(chart_id, &patch).await,
            Err(err) => Err(err),
        };

        rendered?;
        restored?;

        self.phases.set(ExportPhase::HidingOverlay);
        self.overlay.hide().await;
        Ok(())
    }

    async fn render_vector(
        &self,
        chart_id: &str,
        layout: &mut Layout,
        globals: &ChartGlobals,
        state: &WatermarkState,
    ) -> ExportResult<()> {
        let patch = self.watermark.init(layout, globals, state);
        self.host.dom.set_annotations(chart_id, &layout.annotations)?;
        self.host.renderer.relayout(chart_id, &patch).await?;

        let viewport = self.host.dom.viewport(chart_id)?;
        let options = ImageDownloadOptions {
            format: VECTOR_FORMAT.to_string(),
            width: viewport.width,
            height: viewport.height,
            filename: self.host.title.title(),
        };
        self.host.renderer.download_image(chart_id, &options).await?;
        log::info!("Rendered {chart_id} as {VECTOR_FORMAT}");
        Ok(())
    }
}
