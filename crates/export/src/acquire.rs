//! Save-location handle acquisition

use std::collections::BTreeMap;

use chart_export_shared::{ExportFormat, ExportResult};
use serde::{Deserialize, Serialize};

use crate::host::{FileHandle, FilePicker};

/// One type filter shown by the save picker
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FilePickerAcceptType {
    pub description: String,
    /// MIME type -> accepted extensions (with leading dot)
    pub accept: BTreeMap<String, Vec<String>>,
}

impl From<ExportFormat> for FilePickerAcceptType {
    fn from(format: ExportFormat) -> Self {
        let mut accept = BTreeMap::new();
        accept.insert(
            format.mime_type().to_string(),
            vec![format!(".{}", format.extension())],
        );
        Self {
            description: format.description().to_string(),
            accept,
        }
    }
}

/// Options handed to the host picker, shaped like `SaveFilePickerOptions`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SavePickerOptions {
    pub suggested_name: String,
    pub types: Vec<FilePickerAcceptType>,
    pub exclude_accept_all_option: bool,
}

impl SavePickerOptions {
    pub fn new(filename: &str, is_image: bool) -> Self {
        let types = if is_image {
            ExportFormat::PICKER_IMAGES.iter().map(|f| (*f).into()).collect()
        } else {
            vec![ExportFormat::Csv.into()]
        };

        Self {
            suggested_name: filename.to_string(),
            types,
            exclude_accept_all_option: true,
        }
    }
}

/// Where an export should be written
pub enum HandleRef {
    /// User-chosen destination
    Handle(Box<dyn FileHandle>),
    /// Host file writes must not be used; the sink logs and falls back
    Inaccessible,
    /// No handle was ever offered
    Absent,
}

impl HandleRef {
    /// Extension of the chosen file, if a handle is held
    pub fn extension(&self) -> Option<String> {
        match self {
            HandleRef::Handle(handle) => Some(extension_of(&handle.name())),
            _ => None,
        }
    }

    pub fn is_handle(&self) -> bool {
        matches!(self, HandleRef::Handle(_))
    }
}

impl std::fmt::Debug for HandleRef {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            HandleRef::Handle(handle) => f.debug_tuple("Handle").field(&handle.name()).finish(),
            HandleRef::Inaccessible => f.write_str("Inaccessible"),
            HandleRef::Absent => f.write_str("Absent"),
        }
    }
}

/// Text after the last dot, or the whole name when there is none
pub fn extension_of(filename: &str) -> String {
    filename.rsplit('.').next().unwrap_or(filename).to_string()
}

/// Ask the host for a save handle.
///
/// Resolves to `Absent` when the host has no picker. Picker failures,
/// including the user dismissing it, are returned to the caller.
pub async fn acquire(
    picker: &dyn FilePicker,
    filename: &str,
    is_image: bool,
) -> ExportResult<HandleRef> {
    if !picker.is_supported() {
        log::debug!("Save file picker unavailable, using download fallback");
        return Ok(HandleRef::Absent);
    }

    let options = SavePickerOptions::new(filename, is_image);
    let handle = picker.request_save_handle(&options).await?;
    log::debug!("Save handle acquired for {}", handle.name());
    Ok(HandleRef::Handle(handle))
}
