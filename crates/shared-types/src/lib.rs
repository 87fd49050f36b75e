//! Shared types for the chart export crates
//!
//! This crate contains the types that are shared between the export core and
//! the wasm bridge: the figure model read from the live chart, the immutable
//! `Blob` payload handed to the file sink, export formats and the common error
//! type.

use bytes::Bytes;
use serde::{Deserialize, Serialize};

pub mod errors;
pub mod figure;

pub use errors::{ErrorContext, ErrorResponse, ExportError, ExportResult};
pub use figure::{
    Annotation, Axis, ChartGlobals, Figure, Font, ImageDownloadOptions, Layout, LayoutPatch,
    Margin, Title, Trace, TraceKind, Viewport,
};

/// MIME type used for CSV exports
pub const CSV_MIME_TYPE: &str = "text/csv;charset=utf-8;";

/// Immutable in-memory payload with an associated MIME type.
///
/// A blob is created once per export and handed to the file sink by value.
#[derive(Debug, PartialEq, Eq)]
pub struct Blob {
    bytes: Bytes,
    mime_type: String,
}

impl Blob {
    pub fn new(bytes: impl Into<Bytes>, mime_type: impl Into<String>) -> Self {
        Self {
            bytes: bytes.into(),
            mime_type: mime_type.into(),
        }
    }

    /// Wrap UTF-8 text
    pub fn from_text(text: String, mime_type: impl Into<String>) -> Self {
        Self::new(Bytes::from(text), mime_type)
    }

    pub fn bytes(&self) -> &Bytes {
        &self.bytes
    }

    pub fn mime_type(&self) -> &str {
        &self.mime_type
    }

    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }

    /// Payload as text, if it is valid UTF-8
    pub fn as_text(&self) -> Option<&str> {
        std::str::from_utf8(&self.bytes).ok()
    }
}

/// File formats the exporter knows how to offer in the save picker
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum ExportFormat {
    Png,
    Jpeg,
    Svg,
    Csv,
}

impl ExportFormat {
    /// Image formats offered by the save picker, in display order
    pub const PICKER_IMAGES: [ExportFormat; 3] =
        [ExportFormat::Png, ExportFormat::Jpeg, ExportFormat::Svg];

    pub fn extension(&self) -> &'static str {
        match self {
            ExportFormat::Png => "png",
            ExportFormat::Jpeg => "jpeg",
            ExportFormat::Svg => "svg",
            ExportFormat::Csv => "csv",
        }
    }

    pub fn mime_type(&self) -> &'static str {
        match self {
            ExportFormat::Png => "image/png",
            ExportFormat::Jpeg => "image/jpeg",
            ExportFormat::Svg => "image/svg+xml",
            ExportFormat::Csv => "text/csv",
        }
    }

    /// Human readable label used in picker filters
    pub fn description(&self) -> &'static str {
        match self {
            ExportFormat::Png => "PNG Image",
            ExportFormat::Jpeg => "JPEG Image",
            ExportFormat::Svg => "SVG Image",
            ExportFormat::Csv => "CSV File",
        }
    }
}
