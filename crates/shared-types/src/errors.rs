//! Common error types used across the chart export crates
//! Provides consistent error handling and reporting

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Base error type for all export operations
#[derive(Error, Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "details")]
pub enum ExportError {
    // File handle errors
    #[error("Cannot access filesystem")]
    HandleInaccessible,

    #[error("Save file picker was dismissed")]
    PickerCancelled,

    #[error("Host call `{operation}` failed: {message}")]
    HostCall { operation: String, message: String },

    #[error("Write failed: {message}")]
    WriteFailed { message: String },

    // Figure errors
    #[error("Candlestick and scatter series cannot be exported together")]
    MixedSeries,

    #[error("Chart element not found: {id}")]
    ChartNotFound { id: String },

    #[error("Invalid figure: {message}")]
    InvalidFigure { message: String },

    #[error("Parse error: {message}")]
    Parse {
        message: String,
        line: Option<usize>,
    },

    // Capture/rendering errors
    #[error("Image capture failed: {message}")]
    Capture { message: String },

    #[error("Render call failed: {message}")]
    Render { message: String },

    // Orchestration errors
    #[error("Another export is already in flight")]
    Busy,

    #[error("Invalid configuration: {message}")]
    InvalidConfig {
        message: String,
        field: Option<String>,
    },

    // WASM-specific errors
    #[error("JavaScript interop error: {message}")]
    JsInterop { message: String },
}

impl ExportError {
    pub fn host_call(operation: &str, message: impl Into<String>) -> Self {
        ExportError::HostCall {
            operation: operation.to_string(),
            message: message.into(),
        }
    }
}

/// Result type alias for export operations
pub type ExportResult<T> = Result<T, ExportError>;

/// Error response structure for JavaScript interop
#[derive(Serialize, Deserialize, Debug)]
pub struct ErrorResponse {
    pub success: bool,
    pub error: ExportError,
    pub timestamp: u64,
    pub context: Option<ErrorContext>,
}

/// Additional context for error reporting
#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct ErrorContext {
    pub component: String,
    pub operation: String,
}

impl ErrorResponse {
    /// Create a new error response
    pub fn new(error: ExportError) -> Self {
        Self {
            success: false,
            error,
            timestamp: chrono::Utc::now().timestamp_millis() as u64,
            context: None,
        }
    }

    /// Add context to the error response
    pub fn with_context(mut self, component: &str, operation: &str) -> Self {
        self.context = Some(ErrorContext {
            component: component.to_string(),
            operation: operation.to_string(),
        });
        self
    }

    /// Convert to JSON string for JavaScript
    pub fn to_json(&self) -> String {
        serde_json::to_string(self).unwrap_or_else(|_| {
            r#"{"success":false,"error":{"type":"JsInterop","details":{"message":"Failed to serialize error"}}}"#.to_string()
        })
    }
}

impl From<serde_json::Error> for ExportError {
    fn from(err: serde_json::Error) -> Self {
        ExportError::Parse {
            message: err.to_string(),
            line: Some(err.line()),
        }
    }
}
