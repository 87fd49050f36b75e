//! Chart export core
//!
//! Exports a chart's series as CSV and its rendering as PNG/JPEG/SVG. The
//! browser is reached only through the capability traits in [`host`], so the
//! whole save sequence runs against in-memory fakes in tests and against
//! `web-sys` in the wasm bridge.

pub mod acquire;
pub mod config;
pub mod csv;
pub mod debounce;
pub mod host;
pub mod orchestrator;
pub mod overlay;
pub mod sink;
pub mod table;
pub mod watermark;

pub use acquire::{acquire, extension_of, FilePickerAcceptType, HandleRef, SavePickerOptions};
pub use config::ExportConfig;
pub use debounce::Debounced;
pub use host::{
    Anchor, ChartDom, DomCapture, DownloadHost, ExportHost, FileHandle, FilePicker, OverlayHost,
    PageTitle, PlotRenderer, Sleeper, UiCallbacks, WritableStream,
};
pub use orchestrator::{ExportPhase, Exporter};
pub use overlay::LoadingOverlay;
pub use sink::FileSink;
pub use table::Table;
pub use watermark::{WatermarkState, WatermarkToggler};

pub use chart_export_shared as shared;
