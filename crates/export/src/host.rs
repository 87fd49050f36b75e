//! Host capabilities the exporter depends on
//!
//! Every browser API the export flow touches sits behind one of these traits so
//! the orchestration can run against in-memory fakes. All futures are
//! `!Send`: the exporter runs on a single-threaded event loop.

use std::rc::Rc;
use std::time::Duration;

use chart_export_shared::{
    Annotation, Blob, ChartGlobals, ExportResult, Figure, ImageDownloadOptions, LayoutPatch,
    Viewport,
};
use futures::future::LocalBoxFuture;

use crate::acquire::SavePickerOptions;

/// Host save-file picker (`showSaveFilePicker` in browsers)
pub trait FilePicker {
    /// Whether the host offers a picker at all
    fn is_supported(&self) -> bool;

    /// Ask the user for a save location. Dismissal resolves to
    /// `ExportError::PickerCancelled`.
    fn request_save_handle<'a>(
        &'a self,
        options: &'a SavePickerOptions,
    ) -> LocalBoxFuture<'a, ExportResult<Box<dyn FileHandle>>>;
}

/// Writable destination chosen by the user
pub trait FileHandle {
    /// File name including extension
    fn name(&self) -> String;

    fn create_writable(&self) -> LocalBoxFuture<'_, ExportResult<Box<dyn WritableStream>>>;
}

pub trait WritableStream {
    fn write<'a>(&'a self, blob: &'a Blob) -> LocalBoxFuture<'a, ExportResult<()>>;

    fn close(&self) -> LocalBoxFuture<'_, ExportResult<()>>;
}

/// Anchor-tag download fallback
pub trait DownloadHost {
    fn create_object_url(&self, blob: &Blob) -> ExportResult<String>;

    fn revoke_object_url(&self, url: &str);

    /// Create a hidden anchor with `href` and `download` set, attached to the document
    fn append_hidden_anchor(&self, href: &str, download: &str) -> ExportResult<Box<dyn Anchor>>;
}

pub trait Anchor {
    fn click(&self);

    fn remove(&self);
}

/// Charting library calls
pub trait PlotRenderer {
    fn relayout<'a>(
        &'a self,
        chart_id: &'a str,
        patch: &'a LayoutPatch,
    ) -> LocalBoxFuture<'a, ExportResult<()>>;

    /// Render and download an image directly, bypassing the file sink
    fn download_image<'a>(
        &'a self,
        chart_id: &'a str,
        options: &'a ImageDownloadOptions,
    ) -> LocalBoxFuture<'a, ExportResult<()>>;
}

/// DOM-to-image rasterizer
pub trait DomCapture {
    fn capture_to_blob<'a>(&'a self, chart_id: &'a str) -> LocalBoxFuture<'a, ExportResult<Blob>>;
}

/// Read and mutate the chart node
pub trait ChartDom {
    fn figure(&self, chart_id: &str) -> ExportResult<Figure>;

    fn globals(&self, chart_id: &str) -> ExportResult<ChartGlobals>;

    fn viewport(&self, chart_id: &str) -> ExportResult<Viewport>;

    /// Replace the chart's annotation list in place (no relayout)
    fn set_annotations(&self, chart_id: &str, annotations: &[Annotation]) -> ExportResult<()>;
}

/// Loading overlay node owned by the UI layer
pub trait OverlayHost {
    fn set_text(&self, message: &str);

    fn set_shown(&self, shown: bool);

    /// Resolves once the overlay visibly reflects `shown`
    fn settled(&self, shown: bool) -> LocalBoxFuture<'_, ()>;
}

pub trait PageTitle {
    fn title(&self) -> String;
}

pub trait Sleeper {
    fn sleep(&self, duration: Duration) -> LocalBoxFuture<'static, ()>;
}

/// Every capability the exporter needs, bundled
#[derive(Clone)]
pub struct ExportHost {
    pub picker: Rc<dyn FilePicker>,
    pub downloads: Rc<dyn DownloadHost>,
    pub renderer: Rc<dyn PlotRenderer>,
    pub capture: Rc<dyn DomCapture>,
    pub dom: Rc<dyn ChartDom>,
    pub overlay: Rc<dyn OverlayHost>,
    pub title: Rc<dyn PageTitle>,
    pub sleeper: Rc<dyn Sleeper>,
}

/// UI state owned by the caller, outside the exporter
pub struct UiCallbacks {
    hide_modebar: Box<dyn Fn(bool)>,
    set_loading: Box<dyn Fn(bool)>,
}

impl UiCallbacks {
    pub fn new(hide_modebar: impl Fn(bool) + 'static, set_loading: impl Fn(bool) + 'static) -> Self {
        Self {
            hide_modebar: Box::new(hide_modebar),
            set_loading: Box::new(set_loading),
        }
    }

    /// Callbacks that do nothing
    pub fn noop() -> Self {
        Self::new(|_| {}, |_| {})
    }

    pub fn hide_modebar(&self, hidden: bool) {
        (self.hide_modebar)(hidden)
    }

    pub fn set_loading(&self, loading: bool) {
        (self.set_loading)(loading)
    }
}

impl std::fmt::Debug for UiCallbacks {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("UiCallbacks").finish_non_exhaustive()
    }
}
