//! In-memory host used by the integration tests.
//!
//! Every capability appends to one shared event log so tests can assert the
//! exact order of host calls.

#![allow(dead_code)]

use std::cell::{Cell, RefCell};
use std::rc::Rc;
use std::time::Duration;

use chart_export::shared::{
    Annotation, Blob, ChartGlobals, ExportError, ExportResult, Figure, ImageDownloadOptions,
    LayoutPatch, Viewport,
};
use chart_export::{
    Anchor, ChartDom, DomCapture, DownloadHost, ExportHost, FileHandle, FilePicker, OverlayHost,
    PageTitle, PlotRenderer, SavePickerOptions, Sleeper, WritableStream,
};
use futures::future::LocalBoxFuture;
use futures::FutureExt;

pub type Events = Rc<RefCell<Vec<String>>>;

pub fn init_logging() {
    let _ = env_logger::builder().is_test(true).try_init();
}

pub struct TokioSleeper;

impl Sleeper for TokioSleeper {
    fn sleep(&self, duration: Duration) -> LocalBoxFuture<'static, ()> {
        tokio::time::sleep(duration).boxed_local()
    }
}

/// What the picker does when asked for a handle
#[derive(Clone)]
pub enum PickerBehavior {
    Unsupported,
    Cancel,
    Choose { name: String, fail_write: bool },
}

pub struct FakePicker {
    events: Events,
    behavior: RefCell<PickerBehavior>,
    pub last_options: RefCell<Option<SavePickerOptions>>,
}

impl FilePicker for FakePicker {
    fn is_supported(&self) -> bool {
        !matches!(*self.behavior.borrow(), PickerBehavior::Unsupported)
    }

    fn request_save_handle<'a>(
        &'a self,
        options: &'a SavePickerOptions,
    ) -> LocalBoxFuture<'a, ExportResult<Box<dyn FileHandle>>> {
        self.events.borrow_mut().push("picker:request".to_string());
        *self.last_options.borrow_mut() = Some(options.clone());
        let behavior = self.behavior.borrow().clone();
        let events = self.events.clone();
        async move {
            match behavior {
                PickerBehavior::Choose { name, fail_write } => Ok(Box::new(FakeHandle {
                    name,
                    fail_write,
                    events,
                }) as Box<dyn FileHandle>),
                PickerBehavior::Cancel => Err(ExportError::PickerCancelled),
                PickerBehavior::Unsupported => unreachable!("picker not supported"),
            }
        }
        .boxed_local()
    }
}

pub struct FakeHandle {
    name: String,
    fail_write: bool,
    events: Events,
}

impl FileHandle for FakeHandle {
    fn name(&self) -> String {
        self.name.clone()
    }

    fn create_writable(&self) -> LocalBoxFuture<'_, ExportResult<Box<dyn WritableStream>>> {
        self.events.borrow_mut().push("stream:open".to_string());
        let stream = FakeStream {
            fail_write: self.fail_write,
            events: self.events.clone(),
        };
        async move { Ok(Box::new(stream) as Box<dyn WritableStream>) }.boxed_local()
    }
}

pub struct FakeStream {
    fail_write: bool,
    events: Events,
}

impl WritableStream for FakeStream {
    fn write<'a>(&'a self, blob: &'a Blob) -> LocalBoxFuture<'a, ExportResult<()>> {
        async move {
            if self.fail_write {
                self.events.borrow_mut().push("stream:write-failed".to_string());
                return Err(ExportError::host_call("write", "disk full"));
            }
            self.events.borrow_mut().push(format!(
                "stream:write:{}:{}",
                blob.mime_type(),
                blob.as_text().unwrap_or("<binary>")
            ));
            Ok(())
        }
        .boxed_local()
    }

    fn close(&self) -> LocalBoxFuture<'_, ExportResult<()>> {
        self.events.borrow_mut().push("stream:close".to_string());
        async { Ok(()) }.boxed_local()
    }
}

pub struct FakeDownloads {
    events: Events,
    next_url: Cell<u32>,
}

impl DownloadHost for FakeDownloads {
    fn create_object_url(&self, blob: &Blob) -> ExportResult<String> {
        let id = self.next_url.get() + 1;
        self.next_url.set(id);
        let url = format!("blob:{id}");
        self.events
            .borrow_mut()
            .push(format!("url:create:{url}:{}", blob.mime_type()));
        Ok(url)
    }

    fn revoke_object_url(&self, url: &str) {
        self.events.borrow_mut().push(format!("url:revoke:{url}"));
    }

    fn append_hidden_anchor(&self, href: &str, download: &str) -> ExportResult<Box<dyn Anchor>> {
        self.events
            .borrow_mut()
            .push(format!("anchor:append:{href}:{download}"));
        Ok(Box::new(FakeAnchor {
            events: self.events.clone(),
        }))
    }
}

pub struct FakeAnchor {
    events: Events,
}

impl Anchor for FakeAnchor {
    fn click(&self) {
        self.events.borrow_mut().push("anchor:click".to_string());
    }

    fn remove(&self) {
        self.events.borrow_mut().push("anchor:remove".to_string());
    }
}

pub struct FakeRenderer {
    events: Events,
    pub fail_download: Cell<bool>,
}

impl PlotRenderer for FakeRenderer {
    fn relayout<'a>(
        &'a self,
        chart_id: &'a str,
        patch: &'a LayoutPatch,
    ) -> LocalBoxFuture<'a, ExportResult<()>> {
        let margin = match &patch.margin {
            None => "none".to_string(),
            Some(None) => "null".to_string(),
            Some(Some(m)) => m.l.map(|l| l.to_string()).unwrap_or_else(|| "none".to_string()),
        };
        self.events.borrow_mut().push(format!(
            "relayout:{chart_id}:title={}:margin.l={margin}",
            patch.title_text
        ));
        async { Ok(()) }.boxed_local()
    }

    fn download_image<'a>(
        &'a self,
        chart_id: &'a str,
        options: &'a ImageDownloadOptions,
    ) -> LocalBoxFuture<'a, ExportResult<()>> {
        let fail = self.fail_download.get();
        self.events.borrow_mut().push(format!(
            "render:{chart_id}:{}:{}x{}:{}",
            options.format, options.width, options.height, options.filename
        ));
        async move {
            if fail {
                Err(ExportError::Render {
                    message: "toImage rejected".to_string(),
                })
            } else {
                Ok(())
            }
        }
        .boxed_local()
    }
}

pub struct FakeCapture {
    events: Events,
}

impl DomCapture for FakeCapture {
    fn capture_to_blob<'a>(&'a self, chart_id: &'a str) -> LocalBoxFuture<'a, ExportResult<Blob>> {
        self.events.borrow_mut().push(format!("capture:{chart_id}"));
        async { Ok(Blob::new(vec![0x89, b'P', b'N', b'G'], "image/png")) }.boxed_local()
    }
}

pub struct FakeDom {
    events: Events,
    pub figure: RefCell<Figure>,
    pub globals: RefCell<ChartGlobals>,
}

impl ChartDom for FakeDom {
    fn figure(&self, chart_id: &str) -> ExportResult<Figure> {
        if chart_id != "plotlyChart" {
            return Err(ExportError::ChartNotFound {
                id: chart_id.to_string(),
            });
        }
        Ok(self.figure.borrow().clone())
    }

    fn globals(&self, _chart_id: &str) -> ExportResult<ChartGlobals> {
        Ok(self.globals.borrow().clone())
    }

    fn viewport(&self, _chart_id: &str) -> ExportResult<Viewport> {
        Ok(Viewport {
            width: 800,
            height: 600,
        })
    }

    fn set_annotations(&self, _chart_id: &str, annotations: &[Annotation]) -> ExportResult<()> {
        self.events
            .borrow_mut()
            .push(format!("annotations:{}", annotations.len()));
        self.figure.borrow_mut().layout.annotations = annotations.to_vec();
        Ok(())
    }
}

pub struct FakeOverlay {
    events: Events,
    pub shown: Cell<bool>,
}

impl OverlayHost for FakeOverlay {
    fn set_text(&self, message: &str) {
        self.events.borrow_mut().push(format!("overlay:text:{message}"));
    }

    fn set_shown(&self, shown: bool) {
        self.shown.set(shown);
        self.events.borrow_mut().push(format!("overlay:shown:{shown}"));
    }

    fn settled(&self, shown: bool) -> LocalBoxFuture<'_, ()> {
        assert_eq!(self.shown.get(), shown);
        async {}.boxed_local()
    }
}

pub struct FakeTitle(pub String);

impl PageTitle for FakeTitle {
    fn title(&self) -> String {
        self.0.clone()
    }
}

/// All fakes, sharing one event log
pub struct FakeHost {
    pub events: Events,
    pub picker: Rc<FakePicker>,
    pub downloads: Rc<FakeDownloads>,
    pub renderer: Rc<FakeRenderer>,
    pub capture: Rc<FakeCapture>,
    pub dom: Rc<FakeDom>,
    pub overlay: Rc<FakeOverlay>,
}

impl FakeHost {
    pub fn new(picker: PickerBehavior, figure: Figure) -> Self {
        let events: Events = Rc::default();
        Self {
            picker: Rc::new(FakePicker {
                events: events.clone(),
                behavior: RefCell::new(picker),
                last_options: RefCell::new(None),
            }),
            downloads: Rc::new(FakeDownloads {
                events: events.clone(),
                next_url: Cell::new(0),
            }),
            renderer: Rc::new(FakeRenderer {
                events: events.clone(),
                fail_download: Cell::new(false),
            }),
            capture: Rc::new(FakeCapture {
                events: events.clone(),
            }),
            dom: Rc::new(FakeDom {
                events: events.clone(),
                figure: RefCell::new(figure),
                globals: RefCell::new(ChartGlobals::default()),
            }),
            overlay: Rc::new(FakeOverlay {
                events: events.clone(),
                shown: Cell::new(false),
            }),
            events,
        }
    }

    pub fn host(&self) -> ExportHost {
        ExportHost {
            picker: self.picker.clone(),
            downloads: self.downloads.clone(),
            renderer: self.renderer.clone(),
            capture: self.capture.clone(),
            dom: self.dom.clone(),
            overlay: self.overlay.clone(),
            title: Rc::new(FakeTitle("AAPL".to_string())),
            sleeper: Rc::new(TokioSleeper),
        }
    }

    pub fn events(&self) -> Vec<String> {
        self.events.borrow().clone()
    }

    pub fn count(&self, prefix: &str) -> usize {
        self.events
            .borrow()
            .iter()
            .filter(|e| e.starts_with(prefix))
            .count()
    }

    pub fn position(&self, prefix: &str) -> Option<usize> {
        self.events.borrow().iter().position(|e| e.starts_with(prefix))
    }
}
