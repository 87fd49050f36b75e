//! `web-sys` implementations of the export host capabilities
//!
//! Plotly and dom-to-image are loaded by the page as globals and reached
//! through `extern "C"` bindings. The File System Access API is not in
//! `web-sys` stable, so the picker goes through `js_sys::Reflect`.

use std::rc::Rc;
use std::time::Duration;

use chart_export::shared::{
    Annotation, Blob, ChartGlobals, ExportError, ExportResult, Figure, ImageDownloadOptions,
    Layout, LayoutPatch, Trace, Viewport,
};
use chart_export::{
    Anchor, ChartDom, DomCapture, DownloadHost, ExportHost, FileHandle, FilePicker, OverlayHost,
    PageTitle, PlotRenderer, SavePickerOptions, Sleeper, WritableStream,
};
use futures::future::LocalBoxFuture;
use futures::FutureExt;
use js_sys::{Function, Promise, Reflect, Uint8Array};
use serde::de::DeserializeOwned;
use serde::Serialize;
use wasm_bindgen::prelude::*;
use wasm_bindgen::JsCast;
use wasm_bindgen_futures::JsFuture;
use web_sys::{BlobPropertyBag, Document, Element, HtmlAnchorElement, HtmlElement, Url, Window};

#[wasm_bindgen]
extern "C" {
    #[wasm_bindgen(js_namespace = Plotly, js_name = relayout, catch)]
    fn plotly_relayout(graph_div: &JsValue, update: &JsValue) -> Result<Promise, JsValue>;

    #[wasm_bindgen(js_namespace = Plotly, js_name = downloadImage, catch)]
    fn plotly_download_image(graph_div: &JsValue, options: &JsValue) -> Result<Promise, JsValue>;

    #[wasm_bindgen(js_namespace = domtoimage, js_name = toBlob, catch)]
    fn dom_to_blob(node: &JsValue) -> Result<Promise, JsValue>;
}

/// Name of the class that makes the loading overlay visible
const SHOW_CLASS: &str = "show";

pub(crate) fn window() -> ExportResult<Window> {
    web_sys::window().ok_or_else(|| interop("No window object"))
}

fn document() -> ExportResult<Document> {
    window()?
        .document()
        .ok_or_else(|| interop("No document object"))
}

fn interop(message: &str) -> ExportError {
    ExportError::JsInterop {
        message: message.to_string(),
    }
}

/// Best-effort readable text for a thrown JS value
pub(crate) fn js_error_message(value: &JsValue) -> String {
    if let Some(err) = value.dyn_ref::<js_sys::Error>() {
        return String::from(err.message());
    }
    value.as_string().unwrap_or_else(|| format!("{value:?}"))
}

fn host_error(operation: &str, value: JsValue) -> ExportError {
    ExportError::host_call(operation, js_error_message(&value))
}

/// `AbortError` is what the picker throws when the user dismisses it
fn is_abort(value: &JsValue) -> bool {
    Reflect::get(value, &JsValue::from_str("name"))
        .ok()
        .and_then(|name| name.as_string())
        .is_some_and(|name| name == "AbortError")
}

fn to_js<T: Serialize + ?Sized>(value: &T) -> ExportResult<JsValue> {
    let serializer = serde_wasm_bindgen::Serializer::json_compatible();
    value.serialize(&serializer).map_err(|e| ExportError::JsInterop {
        message: format!("Failed to serialize: {e}"),
    })
}

fn from_js<T: DeserializeOwned + Default>(value: JsValue, what: &str) -> ExportResult<T> {
    if value.is_undefined() || value.is_null() {
        return Ok(T::default());
    }
    serde_wasm_bindgen::from_value(value).map_err(|e| ExportError::InvalidFigure {
        message: format!("Cannot read chart {what}: {e}"),
    })
}

fn get(target: &JsValue, key: &str) -> ExportResult<JsValue> {
    Reflect::get(target, &JsValue::from_str(key)).map_err(|e| host_error(key, e))
}

async fn await_promise(promise: Promise, operation: &str) -> ExportResult<JsValue> {
    JsFuture::from(promise)
        .await
        .map_err(|e| host_error(operation, e))
}

async fn call_method(target: &JsValue, method: &str, args: &[&JsValue]) -> ExportResult<JsValue> {
    call_method_raw(target, method, args)
        .await
        .map_err(|e| host_error(method, e))
}

/// Call `target[method](...args)` and await the result if it is a promise
async fn call_method_raw(
    target: &JsValue,
    method: &str,
    args: &[&JsValue],
) -> Result<JsValue, JsValue> {
    let func: Function = Reflect::get(target, &JsValue::from_str(method))?
        .dyn_into()
        .map_err(|_| JsValue::from_str(&format!("`{method}` is not a function")))?;
    let result = match args {
        [] => func.call0(target),
        [a] => func.call1(target, a),
        [a, b, ..] => func.call2(target, a, b),
    }?;

    match result.dyn_into::<Promise>() {
        Ok(promise) => JsFuture::from(promise).await,
        Err(value) => Ok(value),
    }
}

pub(crate) fn to_web_blob(blob: &Blob) -> ExportResult<web_sys::Blob> {
    let bytes = Uint8Array::from(&blob.bytes()[..]);
    let parts = js_sys::Array::of1(&bytes);
    let options = BlobPropertyBag::new();
    options.set_type(blob.mime_type());
    web_sys::Blob::new_with_u8_array_sequence_and_options(&parts, &options)
        .map_err(|e| host_error("Blob", e))
}

pub(crate) async fn from_web_blob(blob: web_sys::Blob) -> ExportResult<Blob> {
    let buffer = await_promise(blob.array_buffer(), "arrayBuffer").await?;
    let bytes = Uint8Array::new(&buffer).to_vec();
    Ok(Blob::new(bytes, blob.type_()))
}

/// `window.showSaveFilePicker`
pub struct BrowserFilePicker;

impl FilePicker for BrowserFilePicker {
    fn is_supported(&self) -> bool {
        window()
            .map(|w| Reflect::has(&w, &JsValue::from_str("showSaveFilePicker")).unwrap_or(false))
            .unwrap_or(false)
    }

    fn request_save_handle<'a>(
        &'a self,
        options: &'a SavePickerOptions,
    ) -> LocalBoxFuture<'a, ExportResult<Box<dyn FileHandle>>> {
        async move {
            let window: JsValue = window()?.into();
            let options = to_js(options)?;
            match call_method_raw(&window, "showSaveFilePicker", &[&options]).await {
                Ok(handle) => Ok(Box::new(BrowserFileHandle { handle }) as Box<dyn FileHandle>),
                Err(e) if is_abort(&e) => Err(ExportError::PickerCancelled),
                Err(e) => Err(host_error("showSaveFilePicker", e)),
            }
        }
        .boxed_local()
    }
}

pub struct BrowserFileHandle {
    handle: JsValue,
}

impl FileHandle for BrowserFileHandle {
    fn name(&self) -> String {
        get(&self.handle, "name")
            .ok()
            .and_then(|name| name.as_string())
            .unwrap_or_default()
    }

    fn create_writable(&self) -> LocalBoxFuture<'_, ExportResult<Box<dyn WritableStream>>> {
        async move {
            let stream = call_method(&self.handle, "createWritable", &[]).await?;
            Ok(Box::new(BrowserWritableStream { stream }) as Box<dyn WritableStream>)
        }
        .boxed_local()
    }
}

pub struct BrowserWritableStream {
    stream: JsValue,
}

impl WritableStream for BrowserWritableStream {
    fn write<'a>(&'a self, blob: &'a Blob) -> LocalBoxFuture<'a, ExportResult<()>> {
        async move {
            let blob: JsValue = to_web_blob(blob)?.into();
            call_method(&self.stream, "write", &[&blob]).await?;
            Ok(())
        }
        .boxed_local()
    }

    fn close(&self) -> LocalBoxFuture<'_, ExportResult<()>> {
        async move {
            call_method(&self.stream, "close", &[]).await?;
            Ok(())
        }
        .boxed_local()
    }
}

/// Object URL plus hidden `<a download>` fallback
pub struct BrowserDownloads;

impl DownloadHost for BrowserDownloads {
    fn create_object_url(&self, blob: &Blob) -> ExportResult<String> {
        let blob = to_web_blob(blob)?;
        Url::create_object_url_with_blob(&blob).map_err(|e| host_error("createObjectURL", e))
    }

    fn revoke_object_url(&self, url: &str) {
        if let Err(e) = Url::revoke_object_url(url) {
            log::warn!("Failed to revoke {url}: {}", js_error_message(&e));
        }
    }

    fn append_hidden_anchor(&self, href: &str, download: &str) -> ExportResult<Box<dyn Anchor>> {
        let document = document()?;
        let anchor: HtmlAnchorElement = document
            .create_element("a")
            .map_err(|e| host_error("createElement", e))?
            .dyn_into()
            .map_err(|_| interop("Created element is not an anchor"))?;
        anchor.set_href(href);
        anchor.set_download(download);
        anchor
            .style()
            .set_property("display", "none")
            .map_err(|e| host_error("style", e))?;

        let body = document.body().ok_or_else(|| interop("No document body"))?;
        body.append_child(&anchor)
            .map_err(|e| host_error("appendChild", e))?;
        Ok(Box::new(BrowserAnchor { anchor }))
    }
}

pub struct BrowserAnchor {
    anchor: HtmlAnchorElement,
}

impl Anchor for BrowserAnchor {
    fn click(&self) {
        self.anchor.click();
    }

    fn remove(&self) {
        self.anchor.remove();
    }
}

fn chart_element(chart_id: &str) -> ExportResult<Element> {
    document()?
        .get_element_by_id(chart_id)
        .ok_or_else(|| ExportError::ChartNotFound {
            id: chart_id.to_string(),
        })
}

/// `Plotly.relayout` and `Plotly.downloadImage`
pub struct PlotlyRenderer;

impl PlotRenderer for PlotlyRenderer {
    fn relayout<'a>(
        &'a self,
        chart_id: &'a str,
        patch: &'a LayoutPatch,
    ) -> LocalBoxFuture<'a, ExportResult<()>> {
        async move {
            let chart = chart_element(chart_id)?;
            let update = to_js(patch)?;
            let promise = plotly_relayout(&chart, &update).map_err(|e| ExportError::Render {
                message: js_error_message(&e),
            })?;
            await_promise(promise, "Plotly.relayout").await?;
            Ok(())
        }
        .boxed_local()
    }

    fn download_image<'a>(
        &'a self,
        chart_id: &'a str,
        options: &'a ImageDownloadOptions,
    ) -> LocalBoxFuture<'a, ExportResult<()>> {
        async move {
            let chart = chart_element(chart_id)?;
            let options = to_js(options)?;
            let promise =
                plotly_download_image(&chart, &options).map_err(|e| ExportError::Render {
                    message: js_error_message(&e),
                })?;
            JsFuture::from(promise)
                .await
                .map_err(|e| ExportError::Render {
                    message: js_error_message(&e),
                })?;
            Ok(())
        }
        .boxed_local()
    }
}

/// `domtoimage.toBlob`
pub struct DomToImageCapture;

impl DomCapture for DomToImageCapture {
    fn capture_to_blob<'a>(&'a self, chart_id: &'a str) -> LocalBoxFuture<'a, ExportResult<Blob>> {
        async move {
            let chart = chart_element(chart_id)?;
            let capture_error = |e: JsValue| ExportError::Capture {
                message: js_error_message(&e),
            };
            let promise = dom_to_blob(&chart).map_err(capture_error)?;
            let blob: web_sys::Blob = JsFuture::from(promise)
                .await
                .map_err(capture_error)?
                .dyn_into()
                .map_err(|_| interop("domtoimage did not return a Blob"))?;
            from_web_blob(blob).await
        }
        .boxed_local()
    }
}

/// Chart node properties set by Plotly (`data`, `layout`) and by the page (`globals`)
pub struct PlotlyDom;

impl ChartDom for PlotlyDom {
    fn figure(&self, chart_id: &str) -> ExportResult<Figure> {
        let chart: JsValue = chart_element(chart_id)?.into();
        let data: Vec<Trace> = from_js(get(&chart, "data")?, "data")?;
        let layout: Layout = from_js(get(&chart, "layout")?, "layout")?;
        Ok(Figure { data, layout })
    }

    fn globals(&self, chart_id: &str) -> ExportResult<ChartGlobals> {
        let chart: JsValue = chart_element(chart_id)?.into();
        from_js(get(&chart, "globals")?, "globals")
    }

    fn viewport(&self, chart_id: &str) -> ExportResult<Viewport> {
        let chart = chart_element(chart_id)?;
        Ok(Viewport {
            width: chart.client_width().max(0) as u32,
            height: chart.client_height().max(0) as u32,
        })
    }

    fn set_annotations(&self, chart_id: &str, annotations: &[Annotation]) -> ExportResult<()> {
        let chart: JsValue = chart_element(chart_id)?.into();
        let layout = get(&chart, "layout")?;
        if !layout.is_object() {
            return Err(ExportError::InvalidFigure {
                message: format!("Chart {chart_id} has no layout"),
            });
        }
        Reflect::set(&layout, &JsValue::from_str("annotations"), &to_js(annotations)?)
            .map_err(|e| host_error("annotations", e))?;
        Ok(())
    }
}

/// Loading overlay toggled through the `show` class
pub struct DomOverlay {
    overlay_id: String,
    text_id: String,
}

impl DomOverlay {
    pub fn new(overlay_id: &str, text_id: &str) -> Self {
        Self {
            overlay_id: overlay_id.to_string(),
            text_id: text_id.to_string(),
        }
    }

    fn element(&self, id: &str) -> Option<HtmlElement> {
        let element = document().ok()?.get_element_by_id(id)?;
        match element.dyn_into::<HtmlElement>() {
            Ok(element) => Some(element),
            Err(_) => {
                log::warn!("Overlay element #{id} is not an HTML element");
                None
            }
        }
    }

    fn is_shown(&self) -> bool {
        self.element(&self.overlay_id)
            .map(|e| e.class_list().contains(SHOW_CLASS))
            .unwrap_or(false)
    }
}

impl OverlayHost for DomOverlay {
    fn set_text(&self, message: &str) {
        match self.element(&self.text_id) {
            Some(text) => text.set_inner_text(message),
            None => log::debug!("No overlay text element #{}", self.text_id),
        }
    }

    fn set_shown(&self, shown: bool) {
        let Some(overlay) = self.element(&self.overlay_id) else {
            log::debug!("No overlay element #{}", self.overlay_id);
            return;
        };
        let classes = overlay.class_list();
        let result = if shown {
            classes.add_1(SHOW_CLASS)
        } else {
            classes.remove_1(SHOW_CLASS)
        };
        if let Err(e) = result {
            log::warn!("Failed to toggle overlay: {}", js_error_message(&e));
        }
    }

    fn settled(&self, shown: bool) -> LocalBoxFuture<'_, ()> {
        async move {
            // Nothing to wait for without an overlay.
            if self.element(&self.overlay_id).is_none() {
                return;
            }
            while self.is_shown() != shown {
                next_frame().await;
            }
            // One more frame so the class change is painted before capture.
            next_frame().await;
        }
        .boxed_local()
    }
}

async fn next_frame() {
    let Ok(window) = window() else {
        return;
    };
    let promise = Promise::new(&mut |resolve, _reject| {
        if window.request_animation_frame(&resolve).is_err() {
            let _ = resolve.call0(&JsValue::NULL);
        }
    });
    let _ = JsFuture::from(promise).await;
}

/// `window.title`, set by the page host, else `document.title`
pub struct BrowserTitle;

impl PageTitle for BrowserTitle {
    fn title(&self) -> String {
        let Ok(window) = window() else {
            return String::new();
        };
        Reflect::get(&window, &JsValue::from_str("title"))
            .ok()
            .and_then(|title| title.as_string())
            .or_else(|| window.document().map(|d| d.title()))
            .unwrap_or_default()
    }
}

/// `setTimeout` wrapped in a promise
pub struct TimeoutSleeper;

impl Sleeper for TimeoutSleeper {
    fn sleep(&self, duration: Duration) -> LocalBoxFuture<'static, ()> {
        let millis = i32::try_from(duration.as_millis()).unwrap_or(i32::MAX);
        async move {
            let Ok(window) = window() else {
                return;
            };
            let promise = Promise::new(&mut |resolve, _reject| {
                if window
                    .set_timeout_with_callback_and_timeout_and_arguments_0(&resolve, millis)
                    .is_err()
                {
                    let _ = resolve.call0(&JsValue::NULL);
                }
            });
            let _ = JsFuture::from(promise).await;
        }
        .boxed_local()
    }
}

/// Host wired to the live page
pub fn browser_host(overlay_id: &str, text_id: &str) -> ExportHost {
    ExportHost {
        picker: Rc::new(BrowserFilePicker),
        downloads: Rc::new(BrowserDownloads),
        renderer: Rc::new(PlotlyRenderer),
        capture: Rc::new(DomToImageCapture),
        dom: Rc::new(PlotlyDom),
        overlay: Rc::new(DomOverlay::new(overlay_id, text_id)),
        title: Rc::new(BrowserTitle),
        sleeper: Rc::new(TimeoutSleeper),
    }
}
