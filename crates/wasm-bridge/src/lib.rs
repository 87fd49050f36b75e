//! WASM bridge for chart export
//! Exposes the exporter to JavaScript, wired to the live page through `web-sys`

use std::rc::Rc;
use std::sync::Once;

use chart_export::shared::{ErrorResponse, ExportResult};
use chart_export::{ExportConfig, Exporter, Table, UiCallbacks};
use js_sys::Function;
use serde_json::Value;
use wasm_bindgen::prelude::*;

pub mod browser;

static LOGGER: Once = Once::new();

fn init_logging() {
    LOGGER.call_once(|| {
        if console_log::init_with_level(log::Level::Debug).is_err() {
            web_sys::console::warn_1(&JsValue::from_str("Logger already initialized"));
        }
    });
}

/// Errors cross the boundary as a JSON `ErrorResponse` string
fn to_js_result<T>(result: ExportResult<T>, operation: &str) -> Result<T, JsValue> {
    result.map_err(|err| {
        let response = ErrorResponse::new(err).with_context("ChartExporter", operation);
        JsValue::from_str(&response.to_json())
    })
}

fn js_callback(func: Function, name: &'static str) -> impl Fn(bool) + 'static {
    move |flag| {
        if let Err(e) = func.call1(&JsValue::NULL, &JsValue::from_bool(flag)) {
            log::warn!("{name} callback threw: {}", browser::js_error_message(&e));
        }
    }
}

#[wasm_bindgen]
pub struct ChartExporter {
    exporter: Rc<Exporter>,
}

#[wasm_bindgen]
impl ChartExporter {
    /// Create an exporter bound to the current page. `config_json` may omit
    /// any field; missing ones take their defaults.
    #[wasm_bindgen(constructor)]
    pub fn new(config_json: Option<String>) -> Result<ChartExporter, JsValue> {
        console_error_panic_hook::set_once();
        init_logging();

        let config = match config_json {
            Some(json) => to_js_result(ExportConfig::from_json(&json), "new")?,
            None => ExportConfig::default(),
        };
        let host = browser::browser_host(&config.overlay_element_id, &config.overlay_text_element_id);
        let exporter = to_js_result(Exporter::new(host, config), "new")?;

        log::info!("ChartExporter ready");
        Ok(ChartExporter {
            exporter: Rc::new(exporter),
        })
    }

    /// Save the chart's series as `<title>.csv`
    pub async fn download_csv(&self, chart_id: String) -> Result<(), JsValue> {
        let exporter = self.exporter.clone();
        to_js_result(exporter.download_csv(&chart_id).await, "download_csv")
    }

    /// Save a prebuilt table as `<title>.csv`
    pub async fn download_data(&self, columns: JsValue, rows: JsValue) -> Result<(), JsValue> {
        let columns: Vec<String> = serde_wasm_bindgen::from_value(columns)
            .map_err(|e| JsValue::from_str(&format!("Invalid columns: {e}")))?;
        let rows: Vec<Vec<Value>> = serde_wasm_bindgen::from_value(rows)
            .map_err(|e| JsValue::from_str(&format!("Invalid rows: {e}")))?;

        let exporter = self.exporter.clone();
        to_js_result(
            exporter.download_data(Table::new(columns, rows)).await,
            "download_data",
        )
    }

    /// Save the chart as an image; the picker decides the format
    pub async fn download_image(
        &self,
        chart_id: String,
        hide_modebar: Function,
        loading: Function,
    ) -> Result<(), JsValue> {
        let ui = UiCallbacks::new(
            js_callback(hide_modebar, "hide_modebar"),
            js_callback(loading, "loading"),
        );
        let exporter = self.exporter.clone();
        to_js_result(exporter.download_image(&chart_id, &ui).await, "download_image")
    }

    /// Save as `extension` without asking for a location
    pub async fn save_image(
        &self,
        chart_id: String,
        filename: String,
        extension: String,
    ) -> Result<(), JsValue> {
        let exporter = self.exporter.clone();
        to_js_result(
            exporter.save_image(&chart_id, &filename, &extension).await,
            "save_image",
        )
    }

    /// Current configuration as JSON
    pub fn get_config(&self) -> String {
        self.exporter.config().to_json()
    }

    /// Name of the current export phase
    pub fn phase(&self) -> String {
        format!("{:?}", self.exporter.phase())
    }
}

#[wasm_bindgen(start)]
pub fn init() {
    console_error_panic_hook::set_once();
}

/// Export version info
#[wasm_bindgen]
pub fn version() -> String {
    env!("CARGO_PKG_VERSION").to_string()
}

#[cfg(all(test, target_arch = "wasm32"))]
mod tests {
    use super::*;
    use wasm_bindgen_test::*;

    wasm_bindgen_test_configure!(run_in_browser);

    #[wasm_bindgen_test]
    fn test_default_config_round_trips() {
        let exporter = ChartExporter::new(None).unwrap();
        let config = ExportConfig::from_json(&exporter.get_config()).unwrap();
        assert_eq!(config, ExportConfig::default());
        assert_eq!(exporter.phase(), "Idle");
    }

    #[wasm_bindgen_test]
    fn test_invalid_config_is_rejected() {
        let err = ChartExporter::new(Some(r#"{"default_extension":""}"#.to_string()))
            .err()
            .unwrap();
        let json = err.as_string().unwrap();
        assert!(json.contains("InvalidConfig"));
    }

    #[wasm_bindgen_test]
    async fn test_unknown_chart_fails_csv() {
        let exporter = ChartExporter::new(None).unwrap();
        let err = exporter
            .download_csv("missing-chart".to_string())
            .await
            .unwrap_err();
        assert!(err.as_string().unwrap().contains("ChartNotFound"));
        assert_eq!(exporter.phase(), "Failed");
    }

    #[wasm_bindgen_test]
    fn test_version_matches_package() {
        assert_eq!(version(), env!("CARGO_PKG_VERSION"));
    }
}
