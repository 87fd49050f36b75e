//! Exporter configuration

use std::time::Duration;

use chart_export_shared::{Annotation, ExportError, ExportResult};
use serde::{Deserialize, Serialize};

use crate::watermark::default_watermark;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ExportConfig {
    /// Delay before a save runs; rapid repeats within it collapse into one
    pub debounce_ms: u64,
    /// How long an object URL stays alive after its download was triggered
    pub revoke_delay_ms: u64,
    /// Extension assumed when no handle was chosen
    pub default_extension: String,
    /// Extensions rendered by the charting library instead of captured
    pub vector_extensions: Vec<String>,
    pub watermark: Annotation,
    pub overlay_element_id: String,
    pub overlay_text_element_id: String,
}

impl Default for ExportConfig {
    fn default() -> Self {
        Self {
            debounce_ms: 2,
            revoke_delay_ms: 100,
            default_extension: "png".to_string(),
            vector_extensions: vec!["svg".to_string(), "pdf".to_string()],
            watermark: default_watermark(),
            overlay_element_id: "loading".to_string(),
            overlay_text_element_id: "loading_text".to_string(),
        }
    }
}

impl ExportConfig {
    /// Parse from JSON, filling missing fields with defaults
    pub fn from_json(json: &str) -> ExportResult<Self> {
        let config: ExportConfig = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    pub fn to_json(&self) -> String {
        serde_json::to_string(self).unwrap_or_else(|_| "{}".to_string())
    }

    pub fn validate(&self) -> ExportResult<()> {
        if self.default_extension.trim().is_empty() {
            return Err(invalid("default extension must not be empty", "default_extension"));
        }
        if self.overlay_element_id.trim().is_empty() {
            return Err(invalid("overlay element id must not be empty", "overlay_element_id"));
        }
        if self.overlay_text_element_id.trim().is_empty() {
            return Err(invalid(
                "overlay text element id must not be empty",
                "overlay_text_element_id",
            ));
        }
        Ok(())
    }

    pub fn debounce_delay(&self) -> Duration {
        Duration::from_millis(self.debounce_ms)
    }

    pub fn revoke_delay(&self) -> Duration {
        Duration::from_millis(self.revoke_delay_ms)
    }

    pub fn is_vector(&self, extension: &str) -> bool {
        self.vector_extensions
            .iter()
            .any(|v| v.eq_ignore_ascii_case(extension))
    }
}

fn invalid(message: &str, field: &str) -> ExportError {
    ExportError::InvalidConfig {
        message: message.to_string(),
        field: Some(field.to_string()),
    }
}
