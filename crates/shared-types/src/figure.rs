//! Figure model mirrored from the live chart
//!
//! Only the fields the exporter reads or patches are typed. Everything else is
//! kept in `extra` maps so a figure can be read from the host and written back
//! without losing keys.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Snapshot of a chart's data and layout
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Figure {
    #[serde(default)]
    pub data: Vec<Trace>,
    #[serde(default)]
    pub layout: Layout,
}

/// Series variants the tabular export understands
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TraceKind {
    Candlestick,
    Scatter,
    #[default]
    #[serde(other)]
    Other,
}

/// One series of the chart. Value arrays are parallel and keyed by index.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Trace {
    #[serde(rename = "type", default)]
    pub kind: TraceKind,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub x: Vec<Value>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub y: Vec<Value>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub open: Vec<Value>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub high: Vec<Value>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub low: Vec<Value>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub close: Vec<Value>,
}

impl Trace {
    pub fn scatter(name: &str, x: Vec<Value>, y: Vec<Value>) -> Self {
        Self {
            kind: TraceKind::Scatter,
            name: Some(name.to_string()),
            x,
            y,
            ..Default::default()
        }
    }

    pub fn candlestick(
        x: Vec<Value>,
        open: Vec<Value>,
        high: Vec<Value>,
        low: Vec<Value>,
        close: Vec<Value>,
    ) -> Self {
        Self {
            kind: TraceKind::Candlestick,
            x,
            open,
            high,
            low,
            close,
            ..Default::default()
        }
    }
}

/// Title accepts both the object form `{"text": ..}` and a bare string
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(from = "TitleRepr")]
pub struct Title {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

#[derive(Deserialize)]
#[serde(untagged)]
enum TitleRepr {
    Text(String),
    Full {
        #[serde(default)]
        text: Option<String>,
        #[serde(flatten)]
        extra: Map<String, Value>,
    },
}

impl From<TitleRepr> for Title {
    fn from(repr: TitleRepr) -> Self {
        match repr {
            TitleRepr::Text(text) => Title {
                text: Some(text),
                extra: Map::new(),
            },
            TitleRepr::Full { text, extra } => Title { text, extra },
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Axis {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<Title>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl Axis {
    pub fn title_text(&self) -> Option<&str> {
        self.title.as_ref().and_then(|t| t.text.as_deref())
    }
}

/// Plot margins in pixels
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Margin {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub l: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub r: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub t: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub b: Option<f64>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl Margin {
    pub fn new(l: f64, r: f64, t: f64, b: f64) -> Self {
        Self {
            l: Some(l),
            r: Some(r),
            t: Some(t),
            b: Some(b),
            extra: Map::new(),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Font {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub size: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub color: Option<String>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// Text annotation placed on the chart
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Annotation {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub xref: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub yref: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub x: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub y: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub font: Option<Font>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub opacity: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub xanchor: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub yanchor: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub xshift: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub yshift: Option<f64>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl Annotation {
    pub fn with_text(text: &str) -> Self {
        Self {
            text: Some(text.to_string()),
            ..Default::default()
        }
    }
}

/// Chart layout: the parts the exporter reads and patches
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Layout {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<Title>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub xaxis: Option<Axis>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub yaxis: Option<Axis>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub margin: Option<Margin>,
    #[serde(default)]
    pub annotations: Vec<Annotation>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl Layout {
    pub fn xaxis_title(&self) -> Option<&str> {
        self.xaxis.as_ref().and_then(Axis::title_text)
    }
}

/// Metadata the host page keeps on the chart node
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ChartGlobals {
    /// Index of the annotation that carries the command source
    #[serde(default)]
    pub cmd_idx: Option<usize>,
    #[serde(default)]
    pub cmd_src: Option<String>,
    /// Title text hidden from the interactive view
    #[serde(default)]
    pub title: Option<String>,
    /// Margin before the interactive view shrank it
    #[serde(default)]
    pub old_margin: Option<Margin>,
}

/// Partial relayout applied to a live chart
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct LayoutPatch {
    #[serde(rename = "title.text")]
    pub title_text: String,
    /// `None` leaves the margin untouched, `Some(None)` sends `null` so the
    /// chart falls back to its default margin
    #[serde(skip_serializing_if = "Option::is_none")]
    pub margin: Option<Option<Margin>>,
}

/// Chart node size in CSS pixels
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Viewport {
    pub width: u32,
    pub height: u32,
}

/// Options for the rendering library's native image download
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ImageDownloadOptions {
    pub format: String,
    pub width: u32,
    pub height: u32,
    pub filename: String,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_figure_from_plotly_json() {
        let figure: Figure = serde_json::from_value(json!({
            "data": [
                { "type": "scatter", "name": "AAPL", "x": [1, 2], "y": [10, 11], "mode": "lines" },
                { "type": "bar", "x": [1], "y": [2] },
                { "x": [1], "y": [2] }
            ],
            "layout": {
                "xaxis": { "title": { "text": "Date" } },
                "yaxis": { "title": "Price" },
                "margin": { "l": 10, "r": 20, "t": 30, "b": 40 },
                "template": "plotly_dark"
            }
        }))
        .unwrap();

        assert_eq!(figure.data[0].kind, TraceKind::Scatter);
        assert_eq!(figure.data[1].kind, TraceKind::Other);
        assert_eq!(figure.data[2].kind, TraceKind::Other);
        assert_eq!(figure.layout.xaxis_title(), Some("Date"));
        assert_eq!(
            figure.layout.yaxis.as_ref().and_then(Axis::title_text),
            Some("Price")
        );
        assert_eq!(figure.layout.margin, Some(Margin::new(10.0, 20.0, 30.0, 40.0)));
        assert_eq!(figure.layout.extra["template"], json!("plotly_dark"));
    }

    #[test]
    fn test_annotation_keeps_unknown_keys() {
        let raw = json!({
            "text": "cmd",
            "x": 0.5,
            "showarrow": false,
            "font": { "size": 12.5, "family": "Fira Code" }
        });
        let annotation: Annotation = serde_json::from_value(raw.clone()).unwrap();
        assert_eq!(annotation.extra["showarrow"], json!(false));
        assert_eq!(serde_json::to_value(&annotation).unwrap(), raw);
    }

    #[test]
    fn test_layout_patch_uses_dotted_path() {
        let patch = LayoutPatch {
            title_text: "AAPL".to_string(),
            margin: None,
        };
        assert_eq!(
            serde_json::to_value(&patch).unwrap(),
            json!({ "title.text": "AAPL" })
        );
    }

    #[test]
    fn test_layout_patch_can_clear_margin() {
        let patch = LayoutPatch {
            title_text: String::new(),
            margin: Some(None),
        };
        assert_eq!(
            serde_json::to_value(&patch).unwrap(),
            json!({ "title.text": "", "margin": null })
        );

        let patch = LayoutPatch {
            title_text: String::new(),
            margin: Some(Some(Margin::new(1.0, 2.0, 3.0, 4.0))),
        };
        assert_eq!(
            serde_json::to_value(&patch).unwrap()["margin"],
            json!({ "l": 1.0, "r": 2.0, "t": 3.0, "b": 4.0 })
        );
    }
}
