//! Temporary branding for vector exports
//!
//! Before an SVG capture the watermark is appended to the chart's annotations,
//! the command-source annotation gets its text, and the hidden title and
//! original margin are restored. Afterwards all of it is undone. Calls must be
//! paired init -> capture -> restore on one chart; a restore without an init
//! removes the wrong annotation.

use chart_export_shared::{Annotation, ChartGlobals, Font, Layout, LayoutPatch, Margin};
use serde_json::{json, Map};

pub const WATERMARK_TEXT: &str = "OpenBB Terminal";

/// The default branding annotation, anchored to the bottom-right corner
pub fn default_watermark() -> Annotation {
    Annotation {
        text: Some(WATERMARK_TEXT.to_string()),
        xref: Some("paper".to_string()),
        yref: Some("paper".to_string()),
        x: Some(json!(1)),
        y: Some(json!(0)),
        font: Some(Font {
            size: Some(17.0),
            color: Some("gray".to_string()),
            extra: Map::new(),
        }),
        opacity: Some(0.5),
        xanchor: Some("right".to_string()),
        yanchor: Some("bottom".to_string()),
        xshift: Some(40.0),
        yshift: Some(-80.0),
        extra: Map::new(),
    }
}

/// What has to be put back after the capture
#[derive(Debug, Clone, PartialEq)]
pub struct WatermarkState {
    pub margin: Option<Margin>,
    pub insertion_index: usize,
}

impl WatermarkState {
    /// Record the current margin and where the watermark will be inserted
    pub fn capture(layout: &Layout) -> Self {
        Self {
            margin: layout.margin.clone(),
            insertion_index: layout.annotations.len(),
        }
    }
}

#[derive(Debug, Clone)]
pub struct WatermarkToggler {
    watermark: Annotation,
}

impl Default for WatermarkToggler {
    fn default() -> Self {
        Self::new(default_watermark())
    }
}

impl WatermarkToggler {
    pub fn new(watermark: Annotation) -> Self {
        Self { watermark }
    }

    pub fn watermark(&self) -> &Annotation {
        &self.watermark
    }

    /// Mutate `layout.annotations` and return the relayout to apply.
    ///
    /// `is_init` adds the decorations; otherwise they are removed and `margin`
    /// is restored.
    pub fn apply(
        &self,
        layout: &mut Layout,
        globals: &ChartGlobals,
        margin: Option<&Margin>,
        insertion_index: usize,
        is_init: bool,
    ) -> LayoutPatch {
        if is_init {
            layout.annotations.push(self.watermark.clone());
            if let Some(src) = &globals.cmd_src {
                set_command_text(layout, globals.cmd_idx, src);
            }

            return LayoutPatch {
                title_text: globals.title.clone().unwrap_or_default(),
                margin: globals.old_margin.clone().map(Some),
            };
        }

        if globals.cmd_src.is_some() {
            set_command_text(layout, globals.cmd_idx, "");
        }
        if insertion_index < layout.annotations.len() {
            layout.annotations.remove(insertion_index);
        } else {
            log::warn!(
                "Watermark index {insertion_index} out of range ({} annotations), nothing removed",
                layout.annotations.len()
            );
        }

        // Always sent: a chart that had no margin must lose the one set by init.
        LayoutPatch {
            title_text: String::new(),
            margin: Some(margin.cloned()),
        }
    }

    pub fn init(&self, layout: &mut Layout, globals: &ChartGlobals, state: &WatermarkState) -> LayoutPatch {
        self.apply(layout, globals, state.margin.as_ref(), state.insertion_index, true)
    }

    pub fn restore(&self, layout: &mut Layout, globals: &ChartGlobals, state: &WatermarkState) -> LayoutPatch {
        self.apply(layout, globals, state.margin.as_ref(), state.insertion_index, false)
    }
}

fn set_command_text(layout: &mut Layout, index: Option<usize>, text: &str) {
    match index.and_then(|i| layout.annotations.get_mut(i)) {
        Some(annotation) => annotation.text = Some(text.to_string()),
        None => log::debug!("No command-source annotation at {index:?}"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn chart_layout() -> Layout {
        Layout {
            margin: Some(Margin::new(10.0, 20.0, 5.0, 5.0)),
            annotations: vec![Annotation::with_text("EMA 20"), Annotation::with_text("")],
            ..Default::default()
        }
    }

    fn chart_globals() -> ChartGlobals {
        ChartGlobals {
            cmd_idx: Some(1),
            cmd_src: Some("/stocks/candle AAPL".to_string()),
            title: Some("AAPL".to_string()),
            old_margin: Some(Margin::new(80.0, 50.0, 50.0, 80.0)),
        }
    }

    #[test]
    fn test_init_adds_watermark_and_command() {
        let toggler = WatermarkToggler::default();
        let mut layout = chart_layout();
        let globals = chart_globals();
        let state = WatermarkState::capture(&layout);

        let patch = toggler.init(&mut layout, &globals, &state);

        assert_eq!(state.insertion_index, 2);
        assert_eq!(layout.annotations.len(), 3);
        assert_eq!(layout.annotations[2].text.as_deref(), Some(WATERMARK_TEXT));
        assert_eq!(layout.annotations[1].text.as_deref(), Some("/stocks/candle AAPL"));
        assert_eq!(patch.title_text, "AAPL");
        assert_eq!(patch.margin, Some(globals.old_margin.clone()));
    }

    #[test]
    fn test_init_then_restore_is_identity() {
        let toggler = WatermarkToggler::default();
        let original = chart_layout();
        let mut layout = original.clone();
        let globals = chart_globals();
        let state = WatermarkState::capture(&layout);

        toggler.init(&mut layout, &globals, &state);
        let patch = toggler.restore(&mut layout, &globals, &state);

        assert_eq!(layout.annotations, original.annotations);
        assert_eq!(patch.margin, Some(original.margin.clone()));
        assert_eq!(patch.title_text, "");
        assert_eq!(
            serde_json::to_string(&layout).unwrap(),
            serde_json::to_string(&original).unwrap()
        );
    }

    #[test]
    fn test_without_command_source() {
        let toggler = WatermarkToggler::default();
        let mut layout = chart_layout();
        let globals = ChartGlobals::default();
        let state = WatermarkState::capture(&layout);

        let patch = toggler.init(&mut layout, &globals, &state);
        assert_eq!(layout.annotations[1].text.as_deref(), Some(""));
        assert_eq!(patch.title_text, "");
        assert_eq!(patch.margin, None);

        toggler.restore(&mut layout, &globals, &state);
        assert_eq!(layout.annotations, chart_layout().annotations);
    }

    #[test]
    fn test_restore_clears_margin_chart_never_had() {
        let toggler = WatermarkToggler::default();
        let mut layout = Layout::default();
        let globals = chart_globals();
        let state = WatermarkState::capture(&layout);

        let init = toggler.init(&mut layout, &globals, &state);
        assert_eq!(init.margin, Some(Some(Margin::new(80.0, 50.0, 50.0, 80.0))));

        let restore = toggler.restore(&mut layout, &globals, &state);
        assert_eq!(restore.margin, Some(None));
        assert_eq!(
            serde_json::to_value(&restore).unwrap(),
            json!({ "title.text": "", "margin": null })
        );
        assert!(layout.annotations.is_empty());
    }

    #[test]
    fn test_restore_out_of_range_is_skipped() {
        let toggler = WatermarkToggler::default();
        let mut layout = chart_layout();
        let state = WatermarkState {
            margin: None,
            insertion_index: 7,
        };

        toggler.restore(&mut layout, &ChartGlobals::default(), &state);
        assert_eq!(layout.annotations.len(), 2);
    }
}
