//! Tabular view of a chart's series data

use chart_export_shared::{ExportError, ExportResult, Figure, Trace, TraceKind};
use serde_json::Value;

/// Header used for candlestick exports
pub const CANDLESTICK_COLUMNS: [&str; 5] = ["Date", "Open", "High", "Low", "Close"];

/// Header used for the x column when the x axis has no title
pub const DEFAULT_X_COLUMN: &str = "x";

/// Rectangular data ready for CSV serialization.
///
/// Rows may be shorter than `columns` while series with different x domains
/// are merged; missing trailing cells are emitted as empty fields.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Table {
    pub columns: Vec<String>,
    pub rows: Vec<Vec<Value>>,
}

impl Table {
    pub fn new(columns: Vec<String>, rows: Vec<Vec<Value>>) -> Self {
        Self { columns, rows }
    }

    /// Build the table for every candlestick or scatter series of a figure.
    ///
    /// Series of any other kind are skipped. Mixing candlestick and scatter
    /// series is rejected since their columns cannot be aligned.
    pub fn from_figure(figure: &Figure) -> ExportResult<Self> {
        let has_candles = figure.data.iter().any(|t| t.kind == TraceKind::Candlestick);
        let has_scatter = figure.data.iter().any(|t| t.kind == TraceKind::Scatter);
        if has_candles && has_scatter {
            return Err(ExportError::MixedSeries);
        }

        let x_title = figure
            .layout
            .xaxis_title()
            .unwrap_or(DEFAULT_X_COLUMN)
            .to_string();

        let mut table = Table::default();
        for trace in &figure.data {
            match trace.kind {
                TraceKind::Candlestick => table.push_candlestick(trace),
                TraceKind::Scatter => table.push_scatter(trace, &x_title),
                TraceKind::Other => {
                    log::trace!("Skipping series {:?} in tabular export", trace.name);
                }
            }
        }

        Ok(table)
    }

    fn push_candlestick(&mut self, trace: &Trace) {
        if self.columns.is_empty() {
            self.columns = CANDLESTICK_COLUMNS.iter().map(|c| c.to_string()).collect();
        }

        for (i, x) in trace.x.iter().enumerate() {
            self.rows.push(vec![
                x.clone(),
                value_at(&trace.open, i),
                value_at(&trace.high, i),
                value_at(&trace.low, i),
                value_at(&trace.close, i),
            ]);
        }
    }

    fn push_scatter(&mut self, trace: &Trace, x_title: &str) {
        if self.columns.is_empty() {
            self.columns.push(x_title.to_string());
        }
        self.columns.push(trace.name.clone().unwrap_or_default());
        let column = self.columns.len() - 1;

        for (i, x) in trace.x.iter().enumerate() {
            if i >= self.rows.len() {
                self.rows.resize_with(i + 1, Vec::new);
            }
            let row = &mut self.rows[i];
            if row.is_empty() {
                row.push(x.clone());
            }
            if row.len() < column {
                row.resize(column, Value::Null);
            }
            row.push(value_at(&trace.y, i));
        }
    }

    pub fn width(&self) -> usize {
        self.columns.len()
    }
}

fn value_at(values: &[Value], index: usize) -> Value {
    values.get(index).cloned().unwrap_or(Value::Null)
}
