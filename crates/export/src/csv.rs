//! Minimal CSV serialization
//!
//! Quotes inside a cell are doubled but cells are never wrapped in quotes, so
//! values containing commas or newlines do not survive a round trip through a
//! standard CSV reader.

use chart_export_shared::{Blob, CSV_MIME_TYPE};
use serde_json::Value;

use crate::table::Table;

/// Text form of a single cell
pub fn escape_cell(cell: &Value) -> String {
    match cell {
        Value::Null => String::new(),
        Value::Array(_) | Value::Object(_) => cell.to_string(),
        Value::String(s) => s.replace('"', "\"\""),
        Value::Number(n) => number_text(n),
        Value::Bool(b) => b.to_string(),
    }
}

/// Shortest round-trip text, as JavaScript's `Number.prototype.toString`
fn number_text(n: &serde_json::Number) -> String {
    match n.as_f64() {
        Some(f) => ryu_js::Buffer::new().format(f).to_string(),
        None => n.to_string(),
    }
}

/// Serialize header and rows, comma separated, newline joined, no trailing newline
pub fn to_csv(table: &Table) -> String {
    let width = table.columns.len();
    let mut lines = Vec::with_capacity(table.rows.len() + 1);
    lines.push(table.columns.join(","));

    for row in &table.rows {
        let mut fields: Vec<String> = row.iter().map(escape_cell).collect();
        if fields.len() < width {
            fields.resize(width, String::new());
        }
        lines.push(fields.join(","));
    }

    lines.join("\n")
}

/// Serialize and wrap as a downloadable blob
pub fn to_blob(table: &Table) -> Blob {
    Blob::from_text(to_csv(table), CSV_MIME_TYPE)
}
