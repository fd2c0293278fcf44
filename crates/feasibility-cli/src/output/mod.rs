pub mod csv_out;
pub mod json;
pub mod minimal;
pub mod table;

use crate::OutputFormat;
use serde_json::Value;

pub fn format_output(format: &OutputFormat, value: &Value) {
    match format {
        OutputFormat::Json => json::print_json(value),
        OutputFormat::Table => table::print_table(value),
        OutputFormat::Csv => csv_out::print_csv(value),
        OutputFormat::Minimal => minimal::print_minimal(value),
    }
}

/// Render a scalar or small structure as a single cell.
pub(crate) fn cell(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Number(n) => n.to_string(),
        Value::Bool(b) => b.to_string(),
        Value::Null => String::new(),
        Value::Object(map) => irr_cell(map).unwrap_or_else(|| {
            map.iter()
                .map(|(k, v)| format!("{k}={}", cell(v)))
                .collect::<Vec<_>>()
                .join(" ")
        }),
        Value::Array(items) => items.iter().map(cell).collect::<Vec<_>>().join(", "),
    }
}

/// `{"status": "defined", "rate": ..}` prints as the rate, undefined as its reason.
fn irr_cell(map: &serde_json::Map<String, Value>) -> Option<String> {
    match map.get("status")?.as_str()? {
        "defined" => map.get("rate").map(cell),
        "undefined" => Some(format!("undefined ({})", map.get("reason").map(cell)?)),
        _ => None,
    }
}
