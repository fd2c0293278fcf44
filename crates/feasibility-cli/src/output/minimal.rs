use serde_json::Value;

use super::cell;

/// Fields printed by `--output minimal`, most important first.
const PRIORITY_KEYS: [&str; 6] = ["profit", "payable", "irr", "npv", "total", "project_npv"];

/// Print the single headline figure of a result.
pub fn print_minimal(value: &Value) {
    let result = value
        .as_object()
        .and_then(|m| m.get("result"))
        .unwrap_or(value);
    // Feasibility results carry their headline figures in the summary
    let target = result.get("summary").unwrap_or(result);

    if let Value::Object(map) = target {
        for key in PRIORITY_KEYS {
            if let Some(val) = map.get(key).filter(|v| !v.is_null()) {
                println!("{}", cell(val));
                return;
            }
        }
        if let Some((key, val)) = map.iter().next() {
            println!("{}: {}", key, cell(val));
            return;
        }
    }

    println!("{}", cell(target));
}
