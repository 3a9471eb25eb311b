//! Lenient readers for loosely typed record fields.
//!
//! The records service returns linked and lookup fields as arrays, numeric
//! formulas sometimes as strings, and simply omits empty cells. These helpers
//! collapse those shapes into the handful of Rust types the typed lookups use.

use averygate_core::records::FieldMap;
use serde_json::{Number, Value};

/// Render a field as text. Arrays are joined with `", "`; missing, null,
/// object and empty values are `None`.
pub fn text(fields: &FieldMap, key: &str) -> Option<String> {
    fields.get(key).and_then(value_text)
}

/// Read a field as a list of strings. A scalar becomes a one-element list.
pub fn list(fields: &FieldMap, key: &str) -> Vec<String> {
    match fields.get(key) {
        Some(Value::Array(items)) => items.iter().filter_map(value_text).collect(),
        Some(other) => value_text(other).into_iter().collect(),
        None => Vec::new(),
    }
}

/// Read a field as a number, defaulting to zero. Numeric strings are parsed
/// and single-element arrays are unwrapped.
pub fn number(fields: &FieldMap, key: &str) -> Number {
    fields
        .get(key)
        .and_then(value_number)
        .unwrap_or_else(|| Number::from(0))
}

fn value_text(value: &Value) -> Option<String> {
    match value {
        Value::String(s) if s.is_empty() => None,
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        Value::Array(items) => {
            let parts: Vec<String> = items.iter().filter_map(value_text).collect();
            if parts.is_empty() {
                None
            } else {
                Some(parts.join(", "))
            }
        }
        Value::Null | Value::Object(_) => None,
    }
}

fn value_number(value: &Value) -> Option<Number> {
    match value {
        Value::Number(n) => Some(n.clone()),
        Value::String(s) => {
            let s = s.trim();
            s.parse::<i64>()
                .map(Number::from)
                .ok()
                .or_else(|| s.parse::<f64>().ok().and_then(Number::from_f64))
        }
        Value::Array(items) if items.len() == 1 => value_number(&items[0]),
        _ => None,
    }
}
