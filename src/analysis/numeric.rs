//! Numeric extraction from loosely-typed JSON fragments
//!
//! Vision model responses routinely mix numbers, numeric strings, and junk
//! inside the same array. These helpers pull out the well-formed finite
//! values and drop everything else.

use serde_json::Value;

/// Coerce a single JSON value to a finite f64 if possible.
/// Accepts numbers and numeric strings; rejects NaN/infinity and anything else.
pub fn as_finite_f64(value: &Value) -> Option<f64> {
    let n = match value {
        Value::Number(n) => n.as_f64()?,
        Value::String(s) => s.trim().trim_start_matches('$').replace(',', "").parse().ok()?,
        _ => return None,
    };
    n.is_finite().then_some(n)
}

/// Extract all well-formed finite numbers from a JSON value expected to be
/// an array. Non-arrays and unparsable entries yield an empty/shorter list
/// rather than an error.
pub fn finite_f64_list(value: &Value) -> Vec<f64> {
    match value {
        Value::Array(items) => items.iter().filter_map(as_finite_f64).collect(),
        _ => Vec::new(),
    }
}

/// Extract a list of strings, defaulting to empty if the value is not a list.
/// Non-string entries are stringified if scalar, dropped otherwise.
pub fn string_list(value: &Value) -> Vec<String> {
    match value {
        Value::Array(items) => items
            .iter()
            .filter_map(|item| match item {
                Value::String(s) => Some(s.clone()),
                Value::Number(n) => Some(n.to_string()),
                Value::Bool(b) => Some(b.to_string()),
                _ => None,
            })
            .collect(),
        _ => Vec::new(),
    }
}
