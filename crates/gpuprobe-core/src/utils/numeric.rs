//! Tolerant numeric parsing.
//!
//! Vendor tools emit `N/A`, `[Not Supported]`, empty strings, `null`,
//! unit-suffixed strings (`"45 %"`) and `{ "value": 45, "unit": "C" }`
//! objects depending on version and metric support. Every adapter extracts
//! numbers through this module.
//!
//! Nothing here fails: unusable input is `None`, and only finite numbers
//! are ever returned. Adapters substitute 0 for `None`.

use serde_json::Value;

/// Parse a number from tool text.
///
/// Leading/trailing whitespace is ignored and only the first
/// whitespace-separated token is considered, so a trailing unit
/// (`"120.5 W"`) is dropped. A trailing `%` is stripped. Non-finite
/// values (`inf`, `NaN`) are rejected.
pub fn parse_number(raw: &str) -> Option<f64> {
    let token = raw.split_whitespace().next()?;
    let token = token.trim_end_matches('%');
    token.parse::<f64>().ok().filter(|v| v.is_finite())
}

/// Parse a number from a JSON leaf.
///
/// Accepts numbers, numeric strings and `{ "value": .. }` objects.
pub fn parse_number_value(value: &Value) -> Option<f64> {
    match value {
        Value::Number(n) => n.as_f64().filter(|v| v.is_finite()),
        Value::String(s) => parse_number(s),
        Value::Object(map) => map.get("value").and_then(parse_number_value),
        _ => None,
    }
}

/// Walk `path` through nested objects. Missing keys at any depth yield `None`.
pub fn lookup<'a>(root: &'a Value, path: &[&str]) -> Option<&'a Value> {
    path.iter().try_fold(root, |node, key| node.get(*key))
}

/// First path (in order) that resolves to a number.
pub fn first_number(root: &Value, paths: &[&[&str]]) -> Option<f64> {
    paths
        .iter()
        .find_map(|path| lookup(root, path).and_then(parse_number_value))
}

/// First path (in order) that resolves to non-empty text.
///
/// Numbers are rendered as text; `{ "value": .. }` objects are unwrapped.
pub fn first_text(root: &Value, paths: &[&[&str]]) -> Option<String> {
    paths.iter().find_map(|path| lookup(root, path).and_then(leaf_text))
}

fn leaf_text(value: &Value) -> Option<String> {
    match value {
        Value::String(s) if !s.trim().is_empty() => Some(s.trim().to_string()),
        Value::Number(n) => Some(n.to_string()),
        Value::Object(map) => map.get("value").and_then(leaf_text),
        _ => None,
    }
}

/// Convert a parsed number into a device index.
///
/// Only finite, non-negative integral values within `u32` qualify.
#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
pub fn as_index(value: f64) -> Option<u32> {
    let valid = value.is_finite()
        && value >= 0.0
        && value.fract() == 0.0
        && value <= f64::from(u32::MAX);
    valid.then(|| value as u32)
}
