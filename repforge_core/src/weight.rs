//! Weight normalization.
//!
//! All persisted weights are stored in pounds. Input arrives either as a
//! number (already pounds) or as free text written by a person or a model:
//! `"15 lbs"`, `"10kg"`, `"5-8 lbs"`.

use crate::types::WeightInput;
use once_cell::sync::Lazy;
use regex::Regex;
use serde_json::Value;

/// Pounds per kilogram
pub const LBS_PER_KG: f64 = 2.20462;

static NUMBER_TOKEN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\d+(?:\.\d+)?").expect("valid number regex"));

/// Normalize free-form weight text to pounds
///
/// Takes the first numeric token as the magnitude. Text mentioning `kg` is
/// converted. Returns `None` when no number can be found.
pub fn normalize_weight_text(text: &str) -> Option<f64> {
    let magnitude: f64 = NUMBER_TOKEN.find(text)?.as_str().parse().ok()?;
    if text.to_lowercase().contains("kg") {
        Some(magnitude * LBS_PER_KG)
    } else {
        Some(magnitude)
    }
}

/// Normalize a weight that may already be numeric
pub fn normalize_weight(input: &WeightInput) -> Option<f64> {
    match input {
        WeightInput::Number(n) if n.is_finite() => Some(*n),
        WeightInput::Number(_) => None,
        WeightInput::Text(text) => normalize_weight_text(text),
    }
}

/// Normalize a raw JSON weight field from an editor payload
pub fn normalize_weight_value(value: &Value) -> Option<f64> {
    match value {
        Value::Number(n) => n.as_f64().filter(|f| f.is_finite()),
        Value::String(s) => normalize_weight_text(s),
        _ => None,
    }
}
