//! Structured workout extraction from free-form provider text.
//!
//! Providers are asked for JSON but routinely wrap it in commentary. The
//! extractor takes the first balanced `{...}` run in the text and parses it.
//! This is a substring match, not a parser for the surrounding prose: an
//! unrelated brace before the payload produces a bad candidate, and that
//! case lands on the degraded path like any other failure.

use crate::types::{StructuredWorkout, WorkoutCategory};
use serde::de::DeserializeOwned;
use serde_json::Value;

/// Name given to workouts that could not be extracted
pub const DEGRADED_WORKOUT_NAME: &str = "AI Generated Workout";

const DEGRADED_DURATION_MINUTES: u32 = 45;
const DEGRADED_NOTES: &str =
    "AI generated this workout based on your request. Please review and adjust as needed.";

/// Outcome of extracting a workout from provider text
#[derive(Clone, Debug, PartialEq)]
pub struct Extraction {
    pub workout: StructuredWorkout,
    pub degraded: bool,
}

/// Why strict extraction failed (diagnostics only)
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ExtractionFailure {
    NoJsonObject,
    Parse(String),
    MissingName,
    MissingExercises,
    /// None of the expected top-level keys were present
    MissingKeys(Vec<String>),
}

/// Locate the first balanced `{...}` substring
///
/// Braces inside JSON string literals are ignored so that a payload like
/// `{"notes": "use {tempo}"}` stays intact.
pub fn find_json_object(text: &str) -> Option<&str> {
    let start = text.find('{')?;
    let mut depth = 0usize;
    let mut in_string = false;
    let mut escaped = false;

    for (offset, ch) in text[start..].char_indices() {
        if in_string {
            match ch {
                _ if escaped => escaped = false,
                '\\' => escaped = true,
                '"' => in_string = false,
                _ => {}
            }
            continue;
        }

        match ch {
            '"' => in_string = true,
            '{' => depth += 1,
            '}' => {
                depth -= 1;
                if depth == 0 {
                    return Some(&text[start..start + offset + 1]);
                }
            }
            _ => {}
        }
    }

    None
}

/// Strictly extract and validate a workout
pub fn try_extract(text: &str) -> std::result::Result<StructuredWorkout, ExtractionFailure> {
    let candidate = find_json_object(text).ok_or(ExtractionFailure::NoJsonObject)?;
    let value: Value =
        serde_json::from_str(candidate).map_err(|e| ExtractionFailure::Parse(e.to_string()))?;

    let name_ok = value
        .get("name")
        .and_then(Value::as_str)
        .is_some_and(|name| !name.trim().is_empty());
    if !name_ok {
        return Err(ExtractionFailure::MissingName);
    }
    if !value.get("exercises").is_some_and(Value::is_array) {
        return Err(ExtractionFailure::MissingExercises);
    }

    serde_json::from_value(value).map_err(|e| ExtractionFailure::Parse(e.to_string()))
}

/// Strictly extract an arbitrary answer object
///
/// The first balanced object must carry at least one of `keys` and then
/// deserialize as `T`.
pub fn try_extract_object<T: DeserializeOwned>(
    text: &str,
    keys: &[&str],
) -> std::result::Result<T, ExtractionFailure> {
    let candidate = find_json_object(text).ok_or(ExtractionFailure::NoJsonObject)?;
    let value: Value =
        serde_json::from_str(candidate).map_err(|e| ExtractionFailure::Parse(e.to_string()))?;

    if !keys.iter().any(|key| value.get(key).is_some()) {
        return Err(ExtractionFailure::MissingKeys(
            keys.iter().map(|k| k.to_string()).collect(),
        ));
    }

    serde_json::from_value(value).map_err(|e| ExtractionFailure::Parse(e.to_string()))
}

/// Extract a workout, degrading instead of failing
pub fn extract_workout(text: &str) -> Extraction {
    match try_extract(text) {
        Ok(workout) => Extraction {
            workout,
            degraded: false,
        },
        Err(failure) => {
            tracing::warn!("Workout extraction degraded: {:?}", failure);
            Extraction {
                workout: degraded_workout(text),
                degraded: true,
            }
        }
    }
}

/// Placeholder workout that keeps the provider text verbatim
pub fn degraded_workout(raw: &str) -> StructuredWorkout {
    StructuredWorkout {
        name: DEGRADED_WORKOUT_NAME.to_string(),
        description: Some(raw.to_string()),
        estimated_duration: Some(DEGRADED_DURATION_MINUTES),
        category: WorkoutCategory::FullBody,
        exercises: Vec::new(),
        ai_notes: Some(DEGRADED_NOTES.to_string()),
        raw_response: Some(raw.to_string()),
    }
}
