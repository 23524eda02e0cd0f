//! Core domain types for repforge.
//!
//! This module defines the fundamental types used throughout the system:
//! - Structured workouts as produced by providers or the fallback catalog
//! - Exercise specifications accepted by the routine editor
//! - Persisted routines and their ordered exercises
//! - Performance history fed back into generation

use crate::difficulty::Difficulty;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;

// ============================================================================
// Loose value parsing
// ============================================================================

/// Parse a JSON value the way editor forms and model output deliver numbers
///
/// Numbers are truncated toward zero, strings yield their leading integer
/// (`"12 reps"` → 12, `"8-12"` → 8). Anything else is `None`.
pub fn parse_loose_int(value: &Value) -> Option<i64> {
    match value {
        Value::Number(n) => n
            .as_i64()
            .or_else(|| n.as_f64().filter(|f| f.is_finite()).map(|f| f.trunc() as i64)),
        Value::String(s) => {
            let trimmed = s.trim_start();
            let (sign, digits) = match trimmed.strip_prefix('-') {
                Some(rest) => (-1, rest),
                None => (1, trimmed.strip_prefix('+').unwrap_or(trimmed)),
            };
            let end = digits
                .find(|c: char| !c.is_ascii_digit())
                .unwrap_or(digits.len());
            digits[..end].parse::<i64>().ok().map(|n| sign * n)
        }
        _ => None,
    }
}

/// Non-negative variant of [`parse_loose_int`]
pub fn parse_loose_u32(value: &Value) -> Option<u32> {
    parse_loose_int(value).and_then(|n| u32::try_from(n).ok())
}

fn lenient_u32<'de, D>(deserializer: D) -> std::result::Result<Option<u32>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<Value>::deserialize(deserializer)?;
    Ok(value.as_ref().and_then(parse_loose_u32))
}

pub(crate) fn lenient_string<'de, D>(deserializer: D) -> std::result::Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<Value>::deserialize(deserializer)?;
    Ok(match value {
        Some(Value::String(s)) => Some(s),
        Some(Value::Number(n)) => Some(n.to_string()),
        _ => None,
    })
}

fn lenient_weight<'de, D>(deserializer: D) -> std::result::Result<Option<WeightInput>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<Value>::deserialize(deserializer)?;
    Ok(match value {
        Some(Value::Number(n)) => n.as_f64().map(WeightInput::Number),
        Some(Value::String(s)) => Some(WeightInput::Text(s)),
        _ => None,
    })
}

fn lenient_workout_category<'de, D>(
    deserializer: D,
) -> std::result::Result<WorkoutCategory, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<Value>::deserialize(deserializer)?;
    Ok(value
        .as_ref()
        .and_then(Value::as_str)
        .and_then(WorkoutCategory::from_loose)
        .unwrap_or_default())
}

fn lenient_phase<'de, D>(deserializer: D) -> std::result::Result<ExercisePhase, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<Value>::deserialize(deserializer)?;
    Ok(value
        .as_ref()
        .and_then(Value::as_str)
        .and_then(ExercisePhase::from_loose)
        .unwrap_or_default())
}

// ============================================================================
// Structured Workout Types
// ============================================================================

/// Overall category of a generated workout
#[derive(Clone, Copy, Debug, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum WorkoutCategory {
    Strength,
    Cardio,
    #[default]
    FullBody,
    Flexibility,
}

impl WorkoutCategory {
    /// Accepts the spellings models tend to produce ("full body", "Full-Body", ...)
    pub fn from_loose(raw: &str) -> Option<Self> {
        let key: String = raw
            .trim()
            .to_lowercase()
            .chars()
            .filter(|c| c.is_ascii_alphanumeric())
            .collect();
        match key.as_str() {
            "strength" => Some(Self::Strength),
            "cardio" => Some(Self::Cardio),
            "fullbody" => Some(Self::FullBody),
            "flexibility" | "mobility" => Some(Self::Flexibility),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Strength => "strength",
            Self::Cardio => "cardio",
            Self::FullBody => "full_body",
            Self::Flexibility => "flexibility",
        }
    }
}

/// Where an exercise sits inside a workout
#[derive(Clone, Copy, Debug, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum ExercisePhase {
    Warmup,
    #[default]
    Main,
    Cooldown,
}

impl ExercisePhase {
    pub fn from_loose(raw: &str) -> Option<Self> {
        let key: String = raw
            .trim()
            .to_lowercase()
            .chars()
            .filter(|c| c.is_ascii_alphanumeric())
            .collect();
        match key.as_str() {
            "warmup" => Some(Self::Warmup),
            "main" => Some(Self::Main),
            "cooldown" => Some(Self::Cooldown),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Warmup => "warmup",
            Self::Main => "main",
            Self::Cooldown => "cooldown",
        }
    }
}

/// Weight as written by a person or a model: a number or free text
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
#[serde(untagged)]
pub enum WeightInput {
    Number(f64),
    Text(String),
}

impl From<f64> for WeightInput {
    fn from(value: f64) -> Self {
        Self::Number(value)
    }
}

impl From<&str> for WeightInput {
    fn from(value: &str) -> Self {
        Self::Text(value.to_string())
    }
}

/// One exercise inside a structured workout
#[derive(Clone, Debug, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct WorkoutExercise {
    #[serde(default)]
    pub name: String,
    #[serde(default, deserialize_with = "lenient_string")]
    pub description: Option<String>,
    #[serde(default, deserialize_with = "lenient_phase")]
    pub category: ExercisePhase,
    #[serde(default, deserialize_with = "lenient_u32")]
    pub sets: Option<u32>,
    #[serde(default, deserialize_with = "lenient_u32")]
    pub reps: Option<u32>,
    /// Seconds, for time-based exercises
    #[serde(default, deserialize_with = "lenient_u32")]
    pub duration: Option<u32>,
    #[serde(default, deserialize_with = "lenient_u32")]
    pub rest_between_sets: Option<u32>,
    #[serde(default, deserialize_with = "lenient_string")]
    pub equipment: Option<String>,
    #[serde(default, deserialize_with = "lenient_weight")]
    pub weight: Option<WeightInput>,
    #[serde(default, deserialize_with = "lenient_string")]
    pub band_strength: Option<String>,
    #[serde(default, deserialize_with = "lenient_string")]
    pub notes: Option<String>,
}

/// A complete workout, whichever source produced it
#[derive(Clone, Debug, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct StructuredWorkout {
    pub name: String,
    #[serde(default, deserialize_with = "lenient_string")]
    pub description: Option<String>,
    /// Minutes
    #[serde(default, deserialize_with = "lenient_u32")]
    pub estimated_duration: Option<u32>,
    #[serde(default, deserialize_with = "lenient_workout_category")]
    pub category: WorkoutCategory,
    #[serde(default)]
    pub exercises: Vec<WorkoutExercise>,
    #[serde(default, deserialize_with = "lenient_string")]
    pub ai_notes: Option<String>,
    /// Verbatim provider text, present only on degraded results
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub raw_response: Option<String>,
}

// ============================================================================
// Generation Types
// ============================================================================

impl StructuredWorkout {
    /// Describe a saved routine in the same shape providers return
    pub fn from_saved(routine: &Routine, exercises: &[PersistedExercise]) -> Self {
        Self {
            name: routine.name.clone(),
            description: routine.description.clone(),
            estimated_duration: routine.estimated_duration,
            category: routine
                .category
                .as_deref()
                .and_then(WorkoutCategory::from_loose)
                .unwrap_or_default(),
            exercises: exercises
                .iter()
                .map(|e| WorkoutExercise {
                    name: e.name.clone(),
                    description: e.description.clone(),
                    category: ExercisePhase::from_loose(&e.category).unwrap_or_default(),
                    sets: Some(e.sets),
                    reps: match e.modality {
                        Modality::Reps => Some(e.reps),
                        Modality::Time => None,
                    },
                    duration: e.duration,
                    rest_between_sets: Some(e.rest_between_sets),
                    equipment: None,
                    weight: e.weight.map(WeightInput::Number),
                    band_strength: e.band_strength.clone(),
                    notes: Some(e.notes.clone()).filter(|n| !n.is_empty()),
                })
                .collect(),
            ai_notes: None,
            raw_response: None,
        }
    }
}

/// Provenance tag used when no provider produced the workout
pub const FALLBACK_PROVENANCE: &str = "fallback";

/// Summary of past performance for one exercise, fed to providers as context
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct PerformanceRecord {
    pub exercise_name: String,
    pub performed_at: DateTime<Utc>,
    pub sets: u32,
    #[serde(default)]
    pub reps: Option<u32>,
    #[serde(default)]
    pub duration: Option<u32>,
    #[serde(default)]
    pub weight: Option<f64>,
    #[serde(default)]
    pub band_strength: Option<String>,
    pub difficulty: Difficulty,
}

/// Result of one generation call
#[derive(Clone, Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GenerationResult {
    pub workout: StructuredWorkout,
    /// Provider id, or [`FALLBACK_PROVENANCE`]
    pub provenance: String,
    pub degraded: bool,
    /// Providers that failed before the result was produced, in call order
    #[serde(skip)]
    pub failures: Vec<crate::providers::ProviderFailure>,
}

impl GenerationResult {
    pub fn is_fallback(&self) -> bool {
        self.provenance == FALLBACK_PROVENANCE
    }
}

// ============================================================================
// Routine and Exercise Types
// ============================================================================

/// How an exercise template is measured
#[derive(Clone, Copy, Debug, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum Modality {
    #[default]
    Reps,
    Time,
}

impl Modality {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Reps => "reps",
            Self::Time => "time",
        }
    }

    /// Unknown values read as reps
    pub fn parse(raw: &str) -> Self {
        match raw.trim().to_lowercase().as_str() {
            "time" | "timed" | "duration" => Self::Time,
            _ => Self::Reps,
        }
    }
}

/// A stored routine
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Routine {
    pub id: i64,
    pub user_id: String,
    pub name: String,
    pub description: Option<String>,
    pub category: Option<String>,
    /// Minutes
    pub estimated_duration: Option<u32>,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
}

/// Fields needed to create a routine
#[derive(Clone, Debug, Default)]
pub struct NewRoutine {
    pub user_id: String,
    pub name: String,
    pub description: Option<String>,
    pub category: Option<String>,
    pub estimated_duration: Option<u32>,
}

/// One exercise as submitted by the routine editor
///
/// Numeric fields arrive as whatever the form produced, so they are kept as
/// raw JSON and normalized at persistence time.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExerciseSpec {
    pub name: Option<String>,
    pub description: Option<String>,
    pub category: Option<String>,
    /// "reps" or "time"
    #[serde(rename = "type")]
    pub modality: Option<String>,
    pub sets: Option<Value>,
    pub reps: Option<Value>,
    /// Seconds; the editor sends it as `time` for timed exercises
    pub duration: Option<Value>,
    pub time: Option<Value>,
    pub weight: Option<Value>,
    pub band_strength: Option<String>,
    pub rest_between_sets: Option<Value>,
    pub notes: Option<String>,
    /// Form instructions kept on the exercise itself
    pub instructions: Option<String>,
}

impl ExerciseSpec {
    /// Convert a generated exercise into an editor spec
    pub fn from_workout_exercise(exercise: &WorkoutExercise) -> Self {
        let modality = match (exercise.reps, exercise.duration) {
            (None, Some(_)) => Modality::Time,
            _ => Modality::Reps,
        };
        let weight = exercise.weight.as_ref().map(|w| match w {
            WeightInput::Number(n) => Value::from(*n),
            WeightInput::Text(t) => Value::from(t.clone()),
        });

        Self {
            name: Some(exercise.name.clone()),
            description: exercise.description.clone(),
            category: Some(exercise.category.as_str().to_string()),
            modality: Some(modality.as_str().to_string()),
            sets: exercise.sets.map(Value::from),
            reps: exercise.reps.map(Value::from),
            duration: exercise.duration.map(Value::from),
            time: None,
            weight,
            band_strength: exercise.band_strength.clone(),
            rest_between_sets: exercise.rest_between_sets.map(Value::from),
            notes: exercise.notes.clone(),
            instructions: exercise.notes.clone(),
        }
    }
}

/// An exercise as persisted on a routine, with its assigned order
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct PersistedExercise {
    pub exercise_id: i64,
    pub template_id: i64,
    /// 1-based position within the routine
    pub order: u32,
    pub name: String,
    pub description: Option<String>,
    pub instructions: Option<String>,
    pub category: String,
    pub modality: Modality,
    pub sets: u32,
    pub reps: u32,
    pub duration: Option<u32>,
    /// Pounds
    pub weight: Option<f64>,
    pub band_strength: Option<String>,
    pub rest_between_sets: u32,
    pub notes: String,
}

/// A routine created from a generated workout
#[derive(Clone, Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SavedRoutine {
    pub routine: Routine,
    pub exercises: Vec<PersistedExercise>,
}

// ============================================================================
// Session and Performance Types
// ============================================================================

/// A recorded workout session
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct WorkoutSession {
    pub id: i64,
    pub user_id: String,
    pub routine_id: Option<i64>,
    pub started_at: DateTime<Utc>,
    pub completed_at: Option<DateTime<Utc>>,
    pub notes: Option<String>,
}

/// One performed set to record
#[derive(Clone, Debug, Default)]
pub struct NewSetPerformance {
    pub session_id: i64,
    pub template_id: Option<i64>,
    pub exercise_name: String,
    pub set_number: u32,
    pub reps: Option<u32>,
    pub duration: Option<u32>,
    pub weight: Option<f64>,
    pub band_strength: Option<String>,
    pub difficulty: Option<Difficulty>,
    pub notes: Option<String>,
}

/// A recorded set, as read back from storage
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct SetPerformance {
    pub id: i64,
    pub session_id: i64,
    pub template_id: Option<i64>,
    pub exercise_name: String,
    pub set_number: u32,
    pub reps: Option<u32>,
    pub duration: Option<u32>,
    pub weight: Option<f64>,
    pub band_strength: Option<String>,
    pub difficulty: Option<Difficulty>,
    pub notes: Option<String>,
    pub completed_at: DateTime<Utc>,
}

/// Per-exercise roll-up inside a session summary
#[derive(Clone, Debug, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ExerciseSummary {
    pub name: String,
    pub sets: u32,
    pub reps: Option<u32>,
    pub duration: Option<u32>,
    pub weight: Option<f64>,
    pub band_strength: Option<String>,
    pub difficulty: Difficulty,
}

/// Summary of one completed (or in-progress) session
#[derive(Clone, Debug, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct SessionSummary {
    pub session: WorkoutSession,
    pub routine_name: String,
    /// Minutes between start and completion, 0 while in progress
    pub duration_minutes: i64,
    pub exercises: Vec<ExerciseSummary>,
    pub total_sets: u32,
}
