//! Coaching answers beyond whole-workout generation.
//!
//! Each call sends one prompt down the provider chain and reads the first
//! JSON object out of the reply. A reply that cannot be read becomes a
//! degraded answer carrying the provider's text, the same way workout
//! extraction degrades. Unlike workout generation there is no local
//! fallback: with no answering provider the call fails.

use crate::providers::ProviderFailure;
use crate::types::{lenient_string, StructuredWorkout};
use crate::{Error, Result};
use serde::{Deserialize, Serialize};

/// Name given to exercises that could not be extracted
pub const DEGRADED_EXERCISE_NAME: &str = "AI Generated Exercise";

const DEGRADED_EXERCISE_CATEGORY: &str = "strength";
const DEGRADED_EXERCISE_EQUIPMENT: &str = "bodyweight";
const DEGRADED_TARGET_MUSCLES: &str = "various";
const DEGRADED_SAFETY_TIPS: &str =
    "Please consult with a fitness professional before attempting new exercises.";

/// A parsed coaching answer and the provider that gave it
#[derive(Clone, Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Coached<T> {
    #[serde(flatten)]
    pub answer: T,
    pub provenance: String,
    pub degraded: bool,
    /// Providers that failed before one answered
    #[serde(skip)]
    pub failures: Vec<ProviderFailure>,
}

// ============================================================================
// Routine optimization
// ============================================================================

#[derive(Clone, Copy, Debug, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum ChangeKind {
    Substitution,
    Adjustment,
    Addition,
    Removal,
    #[default]
    #[serde(other)]
    Other,
}

/// One suggested change to a routine
#[derive(Clone, Debug, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Optimization {
    #[serde(rename = "type", default)]
    pub kind: ChangeKind,
    #[serde(default, deserialize_with = "lenient_string")]
    pub exercise_name: Option<String>,
    #[serde(default)]
    pub suggestion: String,
    #[serde(default, deserialize_with = "lenient_string")]
    pub reason: Option<String>,
}

/// Suggested changes plus an optional rewritten routine
///
/// `new_routine` is `None` when the provider proposed changes without a
/// full rewrite.
#[derive(Clone, Debug, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct OptimizationPlan {
    #[serde(default)]
    pub optimizations: Vec<Optimization>,
    #[serde(default)]
    pub new_routine: Option<StructuredWorkout>,
    #[serde(default, deserialize_with = "lenient_string")]
    pub ai_notes: Option<String>,
    /// Verbatim provider text, present only on degraded plans
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub raw_response: Option<String>,
}

impl OptimizationPlan {
    /// Top-level keys that mark a reply as a plan
    pub const KEYS: &'static [&'static str] = &["optimizations", "newRoutine"];

    /// Degraded plan: the routine as it was, the reply kept as notes
    pub fn unchanged(routine: &StructuredWorkout, raw: &str) -> Self {
        Self {
            optimizations: Vec::new(),
            new_routine: Some(routine.clone()),
            ai_notes: Some(raw.to_string()),
            raw_response: Some(raw.to_string()),
        }
    }
}

// ============================================================================
// Exercise replacements
// ============================================================================

/// An alternative to one exercise
#[derive(Clone, Debug, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Replacement {
    pub name: String,
    #[serde(default, deserialize_with = "lenient_string")]
    pub description: Option<String>,
    #[serde(default, deserialize_with = "lenient_string")]
    pub equipment: Option<String>,
    /// beginner, intermediate or advanced
    #[serde(default, deserialize_with = "lenient_string")]
    pub difficulty: Option<String>,
    #[serde(default, deserialize_with = "lenient_string")]
    pub reason: Option<String>,
}

#[derive(Clone, Debug, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ReplacementSuggestions {
    #[serde(default)]
    pub original_exercise: String,
    #[serde(default)]
    pub replacements: Vec<Replacement>,
    #[serde(default, deserialize_with = "lenient_string")]
    pub ai_notes: Option<String>,
}

impl ReplacementSuggestions {
    pub const KEYS: &'static [&'static str] = &["replacements"];

    pub fn none_for(exercise_name: &str, raw: &str) -> Self {
        Self {
            original_exercise: exercise_name.to_string(),
            replacements: Vec::new(),
            ai_notes: Some(raw.to_string()),
        }
    }
}

// ============================================================================
// Session analysis
// ============================================================================

#[derive(Clone, Debug, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Insight {
    /// trend, recommendation or warning
    #[serde(rename = "type", default)]
    pub kind: String,
    #[serde(default)]
    pub title: String,
    #[serde(default, deserialize_with = "lenient_string")]
    pub description: Option<String>,
    #[serde(default, deserialize_with = "lenient_string")]
    pub action: Option<String>,
}

#[derive(Clone, Debug, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Recommendation {
    /// weight, reps, rest or form
    #[serde(default)]
    pub category: String,
    #[serde(default)]
    pub suggestion: String,
    #[serde(default, deserialize_with = "lenient_string")]
    pub reason: Option<String>,
}

#[derive(Clone, Debug, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct PerformanceAnalysis {
    #[serde(default)]
    pub insights: Vec<Insight>,
    #[serde(default)]
    pub recommendations: Vec<Recommendation>,
    #[serde(default, deserialize_with = "lenient_string")]
    pub ai_notes: Option<String>,
}

impl PerformanceAnalysis {
    pub const KEYS: &'static [&'static str] = &["insights", "recommendations"];

    pub fn notes_only(raw: &str) -> Self {
        Self {
            ai_notes: Some(raw.to_string()),
            ..Default::default()
        }
    }
}

// ============================================================================
// Exercise generation
// ============================================================================

/// What the caller wants a new exercise to look like
#[derive(Clone, Debug, Default, PartialEq)]
pub struct ExerciseRequest {
    description: String,
    pub equipment: Option<String>,
    pub target_muscles: Option<String>,
    pub difficulty: Option<String>,
}

impl ExerciseRequest {
    pub fn new(description: impl Into<String>) -> Result<Self> {
        let description = description.into();
        if description.trim().is_empty() {
            return Err(Error::InvalidInput("Exercise description is required".into()));
        }
        Ok(Self {
            description,
            ..Default::default()
        })
    }

    pub fn description(&self) -> &str {
        &self.description
    }
}

/// A single exercise written by a provider
#[derive(Clone, Debug, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct GeneratedExercise {
    pub name: String,
    #[serde(default, deserialize_with = "lenient_string")]
    pub description: Option<String>,
    #[serde(default, deserialize_with = "lenient_string")]
    pub category: Option<String>,
    #[serde(default, deserialize_with = "lenient_string")]
    pub equipment: Option<String>,
    #[serde(default, deserialize_with = "lenient_string")]
    pub instructions: Option<String>,
    #[serde(default, deserialize_with = "lenient_string")]
    pub safety_tips: Option<String>,
    #[serde(default, deserialize_with = "lenient_string")]
    pub target_muscles: Option<String>,
}

impl GeneratedExercise {
    pub const KEYS: &'static [&'static str] = &["name"];

    /// Placeholder exercise that keeps the reply as its description
    pub fn degraded(request: &ExerciseRequest, raw: &str) -> Self {
        Self {
            name: DEGRADED_EXERCISE_NAME.to_string(),
            description: Some(raw.to_string()),
            category: Some(DEGRADED_EXERCISE_CATEGORY.to_string()),
            equipment: Some(
                request
                    .equipment
                    .clone()
                    .unwrap_or_else(|| DEGRADED_EXERCISE_EQUIPMENT.to_string()),
            ),
            instructions: Some(raw.to_string()),
            safety_tips: Some(DEGRADED_SAFETY_TIPS.to_string()),
            target_muscles: Some(
                request
                    .target_muscles
                    .clone()
                    .unwrap_or_else(|| DEGRADED_TARGET_MUSCLES.to_string()),
            ),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_plan_reads_model_output() {
        let plan: OptimizationPlan = serde_json::from_value(json!({
            "optimizations": [
                {"type": "substitution", "exerciseName": "Crunch", "suggestion": "Use dead bugs", "reason": "Spine friendly"},
                {"type": "tweak", "suggestion": "Shorter rests"}
            ],
            "newRoutine": {"name": "Core v2", "exercises": [{"name": "Dead Bug", "sets": "3", "reps": 12}]},
            "aiNotes": "Swapped one move"
        }))
        .unwrap();

        assert_eq!(plan.optimizations[0].kind, ChangeKind::Substitution);
        assert_eq!(plan.optimizations[0].exercise_name.as_deref(), Some("Crunch"));
        assert_eq!(plan.optimizations[1].kind, ChangeKind::Other);
        let routine = plan.new_routine.unwrap();
        assert_eq!(routine.exercises[0].sets, Some(3));
        assert_eq!(plan.raw_response, None);
    }

    #[test]
    fn test_unchanged_plan_keeps_routine() {
        let routine = StructuredWorkout {
            name: "Legs".into(),
            ..Default::default()
        };
        let plan = OptimizationPlan::unchanged(&routine, "Looks fine to me.");
        assert!(plan.optimizations.is_empty());
        assert_eq!(plan.new_routine, Some(routine));
        assert_eq!(plan.ai_notes.as_deref(), Some("Looks fine to me."));
        assert_eq!(plan.raw_response.as_deref(), Some("Looks fine to me."));
    }

    #[test]
    fn test_degraded_exercise_uses_request_details() {
        let mut request = ExerciseRequest::new("hip opener").unwrap();
        request.equipment = Some("resistance_bands".into());

        let exercise = GeneratedExercise::degraded(&request, "Try a banded clamshell.");
        assert_eq!(exercise.name, DEGRADED_EXERCISE_NAME);
        assert_eq!(exercise.equipment.as_deref(), Some("resistance_bands"));
        assert_eq!(exercise.target_muscles.as_deref(), Some("various"));
        assert_eq!(exercise.instructions.as_deref(), Some("Try a banded clamshell."));
    }

    #[test]
    fn test_blank_exercise_description_rejected() {
        assert!(matches!(
            ExerciseRequest::new("  "),
            Err(Error::InvalidInput(_))
        ));
    }

    #[test]
    fn test_coached_flattens_answer() {
        let coached = Coached {
            answer: ReplacementSuggestions::none_for("Squat", "no idea"),
            provenance: "openai".into(),
            degraded: true,
            failures: Vec::new(),
        };
        let value = serde_json::to_value(&coached).unwrap();
        assert_eq!(value["originalExercise"], "Squat");
        assert_eq!(value["provenance"], "openai");
        assert_eq!(value["degraded"], true);
    }
}
