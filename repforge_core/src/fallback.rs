//! Local, deterministic workout generation.
//!
//! Used when no provider produced a workout. The request text is classified
//! by keyword into one of the catalog archetypes and the canned workout for
//! that archetype is emitted with the requested duration and equipment.
//!
//! ## Classification
//!
//! Checked in order over the lowercased request, first match wins:
//!
//! 1. `upper`, `arms`, `chest` → upper body
//! 2. `lower`, `legs` → lower body
//! 3. `core`, `abs` → core
//! 4. `cardio` → cardio
//! 5. anything else → full body

use crate::catalog::{get_default_catalog, Archetype, Catalog, CatalogExercise, Load};
use crate::types::{StructuredWorkout, WeightInput, WorkoutExercise};
use once_cell::sync::Lazy;
use regex::Regex;

/// Duration used when the request does not name one
pub const DEFAULT_DURATION_MINUTES: u32 = 30;

/// Band strength suggested for banded exercises
const DEFAULT_BAND_STRENGTH: &str = "medium";

static DURATION_PATTERN: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)(\d+)\s*(?:min|minutes?|mins?)").expect("valid duration regex")
});

/// Equipment inferred from the request
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum Equipment {
    #[default]
    Bodyweight,
    Dumbbells,
    ResistanceBands,
}

impl Equipment {
    pub fn as_str(&self) -> &'static str {
        match self {
            Equipment::Bodyweight => "bodyweight",
            Equipment::Dumbbells => "dumbbells",
            Equipment::ResistanceBands => "resistance_bands",
        }
    }
}

/// What the generator read out of a request
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct FallbackPlan {
    pub archetype: Archetype,
    pub duration_minutes: u32,
    pub equipment: Equipment,
}

/// Classify a request into a plan
pub fn plan_for(request: &str) -> FallbackPlan {
    let lower = request.to_lowercase();
    let has = |words: &[&str]| words.iter().any(|w| lower.contains(w));

    let archetype = if has(&["upper", "arms", "chest"]) {
        Archetype::UpperBody
    } else if has(&["lower", "legs"]) {
        Archetype::LowerBody
    } else if has(&["core", "abs"]) {
        Archetype::Core
    } else if has(&["cardio"]) {
        Archetype::Cardio
    } else {
        Archetype::FullBody
    };

    let equipment = if lower.contains("dumbbell") {
        Equipment::Dumbbells
    } else if lower.contains("band") {
        Equipment::ResistanceBands
    } else {
        Equipment::Bodyweight
    };

    FallbackPlan {
        archetype,
        duration_minutes: extract_duration(request).unwrap_or(DEFAULT_DURATION_MINUTES),
        equipment,
    }
}

/// First "N min"/"N minutes" mention in the request
pub fn extract_duration(request: &str) -> Option<u32> {
    DURATION_PATTERN
        .captures(request)
        .and_then(|caps| caps.get(1))
        .and_then(|m| m.as_str().parse().ok())
}

/// Build the fallback workout for a request using the default catalog
pub fn generate_fallback(request: &str) -> StructuredWorkout {
    generate_from_catalog(get_default_catalog(), request)
}

/// Build the fallback workout for a request from a specific catalog
pub fn generate_from_catalog(catalog: &Catalog, request: &str) -> StructuredWorkout {
    let plan = plan_for(request);
    tracing::info!(
        "Fallback plan: {:?}, {} minutes, {}",
        plan.archetype,
        plan.duration_minutes,
        plan.equipment.as_str()
    );

    let workout = catalog.workout(plan.archetype);
    StructuredWorkout {
        name: workout.name.to_string(),
        description: Some(workout.description.to_string()),
        estimated_duration: Some(plan.duration_minutes),
        category: workout.category,
        exercises: workout
            .exercises
            .iter()
            .map(|exercise| build_exercise(exercise, plan.equipment))
            .collect(),
        ai_notes: Some(workout.notes.to_string()),
        raw_response: None,
    }
}

fn build_exercise(exercise: &CatalogExercise, equipment: Equipment) -> WorkoutExercise {
    let (equipment_tag, weight, band_strength) = match exercise.load {
        Load::Bodyweight => (Equipment::Bodyweight, None, None),
        Load::Equipment { dumbbell_lbs } => match equipment {
            Equipment::Dumbbells => (equipment, Some(WeightInput::Number(dumbbell_lbs)), None),
            Equipment::ResistanceBands => {
                (equipment, None, Some(DEFAULT_BAND_STRENGTH.to_string()))
            }
            Equipment::Bodyweight => (equipment, None, None),
        },
    };

    WorkoutExercise {
        name: exercise.name.to_string(),
        description: Some(exercise.description.to_string()),
        category: exercise.phase,
        sets: Some(exercise.sets),
        reps: exercise.reps,
        duration: exercise.duration,
        rest_between_sets: Some(exercise.rest_between_sets),
        equipment: Some(equipment_tag.as_str().to_string()),
        weight,
        band_strength,
        notes: Some(exercise.notes.to_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::WorkoutCategory;

    #[test]
    fn test_upper_body_with_dumbbells() {
        let workout = generate_fallback("20 minute upper body with dumbbells");
        assert_eq!(workout.name, "Upper Body Strength");
        assert_eq!(workout.estimated_duration, Some(20));
        assert_eq!(workout.category, WorkoutCategory::Strength);

        let rows = &workout.exercises[1];
        assert_eq!(rows.name, "Dumbbell Rows");
        assert_eq!(rows.equipment.as_deref(), Some("dumbbells"));
        assert_eq!(rows.weight, Some(WeightInput::Number(15.0)));

        // Bodyweight exercises ignore the requested equipment
        let push_ups = &workout.exercises[0];
        assert_eq!(push_ups.equipment.as_deref(), Some("bodyweight"));
        assert_eq!(push_ups.weight, None);
    }

    #[test]
    fn test_bodyweight_request_has_no_weights() {
        let workout = generate_fallback("arms please");
        assert_eq!(workout.estimated_duration, Some(DEFAULT_DURATION_MINUTES));
        assert!(workout.exercises.iter().all(|e| e.weight.is_none()));
        assert!(workout
            .exercises
            .iter()
            .all(|e| e.equipment.as_deref() == Some("bodyweight")));
    }

    #[test]
    fn test_bands_get_band_strength() {
        let workout = generate_fallback("legs with a resistance band");
        assert_eq!(workout.name, "Lower Body Strength");
        let squats = workout
            .exercises
            .iter()
            .find(|e| e.name == "Goblet Squats")
            .unwrap();
        assert_eq!(squats.equipment.as_deref(), Some("resistance_bands"));
        assert_eq!(squats.band_strength.as_deref(), Some("medium"));
        assert_eq!(squats.weight, None);
    }

    #[test]
    fn test_empty_catalog_still_produces_a_workout() {
        let workout = generate_from_catalog(&Catalog { workouts: vec![] }, "legs");
        assert_eq!(workout.name, "Lower Body Strength");
        assert!(!workout.exercises.is_empty());
    }

    #[test]
    fn test_classification_order() {
        assert_eq!(plan_for("Upper and lower").archetype, Archetype::UpperBody);
        assert_eq!(plan_for("LEGS").archetype, Archetype::LowerBody);
        assert_eq!(plan_for("abs burner").archetype, Archetype::Core);
        assert_eq!(plan_for("cardio").archetype, Archetype::Cardio);
        assert_eq!(plan_for("anything").archetype, Archetype::FullBody);
        assert_eq!(plan_for("").archetype, Archetype::FullBody);
    }

    #[test]
    fn test_duration_forms() {
        assert_eq!(extract_duration("45 minutes"), Some(45));
        assert_eq!(extract_duration("about 15min"), Some(15));
        assert_eq!(extract_duration("10 MINS of core"), Some(10));
        assert_eq!(extract_duration("quick one"), None);
    }

    #[test]
    fn test_output_is_deterministic() {
        let request = "30 min full body with dumbbells";
        let first = serde_json::to_string(&generate_fallback(request)).unwrap();
        let second = serde_json::to_string(&generate_fallback(request)).unwrap();
        assert_eq!(first, second);
    }
}
