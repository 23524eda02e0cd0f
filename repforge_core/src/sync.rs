//! Transactional replacement of a routine's exercise list.
//!
//! ## Replace algorithm
//!
//! Every edit rewrites the whole list. Inside one transaction:
//!
//! 1. Read the template ids linked to the routine
//! 2. Delete the routine's link rows
//! 3. Delete those templates and the exercises they own
//! 4. For each spec in input order create exercise, template and link with
//!    `order = position + 1`
//! 5. Commit
//!
//! Any failure rolls the transaction back and the previous list stays as it
//! was. Template ids are not preserved across edits.

use crate::store::database::{
    delete_templates, insert_routine, insert_routine_exercise, linked_template_ids, load_routine,
    touch_routine, unlink_routine_exercises,
};
use crate::store::{Database, ExerciseRow};
use crate::types::{
    parse_loose_u32, ExerciseSpec, Modality, NewRoutine, PersistedExercise, SavedRoutine,
    StructuredWorkout,
};
use crate::weight::normalize_weight_value;
use crate::{Error, Result};
use rusqlite::Transaction;
use serde_json::Value;

pub const DEFAULT_SETS: u32 = 3;
pub const DEFAULT_REPS: u32 = 10;
/// Seconds
pub const DEFAULT_REST_BETWEEN_SETS: u32 = 60;
/// Seconds, for timed exercises with no usable time
pub const DEFAULT_TIMED_DURATION: u32 = 30;
pub const DEFAULT_EXERCISE_CATEGORY: &str = "strength";

const DEFAULT_ROUTINE_MINUTES: u32 = 30;

/// Persists exercise lists for one acting user
#[derive(Clone, Debug)]
pub struct RoutineSyncEngine {
    user_id: String,
}

impl RoutineSyncEngine {
    pub fn new(user_id: impl Into<String>) -> Self {
        Self {
            user_id: user_id.into(),
        }
    }

    /// Atomically replace every exercise on a routine
    pub fn replace_exercises(
        &self,
        db: &mut Database,
        routine_id: i64,
        specs: &[ExerciseSpec],
    ) -> Result<Vec<PersistedExercise>> {
        let rows = normalize_all(specs)?;

        let tx = db.transaction()?;
        let outcome = self.apply_replace(&tx, routine_id, &rows);
        let persisted = finish(tx, outcome)?;

        tracing::info!(
            "Replaced exercises on routine {} ({} exercises)",
            routine_id,
            persisted.len()
        );
        Ok(persisted)
    }

    /// Create a routine from a generated workout, exercises included
    pub fn save_workout(&self, db: &mut Database, workout: &StructuredWorkout) -> Result<SavedRoutine> {
        if workout.name.trim().is_empty() {
            return Err(Error::InvalidInput("Workout name is required".into()));
        }

        let specs: Vec<ExerciseSpec> = workout
            .exercises
            .iter()
            .map(ExerciseSpec::from_workout_exercise)
            .collect();
        let rows = normalize_all(&specs)?;

        let new_routine = NewRoutine {
            user_id: self.user_id.clone(),
            name: workout.name.clone(),
            description: workout.description.clone(),
            category: Some(workout.category.as_str().to_string()),
            estimated_duration: Some(
                workout
                    .estimated_duration
                    .filter(|&m| m > 0)
                    .unwrap_or(DEFAULT_ROUTINE_MINUTES),
            ),
        };

        let tx = db.transaction()?;
        let outcome = self.apply_save(&tx, &new_routine, &rows);
        let saved = finish(tx, outcome)?;

        tracing::info!(
            "Saved workout '{}' as routine {}",
            saved.routine.name,
            saved.routine.id
        );
        Ok(saved)
    }

    fn apply_save(
        &self,
        tx: &Transaction<'_>,
        new_routine: &NewRoutine,
        rows: &[ExerciseRow],
    ) -> Result<SavedRoutine> {
        let routine = insert_routine(tx, new_routine)?;
        let exercises = self.insert_rows(tx, routine.id, rows)?;
        Ok(SavedRoutine { routine, exercises })
    }

    fn apply_replace(
        &self,
        tx: &Transaction<'_>,
        routine_id: i64,
        rows: &[ExerciseRow],
    ) -> Result<Vec<PersistedExercise>> {
        if load_routine(tx, routine_id)?.is_none() {
            return Err(Error::RoutineNotFound(routine_id));
        }

        let old_templates = linked_template_ids(tx, routine_id)?;
        unlink_routine_exercises(tx, routine_id)?;
        delete_templates(tx, &old_templates)?;
        tracing::debug!(
            "Removed {} templates from routine {}",
            old_templates.len(),
            routine_id
        );

        let persisted = self.insert_rows(tx, routine_id, rows)?;
        touch_routine(tx, routine_id)?;
        Ok(persisted)
    }

    fn insert_rows(
        &self,
        tx: &Transaction<'_>,
        routine_id: i64,
        rows: &[ExerciseRow],
    ) -> Result<Vec<PersistedExercise>> {
        rows.iter()
            .zip(1u32..)
            .map(|(row, order)| insert_routine_exercise(tx, &self.user_id, routine_id, order, row))
            .collect()
    }
}

/// Commit on success, roll back on failure
fn finish<T>(tx: Transaction<'_>, outcome: Result<T>) -> Result<T> {
    match outcome {
        Ok(value) => {
            tx.commit()?;
            Ok(value)
        }
        Err(err) => {
            if let Err(rollback_err) = tx.rollback() {
                tracing::error!("Rollback failed: {}", rollback_err);
            }
            Err(err)
        }
    }
}

/// Parse an editor request body of the form `{"exercises": [...]}`
pub fn parse_replace_request(body: &str) -> Result<Vec<ExerciseSpec>> {
    let value: Value = serde_json::from_str(body)?;
    let Some(items) = value.get("exercises").and_then(Value::as_array) else {
        return Err(Error::InvalidInput("Exercises must be an array".into()));
    };

    items
        .iter()
        .enumerate()
        .map(|(index, item)| {
            serde_json::from_value(item.clone()).map_err(|e| Error::Validation {
                index,
                message: e.to_string(),
            })
        })
        .collect()
}

fn normalize_all(specs: &[ExerciseSpec]) -> Result<Vec<ExerciseRow>> {
    specs
        .iter()
        .enumerate()
        .map(|(index, spec)| normalize_spec(index, spec))
        .collect()
}

fn non_empty(value: Option<&str>) -> Option<String> {
    value
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
}

fn loose_u32(value: Option<&Value>) -> Option<u32> {
    value.and_then(parse_loose_u32)
}

/// Validate and clean one spec
///
/// Sets, reps and rest fall back to defaults when absent or not numeric.
/// Duration is only kept for timed exercises.
pub fn normalize_spec(index: usize, spec: &ExerciseSpec) -> Result<ExerciseRow> {
    let name = non_empty(spec.name.as_deref()).ok_or_else(|| Error::Validation {
        index,
        message: "name is required".into(),
    })?;

    let modality = spec
        .modality
        .as_deref()
        .map(Modality::parse)
        .unwrap_or_default();

    let duration = match modality {
        Modality::Time => Some(
            loose_u32(spec.time.as_ref())
                .or_else(|| loose_u32(spec.duration.as_ref()))
                .unwrap_or(DEFAULT_TIMED_DURATION),
        ),
        Modality::Reps => None,
    };

    Ok(ExerciseRow {
        name,
        description: non_empty(spec.description.as_deref()),
        instructions: non_empty(spec.instructions.as_deref()),
        category: non_empty(spec.category.as_deref())
            .unwrap_or_else(|| DEFAULT_EXERCISE_CATEGORY.to_string()),
        modality,
        sets: loose_u32(spec.sets.as_ref()).unwrap_or(DEFAULT_SETS),
        reps: loose_u32(spec.reps.as_ref()).unwrap_or(DEFAULT_REPS),
        duration,
        weight: spec.weight.as_ref().and_then(normalize_weight_value),
        band_strength: non_empty(spec.band_strength.as_deref()),
        rest_between_sets: loose_u32(spec.rest_between_sets.as_ref())
            .unwrap_or(DEFAULT_REST_BETWEEN_SETS),
        notes: spec.notes.clone().unwrap_or_default(),
    })
}
