//! Workout history summaries.
//!
//! Sets are grouped per exercise by the name recorded with the set, so
//! history stays readable after the routine it came from has been edited.

use crate::difficulty::Difficulty;
use crate::store::Database;
use crate::types::{ExerciseSummary, PerformanceRecord, SessionSummary, SetPerformance};
use crate::{Error, Result};

/// Routine name shown for sessions not started from a routine
pub const FREE_SESSION_NAME: &str = "Custom Workout";

/// Summarize one session
///
/// Exercises appear in the order they were first performed. Reps, duration,
/// weight and band strength come from the last recorded set of each
/// exercise; difficulty is the aggregate over all of its rated sets.
pub fn session_summary(db: &Database, session_id: i64) -> Result<SessionSummary> {
    let session = db
        .get_session(session_id)?
        .ok_or(Error::SessionNotFound(session_id))?;

    let routine_name = match session.routine_id {
        Some(id) => db
            .get_routine(id)?
            .map(|r| r.name)
            .unwrap_or_else(|| FREE_SESSION_NAME.to_string()),
        None => FREE_SESSION_NAME.to_string(),
    };

    let sets = db.session_sets(session_id)?;
    let duration_minutes = session
        .completed_at
        .map(|done| (done - session.started_at).num_minutes().max(0))
        .unwrap_or(0);

    Ok(SessionSummary {
        total_sets: sets.len() as u32,
        exercises: summarize_exercises(&sets),
        routine_name,
        duration_minutes,
        session,
    })
}

fn summarize_exercises(sets: &[SetPerformance]) -> Vec<ExerciseSummary> {
    let mut names: Vec<&str> = Vec::new();
    for set in sets {
        if !names.contains(&set.exercise_name.as_str()) {
            names.push(&set.exercise_name);
        }
    }

    names
        .into_iter()
        .filter_map(|name| {
            let performed: Vec<&SetPerformance> =
                sets.iter().filter(|s| s.exercise_name == name).collect();
            let last = performed.last()?;
            Some(ExerciseSummary {
                name: name.to_string(),
                sets: performed.len() as u32,
                reps: last.reps,
                duration: last.duration,
                weight: last.weight,
                band_strength: last.band_strength.clone(),
                difficulty: Difficulty::aggregate(performed.iter().map(|s| s.difficulty)),
            })
        })
        .collect()
}

/// Recent per-exercise performance for a user, newest session first
///
/// Only completed sessions count. `limit` bounds the number of sessions.
pub fn recent_performance(
    db: &Database,
    user_id: &str,
    limit: usize,
) -> Result<Vec<PerformanceRecord>> {
    let mut records = Vec::new();

    for session in db.recent_sessions(user_id, limit)? {
        let performed_at = session.completed_at.unwrap_or(session.started_at);
        let sets = db.session_sets(session.id)?;
        records.extend(
            summarize_exercises(&sets)
                .into_iter()
                .map(|exercise| PerformanceRecord {
                    exercise_name: exercise.name,
                    performed_at,
                    sets: exercise.sets,
                    reps: exercise.reps,
                    duration: exercise.duration,
                    weight: exercise.weight,
                    band_strength: exercise.band_strength,
                    difficulty: exercise.difficulty,
                }),
        );
    }

    tracing::debug!("Loaded {} performance records for {}", records.len(), user_id);
    Ok(records)
}
