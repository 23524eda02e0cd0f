//! Database operations using rusqlite.
//!
//! Row-level helpers take a plain `&Connection` so the sync engine can run
//! them inside its own transaction; `Database` methods wrap the same helpers
//! for one-shot reads and writes.

use crate::difficulty::Difficulty;
use crate::store::schema::{CURRENT_VERSION, SCHEMA, SCHEMA_VERSION_TABLE};
use crate::types::{
    Modality, NewRoutine, NewSetPerformance, PersistedExercise, Routine, SetPerformance,
    WorkoutSession,
};
use crate::{Error, Result};
use chrono::{DateTime, SecondsFormat, Utc};
use rusqlite::types::Type;
use rusqlite::{params, Connection, OptionalExtension, Row};
use std::path::Path;

/// Normalized exercise fields ready to be written
#[derive(Clone, Debug, PartialEq)]
pub struct ExerciseRow {
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

/// Database wrapper for SQLite operations.
pub struct Database {
    conn: Connection,
}

impl Database {
    /// Open or create a database at the given path.
    pub fn open(path: &Path) -> Result<Self> {
        // Ensure parent directory exists
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }

        let db = Self {
            conn: Connection::open(path)?,
        };
        db.initialize()?;
        tracing::debug!("Opened database at {:?}", path);
        Ok(db)
    }

    /// Open an in-memory database (for testing).
    pub fn open_in_memory() -> Result<Self> {
        let db = Self {
            conn: Connection::open_in_memory()?,
        };
        db.initialize()?;
        Ok(db)
    }

    fn initialize(&self) -> Result<()> {
        self.conn.execute_batch("PRAGMA foreign_keys = ON;")?;
        self.conn.execute_batch(SCHEMA_VERSION_TABLE)?;

        let current_version: i32 = self.conn.query_row(
            "SELECT COALESCE(MAX(version), 0) FROM schema_version",
            [],
            |row| row.get(0),
        )?;

        if current_version < CURRENT_VERSION {
            self.migrate(current_version)?;
        }
        Ok(())
    }

    fn migrate(&self, from_version: i32) -> Result<()> {
        if from_version < 1 {
            self.conn.execute_batch(SCHEMA)?;
            self.conn.execute(
                "INSERT INTO schema_version (version, applied_at) VALUES (?1, ?2)",
                params![CURRENT_VERSION, timestamp_text(Utc::now())],
            )?;
            tracing::info!("Database migrated to version {}", CURRENT_VERSION);
        }
        Ok(())
    }

    /// Get a reference to the underlying connection.
    pub fn connection(&self) -> &Connection {
        &self.conn
    }

    /// Begin a transaction.
    pub fn transaction(&mut self) -> Result<rusqlite::Transaction<'_>> {
        Ok(self.conn.transaction()?)
    }

    // ========== Routines ==========

    pub fn create_routine(&self, routine: &NewRoutine) -> Result<Routine> {
        insert_routine(&self.conn, routine)
    }

    pub fn get_routine(&self, id: i64) -> Result<Option<Routine>> {
        load_routine(&self.conn, id)
    }

    /// Exercises on a routine, by ascending order
    pub fn routine_exercises(&self, routine_id: i64) -> Result<Vec<PersistedExercise>> {
        load_routine_exercises(&self.conn, routine_id)
    }

    /// Templates not linked to any routine
    pub fn count_orphaned_templates(&self) -> Result<i64> {
        Ok(self.conn.query_row(
            "SELECT COUNT(*) FROM exercise_templates t
             WHERE NOT EXISTS (SELECT 1 FROM routine_exercises re WHERE re.template_id = t.id)",
            [],
            |row| row.get(0),
        )?)
    }

    /// Exercises without a template
    pub fn count_orphaned_exercises(&self) -> Result<i64> {
        Ok(self.conn.query_row(
            "SELECT COUNT(*) FROM exercises e
             WHERE NOT EXISTS (SELECT 1 FROM exercise_templates t WHERE t.exercise_id = e.id)",
            [],
            |row| row.get(0),
        )?)
    }

    // ========== Sessions ==========

    pub fn start_session(&self, user_id: &str, routine_id: Option<i64>) -> Result<WorkoutSession> {
        self.start_session_at(user_id, routine_id, Utc::now())
    }

    pub fn start_session_at(
        &self,
        user_id: &str,
        routine_id: Option<i64>,
        started_at: DateTime<Utc>,
    ) -> Result<WorkoutSession> {
        if let Some(id) = routine_id {
            if load_routine(&self.conn, id)?.is_none() {
                return Err(Error::RoutineNotFound(id));
            }
        }

        self.conn.execute(
            "INSERT INTO workout_sessions (user_id, routine_id, started_at) VALUES (?1, ?2, ?3)",
            params![user_id, routine_id, timestamp_text(started_at)],
        )?;
        let id = self.conn.last_insert_rowid();
        tracing::info!("Started workout session {} for {}", id, user_id);
        self.require_session(id)
    }

    pub fn complete_session(&self, session_id: i64, notes: Option<&str>) -> Result<WorkoutSession> {
        self.complete_session_at(session_id, notes, Utc::now())
    }

    pub fn complete_session_at(
        &self,
        session_id: i64,
        notes: Option<&str>,
        completed_at: DateTime<Utc>,
    ) -> Result<WorkoutSession> {
        let updated = self.conn.execute(
            "UPDATE workout_sessions SET completed_at = ?1, notes = COALESCE(?2, notes) WHERE id = ?3",
            params![timestamp_text(completed_at), notes, session_id],
        )?;
        if updated == 0 {
            return Err(Error::SessionNotFound(session_id));
        }
        tracing::info!("Completed workout session {}", session_id);
        self.require_session(session_id)
    }

    pub fn get_session(&self, id: i64) -> Result<Option<WorkoutSession>> {
        Ok(self
            .conn
            .query_row(
                "SELECT id, user_id, routine_id, started_at, completed_at, notes
                 FROM workout_sessions WHERE id = ?1",
                [id],
                session_from_row,
            )
            .optional()?)
    }

    fn require_session(&self, id: i64) -> Result<WorkoutSession> {
        self.get_session(id)?.ok_or(Error::SessionNotFound(id))
    }

    /// Most recent completed sessions for a user, newest first
    pub fn recent_sessions(&self, user_id: &str, limit: usize) -> Result<Vec<WorkoutSession>> {
        let mut stmt = self.conn.prepare(
            "SELECT id, user_id, routine_id, started_at, completed_at, notes
             FROM workout_sessions
             WHERE user_id = ?1 AND completed_at IS NOT NULL
             ORDER BY completed_at DESC, id DESC
             LIMIT ?2",
        )?;
        let limit = i64::try_from(limit).unwrap_or(i64::MAX);
        let sessions = stmt
            .query_map(params![user_id, limit], session_from_row)?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(sessions)
    }

    pub fn record_set(&self, set: &NewSetPerformance) -> Result<SetPerformance> {
        self.record_set_at(set, Utc::now())
    }

    pub fn record_set_at(
        &self,
        set: &NewSetPerformance,
        completed_at: DateTime<Utc>,
    ) -> Result<SetPerformance> {
        if self.get_session(set.session_id)?.is_none() {
            return Err(Error::SessionNotFound(set.session_id));
        }
        if set.exercise_name.trim().is_empty() {
            return Err(Error::InvalidInput("Set needs an exercise name".into()));
        }

        self.conn.execute(
            "INSERT INTO set_performances (session_id, template_id, exercise_name, set_number,
             reps, duration, weight, band_strength, difficulty, notes, completed_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11)",
            params![
                set.session_id,
                set.template_id,
                set.exercise_name,
                set.set_number,
                set.reps,
                set.duration,
                set.weight,
                set.band_strength,
                set.difficulty.map(Difficulty::as_str),
                set.notes,
                timestamp_text(completed_at),
            ],
        )?;
        let id = self.conn.last_insert_rowid();

        Ok(self.conn.query_row(
            &format!("{} WHERE id = ?1", SELECT_SET),
            [id],
            set_from_row,
        )?)
    }

    /// Sets recorded in a session, in recording order
    pub fn session_sets(&self, session_id: i64) -> Result<Vec<SetPerformance>> {
        let mut stmt = self
            .conn
            .prepare(&format!("{} WHERE session_id = ?1 ORDER BY id", SELECT_SET))?;
        let sets = stmt
            .query_map([session_id], set_from_row)?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(sets)
    }
}

const SELECT_SET: &str = "SELECT id, session_id, template_id, exercise_name, set_number, reps,
     duration, weight, band_strength, difficulty, notes, completed_at FROM set_performances";

// ========== Row helpers (usable inside a transaction) ==========

pub(crate) fn insert_routine(conn: &Connection, routine: &NewRoutine) -> Result<Routine> {
    let now = timestamp_text(Utc::now());
    conn.execute(
        "INSERT INTO routines (user_id, name, description, category, estimated_duration,
         is_active, created_at, updated_at)
         VALUES (?1, ?2, ?3, ?4, ?5, 1, ?6, ?6)",
        params![
            routine.user_id,
            routine.name,
            routine.description,
            routine.category,
            routine.estimated_duration,
            now,
        ],
    )?;
    let id = conn.last_insert_rowid();
    load_routine(conn, id)?.ok_or(Error::RoutineNotFound(id))
}

pub(crate) fn load_routine(conn: &Connection, id: i64) -> Result<Option<Routine>> {
    Ok(conn
        .query_row(
            "SELECT id, user_id, name, description, category, estimated_duration, is_active,
             created_at FROM routines WHERE id = ?1",
            [id],
            routine_from_row,
        )
        .optional()?)
}

pub(crate) fn load_routine_exercises(
    conn: &Connection,
    routine_id: i64,
) -> Result<Vec<PersistedExercise>> {
    let mut stmt = conn.prepare(
        "SELECT e.id, t.id, re.sort_order, e.name, e.description, e.category, t.modality,
         t.sets, t.reps, t.duration, t.weight, t.band_strength, t.rest_between_sets, t.notes,
         e.instructions
         FROM routine_exercises re
         JOIN exercise_templates t ON t.id = re.template_id
         JOIN exercises e ON e.id = t.exercise_id
         WHERE re.routine_id = ?1
         ORDER BY re.sort_order",
    )?;
    let exercises = stmt
        .query_map([routine_id], exercise_from_row)?
        .collect::<rusqlite::Result<Vec<_>>>()?;
    Ok(exercises)
}

pub(crate) fn linked_template_ids(conn: &Connection, routine_id: i64) -> Result<Vec<i64>> {
    let mut stmt =
        conn.prepare("SELECT template_id FROM routine_exercises WHERE routine_id = ?1")?;
    let ids = stmt
        .query_map([routine_id], |row| row.get(0))?
        .collect::<rusqlite::Result<Vec<i64>>>()?;
    Ok(ids)
}

pub(crate) fn unlink_routine_exercises(conn: &Connection, routine_id: i64) -> Result<usize> {
    Ok(conn.execute(
        "DELETE FROM routine_exercises WHERE routine_id = ?1",
        [routine_id],
    )?)
}

/// Delete templates together with the exercise each one owns
pub(crate) fn delete_templates(conn: &Connection, template_ids: &[i64]) -> Result<()> {
    for &template_id in template_ids {
        let exercise_id: Option<i64> = conn
            .query_row(
                "SELECT exercise_id FROM exercise_templates WHERE id = ?1",
                [template_id],
                |row| row.get(0),
            )
            .optional()?;

        conn.execute("DELETE FROM exercise_templates WHERE id = ?1", [template_id])?;
        if let Some(exercise_id) = exercise_id {
            conn.execute("DELETE FROM exercises WHERE id = ?1", [exercise_id])?;
        }
    }
    Ok(())
}

/// Create the exercise, its template and the routine link at `order`
pub(crate) fn insert_routine_exercise(
    conn: &Connection,
    user_id: &str,
    routine_id: i64,
    order: u32,
    row: &ExerciseRow,
) -> Result<PersistedExercise> {
    let now = timestamp_text(Utc::now());

    conn.execute(
        "INSERT INTO exercises (name, description, instructions, category, created_at)
         VALUES (?1, ?2, ?3, ?4, ?5)",
        params![row.name, row.description, row.instructions, row.category, now],
    )?;
    let exercise_id = conn.last_insert_rowid();

    conn.execute(
        "INSERT INTO exercise_templates (exercise_id, user_id, modality, sets, reps, duration,
         weight, band_strength, rest_between_sets, notes, created_at)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11)",
        params![
            exercise_id,
            user_id,
            row.modality.as_str(),
            row.sets,
            row.reps,
            row.duration,
            row.weight,
            row.band_strength,
            row.rest_between_sets,
            row.notes,
            now,
        ],
    )?;
    let template_id = conn.last_insert_rowid();

    conn.execute(
        "INSERT INTO routine_exercises (routine_id, template_id, sort_order) VALUES (?1, ?2, ?3)",
        params![routine_id, template_id, order],
    )?;

    Ok(PersistedExercise {
        exercise_id,
        template_id,
        order,
        name: row.name.clone(),
        description: row.description.clone(),
        instructions: row.instructions.clone(),
        category: row.category.clone(),
        modality: row.modality,
        sets: row.sets,
        reps: row.reps,
        duration: row.duration,
        weight: row.weight,
        band_strength: row.band_strength.clone(),
        rest_between_sets: row.rest_between_sets,
        notes: row.notes.clone(),
    })
}

pub(crate) fn touch_routine(conn: &Connection, routine_id: i64) -> Result<()> {
    conn.execute(
        "UPDATE routines SET updated_at = ?1 WHERE id = ?2",
        params![timestamp_text(Utc::now()), routine_id],
    )?;
    Ok(())
}

// ========== Conversions ==========

fn timestamp_text(at: DateTime<Utc>) -> String {
    at.to_rfc3339_opts(SecondsFormat::Micros, true)
}

fn timestamp(row: &Row<'_>, idx: usize) -> rusqlite::Result<DateTime<Utc>> {
    let raw: String = row.get(idx)?;
    parse_timestamp(idx, &raw)
}

fn optional_timestamp(row: &Row<'_>, idx: usize) -> rusqlite::Result<Option<DateTime<Utc>>> {
    let raw: Option<String> = row.get(idx)?;
    raw.map(|raw| parse_timestamp(idx, &raw)).transpose()
}

fn parse_timestamp(idx: usize, raw: &str) -> rusqlite::Result<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(raw)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| rusqlite::Error::FromSqlConversionFailure(idx, Type::Text, Box::new(e)))
}

fn routine_from_row(row: &Row<'_>) -> rusqlite::Result<Routine> {
    Ok(Routine {
        id: row.get(0)?,
        user_id: row.get(1)?,
        name: row.get(2)?,
        description: row.get(3)?,
        category: row.get(4)?,
        estimated_duration: row.get(5)?,
        is_active: row.get(6)?,
        created_at: timestamp(row, 7)?,
    })
}

fn exercise_from_row(row: &Row<'_>) -> rusqlite::Result<PersistedExercise> {
    let modality: String = row.get(6)?;
    Ok(PersistedExercise {
        exercise_id: row.get(0)?,
        template_id: row.get(1)?,
        order: row.get(2)?,
        name: row.get(3)?,
        description: row.get(4)?,
        category: row.get(5)?,
        modality: Modality::parse(&modality),
        sets: row.get(7)?,
        reps: row.get(8)?,
        duration: row.get(9)?,
        weight: row.get(10)?,
        band_strength: row.get(11)?,
        rest_between_sets: row.get(12)?,
        notes: row.get(13)?,
        instructions: row.get(14)?,
    })
}

fn session_from_row(row: &Row<'_>) -> rusqlite::Result<WorkoutSession> {
    Ok(WorkoutSession {
        id: row.get(0)?,
        user_id: row.get(1)?,
        routine_id: row.get(2)?,
        started_at: timestamp(row, 3)?,
        completed_at: optional_timestamp(row, 4)?,
        notes: row.get(5)?,
    })
}

fn set_from_row(row: &Row<'_>) -> rusqlite::Result<SetPerformance> {
    let difficulty: Option<String> = row.get(9)?;
    let difficulty = difficulty
        .map(|raw| {
            raw.parse::<Difficulty>().map_err(|e| {
                rusqlite::Error::FromSqlConversionFailure(9, Type::Text, Box::new(e))
            })
        })
        .transpose()?;

    Ok(SetPerformance {
        id: row.get(0)?,
        session_id: row.get(1)?,
        template_id: row.get(2)?,
        exercise_name: row.get(3)?,
        set_number: row.get(4)?,
        reps: row.get(5)?,
        duration: row.get(6)?,
        weight: row.get(7)?,
        band_strength: row.get(8)?,
        difficulty,
        notes: row.get(10)?,
        completed_at: timestamp(row, 11)?,
    })
}
