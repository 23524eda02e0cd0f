//! Database schema definitions.

/// Version table, created before anything else
pub const SCHEMA_VERSION_TABLE: &str = r#"
CREATE TABLE IF NOT EXISTS schema_version (
    version INTEGER PRIMARY KEY,
    applied_at TEXT NOT NULL
);
"#;

/// Current schema version
pub const CURRENT_VERSION: i32 = 1;

/// Initial schema
///
/// Each exercise template belongs to exactly one routine link, enforced by
/// the UNIQUE constraint on `routine_exercises.template_id`. Order within a
/// routine is unique per routine; contiguity is maintained by the sync engine.
pub const SCHEMA: &str = r#"
-- Routines
CREATE TABLE IF NOT EXISTS routines (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    user_id TEXT NOT NULL,
    name TEXT NOT NULL,
    description TEXT,
    category TEXT,
    estimated_duration INTEGER,
    is_active INTEGER NOT NULL DEFAULT 1,
    created_at TEXT NOT NULL,
    updated_at TEXT NOT NULL
);

-- Canonical exercise definitions
CREATE TABLE IF NOT EXISTS exercises (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    name TEXT NOT NULL,
    description TEXT,
    category TEXT NOT NULL DEFAULT 'strength',
    instructions TEXT,
    created_at TEXT NOT NULL
);

-- Per-user default parameters for one exercise occurrence
CREATE TABLE IF NOT EXISTS exercise_templates (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    exercise_id INTEGER NOT NULL REFERENCES exercises(id) ON DELETE CASCADE,
    user_id TEXT NOT NULL,
    modality TEXT NOT NULL DEFAULT 'reps',
    sets INTEGER NOT NULL,
    reps INTEGER NOT NULL,
    duration INTEGER,
    weight REAL,
    band_strength TEXT,
    rest_between_sets INTEGER NOT NULL,
    notes TEXT NOT NULL DEFAULT '',
    created_at TEXT NOT NULL
);

-- Ordered routine membership
CREATE TABLE IF NOT EXISTS routine_exercises (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    routine_id INTEGER NOT NULL REFERENCES routines(id) ON DELETE CASCADE,
    template_id INTEGER NOT NULL UNIQUE REFERENCES exercise_templates(id),
    sort_order INTEGER NOT NULL,
    UNIQUE(routine_id, sort_order)
);

-- Workout sessions
CREATE TABLE IF NOT EXISTS workout_sessions (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    user_id TEXT NOT NULL,
    routine_id INTEGER REFERENCES routines(id) ON DELETE SET NULL,
    started_at TEXT NOT NULL,
    completed_at TEXT,
    notes TEXT
);

-- Performed sets; exercise_name survives template rewrites
CREATE TABLE IF NOT EXISTS set_performances (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    session_id INTEGER NOT NULL REFERENCES workout_sessions(id) ON DELETE CASCADE,
    template_id INTEGER REFERENCES exercise_templates(id) ON DELETE SET NULL,
    exercise_name TEXT NOT NULL,
    set_number INTEGER NOT NULL,
    reps INTEGER,
    duration INTEGER,
    weight REAL,
    band_strength TEXT,
    difficulty TEXT,
    notes TEXT,
    completed_at TEXT NOT NULL
);

-- Indexes
CREATE INDEX IF NOT EXISTS idx_routines_user ON routines(user_id);
CREATE INDEX IF NOT EXISTS idx_templates_exercise ON exercise_templates(exercise_id);
CREATE INDEX IF NOT EXISTS idx_sessions_user ON workout_sessions(user_id, started_at);
CREATE INDEX IF NOT EXISTS idx_sets_session ON set_performances(session_id);
CREATE INDEX IF NOT EXISTS idx_sets_template ON set_performances(template_id);
"#;
