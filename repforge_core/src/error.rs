//! Error types for the repforge_core library.

use crate::providers::FailureKind;
use std::io;

/// Result type alias using our Error type
pub type Result<T> = std::result::Result<T, Error>;

/// Core error type for repforge_core operations
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// IO error occurred
    #[error("IO error: {0}")]
    Io(#[from] io::Error),

    /// JSON serialization/deserialization error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// TOML parsing error
    #[error("TOML error: {0}")]
    Toml(#[from] toml::de::Error),

    /// SQLite error
    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    /// Configuration validation error
    #[error("Configuration error: {0}")]
    Config(String),

    /// Caller input rejected before any provider call or transaction
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// One exercise in a replace/save request failed validation
    ///
    /// `index` is the 0-based position of the offending exercise.
    #[error("Exercise at index {index} is invalid: {message}")]
    Validation { index: usize, message: String },

    /// Routine does not exist
    #[error("Routine {0} not found")]
    RoutineNotFound(i64),

    /// Workout session does not exist
    #[error("Workout session {0} not found")]
    SessionNotFound(i64),

    /// Hard provider failure (administrative status checks only)
    #[error("Provider '{provider}' failed ({kind}): {message}")]
    Provider {
        provider: String,
        kind: FailureKind,
        message: String,
    },

    /// Every provider failed on a request that has no local fallback
    #[error("No provider answered the {task} request ({attempted} tried)")]
    NoProviderAnswered { task: String, attempted: usize },

    /// Generic error
    #[error("{0}")]
    Other(String),
}
