#![forbid(unsafe_code)]

//! Core domain model and business logic for repforge.
//!
//! This crate provides:
//! - Domain types (structured workouts, exercise specs, routines, sessions)
//! - Multi-provider workout generation with a deterministic local fallback
//! - Coaching calls: routine optimization, replacements, session analysis
//! - Tolerant extraction of workouts from provider text
//! - Transactional routine exercise replacement (SQLite)
//! - Weight normalization and difficulty aggregation

pub mod types;
pub mod error;
pub mod config;
pub mod logging;
pub mod weight;
pub mod difficulty;
pub mod catalog;
pub mod fallback;
pub mod extract;
pub mod prompt;
pub mod providers;
pub mod orchestrator;
pub mod coaching;
pub mod store;
pub mod sync;
pub mod history;

// Re-export commonly used types
pub use error::{Error, Result};
pub use types::*;
pub use coaching::{Coached, ExerciseRequest};
pub use config::Config;
pub use difficulty::Difficulty;
pub use extract::extract_workout;
pub use fallback::generate_fallback;
pub use orchestrator::{GenerationOrchestrator, GenerationRequest};
pub use providers::{FailureKind, ProviderClient, ProviderOutcome, ProviderFailure};
pub use store::Database;
pub use sync::{parse_replace_request, RoutineSyncEngine};
pub use weight::normalize_weight;
