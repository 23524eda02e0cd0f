//! SQLite persistence for routines, exercises and workout history.

pub mod database;
pub mod schema;

pub use database::{Database, ExerciseRow};
