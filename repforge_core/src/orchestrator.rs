//! Multi-provider workout generation.
//!
//! Providers are tried one at a time in configured order. The first provider
//! that answers wins, and its text goes through the extractor. When every
//! provider fails the local fallback generator produces the workout, so
//! `generate` always returns a workout for a well-formed request.
//!
//! Coaching calls (optimize, replacements, analysis, exercise) share the
//! same chain but have no local fallback.

use crate::coaching::{
    Coached, ExerciseRequest, GeneratedExercise, OptimizationPlan, PerformanceAnalysis,
    ReplacementSuggestions,
};
use crate::config::Config;
use crate::extract::{extract_workout, try_extract_object};
use crate::fallback::generate_fallback;
use crate::prompt::{
    analysis_prompt, exercise_prompt, optimization_prompt, replacement_prompt, workout_prompt,
    Prompt,
};
use crate::providers::{ProviderClient, ProviderFailure, ProviderOutcome, ProviderStatus};
use crate::types::{
    GenerationResult, PerformanceRecord, SessionSummary, StructuredWorkout, FALLBACK_PROVENANCE,
};
use crate::{Error, Result};
use serde::de::DeserializeOwned;
use uuid::Uuid;

/// Reason sent when the caller gives none for a replacement
const UNSPECIFIED_REASON: &str = "Not specified";

/// A validated generation request
#[derive(Clone, Debug, PartialEq)]
pub struct GenerationRequest {
    text: String,
    history: Vec<PerformanceRecord>,
}

impl GenerationRequest {
    /// Request from free text; blank text is rejected
    pub fn new(text: impl Into<String>) -> Result<Self> {
        let text = text.into();
        if text.trim().is_empty() {
            return Err(Error::InvalidInput("Workout request is required".into()));
        }
        Ok(Self {
            text,
            history: Vec::new(),
        })
    }

    /// Request for a time-boxed workout on one focus area
    pub fn quick(minutes: u32, focus: &str) -> Result<Self> {
        if minutes == 0 {
            return Err(Error::InvalidInput("Workout length must be at least one minute".into()));
        }
        if focus.trim().is_empty() {
            return Err(Error::InvalidInput("Workout focus is required".into()));
        }
        Self::new(format!(
            "I have {} minutes today and want to focus on {}. Build a complete workout for me with proper warm-up and cool-down included.",
            minutes,
            focus.trim()
        ))
    }

    /// Attach recent performance for the providers to take into account
    pub fn with_history(mut self, history: Vec<PerformanceRecord>) -> Self {
        self.history = history;
        self
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn history(&self) -> &[PerformanceRecord] {
        &self.history
    }
}

/// Ordered provider chain with local fallback
#[derive(Debug, Default)]
pub struct GenerationOrchestrator {
    providers: Vec<Box<dyn ProviderClient>>,
}

impl GenerationOrchestrator {
    pub fn new(providers: Vec<Box<dyn ProviderClient>>) -> Self {
        Self { providers }
    }

    /// Build the chain from config, skipping providers without keys
    pub fn from_config(config: &Config) -> Result<Self> {
        Ok(Self::new(config.build_providers()?))
    }

    /// Provider ids in the order they will be tried
    pub fn provider_ids(&self) -> Vec<&str> {
        self.providers.iter().map(|p| p.id()).collect()
    }

    /// Generate a workout
    ///
    /// One attempt per provider. Failures are logged and recorded on the
    /// result; they never surface as an error.
    pub fn generate(&self, request: &GenerationRequest) -> GenerationResult {
        let request_id = Uuid::new_v4();
        tracing::info!(
            "[{}] Generating workout with {} provider(s)",
            request_id,
            self.providers.len()
        );

        let prompt = workout_prompt(request.text(), request.history());
        let (answer, failures) = self.first_answer(request_id, "workout", &prompt);

        if let Some((provider, text)) = answer {
            let extraction = extract_workout(&text);
            tracing::info!(
                "[{}] Workout from {} (degraded: {})",
                request_id,
                provider,
                extraction.degraded
            );
            return GenerationResult {
                workout: extraction.workout,
                provenance: provider,
                degraded: extraction.degraded,
                failures,
            };
        }

        tracing::info!("[{}] No provider succeeded, using fallback workout", request_id);
        GenerationResult {
            workout: generate_fallback(request.text()),
            provenance: FALLBACK_PROVENANCE.to_string(),
            degraded: false,
            failures,
        }
    }

    /// Ask for changes to a routine, given recent performance
    ///
    /// An unreadable reply yields the routine unchanged with the reply as notes.
    pub fn optimize_routine(
        &self,
        routine: &StructuredWorkout,
        history: &[PerformanceRecord],
        request: &str,
    ) -> Result<Coached<OptimizationPlan>> {
        if request.trim().is_empty() {
            return Err(Error::InvalidInput("Optimization request is required".into()));
        }
        let prompt = optimization_prompt(routine, history, request);
        self.coach("optimization", &prompt, OptimizationPlan::KEYS, |raw| {
            OptimizationPlan::unchanged(routine, raw)
        })
    }

    /// Ask for alternatives to one exercise
    pub fn suggest_replacements(
        &self,
        exercise_name: &str,
        reason: Option<&str>,
        history: &[PerformanceRecord],
    ) -> Result<Coached<ReplacementSuggestions>> {
        if exercise_name.trim().is_empty() {
            return Err(Error::InvalidInput("Exercise name is required".into()));
        }
        let reason = reason
            .map(str::trim)
            .filter(|r| !r.is_empty())
            .unwrap_or(UNSPECIFIED_REASON);
        let prompt = replacement_prompt(exercise_name, reason, history);
        self.coach("replacement", &prompt, ReplacementSuggestions::KEYS, |raw| {
            ReplacementSuggestions::none_for(exercise_name, raw)
        })
    }

    /// Ask for insights on one logged session
    pub fn analyze_session(
        &self,
        session: &SessionSummary,
        history: &[PerformanceRecord],
    ) -> Result<Coached<PerformanceAnalysis>> {
        let prompt = analysis_prompt(session, history);
        self.coach(
            "analysis",
            &prompt,
            PerformanceAnalysis::KEYS,
            PerformanceAnalysis::notes_only,
        )
    }

    /// Ask for a single new exercise
    pub fn generate_exercise(&self, request: &ExerciseRequest) -> Result<Coached<GeneratedExercise>> {
        let prompt = exercise_prompt(request);
        self.coach("exercise", &prompt, GeneratedExercise::KEYS, |raw| {
            GeneratedExercise::degraded(request, raw)
        })
    }

    /// Send a coaching prompt down the chain and read the reply as `T`
    fn coach<T, F>(&self, task: &str, prompt: &Prompt, keys: &[&str], degrade: F) -> Result<Coached<T>>
    where
        T: DeserializeOwned,
        F: FnOnce(&str) -> T,
    {
        let request_id = Uuid::new_v4();
        tracing::info!(
            "[{}] Running {} request with {} provider(s)",
            request_id,
            task,
            self.providers.len()
        );

        let (answer, failures) = self.first_answer(request_id, task, prompt);
        let Some((provider, text)) = answer else {
            return Err(Error::NoProviderAnswered {
                task: task.to_string(),
                attempted: failures.len(),
            });
        };

        let (answer, degraded) = match try_extract_object(&text, keys) {
            Ok(answer) => (answer, false),
            Err(reason) => {
                tracing::warn!(
                    "[{}] Could not read {} reply from {}: {:?}",
                    request_id,
                    task,
                    provider,
                    reason
                );
                (degrade(&text), true)
            }
        };
        tracing::info!(
            "[{}] {} answer from {} (degraded: {})",
            request_id,
            task,
            provider,
            degraded
        );

        Ok(Coached {
            answer,
            provenance: provider,
            degraded,
            failures,
        })
    }

    /// Try providers in order until one returns text
    fn first_answer(
        &self,
        request_id: Uuid,
        task: &str,
        prompt: &Prompt,
    ) -> (Option<(String, String)>, Vec<ProviderFailure>) {
        let mut failures = Vec::new();

        for provider in &self.providers {
            match provider.generate(prompt) {
                ProviderOutcome::Success(text) => {
                    return (Some((provider.id().to_string(), text)), failures);
                }
                ProviderOutcome::Failure(failure) => {
                    tracing::warn!(
                        "[{}] Provider {} failed {} request ({}): {}",
                        request_id,
                        failure.provider,
                        task,
                        failure.kind,
                        failure.message
                    );
                    failures.push(failure);
                }
            }
        }

        (None, failures)
    }

    /// Run every provider's status check, in order
    pub fn check_status(&self) -> Vec<(String, Result<ProviderStatus>)> {
        self.providers
            .iter()
            .map(|p| (p.id().to_string(), p.check_status()))
            .collect()
    }
}
