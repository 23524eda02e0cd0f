//! In-process provider that replays a fixed script of outcomes.
//!
//! Used by tests and offline demos. Each `generate` call consumes the next
//! scripted outcome; once the script runs out every call fails as `Unknown`.

use super::{FailureKind, ProviderClient, ProviderFailure, ProviderOutcome, ProviderStatus};
use crate::prompt::Prompt;
use crate::Result;
use std::collections::VecDeque;
use std::sync::{Mutex, MutexGuard, PoisonError};

#[derive(Debug)]
pub struct ScriptedProvider {
    id: String,
    script: Mutex<VecDeque<ProviderOutcome>>,
    prompts: Mutex<Vec<Prompt>>,
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

impl ScriptedProvider {
    pub fn new(id: &str, outcomes: Vec<ProviderOutcome>) -> Self {
        Self {
            id: id.to_string(),
            script: Mutex::new(outcomes.into()),
            prompts: Mutex::new(Vec::new()),
        }
    }

    /// Provider that answers once with `text`
    pub fn succeeding(id: &str, text: &str) -> Self {
        Self::new(id, vec![ProviderOutcome::Success(text.to_string())])
    }

    /// Provider that fails once with `kind`
    pub fn failing(id: &str, kind: FailureKind) -> Self {
        Self::new(
            id,
            vec![ProviderOutcome::Failure(ProviderFailure::new(
                id,
                kind,
                format!("scripted {}", kind),
            ))],
        )
    }

    /// Append an outcome to the end of the script
    pub fn push(&self, outcome: ProviderOutcome) {
        lock(&self.script).push_back(outcome);
    }

    /// Number of `generate` calls made so far
    pub fn calls(&self) -> usize {
        lock(&self.prompts).len()
    }

    /// Prompts received, in call order
    pub fn prompts(&self) -> Vec<Prompt> {
        lock(&self.prompts).clone()
    }
}

impl ProviderClient for ScriptedProvider {
    fn id(&self) -> &str {
        &self.id
    }

    fn generate(&self, prompt: &Prompt) -> ProviderOutcome {
        lock(&self.prompts).push(prompt.clone());
        lock(&self.script).pop_front().unwrap_or_else(|| {
            ProviderOutcome::Failure(ProviderFailure::new(
                &self.id,
                FailureKind::Unknown,
                "script exhausted",
            ))
        })
    }

    fn check_status(&self) -> Result<ProviderStatus> {
        Ok(ProviderStatus {
            provider: self.id.clone(),
            model: "scripted".to_string(),
            message: format!("{} outcomes remaining", lock(&self.script).len()),
        })
    }
}
