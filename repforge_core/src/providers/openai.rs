//! OpenAI-compatible chat completions provider.

use super::{
    read_body, FailureKind, ProviderClient, ProviderFailure, ProviderOutcome, ProviderSettings,
    ProviderStatus,
};
use crate::prompt::Prompt;
use crate::Result;
use reqwest::blocking::Client;
use serde::{Deserialize, Serialize};

/// Public API base URL
pub const DEFAULT_BASE_URL: &str = "https://api.openai.com/v1";

/// Model used when the config does not name one
pub const DEFAULT_MODEL: &str = "gpt-3.5-turbo";

/// Environment variable holding the API key
pub const API_KEY_ENV: &str = "OPENAI_API_KEY";

#[derive(Debug, Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: [ChatMessage<'a>; 2],
    max_tokens: u32,
    temperature: f32,
}

#[derive(Debug, Serialize)]
struct ChatMessage<'a> {
    role: &'static str,
    content: &'a str,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    #[serde(default)]
    choices: Vec<Choice>,
}

#[derive(Debug, Deserialize)]
struct Choice {
    message: Option<ResponseMessage>,
    finish_reason: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ResponseMessage {
    content: Option<String>,
}

/// Chat completions client
#[derive(Debug)]
pub struct OpenAiProvider {
    settings: ProviderSettings,
    client: Client,
}

impl OpenAiProvider {
    pub fn new(settings: ProviderSettings) -> Result<Self> {
        let client = settings.http_client()?;
        Ok(Self { settings, client })
    }

    fn request_completion(&self, prompt: &Prompt) -> std::result::Result<String, ProviderFailure> {
        let id = self.settings.id.as_str();
        let request = ChatRequest {
            model: &self.settings.model,
            messages: [
                ChatMessage {
                    role: "system",
                    content: &prompt.system,
                },
                ChatMessage {
                    role: "user",
                    content: &prompt.user,
                },
            ],
            max_tokens: self.settings.max_tokens,
            temperature: self.settings.temperature,
        };

        let response = self
            .client
            .post(self.settings.endpoint("chat/completions"))
            .bearer_auth(&self.settings.api_key)
            .json(&request)
            .send();
        let body = read_body(id, response)?;

        let parsed: ChatResponse = serde_json::from_str(&body).map_err(|e| {
            ProviderFailure::new(id, FailureKind::Unknown, format!("unreadable response: {}", e))
        })?;
        let choice = parsed.choices.into_iter().next().ok_or_else(|| {
            ProviderFailure::new(id, FailureKind::Unknown, "response contained no choices")
        })?;

        if choice.finish_reason.as_deref() == Some("content_filter") {
            return Err(ProviderFailure::new(
                id,
                FailureKind::SafetyBlocked,
                "completion stopped by content filter",
            ));
        }

        choice
            .message
            .and_then(|m| m.content)
            .filter(|content| !content.trim().is_empty())
            .ok_or_else(|| {
                ProviderFailure::new(id, FailureKind::Unknown, "response had no message content")
            })
    }
}

impl ProviderClient for OpenAiProvider {
    fn id(&self) -> &str {
        &self.settings.id
    }

    fn generate(&self, prompt: &Prompt) -> ProviderOutcome {
        tracing::debug!(
            "Requesting completion from {} ({})",
            self.settings.id,
            self.settings.model
        );
        match self.request_completion(prompt) {
            Ok(text) => ProviderOutcome::Success(text),
            Err(failure) => ProviderOutcome::Failure(failure),
        }
    }

    fn check_status(&self) -> Result<ProviderStatus> {
        let response = self
            .client
            .get(self.settings.endpoint("models"))
            .bearer_auth(&self.settings.api_key)
            .send();
        read_body(&self.settings.id, response)?;

        Ok(ProviderStatus {
            provider: self.settings.id.clone(),
            model: self.settings.model.clone(),
            message: "API is working correctly".to_string(),
        })
    }
}
