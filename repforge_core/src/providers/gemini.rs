//! Google Gemini `generateContent` provider.
//!
//! Gemini receives the prompt as a single user turn. Safety blocks can arrive
//! inside a 200 response, either as `promptFeedback.blockReason` or as a
//! candidate whose `finishReason` is `SAFETY`.

use super::{
    read_body, FailureKind, ProviderClient, ProviderFailure, ProviderOutcome, ProviderSettings,
    ProviderStatus,
};
use crate::prompt::Prompt;
use crate::Result;
use reqwest::blocking::Client;
use serde::{Deserialize, Serialize};

/// Public API base URL
pub const DEFAULT_BASE_URL: &str = "https://generativelanguage.googleapis.com/v1beta";

/// Model used when the config does not name one
pub const DEFAULT_MODEL: &str = "gemini-1.5-flash";

/// Environment variable holding the API key
pub const API_KEY_ENV: &str = "GEMINI_API_KEY";

const API_KEY_HEADER: &str = "x-goog-api-key";

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerateRequest {
    contents: Vec<Content>,
    generation_config: GenerationConfig,
}

#[derive(Debug, Serialize, Deserialize)]
struct Content {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    role: Option<String>,
    #[serde(default)]
    parts: Vec<Part>,
}

#[derive(Debug, Serialize, Deserialize)]
struct Part {
    #[serde(default)]
    text: Option<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerationConfig {
    max_output_tokens: u32,
    temperature: f32,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GenerateResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
    prompt_feedback: Option<PromptFeedback>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Candidate {
    content: Option<Content>,
    finish_reason: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct PromptFeedback {
    block_reason: Option<String>,
}

/// Gemini client
#[derive(Debug)]
pub struct GeminiProvider {
    settings: ProviderSettings,
    client: Client,
}

impl GeminiProvider {
    pub fn new(settings: ProviderSettings) -> Result<Self> {
        let client = settings.http_client()?;
        Ok(Self { settings, client })
    }

    fn model_path(&self) -> String {
        format!("models/{}", self.settings.model)
    }

    fn request_content(&self, prompt: &Prompt) -> std::result::Result<String, ProviderFailure> {
        let id = self.settings.id.as_str();
        let request = GenerateRequest {
            contents: vec![Content {
                role: Some("user".to_string()),
                parts: vec![Part {
                    text: Some(prompt.combined()),
                }],
            }],
            generation_config: GenerationConfig {
                max_output_tokens: self.settings.max_tokens,
                temperature: self.settings.temperature,
            },
        };

        let url = self
            .settings
            .endpoint(&format!("{}:generateContent", self.model_path()));
        let response = self
            .client
            .post(url)
            .header(API_KEY_HEADER, &self.settings.api_key)
            .json(&request)
            .send();
        let body = read_body(id, response)?;

        let parsed: GenerateResponse = serde_json::from_str(&body).map_err(|e| {
            ProviderFailure::new(id, FailureKind::Unknown, format!("unreadable response: {}", e))
        })?;

        if let Some(reason) = parsed.prompt_feedback.and_then(|f| f.block_reason) {
            return Err(ProviderFailure::new(
                id,
                FailureKind::SafetyBlocked,
                format!("prompt blocked: {}", reason),
            ));
        }

        let candidate = parsed.candidates.into_iter().next().ok_or_else(|| {
            ProviderFailure::new(id, FailureKind::Unknown, "response contained no candidates")
        })?;

        if candidate.finish_reason.as_deref() == Some("SAFETY") {
            return Err(ProviderFailure::new(
                id,
                FailureKind::SafetyBlocked,
                "candidate stopped for safety",
            ));
        }

        let text: String = candidate
            .content
            .map(|c| c.parts.into_iter().filter_map(|p| p.text).collect())
            .unwrap_or_default();

        if text.trim().is_empty() {
            return Err(ProviderFailure::new(
                id,
                FailureKind::Unknown,
                "response had no text parts",
            ));
        }
        Ok(text)
    }
}

impl ProviderClient for GeminiProvider {
    fn id(&self) -> &str {
        &self.settings.id
    }

    fn generate(&self, prompt: &Prompt) -> ProviderOutcome {
        tracing::debug!(
            "Requesting content from {} ({})",
            self.settings.id,
            self.settings.model
        );
        match self.request_content(prompt) {
            Ok(text) => ProviderOutcome::Success(text),
            Err(failure) => ProviderOutcome::Failure(failure),
        }
    }

    fn check_status(&self) -> Result<ProviderStatus> {
        let response = self
            .client
            .get(self.settings.endpoint(&self.model_path()))
            .header(API_KEY_HEADER, &self.settings.api_key)
            .send();
        read_body(&self.settings.id, response)?;

        Ok(ProviderStatus {
            provider: self.settings.id.clone(),
            model: self.settings.model.clone(),
            message: "Gemini API is working correctly".to_string(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::prompt::workout_prompt;
    use crate::providers::stub::StubServer;
    use std::time::Duration;

    fn provider(base_url: &str) -> GeminiProvider {
        GeminiProvider::new(ProviderSettings {
            id: "gemini".into(),
            model: DEFAULT_MODEL.into(),
            base_url: base_url.into(),
            api_key: "g-test".into(),
            timeout: Duration::from_secs(5),
            max_tokens: 2000,
            temperature: 0.7,
        })
        .unwrap()
    }

    fn failure_kind(outcome: ProviderOutcome) -> FailureKind {
        match outcome {
            ProviderOutcome::Failure(failure) => failure.kind,
            ProviderOutcome::Success(text) => panic!("expected failure, got {text}"),
        }
    }

    #[test]
    fn test_success_joins_text_parts() {
        let server = StubServer::respond(
            200,
            r#"{"candidates": [{"content": {"role": "model", "parts": [{"text": "{\"name\": "}, {"text": "\"Y\"}"}]}, "finishReason": "STOP"}]}"#,
        );
        let outcome = provider(&server.base_url).generate(&workout_prompt("core", &[]));
        assert_eq!(outcome, ProviderOutcome::Success(r#"{"name": "Y"}"#.into()));

        let request = server.request();
        assert!(request.starts_with("POST /models/gemini-1.5-flash:generateContent"));
        assert!(request.to_lowercase().contains("x-goog-api-key: g-test"));
        assert!(request.contains("\"maxOutputTokens\":2000"));
    }

    #[test]
    fn test_resource_exhausted_is_quota() {
        let server = StubServer::respond(
            429,
            r#"{"error": {"code": 429, "message": "Resource has been exhausted (e.g. check quota).", "status": "RESOURCE_EXHAUSTED"}}"#,
        );
        let outcome = provider(&server.base_url).generate(&workout_prompt("core", &[]));
        assert_eq!(failure_kind(outcome), FailureKind::QuotaExceeded);
    }

    #[test]
    fn test_invalid_key_is_unauthorized() {
        let server = StubServer::respond(
            400,
            r#"{"error": {"code": 400, "message": "API key not valid. Please pass a valid API key.", "status": "INVALID_ARGUMENT"}}"#,
        );
        let outcome = provider(&server.base_url).generate(&workout_prompt("core", &[]));
        assert_eq!(failure_kind(outcome), FailureKind::Unauthorized);
    }

    #[test]
    fn test_prompt_feedback_block() {
        let server = StubServer::respond(200, r#"{"promptFeedback": {"blockReason": "SAFETY"}}"#);
        let outcome = provider(&server.base_url).generate(&workout_prompt("core", &[]));
        assert_eq!(failure_kind(outcome), FailureKind::SafetyBlocked);
    }

    #[test]
    fn test_safety_finish_reason() {
        let server = StubServer::respond(
            200,
            r#"{"candidates": [{"finishReason": "SAFETY"}]}"#,
        );
        let outcome = provider(&server.base_url).generate(&workout_prompt("core", &[]));
        assert_eq!(failure_kind(outcome), FailureKind::SafetyBlocked);
    }

    #[test]
    fn test_server_error() {
        let server = StubServer::respond(503, r#"{"error": {"message": "overloaded"}}"#);
        let outcome = provider(&server.base_url).generate(&workout_prompt("core", &[]));
        assert_eq!(failure_kind(outcome), FailureKind::ServerError);
    }

    #[test]
    fn test_check_status_fetches_model() {
        let server = StubServer::respond(200, r#"{"name": "models/gemini-1.5-flash"}"#);
        let status = provider(&server.base_url).check_status().unwrap();
        assert_eq!(status.model, "gemini-1.5-flash");
        assert!(server.request().starts_with("GET /models/gemini-1.5-flash "));
    }
}
