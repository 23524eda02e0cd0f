//! Text-generation providers.
//!
//! A provider makes exactly one outbound call per `generate` and reports the
//! outcome as raw text or a classified failure. Retrying, ordering and
//! falling back are the orchestrator's job.

pub mod gemini;
pub mod openai;
mod scripted;

pub use gemini::GeminiProvider;
pub use openai::OpenAiProvider;
pub use scripted::ScriptedProvider;

use crate::prompt::Prompt;
use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;
use std::time::Duration;

/// Longest slice of an error body carried into a failure message
const MAX_ERROR_MESSAGE_CHARS: usize = 300;

/// Classified reason a provider call failed
#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum FailureKind {
    Unauthorized,
    QuotaExceeded,
    RateLimited,
    SafetyBlocked,
    NotFound,
    ServerError,
    NetworkError,
    Unknown,
}

impl FailureKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            FailureKind::Unauthorized => "unauthorized",
            FailureKind::QuotaExceeded => "quota_exceeded",
            FailureKind::RateLimited => "rate_limited",
            FailureKind::SafetyBlocked => "safety_blocked",
            FailureKind::NotFound => "not_found",
            FailureKind::ServerError => "server_error",
            FailureKind::NetworkError => "network_error",
            FailureKind::Unknown => "unknown",
        }
    }
}

impl fmt::Display for FailureKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A failed provider call
#[derive(Clone, Debug, Serialize, PartialEq, Eq)]
pub struct ProviderFailure {
    pub provider: String,
    pub kind: FailureKind,
    pub message: String,
}

impl ProviderFailure {
    pub fn new(provider: &str, kind: FailureKind, message: impl Into<String>) -> Self {
        Self {
            provider: provider.to_string(),
            kind,
            message: message.into(),
        }
    }

    /// Failure for a request that never produced an HTTP response
    pub fn transport(provider: &str, err: &reqwest::Error) -> Self {
        let message = if err.is_timeout() {
            format!("request timed out: {}", err)
        } else {
            format!("request failed: {}", err)
        };
        Self::new(provider, FailureKind::NetworkError, message)
    }
}

impl From<ProviderFailure> for Error {
    fn from(failure: ProviderFailure) -> Self {
        Error::Provider {
            provider: failure.provider,
            kind: failure.kind,
            message: failure.message,
        }
    }
}

/// Result of one provider call
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ProviderOutcome {
    Success(String),
    Failure(ProviderFailure),
}

/// Result of an administrative status check
#[derive(Clone, Debug, Serialize, PartialEq, Eq)]
pub struct ProviderStatus {
    pub provider: String,
    pub model: String,
    pub message: String,
}

/// One external text-generation service
pub trait ProviderClient: Send + Sync + fmt::Debug {
    /// Identifier used as the provenance tag
    fn id(&self) -> &str;

    /// Send the prompt, one attempt, no retries
    fn generate(&self, prompt: &Prompt) -> ProviderOutcome;

    /// Check that the service is reachable with the configured credentials
    fn check_status(&self) -> Result<ProviderStatus>;
}

impl<P: ProviderClient + ?Sized> ProviderClient for std::sync::Arc<P> {
    fn id(&self) -> &str {
        (**self).id()
    }

    fn generate(&self, prompt: &Prompt) -> ProviderOutcome {
        (**self).generate(prompt)
    }

    fn check_status(&self) -> Result<ProviderStatus> {
        (**self).check_status()
    }
}

/// Everything an HTTP provider needs, with the API key already resolved
#[derive(Clone)]
pub struct ProviderSettings {
    pub id: String,
    pub model: String,
    pub base_url: String,
    pub api_key: String,
    pub timeout: Duration,
    pub max_tokens: u32,
    pub temperature: f32,
}

impl fmt::Debug for ProviderSettings {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ProviderSettings")
            .field("id", &self.id)
            .field("model", &self.model)
            .field("base_url", &self.base_url)
            .field("api_key", &"[REDACTED]")
            .field("timeout", &self.timeout)
            .field("max_tokens", &self.max_tokens)
            .field("temperature", &self.temperature)
            .finish()
    }
}

impl ProviderSettings {
    fn http_client(&self) -> Result<reqwest::blocking::Client> {
        reqwest::blocking::Client::builder()
            .timeout(self.timeout)
            .build()
            .map_err(|e| Error::Config(format!("Failed to build HTTP client for {}: {}", self.id, e)))
    }

    fn endpoint(&self, path: &str) -> String {
        format!("{}/{}", self.base_url.trim_end_matches('/'), path)
    }
}

/// Map an HTTP error status and body onto a failure kind
pub fn classify_status(status: u16, body: &str) -> FailureKind {
    let lower = body.to_lowercase();
    let mentions_quota = lower.contains("quota") || lower.contains("resource_exhausted");
    let mentions_safety = lower.contains("safety")
        || lower.contains("blocked")
        || lower.contains("content_policy")
        || lower.contains("content_filter");

    match status {
        401 | 403 => FailureKind::Unauthorized,
        402 => FailureKind::QuotaExceeded,
        404 => FailureKind::NotFound,
        429 if mentions_quota => FailureKind::QuotaExceeded,
        429 => FailureKind::RateLimited,
        500..=599 => FailureKind::ServerError,
        400 if lower.contains("api key") || lower.contains("api_key_invalid") => {
            FailureKind::Unauthorized
        }
        _ if mentions_safety => FailureKind::SafetyBlocked,
        _ => FailureKind::Unknown,
    }
}

/// Best human-readable message in an error body
///
/// Both supported APIs wrap errors as `{"error": {"message": ...}}`.
fn error_message(body: &str) -> String {
    let from_json = serde_json::from_str::<Value>(body).ok().and_then(|v| {
        v.pointer("/error/message")
            .and_then(Value::as_str)
            .map(str::to_string)
    });

    from_json.unwrap_or_else(|| body.trim().chars().take(MAX_ERROR_MESSAGE_CHARS).collect())
}

/// Read a response body, classifying transport and HTTP failures
fn read_body(
    provider: &str,
    response: reqwest::Result<reqwest::blocking::Response>,
) -> std::result::Result<String, ProviderFailure> {
    let response = response.map_err(|e| ProviderFailure::transport(provider, &e))?;
    let status = response.status();
    let body = response
        .text()
        .map_err(|e| ProviderFailure::transport(provider, &e))?;

    if status.is_success() {
        return Ok(body);
    }

    let kind = classify_status(status.as_u16(), &body);
    Err(ProviderFailure::new(
        provider,
        kind,
        format!("HTTP {}: {}", status.as_u16(), error_message(&body)),
    ))
}

/// Loopback HTTP server answering a single request with a canned response
#[cfg(test)]
pub(crate) mod stub {
    use std::io::{Read, Write};
    use std::net::{TcpListener, TcpStream};
    use std::thread::JoinHandle;
    use std::time::Duration;

    pub struct StubServer {
        pub base_url: String,
        handle: JoinHandle<String>,
    }

    impl StubServer {
        pub fn respond(status: u16, body: &str) -> Self {
            let listener = TcpListener::bind("127.0.0.1:0").unwrap();
            let addr = listener.local_addr().unwrap();
            let body = body.to_string();

            let handle = std::thread::spawn(move || {
                let (mut stream, _) = listener.accept().unwrap();
                let request = read_request(&mut stream);
                let response = format!(
                    "HTTP/1.1 {} Stub\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{}",
                    status,
                    body.len(),
                    body
                );
                stream.write_all(response.as_bytes()).unwrap();
                stream.flush().unwrap();
                request
            });

            Self {
                base_url: format!("http://{}", addr),
                handle,
            }
        }

        /// Accept one request and hold the connection open without answering
        pub fn silent(hold: Duration) -> Self {
            let listener = TcpListener::bind("127.0.0.1:0").unwrap();
            let addr = listener.local_addr().unwrap();

            let handle = std::thread::spawn(move || {
                let (mut stream, _) = listener.accept().unwrap();
                let request = read_request(&mut stream);
                std::thread::sleep(hold);
                request
            });

            Self {
                base_url: format!("http://{}", addr),
                handle,
            }
        }

        /// The raw request the server received
        pub fn request(self) -> String {
            self.handle.join().unwrap()
        }
    }

    /// Base URL of a port nothing is listening on
    pub fn closed_port_url() -> String {
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let addr = listener.local_addr().unwrap();
        drop(listener);
        format!("http://{}", addr)
    }

    fn read_request(stream: &mut TcpStream) -> String {
        let mut buf = Vec::new();
        let mut chunk = [0u8; 4096];

        loop {
            let n = stream.read(&mut chunk).unwrap();
            if n == 0 {
                break;
            }
            buf.extend_from_slice(&chunk[..n]);

            if let Some(pos) = buf.windows(4).position(|w| w == b"\r\n\r\n") {
                let headers = String::from_utf8_lossy(&buf[..pos]).to_lowercase();
                let content_length = headers
                    .lines()
                    .find_map(|line| line.strip_prefix("content-length:"))
                    .and_then(|v| v.trim().parse::<usize>().ok())
                    .unwrap_or(0);
                if buf.len() >= pos + 4 + content_length {
                    break;
                }
            }
        }

        String::from_utf8_lossy(&buf).into_owned()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_mapping() {
        assert_eq!(classify_status(401, ""), FailureKind::Unauthorized);
        assert_eq!(classify_status(403, ""), FailureKind::Unauthorized);
        assert_eq!(classify_status(402, ""), FailureKind::QuotaExceeded);
        assert_eq!(classify_status(404, ""), FailureKind::NotFound);
        assert_eq!(classify_status(429, "slow down"), FailureKind::RateLimited);
        assert_eq!(classify_status(500, ""), FailureKind::ServerError);
        assert_eq!(classify_status(503, "blocked"), FailureKind::ServerError);
        assert_eq!(classify_status(418, ""), FailureKind::Unknown);
    }

    #[test]
    fn test_quota_bodies_on_429() {
        let openai = r#"{"error": {"message": "You exceeded your current quota", "type": "insufficient_quota"}}"#;
        assert_eq!(classify_status(429, openai), FailureKind::QuotaExceeded);

        let gemini = r#"{"error": {"code": 429, "status": "RESOURCE_EXHAUSTED"}}"#;
        assert_eq!(classify_status(429, gemini), FailureKind::QuotaExceeded);
    }

    #[test]
    fn test_safety_and_key_bodies_on_400() {
        assert_eq!(
            classify_status(400, r#"{"error": {"code": "content_policy_violation"}}"#),
            FailureKind::SafetyBlocked
        );
        assert_eq!(
            classify_status(400, r#"{"error": {"message": "API key not valid. Please pass a valid API key."}}"#),
            FailureKind::Unauthorized
        );
    }

    #[test]
    fn test_error_message_prefers_json() {
        assert_eq!(
            error_message(r#"{"error": {"message": "Invalid model"}}"#),
            "Invalid model"
        );
        assert_eq!(error_message("  plain text  "), "plain text");
        assert_eq!(error_message(&"x".repeat(1000)).len(), MAX_ERROR_MESSAGE_CHARS);
    }

    #[test]
    fn test_failure_converts_to_error() {
        let err: Error =
            ProviderFailure::new("openai", FailureKind::Unauthorized, "HTTP 401: bad key").into();
        assert!(matches!(
            err,
            Error::Provider {
                kind: FailureKind::Unauthorized,
                ..
            }
        ));
        assert!(err.to_string().contains("openai"));
    }

    #[test]
    fn test_settings_debug_hides_key() {
        let settings = ProviderSettings {
            id: "openai".into(),
            model: "gpt-3.5-turbo".into(),
            base_url: "https://api.openai.com/v1".into(),
            api_key: "sk-secret".into(),
            timeout: Duration::from_secs(30),
            max_tokens: 2000,
            temperature: 0.7,
        };
        assert!(!format!("{:?}", settings).contains("sk-secret"));
    }
}
