//! Client for the upstream chat-completions API.
//!
//! The upstream is flaky by nature: rate limits, transient 5xx, the
//! occasional response that is not the JSON object we asked for. The client
//! wraps one logical "narrate this chat" call in per-key retries with
//! exponential backoff and jitter, rotating across primary credentials and
//! falling back to a reserve key only after every primary failed within the
//! request. Responses must be a syntactically valid JSON object; anything
//! else is terminal, not retried.
//!
//! Deadlines and cancellation are enforced by the caller (the worker pool
//! races this client against the task deadline and the requester going
//! away); the per-call HTTP timeout lives on the `reqwest` client.

pub mod keys;
pub mod prompt;

use std::collections::BTreeMap;
use std::time::Duration;

use rand::Rng;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, info, warn};

use self::keys::KeyRing;
use self::prompt::system_prompt;

/// Retry/backoff shape for one key.
const BACKOFF_BASE_SECONDS: f64 = 2.0;
const BACKOFF_CAP_SECONDS: f64 = 5.0;
const JITTER_FACTOR: f64 = 0.2;

/// Errors from the LLM client.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum LlmError {
    /// The HTTP client could not be constructed.
    #[error("failed to build HTTP client: {0}")]
    Init(String),

    /// Transport-level failure (DNS, connect, read, client timeout).
    #[error("HTTP request failed: {0}")]
    Network(String),

    /// Non-2xx response from the upstream.
    #[error("API error: status {status}: {message}")]
    Api { status: u16, message: String },

    /// 2xx response with no usable choice content.
    #[error("no valid choices/content returned (status {status})")]
    EmptyChoices { status: u16 },

    /// Content did not look like or parse as a JSON object.
    #[error("model output is not a JSON object: {preview}")]
    NotJson { preview: String },

    /// The sample payload could not be serialized.
    #[error("failed to serialize messages for the model: {0}")]
    Serialize(#[from] serde_json::Error),

    /// The task deadline elapsed while the call was in flight.
    #[error("deadline exceeded during AI analysis")]
    DeadlineExceeded,

    /// The requester went away before the call finished.
    #[error("request cancelled during AI analysis")]
    Cancelled,
}

impl LlmError {
    /// Cancellation and elapsed deadlines are non-failures to the
    /// orchestrator: no error text reaches the client.
    pub fn is_cancellation(&self) -> bool {
        matches!(self, LlmError::Cancelled | LlmError::DeadlineExceeded)
    }

    /// Whether another attempt with the same key makes sense.
    pub fn is_retryable(&self) -> bool {
        match self {
            LlmError::Network(_) => true,
            LlmError::Api { status, .. } => *status == 429 || *status >= 500,
            LlmError::EmptyChoices { .. } => true,
            _ => false,
        }
    }
}

/// Settings for the narrative client.
#[derive(Debug, Clone)]
pub struct LlmConfig {
    /// Chat-completions endpoint URL.
    pub endpoint: String,
    /// Model identifier sent with every request.
    pub model: String,
    /// Sampling temperature. The default (1.3) is part of the output's
    /// character; don't change it silently.
    pub temperature: f64,
    pub max_tokens: u32,
    /// Attempts per key.
    pub retry_attempts: u32,
    /// Per-call HTTP timeout.
    pub request_timeout: Duration,
    /// Senders above this count get no per-person block and no AI run.
    pub max_users_for_people_block: usize,
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            endpoint: "https://api.groq.com/openai/v1/chat/completions".to_string(),
            model: "meta-llama/llama-4-scout-17b-16e-instruct".to_string(),
            temperature: 1.3,
            max_tokens: 4096,
            retry_attempts: 3,
            request_timeout: Duration::from_secs(30),
            max_users_for_people_block: 10,
        }
    }
}

// Wire types for the chat-completions exchange.

#[derive(Debug, Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: [ChatMessage<'a>; 2],
    temperature: f64,
    max_tokens: u32,
    response_format: ResponseFormat<'a>,
}

#[derive(Debug, Serialize)]
struct ChatMessage<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Debug, Serialize)]
struct ResponseFormat<'a> {
    #[serde(rename = "type")]
    kind: &'a str,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    #[serde(default)]
    choices: Vec<ChatChoice>,
    #[serde(default)]
    error: Option<UpstreamError>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: ChatChoiceMessage,
}

#[derive(Debug, Deserialize)]
struct ChatChoiceMessage {
    #[serde(default)]
    content: String,
}

#[derive(Debug, Deserialize)]
struct UpstreamError {
    #[serde(default)]
    message: String,
    #[serde(default, rename = "type")]
    kind: String,
}

/// Client producing the narrative JSON blob for one chat.
#[derive(Debug)]
pub struct NarrativeClient {
    http: reqwest::Client,
    config: LlmConfig,
    keys: KeyRing,
}

impl NarrativeClient {
    pub fn new(config: LlmConfig, keys: KeyRing) -> Result<Self, LlmError> {
        let http = reqwest::Client::builder()
            .timeout(config.request_timeout)
            .build()
            .map_err(|e| LlmError::Init(e.to_string()))?;
        Ok(Self { http, config, keys })
    }

    /// `true` when no upstream credential is configured; the caller may
    /// skip scheduling entirely.
    pub fn is_disabled(&self) -> bool {
        self.keys.is_empty()
    }

    /// Narrates one chat from its stratified sample.
    ///
    /// Returns `Ok(None)` when the call is skipped (no credentials, empty
    /// sample) — skipping is not an error.
    pub async fn narrate(
        &self,
        sample: &BTreeMap<String, Vec<String>>,
        user_count: usize,
    ) -> Result<Option<String>, LlmError> {
        if self.keys.is_empty() {
            info!("skipping AI analysis: no API keys configured");
            return Ok(None);
        }
        if sample.is_empty() {
            info!("no messages eligible for AI analysis after grouping and stratifying");
            return Ok(None);
        }

        let user_content = serde_json::to_string_pretty(sample)?;
        let system = system_prompt(user_count, self.config.max_users_for_people_block);

        let mut last_err: Option<LlmError> = None;

        for _ in 0..self.keys.primary_count() {
            let Some((key, key_name)) = self.keys.next_primary() else {
                break;
            };
            match self.invoke(&key, &key_name, &system, &user_content).await {
                Ok(blob) => {
                    info!(key = %key_name, "AI analysis successful");
                    return Ok(Some(blob));
                }
                Err(e) => {
                    warn!(key = %key_name, "attempt failed: {e}");
                    if e.is_cancellation() {
                        return Err(e);
                    }
                    last_err = Some(e);
                }
            }
        }

        if let Some(fallback) = self.keys.fallback() {
            info!("primary keys failed or unavailable, attempting fallback key");
            match self.invoke(fallback, "fallback key", &system, &user_content).await {
                Ok(blob) => return Ok(Some(blob)),
                Err(e) => last_err = Some(e),
            }
        }

        Err(last_err.unwrap_or(LlmError::Network("no usable API key".to_string())))
    }

    /// One key's worth of attempts against the upstream.
    async fn invoke(
        &self,
        key: &str,
        key_name: &str,
        system: &str,
        user_content: &str,
    ) -> Result<String, LlmError> {
        let mut last_err = LlmError::Network("no attempt made".to_string());

        for attempt in 1..=self.config.retry_attempts {
            if attempt > 1 {
                let wait = backoff_with_jitter(attempt);
                debug!(
                    key = %key_name,
                    attempt,
                    wait_ms = wait.as_millis() as u64,
                    "retrying after error: {last_err}"
                );
                tokio::time::sleep(wait).await;
            }

            let request = ChatRequest {
                model: &self.config.model,
                messages: [
                    ChatMessage {
                        role: "system",
                        content: system,
                    },
                    ChatMessage {
                        role: "user",
                        content: user_content,
                    },
                ],
                temperature: self.config.temperature,
                max_tokens: self.config.max_tokens,
                response_format: ResponseFormat {
                    kind: "json_object",
                },
            };

            let response = match self
                .http
                .post(&self.config.endpoint)
                .bearer_auth(key)
                .json(&request)
                .send()
                .await
            {
                Ok(r) => r,
                Err(e) => {
                    last_err = LlmError::Network(e.to_string());
                    warn!(key = %key_name, attempt, "HTTP request failed: {e}");
                    continue;
                }
            };

            let status = response.status();
            let body = match response.text().await {
                Ok(b) => b,
                Err(e) => {
                    last_err = LlmError::Network(format!(
                        "failed to read response body (status {status}): {e}"
                    ));
                    continue;
                }
            };

            if !status.is_success() {
                let parsed: Option<ChatResponse> = serde_json::from_str(&body).ok();
                let message = match parsed.and_then(|r| r.error) {
                    Some(e) => format!("{}: {}", e.kind, e.message),
                    None => preview(&body, 150),
                };
                let err = LlmError::Api {
                    status: status.as_u16(),
                    message,
                };
                if err.is_retryable() {
                    warn!(key = %key_name, attempt, "retryable upstream error: {err}");
                    last_err = err;
                    continue;
                }
                return Err(err);
            }

            let parsed: ChatResponse = serde_json::from_str(&body).map_err(|e| LlmError::Api {
                status: status.as_u16(),
                message: format!("undecodable success body: {e}: {}", preview(&body, 150)),
            })?;

            let content = parsed
                .choices
                .first()
                .map(|c| c.message.content.as_str())
                .unwrap_or_default();
            if content.is_empty() {
                last_err = LlmError::EmptyChoices {
                    status: status.as_u16(),
                };
                continue;
            }

            return validate_json_object(content);
        }

        Err(last_err)
    }
}

/// Exponential backoff with ±20 % jitter, capped.
fn backoff_with_jitter(attempt: u32) -> Duration {
    let backoff = BACKOFF_BASE_SECONDS
        .powi(attempt.saturating_sub(1) as i32)
        .min(BACKOFF_CAP_SECONDS);
    let jitter = backoff * JITTER_FACTOR * rand::thread_rng().gen_range(-1.0..1.0);
    Duration::from_secs_f64((backoff + jitter).max(0.1))
}

/// Accepts only a trimmed, syntactically valid JSON object.
fn validate_json_object(content: &str) -> Result<String, LlmError> {
    let trimmed = content.trim();
    if !(trimmed.starts_with('{') && trimmed.ends_with('}')) {
        return Err(LlmError::NotJson {
            preview: preview(trimmed, 100),
        });
    }
    match serde_json::from_str::<serde_json::Value>(trimmed) {
        Ok(_) => Ok(trimmed.to_string()),
        Err(e) => Err(LlmError::NotJson {
            preview: format!("{e}: {}", preview(trimmed, 100)),
        }),
    }
}

fn preview(text: &str, max_chars: usize) -> String {
    if text.chars().count() <= max_chars {
        return text.to_string();
    }
    let cut: String = text.chars().take(max_chars).collect();
    format!("{cut}...")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validate_accepts_json_object() {
        let out = validate_json_object("  {\"summary\": \"ok\"}  ").unwrap();
        assert_eq!(out, "{\"summary\": \"ok\"}");
    }

    #[test]
    fn test_validate_rejects_plain_text() {
        let err = validate_json_object("Sure! Here is your summary.").unwrap_err();
        assert!(matches!(err, LlmError::NotJson { .. }));
    }

    #[test]
    fn test_validate_rejects_broken_json() {
        let err = validate_json_object("{\"summary\": }").unwrap_err();
        assert!(matches!(err, LlmError::NotJson { .. }));
        assert!(!err.is_retryable());
    }

    #[test]
    fn test_validate_rejects_json_array() {
        let err = validate_json_object("[1, 2, 3]").unwrap_err();
        assert!(matches!(err, LlmError::NotJson { .. }));
    }

    #[test]
    fn test_retryability_classification() {
        assert!(LlmError::Api {
            status: 429,
            message: String::new()
        }
        .is_retryable());
        assert!(LlmError::Api {
            status: 503,
            message: String::new()
        }
        .is_retryable());
        assert!(!LlmError::Api {
            status: 401,
            message: String::new()
        }
        .is_retryable());
        assert!(LlmError::Network("reset".into()).is_retryable());
        assert!(!LlmError::Cancelled.is_retryable());
    }

    #[test]
    fn test_cancellation_classification() {
        assert!(LlmError::Cancelled.is_cancellation());
        assert!(LlmError::DeadlineExceeded.is_cancellation());
        assert!(!LlmError::Network("reset".into()).is_cancellation());
    }

    #[test]
    fn test_backoff_grows_and_caps() {
        for _ in 0..50 {
            let second = backoff_with_jitter(2).as_secs_f64();
            assert!(second >= 2.0 * 0.8 - 1e-9 && second <= 2.0 * 1.2 + 1e-9);

            let fifth = backoff_with_jitter(5).as_secs_f64();
            assert!(fifth <= BACKOFF_CAP_SECONDS * 1.2 + 1e-9);
        }
    }

    #[test]
    fn test_preview_truncates_on_char_boundary() {
        let text = "эмодзи и кириллица в ответе модели";
        let p = preview(text, 10);
        assert!(p.ends_with("..."));
        assert_eq!(p.chars().count(), 13);
    }

    #[tokio::test]
    async fn test_narrate_skips_without_credentials() {
        let client = NarrativeClient::new(LlmConfig::default(), KeyRing::new(vec![], None)).unwrap();
        assert!(client.is_disabled());
        let sample = BTreeMap::from([("Alice".to_string(), vec!["hello there friend".to_string()])]);
        let out = client.narrate(&sample, 2).await.unwrap();
        assert!(out.is_none());
    }

    #[tokio::test]
    async fn test_narrate_skips_empty_sample() {
        let client = NarrativeClient::new(
            LlmConfig::default(),
            KeyRing::new(vec!["key".into()], None),
        )
        .unwrap();
        let out = client.narrate(&BTreeMap::new(), 2).await.unwrap();
        assert!(out.is_none());
    }
}
