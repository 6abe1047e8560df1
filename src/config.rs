//! Process configuration.
//!
//! Everything comes from environment variables, read once at startup into an
//! immutable record. Missing variables take documented defaults; malformed
//! values log a warning and fall back rather than killing the process.
//! Components receive the fields they need, not the whole record.

use std::env;
use std::fmt::Display;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use tracing::warn;

use crate::lexicon::DEFAULT_DATA_DIR;
use crate::llm::LlmConfig;

/// Server-wide settings, loaded once.
#[derive(Debug, Clone)]
pub struct Config {
    /// `HOST` (default `0.0.0.0`).
    pub host: String,
    /// `PORT` (default `8000`).
    pub port: u16,
    /// `TEMP_DIR_ROOT` (default `<system temp>/bloop`).
    pub temp_dir_root: PathBuf,
    /// `MAX_TEMP_FILE_AGE_SECONDS` (default 6000).
    pub max_temp_file_age: Duration,
    /// `MAX_UPLOAD_SIZE_MB` (default 25), stored in bytes.
    pub max_upload_size_bytes: u64,
    /// `ANALYSIS_TIMEOUT_SECONDS` (default 300).
    pub analysis_timeout: Duration,
    /// `MAX_CONCURRENT_AI_CALLS` (default 4): worker count and queue depth.
    pub max_concurrent_ai_calls: usize,
    /// `AI_QUEUE_TIMEOUT_SECONDS` (default 20).
    pub ai_queue_timeout: Duration,
    /// `VAL_API_KEY`: enables API-key protection when set.
    pub api_key: Option<String>,
    /// `ALLOWED_ORIGINS`, comma-separated (default `http://localhost:3000`).
    pub allowed_origins: Vec<String>,
    /// `DATA_DIR`: stop-words and system-pattern side files.
    pub data_dir: PathBuf,
    /// LLM endpoint, model, and tunables.
    pub llm: LlmConfig,
    /// `LLM_API_KEY1`..`LLM_API_KEY7`, in order.
    pub llm_primary_keys: Vec<String>,
    /// `LLM_FALLBACK_API_KEY`.
    pub llm_fallback_key: Option<String>,
}

impl Config {
    /// Reads the whole configuration from the process environment.
    pub fn from_env() -> Self {
        let host = env::var("HOST").unwrap_or_else(|_| "0.0.0.0".to_string());
        let port: u16 = parse_env("PORT", 8000);

        let temp_dir_root = env::var("TEMP_DIR_ROOT")
            .map(PathBuf::from)
            .unwrap_or_else(|_| env::temp_dir().join("bloop"));

        let max_temp_file_age = Duration::from_secs(parse_env("MAX_TEMP_FILE_AGE_SECONDS", 6000));
        let max_upload_size_bytes = parse_env::<u64>("MAX_UPLOAD_SIZE_MB", 25) * 1024 * 1024;
        let analysis_timeout = Duration::from_secs(parse_env("ANALYSIS_TIMEOUT_SECONDS", 300));
        let max_concurrent_ai_calls = parse_env("MAX_CONCURRENT_AI_CALLS", 4usize).max(1);
        let ai_queue_timeout = Duration::from_secs(parse_env("AI_QUEUE_TIMEOUT_SECONDS", 20));

        let api_key = env::var("VAL_API_KEY").ok().filter(|k| !k.is_empty());
        if api_key.is_none() {
            warn!("VAL_API_KEY not set; API key protection is disabled");
        }

        let allowed_origins = env::var("ALLOWED_ORIGINS")
            .unwrap_or_else(|_| "http://localhost:3000".to_string())
            .split(',')
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .collect();

        let data_dir = env::var("DATA_DIR")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from(DEFAULT_DATA_DIR));

        let defaults = LlmConfig::default();
        let llm = LlmConfig {
            endpoint: env::var("LLM_API_URL").unwrap_or(defaults.endpoint),
            model: env::var("LLM_MODEL").unwrap_or(defaults.model),
            temperature: parse_env("LLM_TEMPERATURE", defaults.temperature),
            max_tokens: parse_env("LLM_MAX_TOKENS", defaults.max_tokens),
            retry_attempts: parse_env("LLM_RETRY_ATTEMPTS", defaults.retry_attempts).max(1),
            request_timeout: Duration::from_secs(parse_env("LLM_REQUEST_TIMEOUT_SECONDS", 30)),
            max_users_for_people_block: parse_env(
                "MAX_USERS_FOR_PEOPLE_BLOCK",
                defaults.max_users_for_people_block,
            ),
        };

        let llm_primary_keys: Vec<String> = (1..=7)
            .filter_map(|i| env::var(format!("LLM_API_KEY{i}")).ok())
            .filter(|k| !k.is_empty())
            .collect();
        let llm_fallback_key = env::var("LLM_FALLBACK_API_KEY").ok().filter(|k| !k.is_empty());

        if llm_primary_keys.is_empty() && llm_fallback_key.is_none() {
            warn!("no LLM API keys found in environment; AI analysis is disabled");
        }

        Self {
            host,
            port,
            temp_dir_root,
            max_temp_file_age,
            max_upload_size_bytes,
            analysis_timeout,
            max_concurrent_ai_calls,
            ai_queue_timeout,
            api_key,
            allowed_origins,
            data_dir,
            llm,
            llm_primary_keys,
            llm_fallback_key,
        }
    }

    /// The socket address string the server binds.
    pub fn listen_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

/// Parses an environment variable; a present-but-malformed value logs a
/// warning and yields the default.
fn parse_env<T>(name: &str, default: T) -> T
where
    T: FromStr + Display + Copy,
{
    match env::var(name) {
        Ok(raw) => match raw.trim().parse() {
            Ok(value) => value,
            Err(_) => {
                warn!("invalid {name}={raw:?}, falling back to {default}");
                default
            }
        },
        Err(_) => default,
    }
}
