//! Per-request orchestration.
//!
//! One call to [`Analyzer::analyze`] owns the whole request lifecycle:
//! parse, derive chat identity and the dynamic conversation break, fork the
//! statistics pass and the AI branch, join both, and compose the response.
//! Statistics run on a blocking thread (pure CPU); the AI branch goes
//! through the bounded worker pool so a burst of uploads cannot fan out
//! unbounded calls to the upstream.
//!
//! Failure posture: parsing problems are fatal to the request, statistics
//! problems null the `stats` field, and AI problems null the blob — except
//! queue-admission timeouts, which reject the request, and cancellations,
//! which are silent.

use std::collections::BTreeSet;
use std::sync::Arc;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tokio::sync::oneshot;
use tokio::task;
use tokio::time::Instant;
use tracing::{debug, info, warn};

use crate::error::{BloopError, Result};
use crate::lexicon::Lexicon;
use crate::message::ParsedMessage;
use crate::parser::TranscriptParser;
use crate::pool::{AiOutcome, AiPool, AiTask};
use crate::sampler::MessageSampler;
use crate::stats::{gap, ChatStatistics, StatsEngine};

/// Fallback chat name when the upload has no usable filename or senders.
const DEFAULT_CHAT_NAME: &str = "Bloop Analysis";

/// The composed response for one analyzed transcript.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnalysisResult {
    pub chat_name: String,
    /// Raw non-blank line count, pre-normalization.
    pub total_messages: u64,
    pub stats: Option<ChatStatistics>,
    /// Opaque JSON from the model; `null` when skipped or failed.
    pub ai_analysis: Option<serde_json::Value>,
    /// Concatenated non-fatal subsystem errors.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// Request orchestrator. One per process, shared by all requests.
#[derive(Debug)]
pub struct Analyzer {
    lexicon: Arc<Lexicon>,
    pool: Arc<AiPool>,
    ai_queue_timeout: Duration,
    max_users_for_people_block: usize,
    sampler_seed: Option<u64>,
}

impl Analyzer {
    pub fn new(
        lexicon: Arc<Lexicon>,
        pool: Arc<AiPool>,
        ai_queue_timeout: Duration,
        max_users_for_people_block: usize,
    ) -> Self {
        Self {
            lexicon,
            pool,
            ai_queue_timeout,
            max_users_for_people_block,
            sampler_seed: None,
        }
    }

    /// Pins the sampler shuffle for reproducible runs. Used by tests.
    #[must_use]
    pub fn with_sampler_seed(mut self, seed: u64) -> Self {
        self.sampler_seed = Some(seed);
        self
    }

    /// Analyzes one uploaded transcript.
    ///
    /// `deadline` is the request's absolute deadline; the AI branch inherits
    /// it. Fatal errors are queue-admission timeouts and parser-level I/O;
    /// everything else degrades into the result's `error` field.
    pub async fn analyze(
        &self,
        data: Vec<u8>,
        original_filename: &str,
        deadline: Instant,
    ) -> Result<AnalysisResult> {
        let log_tag = format!("[{original_filename}]");

        let outcome = {
            let lexicon = Arc::clone(&self.lexicon);
            task::spawn_blocking(move || {
                let parser = TranscriptParser::new(&lexicon);
                let text = String::from_utf8_lossy(&data);
                parser.parse_text(&text)
            })
            .await
            .map_err(|e| BloopError::Io(std::io::Error::other(e)))?
        };

        let raw_count = outcome.raw_message_count as u64;
        if raw_count == 0 {
            info!(tag = %log_tag, "no messages found after preprocessing");
            return Ok(AnalysisResult {
                chat_name: derive_chat_name(original_filename, &[]),
                total_messages: 0,
                stats: None,
                ai_analysis: None,
                error: Some("No messages found in the file after preprocessing.".to_string()),
            });
        }

        let messages: Arc<Vec<ParsedMessage>> = Arc::new(outcome.messages);
        let users: Vec<String> = messages
            .iter()
            .map(|m| m.sender.clone())
            .collect::<BTreeSet<_>>()
            .into_iter()
            .collect();
        let user_count = users.len();
        let chat_name = derive_chat_name(original_filename, &users);
        let convo_break_minutes = gap::dynamic_convo_break(&messages);

        let stats_handle = {
            let messages = Arc::clone(&messages);
            let lexicon = Arc::clone(&self.lexicon);
            task::spawn_blocking(move || {
                let engine = StatsEngine::new(&lexicon);
                let result = engine.calculate(&messages, convo_break_minutes);
                drop(messages);
                result
            })
        };

        let mut ai_rx: Option<oneshot::Receiver<AiOutcome>> = None;
        let should_run_ai = user_count > 1 && user_count <= self.max_users_for_people_block;
        if should_run_ai {
            let gap_hours = convo_break_minutes as f64 / 60.0;
            let mut sampler = MessageSampler::new(gap_hours);
            if let Some(seed) = self.sampler_seed {
                sampler = sampler.with_seed(seed);
            }
            let sample = sampler.sample(&messages);

            if sample.is_empty() {
                info!(tag = %log_tag, "nothing sampleable for AI analysis");
            } else {
                let (tx, rx) = oneshot::channel();
                let ai_task = AiTask {
                    sample,
                    user_count,
                    gap_hours,
                    deadline,
                    result_tx: tx,
                    log_tag: log_tag.clone(),
                };
                self.pool.submit(ai_task, self.ai_queue_timeout).await?;
                ai_rx = Some(rx);
            }
        } else {
            info!(
                tag = %log_tag,
                user_count,
                max = self.max_users_for_people_block,
                "skipping AI analysis: user count out of range"
            );
        }

        // Both branches own what they need; release this reference so the
        // parsed records die as soon as the stats thread finishes.
        drop(messages);

        let stats_result: Result<ChatStatistics> = match stats_handle.await {
            Ok(result) => result,
            Err(e) => Err(BloopError::stats(format!("statistics task panicked: {e}"))),
        };

        let mut error_messages: Vec<String> = Vec::new();

        let ai_outcome: Option<AiOutcome> = match ai_rx {
            Some(rx) => match rx.await {
                Ok(outcome) => Some(outcome),
                Err(_) => {
                    warn!(tag = %log_tag, "AI result channel closed unexpectedly");
                    error_messages
                        .push(format!("AI analysis failed: {}", BloopError::AiChannelClosed));
                    None
                }
            },
            None => None,
        };

        let stats = match stats_result {
            Ok(mut stats) => {
                stats.total_messages = raw_count;
                Some(stats)
            }
            Err(e) => {
                warn!(tag = %log_tag, "statistics failed: {e}");
                error_messages.push(format!("Statistics failed: {e}"));
                None
            }
        };

        let mut ai_analysis = None;
        if let Some(outcome) = ai_outcome {
            match outcome {
                Ok(Some(blob)) => match serde_json::from_str(&blob) {
                    Ok(value) => ai_analysis = Some(value),
                    Err(e) => {
                        error_messages.push(format!("AI analysis failed: invalid JSON: {e}"))
                    }
                },
                Ok(None) => {}
                Err(e) if e.is_cancellation() => {
                    debug!(tag = %log_tag, "AI branch ended by cancellation: {e}");
                }
                Err(e) => error_messages.push(format!("AI analysis failed: {e}")),
            }
        }

        let error = if error_messages.is_empty() {
            None
        } else {
            let joined = error_messages.join("; ");
            warn!(tag = %log_tag, "analysis complete with errors: {joined}");
            Some(joined)
        };

        Ok(AnalysisResult {
            chat_name,
            total_messages: raw_count,
            stats,
            ai_analysis,
            error,
        })
    }
}

/// Derives the display name for a chat from its filename and sender set.
pub fn derive_chat_name(original_filename: &str, users: &[String]) -> String {
    let display_names = extract_display_names(users);

    let default_name = original_filename
        .strip_suffix(".txt")
        .unwrap_or(original_filename);
    let default_name = if default_name.is_empty() {
        DEFAULT_CHAT_NAME
    } else {
        default_name
    };

    match display_names.len() {
        0 => default_name.to_string(),
        1 => format!("Chat with {}", display_names[0]),
        2 => format!("{} & {}", display_names[0], display_names[1]),
        n => format!("{}, {} & {} others", display_names[0], display_names[1], n - 2),
    }
}

/// First whitespace token containing a letter, per sender. Phone-number-like
/// senders produce nothing (this filter applies to display names only, never
/// to statistics).
fn extract_display_names(users: &[String]) -> Vec<String> {
    users
        .iter()
        .filter_map(|user| {
            let trimmed = user.trim();
            if trimmed.is_empty() || !trimmed.chars().any(char::is_alphabetic) {
                return None;
            }
            trimmed
                .split_whitespace()
                .next()
                .filter(|first| first.chars().any(char::is_alphabetic))
                .map(str::to_string)
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn users(names: &[&str]) -> Vec<String> {
        names.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_chat_name_no_users_uses_filename() {
        assert_eq!(derive_chat_name("family_chat.txt", &[]), "family_chat");
        assert_eq!(derive_chat_name("", &[]), DEFAULT_CHAT_NAME);
    }

    #[test]
    fn test_chat_name_by_user_count() {
        assert_eq!(
            derive_chat_name("x.txt", &users(&["Alice Johnson"])),
            "Chat with Alice"
        );
        assert_eq!(
            derive_chat_name("x.txt", &users(&["Alice J", "Bob K"])),
            "Alice & Bob"
        );
        assert_eq!(
            derive_chat_name("x.txt", &users(&["Alice", "Bob", "Carol", "Dave"])),
            "Alice, Bob & 2 others"
        );
    }

    #[test]
    fn test_phone_numbers_filtered_from_display_names() {
        assert_eq!(
            derive_chat_name("group.txt", &users(&["+1 555 0100", "+7 900 123-45-67"])),
            "group"
        );
        assert_eq!(
            derive_chat_name("x.txt", &users(&["+1 555 0100", "Alice"])),
            "Chat with Alice"
        );
    }

    #[test]
    fn test_display_name_skips_letterless_first_token() {
        // First token carries no letter, so the sender yields no name.
        assert_eq!(extract_display_names(&users(&["123 Alice"])), Vec::<String>::new());
        assert_eq!(extract_display_names(&users(&["Алия Б"])), vec!["Алия"]);
    }
}
