//! Unified error types for bloop.
//!
//! This module provides a single [`BloopError`] enum that covers all error
//! cases in the analysis pipeline. Subsystem failures are values, not panics:
//! the orchestrator decides per variant whether a failure is fatal to the
//! request or degrades it (stats nulled, AI skipped).
//!
//! # Error Handling Philosophy
//!
//! - **Library users** get typed errors they can match on
//! - **The HTTP layer** maps variants onto status codes in one place
//! - **Developers** get source error chains for debugging

use std::io;

use thiserror::Error;

/// A specialized [`Result`] type for bloop operations.
///
/// # Example
///
/// ```rust
/// use bloop::error::Result;
/// use bloop::message::ParsedMessage;
///
/// fn my_function() -> Result<Vec<ParsedMessage>> {
///     // ... operations that may fail
///     Ok(vec![])
/// }
/// ```
pub type Result<T> = std::result::Result<T, BloopError>;

/// The error type for all bloop operations.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum BloopError {
    /// Reading the transcript byte stream failed, or the parse task died
    /// before producing output.
    ///
    /// The one request-fatal error on the parsing side (HTTP 500);
    /// malformed lines are silently skipped, never fatal.
    #[error("IO error: {0}")]
    Io(#[from] io::Error),

    /// The statistics engine was handed an empty message list.
    #[error("cannot calculate statistics on empty message list")]
    EmptyMessageList,

    /// A statistics invariant broke mid-computation.
    ///
    /// Surfaced to the client as a nulled `stats` field plus an
    /// annotation in the result's `error` string.
    #[error("statistics failed: {0}")]
    Stats(String),

    /// The AI admission queue stayed full past the enqueue timeout.
    ///
    /// The only AI-side failure that fails the whole request (HTTP 429).
    #[error("AI analysis queue is full, server is busy")]
    AiQueueTimeout,

    /// The AI worker dropped its result channel without answering.
    #[error("AI worker closed channel unexpectedly")]
    AiChannelClosed,

    /// The LLM call failed after all retries and key fallbacks.
    #[error("AI analysis failed: {0}")]
    Llm(#[from] crate::llm::LlmError),
}

impl BloopError {
    /// Creates a statistics error.
    pub fn stats(message: impl Into<String>) -> Self {
        BloopError::Stats(message.into())
    }

    /// Returns `true` if this is an IO error.
    pub fn is_io(&self) -> bool {
        matches!(self, BloopError::Io(_))
    }

    /// Returns `true` if this is the admission-timeout error.
    pub fn is_queue_timeout(&self) -> bool {
        matches!(self, BloopError::AiQueueTimeout)
    }

    /// Returns `true` when the underlying cause is cancellation or an
    /// elapsed deadline.
    ///
    /// The orchestrator swallows these from the AI branch: the LLM blob
    /// stays `None` and no error text is appended.
    pub fn is_cancellation(&self) -> bool {
        matches!(
            self,
            BloopError::Llm(e) if e.is_cancellation()
        )
    }
}
