//! The normalized transcript record.
//!
//! Every transcript line that survives the header grammar, the system-message
//! filter, and timestamp parsing becomes one [`ParsedMessage`]. The parser
//! emits records strictly in file order, and the statistics engine treats
//! that order as authoritative.

use chrono::NaiveDateTime;

/// One accepted message from a chat transcript.
///
/// Two views of the body are kept side by side: `cleaned_message` feeds the
/// word counter and the sampler, while `original_message` is the untouched
/// text used for emoji extraction. `cleaned_message` may legitimately be
/// empty (an emoji-only or very short message still counts as a message).
#[derive(Debug, Clone, PartialEq)]
pub struct ParsedMessage {
    /// When the message was sent. Transcripts carry no zone, so this is a
    /// naive local timestamp with minute (sometimes second) precision.
    pub timestamp: NaiveDateTime,

    /// The date exactly as it appeared in the file, kept for debugging
    /// ambiguous-layout reports.
    pub date_str: String,

    /// Display string of the author. Opaque: may contain spaces, non-Latin
    /// script, or look like a phone number.
    pub sender: String,

    /// Lower-cased body with URLs, punctuation, stop-words, and short
    /// tokens removed.
    pub cleaned_message: String,

    /// The body as it appeared in the file.
    pub original_message: String,
}

impl ParsedMessage {
    /// Creates a record from its parts.
    pub fn new(
        timestamp: NaiveDateTime,
        date_str: impl Into<String>,
        sender: impl Into<String>,
        cleaned_message: impl Into<String>,
        original_message: impl Into<String>,
    ) -> Self {
        Self {
            timestamp,
            date_str: date_str.into(),
            sender: sender.into(),
            cleaned_message: cleaned_message.into(),
            original_message: original_message.into(),
        }
    }

    /// Returns `true` when nothing cleanable survived in the body.
    pub fn has_empty_cleaned_text(&self) -> bool {
        self.cleaned_message.trim().is_empty()
    }
}
