//! Streaming transcript parser with timestamp-layout auto-detection.
//!
//! Exports are plain text, one message per line:
//!
//! ```text
//! [2/3/24, 10:00] Alice: hi there
//! 2/3/24, 10:05 - Bob: hey hey
//! 26/10/2025, 20:40 - Céline: бывает
//! ```
//!
//! Parsing is two-pass over a buffered copy of the stream: the first pass
//! sniffs the timestamp layout from a sample of candidate lines (see
//! [`layout`]), the second pass materializes [`ParsedMessage`] records.
//! Lines that do not match the header grammar are silently skipped;
//! system/media notices are dropped from the record stream but still counted
//! in the raw total. The only fatal error is an unreadable input stream.

pub mod clean;
pub mod layout;

use std::io::Read;

use regex::Regex;
use tracing::{debug, info, warn};

use crate::error::Result;
use crate::lexicon::Lexicon;
use crate::message::ParsedMessage;

use self::clean::TextCleaner;
use self::layout::{normalize_time, sniff_layouts, TimestampLayout, ALL_LAYOUTS};

/// How many candidate lines feed layout sniffing.
const MAX_LINES_TO_SNIFF: usize = 100;

/// Media placeholder markers; matched against the raw body.
const MEDIA_MARKERS: [&str; 3] = ["<attached:", " omitted>", "omitted media"];

/// What one parse produces.
#[derive(Debug)]
pub struct ParseOutcome {
    /// Every non-blank line, counted before any normalization or filtering.
    pub raw_message_count: usize,

    /// Accepted records, in file order.
    pub messages: Vec<ParsedMessage>,
}

/// Transcript parser bound to a loaded [`Lexicon`].
#[derive(Debug)]
pub struct TranscriptParser<'a> {
    lexicon: &'a Lexicon,
    header: Regex,
    cleaner: TextCleaner,
}

impl<'a> TranscriptParser<'a> {
    pub fn new(lexicon: &'a Lexicon) -> Self {
        // Groups: 1 date, 2 time, 3 sender, 4 body. Tolerates a leading
        // left-to-right mark, an optional bracket, a narrow no-break space
        // before AM/PM, and both "] " and " - " separators.
        let header = Regex::new(
            r"(?i)^\s*(?:\x{200e})?\[?(\d{1,2}/\d{1,2}/\d{2,4}),\s*(\d{1,2}:\d{2}(?::\d{2})?(?:[\s\x{202f}](?:AM|PM))?)(?:\]?\s*-\s*|\]\s*)(.*?):\s*(.*)",
        )
        .expect("static regex");

        Self {
            lexicon,
            header,
            cleaner: TextCleaner::new(),
        }
    }

    /// Reads the whole stream and parses it.
    ///
    /// Buffering is required because sniffing needs a second pass over the
    /// same lines. Input is decoded lossily: a stray invalid byte corrupts
    /// one line, not the upload.
    pub fn parse<R: Read>(&self, mut reader: R) -> Result<ParseOutcome> {
        let mut buf = Vec::new();
        reader.read_to_end(&mut buf)?;
        let text = String::from_utf8_lossy(&buf);
        Ok(self.parse_text(&text))
    }

    /// Parses already-buffered text.
    pub fn parse_text(&self, text: &str) -> ParseOutcome {
        let layouts = self.determine_layouts(text);

        let mut messages = Vec::new();
        let mut raw_message_count = 0usize;

        for (line_number, line) in text.lines().enumerate() {
            let line = line.trim();
            if line.is_empty() {
                continue;
            }
            raw_message_count += 1;

            let line = line.strip_prefix('\u{200e}').unwrap_or(line);
            let Some(caps) = self.header.captures(line) else {
                continue;
            };

            let date_str = caps.get(1).map_or("", |m| m.as_str()).trim();
            let time_str = caps.get(2).map_or("", |m| m.as_str()).trim();
            let sender = caps.get(3).map_or("", |m| m.as_str()).trim();
            let body = caps.get(4).map_or("", |m| m.as_str()).trim();
            let body = body.strip_prefix('\u{200e}').unwrap_or(body);

            if self.is_filtered(body) {
                continue;
            }

            let normalized_time = normalize_time(time_str);
            let datetime = format!("{date_str} {normalized_time}");
            let Some(timestamp) = layouts
                .iter()
                .filter(|layout| layout.accepts_shape(&normalized_time))
                .find_map(|layout| layout.parse(&datetime))
            else {
                debug!(
                    line = line_number + 1,
                    value = %datetime,
                    "failed to parse timestamp with available layouts"
                );
                continue;
            };

            if body.is_empty() {
                continue;
            }

            let cleaned = self.cleaner.clean(body, self.lexicon);
            messages.push(ParsedMessage::new(timestamp, date_str, sender, cleaned, body));
        }

        info!(
            raw = raw_message_count,
            accepted = messages.len(),
            "preprocessing complete"
        );

        ParseOutcome {
            raw_message_count,
            messages,
        }
    }

    /// Sniffs the layout from the first candidate lines; falls back to the
    /// full layout table when nothing survives elimination.
    fn determine_layouts(&self, text: &str) -> Vec<&'static TimestampLayout> {
        let mut samples = Vec::new();
        for line in text.lines() {
            if samples.len() >= MAX_LINES_TO_SNIFF {
                break;
            }
            let line = line.trim();
            let line = line.strip_prefix('\u{200e}').unwrap_or(line);
            if let Some(caps) = self.header.captures(line) {
                let date = caps.get(1).map_or("", |m| m.as_str()).to_string();
                let time = caps.get(2).map_or("", |m| m.as_str()).to_string();
                samples.push((date, time));
            }
        }

        let survivors = sniff_layouts(&samples);
        if survivors.is_empty() {
            warn!(
                sampled = samples.len(),
                "timestamp sniffing found no consistent layout, falling back to all {} layouts",
                ALL_LAYOUTS.len()
            );
            ALL_LAYOUTS.iter().collect()
        } else {
            debug!(count = survivors.len(), "determined timestamp layouts");
            survivors
        }
    }

    /// System/media filter: the line stays in the raw count but produces no
    /// record.
    fn is_filtered(&self, body: &str) -> bool {
        let lower = body.to_lowercase();
        if self.lexicon.is_system_message(&lower) {
            return true;
        }
        MEDIA_MARKERS.iter().any(|marker| body.contains(marker))
    }
}
