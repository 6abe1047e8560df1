//! Topic segmentation and stratified sampling for the LLM.
//!
//! The LLM does not need the whole transcript; it needs a small, high-signal
//! sample per sender. Messages are first grouped into topics by idle gap,
//! then filtered hard (multi-word, not numeric, no character soup) and
//! shuffled, keeping at most [`MAX_MESSAGES_PER_SENDER`] per sender.
//!
//! The shuffle is time-seeded by default; tests pin a seed through
//! [`MessageSampler::with_seed`] to get bit-identical output.

use std::collections::BTreeMap;
use std::time::{SystemTime, UNIX_EPOCH};

use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::SeedableRng;
use regex::Regex;

use crate::message::ParsedMessage;
use crate::stats::emoji::EmojiExtractor;

/// Hard cap per sender; roughly one prompt page for a lively group.
pub const MAX_MESSAGES_PER_SENDER: usize = 23;

/// Messages below this token count carry no narrative signal.
const MIN_TOKENS: usize = 3;

/// Only messages above this token count reach the final sample.
const ELIGIBLE_TOKENS: usize = 7;

/// A topic: a maximal run of messages with no internal idle gap.
pub type Topic = Vec<ParsedMessage>;

/// Builds the per-sender sample map for the LLM prompt.
#[derive(Debug)]
pub struct MessageSampler {
    gap_hours: f64,
    seed: Option<u64>,
    emoji: EmojiExtractor,
    excessive_chars: Regex,
}

impl MessageSampler {
    pub fn new(gap_hours: f64) -> Self {
        Self {
            gap_hours,
            seed: None,
            emoji: EmojiExtractor::new(),
            excessive_chars: Regex::new(r#"[^a-zA-Z0-9\s.,?!'"()]"#).expect("static regex"),
        }
    }

    /// Pins the shuffle seed; the sample becomes fully deterministic.
    #[must_use]
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = Some(seed);
        self
    }

    /// Runs segmentation and stratification over the message stream.
    ///
    /// Senders with no surviving messages are absent from the map.
    pub fn sample(&self, messages: &[ParsedMessage]) -> BTreeMap<String, Vec<String>> {
        let topics = self.group_into_topics(messages);
        self.stratify(&topics)
    }

    /// Splits a time-sorted working copy into topics at idle gaps, then
    /// strips emoji from the cleaned text and drops records left empty.
    pub fn group_into_topics(&self, messages: &[ParsedMessage]) -> Vec<Topic> {
        if messages.is_empty() {
            return Vec::new();
        }

        let mut sorted: Vec<ParsedMessage> = messages.to_vec();
        sorted.sort_by_key(|m| m.timestamp);

        let gap_seconds = (self.gap_hours * 3600.0) as i64;
        let gap = chrono::Duration::seconds(gap_seconds);

        let mut raw_topics: Vec<Topic> = Vec::new();
        let mut current: Topic = vec![sorted[0].clone()];

        for pair in sorted.windows(2) {
            if pair[1].timestamp - pair[0].timestamp >= gap {
                raw_topics.push(std::mem::take(&mut current));
            }
            current.push(pair[1].clone());
        }
        if !current.is_empty() {
            raw_topics.push(current);
        }

        raw_topics
            .into_iter()
            .filter_map(|topic| {
                let processed: Topic = topic
                    .into_iter()
                    .filter_map(|mut msg| {
                        let emoji_free = self.emoji.strip(&msg.cleaned_message);
                        let emoji_free = emoji_free.trim();
                        if emoji_free.is_empty() {
                            return None;
                        }
                        msg.cleaned_message = emoji_free.to_string();
                        Some(msg)
                    })
                    .collect();
                (!processed.is_empty()).then_some(processed)
            })
            .collect()
    }

    /// Flattens topics into a filtered, shuffled, capped per-sender map.
    pub fn stratify(&self, topics: &[Topic]) -> BTreeMap<String, Vec<String>> {
        let mut consolidated: BTreeMap<String, Vec<String>> = BTreeMap::new();

        for topic in topics {
            for msg in topic {
                let text = msg.cleaned_message.trim();
                if !self.passes_filters(text) {
                    continue;
                }
                consolidated
                    .entry(msg.sender.clone())
                    .or_default()
                    .push(text.to_string());
            }
        }

        let mut rng = match self.seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::seed_from_u64(time_seed()),
        };

        let mut sampled = BTreeMap::new();
        for (sender, messages) in consolidated {
            let mut eligible: Vec<String> = messages
                .into_iter()
                .filter(|m| m.split_whitespace().count() > ELIGIBLE_TOKENS)
                .collect();

            if eligible.is_empty() {
                continue;
            }

            eligible.shuffle(&mut rng);
            eligible.truncate(MAX_MESSAGES_PER_SENDER);
            sampled.insert(sender, eligible);
        }

        sampled
    }

    fn passes_filters(&self, text: &str) -> bool {
        if text.is_empty() {
            return false;
        }
        if text.split_whitespace().count() < MIN_TOKENS {
            return false;
        }

        let mut has_digit = false;
        let mut numeric_only = true;
        for c in text.chars() {
            if c.is_ascii_digit() {
                has_digit = true;
            } else if !c.is_whitespace() && c != '.' && c != ',' {
                numeric_only = false;
                break;
            }
        }
        if numeric_only && has_digit {
            return false;
        }

        if !text.chars().any(|c| c.is_alphanumeric()) {
            return false;
        }

        !self.excessive_chars.is_match(text)
    }
}

fn time_seed() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_nanos() as u64)
        .unwrap_or(0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn msg(sender: &str, hour: u32, minute: u32, text: &str) -> ParsedMessage {
        let ts = NaiveDate::from_ymd_opt(2024, 3, 2)
            .unwrap()
            .and_hms_opt(hour, minute, 0)
            .unwrap();
        ParsedMessage::new(ts, "t", sender, text, text)
    }

    const LONG_A: &str = "honestly the trip was such a beautiful disaster from start to finish";
    const LONG_B: &str = "nobody warned me the ferry would leave without us at dawn";

    #[test]
    fn test_topics_split_on_gap() {
        let sampler = MessageSampler::new(2.0);
        let topics = sampler.group_into_topics(&[
            msg("A", 10, 0, "morning thoughts"),
            msg("B", 10, 30, "quick reply"),
            msg("A", 15, 0, "afternoon restart"),
        ]);
        assert_eq!(topics.len(), 2);
        assert_eq!(topics[0].len(), 2);
        assert_eq!(topics[1].len(), 1);
    }

    #[test]
    fn test_topics_sorted_before_grouping() {
        let sampler = MessageSampler::new(2.0);
        let topics = sampler.group_into_topics(&[
            msg("A", 15, 0, "later message"),
            msg("B", 10, 0, "earlier message"),
        ]);
        assert_eq!(topics.len(), 2);
        assert_eq!(topics[0][0].sender, "B");
    }

    #[test]
    fn test_emoji_only_records_dropped_from_topics() {
        let sampler = MessageSampler::new(2.0);
        let mut emoji_msg = msg("A", 10, 0, "🔥🔥");
        emoji_msg.cleaned_message = "🔥🔥".into();
        let topics = sampler.group_into_topics(&[emoji_msg, msg("B", 10, 1, "real words here")]);
        assert_eq!(topics.len(), 1);
        assert_eq!(topics[0].len(), 1);
        assert_eq!(topics[0][0].sender, "B");
    }

    #[test]
    fn test_stratify_keeps_only_long_messages() {
        let sampler = MessageSampler::new(2.0).with_seed(7);
        let sample = sampler.sample(&[
            msg("A", 10, 0, LONG_A),
            msg("A", 10, 1, "too short"),
            msg("B", 10, 2, "five words is not enough"),
        ]);
        assert_eq!(sample.get("A").map(Vec::len), Some(1));
        assert!(!sample.contains_key("B"));
    }

    #[test]
    fn test_stratify_rejects_numeric_and_special_messages() {
        let sampler = MessageSampler::new(2.0).with_seed(7);
        let sample = sampler.sample(&[
            msg("A", 10, 0, "123 456 789"),
            msg("A", 10, 1, "<<< ~~~ ||| >>> *** ### @@@ %%%"),
            msg("B", 10, 2, LONG_B),
        ]);
        assert!(!sample.contains_key("A"));
        assert_eq!(sample.get("B").map(Vec::len), Some(1));
    }

    #[test]
    fn test_stratify_caps_per_sender() {
        let sampler = MessageSampler::new(2.0).with_seed(7);
        let messages: Vec<_> = (0..40)
            .map(|i| {
                msg(
                    "A",
                    10,
                    i,
                    &format!("message number {i} keeps rambling on about the weekend plans"),
                )
            })
            .collect();
        let sample = sampler.sample(&messages);
        assert_eq!(sample.get("A").map(Vec::len), Some(MAX_MESSAGES_PER_SENDER));
    }

    #[test]
    fn test_sample_deterministic_under_seed() {
        let messages: Vec<_> = (0..40)
            .map(|i| {
                msg(
                    if i % 2 == 0 { "A" } else { "B" },
                    10,
                    i,
                    &format!("message number {i} keeps rambling on about the weekend plans"),
                )
            })
            .collect();

        let first = MessageSampler::new(2.0).with_seed(42).sample(&messages);
        let second = MessageSampler::new(2.0).with_seed(42).sample(&messages);
        assert_eq!(first, second);
    }

    #[test]
    fn test_empty_input_empty_sample() {
        let sampler = MessageSampler::new(2.0).with_seed(7);
        assert!(sampler.sample(&[]).is_empty());
        assert!(sampler.group_into_topics(&[]).is_empty());
    }
}
