//! Round-trip laws: sniffing is deterministic, and statistics are invariant
//! under re-serializing the accepted records in the canonical line format.

use bloop::lexicon::Lexicon;
use bloop::message::ParsedMessage;
use bloop::parser::TranscriptParser;
use bloop::stats::{gap, StatsEngine};
use chrono::{Datelike, Timelike};

fn lexicon() -> Lexicon {
    Lexicon::from_parts(
        ["the", "and", "you"],
        ["messages and calls are end-to-end encrypted"],
    )
}

/// Re-emits accepted records as day-first lines with seconds.
fn serialize_canonical(messages: &[ParsedMessage]) -> String {
    messages
        .iter()
        .map(|m| {
            let ts = m.timestamp;
            format!(
                "{}/{}/{}, {:02}:{:02}:{:02} - {}: {}",
                ts.day(),
                ts.month(),
                ts.year(),
                ts.hour(),
                ts.minute(),
                ts.second(),
                m.sender,
                m.original_message
            )
        })
        .collect::<Vec<_>>()
        .join("\n")
}

const TRANSCRIPT: &str = "\
[2/3/24, 10:00] Alice: morning everyone hope the weekend treated you well
[2/3/24, 10:05] Bob: barely survived the hiking trip honestly
[2/3/24, 10:06] Alice: photos or it never happened 😂
[2/3/24, 10:30] Bob: uploading them tonight I promise
[2/3/24, 14:00] Alice: 🔥
[3/3/24, 09:12] Bob: coffee first then the photo dump
[3/3/24, 09:15] Alice: deal
";

#[test]
fn reparsing_own_output_is_stable() {
    let lex = lexicon();
    let parser = TranscriptParser::new(&lex);

    let first = parser.parse_text(TRANSCRIPT);
    assert!(!first.messages.is_empty());

    let canonical = serialize_canonical(&first.messages);
    let second = parser.parse_text(&canonical);

    assert_eq!(first.messages.len(), second.messages.len());
    for (a, b) in first.messages.iter().zip(&second.messages) {
        assert_eq!(a.timestamp, b.timestamp);
        assert_eq!(a.sender, b.sender);
        assert_eq!(a.original_message, b.original_message);
        assert_eq!(a.cleaned_message, b.cleaned_message);
    }
}

#[test]
fn stats_are_invariant_under_canonical_reserialization() {
    let lex = lexicon();
    let parser = TranscriptParser::new(&lex);
    let engine = StatsEngine::new(&lex);

    let first = parser.parse_text(TRANSCRIPT);
    let break_minutes = gap::dynamic_convo_break(&first.messages);
    let stats_first = engine.calculate(&first.messages, break_minutes).unwrap();

    let canonical = serialize_canonical(&first.messages);
    let second = parser.parse_text(&canonical);
    let stats_second = engine.calculate(&second.messages, break_minutes).unwrap();

    assert_eq!(stats_first, stats_second);
}

#[test]
fn sniffing_twice_gives_the_same_parse() {
    let lex = lexicon();
    let parser = TranscriptParser::new(&lex);

    let first = parser.parse_text(TRANSCRIPT);
    let second = parser.parse_text(TRANSCRIPT);

    assert_eq!(first.raw_message_count, second.raw_message_count);
    assert_eq!(first.messages, second.messages);
}

#[test]
fn ambiguous_prefix_disambiguated_by_later_line() {
    // Every date in the sample fits both orderings until 25/3 appears; the
    // whole file must then parse day-first, including the early lines.
    let lex = lexicon();
    let parser = TranscriptParser::new(&lex);
    let out = parser.parse_text(
        "2/3/24, 10:00 - Alice: ambiguous opener line\n\
         4/3/24, 10:00 - Bob: still ambiguous here\n\
         25/3/24, 10:00 - Alice: unambiguous at last",
    );
    assert_eq!(out.messages.len(), 3);
    assert_eq!(out.messages[0].timestamp.month(), 3);
    assert_eq!(out.messages[0].timestamp.day(), 2);
    assert_eq!(out.messages[2].timestamp.day(), 25);
}
