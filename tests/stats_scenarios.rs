//! End-to-end scenarios over the library pipeline: parse a literal
//! transcript, run the statistics engine, check the derived numbers.

use bloop::lexicon::Lexicon;
use bloop::parser::TranscriptParser;
use bloop::stats::{gap, ChampionInfo, ChatStatistics, MatrixCell, StatsEngine};

fn lexicon() -> Lexicon {
    Lexicon::from_parts(
        ["the", "and", "you"],
        ["messages and calls are end-to-end encrypted", "created group"],
    )
}

fn analyze(text: &str) -> ChatStatistics {
    let lex = lexicon();
    let parser = TranscriptParser::new(&lex);
    let outcome = parser.parse_text(text);
    let convo_break = gap::dynamic_convo_break(&outcome.messages);
    StatsEngine::new(&lex)
        .calculate(&outcome.messages, convo_break)
        .expect("non-empty transcript")
}

#[test]
fn single_message_chat() {
    let stats = analyze("[2/3/24, 10:00] A: hi");

    assert_eq!(stats.days_active, 1);
    assert_eq!(stats.peak_hour, Some(10));
    assert_eq!(stats.most_active_users_pct.get("A"), Some(&100.0));
    assert_eq!(
        stats.longest_monologue,
        ChampionInfo {
            user: "A".into(),
            count: 1
        }
    );
    assert!(stats.user_interaction_matrix.is_none());
}

#[test]
fn two_sender_chat_response_time_and_matrix() {
    let stats = analyze(
        "2/3/24, 10:00 - A: hi there friend\n\
         2/3/24, 10:05 - B: hey hey",
    );

    assert_eq!(stats.average_response_time_minutes, 5.0);
    assert_eq!(
        stats.first_text_champion,
        ChampionInfo {
            user: "A".into(),
            count: 1
        }
    );

    let matrix = stats.user_interaction_matrix.expect("two senders");
    assert_eq!(
        matrix,
        vec![
            vec![
                MatrixCell::Empty,
                MatrixCell::Label("A".into()),
                MatrixCell::Label("B".into())
            ],
            vec![
                MatrixCell::Label("A".into()),
                MatrixCell::Count(0),
                MatrixCell::Count(1)
            ],
            vec![
                MatrixCell::Label("B".into()),
                MatrixCell::Count(0),
                MatrixCell::Count(0)
            ],
        ]
    );
}

#[test]
fn monologue_of_three() {
    let stats = analyze(
        "2/3/24, 14:00:00 - A: writing down some thoughts\n\
         2/3/24, 14:00:20 - A: more thoughts arriving quickly\n\
         2/3/24, 14:00:40 - A: and one final thought",
    );

    assert_eq!(
        stats.longest_monologue,
        ChampionInfo {
            user: "A".into(),
            count: 3
        }
    );
    assert_eq!(stats.most_ignored_users_pct.get("A"), Some(&100.0));
    assert_eq!(stats.average_response_time_minutes, 0.0);
    assert_eq!(stats.peak_hour, Some(14));
}

#[test]
fn one_gap_makes_exactly_two_conversations() {
    // Two senders, 30 messages a few minutes apart, one multi-hour hole in
    // the middle. The derived break sits well under the hole and well above
    // the chatter, so exactly one boundary lands on the hole.
    let mut lines = Vec::new();
    for i in 0..15 {
        let sender = if i % 2 == 0 { "A" } else { "B" };
        lines.push(format!("2/3/24, {}:{:02} - {}: steady morning chatter", 8 + i / 10, (i * 6) % 60, sender));
    }
    for i in 0..15 {
        let sender = if i % 2 == 0 { "B" } else { "A" };
        lines.push(format!("2/3/24, {}:{:02} - {}: evening continuation talk", 14 + i / 10, (i * 6) % 60, sender));
    }
    let stats = analyze(&lines.join("\n"));

    let start_sum: f64 = stats.conversation_starters_pct.values().sum();
    assert!((start_sum - 100.0).abs() <= 0.02);
    // A opened the morning, B reopened after the hole.
    assert_eq!(stats.conversation_starters_pct.get("A"), Some(&50.0));
    assert_eq!(stats.conversation_starters_pct.get("B"), Some(&50.0));
}

#[test]
fn monthly_series_bridges_skipped_months() {
    let stats = analyze(
        "10/1/24, 09:00 - A: january check in message\n\
         12/3/24, 09:00 - B: march check in message",
    );

    assert_eq!(stats.user_monthly_activity.len(), 2);
    for series in &stats.user_monthly_activity {
        assert_eq!(series.data.len(), 3);
        assert_eq!(series.data[0].month, "2024-01");
        assert_eq!(series.data[1].month, "2024-02");
        assert_eq!(series.data[1].count, 0);
        assert_eq!(series.data[2].month, "2024-03");
    }
}

#[test]
fn fewer_than_twenty_gaps_uses_default_break() {
    let lex = lexicon();
    let parser = TranscriptParser::new(&lex);
    let outcome = parser.parse_text(
        "2/3/24, 10:00 - A: just a few messages\n\
         2/3/24, 10:07 - B: not enough for the percentile",
    );
    assert_eq!(
        gap::dynamic_convo_break(&outcome.messages),
        gap::DEFAULT_CONVO_BREAK_MINUTES
    );
}

#[test]
fn system_only_transcript_has_raw_lines_but_no_records() {
    let lex = lexicon();
    let parser = TranscriptParser::new(&lex);
    let outcome = parser.parse_text(
        "2/3/24, 10:00 - A: Messages and calls are end-to-end encrypted\n\
         2/3/24, 10:01 - A: B created group \"weekend\"",
    );
    assert_eq!(outcome.raw_message_count, 2);
    assert!(outcome.messages.is_empty());

    let err = StatsEngine::new(&lex)
        .calculate(&outcome.messages, 120)
        .unwrap_err();
    assert!(matches!(err, bloop::BloopError::EmptyMessageList));
}

#[test]
fn stats_serialize_with_contract_field_names() {
    let stats = analyze(
        "2/3/24, 10:00 - A: hi there friend\n\
         2/3/24, 10:05 - B: hey hey",
    );
    let json = serde_json::to_value(&stats).unwrap();

    for field in [
        "total_messages",
        "days_active",
        "user_message_count",
        "most_active_users_pct",
        "conversation_starters_pct",
        "most_ignored_users_pct",
        "first_text_champion",
        "longest_monologue",
        "common_words",
        "common_emojis",
        "average_response_time_minutes",
        "peak_hour",
        "user_monthly_activity",
        "weekday_vs_weekend_avg",
        "user_interaction_matrix",
    ] {
        assert!(json.get(field).is_some(), "missing field {field}");
    }

    assert!(json["first_text_champion"].get("user").is_some());
    assert!(json["weekday_vs_weekend_avg"]
        .get("average_weekday_messages")
        .is_some());
    assert_eq!(json["user_interaction_matrix"][0][0], serde_json::Value::Null);
}
