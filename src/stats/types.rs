//! Wire types for the statistics payload.
//!
//! Field names here are the API contract; the front-end charts bind to them
//! directly. Per-sender maps are `BTreeMap` so JSON output is deterministic.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// A sender paired with a count, used for superlatives.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChampionInfo {
    pub user: String,
    pub count: u64,
}

/// One month of one sender's activity.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MonthlyPoint {
    /// Month key, `YYYY-MM`.
    #[serde(rename = "x")]
    pub month: String,
    #[serde(rename = "y")]
    pub count: u64,
}

/// A sender's dense monthly series, zero-filled over the observed range.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MonthlySeries {
    pub id: String,
    pub data: Vec<MonthlyPoint>,
}

/// Weekday (Mon–Fri) versus weekend (Sat+Sun) daily averages.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct WeekdayWeekendAverage {
    pub average_weekday_messages: f64,
    pub average_weekend_messages: f64,
    pub difference: f64,
    pub percentage_difference: f64,
}

/// One cell of the interaction matrix.
///
/// The matrix is a header-prefixed 2-D list: the top-left corner is null,
/// the rest of the first row and first column are sender labels, and the
/// interior is raw counts.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum MatrixCell {
    Empty,
    Label(String),
    Count(u64),
}

/// The full statistics payload for one analyzed chat.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ChatStatistics {
    /// Raw line count; the orchestrator overwrites the engine's accepted
    /// count with the raw total before responding.
    pub total_messages: u64,

    /// Inclusive calendar-day span between first and last record.
    pub days_active: u64,

    pub user_message_count: BTreeMap<String, u64>,
    pub most_active_users_pct: BTreeMap<String, f64>,
    pub conversation_starters_pct: BTreeMap<String, f64>,
    pub most_ignored_users_pct: BTreeMap<String, f64>,

    pub first_text_champion: ChampionInfo,
    pub longest_monologue: ChampionInfo,

    pub common_words: BTreeMap<String, u64>,
    pub common_emojis: BTreeMap<String, u64>,

    pub average_response_time_minutes: f64,

    /// 0–23; `None` only when no record carried a timestamp.
    pub peak_hour: Option<u8>,

    pub user_monthly_activity: Vec<MonthlySeries>,
    pub weekday_vs_weekend_avg: WeekdayWeekendAverage,

    /// Absent when the chat has fewer than two senders.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub user_interaction_matrix: Option<Vec<Vec<MatrixCell>>>,
}
