//! Single-pass statistics over the parsed message stream.
//!
//! The engine walks the sequence exactly once, carrying every aggregate in
//! parallel: per-sender counters, the monologue streak, reply latencies, the
//! interaction matrix, word and emoji counters, and the hour/weekday/month
//! histograms. Input order is authoritative — the engine never re-sorts.
//!
//! Derived values are deterministic: ties in the peak hour resolve to the
//! lowest hour, ties in top-N counters resolve lexicographically, and every
//! per-sender map carries an entry for every sender (zeros, not omissions).

pub mod emoji;
pub mod gap;
pub mod types;

use std::collections::{BTreeMap, BTreeSet};

use chrono::{Datelike, Duration, NaiveDate, Timelike};
use regex::Regex;

use crate::error::{BloopError, Result};
use crate::lexicon::Lexicon;
use crate::message::ParsedMessage;

use self::emoji::EmojiExtractor;
pub use self::types::{
    ChampionInfo, ChatStatistics, MatrixCell, MonthlyPoint, MonthlySeries, WeekdayWeekendAverage,
};

const TOP_WORDS: usize = 10;
const TOP_EMOJIS: usize = 6;

/// Rounds to two decimals, half away from zero.
pub fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

/// Statistics engine bound to a loaded [`Lexicon`].
#[derive(Debug)]
pub struct StatsEngine<'a> {
    lexicon: &'a Lexicon,
    word_pattern: Regex,
    emoji: EmojiExtractor,
}

impl<'a> StatsEngine<'a> {
    pub fn new(lexicon: &'a Lexicon) -> Self {
        Self {
            lexicon,
            word_pattern: Regex::new(r"\b[a-z0-9]{3,}\b").expect("static regex"),
            emoji: EmojiExtractor::new(),
        }
    }

    /// Computes the full statistics payload.
    ///
    /// `convo_break_minutes` is the per-request idle threshold from
    /// [`gap::dynamic_convo_break`]. Fails only on empty input.
    pub fn calculate(
        &self,
        messages: &[ParsedMessage],
        convo_break_minutes: i64,
    ) -> Result<ChatStatistics> {
        if messages.is_empty() {
            return Err(BloopError::EmptyMessageList);
        }

        let convo_break = Duration::minutes(convo_break_minutes);

        let mut user_message_count: BTreeMap<String, u64> = BTreeMap::new();
        let mut user_starts_convo: BTreeMap<String, u64> = BTreeMap::new();
        let mut user_first_texts: BTreeMap<String, u64> = BTreeMap::new();
        let mut user_ignored: BTreeMap<String, u64> = BTreeMap::new();
        let mut word_counter: BTreeMap<String, u64> = BTreeMap::new();
        let mut emoji_counter: BTreeMap<String, u64> = BTreeMap::new();

        let mut hourly = [0u64; 24];
        let mut by_weekday = [0u64; 7]; // Monday-first
        let mut monthly_by_user: BTreeMap<String, BTreeMap<(i32, u32), u64>> = BTreeMap::new();
        let mut all_months: BTreeSet<(i32, u32)> = BTreeSet::new();

        let mut matrix: BTreeMap<String, BTreeMap<String, u64>> = BTreeMap::new();

        let mut total_response_seconds = 0.0f64;
        let mut response_count = 0u64;

        let mut max_streak = 0u64;
        let mut max_streak_sender = String::new();
        let mut streak = 0u64;
        let mut streak_sender = String::new();

        let mut last_sender: Option<&str> = None;
        let mut last_timestamp = messages[0].timestamp;
        let mut last_date: Option<NaiveDate> = None;

        for (i, msg) in messages.iter().enumerate() {
            let is_new_convo = match last_sender {
                None => true,
                Some(_) => msg.timestamp - last_timestamp >= convo_break,
            };
            if is_new_convo {
                *user_starts_convo.entry(msg.sender.clone()).or_insert(0) += 1;
            }

            if let Some(prev) = last_sender {
                if prev != msg.sender {
                    let gap_seconds = (msg.timestamp - last_timestamp).num_seconds() as f64;
                    if gap_seconds > 5.0 && gap_seconds < 12.0 * 3600.0 {
                        total_response_seconds += gap_seconds;
                        response_count += 1;
                    }
                    *matrix
                        .entry(prev.to_string())
                        .or_default()
                        .entry(msg.sender.clone())
                        .or_insert(0) += 1;
                }
            }

            *user_message_count.entry(msg.sender.clone()).or_insert(0) += 1;

            let date = msg.timestamp.date();
            if last_date != Some(date) {
                *user_first_texts.entry(msg.sender.clone()).or_insert(0) += 1;
                last_date = Some(date);
            }

            if msg.sender == streak_sender {
                streak += 1;
            } else {
                if !streak_sender.is_empty() && streak > max_streak {
                    max_streak = streak;
                    max_streak_sender = streak_sender.clone();
                }
                streak_sender = msg.sender.clone();
                streak = 1;
            }

            for word in self
                .word_pattern
                .find_iter(&msg.cleaned_message.to_lowercase())
            {
                let word = word.as_str();
                if !self.lexicon.is_stopword(word) {
                    *word_counter.entry(word.to_string()).or_insert(0) += 1;
                }
            }

            for cluster in self.emoji.extract(&msg.original_message) {
                *emoji_counter.entry(cluster).or_insert(0) += 1;
            }

            hourly[msg.timestamp.hour() as usize] += 1;
            by_weekday[msg.timestamp.weekday().num_days_from_monday() as usize] += 1;

            let month = (date.year(), date.month());
            *monthly_by_user
                .entry(msg.sender.clone())
                .or_default()
                .entry(month)
                .or_insert(0) += 1;
            all_months.insert(month);

            // "Ignored": the very next message is the same sender talking on.
            if messages.get(i + 1).is_some_and(|next| next.sender == msg.sender) {
                *user_ignored.entry(msg.sender.clone()).or_insert(0) += 1;
            }

            last_sender = Some(&msg.sender);
            last_timestamp = msg.timestamp;
        }

        if !streak_sender.is_empty() && streak > max_streak {
            max_streak = streak;
            max_streak_sender = streak_sender;
        }

        let total_messages = messages.len() as u64;
        let senders: Vec<&String> = user_message_count.keys().collect();

        let most_active_users_pct = percentages(&user_message_count, total_messages, &senders);

        let total_starts: u64 = user_starts_convo.values().sum();
        let conversation_starters_pct = percentages(&user_starts_convo, total_starts, &senders);

        let total_ignored: u64 = user_ignored.values().sum();
        let most_ignored_users_pct = percentages(&user_ignored, total_ignored, &senders);

        let first_text_champion = champion_of(&user_first_texts);

        let average_response_time_minutes = if response_count > 0 {
            round2(total_response_seconds / response_count as f64 / 60.0)
        } else {
            0.0
        };

        let peak_hour = peak_hour_of(&hourly);

        let first = messages[0].timestamp.date();
        let last = messages[messages.len() - 1].timestamp.date();
        let days_active = ((last - first).num_days() + 1).max(1) as u64;

        Ok(ChatStatistics {
            total_messages,
            days_active,
            most_active_users_pct,
            conversation_starters_pct,
            most_ignored_users_pct,
            first_text_champion,
            longest_monologue: ChampionInfo {
                user: max_streak_sender,
                count: max_streak,
            },
            common_words: count_top_n(&word_counter, TOP_WORDS),
            common_emojis: count_top_n(&emoji_counter, TOP_EMOJIS),
            average_response_time_minutes,
            peak_hour,
            user_monthly_activity: monthly_activity(&monthly_by_user, &all_months, &senders),
            weekday_vs_weekend_avg: weekday_weekend_average(&by_weekday),
            user_interaction_matrix: format_interaction_matrix(&matrix, &senders),
            user_message_count,
        })
    }
}

/// Per-sender share of `total`, rounded, with zeros for absent senders.
fn percentages(
    counts: &BTreeMap<String, u64>,
    total: u64,
    senders: &[&String],
) -> BTreeMap<String, f64> {
    let mut pct = BTreeMap::new();
    for &sender in senders {
        let value = if total > 0 {
            round2(counts.get(sender).copied().unwrap_or(0) as f64 * 100.0 / total as f64)
        } else {
            0.0
        };
        pct.insert(sender.clone(), value);
    }
    pct
}

/// Highest count wins; ties resolve to the lexicographically smallest user.
fn champion_of(counts: &BTreeMap<String, u64>) -> ChampionInfo {
    let mut champion = ChampionInfo::default();
    for (user, &count) in counts {
        if count > champion.count {
            champion.user = user.clone();
            champion.count = count;
        }
    }
    champion
}

/// Hour with the most messages; ties resolve to the lowest hour.
fn peak_hour_of(hourly: &[u64; 24]) -> Option<u8> {
    let mut peak: Option<u8> = None;
    let mut max = 0u64;
    for (hour, &count) in hourly.iter().enumerate() {
        if count > max {
            max = count;
            peak = Some(hour as u8);
        }
    }
    peak
}

/// Top `n` entries by count, count ties broken lexicographically.
fn count_top_n(counter: &BTreeMap<String, u64>, n: usize) -> BTreeMap<String, u64> {
    let mut pairs: Vec<(&String, &u64)> = counter.iter().collect();
    pairs.sort_by(|a, b| b.1.cmp(a.1).then_with(|| a.0.cmp(b.0)));
    pairs
        .into_iter()
        .take(n)
        .map(|(k, &v)| (k.clone(), v))
        .collect()
}

/// Dense per-sender monthly series over the full observed month range.
fn monthly_activity(
    monthly_by_user: &BTreeMap<String, BTreeMap<(i32, u32), u64>>,
    all_months: &BTreeSet<(i32, u32)>,
    senders: &[&String],
) -> Vec<MonthlySeries> {
    let (Some(&first), Some(&last)) = (all_months.first(), all_months.last()) else {
        return Vec::new();
    };

    let months = month_range(first, last);

    senders
        .iter()
        .map(|&sender| {
            let activity = monthly_by_user.get(sender);
            let data = months
                .iter()
                .map(|&(year, month)| MonthlyPoint {
                    month: format!("{year:04}-{month:02}"),
                    count: activity
                        .and_then(|m| m.get(&(year, month)).copied())
                        .unwrap_or(0),
                })
                .collect();
            MonthlySeries {
                id: sender.clone(),
                data,
            }
        })
        .collect()
}

/// Every `(year, month)` from `first` to `last`, inclusive.
fn month_range(first: (i32, u32), last: (i32, u32)) -> Vec<(i32, u32)> {
    let mut months = Vec::new();
    let (mut year, mut month) = first;
    loop {
        months.push((year, month));
        if (year, month) >= last {
            break;
        }
        month += 1;
        if month > 12 {
            month = 1;
            year += 1;
        }
    }
    months
}

/// Weekday/weekend daily averages; `by_weekday` is Monday-first.
fn weekday_weekend_average(by_weekday: &[u64; 7]) -> WeekdayWeekendAverage {
    let total_weekday: u64 = by_weekday[..5].iter().sum();
    let total_weekend: u64 = by_weekday[5..].iter().sum();

    let avg_weekday = round2(total_weekday as f64 / 5.0);
    let avg_weekend = round2(total_weekend as f64 / 2.0);

    let difference = round2(avg_weekday - avg_weekend);
    let percentage_difference = if avg_weekday > 0.0 {
        round2(difference / avg_weekday * 100.0)
    } else {
        0.0
    };

    WeekdayWeekendAverage {
        average_weekday_messages: avg_weekday,
        average_weekend_messages: avg_weekend,
        difference,
        percentage_difference,
    }
}

/// Header-prefixed 2-D list over the sorted sender set; `None` below two
/// senders.
fn format_interaction_matrix(
    matrix: &BTreeMap<String, BTreeMap<String, u64>>,
    senders: &[&String],
) -> Option<Vec<Vec<MatrixCell>>> {
    if senders.len() <= 1 {
        return None;
    }

    let mut header = Vec::with_capacity(senders.len() + 1);
    header.push(MatrixCell::Empty);
    header.extend(senders.iter().map(|s| MatrixCell::Label((*s).clone())));

    let mut rows = vec![header];
    for &sender in senders {
        let mut row = Vec::with_capacity(senders.len() + 1);
        row.push(MatrixCell::Label(sender.clone()));
        let interactions = matrix.get(sender);
        for &target in senders {
            let count = interactions
                .and_then(|m| m.get(target).copied())
                .unwrap_or(0);
            row.push(MatrixCell::Count(count));
        }
        rows.push(row);
    }

    Some(rows)
}
