//! Dynamic conversation-break estimation.
//!
//! Chats have wildly different tempos: a couple texting all day and a family
//! group that wakes up twice a week should not share one idle-gap threshold.
//! The break is derived per request from observed cross-sender reply
//! latencies: take the 85th percentile, add slack, clamp to a sane band.

use crate::message::ParsedMessage;

/// Used when too few reply latencies were observed.
pub const DEFAULT_CONVO_BREAK_MINUTES: i64 = 120;

/// Clamp band for the derived break.
pub const MIN_CONVO_BREAK_MINUTES: i64 = 30;
pub const MAX_CONVO_BREAK_MINUTES: i64 = 300;

/// Reply latencies outside (5 s, 12 h) are noise: sub-5-second gaps are
/// double-sends, 12-hour-plus gaps are overnight silence.
const MIN_GAP_SECONDS: f64 = 5.0;
const MAX_GAP_SECONDS: f64 = 12.0 * 3600.0;

/// Minimum latency sample before the percentile is trusted.
const MIN_SAMPLES: usize = 20;

const PERCENTILE: f64 = 85.0;
const SLACK_MINUTES: f64 = 30.0;

/// Returns the gap in seconds when it is an eligible cross-sender reply
/// latency, `None` otherwise.
pub fn eligible_gap_seconds(prev: &ParsedMessage, curr: &ParsedMessage) -> Option<f64> {
    if prev.sender == curr.sender {
        return None;
    }
    let seconds = (curr.timestamp - prev.timestamp).num_seconds() as f64;
    if seconds > MIN_GAP_SECONDS && seconds < MAX_GAP_SECONDS {
        Some(seconds)
    } else {
        None
    }
}

/// Percentile by the `(p/100)(n+1)` rank convention with linear
/// interpolation between bracketing order statistics.
///
/// `sorted` must be ascending.
pub fn percentile(sorted: &[f64], p: f64) -> f64 {
    let n = sorted.len();
    if n == 0 {
        return 0.0;
    }
    if p <= 0.0 {
        return sorted[0];
    }
    if p >= 100.0 {
        return sorted[n - 1];
    }

    let rank = (p / 100.0) * (n + 1) as f64;
    let k = rank.floor() as usize;
    let d = rank - k as f64;

    if k == 0 {
        return sorted[0];
    }
    if k >= n {
        return sorted[n - 1];
    }

    sorted[k - 1] + d * (sorted[k] - sorted[k - 1])
}

/// Derives the conversation-break threshold, in minutes, for one request.
pub fn dynamic_convo_break(messages: &[ParsedMessage]) -> i64 {
    let mut response_times_minutes: Vec<f64> = messages
        .windows(2)
        .filter_map(|pair| eligible_gap_seconds(&pair[0], &pair[1]))
        .map(|seconds| seconds / 60.0)
        .collect();

    if response_times_minutes.len() < MIN_SAMPLES {
        tracing::debug!(
            samples = response_times_minutes.len(),
            "not enough response-time data for dynamic break, using default {} mins",
            DEFAULT_CONVO_BREAK_MINUTES
        );
        return DEFAULT_CONVO_BREAK_MINUTES;
    }

    response_times_minutes.sort_by(f64::total_cmp);

    let p85 = percentile(&response_times_minutes, PERCENTILE);
    let dynamic = (p85 + SLACK_MINUTES)
        .max(MIN_CONVO_BREAK_MINUTES as f64)
        .min(MAX_CONVO_BREAK_MINUTES as f64);

    dynamic.round() as i64
}
