//! Timestamp layout table and layout sniffing.
//!
//! Exported transcripts vary by locale and platform: month-first or
//! day-first dates, 2- or 4-digit years, optional seconds, 12- or 24-hour
//! clocks. A numeric date like `02/03/25` is ambiguous, so the parser sniffs
//! a sample of lines and eliminates every layout that fails to parse any of
//! them. When more than one layout survives, day-first wins over
//! month-first; changing that tie-break silently turns February 3rd into
//! March 2nd.

use chrono::NaiveDateTime;

/// Which side of the slash carries the day.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DateStyle {
    /// European-style `d/m/y`.
    DayFirst,
    /// US-style `m/d/y`.
    MonthFirst,
}

/// One recognized timestamp layout.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TimestampLayout {
    fmt: &'static str,
    style: DateStyle,
    has_seconds: bool,
    has_ampm: bool,
}

impl TimestampLayout {
    const fn new(fmt: &'static str, style: DateStyle, has_seconds: bool, has_ampm: bool) -> Self {
        Self {
            fmt,
            style,
            has_seconds,
            has_ampm,
        }
    }

    /// Day-first or month-first.
    pub fn style(&self) -> DateStyle {
        self.style
    }

    /// Attempts to parse a normalized `"<date> <time>"` string.
    pub fn parse(&self, datetime: &str) -> Option<NaiveDateTime> {
        NaiveDateTime::parse_from_str(datetime, self.fmt).ok()
    }

    /// Returns `true` when this layout's shape matches the observed time
    /// string (seconds present/absent, AM/PM present/absent).
    ///
    /// Applied before each parse attempt in the main pass so a `H:MM`
    /// layout never half-consumes a `H:MM:SS PM` value.
    pub fn accepts_shape(&self, normalized_time: &str) -> bool {
        let data_has_seconds = normalized_time.matches(':').count() >= 2;
        let data_has_ampm =
            normalized_time.ends_with(" AM") || normalized_time.ends_with(" PM");
        self.has_seconds == data_has_seconds && self.has_ampm == data_has_ampm
    }
}

/// Every layout the parser recognizes.
///
/// chrono numeric specifiers accept both padded and unpadded digits, so one
/// entry covers `2/3/24` and `02/03/24` alike.
pub const ALL_LAYOUTS: &[TimestampLayout] = &[
    // US style, 12-hour
    TimestampLayout::new("%m/%d/%y %I:%M %p", DateStyle::MonthFirst, false, true),
    TimestampLayout::new("%m/%d/%Y %I:%M %p", DateStyle::MonthFirst, false, true),
    TimestampLayout::new("%m/%d/%y %I:%M:%S %p", DateStyle::MonthFirst, true, true),
    TimestampLayout::new("%m/%d/%Y %I:%M:%S %p", DateStyle::MonthFirst, true, true),
    // US style, 24-hour
    TimestampLayout::new("%m/%d/%y %H:%M", DateStyle::MonthFirst, false, false),
    TimestampLayout::new("%m/%d/%Y %H:%M", DateStyle::MonthFirst, false, false),
    TimestampLayout::new("%m/%d/%y %H:%M:%S", DateStyle::MonthFirst, true, false),
    TimestampLayout::new("%m/%d/%Y %H:%M:%S", DateStyle::MonthFirst, true, false),
    // European style, 24-hour
    TimestampLayout::new("%d/%m/%y %H:%M", DateStyle::DayFirst, false, false),
    TimestampLayout::new("%d/%m/%Y %H:%M", DateStyle::DayFirst, false, false),
    TimestampLayout::new("%d/%m/%y %H:%M:%S", DateStyle::DayFirst, true, false),
    TimestampLayout::new("%d/%m/%Y %H:%M:%S", DateStyle::DayFirst, true, false),
    // European style, 12-hour
    TimestampLayout::new("%d/%m/%y %I:%M %p", DateStyle::DayFirst, false, true),
    TimestampLayout::new("%d/%m/%Y %I:%M %p", DateStyle::DayFirst, false, true),
    TimestampLayout::new("%d/%m/%y %I:%M:%S %p", DateStyle::DayFirst, true, true),
    TimestampLayout::new("%d/%m/%Y %I:%M:%S %p", DateStyle::DayFirst, true, true),
];

/// Normalizes a captured time string for parsing: the narrow no-break space
/// some exports put before AM/PM becomes a regular space, and the marker is
/// upper-cased.
pub fn normalize_time(time: &str) -> String {
    time.replace('\u{202f}', " ").to_uppercase()
}

/// Eliminates layouts against sampled `(date, time)` pairs.
///
/// Starts from [`ALL_LAYOUTS`] and keeps only layouts that parse **every**
/// sample. With more than one survivor, day-first layouts are preferred over
/// month-first ones. Returns an empty vector when nothing survives; the
/// caller then falls back to trying all layouts line by line.
///
/// Deterministic: the same samples always produce the same survivor set.
pub fn sniff_layouts(samples: &[(String, String)]) -> Vec<&'static TimestampLayout> {
    if samples.is_empty() {
        return Vec::new();
    }

    let mut candidates: Vec<&'static TimestampLayout> = ALL_LAYOUTS.iter().collect();

    for (date_str, time_str) in samples {
        if candidates.is_empty() {
            break;
        }
        let datetime = format!("{} {}", date_str.trim(), normalize_time(time_str.trim()));
        candidates.retain(|layout| layout.parse(&datetime).is_some());
    }

    if candidates.len() > 1 {
        let day_first: Vec<_> = candidates
            .iter()
            .copied()
            .filter(|l| l.style() == DateStyle::DayFirst)
            .collect();
        if !day_first.is_empty() {
            return day_first;
        }

        let month_first: Vec<_> = candidates
            .iter()
            .copied()
            .filter(|l| l.style() == DateStyle::MonthFirst)
            .collect();
        if !month_first.is_empty() {
            return month_first;
        }
    }

    candidates
}
