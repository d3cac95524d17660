use std::fmt;

use chrono::{DateTime, Datelike, NaiveDate, NaiveDateTime, Timelike};
use serde::{Deserialize, Serialize};

use crate::error::{Result, TouError};

// ── IntervalTimestamp ─────────────────────────────────────────────────────────

/// Wall-clock start of a measured interval.
///
/// The value is kept in whatever zone the source recorded it in; offsets
/// present in the source string are dropped, never converted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct IntervalTimestamp(NaiveDateTime);

impl IntervalTimestamp {
    pub fn new(local: NaiveDateTime) -> Self {
        Self(local)
    }

    /// Hour of day, `0..=23`.
    pub fn hour(&self) -> u32 {
        self.0.hour()
    }

    /// Day of week with Monday = 0 … Sunday = 6.
    pub fn weekday(&self) -> u32 {
        self.0.weekday().num_days_from_monday()
    }

    /// Saturday or Sunday.
    pub fn is_weekend(&self) -> bool {
        self.weekday() >= 5
    }

    pub fn date(&self) -> NaiveDate {
        self.0.date()
    }

    /// The date portion as `YYYY-MM-DD`.
    pub fn date_key(&self) -> String {
        self.0.format("%Y-%m-%d").to_string()
    }

    pub fn naive(&self) -> NaiveDateTime {
        self.0
    }
}

impl fmt::Display for IntervalTimestamp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0.format("%Y-%m-%dT%H:%M:%S"))
    }
}

// ── Parsing ───────────────────────────────────────────────────────────────────

const OFFSET_FMTS: &[&str] = &[
    "%Y-%m-%dT%H:%M:%S%.f%:z",
    "%Y-%m-%dT%H:%M:%S%:z",
    "%Y-%m-%d %H:%M:%S%.f%:z",
    "%Y-%m-%d %H:%M:%S%:z",
    "%Y-%m-%dT%H:%M%:z",
    "%Y-%m-%d %H:%M%:z",
];

const NAIVE_FMTS: &[&str] = &[
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%dT%H:%M:%S",
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%d %H:%M:%S",
    "%Y-%m-%dT%H:%M",
    "%Y-%m-%d %H:%M",
];

/// Parse an ISO-like date-time, keeping the wall clock of any offset.
fn parse_wall_clock(s: &str) -> Option<NaiveDateTime> {
    let trimmed = s.trim();
    if trimmed.is_empty() {
        return None;
    }

    // Replace trailing 'Z' with '+00:00'.
    let normalised = match trimmed.strip_suffix('Z') {
        Some(stripped) => format!("{}+00:00", stripped),
        None => trimmed.to_string(),
    };

    for fmt in OFFSET_FMTS {
        if let Ok(dt) = DateTime::parse_from_str(&normalised, fmt) {
            return Some(dt.naive_local());
        }
    }
    for fmt in NAIVE_FMTS {
        if let Ok(naive) = NaiveDateTime::parse_from_str(trimmed, fmt) {
            return Some(naive);
        }
    }
    None
}

/// Parse a home-gateway timestamp (already ISO-like).
pub fn parse_gateway_timestamp(s: &str) -> Result<IntervalTimestamp> {
    parse_wall_clock(s)
        .map(IntervalTimestamp)
        .ok_or_else(|| TouError::TimestampParse(s.to_string()))
}

/// Parse a utility-export `IntervalStart` value.
///
/// The utility joins date and time with a `-` (`2018-06-01-13:15`); when no
/// `T` or space separator is present the last `-` is transposed into `T`.
pub fn parse_utility_timestamp(s: &str) -> Result<IntervalTimestamp> {
    let trimmed = s.trim();
    let candidate = if trimmed.contains('T') || trimmed.contains(' ') {
        trimmed.to_string()
    } else {
        match trimmed.rfind('-') {
            Some(idx) => format!("{}T{}", &trimmed[..idx], &trimmed[idx + 1..]),
            None => trimmed.to_string(),
        }
    };

    parse_wall_clock(&candidate)
        .map(IntervalTimestamp)
        .ok_or_else(|| TouError::TimestampParse(s.to_string()))
}

/// Parse a compact `YYYYMMDD` date as used for gateway file names.
pub fn parse_compact_date(s: &str) -> Result<NaiveDate> {
    let s = s.trim();
    if s.len() != 8 || !s.bytes().all(|b| b.is_ascii_digit()) {
        return Err(TouError::InvalidDate(s.to_string()));
    }
    let year: i32 = s[0..4].parse().map_err(|_| TouError::InvalidDate(s.to_string()))?;
    let month: u32 = s[4..6].parse().map_err(|_| TouError::InvalidDate(s.to_string()))?;
    let day: u32 = s[6..8].parse().map_err(|_| TouError::InvalidDate(s.to_string()))?;
    NaiveDate::from_ymd_opt(year, month, day).ok_or_else(|| TouError::InvalidDate(s.to_string()))
}

/// Format a date as `YYYYMMDD`.
pub fn compact_date(date: NaiveDate) -> String {
    date.format("%Y%m%d").to_string()
}

/// Every date in `[start, end]`, ascending. Empty when `start > end`.
pub fn date_range(start: NaiveDate, end: NaiveDate) -> Vec<NaiveDate> {
    start.iter_days().take_while(|d| *d <= end).collect()
}

// ── Tests ─────────────────────────────────────────────────────────────────────
