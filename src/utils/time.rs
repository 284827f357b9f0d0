//! Timestamp parsing helpers.
//!
//! Tracker pages render timestamps in a handful of loosely related shapes
//! (`2020-01-01 10:00:00`, day-only, ISO with `T`, optional numeric zone).
//! Everything is normalized to a timezone-naive [`NaiveDateTime`].

use chrono::{DateTime, NaiveDate, NaiveDateTime};

const FORMATS: &[&str] = &[
    "%Y-%m-%d %H:%M:%S",
    "%Y-%m-%dT%H:%M:%S",
    "%Y-%m-%d %H:%M",
];

const ZONED_FORMATS: &[&str] = &["%Y-%m-%d %H:%M:%S %z", "%Y-%m-%dT%H:%M:%S%z"];

/// Parse a tracker timestamp, dropping any timezone information.
pub fn parse_timestamp(s: &str) -> Option<NaiveDateTime> {
    let s = s.trim();
    for fmt in FORMATS {
        if let Ok(dt) = NaiveDateTime::parse_from_str(s, fmt) {
            return Some(dt);
        }
    }
    for fmt in ZONED_FORMATS {
        if let Ok(dt) = DateTime::parse_from_str(s, fmt) {
            return Some(dt.naive_local());
        }
    }
    if let Ok(d) = NaiveDate::parse_from_str(s, "%Y-%m-%d") {
        return d.and_hms_opt(0, 0, 0);
    }
    None
}

/// Parse a tracker timestamp and render it as a timezone-naive ISO string.
pub fn to_iso(s: &str) -> Option<String> {
    parse_timestamp(s).map(|dt| dt.format("%Y-%m-%dT%H:%M:%S").to_string())
}
