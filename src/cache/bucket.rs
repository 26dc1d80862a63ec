//! Hour buckets used to key cache file names.

use chrono::{DateTime, NaiveDateTime, TimeZone, Timelike, Utc};
use std::fmt;

/// Minutes added to the current time before truncating to the hour, so a
/// cycle that starts just before the top of the hour already writes into the
/// next bucket.
pub const BUCKET_SKEW_MINUTES: i64 = 10;

/// Format of a bucket label, e.g. `2026-10-18-13`.
const LABEL_FORMAT: &str = "%Y-%m-%d-%H";

/// A UTC hour, truncated to minute zero.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct HourBucket(DateTime<Utc>);

impl HourBucket {
    /// Bucket containing `now` shifted forward by [`BUCKET_SKEW_MINUTES`].
    pub fn at(now: DateTime<Utc>) -> Self {
        let skewed = now + chrono::Duration::minutes(BUCKET_SKEW_MINUTES);
        Self::truncate(skewed)
    }

    fn truncate(t: DateTime<Utc>) -> Self {
        let hour = t
            .with_minute(0)
            .and_then(|t| t.with_second(0))
            .and_then(|t| t.with_nanosecond(0))
            .unwrap_or(t);
        Self(hour)
    }

    /// The bucket one hour earlier.
    pub fn previous(&self) -> Self {
        Self(self.0 - chrono::Duration::hours(1))
    }

    pub fn start(&self) -> DateTime<Utc> {
        self.0
    }

    /// Parse a label produced by [`HourBucket::label`].
    pub fn parse(label: &str) -> Option<Self> {
        if label.len() != 13 {
            return None;
        }
        let naive =
            NaiveDateTime::parse_from_str(&format!("{label}:00"), "%Y-%m-%d-%H:%M").ok()?;
        Some(Self(Utc.from_utc_datetime(&naive)))
    }

    pub fn label(&self) -> String {
        self.0.format(LABEL_FORMAT).to_string()
    }
}

impl fmt::Display for HourBucket {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.label())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn utc(y: i32, mo: u32, d: u32, h: u32, mi: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(y, mo, d, h, mi, 0).unwrap()
    }

    #[test]
    fn test_label_format() {
        assert_eq!(HourBucket::at(utc(2026, 10, 18, 13, 5)).label(), "2026-10-18-13");
    }

    #[test]
    fn test_skew_moves_late_minutes_into_next_hour() {
        assert_eq!(HourBucket::at(utc(2026, 10, 18, 13, 49)).label(), "2026-10-18-13");
        assert_eq!(HourBucket::at(utc(2026, 10, 18, 13, 50)).label(), "2026-10-18-14");
        assert_eq!(HourBucket::at(utc(2026, 10, 18, 23, 55)).label(), "2026-10-19-00");
    }

    #[test]
    fn test_previous_crosses_midnight() {
        let bucket = HourBucket::at(utc(2026, 10, 19, 0, 0));
        assert_eq!(bucket.previous().label(), "2026-10-18-23");
    }

    #[test]
    fn test_parse_roundtrip_and_rejects() {
        let bucket = HourBucket::at(utc(2026, 1, 2, 3, 4));
        assert_eq!(HourBucket::parse(&bucket.label()), Some(bucket));
        assert_eq!(HourBucket::parse("2026-01-02"), None);
        assert_eq!(HourBucket::parse("siterm-link-x"), None);
        assert_eq!(HourBucket::parse("2026-13-02-03"), None);
    }

    #[test]
    fn test_ordering_follows_time() {
        let a = HourBucket::at(utc(2026, 10, 18, 9, 0));
        let b = HourBucket::at(utc(2026, 10, 18, 10, 0));
        assert!(a < b);
        assert_eq!(b.previous(), a);
    }
}
