//! Timestamp parsing for the loosely formatted dates Lightroom returns.

use chrono::{DateTime, Datelike, FixedOffset, NaiveDate, NaiveDateTime};

/// Capture date Lightroom reports for photos without EXIF date information.
pub const CAPTURE_DATE_SENTINEL: &str = "0000-00-00T00:00:00";

/// Parse an ISO-8601 timestamp, keeping the offset it was written with.
///
/// Accepts RFC 3339 (`2024-03-15T10:00:00Z`, `...+01:00`), naive datetimes
/// with optional fractional seconds (taken as UTC), and bare dates.
/// Returns `None` for anything else, including the all-zero sentinel.
///
/// Date buckets follow the wall-clock day, so the offset is never
/// normalized away.
pub fn parse_timestamp(s: &str) -> Option<DateTime<FixedOffset>> {
    let s = s.trim();
    if s.is_empty() || s.starts_with("0000-00-00") {
        return None;
    }
    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Some(dt);
    }
    if let Ok(naive) = NaiveDateTime::parse_from_str(s, "%Y-%m-%dT%H:%M:%S%.f") {
        return Some(naive.and_utc().fixed_offset());
    }
    if let Ok(date) = NaiveDate::parse_from_str(s, "%Y-%m-%d") {
        return date
            .and_hms_opt(0, 0, 0)
            .map(|n| n.and_utc().fixed_offset());
    }
    None
}

/// Parse a capture date, treating the sentinel value as absent.
pub fn parse_capture_date(s: &str) -> Option<DateTime<FixedOffset>> {
    if s == CAPTURE_DATE_SENTINEL {
        return None;
    }
    parse_timestamp(s)
}

/// `YYYY` and `MM-DD` components of the local date-bucket layout.
pub fn bucket_components(date: &DateTime<FixedOffset>) -> (String, String) {
    (
        format!("{:04}", date.year()),
        format!("{:02}-{:02}", date.month(), date.day()),
    )
}

/// Display key for a date bucket, e.g. `2024/03-15`.
pub fn bucket_key(date: &DateTime<FixedOffset>) -> String {
    let (year, month_day) = bucket_components(date);
    format!("{year}/{month_day}")
}
