//! Shared timestamp helpers for event envelopes and day-scoped ids.

use chrono::{DateTime, Duration, SecondsFormat, Utc};

/// Returns the current UTC instant as an ISO-8601 string with millisecond
/// precision and `Z` suffix (e.g. `2026-08-21T09:15:00.123Z`).
pub fn now_iso() -> String {
    iso_from(Utc::now())
}

pub fn iso_from(instant: DateTime<Utc>) -> String {
    instant.to_rfc3339_opts(SecondsFormat::Millis, true)
}

/// Timestamp `offset_ms` milliseconds after `base`. Used for batches of
/// events that must stay strictly ordered within one log file.
pub fn iso_offset(base: DateTime<Utc>, offset_ms: i64) -> String {
    iso_from(base + Duration::milliseconds(offset_ms))
}

/// Parses an encoded timestamp back into a UTC instant. Returns `None` for
/// anything that is not RFC 3339.
pub fn parse_iso(timestamp: &str) -> Option<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(timestamp)
        .ok()
        .map(|parsed| parsed.with_timezone(&Utc))
}

/// UTC calendar-day id prefix (`D-YYYY-MM-DD-`) for the given instant.
pub fn day_prefix(instant: DateTime<Utc>) -> String {
    format!("D-{}-", instant.format("%Y-%m-%d"))
}
