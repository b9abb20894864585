//! Timestamp helpers for values written to and read back from the graph.
//!
//! Timestamps are stored as strings, so the format has to survive a round trip
//! through the database unchanged.

use chrono::{DateTime, NaiveDateTime, TimeZone, Utc};

/// Format a UTC instant as ISO 8601 with nanosecond precision:
/// `"2024-01-15T10:30:00.000000000Z"`.
pub fn format_timestamp(dt: &DateTime<Utc>) -> String {
    dt.format("%Y-%m-%dT%H:%M:%S%.9fZ").to_string()
}

/// The current instant in [`format_timestamp`] form.
pub fn now_timestamp() -> String {
    format_timestamp(&Utc::now())
}

/// Parse a stored timestamp back into UTC.
///
/// Accepts RFC 3339 (what [`format_timestamp`] writes) and offset-less ISO 8601
/// with optional fractional seconds, which is read as UTC. Returns `None` for
/// anything else.
pub fn parse_timestamp(s: &str) -> Option<DateTime<Utc>> {
    if s.is_empty() {
        return None;
    }

    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Some(dt.with_timezone(&Utc));
    }

    NaiveDateTime::parse_from_str(s, "%Y-%m-%dT%H:%M:%S%.f")
        .ok()
        .map(|ndt| Utc.from_utc_datetime(&ndt))
}
