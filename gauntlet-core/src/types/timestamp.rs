//! UTC timestamp helpers for the status file and reports.
//!
//! The persisted format is RFC 3339 with an explicit `+00:00` offset
//! (`2026-08-01T12:34:56+00:00`); the parser also accepts the `Z` suffix.

use time::format_description::well_known::Rfc3339;
use time::macros::format_description;
use time::OffsetDateTime;

/// Seconds per day, for deadline arithmetic.
const SECONDS_PER_DAY: f64 = 86_400.0;

/// Current UTC time formatted for persistence.
pub fn now_rfc3339() -> String {
    format_rfc3339(OffsetDateTime::now_utc())
}

/// Format a UTC datetime with an explicit `+00:00` offset.
pub fn format_rfc3339(dt: OffsetDateTime) -> String {
    let fmt = format_description!("[year]-[month]-[day]T[hour]:[minute]:[second]+00:00");
    dt.to_offset(time::UtcOffset::UTC)
        .format(&fmt)
        .unwrap_or_else(|_| String::from("1970-01-01T00:00:00+00:00"))
}

/// Parse a persisted timestamp. Returns `None` on malformed input so
/// callers can warn and skip rather than abort.
pub fn parse_rfc3339(s: &str) -> Option<OffsetDateTime> {
    OffsetDateTime::parse(s, &Rfc3339).ok()
}

/// Whole days elapsed between a persisted timestamp and `now`.
///
/// Saturates at zero if the persisted timestamp is in the future (host
/// clock regressed between invocations).
pub fn days_since(persisted: &str, now: OffsetDateTime) -> Option<f64> {
    let then = parse_rfc3339(persisted)?;
    let elapsed = (now - then).as_seconds_f64();
    Some((elapsed / SECONDS_PER_DAY).max(0.0))
}
