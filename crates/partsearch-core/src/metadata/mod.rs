//! Small persisted documents and the timestamp formats they carry.
//!
//! Writes go through a temp file that is synced and then renamed over the
//! target, so readers see either the old or the new document.

mod atomic;

pub use atomic::{atomic_read_json, atomic_write_json};

use chrono::{DateTime, NaiveDateTime, Utc};

/// Parse a stored scan timestamp.
///
/// Current documents use RFC 3339. Older ones used a local
/// `YYYY-MM-DD HH:MM[:SS]` stamp or epoch seconds; those are read as UTC.
/// Anything else is treated as absent.
pub fn parse_timestamp(raw: &str) -> Option<DateTime<Utc>> {
    let raw = raw.trim();
    if let Ok(at) = DateTime::parse_from_rfc3339(raw) {
        return Some(at.with_timezone(&Utc));
    }
    if let Some(at) = ["%Y-%m-%d %H:%M:%S", "%Y-%m-%d %H:%M"]
        .iter()
        .find_map(|fmt| NaiveDateTime::parse_from_str(raw, fmt).ok())
    {
        return Some(at.and_utc());
    }
    raw.parse::<f64>()
        .ok()
        .filter(|secs| secs.is_finite() && *secs >= 0.0)
        .and_then(|secs| DateTime::from_timestamp(secs as i64, 0))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_parse_timestamp_formats() {
        let expected = Utc.with_ymd_and_hms(2026, 1, 5, 8, 0, 0).unwrap();
        assert_eq!(parse_timestamp("2026-01-05T08:00:00+00:00"), Some(expected));
        assert_eq!(parse_timestamp("2026-01-05 08:00"), Some(expected));
        assert_eq!(parse_timestamp(" 2026-01-05 08:00:00 "), Some(expected));
        assert_eq!(
            parse_timestamp(&expected.timestamp().to_string()),
            Some(expected)
        );
        assert_eq!(parse_timestamp("Never"), None);
        assert_eq!(parse_timestamp(""), None);
    }
}
