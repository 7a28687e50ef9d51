//! Time normalization and due-label rendering.

use chrono::{DateTime, Utc};

use crate::error::RecordError;

/// Records more than this many minutes in the past are treated as departed.
pub const DEPARTED_TOLERANCE_MINUTES: i64 = -1;

/// Parses an ISO-8601 instant with a `Z` or numeric offset into epoch seconds.
pub fn parse_iso_time(value: &str) -> Result<f64, RecordError> {
    let normalized = match value.strip_suffix('Z') {
        Some(rest) => format!("{rest}+00:00"),
        None => value.to_string(),
    };

    let instant = DateTime::parse_from_rfc3339(&normalized).map_err(|source| RecordError {
        value: value.to_string(),
        source,
    })?;

    Ok(instant.timestamp_millis() as f64 / 1000.0)
}

/// Whole minutes from `now` until `time`, rounded down.
pub fn raw_minutes_until(time: f64, now: DateTime<Utc>) -> i64 {
    let now = now.timestamp_millis() as f64 / 1000.0;
    ((time - now) / 60.0).floor() as i64
}

/// `None` once the record is past the departed tolerance, otherwise the
/// minutes to display (never negative).
pub fn displayed_minutes(raw: i64) -> Option<u32> {
    if raw < DEPARTED_TOLERANCE_MINUTES {
        return None;
    }
    Some(u32::try_from(raw.max(0)).unwrap_or(u32::MAX))
}

/// Renders the raw (unclamped) minute count for display.
pub fn due_label(minutes: i64) -> String {
    match minutes {
        m if m <= 0 => "Due".into(),
        1 => "1 min".into(),
        m if m < 60 => format!("{m} mins"),
        m => {
            let (hours, mins) = (m / 60, m % 60);
            if mins == 0 {
                format!("{hours}h")
            } else {
                format!("{hours}h {mins}m")
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_due_label_boundaries() {
        assert_eq!(due_label(-5), "Due");
        assert_eq!(due_label(0), "Due");
        assert_eq!(due_label(1), "1 min");
        assert_eq!(due_label(2), "2 mins");
        assert_eq!(due_label(59), "59 mins");
        assert_eq!(due_label(60), "1h");
        assert_eq!(due_label(61), "1h 1m");
        assert_eq!(due_label(125), "2h 5m");
    }

    #[test]
    fn test_zulu_and_offset_are_the_same_instant() {
        let zulu = parse_iso_time("2026-01-02T21:37:27.000Z").unwrap();
        let offset = parse_iso_time("2026-01-02T21:37:27.000+00:00").unwrap();
        assert_eq!(zulu, offset);
        assert_eq!(zulu, 1_767_389_847.0);
    }

    #[test]
    fn test_non_utc_offset() {
        let dublin_summer = parse_iso_time("2026-07-01T13:00:00+01:00").unwrap();
        let utc = parse_iso_time("2026-07-01T12:00:00Z").unwrap();
        assert_eq!(dublin_summer, utc);
    }

    #[test]
    fn test_missing_offset_is_a_record_error() {
        let err = parse_iso_time("2026-01-02T21:37:27").unwrap_err();
        assert_eq!(err.value, "2026-01-02T21:37:27");
        assert!(parse_iso_time("soon").is_err());
    }

    #[test]
    fn test_raw_minutes_rounds_down() {
        let now = Utc.with_ymd_and_hms(2026, 1, 2, 21, 0, 0).unwrap();
        let base = now.timestamp() as f64;

        assert_eq!(raw_minutes_until(base + 59.0, now), 0);
        assert_eq!(raw_minutes_until(base + 60.0, now), 1);
        assert_eq!(raw_minutes_until(base + 150.0, now), 2);
        assert_eq!(raw_minutes_until(base - 30.0, now), -1);
        assert_eq!(raw_minutes_until(base - 90.0, now), -2);
    }

    #[test]
    fn test_displayed_minutes_clamps_and_drops() {
        assert_eq!(displayed_minutes(5), Some(5));
        assert_eq!(displayed_minutes(0), Some(0));
        assert_eq!(displayed_minutes(-1), Some(0));
        assert_eq!(displayed_minutes(-2), None);
    }
}
