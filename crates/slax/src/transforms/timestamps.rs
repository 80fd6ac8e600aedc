//! ⏰ Timestamp parsing: three dialects in, UTC out.
//!
//! - RFC 3339 (`2025-03-01T10:00:00Z`, `2025-03-01T10:00:00+05:30`)
//! - Jira's colon-less offsets (`2025-03-01T10:00:00.000+0000`)
//! - bare dates (`2025-03-01`), read as midnight UTC
//!
//! Anything else is `None`. Malformed means absent, not fatal.

use chrono::{DateTime, NaiveDate, Utc};
use serde_json::Value;

const JIRA_FORMAT: &str = "%Y-%m-%dT%H:%M:%S%.f%z";
const DATE_FORMAT: &str = "%Y-%m-%d";

pub fn parse_instant(raw: &str) -> Option<DateTime<Utc>> {
    let raw = raw.trim();
    if raw.is_empty() {
        return None;
    }
    if let Ok(parsed) = DateTime::parse_from_rfc3339(raw) {
        return Some(parsed.with_timezone(&Utc));
    }
    if let Ok(parsed) = DateTime::parse_from_str(raw, JIRA_FORMAT) {
        return Some(parsed.with_timezone(&Utc));
    }
    NaiveDate::parse_from_str(raw, DATE_FORMAT)
        .ok()
        .and_then(|date| date.and_hms_opt(0, 0, 0))
        .map(|midnight| midnight.and_utc())
}

/// 🔍 A JSON string holding a timestamp, or `None` for anything else (null, numbers, objects).
pub fn instant_from_value(value: Option<&Value>) -> Option<DateTime<Utc>> {
    value.and_then(Value::as_str).and_then(parse_instant)
}

/// 🔢 Milliseconds since the Unix epoch, as Jira's SLA payloads sometimes spell it.
pub fn instant_from_epoch_millis(value: Option<&Value>) -> Option<DateTime<Utc>> {
    value
        .and_then(Value::as_i64)
        .and_then(DateTime::from_timestamp_millis)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use serde_json::json;

    #[test]
    fn the_one_where_all_three_dialects_land_on_the_same_clock() {
        let expected = Utc.with_ymd_and_hms(2025, 3, 1, 10, 0, 0).unwrap();
        assert_eq!(parse_instant("2025-03-01T10:00:00Z"), Some(expected));
        assert_eq!(parse_instant("2025-03-01T10:00:00.000+0000"), Some(expected));
        assert_eq!(parse_instant("2025-03-01T15:30:00.000+0530"), Some(expected));
        assert_eq!(parse_instant("2025-03-01T11:00:00+01:00"), Some(expected));
        assert_eq!(
            parse_instant("2025-03-01"),
            Some(Utc.with_ymd_and_hms(2025, 3, 1, 0, 0, 0).unwrap())
        );
    }

    #[test]
    fn the_one_where_garbage_is_simply_absent() {
        for garbage in ["", "   ", "yesterday", "2025-13-45", "01/03/2025"] {
            assert_eq!(parse_instant(garbage), None, "{garbage:?}");
        }
        assert_eq!(instant_from_value(Some(&json!(42))), None);
        assert_eq!(instant_from_value(Some(&Value::Null)), None);
        assert_eq!(instant_from_value(None), None);
    }

    #[test]
    fn the_one_where_epoch_millis_count_too() {
        assert_eq!(
            instant_from_epoch_millis(Some(&json!(1_735_725_600_000_i64))),
            Some(Utc.with_ymd_and_hms(2025, 1, 1, 10, 0, 0).unwrap())
        );
        assert_eq!(instant_from_epoch_millis(Some(&json!("soon"))), None);
    }
}
