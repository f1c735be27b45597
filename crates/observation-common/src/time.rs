//! Observation timestamp handling.

use chrono::{DateTime, FixedOffset, NaiveDate, NaiveDateTime, SecondsFormat, Utc};
use serde::{Serialize, Serializer};

use crate::{ObservationError, ObservationResult};

/// Parse an ISO 8601 string.
///
/// Accepts full RFC 3339 timestamps, timestamps without an offset (assumed
/// UTC) and bare dates (midnight UTC).
pub fn parse_iso8601(s: &str) -> ObservationResult<DateTime<FixedOffset>> {
    let s = s.trim();

    // Try full datetime with timezone
    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Ok(dt);
    }

    // Try without timezone (assume UTC)
    if let Ok(ndt) = NaiveDateTime::parse_from_str(s, "%Y-%m-%dT%H:%M:%S%.f") {
        return Ok(ndt.and_utc().fixed_offset());
    }

    // Try date only
    if let Ok(date) = NaiveDate::parse_from_str(s, "%Y-%m-%d") {
        if let Some(ndt) = date.and_hms_opt(0, 0, 0) {
            return Ok(ndt.and_utc().fixed_offset());
        }
    }

    Err(ObservationError::invalid("observed_at", s))
}

/// When an observation (or a whole batch of them) was made.
///
/// Batches keep strings that do not parse as ISO 8601 verbatim; records
/// only ever hold a parsed timestamp.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ObservedAt {
    Timestamp(DateTime<FixedOffset>),
    Raw(String),
}

impl ObservedAt {
    /// Parse a string, keeping it raw if it is not ISO 8601.
    pub fn lenient(s: impl Into<String>) -> Self {
        let s = s.into();
        match parse_iso8601(&s) {
            Ok(dt) => ObservedAt::Timestamp(dt),
            Err(_) => ObservedAt::Raw(s),
        }
    }

    /// Parse a string, failing if it is not ISO 8601.
    pub fn strict(s: &str) -> ObservationResult<Self> {
        parse_iso8601(s).map(ObservedAt::Timestamp)
    }

    /// The parsed timestamp, if this is not a raw string.
    pub fn timestamp(&self) -> Option<DateTime<FixedOffset>> {
        match self {
            ObservedAt::Timestamp(dt) => Some(*dt),
            ObservedAt::Raw(_) => None,
        }
    }

    /// String form used on the wire.
    pub fn to_wire_string(&self) -> String {
        match self {
            ObservedAt::Timestamp(dt) => dt.to_rfc3339_opts(SecondsFormat::AutoSi, true),
            ObservedAt::Raw(s) => s.clone(),
        }
    }
}

impl From<DateTime<Utc>> for ObservedAt {
    fn from(dt: DateTime<Utc>) -> Self {
        ObservedAt::Timestamp(dt.fixed_offset())
    }
}

impl From<DateTime<FixedOffset>> for ObservedAt {
    fn from(dt: DateTime<FixedOffset>) -> Self {
        ObservedAt::Timestamp(dt)
    }
}

impl From<&str> for ObservedAt {
    fn from(s: &str) -> Self {
        ObservedAt::lenient(s)
    }
}

impl From<String> for ObservedAt {
    fn from(s: String) -> Self {
        ObservedAt::lenient(s)
    }
}

impl std::fmt::Display for ObservedAt {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.to_wire_string())
    }
}

impl Serialize for ObservedAt {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_wire_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Datelike, TimeZone, Timelike};

    #[test]
    fn test_parse_iso8601() {
        let dt = parse_iso8601("2024-01-15T12:00:00Z").unwrap();
        assert_eq!(dt.year(), 2024);
        assert_eq!(dt.month(), 1);
        assert_eq!(dt.day(), 15);
        assert_eq!(dt.hour(), 12);
    }

    #[test]
    fn test_parse_keeps_offset() {
        let dt = parse_iso8601("2024-01-15T12:00:00-08:00").unwrap();
        assert_eq!(dt.offset().local_minus_utc(), -8 * 3600);
    }

    #[test]
    fn test_parse_naive_and_date_only() {
        let naive = parse_iso8601("2024-01-15T06:30:00").unwrap();
        assert_eq!(naive.hour(), 6);
        assert_eq!(naive.offset().local_minus_utc(), 0);

        let date = parse_iso8601("2024-01-15").unwrap();
        assert_eq!(date.hour(), 0);
    }

    #[test]
    fn test_lenient_keeps_raw() {
        assert_eq!(
            ObservedAt::lenient("sometime last spring"),
            ObservedAt::Raw("sometime last spring".to_string())
        );
        assert_eq!(
            ObservedAt::lenient("sometime last spring").to_wire_string(),
            "sometime last spring"
        );
    }

    #[test]
    fn test_strict_rejects_garbage() {
        assert!(ObservedAt::strict("yesterday").is_err());
    }

    #[test]
    fn test_wire_string_uses_z_for_utc() {
        let at = ObservedAt::from(Utc.with_ymd_and_hms(2024, 1, 15, 12, 0, 0).unwrap());
        assert_eq!(at.to_wire_string(), "2024-01-15T12:00:00Z");
        assert_eq!(
            serde_json::to_string(&at).unwrap(),
            "\"2024-01-15T12:00:00Z\""
        );
    }
}
