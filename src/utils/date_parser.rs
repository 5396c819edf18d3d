use crate::data_types::TimeUnit;
use chrono::{DateTime, NaiveDate, NaiveDateTime, TimeZone, Utc};
use chrono_tz::Tz;
use eyre::{eyre, Result};

/// Formats tried, in order, when no explicit date format is configured.
const FALLBACK_DATETIME_FORMATS: [&str; 3] =
    ["%Y-%m-%d %H:%M:%S", "%Y-%m-%dT%H:%M:%S", "%Y-%m-%d %H:%M"];
const FALLBACK_DATE_FORMAT: &str = "%Y-%m-%d";

/// Converts raw record values (strings or epoch numbers) into UTC dates.
#[derive(Debug, Clone)]
pub struct DateParser {
    format: Option<String>,
    timezone: Tz,
    unit: TimeUnit,
}

impl Default for DateParser {
    fn default() -> Self {
        Self {
            format: None,
            timezone: Tz::UTC,
            unit: TimeUnit::Milliseconds,
        }
    }
}

impl DateParser {
    pub fn new(format: Option<String>, timezone: Tz, unit: TimeUnit) -> Self {
        Self {
            format,
            timezone,
            unit,
        }
    }

    /// Parses a date string.
    ///
    /// With an explicit format the string must match it (date-only formats
    /// resolve to midnight). Without one, RFC 3339 is tried first, then a few
    /// common ISO-like layouts. Strings carrying no offset are interpreted in
    /// the parser's timezone.
    pub fn parse_str(&self, raw: &str) -> Result<DateTime<Utc>> {
        let raw = raw.trim();

        if let Some(format) = &self.format {
            if let Ok(naive) = NaiveDateTime::parse_from_str(raw, format) {
                return self.localize(naive);
            }
            if let Ok(date) = NaiveDate::parse_from_str(raw, format) {
                return self.localize(date.and_time(chrono::NaiveTime::MIN));
            }
            return Err(eyre!("'{raw}' does not match date format '{format}'"));
        }

        if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
            return Ok(dt.with_timezone(&Utc));
        }
        for format in FALLBACK_DATETIME_FORMATS {
            if let Ok(naive) = NaiveDateTime::parse_from_str(raw, format) {
                return self.localize(naive);
            }
        }
        if let Ok(date) = NaiveDate::parse_from_str(raw, FALLBACK_DATE_FORMAT) {
            return self.localize(date.and_time(chrono::NaiveTime::MIN));
        }

        Err(eyre!("unrecognized date '{raw}'"))
    }

    /// Interprets a number as an epoch timestamp in the parser's unit.
    pub fn from_timestamp(&self, value: f64) -> Result<DateTime<Utc>> {
        if !value.is_finite() {
            return Err(eyre!("non-finite timestamp {value}"));
        }
        let per_second = match self.unit {
            TimeUnit::Seconds => 1.0,
            TimeUnit::Milliseconds => 1e3,
            TimeUnit::Microseconds => 1e6,
            TimeUnit::Nanoseconds => 1e9,
        };
        let seconds = (value / per_second).floor();
        let nanos = (((value / per_second) - seconds) * 1e9).round().min(999_999_999.0) as u32;

        match Utc.timestamp_opt(seconds as i64, nanos) {
            chrono::LocalResult::Single(d) => Ok(d),
            chrono::LocalResult::Ambiguous(d, _) => Ok(d),
            chrono::LocalResult::None => Err(eyre!("timestamp {value} out of range")),
        }
    }

    fn localize(&self, naive: NaiveDateTime) -> Result<DateTime<Utc>> {
        match self.timezone.from_local_datetime(&naive) {
            chrono::LocalResult::Single(d) => Ok(d.with_timezone(&Utc)),
            // Repeated wall-clock hour (DST fall back): take the earlier instant.
            chrono::LocalResult::Ambiguous(d, _) => Ok(d.with_timezone(&Utc)),
            chrono::LocalResult::None => Err(eyre!(
                "{naive} does not exist in timezone {}",
                self.timezone
            )),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Datelike;

    #[test]
    fn test_parse_rfc3339() {
        let parser = DateParser::default();
        let d = parser.parse_str("2024-03-01T12:00:00+02:00").unwrap();
        assert_eq!(d.to_rfc3339(), "2024-03-01T10:00:00+00:00");
    }

    #[test]
    fn test_parse_with_format_and_timezone() {
        let tz: Tz = "Europe/Paris".parse().unwrap();
        let parser = DateParser::new(Some("%d/%m/%Y".to_string()), tz, TimeUnit::Milliseconds);
        let d = parser.parse_str("15/01/2025").unwrap();
        // Paris is UTC+1 in January
        assert_eq!(d.to_rfc3339(), "2025-01-14T23:00:00+00:00");
    }

    #[test]
    fn test_parse_rejects_garbage() {
        let parser = DateParser::default();
        assert!(parser.parse_str("not a date").is_err());
    }

    #[test]
    fn test_from_timestamp_units() {
        let ms = DateParser::default();
        assert_eq!(ms.from_timestamp(86_400_000.0).unwrap().day(), 2);

        let secs = DateParser::new(None, Tz::UTC, TimeUnit::Seconds);
        assert_eq!(secs.from_timestamp(0.0).unwrap().year(), 1970);
        assert!(secs.from_timestamp(f64::NAN).is_err());
    }
}
