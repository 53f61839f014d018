//! Timestamp rendering for formatters and text handlers
//!
//! Records carry `time` as epoch milliseconds. [`TimestampFormat`] turns that
//! into whatever the destination expects.

use chrono::{DateTime, TimeZone, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// How a timestamp is rendered
///
/// # Examples
///
/// ```
/// use structured_log_pipeline::core::TimestampFormat;
///
/// let format = TimestampFormat::Iso8601;
/// assert_eq!(format.format_millis(0), "1970-01-01T00:00:00.000Z");
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum TimestampFormat {
    /// `2025-01-08T10:30:45.123Z`
    #[default]
    Iso8601,

    /// `2025-01-08T10:30:45.123456Z`
    Iso8601Micros,

    /// `2025-01-08T10:30:45.123+00:00`
    Rfc3339,

    /// Seconds since the epoch
    Unix,

    /// Milliseconds since the epoch
    UnixMillis,

    /// Microseconds since the epoch
    UnixMicros,

    /// Any strftime-compatible pattern, e.g. `%d/%b/%Y:%H:%M:%S %z`
    Custom(String),
}

impl TimestampFormat {
    #[must_use]
    pub fn format(&self, datetime: &DateTime<Utc>) -> String {
        match self {
            TimestampFormat::Iso8601 => datetime.format("%Y-%m-%dT%H:%M:%S%.3fZ").to_string(),
            TimestampFormat::Iso8601Micros => datetime.format("%Y-%m-%dT%H:%M:%S%.6fZ").to_string(),
            TimestampFormat::Rfc3339 => datetime.to_rfc3339(),
            TimestampFormat::Unix => datetime.timestamp().to_string(),
            TimestampFormat::UnixMillis => datetime.timestamp_millis().to_string(),
            TimestampFormat::UnixMicros => datetime.timestamp_micros().to_string(),
            TimestampFormat::Custom(format_str) => datetime.format(format_str).to_string(),
        }
    }

    /// Render epoch milliseconds, as stored in a record's `time` field
    #[must_use]
    pub fn format_millis(&self, millis: i64) -> String {
        self.format(&datetime_from_millis(millis))
    }

    /// Render as a JSON value: numeric formats stay numbers
    #[must_use]
    pub fn to_value(&self, datetime: &DateTime<Utc>) -> Value {
        match self {
            TimestampFormat::Unix => Value::from(datetime.timestamp()),
            TimestampFormat::UnixMillis => Value::from(datetime.timestamp_millis()),
            TimestampFormat::UnixMicros => Value::from(datetime.timestamp_micros()),
            _ => Value::String(self.format(datetime)),
        }
    }

    #[must_use]
    pub fn is_numeric(&self) -> bool {
        matches!(
            self,
            TimestampFormat::Unix | TimestampFormat::UnixMillis | TimestampFormat::UnixMicros
        )
    }
}

/// Epoch milliseconds to a UTC datetime; out-of-range values clamp to the epoch
pub fn datetime_from_millis(millis: i64) -> DateTime<Utc> {
    Utc.timestamp_millis_opt(millis)
        .single()
        .unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;

    // 2025-01-08 10:30:45.123 UTC
    const FIXED_MILLIS: i64 = 1_736_332_245_123;

    #[test]
    fn test_iso8601_format() {
        assert_eq!(
            TimestampFormat::Iso8601.format_millis(FIXED_MILLIS),
            "2025-01-08T10:30:45.123Z"
        );
        assert_eq!(
            TimestampFormat::Iso8601Micros.format_millis(FIXED_MILLIS),
            "2025-01-08T10:30:45.123000Z"
        );
    }

    #[test]
    fn test_custom_apache_format() {
        let format = TimestampFormat::Custom("%d/%b/%Y:%H:%M:%S +0000".to_string());
        assert_eq!(format.format_millis(FIXED_MILLIS), "08/Jan/2025:10:30:45 +0000");
    }

    #[test]
    fn test_numeric_formats_stay_numbers() {
        let datetime = datetime_from_millis(FIXED_MILLIS);
        assert_eq!(TimestampFormat::UnixMillis.to_value(&datetime), Value::from(FIXED_MILLIS));
        assert_eq!(TimestampFormat::Unix.to_value(&datetime), Value::from(1_736_332_245_i64));
        assert!(TimestampFormat::Rfc3339.to_value(&datetime).is_string());
        assert!(TimestampFormat::UnixMicros.is_numeric());
        assert!(!TimestampFormat::Iso8601.is_numeric());
    }

    #[test]
    fn test_deserialization() {
        let format: TimestampFormat = serde_json::from_str("\"Rfc3339\"").unwrap();
        assert_eq!(format, TimestampFormat::Rfc3339);

        let format: TimestampFormat = serde_json::from_str(r#"{"Custom":"%Y-%m-%d"}"#).unwrap();
        assert_eq!(format, TimestampFormat::Custom("%Y-%m-%d".to_string()));
    }
}
