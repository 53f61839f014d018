//! Human-readable line rendering

use super::Formatter;
use crate::core::{coerce_string, safe_json, sanitize_line, LogRecord, TimestampFormat, FORMATTED_KEY};
use serde_json::Value;
use std::fmt;

/// `level: message {extra fields as JSON}`
///
/// ```text
/// info: request completed {"requestId":"abc"}
/// ```
#[derive(Debug, Clone, Copy, Default)]
pub struct SimpleFormatter;

impl SimpleFormatter {
    pub fn new() -> Self {
        Self
    }
}

impl Formatter for SimpleFormatter {
    fn format(&self, record: &LogRecord) -> Option<LogRecord> {
        let mut line = format!("{}: {}", record.level_name(), record.msg());
        let extras: serde_json::Map<String, Value> = record
            .extra_fields()
            .map(|(k, v)| (k.clone(), v.clone()))
            .collect();
        if !extras.is_empty() {
            line.push(' ');
            line.push_str(&safe_json(&Value::Object(extras), false));
        }
        Some(record.with_field(FORMATTED_KEY, line))
    }
}

/// Renders with a user template
///
/// ```
/// use structured_log_pipeline::formatters::PrintfFormatter;
///
/// let formatter = PrintfFormatter::new(|r| format!("[{}] {}", r.level_name(), r.msg()));
/// ```
pub struct PrintfFormatter<F> {
    template: F,
}

impl<F> PrintfFormatter<F>
where
    F: Fn(&LogRecord) -> String + Send + Sync,
{
    pub fn new(template: F) -> Self {
        Self { template }
    }
}

impl<F> Formatter for PrintfFormatter<F>
where
    F: Fn(&LogRecord) -> String + Send + Sync,
{
    fn format(&self, record: &LogRecord) -> Option<LogRecord> {
        Some(record.with_field(FORMATTED_KEY, (self.template)(record)))
    }
}

impl<F> fmt::Debug for PrintfFormatter<F> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("PrintfFormatter(..)")
    }
}

/// `key=value` pairs, compatible with logfmt-aware aggregators
///
/// ```text
/// time=2025-01-08T10:30:45.123Z level=warn name=db msg="slow query" ms=812
/// ```
#[derive(Debug, Clone, Default)]
pub struct LogfmtFormatter {
    timestamp_format: TimestampFormat,
}

impl LogfmtFormatter {
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn timestamp_format(mut self, format: TimestampFormat) -> Self {
        self.timestamp_format = format;
        self
    }
}

impl Formatter for LogfmtFormatter {
    fn format(&self, record: &LogRecord) -> Option<LogRecord> {
        let mut parts = Vec::new();

        if let Some(millis) = record.time() {
            parts.push(format!(
                "time={}",
                escape_logfmt_value(&self.timestamp_format.format_millis(millis))
            ));
        }
        parts.push(format!("level={}", escape_logfmt_value(record.level_name())));
        if !record.name().is_empty() {
            parts.push(format!("name={}", escape_logfmt_value(record.name())));
        }
        // Message is always quoted.
        parts.push(format!("msg={}", quote_logfmt_value(&sanitize_line(record.msg()))));

        for (key, value) in record.extra_fields() {
            let rendered = match value {
                Value::String(s) => quote_logfmt_value(&sanitize_line(s)),
                Value::Number(_) | Value::Bool(_) | Value::Null => coerce_string(value),
                other => quote_logfmt_value(&safe_json(other, false)),
            };
            parts.push(format!("{}={}", escape_logfmt_key(key), rendered));
        }

        Some(record.with_field(FORMATTED_KEY, parts.join(" ")))
    }
}

/// Keep only characters that are safe in a logfmt key
pub(crate) fn escape_logfmt_key(key: &str) -> String {
    key.chars()
        .filter(|c| c.is_alphanumeric() || *c == '_' || *c == '-' || *c == '.')
        .collect()
}

/// Quote a value only when it contains spaces, quotes or `=`
pub(crate) fn escape_logfmt_value(value: &str) -> String {
    if value.is_empty() || value.contains(' ') || value.contains('"') || value.contains('=') {
        quote_logfmt_value(value)
    } else {
        value.to_string()
    }
}

pub(crate) fn quote_logfmt_value(value: &str) -> String {
    format!("\"{}\"", value.replace('\\', "\\\\").replace('"', "\\\""))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::{BasePolicy, LogLevel, RecordOptions, TimestampPolicy};
    use serde_json::json;
    use std::sync::Arc;

    fn record(fields: Value) -> LogRecord {
        LogRecord::create(
            RecordOptions::new(LogLevel::Info, "request completed")
                .name("api")
                .base(BasePolicy::Omit)
                .timestamp(false)
                .fields(fields.as_object().cloned().unwrap()),
        )
    }

    #[test]
    fn test_simple_with_and_without_extras() {
        let out = SimpleFormatter.format(&record(json!({"requestId": "abc"}))).unwrap();
        assert_eq!(out.formatted(), Some(r#"info: request completed {"requestId":"abc"}"#));

        let out = SimpleFormatter.format(&record(json!({}))).unwrap();
        assert_eq!(out.formatted(), Some("info: request completed"));
    }

    #[test]
    fn test_printf_template() {
        let formatter = PrintfFormatter::new(|r: &LogRecord| format!("{} | {}", r.name(), r.msg()));
        let out = formatter.format(&record(json!({}))).unwrap();
        assert_eq!(out.formatted(), Some("api | request completed"));
    }

    #[test]
    fn test_logfmt_fields_and_quoting() {
        let input = record(json!({
            "query": "SELECT * FROM users WHERE id=1",
            "count": 5,
            "tags": ["a"]
        }));
        let out = LogfmtFormatter::new().format(&input).unwrap();
        let line = out.formatted().unwrap();

        assert!(line.starts_with("level=info name=api msg=\"request completed\""));
        assert!(line.contains("query=\"SELECT * FROM users WHERE id=1\""));
        assert!(line.contains("count=5"));
        assert!(line.contains(r#"tags="[\"a\"]""#));
    }

    #[test]
    fn test_logfmt_time_and_injection() {
        let input = LogRecord::create(
            RecordOptions::new(LogLevel::Warn, "line one\nline two")
                .base(BasePolicy::Omit)
                .timestamp(TimestampPolicy::Custom(Arc::new(|| json!(0)))),
        );
        let out = LogfmtFormatter::new().format(&input).unwrap();
        let line = out.formatted().unwrap();
        assert!(line.starts_with("time=1970-01-01T00:00:00.000Z level=warn"));
        assert!(line.contains(r#"msg="line one\nline two""#));
        assert!(!line.contains('\n'));
    }

    #[test]
    fn test_escape_helpers() {
        assert_eq!(escape_logfmt_key("user id!"), "userid");
        assert_eq!(escape_logfmt_value("plain"), "plain");
        assert_eq!(escape_logfmt_value("a b"), "\"a b\"");
        assert_eq!(quote_logfmt_value(r#"say "hi""#), r#""say \"hi\"""#);
    }
}
