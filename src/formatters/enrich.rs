//! Enrichment formatters: add or rewrite fields, never render

use super::Formatter;
use crate::core::{datetime_from_millis, is_error_like, Fields, LogRecord, TimestampFormat};
use chrono::Utc;
use parking_lot::Mutex;
use serde_json::Value;
use std::collections::HashSet;
use std::time::Instant;

/// Adds a rendered timestamp field
///
/// Uses the record's `time` when present, otherwise the current time.
#[derive(Debug, Clone)]
pub struct TimestampFormatter {
    format: TimestampFormat,
    key: String,
}

impl TimestampFormatter {
    pub fn new() -> Self {
        Self {
            format: TimestampFormat::default(),
            key: "timestamp".to_string(),
        }
    }

    #[must_use]
    pub fn with_format(mut self, format: TimestampFormat) -> Self {
        self.format = format;
        self
    }

    /// Field to write instead of `timestamp`
    #[must_use]
    pub fn alias(mut self, key: impl Into<String>) -> Self {
        self.key = key.into();
        self
    }
}

impl Default for TimestampFormatter {
    fn default() -> Self {
        Self::new()
    }
}

impl Formatter for TimestampFormatter {
    fn format(&self, record: &LogRecord) -> Option<LogRecord> {
        let datetime = record.time().map(datetime_from_millis).unwrap_or_else(Utc::now);
        Some(record.with_field(self.key.clone(), self.format.to_value(&datetime)))
    }
}

/// Tags records with a label, as a field or as a message prefix
#[derive(Debug, Clone)]
pub struct LabelFormatter {
    label: String,
    in_message: bool,
}

impl LabelFormatter {
    pub fn new(label: impl Into<String>) -> Self {
        Self {
            label: label.into(),
            in_message: false,
        }
    }

    /// Prefix the message with `[label] ` instead of adding a `label` field
    #[must_use]
    pub fn in_message(mut self) -> Self {
        self.in_message = true;
        self
    }
}

impl Formatter for LabelFormatter {
    fn format(&self, record: &LogRecord) -> Option<LogRecord> {
        if self.in_message {
            Some(record.with_message(format!("[{}] {}", self.label, record.msg())))
        } else {
            Some(record.with_field("label", self.label.clone()))
        }
    }
}

/// Lifts details out of the record's error field
///
/// An empty message is replaced by the error's message. With
/// [`stack`](Self::stack), the error's stack is copied to a top-level
/// `stack` field. Records without an error-like value pass through untouched.
#[derive(Debug, Clone, Copy, Default)]
pub struct ErrorsFormatter {
    stack: bool,
}

impl ErrorsFormatter {
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn stack(mut self) -> Self {
        self.stack = true;
        self
    }
}

impl Formatter for ErrorsFormatter {
    fn format(&self, record: &LogRecord) -> Option<LogRecord> {
        let Some(error) = record.error().filter(|e| is_error_like(e)) else {
            return Some(record.clone());
        };
        let message = error.get("message").and_then(Value::as_str).unwrap_or("");
        let stack = error.get("stack").cloned();

        let fill_message = record.msg().is_empty() && !message.is_empty();
        if !fill_message && !self.stack {
            return Some(record.clone());
        }

        let message_key = record.keys().message.clone();
        let message = message.to_string();
        Some(record.transform(|fields| {
            if fill_message {
                fields.insert(message_key, Value::String(message));
            }
            if self.stack {
                if let Some(stack) = stack {
                    fields.insert("stack".to_string(), stack);
                }
            }
        }))
    }
}

/// Moves user fields under one key
///
/// By default every non-core field moves. `fill_except` keeps the named
/// fields at the top level; `fill_with` moves only the named fields.
#[derive(Debug, Clone)]
pub struct MetadataFormatter {
    key: String,
    fill_except: HashSet<String>,
    fill_with: Option<HashSet<String>>,
}

impl MetadataFormatter {
    pub fn new() -> Self {
        Self {
            key: "metadata".to_string(),
            fill_except: HashSet::new(),
            fill_with: None,
        }
    }

    #[must_use]
    pub fn key(mut self, key: impl Into<String>) -> Self {
        self.key = key.into();
        self
    }

    #[must_use]
    pub fn fill_except<I, S>(mut self, keys: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.fill_except = keys.into_iter().map(Into::into).collect();
        self
    }

    #[must_use]
    pub fn fill_with<I, S>(mut self, keys: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.fill_with = Some(keys.into_iter().map(Into::into).collect());
        self
    }

    fn moves(&self, key: &str) -> bool {
        if self.fill_except.contains(key) || key == self.key {
            return false;
        }
        self.fill_with.as_ref().map_or(true, |with| with.contains(key))
    }
}

impl Default for MetadataFormatter {
    fn default() -> Self {
        Self::new()
    }
}

impl Formatter for MetadataFormatter {
    fn format(&self, record: &LogRecord) -> Option<LogRecord> {
        let moving: Vec<String> = record
            .extra_fields()
            .map(|(key, _)| key)
            .filter(|key| self.moves(key))
            .cloned()
            .collect();
        if moving.is_empty() {
            return Some(record.clone());
        }

        Some(record.transform(|fields| {
            let mut metadata = match fields.shift_remove(&self.key) {
                Some(Value::Object(existing)) => existing,
                _ => Fields::new(),
            };
            for key in moving {
                if let Some(value) = fields.shift_remove(&key) {
                    metadata.insert(key, value);
                }
            }
            fields.insert(self.key.clone(), Value::Object(metadata));
        }))
    }
}

/// Prefixes the message with a tab so columns line up
#[derive(Debug, Clone, Copy, Default)]
pub struct AlignFormatter;

impl AlignFormatter {
    pub fn new() -> Self {
        Self
    }
}

impl Formatter for AlignFormatter {
    fn format(&self, record: &LogRecord) -> Option<LogRecord> {
        Some(record.with_message(format!("\t{}", record.msg())))
    }
}

/// Adds `ms`: time since the previous record this instance saw, as `+Nms`
///
/// The previous-call time is per instance. Give every consumer that expects
/// independent deltas its own instance.
#[derive(Debug, Default)]
pub struct MillisecondFormatter {
    previous: Mutex<Option<Instant>>,
}

impl MillisecondFormatter {
    pub fn new() -> Self {
        Self::default()
    }
}

impl Formatter for MillisecondFormatter {
    fn format(&self, record: &LogRecord) -> Option<LogRecord> {
        let now = Instant::now();
        let elapsed = {
            let mut previous = self.previous.lock();
            let elapsed = previous.map_or(0, |prev| now.duration_since(prev).as_millis());
            *previous = Some(now);
            elapsed
        };
        Some(record.with_field("ms", format!("+{}ms", elapsed)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::{BasePolicy, LogLevel, RecordKeys, RecordOptions, TimestampPolicy};
    use serde_json::json;
    use std::sync::Arc;

    fn record(msg: &str, fields: Value) -> LogRecord {
        LogRecord::create(
            RecordOptions::new(LogLevel::Error, msg)
                .base(BasePolicy::Omit)
                .timestamp(TimestampPolicy::Custom(Arc::new(|| json!(1_736_332_245_123_i64))))
                .fields(fields.as_object().cloned().unwrap()),
        )
    }

    #[test]
    fn test_timestamp_uses_record_time() {
        let out = TimestampFormatter::new().format(&record("m", json!({}))).unwrap();
        assert_eq!(out.get_str("timestamp"), Some("2025-01-08T10:30:45.123Z"));

        let out = TimestampFormatter::new()
            .with_format(TimestampFormat::Unix)
            .alias("ts")
            .format(&record("m", json!({})))
            .unwrap();
        assert_eq!(out.get("ts"), Some(&json!(1_736_332_245_i64)));
    }

    #[test]
    fn test_label_modes() {
        let input = record("started", json!({}));
        let out = LabelFormatter::new("worker").format(&input).unwrap();
        assert_eq!(out.get_str("label"), Some("worker"));
        assert_eq!(out.msg(), "started");

        let out = LabelFormatter::new("worker").in_message().format(&input).unwrap();
        assert_eq!(out.msg(), "[worker] started");
        assert!(!out.contains_key("label"));
    }

    #[test]
    fn test_errors_fills_message_and_stack() {
        let input = record(
            "",
            json!({"err": {"type": "IoError", "message": "disk full", "stack": "IoError: disk full"}}),
        );
        let out = ErrorsFormatter::new().stack().format(&input).unwrap();
        assert_eq!(out.msg(), "disk full");
        assert_eq!(out.get_str("stack"), Some("IoError: disk full"));

        let plain = record("fine", json!({}));
        assert!(ErrorsFormatter::new().stack().format(&plain).unwrap().ptr_eq(&plain));
    }

    #[test]
    fn test_errors_reads_nested_error() {
        let input = LogRecord::create(
            RecordOptions::new(LogLevel::Error, "")
                .base(BasePolicy::Omit)
                .timestamp(false)
                .fields(
                    json!({"err": {"type": "IoError", "message": "disk full", "stack": "IoError: disk full"}})
                        .as_object()
                        .cloned()
                        .unwrap(),
                )
                .keys(RecordKeys {
                    nested: Some("payload".to_string()),
                    ..RecordKeys::default()
                }),
        );
        let out = ErrorsFormatter::new().stack().format(&input).unwrap();
        assert_eq!(out.msg(), "disk full");
        assert_eq!(out.get_str("stack"), Some("IoError: disk full"));
    }

    #[test]
    fn test_metadata_moves_extra_fields() {
        let input = record("m", json!({"user": "bob", "requestId": "abc"}));
        let out = MetadataFormatter::new().fill_except(["requestId"]).format(&input).unwrap();
        assert_eq!(out.get("metadata"), Some(&json!({"user": "bob"})));
        assert_eq!(out.get_str("requestId"), Some("abc"));
        assert!(!out.contains_key("user"));

        let out = MetadataFormatter::new().key("meta").fill_with(["user"]).format(&input).unwrap();
        assert_eq!(out.get("meta"), Some(&json!({"user": "bob"})));
    }

    #[test]
    fn test_align_and_ms() {
        let out = AlignFormatter.format(&record("m", json!({}))).unwrap();
        assert_eq!(out.msg(), "\tm");

        let ms = MillisecondFormatter::new();
        let first = ms.format(&record("a", json!({}))).unwrap();
        assert_eq!(first.get_str("ms"), Some("+0ms"));
        let second = ms.format(&record("b", json!({}))).unwrap();
        assert!(second.get_str("ms").unwrap().starts_with('+'));
    }
}
