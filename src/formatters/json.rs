//! JSON line rendering

use super::Formatter;
use crate::core::{safe_json, LogRecord, FORMATTED_KEY};
use serde::Serialize;
use serde_json::Value;

/// Renders the record as JSON into `__formatted`
///
/// Internal fields are left out. Output is compact unless an indent is set.
#[derive(Debug, Clone, Default)]
pub struct JsonFormatter {
    indent: Option<usize>,
    sort_keys: bool,
}

impl JsonFormatter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Pretty-print with this many spaces per level
    #[must_use]
    pub fn indent(mut self, spaces: usize) -> Self {
        self.indent = Some(spaces);
        self
    }

    /// Emit keys in lexical order instead of insertion order
    #[must_use]
    pub fn sort_keys(mut self) -> Self {
        self.sort_keys = true;
        self
    }

    fn render(&self, value: &Value) -> String {
        match self.indent {
            None => safe_json(value, false),
            Some(spaces) => {
                let indent = " ".repeat(spaces);
                let mut out = Vec::new();
                let formatter = serde_json::ser::PrettyFormatter::with_indent(indent.as_bytes());
                let mut serializer = serde_json::Serializer::with_formatter(&mut out, formatter);
                match value.serialize(&mut serializer) {
                    Ok(()) => String::from_utf8(out).unwrap_or_default(),
                    Err(_) => safe_json(value, true),
                }
            }
        }
    }
}

fn sorted(value: Value) -> Value {
    match value {
        Value::Object(map) => {
            let mut entries: Vec<(String, Value)> = map.into_iter().collect();
            entries.sort_by(|a, b| a.0.cmp(&b.0));
            Value::Object(entries.into_iter().map(|(k, v)| (k, sorted(v))).collect())
        }
        Value::Array(items) => Value::Array(items.into_iter().map(sorted).collect()),
        other => other,
    }
}

impl Formatter for JsonFormatter {
    fn format(&self, record: &LogRecord) -> Option<LogRecord> {
        let mut value = record.to_json_value();
        if self.sort_keys {
            value = sorted(value);
        }
        Some(record.with_field(FORMATTED_KEY, self.render(&value)))
    }
}
