//! ANSI colors for terminal output
//!
//! Colors come from the process-wide level palette (see
//! [`registry::set_level_color`](crate::core::registry::set_level_color)),
//! overridable per instance.

use super::Formatter;
use crate::core::{registry, LogRecord, COLOR_KEY, LEVEL_NAME_KEY};
use colored::Color;
use serde_json::Value;
use std::collections::HashMap;
use std::str::FromStr;

#[derive(Debug, Clone)]
pub struct ColorizeFormatter {
    level: bool,
    message: bool,
    overrides: HashMap<String, String>,
}

impl ColorizeFormatter {
    /// Colors the level name only
    pub fn new() -> Self {
        Self {
            level: true,
            message: false,
            overrides: HashMap::new(),
        }
    }

    /// Colors both the level name and the message
    pub fn all() -> Self {
        Self {
            message: true,
            ..Self::new()
        }
    }

    #[must_use]
    pub fn level(mut self, enabled: bool) -> Self {
        self.level = enabled;
        self
    }

    #[must_use]
    pub fn message(mut self, enabled: bool) -> Self {
        self.message = enabled;
        self
    }

    /// Use `color` for `level_name` in this instance only
    #[must_use]
    pub fn color(mut self, level_name: impl Into<String>, color: impl Into<String>) -> Self {
        self.overrides
            .insert(level_name.into().to_lowercase(), color.into());
        self
    }

    fn color_name(&self, level_name: &str) -> Option<String> {
        self.overrides
            .get(&level_name.to_lowercase())
            .cloned()
            .or_else(|| registry::level_color(level_name))
    }
}

impl Default for ColorizeFormatter {
    fn default() -> Self {
        Self::new()
    }
}

/// Wrap `text` in the escape sequence for `color`
pub(crate) fn paint(text: &str, color: Color) -> String {
    format!("\x1b[{}m{}\x1b[0m", color.to_fg_str(), text)
}

impl Formatter for ColorizeFormatter {
    fn format(&self, record: &LogRecord) -> Option<LogRecord> {
        let level_name = record.level_name().to_string();
        let Some(name) = self.color_name(&level_name) else {
            return Some(record.clone());
        };
        // Unknown palette entries leave the record uncolored.
        let Ok(color) = Color::from_str(&name) else {
            return Some(record.clone());
        };

        let message_key = record.keys().message.clone();
        let message = record.msg().to_string();
        Some(record.transform(|fields| {
            if self.level {
                fields.insert(LEVEL_NAME_KEY.to_string(), Value::String(paint(&level_name, color)));
            }
            if self.message {
                fields.insert(message_key, Value::String(paint(&message, color)));
            }
            fields.insert(COLOR_KEY.to_string(), Value::String(name));
        }))
    }
}
