//! Console handler

use crate::core::{
    safe_json, sanitize_line, Handler, HandlerOptions, LevelValue, LogLevel, LogRecord, Result,
    TimestampFormat,
};
use colored::{Color, Colorize};
use serde_json::Value;
use std::io::Write;
use std::str::FromStr;

/// Destination severity a record level maps to
///
/// Trace shares the debug severity; it never produces a stack dump.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConsoleSeverity {
    Error,
    Warn,
    Info,
    Debug,
}

impl ConsoleSeverity {
    /// Map a numeric level, including custom levels, to a severity band
    pub fn from_level(level: LevelValue) -> Self {
        if level <= LogLevel::Error.value() {
            ConsoleSeverity::Error
        } else if level <= LogLevel::Warn.value() {
            ConsoleSeverity::Warn
        } else if level <= LogLevel::Info.value() {
            ConsoleSeverity::Info
        } else {
            ConsoleSeverity::Debug
        }
    }

    /// Error severity goes to stderr, everything else to stdout
    pub fn is_stderr(&self) -> bool {
        matches!(self, ConsoleSeverity::Error)
    }
}

pub struct ConsoleHandler {
    options: HandlerOptions,
    use_colors: bool,
    timestamp_format: TimestampFormat,
}

impl ConsoleHandler {
    pub fn new() -> Self {
        Self {
            options: HandlerOptions::new(),
            use_colors: true,
            timestamp_format: TimestampFormat::default(),
        }
    }

    pub fn with_colors(use_colors: bool) -> Self {
        Self {
            use_colors,
            ..Self::new()
        }
    }

    #[must_use]
    pub fn with_options(mut self, options: HandlerOptions) -> Self {
        self.options = options;
        self
    }

    /// Timestamp rendering for the default line layout
    ///
    /// ```
    /// use structured_log_pipeline::handlers::ConsoleHandler;
    /// use structured_log_pipeline::TimestampFormat;
    ///
    /// let handler = ConsoleHandler::new()
    ///     .with_timestamp_format(TimestampFormat::Iso8601Micros);
    /// ```
    #[must_use]
    pub fn with_timestamp_format(mut self, format: TimestampFormat) -> Self {
        self.timestamp_format = format;
        self
    }

    /// The line that would be written for this record, and where it goes
    ///
    /// A formatter-rendered `__formatted` string wins; otherwise the record
    /// is laid out as `[time] [LEVEL] name - msg {extras}`.
    pub fn render(&self, record: &LogRecord, formatted: &LogRecord) -> (ConsoleSeverity, String) {
        let severity = ConsoleSeverity::from_level(record.level());
        if let Some(line) = formatted.formatted() {
            return (severity, line.to_string());
        }
        (severity, self.format_text(formatted))
    }

    fn format_text(&self, record: &LogRecord) -> String {
        let level = format!("{:5}", record.level_name().to_uppercase());
        let level = match self.level_color(record) {
            Some(color) if self.use_colors => level.color(color).to_string(),
            _ => level,
        };

        let mut line = String::new();
        if let Some(millis) = record.time() {
            line.push_str(&format!("[{}] ", self.timestamp_format.format_millis(millis)));
        }
        line.push_str(&format!("[{}] ", level));
        if !record.name().is_empty() {
            line.push_str(&format!("{} - ", record.name()));
        }
        line.push_str(&sanitize_line(record.msg()));

        let extras: serde_json::Map<String, Value> = record
            .extra_fields()
            .map(|(k, v)| (k.clone(), v.clone()))
            .collect();
        if !extras.is_empty() {
            line.push(' ');
            line.push_str(&safe_json(&Value::Object(extras), false));
        }
        line
    }

    fn level_color(&self, record: &LogRecord) -> Option<Color> {
        let name = crate::core::registry::level_color(record.level_name())?;
        Color::from_str(&name).ok()
    }
}

impl Default for ConsoleHandler {
    fn default() -> Self {
        Self::new()
    }
}

impl Handler for ConsoleHandler {
    fn name(&self) -> &str {
        "console"
    }

    fn options(&self) -> &HandlerOptions {
        &self.options
    }

    fn emit(&self, record: &LogRecord, formatted: &LogRecord) -> Result<()> {
        let (severity, line) = self.render(record, formatted);
        if severity.is_stderr() {
            let mut stderr = std::io::stderr().lock();
            writeln!(stderr, "{}", line)?;
        } else {
            let mut stdout = std::io::stdout().lock();
            writeln!(stdout, "{}", line)?;
        }
        Ok(())
    }

    fn flush(&self) -> Result<()> {
        // Flush both since records are split across them
        std::io::stdout().flush()?;
        std::io::stderr().flush()?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::{BasePolicy, RecordOptions, TimestampPolicy};
    use crate::formatters::{Formatter, JsonFormatter};
    use serde_json::json;
    use std::sync::Arc;

    fn record(level: impl Into<LevelValue>, msg: &str) -> LogRecord {
        LogRecord::create(
            RecordOptions::new(level, msg)
                .name("api")
                .base(BasePolicy::Omit)
                .timestamp(TimestampPolicy::Custom(Arc::new(|| json!(0))))
                .fields(json!({"requestId": "abc"}).as_object().cloned().unwrap()),
        )
    }

    #[test]
    fn test_severity_mapping() {
        assert_eq!(ConsoleSeverity::from_level(LogLevel::Fatal.value()), ConsoleSeverity::Error);
        assert_eq!(ConsoleSeverity::from_level(LogLevel::Error.value()), ConsoleSeverity::Error);
        assert_eq!(ConsoleSeverity::from_level(LogLevel::Warn.value()), ConsoleSeverity::Warn);
        assert_eq!(ConsoleSeverity::from_level(LogLevel::Info.value()), ConsoleSeverity::Info);
        assert_eq!(ConsoleSeverity::from_level(LogLevel::Debug.value()), ConsoleSeverity::Debug);
        assert_eq!(ConsoleSeverity::from_level(LogLevel::Trace.value()), ConsoleSeverity::Debug);
        assert_eq!(ConsoleSeverity::from_level(25), ConsoleSeverity::Info);
        assert!(ConsoleSeverity::Error.is_stderr());
        assert!(!ConsoleSeverity::Warn.is_stderr());
    }

    #[test]
    fn test_default_layout() {
        let handler = ConsoleHandler::with_colors(false);
        let input = record(LogLevel::Info, "request\ncompleted");
        let (severity, line) = handler.render(&input, &input);
        assert_eq!(severity, ConsoleSeverity::Info);
        assert_eq!(
            line,
            r#"[1970-01-01T00:00:00.000Z] [INFO ] api - request\ncompleted {"requestId":"abc"}"#
        );
    }

    #[test]
    fn test_formatted_string_wins() {
        let handler = ConsoleHandler::with_colors(false);
        let input = record(LogLevel::Error, "boom");
        let formatted = JsonFormatter::new().format(&input).unwrap();
        let (severity, line) = handler.render(&input, &formatted);
        assert_eq!(severity, ConsoleSeverity::Error);
        assert!(line.starts_with("{\"level\":10"));
    }
}
