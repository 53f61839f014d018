//! Structured log builder for fluent record construction

use super::args::{ErrorInfo, LogArg, LogArgs};
use super::log_level::{LevelValue, LogLevel};
use super::log_record::Fields;
use super::logger::Logger;
use serde_json::Value;

/// Builder for one structured log call
///
/// An alternative to tuple arguments when fields are assembled piecemeal.
///
/// # Example
///
/// ```
/// use structured_log_pipeline::prelude::*;
///
/// let logger = Logger::new("api");
///
/// logger.info_builder()
///     .message("Request processed")
///     .field("user_id", 12345)
///     .field("latency_ms", 42.5)
///     .field("status", 200)
///     .log();
/// ```
#[must_use = "call .log() to emit the record"]
pub struct StructuredLogBuilder<'a> {
    logger: &'a Logger,
    level: LevelValue,
    message: String,
    fields: Fields,
}

impl<'a> StructuredLogBuilder<'a> {
    pub fn new(logger: &'a Logger, level: impl Into<LevelValue>) -> Self {
        Self {
            logger,
            level: level.into(),
            message: String::new(),
            fields: Fields::new(),
        }
    }

    /// Set the log message
    pub fn message(mut self, msg: impl Into<String>) -> Self {
        self.message = msg.into();
        self
    }

    /// Add a structured field
    pub fn field(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.fields.insert(key.into(), value.into());
        self
    }

    /// Add every field of `fields`, replacing keys already set
    pub fn fields(mut self, fields: Fields) -> Self {
        self.fields.extend(fields);
        self
    }

    /// Attach an error under the logger's error key
    pub fn error<E: std::error::Error + ?Sized>(self, error: &E) -> Self {
        let value = ErrorInfo::from_error(error).to_value();
        let key = self.logger.error_key().to_string();
        self.field(key, value)
    }

    /// Emit the record; does nothing when the level is disabled
    pub fn log(self) {
        if !self.logger.is_enabled_for(self.level) {
            return;
        }
        let args = LogArgs(vec![
            LogArg::Value(Value::Object(self.fields)),
            LogArg::Str(self.message),
        ]);
        self.logger.log(self.level, args);
    }
}

impl Logger {
    pub fn trace_builder(&self) -> StructuredLogBuilder<'_> {
        StructuredLogBuilder::new(self, LogLevel::Trace)
    }

    pub fn debug_builder(&self) -> StructuredLogBuilder<'_> {
        StructuredLogBuilder::new(self, LogLevel::Debug)
    }

    pub fn info_builder(&self) -> StructuredLogBuilder<'_> {
        StructuredLogBuilder::new(self, LogLevel::Info)
    }

    pub fn warn_builder(&self) -> StructuredLogBuilder<'_> {
        StructuredLogBuilder::new(self, LogLevel::Warn)
    }

    pub fn error_builder(&self) -> StructuredLogBuilder<'_> {
        StructuredLogBuilder::new(self, LogLevel::Error)
    }

    pub fn fatal_builder(&self) -> StructuredLogBuilder<'_> {
        StructuredLogBuilder::new(self, LogLevel::Fatal)
    }
}
