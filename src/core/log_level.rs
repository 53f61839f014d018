//! Log level definitions
//!
//! Severity is numeric and ordered so that lower values are more severe.
//! A record passes a threshold when `record.level <= threshold`.

use super::error::{LoggerError, Result};
use super::registry;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Numeric severity carried by every record
pub type LevelValue = u32;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[derive(Default)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    Fatal = 0,
    Error = 10,
    Warn = 20,
    #[default]
    Info = 30,
    Debug = 40,
    Trace = 50,
}

impl LogLevel {
    pub const ALL: [LogLevel; 6] = [
        LogLevel::Fatal,
        LogLevel::Error,
        LogLevel::Warn,
        LogLevel::Info,
        LogLevel::Debug,
        LogLevel::Trace,
    ];

    pub fn to_str(&self) -> &'static str {
        match self {
            LogLevel::Fatal => "fatal",
            LogLevel::Error => "error",
            LogLevel::Warn => "warn",
            LogLevel::Info => "info",
            LogLevel::Debug => "debug",
            LogLevel::Trace => "trace",
        }
    }

    #[inline]
    pub fn value(&self) -> LevelValue {
        *self as LevelValue
    }

    /// Static name lookup; custom levels are not known here
    pub fn name_of(value: LevelValue) -> Option<&'static str> {
        Self::from_value(value).map(|level| level.to_str())
    }

    pub fn from_value(value: LevelValue) -> Option<Self> {
        Self::ALL.into_iter().find(|level| level.value() == value)
    }

    /// Default display color used by the colorizing formatter
    pub fn default_color(&self) -> &'static str {
        match self {
            LogLevel::Fatal => "bright red",
            LogLevel::Error => "red",
            LogLevel::Warn => "yellow",
            LogLevel::Info => "green",
            LogLevel::Debug => "blue",
            LogLevel::Trace => "bright black",
        }
    }
}

impl fmt::Display for LogLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_str())
    }
}

impl FromStr for LogLevel {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "fatal" => Ok(LogLevel::Fatal),
            "error" => Ok(LogLevel::Error),
            "warn" | "warning" => Ok(LogLevel::Warn),
            "info" => Ok(LogLevel::Info),
            "debug" => Ok(LogLevel::Debug),
            "trace" => Ok(LogLevel::Trace),
            _ => Err(format!("Invalid log level: '{}'", s)),
        }
    }
}

impl From<LogLevel> for LevelValue {
    fn from(level: LogLevel) -> Self {
        level.value()
    }
}

/// A level given either by name or by number, resolved against the registry
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum LevelSpec {
    Name(String),
    Value(LevelValue),
}

impl LevelSpec {
    /// Resolve to a numeric threshold
    ///
    /// Names are looked up case-insensitively among built-in and custom
    /// levels. Numbers are accepted as-is.
    pub fn resolve(&self) -> Result<LevelValue> {
        match self {
            LevelSpec::Value(value) => Ok(*value),
            LevelSpec::Name(name) => {
                registry::level_value(name).ok_or_else(|| LoggerError::unknown_level(name.clone()))
            }
        }
    }
}

impl From<LogLevel> for LevelSpec {
    fn from(level: LogLevel) -> Self {
        LevelSpec::Value(level.value())
    }
}

impl From<LevelValue> for LevelSpec {
    fn from(value: LevelValue) -> Self {
        LevelSpec::Value(value)
    }
}

impl From<&str> for LevelSpec {
    fn from(name: &str) -> Self {
        LevelSpec::Name(name.to_string())
    }
}

impl From<String> for LevelSpec {
    fn from(name: String) -> Self {
        LevelSpec::Name(name)
    }
}

/// Display name for a numeric level, consulting custom registrations
pub fn level_name(value: LevelValue) -> Option<String> {
    LogLevel::name_of(value)
        .map(str::to_string)
        .or_else(|| registry::level_name(value))
}
