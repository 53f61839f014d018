//! Level macros with lazy argument evaluation.
//!
//! The argument expressions are only evaluated once the logger's level gate
//! has passed, so a disabled `debug!` costs one comparison. Arguments follow
//! the same calling conventions as the level methods: an error first, a
//! field object first, or a printf-style format string first.
//!
//! # Examples
//!
//! ```
//! use structured_log_pipeline::prelude::*;
//! use structured_log_pipeline::{debug, info};
//! use serde_json::json;
//!
//! let logger = Logger::new("server");
//!
//! info!(logger, "Server started");
//! info!(logger, "Listening on port %d", 8080);
//! info!(logger, json!({"requestId": "abc"}), "request completed in %dms", 42);
//!
//! // Not evaluated: debug is below the default info threshold
//! debug!(logger, "state: %j", expensive_snapshot());
//! # fn expensive_snapshot() -> serde_json::Value { unreachable!() }
//! ```

/// Log at any level.
///
/// # Examples
///
/// ```
/// # use structured_log_pipeline::prelude::*;
/// # let logger = Logger::new("app");
/// use structured_log_pipeline::log;
/// log!(logger, LogLevel::Info, "Simple message");
/// log!(logger, LogLevel::Error, "Error code: %d", 500);
/// log!(logger, 25u32, "custom numeric level");
/// ```
#[macro_export]
macro_rules! log {
    ($logger:expr, $level:expr, $($arg:expr),+ $(,)?) => {{
        let logger = &$logger;
        let level = $crate::core::LevelValue::from($level);
        if logger.is_enabled_for(level) {
            logger.log(
                level,
                $crate::core::LogArgs(vec![$($crate::core::LogArg::from($arg)),+]),
            );
        }
    }};
}

/// Log a trace-level message.
#[macro_export]
macro_rules! trace {
    ($logger:expr, $($arg:expr),+ $(,)?) => {
        $crate::log!($logger, $crate::core::LogLevel::Trace, $($arg),+)
    };
}

/// Log a debug-level message.
#[macro_export]
macro_rules! debug {
    ($logger:expr, $($arg:expr),+ $(,)?) => {
        $crate::log!($logger, $crate::core::LogLevel::Debug, $($arg),+)
    };
}

/// Log an info-level message.
#[macro_export]
macro_rules! info {
    ($logger:expr, $($arg:expr),+ $(,)?) => {
        $crate::log!($logger, $crate::core::LogLevel::Info, $($arg),+)
    };
}

/// Log a warning-level message.
#[macro_export]
macro_rules! warn {
    ($logger:expr, $($arg:expr),+ $(,)?) => {
        $crate::log!($logger, $crate::core::LogLevel::Warn, $($arg),+)
    };
}

/// Log an error-level message.
///
/// # Examples
///
/// ```
/// # use structured_log_pipeline::prelude::*;
/// # let logger = Logger::new("db");
/// use structured_log_pipeline::error;
/// let failure = std::io::Error::new(std::io::ErrorKind::Other, "disk full");
/// error!(logger, LogArg::error(&failure));
/// error!(logger, LogArg::error(&failure), "write to %s failed", "/var/data");
/// ```
#[macro_export]
macro_rules! error {
    ($logger:expr, $($arg:expr),+ $(,)?) => {
        $crate::log!($logger, $crate::core::LogLevel::Error, $($arg),+)
    };
}

/// Log a fatal-level message.
#[macro_export]
macro_rules! fatal {
    ($logger:expr, $($arg:expr),+ $(,)?) => {
        $crate::log!($logger, $crate::core::LogLevel::Fatal, $($arg),+)
    };
}
