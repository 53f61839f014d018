//! Error types for the logging pipeline
//!
//! Only configuration mistakes surface as `Err` to callers. Delivery failures
//! inside the pipeline are converted into events or diagnostics and never
//! reach the code that issued the log call.

pub type Result<T> = std::result::Result<T, LoggerError>;

#[derive(Debug, thiserror::Error)]
pub enum LoggerError {
    /// IO error with context
    #[error("IO error while {operation}: {message}")]
    IoOperation {
        operation: String,
        message: String,
        #[source]
        source: std::io::Error,
    },

    /// Generic IO error
    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    /// JSON serialization error
    #[error("JSON error: {0}")]
    JsonError(#[from] serde_json::Error),

    /// Level name or value that is not registered
    #[error("Unknown log level: '{0}'")]
    UnknownLevel(String),

    /// Bindings passed to `child()` / `set_bindings()` were not an object
    #[error("Bindings must be a JSON object, got {found}")]
    InvalidBindings { found: String },

    /// Invalid configuration with details
    #[error("Invalid configuration for {component}: {message}")]
    InvalidConfiguration { component: String, message: String },

    /// A handler failed to deliver a record
    #[error("Handler '{handler}' failed: {message}")]
    HandlerError { handler: String, message: String },

    /// Network transport failure
    #[error("Transport error for '{endpoint}': {message}")]
    TransportError { endpoint: String, message: String },

    /// Formatter error with format type
    #[error("Formatter error ({format_type}): {message}")]
    FormatterError {
        format_type: String,
        message: String,
    },

    /// Handler used after `close()`
    #[error("Handler '{0}' is closed")]
    HandlerClosed(String),

    /// Generic error
    #[error("{0}")]
    Other(String),
}

impl LoggerError {
    /// Create an IO operation error with context
    pub fn io_operation(
        operation: impl Into<String>,
        message: impl Into<String>,
        source: std::io::Error,
    ) -> Self {
        LoggerError::IoOperation {
            operation: operation.into(),
            message: message.into(),
            source,
        }
    }

    pub fn unknown_level(level: impl Into<String>) -> Self {
        LoggerError::UnknownLevel(level.into())
    }

    pub fn invalid_bindings(found: impl Into<String>) -> Self {
        LoggerError::InvalidBindings {
            found: found.into(),
        }
    }

    /// Create an invalid configuration error
    pub fn config(component: impl Into<String>, message: impl Into<String>) -> Self {
        LoggerError::InvalidConfiguration {
            component: component.into(),
            message: message.into(),
        }
    }

    pub fn handler(handler: impl Into<String>, message: impl Into<String>) -> Self {
        LoggerError::HandlerError {
            handler: handler.into(),
            message: message.into(),
        }
    }

    pub fn transport(endpoint: impl Into<String>, message: impl Into<String>) -> Self {
        LoggerError::TransportError {
            endpoint: endpoint.into(),
            message: message.into(),
        }
    }

    /// Create a formatter error
    pub fn formatter(format_type: impl Into<String>, message: impl Into<String>) -> Self {
        LoggerError::FormatterError {
            format_type: format_type.into(),
            message: message.into(),
        }
    }

    /// Create a generic error
    pub fn other<S: Into<String>>(msg: S) -> Self {
        LoggerError::Other(msg.into())
    }

    /// Whether this error is a setup mistake rather than a delivery failure
    pub fn is_configuration(&self) -> bool {
        matches!(
            self,
            LoggerError::UnknownLevel(_)
                | LoggerError::InvalidBindings { .. }
                | LoggerError::InvalidConfiguration { .. }
        )
    }
}

/// Extract a readable message from a caught panic payload
pub(crate) fn panic_message(payload: &(dyn std::any::Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        s.to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "Unknown panic".to_string()
    }
}

/// Last-resort diagnostic output, used when no event channel can take a failure
pub(crate) fn diagnostic(severity: &str, message: impl std::fmt::Display) {
    eprintln!("[LOGGER {}] {}", severity, message);
}
