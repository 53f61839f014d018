//! # Structured Log Pipeline
//!
//! A structured logging library built around an immutable record pipeline:
//! level methods normalise their arguments into a [`LogRecord`], which is
//! redacted, serialized and handed to every handler of the logger tree. Each
//! handler gates it by level, runs its own formatter chain and emits it to a
//! destination, isolated from the failures of the others.
//!
//! ## Features
//!
//! - **Logger trees**: child loggers accumulate bound fields and share one
//!   handler collection
//! - **Formatter chains**: composable record transforms with drop semantics
//! - **Handlers**: console, file, HTTP and in-memory ring buffer
//! - **Failure isolation**: a failing handler, formatter, serializer or
//!   listener never breaks the log call
//! - **Panic capture**: uncaught panics routed to opted-in handlers
//!
//! ## Example
//!
//! ```
//! use structured_log_pipeline::prelude::*;
//! use serde_json::json;
//!
//! let logger = Logger::builder()
//!     .name("checkout")
//!     .level("debug")
//!     .handler(ConsoleHandler::with_colors(false))
//!     .build()
//!     .unwrap();
//!
//! logger.info((json!({"orderId": 42}), "order placed in %dms", 17));
//! ```

pub mod core;
pub mod formatters;
pub mod handlers;
pub mod macros;

pub mod prelude {
    #[cfg(feature = "console")]
    pub use crate::handlers::ConsoleHandler;
    #[cfg(feature = "file")]
    pub use crate::handlers::FileHandler;
    pub use crate::core::{
        ChildOptions, ErrorInfo, EventKind, ExceptionHandler, ExceptionKind, Handler,
        HandlerExt, HandlerOptions, LevelSpec, LogArg, LogArgs, LogLevel, LogRecord, Logger,
        LoggerBuilder, LoggerConfig, LoggerError, LoggerEvent, Redactor, Result, Serializers,
        TimestampFormat,
    };
    pub use crate::formatters::{combine, Formatter, JsonFormatter};
    pub use crate::handlers::{HttpHandler, RingBufferHandler};
}

pub use core::{
    ChildOptions, ErrorInfo, ExceptionHandler, Handler, HandlerOptions, LogArg, LogArgs,
    LogLevel, LogRecord, Logger, LoggerBuilder, LoggerError, Result, TimestampFormat,
};
