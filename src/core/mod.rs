//! Core pipeline types and traits

pub mod args;
pub mod error;
pub mod events;
pub mod exception_handler;
pub mod handler;
pub mod handler_manager;
pub mod log_level;
pub mod log_record;
pub mod logger;
pub mod metrics;
pub mod redactor;
pub mod registry;
pub mod serializers;
pub mod structured_builder;
pub mod timestamp;

pub use args::{
    coerce_string, interpolate, is_error_like, safe_json, ErrorInfo, LogArg, LogArgs,
    NormalizedArgs,
};
pub(crate) use error::diagnostic;
pub use error::{LoggerError, Result};
pub use events::{EventChannel, EventKind, ExceptionKind, ListenerId, LoggerEvent};
pub use exception_handler::{CaptureOutcome, ExceptionHandler, SuppressFn};
pub use handler::{Handler, HandlerExt, HandlerOptions};
pub use handler_manager::{DispatchSummary, HandlerManager};
pub use log_level::{LevelSpec, LevelValue, LogLevel};
pub use log_record::{
    is_internal_key, sanitize_line, BasePolicy, Fields, LogRecord, RecordKeys, RecordOptions,
    TimestampFn, TimestampPolicy, COLOR_KEY, DEFAULT_ERROR_KEY, DEFAULT_MESSAGE_KEY,
    FORMATTED_KEY, INTERNAL_PREFIX, LEVEL_KEY, LEVEL_NAME_KEY, NAME_KEY, TIME_KEY,
};
pub use logger::{ChildOptions, Logger, LoggerBuilder, LoggerConfig};
pub use metrics::{Delivery, PipelineMetrics};
pub use redactor::{Censor, CensorFn, Redactor, DEFAULT_CENSOR};
pub use serializers::{err_serializer, SerializerFn, Serializers};
pub use structured_builder::StructuredLogBuilder;
pub use timestamp::{datetime_from_millis, TimestampFormat};
