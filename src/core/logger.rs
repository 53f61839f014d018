//! Logger: argument handling, child-logger inheritance and the write pipeline
//!
//! A [`Logger`] is a cheap handle (`Arc`) to one node of a logger tree. Every
//! node of a tree shares one [`HandlerManager`] and one [`EventChannel`], so a
//! handler added anywhere is live for every node, including children created
//! earlier. Field bindings, level, serializers, redaction and message prefix
//! are resolved when a child is created and never looked up lazily.
//!
//! # Example
//!
//! ```
//! use structured_log_pipeline::prelude::*;
//! use serde_json::json;
//! use std::sync::Arc;
//!
//! let buffer = Arc::new(RingBufferHandler::new(16).unwrap());
//! let logger = Logger::builder()
//!     .name("api")
//!     .shared_handler(buffer.clone())
//!     .build()
//!     .unwrap();
//!
//! let request = logger.child(json!({"requestId": "abc"}), ChildOptions::new()).unwrap();
//! request.info(("request completed in %dms", 42));
//!
//! let record = buffer.last().unwrap();
//! assert_eq!(record.msg(), "request completed in 42ms");
//! assert_eq!(record.get_str("requestId"), Some("abc"));
//! ```

use super::args::{ErrorInfo, LogArgs};
use super::error::{diagnostic, panic_message, LoggerError, Result};
use super::events::{EventChannel, EventKind, ListenerId, LoggerEvent};
use super::handler::Handler;
use super::handler_manager::{DispatchSummary, HandlerManager};
use super::log_level::{level_name, LevelSpec, LevelValue, LogLevel};
use super::log_record::{
    BasePolicy, Fields, LogRecord, RecordKeys, RecordOptions, TimestampPolicy, LEVEL_NAME_KEY,
};
use super::redactor::{Censor, Redactor};
use super::registry;
use super::serializers::Serializers;
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};
use std::sync::{Arc, Weak};

/// Own bindings plus the parent snapshot they were merged onto
#[derive(Debug, Clone, Default)]
struct Bindings {
    inherited: Fields,
    own: Fields,
    effective: Fields,
}

impl Bindings {
    fn new(inherited: Fields, own: Fields) -> Self {
        let mut effective = inherited.clone();
        effective.extend(own.iter().map(|(k, v)| (k.clone(), v.clone())));
        Self {
            inherited,
            own,
            effective,
        }
    }
}

/// Per-node settings; fixed once the node exists
#[derive(Clone)]
struct Settings {
    serializers: Serializers,
    redactor: Option<Redactor>,
    msg_prefix: String,
    base: BasePolicy,
    timestamp: TimestampPolicy,
    keys: RecordKeys,
}

struct LoggerInner {
    name: String,
    level: AtomicU32,
    enabled: AtomicBool,
    silent: AtomicBool,
    bindings: RwLock<Bindings>,
    settings: Settings,
    parent: Weak<LoggerInner>,
    handlers: Arc<HandlerManager>,
}

/// Handle to one node of a logger tree
#[derive(Clone)]
pub struct Logger {
    inner: Arc<LoggerInner>,
}

/// Overrides for [`Logger::child`]; anything left unset is inherited
#[derive(Debug, Clone, Default)]
pub struct ChildOptions {
    name: Option<String>,
    level: Option<LevelSpec>,
    serializers: Option<Serializers>,
    redactor: Option<Redactor>,
    msg_prefix: Option<String>,
}

impl ChildOptions {
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    #[must_use]
    pub fn level(mut self, level: impl Into<LevelSpec>) -> Self {
        self.level = Some(level.into());
        self
    }

    /// Added on top of the parent's serializers; same keys replace the parent's
    #[must_use]
    pub fn serializers(mut self, serializers: Serializers) -> Self {
        self.serializers = Some(serializers);
        self
    }

    /// Replaces the parent's redaction
    #[must_use]
    pub fn redact(mut self, redactor: Redactor) -> Self {
        self.redactor = Some(redactor);
        self
    }

    /// Replaces the parent's message prefix
    #[must_use]
    pub fn msg_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.msg_prefix = Some(prefix.into());
        self
    }
}

fn value_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

fn into_bindings(bindings: Value) -> Result<Fields> {
    match bindings {
        Value::Object(fields) => Ok(fields),
        other => Err(LoggerError::invalid_bindings(value_kind(&other))),
    }
}

impl Logger {
    /// Root logger named `name` at info level, with no handlers
    pub fn new(name: impl Into<String>) -> Self {
        LoggerBuilder::new().name(name).assemble(LogLevel::Info.value())
    }

    #[must_use]
    pub fn builder() -> LoggerBuilder {
        LoggerBuilder::new()
    }

    /// Process-wide logger named `name`, created with defaults on first use
    pub fn get(name: &str) -> Logger {
        let created = registry::logger_or_try_insert_with(name, || Ok(Logger::new(name)));
        created.unwrap_or_else(|_| Logger::new(name))
    }

    /// Process-wide logger named `name`, configured by `configure` on first use
    ///
    /// Later calls return the cached logger and never run `configure`, so the
    /// first registration's options win.
    pub fn get_with<F>(name: &str, configure: F) -> Result<Logger>
    where
        F: FnOnce(LoggerBuilder) -> LoggerBuilder,
    {
        registry::logger_or_try_insert_with(name, || {
            configure(LoggerBuilder::new().name(name)).build()
        })
    }

    /// Register a custom level for every logger, existing and future
    ///
    /// Levels are resolved by name at call time, so `log_at(name, ..)` works
    /// on loggers created before the registration. `color` goes into the
    /// shared palette used by the colorizing formatter and console handler.
    pub fn add_level(name: &str, value: LevelValue, color: Option<&str>) -> Result<()> {
        registry::register_level(name, value, color)
    }

    pub fn name(&self) -> &str {
        &self.inner.name
    }

    /// The logger this one was derived from, if it is still alive
    pub fn parent(&self) -> Option<Logger> {
        self.inner.parent.upgrade().map(|inner| Logger { inner })
    }

    // ---- levels ----

    pub fn level(&self) -> LevelValue {
        self.inner.level.load(Ordering::Acquire)
    }

    /// Name of the current threshold; empty for unregistered numbers
    pub fn level_name(&self) -> String {
        level_name(self.level()).unwrap_or_default()
    }

    /// Change the threshold, by name or number
    ///
    /// Unknown names are rejected. Setting the current level again is a
    /// no-op; otherwise a [`LoggerEvent::LevelChange`] is emitted.
    pub fn set_level(&self, level: impl Into<LevelSpec>) -> Result<()> {
        let new_level = level.into().resolve()?;
        let old_level = self.inner.level.swap(new_level, Ordering::AcqRel);
        if old_level == new_level {
            return Ok(());
        }
        self.events().emit(&LoggerEvent::LevelChange {
            old_level,
            old_name: level_name(old_level).unwrap_or_default(),
            new_level,
            new_name: level_name(new_level).unwrap_or_default(),
        });
        Ok(())
    }

    pub fn is_enabled(&self) -> bool {
        self.inner.enabled.load(Ordering::Acquire)
    }

    /// A disabled logger short-circuits every level method before the
    /// arguments are looked at
    pub fn set_enabled(&self, enabled: bool) {
        self.inner.enabled.store(enabled, Ordering::Release);
    }

    pub fn is_silent(&self) -> bool {
        self.inner.silent.load(Ordering::Acquire)
    }

    /// A silent logger still passes the level gate and normalises arguments
    /// but discards the record before it is built
    pub fn set_silent(&self, silent: bool) {
        self.inner.silent.store(silent, Ordering::Release);
    }

    /// Whether a record at `level` would get past this logger's gate
    #[inline]
    pub fn is_enabled_for(&self, level: impl Into<LevelValue>) -> bool {
        self.is_enabled() && level.into() <= self.level()
    }

    // ---- level methods ----

    pub fn fatal(&self, args: impl Into<LogArgs>) {
        self.log(LogLevel::Fatal, args);
    }

    pub fn error(&self, args: impl Into<LogArgs>) {
        self.log(LogLevel::Error, args);
    }

    pub fn warn(&self, args: impl Into<LogArgs>) {
        self.log(LogLevel::Warn, args);
    }

    pub fn info(&self, args: impl Into<LogArgs>) {
        self.log(LogLevel::Info, args);
    }

    pub fn debug(&self, args: impl Into<LogArgs>) {
        self.log(LogLevel::Debug, args);
    }

    pub fn trace(&self, args: impl Into<LogArgs>) {
        self.log(LogLevel::Trace, args);
    }

    /// Log at a numeric level, built-in or custom
    ///
    /// Accepts the three calling conventions: error first, fields first, or
    /// a printf-style format string first.
    pub fn log(&self, level: impl Into<LevelValue>, args: impl Into<LogArgs>) {
        let level = level.into();
        if !self.is_enabled_for(level) {
            return;
        }
        self.write(level, args.into());
    }

    /// Log at a level given by name, e.g. a custom level added with
    /// [`Logger::add_level`]
    pub fn log_at(&self, level: &str, args: impl Into<LogArgs>) -> Result<()> {
        let level = LevelSpec::from(level).resolve()?;
        self.log(level, args);
        Ok(())
    }

    // ---- bindings ----

    /// Effective fields: inherited bindings overlaid with this logger's own
    pub fn bindings(&self) -> Fields {
        self.inner.bindings.read().effective.clone()
    }

    pub fn own_bindings(&self) -> Fields {
        self.inner.bindings.read().own.clone()
    }

    /// Replace this logger's own bindings wholesale
    ///
    /// The effective fields are recomputed from the parent snapshot taken
    /// when this logger was created; the parent's current bindings are not
    /// consulted again.
    pub fn set_bindings(&self, bindings: impl Into<Value>) -> Result<()> {
        let own = into_bindings(bindings.into())?;
        let mut current = self.inner.bindings.write();
        *current = Bindings::new(std::mem::take(&mut current.inherited), own);
        Ok(())
    }

    /// Derive a child logger
    ///
    /// The child's fields are this logger's effective fields with `bindings`
    /// overlaid. The handler collection and event channel are shared, not
    /// copied.
    pub fn child(&self, bindings: impl Into<Value>, options: ChildOptions) -> Result<Logger> {
        let own = into_bindings(bindings.into())?;
        let level = match &options.level {
            Some(spec) => spec.resolve()?,
            None => self.level(),
        };

        let parent = &self.inner.settings;
        let settings = Settings {
            serializers: match &options.serializers {
                Some(extra) => parent.serializers.merged_with(extra),
                None => parent.serializers.clone(),
            },
            redactor: options.redactor.or_else(|| parent.redactor.clone()),
            msg_prefix: options.msg_prefix.unwrap_or_else(|| parent.msg_prefix.clone()),
            ..parent.clone()
        };

        let inner = LoggerInner {
            name: options.name.unwrap_or_else(|| self.inner.name.clone()),
            level: AtomicU32::new(level),
            enabled: AtomicBool::new(self.is_enabled()),
            silent: AtomicBool::new(self.is_silent()),
            bindings: RwLock::new(Bindings::new(self.bindings(), own)),
            settings,
            parent: Arc::downgrade(&self.inner),
            handlers: Arc::clone(&self.inner.handlers),
        };
        Ok(Logger {
            inner: Arc::new(inner),
        })
    }

    pub fn serializers(&self) -> &Serializers {
        &self.inner.settings.serializers
    }

    pub fn redactor(&self) -> Option<&Redactor> {
        self.inner.settings.redactor.as_ref()
    }

    pub fn msg_prefix(&self) -> &str {
        &self.inner.settings.msg_prefix
    }

    /// Field that receives error-first arguments
    pub fn error_key(&self) -> &str {
        &self.inner.settings.keys.error
    }

    // ---- handlers and events ----

    /// Add a handler to the tree's shared collection
    pub fn add_handler<H: Handler + 'static>(&self, handler: H) -> Arc<dyn Handler> {
        let handler: Arc<dyn Handler> = Arc::new(handler);
        self.add_shared_handler(Arc::clone(&handler));
        handler
    }

    pub fn add_shared_handler(&self, handler: Arc<dyn Handler>) {
        self.inner.handlers.add(handler);
    }

    pub fn remove_handler(&self, handler: &Arc<dyn Handler>) -> bool {
        self.inner.handlers.remove(handler)
    }

    pub fn remove_handlers_named(&self, name: &str) -> usize {
        self.inner.handlers.remove_by_name(name)
    }

    pub fn clear_handlers(&self) {
        self.inner.handlers.clear();
    }

    pub fn handlers(&self) -> Vec<Arc<dyn Handler>> {
        self.inner.handlers.handlers()
    }

    pub fn handler_manager(&self) -> &Arc<HandlerManager> {
        &self.inner.handlers
    }

    pub fn events(&self) -> &Arc<EventChannel> {
        self.inner.handlers.events()
    }

    /// Subscribe to events of `kind`, or to every event with `None`
    pub fn on<F>(&self, kind: Option<EventKind>, listener: F) -> ListenerId
    where
        F: Fn(&LoggerEvent) + Send + Sync + 'static,
    {
        self.events().on(kind, listener)
    }

    pub fn off(&self, id: ListenerId) -> bool {
        self.events().off(id)
    }

    /// Flush every handler in the tree, then emit [`LoggerEvent::Flush`]
    ///
    /// Each handler failure is reported on its own and does not stop the
    /// rest.
    pub fn flush(&self) {
        self.inner.handlers.flush_all();
        self.events().emit(&LoggerEvent::Flush);
    }

    /// Flush and close every handler, empty the collection and drop all
    /// event listeners
    ///
    /// The collection is shared by the whole tree: closing any node closes
    /// the handlers for its parent, siblings and children too. Call this on
    /// exactly one logger per tree.
    pub fn close(&self) {
        self.flush();
        self.inner.handlers.close_all();
        self.inner.handlers.clear();
        self.events().remove_all();
    }

    // ---- write pipeline ----

    fn write(&self, level: LevelValue, args: LogArgs) {
        let outcome = catch_unwind(AssertUnwindSafe(|| self.write_record(level, args)));
        if let Err(panic) = outcome {
            diagnostic(
                "ERROR",
                format!(
                    "Logger '{}' failed to write a record: {}",
                    self.name(),
                    panic_message(panic.as_ref())
                ),
            );
        }
    }

    fn write_record(&self, level: LevelValue, args: LogArgs) -> Option<DispatchSummary> {
        let normalized = args.normalize(&self.inner.settings.keys.error);
        if self.is_silent() {
            return None;
        }
        let record = self.build_record(level, normalized.msg, normalized.fields);
        if self.events().has_listeners(EventKind::Record) {
            self.events().emit(&LoggerEvent::Record(record.clone()));
        }
        Some(self.inner.handlers.dispatch(&record))
    }

    /// Build, name-patch, redact and serialize one record
    fn build_record(&self, level: LevelValue, msg: String, call_fields: Fields) -> LogRecord {
        let settings = &self.inner.settings;
        let msg = if settings.msg_prefix.is_empty() {
            msg
        } else {
            format!("{}{}", settings.msg_prefix, msg)
        };

        let mut fields = self.bindings();
        fields.extend(call_fields);

        let mut record = LogRecord::create(
            RecordOptions::new(level, msg)
                .name(self.inner.name.clone())
                .fields(fields)
                .base(settings.base.clone())
                .timestamp(settings.timestamp.clone())
                .keys(settings.keys.clone()),
        );
        if record.level_name().is_empty() {
            if let Some(name) = registry::level_name(level) {
                record = record.with_field(LEVEL_NAME_KEY, name);
            }
        }
        if let Some(redactor) = &settings.redactor {
            record = redactor.redact(&record);
        }
        settings.serializers.apply(&record)
    }

    /// Record describing a captured panic or failed task
    pub(crate) fn exception_record(&self, level: LogLevel, error: &ErrorInfo) -> LogRecord {
        let normalized = LogArgs::from(error.clone()).normalize(&self.inner.settings.keys.error);
        self.build_record(level.value(), normalized.msg, normalized.fields)
    }
}

impl fmt::Debug for Logger {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Logger")
            .field("name", &self.inner.name)
            .field("level", &self.level())
            .field("enabled", &self.is_enabled())
            .field("silent", &self.is_silent())
            .field("bindings", &self.inner.bindings.read().effective)
            .field("handlers", &self.inner.handlers)
            .finish()
    }
}

/// Builder for constructing a root [`Logger`] with a fluent API
///
/// # Example
/// ```
/// use structured_log_pipeline::prelude::*;
///
/// let logger = Logger::builder()
///     .name("billing")
///     .level("debug")
///     .msg_prefix("[billing] ")
///     .handler(RingBufferHandler::new(100).unwrap())
///     .build()
///     .unwrap();
/// assert_eq!(logger.level(), 40);
/// ```
pub struct LoggerBuilder {
    name: String,
    level: LevelSpec,
    enabled: bool,
    silent: bool,
    handlers: Vec<Arc<dyn Handler>>,
    bindings: Fields,
    serializers: Serializers,
    redactor: Option<Redactor>,
    msg_prefix: String,
    base: BasePolicy,
    timestamp: TimestampPolicy,
    keys: RecordKeys,
}

impl LoggerBuilder {
    /// Create a new builder with default values
    pub fn new() -> Self {
        Self {
            name: String::new(),
            level: LevelSpec::Value(LogLevel::Info.value()),
            enabled: true,
            silent: false,
            handlers: Vec::new(),
            bindings: Fields::new(),
            serializers: Serializers::std(),
            redactor: None,
            msg_prefix: String::new(),
            base: BasePolicy::Auto,
            timestamp: TimestampPolicy::Auto,
            keys: RecordKeys::default(),
        }
    }

    /// Start from a deserialized configuration
    pub fn from_config(config: LoggerConfig) -> Result<Self> {
        let mut builder = Self::new()
            .name(config.name)
            .level(config.level)
            .enabled(config.enabled)
            .silent(config.silent)
            .bindings(config.bindings)
            .timestamp(config.timestamp)
            .message_key(config.message_key)
            .error_key(config.error_key);

        if let Some(prefix) = config.msg_prefix {
            builder = builder.msg_prefix(prefix);
        }
        if let Some(nested) = config.nested_key {
            builder = builder.nested_key(nested);
        }
        builder = match (config.base_fields, config.include_base) {
            (Some(fields), _) => builder.base(BasePolicy::Custom(fields)),
            (None, true) => builder.base(BasePolicy::Auto),
            (None, false) => builder.base(BasePolicy::Omit),
        };
        if !config.std_serializers {
            builder = builder.serializers(Serializers::new());
        }
        if !config.redact.is_empty() {
            let mut redactor = Redactor::new(&config.redact)?;
            if config.redact_remove {
                redactor = redactor.remove();
            } else if let Some(censor) = config.censor {
                redactor = redactor.with_censor(Censor::Replace(censor));
            }
            builder = builder.redact(redactor);
        }
        Ok(builder)
    }

    #[must_use = "builder methods return a new value"]
    pub fn name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    /// Threshold by name or number; names are checked in [`build`](Self::build)
    #[must_use = "builder methods return a new value"]
    pub fn level(mut self, level: impl Into<LevelSpec>) -> Self {
        self.level = level.into();
        self
    }

    #[must_use = "builder methods return a new value"]
    pub fn enabled(mut self, enabled: bool) -> Self {
        self.enabled = enabled;
        self
    }

    #[must_use = "builder methods return a new value"]
    pub fn silent(mut self, silent: bool) -> Self {
        self.silent = silent;
        self
    }

    /// Add a handler
    #[must_use = "builder methods return a new value"]
    pub fn handler<H: Handler + 'static>(mut self, handler: H) -> Self {
        self.handlers.push(Arc::new(handler));
        self
    }

    /// Add a handler the caller keeps a reference to
    #[must_use = "builder methods return a new value"]
    pub fn shared_handler(mut self, handler: Arc<dyn Handler>) -> Self {
        self.handlers.push(handler);
        self
    }

    /// Fields bound to every record of the root logger
    #[must_use = "builder methods return a new value"]
    pub fn bindings(mut self, bindings: Fields) -> Self {
        self.bindings = bindings;
        self
    }

    /// Replace the serializer set (defaults to [`Serializers::std`])
    #[must_use = "builder methods return a new value"]
    pub fn serializers(mut self, serializers: Serializers) -> Self {
        self.serializers = serializers;
        self
    }

    #[must_use = "builder methods return a new value"]
    pub fn redact(mut self, redactor: Redactor) -> Self {
        self.redactor = Some(redactor);
        self
    }

    #[must_use = "builder methods return a new value"]
    pub fn msg_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.msg_prefix = prefix.into();
        self
    }

    #[must_use = "builder methods return a new value"]
    pub fn base(mut self, base: BasePolicy) -> Self {
        self.base = base;
        self
    }

    #[must_use = "builder methods return a new value"]
    pub fn timestamp(mut self, timestamp: impl Into<TimestampPolicy>) -> Self {
        self.timestamp = timestamp.into();
        self
    }

    #[must_use = "builder methods return a new value"]
    pub fn message_key(mut self, key: impl Into<String>) -> Self {
        self.keys.message = key.into();
        self
    }

    #[must_use = "builder methods return a new value"]
    pub fn error_key(mut self, key: impl Into<String>) -> Self {
        self.keys.error = key.into();
        self
    }

    /// Put call and binding fields under `key` instead of the top level
    #[must_use = "builder methods return a new value"]
    pub fn nested_key(mut self, key: impl Into<String>) -> Self {
        self.keys.nested = Some(key.into());
        self
    }

    /// Build the Logger
    ///
    /// Fails when the level name is not registered.
    pub fn build(self) -> Result<Logger> {
        let level = self.level.resolve()?;
        Ok(self.assemble(level))
    }

    fn assemble(self, level: LevelValue) -> Logger {
        let handlers = Arc::new(HandlerManager::new(Arc::new(EventChannel::new())));
        for handler in self.handlers {
            handlers.add(handler);
        }
        let inner = LoggerInner {
            name: self.name,
            level: AtomicU32::new(level),
            enabled: AtomicBool::new(self.enabled),
            silent: AtomicBool::new(self.silent),
            bindings: RwLock::new(Bindings::new(Fields::new(), self.bindings)),
            settings: Settings {
                serializers: self.serializers,
                redactor: self.redactor,
                msg_prefix: self.msg_prefix,
                base: self.base,
                timestamp: self.timestamp,
                keys: self.keys,
            },
            parent: Weak::new(),
            handlers,
        };
        Logger {
            inner: Arc::new(inner),
        }
    }
}

impl Default for LoggerBuilder {
    fn default() -> Self {
        Self::new()
    }
}

/// Serializable logger description
///
/// ```
/// use structured_log_pipeline::core::{LoggerBuilder, LoggerConfig};
///
/// let config = LoggerConfig::from_json(r#"{"name": "jobs", "level": "warn", "redact": ["password"]}"#).unwrap();
/// let logger = LoggerBuilder::from_config(config).unwrap().build().unwrap();
/// assert_eq!(logger.level(), 20);
/// ```
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct LoggerConfig {
    pub name: String,
    pub level: LevelSpec,
    pub enabled: bool,
    pub silent: bool,
    pub msg_prefix: Option<String>,
    pub bindings: Fields,
    /// Stamp `pid` and `hostname` on every record
    pub include_base: bool,
    /// Replaces the automatic base fields
    pub base_fields: Option<Fields>,
    pub timestamp: bool,
    pub message_key: String,
    pub error_key: String,
    pub nested_key: Option<String>,
    pub std_serializers: bool,
    pub redact: Vec<String>,
    /// Delete redacted keys instead of censoring them
    pub redact_remove: bool,
    pub censor: Option<Value>,
}

impl Default for LoggerConfig {
    fn default() -> Self {
        let keys = RecordKeys::default();
        Self {
            name: String::new(),
            level: LevelSpec::Value(LogLevel::Info.value()),
            enabled: true,
            silent: false,
            msg_prefix: None,
            bindings: Fields::new(),
            include_base: true,
            base_fields: None,
            timestamp: true,
            message_key: keys.message,
            error_key: keys.error,
            nested_key: None,
            std_serializers: true,
            redact: Vec::new(),
            redact_remove: false,
            censor: None,
        }
    }
}

impl LoggerConfig {
    pub fn from_json(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::{BasePolicy, HandlerOptions};
    use crate::handlers::RingBufferHandler;
    use parking_lot::Mutex;
    use serde_json::json;

    fn logger_with_buffer(level: LogLevel) -> (Logger, Arc<RingBufferHandler>) {
        let buffer = Arc::new(RingBufferHandler::new(64).unwrap());
        let logger = Logger::builder()
            .name("test")
            .level(level)
            .base(BasePolicy::Omit)
            .timestamp(false)
            .shared_handler(buffer.clone())
            .build()
            .unwrap();
        (logger, buffer)
    }

    #[test]
    fn test_level_gate() {
        let (logger, buffer) = logger_with_buffer(LogLevel::Info);
        logger.trace("t");
        logger.debug("d");
        logger.info("i");
        logger.warn("w");
        logger.error("e");
        logger.fatal("f");
        assert_eq!(buffer.messages(), vec!["i", "w", "e", "f"]);
        assert!(logger.is_enabled_for(LogLevel::Info));
        assert!(!logger.is_enabled_for(LogLevel::Debug));
    }

    #[test]
    fn test_disabled_and_silent() {
        let (logger, buffer) = logger_with_buffer(LogLevel::Info);
        logger.set_enabled(false);
        logger.info("dropped");
        assert!(!logger.is_enabled_for(LogLevel::Fatal));

        logger.set_enabled(true);
        logger.set_silent(true);
        logger.info("discarded");
        assert!(logger.is_enabled_for(LogLevel::Info));
        assert!(buffer.is_empty());

        logger.set_silent(false);
        logger.info("kept");
        assert_eq!(buffer.messages(), vec!["kept"]);
    }

    #[test]
    fn test_set_level_fires_event_once() {
        let (logger, _buffer) = logger_with_buffer(LogLevel::Info);
        let changes = Arc::new(Mutex::new(Vec::new()));
        let seen = changes.clone();
        logger.on(Some(EventKind::LevelChange), move |event| {
            if let LoggerEvent::LevelChange {
                old_name, new_name, ..
            } = event
            {
                seen.lock().push((old_name.clone(), new_name.clone()));
            }
        });

        logger.set_level("debug").unwrap();
        logger.set_level(LogLevel::Debug).unwrap();
        assert!(logger.set_level("loud").is_err());

        assert_eq!(logger.level(), 40);
        assert_eq!(logger.level_name(), "debug");
        assert_eq!(*changes.lock(), vec![("info".to_string(), "debug".to_string())]);
    }

    #[test]
    fn test_calling_conventions() {
        let (logger, buffer) = logger_with_buffer(LogLevel::Info);
        logger.info((json!({"requestId": "abc"}), "request completed in %dms", 42));
        logger.error(ErrorInfo::new("IoError", "disk full"));
        logger.warn(("%s of %d", "3", 5, "extra"));

        let records = buffer.records();
        assert_eq!(records[0].msg(), "request completed in 42ms");
        assert_eq!(records[0].get_str("requestId"), Some("abc"));
        assert_eq!(records[1].msg(), "disk full");
        assert_eq!(records[1].level(), LogLevel::Error.value());
        assert_eq!(records[1].get_path("err.message"), Some(&json!("disk full")));
        assert_eq!(records[2].msg(), "3 of 5");
    }

    #[test]
    fn test_call_fields_win_over_bindings() {
        let buffer = Arc::new(RingBufferHandler::new(4).unwrap());
        let logger = Logger::builder()
            .bindings(json!({"service": "api", "region": "eu"}).as_object().cloned().unwrap())
            .shared_handler(buffer.clone())
            .build()
            .unwrap();
        logger.info((json!({"region": "us"}), "hello"));

        let record = buffer.last().unwrap();
        assert_eq!(record.get_str("service"), Some("api"));
        assert_eq!(record.get_str("region"), Some("us"));
        assert!(record.get("pid").is_some());
        assert!(record.time().is_some());
    }

    #[test]
    fn test_child_inheritance() {
        let (parent, _buffer) = logger_with_buffer(LogLevel::Info);
        let child = parent.child(json!({"a": 1}), ChildOptions::new()).unwrap();
        let grandchild = child
            .child(json!({"b": 2}), ChildOptions::new().level("debug"))
            .unwrap();
        assert_eq!(Value::Object(grandchild.bindings()), json!({"a": 1, "b": 2}));
        assert_eq!(grandchild.level(), 40);
        assert_eq!(child.level(), 30);
        assert_eq!(grandchild.parent().unwrap().bindings(), child.bindings());

        let overriding = child.child(json!({"a": 3, "b": 2}), ChildOptions::new()).unwrap();
        assert_eq!(Value::Object(overriding.bindings()), json!({"a": 3, "b": 2}));
    }

    #[test]
    fn test_set_bindings_replaces_own_only() {
        let (parent, buffer) = logger_with_buffer(LogLevel::Info);
        let child = parent.child(json!({"a": 1, "b": 1}), ChildOptions::new()).unwrap();
        let grandchild = child.child(json!({"c": 1}), ChildOptions::new()).unwrap();

        grandchild.set_bindings(json!({"d": 4})).unwrap();
        assert_eq!(Value::Object(grandchild.bindings()), json!({"a": 1, "b": 1, "d": 4}));
        assert_eq!(Value::Object(grandchild.own_bindings()), json!({"d": 4}));

        // Parent changes after creation are not picked up
        child.set_bindings(json!({})).unwrap();
        grandchild.info("x");
        assert_eq!(buffer.last().unwrap().get("a"), Some(&json!(1)));
    }

    #[test]
    fn test_invalid_bindings_rejected() {
        let (logger, _buffer) = logger_with_buffer(LogLevel::Info);
        let err = logger.child(json!([1, 2]), ChildOptions::new()).err().unwrap();
        assert!(matches!(err, LoggerError::InvalidBindings { ref found } if found == "array"));
        assert!(logger.set_bindings(json!("nope")).is_err());
        assert!(logger.child(json!({}), ChildOptions::new().level("nope")).is_err());
    }

    #[test]
    fn test_handlers_shared_across_tree() {
        let (parent, _buffer) = logger_with_buffer(LogLevel::Info);
        let child = parent.child(json!({}), ChildOptions::new()).unwrap();

        let late = Arc::new(RingBufferHandler::new(4).unwrap().with_name("late"));
        parent.add_shared_handler(late.clone());
        child.info("from child");
        assert_eq!(late.messages(), vec!["from child"]);

        assert_eq!(child.remove_handlers_named("late"), 1);
        parent.info("after removal");
        assert_eq!(late.len(), 1);
    }

    #[test]
    fn test_prefix_redaction_and_child_serializers() {
        let buffer = Arc::new(RingBufferHandler::new(4).unwrap());
        let logger = Logger::builder()
            .msg_prefix("[svc] ")
            .redact(Redactor::new(["user.password"]).unwrap())
            .shared_handler(buffer.clone())
            .build()
            .unwrap();
        let child = logger
            .child(
                json!({}),
                ChildOptions::new().serializers(
                    Serializers::new().with("user", |v: &Value| Ok(json!({"id": v["id"], "password": v["password"]}))),
                ),
            )
            .unwrap();

        child.info((json!({"user": {"id": 7, "password": "hunter2"}}), "login"));
        let record = buffer.last().unwrap();
        assert_eq!(record.msg(), "[svc] login");
        assert_eq!(record.get_path("user.password"), Some(&json!("[REDACTED]")));
        assert_eq!(record.get_path("user.id"), Some(&json!(7)));
        assert!(child.serializers().keys().any(|k| k == "err"));
    }

    #[test]
    fn test_custom_level_name_patched() {
        Logger::add_level("logger_audit", 25, Some("blue")).unwrap();
        let (logger, buffer) = logger_with_buffer(LogLevel::Info);
        logger.log_at("logger_audit", "user login").unwrap();
        assert!(logger.log_at("logger_unknown", "x").is_err());

        let record = buffer.last().unwrap();
        assert_eq!(record.level(), 25);
        assert_eq!(record.level_name(), "logger_audit");
    }

    #[test]
    fn test_record_event_and_handler_error_event() {
        let (logger, _buffer) = logger_with_buffer(LogLevel::Info);
        let failing = crate::formatters::FnFormatter::new(|_: &LogRecord| -> Option<LogRecord> {
            panic!("formatter exploded")
        });
        logger.add_handler(
            RingBufferHandler::new(1)
                .unwrap()
                .with_name("broken")
                .with_options(HandlerOptions::new().formatter(failing)),
        );

        let events = Arc::new(Mutex::new(Vec::new()));
        let seen = events.clone();
        logger.on(None, move |event| seen.lock().push(event.kind()));

        logger.info("hello");
        assert_eq!(*events.lock(), vec![EventKind::Record, EventKind::HandlerError]);
    }

    #[test]
    fn test_close_empties_collection_and_listeners() {
        let (logger, buffer) = logger_with_buffer(LogLevel::Info);
        logger.on(None, |_| {});
        logger.info("before");
        logger.close();

        assert!(logger.handlers().is_empty());
        assert_eq!(logger.events().listener_count(), 0);
        assert!(buffer.is_empty());
        logger.info("after");
        assert!(buffer.is_empty());
    }

    #[test]
    fn test_named_registry_first_wins() {
        let first = Logger::get_with("logger_registry_test", |b| b.level("warn")).unwrap();
        let second = Logger::get_with("logger_registry_test", |b| b.level("trace")).unwrap();
        assert_eq!(second.level(), 20);
        first.set_level("error").unwrap();
        assert_eq!(Logger::get("logger_registry_test").level(), 10);
        assert!(registry::is_logger_registered("logger_registry_test"));
    }

    #[test]
    fn test_config_from_json() {
        let config = LoggerConfig::from_json(
            r#"{"name":"jobs","level":40,"includeBase":false,"redact":["token"],"redactRemove":true,"messageKey":"message"}"#,
        )
        .unwrap();
        let buffer = Arc::new(RingBufferHandler::new(2).unwrap());
        let logger = LoggerBuilder::from_config(config)
            .unwrap()
            .shared_handler(buffer.clone())
            .build()
            .unwrap();
        logger.debug((json!({"token": "s3cr3t"}), "ran"));

        let record = buffer.last().unwrap();
        assert_eq!(record.get_str("message"), Some("ran"));
        assert_eq!(record.name(), "jobs");
        assert!(record.get("token").is_none());
        assert!(record.get("pid").is_none());
    }
}
