//! Handler trait for log output destinations
//!
//! A handler implements [`Handler::emit`] for its destination. The record
//! lifecycle around it (enable and level gates, formatting, error isolation)
//! is the [`HandlerExt::handle`] template method, which is blanket-implemented
//! and therefore cannot be overridden.

use super::error::{diagnostic, panic_message, Result};
use super::events::{EventChannel, LoggerEvent};
use super::log_level::{LevelSpec, LevelValue};
use super::log_record::LogRecord;
use super::metrics::Delivery;
use crate::formatters::Formatter;
use parking_lot::RwLock;
use std::fmt;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Weak};

/// Per-handler settings shared by every handler type
pub struct HandlerOptions {
    enabled: AtomicBool,
    level: RwLock<Option<LevelValue>>,
    formatter: RwLock<Option<Arc<dyn Formatter>>>,
    handle_exceptions: AtomicBool,
    handle_rejections: AtomicBool,
    events: RwLock<Weak<EventChannel>>,
}

impl HandlerOptions {
    pub fn new() -> Self {
        Self {
            enabled: AtomicBool::new(true),
            level: RwLock::new(None),
            formatter: RwLock::new(None),
            handle_exceptions: AtomicBool::new(false),
            handle_rejections: AtomicBool::new(false),
            events: RwLock::new(Weak::new()),
        }
    }

    /// Threshold for this handler; unset means every record the logger passes
    #[must_use]
    pub fn level(self, level: impl Into<LevelValue>) -> Self {
        *self.level.write() = Some(level.into());
        self
    }

    #[must_use]
    pub fn formatter(self, formatter: impl Formatter + 'static) -> Self {
        *self.formatter.write() = Some(Arc::new(formatter));
        self
    }

    #[must_use]
    pub fn shared_formatter(self, formatter: Arc<dyn Formatter>) -> Self {
        *self.formatter.write() = Some(formatter);
        self
    }

    #[must_use]
    pub fn enabled(self, enabled: bool) -> Self {
        self.set_enabled(enabled);
        self
    }

    /// Opt in to records produced from captured panics
    #[must_use]
    pub fn handle_exceptions(self, handle: bool) -> Self {
        self.handle_exceptions.store(handle, Ordering::Relaxed);
        self
    }

    /// Opt in to records produced from reported task failures
    #[must_use]
    pub fn handle_rejections(self, handle: bool) -> Self {
        self.handle_rejections.store(handle, Ordering::Relaxed);
        self
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled.load(Ordering::Relaxed)
    }

    pub fn set_enabled(&self, enabled: bool) {
        self.enabled.store(enabled, Ordering::Relaxed);
    }

    pub fn threshold(&self) -> Option<LevelValue> {
        *self.level.read()
    }

    /// Set or clear the handler threshold; unknown level names are rejected
    pub fn set_level(&self, level: Option<LevelSpec>) -> Result<()> {
        let resolved = level.map(|spec| spec.resolve()).transpose()?;
        *self.level.write() = resolved;
        Ok(())
    }

    pub fn current_formatter(&self) -> Option<Arc<dyn Formatter>> {
        self.formatter.read().clone()
    }

    pub fn set_formatter(&self, formatter: Option<Arc<dyn Formatter>>) {
        *self.formatter.write() = formatter;
    }

    pub fn handles_exceptions(&self) -> bool {
        self.handle_exceptions.load(Ordering::Relaxed)
    }

    pub fn handles_rejections(&self) -> bool {
        self.handle_rejections.load(Ordering::Relaxed)
    }

    pub fn set_handle_exceptions(&self, handle: bool) {
        self.handle_exceptions.store(handle, Ordering::Relaxed);
    }

    pub fn set_handle_rejections(&self, handle: bool) {
        self.handle_rejections.store(handle, Ordering::Relaxed);
    }

    /// Wire the error side channel; done by the handler manager on `add`
    pub(crate) fn attach(&self, events: &Arc<EventChannel>) {
        *self.events.write() = Arc::downgrade(events);
    }

    /// Report a failure on the owning logger's event channel
    ///
    /// Falls back to a direct diagnostic when no channel is attached or no
    /// listener accepted the event.
    pub fn report_error(&self, handler: &str, error: impl fmt::Display, record: Option<&LogRecord>) {
        let error = error.to_string();
        let channel = self.events.read().upgrade();
        let delivered = channel.map_or(0, |channel| {
            channel.emit(&LoggerEvent::HandlerError {
                handler: handler.to_string(),
                error: error.clone(),
                record: record.cloned(),
            })
        });
        if delivered == 0 {
            diagnostic("ERROR", format!("Handler '{}' failed: {}", handler, error));
        }
    }

    fn passes(&self, record: &LogRecord) -> bool {
        if !self.is_enabled() {
            return false;
        }
        match self.threshold() {
            Some(threshold) => record.level() <= threshold,
            None => true,
        }
    }
}

impl Default for HandlerOptions {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for HandlerOptions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HandlerOptions")
            .field("enabled", &self.is_enabled())
            .field("level", &self.threshold())
            .field("has_formatter", &self.formatter.read().is_some())
            .field("handle_exceptions", &self.handles_exceptions())
            .field("handle_rejections", &self.handles_rejections())
            .finish()
    }
}

/// A destination for log records
///
/// `emit` receives the record as produced by the logger and the record as
/// transformed by this handler's formatter (the same record when no
/// formatter is set). Neither may be mutated; records are immutable anyway.
pub trait Handler: Send + Sync {
    fn name(&self) -> &str;

    fn options(&self) -> &HandlerOptions;

    fn emit(&self, record: &LogRecord, formatted: &LogRecord) -> Result<()>;

    /// Force buffered output out
    fn flush(&self) -> Result<()> {
        Ok(())
    }

    /// Release resources; the handler is not used again afterwards
    fn close(&self) -> Result<()> {
        Ok(())
    }
}

/// Record lifecycle shared by all handlers
pub trait HandlerExt: Handler {
    /// Gate, format and emit one record. Never panics and never returns an error.
    fn handle(&self, record: &LogRecord) -> Delivery;
}

impl<H: Handler + ?Sized> HandlerExt for H {
    fn handle(&self, record: &LogRecord) -> Delivery {
        let options = self.options();
        if !options.passes(record) {
            return Delivery::Skipped;
        }

        let formatted = match options.current_formatter() {
            Some(formatter) => match catch_unwind(AssertUnwindSafe(|| formatter.format(record))) {
                Ok(Some(formatted)) => formatted,
                Ok(None) => return Delivery::Dropped,
                Err(panic) => {
                    options.report_error(
                        self.name(),
                        format!("formatter panicked: {}", panic_message(panic.as_ref())),
                        Some(record),
                    );
                    return Delivery::Failed;
                }
            },
            None => record.clone(),
        };

        match catch_unwind(AssertUnwindSafe(|| self.emit(record, &formatted))) {
            Ok(Ok(())) => Delivery::Emitted,
            Ok(Err(e)) => {
                options.report_error(self.name(), &e, Some(record));
                Delivery::Failed
            }
            Err(panic) => {
                options.report_error(
                    self.name(),
                    format!("emit panicked: {}", panic_message(panic.as_ref())),
                    Some(record),
                );
                Delivery::Failed
            }
        }
    }
}
