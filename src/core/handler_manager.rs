//! The handler collection shared by one logger tree

use super::error::{panic_message, Result};
use super::events::{EventChannel, ExceptionKind};
use super::handler::{Handler, HandlerExt};
use super::log_record::LogRecord;
use super::metrics::{Delivery, PipelineMetrics};
use parking_lot::RwLock;
use std::fmt;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::Arc;

/// Per-dispatch tally of handler outcomes
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DispatchSummary {
    pub emitted: usize,
    pub skipped: usize,
    pub dropped: usize,
    pub failed: usize,
}

impl DispatchSummary {
    fn count(&mut self, delivery: Delivery) {
        match delivery {
            Delivery::Emitted => self.emitted += 1,
            Delivery::Skipped => self.skipped += 1,
            Delivery::Dropped => self.dropped += 1,
            Delivery::Failed => self.failed += 1,
        }
    }
}

/// Owns the handlers of a logger tree and fans records out to them
///
/// Every logger created from the same root holds the same `Arc` of this
/// type, so mutations are visible tree-wide.
pub struct HandlerManager {
    handlers: RwLock<Vec<Arc<dyn Handler>>>,
    events: Arc<EventChannel>,
    metrics: PipelineMetrics,
}

impl HandlerManager {
    pub fn new(events: Arc<EventChannel>) -> Self {
        Self {
            handlers: RwLock::new(Vec::new()),
            events,
            metrics: PipelineMetrics::new(),
        }
    }

    /// Register a handler and wire its error side channel
    pub fn add(&self, handler: Arc<dyn Handler>) {
        handler.options().attach(&self.events);
        self.handlers.write().push(handler);
    }

    /// Remove one handler by identity; returns whether it was registered
    pub fn remove(&self, handler: &Arc<dyn Handler>) -> bool {
        let target = Arc::as_ptr(handler) as *const ();
        let mut handlers = self.handlers.write();
        let before = handlers.len();
        handlers.retain(|h| Arc::as_ptr(h) as *const () != target);
        handlers.len() != before
    }

    /// Remove every handler with this name; returns how many were removed
    pub fn remove_by_name(&self, name: &str) -> usize {
        let mut handlers = self.handlers.write();
        let before = handlers.len();
        handlers.retain(|h| h.name() != name);
        before - handlers.len()
    }

    pub fn clear(&self) {
        self.handlers.write().clear();
    }

    pub fn len(&self) -> usize {
        self.handlers.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.handlers.read().is_empty()
    }

    /// Snapshot of the current handlers
    pub fn handlers(&self) -> Vec<Arc<dyn Handler>> {
        self.handlers.read().clone()
    }

    pub fn metrics(&self) -> &PipelineMetrics {
        &self.metrics
    }

    pub fn events(&self) -> &Arc<EventChannel> {
        &self.events
    }

    /// Hand one record to every handler
    ///
    /// Handlers run against a snapshot taken before the first call, so a
    /// handler that logs or edits the collection cannot deadlock dispatch.
    pub fn dispatch(&self, record: &LogRecord) -> DispatchSummary {
        self.metrics.record_dispatched();
        let mut summary = DispatchSummary::default();
        for handler in self.handlers() {
            let delivery = handler.handle(record);
            self.metrics.record(delivery);
            summary.count(delivery);
        }
        summary
    }

    /// Deliver an exception record to the handlers that opted in to `kind`
    pub fn dispatch_exception(&self, record: &LogRecord, kind: ExceptionKind) -> DispatchSummary {
        self.metrics.record_dispatched();
        let mut summary = DispatchSummary::default();
        for handler in self.handlers() {
            let options = handler.options();
            let opted_in = match kind {
                ExceptionKind::Exception => options.handles_exceptions(),
                ExceptionKind::Rejection => options.handles_rejections(),
            };
            if !opted_in {
                continue;
            }
            let delivery = handler.handle(record);
            self.metrics.record(delivery);
            summary.count(delivery);
        }
        summary
    }

    /// Flush every handler; each failure is reported and does not stop the rest
    pub fn flush_all(&self) -> usize {
        self.each_handler("flush", |h| h.flush())
    }

    /// Close every handler; each failure is reported and does not stop the rest
    pub fn close_all(&self) -> usize {
        self.each_handler("close", |h| h.close())
    }

    fn each_handler(&self, operation: &str, call: impl Fn(&dyn Handler) -> Result<()>) -> usize {
        let mut failures = 0;
        for handler in self.handlers() {
            let outcome = catch_unwind(AssertUnwindSafe(|| call(handler.as_ref())));
            let error = match outcome {
                Ok(Ok(())) => continue,
                Ok(Err(e)) => e.to_string(),
                Err(panic) => format!("panicked: {}", panic_message(panic.as_ref())),
            };
            failures += 1;
            handler
                .options()
                .report_error(handler.name(), format!("{} failed: {}", operation, error), None);
        }
        failures
    }
}

impl fmt::Debug for HandlerManager {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let names: Vec<String> = self.handlers().iter().map(|h| h.name().to_string()).collect();
        f.debug_struct("HandlerManager")
            .field("handlers", &names)
            .field("metrics", &self.metrics)
            .finish()
    }
}
