//! Logger event channel
//!
//! Observability hooks for the pipeline. Listener panics are caught and
//! discarded so a faulty listener can never break a log call.

use super::args::ErrorInfo;
use super::error::{diagnostic, panic_message};
use super::log_level::LevelValue;
use super::log_record::LogRecord;
use parking_lot::RwLock;
use std::fmt;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

/// Which global signal an exception record came from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ExceptionKind {
    /// A panic that reached the process hook
    Exception,
    /// A failed background task reported through
    /// [`ExceptionHandler::report_rejection`](super::exception_handler::ExceptionHandler::report_rejection)
    Rejection,
}

impl fmt::Display for ExceptionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ExceptionKind::Exception => write!(f, "exception"),
            ExceptionKind::Rejection => write!(f, "rejection"),
        }
    }
}

#[derive(Debug, Clone)]
pub enum LoggerEvent {
    /// A record was produced and is about to be dispatched
    Record(LogRecord),
    LevelChange {
        old_level: LevelValue,
        old_name: String,
        new_level: LevelValue,
        new_name: String,
    },
    HandlerError {
        handler: String,
        error: String,
        record: Option<LogRecord>,
    },
    Flush,
    Exception {
        error: ErrorInfo,
        record: LogRecord,
        kind: ExceptionKind,
    },
}

impl LoggerEvent {
    pub fn kind(&self) -> EventKind {
        match self {
            LoggerEvent::Record(_) => EventKind::Record,
            LoggerEvent::LevelChange { .. } => EventKind::LevelChange,
            LoggerEvent::HandlerError { .. } => EventKind::HandlerError,
            LoggerEvent::Flush => EventKind::Flush,
            LoggerEvent::Exception { .. } => EventKind::Exception,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EventKind {
    Record,
    LevelChange,
    HandlerError,
    Flush,
    Exception,
}

pub type Listener = Arc<dyn Fn(&LoggerEvent) + Send + Sync>;

/// Handle returned by [`EventChannel::on`], used to unsubscribe
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ListenerId(u64);

struct Subscription {
    id: ListenerId,
    kind: Option<EventKind>,
    listener: Listener,
}

/// Shared by every logger in one tree
#[derive(Default)]
pub struct EventChannel {
    listeners: RwLock<Vec<Subscription>>,
    next_id: AtomicU64,
}

impl EventChannel {
    pub fn new() -> Self {
        Self::default()
    }

    /// Subscribe to one kind of event, or all of them with `None`
    pub fn on<F>(&self, kind: Option<EventKind>, listener: F) -> ListenerId
    where
        F: Fn(&LoggerEvent) + Send + Sync + 'static,
    {
        let id = ListenerId(self.next_id.fetch_add(1, Ordering::Relaxed));
        self.listeners.write().push(Subscription {
            id,
            kind,
            listener: Arc::new(listener),
        });
        id
    }

    /// Returns whether the listener was registered
    pub fn off(&self, id: ListenerId) -> bool {
        let mut listeners = self.listeners.write();
        let before = listeners.len();
        listeners.retain(|s| s.id != id);
        listeners.len() != before
    }

    pub fn remove_all(&self) {
        self.listeners.write().clear();
    }

    pub fn listener_count(&self) -> usize {
        self.listeners.read().len()
    }

    pub fn has_listeners(&self, kind: EventKind) -> bool {
        self.listeners
            .read()
            .iter()
            .any(|s| s.kind.is_none() || s.kind == Some(kind))
    }

    /// Deliver to every matching listener; returns how many ran cleanly
    ///
    /// Listeners run outside the lock, so they may subscribe or log.
    pub fn emit(&self, event: &LoggerEvent) -> usize {
        let kind = event.kind();
        let targets: Vec<Listener> = self
            .listeners
            .read()
            .iter()
            .filter(|s| s.kind.is_none() || s.kind == Some(kind))
            .map(|s| Arc::clone(&s.listener))
            .collect();

        let mut delivered = 0;
        for listener in targets {
            match catch_unwind(AssertUnwindSafe(|| listener(event))) {
                Ok(()) => delivered += 1,
                Err(panic) => {
                    // A listener for handler errors failing is the end of the line.
                    if kind == EventKind::HandlerError {
                        diagnostic(
                            "ERROR",
                            format!("handler-error listener panicked: {}", panic_message(panic.as_ref())),
                        );
                    }
                }
            }
        }
        delivered
    }
}

impl fmt::Debug for EventChannel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EventChannel")
            .field("listeners", &self.listener_count())
            .finish()
    }
}
