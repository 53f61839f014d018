//! Capture of panics and failed background tasks
//!
//! Uncaught exceptions are panics that reach the process panic hook.
//! Unhandled rejections are failures of detached work (a task whose join
//! handle reported an error, a worker thread that died) and are handed in
//! explicitly through [`ExceptionHandler::report_rejection`].
//!
//! One process-wide hook is installed on the first registration and chains
//! to whatever hook was set before it. Registrations are held weakly, so
//! dropping an [`ExceptionHandler`] also stops its capture.
//!
//! A panic inside a panic hook aborts the process, so the hook itself only
//! describes the panic. The record is built and dispatched on a dedicated
//! capture thread, where handler and formatter panics unwind normally, and
//! the hook waits a bounded time for that thread to finish.

use super::args::ErrorInfo;
use super::error::{diagnostic, panic_message};
use super::events::{ExceptionKind, LoggerEvent};
use super::handler_manager::DispatchSummary;
use super::log_level::LogLevel;
use super::logger::Logger;
use crossbeam_channel::{bounded, unbounded, Receiver, Sender};
use parking_lot::{Mutex, RwLock};
use std::any::Any;
use std::cell::Cell;
use std::fmt;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::{Arc, OnceLock, Weak};
use std::thread;
use std::time::Duration;

/// How long a panicking thread waits for its capture to be dispatched
const CAPTURE_TIMEOUT: Duration = Duration::from_secs(2);

thread_local! {
    static DISPATCHING: Cell<bool> = const { Cell::new(false) };
}

/// Decides whether a captured failure is ignored entirely
///
/// Returning `true` skips logging and, for panics, the previously installed
/// hook (the default "thread panicked" report).
pub type SuppressFn = Arc<dyn Fn(&ErrorInfo, ExceptionKind) -> bool + Send + Sync>;

/// What happened to one captured failure
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CaptureOutcome {
    /// Delivered to the opted-in handlers
    Dispatched(DispatchSummary),
    /// The suppression callback claimed it
    Suppressed,
    /// Raised on a thread that was already dispatching a capture; printed
    /// as a diagnostic
    Reentrant,
}

struct ExceptionInner {
    logger: Logger,
    suppress: RwLock<Option<SuppressFn>>,
}

#[derive(Default)]
struct HookState {
    installed: bool,
    registrations: Vec<Weak<ExceptionInner>>,
}

/// A panic described by the hook, waiting for the capture thread
struct CaptureRequest {
    error: ErrorInfo,
    suppressed: Sender<bool>,
}

fn hook_state() -> &'static Mutex<HookState> {
    static STATE: OnceLock<Mutex<HookState>> = OnceLock::new();
    STATE.get_or_init(|| Mutex::new(HookState::default()))
}

fn live_registrations() -> Vec<Arc<ExceptionInner>> {
    let mut state = hook_state().lock();
    state.registrations.retain(|weak| weak.strong_count() > 0);
    state.registrations.iter().filter_map(Weak::upgrade).collect()
}

fn install_hook(state: &mut HookState) {
    if state.installed {
        return;
    }
    state.installed = true;

    let requests = spawn_capture_thread();
    let previous = std::panic::take_hook();
    std::panic::set_hook(Box::new(move |info| {
        let message = panic_message(info.payload());
        if DISPATCHING.with(Cell::get) {
            diagnostic(
                "CRITICAL",
                format!("panic raised while handling another: {}", message),
            );
            return;
        }

        let location = info
            .location()
            .map(|l| format!("{}:{}:{}", l.file(), l.line(), l.column()))
            .unwrap_or_else(|| "<unknown>".to_string());
        let thread = thread::current();
        let error = ErrorInfo::new("panic", message.clone()).with_stack(format!(
            "thread '{}' panicked at {}:\n{}",
            thread.name().unwrap_or("<unnamed>"),
            location,
            message
        ));

        let suppressed = match &requests {
            Some(requests) if has_registrations() => forward_to_capture_thread(requests, error),
            _ => false,
        };
        if !suppressed {
            previous(info);
        }
    }));
}

fn has_registrations() -> bool {
    !live_registrations().is_empty()
}

fn spawn_capture_thread() -> Option<Sender<CaptureRequest>> {
    let (requests, receiver) = unbounded();
    let spawned = thread::Builder::new()
        .name("panic-capture".to_string())
        .spawn(move || run_capture_thread(receiver));
    match spawned {
        Ok(_) => Some(requests),
        Err(e) => {
            diagnostic("ERROR", format!("Failed to start the panic capture thread: {}", e));
            None
        }
    }
}

fn run_capture_thread(requests: Receiver<CaptureRequest>) {
    for request in requests {
        let mut suppressed = false;
        for registration in live_registrations() {
            let outcome = catch_unwind(AssertUnwindSafe(|| {
                registration.capture(&request.error, ExceptionKind::Exception)
            }));
            match outcome {
                Ok(CaptureOutcome::Suppressed) => suppressed = true,
                Ok(_) => {}
                Err(panic) => diagnostic(
                    "ERROR",
                    format!("Panic capture failed: {}", panic_message(panic.as_ref())),
                ),
            }
        }
        let _ = request.suppressed.send(suppressed);
    }
}

/// Hand a panic to the capture thread; returns whether it was suppressed
fn forward_to_capture_thread(requests: &Sender<CaptureRequest>, error: ErrorInfo) -> bool {
    let (suppressed, done) = bounded(1);
    if requests.send(CaptureRequest { error, suppressed }).is_err() {
        diagnostic("ERROR", "Panic capture thread is gone; panic not logged");
        return false;
    }
    match done.recv_timeout(CAPTURE_TIMEOUT) {
        Ok(suppressed) => suppressed,
        Err(_) => {
            diagnostic(
                "WARN",
                format!(
                    "Panic capture still running after {:?}; continuing without waiting",
                    CAPTURE_TIMEOUT
                ),
            );
            false
        }
    }
}

/// Routes panics and task failures to a logger's opted-in handlers
///
/// Only handlers built with `handle_exceptions(true)` (panics) or
/// `handle_rejections(true)` (reported task failures) receive these records.
/// Panics are logged at fatal level, rejections at error level.
///
/// A capture that starts on a thread which is already dispatching one (a
/// listener reporting a failure, a handler panicking) is not logged; it is
/// printed as a `[LOGGER CRITICAL]` diagnostic instead. Captures on other
/// threads proceed independently.
#[derive(Clone)]
pub struct ExceptionHandler {
    inner: Arc<ExceptionInner>,
}

impl ExceptionHandler {
    pub fn new(logger: &Logger) -> Self {
        Self {
            inner: Arc::new(ExceptionInner {
                logger: logger.clone(),
                suppress: RwLock::new(None),
            }),
        }
    }

    #[must_use]
    pub fn with_suppression<F>(self, suppress: F) -> Self
    where
        F: Fn(&ErrorInfo, ExceptionKind) -> bool + Send + Sync + 'static,
    {
        self.set_suppression(Some(Arc::new(suppress)));
        self
    }

    pub fn set_suppression(&self, suppress: Option<SuppressFn>) {
        *self.inner.suppress.write() = suppress;
    }

    /// Start capturing panics; returns `false` if already registered
    pub fn register(&self) -> bool {
        let mut state = hook_state().lock();
        if self.position(&state).is_some() {
            return false;
        }
        state.registrations.push(Arc::downgrade(&self.inner));
        install_hook(&mut state);
        true
    }

    /// Stop capturing; returns `false` if not registered
    ///
    /// The process hook stays installed and keeps delegating to the hook it
    /// replaced.
    pub fn deregister(&self) -> bool {
        let mut state = hook_state().lock();
        match self.position(&state) {
            Some(index) => {
                state.registrations.remove(index);
                true
            }
            None => false,
        }
    }

    pub fn is_registered(&self) -> bool {
        self.position(&hook_state().lock()).is_some()
    }

    fn position(&self, state: &HookState) -> Option<usize> {
        let me = Arc::as_ptr(&self.inner);
        state
            .registrations
            .iter()
            .position(|weak| std::ptr::eq(weak.as_ptr(), me))
    }

    /// Report a failed background task
    pub fn report_rejection(&self, error: &ErrorInfo) -> CaptureOutcome {
        self.inner.capture(error, ExceptionKind::Rejection)
    }

    /// Report a panic payload recovered with `catch_unwind` or a join handle
    pub fn report_panic(&self, payload: &(dyn Any + Send)) -> CaptureOutcome {
        let error = ErrorInfo::new("panic", panic_message(payload));
        self.inner.capture(&error, ExceptionKind::Exception)
    }

    pub fn capture(&self, error: &ErrorInfo, kind: ExceptionKind) -> CaptureOutcome {
        self.inner.capture(error, kind)
    }
}

/// Marks the current thread as dispatching a capture
struct DispatchGuard;

impl DispatchGuard {
    fn enter() -> Option<Self> {
        if DISPATCHING.with(|flag| flag.replace(true)) {
            None
        } else {
            Some(DispatchGuard)
        }
    }
}

impl Drop for DispatchGuard {
    fn drop(&mut self) {
        DISPATCHING.with(|flag| flag.set(false));
    }
}

impl ExceptionInner {
    fn capture(&self, error: &ErrorInfo, kind: ExceptionKind) -> CaptureOutcome {
        let Some(_guard) = DispatchGuard::enter() else {
            diagnostic(
                "CRITICAL",
                format!("{} raised while handling another: {}", kind, error.message),
            );
            return CaptureOutcome::Reentrant;
        };

        if self.is_suppressed(error, kind) {
            return CaptureOutcome::Suppressed;
        }

        let level = match kind {
            ExceptionKind::Exception => LogLevel::Fatal,
            ExceptionKind::Rejection => LogLevel::Error,
        };
        let record = self.logger.exception_record(level, error);
        let summary = self
            .logger
            .handler_manager()
            .dispatch_exception(&record, kind);
        self.logger.events().emit(&LoggerEvent::Exception {
            error: error.clone(),
            record,
            kind,
        });
        CaptureOutcome::Dispatched(summary)
    }

    fn is_suppressed(&self, error: &ErrorInfo, kind: ExceptionKind) -> bool {
        let Some(suppress) = self.suppress.read().clone() else {
            return false;
        };
        match catch_unwind(AssertUnwindSafe(|| suppress(error, kind))) {
            Ok(suppressed) => suppressed,
            Err(panic) => {
                diagnostic(
                    "ERROR",
                    format!("Suppression callback failed: {}", panic_message(panic.as_ref())),
                );
                false
            }
        }
    }
}

impl fmt::Debug for ExceptionHandler {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ExceptionHandler")
            .field("logger", &self.inner.logger.name())
            .field("registered", &self.is_registered())
            .field("has_suppression", &self.inner.suppress.read().is_some())
            .finish()
    }
}
