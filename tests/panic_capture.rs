//! Panic capture through the process panic hook
//!
//! A panic raised while the hook is running aborts the whole process, so
//! these scenarios run in a child copy of this test binary and the parent
//! only inspects its exit status and output.

use parking_lot::Mutex;
use std::process::Command;
use std::sync::Arc;
use std::thread;
use structured_log_pipeline::core::{BasePolicy, HandlerOptions};
use structured_log_pipeline::prelude::*;

const CHILD_ENV: &str = "STRUCTURED_LOG_PIPELINE_PANIC_CHILD";

/// Panics on every emit
struct Exploding {
    options: HandlerOptions,
}

impl Handler for Exploding {
    fn name(&self) -> &str {
        "exploding"
    }

    fn options(&self) -> &HandlerOptions {
        &self.options
    }

    fn emit(&self, _record: &LogRecord, _formatted: &LogRecord) -> Result<()> {
        panic!("handler exploded while logging a panic");
    }
}

/// Keeps the messages it saw
struct Collecting {
    options: HandlerOptions,
    seen: Mutex<Vec<String>>,
}

impl Handler for Collecting {
    fn name(&self) -> &str {
        "collecting"
    }

    fn options(&self) -> &HandlerOptions {
        &self.options
    }

    fn emit(&self, record: &LogRecord, _formatted: &LogRecord) -> Result<()> {
        self.seen.lock().push(record.msg().to_string());
        Ok(())
    }
}

/// Re-run one test of this binary in a child process and return its stdout
fn run_child(test_name: &str) -> String {
    let exe = std::env::current_exe().expect("test binary path");
    let output = Command::new(exe)
        .args([test_name, "--exact", "--nocapture", "--test-threads=1"])
        .env(CHILD_ENV, "1")
        .output()
        .expect("spawn child test process");
    let stdout = String::from_utf8_lossy(&output.stdout).into_owned();
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(
        output.status.success(),
        "child exited with {:?}\nstdout:\n{}\nstderr:\n{}",
        output.status,
        stdout,
        stderr
    );
    stdout
}

fn in_child() -> bool {
    std::env::var_os(CHILD_ENV).is_some()
}

#[test]
fn test_panicking_handler_does_not_abort_process() {
    if !in_child() {
        let stdout = run_child("test_panicking_handler_does_not_abort_process");
        assert!(stdout.contains("CAPTURED worker panicked"), "stdout:\n{}", stdout);
        assert!(stdout.contains("SURVIVED"), "stdout:\n{}", stdout);
        return;
    }

    let collecting = Arc::new(Collecting {
        options: HandlerOptions::new().handle_exceptions(true),
        seen: Mutex::new(Vec::new()),
    });
    let logger = Logger::builder()
        .name("panic_child")
        .base(BasePolicy::Omit)
        .handler(Exploding {
            options: HandlerOptions::new().handle_exceptions(true),
        })
        .shared_handler(collecting.clone())
        .build()
        .unwrap();
    let exceptions = ExceptionHandler::new(&logger);
    exceptions.register();

    let joined = thread::spawn(|| {
        panic!("worker panicked");
    })
    .join();
    assert!(joined.is_err());

    for message in collecting.seen.lock().iter() {
        println!("CAPTURED {}", message);
    }
    println!("SURVIVED");
}

#[test]
fn test_panicking_listener_does_not_abort_process() {
    if !in_child() {
        let stdout = run_child("test_panicking_listener_does_not_abort_process");
        assert!(stdout.contains("SURVIVED"), "stdout:\n{}", stdout);
        return;
    }

    let logger = Logger::builder()
        .name("listener_child")
        .base(BasePolicy::Omit)
        .build()
        .unwrap();
    logger.on(Some(EventKind::Exception), |_| {
        panic!("listener exploded");
    });
    let exceptions = ExceptionHandler::new(&logger);
    exceptions.register();

    for _ in 0..2 {
        let joined = thread::spawn(|| {
            panic!("worker panicked");
        })
        .join();
        assert!(joined.is_err());
    }
    println!("SURVIVED");
}
