//! Child logger example
//!
//! Demonstrates field inheritance, per-child overrides, handlers shared by a
//! whole tree, redaction and panic capture.
//!
//! Run with: cargo run --example child_loggers

use serde_json::json;
use std::sync::Arc;
use structured_log_pipeline::prelude::*;

fn main() -> Result<()> {
    println!("=== Structured Log Pipeline - Child Logger Example ===\n");

    let recent = Arc::new(RingBufferHandler::new(16)?);
    let root = Logger::builder()
        .name("service")
        .level(LogLevel::Debug)
        .redact(Redactor::new(["user.password"])?)
        .handler(ConsoleHandler::new())
        .shared_handler(recent.clone())
        .build()?;

    println!("1. Bindings accumulate down the tree:");
    let request = root.child(json!({"requestId": "r-17"}), ChildOptions::new())?;
    let db = request.child(
        json!({"component": "db"}),
        ChildOptions::new().name("service.db").msg_prefix("[db] "),
    )?;
    request.info("handling request");
    db.debug(("query took %dms", 12));
    println!("   db bindings: {}", json!(db.bindings()));

    println!("\n2. A child with its own threshold:");
    let quiet = root.child(json!({}), ChildOptions::new().level(LogLevel::Warn))?;
    quiet.info("hidden");
    quiet.warn("visible");

    println!("\n3. Redaction runs before any handler sees the record:");
    request.info((json!({"user": {"name": "ada", "password": "hunter2"}}), "login"));

    println!("\n4. A handler added to the root is seen by every child:");
    let late = Arc::new(RingBufferHandler::new(4)?.with_name("late"));
    root.add_shared_handler(late.clone());
    db.info("after the handler was added");
    println!("   late handler captured: {:?}", late.messages());

    println!("\n5. Panics reach handlers that opt in:");
    let crashes = Arc::new(
        RingBufferHandler::new(4)?
            .with_name("crashes")
            .with_options(HandlerOptions::new().handle_exceptions(true)),
    );
    root.add_shared_handler(crashes.clone());
    let exceptions = ExceptionHandler::new(&root);
    exceptions.register();
    let _ = std::thread::spawn(|| {
        panic!("worker exploded");
    })
    .join();
    exceptions.deregister();
    println!("   captured: {:?}", crashes.messages());

    println!("\n   ring buffer holds {} records", recent.len());
    root.close();

    println!("\n=== Example completed successfully! ===");

    Ok(())
}
