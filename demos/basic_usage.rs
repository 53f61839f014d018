//! Basic logger usage example
//!
//! Demonstrates the three calling conventions, level gating and a JSON
//! formatter chain on the console handler.
//!
//! Run with: cargo run --example basic_usage

use serde_json::json;
use structured_log_pipeline::formatters::{LabelFormatter, TimestampFormatter};
use structured_log_pipeline::prelude::*;
use structured_log_pipeline::{combine, debug};

fn main() -> Result<()> {
    println!("=== Structured Log Pipeline - Basic Usage Example ===\n");

    let logger = Logger::builder()
        .name("app")
        .level(LogLevel::Trace)
        .handler(ConsoleHandler::new())
        .build()?;

    println!("1. Logging at different levels:");
    logger.trace("This is a trace message");
    logger.debug("This is a debug message");
    logger.info("This is an info message");
    logger.warn("This is a warning message");
    logger.error("This is an error message");
    logger.fatal("This is a fatal message");

    println!("\n2. Calling conventions:");
    logger.info(("listening on port %d", 8080));
    logger.info((json!({"requestId": "abc"}), "request completed in %dms", 42));
    let failure = std::io::Error::new(std::io::ErrorKind::Other, "disk full");
    logger.error(LogArg::error(&failure));

    println!("\n3. Raising the threshold to INFO - trace and debug won't show:");
    logger.set_level("info")?;
    logger.trace("Trace message (hidden)");
    debug!(logger, "Debug message (hidden, arguments not evaluated)");
    logger.info("Info message (visible)");

    println!("\n4. JSON output through a formatter chain:");
    let json_logger = Logger::builder()
        .name("api")
        .handler(ConsoleHandler::with_colors(false).with_options(
            HandlerOptions::new().formatter(combine![
                TimestampFormatter::new(),
                LabelFormatter::new("edge"),
                JsonFormatter::new(),
            ]),
        ))
        .build()?;
    json_logger.info((json!({"status": 200}), "GET /health"));

    println!("\n5. A custom level:");
    Logger::add_level("audit", 25, Some("blue"))?;
    logger.log_at("audit", "user ada signed in")?;

    logger.close();
    json_logger.close();

    println!("\n=== Example completed successfully! ===");

    Ok(())
}
