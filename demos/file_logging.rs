//! File logging example
//!
//! Demonstrates logging to a file and an HTTP collector alongside the
//! console, with a per-handler threshold and formatter.
//!
//! Run with: cargo run --example file_logging

use serde_json::json;
use structured_log_pipeline::formatters::LogfmtFormatter;
use structured_log_pipeline::prelude::*;

fn main() -> Result<()> {
    println!("=== Structured Log Pipeline - File Logging Example ===\n");

    let logger = Logger::builder()
        .name("app")
        .level(LogLevel::Debug)
        .handler(FileHandler::new("application.log")?)
        .handler(
            FileHandler::new("errors.log")?.with_options(
                HandlerOptions::new()
                    .level(LogLevel::Error)
                    .formatter(LogfmtFormatter::new()),
            ),
        )
        .build()?;

    #[cfg(feature = "console")]
    logger.add_handler(ConsoleHandler::new());

    println!("1. Logging to the files:");
    logger.info("Application started");
    logger.debug("Loading configuration...");
    logger.info((json!({"path": "/etc/app.toml"}), "Configuration loaded"));
    logger.warn("Using default settings for some options");
    logger.error("Failed to load optional plugin");

    println!("\n2. Multi-line input stays on one line:");
    logger.info("User login\nERROR forged entry");

    println!("\n3. Shipping to an HTTP collector (batched, optional):");
    if let Ok(url) = std::env::var("LOG_COLLECTOR_URL") {
        logger.add_handler(
            HttpHandler::new(&url)?
                .with_batch_size(10)
                .with_gzip(true)
                .with_options(HandlerOptions::new().formatter(JsonFormatter::new()))
                .background(1024)
                .build(),
        );
        logger.info("Shipped to the collector");
    } else {
        println!("   LOG_COLLECTOR_URL not set, skipping");
    }

    logger.close();

    println!("\nCheck 'application.log' and 'errors.log' for the output.");
    println!("\n=== Example completed successfully! ===");

    Ok(())
}
