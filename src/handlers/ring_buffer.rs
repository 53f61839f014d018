//! In-memory handler keeping the most recent records

use crate::core::{Handler, HandlerOptions, LogRecord, LoggerError, Result};
use parking_lot::Mutex;
use std::collections::VecDeque;

/// Keeps the last `capacity` formatted records; older ones are evicted
///
/// Useful for attaching recent context to crash reports and for tests.
pub struct RingBufferHandler {
    name: String,
    options: HandlerOptions,
    capacity: usize,
    entries: Mutex<VecDeque<LogRecord>>,
}

impl RingBufferHandler {
    pub fn new(capacity: usize) -> Result<Self> {
        if capacity == 0 {
            return Err(LoggerError::config(
                "RingBufferHandler",
                "capacity must be at least 1",
            ));
        }
        Ok(Self {
            name: "ring-buffer".to_string(),
            options: HandlerOptions::new(),
            capacity,
            entries: Mutex::new(VecDeque::with_capacity(capacity)),
        })
    }

    #[must_use]
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    #[must_use]
    pub fn with_options(mut self, options: HandlerOptions) -> Self {
        self.options = options;
        self
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Oldest first
    pub fn records(&self) -> Vec<LogRecord> {
        self.entries.lock().iter().cloned().collect()
    }

    /// Messages of the stored records, oldest first
    pub fn messages(&self) -> Vec<String> {
        self.entries.lock().iter().map(|r| r.msg().to_string()).collect()
    }

    pub fn last(&self) -> Option<LogRecord> {
        self.entries.lock().back().cloned()
    }

    pub fn len(&self) -> usize {
        self.entries.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.lock().is_empty()
    }

    pub fn clear(&self) {
        self.entries.lock().clear();
    }
}

impl Handler for RingBufferHandler {
    fn name(&self) -> &str {
        &self.name
    }

    fn options(&self) -> &HandlerOptions {
        &self.options
    }

    fn emit(&self, _record: &LogRecord, formatted: &LogRecord) -> Result<()> {
        let mut entries = self.entries.lock();
        if entries.len() == self.capacity {
            entries.pop_front();
        }
        entries.push_back(formatted.clone());
        Ok(())
    }

    fn close(&self) -> Result<()> {
        self.clear();
        Ok(())
    }
}
