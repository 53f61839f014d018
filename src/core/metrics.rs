//! Dispatch metrics for observability
//!
//! Counts what happened to records after they reached the handler
//! collection: delivered, skipped by a gate, dropped by a formatter, or lost
//! to a handler failure.

use std::sync::atomic::{AtomicU64, Ordering};

/// Outcome of one handler processing one record
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Delivery {
    /// `emit` ran and succeeded
    Emitted,
    /// Handler disabled or record below the handler threshold
    Skipped,
    /// The formatter chain returned a drop
    Dropped,
    /// Formatter or `emit` failed; the error was reported
    Failed,
}

/// Counters shared by one handler collection
///
/// # Example
///
/// ```
/// use structured_log_pipeline::core::{Delivery, PipelineMetrics};
///
/// let metrics = PipelineMetrics::new();
/// metrics.record(Delivery::Emitted);
/// metrics.record(Delivery::Failed);
///
/// assert_eq!(metrics.emitted_count(), 1);
/// assert_eq!(metrics.failed_count(), 1);
/// ```
#[derive(Debug)]
pub struct PipelineMetrics {
    /// Records handed to the collection
    dispatched: AtomicU64,

    /// Successful handler deliveries
    emitted: AtomicU64,

    /// Deliveries skipped by enable/level gates
    skipped: AtomicU64,

    /// Deliveries dropped by a formatter
    dropped: AtomicU64,

    /// Deliveries that failed inside a handler
    failed: AtomicU64,
}

impl PipelineMetrics {
    pub const fn new() -> Self {
        Self {
            dispatched: AtomicU64::new(0),
            emitted: AtomicU64::new(0),
            skipped: AtomicU64::new(0),
            dropped: AtomicU64::new(0),
            failed: AtomicU64::new(0),
        }
    }

    #[inline]
    pub fn dispatched_count(&self) -> u64 {
        self.dispatched.load(Ordering::Relaxed)
    }

    #[inline]
    pub fn emitted_count(&self) -> u64 {
        self.emitted.load(Ordering::Relaxed)
    }

    #[inline]
    pub fn skipped_count(&self) -> u64 {
        self.skipped.load(Ordering::Relaxed)
    }

    #[inline]
    pub fn dropped_count(&self) -> u64 {
        self.dropped.load(Ordering::Relaxed)
    }

    #[inline]
    pub fn failed_count(&self) -> u64 {
        self.failed.load(Ordering::Relaxed)
    }

    /// Count a record entering the collection; returns the previous value
    #[inline]
    pub fn record_dispatched(&self) -> u64 {
        self.dispatched.fetch_add(1, Ordering::Relaxed)
    }

    /// Count one handler outcome
    #[inline]
    pub fn record(&self, delivery: Delivery) {
        let counter = match delivery {
            Delivery::Emitted => &self.emitted,
            Delivery::Skipped => &self.skipped,
            Delivery::Dropped => &self.dropped,
            Delivery::Failed => &self.failed,
        };
        counter.fetch_add(1, Ordering::Relaxed);
    }

    /// Failed deliveries as a percentage of attempted ones (0.0 - 100.0)
    ///
    /// Skipped deliveries are not attempts. Returns 0.0 before any attempt.
    pub fn failure_rate(&self) -> f64 {
        let failed = self.failed_count() as f64;
        let attempted = self.emitted_count() as f64 + self.dropped_count() as f64 + failed;
        if attempted == 0.0 {
            0.0
        } else {
            (failed / attempted) * 100.0
        }
    }

    pub fn reset(&self) {
        self.dispatched.store(0, Ordering::Relaxed);
        self.emitted.store(0, Ordering::Relaxed);
        self.skipped.store(0, Ordering::Relaxed);
        self.dropped.store(0, Ordering::Relaxed);
        self.failed.store(0, Ordering::Relaxed);
    }
}

impl Default for PipelineMetrics {
    fn default() -> Self {
        Self::new()
    }
}

impl Clone for PipelineMetrics {
    /// Create a snapshot of the current metrics values
    fn clone(&self) -> Self {
        Self {
            dispatched: AtomicU64::new(self.dispatched_count()),
            emitted: AtomicU64::new(self.emitted_count()),
            skipped: AtomicU64::new(self.skipped_count()),
            dropped: AtomicU64::new(self.dropped_count()),
            failed: AtomicU64::new(self.failed_count()),
        }
    }
}
