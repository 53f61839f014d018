//! Formatters that decide whether a record is delivered at all

use super::Formatter;
use crate::core::{LevelValue, LogLevel, LogRecord, LoggerError, Result};
use rand::Rng;
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};

/// Keeps records the predicate accepts, drops the rest
pub struct FilterFormatter<P> {
    predicate: P,
}

impl<P> FilterFormatter<P>
where
    P: Fn(&LogRecord) -> bool + Send + Sync,
{
    pub fn new(predicate: P) -> Self {
        Self { predicate }
    }
}

impl<P> Formatter for FilterFormatter<P>
where
    P: Fn(&LogRecord) -> bool + Send + Sync,
{
    fn format(&self, record: &LogRecord) -> Option<LogRecord> {
        (self.predicate)(record).then(|| record.clone())
    }
}

impl<P> fmt::Debug for FilterFormatter<P> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("FilterFormatter(..)")
    }
}

/// Counters for sampling decisions
#[derive(Debug, Default)]
pub struct SamplerMetrics {
    sampled_count: AtomicU64,
    dropped_count: AtomicU64,
}

impl SamplerMetrics {
    #[inline]
    pub fn sampled_count(&self) -> u64 {
        self.sampled_count.load(Ordering::Relaxed)
    }

    #[inline]
    pub fn dropped_count(&self) -> u64 {
        self.dropped_count.load(Ordering::Relaxed)
    }

    pub fn total_count(&self) -> u64 {
        self.sampled_count() + self.dropped_count()
    }

    /// Observed share of records kept; 1.0 before any record was seen
    pub fn effective_sample_rate(&self) -> f64 {
        let total = self.total_count();
        if total == 0 {
            1.0
        } else {
            self.sampled_count() as f64 / total as f64
        }
    }

    pub fn reset(&self) {
        self.sampled_count.store(0, Ordering::Relaxed);
        self.dropped_count.store(0, Ordering::Relaxed);
    }

    fn record(&self, sampled: bool) {
        let counter = if sampled {
            &self.sampled_count
        } else {
            &self.dropped_count
        };
        counter.fetch_add(1, Ordering::Relaxed);
    }
}

/// Keeps a random share of records
///
/// Records at or above the bypass severity (warn by default) are always
/// kept.
///
/// ```
/// use structured_log_pipeline::formatters::SampleFormatter;
///
/// let sampler = SampleFormatter::new(0.1).unwrap();
/// assert!(SampleFormatter::new(1.5).is_err());
/// ```
pub struct SampleFormatter {
    rate: f64,
    always_sample: Option<LevelValue>,
    metrics: SamplerMetrics,
}

impl SampleFormatter {
    /// `rate` must be within `0.0..=1.0`
    pub fn new(rate: f64) -> Result<Self> {
        if !(0.0..=1.0).contains(&rate) {
            return Err(LoggerError::config(
                "SampleFormatter",
                format!("sample rate must be between 0.0 and 1.0, got {}", rate),
            ));
        }
        Ok(Self {
            rate,
            always_sample: Some(LogLevel::Warn.value()),
            metrics: SamplerMetrics::default(),
        })
    }

    /// Always keep records at this severity or more severe; `None` samples everything
    #[must_use]
    pub fn always_sample(mut self, level: Option<impl Into<LevelValue>>) -> Self {
        self.always_sample = level.map(Into::into);
        self
    }

    pub fn rate(&self) -> f64 {
        self.rate
    }

    pub fn metrics(&self) -> &SamplerMetrics {
        &self.metrics
    }

    fn should_sample(&self, record: &LogRecord) -> bool {
        if self.always_sample.is_some_and(|bypass| record.level() <= bypass) {
            return true;
        }
        if self.rate >= 1.0 {
            return true;
        }
        if self.rate <= 0.0 {
            return false;
        }
        rand::thread_rng().gen::<f64>() < self.rate
    }
}

impl Formatter for SampleFormatter {
    fn format(&self, record: &LogRecord) -> Option<LogRecord> {
        let sampled = self.should_sample(record);
        self.metrics.record(sampled);
        sampled.then(|| record.clone())
    }
}

impl fmt::Debug for SampleFormatter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SampleFormatter")
            .field("rate", &self.rate)
            .field("always_sample", &self.always_sample)
            .field("metrics", &self.metrics)
            .finish()
    }
}
