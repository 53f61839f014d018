//! Record formatters
//!
//! A [`Formatter`] maps one record to a new record, or to `None` to drop it.
//! Formatters compose with [`combine`]: each one sees the previous result,
//! and the first `None` ends the chain.
//!
//! Enrichment formatters ([`TimestampFormatter`], [`LabelFormatter`],
//! [`ErrorsFormatter`], [`MetadataFormatter`], [`AlignFormatter`],
//! [`MillisecondFormatter`], `ColorizeFormatter`) add or rewrite fields.
//! Terminal formatters ([`JsonFormatter`], [`SimpleFormatter`],
//! [`PrintfFormatter`], [`LogfmtFormatter`]) render the final display string
//! into the internal `__formatted` field and belong at the end of a chain.

#[cfg(feature = "console")]
mod colorize;
mod enrich;
mod filter;
mod json;
mod text;

#[cfg(feature = "console")]
pub use colorize::ColorizeFormatter;
pub use enrich::{
    AlignFormatter, ErrorsFormatter, LabelFormatter, MetadataFormatter, MillisecondFormatter,
    TimestampFormatter,
};
pub use filter::{FilterFormatter, SampleFormatter, SamplerMetrics};
pub use json::JsonFormatter;
pub use text::{LogfmtFormatter, PrintfFormatter, SimpleFormatter};

use crate::core::LogRecord;
use std::fmt;
use std::sync::Arc;

/// A single-record transform
///
/// Returning `None` drops the record: the handler that owns this formatter
/// does not deliver it. Implementations must not panic on ordinary input;
/// a panic is caught by the handler and reported as a delivery failure.
pub trait Formatter: Send + Sync {
    fn format(&self, record: &LogRecord) -> Option<LogRecord>;
}

impl<F: Formatter + ?Sized> Formatter for Arc<F> {
    fn format(&self, record: &LogRecord) -> Option<LogRecord> {
        (**self).format(record)
    }
}

impl<F: Formatter + ?Sized> Formatter for Box<F> {
    fn format(&self, record: &LogRecord) -> Option<LogRecord> {
        (**self).format(record)
    }
}

/// Passes every record through unchanged
#[derive(Debug, Clone, Copy, Default)]
pub struct Identity;

impl Formatter for Identity {
    fn format(&self, record: &LogRecord) -> Option<LogRecord> {
        Some(record.clone())
    }
}

/// Adapts a closure into a formatter
pub struct FnFormatter<F> {
    func: F,
}

impl<F> FnFormatter<F>
where
    F: Fn(&LogRecord) -> Option<LogRecord> + Send + Sync,
{
    pub fn new(func: F) -> Self {
        Self { func }
    }
}

impl<F> Formatter for FnFormatter<F>
where
    F: Fn(&LogRecord) -> Option<LogRecord> + Send + Sync,
{
    fn format(&self, record: &LogRecord) -> Option<LogRecord> {
        (self.func)(record)
    }
}

impl<F> fmt::Debug for FnFormatter<F> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("FnFormatter(..)")
    }
}

/// Ordered chain of formatters with short-circuit drop
#[derive(Clone, Default)]
pub struct CombinedFormatter {
    formatters: Vec<Arc<dyn Formatter>>,
}

impl CombinedFormatter {
    pub fn new(formatters: Vec<Arc<dyn Formatter>>) -> Self {
        Self { formatters }
    }

    #[must_use]
    pub fn then(mut self, formatter: impl Formatter + 'static) -> Self {
        self.formatters.push(Arc::new(formatter));
        self
    }

    pub fn len(&self) -> usize {
        self.formatters.len()
    }

    pub fn is_empty(&self) -> bool {
        self.formatters.is_empty()
    }
}

impl Formatter for CombinedFormatter {
    fn format(&self, record: &LogRecord) -> Option<LogRecord> {
        let mut current = record.clone();
        for formatter in &self.formatters {
            current = formatter.format(&current)?;
        }
        Some(current)
    }
}

impl fmt::Debug for CombinedFormatter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CombinedFormatter")
            .field("len", &self.formatters.len())
            .finish()
    }
}

/// Build a pipeline from shared formatters
///
/// Every element is a [`Formatter`] by construction, so the chain cannot be
/// misconfigured at runtime. See also the [`combine!`](crate::combine) macro.
pub fn combine(formatters: Vec<Arc<dyn Formatter>>) -> CombinedFormatter {
    CombinedFormatter::new(formatters)
}

/// Build a [`CombinedFormatter`] from formatter values
///
/// ```
/// use structured_log_pipeline::combine;
/// use structured_log_pipeline::formatters::{JsonFormatter, LabelFormatter, TimestampFormatter};
///
/// let chain = combine![
///     TimestampFormatter::new(),
///     LabelFormatter::new("api"),
///     JsonFormatter::new(),
/// ];
/// assert_eq!(chain.len(), 3);
/// ```
#[macro_export]
macro_rules! combine {
    ($($formatter:expr),* $(,)?) => {
        $crate::formatters::combine(vec![
            $(::std::sync::Arc::new($formatter) as ::std::sync::Arc<dyn $crate::formatters::Formatter>),*
        ])
    };
}
