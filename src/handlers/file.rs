//! File handler

use crate::core::{
    safe_json, sanitize_line, Handler, HandlerOptions, LogRecord, LoggerError, Result, TimestampFormat,
};
use fs2::FileExt;
use parking_lot::Mutex;
use serde_json::Value;
use std::fs::{File, OpenOptions};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

/// Appends one line per record to a file
///
/// Lines are buffered; the file is locked exclusively while the buffer is
/// written out so cooperating processes never interleave partial lines.
pub struct FileHandler {
    options: HandlerOptions,
    path: PathBuf,
    writer: Mutex<Option<BufWriter<File>>>,
    timestamp_format: TimestampFormat,
}

impl FileHandler {
    pub fn new(path: impl Into<PathBuf>) -> Result<Self> {
        let path = path.into();
        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&path)
            .map_err(|e| LoggerError::io_operation("opening log file", path.display().to_string(), e))?;

        Ok(Self {
            options: HandlerOptions::new(),
            path,
            writer: Mutex::new(Some(BufWriter::new(file))),
            timestamp_format: TimestampFormat::default(),
        })
    }

    #[must_use]
    pub fn with_options(mut self, options: HandlerOptions) -> Self {
        self.options = options;
        self
    }

    /// Set the timestamp format for the default line layout
    ///
    /// ```no_run
    /// use structured_log_pipeline::handlers::FileHandler;
    /// use structured_log_pipeline::TimestampFormat;
    ///
    /// let handler = FileHandler::new("/var/log/app.log")
    ///     .unwrap()
    ///     .with_timestamp_format(TimestampFormat::Rfc3339);
    /// ```
    #[must_use]
    pub fn with_timestamp_format(mut self, format: TimestampFormat) -> Self {
        self.timestamp_format = format;
        self
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn is_closed(&self) -> bool {
        self.writer.lock().is_none()
    }

    fn render(&self, record: &LogRecord) -> String {
        if let Some(line) = record.formatted() {
            return sanitize_line(line);
        }

        let mut output = String::new();
        if let Some(millis) = record.time() {
            output.push_str(&format!("[{}] ", self.timestamp_format.format_millis(millis)));
        }
        output.push_str(&format!("[{:5}] ", record.level_name().to_uppercase()));
        if !record.name().is_empty() {
            output.push_str(&format!("{} - ", sanitize_line(record.name())));
        }
        output.push_str(&sanitize_line(record.msg()));

        let extras: serde_json::Map<String, Value> = record
            .extra_fields()
            .map(|(k, v)| (k.clone(), v.clone()))
            .collect();
        if !extras.is_empty() {
            output.push_str(" | ");
            output.push_str(&safe_json(&Value::Object(extras), false));
        }
        output
    }

    fn flush_locked(writer: &mut BufWriter<File>) -> Result<()> {
        let file = writer.get_ref().try_clone()?;
        file.lock_exclusive()?;
        let flushed = writer.flush();
        let unlocked = FileExt::unlock(&file);
        flushed?;
        unlocked?;
        Ok(())
    }
}

impl Handler for FileHandler {
    fn name(&self) -> &str {
        "file"
    }

    fn options(&self) -> &HandlerOptions {
        &self.options
    }

    fn emit(&self, _record: &LogRecord, formatted: &LogRecord) -> Result<()> {
        let mut line = self.render(formatted);
        line.push('\n');

        let mut guard = self.writer.lock();
        let writer = guard
            .as_mut()
            .ok_or_else(|| LoggerError::HandlerClosed(self.path.display().to_string()))?;
        if writer.capacity() - writer.buffer().len() < line.len() {
            Self::flush_locked(writer)?;
        }
        writer.write_all(line.as_bytes())?;
        Ok(())
    }

    fn flush(&self) -> Result<()> {
        match self.writer.lock().as_mut() {
            Some(writer) => Self::flush_locked(writer),
            None => Ok(()),
        }
    }

    fn close(&self) -> Result<()> {
        match self.writer.lock().take() {
            Some(mut writer) => Self::flush_locked(&mut writer),
            None => Ok(()),
        }
    }
}

impl Drop for FileHandler {
    fn drop(&mut self) {
        // Ensure all buffered data is flushed to disk
        let _ = self.close();
    }
}
