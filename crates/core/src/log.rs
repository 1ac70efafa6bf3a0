// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Job logging front-end.
//!
//! A [`Logger`] filters records against a mutable threshold and forwards
//! them to a shared [`LogSink`]. Sub-loggers carry a heading (e.g. the name
//! of a log pipe) so multiplexed streams stay attributable in one log.

use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

use parking_lot::Mutex;
use thiserror::Error;

/// Log severity, ordered from least to most severe.
///
/// A logger with threshold `level` emits records at `level` and above.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Level {
    Debug,
    Info,
    Warning,
    Error,
    Critical,
}

impl Level {
    /// Canonical uppercase name, as used in job specs and FIFO filenames.
    pub fn as_str(self) -> &'static str {
        match self {
            Level::Debug => "DEBUG",
            Level::Info => "INFO",
            Level::Warning => "WARNING",
            Level::Error => "ERROR",
            Level::Critical => "CRITICAL",
        }
    }
}

impl fmt::Display for Level {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Error returned when parsing an unrecognized level name.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("unknown log level: {0}")]
pub struct ParseLevelError(pub String);

impl FromStr for Level {
    type Err = ParseLevelError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "DEBUG" => Ok(Level::Debug),
            "INFO" => Ok(Level::Info),
            "WARNING" => Ok(Level::Warning),
            "ERROR" => Ok(Level::Error),
            "CRITICAL" => Ok(Level::Critical),
            other => Err(ParseLevelError(other.to_string())),
        }
    }
}

/// One emitted log line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogRecord {
    /// Heading of the sub-logger that emitted the record, if any.
    pub name: Option<String>,
    pub level: Level,
    pub message: String,
}

/// Destination for log records.
pub trait LogSink: Send + Sync {
    fn emit(&self, record: &LogRecord);
}

/// Filtering front-end over a shared sink.
#[derive(Clone)]
pub struct Logger {
    name: Option<String>,
    /// Minimum level this logger emits. Mutable so callers can temporarily
    /// quiet a logger and restore it afterwards.
    pub level: Level,
    sink: Arc<dyn LogSink>,
}

impl Logger {
    /// Create a root logger with the given threshold.
    pub fn new(sink: Arc<dyn LogSink>, level: Level) -> Self {
        Self {
            name: None,
            level,
            sink,
        }
    }

    /// Heading of this logger, if it is a sub-logger.
    pub fn name(&self) -> Option<&str> {
        self.name.as_deref()
    }

    /// Derive a named sub-logger sharing this logger's sink and threshold.
    ///
    /// Nested sub-logger names join with `.`.
    pub fn sub_logger(&self, name: &str) -> Logger {
        let name = match &self.name {
            Some(parent) => format!("{parent}.{name}"),
            None => name.to_string(),
        };
        Logger {
            name: Some(name),
            level: self.level,
            sink: Arc::clone(&self.sink),
        }
    }

    /// Emit `message` at `level` if it passes the threshold.
    pub fn log(&self, level: Level, message: &str) {
        if level >= self.level {
            self.sink.emit(&LogRecord {
                name: self.name.clone(),
                level,
                message: message.to_string(),
            });
        }
    }

    pub fn debug(&self, message: &str) {
        self.log(Level::Debug, message);
    }

    pub fn info(&self, message: &str) {
        self.log(Level::Info, message);
    }

    pub fn warning(&self, message: &str) {
        self.log(Level::Warning, message);
    }

    pub fn error(&self, message: &str) {
        self.log(Level::Error, message);
    }

    pub fn critical(&self, message: &str) {
        self.log(Level::Critical, message);
    }
}

impl fmt::Debug for Logger {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Logger")
            .field("name", &self.name)
            .field("level", &self.level)
            .finish_non_exhaustive()
    }
}

/// Sink forwarding records into the `tracing` ecosystem.
pub struct TracingSink;

impl LogSink for TracingSink {
    fn emit(&self, record: &LogRecord) {
        let name = record.name.as_deref().unwrap_or("job");
        match record.level {
            Level::Critical | Level::Error => {
                tracing::error!(logger = name, "{}", record.message)
            }
            Level::Warning => tracing::warn!(logger = name, "{}", record.message),
            Level::Info => tracing::info!(logger = name, "{}", record.message),
            Level::Debug => tracing::debug!(logger = name, "{}", record.message),
        }
    }
}

/// Sink capturing records in memory, for tests.
#[derive(Default)]
pub struct MemorySink {
    records: Mutex<Vec<LogRecord>>,
}

impl MemorySink {
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot of everything emitted so far.
    pub fn records(&self) -> Vec<LogRecord> {
        self.records.lock().clone()
    }

    /// Messages emitted at exactly `level`, in order.
    pub fn messages_at(&self, level: Level) -> Vec<String> {
        self.records
            .lock()
            .iter()
            .filter(|r| r.level == level)
            .map(|r| r.message.clone())
            .collect()
    }
}

impl LogSink for MemorySink {
    fn emit(&self, record: &LogRecord) {
        self.records.lock().push(record.clone());
    }
}

#[cfg(test)]
#[path = "log_tests.rs"]
mod tests;
