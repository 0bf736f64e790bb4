//! Structured logging infrastructure.
//!
//! Components never log through a global handle; each one is handed a
//! [`Logger`] so the same pipeline can run headless, under a CLI, or inside
//! a UI that renders the entries itself.

use crate::store::current_timestamp;
use parking_lot::Mutex;
use std::sync::Arc;

/// Severity of a log entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum LogLevel {
    /// Fine-grained detail.
    Debug,
    /// Normal progress.
    Info,
    /// Something the operator should look at.
    Warn,
    /// A failure.
    Error,
}

impl std::fmt::Display for LogLevel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            LogLevel::Debug => write!(f, "debug"),
            LogLevel::Info => write!(f, "info"),
            LogLevel::Warn => write!(f, "warn"),
            LogLevel::Error => write!(f, "error"),
        }
    }
}

/// A single structured log entry.
#[derive(Debug, Clone, PartialEq)]
pub struct LogEntry {
    /// When the entry was written (microseconds since epoch).
    pub timestamp: u64,
    /// Severity.
    pub level: LogLevel,
    /// Event name, e.g. "batch.started".
    pub event: String,
    /// Key/value fields.
    pub fields: Vec<(String, String)>,
}

impl LogEntry {
    /// Look up a field value.
    pub fn field(&self, key: &str) -> Option<&str> {
        self.fields
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }

    /// Format the entry as a log line.
    pub fn to_log_line(&self) -> String {
        let fields: Vec<String> = self
            .fields
            .iter()
            .map(|(k, v)| format!("{}={}", k, v))
            .collect();
        format!(
            "{} {} {} {}",
            self.timestamp,
            self.level,
            self.event,
            fields.join(" ")
        )
    }
}

/// Trait for log backends.
pub trait Logger: Send + Sync {
    /// Write a structured entry.
    fn log(&self, level: LogLevel, event: &str, fields: &[(&str, String)]);

    /// Write a debug entry.
    fn debug(&self, event: &str, fields: &[(&str, String)]) {
        self.log(LogLevel::Debug, event, fields);
    }

    /// Write an info entry.
    fn info(&self, event: &str, fields: &[(&str, String)]) {
        self.log(LogLevel::Info, event, fields);
    }

    /// Write a warning entry.
    fn warn(&self, event: &str, fields: &[(&str, String)]) {
        self.log(LogLevel::Warn, event, fields);
    }

    /// Write an error entry.
    fn error(&self, event: &str, fields: &[(&str, String)]) {
        self.log(LogLevel::Error, event, fields);
    }
}

/// Shared logger handle.
pub type SharedLogger = Arc<dyn Logger>;

/// Logger that forwards to `tracing`.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingLogger;

impl Logger for TracingLogger {
    fn log(&self, level: LogLevel, event: &str, fields: &[(&str, String)]) {
        let rendered: Vec<String> = fields.iter().map(|(k, v)| format!("{}={}", k, v)).collect();
        let fields = rendered.join(" ");
        match level {
            LogLevel::Debug => tracing::debug!(event, %fields),
            LogLevel::Info => tracing::info!(event, %fields),
            LogLevel::Warn => tracing::warn!(event, %fields),
            LogLevel::Error => tracing::error!(event, %fields),
        }
    }
}

/// In-memory logger for testing and embedding.
#[derive(Debug, Default, Clone)]
pub struct MemoryLogger {
    entries: Arc<Mutex<Vec<LogEntry>>>,
}

impl MemoryLogger {
    /// Create a new memory logger.
    pub fn new() -> Self {
        Self::default()
    }

    /// Get all logged entries.
    pub fn entries(&self) -> Vec<LogEntry> {
        self.entries.lock().clone()
    }

    /// Entries for one event name.
    pub fn events(&self, event: &str) -> Vec<LogEntry> {
        self.entries
            .lock()
            .iter()
            .filter(|e| e.event == event)
            .cloned()
            .collect()
    }

    /// Entries at or above a level.
    pub fn at_least(&self, level: LogLevel) -> Vec<LogEntry> {
        self.entries
            .lock()
            .iter()
            .filter(|e| e.level >= level)
            .cloned()
            .collect()
    }

    /// Clear all entries.
    pub fn clear(&self) {
        self.entries.lock().clear();
    }

    /// Get entry count.
    pub fn len(&self) -> usize {
        self.entries.lock().len()
    }

    /// Check if empty.
    pub fn is_empty(&self) -> bool {
        self.entries.lock().is_empty()
    }
}

impl Logger for MemoryLogger {
    fn log(&self, level: LogLevel, event: &str, fields: &[(&str, String)]) {
        self.entries.lock().push(LogEntry {
            timestamp: current_timestamp(),
            level,
            event: event.to_string(),
            fields: fields
                .iter()
                .map(|(k, v)| (k.to_string(), v.clone()))
                .collect(),
        });
    }
}

/// Logger that discards everything.
#[derive(Debug, Default, Clone, Copy)]
pub struct NullLogger;

impl Logger for NullLogger {
    fn log(&self, _level: LogLevel, _event: &str, _fields: &[(&str, String)]) {}
}
