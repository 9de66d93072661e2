//! Component logging
//!
//! Stage logic logs through a [`ComponentLog`] handed to it by the host.
//! [`TracingLog`] forwards to `tracing` with the component identifier as a
//! field; [`MemoryLog`] keeps entries for inspection.

use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use std::error::Error as StdError;
use std::fmt;
use std::str::FromStr;

/// Severity of a component log entry
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    /// Very fine detail
    Trace,
    /// Diagnostic detail
    Debug,
    /// Normal operation
    Info,
    /// Recoverable problem
    Warn,
    /// Failure
    Error,
}

impl LogLevel {
    /// Lowercase name, as used in configuration files
    pub fn as_str(&self) -> &'static str {
        match self {
            LogLevel::Trace => "trace",
            LogLevel::Debug => "debug",
            LogLevel::Info => "info",
            LogLevel::Warn => "warn",
            LogLevel::Error => "error",
        }
    }
}

impl fmt::Display for LogLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for LogLevel {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "trace" => Ok(LogLevel::Trace),
            "debug" => Ok(LogLevel::Debug),
            "info" => Ok(LogLevel::Info),
            "warn" | "warning" => Ok(LogLevel::Warn),
            "error" => Ok(LogLevel::Error),
            other => Err(format!("unknown log level '{}'", other)),
        }
    }
}

impl From<LogLevel> for tracing::Level {
    fn from(level: LogLevel) -> Self {
        match level {
            LogLevel::Trace => tracing::Level::TRACE,
            LogLevel::Debug => tracing::Level::DEBUG,
            LogLevel::Info => tracing::Level::INFO,
            LogLevel::Warn => tracing::Level::WARN,
            LogLevel::Error => tracing::Level::ERROR,
        }
    }
}

/// Logging collaborator available to stage logic
pub trait ComponentLog: Send + Sync {
    /// Log a message with an optional cause
    fn log(&self, level: LogLevel, message: &str, cause: Option<&(dyn StdError + 'static)>);

    /// Log at debug level
    fn debug(&self, message: &str) {
        self.log(LogLevel::Debug, message, None);
    }

    /// Log at info level
    fn info(&self, message: &str) {
        self.log(LogLevel::Info, message, None);
    }

    /// Log at warn level
    fn warn(&self, message: &str) {
        self.log(LogLevel::Warn, message, None);
    }

    /// Log at error level with a cause
    fn error(&self, message: &str, cause: &(dyn StdError + 'static)) {
        self.log(LogLevel::Error, message, Some(cause));
    }
}

/// [`ComponentLog`] backed by `tracing`
#[derive(Debug, Clone)]
pub struct TracingLog {
    component: String,
}

impl TracingLog {
    /// Log on behalf of `component`
    pub fn new(component: impl Into<String>) -> Self {
        Self {
            component: component.into(),
        }
    }

    /// Component identifier attached to every event
    pub fn component(&self) -> &str {
        &self.component
    }
}

macro_rules! emit {
    ($macro:ident, $component:expr, $message:expr, $cause:expr) => {
        match $cause {
            Some(cause) => tracing::$macro!(component = %$component, cause = %cause, "{}", $message),
            None => tracing::$macro!(component = %$component, "{}", $message),
        }
    };
}

impl ComponentLog for TracingLog {
    fn log(&self, level: LogLevel, message: &str, cause: Option<&(dyn StdError + 'static)>) {
        match level {
            LogLevel::Trace => emit!(trace, self.component, message, cause),
            LogLevel::Debug => emit!(debug, self.component, message, cause),
            LogLevel::Info => emit!(info, self.component, message, cause),
            LogLevel::Warn => emit!(warn, self.component, message, cause),
            LogLevel::Error => emit!(error, self.component, message, cause),
        }
    }
}

/// One captured log entry
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogEntry {
    /// Severity
    pub level: LogLevel,
    /// Message text
    pub message: String,
    /// Rendered cause, if any
    pub cause: Option<String>,
}

/// [`ComponentLog`] that keeps entries in memory
#[derive(Debug, Default)]
pub struct MemoryLog {
    entries: Mutex<Vec<LogEntry>>,
}

impl MemoryLog {
    /// Empty log
    pub fn new() -> Self {
        Self::default()
    }

    /// Copy of every entry so far
    pub fn entries(&self) -> Vec<LogEntry> {
        self.entries.lock().clone()
    }

    /// Entries at exactly `level`
    pub fn at_level(&self, level: LogLevel) -> Vec<LogEntry> {
        self.entries
            .lock()
            .iter()
            .filter(|e| e.level == level)
            .cloned()
            .collect()
    }
}

impl ComponentLog for MemoryLog {
    fn log(&self, level: LogLevel, message: &str, cause: Option<&(dyn StdError + 'static)>) {
        self.entries.lock().push(LogEntry {
            level,
            message: message.to_string(),
            cause: cause.map(ToString::to_string),
        });
    }
}
