//! Fatal stage errors
//!
//! A `ProcessorError` always escapes the invocation: the session rolls back
//! and the host sees the error. Per-record problems are `FlowError`s and are
//! routed instead.

use flowstage_core::{BoxedCause, ValidationResult};
use flowstage_session::SessionError;
use std::io;
use std::path::PathBuf;
use thiserror::Error;

/// Result type alias for stage operations
pub type ProcessorResult<T> = std::result::Result<T, ProcessorError>;

/// Result type alias for configuration loading
pub type ConfigResult<T> = std::result::Result<T, ConfigError>;

fn describe_invalid(results: &[ValidationResult]) -> String {
    results
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join("; ")
}

/// Errors that abort an invocation
#[derive(Debug, Error)]
pub enum ProcessorError {
    /// Session contract broken or session misused
    #[error("session error: {0}")]
    Session(#[from] SessionError),

    /// Stage configuration failed validation
    #[error("invalid configuration: {}", describe_invalid(.0))]
    InvalidConfiguration(Vec<ValidationResult>),

    /// Unexpected failure inside stage logic
    #[error("processing failed: {message}")]
    Processing {
        /// What went wrong
        message: String,
        /// Underlying cause
        #[source]
        source: Option<BoxedCause>,
    },
}

impl ProcessorError {
    /// Unexpected failure without a cause
    pub fn processing(message: impl Into<String>) -> Self {
        ProcessorError::Processing {
            message: message.into(),
            source: None,
        }
    }

    /// Unexpected failure wrapping a cause
    pub fn processing_with(message: impl Into<String>, source: impl Into<BoxedCause>) -> Self {
        ProcessorError::Processing {
            message: message.into(),
            source: Some(source.into()),
        }
    }
}

/// Errors loading or writing a stage configuration file
#[derive(Debug, Error)]
pub enum ConfigError {
    /// File could not be read or written
    #[error("failed to access config file '{}': {source}", .path.display())]
    Io {
        /// File involved
        path: PathBuf,
        /// I/O error
        #[source]
        source: io::Error,
    },

    /// File is not valid TOML for a stage configuration
    #[error("failed to parse config: {0}")]
    Parse(#[from] toml::de::Error),

    /// Configuration could not be serialized
    #[error("failed to serialize config: {0}")]
    Serialize(#[from] toml::ser::Error),
}
