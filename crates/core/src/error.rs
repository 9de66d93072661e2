//! Recoverable per-record errors
//!
//! A [`FlowError`] describes something wrong with one record's data or with
//! the transform applied to it. It never aborts an invocation: stage logic
//! converts it into attributes on a record routed to the `failure`
//! relationship.
//!
//! Fatal errors (broken session contract, unknown records) live in the
//! session crate and always lead to rollback.

use crate::record::attr;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::error::Error as StdError;
use std::fmt;
use thiserror::Error;

/// Boxed underlying cause carried by a [`FlowError`]
pub type BoxedCause = Box<dyn StdError + Send + Sync + 'static>;

/// Which processing step produced a [`FlowError`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum FlowErrorKind {
    /// Record content could not be read
    ContentRead,
    /// Record content could not be written
    ContentWrite,
    /// The stage's business logic rejected the record
    Transform,
}

impl FlowErrorKind {
    /// Stable name written to the `error.kind` attribute
    pub fn as_str(&self) -> &'static str {
        match self {
            FlowErrorKind::ContentRead => "content-read",
            FlowErrorKind::ContentWrite => "content-write",
            FlowErrorKind::Transform => "transform",
        }
    }
}

impl fmt::Display for FlowErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A recoverable error: human-readable message plus optional cause
#[derive(Debug, Error)]
#[error("{kind} error: {message}")]
pub struct FlowError {
    kind: FlowErrorKind,
    message: String,
    #[source]
    cause: Option<BoxedCause>,
}

impl FlowError {
    /// Create an error without an underlying cause
    pub fn new(kind: FlowErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
            cause: None,
        }
    }

    /// Create an error wrapping an underlying cause
    pub fn with_cause(
        kind: FlowErrorKind,
        message: impl Into<String>,
        cause: impl Into<BoxedCause>,
    ) -> Self {
        Self {
            kind,
            message: message.into(),
            cause: Some(cause.into()),
        }
    }

    /// Content read failure
    pub fn content_read(message: impl Into<String>, cause: impl Into<BoxedCause>) -> Self {
        Self::with_cause(FlowErrorKind::ContentRead, message, cause)
    }

    /// Content write failure
    pub fn content_write(message: impl Into<String>, cause: impl Into<BoxedCause>) -> Self {
        Self::with_cause(FlowErrorKind::ContentWrite, message, cause)
    }

    /// Transform failure
    pub fn transform(message: impl Into<String>) -> Self {
        Self::new(FlowErrorKind::Transform, message)
    }

    /// Step that failed
    pub fn kind(&self) -> FlowErrorKind {
        self.kind
    }

    /// Human-readable message, without the cause
    pub fn message(&self) -> &str {
        &self.message
    }

    /// Underlying cause, if any
    pub fn cause(&self) -> Option<&(dyn StdError + Send + Sync + 'static)> {
        self.cause.as_deref()
    }

    /// Attributes describing this error on a failure-routed record
    ///
    /// `error.message` is never empty: an empty message falls back to the
    /// error kind.
    pub fn to_attributes(&self) -> BTreeMap<String, String> {
        let mut attrs = BTreeMap::new();
        let message = if self.message.trim().is_empty() {
            format!("{} failed", self.kind)
        } else {
            self.message.clone()
        };
        attrs.insert(attr::ERROR_MESSAGE.to_string(), message);
        attrs.insert(attr::ERROR_KIND.to_string(), self.kind.as_str().to_string());
        if let Some(cause) = &self.cause {
            attrs.insert(attr::ERROR_CAUSE.to_string(), cause.to_string());
        }
        attrs
    }
}
