//! Fatal session errors
//!
//! Everything in this module signals a programming defect or a broken
//! substrate, never bad data. The invocation that hits one of these rolls
//! back and the error escapes to the host.

use flowstage_core::RecordId;
use std::fmt;
use thiserror::Error;

/// Result type alias for session operations
pub type SessionResult<T> = std::result::Result<T, SessionError>;

/// A record that breaks the routing contract at commit time
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Violation {
    /// Record was acquired or created but neither removed nor transferred
    Unrouted {
        /// Offending record
        id: RecordId,
        /// Its uuid attribute
        uuid: String,
    },
    /// Record was removed/transferred more than once
    MultiplyRouted {
        /// Offending record
        id: RecordId,
        /// Every routing decision, in order (`<removed>` for removals)
        routes: Vec<String>,
    },
}

impl Violation {
    /// Record the violation is about
    pub fn record_id(&self) -> RecordId {
        match self {
            Violation::Unrouted { id, .. } | Violation::MultiplyRouted { id, .. } => *id,
        }
    }
}

impl fmt::Display for Violation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Violation::Unrouted { id, uuid } => {
                write!(f, "{} (uuid {}) was not removed or transferred", id, uuid)
            }
            Violation::MultiplyRouted { id, routes } => {
                write!(f, "{} was routed {} times: {}", id, routes.len(), routes.join(", "))
            }
        }
    }
}

fn join_violations(violations: &[Violation]) -> String {
    violations
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join("; ")
}

/// Fatal errors raised by a process session
#[derive(Debug, Error)]
pub enum SessionError {
    /// Commit found records that were not routed exactly once
    #[error("session contract violated ({} record(s)): {}", .0.len(), join_violations(.0))]
    ContractViolation(Vec<Violation>),

    /// Record was not acquired or created by this session
    #[error("{0} is not known to this session")]
    UnknownRecord(RecordId),

    /// Handle refers to an older revision of the record
    #[error("stale handle for {id}: revision {given} used, current revision is {current}")]
    StaleRecord {
        /// Record id
        id: RecordId,
        /// Revision of the handle passed in
        given: u64,
        /// Revision the session holds
        current: u64,
    },

    /// Transfer to a relationship the stage never declared
    #[error("relationship '{0}' is not declared by this stage")]
    UndeclaredRelationship(String),

    /// Operation on a session that already committed or rolled back
    #[error("session {0} is closed")]
    SessionClosed(u64),
}

impl SessionError {
    /// Violations carried by a `ContractViolation`, empty otherwise
    pub fn violations(&self) -> &[Violation] {
        match self {
            SessionError::ContractViolation(v) => v,
            _ => &[],
        }
    }
}
