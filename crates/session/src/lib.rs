//! Session layer for flowstage
//!
//! This crate implements the transactional envelope around one stage
//! invocation:
//! - ProcessSession: acquisition, scoped content access, routing, commit/rollback
//! - SessionFactory: one session per invocation over shared infrastructure
//! - FlowQueues: input queue and per-relationship output queues
//! - ContentRepository: immutable content addressed by claims
//! - Routing validation: every record routed exactly once before commit

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod content;
pub mod error;
pub mod factory;
pub mod provenance;
pub mod queue;
pub mod session;
pub mod validation;

pub use content::{read_all, ContentRepository, InMemoryContentRepository};
pub use error::{SessionError, SessionResult, Violation};
pub use factory::{SessionFactory, SessionFactoryBuilder};
pub use provenance::{Counters, ProvenanceRepository};
pub use queue::FlowQueues;
pub use session::{CommitSummary, PendingRecords, ProcessSession, SessionStatus};
pub use validation::{validate_record, validate_routing, Route, RoutingValidation};
