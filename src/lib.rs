//! flowstage - a transactional single-record flow-processing stage
//!
//! Records (string attributes plus an opaque content blob) are taken from an
//! input queue inside a [`ProcessSession`], transformed by stage logic, and
//! routed to one of a fixed set of [`Relationship`]s. A session ends in exactly
//! one atomic commit or one rollback; rollback returns inputs to the queue.
//!
//! # Quick Start
//!
//! ```ignore
//! use flowstage::{CaseConvert, StageRunner};
//! use std::collections::BTreeMap;
//!
//! let runner = StageRunner::new(CaseConvert::new())?;
//! runner.enqueue(BTreeMap::new(), "abc")?;
//! runner.run_until_empty();
//! let out = runner.output("success");
//! assert_eq!(runner.content(&out[0])?, b"ABC");
//! ```
//!
//! # Architecture
//!
//! - `flowstage-core`: records, relationships, errors, provenance types
//! - `flowstage-session`: sessions, queues, content and provenance repositories
//! - `flowstage-stage`: the `Processor` interface, configuration, `CaseConvert`, the runner

pub use flowstage_core::{
    attr, BoxedCause, ContentClaim, FlowError, FlowErrorKind, PropertyDescriptor, ProvenanceEvent,
    ProvenanceEventType, Record, RecordId, Relationship, RelationshipSet, ValidationResult,
};
pub use flowstage_session::{
    CommitSummary, ContentRepository, Counters, FlowQueues, InMemoryContentRepository,
    PendingRecords, ProcessSession, ProvenanceRepository, Route, SessionError, SessionFactory,
    SessionFactoryBuilder, SessionResult, SessionStatus, Violation,
};
pub use flowstage_stage::{
    trigger, CaseConvert, CaseMode, ComponentLog, ConfigError, InitializationContext, LogLevel,
    MemoryLog, ProcessContext, Processor, ProcessorError, ProcessorResult, RunReport, StageConfig,
    StageRunner, TracingLog,
};

/// Constants of the case conversion stage
pub use flowstage_stage::case_convert;
