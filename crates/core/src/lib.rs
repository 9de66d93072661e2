//! Core types for flowstage
//!
//! This crate defines the foundational types shared by the session and the
//! stage logic:
//! - Record: attributes + content claim, revised on every change
//! - Relationship / RelationshipSet: named output channels
//! - PropertyDescriptor / ValidationResult: configuration schema
//! - ProvenanceEvent: lineage events published on commit
//! - FlowError: recoverable per-record errors

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod error;
pub mod property;
pub mod provenance;
pub mod record;
pub mod relationship;

pub use error::{BoxedCause, FlowError, FlowErrorKind};
pub use property::{PropertyDescriptor, ValidationResult};
pub use provenance::{ProvenanceEvent, ProvenanceEventType};
pub use record::{attr, ContentClaim, Record, RecordId};
pub use relationship::{Relationship, RelationshipSet};
