//! Provenance event types
//!
//! Sessions record what happened to each record. Events become visible only
//! when the session commits.

use crate::record::{Record, RecordId};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Kind of lineage event
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ProvenanceEventType {
    /// Record taken from the input queue
    Receive,
    /// Record created from nothing
    Create,
    /// Record created as a child of another record
    Fork,
    /// Attributes changed
    AttributesModified,
    /// Content replaced
    ContentModified,
    /// Record routed to a relationship
    Route,
    /// Record terminated
    Drop,
}

impl fmt::Display for ProvenanceEventType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ProvenanceEventType::Receive => "RECEIVE",
            ProvenanceEventType::Create => "CREATE",
            ProvenanceEventType::Fork => "FORK",
            ProvenanceEventType::AttributesModified => "ATTRIBUTES_MODIFIED",
            ProvenanceEventType::ContentModified => "CONTENT_MODIFIED",
            ProvenanceEventType::Route => "ROUTE",
            ProvenanceEventType::Drop => "DROP",
        };
        f.write_str(name)
    }
}

/// One lineage event for one record
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProvenanceEvent {
    /// Kind of event
    pub event_type: ProvenanceEventType,
    /// Logical record id
    pub record_id: RecordId,
    /// Record uuid at the time of the event
    pub record_uuid: String,
    /// Target relationship, for `Route` events
    pub relationship: Option<String>,
    /// Free-form details (parent uuid, drop reason, ...)
    pub details: Option<String>,
    /// When the event was recorded
    pub timestamp: DateTime<Utc>,
}

impl ProvenanceEvent {
    /// Create an event for `record`
    pub fn new(event_type: ProvenanceEventType, record: &Record) -> Self {
        Self {
            event_type,
            record_id: record.id(),
            record_uuid: record.uuid().to_string(),
            relationship: None,
            details: None,
            timestamp: Utc::now(),
        }
    }

    /// Attach the target relationship
    pub fn with_relationship(mut self, relationship: impl Into<String>) -> Self {
        self.relationship = Some(relationship.into());
        self
    }

    /// Attach details
    pub fn with_details(mut self, details: impl Into<String>) -> Self {
        self.details = Some(details.into());
        self
    }
}
