//! Flow records
//!
//! This module defines the unit of data that flows through a stage:
//! - RecordId: logical identity, stable across revisions
//! - ContentClaim: handle to content held by a content repository
//! - Record: attributes + optional content claim + revision
//!
//! # Revisions
//!
//! A `Record` is an immutable value. Every attribute or content change
//! produces a new value with the revision bumped by one, and the session that
//! owns the record only accepts the latest revision. Holding on to an older
//! handle (e.g. a clone taken before `put_attribute`) therefore cannot be used
//! to route or mutate the record again.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;
use uuid::Uuid;

/// Well-known attribute keys
pub mod attr {
    /// Unique id of a record, regenerated for every created record
    pub const UUID: &str = "uuid";
    /// Logical file name, defaults to the uuid
    pub const FILENAME: &str = "filename";
    /// Logical path, defaults to `./`
    pub const PATH: &str = "path";
    /// Human-readable message of the error that routed a record to failure
    pub const ERROR_MESSAGE: &str = "error.message";
    /// Step that produced the error (`content-read`, `transform`, ...)
    pub const ERROR_KIND: &str = "error.kind";
    /// Display form of the underlying cause, when there is one
    pub const ERROR_CAUSE: &str = "error.cause";
}

/// Logical identity of a record
///
/// Ids are allocated by the queue infrastructure and are never reused.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct RecordId(u64);

impl RecordId {
    /// Wrap a raw id
    pub fn new(id: u64) -> Self {
        Self(id)
    }

    /// Raw id
    pub fn as_u64(&self) -> u64 {
        self.0
    }
}

impl fmt::Display for RecordId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "record-{}", self.0)
    }
}

/// Handle to a record's content in a content repository
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ContentClaim {
    id: u64,
    length: u64,
}

impl ContentClaim {
    /// Create a claim for `length` bytes stored under `id`
    pub fn new(id: u64, length: u64) -> Self {
        Self { id, length }
    }

    /// Repository key of the content
    pub fn id(&self) -> u64 {
        self.id
    }

    /// Content length in bytes
    pub fn length(&self) -> u64 {
        self.length
    }
}

/// A unit of data: attributes plus an opaque content blob
#[derive(Debug, Clone, PartialEq)]
pub struct Record {
    id: RecordId,
    revision: u64,
    attributes: Arc<BTreeMap<String, String>>,
    content: Option<ContentClaim>,
    entry_date: DateTime<Utc>,
    lineage_start: DateTime<Utc>,
}

impl Record {
    /// Create a root record (no parent)
    ///
    /// A fresh `uuid` attribute is always assigned, replacing any supplied
    /// value. `filename` and `path` get defaults when absent.
    pub fn create(
        id: RecordId,
        mut attributes: BTreeMap<String, String>,
        content: Option<ContentClaim>,
    ) -> Self {
        let now = Utc::now();
        let uuid = Uuid::new_v4().to_string();
        attributes
            .entry(attr::FILENAME.to_string())
            .or_insert_with(|| uuid.clone());
        attributes
            .entry(attr::PATH.to_string())
            .or_insert_with(|| "./".to_string());
        attributes.insert(attr::UUID.to_string(), uuid);
        Self {
            id,
            revision: 0,
            attributes: Arc::new(attributes),
            content,
            entry_date: now,
            lineage_start: now,
        }
    }

    /// Create a child of `parent`
    ///
    /// The child copies the parent's attributes (never its content), gets a
    /// new uuid and inherits the parent's lineage start.
    pub fn child_of(id: RecordId, parent: &Record) -> Self {
        let mut attributes = (*parent.attributes).clone();
        attributes.insert(attr::UUID.to_string(), Uuid::new_v4().to_string());
        Self {
            id,
            revision: 0,
            attributes: Arc::new(attributes),
            content: None,
            entry_date: Utc::now(),
            lineage_start: parent.lineage_start,
        }
    }

    /// Produce the next revision with new attributes and content
    ///
    /// Identity and timestamps carry over. The `uuid` attribute is pinned to
    /// the current value so it cannot be rewritten.
    pub fn revise(
        &self,
        mut attributes: BTreeMap<String, String>,
        content: Option<ContentClaim>,
    ) -> Self {
        if let Some(uuid) = self.attributes.get(attr::UUID) {
            attributes.insert(attr::UUID.to_string(), uuid.clone());
        }
        Self {
            id: self.id,
            revision: self.revision + 1,
            attributes: Arc::new(attributes),
            content,
            entry_date: self.entry_date,
            lineage_start: self.lineage_start,
        }
    }

    /// Logical identity
    pub fn id(&self) -> RecordId {
        self.id
    }

    /// Revision number, bumped by every change
    pub fn revision(&self) -> u64 {
        self.revision
    }

    /// All attributes
    pub fn attributes(&self) -> &BTreeMap<String, String> {
        &self.attributes
    }

    /// Look up one attribute
    pub fn attribute(&self, key: &str) -> Option<&str> {
        self.attributes.get(key).map(String::as_str)
    }

    /// The record's uuid attribute
    pub fn uuid(&self) -> &str {
        self.attribute(attr::UUID).unwrap_or_default()
    }

    /// Content claim, `None` when the record has never had content
    pub fn content_claim(&self) -> Option<ContentClaim> {
        self.content
    }

    /// Content size in bytes
    pub fn size(&self) -> u64 {
        self.content.map(|c| c.length()).unwrap_or(0)
    }

    /// When this record (revision lineage) entered the flow
    pub fn entry_date(&self) -> DateTime<Utc> {
        self.entry_date
    }

    /// When the oldest ancestor of this record entered the flow
    pub fn lineage_start(&self) -> DateTime<Utc> {
        self.lineage_start
    }
}

impl fmt::Display for Record {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}@{} [uuid={}, size={}]",
            self.id,
            self.revision,
            self.uuid(),
            self.size()
        )
    }
}
