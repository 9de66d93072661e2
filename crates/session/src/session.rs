//! Process session: the transaction boundary of one invocation
//!
//! A session binds every acquisition, creation, mutation and routing
//! decision made while a stage processes its input. Nothing it does is
//! visible outside until `commit()`; `rollback()` undoes all of it.
//!
//! # Lifecycle
//!
//! 1. **OPEN**: created by [`SessionFactory::create_session`](crate::SessionFactory::create_session)
//! 2. **WORK**: `acquire`, `read`, `write`, `put_attribute`, `create_child`,
//!    `transfer`, `remove`, `adjust_counter`
//! 3. **END**: exactly one of `commit()` or `rollback()`
//!
//! # Commit Sequence
//!
//! ```text
//! 1. Validate routing: every touched record removed or transferred once
//! 2. IF violations: rollback(true) and return ContractViolation
//! 3. Lock all queues
//! 4. Enqueue transferred records in routing order
//! 5. Drop removed and auto-terminated records
//! 6. Publish provenance events, apply counter deltas
//! 7. Unlock; release content no committed record references
//! ```
//!
//! Acquired inputs are already off the input queue (in-flight), so step 4
//! is also the point where their removal becomes permanent.
//!
//! # Handles
//!
//! Mutating operations take a [`Record`] by value and hand back the new
//! revision. The session keeps its own copy of the current revision and
//! rejects any handle whose revision does not match it.

use crate::error::{SessionError, SessionResult};
use crate::factory::Shared;
use crate::validation::{validate_routing, Route};
use flowstage_core::{
    ContentClaim, FlowError, ProvenanceEvent, ProvenanceEventType, Record, RecordId, Relationship,
    RelationshipSet,
};
use std::collections::{BTreeMap, HashSet};
use std::fmt;
use std::io::{self, Read, Write};
use std::sync::Arc;

/// Where a session is in its lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionStatus {
    /// Accepting operations.
    Open,
    /// Committed; terminal.
    Committed,
    /// Rolled back; terminal.
    RolledBack,
}

/// Summary of records a session currently holds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct PendingRecords {
    /// Records taken from the input queue.
    pub acquired: usize,
    /// Records created in this session.
    pub created: usize,
    /// Records with at least one routing decision.
    pub routed: usize,
    /// Records with no routing decision yet.
    pub unrouted: usize,
}

impl PendingRecords {
    /// Whether the session holds no records at all.
    pub fn is_empty(&self) -> bool {
        self.acquired + self.created == 0
    }
}

/// What a successful commit did.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct CommitSummary {
    /// Committed session.
    pub session_id: u64,
    /// Inputs permanently dequeued.
    pub received: usize,
    /// Records enqueued on relationship queues.
    pub transferred: usize,
    /// Records terminated by `remove`.
    pub removed: usize,
    /// Records routed to an auto-terminated relationship.
    pub auto_terminated: usize,
}

impl CommitSummary {
    /// Whether the commit had no effect on any queue.
    pub fn is_noop(&self) -> bool {
        self.received + self.transferred + self.removed + self.auto_terminated == 0
    }
}

#[derive(Debug)]
enum Origin {
    /// Taken from the input queue; holds the record exactly as dequeued.
    Acquired(Record),
    Created,
}

#[derive(Debug)]
struct RecordEntry {
    origin: Origin,
    current: Record,
    routes: Vec<Route>,
    first_route_seq: u64,
}

/// Transactional view over one invocation's records.
pub struct ProcessSession {
    id: u64,
    shared: Arc<Shared>,
    records: BTreeMap<RecordId, RecordEntry>,
    /// Acquisition order, for returning inputs to the queue.
    acquired: Vec<RecordId>,
    /// Claims written by this session.
    written_claims: Vec<ContentClaim>,
    events: Vec<ProvenanceEvent>,
    counter_deltas: BTreeMap<String, i64>,
    route_seq: u64,
    status: SessionStatus,
    committed: Option<CommitSummary>,
}

impl ProcessSession {
    pub(crate) fn new(id: u64, shared: Arc<Shared>) -> Self {
        Self {
            id,
            shared,
            records: BTreeMap::new(),
            acquired: Vec::new(),
            written_claims: Vec::new(),
            events: Vec::new(),
            counter_deltas: BTreeMap::new(),
            route_seq: 0,
            status: SessionStatus::Open,
            committed: None,
        }
    }

    /// Session id, unique per factory.
    pub fn id(&self) -> u64 {
        self.id
    }

    /// Lifecycle state.
    pub fn status(&self) -> SessionStatus {
        self.status
    }

    /// Whether the session still accepts operations.
    pub fn is_open(&self) -> bool {
        self.status == SessionStatus::Open
    }

    /// What the commit did, once the session has committed.
    pub fn commit_summary(&self) -> Option<CommitSummary> {
        self.committed
    }

    /// Relationships records may be transferred to.
    pub fn relationships(&self) -> &RelationshipSet {
        &self.shared.relationships
    }

    /// Records currently held.
    pub fn pending(&self) -> PendingRecords {
        let routed = self.records.values().filter(|e| !e.routes.is_empty()).count();
        PendingRecords {
            acquired: self.acquired.len(),
            created: self.records.len() - self.acquired.len(),
            routed,
            unrouted: self.records.len() - routed,
        }
    }

    // === Acquisition ===

    /// Take the next record from the input queue.
    ///
    /// Returns `Ok(None)` right away when the queue is empty. The record stays
    /// invisible to other sessions until this one commits or rolls back.
    pub fn acquire(&mut self) -> SessionResult<Option<Record>> {
        Ok(self.acquire_batch(1)?.pop())
    }

    /// Take up to `max` records from the input queue.
    pub fn acquire_batch(&mut self, max: usize) -> SessionResult<Vec<Record>> {
        self.ensure_open()?;
        let polled = self.shared.queues.poll_input(max);
        for record in &polled {
            tracing::debug!(session_id = self.id, record_id = %record.id(), "Acquired record");
            self.acquired.push(record.id());
            self.events
                .push(ProvenanceEvent::new(ProvenanceEventType::Receive, record));
            self.register(record.clone(), Origin::Acquired(record.clone()));
        }
        Ok(polled)
    }

    // === Content ===

    /// Read a record's content through a scoped stream.
    ///
    /// The stream exists only for the duration of `f` and is released on
    /// every exit path. The outer result is a fatal session error (unknown or
    /// stale record, closed session); the inner result is a recoverable
    /// content read failure the caller may route to `failure`.
    pub fn read<T, F>(&self, record: &Record, f: F) -> SessionResult<Result<T, FlowError>>
    where
        F: FnOnce(&mut dyn Read) -> io::Result<T>,
    {
        let entry = self.entry(record)?;
        let claim = match entry.current.content_claim() {
            Some(claim) => claim,
            None => {
                let mut empty = io::empty();
                return Ok(f(&mut empty).map_err(|e| {
                    FlowError::content_read(format!("failed to read content of {}", record.id()), e)
                }));
            }
        };

        let mut stream = match self.shared.content.read(&claim) {
            Ok(stream) => stream,
            Err(e) => {
                tracing::warn!(
                    session_id = self.id,
                    record_id = %record.id(),
                    claim = claim.id(),
                    error = %e,
                    "Content could not be opened"
                );
                return Ok(Err(FlowError::content_read(
                    format!("failed to open content of {}", record.id()),
                    e,
                )));
            }
        };
        let result = f(&mut stream);
        drop(stream);

        Ok(result.map_err(|e| {
            FlowError::content_read(format!("failed to read content of {}", record.id()), e)
        }))
    }

    /// Read a record's whole content into memory.
    pub fn read_to_vec(&self, record: &Record) -> SessionResult<Result<Vec<u8>, FlowError>> {
        self.read(record, |stream| {
            let mut buf = Vec::new();
            stream.read_to_end(&mut buf)?;
            Ok(buf)
        })
    }

    /// Replace a record's content.
    ///
    /// `f` writes the new content. On success the new revision is returned
    /// and `record` becomes stale. A failing writer or repository leaves the
    /// record unchanged and yields a recoverable error.
    pub fn write<F>(&mut self, record: &Record, f: F) -> SessionResult<Result<Record, FlowError>>
    where
        F: FnOnce(&mut dyn Write) -> io::Result<()>,
    {
        self.entry(record)?;

        let mut buf = Vec::new();
        if let Err(e) = f(&mut buf) {
            return Ok(Err(FlowError::content_write(
                format!("failed to write content of {}", record.id()),
                e,
            )));
        }
        let claim = match self.shared.content.write(buf) {
            Ok(claim) => claim,
            Err(e) => {
                return Ok(Err(FlowError::content_write(
                    format!("failed to store content of {}", record.id()),
                    e,
                )))
            }
        };
        self.written_claims.push(claim);

        let next = self.replace(
            record,
            |current| current.revise(current.attributes().clone(), Some(claim)),
            ProvenanceEventType::ContentModified,
        )?;
        Ok(Ok(next))
    }

    // === Attributes ===

    /// Set one attribute; consumes the handle and returns the new revision.
    pub fn put_attribute(
        &mut self,
        record: Record,
        key: impl Into<String>,
        value: impl Into<String>,
    ) -> SessionResult<Record> {
        self.put_all_attributes(record, [(key.into(), value.into())])
    }

    /// Set several attributes in one revision.
    ///
    /// Writes to `uuid` are ignored; a record's identity never changes.
    pub fn put_all_attributes<I, K, V>(&mut self, record: Record, attributes: I) -> SessionResult<Record>
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        let updates: Vec<(String, String)> = attributes
            .into_iter()
            .map(|(k, v)| (k.into(), v.into()))
            .collect();
        self.replace(
            &record,
            move |current| {
                let mut attrs = current.attributes().clone();
                attrs.extend(updates);
                current.revise(attrs, current.content_claim())
            },
            ProvenanceEventType::AttributesModified,
        )
    }

    /// Remove one attribute; consumes the handle and returns the new revision.
    pub fn remove_attribute(&mut self, record: Record, key: &str) -> SessionResult<Record> {
        self.replace(
            &record,
            |current| {
                let mut attrs = current.attributes().clone();
                attrs.remove(key);
                current.revise(attrs, current.content_claim())
            },
            ProvenanceEventType::AttributesModified,
        )
    }

    // === Creation ===

    /// Create a brand-new record with no content.
    pub fn create(&mut self) -> SessionResult<Record> {
        self.ensure_open()?;
        let record = Record::create(self.shared.queues.allocate_id(), BTreeMap::new(), None);
        self.events
            .push(ProvenanceEvent::new(ProvenanceEventType::Create, &record));
        self.register(record.clone(), Origin::Created);
        Ok(record)
    }

    /// Create a record copying `parent`'s attributes (never its content).
    pub fn create_child(&mut self, parent: &Record) -> SessionResult<Record> {
        let parent = self.entry(parent)?.current.clone();
        let child = Record::child_of(self.shared.queues.allocate_id(), &parent);
        self.events.push(
            ProvenanceEvent::new(ProvenanceEventType::Fork, &child)
                .with_details(format!("parent={}", parent.uuid())),
        );
        self.register(child.clone(), Origin::Created);
        Ok(child)
    }

    // === Routing ===

    /// Terminate a record on commit.
    pub fn remove(&mut self, record: Record) -> SessionResult<()> {
        self.route(record, Route::Remove)
    }

    /// Deliver a record to `relationship` on commit.
    ///
    /// # Errors
    /// `UndeclaredRelationship` if the stage never declared `relationship`.
    pub fn transfer(&mut self, record: Record, relationship: &Relationship) -> SessionResult<()> {
        self.ensure_open()?;
        if !self.shared.relationships.contains(relationship) {
            return Err(SessionError::UndeclaredRelationship(
                relationship.name().to_string(),
            ));
        }
        self.route(record, Route::Transfer(relationship.clone()))
    }

    // === Counters ===

    /// Adjust a named counter; applied only if the session commits.
    pub fn adjust_counter(&mut self, name: impl Into<String>, delta: i64) -> SessionResult<()> {
        self.ensure_open()?;
        *self.counter_deltas.entry(name.into()).or_insert(0) += delta;
        Ok(())
    }

    // === Commit / Rollback ===

    /// Atomically apply every routing decision.
    ///
    /// On a routing violation the session rolls back (returning inputs to
    /// the queue) and the violation is returned; the session is closed either
    /// way.
    pub fn commit(&mut self) -> SessionResult<CommitSummary> {
        self.ensure_open()?;

        let validation = validate_routing(
            self.records
                .values()
                .map(|e| (&e.current, e.routes.as_slice())),
        );
        if !validation.is_valid() {
            tracing::error!(
                session_id = self.id,
                violations = validation.violation_count(),
                "Commit rejected: records not routed exactly once, rolling back"
            );
            self.rollback_inner(true);
            return Err(SessionError::ContractViolation(validation.violations));
        }

        let mut entries: Vec<RecordEntry> = std::mem::take(&mut self.records).into_values().collect();
        entries.sort_by_key(|e| e.first_route_seq);

        let mut summary = CommitSummary {
            session_id: self.id,
            received: self.acquired.len(),
            ..CommitSummary::default()
        };
        let mut events = std::mem::take(&mut self.events);
        let mut candidates: Vec<ContentClaim> = std::mem::take(&mut self.written_claims);
        let mut live_claims: HashSet<ContentClaim> = HashSet::new();

        {
            let mut queues = self.shared.queues.lock();
            for entry in entries {
                if let Origin::Acquired(original) = &entry.origin {
                    candidates.extend(original.content_claim());
                }
                let record = entry.current;
                let claim = record.content_claim();
                match entry.routes.into_iter().next() {
                    Some(Route::Transfer(rel)) => {
                        let routed = ProvenanceEvent::new(ProvenanceEventType::Route, &record)
                            .with_relationship(rel.name());
                        match queues.push_output(rel.name(), record) {
                            None => {
                                live_claims.extend(claim);
                                events.push(routed);
                                summary.transferred += 1;
                            }
                            Some(dropped) => {
                                events.push(
                                    ProvenanceEvent::new(ProvenanceEventType::Drop, &dropped)
                                        .with_relationship(rel.name())
                                        .with_details("auto-terminated"),
                                );
                                summary.auto_terminated += 1;
                            }
                        }
                    }
                    Some(Route::Remove) | None => {
                        events.push(
                            ProvenanceEvent::new(ProvenanceEventType::Drop, &record)
                                .with_details("removed"),
                        );
                        summary.removed += 1;
                    }
                }
            }
            self.shared.provenance.publish(events);
            self.shared.counters.apply(&self.counter_deltas);
        }

        for claim in candidates {
            if !live_claims.contains(&claim) {
                self.shared.content.release(&claim);
            }
        }

        self.acquired.clear();
        self.counter_deltas.clear();
        self.status = SessionStatus::Committed;
        self.committed = Some(summary);

        tracing::debug!(
            session_id = self.id,
            received = summary.received,
            transferred = summary.transferred,
            removed = summary.removed,
            auto_terminated = summary.auto_terminated,
            "Session committed"
        );
        Ok(summary)
    }

    /// Undo everything this session did.
    ///
    /// With `return_inputs` the acquired records go back to the front of the
    /// input queue, unchanged and in acquisition order. Without it they are
    /// dropped. Relationship queues are never touched.
    pub fn rollback(&mut self, return_inputs: bool) -> SessionResult<()> {
        self.ensure_open()?;
        self.rollback_inner(return_inputs);
        Ok(())
    }

    fn rollback_inner(&mut self, return_inputs: bool) {
        let mut records = std::mem::take(&mut self.records);
        let originals: Vec<Record> = self
            .acquired
            .drain(..)
            .filter_map(|id| match records.remove(&id) {
                Some(RecordEntry {
                    origin: Origin::Acquired(original),
                    ..
                }) => Some(original),
                _ => None,
            })
            .collect();
        let discarded = records.len();

        for claim in self.written_claims.drain(..) {
            self.shared.content.release(&claim);
        }

        let returned = originals.len();
        if return_inputs {
            self.shared.queues.requeue_front(originals);
        } else {
            for original in &originals {
                if let Some(claim) = original.content_claim() {
                    self.shared.content.release(&claim);
                }
            }
        }

        self.events.clear();
        self.counter_deltas.clear();
        self.status = SessionStatus::RolledBack;

        tracing::debug!(
            session_id = self.id,
            inputs = returned,
            returned_to_queue = return_inputs,
            discarded_created = discarded,
            "Session rolled back"
        );
    }

    // === Internals ===

    fn ensure_open(&self) -> SessionResult<()> {
        if self.status == SessionStatus::Open {
            Ok(())
        } else {
            Err(SessionError::SessionClosed(self.id))
        }
    }

    fn register(&mut self, record: Record, origin: Origin) {
        self.records.insert(
            record.id(),
            RecordEntry {
                origin,
                current: record,
                routes: Vec::new(),
                first_route_seq: u64::MAX,
            },
        );
    }

    fn entry(&self, record: &Record) -> SessionResult<&RecordEntry> {
        self.ensure_open()?;
        let entry = self
            .records
            .get(&record.id())
            .ok_or(SessionError::UnknownRecord(record.id()))?;
        check_revision(entry, record)?;
        Ok(entry)
    }

    fn entry_mut(&mut self, record: &Record) -> SessionResult<&mut RecordEntry> {
        self.ensure_open()?;
        let entry = self
            .records
            .get_mut(&record.id())
            .ok_or(SessionError::UnknownRecord(record.id()))?;
        check_revision(entry, record)?;
        Ok(entry)
    }

    /// Swap in the next revision produced by `f` and record an event.
    fn replace<F>(&mut self, record: &Record, f: F, event: ProvenanceEventType) -> SessionResult<Record>
    where
        F: FnOnce(&Record) -> Record,
    {
        let entry = self.entry_mut(record)?;
        let next = f(&entry.current);
        entry.current = next.clone();
        self.events.push(ProvenanceEvent::new(event, &next));
        Ok(next)
    }

    fn route(&mut self, record: Record, route: Route) -> SessionResult<()> {
        let seq = self.route_seq;
        let session_id = self.id;
        let entry = self.entry_mut(&record)?;
        if entry.routes.is_empty() {
            entry.first_route_seq = seq;
        }
        tracing::trace!(
            session_id,
            record_id = %record.id(),
            route = %route.describe(),
            "Routing decision"
        );
        entry.routes.push(route);
        self.route_seq += 1;
        Ok(())
    }
}

fn check_revision(entry: &RecordEntry, record: &Record) -> SessionResult<()> {
    if entry.current.revision() == record.revision() {
        Ok(())
    } else {
        Err(SessionError::StaleRecord {
            id: record.id(),
            given: record.revision(),
            current: entry.current.revision(),
        })
    }
}

impl Drop for ProcessSession {
    fn drop(&mut self) {
        if self.status != SessionStatus::Open {
            return;
        }
        if !self.records.is_empty() {
            tracing::warn!(
                session_id = self.id,
                records = self.records.len(),
                "Session dropped while open, rolling back and returning inputs"
            );
        }
        self.rollback_inner(true);
    }
}

impl fmt::Debug for ProcessSession {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ProcessSession")
            .field("id", &self.id)
            .field("status", &self.status)
            .field("pending", &self.pending())
            .finish()
    }
}
