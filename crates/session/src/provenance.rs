//! Committed provenance events and counters
//!
//! Both are append/accumulate-only and receive a session's contributions
//! in one step at commit. Nothing is published for a rolled-back session.

use dashmap::DashMap;
use flowstage_core::{ProvenanceEvent, ProvenanceEventType, RecordId};
use parking_lot::Mutex;
use std::collections::BTreeMap;

/// In-memory log of committed provenance events
#[derive(Debug, Default)]
pub struct ProvenanceRepository {
    events: Mutex<Vec<ProvenanceEvent>>,
}

impl ProvenanceRepository {
    /// Create an empty repository
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a committed session's events
    pub(crate) fn publish(&self, events: Vec<ProvenanceEvent>) {
        if events.is_empty() {
            return;
        }
        self.events.lock().extend(events);
    }

    /// All events in commit order
    pub fn events(&self) -> Vec<ProvenanceEvent> {
        self.events.lock().clone()
    }

    /// Events for one record
    pub fn events_for(&self, id: RecordId) -> Vec<ProvenanceEvent> {
        self.events
            .lock()
            .iter()
            .filter(|e| e.record_id == id)
            .cloned()
            .collect()
    }

    /// Number of events of a given type
    pub fn count(&self, event_type: ProvenanceEventType) -> usize {
        self.events
            .lock()
            .iter()
            .filter(|e| e.event_type == event_type)
            .count()
    }

    /// Total events
    pub fn len(&self) -> usize {
        self.events.lock().len()
    }

    /// Whether nothing was ever committed
    pub fn is_empty(&self) -> bool {
        self.events.lock().is_empty()
    }
}

/// Named counters shared by all sessions of a stage
#[derive(Debug, Default)]
pub struct Counters {
    values: DashMap<String, i64>,
}

impl Counters {
    /// Create an empty counter set
    pub fn new() -> Self {
        Self::default()
    }

    /// Apply a committed session's deltas
    pub(crate) fn apply(&self, deltas: &BTreeMap<String, i64>) {
        for (name, delta) in deltas {
            *self.values.entry(name.clone()).or_insert(0) += delta;
        }
    }

    /// Current value (0 for counters never touched)
    pub fn get(&self, name: &str) -> i64 {
        self.values.get(name).map(|v| *v).unwrap_or(0)
    }

    /// Copy of all counters, name ordered
    pub fn snapshot(&self) -> BTreeMap<String, i64> {
        self.values
            .iter()
            .map(|entry| (entry.key().clone(), *entry.value()))
            .collect()
    }
}
