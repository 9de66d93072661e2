//! Flow queues
//!
//! The input queue and one outbound queue per connected relationship, all
//! behind a single lock. One lock for every queue is what makes commit
//! atomic: a session enqueues all of its transferred records while holding
//! the guard, so an observer sees either none or all of them.
//!
//! Relationships without a queue are auto-terminated: records routed to them
//! are dropped at commit.

use flowstage_core::{Record, RecordId, RelationshipSet};
use parking_lot::{Mutex, MutexGuard};
use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicU64, Ordering};

/// Queue contents, accessed under the [`FlowQueues`] lock.
#[derive(Debug, Default)]
pub(crate) struct QueueState {
    input: VecDeque<Record>,
    outputs: HashMap<String, VecDeque<Record>>,
}

impl QueueState {
    /// Append to a relationship's queue.
    ///
    /// Returns the record back when the relationship is auto-terminated.
    pub(crate) fn push_output(&mut self, relationship: &str, record: Record) -> Option<Record> {
        match self.outputs.get_mut(relationship) {
            Some(queue) => {
                queue.push_back(record);
                None
            }
            None => Some(record),
        }
    }
}

/// FIFO queues surrounding one stage.
#[derive(Debug)]
pub struct FlowQueues {
    state: Mutex<QueueState>,
    next_record_id: AtomicU64,
}

impl FlowQueues {
    /// Create queues for every relationship not listed in `auto_terminated`.
    pub fn new<S: AsRef<str>>(relationships: &RelationshipSet, auto_terminated: &[S]) -> Self {
        let outputs = relationships
            .iter()
            .filter(|rel| !auto_terminated.iter().any(|a| a.as_ref() == rel.name()))
            .map(|rel| (rel.name().to_string(), VecDeque::new()))
            .collect();
        Self {
            state: Mutex::new(QueueState {
                input: VecDeque::new(),
                outputs,
            }),
            next_record_id: AtomicU64::new(1),
        }
    }

    /// Allocate a never-reused record id.
    pub fn allocate_id(&self) -> RecordId {
        RecordId::new(self.next_record_id.fetch_add(1, Ordering::SeqCst))
    }

    /// Append a record to the input queue.
    pub fn enqueue_input(&self, record: Record) {
        self.state.lock().input.push_back(record);
    }

    /// Whether `relationship` has a queue (is not auto-terminated).
    pub fn has_queue(&self, relationship: &str) -> bool {
        self.state.lock().outputs.contains_key(relationship)
    }

    /// Records waiting on the input queue.
    pub fn input_len(&self) -> usize {
        self.state.lock().input.len()
    }

    /// Records waiting on a relationship's queue (0 when it has none).
    pub fn output_len(&self, relationship: &str) -> usize {
        self.state
            .lock()
            .outputs
            .get(relationship)
            .map(VecDeque::len)
            .unwrap_or(0)
    }

    /// Copy of the input queue, front first.
    pub fn snapshot_input(&self) -> Vec<Record> {
        self.state.lock().input.iter().cloned().collect()
    }

    /// Copy of a relationship's queue, front first.
    pub fn snapshot_output(&self, relationship: &str) -> Vec<Record> {
        self.state
            .lock()
            .outputs
            .get(relationship)
            .map(|q| q.iter().cloned().collect())
            .unwrap_or_default()
    }

    /// Take everything from a relationship's queue.
    ///
    /// Stands in for the downstream stage consuming its input.
    pub fn drain_output(&self, relationship: &str) -> Vec<Record> {
        self.state
            .lock()
            .outputs
            .get_mut(relationship)
            .map(|q| q.drain(..).collect())
            .unwrap_or_default()
    }

    /// Total records on all outbound queues.
    pub fn total_output_len(&self) -> usize {
        self.state.lock().outputs.values().map(VecDeque::len).sum()
    }

    /// Dequeue up to `max` records from the input queue; never blocks.
    pub(crate) fn poll_input(&self, max: usize) -> Vec<Record> {
        let mut state = self.state.lock();
        let n = max.min(state.input.len());
        state.input.drain(..n).collect()
    }

    /// Put records back at the front of the input queue, keeping their order.
    pub(crate) fn requeue_front(&self, records: Vec<Record>) {
        if records.is_empty() {
            return;
        }
        let mut state = self.state.lock();
        for record in records.into_iter().rev() {
            state.input.push_front(record);
        }
    }

    /// Hold the lock over all queues for an atomic multi-queue update.
    pub(crate) fn lock(&self) -> MutexGuard<'_, QueueState> {
        self.state.lock()
    }
}
