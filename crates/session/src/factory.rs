//! Session factory
//!
//! Owns the infrastructure one stage is wired to (queues, content,
//! provenance, counters) and hands out one [`ProcessSession`] per
//! invocation. The factory is cheap to clone and safe to share across
//! threads; concurrent invocations each get their own session.

use crate::content::{read_all, ContentRepository, InMemoryContentRepository};
use crate::provenance::{Counters, ProvenanceRepository};
use crate::queue::FlowQueues;
use crate::session::ProcessSession;
use flowstage_core::{Record, RelationshipSet};
use std::collections::BTreeMap;
use std::fmt;
use std::io;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

/// State shared by every session of one stage.
pub(crate) struct Shared {
    pub(crate) relationships: RelationshipSet,
    pub(crate) queues: FlowQueues,
    pub(crate) content: Arc<dyn ContentRepository>,
    pub(crate) provenance: ProvenanceRepository,
    pub(crate) counters: Counters,
    next_session_id: AtomicU64,
}

/// Creates sessions bound to one stage's queues.
#[derive(Clone)]
pub struct SessionFactory {
    shared: Arc<Shared>,
}

impl SessionFactory {
    /// Factory with in-memory content and a queue for every relationship.
    pub fn new(relationships: RelationshipSet) -> Self {
        Self::builder(relationships).build()
    }

    /// Start configuring a factory.
    pub fn builder(relationships: RelationshipSet) -> SessionFactoryBuilder {
        SessionFactoryBuilder {
            relationships,
            content: None,
            auto_terminated: Vec::new(),
        }
    }

    /// Open a new session.
    pub fn create_session(&self) -> ProcessSession {
        let id = self.shared.next_session_id.fetch_add(1, Ordering::SeqCst);
        ProcessSession::new(id, Arc::clone(&self.shared))
    }

    /// Put a new record on the input queue (host side).
    ///
    /// # Errors
    /// Returns the content repository's error if the content cannot be stored.
    pub fn enqueue(
        &self,
        attributes: BTreeMap<String, String>,
        content: impl Into<Vec<u8>>,
    ) -> io::Result<Record> {
        let claim = self.shared.content.write(content.into())?;
        let record = Record::create(self.shared.queues.allocate_id(), attributes, Some(claim));
        self.shared.queues.enqueue_input(record.clone());
        Ok(record)
    }

    /// Read a record's content outside any session (host side inspection).
    pub fn read_content(&self, record: &Record) -> io::Result<Vec<u8>> {
        match record.content_claim() {
            Some(claim) => read_all(self.shared.content.as_ref(), &claim),
            None => Ok(Vec::new()),
        }
    }

    /// Declared relationships.
    pub fn relationships(&self) -> &RelationshipSet {
        &self.shared.relationships
    }

    /// The stage's queues.
    pub fn queues(&self) -> &FlowQueues {
        &self.shared.queues
    }

    /// Content repository.
    pub fn content_repository(&self) -> &Arc<dyn ContentRepository> {
        &self.shared.content
    }

    /// Committed provenance events.
    pub fn provenance(&self) -> &ProvenanceRepository {
        &self.shared.provenance
    }

    /// Committed counters.
    pub fn counters(&self) -> &Counters {
        &self.shared.counters
    }
}

impl fmt::Debug for SessionFactory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SessionFactory")
            .field("relationships", &self.shared.relationships.names())
            .field("input_len", &self.shared.queues.input_len())
            .finish()
    }
}

/// Builder for [`SessionFactory`].
pub struct SessionFactoryBuilder {
    relationships: RelationshipSet,
    content: Option<Arc<dyn ContentRepository>>,
    auto_terminated: Vec<String>,
}

impl SessionFactoryBuilder {
    /// Use a specific content repository.
    pub fn content_repository(mut self, content: Arc<dyn ContentRepository>) -> Self {
        self.content = Some(content);
        self
    }

    /// Drop records routed to these relationships instead of queueing them.
    pub fn auto_terminate<I, S>(mut self, relationships: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.auto_terminated
            .extend(relationships.into_iter().map(Into::into));
        self
    }

    /// Build the factory.
    pub fn build(self) -> SessionFactory {
        let content = self
            .content
            .unwrap_or_else(|| Arc::new(InMemoryContentRepository::new()));
        let queues = FlowQueues::new(&self.relationships, &self.auto_terminated);
        SessionFactory {
            shared: Arc::new(Shared {
                relationships: self.relationships,
                queues,
                content,
                provenance: ProvenanceRepository::new(),
                counters: Counters::new(),
                next_session_id: AtomicU64::new(1),
            }),
        }
    }
}
