//! Content repository
//!
//! Record content lives outside the record itself, addressed by a
//! [`ContentClaim`]. Content is immutable once written: replacing a record's
//! content writes a new claim, so rolling back only has to release the new
//! claims and the original bytes are never touched.

use dashmap::DashMap;
use flowstage_core::ContentClaim;
use std::io::{self, Cursor, Read};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

/// Storage for record content.
pub trait ContentRepository: Send + Sync {
    /// Open a reader over the claimed content.
    ///
    /// The returned reader borrows the repository; callers keep it scoped to
    /// a single read.
    fn read(&self, claim: &ContentClaim) -> io::Result<Box<dyn Read + '_>>;

    /// Store `content` and return a claim for it.
    fn write(&self, content: Vec<u8>) -> io::Result<ContentClaim>;

    /// Release a claim that no record references any more.
    fn release(&self, claim: &ContentClaim);
}

/// Content repository backed by a concurrent in-memory map.
#[derive(Debug)]
pub struct InMemoryContentRepository {
    blobs: DashMap<u64, Arc<[u8]>>,
    next_id: AtomicU64,
}

impl InMemoryContentRepository {
    /// Create an empty repository.
    pub fn new() -> Self {
        Self {
            blobs: DashMap::new(),
            next_id: AtomicU64::new(1),
        }
    }

    /// Whether the claim is still held.
    pub fn contains(&self, claim: &ContentClaim) -> bool {
        self.blobs.contains_key(&claim.id())
    }

    /// Number of live claims.
    pub fn len(&self) -> usize {
        self.blobs.len()
    }

    /// Whether no claims are held.
    pub fn is_empty(&self) -> bool {
        self.blobs.is_empty()
    }
}

impl Default for InMemoryContentRepository {
    fn default() -> Self {
        Self::new()
    }
}

impl ContentRepository for InMemoryContentRepository {
    fn read(&self, claim: &ContentClaim) -> io::Result<Box<dyn Read + '_>> {
        // Clone the Arc so the shard lock is released before reading
        let blob = self
            .blobs
            .get(&claim.id())
            .map(|entry| Arc::clone(entry.value()))
            .ok_or_else(|| {
                io::Error::new(
                    io::ErrorKind::NotFound,
                    format!("content claim {} not found", claim.id()),
                )
            })?;
        Ok(Box::new(Cursor::new(blob)))
    }

    fn write(&self, content: Vec<u8>) -> io::Result<ContentClaim> {
        let id = self.next_id.fetch_add(1, Ordering::SeqCst);
        let claim = ContentClaim::new(id, content.len() as u64);
        self.blobs.insert(id, content.into());
        Ok(claim)
    }

    fn release(&self, claim: &ContentClaim) {
        self.blobs.remove(&claim.id());
    }
}

/// Read a claim fully into memory.
pub fn read_all(repo: &dyn ContentRepository, claim: &ContentClaim) -> io::Result<Vec<u8>> {
    let mut reader = repo.read(claim)?;
    let mut buf = Vec::with_capacity(claim.length() as usize);
    reader.read_to_end(&mut buf)?;
    Ok(buf)
}
