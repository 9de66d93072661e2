//! Shared test utilities for the integration test suites.
//!
//! Import via `#[path = "../common/mod.rs"] mod common;` from a suite's main.rs.

#![allow(dead_code)]

use std::collections::BTreeMap;
use std::io::{self, Read};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

pub use flowstage::{
    attr, CaseConvert, ContentClaim, ContentRepository, InMemoryContentRepository, MemoryLog,
    Processor, ProcessorError, Record, SessionError, StageConfig, StageRunner,
};

// ============================================================================
// Builders
// ============================================================================

/// Attribute map from string pairs
pub fn attrs(pairs: &[(&str, &str)]) -> BTreeMap<String, String> {
    pairs
        .iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect()
}

/// CaseConvert runner with default configuration and a capturing logger
pub fn case_runner() -> (StageRunner<CaseConvert>, Arc<MemoryLog>) {
    case_runner_with(StageConfig::default())
}

/// CaseConvert runner with `config` and a capturing logger
pub fn case_runner_with(config: StageConfig) -> (StageRunner<CaseConvert>, Arc<MemoryLog>) {
    let log = Arc::new(MemoryLog::new());
    let runner = StageRunner::builder(CaseConvert::new())
        .config(config)
        .logger(log.clone())
        .build()
        .unwrap();
    (runner, log)
}

// ============================================================================
// Failing content repository
// ============================================================================

/// Content repository whose reads or writes can be switched to fail
///
/// Storage is an in-memory repository. While `fail_reads` is set every read
/// fails with an I/O error, and likewise for writes with `fail_writes`.
#[derive(Default)]
pub struct FlakyContentRepository {
    inner: InMemoryContentRepository,
    fail_reads: AtomicBool,
    fail_writes: AtomicBool,
}

impl FlakyContentRepository {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_fail_reads(&self, fail: bool) {
        self.fail_reads.store(fail, Ordering::SeqCst);
    }

    pub fn set_fail_writes(&self, fail: bool) {
        self.fail_writes.store(fail, Ordering::SeqCst);
    }

    pub fn live_claims(&self) -> usize {
        self.inner.len()
    }
}

impl ContentRepository for FlakyContentRepository {
    fn read(&self, claim: &ContentClaim) -> io::Result<Box<dyn Read + '_>> {
        if self.fail_reads.load(Ordering::SeqCst) {
            return Err(io::Error::new(io::ErrorKind::Other, "simulated device failure"));
        }
        self.inner.read(claim)
    }

    fn write(&self, content: Vec<u8>) -> io::Result<ContentClaim> {
        if self.fail_writes.load(Ordering::SeqCst) {
            return Err(io::Error::new(io::ErrorKind::Other, "simulated disk full"));
        }
        self.inner.write(content)
    }

    fn release(&self, claim: &ContentClaim) {
        self.inner.release(claim)
    }
}

/// CaseConvert runner over a [`FlakyContentRepository`]
pub fn flaky_runner() -> (StageRunner<CaseConvert>, Arc<FlakyContentRepository>) {
    let content = Arc::new(FlakyContentRepository::new());
    let runner = StageRunner::builder(CaseConvert::new())
        .logger(Arc::new(MemoryLog::new()))
        .content_repository(content.clone())
        .build()
        .unwrap();
    (runner, content)
}

// ============================================================================
// Assertions
// ============================================================================

/// Content of every record queued on `relationship`
pub fn output_contents<P: Processor>(runner: &StageRunner<P>, relationship: &str) -> Vec<Vec<u8>> {
    runner
        .output(relationship)
        .iter()
        .map(|r| runner.content(r).unwrap())
        .collect()
}

/// Assert two records are the same unit, byte-for-byte
pub fn assert_same_record<P: Processor>(runner: &StageRunner<P>, a: &Record, b: &Record) {
    assert_eq!(a.id(), b.id());
    assert_eq!(a.uuid(), b.uuid());
    assert_eq!(a.attributes(), b.attributes());
    assert_eq!(runner.content(a).unwrap(), runner.content(b).unwrap());
}
