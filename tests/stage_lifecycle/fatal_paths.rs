//! Fatal paths: contract violations, misuse and panics roll the invocation
//! back and leave the input queued, unchanged. Stage logic that ends its own
//! session is covered here too.

use crate::common::*;
use flowstage::{
    LogLevel, ProcessContext, ProcessSession, ProcessorResult, Relationship, RelationshipSet,
    Violation,
};
use std::io::Write;
use std::panic::{self, AssertUnwindSafe};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

const SUCCESS: Relationship = Relationship::from_static("success", "processed");
const FAILURE: Relationship = Relationship::from_static("failure", "not processed");

/// Stage whose trigger body is a closure
struct Scripted<F> {
    relationships: RelationshipSet,
    body: F,
}

impl<F> Processor for Scripted<F>
where
    F: Fn(&mut ProcessSession) -> ProcessorResult<()> + Send + Sync,
{
    fn identifier(&self) -> &str {
        "scripted"
    }

    fn relationships(&self) -> &RelationshipSet {
        &self.relationships
    }

    fn on_trigger(&self, _context: &ProcessContext, session: &mut ProcessSession) -> ProcessorResult<()> {
        (self.body)(session)
    }
}

fn scripted<F>(body: F) -> StageRunner<Scripted<F>>
where
    F: Fn(&mut ProcessSession) -> ProcessorResult<()> + Send + Sync,
{
    scripted_logged(body).0
}

fn scripted_logged<F>(body: F) -> (StageRunner<Scripted<F>>, Arc<MemoryLog>)
where
    F: Fn(&mut ProcessSession) -> ProcessorResult<()> + Send + Sync,
{
    let log = Arc::new(MemoryLog::new());
    let runner = StageRunner::builder(Scripted {
        relationships: RelationshipSet::new([SUCCESS, FAILURE]),
        body,
    })
    .logger(log.clone())
    .build()
    .unwrap();
    (runner, log)
}

fn assert_input_restored<P: Processor>(runner: &StageRunner<P>, original: &Record) {
    let queued = runner.factory().queues().snapshot_input();
    assert_eq!(queued.len(), 1);
    assert_same_record(runner, &queued[0], original);
    assert_eq!(runner.factory().queues().total_output_len(), 0);
    assert!(runner.factory().provenance().is_empty());
}

#[test]
fn unrouted_record_fails_commit_and_rolls_back() {
    let runner = scripted(|session| {
        let record = session.acquire()?.expect("queued record");
        let _annotated = session.put_attribute(record, "touched", "yes")?;
        Ok(())
    });
    let original = runner.enqueue(attrs(&[("k", "v")]), "data").unwrap();

    let err = runner.run_once().unwrap_err();
    match err {
        ProcessorError::Session(SessionError::ContractViolation(violations)) => {
            assert_eq!(violations.len(), 1);
            assert!(matches!(violations[0], Violation::Unrouted { .. }));
        }
        other => panic!("unexpected error: {other}"),
    }
    assert_input_restored(&runner, &original);
}

#[test]
fn double_routed_record_fails_commit() {
    let runner = scripted(|session| {
        let record = session.acquire()?.expect("queued record");
        session.transfer(record.clone(), &SUCCESS)?;
        session.transfer(record, &FAILURE)?;
        Ok(())
    });
    let original = runner.enqueue(attrs(&[]), "data").unwrap();

    let err = runner.run_once().unwrap_err();
    match err {
        ProcessorError::Session(SessionError::ContractViolation(violations)) => {
            assert!(matches!(violations[0], Violation::MultiplyRouted { .. }));
        }
        other => panic!("unexpected error: {other}"),
    }
    assert_input_restored(&runner, &original);
}

#[test]
fn undeclared_relationship_is_fatal() {
    let runner = scripted(|session| {
        let record = session.acquire()?.expect("queued record");
        session.transfer(record, &Relationship::new("elsewhere", "not declared"))?;
        Ok(())
    });
    let original = runner.enqueue(attrs(&[]), "data").unwrap();

    let err = runner.run_once().unwrap_err();
    assert!(matches!(
        err,
        ProcessorError::Session(SessionError::UndeclaredRelationship(ref name)) if name == "elsewhere"
    ));
    assert_input_restored(&runner, &original);
}

#[test]
fn stale_handle_is_fatal() {
    let runner = scripted(|session| {
        let record = session.acquire()?.expect("queued record");
        let stale = record.clone();
        let current = session.put_attribute(record, "step", "1")?;
        session.transfer(stale, &SUCCESS)?;
        session.remove(current)?;
        Ok(())
    });
    let original = runner.enqueue(attrs(&[]), "data").unwrap();

    let err = runner.run_once().unwrap_err();
    assert!(matches!(err, ProcessorError::Session(SessionError::StaleRecord { .. })));
    assert_input_restored(&runner, &original);
}

#[test]
fn stage_error_after_mutation_restores_input() {
    let runner = scripted(|session| {
        let record = session.acquire()?.expect("queued record");
        let record = session.put_attribute(record, "k", "changed")?;
        let record = session
            .write(&record, |out| out.write_all(b"rewritten"))?
            .map_err(|e| ProcessorError::processing_with("write failed", e))?;
        let child = session.create_child(&record)?;
        session.transfer(child, &SUCCESS)?;
        Err(ProcessorError::processing("substrate unavailable"))
    });
    let original = runner.enqueue(attrs(&[("k", "v")]), "data").unwrap();

    let err = runner.run_once().unwrap_err();
    assert!(matches!(err, ProcessorError::Processing { .. }));
    assert_input_restored(&runner, &original);
    assert_eq!(runner.content(&original).unwrap(), b"data");
}

#[test]
fn panic_in_stage_logic_returns_input() {
    let explode = Arc::new(AtomicBool::new(true));
    let runner = {
        let explode = Arc::clone(&explode);
        scripted(move |session| {
            let Some(record) = session.acquire()? else {
                return Ok(());
            };
            let record = session.put_attribute(record, "k", "changed")?;
            if explode.load(Ordering::SeqCst) {
                panic!("stage logic blew up");
            }
            session.remove(record)?;
            Ok(())
        })
    };
    let original = runner.enqueue(attrs(&[("k", "v")]), "data").unwrap();

    let outcome = panic::catch_unwind(AssertUnwindSafe(|| runner.run_once()));
    assert!(outcome.is_err());
    assert_input_restored(&runner, &original);

    // The returned input is processable again
    explode.store(false, Ordering::SeqCst);
    assert_eq!(runner.run_once().unwrap().received, 1);
    assert_eq!(runner.factory().queues().input_len(), 0);
}

#[test]
fn failed_invocation_stops_run_until_empty() {
    let runner = scripted(|session| {
        let _ = session.acquire()?;
        Ok(())
    });
    runner.enqueue(attrs(&[]), "a").unwrap();
    runner.enqueue(attrs(&[]), "b").unwrap();

    let report = runner.run_until_empty();
    assert_eq!(report.invocations, 1);
    assert_eq!(report.errors.len(), 1);
    assert_eq!(runner.factory().queues().input_len(), 2);
}

#[test]
fn stage_side_commit_is_reported_as_committed() {
    let (runner, log) = scripted_logged(|session| {
        let record = session.acquire()?.expect("queued record");
        session.transfer(record, &SUCCESS)?;
        session.commit()?;
        Ok(())
    });
    runner.enqueue(attrs(&[]), "data").unwrap();

    let summary = runner.run_once().unwrap();
    assert_eq!(summary.received, 1);
    assert_eq!(summary.transferred, 1);
    assert_eq!(runner.factory().queues().input_len(), 0);
    assert_eq!(runner.output("success").len(), 1);
    assert!(log.at_level(LogLevel::Error).is_empty());
}

#[test]
fn stage_error_after_own_commit_keeps_committed_work() {
    let (runner, log) = scripted_logged(|session| {
        let record = session.acquire()?.expect("queued record");
        session.transfer(record, &SUCCESS)?;
        session.commit()?;
        Err(ProcessorError::processing("late failure"))
    });
    runner.enqueue(attrs(&[]), "data").unwrap();

    let err = runner.run_once().unwrap_err();
    assert!(matches!(err, ProcessorError::Processing { ref message, .. } if message == "late failure"));
    assert_eq!(runner.factory().queues().input_len(), 0);
    assert_eq!(runner.output("success").len(), 1);

    let errors = log.at_level(LogLevel::Error);
    assert_eq!(errors.len(), 1);
    assert!(errors[0].message.contains("committed work kept"));
    assert!(!errors[0].message.contains("rolled back"));
}

#[test]
fn stage_side_rollback_returns_input() {
    let (runner, log) = scripted_logged(|session| {
        let record = session.acquire()?.expect("queued record");
        let _changed = session.put_attribute(record, "k", "changed")?;
        session.rollback(true)?;
        Ok(())
    });
    let original = runner.enqueue(attrs(&[("k", "v")]), "data").unwrap();

    let summary = runner.run_once().unwrap();
    assert!(summary.is_noop());
    assert_input_restored(&runner, &original);
    assert!(log.at_level(LogLevel::Error).is_empty());
}
