//! The three reference scenarios: successful conversion, failed content read,
//! and two invocations racing for a single record.

use crate::common::*;
use flowstage::case_convert::{COUNTER_FAILURE, GOOD_EXAMPLE_ATTRIBUTE, READ_FAILURE_MESSAGE};
use flowstage::FlowErrorKind;
use std::sync::{Arc, Barrier};
use std::thread;

#[test]
fn abc_is_converted_and_routed_to_success() {
    let (runner, _log) = case_runner();
    let input = runner.enqueue(attrs(&[]), "abc").unwrap();

    runner.run_once().unwrap();

    let out = runner.output("success");
    assert_eq!(out.len(), 1);
    assert_eq!(out[0].attribute(GOOD_EXAMPLE_ATTRIBUTE), Some("sure"));
    assert!(out[0].content_claim().is_some());
    assert_eq!(runner.content(&out[0]).unwrap(), b"ABC");
    assert!(runner
        .factory()
        .queues()
        .snapshot_input()
        .iter()
        .all(|r| r.id() != input.id()));
    assert_eq!(runner.factory().queues().input_len(), 0);
}

#[test]
fn read_failure_routes_original_to_failure() {
    let (runner, content) = flaky_runner();
    let input = runner
        .enqueue(attrs(&[(attr::FILENAME, "report.txt"), ("owner", "ops")]), "payload")
        .unwrap();
    content.set_fail_reads(true);

    let summary = runner.run_once().unwrap();
    assert_eq!(summary.transferred, 1);

    let failed = runner.output("failure");
    assert_eq!(failed.len(), 1);
    let record = &failed[0];
    assert_eq!(record.attribute(attr::ERROR_MESSAGE), Some(READ_FAILURE_MESSAGE));
    assert_eq!(record.attribute(attr::ERROR_KIND), Some(FlowErrorKind::ContentRead.as_str()));
    assert!(record.attribute(attr::ERROR_CAUSE).is_some());
    assert_eq!(record.attribute(attr::FILENAME), Some("report.txt"));
    assert_eq!(record.attribute("owner"), Some("ops"));
    assert_eq!(record.uuid(), input.uuid());
    assert!(runner.content(record).is_err());
    assert!(runner.output("success").is_empty());

    // The content itself was never lost
    content.set_fail_reads(false);
    assert_eq!(runner.content(record).unwrap(), b"payload");
}

#[test]
fn write_failure_drops_child_and_routes_original_to_failure() {
    let (runner, content) = flaky_runner();
    let input = runner.enqueue(attrs(&[("owner", "ops")]), "payload").unwrap();
    content.set_fail_writes(true);

    let summary = runner.run_once().unwrap();
    assert_eq!(summary.received, 1);
    assert_eq!(summary.removed, 1);
    assert_eq!(summary.transferred, 1);

    assert!(runner.output("success").is_empty());
    let failed = runner.output("failure");
    assert_eq!(failed.len(), 1);
    let record = &failed[0];
    assert_eq!(record.uuid(), input.uuid());
    assert!(record
        .attribute(attr::ERROR_MESSAGE)
        .is_some_and(|m| !m.is_empty()));
    assert_eq!(record.attribute(attr::ERROR_KIND), Some(FlowErrorKind::ContentWrite.as_str()));
    assert_eq!(record.attribute("owner"), Some("ops"));
    assert_eq!(runner.content(record).unwrap(), b"payload");
    assert_eq!(runner.factory().counters().get(COUNTER_FAILURE), 1);
    assert_eq!(runner.factory().queues().input_len(), 0);
}

#[test]
fn two_concurrent_invocations_share_one_record() {
    for _ in 0..50 {
        let (runner, _log) = case_runner();
        runner.enqueue(attrs(&[]), "solo").unwrap();

        let barrier = Arc::new(Barrier::new(2));
        let received: Vec<usize> = thread::scope(|scope| {
            let handles: Vec<_> = (0..2)
                .map(|_| {
                    let barrier = Arc::clone(&barrier);
                    let runner = &runner;
                    scope.spawn(move || {
                        barrier.wait();
                        runner.run_once().unwrap().received
                    })
                })
                .collect();
            handles.into_iter().map(|h| h.join().unwrap()).collect()
        });

        let mut received = received;
        received.sort_unstable();
        assert_eq!(received, vec![0, 1]);
        assert_eq!(runner.output("success").len(), 1);
    }
}
