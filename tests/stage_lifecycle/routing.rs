//! Routing properties: no-op on empty input, exactly-once routing, error
//! attribution, auto-termination.

use crate::common::*;
use flowstage::case_convert::{
    CASE_ATTRIBUTE, COUNTER_FAILURE, COUNTER_SUCCESS, GOOD_EXAMPLE_ATTRIBUTE, NOT_UTF8_MESSAGE,
};

#[test]
fn empty_queue_commits_without_side_effects() {
    let (runner, _log) = case_runner();
    let summary = runner.run_once().unwrap();
    assert!(summary.is_noop());
    assert_eq!(runner.factory().queues().total_output_len(), 0);
    assert!(runner.factory().provenance().is_empty());
    assert!(runner.factory().counters().snapshot().is_empty());
}

#[test]
fn each_success_yields_exactly_one_new_record() {
    let (runner, _log) = case_runner();
    let inputs: Vec<Record> = ["one", "two", "three"]
        .into_iter()
        .map(|w| runner.enqueue(attrs(&[("word", w)]), w).unwrap())
        .collect();

    let report = runner.run_until_empty();
    assert!(report.is_clean());

    let out = runner.output("success");
    assert_eq!(out.len(), inputs.len());
    assert!(runner.output("failure").is_empty());
    assert_eq!(runner.factory().queues().input_len(), 0);
    for (input, output) in inputs.iter().zip(&out) {
        assert_ne!(input.id(), output.id());
        assert_ne!(input.uuid(), output.uuid());
        assert_eq!(output.attribute("word"), input.attribute("word"));
    }
    let originals_left = out.iter().filter(|r| inputs.iter().any(|i| i.id() == r.id())).count();
    assert_eq!(originals_left, 0);
    assert_eq!(
        output_contents(&runner, "success"),
        vec![b"ONE".to_vec(), b"TWO".to_vec(), b"THREE".to_vec()]
    );
    assert_eq!(runner.factory().counters().get(COUNTER_SUCCESS), 3);
}

#[test]
fn original_content_is_released_after_success() {
    let (runner, content) = flaky_runner();
    runner.enqueue(attrs(&[]), "abc").unwrap();
    assert_eq!(content.live_claims(), 1);
    runner.run_until_empty();
    // Only the child's content remains
    assert_eq!(content.live_claims(), 1);
    assert_eq!(output_contents(&runner, "success"), vec![b"ABC".to_vec()]);
}

#[test]
fn transform_failures_carry_error_message() {
    let (runner, log) = case_runner();
    let bad = runner.enqueue(attrs(&[(attr::FILENAME, "blob.bin")]), vec![0xff, 0x00, 0xfe]).unwrap();
    runner.enqueue(attrs(&[]), "fine").unwrap();

    let report = runner.run_until_empty();
    assert!(report.is_clean());

    let failed = runner.output("failure");
    assert_eq!(failed.len(), 1);
    let record = &failed[0];
    let message = record.attribute(attr::ERROR_MESSAGE).unwrap();
    assert!(!message.is_empty());
    assert_eq!(message, NOT_UTF8_MESSAGE);
    assert_eq!(record.uuid(), bad.uuid());
    assert_eq!(record.attribute(attr::FILENAME), Some("blob.bin"));
    assert_eq!(runner.content(record).unwrap(), vec![0xff, 0x00, 0xfe]);
    assert_eq!(runner.output("success").len(), 1);
    assert_eq!(runner.factory().counters().get(COUNTER_FAILURE), 1);
    assert_eq!(log.at_level(flowstage::LogLevel::Error).len(), 1);
}

#[test]
fn configured_mode_is_recorded_on_output() {
    let config = StageConfig::default()
        .with_property("Case", "preserve")
        .with_property("Suffix", " [checked]");
    let (runner, _log) = case_runner_with(config);
    runner.enqueue(attrs(&[]), "Keep Me").unwrap();
    runner.run_until_empty();

    let out = runner.output("success");
    assert_eq!(out[0].attribute(CASE_ATTRIBUTE), Some("preserve"));
    assert_eq!(out[0].attribute(GOOD_EXAMPLE_ATTRIBUTE), Some("sure"));
    assert_eq!(runner.content(&out[0]).unwrap(), b"Keep Me [checked]");
}

#[test]
fn auto_terminated_success_drops_output() {
    let (runner, _log) = case_runner_with(StageConfig::default().with_auto_terminate("success"));
    runner.enqueue(attrs(&[]), "gone").unwrap();
    let report = runner.run_until_empty();

    assert!(report.is_clean());
    assert_eq!(report.committed[0].auto_terminated, 1);
    assert_eq!(report.committed[0].removed, 1);
    assert!(runner.output("success").is_empty());
    assert_eq!(runner.factory().queues().input_len(), 0);
}
