//! Provenance and counters become visible only when a session commits.

use crate::common::*;
use flowstage::case_convert::{COUNTER_FAILURE, COUNTER_SUCCESS};
use flowstage::ProvenanceEventType;

#[test]
fn success_lineage_is_recorded() {
    let (runner, _log) = case_runner();
    let input = runner.enqueue(attrs(&[]), "abc").unwrap();
    runner.run_once().unwrap();

    let provenance = runner.factory().provenance();
    let input_events: Vec<ProvenanceEventType> = provenance
        .events_for(input.id())
        .iter()
        .map(|e| e.event_type)
        .collect();
    assert_eq!(input_events.first(), Some(&ProvenanceEventType::Receive));
    assert_eq!(input_events.last(), Some(&ProvenanceEventType::Drop));

    let child = &runner.output("success")[0];
    let child_events: Vec<ProvenanceEventType> = provenance
        .events_for(child.id())
        .iter()
        .map(|e| e.event_type)
        .collect();
    assert!(child_events.contains(&ProvenanceEventType::Fork));
    assert!(child_events.contains(&ProvenanceEventType::ContentModified));
    let route = provenance
        .events_for(child.id())
        .into_iter()
        .find(|e| e.event_type == ProvenanceEventType::Route)
        .unwrap();
    assert_eq!(route.relationship.as_deref(), Some("success"));
    assert_eq!(route.record_uuid, child.uuid());
}

#[test]
fn failure_route_is_recorded() {
    let (runner, _log) = case_runner();
    runner.enqueue(attrs(&[]), vec![0xff]).unwrap();
    runner.run_once().unwrap();

    let provenance = runner.factory().provenance();
    assert_eq!(provenance.count(ProvenanceEventType::Route), 1);
    assert_eq!(provenance.count(ProvenanceEventType::Fork), 0);
    assert_eq!(runner.factory().counters().get(COUNTER_FAILURE), 1);
    assert_eq!(runner.factory().counters().get(COUNTER_SUCCESS), 0);
}

#[test]
fn rolled_back_invocations_leave_no_trace() {
    let (runner, _log) = case_runner_with(StageConfig::default());
    runner.enqueue(attrs(&[]), "abc").unwrap();

    let mut session = runner.factory().create_session();
    let record = session.acquire().unwrap().unwrap();
    let child = session.create_child(&record).unwrap();
    session.transfer(child, &flowstage::case_convert::REL_SUCCESS).unwrap();
    session.remove(record).unwrap();
    session.adjust_counter(COUNTER_SUCCESS, 1).unwrap();
    session.rollback(true).unwrap();

    assert!(runner.factory().provenance().is_empty());
    assert!(runner.factory().counters().snapshot().is_empty());
    assert_eq!(runner.factory().queues().input_len(), 1);
}
