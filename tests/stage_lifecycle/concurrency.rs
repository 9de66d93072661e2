//! Concurrent invocations over shared queues: no loss, no duplication.

use crate::common::*;
use std::collections::HashSet;

#[test]
fn concurrent_runner_converts_every_record_once() {
    const RECORDS: usize = 400;
    let (runner, _log) = case_runner();
    for i in 0..RECORDS {
        let seq = i.to_string();
        runner
            .enqueue(attrs(&[("seq", seq.as_str())]), format!("item-{}", i))
            .unwrap();
    }

    let report = runner.run_concurrent(8);
    assert!(report.is_clean());
    assert_eq!(report.received(), RECORDS);

    let out = runner.output("success");
    assert_eq!(out.len(), RECORDS);
    let seqs: HashSet<&str> = out.iter().filter_map(|r| r.attribute("seq")).collect();
    assert_eq!(seqs.len(), RECORDS);
    for record in &out {
        let seq = record.attribute("seq").unwrap();
        assert_eq!(runner.content(record).unwrap(), format!("ITEM-{}", seq).into_bytes());
    }
    assert_eq!(
        runner.factory().counters().get(flowstage::case_convert::COUNTER_SUCCESS),
        RECORDS as i64
    );
}

#[test]
fn concurrent_mixed_outcomes_partition_input() {
    const RECORDS: usize = 200;
    let (runner, _log) = case_runner();
    for i in 0..RECORDS {
        let content = if i % 4 == 0 {
            vec![0xff, i as u8]
        } else {
            format!("ok-{}", i).into_bytes()
        };
        runner.enqueue(attrs(&[]), content).unwrap();
    }

    let report = runner.run_concurrent(4);
    assert!(report.is_clean());

    let failed = runner.output("failure");
    let succeeded = runner.output("success");
    assert_eq!(failed.len(), RECORDS / 4);
    assert_eq!(succeeded.len(), RECORDS - RECORDS / 4);
    assert!(failed.iter().all(|r| r.attribute(attr::ERROR_MESSAGE).is_some()));
    assert_eq!(runner.factory().queues().input_len(), 0);
}
