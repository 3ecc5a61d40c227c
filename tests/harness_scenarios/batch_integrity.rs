//! Batch ordering, idempotence and leftovers.

use crate::common::*;

#[test]
fn all_captures_precede_all_reopens() {
    let dir = TempDir::new().unwrap();
    let fakes = FakeCollaborators::new();
    let probe = fakes.probe();

    harness(fakes, 128).run(dir.path()).unwrap();

    let log = &probe.log;
    let last_capture = log.rposition(|e| matches!(e, FakeEvent::Resolve(_))).unwrap();
    let evict = log.position(|e| *e == FakeEvent::Evict).unwrap();
    let first_open = log.position(|e| matches!(e, FakeEvent::Open(_))).unwrap();
    assert!(last_capture < evict);
    assert!(evict < first_open);
    assert_eq!(log.count(|e| *e == FakeEvent::Evict), 1);
}

#[test]
fn repeated_runs_share_a_directory() {
    let dir = TempDir::new().unwrap();
    let harness = harness(FakeCollaborators::new(), 32);

    let first = harness.run(dir.path()).unwrap();
    let second = harness.run(dir.path()).unwrap();

    assert!(first.passed());
    assert!(second.passed());
    assert_eq!(first.outcomes, second.outcomes);
    assert!(entries(dir.path()).is_empty());
}

#[test]
fn stale_objects_from_an_earlier_crash_are_reused() {
    let dir = TempDir::new().unwrap();
    for i in 0..8 {
        std::fs::write(ObjectIndex::new(i).path_in(dir.path()), b"stale").unwrap();
    }

    let report = harness(FakeCollaborators::new(), 8).run(dir.path()).unwrap();

    assert!(report.passed());
    assert!(entries(dir.path()).is_empty());
}

#[test]
fn aborted_capture_leaves_no_objects() {
    let dir = TempDir::new().unwrap();
    let fakes = FakeCollaborators::new().failing_capture_at(ObjectIndex::new(40));

    let err = harness(fakes, 64).run(dir.path()).unwrap_err();

    assert_eq!(err.phase(), Phase::Capture);
    assert!(entries(dir.path()).is_empty());
}

#[test]
fn validation_order_matches_index_order() {
    let dir = TempDir::new().unwrap();
    let report = harness(FakeCollaborators::new(), 50).run(dir.path()).unwrap();

    let indices: Vec<usize> = report.outcomes.iter().map(|r| r.index.get()).collect();
    assert_eq!(indices, (0..50).collect::<Vec<_>>());
}

#[test]
fn report_serializes_for_tooling() {
    let dir = TempDir::new().unwrap();
    let fakes = FakeCollaborators::new().with_response(ObjectIndex::new(2), FakeResponse::Open);

    let report = harness(fakes, 4).run(dir.path()).unwrap();
    let value: serde_json::Value = serde_json::from_str(&report.to_json().unwrap()).unwrap();

    assert_eq!(value["config"]["object_count"], 4);
    assert_eq!(value["phases"].as_array().unwrap().len(), Phase::ALL.len());
    assert_eq!(value["outcomes"][2]["outcome"]["reason"]["kind"], "unexpected_open");
}
