//! Correct filesystem, buggy filesystem, environment error.

use crate::common::*;

#[test]
fn correct_filesystem_rejects_every_reference() {
    let dir = TempDir::new().unwrap();
    let fakes = FakeCollaborators::new();
    let probe = fakes.probe();

    let report = harness(fakes, 1024).run(dir.path()).unwrap();

    assert_eq!(report.verdict(), Verdict::Pass);
    assert_eq!(report.verdict().exit_code(), 0);
    assert_eq!(report.outcomes.len(), 1024);
    assert_eq!(probe.opened(), 0);
    assert!(entries(dir.path()).is_empty());
}

#[test]
fn mixed_not_found_and_stale_still_pass() {
    let dir = TempDir::new().unwrap();
    let mut fakes = FakeCollaborators::new().with_default_response(FakeResponse::Stale);
    for i in (0..32).step_by(3) {
        fakes = fakes.with_response(ObjectIndex::new(i), FakeResponse::NotFound);
    }

    let report = harness(fakes, 32).run(dir.path()).unwrap();
    assert!(report.passed());
}

#[test]
fn buggy_filesystem_fails_only_the_reopened_object() {
    let dir = TempDir::new().unwrap();
    let fakes = FakeCollaborators::new().with_response(ObjectIndex::new(17), FakeResponse::Open);
    let probe = fakes.probe();

    let report = harness(fakes, 64).run(dir.path()).unwrap();

    assert_eq!(report.verdict(), Verdict::Fail);
    assert_eq!(report.verdict().exit_code(), 1);
    assert_eq!(failing(&report), vec![17]);
    assert_eq!(
        report.outcomes[17].failure(),
        Some(&FailureReason::UnexpectedOpen)
    );
    // the spurious handle was released and every other reference still ran
    assert_eq!(probe.closed(), 1);
    assert_eq!(probe.log.count(|e| matches!(e, FakeEvent::Open(_))), 64);
}

#[test]
fn every_reference_reopening_fails_every_record() {
    let dir = TempDir::new().unwrap();
    let fakes = FakeCollaborators::new().with_default_response(FakeResponse::Open);
    let probe = fakes.probe();

    let report = harness(fakes, 16).run(dir.path()).unwrap();

    assert_eq!(report.failure_count(), 16);
    assert_eq!(probe.opened(), probe.closed());
}

#[test]
fn missing_target_is_a_setup_error() {
    let dir = TempDir::new().unwrap();
    let target = dir.path().join("not-created");
    let fakes = FakeCollaborators::new();
    let probe = fakes.probe();

    let err = harness(fakes, 16).run(&target).unwrap_err();

    assert!(matches!(err, SetupError::TargetMissing { .. }));
    assert_eq!(err.phase(), Phase::ValidateTarget);
    assert!(probe.log.events().is_empty());
    assert!(entries(dir.path()).is_empty());
}

#[test]
fn unprivileged_reopen_is_reported_as_failure() {
    let dir = TempDir::new().unwrap();
    let fakes = FakeCollaborators::new().with_default_response(FakeResponse::Errno(1));

    let report = harness(fakes, 4).run(dir.path()).unwrap();

    assert!(!report.passed());
    assert!(report.failures().all(|r| matches!(
        r.failure(),
        Some(FailureReason::UnexpectedError { code: Some(1), .. })
    )));
}
