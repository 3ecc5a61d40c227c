//! Full run against the running kernel.
//!
//! Needs root: reopening by handle requires CAP_DAC_READ_SEARCH and the
//! eviction step writes `/proc/sys/vm/drop_caches`. Run with
//! `--ignored` on a filesystem that supports exportable handles.

#![cfg(target_os = "linux")]

use crate::common::*;
use stalefh::Collaborators;

#[test]
#[ignore] // Requires root and an export-capable filesystem
fn live_run_rejects_every_reference() {
    let dir = TempDir::new().unwrap();
    let config = config(256);
    let collaborators = Collaborators::linux(config.barrier, config.drop_caches);
    let harness = Harness::new(config, collaborators).unwrap();

    let report = harness.run(dir.path()).unwrap();

    assert!(report.passed(), "{}", report.summary());
    assert!(entries(dir.path()).is_empty());
}
