//! Shared test utilities for the integration suites.
//!
//! Import via `#[path = "../common/mod.rs"] mod common;` from a suite's main.rs.

#![allow(dead_code)]
#![allow(unused_imports)]

use std::path::Path;

pub use stalefh::{
    FailureReason, Harness, HarnessConfig, ObjectIndex, Phase, RunReport, SetupError, Verdict,
};
pub use stalefh_harness::testing::{FakeCollaborators, FakeEvent, FakeProbe, FakeResponse};
pub use tempfile::TempDir;

/// Small configuration so suites stay fast.
pub fn config(objects: usize) -> HarnessConfig {
    HarnessConfig::for_testing().with_object_count(objects)
}

/// Harness over fakes with `objects` test objects.
pub fn harness(fakes: FakeCollaborators, objects: usize) -> Harness {
    Harness::new(config(objects), fakes.into_collaborators()).unwrap()
}

/// Names of the entries in `dir`, sorted.
pub fn entries(dir: &Path) -> Vec<String> {
    let mut names: Vec<String> = std::fs::read_dir(dir)
        .unwrap()
        .map(|e| e.unwrap().file_name().to_string_lossy().into_owned())
        .collect();
    names.sort();
    names
}

/// Indices of the failing records, in order.
pub fn failing(report: &RunReport) -> Vec<usize> {
    report.failures().map(|r| r.index.get()).collect()
}
