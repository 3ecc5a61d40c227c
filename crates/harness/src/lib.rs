//! Stale file-handle harness
//!
//! Runs the verification protocol against one target directory:
//! - Runner: the phase sequence (create, capture, delete, flush, evict, validate)
//! - Classify: maps each reopen result to a pass or fail record
//! - Report: outcome records, per-phase timings and the aggregate verdict
//! - Config: run parameters, loadable from TOML
//!
//! Kernel access goes through the collaborator traits of `stalefh-platform`,
//! so the whole protocol runs against fakes (feature `testing`).

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod classify;
pub mod config;
pub mod error;
pub mod report;
pub mod runner;

#[cfg(any(test, feature = "testing"))]
pub mod testing;

pub use classify::{classify, failure_hint, run_hint};
pub use config::{ConfigError, HarnessConfig, CONFIG_FILE_NAME};
pub use error::{HarnessError, HarnessResult};
pub use report::{EvictionStatus, PhaseTiming, RunReport};
pub use runner::Harness;
