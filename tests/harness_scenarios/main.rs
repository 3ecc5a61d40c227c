//! End-to-end runs of the harness.
//!
//! Every suite except `live_kernel` drives the real phase runner over a
//! temporary directory with fake kernel collaborators, so the scenarios run
//! unprivileged. `live_kernel` uses the Linux collaborators and is ignored by
//! default.

#[path = "../common/mod.rs"]
mod common;

mod batch_integrity;
mod live_kernel;
mod properties;
mod scenarios;
