//! Core types for the stale file-handle harness
//!
//! This crate defines the foundational types shared by the platform layer,
//! the harness and the CLI:
//! - ObjectIndex: Position of a test object in the batch (`file%06d`)
//! - ObjectReference: Opaque, owned file-handle bytes captured for an object
//! - FilesystemToken: Mount identity and anchor handle of the target directory
//! - Outcome / OutcomeRecord: Per-object classification of the reopen attempt
//! - Phase: The ordered steps of one harness run
//! - Error: Setup and reopen error types

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod error;
pub mod phase;
pub mod types;

pub use error::{ReopenError, SetupError, SetupResult};
pub use phase::Phase;
pub use types::{
    AccessMode, BarrierScope, FailureReason, FilesystemToken, ObjectIndex, ObjectReference,
    Outcome, OutcomeRecord, PassKind, Verdict, DEFAULT_OBJECT_COUNT, OBJECT_NAME_PREFIX,
};
