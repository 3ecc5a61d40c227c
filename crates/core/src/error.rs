//! Error types for the harness
//!
//! Two disjoint classes:
//! - [`SetupError`]: the test environment is broken. Fatal, the run aborts.
//! - [`ReopenError`]: what a reopen-by-reference attempt returned. Only
//!   `NotFound` and `Stale` are expected once an object is deleted and the
//!   caches are dropped; anything else is classified as a failure.
//!
//! We use `thiserror` for automatic `Display` and `Error` trait implementations.

use crate::phase::Phase;
use crate::types::ObjectIndex;
use std::io;
use std::path::PathBuf;
use thiserror::Error;

/// Result type alias for setup steps
pub type SetupResult<T> = std::result::Result<T, SetupError>;

/// Fatal errors raised before validation starts
#[derive(Debug, Error)]
pub enum SetupError {
    /// Target directory could not be stat'ed
    #[error("Target directory '{path}' is not accessible: {source}")]
    TargetMissing {
        /// Path supplied by the caller
        path: PathBuf,
        /// Underlying stat error
        source: io::Error,
    },

    /// Target exists but is not a directory
    #[error("Target '{path}' is not a directory")]
    NotADirectory {
        /// Path supplied by the caller
        path: PathBuf,
    },

    /// Path resolver could not produce a filesystem token
    #[error("Failed to resolve filesystem token for '{path}': {source}")]
    ResolveFilesystem {
        /// Target directory
        path: PathBuf,
        /// Resolver error
        source: io::Error,
    },

    /// A test object could not be created
    #[error("Failed to create test object {index} ('{path}'): {source}")]
    Create {
        /// Object being created
        index: ObjectIndex,
        /// Object path
        path: PathBuf,
        /// Underlying open error
        source: io::Error,
    },

    /// A durability barrier failed
    #[error("Durability barrier failed during {phase}: {source}")]
    Barrier {
        /// Phase that issued the barrier
        phase: Phase,
        /// Underlying flush error
        source: io::Error,
    },

    /// A reference could not be captured
    #[error("Failed to capture reference for object {index} ('{path}'): {source}")]
    Capture {
        /// Object being resolved
        index: ObjectIndex,
        /// Object path
        path: PathBuf,
        /// Resolver error
        source: io::Error,
    },

    /// A reference was captured on a different mount than the target directory
    #[error("Object {index} resolved on mount {actual}, expected mount {expected}")]
    MountMismatch {
        /// Object being resolved
        index: ObjectIndex,
        /// Mount identifier of the target directory
        expected: i32,
        /// Mount identifier reported for the object
        actual: i32,
    },

    /// A test object could not be unlinked
    #[error("Failed to unlink test object {index} ('{path}'): {source}")]
    Unlink {
        /// Object being removed
        index: ObjectIndex,
        /// Object path
        path: PathBuf,
        /// Underlying unlink error
        source: io::Error,
    },
}

impl SetupError {
    /// Phase in which this error occurred
    pub fn phase(&self) -> Phase {
        match self {
            SetupError::TargetMissing { .. } | SetupError::NotADirectory { .. } => {
                Phase::ValidateTarget
            }
            SetupError::ResolveFilesystem { .. } => Phase::ResolveFilesystem,
            SetupError::Create { .. } => Phase::Create,
            SetupError::Barrier { phase, .. } => *phase,
            SetupError::Capture { .. } | SetupError::MountMismatch { .. } => Phase::Capture,
            SetupError::Unlink { .. } => Phase::Delete,
        }
    }
}

/// Result of a failed reopen-by-reference attempt
#[derive(Debug, Error)]
pub enum ReopenError {
    /// The object no longer exists
    #[error("Object not found")]
    NotFound,

    /// The reference is no longer valid
    #[error("Stale reference")]
    Stale,

    /// Any other error
    #[error("Unexpected reopen error: {0}")]
    Other(#[source] io::Error),
}
