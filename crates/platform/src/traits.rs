//! Collaborator traits
//!
//! The harness drives four external services it does not own. Each one sits
//! behind a trait so the Linux implementation can be swapped for a fake that
//! runs without elevated privileges.
//!
//! # Thread Safety
//!
//! Collaborators must be `Send + Sync` so a harness can be moved to, or
//! shared with, another thread.

use std::io;
use std::path::Path;
use stalefh_core::{
    AccessMode, FilesystemToken, ObjectIndex, ObjectReference, ReopenError,
};

/// Resolves paths to opaque tokens.
pub trait PathResolver: Send + Sync {
    /// Resolve the target directory to a filesystem token.
    ///
    /// # Errors
    ///
    /// Any error is a fatal setup error for the harness.
    fn resolve_filesystem(&self, dir: &Path) -> io::Result<FilesystemToken>;

    /// Resolve a live object to a reference.
    ///
    /// The returned bytes must be usable later with
    /// [`ReferenceOpener::open_by_reference`] on the same filesystem.
    ///
    /// # Errors
    ///
    /// Any error is a fatal setup error for the harness.
    fn resolve_object(&self, index: ObjectIndex, path: &Path) -> io::Result<ObjectReference>;
}

/// Reopens objects directly from a captured reference, bypassing path lookup.
pub trait ReferenceOpener: Send + Sync {
    /// Attempt to reopen the object behind `reference`.
    ///
    /// # Errors
    ///
    /// `NotFound` and `Stale` are the expected results for a deleted object;
    /// every other failure is reported as `Other`.
    fn open_by_reference(
        &self,
        fs: &FilesystemToken,
        reference: &ObjectReference,
        access: AccessMode,
    ) -> Result<Box<dyn OpenedObject>, ReopenError>;
}

/// A handle obtained by a successful reopen.
///
/// Dropping it releases the handle too; `close` exists so callers can
/// observe the release.
pub trait OpenedObject: Send {
    /// Release the handle.
    fn close(self: Box<Self>) -> io::Result<()>;
}

/// Process-wide cache eviction.
pub trait CacheEvictor: Send + Sync {
    /// Drop cached filesystem metadata and data.
    ///
    /// The harness treats this as fire-and-forget: an error is logged and
    /// the run continues.
    fn evict_all(&self) -> io::Result<()>;
}

/// Synchronous filesystem flush.
pub trait DurabilityBarrier: Send + Sync {
    /// Commit all pending metadata and data to persistent storage.
    ///
    /// # Errors
    ///
    /// Any error is a fatal setup error for the harness.
    fn flush(&self, fs: &FilesystemToken) -> io::Result<()>;
}
