//! Harness phases
//!
//! A run walks these phases in declaration order. Each phase is a full
//! barrier over the batch: no object enters phase k+1 until every object
//! has completed phase k.

use serde::Serialize;

/// One step of the harness protocol.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Phase {
    /// Stat the target directory
    ValidateTarget,
    /// Resolve the target directory to a filesystem token
    ResolveFilesystem,
    /// Create every test object
    Create,
    /// Flush the filesystem before references are captured
    PreCaptureBarrier,
    /// Capture one reference per object
    Capture,
    /// Unlink every test object
    Delete,
    /// Flush the filesystem so the unlinks are committed
    PostDeleteBarrier,
    /// Drop cached metadata and data
    Evict,
    /// Reopen every captured reference and classify the result
    Validate,
}

impl Phase {
    /// All phases in execution order.
    pub const ALL: [Phase; 9] = [
        Phase::ValidateTarget,
        Phase::ResolveFilesystem,
        Phase::Create,
        Phase::PreCaptureBarrier,
        Phase::Capture,
        Phase::Delete,
        Phase::PostDeleteBarrier,
        Phase::Evict,
        Phase::Validate,
    ];

    /// Get the name of this phase for logging
    pub fn name(&self) -> &'static str {
        match self {
            Phase::ValidateTarget => "validate_target",
            Phase::ResolveFilesystem => "resolve_filesystem",
            Phase::Create => "create",
            Phase::PreCaptureBarrier => "pre_capture_barrier",
            Phase::Capture => "capture",
            Phase::Delete => "delete",
            Phase::PostDeleteBarrier => "post_delete_barrier",
            Phase::Evict => "evict",
            Phase::Validate => "validate",
        }
    }

    /// Check if test objects may exist on disk when this phase fails
    pub fn objects_may_exist(&self) -> bool {
        matches!(
            self,
            Phase::Create | Phase::PreCaptureBarrier | Phase::Capture | Phase::Delete
        )
    }
}

impl std::fmt::Display for Phase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.name())
    }
}
