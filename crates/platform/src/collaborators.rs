//! Bundle of the collaborators one harness run needs.

use crate::traits::{CacheEvictor, DurabilityBarrier, PathResolver, ReferenceOpener};

/// The four external services driven by the harness.
pub struct Collaborators {
    /// Path → token resolution
    pub resolver: Box<dyn PathResolver>,
    /// Reopen-by-reference, the operation under test
    pub opener: Box<dyn ReferenceOpener>,
    /// Cache eviction
    pub evictor: Box<dyn CacheEvictor>,
    /// Durability barrier
    pub barrier: Box<dyn DurabilityBarrier>,
}

impl Collaborators {
    /// Assemble a bundle from individual collaborators
    pub fn new(
        resolver: Box<dyn PathResolver>,
        opener: Box<dyn ReferenceOpener>,
        evictor: Box<dyn CacheEvictor>,
        barrier: Box<dyn DurabilityBarrier>,
    ) -> Self {
        Collaborators {
            resolver,
            opener,
            evictor,
            barrier,
        }
    }
}

impl std::fmt::Debug for Collaborators {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Collaborators").finish_non_exhaustive()
    }
}
