//! Cache eviction via `/proc/sys/vm/drop_caches`.

use crate::traits::CacheEvictor;
use std::io;
use std::path::{Path, PathBuf};
use tracing::debug;

/// Kernel knob that drops the page cache and/or reclaimable slab objects.
pub const DROP_CACHES_PATH: &str = "/proc/sys/vm/drop_caches";

/// Writes a drop level to the kernel's drop_caches knob.
///
/// | Level | Drops |
/// |-------|-------|
/// | 1 | page cache |
/// | 2 | dentries and inodes |
/// | 3 | both |
///
/// Requires root. The write is process-wide and cannot be undone.
#[derive(Debug, Clone)]
pub struct DropCaches {
    level: u8,
    knob: PathBuf,
}

impl DropCaches {
    /// Create an evictor writing `level` to [`DROP_CACHES_PATH`]
    pub fn new(level: u8) -> Self {
        DropCaches {
            level,
            knob: PathBuf::from(DROP_CACHES_PATH),
        }
    }

    /// Write to a different knob path (builder pattern)
    pub fn with_knob(mut self, knob: impl Into<PathBuf>) -> Self {
        self.knob = knob.into();
        self
    }

    /// Drop level written on eviction
    pub fn level(&self) -> u8 {
        self.level
    }

    /// Path written on eviction
    pub fn knob(&self) -> &Path {
        &self.knob
    }
}

impl Default for DropCaches {
    fn default() -> Self {
        DropCaches::new(3)
    }
}

impl CacheEvictor for DropCaches {
    fn evict_all(&self) -> io::Result<()> {
        std::fs::write(&self.knob, format!("{}\n", self.level))?;
        debug!(
            target: "stalefh::platform",
            level = self.level,
            knob = %self.knob.display(),
            "Dropped caches"
        );
        Ok(())
    }
}
