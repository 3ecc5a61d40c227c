//! Durability barriers via `sync(2)` and `syncfs(2)`.

use crate::traits::DurabilityBarrier;
use stalefh_core::{BarrierScope, FilesystemToken};
use std::io;
use std::os::fd::AsRawFd;
use std::time::{Duration, Instant};
use tracing::debug;

/// Whole-filesystem flush.
///
/// `Global` flushes every mounted filesystem, `Filesystem` only the one
/// holding the target directory.
#[derive(Debug, Clone, Copy, Default)]
pub struct SyncBarrier {
    scope: BarrierScope,
}

impl SyncBarrier {
    /// Create a barrier with the given scope
    pub fn new(scope: BarrierScope) -> Self {
        SyncBarrier { scope }
    }

    /// Scope of this barrier
    pub fn scope(&self) -> BarrierScope {
        self.scope
    }
}

impl DurabilityBarrier for SyncBarrier {
    fn flush(&self, fs: &FilesystemToken) -> io::Result<()> {
        let start = Instant::now();
        match self.scope {
            BarrierScope::Global => {
                // SAFETY: sync(2) takes no arguments and cannot fail.
                unsafe { libc::sync() };
            }
            BarrierScope::Filesystem => {
                // SAFETY: the anchor descriptor stays open for the whole call.
                if unsafe { libc::syncfs(fs.anchor().as_raw_fd()) } != 0 {
                    return Err(io::Error::last_os_error());
                }
            }
        }
        debug!(
            target: "stalefh::platform",
            scope = ?self.scope,
            path = %fs.path().display(),
            elapsed_us = micros(start.elapsed()),
            "Durability barrier complete"
        );
        Ok(())
    }
}

/// Microseconds in `elapsed`, saturating at `u64::MAX`.
fn micros(elapsed: Duration) -> u64 {
    u64::try_from(elapsed.as_micros()).unwrap_or(u64::MAX)
}
