//! Linux implementation of the collaborators
//!
//! - [`HandleResolver`] / [`HandleOpener`]: exportable file handles
//! - [`SyncBarrier`]: `sync(2)` or `syncfs(2)`
//! - [`DropCaches`]: `/proc/sys/vm/drop_caches`

mod barrier;
mod evict;
pub mod handle;

pub use barrier::SyncBarrier;
pub use evict::{DropCaches, DROP_CACHES_PATH};
pub use handle::{HandleOpener, HandleResolver};

use crate::collaborators::Collaborators;
use stalefh_core::BarrierScope;

impl Collaborators {
    /// Collaborators backed by the running Linux kernel
    pub fn linux(scope: BarrierScope, drop_level: u8) -> Self {
        Collaborators::new(
            Box::new(HandleResolver),
            Box::new(HandleOpener),
            Box::new(DropCaches::new(drop_level)),
            Box::new(SyncBarrier::new(scope)),
        )
    }
}
