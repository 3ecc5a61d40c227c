//! Platform layer for the stale file-handle harness
//!
//! This crate owns everything that talks to the kernel:
//!
//! - Collaborator traits: path resolution, reopen-by-reference, cache
//!   eviction and durability barriers
//! - Linux implementation: `name_to_handle_at(2)` / `open_by_handle_at(2)`,
//!   `sync(2)` / `syncfs(2)` and `/proc/sys/vm/drop_caches`
//!
//! Reopening by handle requires `CAP_DAC_READ_SEARCH` and dropping caches
//! requires root; tests substitute fakes for both.

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod collaborators;
pub mod traits;

#[cfg(target_os = "linux")]
pub mod linux;

pub use collaborators::Collaborators;
pub use traits::{CacheEvictor, DurabilityBarrier, OpenedObject, PathResolver, ReferenceOpener};

#[cfg(target_os = "linux")]
pub use linux::{DropCaches, HandleOpener, HandleResolver, SyncBarrier, DROP_CACHES_PATH};
