//! stalefh - Stale file-handle verification harness
//!
//! Checks that a Linux filesystem refuses to reopen files through handles
//! captured before the files were deleted. A run creates a batch of files,
//! records an exportable handle for each, deletes them, forces the deletion
//! to stable storage, evicts the kernel caches, then reopens every handle.
//! Each reopen must fail with not-found or stale.
//!
//! # Quick Start
//!
//! ```ignore
//! use stalefh::{Collaborators, Harness, HarnessConfig};
//!
//! let config = HarnessConfig::default();
//! let collaborators = Collaborators::linux(config.barrier, config.drop_caches);
//! let harness = Harness::new(config, collaborators)?;
//!
//! let report = harness.run(Path::new("/mnt/scratch"))?;
//! std::process::exit(report.verdict().exit_code());
//! ```
//!
//! # Architecture
//!
//! - `stalefh-core`: object, reference, outcome and error types
//! - `stalefh-platform`: collaborator traits and the Linux syscall layer
//! - `stalefh-harness`: configuration, the phase runner and reports
//!
//! The `stale-handle` binary lives in `stalefh-cli`.

pub use stalefh_core::{
    AccessMode, BarrierScope, FailureReason, FilesystemToken, ObjectIndex, ObjectReference,
    Outcome, OutcomeRecord, PassKind, Phase, ReopenError, SetupError, SetupResult, Verdict,
    DEFAULT_OBJECT_COUNT, OBJECT_NAME_PREFIX,
};
pub use stalefh_harness::{
    classify, failure_hint, run_hint, ConfigError, EvictionStatus, Harness, HarnessConfig,
    HarnessError, HarnessResult, PhaseTiming, RunReport, CONFIG_FILE_NAME,
};
pub use stalefh_platform::{
    CacheEvictor, Collaborators, DurabilityBarrier, OpenedObject, PathResolver, ReferenceOpener,
};

#[cfg(target_os = "linux")]
pub use stalefh_platform::{DropCaches, HandleOpener, HandleResolver, SyncBarrier};

#[cfg(feature = "testing")]
pub use stalefh_harness::testing;
