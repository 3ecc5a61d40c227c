//! Fake collaborators
//!
//! Stand-ins for the kernel services so a full run can execute in a
//! temporary directory without root. Objects are still created and unlinked
//! on the real filesystem; only resolution, reopen, eviction and flushes are
//! simulated.
//!
//! Every fake appends to a shared [`EventLog`], so tests can assert on the
//! order in which the harness drove its collaborators.
//!
//! # Example
//!
//! ```ignore
//! let fakes = FakeCollaborators::new().with_response(ObjectIndex::new(3), FakeResponse::Open);
//! let probe = fakes.probe();
//! let harness = Harness::new(HarnessConfig::for_testing(), fakes.into_collaborators())?;
//! ```

use parking_lot::Mutex;
use stalefh_core::{
    AccessMode, FilesystemToken, ObjectIndex, ObjectReference, ReopenError,
};
use stalefh_platform::{
    CacheEvictor, Collaborators, DurabilityBarrier, OpenedObject, PathResolver, ReferenceOpener,
};
use std::collections::HashMap;
use std::fs::File;
use std::io;
use std::os::unix::fs::MetadataExt;
use std::path::Path;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

/// Mount identifier reported by [`FakeResolver`] unless overridden.
pub const FAKE_MOUNT_ID: i32 = 77;

/// Handle type reported by [`FakeResolver`].
pub const FAKE_HANDLE_TYPE: i32 = 1;

/// A call observed by one of the fakes
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FakeEvent {
    /// `resolve_filesystem`
    ResolveFilesystem,
    /// `resolve_object` for an index
    Resolve(ObjectIndex),
    /// `flush`
    Flush,
    /// `evict_all`
    Evict,
    /// `open_by_reference` for an index
    Open(ObjectIndex),
}

/// Shared, ordered record of fake calls
#[derive(Debug, Clone, Default)]
pub struct EventLog(Arc<Mutex<Vec<FakeEvent>>>);

impl EventLog {
    fn push(&self, event: FakeEvent) {
        self.0.lock().push(event);
    }

    /// Snapshot of every event so far
    pub fn events(&self) -> Vec<FakeEvent> {
        self.0.lock().clone()
    }

    /// Number of events matching `pred`
    pub fn count(&self, pred: impl Fn(&FakeEvent) -> bool) -> usize {
        self.0.lock().iter().filter(|e| pred(e)).count()
    }

    /// Position of the first event matching `pred`
    pub fn position(&self, pred: impl Fn(&FakeEvent) -> bool) -> Option<usize> {
        self.0.lock().iter().position(|e| pred(e))
    }

    /// Position of the last event matching `pred`
    pub fn rposition(&self, pred: impl Fn(&FakeEvent) -> bool) -> Option<usize> {
        self.0.lock().iter().rposition(|e| pred(e))
    }
}

fn injected(what: &str) -> io::Error {
    io::Error::new(io::ErrorKind::Other, format!("injected {} failure", what))
}

// ============================================================================
// Resolver
// ============================================================================

/// Resolver that encodes the inode number and index as the handle bytes.
///
/// Resolving an object stats it, so a missing object fails like the real
/// resolver would.
#[derive(Debug, Default)]
pub struct FakeResolver {
    log: EventLog,
    fail_filesystem: bool,
    fail_at: Option<ObjectIndex>,
    mount_overrides: HashMap<ObjectIndex, i32>,
}

impl PathResolver for FakeResolver {
    fn resolve_filesystem(&self, dir: &Path) -> io::Result<FilesystemToken> {
        self.log.push(FakeEvent::ResolveFilesystem);
        if self.fail_filesystem {
            return Err(injected("filesystem resolve"));
        }
        Ok(FilesystemToken::new(dir, FAKE_MOUNT_ID, File::open(dir)?))
    }

    fn resolve_object(&self, index: ObjectIndex, path: &Path) -> io::Result<ObjectReference> {
        self.log.push(FakeEvent::Resolve(index));
        if self.fail_at == Some(index) {
            return Err(injected("object resolve"));
        }
        let ino = std::fs::metadata(path)?.ino();
        let mut bytes = ino.to_le_bytes().to_vec();
        bytes.extend_from_slice(&(index.get() as u64).to_le_bytes());
        let mount_id = self
            .mount_overrides
            .get(&index)
            .copied()
            .unwrap_or(FAKE_MOUNT_ID);
        Ok(ObjectReference::new(index, FAKE_HANDLE_TYPE, mount_id, bytes))
    }
}

// ============================================================================
// Opener
// ============================================================================

/// Scripted result of a reopen attempt
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FakeResponse {
    /// Fail with not-found
    NotFound,
    /// Fail with stale
    Stale,
    /// Succeed, handing out a handle (the bug under test)
    Open,
    /// Fail with the given raw OS error
    Errno(i32),
}

/// Opener that answers from a script, defaulting to not-found.
#[derive(Debug)]
pub struct FakeOpener {
    log: EventLog,
    default: FakeResponse,
    overrides: HashMap<ObjectIndex, FakeResponse>,
    opened: Arc<AtomicUsize>,
    closed: Arc<AtomicUsize>,
}

impl Default for FakeOpener {
    fn default() -> Self {
        FakeOpener {
            log: EventLog::default(),
            default: FakeResponse::NotFound,
            overrides: HashMap::new(),
            opened: Arc::new(AtomicUsize::new(0)),
            closed: Arc::new(AtomicUsize::new(0)),
        }
    }
}

impl ReferenceOpener for FakeOpener {
    fn open_by_reference(
        &self,
        fs: &FilesystemToken,
        reference: &ObjectReference,
        _access: AccessMode,
    ) -> Result<Box<dyn OpenedObject>, ReopenError> {
        self.log.push(FakeEvent::Open(reference.index()));
        if reference.mount_id() != fs.mount_id() {
            return Err(ReopenError::Other(io::Error::new(
                io::ErrorKind::InvalidInput,
                "reference belongs to another mount",
            )));
        }
        let response = self
            .overrides
            .get(&reference.index())
            .copied()
            .unwrap_or(self.default);
        match response {
            FakeResponse::NotFound => Err(ReopenError::NotFound),
            FakeResponse::Stale => Err(ReopenError::Stale),
            FakeResponse::Errno(code) => {
                Err(ReopenError::Other(io::Error::from_raw_os_error(code)))
            }
            FakeResponse::Open => {
                self.opened.fetch_add(1, Ordering::SeqCst);
                Ok(Box::new(FakeObject {
                    closed: Arc::clone(&self.closed),
                }))
            }
        }
    }
}

/// Handle handed out by [`FakeOpener`]; counts releases.
struct FakeObject {
    closed: Arc<AtomicUsize>,
}

impl OpenedObject for FakeObject {
    fn close(self: Box<Self>) -> io::Result<()> {
        self.closed.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

// ============================================================================
// Evictor and barrier
// ============================================================================

/// Evictor that records the call and optionally fails.
#[derive(Debug, Default)]
pub struct FakeEvictor {
    log: EventLog,
    fail: bool,
}

impl CacheEvictor for FakeEvictor {
    fn evict_all(&self) -> io::Result<()> {
        self.log.push(FakeEvent::Evict);
        if self.fail {
            return Err(io::Error::new(
                io::ErrorKind::PermissionDenied,
                "drop_caches requires root",
            ));
        }
        Ok(())
    }
}

/// Barrier that records the call and optionally fails on the n-th flush.
#[derive(Debug, Default)]
pub struct FakeBarrier {
    log: EventLog,
    calls: AtomicUsize,
    fail_on_call: Option<usize>,
}

impl DurabilityBarrier for FakeBarrier {
    fn flush(&self, _fs: &FilesystemToken) -> io::Result<()> {
        self.log.push(FakeEvent::Flush);
        let call = self.calls.fetch_add(1, Ordering::SeqCst) + 1;
        if self.fail_on_call == Some(call) {
            return Err(injected("flush"));
        }
        Ok(())
    }
}

// ============================================================================
// Bundle
// ============================================================================

/// Counters and event log shared with the fakes, for assertions.
#[derive(Debug, Clone)]
pub struct FakeProbe {
    /// Ordered record of collaborator calls
    pub log: EventLog,
    opened: Arc<AtomicUsize>,
    closed: Arc<AtomicUsize>,
}

impl FakeProbe {
    /// Handles handed out by the opener
    pub fn opened(&self) -> usize {
        self.opened.load(Ordering::SeqCst)
    }

    /// Handles released by the harness
    pub fn closed(&self) -> usize {
        self.closed.load(Ordering::SeqCst)
    }
}

/// Builder for a full set of fakes sharing one event log.
#[derive(Debug)]
pub struct FakeCollaborators {
    resolver: FakeResolver,
    opener: FakeOpener,
    evictor: FakeEvictor,
    barrier: FakeBarrier,
}

impl Default for FakeCollaborators {
    fn default() -> Self {
        FakeCollaborators::new()
    }
}

impl FakeCollaborators {
    /// Fakes where every reopen fails with not-found
    pub fn new() -> Self {
        let log = EventLog::default();
        FakeCollaborators {
            resolver: FakeResolver {
                log: log.clone(),
                ..Default::default()
            },
            opener: FakeOpener {
                log: log.clone(),
                ..Default::default()
            },
            evictor: FakeEvictor {
                log: log.clone(),
                ..Default::default()
            },
            barrier: FakeBarrier {
                log,
                ..Default::default()
            },
        }
    }

    /// Answer every reopen not scripted individually with `response`
    pub fn with_default_response(mut self, response: FakeResponse) -> Self {
        self.opener.default = response;
        self
    }

    /// Answer the reopen for `index` with `response`
    pub fn with_response(mut self, index: ObjectIndex, response: FakeResponse) -> Self {
        self.opener.overrides.insert(index, response);
        self
    }

    /// Fail filesystem token resolution
    pub fn failing_filesystem_resolve(mut self) -> Self {
        self.resolver.fail_filesystem = true;
        self
    }

    /// Fail reference capture for `index`
    pub fn failing_capture_at(mut self, index: ObjectIndex) -> Self {
        self.resolver.fail_at = Some(index);
        self
    }

    /// Report `mount_id` when capturing `index`
    pub fn with_mount_override(mut self, index: ObjectIndex, mount_id: i32) -> Self {
        self.resolver.mount_overrides.insert(index, mount_id);
        self
    }

    /// Fail cache eviction
    pub fn failing_eviction(mut self) -> Self {
        self.evictor.fail = true;
        self
    }

    /// Fail the n-th flush (1-based)
    pub fn failing_flush(mut self, call: usize) -> Self {
        self.barrier.fail_on_call = Some(call);
        self
    }

    /// Probe for the counters and event log
    pub fn probe(&self) -> FakeProbe {
        FakeProbe {
            log: self.resolver.log.clone(),
            opened: Arc::clone(&self.opener.opened),
            closed: Arc::clone(&self.opener.closed),
        }
    }

    /// Box the fakes into a collaborator bundle
    pub fn into_collaborators(self) -> Collaborators {
        Collaborators::new(
            Box::new(self.resolver),
            Box::new(self.opener),
            Box::new(self.evictor),
            Box::new(self.barrier),
        )
    }
}
