//! Domain types for one harness run
//!
//! References and outcomes are keyed by [`ObjectIndex`], the position of a
//! test object in the batch. The batch size is a policy value carried by the
//! harness configuration, not a limit baked into these types.

use serde::{Deserialize, Serialize};
use std::fs::File;
use std::path::{Path, PathBuf};

/// File name prefix of every test object.
pub const OBJECT_NAME_PREFIX: &str = "file";

/// Number of test objects created by a default run.
///
/// Large enough to force allocation of fresh on-disk inode chunks.
pub const DEFAULT_OBJECT_COUNT: usize = 1024;

// ============================================================================
// ObjectIndex
// ============================================================================

/// Position of a test object within the batch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(transparent)]
pub struct ObjectIndex(usize);

impl ObjectIndex {
    /// Wrap a raw index
    pub fn new(index: usize) -> Self {
        ObjectIndex(index)
    }

    /// Raw index value
    pub fn get(self) -> usize {
        self.0
    }

    /// File name of the object, e.g. `file000042`
    pub fn file_name(self) -> String {
        format!("{}{:06}", OBJECT_NAME_PREFIX, self.0)
    }

    /// Full path of the object beneath `dir`
    pub fn path_in(self, dir: &Path) -> PathBuf {
        dir.join(self.file_name())
    }

    /// Iterate over the first `count` indices in creation order
    pub fn range(count: usize) -> impl Iterator<Item = ObjectIndex> {
        (0..count).map(ObjectIndex)
    }
}

impl std::fmt::Display for ObjectIndex {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

// ============================================================================
// References
// ============================================================================

/// Opaque file reference captured from a live object.
///
/// The handle bytes are owned by this value and released when it is
/// dropped. Their layout belongs to the storage layer; the harness only
/// carries them back to the reopen call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ObjectReference {
    index: ObjectIndex,
    handle_type: i32,
    mount_id: i32,
    bytes: Vec<u8>,
}

impl ObjectReference {
    /// Create a reference from captured handle bytes
    pub fn new(index: ObjectIndex, handle_type: i32, mount_id: i32, bytes: Vec<u8>) -> Self {
        ObjectReference {
            index,
            handle_type,
            mount_id,
            bytes,
        }
    }

    /// Index of the object this reference was captured from
    pub fn index(&self) -> ObjectIndex {
        self.index
    }

    /// Storage-layer handle type tag
    pub fn handle_type(&self) -> i32 {
        self.handle_type
    }

    /// Mount identifier reported when the reference was captured
    pub fn mount_id(&self) -> i32 {
        self.mount_id
    }

    /// Opaque handle bytes
    pub fn as_bytes(&self) -> &[u8] {
        &self.bytes
    }

    /// Length of the handle bytes
    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    /// Check if the handle carries no bytes
    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }
}

/// Filesystem-level token for the target directory.
///
/// The anchor is an open handle on the directory itself; reopen-by-reference
/// uses it to name the mount the references belong to.
#[derive(Debug)]
pub struct FilesystemToken {
    path: PathBuf,
    mount_id: i32,
    anchor: File,
}

impl FilesystemToken {
    /// Create a token from an open directory handle
    pub fn new(path: impl Into<PathBuf>, mount_id: i32, anchor: File) -> Self {
        FilesystemToken {
            path: path.into(),
            mount_id,
            anchor,
        }
    }

    /// Path the token was resolved from
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Mount identifier of the filesystem holding the directory
    pub fn mount_id(&self) -> i32 {
        self.mount_id
    }

    /// Open handle on the directory
    pub fn anchor(&self) -> &File {
        &self.anchor
    }
}

// ============================================================================
// Settings shared by the platform layer and the harness
// ============================================================================

/// Access mode requested when reopening a reference.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum AccessMode {
    /// Open read-only
    ReadOnly,
    /// Open read-write (the default, matching how objects were created)
    #[default]
    ReadWrite,
}

/// Scope of a durability barrier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum BarrierScope {
    /// Flush every mounted filesystem (`sync`)
    #[default]
    Global,
    /// Flush only the filesystem holding the target directory (`syncfs`)
    Filesystem,
}

// ============================================================================
// Outcomes
// ============================================================================

/// Expected error kind observed when reopening a deleted object.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum PassKind {
    /// The storage layer reported the object as not found
    NotFound,
    /// The storage layer reported the reference as stale
    Stale,
}

/// Why a reopen attempt was classified as a failure.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum FailureReason {
    /// The reference opened an unlinked object
    UnexpectedOpen,
    /// The reopen failed with an error other than not-found or stale
    UnexpectedError {
        /// Raw OS error code, when the error carried one
        code: Option<i32>,
        /// Human-readable error description
        message: String,
    },
}

impl std::fmt::Display for FailureReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            FailureReason::UnexpectedOpen => write!(f, "opened an unlinked file"),
            FailureReason::UnexpectedError {
                code: Some(code),
                message,
            } => write!(f, "returned errno {} ({}) on an unlinked file", code, message),
            FailureReason::UnexpectedError {
                code: None,
                message,
            } => write!(f, "returned unexpected error ({}) on an unlinked file", message),
        }
    }
}

/// Classification of one reopen attempt.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "result", rename_all = "snake_case")]
pub enum Outcome {
    /// Reopen failed with one of the two expected error kinds
    Pass {
        /// Which expected error was observed
        kind: PassKind,
    },
    /// Anything else
    Fail {
        /// Why the attempt failed
        reason: FailureReason,
    },
}

impl Outcome {
    /// Check if this outcome is a pass
    pub fn is_pass(&self) -> bool {
        matches!(self, Outcome::Pass { .. })
    }
}

/// Outcome of the reopen attempt for one object.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct OutcomeRecord {
    /// Object the reference was captured from
    pub index: ObjectIndex,
    /// Classification of the reopen attempt
    pub outcome: Outcome,
}

impl OutcomeRecord {
    /// Create a record
    pub fn new(index: ObjectIndex, outcome: Outcome) -> Self {
        OutcomeRecord { index, outcome }
    }

    /// Check if this record is a pass
    pub fn is_pass(&self) -> bool {
        self.outcome.is_pass()
    }

    /// Failure reason, if the record is a failure
    pub fn failure(&self) -> Option<&FailureReason> {
        match &self.outcome {
            Outcome::Fail { reason } => Some(reason),
            Outcome::Pass { .. } => None,
        }
    }
}

/// Aggregate verdict of a run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Verdict {
    /// Every outcome record passed
    Pass,
    /// A setup error occurred or at least one record failed
    Fail,
}

impl Verdict {
    /// Aggregate a set of outcome records
    pub fn from_records<'a>(records: impl IntoIterator<Item = &'a OutcomeRecord>) -> Self {
        if records.into_iter().all(OutcomeRecord::is_pass) {
            Verdict::Pass
        } else {
            Verdict::Fail
        }
    }

    /// Process exit status for this verdict
    pub fn exit_code(&self) -> i32 {
        match self {
            Verdict::Pass => 0,
            Verdict::Fail => 1,
        }
    }
}
