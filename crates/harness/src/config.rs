//! Harness configuration via `stalefh.toml`
//!
//! Every field has a default, so an empty file (or no file at all) gives the
//! classic run: 1024 objects, a global `sync` barrier, two flushes after
//! deletion, drop level 3 and read-write reopen. CLI flags override file
//! values.

use serde::{Deserialize, Serialize};
use stalefh_core::{AccessMode, BarrierScope, DEFAULT_OBJECT_COUNT};
use std::path::{Path, PathBuf};

/// Conventional config file name.
pub const CONFIG_FILE_NAME: &str = "stalefh.toml";

/// Harness configuration loaded from `stalefh.toml`.
///
/// # Example
///
/// ```toml
/// object_count = 1024
/// flush_passes = 2
/// barrier = "global"
/// drop_caches = 3
/// reopen_access = "read-write"
/// file_mode = 0o644
/// cleanup_on_abort = true
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HarnessConfig {
    /// Number of test objects per run.
    #[serde(default = "default_object_count")]
    pub object_count: usize,
    /// Durability barriers issued after deletion (flush redundancy count).
    #[serde(default = "default_flush_passes")]
    pub flush_passes: u32,
    /// Scope of every durability barrier.
    #[serde(default)]
    pub barrier: BarrierScope,
    /// Level written to `drop_caches` (1, 2 or 3).
    #[serde(default = "default_drop_caches")]
    pub drop_caches: u8,
    /// Access mode used when reopening references.
    #[serde(default)]
    pub reopen_access: AccessMode,
    /// Permission bits for created objects.
    #[serde(default = "default_file_mode")]
    pub file_mode: u32,
    /// Unlink leftover objects when a setup error aborts the run.
    #[serde(default = "default_cleanup_on_abort")]
    pub cleanup_on_abort: bool,
}

fn default_object_count() -> usize {
    DEFAULT_OBJECT_COUNT
}

fn default_flush_passes() -> u32 {
    2
}

fn default_drop_caches() -> u8 {
    3
}

fn default_file_mode() -> u32 {
    0o644
}

fn default_cleanup_on_abort() -> bool {
    true
}

impl Default for HarnessConfig {
    fn default() -> Self {
        HarnessConfig {
            object_count: default_object_count(),
            flush_passes: default_flush_passes(),
            barrier: BarrierScope::default(),
            drop_caches: default_drop_caches(),
            reopen_access: AccessMode::default(),
            file_mode: default_file_mode(),
            cleanup_on_abort: default_cleanup_on_abort(),
        }
    }
}

impl HarnessConfig {
    /// Create config for testing
    ///
    /// Uses a small batch so unit tests stay fast.
    pub fn for_testing() -> Self {
        HarnessConfig {
            object_count: 16,
            ..Default::default()
        }
    }

    /// Set the number of test objects
    pub fn with_object_count(mut self, count: usize) -> Self {
        self.object_count = count;
        self
    }

    /// Set the flush redundancy count
    pub fn with_flush_passes(mut self, passes: u32) -> Self {
        self.flush_passes = passes;
        self
    }

    /// Set the barrier scope
    pub fn with_barrier(mut self, scope: BarrierScope) -> Self {
        self.barrier = scope;
        self
    }

    /// Set the drop_caches level
    pub fn with_drop_caches(mut self, level: u8) -> Self {
        self.drop_caches = level;
        self
    }

    /// Set the reopen access mode
    pub fn with_reopen_access(mut self, access: AccessMode) -> Self {
        self.reopen_access = access;
        self
    }

    /// Set the permission bits of created objects
    pub fn with_file_mode(mut self, mode: u32) -> Self {
        self.file_mode = mode;
        self
    }

    /// Enable or disable cleanup of leftover objects on abort
    pub fn with_cleanup_on_abort(mut self, cleanup: bool) -> Self {
        self.cleanup_on_abort = cleanup;
        self
    }

    /// Validate configuration
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.object_count == 0 {
            return Err(ConfigError::ZeroObjects);
        }
        if self.flush_passes == 0 {
            return Err(ConfigError::ZeroFlushPasses);
        }
        if !(1..=3).contains(&self.drop_caches) {
            return Err(ConfigError::InvalidDropLevel(self.drop_caches));
        }
        if self.file_mode > 0o7777 {
            return Err(ConfigError::InvalidFileMode(self.file_mode));
        }
        Ok(())
    }

    /// Returns the default config file content with comments.
    pub fn default_toml() -> &'static str {
        r#"# Stale file-handle harness configuration
#
# Number of test objects created per run. Large batches force the
# filesystem to allocate fresh on-disk inode chunks.
object_count = 1024

# Durability barriers issued after the objects are unlinked (>= 1).
flush_passes = 2

# Barrier scope: "global" (sync) or "filesystem" (syncfs on the target)
barrier = "global"

# Level written to /proc/sys/vm/drop_caches: 1 = page cache,
# 2 = dentries and inodes, 3 = both
drop_caches = 3

# Access mode for reopen-by-handle: "read-write" or "read-only"
reopen_access = "read-write"

# Permission bits of created objects
file_mode = 0o644

# Unlink leftover objects when a setup error aborts the run
cleanup_on_abort = true
"#
    }

    /// Read, parse and validate config from a file path.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read, parsed or validated.
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        let config: HarnessConfig = toml::from_str(&content).map_err(|e| ConfigError::Parse {
            path: path.to_path_buf(),
            message: e.to_string(),
        })?;
        config.validate()?;
        Ok(config)
    }

    /// Write the default config file if it does not already exist.
    ///
    /// Returns `Ok(true)` if the file was created, `Ok(false)` if it was
    /// already there and left untouched.
    pub fn write_default_if_missing(path: &Path) -> Result<bool, ConfigError> {
        if path.exists() {
            return Ok(false);
        }
        std::fs::write(path, Self::default_toml()).map_err(|source| ConfigError::Write {
            path: path.to_path_buf(),
            source,
        })?;
        Ok(true)
    }
}

/// Configuration errors
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// Config file could not be read
    #[error("Failed to read config file '{path}': {source}")]
    Read {
        /// Config file path
        path: PathBuf,
        /// Underlying read error
        source: std::io::Error,
    },

    /// Config file could not be written
    #[error("Failed to write config file '{path}': {source}")]
    Write {
        /// Config file path
        path: PathBuf,
        /// Underlying write error
        source: std::io::Error,
    },

    /// Config file is not valid TOML for this schema
    #[error("Failed to parse config file '{path}': {message}")]
    Parse {
        /// Config file path
        path: PathBuf,
        /// Parser message
        message: String,
    },

    /// Batch size is zero
    #[error("object_count must be at least 1")]
    ZeroObjects,

    /// No barrier after deletion
    #[error("flush_passes must be at least 1")]
    ZeroFlushPasses,

    /// drop_caches level outside 1..=3
    #[error("drop_caches must be 1, 2 or 3, got {0}")]
    InvalidDropLevel(u8),

    /// Permission bits out of range
    #[error("file_mode {0:#o} is not a valid permission mode")]
    InvalidFileMode(u32),
}
