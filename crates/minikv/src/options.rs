//! Database configuration.

use std::path::PathBuf;

/// Default maximum key size: 1 KiB.
pub const DEFAULT_MAX_KEY_SIZE: usize = 1024;
/// Default maximum value size: 10 MiB.
pub const DEFAULT_MAX_VALUE_SIZE: usize = 10 * 1024 * 1024;
/// Default maximum total key+value bytes in a batch: 100 MiB.
pub const DEFAULT_MAX_BATCH_SIZE: u64 = 100 * 1024 * 1024;
/// Default WAL segment size that triggers rotation: 256 MiB.
pub const DEFAULT_MAX_WAL_SIZE: u64 = 256 * 1024 * 1024;

/// Controls when WAL data is flushed to disk.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SyncMode {
    /// fsync after every durability-critical write.
    Always,
    /// A background worker fsyncs once per second.
    #[default]
    Periodic,
    /// The caller decides, via [`crate::Db::sync`].
    Manual,
}

/// Configures database behavior. `path` is required; zero-valued limits are
/// replaced by their defaults when the database is opened.
#[derive(Debug, Clone)]
pub struct Options {
    /// Data directory. Created if it does not exist.
    pub path: PathBuf,
    /// Reject all writes with [`crate::Error::ReadOnly`].
    pub read_only: bool,
    pub sync_mode: SyncMode,
    pub max_key_size: usize,
    pub max_value_size: usize,
    pub max_batch_size: u64,
    pub max_wal_size: u64,
}

impl Options {
    /// Baseline configuration for a database at `path`.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            read_only: false,
            sync_mode: SyncMode::default(),
            max_key_size: DEFAULT_MAX_KEY_SIZE,
            max_value_size: DEFAULT_MAX_VALUE_SIZE,
            max_batch_size: DEFAULT_MAX_BATCH_SIZE,
            max_wal_size: DEFAULT_MAX_WAL_SIZE,
        }
    }

    pub(crate) fn with_defaults(mut self) -> Self {
        if self.max_key_size == 0 {
            self.max_key_size = DEFAULT_MAX_KEY_SIZE;
        }
        if self.max_value_size == 0 {
            self.max_value_size = DEFAULT_MAX_VALUE_SIZE;
        }
        if self.max_batch_size == 0 {
            self.max_batch_size = DEFAULT_MAX_BATCH_SIZE;
        }
        if self.max_wal_size == 0 {
            self.max_wal_size = DEFAULT_MAX_WAL_SIZE;
        }
        self
    }
}
