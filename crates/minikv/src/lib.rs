//! # MiniKV — embeddable, crash-safe key-value store
//!
//! Maps opaque byte keys to opaque byte values with per-key expiration,
//! point operations, atomic read-modify-write primitives, bounded range and
//! prefix scans, and batched atomic writes.
//!
//! ## Architecture
//!
//! ```text
//! Caller threads
//!      |
//!      v
//! ┌───────────────────────────────────────────────────┐
//! │                       Db                          │
//! │                                                   │
//! │ write path:  WAL append → fsync? → index mutation │
//! │ read path:   index lookup (lazy TTL)              │
//! │                                                   │
//! │ rotation hook ──> background compaction:          │
//! │     capture index + WAL seq → write snapshot      │
//! │     → prune segments < seq → refresh MANIFEST     │
//! │                                                   │
//! │ workers:  periodic fsync (SyncPeriodic)           │
//! │           TTL reaper (1s sweep)                   │
//! └───────────────────────────────────────────────────┘
//!      |              |                 |
//!   [memindex]      [wal]          [snapshot]
//! ```
//!
//! ## Crash safety
//!
//! Every durability-critical mutation is appended to the WAL **before** the
//! in-memory index is touched. On open, the latest snapshot is loaded and
//! WAL segments strictly newer than it are replayed; a partially-written
//! record at the tail of the newest segment is discarded silently. The
//! manifest is rewritten atomically (temp file + rename) and governs which
//! segments recovery replays.
//!
//! ## Directory layout
//!
//! ```text
//! <path>/
//!   LOCK                       advisory exclusive lock
//!   MANIFEST                   text manifest
//!   wal/000001.log ...         numbered segments
//!   snapshots/snapshot_000001.snap ...
//! ```
//!
//! ## Example
//!
//! ```rust,no_run
//! use minikv::{Db, Options};
//!
//! let db = Db::open(Options::new("./data")).unwrap();
//! db.set(b"alpha", b"1").unwrap();
//! assert_eq!(db.get(b"alpha").unwrap(), b"1");
//! db.close().unwrap();
//! ```

mod atomic;
mod batch;
mod cancel;
mod compaction;
mod error;
mod lock;
pub mod manifest;
mod options;
mod read;
mod recovery;
mod stats;
mod ttl;
mod workers;
mod write;

pub use batch::Batch;
pub use cancel::CancelToken;
pub use error::{Error, Result};
pub use options::{
    Options, SyncMode, DEFAULT_MAX_BATCH_SIZE, DEFAULT_MAX_KEY_SIZE, DEFAULT_MAX_VALUE_SIZE,
    DEFAULT_MAX_WAL_SIZE,
};
pub use stats::Stats;

use memindex::MemIndex;
use snapshot::SnapshotManager;
use std::path::PathBuf;
use std::sync::{Arc, Mutex, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};

use lock::FileLock;
use stats::StatsTracker;
use wal::WalManager;
use workers::Workers;

/// The main database handle.
///
/// All operations take `&self`; the handle may be shared across threads
/// (e.g. in an `Arc`). Dropping the handle performs a best-effort
/// [`close`](Db::close).
pub struct Db {
    pub(crate) inner: Arc<DbInner>,
}

pub(crate) struct DbInner {
    pub(crate) path: PathBuf,
    pub(crate) opts: Options,
    pub(crate) index: MemIndex,
    pub(crate) wal: WalManager,
    pub(crate) snapshots: SnapshotManager,
    /// The coordinator lock: reads take the shared guard, every write path
    /// (and the closed-flag transition) takes the exclusive guard. The
    /// subcomponents carry their own internal locks; the nesting order is
    /// always coordinator guard first, subcomponent lock second.
    pub(crate) mu: RwLock<DbState>,
    pub(crate) stats: StatsTracker,
    pub(crate) compacting: Mutex<bool>,
    /// Serializes manifest refreshes: two concurrent refreshers would race
    /// on the same temp file.
    pub(crate) refresh_mu: Mutex<()>,
    pub(crate) lock_file: Mutex<Option<FileLock>>,
    pub(crate) workers: Mutex<Workers>,
}

pub(crate) struct DbState {
    pub(crate) closed: bool,
}

impl Db {
    /// Opens or creates a database at `opts.path`.
    ///
    /// Recovery materializes the index from the latest snapshot plus all WAL
    /// segments newer than it, skipping records already expired. Fails with
    /// [`Error::Locked`] if another process holds the directory lock.
    pub fn open(opts: Options) -> Result<Db> {
        if opts.path.as_os_str().is_empty() {
            return Err(Error::Io(std::io::Error::new(
                std::io::ErrorKind::InvalidInput,
                "data directory path required",
            )));
        }
        let opts = opts.with_defaults();

        std::fs::create_dir_all(&opts.path)?;
        let lock_file = FileLock::acquire(&opts.path.join("LOCK"))?;

        let index = MemIndex::new();
        let snapshots = SnapshotManager::new(&opts.path.join("snapshots"));
        let wal = WalManager::open(&opts.path.join("wal"), opts.max_wal_size)?;

        let man = manifest::load_or_default(&opts.path.join(manifest::MANIFEST_FILENAME))?;
        if let Some(info) = recovery::latest_snapshot(&man) {
            recovery::load_snapshot_into(&snapshots, &info.path, &index)?;
        }
        recovery::replay_wal(&index, &opts.path.join("wal"), man.last_snapshot_seq)?;

        let path = opts.path.clone();
        let inner = Arc::new(DbInner {
            path,
            opts,
            index,
            wal,
            snapshots,
            mu: RwLock::new(DbState { closed: false }),
            stats: StatsTracker::new(),
            compacting: Mutex::new(false),
            refresh_mu: Mutex::new(()),
            lock_file: Mutex::new(Some(lock_file)),
            workers: Mutex::new(Workers::default()),
        });

        // Recovery may have found segments or snapshots the previous run
        // never recorded; reflect actual on-disk state. Best effort.
        let _ = inner.refresh_manifest();

        let weak = Arc::downgrade(&inner);
        inner.wal.set_rotate_hook(Box::new(move || {
            if let Some(db) = weak.upgrade() {
                DbInner::spawn_compaction(&db);
                let _ = db.refresh_manifest();
            }
        }));

        workers::start_sync_worker(&inner);
        workers::start_ttl_worker(&inner);

        Ok(Db { inner })
    }

    /// Flushes WAL data to disk. The explicit durability point in
    /// [`SyncMode::Manual`].
    pub fn sync(&self) -> Result<()> {
        self.inner.sync()
    }

    /// Creates a snapshot of the live index and prunes WAL segments it
    /// subsumes. A no-op if a compaction is already running.
    pub fn compact(&self) -> Result<()> {
        self.inner.compact()
    }

    /// Closes the handle: stops workers, syncs and closes the WAL, releases
    /// the directory lock. Idempotent; subsequent operations fail with
    /// [`Error::Closed`].
    pub fn close(&self) -> Result<()> {
        {
            let mut state = self.inner.write_guard();
            if state.closed {
                return Ok(());
            }
            state.closed = true;
        }

        // Workers observe the closed flag on their next tick; join them
        // before tearing down the WAL underneath their feet.
        self.inner.stop_workers();

        let mut first_err: Option<Error> = None;
        if let Err(e) = self.inner.wal.sync() {
            first_err.get_or_insert(e.into());
        }
        if let Err(e) = self.inner.wal.close() {
            first_err.get_or_insert(e.into());
        }
        let lock = self
            .inner
            .lock_file
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take();
        if let Some(lock) = lock {
            if let Err(e) = lock.unlock() {
                first_err.get_or_insert(e);
            }
        }

        match first_err {
            Some(e) => Err(e),
            None => Ok(()),
        }
    }
}

impl Drop for Db {
    fn drop(&mut self) {
        let _ = self.close();
    }
}

impl DbInner {
    pub(crate) fn read_guard(&self) -> RwLockReadGuard<'_, DbState> {
        self.mu.read().unwrap_or_else(PoisonError::into_inner)
    }

    pub(crate) fn write_guard(&self) -> RwLockWriteGuard<'_, DbState> {
        self.mu.write().unwrap_or_else(PoisonError::into_inner)
    }

    pub(crate) fn sync(&self) -> Result<()> {
        let state = self.read_guard();
        if state.closed {
            return Err(Error::Closed);
        }
        Ok(self.wal.sync()?)
    }

    pub(crate) fn refresh_manifest(&self) -> Result<()> {
        let _guard = self.refresh_mu.lock().unwrap_or_else(PoisonError::into_inner);
        manifest::refresh(&self.path)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests;
