//! Compaction: capture a consistent snapshot of the live index and prune
//! the WAL segments it subsumes.
//!
//! Correctness hinges on capture order: the index scan and the WAL sequence
//! are taken under the same shared guard, so every record in a segment with
//! sequence below the captured value is already reflected in the captured
//! entries. Writes racing with compaction land in segments at or above the
//! captured sequence and survive the prune.

use std::sync::{Arc, PoisonError};

use memindex::now_nanos;
use snapshot::{SnapshotEntry, SNAPSHOT_VERSION};

use crate::error::{Error, Result};
use crate::DbInner;

impl DbInner {
    /// Runs one compaction. Collapses to a no-op when another compaction is
    /// already in flight.
    pub(crate) fn compact(&self) -> Result<()> {
        if !self.try_begin_compaction() {
            return Ok(());
        }
        let result = self.compact_once();
        self.end_compaction();
        result
    }

    /// One-shot background compaction, kicked by the WAL rotation hook.
    pub(crate) fn spawn_compaction(inner: &Arc<DbInner>) {
        let db = Arc::clone(inner);
        std::thread::spawn(move || {
            let _ = db.compact();
        });
    }

    fn compact_once(&self) -> Result<()> {
        let (entries, seq) = {
            let state = self.read_guard();
            if state.closed {
                return Err(Error::Closed);
            }
            (self.index.scan(b"", 0), self.wal.current_seq())
        };

        let snap_entries: Vec<SnapshotEntry> = entries
            .into_iter()
            .map(|ke| SnapshotEntry {
                key: ke.key,
                value: ke.entry.value,
                expires_at: ke.entry.expires_at,
                created_at: ke.entry.created_at,
            })
            .collect();

        let seq = seq.max(1);
        self.snapshots
            .create_snapshot(snap_entries, SNAPSHOT_VERSION, now_nanos(), seq)?;

        self.delete_wal_segments_below(seq)?;
        self.refresh_manifest()
    }

    /// Removes every WAL segment whose records are subsumed by a snapshot at
    /// `keep_seq`.
    fn delete_wal_segments_below(&self, keep_seq: u64) -> Result<()> {
        for segment in wal::list_segments(&self.path.join("wal"))? {
            if segment.seq < keep_seq {
                let _ = std::fs::remove_file(&segment.path);
            }
        }
        Ok(())
    }

    fn try_begin_compaction(&self) -> bool {
        let mut compacting = self
            .compacting
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        if *compacting {
            return false;
        }
        *compacting = true;
        true
    }

    fn end_compaction(&self) {
        let mut compacting = self
            .compacting
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        *compacting = false;
    }
}
