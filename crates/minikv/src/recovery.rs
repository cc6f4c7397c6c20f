//! Cold-start recovery: latest snapshot + replay of newer WAL segments.

use std::path::Path;

use memindex::{is_expired, now_nanos, MemIndex};
use snapshot::SnapshotManager;
use wal::{list_segments, read_segment, RecordType};

use crate::error::Result;
use crate::manifest::{Manifest, SnapshotInfo};

/// The snapshot recovery should start from: the manifest entry with the
/// largest sequence.
pub(crate) fn latest_snapshot(man: &Manifest) -> Option<&SnapshotInfo> {
    man.snapshots.iter().max_by_key(|s| s.seq)
}

/// Loads a snapshot and inserts every entry still live right now.
pub(crate) fn load_snapshot_into(
    snapshots: &SnapshotManager,
    path: &Path,
    index: &MemIndex,
) -> Result<()> {
    let (_header, entries) = snapshots.load_snapshot(path)?;
    let now = now_nanos();
    for entry in entries {
        if is_expired(entry.expires_at, now) {
            continue;
        }
        index.set_entry(entry.key, entry.value, entry.expires_at, entry.created_at);
    }
    Ok(())
}

/// Replays WAL segments not subsumed by the last snapshot, in order.
///
/// Compaction prunes segments *below* the captured sequence; the boundary
/// segment itself stays, because writes racing with the capture land in it.
/// It is therefore replayed too: records the snapshot already reflects are
/// re-applied harmlessly (sets are upserts, deletes are absorbing).
///
/// `Set` records upsert (a record already expired at replay time is applied
/// as a delete, in case an older live value was recovered for the same key);
/// `Delete` records remove. The record timestamp becomes the entry's
/// creation time.
pub(crate) fn replay_wal(index: &MemIndex, wal_dir: &Path, snapshot_seq: u64) -> Result<()> {
    let now = now_nanos();
    for segment in list_segments(wal_dir)? {
        if segment.seq < snapshot_seq {
            continue;
        }
        for record in read_segment(&segment.path)? {
            match record.record_type {
                RecordType::Delete => index.delete(&record.key),
                RecordType::Set => {
                    if is_expired(record.expires_at, now) {
                        index.delete(&record.key);
                        continue;
                    }
                    index.set_entry(
                        record.key,
                        record.value,
                        record.expires_at,
                        record.timestamp,
                    );
                }
            }
        }
    }
    Ok(())
}
