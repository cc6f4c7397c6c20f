//! Snapshot file management: creation, loading, enumeration.

use std::fs::File;
use std::io::BufWriter;
use std::path::{Path, PathBuf};

use crate::{encode_snapshot, decode_snapshot, SnapshotEntry, SnapshotError, SnapshotHeader};

/// Creates, loads, and lists snapshot files in a directory.
pub struct SnapshotManager {
    dir: PathBuf,
}

impl SnapshotManager {
    pub fn new(dir: &Path) -> Self {
        Self {
            dir: dir.to_path_buf(),
        }
    }

    /// Writes a snapshot file named by the WAL sequence captured with the
    /// entries, so that pruning segments below that sequence is exact.
    ///
    /// Entries already expired at `timestamp` are excluded. Returns the path
    /// of the new file.
    pub fn create_snapshot(
        &self,
        entries: Vec<SnapshotEntry>,
        version: u32,
        timestamp: i64,
        seq: u64,
    ) -> Result<PathBuf, SnapshotError> {
        std::fs::create_dir_all(&self.dir)?;

        let live: Vec<SnapshotEntry> = entries
            .into_iter()
            .filter(|e| !(e.expires_at >= 0 && e.expires_at <= timestamp))
            .collect();

        let path = self.dir.join(snapshot_name(seq));
        let file = File::create(&path)?;
        let mut writer = BufWriter::new(file);
        encode_snapshot(&mut writer, &live, version, timestamp)?;
        writer.into_inner().map_err(|e| e.into_error())?.sync_all()?;

        Ok(path)
    }

    /// Reads a snapshot file back, validating its checksum.
    pub fn load_snapshot(
        &self,
        path: &Path,
    ) -> Result<(SnapshotHeader, Vec<SnapshotEntry>), SnapshotError> {
        decode_snapshot(path)
    }

    /// All `*.snap` files in the directory, sorted lexicographically (which
    /// matches numeric order thanks to zero-padded names).
    pub fn list_snapshots(&self) -> Result<Vec<PathBuf>, SnapshotError> {
        let entries = match std::fs::read_dir(&self.dir) {
            Ok(entries) => entries,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(e.into()),
        };

        let mut paths = Vec::new();
        for entry in entries {
            let entry = entry?;
            if entry.file_type()?.is_dir() {
                continue;
            }
            let path = entry.path();
            if path.extension().map_or(false, |ext| ext == "snap") {
                paths.push(path);
            }
        }
        paths.sort();
        Ok(paths)
    }
}

/// Snapshot file name for a captured WAL sequence.
pub fn snapshot_name(seq: u64) -> String {
    format!("snapshot_{:06}.snap", seq)
}

/// Extracts the sequence from a `snapshot_NNNNNN.snap` path.
pub fn parse_snapshot_seq(path: &Path) -> Option<u64> {
    let name = path.file_name()?.to_str()?;
    let base = name.strip_prefix("snapshot_")?.strip_suffix(".snap")?;
    if base.is_empty() || !base.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    base.parse().ok()
}
