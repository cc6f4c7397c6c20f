//! The manifest names the current WAL sequence and the last snapshot
//! sequence, plus the on-disk inventory of segments and snapshots. Recovery
//! is governed by it: only WAL segments strictly newer than
//! `last_snapshot_seq` are replayed.
//!
//! ## File format
//!
//! A line-oriented text file, chosen over binary for operability — the state
//! of a database can be inspected with any pager:
//!
//! ```text
//! current_wal_seq: 3
//! last_snapshot_seq: 2
//! wal: 2 "data/wal/000002.log"
//! wal: 3 "data/wal/000003.log"
//! snapshot: 2 "data/snapshots/snapshot_000002.snap"
//! ```
//!
//! Lines starting with `#` are comments; unknown keys are ignored.
//!
//! ## Crash safety
//!
//! The manifest is rewritten atomically: write `MANIFEST.tmp`, fsync, rename
//! over `MANIFEST`. The rename is the commit point. A missing manifest is
//! equivalent to an empty one.

use std::fs::{File, OpenOptions};
use std::io::{BufRead, BufReader, Write};
use std::path::{Path, PathBuf};

use crate::error::{Error, Result};

/// Name of the manifest file within the data directory.
pub const MANIFEST_FILENAME: &str = "MANIFEST";

const MANIFEST_TMP_FILENAME: &str = "MANIFEST.tmp";

/// A WAL segment named by the manifest.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WalSegmentInfo {
    pub seq: u64,
    pub path: PathBuf,
}

/// A snapshot file named by the manifest.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SnapshotInfo {
    pub seq: u64,
    pub path: PathBuf,
}

/// In-memory representation of the manifest.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Manifest {
    pub current_wal_seq: u64,
    pub last_snapshot_seq: u64,
    pub wal_segments: Vec<WalSegmentInfo>,
    pub snapshots: Vec<SnapshotInfo>,
}

/// Loads a manifest from disk.
pub fn read_manifest(path: &Path) -> Result<Manifest> {
    let file = File::open(path)?;
    let reader = BufReader::new(file);

    let mut manifest = Manifest::default();
    for line in reader.lines() {
        let line = line?;
        let trimmed = line.trim();
        if trimmed.is_empty() || trimmed.starts_with('#') {
            continue;
        }

        let (key, value) = trimmed.split_once(':').ok_or_else(|| invalid_line(trimmed))?;
        let value = value.trim();
        match key.trim() {
            "current_wal_seq" => {
                manifest.current_wal_seq = value.parse().map_err(|_| invalid_line(trimmed))?;
            }
            "last_snapshot_seq" => {
                manifest.last_snapshot_seq = value.parse().map_err(|_| invalid_line(trimmed))?;
            }
            "wal" => {
                let (seq, path) = parse_seq_path(value).ok_or_else(|| invalid_line(trimmed))?;
                manifest.wal_segments.push(WalSegmentInfo { seq, path });
            }
            "snapshot" => {
                let (seq, path) = parse_seq_path(value).ok_or_else(|| invalid_line(trimmed))?;
                manifest.snapshots.push(SnapshotInfo { seq, path });
            }
            _ => {}
        }
    }

    Ok(manifest)
}

/// Loads a manifest, treating a missing file as the empty first-run state.
pub fn load_or_default(path: &Path) -> Result<Manifest> {
    match read_manifest(path) {
        Ok(manifest) => Ok(manifest),
        Err(Error::Io(e)) if e.kind() == std::io::ErrorKind::NotFound => Ok(Manifest::default()),
        Err(e) => Err(e),
    }
}

/// Writes the manifest atomically via temp file + fsync + rename.
pub fn write_manifest(path: &Path, manifest: &Manifest) -> Result<()> {
    let tmp_path = path.with_file_name(MANIFEST_TMP_FILENAME);
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }

    {
        let mut file = OpenOptions::new()
            .create(true)
            .write(true)
            .truncate(true)
            .open(&tmp_path)?;
        writeln!(file, "current_wal_seq: {}", manifest.current_wal_seq)?;
        writeln!(file, "last_snapshot_seq: {}", manifest.last_snapshot_seq)?;
        for seg in &manifest.wal_segments {
            writeln!(file, "wal: {} {}", seg.seq, quote(&seg.path))?;
        }
        for snap in &manifest.snapshots {
            writeln!(file, "snapshot: {} {}", snap.seq, quote(&snap.path))?;
        }
        file.flush()?;
        file.sync_all()?;
    }

    std::fs::rename(&tmp_path, path)?;
    Ok(())
}

/// Rebuilds the manifest from the actual contents of `wal/` and
/// `snapshots/` and writes it. Invoked after rotation and after compaction.
pub fn refresh(db_path: &Path) -> Result<Manifest> {
    let wal_dir = db_path.join("wal");
    let snap_dir = db_path.join("snapshots");

    let mut manifest = Manifest::default();

    for seg in wal::list_segments(&wal_dir)? {
        manifest.current_wal_seq = manifest.current_wal_seq.max(seg.seq);
        manifest.wal_segments.push(WalSegmentInfo {
            seq: seg.seq,
            path: seg.path,
        });
    }

    let snapshots = snapshot::SnapshotManager::new(&snap_dir).list_snapshots()?;
    for path in snapshots {
        if let Some(seq) = snapshot::parse_snapshot_seq(&path) {
            manifest.last_snapshot_seq = manifest.last_snapshot_seq.max(seq);
            manifest.snapshots.push(SnapshotInfo { seq, path });
        }
    }

    write_manifest(&db_path.join(MANIFEST_FILENAME), &manifest)?;
    Ok(manifest)
}

fn invalid_line(line: &str) -> Error {
    Error::Io(std::io::Error::new(
        std::io::ErrorKind::InvalidData,
        format!("manifest: invalid line {:?}", line),
    ))
}

fn parse_seq_path(value: &str) -> Option<(u64, PathBuf)> {
    let (seq_str, path_str) = value.split_once(' ')?;
    let seq = seq_str.trim().parse().ok()?;
    let path = unquote(path_str.trim())?;
    Some((seq, PathBuf::from(path)))
}

fn quote(path: &Path) -> String {
    let s = path.to_string_lossy();
    let escaped = s.replace('\\', "\\\\").replace('"', "\\\"");
    format!("\"{}\"", escaped)
}

fn unquote(s: &str) -> Option<String> {
    let inner = s.strip_prefix('"')?.strip_suffix('"')?;
    let mut out = String::with_capacity(inner.len());
    let mut chars = inner.chars();
    while let Some(c) = chars.next() {
        if c == '\\' {
            out.push(chars.next()?);
        } else {
            out.push(c);
        }
    }
    Some(out)
}
