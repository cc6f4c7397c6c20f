//! # Snapshot — sorted, checksum-trailed index dumps
//!
//! A snapshot is a point-in-time dump of the live index, written during
//! compaction. Together with the WAL segments newer than it, a snapshot is
//! sufficient to rebuild the full index on recovery.
//!
//! ## File format
//!
//! ```text
//! [magic: "MINIKVSN"][version: u32 LE][timestamp: i64 LE][count: u64 LE]
//! count * entry:
//!     [key_len: u64 LE][key][value_len: u64 LE][value]
//!     [expires_at: i64 LE][created_at: i64 LE]
//! [crc32: u32 LE]     <- CRC32-IEEE over the entry bytes only (header excluded)
//! ```
//!
//! Entries are sorted ascending by key and never include entries already
//! expired at the snapshot timestamp.

mod manager;

pub use manager::{parse_snapshot_seq, snapshot_name, SnapshotManager};

use byteorder::{ByteOrder, LittleEndian};
use crc32fast::Hasher as Crc32;
use std::io::{self, Write};
use std::path::Path;
use thiserror::Error;

/// File magic, first eight bytes of every snapshot.
pub const SNAPSHOT_MAGIC: [u8; 8] = *b"MINIKVSN";

/// Current snapshot format version.
pub const SNAPSHOT_VERSION: u32 = 1;

/// magic + version + timestamp + count
const HEADER_LEN: usize = 8 + 4 + 8 + 8;

/// Errors from snapshot encode/decode.
#[derive(Debug, Error)]
pub enum SnapshotError {
    #[error("io error: {0}")]
    Io(#[from] io::Error),

    /// Bad magic, or entry/trailer framing that does not line up with the
    /// declared count.
    #[error("invalid snapshot file")]
    InvalidSnapshot,

    /// The trailing CRC disagrees with the CRC recomputed over the entries.
    #[error("snapshot checksum mismatch")]
    ChecksumMismatch,
}

/// A single snapshot record.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SnapshotEntry {
    pub key: Vec<u8>,
    pub value: Vec<u8>,
    pub expires_at: i64,
    pub created_at: i64,
}

/// Snapshot metadata read back from the file header.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SnapshotHeader {
    pub version: u32,
    pub timestamp: i64,
    pub count: u64,
}

/// Writes a snapshot to `w`: header, entries sorted ascending by key, CRC
/// trailer. Returns the checksum written.
pub fn encode_snapshot<W: Write>(
    w: &mut W,
    entries: &[SnapshotEntry],
    version: u32,
    timestamp: i64,
) -> Result<u32, SnapshotError> {
    let mut sorted: Vec<&SnapshotEntry> = entries.iter().collect();
    sorted.sort_by(|a, b| a.key.cmp(&b.key));

    let mut header = [0u8; HEADER_LEN];
    header[..8].copy_from_slice(&SNAPSHOT_MAGIC);
    LittleEndian::write_u32(&mut header[8..12], version);
    LittleEndian::write_i64(&mut header[12..20], timestamp);
    LittleEndian::write_u64(&mut header[20..28], sorted.len() as u64);
    w.write_all(&header)?;

    let mut hasher = Crc32::new();
    let mut buf = Vec::new();
    for entry in sorted {
        buf.clear();
        write_entry(&mut buf, entry);
        hasher.update(&buf);
        w.write_all(&buf)?;
    }

    let checksum = hasher.finalize();
    let mut trailer = [0u8; 4];
    LittleEndian::write_u32(&mut trailer, checksum);
    w.write_all(&trailer)?;

    Ok(checksum)
}

/// Reads a snapshot file, validating the magic, entry framing, and trailer
/// CRC.
pub fn decode_snapshot(path: &Path) -> Result<(SnapshotHeader, Vec<SnapshotEntry>), SnapshotError> {
    let data = std::fs::read(path)?;
    if data.len() < HEADER_LEN + 4 || data[..8] != SNAPSHOT_MAGIC {
        return Err(SnapshotError::InvalidSnapshot);
    }

    let header = SnapshotHeader {
        version: LittleEndian::read_u32(&data[8..12]),
        timestamp: LittleEndian::read_i64(&data[12..20]),
        count: LittleEndian::read_u64(&data[20..28]),
    };

    let mut entries = Vec::with_capacity(header.count.min(1 << 20) as usize);
    let mut off = HEADER_LEN;
    for _ in 0..header.count {
        let (entry, consumed) = read_entry(&data[off..])?;
        entries.push(entry);
        off += consumed;
    }

    // The trailer must be exactly the last four bytes.
    if data.len() != off + 4 {
        return Err(SnapshotError::InvalidSnapshot);
    }
    let stored = LittleEndian::read_u32(&data[off..off + 4]);
    let mut hasher = Crc32::new();
    hasher.update(&data[HEADER_LEN..off]);
    if hasher.finalize() != stored {
        return Err(SnapshotError::ChecksumMismatch);
    }

    Ok((header, entries))
}

fn write_entry(buf: &mut Vec<u8>, entry: &SnapshotEntry) {
    let mut scratch = [0u8; 8];
    LittleEndian::write_u64(&mut scratch, entry.key.len() as u64);
    buf.extend_from_slice(&scratch);
    buf.extend_from_slice(&entry.key);
    LittleEndian::write_u64(&mut scratch, entry.value.len() as u64);
    buf.extend_from_slice(&scratch);
    buf.extend_from_slice(&entry.value);
    LittleEndian::write_i64(&mut scratch, entry.expires_at);
    buf.extend_from_slice(&scratch);
    LittleEndian::write_i64(&mut scratch, entry.created_at);
    buf.extend_from_slice(&scratch);
}

fn read_entry(data: &[u8]) -> Result<(SnapshotEntry, usize), SnapshotError> {
    let key = read_bytes(data, 0)?;
    let mut off = 8 + key.len();
    let value = read_bytes(data, off)?;
    off += 8 + value.len();
    if data.len().saturating_sub(off) < 16 {
        return Err(SnapshotError::InvalidSnapshot);
    }
    let expires_at = LittleEndian::read_i64(&data[off..off + 8]);
    let created_at = LittleEndian::read_i64(&data[off + 8..off + 16]);
    Ok((
        SnapshotEntry {
            key,
            value,
            expires_at,
            created_at,
        },
        off + 16,
    ))
}

fn read_bytes(data: &[u8], off: usize) -> Result<Vec<u8>, SnapshotError> {
    if data.len().saturating_sub(off) < 8 {
        return Err(SnapshotError::InvalidSnapshot);
    }
    let len = usize::try_from(LittleEndian::read_u64(&data[off..off + 8]))
        .map_err(|_| SnapshotError::InvalidSnapshot)?;
    if data.len().saturating_sub(off + 8) < len {
        return Err(SnapshotError::InvalidSnapshot);
    }
    Ok(data[off + 8..off + 8 + len].to_vec())
}
