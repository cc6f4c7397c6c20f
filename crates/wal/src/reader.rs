//! Segment replay: sequential decode with torn-tail tolerance.

use std::path::{Path, PathBuf};

use crate::record::{decode_record, WalRecord};
use crate::WalError;

/// A WAL segment discovered on disk.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SegmentMeta {
    pub seq: u64,
    pub path: PathBuf,
}

/// Reads every fully-framed record from a segment file.
///
/// Decoding stops at the first malformed record: a crash can leave a
/// partially-written record at the tail of the newest segment, and that
/// truncated tail must not poison recovery. All records successfully decoded
/// before it are returned with no error.
pub fn read_segment(path: &Path) -> Result<Vec<WalRecord>, WalError> {
    let data = std::fs::read(path)?;

    let mut records = Vec::new();
    let mut off = 0;
    while off < data.len() {
        match decode_record(&data[off..]) {
            Ok((record, consumed)) => {
                if consumed == 0 {
                    break;
                }
                records.push(record);
                off += consumed;
            }
            // Torn write at the tail; keep what we have.
            Err(_) => break,
        }
    }

    Ok(records)
}

/// Enumerates segment files in `dir`, sorted by ascending sequence number.
///
/// Files that are not `NNNNNN.log` are ignored.
pub fn list_segments(dir: &Path) -> Result<Vec<SegmentMeta>, WalError> {
    let mut segments = Vec::new();
    for entry in std::fs::read_dir(dir)? {
        let entry = entry?;
        if entry.file_type()?.is_dir() {
            continue;
        }
        let path = entry.path();
        if let Some(seq) = parse_segment_seq(&path) {
            segments.push(SegmentMeta { seq, path });
        }
    }
    segments.sort_by_key(|s| s.seq);
    Ok(segments)
}

/// Extracts the sequence number from a `NNNNNN.log` segment path.
pub fn parse_segment_seq(path: &Path) -> Option<u64> {
    let name = path.file_name()?.to_str()?;
    let base = name.strip_suffix(".log")?;
    if base.is_empty() || !base.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    base.parse().ok()
}
