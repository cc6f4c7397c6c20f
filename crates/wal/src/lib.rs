//! # WAL — Write-Ahead Log
//!
//! Provides crash-safe durability for the MiniKV store.
//!
//! Every mutation (`SET` or `DELETE`) is serialized into a binary record and
//! appended to the current WAL segment **before** the corresponding in-memory
//! update. On restart the segments newer than the last snapshot are replayed
//! to reconstruct the index, guaranteeing that no acknowledged write is lost.
//!
//! ## Binary Record Format
//!
//! ```text
//! [payload_len: uvarint][payload ...]
//!
//! payload = [type: u8][timestamp: i64 LE][expires_at: i64 LE]
//!           [key_len: uvarint][value_len: uvarint]
//!           [key bytes][value bytes]
//!           [crc32: u32 LE]     <- CRC32-IEEE over all preceding payload bytes
//! ```
//!
//! `payload_len` covers everything after itself, including the 4-byte CRC.
//!
//! ## Segments
//!
//! The log is split into numbered segment files (`000001.log`, `000002.log`,
//! ...). [`WalManager`] appends to the highest-numbered segment and rotates to
//! a fresh one once the configured size limit would be exceeded. Closed
//! segments are immutable; compaction deletes those subsumed by a snapshot.
//!
//! ## Example
//!
//! ```rust,no_run
//! use wal::{read_segment, RecordType, WalManager, WalRecord};
//!
//! let wal = WalManager::open("data/wal".as_ref(), 0).unwrap();
//! wal.append_record(&WalRecord {
//!     record_type: RecordType::Set,
//!     timestamp: 1,
//!     expires_at: -1,
//!     key: b"hello".to_vec(),
//!     value: b"world".to_vec(),
//! }).unwrap();
//! wal.sync().unwrap();
//!
//! for rec in read_segment("data/wal/000001.log".as_ref()).unwrap() {
//!     println!("{:?}", rec.key);
//! }
//! ```

mod manager;
mod reader;
mod record;

pub use manager::{segment_name, RotateHook, WalManager};
pub use reader::{list_segments, parse_segment_seq, read_segment, SegmentMeta};
pub use record::{decode_record, encode_record, RecordType, WalRecord};

use std::io;
use thiserror::Error;

/// Errors that can occur during WAL operations.
#[derive(Debug, Error)]
pub enum WalError {
    /// An underlying I/O error.
    #[error("io error: {0}")]
    Io(#[from] io::Error),

    /// A record declared lengths its buffer cannot satisfy, or carried an
    /// unknown type byte.
    #[error("invalid record")]
    InvalidRecord,

    /// The stored CRC disagrees with the CRC recomputed over the payload.
    #[error("checksum mismatch")]
    ChecksumMismatch,

    /// An append or sync was attempted after the manager was closed.
    #[error("wal closed")]
    Closed,
}
