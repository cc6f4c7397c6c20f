//! Binary record codec: pure encode/decode with CRC32, no I/O.

use byteorder::{ByteOrder, LittleEndian};
use crc32fast::Hasher as Crc32;

use crate::WalError;

/// Fixed portion of the payload: type byte, two i64 timestamps, trailing CRC.
const PAYLOAD_FIXED: usize = 1 + 8 + 8 + 4;

/// WAL operation kinds.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum RecordType {
    /// A key-value insertion or replacement.
    Set = 1,
    /// A key deletion. Delete records carry an empty value and
    /// `expires_at = -1`.
    Delete = 2,
}

impl RecordType {
    fn from_byte(b: u8) -> Option<RecordType> {
        match b {
            1 => Some(RecordType::Set),
            2 => Some(RecordType::Delete),
            _ => None,
        }
    }
}

/// A single write-ahead log entry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WalRecord {
    pub record_type: RecordType,
    /// Wall-clock time of the write in Unix nanoseconds. Replay uses this as
    /// the entry's creation timestamp.
    pub timestamp: i64,
    /// Expiration in Unix nanoseconds; negative means no expiry.
    pub expires_at: i64,
    pub key: Vec<u8>,
    pub value: Vec<u8>,
}

/// Serializes a record into its framed on-disk form.
pub fn encode_record(record: &WalRecord) -> Vec<u8> {
    let key_len = record.key.len() as u64;
    let value_len = record.value.len() as u64;

    let payload_len = PAYLOAD_FIXED - 4
        + uvarint_len(key_len)
        + uvarint_len(value_len)
        + record.key.len()
        + record.value.len()
        + 4;

    let mut out = Vec::with_capacity(uvarint_len(payload_len as u64) + payload_len);
    put_uvarint(&mut out, payload_len as u64);

    let payload_start = out.len();
    out.push(record.record_type as u8);
    let mut scratch = [0u8; 8];
    LittleEndian::write_i64(&mut scratch, record.timestamp);
    out.extend_from_slice(&scratch);
    LittleEndian::write_i64(&mut scratch, record.expires_at);
    out.extend_from_slice(&scratch);
    put_uvarint(&mut out, key_len);
    put_uvarint(&mut out, value_len);
    out.extend_from_slice(&record.key);
    out.extend_from_slice(&record.value);

    let mut hasher = Crc32::new();
    hasher.update(&out[payload_start..]);
    let crc = hasher.finalize();
    let mut crc_buf = [0u8; 4];
    LittleEndian::write_u32(&mut crc_buf, crc);
    out.extend_from_slice(&crc_buf);

    out
}

/// Decodes one record from the front of `data`.
///
/// On success returns the record and the exact number of bytes consumed
/// (`varint_size(payload_len) + payload_len`). A buffer shorter than the
/// declared payload, an embedded length overrun, or an unknown type byte
/// fails with [`WalError::InvalidRecord`]; a CRC disagreement fails with
/// [`WalError::ChecksumMismatch`].
pub fn decode_record(data: &[u8]) -> Result<(WalRecord, usize), WalError> {
    let (payload_len, prefix) = take_uvarint(data).ok_or(WalError::InvalidRecord)?;
    let payload_len = usize::try_from(payload_len).map_err(|_| WalError::InvalidRecord)?;
    if data.len().saturating_sub(prefix) < payload_len {
        return Err(WalError::InvalidRecord);
    }
    let payload = &data[prefix..prefix + payload_len];
    if payload.len() < PAYLOAD_FIXED {
        return Err(WalError::InvalidRecord);
    }

    let record_type = RecordType::from_byte(payload[0]).ok_or(WalError::InvalidRecord)?;
    let timestamp = LittleEndian::read_i64(&payload[1..9]);
    let expires_at = LittleEndian::read_i64(&payload[9..17]);

    let mut off = 17;
    let (key_len, read) = take_uvarint(&payload[off..]).ok_or(WalError::InvalidRecord)?;
    off += read;
    let (value_len, read) = take_uvarint(&payload[off..]).ok_or(WalError::InvalidRecord)?;
    off += read;

    // Corrupt length fields can be astronomically large; check without
    // overflowing the arithmetic.
    let key_len = usize::try_from(key_len).map_err(|_| WalError::InvalidRecord)?;
    let value_len = usize::try_from(value_len).map_err(|_| WalError::InvalidRecord)?;
    let remaining = payload
        .len()
        .checked_sub(off)
        .and_then(|r| r.checked_sub(4))
        .ok_or(WalError::InvalidRecord)?;
    if key_len > remaining || value_len > remaining - key_len {
        return Err(WalError::InvalidRecord);
    }
    let key = payload[off..off + key_len].to_vec();
    off += key_len;
    let value = payload[off..off + value_len].to_vec();
    off += value_len;

    let stored = LittleEndian::read_u32(&payload[off..off + 4]);
    let mut hasher = Crc32::new();
    hasher.update(&payload[..off]);
    if hasher.finalize() != stored {
        return Err(WalError::ChecksumMismatch);
    }

    Ok((
        WalRecord {
            record_type,
            timestamp,
            expires_at,
            key,
            value,
        },
        prefix + payload_len,
    ))
}

/// Appends `v` to `buf` as a protobuf-style unsigned varint.
fn put_uvarint(buf: &mut Vec<u8>, mut v: u64) {
    while v >= 0x80 {
        buf.push((v as u8) | 0x80);
        v >>= 7;
    }
    buf.push(v as u8);
}

/// Reads a uvarint from the front of `data`, returning the value and the
/// number of bytes consumed. `None` on truncation or a >10-byte varint.
fn take_uvarint(data: &[u8]) -> Option<(u64, usize)> {
    let mut value: u64 = 0;
    let mut shift = 0u32;
    for (i, &b) in data.iter().enumerate() {
        if i == 10 {
            return None;
        }
        if b < 0x80 {
            if i == 9 && b > 1 {
                return None; // overflows u64
            }
            return Some((value | (u64::from(b) << shift), i + 1));
        }
        value |= u64::from(b & 0x7f) << shift;
        shift += 7;
    }
    None
}

/// Encoded size of `v` as a uvarint.
fn uvarint_len(v: u64) -> usize {
    let mut n = 1;
    let mut v = v >> 7;
    while v != 0 {
        n += 1;
        v >>= 7;
    }
    n
}
