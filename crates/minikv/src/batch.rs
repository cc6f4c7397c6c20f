//! Batched atomic writes.
//!
//! A batch buffers operations and commits them in one critical section: all
//! records are appended to the WAL, fsynced if the mode requires it, and
//! only then applied to the index together. In-memory visibility is
//! all-or-nothing; a crash mid-append leaves a record prefix in the WAL,
//! which recovery replays as-is.

use std::time::Duration;

use memindex::now_nanos;
use wal::{encode_record, RecordType, WalRecord};

use crate::error::{Error, Result};
use crate::options::SyncMode;
use crate::Db;

enum BatchOp {
    Set {
        key: Vec<u8>,
        value: Vec<u8>,
        expires_at: i64,
    },
    Delete {
        key: Vec<u8>,
    },
}

/// Buffered write operations bound to a database handle.
///
/// Buffering never fails; the first validation error is remembered and
/// returned by [`write`](Batch::write). Dropping a batch discards it.
pub struct Batch<'db> {
    db: &'db Db,
    ops: Vec<BatchOp>,
    size: u64,
    err: Option<Error>,
}

impl Db {
    /// Creates an empty batch bound to this handle.
    pub fn new_batch(&self) -> Batch<'_> {
        Batch {
            db: self,
            ops: Vec::new(),
            size: 0,
            err: None,
        }
    }
}

impl Batch<'_> {
    /// Buffers a set without expiration.
    pub fn set(&mut self, key: &[u8], value: &[u8]) {
        self.add_set(key, value, -1);
    }

    /// Buffers a set expiring `ttl` from now (zero `ttl` means no expiry).
    pub fn set_with_ttl(&mut self, key: &[u8], value: &[u8], ttl: Duration) {
        let expires_at = if ttl.is_zero() {
            -1
        } else {
            now_nanos() + ttl.as_nanos() as i64
        };
        self.add_set(key, value, expires_at);
    }

    /// Buffers a delete.
    pub fn delete(&mut self, key: &[u8]) {
        if self.err.is_some() || key.is_empty() {
            return;
        }
        if key.len() > self.db.inner.opts.max_key_size {
            self.err = Some(Error::KeyTooLarge);
            return;
        }
        self.size += key.len() as u64;
        self.ops.push(BatchOp::Delete { key: key.to_vec() });
    }

    /// Number of buffered operations.
    pub fn len(&self) -> usize {
        self.ops.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ops.is_empty()
    }

    /// Applies all buffered operations atomically, consuming the batch.
    ///
    /// An empty batch is a successful no-op. Fails with
    /// [`Error::BatchTooBig`] when the buffered key+value bytes exceed the
    /// configured limit, or with the first buffering error if any occurred.
    pub fn write(mut self) -> Result<()> {
        if let Some(err) = self.err.take() {
            return Err(err);
        }
        if self.ops.is_empty() {
            return Ok(());
        }

        let inner = &self.db.inner;
        let state = inner.write_guard();
        if state.closed {
            return Err(Error::Closed);
        }
        if inner.opts.read_only {
            return Err(Error::ReadOnly);
        }
        if self.size > inner.opts.max_batch_size {
            return Err(Error::BatchTooBig);
        }

        let (set_count, delete_count) = self.counts();
        let _writes = inner.stats.record_writes(set_count);
        let _deletes = inner.stats.record_deletes(delete_count);

        let now = now_nanos();
        let encoded: Vec<Vec<u8>> = self
            .ops
            .iter()
            .map(|op| {
                let record = match op {
                    BatchOp::Set {
                        key,
                        value,
                        expires_at,
                    } => WalRecord {
                        record_type: RecordType::Set,
                        timestamp: now,
                        expires_at: *expires_at,
                        key: key.clone(),
                        value: value.clone(),
                    },
                    BatchOp::Delete { key } => WalRecord {
                        record_type: RecordType::Delete,
                        timestamp: now,
                        expires_at: -1,
                        key: key.clone(),
                        value: Vec::new(),
                    },
                };
                encode_record(&record)
            })
            .collect();

        for payload in &encoded {
            inner.wal.append_raw(payload)?;
        }
        if inner.opts.sync_mode == SyncMode::Always {
            inner.wal.sync()?;
        }

        for op in self.ops.drain(..) {
            match op {
                BatchOp::Set {
                    key,
                    value,
                    expires_at,
                } => inner.index.set_entry(key, value, expires_at, now),
                BatchOp::Delete { key } => inner.index.delete(&key),
            }
        }
        Ok(())
    }

    /// Abandons the buffered operations. Equivalent to dropping the batch.
    pub fn discard(self) {}

    fn add_set(&mut self, key: &[u8], value: &[u8], expires_at: i64) {
        if self.err.is_some() || key.is_empty() {
            return;
        }
        if key.len() > self.db.inner.opts.max_key_size {
            self.err = Some(Error::KeyTooLarge);
            return;
        }
        if value.len() > self.db.inner.opts.max_value_size {
            self.err = Some(Error::ValueTooLarge);
            return;
        }
        self.size += (key.len() + value.len()) as u64;
        self.ops.push(BatchOp::Set {
            key: key.to_vec(),
            value: value.to_vec(),
            expires_at,
        });
    }

    fn counts(&self) -> (u64, u64) {
        let sets = self
            .ops
            .iter()
            .filter(|op| matches!(op, BatchOp::Set { .. }))
            .count() as u64;
        (sets, self.ops.len() as u64 - sets)
    }
}
