//! The canonical write path. Every durability-critical mutation funnels
//! through [`DbInner::set_with_expires_at_locked`] or [`Db::delete`]:
//!
//! ```text
//! validate → exclusive guard → closed/read-only check →
//! WAL append → fsync (SyncAlways) → index mutation
//! ```
//!
//! The index is never touched before the WAL append has returned success.

use memindex::now_nanos;
use wal::{RecordType, WalRecord};

use crate::error::{Error, Result};
use crate::options::SyncMode;
use crate::{Db, DbInner, DbState};

impl Db {
    /// Stores a key-value pair without expiration.
    pub fn set(&self, key: &[u8], value: &[u8]) -> Result<()> {
        self.inner.set_with_expires_at(key, value, -1)
    }

    /// Removes a key if it exists. Deleting a missing or empty key succeeds.
    pub fn delete(&self, key: &[u8]) -> Result<()> {
        let _timer = self.inner.stats.record_delete();
        if key.len() > self.inner.opts.max_key_size {
            return Err(Error::KeyTooLarge);
        }
        if key.is_empty() {
            return Ok(());
        }

        let state = self.inner.write_guard();
        if state.closed {
            return Err(Error::Closed);
        }
        if self.inner.opts.read_only {
            return Err(Error::ReadOnly);
        }

        let record = WalRecord {
            record_type: RecordType::Delete,
            timestamp: now_nanos(),
            expires_at: -1,
            key: key.to_vec(),
            value: Vec::new(),
        };
        self.inner.wal.append_record(&record)?;
        if self.inner.opts.sync_mode == SyncMode::Always {
            self.inner.wal.sync()?;
        }

        self.inner.index.delete(key);
        Ok(())
    }
}

impl DbInner {
    pub(crate) fn set_with_expires_at(
        &self,
        key: &[u8],
        value: &[u8],
        expires_at: i64,
    ) -> Result<()> {
        let mut state = self.write_guard();
        self.set_with_expires_at_locked(&mut state, key, value, expires_at, 0, false)
    }

    /// Writes a `Set` record and applies it to the index. Caller must hold
    /// the exclusive guard (witnessed by `&mut DbState`).
    ///
    /// `preserve_created` keeps the supplied `created_at` so rewrites
    /// (increment, compare-and-swap, expire, persist) do not reset an
    /// entry's age; plain sets stamp the current time.
    pub(crate) fn set_with_expires_at_locked(
        &self,
        state: &mut DbState,
        key: &[u8],
        value: &[u8],
        expires_at: i64,
        created_at: i64,
        preserve_created: bool,
    ) -> Result<()> {
        let _timer = self.stats.record_write();
        if key.len() > self.opts.max_key_size {
            return Err(Error::KeyTooLarge);
        }
        if value.len() > self.opts.max_value_size {
            return Err(Error::ValueTooLarge);
        }
        if key.is_empty() {
            return Err(Error::NotFound);
        }
        if state.closed {
            return Err(Error::Closed);
        }
        if self.opts.read_only {
            return Err(Error::ReadOnly);
        }

        let now = now_nanos();
        let created_at = if preserve_created && created_at != 0 {
            created_at
        } else {
            now
        };

        let record = WalRecord {
            record_type: RecordType::Set,
            timestamp: now,
            expires_at,
            key: key.to_vec(),
            value: value.to_vec(),
        };
        self.wal.append_record(&record)?;
        if self.opts.sync_mode == SyncMode::Always {
            self.wal.sync()?;
        }

        let WalRecord { key, value, .. } = record;
        self.index.set_entry(key, value, expires_at, created_at);
        Ok(())
    }
}
