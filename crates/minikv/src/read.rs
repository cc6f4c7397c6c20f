//! Read path: point lookups, scans, and key dumps. Reads take the shared
//! guard; expired entries are treated as absent (and lazily removed by the
//! index).

use std::io::Write;

use crate::error::{Error, Result};
use crate::Db;

impl Db {
    /// Returns a copy of the value for `key`, or [`Error::NotFound`].
    pub fn get(&self, key: &[u8]) -> Result<Vec<u8>> {
        let _timer = self.inner.stats.record_read();
        if key.len() > self.inner.opts.max_key_size {
            return Err(Error::KeyTooLarge);
        }
        if key.is_empty() {
            return Err(Error::NotFound);
        }

        let state = self.inner.read_guard();
        if state.closed {
            return Err(Error::Closed);
        }
        let entry = self.inner.index.get(key).ok_or(Error::NotFound)?;
        Ok(entry.value)
    }

    /// Allocation-reusing variant of [`get`](Db::get): copies the value into
    /// `dst`, reusing its capacity when sufficient, and returns the resulting
    /// buffer.
    pub fn get_into(&self, mut dst: Vec<u8>, key: &[u8]) -> Result<Vec<u8>> {
        let _timer = self.inner.stats.record_read();
        if key.len() > self.inner.opts.max_key_size {
            return Err(Error::KeyTooLarge);
        }
        if key.is_empty() {
            return Err(Error::NotFound);
        }

        let state = self.inner.read_guard();
        if state.closed {
            return Err(Error::Closed);
        }
        let entry = self.inner.index.get(key).ok_or(Error::NotFound)?;
        drop(state);

        dst.clear();
        dst.extend_from_slice(&entry.value);
        Ok(dst)
    }

    /// Reports whether `key` exists and is not expired. An empty key never
    /// exists.
    pub fn exists(&self, key: &[u8]) -> Result<bool> {
        if key.len() > self.inner.opts.max_key_size {
            return Err(Error::KeyTooLarge);
        }
        if key.is_empty() {
            return Ok(false);
        }

        let state = self.inner.read_guard();
        if state.closed {
            return Err(Error::Closed);
        }
        Ok(self.inner.index.exists(key))
    }

    /// Returns up to `limit` key-value pairs whose keys start with `prefix`,
    /// in ascending key order. `limit == 0` means unlimited.
    pub fn scan(&self, prefix: &[u8], limit: usize) -> Result<Vec<(Vec<u8>, Vec<u8>)>> {
        let _timer = self.inner.stats.record_scan();
        if prefix.len() > self.inner.opts.max_key_size {
            return Err(Error::KeyTooLarge);
        }

        let state = self.inner.read_guard();
        if state.closed {
            return Err(Error::Closed);
        }
        let entries = self.inner.index.scan(prefix, limit);
        drop(state);

        Ok(entries
            .into_iter()
            .map(|ke| (ke.key, ke.entry.value))
            .collect())
    }

    /// Returns up to `limit` key-value pairs whose keys lie in
    /// `[start, end]` (inclusive), in ascending key order.
    pub fn scan_range(
        &self,
        start: &[u8],
        end: &[u8],
        limit: usize,
    ) -> Result<Vec<(Vec<u8>, Vec<u8>)>> {
        let _timer = self.inner.stats.record_scan();
        if start.len() > self.inner.opts.max_key_size || end.len() > self.inner.opts.max_key_size {
            return Err(Error::KeyTooLarge);
        }

        let state = self.inner.read_guard();
        if state.closed {
            return Err(Error::Closed);
        }
        let entries = self.inner.index.scan_range(start, end, limit);
        drop(state);

        Ok(entries
            .into_iter()
            .map(|ke| (ke.key, ke.entry.value))
            .collect())
    }

    /// Returns all live keys matching the glob `pattern` (`*` and `?`),
    /// ascending.
    pub fn keys(&self, pattern: &str) -> Result<Vec<Vec<u8>>> {
        let _timer = self.inner.stats.record_scan();
        let state = self.inner.read_guard();
        if state.closed {
            return Err(Error::Closed);
        }
        Ok(self.inner.index.keys(pattern))
    }

    /// Returns the number of live keys.
    pub fn count(&self) -> Result<usize> {
        let _timer = self.inner.stats.record_scan();
        let state = self.inner.read_guard();
        if state.closed {
            return Err(Error::Closed);
        }
        Ok(self.inner.index.count())
    }

    /// Writes one line per live key to `w`: key, value length, and
    /// expiration (Unix nanoseconds, `-1` for none), tab-separated.
    pub fn dump_keys(&self, w: &mut dyn Write) -> Result<()> {
        let entries = {
            let state = self.inner.read_guard();
            if state.closed {
                return Err(Error::Closed);
            }
            self.inner.index.scan(b"", 0)
        };

        for ke in entries {
            w.write_all(&ke.key)?;
            let expires = if ke.entry.expires_at < 0 {
                -1
            } else {
                ke.entry.expires_at
            };
            writeln!(w, "\t{}\t{}", ke.entry.value.len(), expires)?;
        }
        w.flush()?;
        Ok(())
    }
}
