//! Per-key expiration: TTL writes, TTL queries, and TTL rewrites.
//!
//! Expirations are stored as absolute Unix-nanosecond deadlines; `-1` means
//! no expiry. `expire` and `persist` rewrite the entry through the WAL so
//! the new deadline survives recovery, preserving `created_at`.

use std::time::Duration;

use memindex::now_nanos;

use crate::error::{Error, Result};
use crate::Db;

impl Db {
    /// Stores a key-value pair that expires `ttl` from now. A zero `ttl`
    /// stores without expiration.
    pub fn set_with_ttl(&self, key: &[u8], value: &[u8], ttl: Duration) -> Result<()> {
        if ttl.is_zero() {
            return self.set(key, value);
        }
        let expires_at = now_nanos() + ttl.as_nanos() as i64;
        self.inner.set_with_expires_at(key, value, expires_at)
    }

    /// Returns the remaining time to live for `key`: `None` for keys without
    /// expiration, [`Error::NotFound`] for missing or expired keys.
    pub fn ttl(&self, key: &[u8]) -> Result<Option<Duration>> {
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

        if entry.expires_at < 0 {
            return Ok(None);
        }
        let now = now_nanos();
        if entry.expires_at <= now {
            return Err(Error::NotFound);
        }
        Ok(Some(Duration::from_nanos((entry.expires_at - now) as u64)))
    }

    /// Sets a TTL on an existing key. Returns `false` if the key does not
    /// exist or `ttl` is zero. Preserves the entry's creation time.
    pub fn expire(&self, key: &[u8], ttl: Duration) -> Result<bool> {
        if ttl.is_zero() {
            return Ok(false);
        }
        if key.len() > self.inner.opts.max_key_size {
            return Err(Error::KeyTooLarge);
        }
        if key.is_empty() {
            return Ok(false);
        }

        let mut state = self.inner.write_guard();
        if state.closed {
            return Err(Error::Closed);
        }
        if self.inner.opts.read_only {
            return Err(Error::ReadOnly);
        }

        let Some(entry) = self.inner.index.get(key) else {
            return Ok(false);
        };
        let expires_at = now_nanos() + ttl.as_nanos() as i64;
        self.inner.set_with_expires_at_locked(
            &mut state,
            key,
            &entry.value,
            expires_at,
            entry.created_at,
            true,
        )?;
        Ok(true)
    }

    /// Removes the expiration from an existing key. Returns `false` if the
    /// key does not exist. Preserves the entry's creation time.
    pub fn persist(&self, key: &[u8]) -> Result<bool> {
        if key.len() > self.inner.opts.max_key_size {
            return Err(Error::KeyTooLarge);
        }
        if key.is_empty() {
            return Ok(false);
        }

        let mut state = self.inner.write_guard();
        if state.closed {
            return Err(Error::Closed);
        }
        if self.inner.opts.read_only {
            return Err(Error::ReadOnly);
        }

        let Some(entry) = self.inner.index.get(key) else {
            return Ok(false);
        };
        self.inner.set_with_expires_at_locked(
            &mut state,
            key,
            &entry.value,
            -1,
            entry.created_at,
            true,
        )?;
        Ok(true)
    }
}
