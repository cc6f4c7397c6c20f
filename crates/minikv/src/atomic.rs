//! Atomic read-modify-write primitives. Each holds the exclusive guard for
//! its full duration, so the read and the subsequent write are indivisible
//! with respect to every other operation.

use crate::error::{Error, Result};
use crate::Db;

impl Db {
    /// Sets the value only if the key does not exist. Returns whether the
    /// write happened.
    pub fn set_nx(&self, key: &[u8], value: &[u8]) -> Result<bool> {
        if key.len() > self.inner.opts.max_key_size {
            return Err(Error::KeyTooLarge);
        }
        if value.len() > self.inner.opts.max_value_size {
            return Err(Error::ValueTooLarge);
        }
        if key.is_empty() {
            return Err(Error::NotFound);
        }

        let mut state = self.inner.write_guard();
        if state.closed {
            return Err(Error::Closed);
        }
        if self.inner.opts.read_only {
            return Err(Error::ReadOnly);
        }
        if self.inner.index.get(key).is_some() {
            return Ok(false);
        }
        self.inner
            .set_with_expires_at_locked(&mut state, key, value, -1, 0, false)?;
        Ok(true)
    }

    /// Increments the decimal integer value by 1, returning the new value.
    pub fn incr(&self, key: &[u8]) -> Result<i64> {
        self.incr_by(key, 1)
    }

    /// Decrements the decimal integer value by 1, returning the new value.
    pub fn decr(&self, key: &[u8]) -> Result<i64> {
        self.incr_by(key, -1)
    }

    /// Adds `delta` to the decimal 64-bit integer stored at `key`, treating
    /// a missing key as 0. The creation time of an existing entry survives
    /// the rewrite. Fails with [`Error::InvalidValue`] if the stored value
    /// does not parse, or if the addition overflows.
    pub fn incr_by(&self, key: &[u8], delta: i64) -> Result<i64> {
        if key.len() > self.inner.opts.max_key_size {
            return Err(Error::KeyTooLarge);
        }
        if key.is_empty() {
            return Err(Error::NotFound);
        }

        let mut state = self.inner.write_guard();
        if state.closed {
            return Err(Error::Closed);
        }
        if self.inner.opts.read_only {
            return Err(Error::ReadOnly);
        }

        let (current, created_at) = match self.inner.index.get(key) {
            Some(entry) => {
                let text = std::str::from_utf8(&entry.value).map_err(|_| Error::InvalidValue)?;
                let parsed: i64 = text.parse().map_err(|_| Error::InvalidValue)?;
                (parsed, entry.created_at)
            }
            None => (0, 0),
        };

        let new_value = current.checked_add(delta).ok_or(Error::InvalidValue)?;
        let formatted = new_value.to_string();
        self.inner.set_with_expires_at_locked(
            &mut state,
            key,
            formatted.as_bytes(),
            -1,
            created_at,
            true,
        )?;
        Ok(new_value)
    }

    /// Replaces the value with `new` only if the current value equals `old`.
    /// Returns whether the swap happened. A missing key never matches.
    /// Preserves both the expiration and the creation time.
    pub fn compare_and_swap(&self, key: &[u8], old: &[u8], new: &[u8]) -> Result<bool> {
        if key.len() > self.inner.opts.max_key_size {
            return Err(Error::KeyTooLarge);
        }
        if new.len() > self.inner.opts.max_value_size {
            return Err(Error::ValueTooLarge);
        }
        if key.is_empty() {
            return Err(Error::NotFound);
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
        if entry.value != old {
            return Ok(false);
        }
        self.inner.set_with_expires_at_locked(
            &mut state,
            key,
            new,
            entry.expires_at,
            entry.created_at,
            true,
        )?;
        Ok(true)
    }

    /// Stores `value` and returns the previous value, or an empty buffer if
    /// the key was absent. The new entry gets a fresh creation time.
    pub fn get_and_set(&self, key: &[u8], value: &[u8]) -> Result<Vec<u8>> {
        if key.len() > self.inner.opts.max_key_size {
            return Err(Error::KeyTooLarge);
        }
        if value.len() > self.inner.opts.max_value_size {
            return Err(Error::ValueTooLarge);
        }
        if key.is_empty() {
            return Err(Error::NotFound);
        }

        let mut state = self.inner.write_guard();
        if state.closed {
            return Err(Error::Closed);
        }
        if self.inner.opts.read_only {
            return Err(Error::ReadOnly);
        }

        let old = self
            .inner
            .index
            .get(key)
            .map(|entry| entry.value)
            .unwrap_or_default();
        self.inner
            .set_with_expires_at_locked(&mut state, key, value, -1, 0, false)?;
        Ok(old)
    }
}
