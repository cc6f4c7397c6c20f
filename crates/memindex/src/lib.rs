//! Concurrent in-memory index mapping byte keys to values with per-key
//! expiration and byte-size accounting.
//!
//! A single reader-writer lock protects the map: reads take the shared
//! guard, mutations (including opportunistic removal of expired entries)
//! take the exclusive guard. Expired entries are detected lazily on access
//! and swept by [`MemIndex::count`], which the store's TTL reaper calls
//! periodically.

mod glob;
mod iter;

pub use iter::KeyEntry;

use std::collections::HashMap;
use std::sync::{PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};
use std::time::{SystemTime, UNIX_EPOCH};

/// A stored value with its expiration and creation timestamps.
///
/// `expires_at` is Unix nanoseconds; negative means the entry never expires.
/// `created_at` survives value rewrites (`INCR`, `CAS`, `EXPIRE`) so the
/// entry's age is not reset by them.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Entry {
    pub value: Vec<u8>,
    pub expires_at: i64,
    pub created_at: i64,
}

pub(crate) struct IndexState {
    pub(crate) map: HashMap<Vec<u8>, Entry>,
    pub(crate) size: i64,
}

/// The in-memory key-value index.
pub struct MemIndex {
    pub(crate) state: RwLock<IndexState>,
}

impl MemIndex {
    /// Creates an empty index.
    pub fn new() -> Self {
        Self {
            state: RwLock::new(IndexState {
                map: HashMap::new(),
                size: 0,
            }),
        }
    }

    /// Stores a key with `created_at` set to the current time.
    /// Use `expires_at = -1` for no expiration.
    pub fn set(&self, key: Vec<u8>, value: Vec<u8>, expires_at: i64) {
        self.set_entry(key, value, expires_at, now_nanos());
    }

    /// Stores a key with an explicit creation timestamp.
    pub fn set_entry(&self, key: Vec<u8>, value: Vec<u8>, expires_at: i64, created_at: i64) {
        let mut state = self.write_state();
        let state = &mut *state;
        if let Some(existing) = state.map.get(&key) {
            state.size -= entry_size(&key, existing);
        }
        let entry = Entry {
            value,
            expires_at,
            created_at,
        };
        state.size += entry_size(&key, &entry);
        state.map.insert(key, entry);
    }

    /// Returns a copy of the entry for `key` if it exists and is not expired.
    ///
    /// An expired entry is removed under the write guard; the recheck after
    /// re-acquiring the lock avoids deleting an entry that a concurrent
    /// writer just replaced.
    pub fn get(&self, key: &[u8]) -> Option<Entry> {
        let found = {
            let state = self.read_state();
            state.map.get(key).cloned()
        };
        let entry = found?;

        if is_expired(entry.expires_at, now_nanos()) {
            let mut state = self.write_state();
            let still_expired = state
                .map
                .get(key)
                .map_or(false, |current| is_expired(current.expires_at, now_nanos()));
            if still_expired {
                if let Some(removed) = state.map.remove(key) {
                    state.size -= entry_size(key, &removed);
                }
            }
            return None;
        }

        Some(entry)
    }

    /// Removes a key if present.
    pub fn delete(&self, key: &[u8]) {
        let mut state = self.write_state();
        if let Some(entry) = state.map.remove(key) {
            state.size -= entry_size(key, &entry);
        }
    }

    /// Reports whether `key` exists and is not expired.
    pub fn exists(&self, key: &[u8]) -> bool {
        self.get(key).is_some()
    }

    /// Returns the number of live keys, removing any expired entries
    /// encountered along the way.
    pub fn count(&self) -> usize {
        let now = now_nanos();
        let mut state = self.write_state();

        let expired: Vec<Vec<u8>> = state
            .map
            .iter()
            .filter(|(_, entry)| is_expired(entry.expires_at, now))
            .map(|(key, _)| key.clone())
            .collect();
        for key in expired {
            if let Some(entry) = state.map.remove(&key) {
                state.size -= entry_size(&key, &entry);
            }
        }

        state.map.len()
    }

    /// Estimated memory footprint: sum of key and value byte lengths.
    pub fn size(&self) -> i64 {
        self.read_state().size
    }

    pub(crate) fn read_state(&self) -> RwLockReadGuard<'_, IndexState> {
        self.state.read().unwrap_or_else(PoisonError::into_inner)
    }

    pub(crate) fn write_state(&self) -> RwLockWriteGuard<'_, IndexState> {
        self.state.write().unwrap_or_else(PoisonError::into_inner)
    }
}

impl Default for MemIndex {
    fn default() -> Self {
        Self::new()
    }
}

/// Whether an entry with this expiration is logically absent at `now`.
/// Negative `expires_at` means no expiry.
pub fn is_expired(expires_at: i64, now: i64) -> bool {
    expires_at >= 0 && now >= expires_at
}

/// Current wall-clock time in Unix nanoseconds.
pub fn now_nanos() -> i64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_nanos() as i64)
        .unwrap_or(0)
}

fn entry_size(key: &[u8], entry: &Entry) -> i64 {
    (key.len() + entry.value.len()) as i64
}

#[cfg(test)]
mod tests;
