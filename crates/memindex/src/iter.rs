//! Ordered scans over the index: prefix, range, and glob.
//!
//! Scans run in two phases. Matching keys are collected under the read
//! guard and sorted byte-wise ascending; the limit is applied; then entries
//! are materialized under a second read guard. An entry that expired
//! between the two phases is skipped (and lazily removed). Returned keys
//! and values are fresh copies the caller may mutate.

use crate::glob::glob_match;
use crate::{is_expired, now_nanos, Entry, MemIndex};

/// A key bundled with a copy of its entry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KeyEntry {
    pub key: Vec<u8>,
    pub entry: Entry,
}

impl MemIndex {
    /// Returns up to `limit` entries whose keys start with `prefix`,
    /// ascending by key. `limit == 0` means unlimited.
    pub fn scan(&self, prefix: &[u8], limit: usize) -> Vec<KeyEntry> {
        self.scan_matching(|key| key.starts_with(prefix), limit)
    }

    /// Returns up to `limit` entries whose keys lie in `[start, end]`
    /// (byte-wise, inclusive), ascending by key. `limit == 0` means
    /// unlimited.
    pub fn scan_range(&self, start: &[u8], end: &[u8], limit: usize) -> Vec<KeyEntry> {
        self.scan_matching(|key| key >= start && key <= end, limit)
    }

    /// Returns all live keys matching the glob `pattern`, ascending.
    ///
    /// `*` matches zero or more runes, `?` exactly one; keys are matched
    /// through lossy UTF-8 decoding.
    pub fn keys(&self, pattern: &str) -> Vec<Vec<u8>> {
        let now = now_nanos();
        let mut keys: Vec<Vec<u8>> = {
            let state = self.read_state();
            state
                .map
                .iter()
                .filter(|(_, entry)| !is_expired(entry.expires_at, now))
                .filter(|(key, _)| glob_match(pattern, &String::from_utf8_lossy(key)))
                .map(|(key, _)| key.clone())
                .collect()
        };
        keys.sort_unstable();
        keys
    }

    fn scan_matching<F>(&self, matches: F, limit: usize) -> Vec<KeyEntry>
    where
        F: Fn(&[u8]) -> bool,
    {
        let now = now_nanos();

        let mut keys: Vec<Vec<u8>> = {
            let state = self.read_state();
            state
                .map
                .keys()
                .filter(|key| matches(key))
                .cloned()
                .collect()
        };
        keys.sort_unstable();
        if limit > 0 && keys.len() > limit {
            keys.truncate(limit);
        }

        let mut results = Vec::with_capacity(keys.len());
        for key in keys {
            let found = {
                let state = self.read_state();
                state.map.get(&key).cloned()
            };
            let Some(entry) = found else { continue };
            if is_expired(entry.expires_at, now) {
                let mut state = self.write_state();
                let still_expired = state
                    .map
                    .get(&key)
                    .map_or(false, |current| is_expired(current.expires_at, now_nanos()));
                if still_expired {
                    if let Some(removed) = state.map.remove(&key) {
                        state.size -= (key.len() + removed.value.len()) as i64;
                    }
                }
                continue;
            }
            results.push(KeyEntry { key, entry });
        }
        results
    }
}
