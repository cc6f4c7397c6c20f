//! Advisory, coarse-grained cancellation.
//!
//! Tokens are checked once, before an operation does any work. A write that
//! has reached the WAL append stage always runs to completion; cancellation
//! never leaves a half-applied mutation.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use crate::error::{Error, Result};
use crate::Db;

/// A shareable cancellation flag.
#[derive(Debug, Clone, Default)]
pub struct CancelToken {
    cancelled: Arc<AtomicBool>,
}

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    /// Trips the token. Operations checked after this fail with
    /// [`Error::Cancelled`].
    pub fn cancel(&self) {
        self.cancelled.store(true, Ordering::Release);
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::Acquire)
    }
}

impl Db {
    /// [`get`](Db::get) that honors a cancellation token.
    pub fn get_with_cancel(&self, token: &CancelToken, key: &[u8]) -> Result<Vec<u8>> {
        if token.is_cancelled() {
            return Err(Error::Cancelled);
        }
        self.get(key)
    }

    /// [`set`](Db::set) that honors a cancellation token.
    pub fn set_with_cancel(&self, token: &CancelToken, key: &[u8], value: &[u8]) -> Result<()> {
        if token.is_cancelled() {
            return Err(Error::Cancelled);
        }
        self.set(key, value)
    }
}
