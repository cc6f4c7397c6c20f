//! Process-wide error identities. Callers match on these variants, so each
//! failure condition maps to exactly one.

use snapshot::SnapshotError;
use std::io;
use thiserror::Error;
use wal::WalError;

/// Errors returned by the database.
#[derive(Debug, Error)]
pub enum Error {
    /// The key does not exist, is empty, or has expired.
    #[error("key not found")]
    NotFound,

    /// The key exceeds the configured maximum key size.
    #[error("key too large")]
    KeyTooLarge,

    /// The value exceeds the configured maximum value size.
    #[error("value too large")]
    ValueTooLarge,

    /// The batch's total key+value bytes exceed the configured limit.
    #[error("batch too big")]
    BatchTooBig,

    /// A write was attempted on a read-only database.
    #[error("database is read-only")]
    ReadOnly,

    /// The handle has been closed.
    #[error("database closed")]
    Closed,

    /// The stored value is not a decimal 64-bit integer, or the increment
    /// overflowed.
    #[error("invalid value")]
    InvalidValue,

    /// A WAL segment contained a structurally corrupt record outside the
    /// tolerated truncated tail.
    #[error("corrupt wal")]
    CorruptWal,

    /// Another process holds the exclusive lock on the data directory.
    #[error("database locked")]
    Locked,

    /// The operation's cancellation token was triggered before work began.
    #[error("operation cancelled")]
    Cancelled,

    #[error(transparent)]
    Snapshot(#[from] SnapshotError),

    #[error(transparent)]
    Io(#[from] io::Error),
}

impl From<WalError> for Error {
    fn from(err: WalError) -> Self {
        match err {
            WalError::Io(e) => Error::Io(e),
            WalError::Closed => Error::Closed,
            WalError::InvalidRecord | WalError::ChecksumMismatch => Error::CorruptWal,
        }
    }
}

pub type Result<T> = std::result::Result<T, Error>;
