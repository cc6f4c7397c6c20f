//! Exclusive advisory lock on the data directory.
//!
//! At most one live handle per path per machine: the `LOCK` file is held
//! with a non-blocking exclusive `flock` for the lifetime of the handle. The
//! OS releases the lock if the process dies without closing.

use std::fs::{File, OpenOptions};
use std::path::Path;

use crate::error::{Error, Result};

pub(crate) struct FileLock {
    file: File,
}

impl FileLock {
    /// Creates or opens the lock file and takes the exclusive lock.
    ///
    /// Fails with [`Error::Locked`] if another process holds it.
    pub(crate) fn acquire(path: &Path) -> Result<Self> {
        let file = OpenOptions::new()
            .create(true)
            .read(true)
            .write(true)
            .open(path)?;
        try_lock(&file)?;
        Ok(Self { file })
    }

    /// Releases the lock. Dropping the handle releases it as well; the lock
    /// file itself is left in place to avoid unlink races.
    pub(crate) fn unlock(self) -> Result<()> {
        unlock(&self.file)
    }
}

#[cfg(unix)]
fn try_lock(file: &File) -> Result<()> {
    use std::os::unix::io::AsRawFd;

    let rc = unsafe { libc::flock(file.as_raw_fd(), libc::LOCK_EX | libc::LOCK_NB) };
    if rc != 0 {
        let err = std::io::Error::last_os_error();
        if err.kind() == std::io::ErrorKind::WouldBlock {
            return Err(Error::Locked);
        }
        return Err(err.into());
    }
    Ok(())
}

#[cfg(unix)]
fn unlock(file: &File) -> Result<()> {
    use std::os::unix::io::AsRawFd;

    let rc = unsafe { libc::flock(file.as_raw_fd(), libc::LOCK_UN) };
    if rc != 0 {
        return Err(std::io::Error::last_os_error().into());
    }
    Ok(())
}

// Exclusive-open contract only on platforms without flock.
#[cfg(not(unix))]
fn try_lock(_file: &File) -> Result<()> {
    Ok(())
}

#[cfg(not(unix))]
fn unlock(_file: &File) -> Result<()> {
    Ok(())
}
