//! Append-only segment manager with size-triggered rotation.

use std::fs::{File, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::{Mutex, MutexGuard, PoisonError};

use crate::record::{encode_record, WalRecord};
use crate::WalError;

/// Callback fired after a rotation, while the manager's mutex is still held.
/// The store uses this to kick background compaction and refresh the manifest.
pub type RotateHook = Box<dyn Fn() + Send + Sync>;

struct WalState {
    file: Option<File>,
    seq: u64,
    size: u64,
    rotate_hook: Option<RotateHook>,
}

/// Owns the current WAL segment and rotates to a fresh one when the
/// configured size limit would be exceeded.
///
/// All file operations are serialized by an internal mutex, so the byte
/// offset of each appended record is deterministic. Closed segments are
/// never re-opened for append.
pub struct WalManager {
    dir: PathBuf,
    max_size: u64,
    state: Mutex<WalState>,
}

impl WalManager {
    /// Opens (or creates) the WAL directory and the highest-numbered segment.
    ///
    /// A fresh directory starts at segment 1. `max_size == 0` disables
    /// rotation.
    pub fn open(dir: &Path, max_size: u64) -> Result<Self, WalError> {
        std::fs::create_dir_all(dir)?;
        let mut seq = latest_sequence(dir)?;
        if seq == 0 {
            seq = 1;
        }
        let (file, size) = open_segment(dir, seq)?;
        Ok(Self {
            dir: dir.to_path_buf(),
            max_size,
            state: Mutex::new(WalState {
                file: Some(file),
                seq,
                size,
                rotate_hook: None,
            }),
        })
    }

    /// Encodes and appends a record, rotating first if needed.
    pub fn append_record(&self, record: &WalRecord) -> Result<usize, WalError> {
        self.append_raw(&encode_record(record))
    }

    /// Appends pre-encoded bytes, rotating first if the segment would grow
    /// past the size limit.
    pub fn append_raw(&self, encoded: &[u8]) -> Result<usize, WalError> {
        let mut state = self.lock_state();
        if state.file.is_none() {
            return Err(WalError::Closed);
        }

        if self.max_size > 0 && state.size + encoded.len() as u64 > self.max_size {
            self.rotate(&mut state)?;
        }

        let file = state.file.as_mut().ok_or(WalError::Closed)?;
        file.write_all(encoded)?;
        state.size += encoded.len() as u64;
        Ok(encoded.len())
    }

    /// Flushes the current segment to disk.
    pub fn sync(&self) -> Result<(), WalError> {
        let state = self.lock_state();
        match state.file.as_ref() {
            Some(file) => Ok(file.sync_all()?),
            None => Err(WalError::Closed),
        }
    }

    /// Closes the current segment handle. Subsequent calls are no-ops.
    pub fn close(&self) -> Result<(), WalError> {
        let mut state = self.lock_state();
        state.file = None;
        Ok(())
    }

    /// Sequence number of the segment currently open for append.
    pub fn current_seq(&self) -> u64 {
        self.lock_state().seq
    }

    /// Registers a callback invoked after every rotation.
    pub fn set_rotate_hook(&self, hook: RotateHook) {
        self.lock_state().rotate_hook = Some(hook);
    }

    /// Sync + close the old segment, open the next one, fire the hook.
    fn rotate(&self, state: &mut WalState) -> Result<(), WalError> {
        if let Some(file) = state.file.take() {
            file.sync_all()?;
            drop(file);
        }
        state.seq += 1;
        let (file, size) = open_segment(&self.dir, state.seq)?;
        state.file = Some(file);
        state.size = size;
        if let Some(hook) = state.rotate_hook.as_ref() {
            hook();
        }
        Ok(())
    }

    fn lock_state(&self) -> MutexGuard<'_, WalState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// Segment file name for a sequence number, zero-padded to six digits.
pub fn segment_name(seq: u64) -> String {
    format!("{:06}.log", seq)
}

fn open_segment(dir: &Path, seq: u64) -> Result<(File, u64), WalError> {
    let path = dir.join(segment_name(seq));
    let file = OpenOptions::new().create(true).append(true).open(path)?;
    let size = file.metadata()?.len();
    Ok((file, size))
}

/// Highest segment sequence present in `dir`, or 0 if none.
fn latest_sequence(dir: &Path) -> Result<u64, WalError> {
    let mut max = 0u64;
    for entry in std::fs::read_dir(dir)? {
        let entry = entry?;
        if entry.file_type()?.is_dir() {
            continue;
        }
        if let Some(seq) = crate::reader::parse_segment_seq(&entry.path()) {
            max = max.max(seq);
        }
    }
    Ok(max)
}
