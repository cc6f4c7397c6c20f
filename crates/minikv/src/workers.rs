//! Background workers: the periodic sync worker and the TTL reaper.
//!
//! Each worker is a thread holding a `Weak` back-reference to the store and
//! an mpsc shutdown channel. `recv_timeout` doubles as the tick: a timeout
//! runs one iteration, a message (or a dropped sender) stops the worker.
//! Close joins both workers before tearing down the WAL.

use std::sync::mpsc::{self, RecvTimeoutError, Sender};
use std::sync::{Arc, PoisonError, Weak};
use std::thread::JoinHandle;
use std::time::Duration;

use crate::options::SyncMode;
use crate::DbInner;

const SYNC_INTERVAL: Duration = Duration::from_secs(1);
const TTL_INTERVAL: Duration = Duration::from_secs(1);

#[derive(Default)]
pub(crate) struct Workers {
    stop_txs: Vec<Sender<()>>,
    handles: Vec<JoinHandle<()>>,
}

/// Starts the 1 s fsync loop. Only runs in [`SyncMode::Periodic`].
pub(crate) fn start_sync_worker(inner: &Arc<DbInner>) {
    if inner.opts.sync_mode != SyncMode::Periodic {
        return;
    }
    spawn_worker(inner, SYNC_INTERVAL, |db| {
        let _ = db.sync();
    });
}

/// Starts the 1 s expired-entry sweep.
pub(crate) fn start_ttl_worker(inner: &Arc<DbInner>) {
    spawn_worker(inner, TTL_INTERVAL, |db| {
        db.reap_expired();
    });
}

fn spawn_worker<F>(inner: &Arc<DbInner>, interval: Duration, tick: F)
where
    F: Fn(&DbInner) + Send + 'static,
{
    let weak: Weak<DbInner> = Arc::downgrade(inner);
    let (tx, rx) = mpsc::channel::<()>();

    let handle = std::thread::spawn(move || loop {
        match rx.recv_timeout(interval) {
            Err(RecvTimeoutError::Timeout) => {
                let Some(db) = weak.upgrade() else { return };
                tick(&db);
            }
            // Stop signal or sender dropped.
            _ => return,
        }
    });

    let mut workers = inner.workers.lock().unwrap_or_else(PoisonError::into_inner);
    workers.stop_txs.push(tx);
    workers.handles.push(handle);
}

impl DbInner {
    /// Amortizes lazy TTL cleanup. Deliberately avoids the coordinator guard
    /// while sweeping so readers are not serialized behind eager cleanup;
    /// the index's own lock protects map consistency.
    pub(crate) fn reap_expired(&self) {
        {
            let state = self.read_guard();
            if state.closed {
                return;
            }
        }
        let _ = self.index.count();
    }

    /// Signals both workers and waits for them to exit.
    pub(crate) fn stop_workers(&self) {
        let (stop_txs, handles) = {
            let mut workers = self.workers.lock().unwrap_or_else(PoisonError::into_inner);
            (
                std::mem::take(&mut workers.stop_txs),
                std::mem::take(&mut workers.handles),
            )
        };
        for tx in stop_txs {
            let _ = tx.send(());
        }
        for handle in handles {
            let _ = handle.join();
        }
    }
}
