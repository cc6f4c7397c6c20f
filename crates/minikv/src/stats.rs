//! Operation counters and latency percentiles.
//!
//! Counters track *attempts*, not successes: an operation that fails input
//! validation still bumps its counter and records its latency. Latencies are
//! kept in a fixed ring of recent samples, so the percentiles reflect recent
//! behavior rather than the full process history.

use std::path::Path;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Mutex, PoisonError};
use std::time::{Duration, Instant};

use crate::error::{Error, Result};
use crate::Db;

const LATENCY_SAMPLES: usize = 1024;

/// A point-in-time metrics snapshot.
#[derive(Debug, Clone, Default)]
pub struct Stats {
    /// Live (non-expired) keys.
    pub key_count: usize,
    /// Total bytes of `.log` files in the WAL directory.
    pub wal_size: u64,
    /// Number of `.snap` files.
    pub snapshot_count: usize,
    /// Estimated index memory: sum of key and value byte lengths.
    pub memory_bytes: i64,

    pub reads: u64,
    pub writes: u64,
    pub deletes: u64,
    pub scans: u64,

    pub read_latency_p50: Duration,
    pub read_latency_p95: Duration,
    pub read_latency_p99: Duration,
    pub write_latency_p50: Duration,
    pub write_latency_p95: Duration,
    pub write_latency_p99: Duration,
}

pub(crate) struct StatsTracker {
    reads: AtomicU64,
    writes: AtomicU64,
    deletes: AtomicU64,
    scans: AtomicU64,
    read_latency: LatencyTracker,
    write_latency: LatencyTracker,
}

impl StatsTracker {
    pub(crate) fn new() -> Self {
        Self {
            reads: AtomicU64::new(0),
            writes: AtomicU64::new(0),
            deletes: AtomicU64::new(0),
            scans: AtomicU64::new(0),
            read_latency: LatencyTracker::new(LATENCY_SAMPLES),
            write_latency: LatencyTracker::new(LATENCY_SAMPLES),
        }
    }

    /// Counts one read attempt and records its latency when the guard drops.
    pub(crate) fn record_read(&self) -> OpTimer<'_> {
        OpTimer::new(&self.reads, &self.read_latency, 1)
    }

    pub(crate) fn record_write(&self) -> OpTimer<'_> {
        OpTimer::new(&self.writes, &self.write_latency, 1)
    }

    pub(crate) fn record_writes(&self, count: u64) -> OpTimer<'_> {
        OpTimer::new(&self.writes, &self.write_latency, count)
    }

    pub(crate) fn record_delete(&self) -> OpTimer<'_> {
        OpTimer::new(&self.deletes, &self.write_latency, 1)
    }

    pub(crate) fn record_deletes(&self, count: u64) -> OpTimer<'_> {
        OpTimer::new(&self.deletes, &self.write_latency, count)
    }

    pub(crate) fn record_scan(&self) -> OpTimer<'_> {
        OpTimer::new(&self.scans, &self.read_latency, 1)
    }
}

/// Bumps a counter and records elapsed time when dropped, so every exit path
/// of an operation is counted exactly once.
pub(crate) struct OpTimer<'a> {
    counter: &'a AtomicU64,
    latency: &'a LatencyTracker,
    count: u64,
    start: Instant,
}

impl<'a> OpTimer<'a> {
    fn new(counter: &'a AtomicU64, latency: &'a LatencyTracker, count: u64) -> Self {
        Self {
            counter,
            latency,
            count,
            start: Instant::now(),
        }
    }
}

impl Drop for OpTimer<'_> {
    fn drop(&mut self) {
        self.counter.fetch_add(self.count, Ordering::Relaxed);
        self.latency.add(self.start.elapsed());
    }
}

struct LatencyRing {
    samples: Vec<u64>,
    idx: usize,
    full: bool,
}

struct LatencyTracker {
    ring: Mutex<LatencyRing>,
}

impl LatencyTracker {
    fn new(capacity: usize) -> Self {
        Self {
            ring: Mutex::new(LatencyRing {
                samples: vec![0; capacity.max(1)],
                idx: 0,
                full: false,
            }),
        }
    }

    fn add(&self, d: Duration) {
        let mut ring = self.ring.lock().unwrap_or_else(PoisonError::into_inner);
        let idx = ring.idx;
        ring.samples[idx] = d.as_nanos() as u64;
        ring.idx += 1;
        if ring.idx >= ring.samples.len() {
            ring.idx = 0;
            ring.full = true;
        }
    }

    /// (p50, p95, p99) over the recorded samples.
    fn percentiles(&self) -> (Duration, Duration, Duration) {
        let mut sorted = {
            let ring = self.ring.lock().unwrap_or_else(PoisonError::into_inner);
            let count = if ring.full { ring.samples.len() } else { ring.idx };
            ring.samples[..count].to_vec()
        };
        if sorted.is_empty() {
            return (Duration::ZERO, Duration::ZERO, Duration::ZERO);
        }
        sorted.sort_unstable();
        (
            percentile(&sorted, 0.50),
            percentile(&sorted, 0.95),
            percentile(&sorted, 0.99),
        )
    }
}

fn percentile(sorted: &[u64], p: f64) -> Duration {
    let idx = ((sorted.len() - 1) as f64 * p) as usize;
    Duration::from_nanos(sorted[idx])
}

impl Db {
    /// Returns current metrics.
    pub fn stats(&self) -> Result<Stats> {
        let inner = &self.inner;
        let (key_count, memory_bytes) = {
            let state = inner.read_guard();
            if state.closed {
                return Err(Error::Closed);
            }
            (inner.index.count(), inner.index.size())
        };

        let wal_size = dir_size(&inner.path.join("wal"), "log");
        let snapshot_count = dir_count(&inner.path.join("snapshots"), "snap");

        let (read_p50, read_p95, read_p99) = inner.stats.read_latency.percentiles();
        let (write_p50, write_p95, write_p99) = inner.stats.write_latency.percentiles();

        Ok(Stats {
            key_count,
            wal_size,
            snapshot_count,
            memory_bytes,
            reads: inner.stats.reads.load(Ordering::Relaxed),
            writes: inner.stats.writes.load(Ordering::Relaxed),
            deletes: inner.stats.deletes.load(Ordering::Relaxed),
            scans: inner.stats.scans.load(Ordering::Relaxed),
            read_latency_p50: read_p50,
            read_latency_p95: read_p95,
            read_latency_p99: read_p99,
            write_latency_p50: write_p50,
            write_latency_p95: write_p95,
            write_latency_p99: write_p99,
        })
    }
}

fn dir_size(dir: &Path, extension: &str) -> u64 {
    let Ok(entries) = std::fs::read_dir(dir) else {
        return 0;
    };
    entries
        .flatten()
        .filter(|e| e.path().extension().map_or(false, |ext| ext == extension))
        .filter_map(|e| e.metadata().ok())
        .map(|m| m.len())
        .sum()
}

fn dir_count(dir: &Path, extension: &str) -> usize {
    let Ok(entries) = std::fs::read_dir(dir) else {
        return 0;
    };
    entries
        .flatten()
        .filter(|e| e.path().extension().map_or(false, |ext| ext == extension))
        .count()
}
