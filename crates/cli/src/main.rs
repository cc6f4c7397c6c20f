//! # CLI - MiniKV Interactive Shell
//!
//! A REPL-style command-line interface for the MiniKV store. Reads commands
//! from stdin, executes them against the database, and prints results to
//! stdout. Designed for both interactive use and scripted testing (pipe
//! commands via stdin).
//!
//! ## Commands
//!
//! ```text
//! SET key value          Insert or update a key-value pair
//! SETTTL key value ms    Insert with a time-to-live in milliseconds
//! GET key                Look up a key (prints value or "(nil)")
//! DEL key                Delete a key
//! EXISTS key             Print "true" or "false"
//! TTL key                Remaining TTL in ms, "(none)" or "(nil)"
//! EXPIRE key ms          Set a TTL on an existing key
//! PERSIST key            Remove a key's TTL
//! SETNX key value        Set only if absent
//! INCR key / DECR key    Adjust a decimal counter by +/-1
//! INCRBY key delta       Adjust a decimal counter by delta
//! CAS key old new        Compare-and-swap
//! GETSET key value       Set and print the previous value
//! SCAN [prefix] [limit]  Prefix scan in key order
//! RANGE start end [limit] Inclusive range scan
//! KEYS pattern           Glob match over keys (* and ?)
//! COUNT                  Number of live keys
//! STATS                  Store metrics
//! DUMP                   One line per key: key, size, expiry
//! COMPACT                Snapshot the index and prune the WAL
//! SYNC                   fsync the WAL
//! EXIT / QUIT            Shut down gracefully
//! ```
//!
//! ## Configuration
//!
//! All settings are controlled via environment variables:
//!
//! ```text
//! MINIKV_PATH        data directory            (default: "data")
//! MINIKV_SYNC        always | periodic | manual (default: "periodic")
//! MINIKV_WAL_MAX_KB  WAL rotation size in KiB   (default: 262144 = 256 MiB)
//! ```

use std::io::{self, BufRead, Write};
use std::time::Duration;

use anyhow::Result;
use minikv::{Db, Error, Options, SyncMode};

fn main() -> Result<()> {
    let path = std::env::var("MINIKV_PATH").unwrap_or_else(|_| "data".to_string());
    let sync_mode = match std::env::var("MINIKV_SYNC").as_deref() {
        Ok("always") => SyncMode::Always,
        Ok("manual") => SyncMode::Manual,
        _ => SyncMode::Periodic,
    };
    let wal_max_kb: u64 = std::env::var("MINIKV_WAL_MAX_KB")
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(256 * 1024);

    let mut opts = Options::new(&path);
    opts.sync_mode = sync_mode;
    opts.max_wal_size = wal_max_kb * 1024;
    let db = Db::open(opts)?;

    println!(
        "MiniKV started (path={}, sync={:?}, wal_max={}KiB)",
        path, sync_mode, wal_max_kb
    );

    let stdin = io::stdin();
    let mut stdout = io::stdout();
    for line in stdin.lock().lines() {
        let line = line?;
        let parts: Vec<&str> = line.split_whitespace().collect();
        if parts.is_empty() {
            continue;
        }

        match run_command(&db, &parts) {
            Ok(Output::Quit) => break,
            Ok(Output::Text(text)) => println!("{}", text),
            Err(e) => println!("(error) {}", e),
        }
        stdout.flush()?;
    }

    db.close()?;
    println!("bye");
    Ok(())
}

enum Output {
    Text(String),
    Quit,
}

fn run_command(db: &Db, parts: &[&str]) -> Result<Output> {
    let text = match (parts[0].to_ascii_uppercase().as_str(), &parts[1..]) {
        ("SET", [key, value]) => {
            db.set(key.as_bytes(), value.as_bytes())?;
            "OK".to_string()
        }
        ("SETTTL", [key, value, ms]) => {
            let ttl = Duration::from_millis(ms.parse()?);
            db.set_with_ttl(key.as_bytes(), value.as_bytes(), ttl)?;
            "OK".to_string()
        }
        ("GET", [key]) => match db.get(key.as_bytes()) {
            Ok(value) => String::from_utf8_lossy(&value).into_owned(),
            Err(Error::NotFound) => "(nil)".to_string(),
            Err(e) => return Err(e.into()),
        },
        ("DEL", [key]) => {
            db.delete(key.as_bytes())?;
            "OK".to_string()
        }
        ("EXISTS", [key]) => db.exists(key.as_bytes())?.to_string(),
        ("TTL", [key]) => match db.ttl(key.as_bytes()) {
            Ok(Some(remaining)) => format!("{}", remaining.as_millis()),
            Ok(None) => "(none)".to_string(),
            Err(Error::NotFound) => "(nil)".to_string(),
            Err(e) => return Err(e.into()),
        },
        ("EXPIRE", [key, ms]) => {
            let ttl = Duration::from_millis(ms.parse()?);
            db.expire(key.as_bytes(), ttl)?.to_string()
        }
        ("PERSIST", [key]) => db.persist(key.as_bytes())?.to_string(),
        ("SETNX", [key, value]) => db.set_nx(key.as_bytes(), value.as_bytes())?.to_string(),
        ("INCR", [key]) => db.incr(key.as_bytes())?.to_string(),
        ("DECR", [key]) => db.decr(key.as_bytes())?.to_string(),
        ("INCRBY", [key, delta]) => db.incr_by(key.as_bytes(), delta.parse()?)?.to_string(),
        ("CAS", [key, old, new]) => db
            .compare_and_swap(key.as_bytes(), old.as_bytes(), new.as_bytes())?
            .to_string(),
        ("GETSET", [key, value]) => {
            let old = db.get_and_set(key.as_bytes(), value.as_bytes())?;
            if old.is_empty() {
                "(nil)".to_string()
            } else {
                String::from_utf8_lossy(&old).into_owned()
            }
        }
        ("SCAN", rest) => {
            let prefix = rest.first().copied().unwrap_or("");
            let limit = rest.get(1).and_then(|l| l.parse().ok()).unwrap_or(0);
            let results = db.scan(prefix.as_bytes(), limit)?;
            format_pairs(&results)
        }
        ("RANGE", [start, end, rest @ ..]) => {
            let limit = rest.first().and_then(|l| l.parse().ok()).unwrap_or(0);
            let results = db.scan_range(start.as_bytes(), end.as_bytes(), limit)?;
            format_pairs(&results)
        }
        ("KEYS", [pattern]) => {
            let keys = db.keys(pattern)?;
            let mut out = String::new();
            for key in &keys {
                out.push_str(&String::from_utf8_lossy(key));
                out.push('\n');
            }
            out.push_str(&format!("({} keys)", keys.len()));
            out
        }
        ("COUNT", []) => db.count()?.to_string(),
        ("STATS", []) => {
            let stats = db.stats()?;
            format!(
                "keys={} wal_bytes={} snapshots={} mem_bytes={}\n\
                 reads={} writes={} deletes={} scans={}\n\
                 read_p50={:?} read_p99={:?} write_p50={:?} write_p99={:?}",
                stats.key_count,
                stats.wal_size,
                stats.snapshot_count,
                stats.memory_bytes,
                stats.reads,
                stats.writes,
                stats.deletes,
                stats.scans,
                stats.read_latency_p50,
                stats.read_latency_p99,
                stats.write_latency_p50,
                stats.write_latency_p99,
            )
        }
        ("DUMP", []) => {
            let mut buf = Vec::new();
            db.dump_keys(&mut buf)?;
            let mut out = String::from_utf8_lossy(&buf).into_owned();
            if out.ends_with('\n') {
                out.pop();
            }
            out
        }
        ("COMPACT", []) => {
            db.compact()?;
            "OK".to_string()
        }
        ("SYNC", []) => {
            db.sync()?;
            "OK".to_string()
        }
        ("EXIT", []) | ("QUIT", []) => return Ok(Output::Quit),
        _ => format!("(error) unknown or malformed command: {}", parts[0]),
    };
    Ok(Output::Text(text))
}

fn format_pairs(pairs: &[(Vec<u8>, Vec<u8>)]) -> String {
    let mut out = String::new();
    for (key, value) in pairs {
        out.push_str(&format!(
            "{} -> {}\n",
            String::from_utf8_lossy(key),
            String::from_utf8_lossy(value)
        ));
    }
    out.push_str(&format!("({} entries)", pairs.len()));
    out
}
