use super::*;
use std::thread;
use std::time::Duration;

fn ttl_from_now(d: Duration) -> i64 {
    now_nanos() + d.as_nanos() as i64
}

// -------------------- Basic operations --------------------

#[test]
fn set_get_delete() {
    let idx = MemIndex::new();
    idx.set(b"k1".to_vec(), b"v1".to_vec(), -1);
    assert_eq!(idx.get(b"k1").unwrap().value, b"v1");

    idx.set(b"k1".to_vec(), b"v2".to_vec(), -1);
    assert_eq!(idx.get(b"k1").unwrap().value, b"v2");

    idx.delete(b"k1");
    assert!(idx.get(b"k1").is_none());
    // Deleting a missing key is a no-op.
    idx.delete(b"k1");
}

#[test]
fn exists_reflects_state() {
    let idx = MemIndex::new();
    assert!(!idx.exists(b"k"));
    idx.set(b"k".to_vec(), b"v".to_vec(), -1);
    assert!(idx.exists(b"k"));
    idx.delete(b"k");
    assert!(!idx.exists(b"k"));
}

#[test]
fn set_entry_keeps_created_at() {
    let idx = MemIndex::new();
    idx.set_entry(b"k".to_vec(), b"v".to_vec(), -1, 12345);
    assert_eq!(idx.get(b"k").unwrap().created_at, 12345);
}

#[test]
fn returned_entry_is_a_copy() {
    let idx = MemIndex::new();
    idx.set(b"k".to_vec(), b"v".to_vec(), -1);
    let mut entry = idx.get(b"k").unwrap();
    entry.value[0] = b'x';
    assert_eq!(idx.get(b"k").unwrap().value, b"v");
}

// -------------------- Size accounting --------------------

#[test]
fn size_tracks_key_and_value_bytes() {
    let idx = MemIndex::new();
    assert_eq!(idx.size(), 0);
    idx.set(b"a".to_vec(), b"aaa".to_vec(), -1);
    assert_eq!(idx.size(), 4);
    idx.set(b"a".to_vec(), b"bb".to_vec(), -1);
    assert_eq!(idx.size(), 3);
    idx.delete(b"a");
    assert_eq!(idx.size(), 0);
}

// -------------------- Expiration --------------------

#[test]
fn expired_entry_is_absent_and_removed() {
    let idx = MemIndex::new();
    idx.set(b"k".to_vec(), b"v".to_vec(), ttl_from_now(Duration::from_millis(10)));
    assert!(idx.get(b"k").is_some());

    thread::sleep(Duration::from_millis(20));
    assert!(idx.get(b"k").is_none());
    // Lazy removal also reclaims the accounted bytes.
    assert_eq!(idx.size(), 0);
}

#[test]
fn negative_expiry_never_expires() {
    let idx = MemIndex::new();
    idx.set(b"k".to_vec(), b"v".to_vec(), -1);
    assert!(idx.get(b"k").is_some());
}

#[test]
fn zero_expiry_is_already_expired() {
    let idx = MemIndex::new();
    idx.set(b"k".to_vec(), b"v".to_vec(), 0);
    assert!(idx.get(b"k").is_none());
}

#[test]
fn count_sweeps_expired_entries() {
    let idx = MemIndex::new();
    idx.set(b"live1".to_vec(), b"v".to_vec(), -1);
    idx.set(b"live2".to_vec(), b"v".to_vec(), -1);
    idx.set(b"dead".to_vec(), b"v".to_vec(), ttl_from_now(Duration::from_millis(5)));

    thread::sleep(Duration::from_millis(15));
    assert_eq!(idx.count(), 2);
    // The sweep removed the expired entry for good.
    assert_eq!(idx.size(), (b"live1".len() + b"live2".len() + 2) as i64);
}

// -------------------- Scans --------------------

#[test]
fn scan_is_sorted_and_prefix_filtered() {
    let idx = MemIndex::new();
    for key in ["user:3", "user:1", "session:9", "user:2"] {
        idx.set(key.as_bytes().to_vec(), b"v".to_vec(), -1);
    }

    let results = idx.scan(b"user:", 0);
    let keys: Vec<&[u8]> = results.iter().map(|ke| ke.key.as_slice()).collect();
    assert_eq!(keys, vec![b"user:1".as_slice(), b"user:2", b"user:3"]);
}

#[test]
fn scan_applies_limit_after_sorting() {
    let idx = MemIndex::new();
    for i in 0..10u32 {
        idx.set(format!("k{:02}", i).into_bytes(), b"v".to_vec(), -1);
    }

    let results = idx.scan(b"k", 3);
    assert_eq!(results.len(), 3);
    assert_eq!(results[0].key, b"k00");
    assert_eq!(results[2].key, b"k02");
}

#[test]
fn scan_empty_prefix_returns_everything() {
    let idx = MemIndex::new();
    idx.set(b"a".to_vec(), b"1".to_vec(), -1);
    idx.set(b"b".to_vec(), b"2".to_vec(), -1);
    assert_eq!(idx.scan(b"", 0).len(), 2);
}

#[test]
fn scan_skips_expired() {
    let idx = MemIndex::new();
    idx.set(b"a".to_vec(), b"1".to_vec(), -1);
    idx.set(b"b".to_vec(), b"2".to_vec(), ttl_from_now(Duration::from_millis(5)));

    thread::sleep(Duration::from_millis(15));
    let results = idx.scan(b"", 0);
    assert_eq!(results.len(), 1);
    assert_eq!(results[0].key, b"a");
}

#[test]
fn scan_range_is_inclusive() {
    let idx = MemIndex::new();
    for key in ["a", "b", "c", "d"] {
        idx.set(key.as_bytes().to_vec(), b"v".to_vec(), -1);
    }

    let results = idx.scan_range(b"b", b"c", 0);
    let keys: Vec<&[u8]> = results.iter().map(|ke| ke.key.as_slice()).collect();
    assert_eq!(keys, vec![b"b".as_slice(), b"c"]);
}

// -------------------- Glob keys --------------------

#[test]
fn keys_filters_by_glob() {
    let idx = MemIndex::new();
    for key in ["user:1", "user:22", "session:1"] {
        idx.set(key.as_bytes().to_vec(), b"v".to_vec(), -1);
    }

    assert_eq!(idx.keys("user:*").len(), 2);
    assert_eq!(idx.keys("user:?").len(), 1);
    assert_eq!(idx.keys("*").len(), 3);
    assert!(idx.keys("nope*").is_empty());
}

#[test]
fn keys_sorted_and_live_only() {
    let idx = MemIndex::new();
    idx.set(b"b".to_vec(), b"v".to_vec(), -1);
    idx.set(b"a".to_vec(), b"v".to_vec(), -1);
    idx.set(b"c".to_vec(), b"v".to_vec(), ttl_from_now(Duration::from_millis(5)));

    thread::sleep(Duration::from_millis(15));
    assert_eq!(idx.keys("*"), vec![b"a".to_vec(), b"b".to_vec()]);
}

// -------------------- Concurrency --------------------

#[test]
fn concurrent_readers_and_writers() {
    use std::sync::Arc;

    let idx = Arc::new(MemIndex::new());
    let mut handles = Vec::new();

    for t in 0..4 {
        let idx = idx.clone();
        handles.push(thread::spawn(move || {
            for i in 0..200u32 {
                let key = format!("t{}:{}", t, i).into_bytes();
                idx.set(key.clone(), b"v".to_vec(), -1);
                assert!(idx.get(&key).is_some());
            }
        }));
    }
    for t in 0..2 {
        let idx = idx.clone();
        handles.push(thread::spawn(move || {
            for _ in 0..100 {
                let _ = idx.scan(format!("t{}:", t).as_bytes(), 10);
                let _ = idx.count();
            }
        }));
    }

    for h in handles {
        h.join().unwrap();
    }
    assert_eq!(idx.count(), 800);
}
