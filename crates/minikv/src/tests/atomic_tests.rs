use super::helpers::*;
use crate::Error;
use std::time::Duration;
use tempfile::tempdir;

// --------------------- SetNX ---------------------

#[test]
fn set_nx_writes_only_when_absent() {
    let dir = tempdir().unwrap();
    let db = open_db(dir.path());

    assert!(db.set_nx(b"k", b"first").unwrap());
    assert!(!db.set_nx(b"k", b"second").unwrap());
    assert_eq!(db.get(b"k").unwrap(), b"first");
}

#[test]
fn set_nx_succeeds_after_delete_and_after_expiry() {
    let dir = tempdir().unwrap();
    let db = open_db(dir.path());

    db.set(b"k", b"v").unwrap();
    db.delete(b"k").unwrap();
    assert!(db.set_nx(b"k", b"again").unwrap());

    db.set_with_ttl(b"t", b"v", Duration::from_millis(30)).unwrap();
    std::thread::sleep(Duration::from_millis(60));
    assert!(db.set_nx(b"t", b"revived").unwrap());
}

// --------------------- Incr / Decr ---------------------

#[test]
fn incr_by_adds_to_existing_value() {
    let dir = tempdir().unwrap();
    let db = open_db(dir.path());

    db.set(b"n", b"41").unwrap();
    assert_eq!(db.incr(b"n").unwrap(), 42);
    assert_eq!(db.get(b"n").unwrap(), b"42");

    assert_eq!(db.incr_by(b"n", -40).unwrap(), 2);
    assert_eq!(db.decr(b"n").unwrap(), 1);
}

#[test]
fn incr_on_missing_key_starts_at_zero() {
    let dir = tempdir().unwrap();
    let db = open_db(dir.path());

    assert_eq!(db.incr(b"counter").unwrap(), 1);
    assert_eq!(db.incr_by(b"negative", -5).unwrap(), -5);
    assert_eq!(db.get(b"negative").unwrap(), b"-5");
}

#[test]
fn incr_rejects_non_integer_values() {
    let dir = tempdir().unwrap();
    let db = open_db(dir.path());

    db.set(b"s", b"not a number").unwrap();
    assert!(matches!(db.incr(b"s"), Err(Error::InvalidValue)));
    // The failed increment must not clobber the value.
    assert_eq!(db.get(b"s").unwrap(), b"not a number");
}

#[test]
fn incr_rejects_overflow() {
    let dir = tempdir().unwrap();
    let db = open_db(dir.path());

    db.set(b"n", i64::MAX.to_string().as_bytes()).unwrap();
    assert!(matches!(db.incr(b"n"), Err(Error::InvalidValue)));
    assert_eq!(db.get(b"n").unwrap(), i64::MAX.to_string().as_bytes());
}

#[test]
fn incr_preserves_created_at() {
    let dir = tempdir().unwrap();
    let db = open_db(dir.path());

    db.set(b"n", b"1").unwrap();
    let created = db.inner.index.get(b"n").unwrap().created_at;
    std::thread::sleep(Duration::from_millis(10));
    db.incr(b"n").unwrap();
    assert_eq!(db.inner.index.get(b"n").unwrap().created_at, created);
}

// --------------------- CompareAndSwap ---------------------

#[test]
fn cas_swaps_only_on_exact_match() {
    let dir = tempdir().unwrap();
    let db = open_db(dir.path());

    db.set(b"k", b"old").unwrap();
    assert!(!db.compare_and_swap(b"k", b"wrong", b"new").unwrap());
    assert_eq!(db.get(b"k").unwrap(), b"old");

    assert!(db.compare_and_swap(b"k", b"old", b"new").unwrap());
    assert_eq!(db.get(b"k").unwrap(), b"new");
}

#[test]
fn cas_on_missing_key_returns_false() {
    let dir = tempdir().unwrap();
    let db = open_db(dir.path());
    assert!(!db.compare_and_swap(b"nope", b"a", b"b").unwrap());
    assert!(!db.exists(b"nope").unwrap());
}

#[test]
fn cas_preserves_expiry_and_created_at() {
    let dir = tempdir().unwrap();
    let db = open_db(dir.path());

    db.set_with_ttl(b"k", b"old", Duration::from_secs(3600)).unwrap();
    let before = db.inner.index.get(b"k").unwrap();

    assert!(db.compare_and_swap(b"k", b"old", b"new").unwrap());
    let after = db.inner.index.get(b"k").unwrap();
    assert_eq!(after.expires_at, before.expires_at);
    assert_eq!(after.created_at, before.created_at);
}

// --------------------- GetAndSet ---------------------

#[test]
fn get_and_set_returns_prior_value() {
    let dir = tempdir().unwrap();
    let db = open_db(dir.path());

    let old = db.get_and_set(b"k", b"first").unwrap();
    assert!(old.is_empty());
    let old = db.get_and_set(b"k", b"second").unwrap();
    assert_eq!(old, b"first");
    assert_eq!(db.get(b"k").unwrap(), b"second");
}

#[test]
fn get_and_set_assigns_fresh_created_at() {
    let dir = tempdir().unwrap();
    let db = open_db(dir.path());

    db.set(b"k", b"v").unwrap();
    let created = db.inner.index.get(b"k").unwrap().created_at;
    std::thread::sleep(Duration::from_millis(10));
    db.get_and_set(b"k", b"w").unwrap();
    assert!(db.inner.index.get(b"k").unwrap().created_at > created);
}

// --------------------- Durability ---------------------

#[test]
fn atomic_rewrites_survive_reopen() {
    let dir = tempdir().unwrap();
    {
        let db = open_db(dir.path());
        db.set(b"n", b"1").unwrap();
        db.incr_by(b"n", 9).unwrap();
        db.set(b"c", b"old").unwrap();
        db.compare_and_swap(b"c", b"old", b"new").unwrap();
        db.close().unwrap();
    }

    let db = open_db(dir.path());
    assert_eq!(db.get(b"n").unwrap(), b"10");
    assert_eq!(db.get(b"c").unwrap(), b"new");
}
