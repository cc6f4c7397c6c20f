use super::helpers::*;
use crate::{Db, Error};
use std::time::Duration;
use tempfile::tempdir;

// --------------------- Atomic visibility ---------------------

#[test]
fn batch_applies_all_operations_together() {
    let dir = tempdir().unwrap();
    let db = open_db(dir.path());
    db.set(b"c", b"doomed").unwrap();

    let mut batch = db.new_batch();
    batch.set(b"a", b"1");
    batch.set_with_ttl(b"b", b"2", Duration::from_millis(80));
    batch.delete(b"c");
    batch.write().unwrap();

    assert_eq!(db.get(b"a").unwrap(), b"1");
    assert_eq!(db.get(b"b").unwrap(), b"2");
    assert!(!db.exists(b"c").unwrap());

    std::thread::sleep(Duration::from_millis(110));
    assert!(matches!(db.get(b"b"), Err(Error::NotFound)));
    assert_eq!(db.get(b"a").unwrap(), b"1");
}

#[test]
fn empty_batch_is_a_noop() {
    let dir = tempdir().unwrap();
    let db = open_db(dir.path());
    db.new_batch().write().unwrap();
}

#[test]
fn dropped_batch_applies_nothing() {
    let dir = tempdir().unwrap();
    let db = open_db(dir.path());

    let mut batch = db.new_batch();
    batch.set(b"k", b"v");
    drop(batch);

    assert!(!db.exists(b"k").unwrap());
}

#[test]
fn batch_last_write_wins_within_batch() {
    let dir = tempdir().unwrap();
    let db = open_db(dir.path());

    let mut batch = db.new_batch();
    batch.set(b"k", b"first");
    batch.set(b"k", b"second");
    batch.write().unwrap();

    assert_eq!(db.get(b"k").unwrap(), b"second");
}

// --------------------- Validation ---------------------

#[test]
fn buffering_error_surfaces_on_write() {
    let dir = tempdir().unwrap();
    let db = open_db(dir.path());

    let mut batch = db.new_batch();
    batch.set(b"good", b"v");
    batch.set(&vec![b'k'; crate::DEFAULT_MAX_KEY_SIZE + 1], b"v");
    batch.set(b"also-good", b"v");

    assert!(matches!(batch.write(), Err(Error::KeyTooLarge)));
    // Nothing from the failed batch lands.
    assert!(!db.exists(b"good").unwrap());
}

#[test]
fn oversized_batch_rejected() {
    let dir = tempdir().unwrap();
    let mut opts = test_options(dir.path());
    opts.max_batch_size = 32;
    let db = Db::open(opts).unwrap();

    let mut batch = db.new_batch();
    batch.set(b"key-one", &vec![0u8; 16]);
    batch.set(b"key-two", &vec![0u8; 16]);
    assert!(matches!(batch.write(), Err(Error::BatchTooBig)));
}

#[test]
fn empty_keys_are_skipped_when_buffering() {
    let dir = tempdir().unwrap();
    let db = open_db(dir.path());

    let mut batch = db.new_batch();
    batch.set(b"", b"v");
    batch.delete(b"");
    assert!(batch.is_empty());
    batch.set(b"k", b"v");
    assert_eq!(batch.len(), 1);
    batch.write().unwrap();
}

// --------------------- Durability ---------------------

#[test]
fn batch_survives_reopen() {
    let dir = tempdir().unwrap();
    {
        let db = open_db(dir.path());
        db.set(b"gone", b"v").unwrap();
        let mut batch = db.new_batch();
        batch.set(b"a", b"1");
        batch.set(b"b", b"2");
        batch.delete(b"gone");
        batch.write().unwrap();
        db.close().unwrap();
    }

    let db = open_db(dir.path());
    assert_eq!(db.get(b"a").unwrap(), b"1");
    assert_eq!(db.get(b"b").unwrap(), b"2");
    assert!(!db.exists(b"gone").unwrap());
}
