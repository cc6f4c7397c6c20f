use super::helpers::*;
use crate::{Db, Error, Options};
use tempfile::tempdir;

// --------------------- Set / Get / Delete ---------------------

#[test]
fn set_get_roundtrip() {
    let dir = tempdir().unwrap();
    let db = open_db(dir.path());

    db.set(b"alpha", b"1").unwrap();
    assert_eq!(db.get(b"alpha").unwrap(), b"1");

    db.set(b"alpha", b"2").unwrap();
    assert_eq!(db.get(b"alpha").unwrap(), b"2");
}

#[test]
fn get_missing_is_not_found() {
    let dir = tempdir().unwrap();
    let db = open_db(dir.path());
    assert!(matches!(db.get(b"nope"), Err(Error::NotFound)));
}

#[test]
fn delete_is_idempotent() {
    let dir = tempdir().unwrap();
    let db = open_db(dir.path());

    db.set(b"k", b"v").unwrap();
    db.delete(b"k").unwrap();
    db.delete(b"k").unwrap();
    assert!(matches!(db.get(b"k"), Err(Error::NotFound)));
}

#[test]
fn exists_reflects_state() {
    let dir = tempdir().unwrap();
    let db = open_db(dir.path());

    assert!(!db.exists(b"k").unwrap());
    db.set(b"k", b"v").unwrap();
    assert!(db.exists(b"k").unwrap());
    db.delete(b"k").unwrap();
    assert!(!db.exists(b"k").unwrap());
}

#[test]
fn empty_and_binary_values_roundtrip() {
    let dir = tempdir().unwrap();
    let db = open_db(dir.path());

    db.set(b"empty", b"").unwrap();
    assert_eq!(db.get(b"empty").unwrap(), b"");

    let blob: Vec<u8> = (0..=255u8).collect();
    db.set(b"blob", &blob).unwrap();
    assert_eq!(db.get(b"blob").unwrap(), blob);
}

// --------------------- Validation ---------------------

#[test]
fn oversized_key_rejected() {
    let dir = tempdir().unwrap();
    let db = open_db(dir.path());
    let key = vec![b'k'; crate::DEFAULT_MAX_KEY_SIZE + 1];

    assert!(matches!(db.set(&key, b"v"), Err(Error::KeyTooLarge)));
    assert!(matches!(db.get(&key), Err(Error::KeyTooLarge)));
    assert!(matches!(db.delete(&key), Err(Error::KeyTooLarge)));
}

#[test]
fn oversized_value_rejected() {
    let dir = tempdir().unwrap();
    let mut opts = test_options(dir.path());
    opts.max_value_size = 16;
    let db = Db::open(opts).unwrap();

    assert!(matches!(
        db.set(b"k", &vec![0u8; 17]),
        Err(Error::ValueTooLarge)
    ));
    db.set(b"k", &vec![0u8; 16]).unwrap();
}

#[test]
fn empty_key_never_stored() {
    let dir = tempdir().unwrap();
    let db = open_db(dir.path());

    assert!(matches!(db.set(b"", b"v"), Err(Error::NotFound)));
    assert!(matches!(db.get(b""), Err(Error::NotFound)));
    assert!(!db.exists(b"").unwrap());
    // Empty-key delete is a no-op success.
    db.delete(b"").unwrap();
}

// --------------------- Read-only and closed handles ---------------------

#[test]
fn read_only_rejects_writes() {
    let dir = tempdir().unwrap();
    {
        let db = open_db(dir.path());
        db.set(b"k", b"v").unwrap();
        db.close().unwrap();
    }

    let mut opts = test_options(dir.path());
    opts.read_only = true;
    let db = Db::open(opts).unwrap();

    assert_eq!(db.get(b"k").unwrap(), b"v");
    assert!(matches!(db.set(b"k2", b"v"), Err(Error::ReadOnly)));
    assert!(matches!(db.delete(b"k"), Err(Error::ReadOnly)));
    assert!(matches!(db.incr(b"n"), Err(Error::ReadOnly)));
}

#[test]
fn closed_handle_rejects_everything_but_close() {
    let dir = tempdir().unwrap();
    let db = open_db(dir.path());
    db.set(b"k", b"v").unwrap();
    db.close().unwrap();

    assert!(matches!(db.get(b"k"), Err(Error::Closed)));
    assert!(matches!(db.set(b"k", b"v"), Err(Error::Closed)));
    assert!(matches!(db.delete(b"k"), Err(Error::Closed)));
    assert!(matches!(db.count(), Err(Error::Closed)));
    assert!(matches!(db.sync(), Err(Error::Closed)));
    // Close is idempotent.
    db.close().unwrap();
}

// --------------------- Locking ---------------------

#[test]
fn second_open_fails_with_locked() {
    let dir = tempdir().unwrap();
    let db = open_db(dir.path());

    let second = Db::open(test_options(dir.path()));
    assert!(matches!(second, Err(Error::Locked)));

    // Releasing the first handle frees the lock.
    db.close().unwrap();
    drop(db);
    let third = Db::open(test_options(dir.path()));
    assert!(third.is_ok());
}

#[test]
fn empty_path_is_rejected() {
    assert!(Db::open(Options::new("")).is_err());
}
