use std::path::Path;

use crate::{Db, Options, SyncMode};

/// Options tuned for tests: fsync on every write so reopen-after-drop
/// scenarios are deterministic.
pub fn test_options(path: &Path) -> Options {
    let mut opts = Options::new(path);
    opts.sync_mode = SyncMode::Always;
    opts
}

pub fn open_db(path: &Path) -> Db {
    Db::open(test_options(path)).unwrap()
}

/// Polls `cond` for up to two seconds, for assertions on background work.
pub fn wait_for(mut cond: impl FnMut() -> bool) -> bool {
    for _ in 0..100 {
        if cond() {
            return true;
        }
        std::thread::sleep(std::time::Duration::from_millis(20));
    }
    false
}
