// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Per-file write locks: the "at-most-one-writer" substitute for a
//! database (see mission engine design notes). Process-local only — no
//! file-system locks, because only this process writes these files.
//! Readers do not take the lock; they see the last-written atomic
//! snapshot.

use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::Arc;

#[derive(Default)]
pub struct LockTable {
    locks: Mutex<HashMap<String, Arc<Mutex<()>>>>,
}

impl LockTable {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock_for(&self, key: &str) -> Arc<Mutex<()>> {
        let mut locks = self.locks.lock();
        locks.entry(key.to_string()).or_insert_with(|| Arc::new(Mutex::new(()))).clone()
    }

    /// Run `f` while holding the write lock for `key`. Use for every
    /// read -> mutate -> atomic-write sequence on a given file.
    pub fn with_lock<T>(&self, key: &str, f: impl FnOnce() -> T) -> T {
        let lock = self.lock_for(key);
        let _guard = lock.lock();
        f()
    }
}
