//! Per-key async mutual exclusion.

use dashmap::DashMap;
use std::sync::Arc;
use tokio::sync::{Mutex, OwnedMutexGuard};

type LockMap = Arc<DashMap<String, Arc<Mutex<()>>>>;

/// A set of async mutexes addressed by string key.
///
/// Used to serialize read-modify-write cycles on one record (an account's
/// order list) or one file (an audit log) while leaving other keys free.
/// A key's entry lives only while some task holds or waits on it.
#[derive(Debug, Default, Clone)]
pub struct KeyedLocks {
    locks: LockMap,
}

/// Exclusive access to one key. Dropping it releases the lock and removes the
/// key's entry when nobody else is waiting on it.
#[derive(Debug)]
pub struct KeyedGuard {
    guard: Option<OwnedMutexGuard<()>>,
    key: String,
    locks: LockMap,
}

impl Drop for KeyedGuard {
    fn drop(&mut self) {
        drop(self.guard.take());
        // Waiters clone the mutex under the shard lock, so a count of one
        // means the map holds the only reference.
        self.locks
            .remove_if(&self.key, |_, mutex| Arc::strong_count(mutex) == 1);
    }
}

impl KeyedLocks {
    pub fn new() -> Self {
        Self::default()
    }

    /// Waits for exclusive access to `key`. Released when the guard drops.
    pub async fn lock(&self, key: &str) -> KeyedGuard {
        let mutex = self
            .locks
            .entry(key.to_string())
            .or_insert_with(|| Arc::new(Mutex::new(())))
            .clone();
        KeyedGuard {
            guard: Some(mutex.lock_owned().await),
            key: key.to_string(),
            locks: self.locks.clone(),
        }
    }

    pub fn len(&self) -> usize {
        self.locks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.locks.is_empty()
    }
}
