use std::sync::Arc;

use dashmap::DashMap;
use tokio::sync::{Mutex, OwnedMutexGuard};

/// Async mutexes keyed by an integer id (match id, user id).
///
/// Entries are created on first use and dropped by [`KeyedLocks::release`]
/// once nobody holds or waits on them.
#[derive(Default)]
pub struct KeyedLocks {
    inner: DashMap<i32, Arc<Mutex<()>>>,
}

impl KeyedLocks {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn lock(&self, key: i32) -> OwnedMutexGuard<()> {
        let mutex = self.inner.entry(key).or_default().clone();
        mutex.lock_owned().await
    }

    /// Lock several keys in ascending order. Duplicates are locked once.
    pub async fn lock_many(&self, keys: &[i32]) -> Vec<OwnedMutexGuard<()>> {
        let mut keys = keys.to_vec();
        keys.sort_unstable();
        keys.dedup();

        let mut guards = Vec::with_capacity(keys.len());
        for key in keys {
            guards.push(self.lock(key).await);
        }
        guards
    }

    /// Drop the entry for `key` if it is idle.
    pub fn release(&self, key: i32) {
        self.inner
            .remove_if(&key, |_, mutex| Arc::strong_count(mutex) == 1);
    }

    pub fn len(&self) -> usize {
        self.inner.len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.is_empty()
    }
}
