//! Lazily created, per-key mutual exclusion
//!
//! The registry map is guarded by a single mutex that is held only while a
//! handle is looked up or inserted, never while a per-key lock is held.
//! Entries live for the lifetime of the process unless `prune_idle` is
//! called.

use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::{Mutex, OwnedMutexGuard};

/// Handle to the lock registered for one key
#[derive(Debug, Clone)]
pub struct KeyedLock {
    key: String,
    inner: Arc<Mutex<()>>,
}

impl KeyedLock {
    pub fn key(&self) -> &str {
        &self.key
    }

    /// Wait for exclusive ownership. The guard releases on drop.
    pub async fn lock(&self) -> OwnedMutexGuard<()> {
        self.inner.clone().lock_owned().await
    }

    /// True when both handles refer to the same underlying lock instance
    pub fn same_lock(&self, other: &KeyedLock) -> bool {
        Arc::ptr_eq(&self.inner, &other.inner)
    }
}

#[derive(Debug, Default)]
pub struct KeyedLockRegistry {
    locks: Mutex<HashMap<String, Arc<Mutex<()>>>>,
}

impl KeyedLockRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Look up the lock for `key`, creating and registering it on first use
    pub async fn acquire(&self, key: &str) -> KeyedLock {
        let mut locks = self.locks.lock().await;
        let inner = locks
            .entry(key.to_string())
            .or_insert_with(|| Arc::new(Mutex::new(())))
            .clone();
        KeyedLock {
            key: key.to_string(),
            inner,
        }
    }

    pub async fn len(&self) -> usize {
        self.locks.lock().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.locks.lock().await.is_empty()
    }

    /// Drop every lock nobody holds, waits on or keeps a handle to.
    ///
    /// Any outstanding handle or guard owns a clone of the `Arc`, and new
    /// handles can only be minted under the registry mutex, so a strong
    /// count of one means the entry is unreachable outside the map.
    pub async fn prune_idle(&self) -> usize {
        let mut locks = self.locks.lock().await;
        let before = locks.len();
        locks.retain(|_, lock| Arc::strong_count(lock) > 1);
        before - locks.len()
    }
}
