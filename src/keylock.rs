//! Per-key mutual exclusion for cache population.
//!
//! Requests that miss the cache for the same entry must not fetch the same series from upstream
//! concurrently. Each cache key maps to a shared async mutex; holders of different keys never
//! block each other.

use hashbrown::HashMap;
use std::sync::Arc;
use tokio::sync::{Mutex, RwLock};

/// A map of cache keys to shared async mutexes.
///
/// The map is protected by a read-write lock so the common case of an existing entry takes only
/// a read lock.
// FIXME: Entries are never removed, so the map grows with the set of keys ever requested.
#[derive(Debug, Default)]
pub struct KeyLocks {
    /// Map of cache key to lock
    map: RwLock<HashMap<String, Arc<Mutex<()>>>>,
}

impl KeyLocks {
    /// Return a new empty KeyLocks object.
    pub fn new() -> Self {
        Self::default()
    }

    /// Return the lock for a key, creating it on first use.
    ///
    /// Checks the map again under the write lock because another task may have created the entry
    /// between the read and write sections.
    pub async fn get(&self, key: &str) -> Arc<Mutex<()>> {
        if let Some(lock) = self.map.read().await.get(key) {
            return lock.clone();
        }
        let mut map = self.map.write().await;
        map.entry(key.to_string())
            .or_insert_with(|| Arc::new(Mutex::new(())))
            .clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn same_key_same_lock() {
        let locks = KeyLocks::new();
        let first = locks.get("key").await;
        let second = locks.get("key").await;
        assert!(Arc::ptr_eq(&first, &second));
    }

    #[tokio::test]
    async fn different_keys_different_locks() {
        let locks = KeyLocks::new();
        let first = locks.get("one").await;
        let second = locks.get("two").await;
        assert!(!Arc::ptr_eq(&first, &second));
    }

    #[tokio::test]
    async fn holder_does_not_block_other_keys() {
        let locks = KeyLocks::new();
        let one = locks.get("one").await;
        let _guard = one.lock().await;
        let two = locks.get("two").await;
        // Acquiring a different key's lock completes while "one" is held.
        let _other = two.lock().await;
    }
}
