use std::{
    collections::HashMap,
    hash::Hash,
    sync::{Arc, Mutex, PoisonError, RwLock},
};

use tokio::sync::{Mutex as AsyncMutex, OwnedMutexGuard};

use crate::models::CartId;

/// One async mutex per key, created on demand.
///
/// Entries nobody holds or waits on are dropped the next time a lock is taken.
pub struct KeyedLocks<K> {
    locks: Mutex<HashMap<K, Arc<AsyncMutex<()>>>>,
}

impl<K> Default for KeyedLocks<K> {
    fn default() -> Self {
        Self {
            locks: Mutex::new(HashMap::new()),
        }
    }
}

impl<K: Eq + Hash + Clone> KeyedLocks<K> {
    pub async fn lock(&self, key: &K) -> OwnedMutexGuard<()> {
        let lock = {
            let mut locks = self.locks.lock().unwrap_or_else(PoisonError::into_inner);
            locks.retain(|_, lock| Arc::strong_count(lock) > 1);
            locks.entry(key.clone()).or_default().clone()
        };
        lock.lock_owned().await
    }

    pub fn len(&self) -> usize {
        self.locks
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Process-local map of user id to resolved active cart id.
#[derive(Debug, Default)]
pub struct ActiveCartCache {
    entries: RwLock<HashMap<String, CartId>>,
}

impl ActiveCartCache {
    pub fn get(&self, user_id: &str) -> Option<CartId> {
        self.entries
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(user_id)
            .copied()
    }

    pub fn insert(&self, user_id: &str, cart_id: CartId) {
        self.entries
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(user_id.to_string(), cart_id);
    }

    pub fn remove(&self, user_id: &str) -> Option<CartId> {
        self.entries
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(user_id)
    }

    pub fn clear(&self) {
        self.entries
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .clear();
    }
}
