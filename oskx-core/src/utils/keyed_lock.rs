//! Per-key async mutex.
//!
//! Used to linearize read-check-mutate sequences scoped by an owning id:
//! the exchange state machine locks per exchange id, the ledger locks
//! per user id. Lock cells are created on first use and kept for the
//! life of the process; the key space (active users and exchanges) is
//! small enough that this does not need eviction.

use std::collections::HashMap;
use std::hash::Hash;
use std::sync::Arc;
use tokio::sync::{Mutex, OwnedMutexGuard};

pub struct KeyedLocks<K> {
    cells: Mutex<HashMap<K, Arc<Mutex<()>>>>,
}

impl<K> Default for KeyedLocks<K> {
    fn default() -> Self {
        Self {
            cells: Mutex::new(HashMap::new()),
        }
    }
}

impl<K: Eq + Hash + Clone> KeyedLocks<K> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Acquire the lock for `key`, waiting if another task holds it.
    pub async fn acquire(&self, key: K) -> OwnedMutexGuard<()> {
        let cell = {
            let mut cells = self.cells.lock().await;
            cells.entry(key).or_default().clone()
        };
        cell.lock_owned().await
    }
}
