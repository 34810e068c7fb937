use std::collections::HashMap;
use std::future::Future;
use std::hash::Hash;
use std::sync::{Arc, Mutex as StdMutex, MutexGuard as StdMutexGuard};

use tokio::sync::Mutex;

type Locks<K> = StdMutex<HashMap<K, Arc<Mutex<()>>>>;

/// Keyed mutual exclusion for async operations.
///
/// At most one operation per key runs at a time; concurrent callers on the same
/// key queue behind it. Keys are forgotten once nobody holds or awaits them,
/// including callers whose future was dropped mid-wait or mid-invoke.
pub struct IdLock<K> {
    locks: Locks<K>,
}

impl<K> Default for IdLock<K> {
    fn default() -> Self {
        Self {
            locks: StdMutex::new(HashMap::new()),
        }
    }
}

impl<K: Eq + Hash + Clone + Send> IdLock<K> {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn try_invoke<F, Fut, T>(&self, key: K, invoke: F) -> T
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = T>,
    {
        let entry = KeyEntry::acquire(&self.locks, key);
        let _held = entry.lock.lock().await;

        invoke().await
    }

    pub fn len(&self) -> usize {
        lock_map(&self.locks).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

fn lock_map<K>(locks: &Locks<K>) -> StdMutexGuard<'_, HashMap<K, Arc<Mutex<()>>>> {
    // The map is never left half-updated, so a poisoned lock is still usable
    locks.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

/// One caller's interest in a key; forgets the key on drop when it was the
/// last one.
struct KeyEntry<'a, K: Eq + Hash> {
    locks: &'a Locks<K>,
    key: K,
    lock: Arc<Mutex<()>>,
}

impl<'a, K: Eq + Hash + Clone> KeyEntry<'a, K> {
    fn acquire(locks: &'a Locks<K>, key: K) -> Self {
        let lock = lock_map(locks).entry(key.clone()).or_default().clone();

        Self { locks, key, lock }
    }
}

impl<K: Eq + Hash> Drop for KeyEntry<'_, K> {
    fn drop(&mut self) {
        let mut locks = lock_map(self.locks);

        // Only the map and this entry still refer to the lock
        if locks.get(&self.key).is_some_and(|lock| Arc::strong_count(lock) == 2) {
            locks.remove(&self.key);
        }
    }
}
