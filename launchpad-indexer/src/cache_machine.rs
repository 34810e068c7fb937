use std::collections::HashMap;
use std::future::Future;
use std::hash::Hash;
use std::sync::Arc;

use tokio::sync::{Mutex, OnceCell};

/// Keyed async memoization.
///
/// A value is computed at most once per key. Callers racing on an uncached key
/// share the first caller's in-flight computation instead of starting their
/// own. Failed computations are not cached, so the next caller retries.
pub struct CacheMachine<K, V> {
    cells: Mutex<HashMap<K, Arc<OnceCell<V>>>>,
}

impl<K, V> Default for CacheMachine<K, V> {
    fn default() -> Self {
        Self {
            cells: Mutex::new(HashMap::new()),
        }
    }
}

impl<K, V> CacheMachine<K, V>
where
    K: Eq + Hash + Clone + Send,
    V: Clone + Send + Sync,
{
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn call<KeyFn, ValueFn, Fut>(&self, key_fn: KeyFn, value_fn: ValueFn) -> V
    where
        KeyFn: FnOnce() -> K,
        ValueFn: FnOnce() -> Fut,
        Fut: Future<Output = V>,
    {
        let cell = self.get_cell(key_fn()).await;

        cell.get_or_init(value_fn).await.clone()
    }

    pub async fn try_call<KeyFn, ValueFn, Fut, E>(
        &self,
        key_fn: KeyFn,
        value_fn: ValueFn,
    ) -> Result<V, E>
    where
        KeyFn: FnOnce() -> K,
        ValueFn: FnOnce() -> Fut,
        Fut: Future<Output = Result<V, E>>,
    {
        let cell = self.get_cell(key_fn()).await;

        cell.get_or_try_init(value_fn).await.cloned()
    }

    pub async fn get(&self, key: &K) -> Option<V> {
        let cells = self.cells.lock().await;

        cells.get(key).and_then(|cell| cell.get().cloned())
    }

    pub async fn invalidate(&self, key: &K) {
        self.cells.lock().await.remove(key);
    }

    pub async fn clear(&self) {
        self.cells.lock().await.clear();
    }

    async fn get_cell(&self, key: K) -> Arc<OnceCell<V>> {
        let mut cells = self.cells.lock().await;

        cells.entry(key).or_default().clone()
    }
}
