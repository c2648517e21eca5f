use std::collections::HashMap;
use std::hash::Hash;
use std::sync::Arc;

use strata_core::{DataKey, ReplicationPolicy};

use crate::cell::CacheCell;

/// Cache object holding a map. Same snapshot and clone-on-write rules as
/// [`ListCacheObject`](crate::ListCacheObject).
pub struct MapCacheObject<K, V> {
    cell: CacheCell<HashMap<K, V>>,
}

impl<K, V> MapCacheObject<K, V>
where
    K: Eq + Hash + Clone + Send + Sync + 'static,
    V: Clone + Send + Sync + 'static,
{
    pub(crate) fn new(cell: CacheCell<HashMap<K, V>>) -> Self {
        Self { cell }
    }

    pub fn key(&self) -> &DataKey {
        self.cell.key()
    }

    pub fn policy(&self) -> ReplicationPolicy {
        self.cell.policy()
    }

    pub fn is_fresh(&self) -> bool {
        self.cell.is_fresh()
    }

    pub async fn get(&self, key: &K) -> Option<V> {
        self.cell.load().await.get(key).cloned()
    }

    /// Read-only snapshot of the whole map.
    pub async fn get_all(&self) -> Arc<HashMap<K, V>> {
        self.cell.load().await
    }

    pub async fn size(&self) -> usize {
        self.cell.load().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.cell.load().await.is_empty()
    }

    pub async fn contains_key(&self, key: &K) -> bool {
        self.cell.load().await.contains_key(key)
    }

    pub async fn contains_value(&self, value: &V) -> bool
    where
        V: PartialEq,
    {
        self.cell.load().await.values().any(|v| v == value)
    }

    pub async fn replace_all(&self, entries: HashMap<K, V>) {
        self.cell.replace(entries).await;
    }

    /// Insert or replace, returning the previous value.
    ///
    /// The old entry is removed first so the stored key is the one passed in.
    pub async fn put(&self, key: K, value: V) -> Option<V> {
        self.cell
            .mutate(|map| {
                let previous = map.remove(&key);
                map.insert(key, value);
                (previous, true)
            })
            .await
    }

    pub async fn remove(&self, key: &K) -> Option<V> {
        self.cell
            .mutate(|map| {
                let removed = map.remove(key);
                let changed = removed.is_some();
                (removed, changed)
            })
            .await
    }

    pub async fn clear(&self) {
        self.cell.replace(HashMap::new()).await;
    }
}
