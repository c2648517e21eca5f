use strata_core::{DataKey, ReplicationPolicy};

use crate::cell::CacheCell;

/// Cache object holding a single optional value.
pub struct ScalarCacheObject<V> {
    cell: CacheCell<Option<V>>,
}

impl<V: Clone + Send + Sync + 'static> ScalarCacheObject<V> {
    pub(crate) fn new(cell: CacheCell<Option<V>>) -> Self {
        Self { cell }
    }

    pub fn key(&self) -> &DataKey {
        self.cell.key()
    }

    pub fn policy(&self) -> ReplicationPolicy {
        self.cell.policy()
    }

    /// Whether [`get`](Self::get) would be answered from memory.
    pub fn is_fresh(&self) -> bool {
        self.cell.is_fresh()
    }

    pub async fn get(&self) -> Option<V> {
        let value = self.cell.load().await;
        (*value).clone()
    }

    pub async fn exists(&self) -> bool {
        self.cell.load().await.is_some()
    }

    pub async fn set(&self, value: V) {
        self.cell.replace(Some(value)).await;
    }

    /// Set or delete. `None` removes the value from every tier.
    pub async fn replace(&self, value: Option<V>) {
        self.cell.replace(value).await;
    }

    pub async fn delete(&self) {
        self.cell.replace(None).await;
    }
}
