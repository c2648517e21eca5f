use std::sync::Arc;

use strata_core::{DataKey, ReplicationPolicy};

use crate::cell::CacheCell;
use crate::error::CacheError;

/// Cache object holding a list.
///
/// Reads hand out immutable snapshots; every mutation clones the current
/// list, applies the change and commits the clone, so a snapshot never sees
/// later writes. A mutation leaving the list empty deletes the key.
pub struct ListCacheObject<V> {
    cell: CacheCell<Vec<V>>,
}

impl<V: Clone + Send + Sync + 'static> ListCacheObject<V> {
    pub(crate) fn new(cell: CacheCell<Vec<V>>) -> Self {
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

    /// Read-only snapshot of the whole list.
    pub async fn get_all(&self) -> Arc<Vec<V>> {
        self.cell.load().await
    }

    pub async fn get(&self, index: usize) -> Option<V> {
        self.cell.load().await.get(index).cloned()
    }

    pub async fn size(&self) -> usize {
        self.cell.load().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.cell.load().await.is_empty()
    }

    pub async fn contains(&self, element: &V) -> bool
    where
        V: PartialEq,
    {
        self.cell.load().await.contains(element)
    }

    pub async fn replace_all(&self, elements: Vec<V>) {
        self.cell.replace(elements).await;
    }

    pub async fn add(&self, element: V) {
        self.cell
            .mutate(|list| {
                list.push(element);
                ((), true)
            })
            .await;
    }

    /// Remove the first occurrence of `element`. Returns whether one was found.
    pub async fn remove(&self, element: &V) -> bool
    where
        V: PartialEq,
    {
        self.cell
            .mutate(|list| match list.iter().position(|e| e == element) {
                Some(index) => {
                    list.remove(index);
                    (true, true)
                }
                None => (false, false),
            })
            .await
    }

    /// Replace the element at `index`, returning the previous one.
    pub async fn set(&self, index: usize, element: V) -> Result<V, CacheError> {
        self.cell
            .mutate(|list| {
                let len = list.len();
                match list.get_mut(index) {
                    Some(slot) => (Ok(std::mem::replace(slot, element)), true),
                    None => (Err(CacheError::IndexOutOfBounds { index, len }), false),
                }
            })
            .await
    }

    pub async fn clear(&self) {
        self.cell.replace(Vec::new()).await;
    }
}
