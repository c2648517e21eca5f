//! Shared fixtures: several sync contexts over one set of in-process backends.

#![allow(dead_code)]

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use serde::Serialize;
use serde::de::DeserializeOwned;
use strata_cache::SyncContext;
use strata_core::{DataKey, JsonConverter, SharedConverter};
use strata_db_memory::{InMemoryDocumentStore, InMemorySharedCache};
use strata_storage::{MessageStream, SharedCache, StorageError};
use tokio::sync::Notify;

/// One shared cache and one document store, seen by any number of instances.
pub struct Cluster {
    pub cache: Arc<InMemorySharedCache>,
    pub store: Arc<InMemoryDocumentStore>,
}

impl Cluster {
    pub fn new() -> Self {
        Self {
            cache: Arc::new(InMemorySharedCache::new()),
            store: Arc::new(InMemoryDocumentStore::new()),
        }
    }

    /// A new instance without a running subscriber.
    pub fn instance(&self) -> SyncContext {
        self.builder().build()
    }

    /// A new instance listening for sync messages.
    pub async fn started_instance(&self) -> SyncContext {
        let ctx = self.instance();
        assert!(ctx.start_subscriber().await, "subscriber failed to start");
        ctx
    }

    pub fn builder(&self) -> strata_cache::SyncContextBuilder {
        SyncContext::builder()
            .shared_cache(self.cache.clone())
            .document_store(self.store.clone())
            .workers(2)
            .queue_capacity(64)
            .reconnect_backoff(Duration::from_millis(10), Duration::from_millis(50))
    }
}

pub fn key(namespace: &str, field: &str, identifier: &str) -> DataKey {
    DataKey::new(namespace, field, identifier).unwrap()
}

pub fn json<T>() -> SharedConverter<T>
where
    T: Serialize + DeserializeOwned + 'static,
{
    Arc::new(JsonConverter::<T>::new())
}

/// Poll `check` until it holds, giving up after two seconds.
pub async fn eventually(mut check: impl FnMut() -> bool) -> bool {
    let deadline = tokio::time::Instant::now() + Duration::from_secs(2);
    loop {
        if check() {
            return true;
        }
        if tokio::time::Instant::now() >= deadline {
            return false;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
}

/// Holds the next call of one operation until released.
#[derive(Default)]
pub struct Gate {
    armed: AtomicBool,
    reached: Notify,
    release: Notify,
}

impl Gate {
    /// Make the next call wait in [`Gate::release`].
    pub fn arm(&self) {
        self.armed.store(true, Ordering::SeqCst);
    }

    /// Wait until an armed call is being held.
    pub async fn reached(&self) {
        self.reached.notified().await;
    }

    pub fn release(&self) {
        self.release.notify_one();
    }

    async fn pass(&self) {
        if self.armed.swap(false, Ordering::SeqCst) {
            self.reached.notify_one();
            self.release.notified().await;
        }
    }
}

/// Shared cache whose GET and SET can be held mid-flight, and whose GET can
/// be slowed down.
///
/// A held GET has already read its value; a held SET has not yet written.
pub struct GatedSharedCache {
    inner: Arc<InMemorySharedCache>,
    get_delay: Duration,
    pub gets: Gate,
    pub sets: Gate,
}

impl GatedSharedCache {
    pub fn new(inner: Arc<InMemorySharedCache>) -> Self {
        Self::with_get_delay(inner, Duration::ZERO)
    }

    pub fn with_get_delay(inner: Arc<InMemorySharedCache>, get_delay: Duration) -> Self {
        Self {
            inner,
            get_delay,
            gets: Gate::default(),
            sets: Gate::default(),
        }
    }
}

#[async_trait]
impl SharedCache for GatedSharedCache {
    async fn get(&self, key: &str) -> Result<Option<String>, StorageError> {
        let value = self.inner.get(key).await;
        if !self.get_delay.is_zero() {
            tokio::time::sleep(self.get_delay).await;
        }
        self.gets.pass().await;
        value
    }

    async fn set(&self, key: &str, value: &str) -> Result<(), StorageError> {
        self.sets.pass().await;
        self.inner.set(key, value).await
    }

    async fn del(&self, key: &str) -> Result<(), StorageError> {
        self.inner.del(key).await
    }

    async fn publish(&self, channel: &str, payload: &[u8]) -> Result<(), StorageError> {
        self.inner.publish(channel, payload).await
    }

    async fn subscribe(&self, channel: &str) -> Result<MessageStream, StorageError> {
        self.inner.subscribe(channel).await
    }
}
