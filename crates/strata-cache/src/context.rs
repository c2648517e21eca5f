//! The per-process service object every cache object is constructed with.

use std::collections::HashMap;
use std::hash::Hash;
use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;
use strata_core::{
    ConverterRegistry, DataKey, InvalidationClock, ListConverter, MapConverter,
    OptionalConverter, RegistryError, ReplicationPolicy, SharedConverter, TypeTag,
};
use strata_db_memory::{InMemoryDocumentStore, InMemorySharedCache};
use strata_storage::{DynDocumentStore, DynSharedCache};
use tokio::sync::broadcast;
use uuid::Uuid;

use crate::cell::CacheCell;
use crate::config::{PropagationConfig, SyncConfig, default_sync_channel};
use crate::object::{ListCacheObject, MapCacheObject, ScalarCacheObject};
use crate::propagation::{PropagationFailure, Propagator};
use crate::stats::{CacheStats, StatsRecorder};
use crate::subscriber::{SubscriberHandle, SyncSubscriber};

const FAILURE_CHANNEL_CAPACITY: usize = 256;

/// State shared by cache cells, propagation workers and the subscriber.
pub(crate) struct ContextShared {
    pub(crate) clock: InvalidationClock,
    pub(crate) registry: ConverterRegistry,
    pub(crate) shared_cache: DynSharedCache,
    pub(crate) store: DynDocumentStore,
    pub(crate) channel: String,
    pub(crate) stats: StatsRecorder,
    pub(crate) failures: broadcast::Sender<PropagationFailure>,
}

struct ContextInner {
    shared: Arc<ContextShared>,
    propagator: Propagator,
    subscriber: Mutex<Option<SubscriberHandle>>,
    initial_backoff: Duration,
    max_backoff: Duration,
}

/// Invalidation clock, converter registry and remote tiers of one process.
///
/// Cheap to clone. Every cache object holds a clone, so several contexts can
/// coexist in one process (each behaving as its own instance).
///
/// ```ignore
/// let ctx = SyncContext::builder()
///     .shared_cache(redis)
///     .document_store(postgres)
///     .build();
/// ctx.start_subscriber().await;
///
/// let key = DataKey::new("user", "level", "u1")?;
/// let level = ctx.scalar(key, ReplicationPolicy::Both, Arc::new(JsonConverter::<u32>::new()));
/// level.set(42).await;
/// ```
#[derive(Clone)]
pub struct SyncContext {
    inner: Arc<ContextInner>,
}

impl SyncContext {
    pub fn builder() -> SyncContextBuilder {
        SyncContextBuilder::default()
    }

    #[inline]
    pub fn instance_id(&self) -> Uuid {
        self.inner.shared.clock.instance_id()
    }

    pub fn clock(&self) -> &InvalidationClock {
        &self.inner.shared.clock
    }

    pub fn registry(&self) -> &ConverterRegistry {
        &self.inner.shared.registry
    }

    /// Pub/sub channel carrying this context's sync messages.
    pub fn channel(&self) -> &str {
        &self.inner.shared.channel
    }

    pub fn register_converter<T: 'static>(
        &self,
        tag: TypeTag,
        converter: SharedConverter<T>,
    ) -> Result<(), RegistryError> {
        self.inner.shared.registry.register(tag, converter)
    }

    pub fn converter<T: 'static>(&self, tag: TypeTag) -> Option<SharedConverter<T>> {
        self.inner.shared.registry.get(tag)
    }

    /// Cache object holding a single optional value.
    pub fn scalar<V>(
        &self,
        key: DataKey,
        policy: ReplicationPolicy,
        converter: SharedConverter<V>,
    ) -> ScalarCacheObject<V>
    where
        V: Clone + Send + Sync + 'static,
    {
        let converter: SharedConverter<Option<V>> = Arc::new(OptionalConverter::new(converter));
        ScalarCacheObject::new(CacheCell::new(key, policy, converter, self.clone()))
    }

    /// Cache object holding a list, with elements encoded by `element`.
    pub fn list<V>(
        &self,
        key: DataKey,
        policy: ReplicationPolicy,
        element: SharedConverter<V>,
    ) -> ListCacheObject<V>
    where
        V: Clone + Send + Sync + 'static,
    {
        let converter: SharedConverter<Vec<V>> = Arc::new(ListConverter::new(element));
        ListCacheObject::new(CacheCell::new(key, policy, converter, self.clone()))
    }

    /// Cache object holding a map.
    pub fn map<K, V>(
        &self,
        key: DataKey,
        policy: ReplicationPolicy,
        key_converter: SharedConverter<K>,
        value_converter: SharedConverter<V>,
    ) -> MapCacheObject<K, V>
    where
        K: Eq + Hash + Clone + Send + Sync + 'static,
        V: Clone + Send + Sync + 'static,
    {
        let converter: SharedConverter<HashMap<K, V>> =
            Arc::new(MapConverter::new(key_converter, value_converter));
        MapCacheObject::new(CacheCell::new(key, policy, converter, self.clone()))
    }

    /// Start consuming sync messages from other instances.
    ///
    /// Returns once the first subscription attempt has finished; `false`
    /// means it failed and the subscriber is retrying in the background.
    /// Calling this while a subscriber is running does nothing.
    pub async fn start_subscriber(&self) -> bool {
        let ready = {
            let mut slot = self.inner.subscriber.lock();
            if slot.as_ref().is_some_and(|handle| !handle.is_finished()) {
                tracing::debug!("sync subscriber already running");
                return true;
            }
            let subscriber = SyncSubscriber::new(
                Arc::clone(&self.inner.shared),
                self.inner.initial_backoff,
                self.inner.max_backoff,
            );
            let (handle, ready) = subscriber.spawn();
            *slot = Some(handle);
            ready
        };
        ready.await.unwrap_or(false)
    }

    pub fn subscriber_running(&self) -> bool {
        self.inner
            .subscriber
            .lock()
            .as_ref()
            .is_some_and(|handle| !handle.is_finished())
    }

    /// Number of writes queued or being propagated.
    pub fn pending_writes(&self) -> usize {
        self.inner.propagator.pending()
    }

    /// Wait until every submitted write has been propagated.
    pub async fn wait_idle(&self) {
        self.inner.propagator.wait_idle().await;
    }

    /// Stop the subscriber, flush queued writes and stop the workers.
    ///
    /// Writes made after shutdown stay local.
    pub async fn shutdown(&self) {
        let subscriber = self.inner.subscriber.lock().take();
        if let Some(handle) = subscriber {
            handle.stop().await;
        }
        self.inner.propagator.shutdown().await;
        tracing::info!(instance_id = %self.instance_id(), "sync context shut down");
    }

    /// Receive reports of writes that failed to reach a remote tier.
    pub fn subscribe_failures(&self) -> broadcast::Receiver<PropagationFailure> {
        self.inner.shared.failures.subscribe()
    }

    pub fn stats(&self) -> CacheStats {
        self.inner.shared.stats.snapshot()
    }

    pub(crate) fn shared(&self) -> &ContextShared {
        &self.inner.shared
    }

    pub(crate) fn propagator(&self) -> &Propagator {
        &self.inner.propagator
    }
}

impl std::fmt::Debug for SyncContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SyncContext")
            .field("instance_id", &self.instance_id())
            .field("channel", &self.channel())
            .field("converters", &self.registry().len())
            .finish()
    }
}

/// Builder for [`SyncContext`]. Unset tiers default to in-process backends.
pub struct SyncContextBuilder {
    instance_id: Option<Uuid>,
    shared_cache: Option<DynSharedCache>,
    store: Option<DynDocumentStore>,
    channel: String,
    workers: usize,
    queue_capacity: usize,
    max_upsert_attempts: Option<u32>,
    initial_backoff: Duration,
    max_backoff: Duration,
}

impl Default for SyncContextBuilder {
    fn default() -> Self {
        Self::new()
            .sync_config(&SyncConfig::default())
            .propagation_config(&PropagationConfig::default())
    }
}

impl SyncContextBuilder {
    fn new() -> Self {
        Self {
            instance_id: None,
            shared_cache: None,
            store: None,
            channel: default_sync_channel(),
            workers: 1,
            queue_capacity: 1,
            max_upsert_attempts: None,
            initial_backoff: Duration::from_secs(1),
            max_backoff: Duration::from_secs(300),
        }
    }

    /// Fix the instance id instead of generating a random one.
    pub fn instance_id(mut self, instance_id: Uuid) -> Self {
        self.instance_id = Some(instance_id);
        self
    }

    pub fn shared_cache(mut self, shared_cache: DynSharedCache) -> Self {
        self.shared_cache = Some(shared_cache);
        self
    }

    pub fn document_store(mut self, store: DynDocumentStore) -> Self {
        self.store = Some(store);
        self
    }

    pub fn channel(mut self, channel: impl Into<String>) -> Self {
        self.channel = channel.into();
        self
    }

    pub fn workers(mut self, workers: usize) -> Self {
        self.workers = workers;
        self
    }

    pub fn queue_capacity(mut self, capacity: usize) -> Self {
        self.queue_capacity = capacity;
        self
    }

    /// Bound the duplicate-key retry loop. `None` retries until it succeeds.
    pub fn max_upsert_attempts(mut self, attempts: Option<u32>) -> Self {
        self.max_upsert_attempts = attempts;
        self
    }

    pub fn reconnect_backoff(mut self, initial: Duration, max: Duration) -> Self {
        self.initial_backoff = initial;
        self.max_backoff = max.max(initial);
        self
    }

    pub fn sync_config(self, config: &SyncConfig) -> Self {
        self.channel(config.channel.clone()).reconnect_backoff(
            Duration::from_millis(config.reconnect_initial_backoff_ms),
            Duration::from_millis(config.reconnect_max_backoff_ms),
        )
    }

    pub fn propagation_config(self, config: &PropagationConfig) -> Self {
        self.workers(config.workers)
            .queue_capacity(config.queue_capacity)
            .max_upsert_attempts(config.max_upsert_attempts)
    }

    /// Build the context and spawn its propagation workers.
    ///
    /// Must be called within a tokio runtime.
    pub fn build(self) -> SyncContext {
        let clock = match self.instance_id {
            Some(id) => InvalidationClock::with_instance_id(id),
            None => InvalidationClock::new(),
        };
        let shared_cache = self
            .shared_cache
            .unwrap_or_else(|| Arc::new(InMemorySharedCache::new()));
        let store = self
            .store
            .unwrap_or_else(|| Arc::new(InMemoryDocumentStore::new()));
        let (failures, _) = broadcast::channel(FAILURE_CHANNEL_CAPACITY);

        let shared = Arc::new(ContextShared {
            clock,
            registry: ConverterRegistry::new(),
            shared_cache,
            store,
            channel: self.channel,
            stats: StatsRecorder::default(),
            failures,
        });

        let propagator = Propagator::start(
            Arc::clone(&shared),
            self.workers,
            self.queue_capacity,
            self.max_upsert_attempts,
        );

        tracing::info!(
            instance_id = %shared.clock.instance_id(),
            channel = %shared.channel,
            "sync context created"
        );

        SyncContext {
            inner: Arc::new(ContextInner {
                shared,
                propagator,
                subscriber: Mutex::new(None),
                initial_backoff: self.initial_backoff,
                max_backoff: self.max_backoff,
            }),
        }
    }
}
