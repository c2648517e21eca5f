//! The tiered read/write algorithm shared by every cache object.

use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use parking_lot::RwLock;
use strata_core::{DataKey, ReplicationPolicy, SharedConverter, refresh_stamp};
use strata_storage::field_value;

use crate::context::SyncContext;
use crate::propagation::{PropagationJob, WriteAck};

/// Values a cache cell can hold.
///
/// The default value is what a read returns for a key with no value in any
/// tier. An absent value is written as a delete.
pub trait CacheValue: Clone + Default + Send + Sync + 'static {
    fn is_absent(&self) -> bool;
}

impl<V: Clone + Send + Sync + 'static> CacheValue for Option<V> {
    fn is_absent(&self) -> bool {
        self.is_none()
    }
}

impl<V: Clone + Send + Sync + 'static> CacheValue for Vec<V> {
    fn is_absent(&self) -> bool {
        self.is_empty()
    }
}

impl<K, V> CacheValue for HashMap<K, V>
where
    K: Clone + Send + Sync + 'static,
    V: Clone + Send + Sync + 'static,
{
    fn is_absent(&self) -> bool {
        self.is_empty()
    }
}

struct CellState<S> {
    value: Arc<S>,
    /// Millisecond stamp of the last refresh or local write, `0` if never.
    timestamp: i64,
    /// `false` once a lookup or local delete established there is no value.
    exists: bool,
    /// Bumped on every local write.
    version: u64,
}


/// One cached field: local value plus freshness bookkeeping.
///
/// A cell is fresh while its stamp is newer than the last foreign
/// invalidation of its slot, or while one of its own writes is still queued
/// for propagation. A fresh cell answers reads from memory, with the default
/// value when `exists` is false.
pub(crate) struct CacheCell<S> {
    key: Arc<DataKey>,
    policy: ReplicationPolicy,
    converter: SharedConverter<S>,
    context: SyncContext,
    state: RwLock<CellState<S>>,
    /// Highest local write version that has left the propagation queue.
    /// Newer writes stay authoritative even if the slot goes stale.
    handed_off: Arc<AtomicU64>,
    /// Serialises read-modify-write mutations of this cell.
    write_lock: tokio::sync::Mutex<()>,
}

impl<S: CacheValue> CacheCell<S> {
    pub(crate) fn new(
        key: DataKey,
        policy: ReplicationPolicy,
        converter: SharedConverter<S>,
        context: SyncContext,
    ) -> Self {
        Self {
            key: Arc::new(key),
            policy,
            converter,
            context,
            state: RwLock::new(CellState {
                value: Arc::new(S::default()),
                timestamp: 0,
                exists: true,
                version: 0,
            }),
            handed_off: Arc::new(AtomicU64::new(0)),
            write_lock: tokio::sync::Mutex::new(()),
        }
    }

    pub(crate) fn key(&self) -> &DataKey {
        &self.key
    }

    pub(crate) fn policy(&self) -> ReplicationPolicy {
        self.policy
    }

    /// Whether the next read is answered without I/O.
    pub(crate) fn is_fresh(&self) -> bool {
        let state = self.state.read();
        self.answers_locally(&state)
    }

    fn answers_locally(&self, state: &CellState<S>) -> bool {
        self.policy.is_local()
            || state.version > self.handed_off.load(Ordering::Acquire)
            || self.context.clock().is_fresh(self.key.slot(), state.timestamp)
    }

    /// Read through local memory, the shared cache and the document store.
    pub(crate) async fn load(&self) -> Arc<S> {
        let version = {
            let state = self.state.read();
            if self.answers_locally(&state) {
                self.context.shared().stats.local_hit();
                return Arc::clone(&state.value);
            }
            state.version
        };

        // Taken before the I/O so an invalidation racing the fetch wins.
        let stamp = refresh_stamp();
        let fetched = self.fetch().await;

        let mut state = self.state.write();
        if state.version != version {
            // A local write landed while fetching; it is newer.
            return Arc::clone(&state.value);
        }
        match fetched {
            Some(value) => {
                state.value = Arc::new(value);
                state.exists = true;
            }
            None => {
                state.value = Arc::new(S::default());
                state.exists = false;
            }
        }
        state.timestamp = stamp;
        Arc::clone(&state.value)
    }

    /// Replace the value outright.
    pub(crate) async fn replace(&self, value: S) {
        let _guard = self.write_lock.lock().await;
        self.commit(value).await;
    }

    /// Clone the current value (refreshed first if stale), apply `f` and
    /// commit the result when `f` reports a change.
    pub(crate) async fn mutate<R>(&self, f: impl FnOnce(&mut S) -> (R, bool)) -> R {
        let _guard = self.write_lock.lock().await;
        let base = self.load().await;
        let mut next = S::clone(&base);
        let (result, changed) = f(&mut next);
        if changed {
            self.commit(next).await;
        }
        result
    }

    /// Install `value` locally, then hand propagation to the worker pool.
    async fn commit(&self, value: S) {
        let exists = !value.is_absent();
        let value = Arc::new(value);
        let version = {
            let mut state = self.state.write();
            state.value = Arc::clone(&value);
            state.exists = exists;
            state.timestamp = refresh_stamp();
            state.version += 1;
            state.version
        };

        if self.policy.is_local() {
            return;
        }

        let converter = Arc::clone(&self.converter);
        let job = PropagationJob::new(
            Arc::clone(&self.key),
            self.policy,
            Box::new(move || converter.encode(&value)),
            WriteAck::new(version, Arc::clone(&self.handed_off)),
        );
        self.context.propagator().submit(job).await;
    }

    async fn fetch(&self) -> Option<S> {
        let shared = self.context.shared();
        let cache_key = self.key.cache_key();

        match shared.shared_cache.get(cache_key).await {
            Ok(Some(raw)) if !raw.is_empty() => {
                let value = self.decode(&raw)?;
                tracing::debug!(key = %cache_key, "cache hit (shared)");
                shared.stats.shared_hit();
                return Some(value);
            }
            Ok(_) => {}
            Err(e) => {
                tracing::warn!(key = %cache_key, error = %e, "shared cache GET failed");
            }
        }

        if self.policy.persists()
            && let Some(raw) = self.fetch_from_store().await
        {
            let value = self.decode(&raw)?;
            tracing::debug!(key = %cache_key, "cache hit (store)");
            shared.stats.store_hit();
            if let Err(e) = shared.shared_cache.set(cache_key, &raw).await {
                tracing::warn!(key = %cache_key, error = %e, "shared cache write-back failed");
            }
            return Some(value);
        }

        tracing::debug!(key = %cache_key, "cache miss");
        shared.stats.miss();
        None
    }

    async fn fetch_from_store(&self) -> Option<String> {
        let location = self.key.location();
        match self
            .context
            .shared()
            .store
            .find_one(&location.collection, &location.document_key)
            .await
        {
            Ok(Some(document)) => field_value(&document, &location.field_name)
                .filter(|raw| !raw.is_empty())
                .map(str::to_string),
            Ok(None) => None,
            Err(e) => {
                tracing::warn!(key = %self.key, error = %e, "document store lookup failed");
                None
            }
        }
    }

    /// Undecodable data reads as absent.
    fn decode(&self, raw: &str) -> Option<S> {
        match self.converter.decode(raw) {
            Ok(value) => Some(value),
            Err(e) => {
                tracing::warn!(key = %self.key, error = %e, "discarding undecodable cached value");
                self.context.shared().stats.decode_failure();
                None
            }
        }
    }
}
