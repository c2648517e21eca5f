use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};

use async_trait::async_trait;
use dashmap::DashMap;
use futures_util::StreamExt;
use strata_storage::{MessageStream, SharedCache, StorageError};
use tokio::sync::broadcast;
use tokio::sync::broadcast::error::RecvError;

/// Per-channel buffer. Slow subscribers lose the oldest messages.
const CHANNEL_CAPACITY: usize = 1024;

/// Number of calls made against a backend, by operation.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CacheCalls {
    pub get: u64,
    pub set: u64,
    pub del: u64,
    pub publish: u64,
    pub subscribe: u64,
}

impl CacheCalls {
    pub fn total(&self) -> u64 {
        self.get + self.set + self.del + self.publish + self.subscribe
    }
}

#[derive(Default)]
struct Counters {
    get: AtomicU64,
    set: AtomicU64,
    del: AtomicU64,
    publish: AtomicU64,
    subscribe: AtomicU64,
}

/// In-process shared cache with pub/sub.
///
/// Several sync contexts sharing one instance behave like several server
/// processes sharing one Redis. Keys live in a `DashMap`, channels are tokio
/// broadcast channels.
pub struct InMemorySharedCache {
    values: DashMap<String, String>,
    channels: DashMap<String, broadcast::Sender<Vec<u8>>>,
    available: AtomicBool,
    counters: Counters,
}

impl InMemorySharedCache {
    pub fn new() -> Self {
        Self {
            values: DashMap::new(),
            channels: DashMap::new(),
            available: AtomicBool::new(true),
            counters: Counters::default(),
        }
    }

    /// Simulate the backend becoming unreachable (or reachable again).
    ///
    /// Going unavailable also drops every live subscription.
    pub fn set_available(&self, available: bool) {
        self.available.store(available, Ordering::SeqCst);
        if !available {
            self.disconnect_subscribers();
        }
    }

    /// End every live subscription stream, as a dropped connection would.
    pub fn disconnect_subscribers(&self) {
        self.channels.clear();
    }

    pub fn subscriber_count(&self, channel: &str) -> usize {
        self.channels
            .get(channel)
            .map(|sender| sender.receiver_count())
            .unwrap_or(0)
    }

    /// Current value of a key, bypassing call accounting.
    pub fn value(&self, key: &str) -> Option<String> {
        self.values.get(key).map(|v| v.value().clone())
    }

    /// Store a value directly, bypassing call accounting.
    pub fn seed(&self, key: impl Into<String>, value: impl Into<String>) {
        self.values.insert(key.into(), value.into());
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn calls(&self) -> CacheCalls {
        CacheCalls {
            get: self.counters.get.load(Ordering::Relaxed),
            set: self.counters.set.load(Ordering::Relaxed),
            del: self.counters.del.load(Ordering::Relaxed),
            publish: self.counters.publish.load(Ordering::Relaxed),
            subscribe: self.counters.subscribe.load(Ordering::Relaxed),
        }
    }

    fn check_available(&self) -> Result<(), StorageError> {
        if self.available.load(Ordering::SeqCst) {
            Ok(())
        } else {
            Err(StorageError::connection_error("in-memory shared cache is unavailable"))
        }
    }
}

impl Default for InMemorySharedCache {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl SharedCache for InMemorySharedCache {
    async fn get(&self, key: &str) -> Result<Option<String>, StorageError> {
        self.counters.get.fetch_add(1, Ordering::Relaxed);
        self.check_available()?;
        Ok(self.value(key))
    }

    async fn set(&self, key: &str, value: &str) -> Result<(), StorageError> {
        self.counters.set.fetch_add(1, Ordering::Relaxed);
        self.check_available()?;
        self.values.insert(key.to_string(), value.to_string());
        Ok(())
    }

    async fn del(&self, key: &str) -> Result<(), StorageError> {
        self.counters.del.fetch_add(1, Ordering::Relaxed);
        self.check_available()?;
        self.values.remove(key);
        Ok(())
    }

    async fn publish(&self, channel: &str, payload: &[u8]) -> Result<(), StorageError> {
        self.counters.publish.fetch_add(1, Ordering::Relaxed);
        self.check_available()?;
        if let Some(sender) = self.channels.get(channel) {
            // No receivers is not an error for pub/sub
            let _ = sender.send(payload.to_vec());
        }
        Ok(())
    }

    async fn subscribe(&self, channel: &str) -> Result<MessageStream, StorageError> {
        self.counters.subscribe.fetch_add(1, Ordering::Relaxed);
        self.check_available()?;

        let receiver = self
            .channels
            .entry(channel.to_string())
            .or_insert_with(|| broadcast::channel(CHANNEL_CAPACITY).0)
            .subscribe();

        // A lagged receiver has lost messages; ending the stream makes the
        // subscriber resubscribe.
        let channel = channel.to_string();
        let stream = futures_util::stream::unfold(receiver, move |mut receiver| {
            let channel = channel.clone();
            async move {
                match receiver.recv().await {
                    Ok(payload) => Some((payload, receiver)),
                    Err(RecvError::Lagged(skipped)) => {
                        tracing::warn!(
                            channel = %channel,
                            skipped,
                            "in-memory subscriber lagged, ending subscription"
                        );
                        None
                    }
                    Err(RecvError::Closed) => None,
                }
            }
        });

        Ok(stream.boxed())
    }
}
