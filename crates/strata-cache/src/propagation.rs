//! Background write propagation.
//!
//! A fixed pool of workers, each owning a bounded queue. Jobs are routed by
//! routing slot, so writes to one key are applied to the remote tiers in the
//! order they were made locally. A full queue makes the writer wait.

use std::fmt;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};

use parking_lot::{Mutex, RwLock};
use strata_core::{ConversionError, DataKey, ReplicationPolicy, StoreLocation, SyncMessage};
use strata_storage::{FieldUpdate, StorageError, new_document};
use tokio::sync::{Notify, mpsc};
use tokio::task::JoinHandle;

use crate::context::ContextShared;

/// Stage of the write path at which propagation failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FailureStage {
    Encode,
    SharedCache,
    DocumentStore,
    Publish,
}

impl fmt::Display for FailureStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Encode => write!(f, "encode"),
            Self::SharedCache => write!(f, "shared_cache"),
            Self::DocumentStore => write!(f, "document_store"),
            Self::Publish => write!(f, "publish"),
        }
    }
}

/// A write that did not reach one of its remote tiers.
///
/// The local value is never rolled back; this is only a report.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PropagationFailure {
    pub key: String,
    pub slot: u16,
    pub stage: FailureStage,
    pub message: String,
}

pub(crate) type EncodeFn = Box<dyn FnOnce() -> Result<String, ConversionError> + Send>;

/// Records that a local write has left the queue.
///
/// Dropped once its job is processed, or discarded because propagation has
/// stopped, raising the cell's handed-off version to this write's version.
pub(crate) struct WriteAck {
    version: u64,
    handed_off: Arc<AtomicU64>,
}

impl WriteAck {
    pub(crate) fn new(version: u64, handed_off: Arc<AtomicU64>) -> Self {
        Self {
            version,
            handed_off,
        }
    }
}

impl Drop for WriteAck {
    fn drop(&mut self) {
        self.handed_off.fetch_max(self.version, Ordering::AcqRel);
    }
}

pub(crate) struct PropagationJob {
    key: Arc<DataKey>,
    policy: ReplicationPolicy,
    encode: EncodeFn,
    ack: WriteAck,
}

impl PropagationJob {
    pub(crate) fn new(
        key: Arc<DataKey>,
        policy: ReplicationPolicy,
        encode: EncodeFn,
        ack: WriteAck,
    ) -> Self {
        Self {
            key,
            policy,
            encode,
            ack,
        }
    }
}

/// Count of submitted but unfinished jobs.
#[derive(Default)]
struct InFlight {
    pending: AtomicUsize,
    idle: Notify,
}

impl InFlight {
    fn begin(&self) {
        self.pending.fetch_add(1, Ordering::SeqCst);
    }

    fn finish(&self) {
        if self.pending.fetch_sub(1, Ordering::SeqCst) == 1 {
            self.idle.notify_waiters();
        }
    }

    async fn wait_idle(&self) {
        loop {
            let notified = self.idle.notified();
            tokio::pin!(notified);
            notified.as_mut().enable();
            if self.pending.load(Ordering::SeqCst) == 0 {
                return;
            }
            notified.await;
        }
    }
}

pub(crate) struct Propagator {
    senders: RwLock<Option<Vec<mpsc::Sender<PropagationJob>>>>,
    handles: Mutex<Vec<JoinHandle<()>>>,
    in_flight: Arc<InFlight>,
}

impl Propagator {
    /// Spawn the worker pool. Must be called within a tokio runtime.
    pub(crate) fn start(
        shared: Arc<ContextShared>,
        workers: usize,
        queue_capacity: usize,
        max_upsert_attempts: Option<u32>,
    ) -> Self {
        let workers = workers.max(1);
        let in_flight = Arc::new(InFlight::default());
        let mut senders = Vec::with_capacity(workers);
        let mut handles = Vec::with_capacity(workers);

        for id in 0..workers {
            let (tx, rx) = mpsc::channel(queue_capacity.max(1));
            let worker = Worker {
                id,
                shared: Arc::clone(&shared),
                max_upsert_attempts,
                in_flight: Arc::clone(&in_flight),
            };
            senders.push(tx);
            handles.push(tokio::spawn(worker.run(rx)));
        }

        tracing::debug!(workers, queue_capacity, "propagation workers started");

        Self {
            senders: RwLock::new(Some(senders)),
            handles: Mutex::new(handles),
            in_flight,
        }
    }

    /// Queue a job on the worker owning its slot, waiting if that queue is full.
    pub(crate) async fn submit(&self, job: PropagationJob) {
        let sender = {
            let guard = self.senders.read();
            match guard.as_ref() {
                Some(senders) => senders[usize::from(job.key.slot()) % senders.len()].clone(),
                None => {
                    tracing::warn!(key = %job.key, "propagation stopped, write kept local only");
                    return;
                }
            }
        };

        self.in_flight.begin();
        if let Err(err) = sender.send(job).await {
            self.in_flight.finish();
            tracing::warn!(key = %err.0.key, "propagation worker gone, write kept local only");
        }
    }

    pub(crate) fn pending(&self) -> usize {
        self.in_flight.pending.load(Ordering::SeqCst)
    }

    pub(crate) async fn wait_idle(&self) {
        self.in_flight.wait_idle().await;
    }

    /// Stop accepting jobs, drain the queues and wait for the workers.
    pub(crate) async fn shutdown(&self) {
        drop(self.senders.write().take());
        let handles = std::mem::take(&mut *self.handles.lock());
        for handle in handles {
            if let Err(e) = handle.await {
                tracing::error!(error = %e, "propagation worker panicked");
            }
        }
    }
}

struct Worker {
    id: usize,
    shared: Arc<ContextShared>,
    max_upsert_attempts: Option<u32>,
    in_flight: Arc<InFlight>,
}

impl Worker {
    async fn run(self, mut rx: mpsc::Receiver<PropagationJob>) {
        while let Some(job) = rx.recv().await {
            self.process(job).await;
            self.in_flight.finish();
        }
        tracing::debug!(worker = self.id, "propagation worker stopped");
    }

    async fn process(&self, job: PropagationJob) {
        let PropagationJob {
            key,
            policy,
            encode,
            ack: _ack,
        } = job;

        let encoded = match encode() {
            Ok(encoded) => encoded,
            Err(e) => {
                self.report(&key, FailureStage::Encode, e.to_string());
                return;
            }
        };

        let cache = &self.shared.shared_cache;
        let mut failed = false;

        if policy.syncs() {
            let result = if encoded.is_empty() {
                cache.del(key.cache_key()).await
            } else {
                cache.set(key.cache_key(), &encoded).await
            };
            if let Err(e) = result {
                failed = true;
                self.report(&key, FailureStage::SharedCache, e.to_string());
            }
        }

        if policy.persists()
            && let Err(e) = self.upsert(&key, &encoded).await
        {
            failed = true;
            self.report(&key, FailureStage::DocumentStore, e.to_string());
        }

        if policy.syncs() {
            let message = SyncMessage::new(self.shared.clock.instance_id(), key.slot());
            if let Err(e) = cache.publish(&self.shared.channel, &message.encode()).await {
                failed = true;
                self.report(&key, FailureStage::Publish, e.to_string());
            }
        }

        if !failed {
            self.shared.stats.propagated();
            tracing::debug!(
                key = %key,
                policy = %policy,
                deleted = encoded.is_empty(),
                "write propagated"
            );
        }
    }

    /// Find-then-update-or-insert, retried when an insert loses a race.
    async fn upsert(&self, key: &DataKey, encoded: &str) -> Result<(), StorageError> {
        let location = key.location();
        let mut attempts: u32 = 0;
        loop {
            attempts += 1;
            match self.try_upsert(location, encoded).await {
                Err(e) if e.is_duplicate_key() => {
                    if self.max_upsert_attempts.is_some_and(|max| attempts >= max) {
                        return Err(e);
                    }
                    tracing::debug!(key = %key, attempts, "document inserted concurrently, retrying");
                    tokio::task::yield_now().await;
                }
                result => return result,
            }
        }
    }

    async fn try_upsert(&self, location: &StoreLocation, encoded: &str) -> Result<(), StorageError> {
        let store = &self.shared.store;
        let existing = store
            .find_one(&location.collection, &location.document_key)
            .await?;

        if existing.is_some() {
            let update = if encoded.is_empty() {
                FieldUpdate::unset(&location.field_name)
            } else {
                FieldUpdate::set(&location.field_name, encoded)
            };
            return store
                .update_one(&location.collection, &location.document_key, &update)
                .await;
        }

        // Nothing stored, nothing to unset
        if encoded.is_empty() {
            return Ok(());
        }

        store
            .insert_one(
                &location.collection,
                new_document(&location.document_key, &location.field_name, encoded),
            )
            .await
    }

    fn report(&self, key: &DataKey, stage: FailureStage, message: String) {
        tracing::warn!(key = %key, stage = %stage, error = %message, "write propagation failed");
        self.shared.stats.propagation_failure();
        // No receivers is fine
        let _ = self.shared.failures.send(PropagationFailure {
            key: key.cache_key().to_string(),
            slot: key.slot(),
            stage,
            message,
        });
    }
}
