//! Sync channel listener.
//!
//! Every foreign sync message advances the invalidation clock for its slot,
//! forcing the next read of any key in that slot to refetch. Messages sent by
//! this instance are ignored.

use std::sync::Arc;
use std::time::Duration;

use futures_util::StreamExt;
use strata_core::SyncMessage;
use tokio::sync::oneshot;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use crate::context::ContextShared;

pub(crate) struct SubscriberHandle {
    cancel: CancellationToken,
    task: JoinHandle<()>,
}

impl SubscriberHandle {
    pub(crate) fn is_finished(&self) -> bool {
        self.task.is_finished()
    }

    pub(crate) async fn stop(self) {
        self.cancel.cancel();
        if let Err(e) = self.task.await {
            tracing::error!(error = %e, "sync subscriber panicked");
        }
    }
}

pub(crate) struct SyncSubscriber {
    shared: Arc<ContextShared>,
    initial_backoff: Duration,
    max_backoff: Duration,
    cancel: CancellationToken,
}

impl SyncSubscriber {
    pub(crate) fn new(
        shared: Arc<ContextShared>,
        initial_backoff: Duration,
        max_backoff: Duration,
    ) -> Self {
        Self {
            shared,
            initial_backoff,
            max_backoff,
            cancel: CancellationToken::new(),
        }
    }

    /// Spawn the listener. The receiver resolves after the first
    /// subscription attempt with whether it succeeded.
    pub(crate) fn spawn(self) -> (SubscriberHandle, oneshot::Receiver<bool>) {
        let (ready_tx, ready_rx) = oneshot::channel();
        let cancel = self.cancel.clone();
        let task = tokio::spawn(self.run(ready_tx));
        (SubscriberHandle { cancel, task }, ready_rx)
    }

    async fn run(self, ready: oneshot::Sender<bool>) {
        let channel = self.shared.channel.as_str();
        let mut ready = Some(ready);
        let mut backoff = self.initial_backoff;

        loop {
            let subscribed = tokio::select! {
                _ = self.cancel.cancelled() => break,
                result = self.shared.shared_cache.subscribe(channel) => result,
            };

            match subscribed {
                Ok(mut stream) => {
                    tracing::info!(channel, "subscribed to sync channel");
                    if let Some(tx) = ready.take() {
                        let _ = tx.send(true);
                    }
                    backoff = self.initial_backoff;

                    loop {
                        tokio::select! {
                            _ = self.cancel.cancelled() => return,
                            message = stream.next() => match message {
                                Some(payload) => self.handle_message(&payload),
                                None => {
                                    tracing::warn!(channel, "sync subscription lost, reconnecting");
                                    break;
                                }
                            },
                        }
                    }
                }
                Err(e) => {
                    tracing::error!(
                        channel,
                        error = %e,
                        backoff_ms = backoff.as_millis() as u64,
                        "sync subscriber error, reconnecting"
                    );
                    if let Some(tx) = ready.take() {
                        let _ = tx.send(false);
                    }
                }
            }

            tokio::select! {
                _ = self.cancel.cancelled() => break,
                _ = tokio::time::sleep(backoff) => {}
            }
            backoff = (backoff * 2).min(self.max_backoff);
        }

        tracing::debug!(channel, "sync subscriber stopped");
    }

    fn handle_message(&self, payload: &[u8]) {
        apply_sync_message(&self.shared, payload);
    }
}

/// Apply one raw sync message to the clock.
pub(crate) fn apply_sync_message(shared: &ContextShared, payload: &[u8]) {
    let message = match SyncMessage::decode(payload) {
        Ok(message) => message,
        Err(e) => {
            tracing::warn!(error = %e, len = payload.len(), "discarding malformed sync message");
            return;
        }
    };

    if message.sender == shared.clock.instance_id() {
        shared.stats.self_echo();
        tracing::trace!(slot = message.slot, "ignoring own sync message");
        return;
    }

    shared.clock.invalidate(message.slot);
    shared.stats.invalidation();
    tracing::trace!(slot = message.slot, sender = %message.sender, "slot invalidated by peer");
}
