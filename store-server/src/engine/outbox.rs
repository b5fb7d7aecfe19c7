//! Notify Worker - drains the notification outbox
//!
//! Transitions enqueue their lifecycle event in the same transaction that
//! commits them; this worker delivers the queue asynchronously through the
//! notifier collaborator. Delivery is best-effort: failures are retried
//! with exponential backoff and dead-lettered after the retry budget, and
//! the engine's state is never affected either way.

use std::sync::Arc;
use std::time::Duration;
use tokio::sync::broadcast;
use tokio_util::sync::CancellationToken;

use crate::collaborators::Notifier;

use super::storage::{OutboxEntry, Storage};

/// Worker configuration
const MAX_RETRY_COUNT: u32 = 3;
const RETRY_BASE_DELAY_SECS: u64 = 5;
const RETRY_MAX_DELAY_SECS: u64 = 60;
const QUEUE_SCAN_INTERVAL_SECS: u64 = 30;

/// Worker that delivers pending outbox entries
pub struct NotifyWorker {
    storage: Storage,
    notifier: Arc<dyn Notifier>,
}

impl NotifyWorker {
    pub fn new(storage: Storage, notifier: Arc<dyn Notifier>) -> Self {
        Self { storage, notifier }
    }

    /// Run the worker until shutdown
    ///
    /// Wakes on engine nudges (one per committed event) and on a periodic
    /// scan that picks up retries.
    pub async fn run(self, mut nudge_rx: broadcast::Receiver<u64>, shutdown: CancellationToken) {
        tracing::info!("NotifyWorker started");

        // Give previously dead-lettered events another round of retries
        match self.storage.recover_dead_letters() {
            Ok(0) => {}
            Ok(n) => tracing::info!(count = n, "Recovered dead letter entries to pending queue"),
            Err(e) => tracing::error!(error = %e, "Failed to recover dead letter entries"),
        }

        // Drain anything left over from the previous run
        self.process_pending().await;

        let mut scan_interval =
            tokio::time::interval(Duration::from_secs(QUEUE_SCAN_INTERVAL_SECS));

        loop {
            tokio::select! {
                _ = shutdown.cancelled() => {
                    tracing::info!("NotifyWorker shutting down");
                    break;
                }
                result = nudge_rx.recv() => {
                    match result {
                        Ok(_seq) => self.process_pending().await,
                        Err(broadcast::error::RecvError::Lagged(skipped)) => {
                            tracing::warn!(skipped, "Notify nudges lagged, scanning queue");
                            self.process_pending().await;
                        }
                        Err(broadcast::error::RecvError::Closed) => {
                            tracing::info!("Nudge channel closed, shutting down NotifyWorker");
                            break;
                        }
                    }
                }
                _ = scan_interval.tick() => {
                    self.process_pending().await;
                }
            }
        }
    }

    /// Deliver every pending entry whose backoff has elapsed
    async fn process_pending(&self) {
        let pending = match self.storage.get_pending_outbox() {
            Ok(p) => p,
            Err(e) => {
                tracing::error!(error = %e, "Failed to read pending outbox");
                return;
            }
        };

        for entry in pending {
            if self.should_attempt(&entry) {
                self.deliver_entry(&entry).await;
            }
        }
    }

    /// Check retry budget and exponential backoff
    fn should_attempt(&self, entry: &OutboxEntry) -> bool {
        if entry.retry_count >= MAX_RETRY_COUNT {
            tracing::error!(
                seq = entry.seq,
                event_id = %entry.event.event_id,
                retry_count = entry.retry_count,
                last_error = ?entry.last_error,
                "Max retry count exceeded, moving to dead letter queue"
            );
            let error = entry.last_error.as_deref().unwrap_or("Unknown error");
            let _ = self.storage.move_to_dead_letter(entry.seq, error);
            return false;
        }
        if entry.retry_count == 0 {
            return true;
        }

        // delay = base * 2^retry_count, capped
        let delay_secs =
            (RETRY_BASE_DELAY_SECS * 2u64.pow(entry.retry_count)).min(RETRY_MAX_DELAY_SECS);
        let retry_after_ms = entry.created_at + (delay_secs as i64 * 1000);
        shared::util::now_millis() >= retry_after_ms
    }

    async fn deliver_entry(&self, entry: &OutboxEntry) {
        match self.notifier.deliver(&entry.event).await {
            Ok(()) => {
                if let Err(e) = self.storage.complete_outbox(entry.seq) {
                    tracing::error!(seq = entry.seq, error = %e, "Failed to complete outbox entry");
                }
            }
            Err(e) => {
                tracing::warn!(
                    seq = entry.seq,
                    event_id = %entry.event.event_id,
                    error = %e,
                    "Event delivery failed"
                );
                if let Err(e2) = self.storage.mark_outbox_failed(entry.seq, &e.to_string()) {
                    tracing::error!(seq = entry.seq, error = %e2, "Failed to record delivery failure");
                }
            }
        }
    }
}
