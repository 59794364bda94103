//! Notifier - alert and heartbeat delivery with bounded retry
//!
//! The transport ([`Notifier`]) makes exactly one delivery attempt per call;
//! retry policy lives in the dispatcher so every transport gets the same
//! backoff behavior. Alerts and heartbeats run through separate queues with
//! their own worker task each: a burst of slow alert sends never starves
//! liveness reporting, and neither path blocks the scan tick.

pub mod format;
pub mod telegram;

pub use telegram::TelegramNotifier;

use crate::retry::RetryPolicy;
use crate::types::{MessagePriority, NotificationMessage};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

/// Delivery failure taxonomy. Transient variants are retried by the
/// dispatcher; permanent ones (bad credential, malformed destination) are
/// surfaced immediately without retry.
#[derive(Debug, Error)]
pub enum SendError {
    #[error("send timed out after {0:?}")]
    Timeout(Duration),
    #[error("transport error: {0}")]
    Transport(String),
    #[error("rate limited by messaging endpoint")]
    RateLimited,
    #[error("messaging endpoint error (HTTP {0})")]
    ServerError(u16),
    /// Permanent rejection - invalid destination or revoked credential
    #[error("rejected by messaging endpoint: {0}")]
    Rejected(String),
}

impl SendError {
    pub fn is_transient(&self) -> bool {
        !matches!(self, SendError::Rejected(_))
    }
}

/// Successful delivery receipt.
#[derive(Debug, Clone, Copy)]
pub struct Ack {
    pub delivered_at: DateTime<Utc>,
}

/// Narrow messaging contract: one attempt, one message. Providers (Telegram
/// here) implement this; nothing upstream depends on the provider's API shape.
#[async_trait]
pub trait Notifier: Send + Sync {
    async fn send(&self, message: &NotificationMessage) -> Result<Ack, SendError>;
}

/// Queued delivery service wrapping a [`Notifier`] transport.
///
/// Dropping/shutting down the service closes the queues; workers drain what
/// is already enqueued and exit.
pub struct NotifyService {
    alert_tx: mpsc::Sender<NotificationMessage>,
    heartbeat_tx: mpsc::Sender<NotificationMessage>,
    workers: Vec<JoinHandle<()>>,
    delivered: Arc<AtomicU64>,
    permanent_failures: Arc<AtomicU64>,
}

impl NotifyService {
    pub fn spawn(notifier: Arc<dyn Notifier>, retry: RetryPolicy, queue_depth: usize) -> Self {
        let (alert_tx, alert_rx) = mpsc::channel(queue_depth);
        let (heartbeat_tx, heartbeat_rx) = mpsc::channel(queue_depth);
        let delivered = Arc::new(AtomicU64::new(0));
        let permanent_failures = Arc::new(AtomicU64::new(0));

        let workers = vec![
            spawn_worker(
                "alert",
                alert_rx,
                Arc::clone(&notifier),
                retry.clone(),
                Arc::clone(&delivered),
                Arc::clone(&permanent_failures),
            ),
            spawn_worker(
                "heartbeat",
                heartbeat_rx,
                notifier,
                retry,
                Arc::clone(&delivered),
                Arc::clone(&permanent_failures),
            ),
        ];

        Self {
            alert_tx,
            heartbeat_tx,
            workers,
            delivered,
            permanent_failures,
        }
    }

    /// Enqueue a message on the queue matching its priority. Returns false if
    /// the service is shutting down and the message could not be enqueued.
    pub async fn dispatch(&self, message: NotificationMessage) -> bool {
        let tx = match message.priority {
            MessagePriority::Heartbeat => &self.heartbeat_tx,
            MessagePriority::Alert | MessagePriority::Error => &self.alert_tx,
        };
        match tx.send(message).await {
            Ok(()) => true,
            Err(_) => {
                warn!(component = "notifier", "dispatch after shutdown - message dropped");
                false
            }
        }
    }

    pub fn delivered_count(&self) -> u64 {
        self.delivered.load(Ordering::Relaxed)
    }

    /// Permanent delivery failures observed so far. A nonzero value is the
    /// diagnostic signal an external monitor watches for (credentials or
    /// destination need attention).
    pub fn permanent_failure_count(&self) -> u64 {
        self.permanent_failures.load(Ordering::Relaxed)
    }

    /// Close the queues and give in-flight sends a bounded grace period.
    pub async fn shutdown(self, grace: Duration) {
        drop(self.alert_tx);
        drop(self.heartbeat_tx);
        for worker in self.workers {
            if tokio::time::timeout(grace, worker).await.is_err() {
                warn!(component = "notifier", "worker did not drain within grace period");
            }
        }
        info!(
            component = "notifier",
            delivered = self.delivered.load(Ordering::Relaxed),
            "notification queues drained"
        );
    }
}

fn spawn_worker(
    queue: &'static str,
    mut rx: mpsc::Receiver<NotificationMessage>,
    notifier: Arc<dyn Notifier>,
    retry: RetryPolicy,
    delivered: Arc<AtomicU64>,
    permanent_failures: Arc<AtomicU64>,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        while let Some(message) = rx.recv().await {
            let outcome = retry
                .run(
                    "notifier send",
                    || notifier.send(&message),
                    SendError::is_transient,
                )
                .await;
            match outcome {
                Ok(ack) => {
                    delivered.fetch_add(1, Ordering::Relaxed);
                    debug!(component = "notifier", queue, delivered_at = %ack.delivered_at, "message delivered");
                }
                Err(e) if e.is_transient() => {
                    // Retries exhausted - log and move on; the scan loop keeps running
                    error!(
                        component = "notifier",
                        queue,
                        attempts = retry.max_attempts,
                        error = %e,
                        "delivery failed after retries - message dropped"
                    );
                }
                Err(e) => {
                    permanent_failures.fetch_add(1, Ordering::Relaxed);
                    error!(
                        component = "notifier",
                        queue,
                        error = %e,
                        "permanent delivery failure - check credential/destination"
                    );
                }
            }
        }
    })
}
