//! Notifier collaborator
//!
//! Delivers committed lifecycle events outward. Delivery is best-effort and
//! asynchronous; the engine's correctness never depends on it succeeding.

use async_trait::async_trait;
use shared::LifecycleEvent;
use thiserror::Error;

/// Notification delivery failures
#[derive(Debug, Error)]
pub enum NotifyError {
    #[error("delivery failed: {0}")]
    Delivery(String),
}

/// Outward event delivery
#[async_trait]
pub trait Notifier: Send + Sync {
    async fn deliver(&self, event: &LifecycleEvent) -> Result<(), NotifyError>;
}

/// Notifier that POSTs each event as JSON to a webhook endpoint
pub struct WebhookNotifier {
    client: reqwest::Client,
    endpoint: String,
}

impl WebhookNotifier {
    pub fn new(endpoint: impl Into<String>) -> Self {
        Self {
            client: reqwest::Client::new(),
            endpoint: endpoint.into(),
        }
    }
}

#[async_trait]
impl Notifier for WebhookNotifier {
    async fn deliver(&self, event: &LifecycleEvent) -> Result<(), NotifyError> {
        let response = self
            .client
            .post(&self.endpoint)
            .json(event)
            .send()
            .await
            .map_err(|e| NotifyError::Delivery(e.to_string()))?;

        response
            .error_for_status()
            .map_err(|e| NotifyError::Delivery(e.to_string()))?;

        tracing::debug!(
            event_id = %event.event_id,
            event_type = ?event.event_type,
            "Event delivered to webhook"
        );
        Ok(())
    }
}

/// Notifier that only logs events (default when no webhook is configured)
#[derive(Debug, Default)]
pub struct LogNotifier;

#[async_trait]
impl Notifier for LogNotifier {
    async fn deliver(&self, event: &LifecycleEvent) -> Result<(), NotifyError> {
        tracing::info!(
            event_id = %event.event_id,
            event_type = ?event.event_type,
            order_id = %event.order_id,
            "Lifecycle event"
        );
        Ok(())
    }
}
