//! Lifecycle events emitted to the notifier collaborator
//!
//! Events are enqueued in the same transaction that commits the transition
//! they describe, then delivered asynchronously and best-effort. Engine
//! correctness never depends on delivery.

use serde::{Deserialize, Serialize};

use crate::util::now_millis;

/// Named lifecycle event types
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum EventType {
    OrderCreated,
    OrderCancelled,
    OrderStatusChanged,
    OrderConfirmed,
    PaymentPendingVerification,
    PaymentDecided,
    RefundRequested,
    RefundDecided,
    RefundSettled,
}

/// Outward-facing lifecycle event
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct LifecycleEvent {
    pub event_id: String,
    pub event_type: EventType,
    pub order_id: String,
    pub customer_ref: String,
    /// Server timestamp in milliseconds
    pub timestamp: i64,
    /// Event-specific detail payload
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<serde_json::Value>,
}

impl LifecycleEvent {
    pub fn new(
        event_type: EventType,
        order_id: impl Into<String>,
        customer_ref: impl Into<String>,
        data: Option<serde_json::Value>,
    ) -> Self {
        Self {
            event_id: uuid::Uuid::new_v4().to_string(),
            event_type,
            order_id: order_id.into(),
            customer_ref: customer_ref.into(),
            timestamp: now_millis(),
            data,
        }
    }
}
