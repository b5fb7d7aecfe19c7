//! Order model
//!
//! The Order entity and its three independent state machines. Each machine
//! validates transitions against a central adjacency table; callers never
//! compare status strings ad hoc.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

// ============================================================================
// Order Status
// ============================================================================

/// Fulfillment status
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum OrderStatus {
    #[default]
    Pending,
    Processing,
    Shipped,
    Delivered,
    Cancelled,
}

impl OrderStatus {
    /// Central adjacency table for fulfillment transitions
    pub fn can_transition_to(self, next: OrderStatus) -> bool {
        use OrderStatus::*;
        matches!(
            (self, next),
            (Pending, Processing)
                | (Pending, Cancelled)
                | (Processing, Shipped)
                | (Processing, Cancelled)
                | (Shipped, Delivered)
        )
    }

    /// Terminal states permit no further fulfillment transition
    pub fn is_terminal(self) -> bool {
        matches!(self, OrderStatus::Delivered | OrderStatus::Cancelled)
    }

    /// The order still holds stock reservations in this state
    pub fn is_cancellable(self) -> bool {
        matches!(self, OrderStatus::Pending | OrderStatus::Processing)
    }
}

impl std::fmt::Display for OrderStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            OrderStatus::Pending => "PENDING",
            OrderStatus::Processing => "PROCESSING",
            OrderStatus::Shipped => "SHIPPED",
            OrderStatus::Delivered => "DELIVERED",
            OrderStatus::Cancelled => "CANCELLED",
        };
        write!(f, "{}", s)
    }
}

// ============================================================================
// Payment Status
// ============================================================================

/// Payment verification status
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PaymentStatus {
    #[default]
    Pending,
    PendingVerification,
    Paid,
    Failed,
}

impl PaymentStatus {
    /// Central adjacency table for payment transitions
    pub fn can_transition_to(self, next: PaymentStatus) -> bool {
        use PaymentStatus::*;
        matches!(
            (self, next),
            (Pending, PendingVerification)
                | (PendingVerification, Paid)
                | (PendingVerification, Failed)
        )
    }

    pub fn is_terminal(self) -> bool {
        matches!(self, PaymentStatus::Paid | PaymentStatus::Failed)
    }
}

impl std::fmt::Display for PaymentStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            PaymentStatus::Pending => "PENDING",
            PaymentStatus::PendingVerification => "PENDING_VERIFICATION",
            PaymentStatus::Paid => "PAID",
            PaymentStatus::Failed => "FAILED",
        };
        write!(f, "{}", s)
    }
}

// ============================================================================
// Refund Status
// ============================================================================

/// Refund adjudication status
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RefundStatus {
    Requested,
    Approved,
    Rejected,
    Processed,
}

impl RefundStatus {
    /// Central adjacency table for refund transitions
    pub fn can_transition_to(self, next: RefundStatus) -> bool {
        use RefundStatus::*;
        matches!(
            (self, next),
            (Requested, Approved) | (Requested, Rejected) | (Approved, Processed)
        )
    }

    pub fn is_terminal(self) -> bool {
        matches!(self, RefundStatus::Rejected | RefundStatus::Processed)
    }
}

impl std::fmt::Display for RefundStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            RefundStatus::Requested => "REQUESTED",
            RefundStatus::Approved => "APPROVED",
            RefundStatus::Rejected => "REJECTED",
            RefundStatus::Processed => "PROCESSED",
        };
        write!(f, "{}", s)
    }
}

// ============================================================================
// Value objects
// ============================================================================

/// Shipping address snapshot
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ShippingAddress {
    pub name: String,
    pub phone: String,
    pub street: String,
    pub city: String,
    pub state: String,
    pub pincode: String,
    pub country: String,
}

/// Order line item
///
/// Name and price are snapshots taken at order time and never re-read
/// from the catalog.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct OrderItem {
    /// Product reference (opaque catalog ID)
    pub product_ref: String,
    /// Product name snapshot
    pub name: String,
    /// Unit price snapshot in currency unit
    pub unit_price: f64,
    pub quantity: u32,
    /// Idempotency key for releasing this item's stock reservation
    pub reservation_id: String,
}

/// Refund sub-record; absence means a refund was never requested
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct RefundRecord {
    pub status: RefundStatus,
    pub reason: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub comment: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub admin_comment: Option<String>,
    pub requested_at: DateTime<Utc>,
}

// ============================================================================
// Order entity
// ============================================================================

/// Order entity
///
/// Created once, never deleted. Mutated in place by the lifecycle, receipt
/// verification, and refund workflows until it reaches a terminal
/// status/refund combination. All price fields are server-computed.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Order {
    pub id: String,
    /// Human-readable order number (date + daily counter)
    pub order_number: String,
    /// Opaque external identity of the buyer
    pub customer_ref: String,
    pub items: Vec<OrderItem>,
    /// Sum of discounted line totals in currency unit
    pub items_price: f64,
    pub tax_price: f64,
    pub shipping_price: f64,
    /// Always items_price + tax_price + shipping_price
    pub total_price: f64,
    pub status: OrderStatus,
    pub payment_status: PaymentStatus,
    pub payment_method: String,
    /// Opaque handle into the object-storage collaborator
    #[serde(skip_serializing_if = "Option::is_none")]
    pub payment_receipt_ref: Option<String>,
    /// Staff comment recorded with the payment decision
    #[serde(skip_serializing_if = "Option::is_none")]
    pub payment_comment: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub coupon_code: Option<String>,
    /// Discount percentage snapshot of the consumed coupon
    #[serde(skip_serializing_if = "Option::is_none")]
    pub discount_percent: Option<f64>,
    pub shipping_address: ShippingAddress,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub refund: Option<RefundRecord>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cancel_reason: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cancel_comment: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    /// Customer acknowledgment after delivery
    #[serde(skip_serializing_if = "Option::is_none")]
    pub confirmed_at: Option<DateTime<Utc>>,
}

impl Order {
    /// Whether `customer_ref` owns this order
    pub fn is_owned_by(&self, customer_ref: &str) -> bool {
        self.customer_ref == customer_ref
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_order_status_adjacency() {
        use OrderStatus::*;
        assert!(Pending.can_transition_to(Processing));
        assert!(Pending.can_transition_to(Cancelled));
        assert!(Processing.can_transition_to(Shipped));
        assert!(Processing.can_transition_to(Cancelled));
        assert!(Shipped.can_transition_to(Delivered));

        // No skips, no backward moves, no exits from terminal states
        assert!(!Pending.can_transition_to(Shipped));
        assert!(!Pending.can_transition_to(Delivered));
        assert!(!Shipped.can_transition_to(Cancelled));
        assert!(!Delivered.can_transition_to(Cancelled));
        assert!(!Cancelled.can_transition_to(Pending));
        assert!(!Delivered.can_transition_to(Pending));
    }

    #[test]
    fn test_payment_status_adjacency() {
        use PaymentStatus::*;
        assert!(Pending.can_transition_to(PendingVerification));
        assert!(PendingVerification.can_transition_to(Paid));
        assert!(PendingVerification.can_transition_to(Failed));

        assert!(!Pending.can_transition_to(Paid));
        assert!(!Paid.can_transition_to(Failed));
        assert!(!Failed.can_transition_to(PendingVerification));
    }

    #[test]
    fn test_refund_status_adjacency() {
        use RefundStatus::*;
        assert!(Requested.can_transition_to(Approved));
        assert!(Requested.can_transition_to(Rejected));
        assert!(Approved.can_transition_to(Processed));

        assert!(!Requested.can_transition_to(Processed));
        assert!(!Rejected.can_transition_to(Approved));
        assert!(!Processed.can_transition_to(Requested));
        assert!(Rejected.is_terminal());
        assert!(Processed.is_terminal());
    }

    #[test]
    fn test_terminal_states() {
        assert!(OrderStatus::Delivered.is_terminal());
        assert!(OrderStatus::Cancelled.is_terminal());
        assert!(!OrderStatus::Pending.is_terminal());
        assert!(PaymentStatus::Paid.is_terminal());
        assert!(!PaymentStatus::PendingVerification.is_terminal());
    }

    #[test]
    fn test_status_serialization_format() {
        let json = serde_json::to_string(&PaymentStatus::PendingVerification).unwrap();
        assert_eq!(json, "\"PENDING_VERIFICATION\"");
        let back: PaymentStatus = serde_json::from_str(&json).unwrap();
        assert_eq!(back, PaymentStatus::PendingVerification);
    }
}
