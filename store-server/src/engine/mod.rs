//! Order & Fulfillment Consistency Engine
//!
//! The one subsystem where correctness under concurrent access and partial
//! failure actually matters: two shoppers can race for the last unit of
//! stock or the last use of a coupon, and a payment or refund decision must
//! never be applied twice or left half-applied.
//!
//! - **storage**: redb persistence; one write transaction per operation is
//!   the atomic check-and-update primitive
//! - **inventory**: per-product stock counters with idempotent release
//! - **coupons**: per-coupon redemption counters with atomic
//!   validate+consume
//! - **orders**: order creation, fulfillment state machine, cancellation
//! - **payment**: receipt intake and the staff verification decision
//! - **refund**: refund requests and adjudication
//! - **outbox**: transactional event queue drained by the notify worker
//! - **money**: decimal price computation
//!
//! # Architecture
//!
//! ```text
//! Operation → OrderEngine → WriteTransaction ─┬─ counters (stock/coupon)
//!                                             ├─ order record
//!                                             ├─ transition history
//!                                             └─ outbox event
//!                  │ commit
//!                  └─ nudge → NotifyWorker → Notifier (best-effort)
//! ```

pub mod coupons;
pub mod error;
pub mod inventory;
pub mod money;
pub mod orders;
pub mod outbox;
pub mod payment;
pub mod refund;
pub mod storage;

#[cfg(test)]
mod tests;

// Re-exports
pub use coupons::CouponLedger;
pub use error::{CouponError, EngineError, EngineResult};
pub use inventory::InventoryLedger;
pub use money::{PriceBreakdown, PricingConfig};
pub use orders::{CheckoutItem, CheckoutRequest, OrderEngine};
pub use outbox::NotifyWorker;
pub use payment::PaymentDecision;
pub use refund::RefundAction;
pub use storage::{OutboxEntry, Storage, StorageError};
