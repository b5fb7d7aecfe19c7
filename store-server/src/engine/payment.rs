//! Receipt Verification Workflow
//!
//! Intake of an uploaded receipt reference and the staff approve/reject
//! decision that resolves `payment_status`. The decision precondition is
//! re-checked inside the same write transaction that performs the
//! transition, so a duplicate concurrent decision is a no-op rather than a
//! second side effect.

use chrono::Utc;
use serde::{Deserialize, Serialize};
use shared::models::{Order, OrderStatus, PaymentStatus};
use shared::{EventType, LifecycleEvent};

use crate::auth::CurrentUser;

use super::error::{EngineError, EngineResult};
use super::orders::OrderEngine;
use super::storage::StorageError;

/// Staff payment decision
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PaymentDecision {
    Approve,
    Reject,
}

impl PaymentDecision {
    /// The payment state this decision drives the order into
    fn target(self) -> PaymentStatus {
        match self {
            PaymentDecision::Approve => PaymentStatus::Paid,
            PaymentDecision::Reject => PaymentStatus::Failed,
        }
    }
}

impl OrderEngine {
    /// Attach an uploaded receipt reference and move the order into
    /// verification
    ///
    /// Valid from `PENDING` (stores the ref and transitions) and from
    /// `PENDING_VERIFICATION` (replaces the ref, no re-transition). The
    /// reference must resolve in the object-storage collaborator.
    pub fn upload_payment_receipt(
        &self,
        user: &CurrentUser,
        order_id: &str,
        receipt_ref: &str,
    ) -> EngineResult<Order> {
        if receipt_ref.trim().is_empty() {
            return Err(EngineError::Validation(
                "receipt reference is required".to_string(),
            ));
        }
        let known = self
            .receipts()
            .exists(receipt_ref)
            .map_err(|e| EngineError::CollaboratorUnavailable(e.to_string()))?;
        if !known {
            return Err(EngineError::Validation(format!(
                "unknown receipt reference: {}",
                receipt_ref
            )));
        }

        let txn = self.storage().begin_write()?;
        let mut order = self.load_order_txn(&txn, order_id)?;
        Self::require_owner(user, &order)?;

        match order.payment_status {
            PaymentStatus::Pending => {
                order.payment_receipt_ref = Some(receipt_ref.to_string());
                order.payment_status = PaymentStatus::PendingVerification;
                order.updated_at = Utc::now();

                self.storage().store_order_txn(&txn, &order)?;
                self.record_transition(
                    &txn,
                    order_id,
                    &user.sub,
                    "payment_status",
                    &PaymentStatus::Pending.to_string(),
                    &order.payment_status.to_string(),
                )?;
                let seq = self.storage().enqueue_outbox_txn(
                    &txn,
                    &LifecycleEvent::new(
                        EventType::PaymentPendingVerification,
                        order_id,
                        &order.customer_ref,
                        None,
                    ),
                )?;
                txn.commit().map_err(StorageError::from)?;
                self.nudge_notifier(seq);

                tracing::info!(order_id = %order_id, "Receipt uploaded, awaiting verification");
                Ok(order)
            }
            PaymentStatus::PendingVerification => {
                // Re-upload replaces the reference without a transition
                order.payment_receipt_ref = Some(receipt_ref.to_string());
                order.updated_at = Utc::now();
                self.storage().store_order_txn(&txn, &order)?;
                txn.commit().map_err(StorageError::from)?;

                tracing::info!(order_id = %order_id, "Receipt reference replaced");
                Ok(order)
            }
            other => Err(EngineError::invalid_transition(
                "payment_status",
                other,
                PaymentStatus::PendingVerification,
            )),
        }
    }

    /// Staff approve/reject of the uploaded receipt
    ///
    /// Approve moves the payment to `PAID` and advances a pending order
    /// into `PROCESSING`. Reject fails the payment, cancels the order
    /// (when it is still cancellable), and releases every reservation. A
    /// repeat call targeting the state already reached returns the order
    /// unchanged.
    pub fn decide_payment(
        &self,
        user: &CurrentUser,
        order_id: &str,
        decision: PaymentDecision,
        comment: &str,
    ) -> EngineResult<Order> {
        Self::require_staff(user)?;
        if comment.trim().is_empty() {
            return Err(EngineError::Validation(
                "a decision comment is required".to_string(),
            ));
        }

        let txn = self.storage().begin_write()?;
        let mut order = self.load_order_txn(&txn, order_id)?;

        let target = decision.target();
        if order.payment_status != PaymentStatus::PendingVerification {
            if order.payment_status == target {
                // Duplicate decision: no additional side effect
                return Ok(order);
            }
            return Err(EngineError::invalid_transition(
                "payment_status",
                order.payment_status,
                target,
            ));
        }

        order.payment_status = target;
        order.payment_comment = Some(comment.to_string());
        self.record_transition(
            &txn,
            order_id,
            &user.sub,
            "payment_status",
            &PaymentStatus::PendingVerification.to_string(),
            &target.to_string(),
        )?;

        match decision {
            PaymentDecision::Approve => {
                if order.status == OrderStatus::Pending {
                    order.status = OrderStatus::Processing;
                    self.record_transition(
                        &txn,
                        order_id,
                        &user.sub,
                        "status",
                        &OrderStatus::Pending.to_string(),
                        &order.status.to_string(),
                    )?;
                }
            }
            PaymentDecision::Reject => {
                // Same compensation as cancel_order; the customer may
                // already have cancelled, in which case the stock was
                // released and the releases below are no-ops.
                if order.status.is_cancellable() {
                    for item in &order.items {
                        self.inventory().release(
                            &txn,
                            &item.product_ref,
                            item.quantity,
                            &item.reservation_id,
                        )?;
                    }
                    let from = order.status;
                    order.status = OrderStatus::Cancelled;
                    order.cancel_reason = Some("payment rejected".to_string());
                    self.record_transition(
                        &txn,
                        order_id,
                        &user.sub,
                        "status",
                        &from.to_string(),
                        &order.status.to_string(),
                    )?;
                }
            }
        }

        order.updated_at = Utc::now();
        self.storage().store_order_txn(&txn, &order)?;
        let seq = self.storage().enqueue_outbox_txn(
            &txn,
            &LifecycleEvent::new(
                EventType::PaymentDecided,
                order_id,
                &order.customer_ref,
                Some(serde_json::json!({
                    "decision": decision,
                    "comment": comment,
                })),
            ),
        )?;
        txn.commit().map_err(StorageError::from)?;
        self.nudge_notifier(seq);

        tracing::info!(
            order_id = %order_id,
            decision = ?decision,
            payment_status = %order.payment_status,
            status = %order.status,
            "Payment decided"
        );
        Ok(order)
    }
}
