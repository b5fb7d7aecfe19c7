//! Refund Adjudication Workflow
//!
//! Customer-initiated refund requests and the staff decisions that resolve
//! them. Refunds apply to captured money on an order that will not be
//! fulfilled: `payment_status = PAID` and `status = CANCELLED`.

use chrono::Utc;
use serde::{Deserialize, Serialize};
use shared::models::{Order, OrderStatus, PaymentStatus, RefundRecord, RefundStatus};
use shared::{EventType, LifecycleEvent};

use crate::auth::CurrentUser;

use super::error::{EngineError, EngineResult};
use super::orders::OrderEngine;
use super::storage::StorageError;

/// Staff refund decision
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RefundAction {
    Approve,
    Reject,
}

impl RefundAction {
    fn target(self) -> RefundStatus {
        match self {
            RefundAction::Approve => RefundStatus::Approved,
            RefundAction::Reject => RefundStatus::Rejected,
        }
    }
}

impl OrderEngine {
    /// Customer requests a refund on a paid, cancelled order
    pub fn request_refund(
        &self,
        user: &CurrentUser,
        order_id: &str,
        reason: &str,
        comment: Option<String>,
    ) -> EngineResult<Order> {
        if reason.trim().is_empty() {
            return Err(EngineError::Validation(
                "refund reason is required".to_string(),
            ));
        }

        let txn = self.storage().begin_write()?;
        let mut order = self.load_order_txn(&txn, order_id)?;
        Self::require_owner(user, &order)?;

        if let Some(refund) = &order.refund {
            return Err(EngineError::invalid_transition(
                "refund_status",
                refund.status,
                RefundStatus::Requested,
            ));
        }
        if !(order.payment_status == PaymentStatus::Paid
            && order.status == OrderStatus::Cancelled)
        {
            // Report the actual combined state the precondition saw
            return Err(EngineError::invalid_transition(
                "refund_status",
                format!("{}+{}", order.status, order.payment_status),
                RefundStatus::Requested,
            ));
        }

        order.refund = Some(RefundRecord {
            status: RefundStatus::Requested,
            reason: reason.to_string(),
            comment,
            admin_comment: None,
            requested_at: Utc::now(),
        });
        order.updated_at = Utc::now();

        self.storage().store_order_txn(&txn, &order)?;
        self.record_transition(
            &txn,
            order_id,
            &user.sub,
            "refund_status",
            "NONE",
            &RefundStatus::Requested.to_string(),
        )?;
        let seq = self.storage().enqueue_outbox_txn(
            &txn,
            &LifecycleEvent::new(
                EventType::RefundRequested,
                order_id,
                &order.customer_ref,
                Some(serde_json::json!({ "reason": reason })),
            ),
        )?;
        txn.commit().map_err(StorageError::from)?;
        self.nudge_notifier(seq);

        tracing::info!(order_id = %order_id, reason = %reason, "Refund requested");
        Ok(order)
    }

    /// Staff approve/reject of a requested refund; the comment is
    /// mandatory for both outcomes
    ///
    /// A repeat call targeting the state already reached returns the order
    /// unchanged.
    pub fn process_refund(
        &self,
        user: &CurrentUser,
        order_id: &str,
        action: RefundAction,
        admin_comment: &str,
    ) -> EngineResult<Order> {
        Self::require_staff(user)?;
        if admin_comment.trim().is_empty() {
            return Err(EngineError::Validation(
                "an admin comment is required".to_string(),
            ));
        }

        let txn = self.storage().begin_write()?;
        let mut order = self.load_order_txn(&txn, order_id)?;

        let target = action.target();
        let mut refund = match &order.refund {
            Some(refund) => refund.clone(),
            None => {
                return Err(EngineError::invalid_transition(
                    "refund_status",
                    "NONE",
                    target,
                ));
            }
        };

        if refund.status != RefundStatus::Requested {
            if refund.status == target {
                // Duplicate decision: no additional side effect
                return Ok(order);
            }
            return Err(EngineError::invalid_transition(
                "refund_status",
                refund.status,
                target,
            ));
        }

        refund.status = target;
        refund.admin_comment = Some(admin_comment.to_string());
        order.refund = Some(refund);
        order.updated_at = Utc::now();

        self.storage().store_order_txn(&txn, &order)?;
        self.record_transition(
            &txn,
            order_id,
            &user.sub,
            "refund_status",
            &RefundStatus::Requested.to_string(),
            &target.to_string(),
        )?;
        let seq = self.storage().enqueue_outbox_txn(
            &txn,
            &LifecycleEvent::new(
                EventType::RefundDecided,
                order_id,
                &order.customer_ref,
                Some(serde_json::json!({
                    "action": action,
                    "admin_comment": admin_comment,
                })),
            ),
        )?;
        txn.commit().map_err(StorageError::from)?;
        self.nudge_notifier(seq);

        tracing::info!(order_id = %order_id, action = ?action, "Refund decided");
        Ok(order)
    }

    /// Record that external settlement of an approved refund completed
    pub fn mark_refund_processed(
        &self,
        user: &CurrentUser,
        order_id: &str,
    ) -> EngineResult<Order> {
        Self::require_staff(user)?;

        let txn = self.storage().begin_write()?;
        let mut order = self.load_order_txn(&txn, order_id)?;

        let mut refund = match &order.refund {
            Some(refund) => refund.clone(),
            None => {
                return Err(EngineError::invalid_transition(
                    "refund_status",
                    "NONE",
                    RefundStatus::Processed,
                ));
            }
        };

        if refund.status == RefundStatus::Processed {
            // Settlement retry: already recorded
            return Ok(order);
        }
        if refund.status != RefundStatus::Approved {
            return Err(EngineError::invalid_transition(
                "refund_status",
                refund.status,
                RefundStatus::Processed,
            ));
        }

        refund.status = RefundStatus::Processed;
        order.refund = Some(refund);
        order.updated_at = Utc::now();

        self.storage().store_order_txn(&txn, &order)?;
        self.record_transition(
            &txn,
            order_id,
            &user.sub,
            "refund_status",
            &RefundStatus::Approved.to_string(),
            &RefundStatus::Processed.to_string(),
        )?;
        let seq = self.storage().enqueue_outbox_txn(
            &txn,
            &LifecycleEvent::new(
                EventType::RefundSettled,
                order_id,
                &order.customer_ref,
                None,
            ),
        )?;
        txn.commit().map_err(StorageError::from)?;
        self.nudge_notifier(seq);

        tracing::info!(order_id = %order_id, "Refund settled");
        Ok(order)
    }
}
