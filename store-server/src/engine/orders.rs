//! Order Lifecycle Manager
//!
//! Owns the Order entity: creation against finite stock and limited-use
//! coupons, the fulfillment state machine, cancellation, and queries.
//!
//! # Operation Flow
//!
//! ```text
//! create_order(actor, request)
//!     ├─ 1. Re-price every item from the catalog collaborator
//!     ├─ 2. Begin write transaction
//!     ├─ 3. Reserve stock per item (abort = all reservations undone)
//!     ├─ 4. Validate + consume coupon slot in the same transaction
//!     ├─ 5. Compute totals, assign order number
//!     ├─ 6. Persist order + transition record + outbox event
//!     ├─ 7. Commit
//!     └─ 8. Nudge the notify worker
//! ```
//!
//! Every mutation re-checks its precondition inside the write transaction
//! that applies it, so concurrent calls targeting the same transition
//! resolve to exactly one winner; a retry aimed at a state the order has
//! already reached is a no-op rather than a destructive error.

use chrono::Utc;
use redb::WriteTransaction;
use serde::Deserialize;
use shared::models::transition::GENESIS_HASH;
use shared::models::{
    Coupon, Order, OrderItem, OrderStatus, PaymentStatus, ShippingAddress, TransitionRecord,
};
use shared::{EventType, LifecycleEvent};
use std::sync::Arc;
use tokio::sync::broadcast;

use crate::auth::CurrentUser;
use crate::collaborators::{Catalog, ReceiptStore};

use super::coupons::CouponLedger;
use super::error::{EngineError, EngineResult};
use super::inventory::InventoryLedger;
use super::money::{self, PricedLine, PricingConfig};
use super::storage::{Storage, StorageError};

/// Outbox nudge channel capacity
const OUTBOX_CHANNEL_CAPACITY: usize = 1024;

/// One checkout line as submitted by the customer
///
/// Quantities only; prices always come from the catalog.
#[derive(Debug, Clone, Deserialize)]
pub struct CheckoutItem {
    pub product_ref: String,
    pub quantity: u32,
}

/// Checkout input
#[derive(Debug, Clone, Deserialize)]
pub struct CheckoutRequest {
    pub items: Vec<CheckoutItem>,
    pub shipping_address: ShippingAddress,
    pub payment_method: String,
    #[serde(default)]
    pub coupon_code: Option<String>,
}

/// The consistency engine
///
/// Composes the inventory ledger, the coupon ledger, and the collaborator
/// boundaries around a single redb store. Cheap to clone; all operations
/// are request-scoped and safe to issue from any number of workers.
#[derive(Clone)]
pub struct OrderEngine {
    storage: Storage,
    inventory: InventoryLedger,
    coupons: CouponLedger,
    catalog: Arc<dyn Catalog>,
    receipts: Arc<dyn ReceiptStore>,
    pricing: PricingConfig,
    outbox_tx: broadcast::Sender<u64>,
}

impl std::fmt::Debug for OrderEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OrderEngine")
            .field("pricing", &self.pricing)
            .finish_non_exhaustive()
    }
}

impl OrderEngine {
    pub fn new(
        storage: Storage,
        catalog: Arc<dyn Catalog>,
        receipts: Arc<dyn ReceiptStore>,
        pricing: PricingConfig,
    ) -> Self {
        let (outbox_tx, _) = broadcast::channel(OUTBOX_CHANNEL_CAPACITY);
        Self {
            inventory: InventoryLedger::new(storage.clone()),
            coupons: CouponLedger::new(storage.clone()),
            storage,
            catalog,
            receipts,
            pricing,
            outbox_tx,
        }
    }

    /// The underlying storage
    pub fn storage(&self) -> &Storage {
        &self.storage
    }

    /// The inventory ledger
    pub fn inventory(&self) -> &InventoryLedger {
        &self.inventory
    }

    /// The coupon ledger
    pub fn coupons(&self) -> &CouponLedger {
        &self.coupons
    }

    /// The receipt-store collaborator
    pub(super) fn receipts(&self) -> &Arc<dyn ReceiptStore> {
        &self.receipts
    }

    /// Subscribe to outbox nudges (sequence of each newly enqueued event)
    pub fn subscribe_outbox(&self) -> broadcast::Receiver<u64> {
        self.outbox_tx.subscribe()
    }

    /// Wake the notify worker after a commit
    pub(super) fn nudge_notifier(&self, seq: u64) {
        let _ = self.outbox_tx.send(seq);
    }

    // ========== Shared helpers ==========

    pub(super) fn require_staff(user: &CurrentUser) -> EngineResult<()> {
        if user.is_staff() {
            Ok(())
        } else {
            Err(EngineError::Forbidden("staff role required".to_string()))
        }
    }

    pub(super) fn authorize_owner_or_staff(
        user: &CurrentUser,
        order: &Order,
    ) -> EngineResult<()> {
        if user.is_staff() || order.is_owned_by(&user.sub) {
            Ok(())
        } else {
            Err(EngineError::Forbidden(format!(
                "order {} belongs to another customer",
                order.id
            )))
        }
    }

    pub(super) fn require_owner(user: &CurrentUser, order: &Order) -> EngineResult<()> {
        if order.is_owned_by(&user.sub) {
            Ok(())
        } else {
            Err(EngineError::Forbidden(format!(
                "order {} belongs to another customer",
                order.id
            )))
        }
    }

    pub(super) fn load_order_txn(
        &self,
        txn: &WriteTransaction,
        order_id: &str,
    ) -> EngineResult<Order> {
        self.storage
            .get_order_txn(txn, order_id)?
            .ok_or_else(|| EngineError::OrderNotFound(order_id.to_string()))
    }

    /// Append a hash-chained transition record for this order
    pub(super) fn record_transition(
        &self,
        txn: &WriteTransaction,
        order_id: &str,
        actor: &str,
        field: &'static str,
        from_state: &str,
        to_state: &str,
    ) -> EngineResult<()> {
        let (seq, prev_hash) = match self.storage.last_history_txn(txn, order_id)? {
            Some(last) => (last.seq + 1, last.curr_hash),
            None => (1, GENESIS_HASH.to_string()),
        };
        let record = TransitionRecord::new(
            seq,
            order_id,
            shared::util::now_millis(),
            actor,
            field,
            from_state,
            to_state,
            prev_hash,
        );
        self.storage.append_history_txn(txn, &record)?;
        Ok(())
    }

    fn order_number(count: u64) -> String {
        let date = Utc::now().format("%Y%m%d");
        format!("SF{}{}", date, 10000 + count)
    }

    fn validate_checkout(req: &CheckoutRequest) -> EngineResult<()> {
        if req.items.is_empty() {
            return Err(EngineError::Validation("order has no items".to_string()));
        }
        if req.payment_method.trim().is_empty() {
            return Err(EngineError::Validation(
                "payment method is required".to_string(),
            ));
        }
        let addr = &req.shipping_address;
        for (field, value) in [
            ("name", &addr.name),
            ("phone", &addr.phone),
            ("street", &addr.street),
            ("city", &addr.city),
            ("pincode", &addr.pincode),
            ("country", &addr.country),
        ] {
            if value.trim().is_empty() {
                return Err(EngineError::Validation(format!(
                    "shipping address field '{}' is required",
                    field
                )));
            }
        }
        Ok(())
    }

    // ========== Checkout ==========

    /// Create an order: re-price, reserve stock, consume the coupon slot,
    /// and persist, all-or-nothing
    ///
    /// The entire mutation runs in one write transaction; any failure
    /// (out-of-stock item, coupon rejection, storage error) aborts it, so
    /// no partially-reserved, unpersisted state is ever observable.
    pub fn create_order(&self, user: &CurrentUser, req: CheckoutRequest) -> EngineResult<Order> {
        Self::validate_checkout(&req)?;

        // Re-price every item from the catalog; unknown and inactive
        // products are rejected before anything is reserved.
        let mut products = Vec::with_capacity(req.items.len());
        for item in &req.items {
            let product = self
                .catalog
                .get_product(&item.product_ref)
                .map_err(|e| EngineError::CollaboratorUnavailable(e.to_string()))?
                .ok_or_else(|| EngineError::UnknownProduct(item.product_ref.clone()))?;
            if !product.is_active {
                return Err(EngineError::UnknownProduct(item.product_ref.clone()));
            }
            money::validate_line(&item.product_ref, product.price, item.quantity)?;
            products.push(product);
        }
        let product_refs: Vec<String> =
            req.items.iter().map(|i| i.product_ref.clone()).collect();
        let now = Utc::now();

        let txn = self.storage.begin_write()?;

        let mut items = Vec::with_capacity(req.items.len());
        for (input, product) in req.items.iter().zip(&products) {
            self.inventory
                .reserve(&txn, &input.product_ref, input.quantity)?;
            items.push(OrderItem {
                product_ref: input.product_ref.clone(),
                name: product.name.clone(),
                unit_price: product.price,
                quantity: input.quantity,
                reservation_id: uuid::Uuid::new_v4().to_string(),
            });
        }

        // Coupon validate+consume shares the transaction, so a coupon
        // rejection also rolls back every reservation made above.
        let consumed: Option<Coupon> = match &req.coupon_code {
            Some(code) => Some(self.coupons.consume(&txn, code, &product_refs, now)?),
            None => None,
        };

        let lines: Vec<PricedLine> = items
            .iter()
            .map(|item| PricedLine {
                product_ref: item.product_ref.clone(),
                unit_price: item.unit_price,
                quantity: item.quantity,
                discountable: consumed
                    .as_ref()
                    .map(|c| c.applies_to(&item.product_ref))
                    .unwrap_or(false),
            })
            .collect();
        let breakdown = money::compute_breakdown(
            &lines,
            consumed.as_ref().map(|c| c.discount_percent),
            &self.pricing,
        )?;

        let count = self.storage.next_order_count_txn(&txn)?;
        let order = Order {
            id: uuid::Uuid::new_v4().to_string(),
            order_number: Self::order_number(count),
            customer_ref: user.sub.clone(),
            items,
            items_price: breakdown.items_price,
            tax_price: breakdown.tax_price,
            shipping_price: breakdown.shipping_price,
            total_price: breakdown.total_price,
            status: OrderStatus::Pending,
            payment_status: PaymentStatus::Pending,
            payment_method: req.payment_method.clone(),
            payment_receipt_ref: None,
            payment_comment: None,
            coupon_code: consumed.as_ref().map(|c| c.code.clone()),
            discount_percent: consumed.as_ref().map(|c| c.discount_percent),
            shipping_address: req.shipping_address,
            refund: None,
            cancel_reason: None,
            cancel_comment: None,
            created_at: now,
            updated_at: now,
            confirmed_at: None,
        };

        self.storage.store_order_txn(&txn, &order)?;
        self.record_transition(
            &txn,
            &order.id,
            &user.sub,
            "status",
            "NONE",
            &order.status.to_string(),
        )?;
        let seq = self.storage.enqueue_outbox_txn(
            &txn,
            &LifecycleEvent::new(
                EventType::OrderCreated,
                &order.id,
                &order.customer_ref,
                Some(serde_json::json!({
                    "order_number": order.order_number,
                    "total_price": order.total_price,
                })),
            ),
        )?;
        txn.commit().map_err(StorageError::from)?;
        self.nudge_notifier(seq);

        tracing::info!(
            order_id = %order.id,
            order_number = %order.order_number,
            customer_ref = %order.customer_ref,
            total_price = order.total_price,
            "Order created"
        );
        Ok(order)
    }

    // ========== Cancellation ==========

    /// Cancel an order that has not shipped, releasing its reservations
    ///
    /// Permitted for the owning customer or staff while the order is still
    /// pending or processing. A consumed coupon slot is not returned.
    pub fn cancel_order(
        &self,
        user: &CurrentUser,
        order_id: &str,
        reason: &str,
        comment: Option<String>,
    ) -> EngineResult<Order> {
        if reason.trim().is_empty() {
            return Err(EngineError::Validation(
                "cancellation reason is required".to_string(),
            ));
        }

        let txn = self.storage.begin_write()?;
        let mut order = self.load_order_txn(&txn, order_id)?;
        Self::authorize_owner_or_staff(user, &order)?;

        if !order.status.is_cancellable() {
            return Err(EngineError::invalid_transition(
                "status",
                order.status,
                OrderStatus::Cancelled,
            ));
        }

        for item in &order.items {
            self.inventory
                .release(&txn, &item.product_ref, item.quantity, &item.reservation_id)?;
        }

        let from = order.status;
        order.status = OrderStatus::Cancelled;
        order.cancel_reason = Some(reason.to_string());
        order.cancel_comment = comment;
        order.updated_at = Utc::now();

        self.storage.store_order_txn(&txn, &order)?;
        self.record_transition(
            &txn,
            order_id,
            &user.sub,
            "status",
            &from.to_string(),
            &order.status.to_string(),
        )?;
        let seq = self.storage.enqueue_outbox_txn(
            &txn,
            &LifecycleEvent::new(
                EventType::OrderCancelled,
                order_id,
                &order.customer_ref,
                Some(serde_json::json!({ "reason": reason })),
            ),
        )?;
        txn.commit().map_err(StorageError::from)?;
        self.nudge_notifier(seq);

        tracing::info!(order_id = %order_id, reason = %reason, "Order cancelled");
        Ok(order)
    }

    // ========== Fulfillment ==========

    /// Staff fulfillment transition (processing → shipped → delivered)
    ///
    /// Validated against the adjacency table; a retry that targets the
    /// state already reached is a no-op. Cancellation goes through
    /// [`cancel_order`](Self::cancel_order) so stock compensation runs.
    pub fn update_status(
        &self,
        user: &CurrentUser,
        order_id: &str,
        next: OrderStatus,
    ) -> EngineResult<Order> {
        Self::require_staff(user)?;
        if next == OrderStatus::Cancelled {
            return Err(EngineError::Validation(
                "use the cancel operation to cancel an order".to_string(),
            ));
        }

        let txn = self.storage.begin_write()?;
        let mut order = self.load_order_txn(&txn, order_id)?;

        if order.status == next {
            return Ok(order);
        }
        if !order.status.can_transition_to(next) {
            return Err(EngineError::invalid_transition("status", order.status, next));
        }

        let from = order.status;
        order.status = next;
        order.updated_at = Utc::now();

        self.storage.store_order_txn(&txn, &order)?;
        self.record_transition(
            &txn,
            order_id,
            &user.sub,
            "status",
            &from.to_string(),
            &next.to_string(),
        )?;
        let seq = self.storage.enqueue_outbox_txn(
            &txn,
            &LifecycleEvent::new(
                EventType::OrderStatusChanged,
                order_id,
                &order.customer_ref,
                Some(serde_json::json!({
                    "from": from.to_string(),
                    "to": next.to_string(),
                })),
            ),
        )?;
        txn.commit().map_err(StorageError::from)?;
        self.nudge_notifier(seq);

        tracing::info!(order_id = %order_id, from = %from, to = %next, "Order status updated");
        Ok(order)
    }

    /// Customer acknowledgment after delivery; stamps `confirmed_at` only
    ///
    /// Repeat confirms keep the original timestamp.
    pub fn confirm_order(&self, user: &CurrentUser, order_id: &str) -> EngineResult<Order> {
        let txn = self.storage.begin_write()?;
        let mut order = self.load_order_txn(&txn, order_id)?;
        Self::require_owner(user, &order)?;

        if order.confirmed_at.is_some() {
            return Ok(order);
        }
        if order.status != OrderStatus::Delivered {
            return Err(EngineError::invalid_transition(
                "status",
                order.status,
                "CONFIRMED",
            ));
        }

        let now = Utc::now();
        order.confirmed_at = Some(now);
        order.updated_at = now;

        self.storage.store_order_txn(&txn, &order)?;
        self.record_transition(&txn, order_id, &user.sub, "confirmed", "NONE", "CONFIRMED")?;
        let seq = self.storage.enqueue_outbox_txn(
            &txn,
            &LifecycleEvent::new(EventType::OrderConfirmed, order_id, &order.customer_ref, None),
        )?;
        txn.commit().map_err(StorageError::from)?;
        self.nudge_notifier(seq);

        Ok(order)
    }

    // ========== Queries ==========

    /// Fetch one order (owner or staff)
    pub fn get_order(&self, user: &CurrentUser, order_id: &str) -> EngineResult<Order> {
        let order = self
            .storage
            .get_order(order_id)?
            .ok_or_else(|| EngineError::OrderNotFound(order_id.to_string()))?;
        Self::authorize_owner_or_staff(user, &order)?;
        Ok(order)
    }

    /// List orders: staff see all, customers only their own
    pub fn list_orders(&self, user: &CurrentUser) -> EngineResult<Vec<Order>> {
        let mut orders = self.storage.get_all_orders()?;
        if !user.is_staff() {
            orders.retain(|o| o.is_owned_by(&user.sub));
        }
        orders.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(orders)
    }

    /// Fetch an order's transition history (owner or staff)
    pub fn get_history(
        &self,
        user: &CurrentUser,
        order_id: &str,
    ) -> EngineResult<Vec<TransitionRecord>> {
        // Authorization needs the order itself
        let _ = self.get_order(user, order_id)?;
        Ok(self.storage.get_history(order_id)?)
    }

    // ========== Provisioning ==========

    /// Set available stock for a product (staff)
    pub fn set_stock(&self, user: &CurrentUser, product_ref: &str, qty: u32) -> EngineResult<()> {
        Self::require_staff(user)?;
        self.inventory.set_available(product_ref, qty)?;
        tracing::info!(product_ref = %product_ref, qty, "Stock level set");
        Ok(())
    }

    /// Create or replace a coupon (staff)
    pub fn upsert_coupon(&self, user: &CurrentUser, coupon: &Coupon) -> EngineResult<()> {
        Self::require_staff(user)?;
        self.coupons.upsert(coupon)?;
        tracing::info!(code = %coupon.code, "Coupon upserted");
        Ok(())
    }
}
