//! Cancellation, fulfillment transitions, confirmation, queries

use super::*;
use crate::engine::error::EngineError;
use shared::models::OrderStatus;
use shared::models::transition::verify_chain;

#[test]
fn test_cancel_restores_stock() {
    let ctx = test_context();
    ctx.seed_product("p1", "Widget", 10.0, 5);
    ctx.seed_product("p2", "Gadget", 10.0, 3);

    let order = ctx
        .engine
        .create_order(&customer(), checkout(&[("p1", 2), ("p2", 3)], None))
        .unwrap();
    assert_eq!(ctx.engine.inventory().available("p1").unwrap(), 3);
    assert_eq!(ctx.engine.inventory().available("p2").unwrap(), 0);

    let cancelled = ctx
        .engine
        .cancel_order(&customer(), &order.id, "Changed my mind", None)
        .unwrap();

    assert_eq!(cancelled.status, OrderStatus::Cancelled);
    assert_eq!(cancelled.cancel_reason.as_deref(), Some("Changed my mind"));
    assert_eq!(ctx.engine.inventory().available("p1").unwrap(), 5);
    assert_eq!(ctx.engine.inventory().available("p2").unwrap(), 3);
}

#[test]
fn test_cancel_requires_reason() {
    let ctx = test_context();
    ctx.seed_product("p1", "Widget", 10.0, 5);
    let order = ctx
        .engine
        .create_order(&customer(), checkout(&[("p1", 1)], None))
        .unwrap();

    let result = ctx.engine.cancel_order(&customer(), &order.id, "  ", None);
    assert!(matches!(result, Err(EngineError::Validation(_))));
}

#[test]
fn test_cancel_twice_fails_without_double_credit() {
    let ctx = test_context();
    ctx.seed_product("p1", "Widget", 10.0, 5);
    let order = ctx
        .engine
        .create_order(&customer(), checkout(&[("p1", 2)], None))
        .unwrap();

    ctx.engine
        .cancel_order(&customer(), &order.id, "Changed my mind", None)
        .unwrap();
    let second = ctx
        .engine
        .cancel_order(&customer(), &order.id, "Again", None);

    assert!(matches!(
        second,
        Err(EngineError::InvalidTransition { field: "status", .. })
    ));
    assert_eq!(ctx.engine.inventory().available("p1").unwrap(), 5);
}

#[test]
fn test_cancel_keeps_consumed_coupon_slot() {
    let ctx = test_context();
    ctx.seed_product("p1", "Widget", 100.0, 5);
    ctx.seed_coupon("SAVE10", 10.0, Some(3), &[]);

    let order = ctx
        .engine
        .create_order(&customer(), checkout(&[("p1", 1)], Some("SAVE10")))
        .unwrap();
    ctx.engine
        .cancel_order(&customer(), &order.id, "Changed my mind", None)
        .unwrap();

    // Anti-abuse policy: the slot stays consumed
    let coupon = ctx.engine.coupons().get("SAVE10").unwrap().unwrap();
    assert_eq!(coupon.used_count, 1);
}

#[test]
fn test_cancel_by_other_customer_forbidden() {
    let ctx = test_context();
    ctx.seed_product("p1", "Widget", 10.0, 5);
    let order = ctx
        .engine
        .create_order(&customer(), checkout(&[("p1", 1)], None))
        .unwrap();

    let result = ctx
        .engine
        .cancel_order(&other_customer(), &order.id, "Not mine", None);
    assert!(matches!(result, Err(EngineError::Forbidden(_))));
}

#[test]
fn test_staff_can_cancel_any_order() {
    let ctx = test_context();
    ctx.seed_product("p1", "Widget", 10.0, 5);
    let order = ctx
        .engine
        .create_order(&customer(), checkout(&[("p1", 1)], None))
        .unwrap();

    let cancelled = ctx
        .engine
        .cancel_order(&staff(), &order.id, "Fraud check failed", None)
        .unwrap();
    assert_eq!(cancelled.status, OrderStatus::Cancelled);
}

fn paid_processing_order(ctx: &TestContext) -> String {
    let order = ctx
        .engine
        .create_order(&customer(), checkout(&[("p1", 1)], None))
        .unwrap();
    let receipt_ref = ctx.register_receipt();
    ctx.engine
        .upload_payment_receipt(&customer(), &order.id, &receipt_ref)
        .unwrap();
    ctx.engine
        .decide_payment(
            &staff(),
            &order.id,
            crate::engine::PaymentDecision::Approve,
            "verified",
        )
        .unwrap();
    order.id
}

#[test]
fn test_fulfillment_walk_to_delivered() {
    let ctx = test_context();
    ctx.seed_product("p1", "Widget", 10.0, 5);
    let order_id = paid_processing_order(&ctx);

    let order = ctx
        .engine
        .update_status(&staff(), &order_id, OrderStatus::Shipped)
        .unwrap();
    assert_eq!(order.status, OrderStatus::Shipped);

    let order = ctx
        .engine
        .update_status(&staff(), &order_id, OrderStatus::Delivered)
        .unwrap();
    assert_eq!(order.status, OrderStatus::Delivered);
}

#[test]
fn test_no_skipping_states() {
    let ctx = test_context();
    ctx.seed_product("p1", "Widget", 10.0, 5);
    let order = ctx
        .engine
        .create_order(&customer(), checkout(&[("p1", 1)], None))
        .unwrap();

    // Pending cannot jump straight to shipped or delivered
    for target in [OrderStatus::Shipped, OrderStatus::Delivered] {
        let result = ctx.engine.update_status(&staff(), &order.id, target);
        assert!(matches!(
            result,
            Err(EngineError::InvalidTransition { field: "status", .. })
        ));
    }
}

#[test]
fn test_update_status_retry_is_noop() {
    let ctx = test_context();
    ctx.seed_product("p1", "Widget", 10.0, 5);
    let order_id = paid_processing_order(&ctx);

    ctx.engine
        .update_status(&staff(), &order_id, OrderStatus::Shipped)
        .unwrap();
    // Retried request targeting the state already reached
    let order = ctx
        .engine
        .update_status(&staff(), &order_id, OrderStatus::Shipped)
        .unwrap();
    assert_eq!(order.status, OrderStatus::Shipped);

    // Exactly one SHIPPED transition recorded
    let history = ctx.engine.get_history(&staff(), &order_id).unwrap();
    let shipped = history
        .iter()
        .filter(|r| r.field == "status" && r.to_state == "SHIPPED")
        .count();
    assert_eq!(shipped, 1);
}

#[test]
fn test_update_status_requires_staff() {
    let ctx = test_context();
    ctx.seed_product("p1", "Widget", 10.0, 5);
    let order = ctx
        .engine
        .create_order(&customer(), checkout(&[("p1", 1)], None))
        .unwrap();

    let result = ctx
        .engine
        .update_status(&customer(), &order.id, OrderStatus::Processing);
    assert!(matches!(result, Err(EngineError::Forbidden(_))));
}

#[test]
fn test_update_status_rejects_cancelled_target() {
    let ctx = test_context();
    ctx.seed_product("p1", "Widget", 10.0, 5);
    let order_id = paid_processing_order(&ctx);

    // Cancellation must go through cancel_order so stock is released
    let result = ctx
        .engine
        .update_status(&staff(), &order_id, OrderStatus::Cancelled);
    assert!(matches!(result, Err(EngineError::Validation(_))));
}

#[test]
fn test_confirm_only_after_delivery() {
    let ctx = test_context();
    ctx.seed_product("p1", "Widget", 10.0, 5);
    let order_id = paid_processing_order(&ctx);

    let early = ctx.engine.confirm_order(&customer(), &order_id);
    assert!(matches!(
        early,
        Err(EngineError::InvalidTransition { field: "status", .. })
    ));

    ctx.engine
        .update_status(&staff(), &order_id, OrderStatus::Shipped)
        .unwrap();
    ctx.engine
        .update_status(&staff(), &order_id, OrderStatus::Delivered)
        .unwrap();

    let confirmed = ctx.engine.confirm_order(&customer(), &order_id).unwrap();
    let first_stamp = confirmed.confirmed_at.unwrap();
    // Status machines untouched
    assert_eq!(confirmed.status, OrderStatus::Delivered);

    // Repeat confirm keeps the original timestamp
    let again = ctx.engine.confirm_order(&customer(), &order_id).unwrap();
    assert_eq!(again.confirmed_at.unwrap(), first_stamp);
}

#[test]
fn test_get_order_authorization() {
    let ctx = test_context();
    ctx.seed_product("p1", "Widget", 10.0, 5);
    let order = ctx
        .engine
        .create_order(&customer(), checkout(&[("p1", 1)], None))
        .unwrap();

    assert!(ctx.engine.get_order(&customer(), &order.id).is_ok());
    assert!(ctx.engine.get_order(&staff(), &order.id).is_ok());
    assert!(matches!(
        ctx.engine.get_order(&other_customer(), &order.id),
        Err(EngineError::Forbidden(_))
    ));
}

#[test]
fn test_list_orders_scoping() {
    let ctx = test_context();
    ctx.seed_product("p1", "Widget", 10.0, 10);

    ctx.engine
        .create_order(&customer(), checkout(&[("p1", 1)], None))
        .unwrap();
    ctx.engine
        .create_order(&other_customer(), checkout(&[("p1", 1)], None))
        .unwrap();

    assert_eq!(ctx.engine.list_orders(&customer()).unwrap().len(), 1);
    assert_eq!(ctx.engine.list_orders(&staff()).unwrap().len(), 2);
}

#[test]
fn test_transition_history_chain_verifies() {
    let ctx = test_context();
    ctx.seed_product("p1", "Widget", 10.0, 5);
    let order_id = paid_processing_order(&ctx);
    ctx.engine
        .update_status(&staff(), &order_id, OrderStatus::Shipped)
        .unwrap();
    ctx.engine
        .update_status(&staff(), &order_id, OrderStatus::Delivered)
        .unwrap();
    ctx.engine.confirm_order(&customer(), &order_id).unwrap();

    let history = ctx.engine.get_history(&staff(), &order_id).unwrap();
    // created, payment upload, payment decision, status advance, shipped,
    // delivered, confirmed
    assert!(history.len() >= 6);
    assert!(verify_chain(&history));

    // Each record names its acting identity
    assert!(history.iter().all(|r| !r.actor.is_empty()));
}

#[test]
fn test_operations_on_missing_order() {
    let ctx = test_context();
    let missing = "no-such-order";

    assert!(matches!(
        ctx.engine.get_order(&staff(), missing),
        Err(EngineError::OrderNotFound(_))
    ));
    assert!(matches!(
        ctx.engine.cancel_order(&staff(), missing, "reason", None),
        Err(EngineError::OrderNotFound(_))
    ));
    assert!(matches!(
        ctx.engine
            .update_status(&staff(), missing, OrderStatus::Processing),
        Err(EngineError::OrderNotFound(_))
    ));
}
