//! HTTP API
//!
//! Thin axum handlers over the engine. Authorization (customer vs staff)
//! is enforced by the engine at each operation boundary; handlers only
//! deserialize, validate shape, and translate errors.

mod admin;
mod checkout;
mod health;
mod orders;
mod payments;
mod receipts;
mod refunds;

use axum::{
    Router,
    routing::{get, post, put},
};

use crate::core::ServerState;

/// Full API router
pub fn router(state: ServerState) -> Router {
    Router::new()
        .route("/api/health", get(health::check))
        // Checkout
        .route("/api/checkout", post(checkout::create))
        // Orders
        .route("/api/orders", get(orders::list))
        .route("/api/orders/{id}", get(orders::get_by_id))
        .route("/api/orders/{id}/history", get(orders::history))
        .route("/api/orders/{id}/cancel", post(orders::cancel))
        .route("/api/orders/{id}/confirm", post(orders::confirm))
        // Receipts
        .route("/api/receipts", post(receipts::upload))
        .route("/api/orders/{id}/receipt", post(payments::upload_receipt))
        // Refunds
        .route("/api/orders/{id}/refund", post(refunds::request))
        // Staff operations
        .route(
            "/api/admin/orders/{id}/payment-decision",
            post(payments::decide),
        )
        .route("/api/admin/orders/{id}/status", post(orders::update_status))
        .route(
            "/api/admin/orders/{id}/refund-decision",
            post(refunds::decide),
        )
        .route(
            "/api/admin/orders/{id}/refund-processed",
            post(refunds::mark_processed),
        )
        .route(
            "/api/admin/inventory/{product_ref}",
            put(admin::set_stock).get(admin::get_stock),
        )
        .route("/api/admin/coupons", put(admin::upsert_coupon))
        .route("/api/admin/coupons/{code}", get(admin::get_coupon))
        .with_state(state)
}
