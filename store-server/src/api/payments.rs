//! Receipt verification handlers

use axum::{
    Json,
    extract::{Path, State},
};
use serde::Deserialize;
use shared::models::Order;
use shared::{ApiResponse, AppError, AppResult};
use validator::Validate;

use crate::auth::CurrentUser;
use crate::core::ServerState;
use crate::engine::PaymentDecision;

#[derive(Debug, Deserialize, Validate)]
pub struct ReceiptPayload {
    /// Opaque reference returned by the receipt upload endpoint
    #[validate(length(min = 1, max = 256))]
    pub receipt_ref: String,
}

/// Attach an uploaded receipt to an order
pub async fn upload_receipt(
    State(state): State<ServerState>,
    user: CurrentUser,
    Path(id): Path<String>,
    Json(payload): Json<ReceiptPayload>,
) -> AppResult<Json<ApiResponse<Order>>> {
    payload
        .validate()
        .map_err(|e| AppError::validation(e.to_string()))?;

    let order = state
        .engine
        .upload_payment_receipt(&user, &id, &payload.receipt_ref)?;
    Ok(Json(ApiResponse::ok(order)))
}

#[derive(Debug, Deserialize, Validate)]
pub struct DecisionPayload {
    pub decision: PaymentDecision,
    #[validate(length(min = 1, max = 1000))]
    pub comment: String,
}

/// Staff approve/reject of an uploaded receipt
pub async fn decide(
    State(state): State<ServerState>,
    user: CurrentUser,
    Path(id): Path<String>,
    Json(payload): Json<DecisionPayload>,
) -> AppResult<Json<ApiResponse<Order>>> {
    payload
        .validate()
        .map_err(|e| AppError::validation(e.to_string()))?;

    let order = state
        .engine
        .decide_payment(&user, &id, payload.decision, &payload.comment)?;
    Ok(Json(ApiResponse::ok(order)))
}
