//! Refund adjudication handlers

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
use crate::engine::RefundAction;

#[derive(Debug, Deserialize, Validate)]
pub struct RefundRequestPayload {
    #[validate(length(min = 1, max = 200))]
    pub reason: String,
    #[validate(length(max = 1000))]
    #[serde(default)]
    pub comment: Option<String>,
}

/// Customer refund request on a paid, cancelled order
pub async fn request(
    State(state): State<ServerState>,
    user: CurrentUser,
    Path(id): Path<String>,
    Json(payload): Json<RefundRequestPayload>,
) -> AppResult<Json<ApiResponse<Order>>> {
    payload
        .validate()
        .map_err(|e| AppError::validation(e.to_string()))?;

    let order = state
        .engine
        .request_refund(&user, &id, &payload.reason, payload.comment)?;
    Ok(Json(ApiResponse::ok(order)))
}

#[derive(Debug, Deserialize, Validate)]
pub struct RefundDecisionPayload {
    pub action: RefundAction,
    #[validate(length(min = 1, max = 1000))]
    pub admin_comment: String,
}

/// Staff approve/reject of a requested refund
pub async fn decide(
    State(state): State<ServerState>,
    user: CurrentUser,
    Path(id): Path<String>,
    Json(payload): Json<RefundDecisionPayload>,
) -> AppResult<Json<ApiResponse<Order>>> {
    payload
        .validate()
        .map_err(|e| AppError::validation(e.to_string()))?;

    let order = state
        .engine
        .process_refund(&user, &id, payload.action, &payload.admin_comment)?;
    Ok(Json(ApiResponse::ok(order)))
}

/// Record completed external settlement of an approved refund
pub async fn mark_processed(
    State(state): State<ServerState>,
    user: CurrentUser,
    Path(id): Path<String>,
) -> AppResult<Json<ApiResponse<Order>>> {
    let order = state.engine.mark_refund_processed(&user, &id)?;
    Ok(Json(ApiResponse::ok(order)))
}
