//! Order query and lifecycle handlers

use axum::{
    Json,
    extract::{Path, State},
};
use serde::Deserialize;
use shared::models::{Order, OrderStatus, TransitionRecord};
use shared::{ApiResponse, AppError, AppResult};
use validator::Validate;

use crate::auth::CurrentUser;
use crate::core::ServerState;

/// List orders: staff see all, customers their own
pub async fn list(
    State(state): State<ServerState>,
    user: CurrentUser,
) -> AppResult<Json<ApiResponse<Vec<Order>>>> {
    let orders = state.engine.list_orders(&user)?;
    Ok(Json(ApiResponse::ok(orders)))
}

/// Get one order
pub async fn get_by_id(
    State(state): State<ServerState>,
    user: CurrentUser,
    Path(id): Path<String>,
) -> AppResult<Json<ApiResponse<Order>>> {
    let order = state.engine.get_order(&user, &id)?;
    Ok(Json(ApiResponse::ok(order)))
}

/// Get an order's transition history
pub async fn history(
    State(state): State<ServerState>,
    user: CurrentUser,
    Path(id): Path<String>,
) -> AppResult<Json<ApiResponse<Vec<TransitionRecord>>>> {
    let records = state.engine.get_history(&user, &id)?;
    Ok(Json(ApiResponse::ok(records)))
}

#[derive(Debug, Deserialize, Validate)]
pub struct CancelPayload {
    #[validate(length(min = 1, max = 200))]
    pub reason: String,
    #[validate(length(max = 1000))]
    #[serde(default)]
    pub comment: Option<String>,
}

/// Cancel an order (owner or staff, pre-shipment)
pub async fn cancel(
    State(state): State<ServerState>,
    user: CurrentUser,
    Path(id): Path<String>,
    Json(payload): Json<CancelPayload>,
) -> AppResult<Json<ApiResponse<Order>>> {
    payload
        .validate()
        .map_err(|e| AppError::validation(e.to_string()))?;

    let order = state
        .engine
        .cancel_order(&user, &id, &payload.reason, payload.comment)?;
    Ok(Json(ApiResponse::ok(order)))
}

/// Confirm delivery (customer acknowledgment)
pub async fn confirm(
    State(state): State<ServerState>,
    user: CurrentUser,
    Path(id): Path<String>,
) -> AppResult<Json<ApiResponse<Order>>> {
    let order = state.engine.confirm_order(&user, &id)?;
    Ok(Json(ApiResponse::ok(order)))
}

#[derive(Debug, Deserialize)]
pub struct StatusPayload {
    pub status: OrderStatus,
}

/// Staff fulfillment transition
pub async fn update_status(
    State(state): State<ServerState>,
    user: CurrentUser,
    Path(id): Path<String>,
    Json(payload): Json<StatusPayload>,
) -> AppResult<Json<ApiResponse<Order>>> {
    let order = state.engine.update_status(&user, &id, payload.status)?;
    Ok(Json(ApiResponse::ok(order)))
}
