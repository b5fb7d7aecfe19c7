//! Staff provisioning handlers (stock levels, coupons)

use axum::{
    Json,
    extract::{Path, State},
};
use serde::{Deserialize, Serialize};
use shared::models::Coupon;
use shared::{ApiResponse, AppError, AppResult};

use crate::auth::CurrentUser;
use crate::core::ServerState;

#[derive(Debug, Deserialize)]
pub struct StockPayload {
    pub qty: u32,
}

#[derive(Debug, Serialize)]
pub struct StockResponse {
    pub product_ref: String,
    pub available: u32,
}

/// Set the available stock for a product
pub async fn set_stock(
    State(state): State<ServerState>,
    user: CurrentUser,
    Path(product_ref): Path<String>,
    Json(payload): Json<StockPayload>,
) -> AppResult<Json<ApiResponse<StockResponse>>> {
    state.engine.set_stock(&user, &product_ref, payload.qty)?;
    Ok(Json(ApiResponse::ok(StockResponse {
        product_ref,
        available: payload.qty,
    })))
}

/// Current available stock for a product
pub async fn get_stock(
    State(state): State<ServerState>,
    user: CurrentUser,
    Path(product_ref): Path<String>,
) -> AppResult<Json<ApiResponse<StockResponse>>> {
    if !user.is_staff() {
        return Err(AppError::forbidden("staff role required"));
    }
    let available = state.engine.inventory().available(&product_ref)?;
    Ok(Json(ApiResponse::ok(StockResponse {
        product_ref,
        available,
    })))
}

/// Create or replace a coupon
pub async fn upsert_coupon(
    State(state): State<ServerState>,
    user: CurrentUser,
    Json(coupon): Json<Coupon>,
) -> AppResult<Json<ApiResponse<Coupon>>> {
    state.engine.upsert_coupon(&user, &coupon)?;
    Ok(Json(ApiResponse::ok(coupon)))
}

/// Look up a coupon by code
pub async fn get_coupon(
    State(state): State<ServerState>,
    user: CurrentUser,
    Path(code): Path<String>,
) -> AppResult<Json<ApiResponse<Coupon>>> {
    if !user.is_staff() {
        return Err(AppError::forbidden("staff role required"));
    }
    let coupon = state
        .engine
        .coupons()
        .get(&code)?
        .ok_or_else(|| AppError::not_found(format!("Coupon {}", code)))?;
    Ok(Json(ApiResponse::ok(coupon)))
}
