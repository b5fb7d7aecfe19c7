//! Checkout handler

use axum::{Json, extract::State};
use serde::{Deserialize, Serialize};
use shared::models::{Order, ShippingAddress};
use shared::{ApiResponse, AppError, AppResult};
use validator::Validate;

use crate::auth::CurrentUser;
use crate::core::ServerState;
use crate::engine::{CheckoutItem, CheckoutRequest};

#[derive(Debug, Deserialize, Serialize, Validate)]
pub struct CheckoutItemPayload {
    #[validate(length(min = 1))]
    pub product_ref: String,
    #[validate(range(min = 1))]
    pub quantity: u32,
}

#[derive(Debug, Deserialize, Validate)]
pub struct AddressPayload {
    #[validate(length(min = 1, max = 100))]
    pub name: String,
    #[validate(length(min = 5, max = 20))]
    pub phone: String,
    #[validate(length(min = 1, max = 200))]
    pub street: String,
    #[validate(length(min = 1, max = 100))]
    pub city: String,
    #[validate(length(max = 100))]
    #[serde(default)]
    pub state: String,
    #[validate(length(min = 1, max = 20))]
    pub pincode: String,
    #[validate(length(min = 1, max = 100))]
    pub country: String,
}

#[derive(Debug, Deserialize, Validate)]
pub struct CheckoutPayload {
    #[validate(length(min = 1), nested)]
    pub items: Vec<CheckoutItemPayload>,
    #[validate(nested)]
    pub shipping_address: AddressPayload,
    #[validate(length(min = 1, max = 50))]
    pub payment_method: String,
    #[serde(default)]
    pub coupon_code: Option<String>,
}

impl From<CheckoutPayload> for CheckoutRequest {
    fn from(payload: CheckoutPayload) -> Self {
        CheckoutRequest {
            items: payload
                .items
                .into_iter()
                .map(|i| CheckoutItem {
                    product_ref: i.product_ref,
                    quantity: i.quantity,
                })
                .collect(),
            shipping_address: ShippingAddress {
                name: payload.shipping_address.name,
                phone: payload.shipping_address.phone,
                street: payload.shipping_address.street,
                city: payload.shipping_address.city,
                state: payload.shipping_address.state,
                pincode: payload.shipping_address.pincode,
                country: payload.shipping_address.country,
            },
            payment_method: payload.payment_method,
            coupon_code: payload.coupon_code,
        }
    }
}

/// Create an order from the customer's cart
pub async fn create(
    State(state): State<ServerState>,
    user: CurrentUser,
    Json(payload): Json<CheckoutPayload>,
) -> AppResult<Json<ApiResponse<Order>>> {
    payload
        .validate()
        .map_err(|e| AppError::validation(e.to_string()))?;

    let order = state.engine.create_order(&user, payload.into())?;
    Ok(Json(ApiResponse::ok(order)))
}
