//! Receipt blob registration
//!
//! Stands in front of the object-storage collaborator: the client uploads
//! the blob there and the engine only ever sees the opaque reference this
//! endpoint returns.

use axum::{Json, extract::State};
use serde::{Deserialize, Serialize};
use shared::{ApiResponse, AppError, AppResult};
use validator::Validate;

use crate::auth::CurrentUser;
use crate::collaborators::ReceiptMeta;
use crate::core::ServerState;

#[derive(Debug, Deserialize, Validate)]
pub struct ReceiptUploadPayload {
    #[validate(length(min = 1, max = 100))]
    pub content_type: String,
    #[validate(range(min = 1))]
    pub size_bytes: u64,
}

#[derive(Debug, Serialize)]
pub struct ReceiptUploadResponse {
    pub receipt_ref: String,
}

/// Register an uploaded receipt blob and return its opaque reference
pub async fn upload(
    State(state): State<ServerState>,
    _user: CurrentUser,
    Json(payload): Json<ReceiptUploadPayload>,
) -> AppResult<Json<ApiResponse<ReceiptUploadResponse>>> {
    payload
        .validate()
        .map_err(|e| AppError::validation(e.to_string()))?;

    let receipt_ref = state
        .receipts
        .register(ReceiptMeta {
            content_type: payload.content_type,
            size_bytes: payload.size_bytes,
        })
        .map_err(|e| AppError::transient(e.to_string()))?;

    Ok(Json(ApiResponse::ok(ReceiptUploadResponse { receipt_ref })))
}
