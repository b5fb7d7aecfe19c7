//! Health check

use axum::Json;
use shared::ApiResponse;

pub async fn check() -> Json<ApiResponse<&'static str>> {
    Json(ApiResponse::ok("ok"))
}
