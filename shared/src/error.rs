//! Unified error system for the storefront backend
//!
//! Every business-rule violation is a typed error that propagates to the
//! immediate caller; nothing is swallowed. Transient failures (storage or
//! collaborator unavailable) are kept distinct from business rejections so
//! callers can tell "you did something invalid" from "try again later".
//!
//! # Error Code Ranges
//!
//! - 0xxx: General errors
//! - 1xxx: Authentication / authorization errors
//! - 4xxx: Order lifecycle errors
//! - 6xxx: Stock and coupon errors
//! - 9xxx: System errors

use http::StatusCode;
use thiserror::Error;

use crate::response::ApiResponse;

/// Standardized error codes
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCode {
    /// Success
    Success,
    /// Validation error (400)
    Validation,
    /// Resource not found (404)
    NotFound,
    /// Resource already exists / state conflict (409)
    Conflict,
    /// Authentication required (401)
    Unauthorized,
    /// Invalid token (401)
    InvalidToken,
    /// Token expired (401)
    TokenExpired,
    /// Permission denied (403)
    Forbidden,
    /// Requested state transition not permitted (422)
    InvalidTransition,
    /// Insufficient stock (422)
    OutOfStock,
    /// Coupon is not active (422)
    CouponInactive,
    /// Coupon outside its validity window (422)
    CouponExpired,
    /// Coupon usage limit reached (422)
    CouponExhausted,
    /// Coupon does not apply to any product in the cart (422)
    CouponNotApplicable,
    /// Internal server error (500)
    Internal,
    /// Transient failure, safe to retry (503)
    Transient,
}

impl ErrorCode {
    /// Get the HTTP status code for this error
    pub fn status_code(&self) -> StatusCode {
        match self {
            Self::Success => StatusCode::OK,
            Self::Validation => StatusCode::BAD_REQUEST,
            Self::NotFound => StatusCode::NOT_FOUND,
            Self::Conflict => StatusCode::CONFLICT,
            Self::Unauthorized | Self::InvalidToken | Self::TokenExpired => {
                StatusCode::UNAUTHORIZED
            }
            Self::Forbidden => StatusCode::FORBIDDEN,
            Self::InvalidTransition
            | Self::OutOfStock
            | Self::CouponInactive
            | Self::CouponExpired
            | Self::CouponExhausted
            | Self::CouponNotApplicable => StatusCode::UNPROCESSABLE_ENTITY,
            Self::Internal => StatusCode::INTERNAL_SERVER_ERROR,
            Self::Transient => StatusCode::SERVICE_UNAVAILABLE,
        }
    }

    /// Get the error code string
    pub fn code(&self) -> &'static str {
        match self {
            Self::Success => "E0000",
            Self::Validation => "E0002",
            Self::NotFound => "E0003",
            Self::Conflict => "E0004",
            Self::Unauthorized => "E1001",
            Self::InvalidToken => "E1002",
            Self::TokenExpired => "E1003",
            Self::Forbidden => "E1101",
            Self::InvalidTransition => "E4001",
            Self::OutOfStock => "E6001",
            Self::CouponInactive => "E6101",
            Self::CouponExpired => "E6102",
            Self::CouponExhausted => "E6103",
            Self::CouponNotApplicable => "E6104",
            Self::Internal => "E9001",
            Self::Transient => "E9002",
        }
    }
}

impl std::fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.code())
    }
}

/// Unified application error
#[derive(Debug, Error)]
pub enum AppError {
    /// Malformed input
    #[error("{message}")]
    Validation { message: String },

    /// Authentication required
    #[error("Authentication required")]
    Unauthorized,

    /// Invalid token
    #[error("Invalid token: {message}")]
    InvalidToken { message: String },

    /// Token expired
    #[error("Token expired")]
    TokenExpired,

    /// Permission denied
    #[error("Permission denied: {message}")]
    Forbidden { message: String },

    /// Resource not found
    #[error("{resource} not found")]
    NotFound { resource: String },

    /// State conflict
    #[error("Conflict: {message}")]
    Conflict { message: String },

    /// Requested transition violates a state machine adjacency table
    #[error("Invalid {field} transition from {from} to {to}")]
    InvalidTransition {
        field: String,
        from: String,
        to: String,
    },

    /// Not enough stock for a product
    #[error("Product {product} is out of stock")]
    OutOfStock { product: String },

    /// Coupon rejected with a specific reason code
    #[error("{message}")]
    Coupon { code: ErrorCode, message: String },

    /// Transient failure: storage or a collaborator is unavailable
    #[error("Service temporarily unavailable: {message}")]
    Transient { message: String },

    /// Internal server error
    #[error("Internal error: {message}")]
    Internal { message: String },
}

impl AppError {
    // ========== Convenient constructors ==========

    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation {
            message: message.into(),
        }
    }

    pub fn invalid_token(message: impl Into<String>) -> Self {
        Self::InvalidToken {
            message: message.into(),
        }
    }

    pub fn forbidden(message: impl Into<String>) -> Self {
        Self::Forbidden {
            message: message.into(),
        }
    }

    pub fn not_found(resource: impl Into<String>) -> Self {
        Self::NotFound {
            resource: resource.into(),
        }
    }

    pub fn conflict(message: impl Into<String>) -> Self {
        Self::Conflict {
            message: message.into(),
        }
    }

    pub fn transient(message: impl Into<String>) -> Self {
        Self::Transient {
            message: message.into(),
        }
    }

    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal {
            message: message.into(),
        }
    }

    // ========== Error inspection ==========

    /// Get the error code for this error
    pub fn error_code(&self) -> ErrorCode {
        match self {
            Self::Validation { .. } => ErrorCode::Validation,
            Self::Unauthorized => ErrorCode::Unauthorized,
            Self::InvalidToken { .. } => ErrorCode::InvalidToken,
            Self::TokenExpired => ErrorCode::TokenExpired,
            Self::Forbidden { .. } => ErrorCode::Forbidden,
            Self::NotFound { .. } => ErrorCode::NotFound,
            Self::Conflict { .. } => ErrorCode::Conflict,
            Self::InvalidTransition { .. } => ErrorCode::InvalidTransition,
            Self::OutOfStock { .. } => ErrorCode::OutOfStock,
            Self::Coupon { code, .. } => *code,
            Self::Transient { .. } => ErrorCode::Transient,
            Self::Internal { .. } => ErrorCode::Internal,
        }
    }

    /// Whether a retry of the same request may succeed
    pub fn is_transient(&self) -> bool {
        matches!(self, Self::Transient { .. })
    }
}

impl axum::response::IntoResponse for AppError {
    fn into_response(self) -> axum::response::Response {
        let code = self.error_code();
        let status = code.status_code();
        let body = ApiResponse::<()>::error(code.code(), self.to_string());

        (status, axum::Json(body)).into_response()
    }
}

/// Result type for API operations
pub type AppResult<T> = Result<T, AppError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_codes_map_to_expected_status() {
        assert_eq!(
            ErrorCode::Validation.status_code(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            ErrorCode::OutOfStock.status_code(),
            StatusCode::UNPROCESSABLE_ENTITY
        );
        assert_eq!(
            ErrorCode::Transient.status_code(),
            StatusCode::SERVICE_UNAVAILABLE
        );
    }

    #[test]
    fn test_transient_classification() {
        assert!(AppError::transient("db down").is_transient());
        assert!(!AppError::validation("bad input").is_transient());
        assert!(
            !AppError::OutOfStock {
                product: "p1".into()
            }
            .is_transient()
        );
    }

    #[test]
    fn test_coupon_error_carries_specific_code() {
        let err = AppError::Coupon {
            code: ErrorCode::CouponExhausted,
            message: "Coupon SAVE10 has no remaining uses".into(),
        };
        assert_eq!(err.error_code(), ErrorCode::CouponExhausted);
        assert_eq!(err.error_code().code(), "E6103");
    }
}
