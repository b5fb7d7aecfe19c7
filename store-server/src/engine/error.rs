//! Engine error taxonomy
//!
//! Business-rule violations are typed and surfaced to the immediate caller.
//! Storage and collaborator failures map to the transient class so callers
//! can distinguish "invalid request" from "try again later".

use shared::{AppError, ErrorCode};
use thiserror::Error;

use super::storage::StorageError;

/// Coupon validation failures
#[derive(Debug, Error, PartialEq, Eq)]
pub enum CouponError {
    #[error("Coupon {0} not found")]
    NotFound(String),

    #[error("Coupon {0} is not active")]
    Inactive(String),

    #[error("Coupon {0} is outside its validity window")]
    Expired(String),

    #[error("Coupon {0} has no remaining uses")]
    Exhausted(String),

    #[error("Coupon {0} does not apply to any product in this order")]
    NotApplicable(String),
}

/// Engine errors
#[derive(Debug, Error)]
pub enum EngineError {
    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),

    #[error("Order not found: {0}")]
    OrderNotFound(String),

    #[error("Unknown or inactive product: {0}")]
    UnknownProduct(String),

    #[error("Product {0} is out of stock")]
    OutOfStock(String),

    #[error(transparent)]
    Coupon(#[from] CouponError),

    #[error("Invalid {field} transition from {from} to {to}")]
    InvalidTransition {
        field: &'static str,
        from: String,
        to: String,
    },

    #[error("Validation failed: {0}")]
    Validation(String),

    #[error("Permission denied: {0}")]
    Forbidden(String),

    #[error("Collaborator unavailable: {0}")]
    CollaboratorUnavailable(String),
}

impl EngineError {
    /// Build an InvalidTransition error from displayable states
    pub fn invalid_transition(
        field: &'static str,
        from: impl std::fmt::Display,
        to: impl std::fmt::Display,
    ) -> Self {
        Self::InvalidTransition {
            field,
            from: from.to_string(),
            to: to.to_string(),
        }
    }

    /// Whether a retry of the same request may succeed
    pub fn is_transient(&self) -> bool {
        matches!(
            self,
            EngineError::Storage(_) | EngineError::CollaboratorUnavailable(_)
        )
    }
}

pub type EngineResult<T> = Result<T, EngineError>;

impl From<EngineError> for AppError {
    fn from(err: EngineError) -> Self {
        match err {
            EngineError::Storage(e) => {
                tracing::error!(error = %e, "Storage error");
                AppError::transient(e.to_string())
            }
            EngineError::OrderNotFound(id) => AppError::not_found(format!("Order {}", id)),
            EngineError::UnknownProduct(p) => {
                AppError::validation(format!("Unknown or inactive product: {}", p))
            }
            EngineError::OutOfStock(product) => AppError::OutOfStock { product },
            EngineError::Coupon(e) => {
                let code = match &e {
                    CouponError::NotFound(_) => ErrorCode::NotFound,
                    CouponError::Inactive(_) => ErrorCode::CouponInactive,
                    CouponError::Expired(_) => ErrorCode::CouponExpired,
                    CouponError::Exhausted(_) => ErrorCode::CouponExhausted,
                    CouponError::NotApplicable(_) => ErrorCode::CouponNotApplicable,
                };
                match e {
                    CouponError::NotFound(c) => AppError::not_found(format!("Coupon {}", c)),
                    other => AppError::Coupon {
                        code,
                        message: other.to_string(),
                    },
                }
            }
            EngineError::InvalidTransition { field, from, to } => AppError::InvalidTransition {
                field: field.to_string(),
                from,
                to,
            },
            EngineError::Validation(message) => AppError::validation(message),
            EngineError::Forbidden(message) => AppError::forbidden(message),
            EngineError::CollaboratorUnavailable(message) => {
                tracing::error!(error = %message, "Collaborator unavailable");
                AppError::transient(message)
            }
        }
    }
}
