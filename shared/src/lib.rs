//! Shared types for the storefront backend
//!
//! Common types used across crates: the order/coupon data model with its
//! three state machines, lifecycle events, error types, and the unified
//! API response envelope.

pub mod error;
pub mod events;
pub mod models;
pub mod response;
pub mod util;

// Re-exports
pub use serde::{Deserialize, Serialize};

pub use error::{AppError, AppResult, ErrorCode};
pub use events::{EventType, LifecycleEvent};
pub use response::ApiResponse;
