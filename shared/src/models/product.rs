//! Catalog product view
//!
//! The engine only ever reads price and availability from the catalog
//! collaborator at order-creation time; it never mutates catalog content.

use serde::{Deserialize, Serialize};

/// Read-only product data returned by the catalog collaborator
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct CatalogProduct {
    /// Opaque product reference
    pub product_ref: String,
    pub name: String,
    /// Current price in currency unit
    pub price: f64,
    /// Inactive products cannot be ordered
    pub is_active: bool,
}
