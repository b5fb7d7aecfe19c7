//! Catalog collaborator
//!
//! The engine reads price and availability at order-creation time and never
//! mutates catalog content. Unavailability is a transient failure, distinct
//! from "unknown product".

use parking_lot::RwLock;
use shared::models::CatalogProduct;
use std::collections::HashMap;
use thiserror::Error;

/// Catalog collaborator failures
#[derive(Debug, Error)]
pub enum CatalogError {
    #[error("catalog unavailable: {0}")]
    Unavailable(String),
}

/// Read-only product lookup
pub trait Catalog: Send + Sync {
    /// Fetch one product; `Ok(None)` means the catalog does not know it
    fn get_product(&self, product_ref: &str) -> Result<Option<CatalogProduct>, CatalogError>;
}

/// In-memory catalog for development and tests
#[derive(Debug, Default)]
pub struct MemoryCatalog {
    products: RwLock<HashMap<String, CatalogProduct>>,
}

impl MemoryCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&self, product: CatalogProduct) {
        let mut products = self.products.write();
        products.insert(product.product_ref.clone(), product);
    }

    pub fn remove(&self, product_ref: &str) {
        let mut products = self.products.write();
        products.remove(product_ref);
    }
}

impl Catalog for MemoryCatalog {
    fn get_product(&self, product_ref: &str) -> Result<Option<CatalogProduct>, CatalogError> {
        let products = self.products.read();
        Ok(products.get(product_ref).cloned())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_memory_catalog_lookup() {
        let catalog = MemoryCatalog::new();
        catalog.insert(CatalogProduct {
            product_ref: "p1".to_string(),
            name: "Widget".to_string(),
            price: 19.99,
            is_active: true,
        });

        let found = catalog.get_product("p1").unwrap().unwrap();
        assert_eq!(found.name, "Widget");
        assert!(catalog.get_product("p2").unwrap().is_none());

        catalog.remove("p1");
        assert!(catalog.get_product("p1").unwrap().is_none());
    }
}
