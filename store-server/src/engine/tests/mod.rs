//! Engine integration tests
//!
//! Exercise whole operations against an in-memory store with in-memory
//! collaborators, including the concurrency properties the engine exists
//! to guarantee.

mod test_lifecycle;

use std::sync::Arc;

use chrono::{Duration, Utc};
use shared::models::{CatalogProduct, Coupon};

use crate::auth::CurrentUser;
use crate::collaborators::{MemoryCatalog, MemoryReceiptStore, ReceiptMeta, ReceiptStore};
use crate::engine::money::PricingConfig;
use crate::engine::orders::{CheckoutItem, CheckoutRequest, OrderEngine};
use crate::engine::storage::Storage;

/// Engine plus handles on its in-memory collaborators
pub struct TestContext {
    pub engine: OrderEngine,
    pub catalog: Arc<MemoryCatalog>,
    pub receipts: Arc<MemoryReceiptStore>,
}

/// Tax 10%, flat shipping 40, free shipping from 500
pub fn test_pricing() -> PricingConfig {
    PricingConfig {
        tax_percent: 10.0,
        shipping_flat: 40.0,
        free_shipping_threshold: Some(500.0),
    }
}

pub fn test_context() -> TestContext {
    let storage = Storage::open_in_memory().unwrap();
    let catalog = Arc::new(MemoryCatalog::new());
    let receipts = Arc::new(MemoryReceiptStore::new());
    let engine = OrderEngine::new(
        storage,
        catalog.clone(),
        receipts.clone(),
        test_pricing(),
    );
    TestContext {
        engine,
        catalog,
        receipts,
    }
}

impl TestContext {
    /// Put a product in the catalog and set its stock level
    pub fn seed_product(&self, product_ref: &str, name: &str, price: f64, stock: u32) {
        self.catalog.insert(CatalogProduct {
            product_ref: product_ref.to_string(),
            name: name.to_string(),
            price,
            is_active: true,
        });
        self.engine
            .inventory()
            .set_available(product_ref, stock)
            .unwrap();
    }

    /// Seed a currently valid coupon
    pub fn seed_coupon(&self, code: &str, percent: f64, limit: Option<u32>, products: &[&str]) {
        let coupon = Coupon {
            code: code.to_string(),
            discount_percent: percent,
            applicable_products: products.iter().map(|s| s.to_string()).collect(),
            is_active: true,
            usage_limit: limit,
            used_count: 0,
            valid_from: Utc::now() - Duration::days(1),
            valid_until: Some(Utc::now() + Duration::days(30)),
        };
        self.engine.coupons().upsert(&coupon).unwrap();
    }

    /// Register a receipt blob and return its reference
    pub fn register_receipt(&self) -> String {
        self.receipts
            .register(ReceiptMeta {
                content_type: "image/png".to_string(),
                size_bytes: 2048,
            })
            .unwrap()
    }
}

pub fn customer() -> CurrentUser {
    CurrentUser::customer("cust-1", "Alice")
}

pub fn other_customer() -> CurrentUser {
    CurrentUser::customer("cust-2", "Carol")
}

pub fn staff() -> CurrentUser {
    CurrentUser::staff("staff-1", "Bea")
}

/// Checkout request over (product_ref, quantity) pairs
pub fn checkout(items: &[(&str, u32)], coupon_code: Option<&str>) -> CheckoutRequest {
    CheckoutRequest {
        items: items
            .iter()
            .map(|(product_ref, quantity)| CheckoutItem {
                product_ref: product_ref.to_string(),
                quantity: *quantity,
            })
            .collect(),
        shipping_address: shared::models::ShippingAddress {
            name: "Alice".to_string(),
            phone: "5551234567".to_string(),
            street: "1 Main St".to_string(),
            city: "Springfield".to_string(),
            state: "IL".to_string(),
            pincode: "62701".to_string(),
            country: "US".to_string(),
        },
        payment_method: "BANK_TRANSFER".to_string(),
        coupon_code: coupon_code.map(|s| s.to_string()),
    }
}
