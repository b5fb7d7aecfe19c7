//! Object-storage collaborator for uploaded receipts
//!
//! Receipts are opaque blobs held by an external store; the engine only
//! handles the reference the store returns and checks the handle resolves
//! before accepting it on an order.

use dashmap::DashMap;
use thiserror::Error;

/// Receipt store failures
#[derive(Debug, Error)]
pub enum ReceiptStoreError {
    #[error("receipt store unavailable: {0}")]
    Unavailable(String),
}

/// Metadata recorded alongside an uploaded receipt blob
#[derive(Debug, Clone)]
pub struct ReceiptMeta {
    pub content_type: String,
    pub size_bytes: u64,
}

/// Opaque-handle store for uploaded receipts
pub trait ReceiptStore: Send + Sync {
    /// Register an uploaded blob, returning its opaque reference
    fn register(&self, meta: ReceiptMeta) -> Result<String, ReceiptStoreError>;

    /// Whether a reference resolves to a stored blob
    fn exists(&self, receipt_ref: &str) -> Result<bool, ReceiptStoreError>;
}

/// In-memory receipt store for development and tests
#[derive(Debug, Default)]
pub struct MemoryReceiptStore {
    refs: DashMap<String, ReceiptMeta>,
}

impl MemoryReceiptStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl ReceiptStore for MemoryReceiptStore {
    fn register(&self, meta: ReceiptMeta) -> Result<String, ReceiptStoreError> {
        let receipt_ref = format!("receipt-{}", uuid::Uuid::new_v4());
        self.refs.insert(receipt_ref.clone(), meta);
        Ok(receipt_ref)
    }

    fn exists(&self, receipt_ref: &str) -> Result<bool, ReceiptStoreError> {
        Ok(self.refs.contains_key(receipt_ref))
    }
}
