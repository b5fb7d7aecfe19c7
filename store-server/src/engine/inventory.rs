//! Inventory Ledger
//!
//! One available-stock counter per product. The check and the decrement
//! always happen in the same write transaction, so two shoppers can never
//! both take the last unit. Releases are idempotent per reservation: a
//! retried compensation never double-credits stock.

use redb::WriteTransaction;

use super::error::{EngineError, EngineResult};
use super::storage::Storage;

/// Per-product available-stock counters with atomic reserve/release
#[derive(Debug, Clone)]
pub struct InventoryLedger {
    storage: Storage,
}

impl InventoryLedger {
    pub fn new(storage: Storage) -> Self {
        Self { storage }
    }

    /// Atomically check `available >= qty` and decrement, in the caller's
    /// transaction. Products with no counter are treated as stock 0.
    pub fn reserve(
        &self,
        txn: &WriteTransaction,
        product_ref: &str,
        qty: u32,
    ) -> EngineResult<()> {
        let available = self
            .storage
            .stock_get_txn(txn, product_ref)?
            .unwrap_or(0);

        if available < qty {
            tracing::debug!(
                product_ref = %product_ref,
                available,
                requested = qty,
                "Reservation rejected"
            );
            return Err(EngineError::OutOfStock(product_ref.to_string()));
        }

        self.storage
            .stock_set_txn(txn, product_ref, available - qty)?;
        Ok(())
    }

    /// Credit `qty` back, in the caller's transaction
    ///
    /// Idempotent per `reservation_id`: a duplicate release is a no-op.
    pub fn release(
        &self,
        txn: &WriteTransaction,
        product_ref: &str,
        qty: u32,
        reservation_id: &str,
    ) -> EngineResult<()> {
        if self
            .storage
            .is_reservation_released_txn(txn, reservation_id)?
        {
            tracing::debug!(
                reservation_id = %reservation_id,
                "Duplicate release ignored"
            );
            return Ok(());
        }

        let available = self
            .storage
            .stock_get_txn(txn, product_ref)?
            .unwrap_or(0);
        self.storage
            .stock_set_txn(txn, product_ref, available + qty)?;
        self.storage
            .mark_reservation_released_txn(txn, reservation_id)?;
        Ok(())
    }

    /// Set the available stock for a product (staff provisioning)
    pub fn set_available(&self, product_ref: &str, qty: u32) -> EngineResult<()> {
        let txn = self.storage.begin_write()?;
        self.storage.stock_set_txn(&txn, product_ref, qty)?;
        txn.commit().map_err(super::storage::StorageError::from)?;
        Ok(())
    }

    /// Current available stock for a product
    pub fn available(&self, product_ref: &str) -> EngineResult<u32> {
        Ok(self.storage.stock_get(product_ref)?.unwrap_or(0))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ledger() -> InventoryLedger {
        InventoryLedger::new(Storage::open_in_memory().unwrap())
    }

    #[test]
    fn test_reserve_decrements_stock() {
        let ledger = ledger();
        ledger.set_available("p1", 10).unwrap();

        let txn = ledger.storage.begin_write().unwrap();
        ledger.reserve(&txn, "p1", 3).unwrap();
        txn.commit().unwrap();

        assert_eq!(ledger.available("p1").unwrap(), 7);
    }

    #[test]
    fn test_reserve_rejects_shortfall() {
        let ledger = ledger();
        ledger.set_available("p1", 2).unwrap();

        let txn = ledger.storage.begin_write().unwrap();
        let result = ledger.reserve(&txn, "p1", 3);
        assert!(matches!(result, Err(EngineError::OutOfStock(p)) if p == "p1"));
        drop(txn);

        // Nothing committed, stock unchanged
        assert_eq!(ledger.available("p1").unwrap(), 2);
    }

    #[test]
    fn test_unknown_product_is_out_of_stock() {
        let ledger = ledger();
        let txn = ledger.storage.begin_write().unwrap();
        assert!(matches!(
            ledger.reserve(&txn, "ghost", 1),
            Err(EngineError::OutOfStock(_))
        ));
    }

    #[test]
    fn test_reserve_exact_remaining() {
        let ledger = ledger();
        ledger.set_available("p1", 2).unwrap();

        let txn = ledger.storage.begin_write().unwrap();
        ledger.reserve(&txn, "p1", 2).unwrap();
        txn.commit().unwrap();

        assert_eq!(ledger.available("p1").unwrap(), 0);
    }

    #[test]
    fn test_release_is_idempotent_per_reservation() {
        let ledger = ledger();
        ledger.set_available("p1", 5).unwrap();

        let txn = ledger.storage.begin_write().unwrap();
        ledger.reserve(&txn, "p1", 2).unwrap();
        txn.commit().unwrap();
        assert_eq!(ledger.available("p1").unwrap(), 3);

        // First release credits the stock back
        let txn = ledger.storage.begin_write().unwrap();
        ledger.release(&txn, "p1", 2, "res-1").unwrap();
        txn.commit().unwrap();
        assert_eq!(ledger.available("p1").unwrap(), 5);

        // Retried compensation is a no-op
        let txn = ledger.storage.begin_write().unwrap();
        ledger.release(&txn, "p1", 2, "res-1").unwrap();
        txn.commit().unwrap();
        assert_eq!(ledger.available("p1").unwrap(), 5);
    }
}
