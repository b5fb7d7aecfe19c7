//! redb-based storage layer for the consistency engine
//!
//! # Tables
//!
//! | Table | Key | Value | Purpose |
//! |-------|-----|-------|---------|
//! | `orders` | `order_id` | `Order` | Order records |
//! | `stock` | `product_ref` | `u32` | Available-stock counters |
//! | `released_reservations` | `reservation_id` | `()` | Release idempotency guard |
//! | `coupons` | `code` | `Coupon` | Coupons with usage counters |
//! | `history` | `(order_id, seq)` | `TransitionRecord` | Append-only transition log |
//! | `outbox` | `seq` | `OutboxEntry` | Pending notification queue |
//! | `dead_letter` | `seq` | `OutboxEntry` | Permanently failed notifications |
//! | `counters` | `&str` | `u64` | Order number / outbox sequence |
//!
//! # Durability
//!
//! redb commits are persistent as soon as `commit()` returns, using
//! copy-on-write with an atomic pointer swap, so the database file is always
//! in a consistent state across power loss.
//!
//! # Atomicity
//!
//! A single `WriteTransaction` is the engine's atomic check-and-update
//! primitive. Every multi-step operation (reserve stock, consume a coupon
//! slot, persist the order, enqueue its event) runs inside one transaction;
//! dropping the transaction without committing undoes all of it.

use redb::{
    Database, ReadableDatabase, ReadableTable, TableDefinition, WriteTransaction,
};
use shared::models::{Coupon, Order, TransitionRecord};
use shared::LifecycleEvent;
use std::path::Path;
use std::sync::Arc;
use thiserror::Error;

/// Order records: key = order_id, value = JSON-serialized Order
const ORDERS_TABLE: TableDefinition<&str, &[u8]> = TableDefinition::new("orders");

/// Available stock counters: key = product_ref, value = units on hand
const STOCK_TABLE: TableDefinition<&str, u32> = TableDefinition::new("stock");

/// Released reservations: key = reservation_id, value = empty (idempotency)
const RELEASED_TABLE: TableDefinition<&str, ()> =
    TableDefinition::new("released_reservations");

/// Coupons: key = code, value = JSON-serialized Coupon
const COUPONS_TABLE: TableDefinition<&str, &[u8]> = TableDefinition::new("coupons");

/// Transition history: key = (order_id, seq), value = JSON-serialized TransitionRecord
const HISTORY_TABLE: TableDefinition<(&str, u64), &[u8]> = TableDefinition::new("history");

/// Notification outbox: key = global seq, value = JSON-serialized OutboxEntry
const OUTBOX_TABLE: TableDefinition<u64, &[u8]> = TableDefinition::new("outbox");

/// Dead letter queue: key = global seq, value = JSON-serialized OutboxEntry
const DEAD_LETTER_TABLE: TableDefinition<u64, &[u8]> = TableDefinition::new("dead_letter");

/// Counters: key = counter name, value = u64
const COUNTERS_TABLE: TableDefinition<&str, u64> = TableDefinition::new("counters");

const ORDER_COUNT_KEY: &str = "order_count";
const OUTBOX_SEQ_KEY: &str = "outbox_seq";

/// Pending notification queue entry
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct OutboxEntry {
    pub seq: u64,
    pub event: LifecycleEvent,
    pub created_at: i64,
    pub retry_count: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_error: Option<String>,
}

/// Storage errors
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("Database error: {0}")]
    Database(#[from] redb::DatabaseError),

    #[error("Transaction error: {0}")]
    Transaction(#[from] redb::TransactionError),

    #[error("Table error: {0}")]
    Table(#[from] redb::TableError),

    #[error("Storage error: {0}")]
    Storage(#[from] redb::StorageError),

    #[error("Commit error: {0}")]
    Commit(#[from] redb::CommitError),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Order not found: {0}")]
    OrderNotFound(String),
}

pub type StorageResult<T> = Result<T, StorageError>;

/// Engine storage backed by redb
#[derive(Clone)]
pub struct Storage {
    db: Arc<Database>,
}

impl Storage {
    /// Open or create the database at the given path
    pub fn open(path: impl AsRef<Path>) -> StorageResult<Self> {
        let db = Database::create(path)?;
        let storage = Self { db: Arc::new(db) };
        storage.init_tables()?;
        Ok(storage)
    }

    /// Open an in-memory database (for testing)
    #[cfg(test)]
    pub fn open_in_memory() -> StorageResult<Self> {
        let db = Database::builder().create_with_backend(redb::backends::InMemoryBackend::new())?;
        let storage = Self { db: Arc::new(db) };
        storage.init_tables()?;
        Ok(storage)
    }

    /// Create all tables so later read transactions never miss one
    fn init_tables(&self) -> StorageResult<()> {
        let write_txn = self.db.begin_write()?;
        {
            let _ = write_txn.open_table(ORDERS_TABLE)?;
            let _ = write_txn.open_table(STOCK_TABLE)?;
            let _ = write_txn.open_table(RELEASED_TABLE)?;
            let _ = write_txn.open_table(COUPONS_TABLE)?;
            let _ = write_txn.open_table(HISTORY_TABLE)?;
            let _ = write_txn.open_table(OUTBOX_TABLE)?;
            let _ = write_txn.open_table(DEAD_LETTER_TABLE)?;
            let _ = write_txn.open_table(COUNTERS_TABLE)?;
        }
        write_txn.commit()?;
        Ok(())
    }

    /// Begin a write transaction
    pub fn begin_write(&self) -> StorageResult<WriteTransaction> {
        Ok(self.db.begin_write()?)
    }

    // ========== Counters ==========

    /// Increment and return the order counter (within transaction)
    pub fn next_order_count_txn(&self, txn: &WriteTransaction) -> StorageResult<u64> {
        let mut table = txn.open_table(COUNTERS_TABLE)?;
        let current = table
            .get(ORDER_COUNT_KEY)?
            .map(|g| g.value())
            .unwrap_or(0);
        let next = current + 1;
        table.insert(ORDER_COUNT_KEY, next)?;
        Ok(next)
    }

    // ========== Orders ==========

    /// Store an order record (within transaction)
    pub fn store_order_txn(&self, txn: &WriteTransaction, order: &Order) -> StorageResult<()> {
        let mut table = txn.open_table(ORDERS_TABLE)?;
        let value = serde_json::to_vec(order)?;
        table.insert(order.id.as_str(), value.as_slice())?;
        Ok(())
    }

    /// Get an order by ID
    pub fn get_order(&self, order_id: &str) -> StorageResult<Option<Order>> {
        let read_txn = self.db.begin_read()?;
        let table = read_txn.open_table(ORDERS_TABLE)?;

        match table.get(order_id)? {
            Some(value) => {
                let order: Order = serde_json::from_slice(value.value())?;
                Ok(Some(order))
            }
            None => Ok(None),
        }
    }

    /// Get an order by ID (within transaction)
    pub fn get_order_txn(
        &self,
        txn: &WriteTransaction,
        order_id: &str,
    ) -> StorageResult<Option<Order>> {
        let table = txn.open_table(ORDERS_TABLE)?;

        match table.get(order_id)? {
            Some(value) => {
                let order: Order = serde_json::from_slice(value.value())?;
                Ok(Some(order))
            }
            None => Ok(None),
        }
    }

    /// Get all orders
    pub fn get_all_orders(&self) -> StorageResult<Vec<Order>> {
        let read_txn = self.db.begin_read()?;
        let table = read_txn.open_table(ORDERS_TABLE)?;

        let mut orders = Vec::new();
        for result in table.iter()? {
            let (_key, value) = result?;
            let order: Order = serde_json::from_slice(value.value())?;
            orders.push(order);
        }

        Ok(orders)
    }

    // ========== Stock Counters ==========

    /// Get available stock for a product (within transaction)
    pub fn stock_get_txn(
        &self,
        txn: &WriteTransaction,
        product_ref: &str,
    ) -> StorageResult<Option<u32>> {
        let table = txn.open_table(STOCK_TABLE)?;
        Ok(table.get(product_ref)?.map(|g| g.value()))
    }

    /// Set available stock for a product (within transaction)
    pub fn stock_set_txn(
        &self,
        txn: &WriteTransaction,
        product_ref: &str,
        qty: u32,
    ) -> StorageResult<()> {
        let mut table = txn.open_table(STOCK_TABLE)?;
        table.insert(product_ref, qty)?;
        Ok(())
    }

    /// Get available stock for a product (read-only)
    pub fn stock_get(&self, product_ref: &str) -> StorageResult<Option<u32>> {
        let read_txn = self.db.begin_read()?;
        let table = read_txn.open_table(STOCK_TABLE)?;
        Ok(table.get(product_ref)?.map(|g| g.value()))
    }

    /// Check whether a reservation was already released (within transaction)
    pub fn is_reservation_released_txn(
        &self,
        txn: &WriteTransaction,
        reservation_id: &str,
    ) -> StorageResult<bool> {
        let table = txn.open_table(RELEASED_TABLE)?;
        Ok(table.get(reservation_id)?.is_some())
    }

    /// Mark a reservation as released (within transaction)
    pub fn mark_reservation_released_txn(
        &self,
        txn: &WriteTransaction,
        reservation_id: &str,
    ) -> StorageResult<()> {
        let mut table = txn.open_table(RELEASED_TABLE)?;
        table.insert(reservation_id, ())?;
        Ok(())
    }

    // ========== Coupons ==========

    /// Store a coupon (within transaction)
    pub fn store_coupon_txn(&self, txn: &WriteTransaction, coupon: &Coupon) -> StorageResult<()> {
        let mut table = txn.open_table(COUPONS_TABLE)?;
        let value = serde_json::to_vec(coupon)?;
        table.insert(coupon.code.as_str(), value.as_slice())?;
        Ok(())
    }

    /// Get a coupon by code (within transaction)
    pub fn get_coupon_txn(
        &self,
        txn: &WriteTransaction,
        code: &str,
    ) -> StorageResult<Option<Coupon>> {
        let table = txn.open_table(COUPONS_TABLE)?;

        match table.get(code)? {
            Some(value) => {
                let coupon: Coupon = serde_json::from_slice(value.value())?;
                Ok(Some(coupon))
            }
            None => Ok(None),
        }
    }

    /// Get a coupon by code (read-only)
    pub fn get_coupon(&self, code: &str) -> StorageResult<Option<Coupon>> {
        let read_txn = self.db.begin_read()?;
        let table = read_txn.open_table(COUPONS_TABLE)?;

        match table.get(code)? {
            Some(value) => {
                let coupon: Coupon = serde_json::from_slice(value.value())?;
                Ok(Some(coupon))
            }
            None => Ok(None),
        }
    }

    // ========== Transition History ==========

    /// Append a transition record (within transaction)
    pub fn append_history_txn(
        &self,
        txn: &WriteTransaction,
        record: &TransitionRecord,
    ) -> StorageResult<()> {
        let mut table = txn.open_table(HISTORY_TABLE)?;
        let key = (record.order_id.as_str(), record.seq);
        let value = serde_json::to_vec(record)?;
        table.insert(key, value.as_slice())?;
        Ok(())
    }

    /// Get the latest transition record for an order (within transaction)
    ///
    /// Used to chain the next record's prev_hash and sequence.
    pub fn last_history_txn(
        &self,
        txn: &WriteTransaction,
        order_id: &str,
    ) -> StorageResult<Option<TransitionRecord>> {
        let table = txn.open_table(HISTORY_TABLE)?;

        let range_start = (order_id, 0u64);
        let range_end = (order_id, u64::MAX);

        let mut last = None;
        for result in table.range(range_start..=range_end)? {
            let (_key, value) = result?;
            let record: TransitionRecord = serde_json::from_slice(value.value())?;
            last = Some(record);
        }

        Ok(last)
    }

    /// Get the full transition history for an order
    pub fn get_history(&self, order_id: &str) -> StorageResult<Vec<TransitionRecord>> {
        let read_txn = self.db.begin_read()?;
        let table = read_txn.open_table(HISTORY_TABLE)?;

        let mut records = Vec::new();
        let range_start = (order_id, 0u64);
        let range_end = (order_id, u64::MAX);

        for result in table.range(range_start..=range_end)? {
            let (_key, value) = result?;
            let record: TransitionRecord = serde_json::from_slice(value.value())?;
            records.push(record);
        }

        records.sort_by_key(|r| r.seq);
        Ok(records)
    }

    // ========== Notification Outbox ==========

    /// Enqueue a lifecycle event (within transaction)
    ///
    /// Returns the assigned outbox sequence.
    pub fn enqueue_outbox_txn(
        &self,
        txn: &WriteTransaction,
        event: &LifecycleEvent,
    ) -> StorageResult<u64> {
        let seq = {
            let mut counters = txn.open_table(COUNTERS_TABLE)?;
            let current = counters
                .get(OUTBOX_SEQ_KEY)?
                .map(|g| g.value())
                .unwrap_or(0);
            let next = current + 1;
            counters.insert(OUTBOX_SEQ_KEY, next)?;
            next
        };

        let entry = OutboxEntry {
            seq,
            event: event.clone(),
            created_at: shared::util::now_millis(),
            retry_count: 0,
            last_error: None,
        };

        let mut table = txn.open_table(OUTBOX_TABLE)?;
        let value = serde_json::to_vec(&entry)?;
        table.insert(seq, value.as_slice())?;
        Ok(seq)
    }

    /// Get all pending outbox entries, in sequence order
    pub fn get_pending_outbox(&self) -> StorageResult<Vec<OutboxEntry>> {
        let read_txn = self.db.begin_read()?;
        let table = read_txn.open_table(OUTBOX_TABLE)?;

        let mut entries = Vec::new();
        for result in table.iter()? {
            let (_key, value) = result?;
            let entry: OutboxEntry = serde_json::from_slice(value.value())?;
            entries.push(entry);
        }

        entries.sort_by_key(|e| e.seq);
        Ok(entries)
    }

    /// Remove an outbox entry after successful delivery
    pub fn complete_outbox(&self, seq: u64) -> StorageResult<()> {
        let txn = self.db.begin_write()?;
        {
            let mut table = txn.open_table(OUTBOX_TABLE)?;
            table.remove(seq)?;
        }
        txn.commit()?;
        Ok(())
    }

    /// Record a delivery failure, keeping the entry for retry
    pub fn mark_outbox_failed(&self, seq: u64, error: &str) -> StorageResult<()> {
        let txn = self.db.begin_write()?;
        {
            let mut table = txn.open_table(OUTBOX_TABLE)?;
            let entry = match table.get(seq)? {
                Some(value) => {
                    let mut entry: OutboxEntry = serde_json::from_slice(value.value())?;
                    entry.retry_count += 1;
                    entry.last_error = Some(error.to_string());
                    Some(entry)
                }
                None => None,
            };
            if let Some(entry) = entry {
                let value = serde_json::to_vec(&entry)?;
                table.insert(seq, value.as_slice())?;
            }
        }
        txn.commit()?;
        Ok(())
    }

    /// Move a permanently failed entry to the dead letter queue
    pub fn move_to_dead_letter(&self, seq: u64, error: &str) -> StorageResult<()> {
        let txn = self.db.begin_write()?;
        {
            let mut outbox = txn.open_table(OUTBOX_TABLE)?;
            let entry = match outbox.remove(seq)? {
                Some(value) => {
                    let mut entry: OutboxEntry = serde_json::from_slice(value.value())?;
                    entry.last_error = Some(error.to_string());
                    Some(entry)
                }
                None => None,
            };
            if let Some(entry) = entry {
                let mut dead = txn.open_table(DEAD_LETTER_TABLE)?;
                let value = serde_json::to_vec(&entry)?;
                dead.insert(seq, value.as_slice())?;
            }
        }
        txn.commit()?;
        Ok(())
    }

    /// Move all dead letter entries back to the pending queue
    ///
    /// Called on startup so previously failed notifications get another
    /// round of retries. Returns the number of recovered entries.
    pub fn recover_dead_letters(&self) -> StorageResult<usize> {
        let txn = self.db.begin_write()?;
        let count = {
            let mut dead = txn.open_table(DEAD_LETTER_TABLE)?;
            let mut outbox = txn.open_table(OUTBOX_TABLE)?;

            let mut entries = Vec::new();
            for result in dead.iter()? {
                let (key, value) = result?;
                let mut entry: OutboxEntry = serde_json::from_slice(value.value())?;
                entry.retry_count = 0;
                entries.push((key.value(), entry));
            }

            for (seq, entry) in &entries {
                let value = serde_json::to_vec(entry)?;
                outbox.insert(*seq, value.as_slice())?;
                dead.remove(*seq)?;
            }

            entries.len()
        };
        txn.commit()?;
        Ok(count)
    }

    /// Get all dead letter entries
    pub fn get_dead_letters(&self) -> StorageResult<Vec<OutboxEntry>> {
        let read_txn = self.db.begin_read()?;
        let table = read_txn.open_table(DEAD_LETTER_TABLE)?;

        let mut entries = Vec::new();
        for result in table.iter()? {
            let (_key, value) = result?;
            let entry: OutboxEntry = serde_json::from_slice(value.value())?;
            entries.push(entry);
        }

        Ok(entries)
    }
}

impl std::fmt::Debug for Storage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Storage").finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use shared::{EventType, LifecycleEvent};

    #[test]
    fn test_stock_roundtrip() {
        let storage = Storage::open_in_memory().unwrap();

        let txn = storage.begin_write().unwrap();
        storage.stock_set_txn(&txn, "product-1", 5).unwrap();
        txn.commit().unwrap();

        assert_eq!(storage.stock_get("product-1").unwrap(), Some(5));
        assert_eq!(storage.stock_get("product-2").unwrap(), None);
    }

    #[test]
    fn test_dropped_transaction_leaves_no_trace() {
        let storage = Storage::open_in_memory().unwrap();

        {
            let txn = storage.begin_write().unwrap();
            storage.stock_set_txn(&txn, "product-1", 5).unwrap();
            // No commit: dropped on scope exit
        }

        assert_eq!(storage.stock_get("product-1").unwrap(), None);
    }

    #[test]
    fn test_order_counter_increments() {
        let storage = Storage::open_in_memory().unwrap();

        let txn = storage.begin_write().unwrap();
        assert_eq!(storage.next_order_count_txn(&txn).unwrap(), 1);
        assert_eq!(storage.next_order_count_txn(&txn).unwrap(), 2);
        txn.commit().unwrap();

        let txn = storage.begin_write().unwrap();
        assert_eq!(storage.next_order_count_txn(&txn).unwrap(), 3);
        txn.commit().unwrap();
    }

    #[test]
    fn test_outbox_lifecycle() {
        let storage = Storage::open_in_memory().unwrap();

        let event = LifecycleEvent::new(EventType::OrderCreated, "o-1", "c-1", None);
        let txn = storage.begin_write().unwrap();
        let seq = storage.enqueue_outbox_txn(&txn, &event).unwrap();
        txn.commit().unwrap();

        let pending = storage.get_pending_outbox().unwrap();
        assert_eq!(pending.len(), 1);
        assert_eq!(pending[0].seq, seq);
        assert_eq!(pending[0].retry_count, 0);

        storage.mark_outbox_failed(seq, "connection refused").unwrap();
        let pending = storage.get_pending_outbox().unwrap();
        assert_eq!(pending[0].retry_count, 1);
        assert_eq!(pending[0].last_error.as_deref(), Some("connection refused"));

        storage.move_to_dead_letter(seq, "gave up").unwrap();
        assert!(storage.get_pending_outbox().unwrap().is_empty());
        assert_eq!(storage.get_dead_letters().unwrap().len(), 1);

        let recovered = storage.recover_dead_letters().unwrap();
        assert_eq!(recovered, 1);
        let pending = storage.get_pending_outbox().unwrap();
        assert_eq!(pending.len(), 1);
        assert_eq!(pending[0].retry_count, 0);

        storage.complete_outbox(seq).unwrap();
        assert!(storage.get_pending_outbox().unwrap().is_empty());
    }

    #[test]
    fn test_state_survives_reopen() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("store.db");

        {
            let storage = Storage::open(&path).unwrap();
            let txn = storage.begin_write().unwrap();
            storage.stock_set_txn(&txn, "p1", 7).unwrap();
            txn.commit().unwrap();
        }

        let storage = Storage::open(&path).unwrap();
        assert_eq!(storage.stock_get("p1").unwrap(), Some(7));
    }

    #[test]
    fn test_history_range_is_per_order() {
        let storage = Storage::open_in_memory().unwrap();

        let txn = storage.begin_write().unwrap();
        for (order_id, seq) in [("o-1", 1u64), ("o-1", 2), ("o-2", 1)] {
            let record = shared::models::TransitionRecord::new(
                seq,
                order_id,
                1_700_000_000_000,
                "staff-1",
                "status",
                "PENDING",
                "PROCESSING",
                shared::models::transition::GENESIS_HASH,
            );
            storage.append_history_txn(&txn, &record).unwrap();
        }
        txn.commit().unwrap();

        assert_eq!(storage.get_history("o-1").unwrap().len(), 2);
        assert_eq!(storage.get_history("o-2").unwrap().len(), 1);
        assert!(storage.get_history("o-3").unwrap().is_empty());

        let txn = storage.begin_write().unwrap();
        let last = storage.last_history_txn(&txn, "o-1").unwrap().unwrap();
        assert_eq!(last.seq, 2);
    }
}
