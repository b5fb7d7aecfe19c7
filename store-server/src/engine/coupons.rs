//! Coupon Redemption Counter
//!
//! One usage counter per coupon code. `consume` re-checks the limit and
//! increments `used_count` inside the caller's write transaction, never as
//! a separate check-then-increment, so two concurrent checkouts cannot both
//! take the last remaining slot.

use chrono::{DateTime, Utc};
use redb::WriteTransaction;
use shared::models::Coupon;

use super::error::{CouponError, EngineError, EngineResult};
use super::storage::Storage;

/// Per-coupon redemption counters with atomic validate+consume
#[derive(Debug, Clone)]
pub struct CouponLedger {
    storage: Storage,
}

/// Pure validation against a loaded coupon
///
/// Returns the discount percentage on success. Checks run in a fixed order
/// so the caller always learns the most specific failure: existence is the
/// caller's concern, then active flag, validity window, remaining uses,
/// applicability.
fn check(coupon: &Coupon, product_refs: &[String], now: DateTime<Utc>) -> Result<f64, CouponError> {
    if !coupon.is_active {
        return Err(CouponError::Inactive(coupon.code.clone()));
    }
    if !coupon.in_validity_window(now) {
        return Err(CouponError::Expired(coupon.code.clone()));
    }
    if !coupon.has_remaining_uses() {
        return Err(CouponError::Exhausted(coupon.code.clone()));
    }
    if !coupon.applies_to_any(product_refs) {
        return Err(CouponError::NotApplicable(coupon.code.clone()));
    }
    Ok(coupon.discount_percent)
}

impl CouponLedger {
    pub fn new(storage: Storage) -> Self {
        Self { storage }
    }

    /// Validate a coupon without consuming a slot (read-only)
    pub fn validate(
        &self,
        code: &str,
        product_refs: &[String],
        now: DateTime<Utc>,
    ) -> EngineResult<f64> {
        let coupon = self
            .storage
            .get_coupon(code)?
            .ok_or_else(|| CouponError::NotFound(code.to_string()))?;
        Ok(check(&coupon, product_refs, now)?)
    }

    /// Re-validate and consume one usage slot, in the caller's transaction
    ///
    /// Returns the consumed coupon (with the discount percentage snapshot
    /// the order should record).
    pub fn consume(
        &self,
        txn: &WriteTransaction,
        code: &str,
        product_refs: &[String],
        now: DateTime<Utc>,
    ) -> EngineResult<Coupon> {
        let mut coupon = self
            .storage
            .get_coupon_txn(txn, code)?
            .ok_or_else(|| CouponError::NotFound(code.to_string()))?;

        check(&coupon, product_refs, now)?;

        coupon.used_count += 1;
        self.storage.store_coupon_txn(txn, &coupon)?;

        tracing::debug!(
            code = %coupon.code,
            used_count = coupon.used_count,
            usage_limit = ?coupon.usage_limit,
            "Coupon slot consumed"
        );
        Ok(coupon)
    }

    /// Create or replace a coupon (staff provisioning)
    pub fn upsert(&self, coupon: &Coupon) -> EngineResult<()> {
        if !(0.0..=100.0).contains(&coupon.discount_percent) {
            return Err(EngineError::Validation(format!(
                "discount_percent must be between 0 and 100, got {}",
                coupon.discount_percent
            )));
        }
        let txn = self.storage.begin_write()?;
        self.storage.store_coupon_txn(&txn, coupon)?;
        txn.commit().map_err(super::storage::StorageError::from)?;
        Ok(())
    }

    /// Look up a coupon by code
    pub fn get(&self, code: &str) -> EngineResult<Option<Coupon>> {
        Ok(self.storage.get_coupon(code)?)
    }
}
