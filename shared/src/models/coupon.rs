//! Coupon model

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Discount coupon with a bounded redemption counter
///
/// `used_count` is only ever advanced through the coupon ledger's atomic
/// consume step; it never exceeds `usage_limit` when one is set.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Coupon {
    /// Unique code, uppercase by convention
    pub code: String,
    /// Percentage off applicable line totals (0-100)
    pub discount_percent: f64,
    /// Product refs this coupon applies to; empty = all products
    #[serde(default)]
    pub applicable_products: Vec<String>,
    pub is_active: bool,
    /// Maximum redemptions; None = unlimited
    #[serde(skip_serializing_if = "Option::is_none")]
    pub usage_limit: Option<u32>,
    #[serde(default)]
    pub used_count: u32,
    pub valid_from: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub valid_until: Option<DateTime<Utc>>,
}

impl Coupon {
    /// Whether `now` falls inside the validity window
    pub fn in_validity_window(&self, now: DateTime<Utc>) -> bool {
        if now < self.valid_from {
            return false;
        }
        match self.valid_until {
            Some(until) => now <= until,
            None => true,
        }
    }

    /// Whether at least one more redemption is allowed
    pub fn has_remaining_uses(&self) -> bool {
        match self.usage_limit {
            Some(limit) => self.used_count < limit,
            None => true,
        }
    }

    /// Whether the coupon covers any of the given product refs
    pub fn applies_to_any(&self, product_refs: &[String]) -> bool {
        if self.applicable_products.is_empty() {
            return true;
        }
        product_refs
            .iter()
            .any(|p| self.applicable_products.contains(p))
    }

    /// Whether the coupon covers one specific product ref
    pub fn applies_to(&self, product_ref: &str) -> bool {
        self.applicable_products.is_empty()
            || self.applicable_products.iter().any(|p| p == product_ref)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn coupon() -> Coupon {
        Coupon {
            code: "SAVE10".to_string(),
            discount_percent: 10.0,
            applicable_products: vec![],
            is_active: true,
            usage_limit: Some(2),
            used_count: 0,
            valid_from: Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap(),
            valid_until: Some(Utc.with_ymd_and_hms(2024, 12, 31, 23, 59, 59).unwrap()),
        }
    }

    #[test]
    fn test_validity_window() {
        let c = coupon();
        let inside = Utc.with_ymd_and_hms(2024, 6, 1, 12, 0, 0).unwrap();
        let before = Utc.with_ymd_and_hms(2023, 12, 31, 23, 59, 59).unwrap();
        let after = Utc.with_ymd_and_hms(2025, 1, 1, 0, 0, 0).unwrap();

        assert!(c.in_validity_window(inside));
        assert!(!c.in_validity_window(before));
        assert!(!c.in_validity_window(after));
    }

    #[test]
    fn test_open_ended_validity() {
        let mut c = coupon();
        c.valid_until = None;
        let far_future = Utc.with_ymd_and_hms(2099, 1, 1, 0, 0, 0).unwrap();
        assert!(c.in_validity_window(far_future));
    }

    #[test]
    fn test_remaining_uses() {
        let mut c = coupon();
        assert!(c.has_remaining_uses());
        c.used_count = 2;
        assert!(!c.has_remaining_uses());
        c.usage_limit = None;
        assert!(c.has_remaining_uses());
    }

    #[test]
    fn test_applicability() {
        let mut c = coupon();
        // Empty set = all products
        assert!(c.applies_to_any(&["anything".to_string()]));

        c.applicable_products = vec!["p1".to_string(), "p2".to_string()];
        assert!(c.applies_to_any(&["p2".to_string(), "p9".to_string()]));
        assert!(!c.applies_to_any(&["p9".to_string()]));
        assert!(c.applies_to("p1"));
        assert!(!c.applies_to("p9"));
    }
}
