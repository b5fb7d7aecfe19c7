//! Money calculation utilities using rust_decimal for precision
//!
//! All price arithmetic is done with `Decimal` internally and converted to
//! `f64` only at the storage/serialization boundary. Prices are always
//! server-computed from catalog data; client-supplied amounts are never
//! trusted.

use rust_decimal::RoundingStrategy;
use rust_decimal::prelude::*;

use super::error::{EngineError, EngineResult};

/// Rounding: 2 decimal places, half away from zero
const DECIMAL_PLACES: u32 = 2;

/// Maximum allowed unit price
const MAX_PRICE: f64 = 1_000_000.0;
/// Maximum allowed quantity per line
const MAX_QUANTITY: u32 = 9999;
/// Maximum number of lines per order
const MAX_LINES: usize = 100;

/// Convert an f64 price to Decimal
pub fn to_decimal(value: f64) -> Decimal {
    Decimal::from_f64(value).unwrap_or_default()
}

/// Convert a Decimal back to f64 for storage
pub fn to_f64(value: Decimal) -> f64 {
    value.to_f64().unwrap_or(0.0)
}

/// Round to 2 decimal places, half away from zero
pub fn round2(value: Decimal) -> Decimal {
    value.round_dp_with_strategy(DECIMAL_PLACES, RoundingStrategy::MidpointAwayFromZero)
}

/// One re-priced order line, before discount
#[derive(Debug, Clone)]
pub struct PricedLine {
    pub product_ref: String,
    pub unit_price: f64,
    pub quantity: u32,
    /// Whether the order's coupon covers this line
    pub discountable: bool,
}

/// Server-computed price breakdown
#[derive(Debug, Clone, PartialEq)]
pub struct PriceBreakdown {
    pub items_price: f64,
    pub tax_price: f64,
    pub shipping_price: f64,
    pub total_price: f64,
}

/// Pricing policy (from config)
#[derive(Debug, Clone)]
pub struct PricingConfig {
    /// Tax percentage applied to the discounted items price
    pub tax_percent: f64,
    /// Flat shipping charge
    pub shipping_flat: f64,
    /// Items price at or above which shipping is free
    pub free_shipping_threshold: Option<f64>,
}

impl Default for PricingConfig {
    fn default() -> Self {
        Self {
            tax_percent: 15.0,
            shipping_flat: 50.0,
            free_shipping_threshold: Some(1000.0),
        }
    }
}

/// Validate one order line against sanity bounds
pub fn validate_line(product_ref: &str, unit_price: f64, quantity: u32) -> EngineResult<()> {
    if !unit_price.is_finite() || unit_price < 0.0 {
        return Err(EngineError::Validation(format!(
            "price for {} must be a non-negative finite number, got {}",
            product_ref, unit_price
        )));
    }
    if unit_price > MAX_PRICE {
        return Err(EngineError::Validation(format!(
            "price for {} exceeds maximum allowed ({})",
            product_ref, MAX_PRICE
        )));
    }
    if quantity == 0 {
        return Err(EngineError::Validation(format!(
            "quantity for {} must be positive",
            product_ref
        )));
    }
    if quantity > MAX_QUANTITY {
        return Err(EngineError::Validation(format!(
            "quantity for {} exceeds maximum allowed ({})",
            product_ref, MAX_QUANTITY
        )));
    }
    Ok(())
}

/// Compute the full price breakdown for an order
///
/// The discount percentage applies only to discountable lines. Tax applies
/// to the discounted items price; shipping is flat unless the items price
/// clears the free-shipping threshold. The returned fields always satisfy
/// `total = items + tax + shipping` exactly, at 2 decimal places.
pub fn compute_breakdown(
    lines: &[PricedLine],
    discount_percent: Option<f64>,
    pricing: &PricingConfig,
) -> EngineResult<PriceBreakdown> {
    if lines.is_empty() {
        return Err(EngineError::Validation("order has no items".to_string()));
    }
    if lines.len() > MAX_LINES {
        return Err(EngineError::Validation(format!(
            "order exceeds maximum of {} lines",
            MAX_LINES
        )));
    }

    let discount = match discount_percent {
        Some(pct) if (0.0..=100.0).contains(&pct) => to_decimal(pct) / Decimal::from(100),
        Some(pct) => {
            return Err(EngineError::Validation(format!(
                "discount percentage out of range: {}",
                pct
            )));
        }
        None => Decimal::ZERO,
    };

    let mut items_price = Decimal::ZERO;
    for line in lines {
        validate_line(&line.product_ref, line.unit_price, line.quantity)?;

        let mut line_total = to_decimal(line.unit_price) * Decimal::from(line.quantity);
        if line.discountable && !discount.is_zero() {
            line_total *= Decimal::ONE - discount;
        }
        items_price += round2(line_total);
    }

    let tax_price = round2(items_price * to_decimal(pricing.tax_percent) / Decimal::from(100));

    let free_shipping = pricing
        .free_shipping_threshold
        .map(|threshold| items_price >= to_decimal(threshold))
        .unwrap_or(false);
    let shipping_price = if free_shipping {
        Decimal::ZERO
    } else {
        round2(to_decimal(pricing.shipping_flat))
    };

    let total_price = items_price + tax_price + shipping_price;

    Ok(PriceBreakdown {
        items_price: to_f64(items_price),
        tax_price: to_f64(tax_price),
        shipping_price: to_f64(shipping_price),
        total_price: to_f64(total_price),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn line(product_ref: &str, unit_price: f64, quantity: u32, discountable: bool) -> PricedLine {
        PricedLine {
            product_ref: product_ref.to_string(),
            unit_price,
            quantity,
            discountable,
        }
    }

    fn pricing() -> PricingConfig {
        PricingConfig {
            tax_percent: 10.0,
            shipping_flat: 40.0,
            free_shipping_threshold: Some(500.0),
        }
    }

    #[test]
    fn test_breakdown_without_discount() {
        let lines = vec![line("p1", 100.0, 2, false), line("p2", 50.0, 1, false)];
        let b = compute_breakdown(&lines, None, &pricing()).unwrap();

        assert_eq!(b.items_price, 250.0);
        assert_eq!(b.tax_price, 25.0);
        assert_eq!(b.shipping_price, 40.0);
        assert_eq!(b.total_price, 315.0);
    }

    #[test]
    fn test_discount_applies_only_to_discountable_lines() {
        let lines = vec![line("p1", 100.0, 1, true), line("p2", 100.0, 1, false)];
        let b = compute_breakdown(&lines, Some(10.0), &pricing()).unwrap();

        // 90 + 100 items, 19 tax, 40 shipping
        assert_eq!(b.items_price, 190.0);
        assert_eq!(b.tax_price, 19.0);
        assert_eq!(b.total_price, 249.0);
    }

    #[test]
    fn test_free_shipping_threshold() {
        let lines = vec![line("p1", 500.0, 1, false)];
        let b = compute_breakdown(&lines, None, &pricing()).unwrap();
        assert_eq!(b.shipping_price, 0.0);

        let lines = vec![line("p1", 499.0, 1, false)];
        let b = compute_breakdown(&lines, None, &pricing()).unwrap();
        assert_eq!(b.shipping_price, 40.0);
    }

    #[test]
    fn test_total_invariant_holds_with_awkward_amounts() {
        let lines = vec![
            line("p1", 19.99, 3, true),
            line("p2", 0.05, 7, false),
            line("p3", 123.45, 1, true),
        ];
        let b = compute_breakdown(&lines, Some(12.5), &pricing()).unwrap();

        let total = to_decimal(b.items_price) + to_decimal(b.tax_price)
            + to_decimal(b.shipping_price);
        assert_eq!(to_f64(total), b.total_price);
    }

    #[test]
    fn test_empty_order_rejected() {
        assert!(matches!(
            compute_breakdown(&[], None, &pricing()),
            Err(EngineError::Validation(_))
        ));
    }

    #[test]
    fn test_zero_quantity_rejected() {
        let lines = vec![line("p1", 10.0, 0, false)];
        assert!(matches!(
            compute_breakdown(&lines, None, &pricing()),
            Err(EngineError::Validation(_))
        ));
    }

    #[test]
    fn test_non_finite_price_rejected() {
        let lines = vec![line("p1", f64::NAN, 1, false)];
        assert!(compute_breakdown(&lines, None, &pricing()).is_err());
        let lines = vec![line("p1", f64::INFINITY, 1, false)];
        assert!(compute_breakdown(&lines, None, &pricing()).is_err());
    }

    #[test]
    fn test_out_of_range_discount_rejected() {
        let lines = vec![line("p1", 10.0, 1, true)];
        assert!(compute_breakdown(&lines, Some(101.0), &pricing()).is_err());
        assert!(compute_breakdown(&lines, Some(-1.0), &pricing()).is_err());
    }

    #[test]
    fn test_hundred_percent_discount() {
        let lines = vec![line("p1", 10.0, 2, true)];
        let b = compute_breakdown(&lines, Some(100.0), &pricing()).unwrap();
        assert_eq!(b.items_price, 0.0);
        assert_eq!(b.tax_price, 0.0);
        assert_eq!(b.shipping_price, 40.0);
        assert_eq!(b.total_price, 40.0);
    }
}
