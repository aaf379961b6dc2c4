//! Money calculation helpers using rust_decimal for precision
//!
//! All arithmetic happens on `Decimal`; values are stored and sent as `f64`
//! rounded to 2 decimal places (half away from zero).

use rust_decimal::prelude::*;

use super::types::LineItem;

const DECIMAL_PLACES: u32 = 2;

/// Maximum allowed price per item
pub const MAX_PRICE: f64 = 1_000_000.0;
/// Maximum allowed quantity per line
pub const MAX_QUANTITY: i32 = 9999;

/// Tolerance for monetary comparisons (0.01)
pub const MONEY_TOLERANCE: Decimal = Decimal::from_parts(1, 0, 0, false, 2);

/// Convert f64 to Decimal, non-finite input becomes zero
#[inline]
pub fn to_decimal(value: f64) -> Decimal {
    Decimal::from_f64(value).unwrap_or_else(|| {
        tracing::error!(value = ?value, "Non-finite f64 in monetary calculation, defaulting to zero");
        Decimal::ZERO
    })
}

/// Convert Decimal back to f64 for storage, rounded to 2 decimal places
#[inline]
pub fn to_f64(value: Decimal) -> f64 {
    value
        .round_dp_with_strategy(DECIMAL_PLACES, RoundingStrategy::MidpointAwayFromZero)
        .to_f64()
        .unwrap_or_default()
}

/// Validate that a f64 value is finite (not NaN, not Infinity)
#[inline]
fn require_finite(value: f64, field_name: &str) -> Result<(), String> {
    if !value.is_finite() {
        return Err(format!("{} must be a finite number, got {}", field_name, value));
    }
    Ok(())
}

/// Validate a line item before it reaches any money arithmetic
pub fn validate_line_item(item: &LineItem) -> Result<(), String> {
    require_finite(item.price, "price")?;
    if item.price < 0.0 {
        return Err(format!("item {}: price must be non-negative, got {}", item.id, item.price));
    }
    if item.price > MAX_PRICE {
        return Err(format!(
            "item {}: price exceeds maximum allowed ({}), got {}",
            item.id, MAX_PRICE, item.price
        ));
    }

    if item.quantity <= 0 {
        return Err(format!(
            "item {}: quantity must be positive, got {}",
            item.id, item.quantity
        ));
    }
    if item.quantity > MAX_QUANTITY {
        return Err(format!(
            "item {}: quantity exceeds maximum allowed ({}), got {}",
            item.id, MAX_QUANTITY, item.quantity
        ));
    }
    Ok(())
}

/// Two amounts differ by less than a cent
pub fn money_eq(a: f64, b: f64) -> bool {
    (to_decimal(a) - to_decimal(b)).abs() < MONEY_TOLERANCE
}
