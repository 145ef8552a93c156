//! Money helpers using rust_decimal
//!
//! Order totals are stored as 2-place decimals; the payment gateway speaks
//! integer minor units (kobo/cents).

use rust_decimal::prelude::*;

/// Rounding precision for monetary values
const DECIMAL_PLACES: u32 = 2;

/// Minor units per major unit
const MINOR_UNITS: i64 = 100;

/// Round a monetary value to 2 decimal places, half away from zero
#[inline]
pub fn round_money(value: Decimal) -> Decimal {
    value.round_dp_with_strategy(DECIMAL_PLACES, RoundingStrategy::MidpointAwayFromZero)
}

/// Line total for `quantity` units at `unit_price`
#[inline]
pub fn line_total(unit_price: Decimal, quantity: u32) -> Decimal {
    round_money(unit_price * Decimal::from(quantity))
}

/// Convert a major-unit amount into gateway minor units (amount × 100, rounded).
///
/// Returns `None` when the value does not fit in an `i64`.
pub fn to_minor_units(amount: Decimal) -> Option<i64> {
    (amount * Decimal::from(MINOR_UNITS))
        .round_dp_with_strategy(0, RoundingStrategy::MidpointAwayFromZero)
        .to_i64()
}

/// Convert gateway minor units back into a 2-place decimal amount
#[inline]
pub fn from_minor_units(minor: i64) -> Decimal {
    Decimal::new(minor, DECIMAL_PLACES)
}

/// True when a gateway-reported payment covers the order total.
///
/// Over-payment is accepted.
pub fn covers_total(paid_minor: i64, total: Decimal) -> bool {
    from_minor_units(paid_minor) >= round_money(total)
}
