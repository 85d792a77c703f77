//! Money and quantity rounding.
//!
//! CRITICAL: Never use floating-point for money calculations.
//! Amounts are `rust_decimal::Decimal` end to end; these helpers fix the
//! scale at which they are stored and compared.

use rust_decimal::{Decimal, RoundingStrategy};

/// Decimal places kept for monetary amounts.
pub const MONEY_SCALE: u32 = 2;

/// Decimal places kept for stock quantities.
pub const QUANTITY_SCALE: u32 = 4;

/// Decimal places kept for per-unit costs.
pub const UNIT_COST_SCALE: u32 = 4;

/// Rounds a monetary amount to cents using Banker's Rounding.
#[must_use]
pub fn round_money(amount: Decimal) -> Decimal {
    amount.round_dp_with_strategy(MONEY_SCALE, RoundingStrategy::MidpointNearestEven)
}

/// Rounds a per-unit cost to the stored cost scale.
#[must_use]
pub fn round_unit_cost(cost: Decimal) -> Decimal {
    cost.round_dp_with_strategy(UNIT_COST_SCALE, RoundingStrategy::MidpointNearestEven)
}

/// Rounds a quantity to the stored quantity scale.
#[must_use]
pub fn round_quantity(quantity: Decimal) -> Decimal {
    quantity.round_dp_with_strategy(QUANTITY_SCALE, RoundingStrategy::MidpointNearestEven)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_round_money_bankers() {
        assert_eq!(round_money(dec!(10.125)), dec!(10.12));
        assert_eq!(round_money(dec!(10.135)), dec!(10.14));
        assert_eq!(round_money(dec!(10.1251)), dec!(10.13));
        assert_eq!(round_money(dec!(-0.005)), dec!(0.00));
    }

    #[test]
    fn test_round_money_keeps_exact_values() {
        assert_eq!(round_money(dec!(1240)), dec!(1240));
        assert_eq!(round_money(dec!(99.99)), dec!(99.99));
    }

    #[test]
    fn test_round_unit_cost() {
        assert_eq!(round_unit_cost(dec!(106.666666)), dec!(106.6667));
        assert_eq!(round_unit_cost(dec!(0.00005)), dec!(0.0000));
    }

    #[test]
    fn test_round_quantity() {
        assert_eq!(round_quantity(dec!(1.23456)), dec!(1.2346));
        assert_eq!(round_quantity(dec!(3)), dec!(3));
    }
}
