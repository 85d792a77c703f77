//! Flat-rate tax.
//!
//! A document carries one percentage (`11` = 11%). Exclusive documents add
//! tax on top of the line totals; inclusive documents carve it out of them.
//! All amounts are rounded to cents with Banker's Rounding, and the tax is
//! always `total - net` so the three figures add up exactly.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use tradebook_shared::round_money;

use super::error::LifecycleError;

const HUNDRED: Decimal = Decimal::ONE_HUNDRED;

/// Net, tax and gross figures of a document.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaxBreakdown {
    /// Sum of the line totals as entered.
    pub subtotal: Decimal,
    /// Amount net of tax.
    pub net: Decimal,
    /// Tax amount.
    pub tax: Decimal,
    /// Amount including tax.
    pub total: Decimal,
    /// Rate applied, in percent.
    pub rate: Decimal,
    /// Whether line totals already include tax.
    pub inclusive: bool,
}

impl TaxBreakdown {
    /// Computes the breakdown of `subtotal` at `rate` percent.
    ///
    /// # Errors
    ///
    /// Returns `InvalidTaxRate` for a rate outside 0..=100 and
    /// `InvalidAmount` for a negative subtotal.
    pub fn compute(subtotal: Decimal, rate: Decimal, inclusive: bool) -> Result<Self, LifecycleError> {
        if rate < Decimal::ZERO || rate > HUNDRED {
            return Err(LifecycleError::InvalidTaxRate(rate));
        }
        if subtotal < Decimal::ZERO {
            return Err(LifecycleError::InvalidAmount(subtotal));
        }

        let subtotal = round_money(subtotal);
        let (net, total) = if inclusive {
            (Self::strip(subtotal, rate), subtotal)
        } else {
            let tax = round_money(subtotal * rate / HUNDRED);
            (subtotal, subtotal + tax)
        };

        Ok(Self {
            subtotal,
            net,
            tax: total - net,
            total,
            rate,
            inclusive,
        })
    }

    /// Net amount of a single line total under this document's tax mode.
    #[must_use]
    pub fn line_net(&self, line_total: Decimal) -> Decimal {
        if self.inclusive {
            Self::strip(line_total, self.rate)
        } else {
            round_money(line_total)
        }
    }

    fn strip(gross: Decimal, rate: Decimal) -> Decimal {
        round_money(gross * HUNDRED / (HUNDRED + rate))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_exclusive() {
        let t = TaxBreakdown::compute(dec!(1000), dec!(11), false).unwrap();
        assert_eq!(t.net, dec!(1000));
        assert_eq!(t.tax, dec!(110));
        assert_eq!(t.total, dec!(1110));
    }

    #[test]
    fn test_inclusive() {
        let t = TaxBreakdown::compute(dec!(1000000), dec!(11), true).unwrap();
        assert_eq!(t.total, dec!(1000000));
        assert_eq!(t.net, dec!(900900.90));
        assert_eq!(t.tax, dec!(99099.10));
        assert_eq!(t.net + t.tax, t.total);
    }

    #[test]
    fn test_zero_rate() {
        let t = TaxBreakdown::compute(dec!(250.50), Decimal::ZERO, false).unwrap();
        assert_eq!(t.tax, Decimal::ZERO);
        assert_eq!(t.total, dec!(250.50));
    }

    #[test]
    fn test_bankers_rounding_on_tax() {
        // 10.25 * 10% = 1.025 -> 1.02
        let t = TaxBreakdown::compute(dec!(10.25), dec!(10), false).unwrap();
        assert_eq!(t.tax, dec!(1.02));
    }

    #[test]
    fn test_line_net() {
        let inclusive = TaxBreakdown::compute(dec!(111), dec!(11), true).unwrap();
        assert_eq!(inclusive.line_net(dec!(111)), dec!(100));

        let exclusive = TaxBreakdown::compute(dec!(100), dec!(11), false).unwrap();
        assert_eq!(exclusive.line_net(dec!(100)), dec!(100));
    }

    #[test]
    fn test_rejects_bad_input() {
        assert_eq!(
            TaxBreakdown::compute(dec!(10), dec!(-1), false),
            Err(LifecycleError::InvalidTaxRate(dec!(-1)))
        );
        assert_eq!(
            TaxBreakdown::compute(dec!(10), dec!(101), true),
            Err(LifecycleError::InvalidTaxRate(dec!(101)))
        );
        assert!(TaxBreakdown::compute(dec!(-10), dec!(11), false).is_err());
    }
}
