//! Kind-specific business rules checked before a document is confirmed.

use std::fmt;

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use tradebook_shared::round_quantity;
use uuid::Uuid;

use super::error::LifecycleError;
use super::status::DocumentKind;

/// How a sale or purchase is settled.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Settlement {
    /// Paid immediately through a bank.
    Cash,
    /// Left open on receivable or payable.
    Credit,
}

impl Settlement {
    /// Account the settlement side of the entry posts to.
    ///
    /// # Errors
    ///
    /// Returns `BankRequired` for a cash settlement without a bank account.
    pub fn account(self, bank_account: Option<Uuid>, credit_account: Uuid) -> Result<Uuid, LifecycleError> {
        match self {
            Self::Cash => bank_account.ok_or(LifecycleError::BankRequired),
            Self::Credit => Ok(credit_account),
        }
    }
}

/// Whether a sale line's profit rests on real or estimated cost.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProfitStatus {
    /// Every unit was costed from a real layer.
    Realized,
    /// Part of the cost was estimated for a shortfall.
    Unrealized,
}

impl fmt::Display for ProfitStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Realized => "realized",
            Self::Unrealized => "unrealized",
        })
    }
}

/// Profit of a sale line and whether it is realized.
#[must_use]
pub fn line_profit(net: Decimal, cost: Decimal, is_estimated: bool) -> (Decimal, ProfitStatus) {
    let status = if is_estimated {
        ProfitStatus::Unrealized
    } else {
        ProfitStatus::Realized
    };
    (net - cost, status)
}

/// Checks that `available` nominal stock covers `required`.
///
/// # Errors
///
/// Returns `InsufficientStock` with both figures.
pub fn check_stock(item: Uuid, required: Decimal, available: Decimal) -> Result<(), LifecycleError> {
    if required > available {
        return Err(LifecycleError::InsufficientStock {
            item,
            required,
            available,
        });
    }
    Ok(())
}

/// Checks a return quantity against what is still returnable on a line.
///
/// Returns the quantity still returnable after this return.
///
/// # Errors
///
/// Returns `ReturnExceedsSold` if `requested > sold - returned`.
pub fn check_returnable(
    detail_id: Uuid,
    sold: Decimal,
    returned: Decimal,
    requested: Decimal,
) -> Result<Decimal, LifecycleError> {
    let returnable = sold - returned;
    if requested > returnable {
        return Err(LifecycleError::ReturnExceedsSold {
            detail_id,
            requested,
            returnable,
        });
    }
    Ok(returnable - requested)
}

/// Checks that a payment line does not exceed the outstanding balance.
///
/// # Errors
///
/// Returns `ExceedsOutstanding` if `amount > total - paid`.
pub fn check_outstanding(
    document: DocumentKind,
    id: Uuid,
    total: Decimal,
    paid: Decimal,
    amount: Decimal,
) -> Result<(), LifecycleError> {
    let outstanding = total - paid;
    if amount > outstanding {
        return Err(LifecycleError::ExceedsOutstanding {
            document,
            id,
            amount,
            outstanding,
        });
    }
    Ok(())
}

/// Direction of a payment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PaymentDirection {
    /// Money in from a customer, applied to sales.
    Receipt,
    /// Money out to a supplier, applied to purchases.
    Disbursement,
}

impl PaymentDirection {
    /// Kind of document this direction settles.
    #[must_use]
    pub const fn settles(self) -> DocumentKind {
        match self {
            Self::Receipt => DocumentKind::Sale,
            Self::Disbursement => DocumentKind::Purchase,
        }
    }
}

/// A payment amount split into its applied part and its excess.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PaymentSplit {
    /// Amount applied to invoice lines.
    pub applied: Decimal,
    /// Amount over the applied lines.
    pub excess: Decimal,
}

impl PaymentSplit {
    /// Returns true if the payment leaves an overpayment.
    #[must_use]
    pub fn has_excess(&self) -> bool {
        self.excess > Decimal::ZERO
    }
}

/// Splits a payment of `amount` whose lines add up to `applied`.
///
/// # Errors
///
/// - `InvalidAmount` for a non-positive payment or negative applied amount
/// - `AppliedExceedsPayment` if the lines exceed the payment
/// - `DisbursementExceedsApplied` if a disbursement pays more than it applies
pub fn split_payment(
    direction: PaymentDirection,
    amount: Decimal,
    applied: Decimal,
) -> Result<PaymentSplit, LifecycleError> {
    if amount <= Decimal::ZERO {
        return Err(LifecycleError::InvalidAmount(amount));
    }
    if applied < Decimal::ZERO {
        return Err(LifecycleError::InvalidAmount(applied));
    }
    if applied > amount {
        return Err(LifecycleError::AppliedExceedsPayment { amount, applied });
    }

    let excess = amount - applied;
    if direction == PaymentDirection::Disbursement && excess > Decimal::ZERO {
        return Err(LifecycleError::DisbursementExceedsApplied { amount, applied });
    }

    Ok(PaymentSplit { applied, excess })
}

/// Checks that a quantity is positive and fits the stored quantity scale.
///
/// Lines are priced from the quantity as given, so a quantity the database
/// would round is refused rather than stored differently from its total.
///
/// # Errors
///
/// Returns `InvalidQuantity` otherwise.
pub fn positive_quantity(quantity: Decimal) -> Result<Decimal, LifecycleError> {
    if quantity <= Decimal::ZERO {
        return Err(LifecycleError::InvalidQuantity(quantity));
    }
    in_quantity_scale(quantity)
}

/// Checks that a signed adjustment quantity is non-zero and fits the
/// stored quantity scale.
///
/// # Errors
///
/// Returns `InvalidQuantity` otherwise.
pub fn nonzero_quantity(quantity: Decimal) -> Result<Decimal, LifecycleError> {
    if quantity.is_zero() {
        return Err(LifecycleError::InvalidQuantity(quantity));
    }
    in_quantity_scale(quantity)
}

fn in_quantity_scale(quantity: Decimal) -> Result<Decimal, LifecycleError> {
    if round_quantity(quantity) != quantity {
        return Err(LifecycleError::InvalidQuantity(quantity));
    }
    Ok(quantity)
}

/// Checks that a price, cost or amount is not negative.
///
/// # Errors
///
/// Returns `InvalidAmount` otherwise.
pub fn non_negative(amount: Decimal) -> Result<Decimal, LifecycleError> {
    if amount < Decimal::ZERO {
        return Err(LifecycleError::InvalidAmount(amount));
    }
    Ok(amount)
}
