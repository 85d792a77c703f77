//! Document state machines.
//!
//! Every business document follows the same machine:
//!
//! - `confirm`: draft → confirmed
//! - `unconfirm`: confirmed → draft
//! - `cancel`: draft → cancelled (terminal)
//!
//! Overpayments have their own one-way machine:
//!
//! - `refund`: pending → refunded
//! - `convert_to_income`: pending → converted_to_income
//!
//! Any other combination is rejected, never ignored.

use std::fmt;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::error::LifecycleError;

/// Business document kinds handled by the lifecycle coordinator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DocumentKind {
    /// Sale to a customer.
    Sale,
    /// Purchase from a supplier.
    Purchase,
    /// Goods returned by a customer.
    SaleReturn,
    /// Goods returned to a supplier.
    PurchaseReturn,
    /// Cash received into a bank.
    CashIn,
    /// Cash paid out of a bank.
    CashOut,
    /// Bank-to-bank transfer.
    Transfer,
    /// Stock count correction.
    StockAdjustment,
    /// Payment against sales or purchases.
    Payment,
}

impl DocumentKind {
    /// Returns the snake_case name of this kind.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Sale => "sale",
            Self::Purchase => "purchase",
            Self::SaleReturn => "sale_return",
            Self::PurchaseReturn => "purchase_return",
            Self::CashIn => "cash_in",
            Self::CashOut => "cash_out",
            Self::Transfer => "transfer",
            Self::StockAdjustment => "stock_adjustment",
            Self::Payment => "payment",
        }
    }
}

impl fmt::Display for DocumentKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Status of a business document.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DocumentStatus {
    /// Editable; no ledger effects.
    Draft,
    /// Ledger effects are committed.
    Confirmed,
    /// Abandoned before confirmation.
    Cancelled,
}

/// An action that moves a document between statuses.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DocumentAction {
    /// Commit the document's ledger effects.
    Confirm,
    /// Undo the document's ledger effects.
    Unconfirm,
    /// Abandon a draft.
    Cancel,
}

impl DocumentStatus {
    /// Returns the status after `action`, if the transition is legal.
    #[must_use]
    pub const fn after(self, action: DocumentAction) -> Option<Self> {
        match (self, action) {
            (Self::Draft, DocumentAction::Confirm) => Some(Self::Confirmed),
            (Self::Confirmed, DocumentAction::Unconfirm) => Some(Self::Draft),
            (Self::Draft, DocumentAction::Cancel) => Some(Self::Cancelled),
            _ => None,
        }
    }

    /// Applies `action` to a document of `kind`.
    ///
    /// # Errors
    ///
    /// Returns `LifecycleError::InvalidTransition` for an illegal combination.
    pub fn transition(
        self,
        document: DocumentKind,
        id: Uuid,
        action: DocumentAction,
    ) -> Result<Self, LifecycleError> {
        self.after(action).ok_or(LifecycleError::InvalidTransition {
            document,
            id,
            from: self,
            action,
        })
    }

    /// Returns true if the document's ledger effects are in place.
    #[must_use]
    pub const fn is_confirmed(self) -> bool {
        matches!(self, Self::Confirmed)
    }

    /// Returns the persisted string for this status.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Draft => "draft",
            Self::Confirmed => "confirmed",
            Self::Cancelled => "cancelled",
        }
    }
}

impl fmt::Display for DocumentStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl fmt::Display for DocumentAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Confirm => "confirm",
            Self::Unconfirm => "unconfirm",
            Self::Cancel => "cancel",
        })
    }
}

/// Checks that a document may be deleted; only drafts can be.
///
/// # Errors
///
/// Returns `LifecycleError::NotDeletable` for any other status.
pub fn ensure_deletable(
    document: DocumentKind,
    id: Uuid,
    status: DocumentStatus,
) -> Result<(), LifecycleError> {
    match status {
        DocumentStatus::Draft => Ok(()),
        _ => Err(LifecycleError::NotDeletable {
            document,
            id,
            status,
        }),
    }
}

/// Status of a customer overpayment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OverpaymentStatus {
    /// Held as a customer deposit.
    Pending,
    /// Paid back to the customer.
    Refunded,
    /// Recognized as other income.
    ConvertedToIncome,
}

/// An action that resolves an overpayment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OverpaymentAction {
    /// Pay the excess back through a bank.
    Refund,
    /// Write the excess off to other income.
    ConvertToIncome,
}

impl OverpaymentStatus {
    /// Applies `action` to the overpayment `id`.
    ///
    /// # Errors
    ///
    /// Returns `LifecycleError::InvalidOverpaymentTransition` unless the
    /// overpayment is pending.
    pub fn transition(self, id: Uuid, action: OverpaymentAction) -> Result<Self, LifecycleError> {
        match (self, action) {
            (Self::Pending, OverpaymentAction::Refund) => Ok(Self::Refunded),
            (Self::Pending, OverpaymentAction::ConvertToIncome) => Ok(Self::ConvertedToIncome),
            _ => Err(LifecycleError::InvalidOverpaymentTransition {
                id,
                from: self,
                action,
            }),
        }
    }

    /// Returns the persisted string for this status.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Refunded => "refunded",
            Self::ConvertedToIncome => "converted_to_income",
        }
    }
}

impl fmt::Display for OverpaymentStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl fmt::Display for OverpaymentAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Refund => "refund",
            Self::ConvertToIncome => "convert_to_income",
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case(DocumentStatus::Draft, DocumentAction::Confirm, Some(DocumentStatus::Confirmed))]
    #[case(DocumentStatus::Confirmed, DocumentAction::Unconfirm, Some(DocumentStatus::Draft))]
    #[case(DocumentStatus::Draft, DocumentAction::Cancel, Some(DocumentStatus::Cancelled))]
    #[case(DocumentStatus::Draft, DocumentAction::Unconfirm, None)]
    #[case(DocumentStatus::Confirmed, DocumentAction::Confirm, None)]
    #[case(DocumentStatus::Confirmed, DocumentAction::Cancel, None)]
    #[case(DocumentStatus::Cancelled, DocumentAction::Confirm, None)]
    #[case(DocumentStatus::Cancelled, DocumentAction::Unconfirm, None)]
    #[case(DocumentStatus::Cancelled, DocumentAction::Cancel, None)]
    fn test_transition_table(
        #[case] from: DocumentStatus,
        #[case] action: DocumentAction,
        #[case] expected: Option<DocumentStatus>,
    ) {
        assert_eq!(from.after(action), expected);
    }

    #[test]
    fn test_invalid_transition_carries_context() {
        let id = Uuid::new_v4();
        let err = DocumentStatus::Draft
            .transition(DocumentKind::Sale, id, DocumentAction::Unconfirm)
            .unwrap_err();
        assert_eq!(
            err,
            LifecycleError::InvalidTransition {
                document: DocumentKind::Sale,
                id,
                from: DocumentStatus::Draft,
                action: DocumentAction::Unconfirm,
            }
        );
        assert_eq!(
            err.to_string(),
            format!("Cannot unconfirm sale {id} in status draft")
        );
    }

    #[test]
    fn test_only_drafts_are_deletable() {
        let id = Uuid::new_v4();
        assert!(ensure_deletable(DocumentKind::Purchase, id, DocumentStatus::Draft).is_ok());
        assert!(ensure_deletable(DocumentKind::Purchase, id, DocumentStatus::Confirmed).is_err());
        assert!(ensure_deletable(DocumentKind::Purchase, id, DocumentStatus::Cancelled).is_err());
    }

    #[test]
    fn test_overpayment_machine() {
        let id = Uuid::new_v4();
        assert_eq!(
            OverpaymentStatus::Pending.transition(id, OverpaymentAction::Refund),
            Ok(OverpaymentStatus::Refunded)
        );
        assert_eq!(
            OverpaymentStatus::Pending.transition(id, OverpaymentAction::ConvertToIncome),
            Ok(OverpaymentStatus::ConvertedToIncome)
        );
        assert!(OverpaymentStatus::Refunded
            .transition(id, OverpaymentAction::ConvertToIncome)
            .is_err());
        assert!(OverpaymentStatus::ConvertedToIncome
            .transition(id, OverpaymentAction::Refund)
            .is_err());
    }
}
