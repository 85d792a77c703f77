//! Lifecycle error types.
//!
//! This module defines the errors a document can hit on its way through
//! create, confirm, unconfirm, cancel and delete.

use rust_decimal::Decimal;
use thiserror::Error;
use uuid::Uuid;

use super::status::{
    DocumentAction, DocumentKind, DocumentStatus, OverpaymentAction, OverpaymentStatus,
};

/// Errors that can occur during document lifecycle operations.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum LifecycleError {
    // ========== State Errors ==========
    /// The action is not legal from the document's current status.
    #[error("Cannot {action} {document} {id} in status {from}")]
    InvalidTransition {
        /// Document kind.
        document: DocumentKind,
        /// Document id.
        id: Uuid,
        /// Status the document was in.
        from: DocumentStatus,
        /// Action attempted.
        action: DocumentAction,
    },

    /// Only drafts can be deleted.
    #[error("Cannot delete {document} {id} in status {status}")]
    NotDeletable {
        /// Document kind.
        document: DocumentKind,
        /// Document id.
        id: Uuid,
        /// Current status.
        status: DocumentStatus,
    },

    /// The overpayment is no longer pending.
    #[error("Cannot {action} overpayment {id} in status {from}")]
    InvalidOverpaymentTransition {
        /// Overpayment id.
        id: Uuid,
        /// Status the overpayment was in.
        from: OverpaymentStatus,
        /// Action attempted.
        action: OverpaymentAction,
    },

    /// The referenced sale or purchase is not confirmed.
    #[error("{document} {id} must be confirmed")]
    SourceNotConfirmed {
        /// Kind of the referenced document.
        document: DocumentKind,
        /// Referenced document id.
        id: Uuid,
    },

    /// Other documents still depend on this one.
    #[error("{document} {id} is referenced by a {dependent}")]
    HasDependents {
        /// Document kind.
        document: DocumentKind,
        /// Document id.
        id: Uuid,
        /// Kind of the dependent document.
        dependent: DocumentKind,
    },

    /// The payment's overpayment has already been refunded or converted.
    #[error("Overpayment of payment {payment_id} is already {status}")]
    OverpaymentResolved {
        /// The payment.
        payment_id: Uuid,
        /// The overpayment's status.
        status: OverpaymentStatus,
    },

    // ========== Business Rule Errors ==========
    /// Not enough nominal stock for the requested quantity.
    #[error("Insufficient stock for item {item}: required {required}, available {available}")]
    InsufficientStock {
        /// Item id.
        item: Uuid,
        /// Quantity required across the document.
        required: Decimal,
        /// Nominal quantity on hand.
        available: Decimal,
    },

    /// Return quantity exceeds what was sold and not yet returned.
    #[error("Cannot return {requested} of line {detail_id}: only {returnable} returnable")]
    ReturnExceedsSold {
        /// The sale or purchase line.
        detail_id: Uuid,
        /// Quantity requested.
        requested: Decimal,
        /// Quantity still returnable.
        returnable: Decimal,
    },

    /// A return line references a line outside its source document.
    #[error("Line {detail_id} does not belong to {document} {source_id}")]
    DetailNotInSource {
        /// The referenced line.
        detail_id: Uuid,
        /// Kind of the source document.
        document: DocumentKind,
        /// The source document.
        source_id: Uuid,
    },

    /// Payment amount exceeds the document's outstanding balance.
    #[error("Payment of {amount} exceeds outstanding {outstanding} on {document} {id}")]
    ExceedsOutstanding {
        /// Kind of the settled document.
        document: DocumentKind,
        /// Settled document id.
        id: Uuid,
        /// Amount applied.
        amount: Decimal,
        /// Amount still outstanding.
        outstanding: Decimal,
    },

    /// A disbursement may not pay more than it applies to purchases.
    #[error("Disbursement of {amount} exceeds applied amount {applied}")]
    DisbursementExceedsApplied {
        /// Payment amount.
        amount: Decimal,
        /// Sum of the payment's lines.
        applied: Decimal,
    },

    /// A payment's lines add up to more than the payment.
    #[error("Applied amount {applied} exceeds payment amount {amount}")]
    AppliedExceedsPayment {
        /// Payment amount.
        amount: Decimal,
        /// Sum of the payment's lines.
        applied: Decimal,
    },

    // ========== Validation Errors ==========
    /// The document has no lines.
    #[error("{0} must have at least one line")]
    NoLines(DocumentKind),

    /// Quantity must be positive (or non-zero for adjustments).
    #[error("Invalid quantity {0}")]
    InvalidQuantity(Decimal),

    /// Price, cost or amount must not be negative.
    #[error("Invalid amount {0}")]
    InvalidAmount(Decimal),

    /// Tax rate must be between 0 and 100.
    #[error("Invalid tax rate {0}")]
    InvalidTaxRate(Decimal),

    /// Cash settlement requires a bank.
    #[error("A bank is required for cash settlement")]
    BankRequired,

    /// A stock increase needs a unit cost for its layer.
    #[error("Stock increase of item {0} needs a unit cost")]
    UnitCostRequired(Uuid),

    /// Transfer source and destination are the same bank.
    #[error("Transfer source and destination are the same bank {0}")]
    SameBank(Uuid),

    /// A payment mixes sales and purchases, or its lines do not match its direction.
    #[error("Payment line does not match the payment direction")]
    PaymentDirectionMismatch,
}

impl LifecycleError {
    /// Returns the error code for API responses.
    #[must_use]
    pub const fn error_code(&self) -> &'static str {
        match self {
            Self::InvalidTransition { .. } => "INVALID_TRANSITION",
            Self::NotDeletable { .. } => "NOT_DELETABLE",
            Self::InvalidOverpaymentTransition { .. } => "INVALID_OVERPAYMENT_TRANSITION",
            Self::SourceNotConfirmed { .. } => "SOURCE_NOT_CONFIRMED",
            Self::HasDependents { .. } => "HAS_DEPENDENTS",
            Self::OverpaymentResolved { .. } => "OVERPAYMENT_RESOLVED",
            Self::InsufficientStock { .. } => "INSUFFICIENT_STOCK",
            Self::ReturnExceedsSold { .. } => "RETURN_EXCEEDS_SOLD",
            Self::DetailNotInSource { .. } => "DETAIL_NOT_IN_SOURCE",
            Self::ExceedsOutstanding { .. } => "EXCEEDS_OUTSTANDING",
            Self::DisbursementExceedsApplied { .. } => "DISBURSEMENT_EXCEEDS_APPLIED",
            Self::AppliedExceedsPayment { .. } => "APPLIED_EXCEEDS_PAYMENT",
            Self::NoLines(_) => "NO_LINES",
            Self::InvalidQuantity(_) => "INVALID_QUANTITY",
            Self::InvalidAmount(_) => "INVALID_AMOUNT",
            Self::InvalidTaxRate(_) => "INVALID_TAX_RATE",
            Self::BankRequired => "BANK_REQUIRED",
            Self::UnitCostRequired(_) => "UNIT_COST_REQUIRED",
            Self::SameBank(_) => "SAME_BANK",
            Self::PaymentDirectionMismatch => "PAYMENT_DIRECTION_MISMATCH",
        }
    }

    /// Returns the HTTP status code for this error.
    #[must_use]
    pub const fn http_status_code(&self) -> u16 {
        match self {
            // 400 Bad Request - malformed input
            Self::NoLines(_)
            | Self::InvalidQuantity(_)
            | Self::InvalidAmount(_)
            | Self::InvalidTaxRate(_)
            | Self::BankRequired
            | Self::UnitCostRequired(_)
            | Self::SameBank(_)
            | Self::PaymentDirectionMismatch
            | Self::DetailNotInSource { .. } => 400,

            // 409 Conflict - wrong state
            Self::InvalidTransition { .. }
            | Self::NotDeletable { .. }
            | Self::InvalidOverpaymentTransition { .. }
            | Self::HasDependents { .. }
            | Self::OverpaymentResolved { .. } => 409,

            // 422 Unprocessable - business rules
            Self::SourceNotConfirmed { .. }
            | Self::InsufficientStock { .. }
            | Self::ReturnExceedsSold { .. }
            | Self::ExceedsOutstanding { .. }
            | Self::DisbursementExceedsApplied { .. }
            | Self::AppliedExceedsPayment { .. } => 422,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_error_codes() {
        let err = LifecycleError::InsufficientStock {
            item: Uuid::nil(),
            required: dec!(20),
            available: dec!(15),
        };
        assert_eq!(err.error_code(), "INSUFFICIENT_STOCK");
        assert_eq!(err.http_status_code(), 422);
        assert_eq!(LifecycleError::BankRequired.http_status_code(), 400);
    }

    #[test]
    fn test_transition_is_conflict() {
        let err = LifecycleError::InvalidTransition {
            document: DocumentKind::Payment,
            id: Uuid::nil(),
            from: DocumentStatus::Cancelled,
            action: DocumentAction::Confirm,
        };
        assert_eq!(err.http_status_code(), 409);
        assert_eq!(err.error_code(), "INVALID_TRANSITION");
    }

    #[test]
    fn test_display() {
        let err = LifecycleError::InsufficientStock {
            item: Uuid::nil(),
            required: dec!(20),
            available: dec!(15),
        };
        assert_eq!(
            err.to_string(),
            format!("Insufficient stock for item {}: required 20, available 15", Uuid::nil())
        );
    }
}
