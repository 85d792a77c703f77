//! Ledger error types for validation and state errors.
//!
//! This module defines all errors that can occur during journal operations,
//! including line validation errors, account errors and reversal state errors.

use rust_decimal::Decimal;
use thiserror::Error;
use uuid::Uuid;

use super::types::JournalStatus;

/// Errors that can occur during ledger operations.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum LedgerError {
    // ========== Validation Errors ==========
    /// A journal entry needs at least one line.
    #[error("Journal entry must have at least one line")]
    NoLines,

    /// Debits and credits do not match.
    #[error("Journal entry is not balanced. Debit: {debit}, Credit: {credit}")]
    Unbalanced {
        /// Total debit amount.
        debit: Decimal,
        /// Total credit amount.
        credit: Decimal,
    },

    /// Line amount cannot be negative.
    #[error("Line on account {0} has a negative amount")]
    NegativeAmount(Uuid),

    /// Line must carry either a debit or a credit, not both.
    #[error("Line on account {0} has both a debit and a credit")]
    BothSides(Uuid),

    /// Line carries neither a debit nor a credit.
    #[error("Line on account {0} has no amount")]
    ZeroLine(Uuid),

    // ========== Account Errors ==========
    /// Account not found.
    #[error("Account not found: {0}")]
    AccountNotFound(Uuid),

    /// No account with the configured code.
    #[error("No account with code {0}")]
    AccountCodeNotFound(String),

    /// Account is inactive and cannot be used.
    #[error("Account {0} is inactive")]
    AccountInactive(Uuid),

    /// Account has children; only leaf accounts receive postings.
    #[error("Account {0} is not a leaf account")]
    AccountNotLeaf(Uuid),

    /// Account code already in use.
    #[error("Account code '{0}' already exists")]
    DuplicateAccountCode(String),

    /// Parent account not found.
    #[error("Parent account not found: {0}")]
    ParentNotFound(Uuid),

    // ========== Entry State Errors ==========
    /// Journal entry not found.
    #[error("Journal entry not found: {0}")]
    EntryNotFound(Uuid),

    /// Journal entry has already been reversed.
    #[error("Journal entry {entry_id} is already reversed")]
    AlreadyReversed {
        /// The entry.
        entry_id: Uuid,
    },

    /// Only posted entries can be reversed.
    #[error("Journal entry {entry_id} is {status}, only posted entries can be reversed")]
    NotPosted {
        /// The entry.
        entry_id: Uuid,
        /// Its current status.
        status: JournalStatus,
    },
}

impl LedgerError {
    /// Returns the error code for API responses.
    #[must_use]
    pub const fn error_code(&self) -> &'static str {
        match self {
            Self::NoLines => "NO_LINES",
            Self::Unbalanced { .. } => "UNBALANCED_ENTRY",
            Self::NegativeAmount(_) => "NEGATIVE_AMOUNT",
            Self::BothSides(_) => "BOTH_SIDES",
            Self::ZeroLine(_) => "ZERO_LINE",
            Self::AccountNotFound(_) => "ACCOUNT_NOT_FOUND",
            Self::AccountCodeNotFound(_) => "ACCOUNT_CODE_NOT_FOUND",
            Self::AccountInactive(_) => "ACCOUNT_INACTIVE",
            Self::AccountNotLeaf(_) => "ACCOUNT_NOT_LEAF",
            Self::DuplicateAccountCode(_) => "DUPLICATE_ACCOUNT_CODE",
            Self::ParentNotFound(_) => "PARENT_NOT_FOUND",
            Self::EntryNotFound(_) => "ENTRY_NOT_FOUND",
            Self::AlreadyReversed { .. } => "ALREADY_REVERSED",
            Self::NotPosted { .. } => "ENTRY_NOT_POSTED",
        }
    }

    /// Returns the HTTP status code for this error.
    #[must_use]
    pub const fn http_status_code(&self) -> u16 {
        match self {
            // 400 Bad Request - validation errors
            Self::NoLines
            | Self::Unbalanced { .. }
            | Self::NegativeAmount(_)
            | Self::BothSides(_)
            | Self::ZeroLine(_)
            | Self::AccountInactive(_)
            | Self::AccountNotLeaf(_)
            | Self::ParentNotFound(_) => 400,

            // 404 Not Found
            Self::AccountNotFound(_) | Self::AccountCodeNotFound(_) | Self::EntryNotFound(_) => {
                404
            }

            // 409 Conflict - state errors
            Self::AlreadyReversed { .. }
            | Self::NotPosted { .. }
            | Self::DuplicateAccountCode(_) => 409,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_error_codes() {
        assert_eq!(LedgerError::NoLines.error_code(), "NO_LINES");
        assert_eq!(
            LedgerError::Unbalanced {
                debit: dec!(1.00),
                credit: dec!(0.50),
            }
            .error_code(),
            "UNBALANCED_ENTRY"
        );
        assert_eq!(
            LedgerError::AccountNotLeaf(Uuid::nil()).error_code(),
            "ACCOUNT_NOT_LEAF"
        );
    }

    #[test]
    fn test_http_status_codes() {
        assert_eq!(LedgerError::NoLines.http_status_code(), 400);
        assert_eq!(LedgerError::AccountNotFound(Uuid::nil()).http_status_code(), 404);
        assert_eq!(
            LedgerError::AlreadyReversed {
                entry_id: Uuid::nil()
            }
            .http_status_code(),
            409
        );
    }

    #[test]
    fn test_error_display() {
        let err = LedgerError::Unbalanced {
            debit: dec!(100.00),
            credit: dec!(50.00),
        };
        assert_eq!(
            err.to_string(),
            "Journal entry is not balanced. Debit: 100.00, Credit: 50.00"
        );

        let err = LedgerError::NotPosted {
            entry_id: Uuid::nil(),
            status: JournalStatus::Draft,
        };
        assert_eq!(
            err.to_string(),
            format!("Journal entry {} is draft, only posted entries can be reversed", Uuid::nil())
        );
    }
}
