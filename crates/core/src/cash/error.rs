//! Cash ledger error types.

use rust_decimal::Decimal;
use thiserror::Error;
use uuid::Uuid;

/// Errors that can occur while recording or reversing cash movements.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CashError {
    /// Exactly one of debit and credit must be positive.
    #[error("Invalid cash amounts: debit {debit}, credit {credit}")]
    InvalidAmount {
        /// Debit amount given.
        debit: Decimal,
        /// Credit amount given.
        credit: Decimal,
    },

    /// Bank not found.
    #[error("Bank not found: {0}")]
    BankNotFound(Uuid),

    /// Cash movement not found.
    #[error("Cash movement not found: {0}")]
    MovementNotFound(i64),

    /// The movement already has a reversing movement.
    #[error("Cash movement {0} is already reversed")]
    AlreadyReversed(i64),

    /// The movement is itself a reversal.
    #[error("Cash movement {0} is a reversal and cannot be reversed")]
    ReversalOfReversal(i64),
}

impl CashError {
    /// Returns the error code for API responses.
    #[must_use]
    pub const fn error_code(&self) -> &'static str {
        match self {
            Self::InvalidAmount { .. } => "INVALID_CASH_AMOUNT",
            Self::BankNotFound(_) => "BANK_NOT_FOUND",
            Self::MovementNotFound(_) => "CASH_MOVEMENT_NOT_FOUND",
            Self::AlreadyReversed(_) => "CASH_MOVEMENT_ALREADY_REVERSED",
            Self::ReversalOfReversal(_) => "CASH_MOVEMENT_IS_REVERSAL",
        }
    }

    /// Returns the HTTP status code for this error.
    #[must_use]
    pub const fn http_status_code(&self) -> u16 {
        match self {
            Self::InvalidAmount { .. } => 400,
            Self::BankNotFound(_) | Self::MovementNotFound(_) => 404,
            Self::AlreadyReversed(_) | Self::ReversalOfReversal(_) => 409,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_codes() {
        assert_eq!(CashError::AlreadyReversed(3).error_code(), "CASH_MOVEMENT_ALREADY_REVERSED");
        assert_eq!(CashError::AlreadyReversed(3).http_status_code(), 409);
        assert_eq!(CashError::BankNotFound(Uuid::nil()).http_status_code(), 404);
    }
}
