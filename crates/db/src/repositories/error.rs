//! Error type shared by the repositories and the lifecycle coordinator.

use sea_orm::{DbErr, SqlErr};
use tradebook_core::cash::CashError;
use tradebook_core::fifo::FifoError;
use tradebook_core::ledger::LedgerError;
use tradebook_core::lifecycle::LifecycleError;
use tradebook_shared::AppError;
use uuid::Uuid;

/// Errors raised while reading or writing the ledgers.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// FIFO layer rule violated.
    #[error(transparent)]
    Fifo(#[from] FifoError),

    /// Journal rule violated.
    #[error(transparent)]
    Ledger(#[from] LedgerError),

    /// Cash ledger rule violated.
    #[error(transparent)]
    Cash(#[from] CashError),

    /// Document lifecycle rule violated.
    #[error(transparent)]
    Lifecycle(#[from] LifecycleError),

    /// A referenced row does not exist.
    #[error("{entity} not found: {id}")]
    NotFound {
        /// Table or document name.
        entity: &'static str,
        /// Requested key.
        id: String,
    },

    /// Number allocation kept colliding with concurrent writers.
    #[error("Could not allocate a {prefix} number after {attempts} attempts")]
    NumberingExhausted {
        /// Number prefix.
        prefix: String,
        /// Attempts made.
        attempts: u32,
    },

    /// Database error.
    #[error("Database error: {0}")]
    Database(#[from] DbErr),
}

impl StoreError {
    /// Builds a `NotFound` for a uuid key.
    #[must_use]
    pub fn not_found(entity: &'static str, id: Uuid) -> Self {
        Self::NotFound {
            entity,
            id: id.to_string(),
        }
    }

    /// Returns the error code for API responses.
    #[must_use]
    pub const fn error_code(&self) -> &'static str {
        match self {
            Self::Fifo(e) => e.error_code(),
            Self::Ledger(e) => e.error_code(),
            Self::Cash(e) => e.error_code(),
            Self::Lifecycle(e) => e.error_code(),
            Self::NotFound { .. } => "NOT_FOUND",
            Self::NumberingExhausted { .. } => "NUMBERING_EXHAUSTED",
            Self::Database(_) => "DATABASE_ERROR",
        }
    }

    /// Returns true if the operation may succeed when retried.
    #[must_use]
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::NumberingExhausted { .. } => true,
            Self::Database(err) => matches!(
                err.sql_err(),
                Some(SqlErr::UniqueConstraintViolation(_))
            ),
            _ => false,
        }
    }

    /// Collapses this error into the application-wide error.
    #[must_use]
    pub fn into_app_error(self) -> AppError {
        if self.is_retryable() {
            return AppError::Transient(self.to_string());
        }
        let status = match &self {
            Self::Fifo(e) => e.http_status_code(),
            Self::Ledger(e) => e.http_status_code(),
            Self::Cash(e) => e.http_status_code(),
            Self::Lifecycle(e) => e.http_status_code(),
            Self::NotFound { .. } => 404,
            Self::NumberingExhausted { .. } => 503,
            Self::Database(_) => 500,
        };
        let message = self.to_string();
        match status {
            400 => AppError::Validation(message),
            404 => AppError::NotFound(message),
            409 => AppError::Conflict(message),
            422 => AppError::BusinessRule(message),
            _ if matches!(self, Self::Database(_)) => AppError::Database(message),
            _ => AppError::Internal(message),
        }
    }
}

/// Returns true if `err` is a unique-constraint violation.
pub(crate) fn is_unique_violation(err: &DbErr) -> bool {
    matches!(err.sql_err(), Some(SqlErr::UniqueConstraintViolation(_)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;
    use tradebook_core::lifecycle::{DocumentAction, DocumentKind, DocumentStatus};

    #[test]
    fn test_numbering_exhausted_is_transient() {
        let err = StoreError::NumberingExhausted {
            prefix: "SAL".to_string(),
            attempts: 5,
        };
        assert!(err.is_retryable());
        assert_eq!(err.error_code(), "NUMBERING_EXHAUSTED");
        assert!(matches!(err.into_app_error(), AppError::Transient(_)));
    }

    #[test]
    fn test_domain_errors_map_by_status() {
        let transition = StoreError::from(LifecycleError::InvalidTransition {
            document: DocumentKind::Sale,
            id: Uuid::nil(),
            from: DocumentStatus::Draft,
            action: DocumentAction::Unconfirm,
        });
        assert!(!transition.is_retryable());
        assert!(matches!(transition.into_app_error(), AppError::Conflict(_)));

        let stock = StoreError::from(LifecycleError::InsufficientStock {
            item: Uuid::nil(),
            required: dec!(20),
            available: dec!(15),
        });
        assert_eq!(stock.error_code(), "INSUFFICIENT_STOCK");
        assert!(matches!(stock.into_app_error(), AppError::BusinessRule(_)));

        let unbalanced = StoreError::from(LedgerError::Unbalanced {
            debit: dec!(100),
            credit: dec!(90),
        });
        assert!(matches!(unbalanced.into_app_error(), AppError::Validation(_)));
    }

    #[test]
    fn test_not_found() {
        let err = StoreError::not_found("sale", Uuid::nil());
        assert_eq!(err.to_string(), format!("sale not found: {}", Uuid::nil()));
        assert!(matches!(err.into_app_error(), AppError::NotFound(_)));
    }
}
