//! FIFO error types.

use rust_decimal::Decimal;
use thiserror::Error;

/// Errors that can occur while allocating or restoring cost layers.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FifoError {
    /// Requested quantity must be positive.
    #[error("Quantity must be positive, got {0}")]
    InvalidQuantity(Decimal),

    /// Unit cost must not be negative.
    #[error("Unit cost cannot be negative, got {0}")]
    InvalidUnitCost(Decimal),

    /// A receipt cannot be revoked after its layer was drawn from.
    #[error(
        "Layer {layer_id} has already been consumed ({remaining} of {quantity} remaining)"
    )]
    LayerAlreadyConsumed {
        /// The layer id.
        layer_id: i64,
        /// Quantity originally received.
        quantity: Decimal,
        /// Quantity still on the layer.
        remaining: Decimal,
    },

    /// Restoring would put more on a layer than it originally received.
    #[error("Restoring {restore} to layer {layer_id} exceeds its received quantity {quantity}")]
    RestoreExceedsReceipt {
        /// The layer id.
        layer_id: i64,
        /// Quantity originally received.
        quantity: Decimal,
        /// Quantity being restored.
        restore: Decimal,
    },
}

impl FifoError {
    /// Returns the error code for API responses.
    #[must_use]
    pub const fn error_code(&self) -> &'static str {
        match self {
            Self::InvalidQuantity(_) => "INVALID_QUANTITY",
            Self::InvalidUnitCost(_) => "INVALID_UNIT_COST",
            Self::LayerAlreadyConsumed { .. } => "LAYER_ALREADY_CONSUMED",
            Self::RestoreExceedsReceipt { .. } => "RESTORE_EXCEEDS_RECEIPT",
        }
    }

    /// Returns the HTTP status code for this error.
    #[must_use]
    pub const fn http_status_code(&self) -> u16 {
        match self {
            Self::InvalidQuantity(_) | Self::InvalidUnitCost(_) => 400,
            Self::LayerAlreadyConsumed { .. } => 422,
            Self::RestoreExceedsReceipt { .. } => 500,
        }
    }
}
