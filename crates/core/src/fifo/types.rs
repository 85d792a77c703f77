//! FIFO domain types.

use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// An inventory receipt with its own unit cost and remaining quantity.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CostLayer {
    /// Layer id; insertion order, used as the FIFO tie-break.
    pub id: i64,
    /// Quantity originally received.
    pub quantity: Decimal,
    /// Quantity not yet consumed.
    pub remaining_quantity: Decimal,
    /// Cost per unit.
    pub unit_cost: Decimal,
    /// Date the goods were received.
    pub movement_date: NaiveDate,
}

impl CostLayer {
    /// Sort key for oldest-first consumption: date, then insertion order.
    #[must_use]
    pub const fn fifo_key(&self) -> (NaiveDate, i64) {
        (self.movement_date, self.id)
    }

    /// Returns true if the layer still has quantity to draw from.
    #[must_use]
    pub fn is_open(&self) -> bool {
        self.remaining_quantity > Decimal::ZERO
    }

    /// Returns true if nothing has been drawn from the layer.
    #[must_use]
    pub fn is_untouched(&self) -> bool {
        self.remaining_quantity == self.quantity
    }
}

/// One line of a FIFO allocation.
///
/// A line either draws from a layer (`layer_id` is set) or records a
/// shortfall costed by estimate (`layer_id` is `None`, `is_estimated` is true).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AllocationLine {
    /// Layer drawn from, `None` for an estimated shortfall.
    pub layer_id: Option<i64>,
    /// Quantity taken.
    pub quantity: Decimal,
    /// Unit cost applied.
    pub unit_cost: Decimal,
    /// `quantity * unit_cost`, rounded to cents.
    pub total_cost: Decimal,
    /// True when the cost is an estimate rather than a real layer cost.
    pub is_estimated: bool,
}

/// Result of costing a consumption against an item's layers.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FifoAllocation {
    /// Lines in consumption order; a shortfall line, if any, comes last.
    pub lines: Vec<AllocationLine>,
    /// Total quantity costed (drawn plus shortfall).
    pub quantity: Decimal,
    /// Sum of the lines' total costs.
    pub total_cost: Decimal,
}

impl FifoAllocation {
    /// Returns true if any part of the cost was estimated.
    #[must_use]
    pub fn is_estimated(&self) -> bool {
        self.lines.iter().any(|l| l.is_estimated)
    }

    /// Quantity actually drawn from layers.
    #[must_use]
    pub fn drawn_quantity(&self) -> Decimal {
        self.lines
            .iter()
            .filter(|l| !l.is_estimated)
            .map(|l| l.quantity)
            .sum()
    }

    /// Quantity that could not be covered by layers.
    #[must_use]
    pub fn shortfall_quantity(&self) -> Decimal {
        self.lines
            .iter()
            .filter(|l| l.is_estimated)
            .map(|l| l.quantity)
            .sum()
    }
}

/// Quantity and value still carried on an item's open layers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct LayerValuation {
    /// Remaining quantity across open layers.
    pub quantity: Decimal,
    /// Remaining quantity times unit cost, summed.
    pub total_value: Decimal,
    /// `total_value / quantity`, zero when nothing is on hand.
    pub average_unit_cost: Decimal,
}
