//! Oldest-first cost allocation over inventory layers.

use rust_decimal::Decimal;
use tradebook_shared::{ShortfallCostPolicy, round_money, round_unit_cost};

use super::error::FifoError;
use super::types::{AllocationLine, CostLayer, FifoAllocation, LayerValuation};

/// Costs `quantity` units against `layers`, oldest first.
///
/// Layers are ordered by `(movement_date, id)`; unit cost never affects the
/// order. Each open layer gives up `min(remaining, still_needed)`. Whatever
/// the layers cannot cover becomes a single estimated line priced by `policy`.
///
/// The caller is responsible for passing only layers of one item that are
/// eligible for the consumption date, and for applying the draws.
///
/// # Arguments
///
/// * `layers` - The item's layers, in any order
/// * `quantity` - Quantity to cost, must be positive
/// * `policy` - How a shortfall is priced
/// * `last_known_cost` - Unit cost of the item's most recent layer, depleted or not
///
/// # Errors
///
/// Returns `FifoError::InvalidQuantity` if `quantity` is not positive.
pub fn allocate(
    layers: &[CostLayer],
    quantity: Decimal,
    policy: ShortfallCostPolicy,
    last_known_cost: Option<Decimal>,
) -> Result<FifoAllocation, FifoError> {
    if quantity <= Decimal::ZERO {
        return Err(FifoError::InvalidQuantity(quantity));
    }

    let mut open: Vec<&CostLayer> = layers.iter().filter(|l| l.is_open()).collect();
    open.sort_by_key(|l| l.fifo_key());

    let mut lines = Vec::new();
    let mut still_needed = quantity;

    for layer in &open {
        if still_needed <= Decimal::ZERO {
            break;
        }
        let take = layer.remaining_quantity.min(still_needed);
        lines.push(AllocationLine {
            layer_id: Some(layer.id),
            quantity: take,
            unit_cost: layer.unit_cost,
            total_cost: round_money(take * layer.unit_cost),
            is_estimated: false,
        });
        still_needed -= take;
    }

    if still_needed > Decimal::ZERO {
        let unit_cost = estimate_unit_cost(&open, policy, last_known_cost);
        lines.push(AllocationLine {
            layer_id: None,
            quantity: still_needed,
            unit_cost,
            total_cost: round_money(still_needed * unit_cost),
            is_estimated: true,
        });
    }

    let total_cost = lines.iter().map(|l| l.total_cost).sum();

    Ok(FifoAllocation {
        lines,
        quantity,
        total_cost,
    })
}

fn estimate_unit_cost(
    available: &[&CostLayer],
    policy: ShortfallCostPolicy,
    last_known_cost: Option<Decimal>,
) -> Decimal {
    match policy {
        ShortfallCostPolicy::AverageOfAvailable => {
            let quantity: Decimal = available.iter().map(|l| l.remaining_quantity).sum();
            if quantity > Decimal::ZERO {
                let value: Decimal = available
                    .iter()
                    .map(|l| l.remaining_quantity * l.unit_cost)
                    .sum();
                round_unit_cost(value / quantity)
            } else {
                last_known_cost.unwrap_or(Decimal::ZERO)
            }
        }
        ShortfallCostPolicy::LastKnownCost => last_known_cost.unwrap_or(Decimal::ZERO),
    }
}

/// Unit cost of the most recent layer by `(movement_date, id)`, open or depleted.
#[must_use]
pub fn last_known_cost(layers: &[CostLayer]) -> Option<Decimal> {
    layers.iter().max_by_key(|l| l.fifo_key()).map(|l| l.unit_cost)
}

/// Average unit cost of `total_cost` spread over `quantity`, zero for no quantity.
#[must_use]
pub fn average_unit_cost(total_cost: Decimal, quantity: Decimal) -> Decimal {
    if quantity.is_zero() {
        Decimal::ZERO
    } else {
        round_unit_cost(total_cost / quantity)
    }
}

/// Remaining quantity after putting `restore` units back on `layer`.
///
/// # Errors
///
/// Returns `FifoError::RestoreExceedsReceipt` if the layer would hold more
/// than it originally received.
pub fn restored_remaining(layer: &CostLayer, restore: Decimal) -> Result<Decimal, FifoError> {
    if restore <= Decimal::ZERO {
        return Err(FifoError::InvalidQuantity(restore));
    }
    let remaining = layer.remaining_quantity + restore;
    if remaining > layer.quantity {
        return Err(FifoError::RestoreExceedsReceipt {
            layer_id: layer.id,
            quantity: layer.quantity,
            restore,
        });
    }
    Ok(remaining)
}

/// Checks that a receipt's layers can be deleted without losing draws.
///
/// # Errors
///
/// Returns `FifoError::LayerAlreadyConsumed` for the first layer that has
/// been drawn from.
pub fn ensure_untouched(layers: &[CostLayer]) -> Result<(), FifoError> {
    match layers.iter().find(|l| !l.is_untouched()) {
        Some(layer) => Err(FifoError::LayerAlreadyConsumed {
            layer_id: layer.id,
            quantity: layer.quantity,
            remaining: layer.remaining_quantity,
        }),
        None => Ok(()),
    }
}

/// Values the open layers of an item.
#[must_use]
pub fn valuate(layers: &[CostLayer]) -> LayerValuation {
    let (quantity, value) = layers
        .iter()
        .filter(|l| l.is_open())
        .fold((Decimal::ZERO, Decimal::ZERO), |(q, v), l| {
            (q + l.remaining_quantity, v + l.remaining_quantity * l.unit_cost)
        });

    LayerValuation {
        quantity,
        total_value: round_money(value),
        average_unit_cost: average_unit_cost(value, quantity),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use rust_decimal_macros::dec;

    fn date(day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2026, 3, day).unwrap()
    }

    fn layer(id: i64, day: u32, remaining: Decimal, unit_cost: Decimal) -> CostLayer {
        CostLayer {
            id,
            quantity: remaining,
            remaining_quantity: remaining,
            unit_cost,
            movement_date: date(day),
        }
    }

    fn item_x() -> Vec<CostLayer> {
        vec![layer(1, 1, dec!(10), dec!(100)), layer(2, 2, dec!(5), dec!(120))]
    }

    // ========================================================================
    // Allocation
    // ========================================================================

    #[test]
    fn test_oldest_layer_drawn_first() {
        let alloc =
            allocate(&item_x(), dec!(12), ShortfallCostPolicy::AverageOfAvailable, None).unwrap();

        assert_eq!(alloc.lines.len(), 2);
        assert_eq!(alloc.lines[0].layer_id, Some(1));
        assert_eq!(alloc.lines[0].quantity, dec!(10));
        assert_eq!(alloc.lines[1].layer_id, Some(2));
        assert_eq!(alloc.lines[1].quantity, dec!(2));
        assert_eq!(alloc.total_cost, dec!(1240));
        assert!(!alloc.is_estimated());
    }

    #[test]
    fn test_order_ignores_unit_cost() {
        let layers = vec![layer(1, 1, dec!(5), dec!(500)), layer(2, 2, dec!(5), dec!(1))];
        let alloc = allocate(&layers, dec!(5), ShortfallCostPolicy::default(), None).unwrap();
        assert_eq!(alloc.lines[0].layer_id, Some(1));
        assert_eq!(alloc.total_cost, dec!(2500));
    }

    #[test]
    fn test_same_date_uses_insertion_order() {
        let layers = vec![layer(9, 1, dec!(3), dec!(10)), layer(4, 1, dec!(3), dec!(20))];
        let alloc = allocate(&layers, dec!(4), ShortfallCostPolicy::default(), None).unwrap();
        assert_eq!(alloc.lines[0].layer_id, Some(4));
        assert_eq!(alloc.lines[1].layer_id, Some(9));
        assert_eq!(alloc.total_cost, dec!(70));
    }

    #[test]
    fn test_depleted_layers_skipped() {
        let mut layers = item_x();
        layers[0].remaining_quantity = Decimal::ZERO;
        let alloc = allocate(&layers, dec!(2), ShortfallCostPolicy::default(), None).unwrap();
        assert_eq!(alloc.lines.len(), 1);
        assert_eq!(alloc.lines[0].layer_id, Some(2));
    }

    #[test]
    fn test_shortfall_average_of_available() {
        let alloc =
            allocate(&item_x(), dec!(20), ShortfallCostPolicy::AverageOfAvailable, None).unwrap();

        assert!(alloc.is_estimated());
        assert_eq!(alloc.drawn_quantity(), dec!(15));
        assert_eq!(alloc.shortfall_quantity(), dec!(5));

        let shortfall = alloc.lines.last().unwrap();
        assert_eq!(shortfall.layer_id, None);
        // (10*100 + 5*120) / 15
        assert_eq!(shortfall.unit_cost, dec!(106.6667));
        assert_eq!(shortfall.total_cost, dec!(533.33));
        assert_eq!(alloc.total_cost, dec!(1600) + dec!(533.33));
    }

    #[test]
    fn test_shortfall_last_known_cost() {
        let alloc = allocate(
            &item_x(),
            dec!(20),
            ShortfallCostPolicy::LastKnownCost,
            Some(dec!(120)),
        )
        .unwrap();
        assert_eq!(alloc.lines.last().unwrap().unit_cost, dec!(120));
        assert_eq!(alloc.total_cost, dec!(2200));
    }

    #[test]
    fn test_shortfall_without_layers_falls_back() {
        let alloc =
            allocate(&[], dec!(3), ShortfallCostPolicy::AverageOfAvailable, Some(dec!(90)))
                .unwrap();
        assert_eq!(alloc.total_cost, dec!(270));

        let alloc = allocate(&[], dec!(3), ShortfallCostPolicy::AverageOfAvailable, None).unwrap();
        assert_eq!(alloc.total_cost, Decimal::ZERO);
        assert!(alloc.is_estimated());
    }

    #[test]
    fn test_rejects_non_positive_quantity() {
        assert_eq!(
            allocate(&item_x(), Decimal::ZERO, ShortfallCostPolicy::default(), None),
            Err(FifoError::InvalidQuantity(Decimal::ZERO))
        );
        assert!(allocate(&item_x(), dec!(-1), ShortfallCostPolicy::default(), None).is_err());
    }

    // ========================================================================
    // Restore / revoke
    // ========================================================================

    #[test]
    fn test_restored_remaining() {
        let mut l = layer(2, 2, dec!(5), dec!(120));
        l.remaining_quantity = dec!(3);
        assert_eq!(restored_remaining(&l, dec!(2)), Ok(dec!(5)));
        assert!(matches!(
            restored_remaining(&l, dec!(3)),
            Err(FifoError::RestoreExceedsReceipt { layer_id: 2, .. })
        ));
    }

    #[test]
    fn test_ensure_untouched() {
        let mut layers = item_x();
        assert!(ensure_untouched(&layers).is_ok());
        layers[1].remaining_quantity = dec!(4);
        assert_eq!(
            ensure_untouched(&layers),
            Err(FifoError::LayerAlreadyConsumed {
                layer_id: 2,
                quantity: dec!(5),
                remaining: dec!(4),
            })
        );
    }

    // ========================================================================
    // Valuation
    // ========================================================================

    #[test]
    fn test_valuate() {
        let v = valuate(&item_x());
        assert_eq!(v.quantity, dec!(15));
        assert_eq!(v.total_value, dec!(1600));
        assert_eq!(v.average_unit_cost, dec!(106.6667));

        let empty = valuate(&[]);
        assert_eq!(empty.quantity, Decimal::ZERO);
        assert_eq!(empty.average_unit_cost, Decimal::ZERO);
    }

    #[test]
    fn test_last_known_cost_includes_depleted() {
        let mut layers = item_x();
        layers[1].remaining_quantity = Decimal::ZERO;
        assert_eq!(last_known_cost(&layers), Some(dec!(120)));
        assert_eq!(last_known_cost(&[]), None);
    }
}
