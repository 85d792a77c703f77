//! Property-based tests for FIFO allocation.
//!
//! - Property 1: Quantity conservation
//! - Property 2: Oldest-first consumption
//! - Property 3: Shortfall is estimated, never negative stock

use chrono::NaiveDate;
use proptest::prelude::*;
use rust_decimal::Decimal;
use tradebook_shared::ShortfallCostPolicy;

use super::engine::{allocate, valuate};
use super::types::CostLayer;

/// Strategy for quantities (1 to 500 whole units).
fn quantity() -> impl Strategy<Value = Decimal> {
    (1i64..500i64).prop_map(Decimal::from)
}

/// Strategy for unit costs (0.01 to 1,000.00).
fn unit_cost() -> impl Strategy<Value = Decimal> {
    (1i64..100_000i64).prop_map(|cents| Decimal::new(cents, 2))
}

/// Strategy for a set of open layers with distinct ids and random dates.
fn layers() -> impl Strategy<Value = Vec<CostLayer>> {
    prop::collection::vec((quantity(), unit_cost(), 1u32..28u32), 0..8).prop_map(|raw| {
        raw.into_iter()
            .enumerate()
            .map(|(i, (qty, cost, day))| CostLayer {
                id: i64::try_from(i).unwrap_or(i64::MAX) + 1,
                quantity: qty,
                remaining_quantity: qty,
                unit_cost: cost,
                movement_date: NaiveDate::from_ymd_opt(2026, 2, day).unwrap(),
            })
            .collect()
    })
}

fn policy() -> impl Strategy<Value = ShortfallCostPolicy> {
    prop_oneof![
        Just(ShortfallCostPolicy::AverageOfAvailable),
        Just(ShortfallCostPolicy::LastKnownCost),
    ]
}

/// Applies an allocation's draws to the layers, as the store would.
fn apply(layers: &mut [CostLayer], alloc: &super::types::FifoAllocation) {
    for line in &alloc.lines {
        if let Some(id) = line.layer_id {
            let layer = layers.iter_mut().find(|l| l.id == id).unwrap();
            layer.remaining_quantity -= line.quantity;
        }
    }
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(200))]

    /// Property 1: remaining quantity after consuming Q equals received minus
    /// the drawn part of Q, and no layer goes negative.
    #[test]
    fn prop_quantity_conserved(
        mut layers in layers(),
        requested in quantity(),
        policy in policy(),
    ) {
        let received: Decimal = layers.iter().map(|l| l.quantity).sum();
        let alloc = allocate(&layers, requested, policy, None).unwrap();
        apply(&mut layers, &alloc);

        let remaining: Decimal = layers.iter().map(|l| l.remaining_quantity).sum();
        prop_assert_eq!(alloc.drawn_quantity() + alloc.shortfall_quantity(), requested);
        prop_assert_eq!(remaining, received - alloc.drawn_quantity());
        prop_assert!(layers.iter().all(|l| l.remaining_quantity >= Decimal::ZERO));

        if requested <= received {
            prop_assert!(!alloc.is_estimated());
            prop_assert_eq!(remaining, received - requested);
        }
    }

    /// Property 2: a layer is touched only after every older layer is empty.
    #[test]
    fn prop_oldest_first(
        mut layers in layers(),
        requested in quantity(),
    ) {
        let alloc = allocate(&layers, requested, ShortfallCostPolicy::default(), None).unwrap();
        apply(&mut layers, &alloc);

        let mut ordered = layers.clone();
        ordered.sort_by_key(CostLayer::fifo_key);
        let first_open = ordered.iter().position(CostLayer::is_open);
        if let Some(pos) = first_open {
            // Everything after the first open layer is untouched.
            for layer in &ordered[pos + 1..] {
                prop_assert!(layer.is_untouched());
            }
        }
    }

    /// Property 3: the shortfall line carries exactly the uncovered quantity.
    #[test]
    fn prop_shortfall_estimated(
        layers in layers(),
        extra in quantity(),
        policy in policy(),
    ) {
        let on_hand = valuate(&layers).quantity;
        let requested = on_hand + extra;
        let alloc = allocate(&layers, requested, policy, Some(Decimal::ONE)).unwrap();

        prop_assert!(alloc.is_estimated());
        prop_assert_eq!(alloc.shortfall_quantity(), extra);
        prop_assert_eq!(alloc.lines.iter().filter(|l| l.layer_id.is_none()).count(), 1);
        prop_assert!(alloc.total_cost >= Decimal::ZERO);
    }
}
