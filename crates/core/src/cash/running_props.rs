//! Property-based tests for running balances.
//!
//! - Property 1: Replaying snapshots built in any insertion order reproduces them
//! - Property 2: A reversal returns the balance to its prior value

use chrono::NaiveDate;
use proptest::prelude::*;
use rust_decimal::Decimal;

use super::running::{next_balance, reconcile};
use super::types::CashEntry;

/// Strategy for a movement: (day, is_debit, amount).
fn movement() -> impl Strategy<Value = (u32, bool, Decimal)> {
    (1u32..28u32, any::<bool>(), (1i64..1_000_000i64).prop_map(|c| Decimal::new(c, 2)))
}

/// Inserts movements the way the store does: the new snapshot is the prior
/// snapshot by `(date, id)` plus the net change, and every later snapshot is
/// shifted by the same net change.
fn insert_all(opening: Decimal, raw: &[(u32, bool, Decimal)]) -> (Vec<CashEntry>, Decimal) {
    let mut log: Vec<CashEntry> = Vec::new();
    let mut current = opening;

    for (i, (day, is_debit, amount)) in raw.iter().enumerate() {
        let id = i64::try_from(i).unwrap() + 1;
        let date = NaiveDate::from_ymd_opt(2026, 1, *day).unwrap();
        let (debit, credit) = if *is_debit {
            (*amount, Decimal::ZERO)
        } else {
            (Decimal::ZERO, *amount)
        };

        let prior = log
            .iter()
            .filter(|e| e.order_key() < (date, id))
            .max_by_key(|e| e.order_key())
            .map_or(opening, |e| e.balance);
        let balance = next_balance(prior, debit, credit).unwrap();
        let delta = debit - credit;

        for later in log.iter_mut().filter(|e| e.order_key() > (date, id)) {
            later.balance += delta;
        }
        log.push(CashEntry {
            id,
            movement_date: date,
            debit,
            credit,
            balance,
        });
        current += delta;
    }

    (log, current)
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(200))]

    /// Property 1: back-dated inserts keep every snapshot replayable.
    #[test]
    fn prop_replay_reproduces_snapshots(
        opening in (0i64..10_000_000i64).prop_map(|c| Decimal::new(c, 2)),
        raw in prop::collection::vec(movement(), 0..20),
    ) {
        let (log, current) = insert_all(opening, &raw);
        let report = reconcile(opening, &log, current);
        prop_assert!(report.is_consistent(), "mismatches: {:?}", report.mismatches);
    }

    /// Property 2: a movement followed by its swapped counterpart nets to zero.
    #[test]
    fn prop_reversal_restores_balance(
        prior in (-1_000_000i64..1_000_000i64).prop_map(|c| Decimal::new(c, 2)),
        (_, is_debit, amount) in movement(),
    ) {
        let (debit, credit) = if is_debit { (amount, Decimal::ZERO) } else { (Decimal::ZERO, amount) };
        let after = next_balance(prior, debit, credit).unwrap();
        let reversed = next_balance(after, credit, debit).unwrap();
        prop_assert_eq!(reversed, prior);
    }
}
