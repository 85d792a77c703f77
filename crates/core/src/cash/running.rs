//! Running balance computation and replay.

use rust_decimal::Decimal;

use super::error::CashError;
use super::types::{CashEntry, ReconcileReport, ReplayedSnapshot};

/// Validates a movement's amounts and returns its net effect, `debit - credit`.
///
/// # Errors
///
/// Returns `CashError::InvalidAmount` unless exactly one side is positive
/// and neither is negative.
pub fn net_change(debit: Decimal, credit: Decimal) -> Result<Decimal, CashError> {
    let valid = debit >= Decimal::ZERO
        && credit >= Decimal::ZERO
        && (debit.is_zero() != credit.is_zero());
    if !valid {
        return Err(CashError::InvalidAmount { debit, credit });
    }
    Ok(debit - credit)
}

/// Snapshot after a movement: the prior snapshot plus debit minus credit.
///
/// # Errors
///
/// Returns `CashError::InvalidAmount` for malformed amounts.
pub fn next_balance(prior: Decimal, debit: Decimal, credit: Decimal) -> Result<Decimal, CashError> {
    Ok(prior + net_change(debit, credit)?)
}

/// Checks that a movement can be reversed.
///
/// # Errors
///
/// - `ReversalOfReversal` if the movement itself reverses another
/// - `AlreadyReversed` if a reversing movement exists
pub fn ensure_reversible(
    movement_id: i64,
    reverses_id: Option<i64>,
    already_reversed: bool,
) -> Result<(), CashError> {
    if reverses_id.is_some() {
        return Err(CashError::ReversalOfReversal(movement_id));
    }
    if already_reversed {
        return Err(CashError::AlreadyReversed(movement_id));
    }
    Ok(())
}

/// Replays a movement log from `opening` in `(movement_date, id)` order.
///
/// Returns every movement's stored snapshot next to the replayed one.
#[must_use]
pub fn replay(opening: Decimal, entries: &[CashEntry]) -> Vec<ReplayedSnapshot> {
    let mut ordered: Vec<&CashEntry> = entries.iter().collect();
    ordered.sort_by_key(|e| e.order_key());

    let mut running = opening;
    ordered
        .into_iter()
        .map(|e| {
            running += e.debit - e.credit;
            ReplayedSnapshot {
                movement_id: e.id,
                stored: e.balance,
                expected: running,
            }
        })
        .collect()
}

/// Compares a bank's stored snapshots and current balance with the replay.
#[must_use]
pub fn reconcile(opening: Decimal, entries: &[CashEntry], stored_current: Decimal) -> ReconcileReport {
    let replayed = replay(opening, entries);
    let expected_current = replayed.last().map_or(opening, |s| s.expected);

    ReconcileReport {
        mismatches: replayed.into_iter().filter(|s| !s.matches()).collect(),
        stored_current,
        expected_current,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use rstest::rstest;
    use rust_decimal_macros::dec;

    fn entry(id: i64, day: u32, debit: Decimal, credit: Decimal, balance: Decimal) -> CashEntry {
        CashEntry {
            id,
            movement_date: NaiveDate::from_ymd_opt(2026, 3, day).unwrap(),
            debit,
            credit,
            balance,
        }
    }

    #[rstest]
    #[case(dec!(100), dec!(0), true)]
    #[case(dec!(0), dec!(100), true)]
    #[case(dec!(0), dec!(0), false)]
    #[case(dec!(100), dec!(100), false)]
    #[case(dec!(-5), dec!(0), false)]
    #[case(dec!(0), dec!(-5), false)]
    fn test_net_change_validation(#[case] debit: Decimal, #[case] credit: Decimal, #[case] ok: bool) {
        assert_eq!(net_change(debit, credit).is_ok(), ok);
    }

    #[test]
    fn test_next_balance() {
        assert_eq!(next_balance(dec!(500), dec!(250), dec!(0)), Ok(dec!(750)));
        assert_eq!(next_balance(dec!(500), dec!(0), dec!(800)), Ok(dec!(-300)));
    }

    #[test]
    fn test_ensure_reversible() {
        assert!(ensure_reversible(1, None, false).is_ok());
        assert_eq!(ensure_reversible(1, None, true), Err(CashError::AlreadyReversed(1)));
        assert_eq!(
            ensure_reversible(2, Some(1), false),
            Err(CashError::ReversalOfReversal(2))
        );
    }

    #[test]
    fn test_replay_orders_by_date_then_id() {
        // id 3 was inserted last but is dated first.
        let entries = vec![
            entry(1, 2, dec!(100), dec!(0), dec!(1100)),
            entry(2, 3, dec!(0), dec!(50), dec!(1050)),
            entry(3, 1, dec!(10), dec!(0), dec!(1010)),
        ];
        let replayed = replay(dec!(1000), &entries);
        let ids: Vec<i64> = replayed.iter().map(|s| s.movement_id).collect();
        assert_eq!(ids, vec![3, 1, 2]);
        assert_eq!(replayed[2].expected, dec!(1060));
    }

    #[test]
    fn test_reconcile_consistent() {
        let entries = vec![
            entry(1, 1, dec!(100), dec!(0), dec!(1100)),
            entry(2, 2, dec!(0), dec!(40), dec!(1060)),
        ];
        let report = reconcile(dec!(1000), &entries, dec!(1060));
        assert!(report.is_consistent());
        assert_eq!(report.drift(), Decimal::ZERO);
    }

    #[test]
    fn test_reconcile_reports_mismatches() {
        let entries = vec![
            entry(1, 1, dec!(100), dec!(0), dec!(1100)),
            entry(2, 2, dec!(0), dec!(40), dec!(1070)),
        ];
        let report = reconcile(dec!(1000), &entries, dec!(1075));
        assert!(!report.is_consistent());
        assert_eq!(report.mismatches.len(), 1);
        assert_eq!(report.mismatches[0].movement_id, 2);
        assert_eq!(report.mismatches[0].expected, dec!(1060));
        assert_eq!(report.drift(), dec!(15));
    }

    #[test]
    fn test_reconcile_empty_log() {
        let report = reconcile(dec!(250), &[], dec!(250));
        assert!(report.is_consistent());
        assert_eq!(report.expected_current, dec!(250));
    }
}
