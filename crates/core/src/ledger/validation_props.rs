//! Property-based tests for journal validation and reversal.
//!
//! - Property 1: Balanced entries are accepted, imbalances rejected
//! - Property 2: A reversal exactly cancels the original

use proptest::prelude::*;
use rust_decimal::Decimal;
use uuid::Uuid;

use super::error::LedgerError;
use super::reversal::reverse_lines;
use super::types::{JournalLine, JournalTotals};
use super::validation::validate_lines;

/// Strategy to generate positive decimal amounts (0.01 to 10,000.00).
fn positive_amount() -> impl Strategy<Value = Decimal> {
    (1i64..1_000_000i64).prop_map(|cents| Decimal::new(cents, 2))
}

/// Builds a balanced entry: the debit amounts, then their total credited
/// across two accounts.
fn balanced(debits: &[Decimal]) -> Vec<JournalLine> {
    let total: Decimal = debits.iter().sum();
    let half = (total / Decimal::TWO).round_dp(2);
    let mut lines: Vec<JournalLine> = debits
        .iter()
        .map(|amount| JournalLine::debit(Uuid::new_v4(), *amount))
        .collect();
    lines.push(JournalLine::credit(Uuid::new_v4(), total - half));
    if half > Decimal::ZERO {
        lines.push(JournalLine::credit(Uuid::new_v4(), half));
    }
    lines
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(100))]

    // =========================================================================
    // Property 1: Balance integrity
    // =========================================================================

    /// Property 1.1: entries whose debits equal their credits are accepted.
    #[test]
    fn prop_balanced_accepted(debits in prop::collection::vec(positive_amount(), 1..6)) {
        let lines = balanced(&debits);
        let totals = validate_lines(&lines).unwrap();
        prop_assert_eq!(totals.debit, totals.credit);
        prop_assert_eq!(totals.debit, debits.iter().copied().sum::<Decimal>());
    }

    /// Property 1.2: any one-cent imbalance is rejected.
    #[test]
    fn prop_imbalance_rejected(debits in prop::collection::vec(positive_amount(), 1..6)) {
        let mut lines = balanced(&debits);
        lines.push(JournalLine::debit(Uuid::new_v4(), Decimal::new(1, 2)));
        let is_unbalanced = matches!(validate_lines(&lines), Err(LedgerError::Unbalanced { .. }));
        prop_assert!(is_unbalanced);
    }

    // =========================================================================
    // Property 2: Reversal cancels
    // =========================================================================

    /// Property 2.1: the reversing lines are valid and, per account, net the
    /// original to zero.
    #[test]
    fn prop_reversal_cancels(debits in prop::collection::vec(positive_amount(), 1..6)) {
        let lines = balanced(&debits);
        let reversed = reverse_lines(&lines);

        prop_assert!(validate_lines(&reversed).is_ok());
        for (orig, rev) in lines.iter().zip(&reversed) {
            prop_assert_eq!(orig.account_id, rev.account_id);
            prop_assert_eq!(orig.debit - orig.credit + rev.debit - rev.credit, Decimal::ZERO);
        }

        let both: Vec<JournalLine> = lines.iter().chain(&reversed).cloned().collect();
        let totals = JournalTotals::of(&both);
        prop_assert_eq!(totals.debit, totals.credit);
    }
}
