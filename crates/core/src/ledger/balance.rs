//! Account balance calculations.
//!
//! Balances are reported in the account's natural sign:
//! - Asset/Expense: debit - credit (debit-normal)
//! - Liability/Equity/Income: credit - debit (credit-normal)
//!
//! A parent account's balance is the sum over its whole subtree.

use std::collections::{HashMap, HashSet};

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::types::AccountType;

/// Account balance at a point in time.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AccountBalance {
    /// The account ID.
    pub account_id: Uuid,
    /// The account's type.
    pub account_type: AccountType,
    /// Total debit amount.
    pub debit_total: Decimal,
    /// Total credit amount.
    pub credit_total: Decimal,
    /// Net balance in the account's natural sign.
    pub balance: Decimal,
}

impl AccountBalance {
    /// Builds a balance from debit and credit totals.
    #[must_use]
    pub fn from_totals(
        account_id: Uuid,
        account_type: AccountType,
        debit_total: Decimal,
        credit_total: Decimal,
    ) -> Self {
        Self {
            account_id,
            account_type,
            debit_total,
            credit_total,
            balance: account_type
                .normal_side()
                .calculate_balance_change(debit_total, credit_total),
        }
    }
}

/// Minimal view of a chart-of-accounts row for tree walks.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AccountNode {
    /// The account ID.
    pub id: Uuid,
    /// Parent account, `None` for a root.
    pub parent_id: Option<Uuid>,
}

/// Returns `root` and every account below it.
///
/// Tolerates cycles in malformed data by visiting each account once.
#[must_use]
pub fn descendants_of(nodes: &[AccountNode], root: Uuid) -> Vec<Uuid> {
    let mut children: HashMap<Uuid, Vec<Uuid>> = HashMap::new();
    for node in nodes {
        if let Some(parent) = node.parent_id {
            children.entry(parent).or_default().push(node.id);
        }
    }

    let mut seen = HashSet::from([root]);
    let mut out = vec![root];
    let mut stack = vec![root];
    while let Some(id) = stack.pop() {
        for child in children.get(&id).into_iter().flatten() {
            if seen.insert(*child) {
                out.push(*child);
                stack.push(*child);
            }
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_debit_normal_balance() {
        let b = AccountBalance::from_totals(Uuid::nil(), AccountType::Asset, dec!(1240), dec!(240));
        assert_eq!(b.balance, dec!(1000));
    }

    #[test]
    fn test_credit_normal_balance() {
        let b = AccountBalance::from_totals(Uuid::nil(), AccountType::Income, dec!(100), dec!(900));
        assert_eq!(b.balance, dec!(800));
    }

    #[test]
    fn test_descendants() {
        let assets = Uuid::new_v4();
        let current = Uuid::new_v4();
        let cash = Uuid::new_v4();
        let bank = Uuid::new_v4();
        let other = Uuid::new_v4();
        let nodes = vec![
            AccountNode { id: assets, parent_id: None },
            AccountNode { id: current, parent_id: Some(assets) },
            AccountNode { id: cash, parent_id: Some(current) },
            AccountNode { id: bank, parent_id: Some(current) },
            AccountNode { id: other, parent_id: None },
        ];

        let mut ids = descendants_of(&nodes, assets);
        ids.sort();
        let mut expected = vec![assets, current, cash, bank];
        expected.sort();
        assert_eq!(ids, expected);

        assert_eq!(descendants_of(&nodes, cash), vec![cash]);
    }

    #[test]
    fn test_descendants_survives_cycle() {
        let a = Uuid::new_v4();
        let b = Uuid::new_v4();
        let nodes = vec![
            AccountNode { id: a, parent_id: Some(b) },
            AccountNode { id: b, parent_id: Some(a) },
        ];
        assert_eq!(descendants_of(&nodes, a).len(), 2);
    }

    // ========================================================================
    // Natural-sign balance is antisymmetric between the two sides
    // ========================================================================

    fn amount() -> impl Strategy<Value = Decimal> {
        (0i64..10_000_000i64).prop_map(|cents| Decimal::new(cents, 2))
    }

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(100))]

        /// Swapping debits and credits (a reversal) negates the balance.
        #[test]
        fn prop_reversal_negates_balance(debit in amount(), credit in amount()) {
            for account_type in [
                AccountType::Asset,
                AccountType::Liability,
                AccountType::Equity,
                AccountType::Income,
                AccountType::Expense,
            ] {
                let original = AccountBalance::from_totals(Uuid::nil(), account_type, debit, credit);
                let reversed = AccountBalance::from_totals(Uuid::nil(), account_type, credit, debit);
                prop_assert_eq!(original.balance + reversed.balance, Decimal::ZERO);
            }
        }
    }
}
