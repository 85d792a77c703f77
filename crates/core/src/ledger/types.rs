//! Ledger domain types for journal posting and validation.

use std::fmt;

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Chart-of-accounts type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AccountType {
    /// Things the business owns.
    Asset,
    /// Things the business owes.
    Liability,
    /// Owner's stake.
    Equity,
    /// Revenue and other income.
    Income,
    /// Costs and expenses.
    Expense,
}

impl AccountType {
    /// Side on which this account type's balance grows.
    ///
    /// - Asset/Expense: debit-normal
    /// - Liability/Equity/Income: credit-normal
    #[must_use]
    pub const fn normal_side(self) -> NormalSide {
        match self {
            Self::Asset | Self::Expense => NormalSide::Debit,
            Self::Liability | Self::Equity | Self::Income => NormalSide::Credit,
        }
    }

    /// Returns the persisted string for this account type.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Asset => "asset",
            Self::Liability => "liability",
            Self::Equity => "equity",
            Self::Income => "income",
            Self::Expense => "expense",
        }
    }
}

impl fmt::Display for AccountType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Normal balance side of an account.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum NormalSide {
    /// Balance = debit - credit.
    Debit,
    /// Balance = credit - debit.
    Credit,
}

impl NormalSide {
    /// Calculates the natural-sign balance change for a debit/credit pair.
    #[must_use]
    pub fn calculate_balance_change(self, debit: Decimal, credit: Decimal) -> Decimal {
        match self {
            Self::Debit => debit - credit,
            Self::Credit => credit - debit,
        }
    }
}

/// Journal entry status.
///
/// Entries are created `posted`; `draft` exists for entries prepared
/// outside the lifecycle and never counts toward balances.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum JournalStatus {
    /// Prepared but not posted.
    Draft,
    /// Posted to the ledger.
    Posted,
    /// Posted and later cancelled by a reversing entry.
    Reversed,
}

impl JournalStatus {
    /// Returns true if the entry's lines count toward account balances.
    ///
    /// A reversed entry still counts; its reversing entry cancels it out.
    #[must_use]
    pub const fn counts_toward_balance(self) -> bool {
        matches!(self, Self::Posted | Self::Reversed)
    }

    /// Returns the persisted string for this status.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Draft => "draft",
            Self::Posted => "posted",
            Self::Reversed => "reversed",
        }
    }
}

impl fmt::Display for JournalStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One line of a journal entry.
///
/// Both amounts are always present; exactly one of them is non-zero.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct JournalLine {
    /// Leaf account the line posts to.
    pub account_id: Uuid,
    /// Debit amount.
    pub debit: Decimal,
    /// Credit amount.
    pub credit: Decimal,
    /// Optional line memo.
    pub memo: Option<String>,
}

impl JournalLine {
    /// Creates a debit line.
    #[must_use]
    pub const fn debit(account_id: Uuid, amount: Decimal) -> Self {
        Self {
            account_id,
            debit: amount,
            credit: Decimal::ZERO,
            memo: None,
        }
    }

    /// Creates a credit line.
    #[must_use]
    pub const fn credit(account_id: Uuid, amount: Decimal) -> Self {
        Self {
            account_id,
            debit: Decimal::ZERO,
            credit: amount,
            memo: None,
        }
    }

    /// Attaches a memo to the line.
    #[must_use]
    pub fn with_memo(mut self, memo: impl Into<String>) -> Self {
        self.memo = Some(memo.into());
        self
    }

    /// Returns true if neither side carries an amount.
    #[must_use]
    pub fn is_zero(&self) -> bool {
        self.debit.is_zero() && self.credit.is_zero()
    }
}

/// Debit and credit totals of a set of lines.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct JournalTotals {
    /// Sum of debits.
    pub debit: Decimal,
    /// Sum of credits.
    pub credit: Decimal,
}

impl JournalTotals {
    /// Sums the lines.
    #[must_use]
    pub fn of(lines: &[JournalLine]) -> Self {
        lines.iter().fold(Self::default(), |acc, l| Self {
            debit: acc.debit + l.debit,
            credit: acc.credit + l.credit,
        })
    }

    /// Returns true if debits equal credits.
    #[must_use]
    pub fn is_balanced(&self) -> bool {
        self.debit == self.credit
    }
}

/// Information about an account needed for posting validation.
#[derive(Debug, Clone)]
pub struct AccountInfo {
    /// The account ID.
    pub id: Uuid,
    /// Whether the account is active.
    pub is_active: bool,
    /// Whether any account names this one as parent.
    pub has_children: bool,
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_normal_sides() {
        assert_eq!(AccountType::Asset.normal_side(), NormalSide::Debit);
        assert_eq!(AccountType::Expense.normal_side(), NormalSide::Debit);
        assert_eq!(AccountType::Liability.normal_side(), NormalSide::Credit);
        assert_eq!(AccountType::Equity.normal_side(), NormalSide::Credit);
        assert_eq!(AccountType::Income.normal_side(), NormalSide::Credit);
    }

    #[test]
    fn test_balance_change() {
        assert_eq!(
            NormalSide::Debit.calculate_balance_change(dec!(100), dec!(30)),
            dec!(70)
        );
        assert_eq!(
            NormalSide::Credit.calculate_balance_change(dec!(100), dec!(30)),
            dec!(-70)
        );
    }

    #[test]
    fn test_status_counts_toward_balance() {
        assert!(!JournalStatus::Draft.counts_toward_balance());
        assert!(JournalStatus::Posted.counts_toward_balance());
        assert!(JournalStatus::Reversed.counts_toward_balance());
    }

    #[test]
    fn test_totals() {
        let a = Uuid::new_v4();
        let lines = vec![
            JournalLine::debit(a, dec!(100)),
            JournalLine::credit(a, dec!(60)),
            JournalLine::credit(a, dec!(40)),
        ];
        let totals = JournalTotals::of(&lines);
        assert_eq!(totals.debit, dec!(100));
        assert_eq!(totals.credit, dec!(100));
        assert!(totals.is_balanced());
    }
}
