//! Business rule validation for journal posting.

use rust_decimal::Decimal;

use super::error::LedgerError;
use super::types::{AccountInfo, JournalLine, JournalTotals};

/// Validates a set of journal lines before posting.
///
/// Rules, checked in order:
/// 1. At least one line
/// 2. No negative amounts
/// 3. A line carries a debit or a credit, never both and never neither
/// 4. Total debits equal total credits exactly
///
/// # Errors
///
/// Returns the first rule violated.
pub fn validate_lines(lines: &[JournalLine]) -> Result<JournalTotals, LedgerError> {
    if lines.is_empty() {
        return Err(LedgerError::NoLines);
    }

    for line in lines {
        if line.debit < Decimal::ZERO || line.credit < Decimal::ZERO {
            return Err(LedgerError::NegativeAmount(line.account_id));
        }
        if !line.debit.is_zero() && !line.credit.is_zero() {
            return Err(LedgerError::BothSides(line.account_id));
        }
        if line.is_zero() {
            return Err(LedgerError::ZeroLine(line.account_id));
        }
    }

    let totals = JournalTotals::of(lines);
    if !totals.is_balanced() {
        return Err(LedgerError::Unbalanced {
            debit: totals.debit,
            credit: totals.credit,
        });
    }

    Ok(totals)
}

/// Validates that an account may receive postings.
///
/// # Errors
///
/// Returns `AccountInactive` or `AccountNotLeaf`.
pub fn validate_account(account: &AccountInfo) -> Result<(), LedgerError> {
    if !account.is_active {
        return Err(LedgerError::AccountInactive(account.id));
    }
    if account.has_children {
        return Err(LedgerError::AccountNotLeaf(account.id));
    }
    Ok(())
}

/// Removes lines that carry no amount.
///
/// Posting rules produce a fixed set of lines per event; a zero tax or a
/// zero-cost consumption simply has nothing to post.
#[must_use]
pub fn drop_zero_lines(lines: Vec<JournalLine>) -> Vec<JournalLine> {
    lines.into_iter().filter(|l| !l.is_zero()).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;
    use uuid::Uuid;

    fn account(is_active: bool, has_children: bool) -> AccountInfo {
        AccountInfo {
            id: Uuid::new_v4(),
            is_active,
            has_children,
        }
    }

    #[test]
    fn test_balanced_lines() {
        let (a, b) = (Uuid::new_v4(), Uuid::new_v4());
        let lines = vec![JournalLine::debit(a, dec!(100.00)), JournalLine::credit(b, dec!(100.00))];
        let totals = validate_lines(&lines).unwrap();
        assert_eq!(totals.debit, dec!(100.00));
    }

    #[test]
    fn test_unbalanced_lines() {
        let (a, b) = (Uuid::new_v4(), Uuid::new_v4());
        let lines = vec![JournalLine::debit(a, dec!(100.00)), JournalLine::credit(b, dec!(99.99))];
        assert_eq!(
            validate_lines(&lines),
            Err(LedgerError::Unbalanced {
                debit: dec!(100.00),
                credit: dec!(99.99),
            })
        );
    }

    #[test]
    fn test_no_lines() {
        assert_eq!(validate_lines(&[]), Err(LedgerError::NoLines));
    }

    #[test]
    fn test_line_shape_rules() {
        let a = Uuid::new_v4();

        let negative = vec![JournalLine::debit(a, dec!(-1))];
        assert_eq!(validate_lines(&negative), Err(LedgerError::NegativeAmount(a)));

        let both = vec![JournalLine {
            account_id: a,
            debit: dec!(1),
            credit: dec!(1),
            memo: None,
        }];
        assert_eq!(validate_lines(&both), Err(LedgerError::BothSides(a)));

        let zero = vec![JournalLine::debit(a, Decimal::ZERO)];
        assert_eq!(validate_lines(&zero), Err(LedgerError::ZeroLine(a)));
    }

    #[test]
    fn test_validate_account() {
        assert!(validate_account(&account(true, false)).is_ok());

        let inactive = account(false, false);
        assert_eq!(
            validate_account(&inactive),
            Err(LedgerError::AccountInactive(inactive.id))
        );

        let parent = account(true, true);
        assert_eq!(
            validate_account(&parent),
            Err(LedgerError::AccountNotLeaf(parent.id))
        );
    }

    #[test]
    fn test_drop_zero_lines() {
        let a = Uuid::new_v4();
        let lines = drop_zero_lines(vec![
            JournalLine::debit(a, dec!(10)),
            JournalLine::credit(a, Decimal::ZERO),
            JournalLine::credit(a, dec!(10)),
        ]);
        assert_eq!(lines.len(), 2);
    }
}
