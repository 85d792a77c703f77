//! Reversal of posted journal entries.
//!
//! A posted entry is never edited. It is cancelled by a new entry whose
//! lines swap every debit and credit.

use uuid::Uuid;

use super::error::LedgerError;
use super::types::{JournalLine, JournalStatus};

/// Checks that an entry in `status` can be reversed.
///
/// # Errors
///
/// - `AlreadyReversed` if the entry is already reversed
/// - `NotPosted` if the entry is still a draft
pub fn ensure_reversible(entry_id: Uuid, status: JournalStatus) -> Result<(), LedgerError> {
    match status {
        JournalStatus::Posted => Ok(()),
        JournalStatus::Reversed => Err(LedgerError::AlreadyReversed { entry_id }),
        JournalStatus::Draft => Err(LedgerError::NotPosted { entry_id, status }),
    }
}

/// Builds the reversing lines: same accounts and amounts, sides swapped.
#[must_use]
pub fn reverse_lines(lines: &[JournalLine]) -> Vec<JournalLine> {
    lines
        .iter()
        .map(|line| JournalLine {
            account_id: line.account_id,
            debit: line.credit,
            credit: line.debit,
            memo: Some(format!(
                "Reversal: {}",
                line.memo.clone().unwrap_or_default()
            )),
        })
        .collect()
}
