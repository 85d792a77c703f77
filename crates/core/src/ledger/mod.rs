//! Double-entry bookkeeping logic.
//!
//! This module implements the pure half of the journal posting engine:
//! - Account types and their normal balance side
//! - Journal lines and totals
//! - Line and account validation before posting
//! - Reversal by swapping debits and credits
//! - Natural-sign balances and account tree roll-up
//! - Error types for ledger operations

pub mod balance;
pub mod error;
pub mod reversal;
pub mod types;
pub mod validation;

#[cfg(test)]
mod validation_props;

pub use balance::{AccountBalance, AccountNode, descendants_of};
pub use error::LedgerError;
pub use reversal::{ensure_reversible, reverse_lines};
pub use types::{AccountInfo, AccountType, JournalLine, JournalStatus, JournalTotals, NormalSide};
pub use validation::{drop_zero_lines, validate_account, validate_lines};
