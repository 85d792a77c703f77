//! Cash ledger types.

use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// A stored cash movement as seen by the replay.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CashEntry {
    /// Movement id; insertion order.
    pub id: i64,
    /// Movement date.
    pub movement_date: NaiveDate,
    /// Money in.
    pub debit: Decimal,
    /// Money out.
    pub credit: Decimal,
    /// Stored balance snapshot after this movement.
    pub balance: Decimal,
}

impl CashEntry {
    /// Ordering key: date, then insertion order.
    #[must_use]
    pub const fn order_key(&self) -> (NaiveDate, i64) {
        (self.movement_date, self.id)
    }
}

/// One movement's stored snapshot next to the replayed value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReplayedSnapshot {
    /// Movement id.
    pub movement_id: i64,
    /// Balance stored on the movement.
    pub stored: Decimal,
    /// Balance obtained by replaying from the opening balance.
    pub expected: Decimal,
}

impl ReplayedSnapshot {
    /// Returns true if the stored snapshot matches the replay.
    #[must_use]
    pub fn matches(&self) -> bool {
        self.stored == self.expected
    }
}

/// Result of reconciling a bank against its movement log.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReconcileReport {
    /// Snapshots that differ from the replay, in log order.
    pub mismatches: Vec<ReplayedSnapshot>,
    /// Denormalized current balance stored on the bank.
    pub stored_current: Decimal,
    /// Opening balance plus every movement's debit minus credit.
    pub expected_current: Decimal,
}

impl ReconcileReport {
    /// Returns true if every snapshot and the current balance agree.
    #[must_use]
    pub fn is_consistent(&self) -> bool {
        self.mismatches.is_empty() && self.stored_current == self.expected_current
    }

    /// Stored current balance minus the replayed one.
    #[must_use]
    pub fn drift(&self) -> Decimal {
        self.stored_current - self.expected_current
    }
}
