//! Per-bank running balance arithmetic.
//!
//! Each cash movement stores the bank balance immediately after it, ordered
//! by `(movement_date, id)`. This module holds the pure arithmetic:
//! - Amount validation and the next snapshot
//! - Replay of a movement log against its stored snapshots

pub mod error;
pub mod running;
pub mod types;

#[cfg(test)]
mod running_props;

pub use error::CashError;
pub use running::{ensure_reversible, net_change, next_balance, reconcile, replay};
pub use types::{CashEntry, ReconcileReport, ReplayedSnapshot};
