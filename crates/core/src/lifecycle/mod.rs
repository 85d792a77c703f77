//! Transaction lifecycle logic.
//!
//! This module implements the pure half of the lifecycle coordinator:
//! - Document and overpayment state machines
//! - Flat-rate tax breakdown
//! - Posting rules: the journal lines each business event produces
//! - Kind-specific business rules (stock, returns, payments, profit)
//! - Document number format and retry backoff

pub mod error;
pub mod numbering;
pub mod posting;
pub mod rules;
pub mod status;
pub mod tax;

#[cfg(test)]
mod posting_props;
#[cfg(test)]
mod status_props;

pub use error::LifecycleError;
pub use numbering::{
    JOURNAL_PREFIX, backoff_range, format_number, next_sequence, number_prefix, number_stem,
};
pub use posting::{PostingAccounts, StockAdjustmentCost};
pub use rules::{
    PaymentDirection, PaymentSplit, ProfitStatus, Settlement, check_outstanding,
    check_returnable, check_stock, line_profit, non_negative, nonzero_quantity, positive_quantity,
    split_payment,
};
pub use status::{
    DocumentAction, DocumentKind, DocumentStatus, OverpaymentAction, OverpaymentStatus,
    ensure_deletable,
};
pub use tax::TaxBreakdown;
