//! `SeaORM` entity definitions.
//!
//! One module per table, plus the Postgres enum mappings.

pub mod banks;
pub mod cash_ins;
pub mod cash_movements;
pub mod cash_outs;
pub mod chart_of_accounts;
pub mod fifo_mappings;
pub mod items;
pub mod journal_entries;
pub mod journal_entry_details;
pub mod overpayments;
pub mod payment_details;
pub mod payments;
pub mod purchase_details;
pub mod purchase_return_details;
pub mod purchase_returns;
pub mod purchases;
pub mod sale_details;
pub mod sale_return_details;
pub mod sale_returns;
pub mod sales;
pub mod sea_orm_active_enums;
pub mod stock_adjustment_details;
pub mod stock_adjustments;
pub mod stock_movements;
pub mod transfers;
