//! Shared types, errors, and configuration for Tradebook.
//!
//! This crate provides common types used across all other crates:
//! - Money and quantity rounding with decimal precision
//! - Ledger policies shared by the core logic and the database layer
//! - Application-wide error types
//! - Configuration management

pub mod config;
pub mod error;
pub mod types;

pub use config::{AppConfig, LedgerConfig, NumberingConfig, PostingAccountCodes};
pub use error::{AppError, AppResult};
pub use types::{ShortfallCostPolicy, round_money, round_quantity, round_unit_cost};
