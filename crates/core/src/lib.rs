//! Core business logic for Tradebook.
//!
//! This crate contains pure business logic with ZERO web or database dependencies.
//! All domain types, validation rules, and calculations live here.
//!
//! # Modules
//!
//! - `fifo` - FIFO cost layer allocation and shortfall estimation
//! - `ledger` - Double-entry journal lines, validation, reversal and balances
//! - `cash` - Per-bank running balance arithmetic and replay
//! - `lifecycle` - Document state machines, posting rules, tax and numbering
//! - `origin` - References from ledger effects back to their documents

pub mod cash;
pub mod fifo;
pub mod ledger;
pub mod lifecycle;
pub mod origin;
