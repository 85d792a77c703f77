//! FIFO inventory costing.
//!
//! This module implements the pure half of the FIFO consumption engine:
//! - Cost layer and allocation types
//! - Oldest-first allocation with estimated shortfalls
//! - Restore and revoke checks used when a document is unconfirmed
//! - Layer valuation
//!
//! Loading, locking and persisting layers is the database layer's job.

pub mod engine;
pub mod error;
pub mod types;

#[cfg(test)]
mod engine_props;

pub use engine::{
    allocate, average_unit_cost, ensure_untouched, last_known_cost, restored_remaining, valuate,
};
pub use error::FifoError;
pub use types::{AllocationLine, CostLayer, FifoAllocation, LayerValuation};
