//! Common types used across the application.

pub mod money;
pub mod policy;

pub use money::{
    MONEY_SCALE, QUANTITY_SCALE, UNIT_COST_SCALE, round_money, round_quantity, round_unit_cost,
};
pub use policy::ShortfallCostPolicy;
