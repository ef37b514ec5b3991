//! Plan domain - subscription tiers and category permissions.

mod plan;

pub use plan::{AccessType, NewPlan, Plan};
