//! Execution planning (split/merge)
//!
//! Portfolio state machine, the augmenting-path plan engine and the plan
//! result types.
//!
//! Author: AI-Generated
//! Created: 2026-02-19

pub mod engine;
pub mod plan;
pub mod portfolio;

pub use engine::{ExecutionPlanEngine, PlanOutcome};
pub use plan::{ExecutionPlan, PlanFill, PlanStep};
pub use portfolio::PortfolioState;
