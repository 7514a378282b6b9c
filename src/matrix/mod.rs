//! Matrix planning
//!
//! - **plan**: `BuildPlan`, `BuildJob`, `RunParams` and the content-hash `PlanId`
//! - **planner**: catalog validation and job expansion

pub mod plan;
pub mod planner;

pub use plan::{BuildJob, BuildPlan, JobClass, RunParams};
