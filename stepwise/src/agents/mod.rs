//! Agent roles for planning and per-step execution.

pub mod executor;
pub mod planner;
