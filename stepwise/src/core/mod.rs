//! Pure, deterministic core logic.
//!
//! Modules here must not perform I/O. They are exercised directly by unit tests
//! and composed by the orchestration layer.

pub mod context;
pub mod parser;
pub mod plan;
pub mod safety;
pub mod types;
