//! Plan/execute/observe agent that turns a free-text query into shell commands.
//!
//! A run restates the query as a goal, asks the oracle for an ordered plan,
//! then resolves each step to exactly one shell command, gates it against a
//! denylist, executes it, and folds the observed result back into the context
//! that every later step sees. The architecture keeps a strict separation:
//!
//! - **[`core`]**: Pure, deterministic logic (safety gate, response parsing,
//!   plan extraction, context accumulation). No I/O, fully testable in isolation.
//! - **[`io`]**: Side-effecting operations (oracle process, host shell, config,
//!   prompt rendering, trace files). Isolated behind traits to enable fakes in tests.
//!
//! Orchestration modules ([`agents`], [`looping`]) coordinate core logic with
//! I/O to implement the agent loop.

pub mod agents;
pub mod core;
pub mod error;
pub mod exit_codes;
pub mod io;
pub mod logging;
pub mod looping;
#[cfg(any(test, feature = "test-support"))]
pub mod test_support;
