//! I/O helpers for the agent: oracle and shell processes, config, prompts, traces.

pub mod config;
pub mod oracle;
pub mod process;
pub mod prompt;
pub mod shell;
pub mod trace;
