//! Typed error kinds that callers may want to tell apart.
//!
//! Everything else travels as a plain `anyhow::Error` with context. These
//! variants are wrapped into `anyhow` at the boundary where they arise and can
//! be recovered with `err.downcast_ref::<AgentError>()`.

use std::time::Duration;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum AgentError {
    /// The oracle could not be reached or exited unsuccessfully.
    #[error("oracle unavailable: {reason}")]
    OracleUnavailable { reason: String },

    /// The oracle did not answer within its configured timeout.
    #[error("oracle timed out after {timeout:?}")]
    OracleTimeout { timeout: Duration },

    /// A command ran past the shell timeout and was killed.
    #[error("command `{command}` timed out after {timeout:?}")]
    CommandTimeout { command: String, timeout: Duration },

    /// Configuration failed validation.
    #[error("invalid config: {reason}")]
    InvalidConfig { reason: String },
}
