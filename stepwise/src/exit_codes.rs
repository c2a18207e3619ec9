//! Stable exit codes for the stepwise CLI.

/// Every plan step ran (or the oracle declared the plan complete).
pub const OK: i32 = 0;
/// The run aborted on an error (invalid config, oracle unavailable, timeout).
pub const INVALID: i32 = 1;
/// A proposed command matched the denylist and was never executed.
pub const BLOCKED: i32 = 3;
/// A command exited non-zero under the `abort` failure policy.
pub const STEP_FAILED: i32 = 4;
/// The oracle produced no command under the `abort` no-command policy.
pub const NO_COMMAND: i32 = 5;
