//! Oracle abstraction for model invocation.
//!
//! The [`Oracle`] trait decouples the agent loop from the actual model backend
//! (by default `ollama run <model>`). Tests use scripted oracles that return
//! predetermined responses without spawning processes.

use std::process::Command;
use std::time::Duration;

use anyhow::{Context, Result};
use tracing::{debug, info, instrument, warn};

use crate::error::AgentError;
use crate::io::config::OracleConfig;
use crate::io::process::run_command_with_timeout;

/// Single-shot, stateless decision oracle. All history travels in `user`.
pub trait Oracle {
    fn propose(&self, system: &str, user: &str) -> Result<String>;
}

impl<O: Oracle + ?Sized> Oracle for &O {
    fn propose(&self, system: &str, user: &str) -> Result<String> {
        (**self).propose(system, user)
    }
}

/// Oracle that spawns a model CLI and feeds the prompt through stdin.
#[derive(Debug, Clone)]
pub struct ProcessOracle {
    argv: Vec<String>,
    timeout: Duration,
    output_limit_bytes: usize,
}

impl ProcessOracle {
    pub fn new(argv: Vec<String>, timeout: Duration, output_limit_bytes: usize) -> Self {
        Self {
            argv,
            timeout,
            output_limit_bytes,
        }
    }

    pub fn from_config(config: &OracleConfig) -> Self {
        let mut argv = config.command.clone();
        if !config.model.trim().is_empty() {
            argv.push(config.model.clone());
        }
        Self::new(argv, config.timeout(), config.output_limit_bytes)
    }
}

impl Oracle for ProcessOracle {
    #[instrument(skip_all, fields(program = %self.argv.first().map(String::as_str).unwrap_or(""), timeout_secs = self.timeout.as_secs()))]
    fn propose(&self, system: &str, user: &str) -> Result<String> {
        let Some((program, args)) = self.argv.split_first() else {
            return Err(AgentError::OracleUnavailable {
                reason: "oracle command is empty".to_string(),
            }
            .into());
        };

        let mut cmd = Command::new(program);
        cmd.args(args);
        let prompt = render_chat(system, user);
        info!(prompt_bytes = prompt.len(), "asking oracle");

        let output = run_command_with_timeout(
            cmd,
            Some(prompt.as_bytes()),
            self.timeout,
            self.output_limit_bytes,
        )
        .map_err(|err| AgentError::OracleUnavailable {
            reason: format!("{err:#}"),
        })
        .with_context(|| format!("run oracle {program}"))?;

        if output.timed_out {
            warn!(timeout_secs = self.timeout.as_secs(), "oracle timed out");
            return Err(AgentError::OracleTimeout {
                timeout: self.timeout,
            }
            .into());
        }
        if !output.status.success() {
            warn!(exit_code = ?output.status.code(), "oracle failed");
            return Err(AgentError::OracleUnavailable {
                reason: format!(
                    "{program} exited with status {:?}: {}",
                    output.status.code(),
                    String::from_utf8_lossy(&output.stderr.bytes).trim()
                ),
            }
            .into());
        }

        let response = output.stdout_lossy();
        debug!(response_bytes = response.len(), "oracle answered");
        Ok(response)
    }
}

/// Flatten a system/user prompt pair for CLIs that take a single prompt.
fn render_chat(system: &str, user: &str) -> String {
    format!("{}\n\n{}\n", system.trim(), user.trim())
}
