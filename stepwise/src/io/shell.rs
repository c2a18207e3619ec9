//! Command runners: the host shell and an oracle-backed simulation.

use std::path::{Path, PathBuf};
use std::process::Command;
use std::time::Duration;

use anyhow::{Context, Result};
use tracing::{info, instrument, warn};

use crate::core::types::CommandResult;
use crate::error::AgentError;
use crate::io::config::ShellConfig;
use crate::io::oracle::Oracle;
use crate::io::process::run_command_with_timeout;
use crate::io::prompt::PromptEngine;

/// Executes one command string and reports its exit code and combined output.
pub trait CommandRunner {
    fn run(&self, command: &str) -> Result<CommandResult>;
}

impl<R: CommandRunner + ?Sized> CommandRunner for &R {
    fn run(&self, command: &str) -> Result<CommandResult> {
        (**self).run(command)
    }
}

/// Runs commands through the host shell (`sh -c` by default) in a fixed directory.
#[derive(Debug, Clone)]
pub struct ShellRunner {
    program: Vec<String>,
    workdir: PathBuf,
    timeout: Duration,
    output_limit_bytes: usize,
}

impl ShellRunner {
    pub fn new(config: &ShellConfig, workdir: &Path) -> Self {
        Self {
            program: config.program.clone(),
            workdir: workdir.to_path_buf(),
            timeout: config.timeout(),
            output_limit_bytes: config.output_limit_bytes,
        }
    }
}

impl CommandRunner for ShellRunner {
    #[instrument(skip_all, fields(workdir = %self.workdir.display(), timeout_secs = self.timeout.as_secs()))]
    fn run(&self, command: &str) -> Result<CommandResult> {
        let (program, args) = self
            .program
            .split_first()
            .context("shell program is empty")?;
        let mut cmd = Command::new(program);
        cmd.args(args).arg(command).current_dir(&self.workdir);

        info!(command, "executing command");
        let output = run_command_with_timeout(cmd, None, self.timeout, self.output_limit_bytes)
            .with_context(|| format!("run `{command}`"))?;

        if output.timed_out {
            warn!(command, "command timed out");
            return Err(AgentError::CommandTimeout {
                command: command.to_string(),
                timeout: self.timeout,
            }
            .into());
        }

        let result = CommandResult {
            exit_code: output.exit_code(),
            output: output.combined_lossy().trim().to_string(),
        };
        if result.exit_code != 0 {
            warn!(command, exit_code = result.exit_code, "command exited non-zero");
        }
        Ok(result)
    }
}

/// Asks the oracle what the command would print instead of running it.
///
/// Always reports exit code 0. Nothing touches the host.
pub struct SimulatedRunner<O: Oracle> {
    oracle: O,
    prompts: PromptEngine,
}

impl<O: Oracle> SimulatedRunner<O> {
    pub fn new(oracle: O) -> Self {
        Self {
            oracle,
            prompts: PromptEngine::new(),
        }
    }
}

impl<O: Oracle> CommandRunner for SimulatedRunner<O> {
    #[instrument(skip_all)]
    fn run(&self, command: &str) -> Result<CommandResult> {
        info!(command, "simulating command");
        let prompt = self.prompts.render_simulation(command)?;
        let output = self
            .oracle
            .propose(&prompt.system, &prompt.user)
            .with_context(|| format!("simulate `{command}`"))?;
        Ok(CommandResult {
            exit_code: 0,
            output: output.trim().to_string(),
        })
    }
}
