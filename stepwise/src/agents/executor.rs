//! Executor agent: resolves one plan step to one gated command and runs it.

use anyhow::{Context, Result};
use tracing::{debug, info, instrument, warn};

use crate::core::context::ExecutionContext;
use crate::core::parser::parse_response;
use crate::core::safety::{Denylist, classify};
use crate::core::types::{CommandDecision, ExecutionRecord, SafetyVerdict, Step};
use crate::io::oracle::Oracle;
use crate::io::prompt::PromptEngine;
use crate::io::shell::CommandRunner;

/// Result of executing a single step.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StepStatus {
    /// The oracle declared the goal reached; nothing ran.
    Completed,
    /// The response carried no command; nothing ran.
    NoCommand { explanation: String },
    /// The command matched the denylist; nothing ran.
    Blocked {
        explanation: String,
        command: String,
        matched: String,
    },
    /// The command ran. `record.exit_code` drives the caller's failure policy.
    Ran(ExecutionRecord),
}

/// Step executor wrapper that owns the gate and prompt settings.
#[derive(Debug, Clone)]
pub struct ExecutorAgent {
    denylist: Denylist,
    context_window: Option<usize>,
}

impl ExecutorAgent {
    pub fn new(denylist: Denylist, context_window: Option<usize>) -> Self {
        Self {
            denylist,
            context_window,
        }
    }

    pub fn denylist(&self) -> &Denylist {
        &self.denylist
    }

    /// Make exactly one oracle call and at most one runner call for `step`.
    ///
    /// A command the gate blocks is never handed to `runner`.
    #[instrument(skip_all, fields(step = step.index + 1, total = total))]
    #[allow(clippy::too_many_arguments)]
    pub fn run<O: Oracle, R: CommandRunner>(
        &self,
        oracle: &O,
        runner: &R,
        prompts: &PromptEngine,
        system: &str,
        goal: &str,
        step: &Step,
        total: usize,
        context: &ExecutionContext,
    ) -> Result<StepStatus> {
        let rendered_context = context.render(self.context_window);
        let prompt = prompts.render_step(system, goal, step, total, &rendered_context)?;
        let response = oracle
            .propose(&prompt.system, &prompt.user)
            .with_context(|| format!("ask oracle for step {}", step.index + 1))?;

        let (explanation, command) = match parse_response(&response) {
            CommandDecision::PlanComplete => {
                info!("oracle declared the goal complete");
                return Ok(StepStatus::Completed);
            }
            CommandDecision::NoCommand { explanation } => {
                warn!("oracle response had no command");
                return Ok(StepStatus::NoCommand { explanation });
            }
            CommandDecision::Command {
                explanation,
                command,
            } => (explanation, command),
        };

        if let SafetyVerdict::Blocked { matched } = classify(&command, &self.denylist) {
            warn!(%command, %matched, "command blocked by denylist");
            return Ok(StepStatus::Blocked {
                explanation,
                command,
                matched,
            });
        }

        debug!(%command, "command passed safety gate");
        let result = runner
            .run(&command)
            .with_context(|| format!("run command for step {}", step.index + 1))?;
        Ok(StepStatus::Ran(ExecutionRecord {
            step_index: step.index,
            step: step.description.clone(),
            explanation,
            command,
            exit_code: result.exit_code,
            output: result.output,
        }))
    }
}
