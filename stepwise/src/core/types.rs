//! Shared deterministic types for the agent core.
//!
//! These types define stable contracts between core components. They should not
//! depend on external state or I/O.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::core::context::ExecutionContext;

/// One unit of the plan, identified by its zero-based position.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Step {
    pub index: usize,
    pub description: String,
}

/// Ordered, immutable sequence of steps produced once per run.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Plan {
    steps: Vec<Step>,
}

impl Plan {
    pub fn from_descriptions<I, S>(descriptions: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let steps = descriptions
            .into_iter()
            .enumerate()
            .map(|(index, description)| Step {
                index,
                description: description.into(),
            })
            .collect();
        Self { steps }
    }

    pub fn steps(&self) -> &[Step] {
        &self.steps
    }

    pub fn len(&self) -> usize {
        self.steps.len()
    }

    pub fn is_empty(&self) -> bool {
        self.steps.is_empty()
    }
}

/// Parsed output of one oracle call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CommandDecision {
    /// The oracle signalled that the goal is already reached.
    PlanComplete,
    /// The oracle proposed exactly one command.
    Command { explanation: String, command: String },
    /// The response carried no recognizable command marker.
    NoCommand { explanation: String },
}

/// Result of gating a command against the denylist.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SafetyVerdict {
    Safe,
    /// `matched` is the denylist entry that triggered the block.
    Blocked { matched: String },
}

impl SafetyVerdict {
    pub fn is_blocked(&self) -> bool {
        matches!(self, SafetyVerdict::Blocked { .. })
    }
}

/// Exit code and combined stdout+stderr of one executed command.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CommandResult {
    pub exit_code: i32,
    pub output: String,
}

/// Observed outcome of one executed step, appended to the context.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ExecutionRecord {
    pub step_index: usize,
    pub step: String,
    pub explanation: String,
    pub command: String,
    pub exit_code: i32,
    pub output: String,
}

impl ExecutionRecord {
    pub fn succeeded(&self) -> bool {
        self.exit_code == 0
    }
}

/// What to do when the oracle answers a step without a command.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum NoCommandPolicy {
    /// Stop the run with `NoCommandOnStep`.
    #[default]
    Abort,
    /// Note the missing command in the context and move to the next step.
    Skip,
}

/// What to do when a command exits non-zero.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum FailurePolicy {
    /// Keep the record and move to the next step.
    #[default]
    Continue,
    /// Stop the run with `StepFailed`.
    Abort,
}

/// Terminal status of a whole run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum RunOutcome {
    Completed,
    BlockedOnStep {
        step: usize,
        command: String,
        matched: String,
    },
    NoCommandOnStep {
        step: usize,
        explanation: String,
    },
    StepFailed {
        step: usize,
        command: String,
        exit_code: i32,
    },
}

impl RunOutcome {
    pub fn exit_code(&self) -> i32 {
        match self {
            RunOutcome::Completed => crate::exit_codes::OK,
            RunOutcome::BlockedOnStep { .. } => crate::exit_codes::BLOCKED,
            RunOutcome::NoCommandOnStep { .. } => crate::exit_codes::NO_COMMAND,
            RunOutcome::StepFailed { .. } => crate::exit_codes::STEP_FAILED,
        }
    }
}

impl fmt::Display for RunOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RunOutcome::Completed => write!(f, "task completed"),
            RunOutcome::BlockedOnStep {
                step,
                command,
                matched,
            } => write!(
                f,
                "blocked on step {}: `{command}` matches denylist entry `{matched}`",
                step + 1
            ),
            RunOutcome::NoCommandOnStep { step, explanation } => {
                write!(f, "no command on step {}: {explanation}", step + 1)
            }
            RunOutcome::StepFailed {
                step,
                command,
                exit_code,
            } => write!(
                f,
                "step {} failed: `{command}` exited with code {exit_code}",
                step + 1
            ),
        }
    }
}

/// Everything observable about a finished run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RunReport {
    pub query: String,
    pub goal: String,
    pub plan: Plan,
    pub context: ExecutionContext,
    pub outcome: RunOutcome,
}

/// What a run had done when an oracle or runner error stopped it mid-plan.
///
/// Attached as context to that error, so callers can recover it with
/// `err.downcast_ref::<PartialRun>()` and still trace the run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PartialRun {
    pub query: String,
    pub goal: String,
    pub plan: Plan,
    pub context: ExecutionContext,
    /// Zero-based index of the step that was executing.
    pub failed_step: usize,
    pub error: String,
}

impl fmt::Display for PartialRun {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "run aborted on step {} of {}",
            self.failed_step + 1,
            self.plan.len()
        )
    }
}
