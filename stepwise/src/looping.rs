//! The agent loop: goal, plan, then strictly sequential step execution.
//!
//! A run moves through `planning -> executing(i) -> terminated(outcome)`.
//! `executing(i)` advances to `i + 1` only when the step ran (and the failure
//! policy allows a non-zero exit) or when a missing command is skipped. Every
//! other step status terminates the run immediately. An empty plan terminates
//! straight from planning with `Completed`.

use anyhow::{Context, Result};
use tracing::{debug, info, instrument, warn};

use crate::agents::executor::{ExecutorAgent, StepStatus};
use crate::agents::planner::PlannerAgent;
use crate::core::context::ExecutionContext;
use crate::core::types::{
    ExecutionRecord, FailurePolicy, NoCommandPolicy, PartialRun, Plan, RunOutcome, RunReport,
    Step,
};
use crate::io::config::AgentConfig;
use crate::io::oracle::Oracle;
use crate::io::prompt::PromptEngine;
use crate::io::shell::CommandRunner;

/// Progress notifications emitted while a run advances.
#[derive(Debug, Clone, Copy)]
pub enum AgentEvent<'a> {
    Goal(&'a str),
    Plan(&'a Plan),
    StepStarted { step: &'a Step, total: usize },
    CommandFinished(&'a ExecutionRecord),
    StepSkipped { step: &'a Step, explanation: &'a str },
    Finished(&'a RunOutcome),
}

/// Run the agent for `query` until the plan is exhausted or a step stops it.
///
/// Oracle and runner errors abort the run and are returned as `Err`; every
/// other terminal condition is reported through [`RunOutcome`]. Once a plan
/// exists, such an error carries a [`PartialRun`] context with everything done
/// so far. `config` is
/// read once and never changes during the run. Each call owns a fresh plan
/// and context, so concurrent runs never share state.
#[instrument(skip_all, fields(working_dir = working_dir))]
pub fn run_agent<O, R, F>(
    query: &str,
    working_dir: &str,
    oracle: &O,
    runner: &R,
    config: &AgentConfig,
    mut on_event: F,
) -> Result<RunReport>
where
    O: Oracle,
    R: CommandRunner,
    F: FnMut(AgentEvent<'_>),
{
    let prompts = PromptEngine::new();
    let denylist = config.denylist();
    let system = prompts.render_system(&denylist)?;
    let planner = PlannerAgent::new(&config.plan.step_tag)?;
    let executor = ExecutorAgent::new(denylist, config.context.window);

    let goal_prompt = prompts.render_goal(query)?;
    let goal = oracle
        .propose(&goal_prompt.system, &goal_prompt.user)
        .context("ask oracle for goal")?
        .trim()
        .to_string();
    info!(%goal, "goal derived");
    on_event(AgentEvent::Goal(&goal));

    let plan = planner.run(oracle, &prompts, &system, &goal)?;
    on_event(AgentEvent::Plan(&plan));

    let mut context = ExecutionContext::new(working_dir);
    let driver = StepDriver {
        oracle,
        runner,
        prompts: &prompts,
        executor: &executor,
        system: &system,
        goal: &goal,
        config,
    };
    let outcome = match driver.execute_plan(&plan, &mut context, &mut on_event) {
        Ok(outcome) => outcome,
        Err(err) => {
            // Every finished step leaves exactly one context entry.
            let failed_step = context.entries().len();
            let error = format!("{err:#}");
            warn!(step = failed_step + 1, %error, "run aborted by error");
            let partial = PartialRun {
                query: query.to_string(),
                error,
                goal,
                plan,
                context,
                failed_step,
            };
            return Err(err.context(partial));
        }
    };

    info!(%outcome, records = context.record_count(), "run finished");
    on_event(AgentEvent::Finished(&outcome));

    Ok(RunReport {
        query: query.to_string(),
        goal,
        plan,
        context,
        outcome,
    })
}

/// Borrowed collaborators shared by every step of one run.
struct StepDriver<'a, O, R> {
    oracle: &'a O,
    runner: &'a R,
    prompts: &'a PromptEngine,
    executor: &'a ExecutorAgent,
    system: &'a str,
    goal: &'a str,
    config: &'a AgentConfig,
}

impl<O: Oracle, R: CommandRunner> StepDriver<'_, O, R> {
    fn execute_plan<F: FnMut(AgentEvent<'_>)>(
        &self,
        plan: &Plan,
        context: &mut ExecutionContext,
        on_event: &mut F,
    ) -> Result<RunOutcome> {
        if plan.is_empty() {
            debug!("empty plan, nothing to execute");
            return Ok(RunOutcome::Completed);
        }

        let total = plan.len();
        for step in plan.steps() {
            on_event(AgentEvent::StepStarted { step, total });

            let status = self.executor.run(
                self.oracle,
                self.runner,
                self.prompts,
                self.system,
                self.goal,
                step,
                total,
                context,
            )?;

            match status {
                StepStatus::Completed => return Ok(RunOutcome::Completed),
                StepStatus::Blocked {
                    command, matched, ..
                } => {
                    return Ok(RunOutcome::BlockedOnStep {
                        step: step.index,
                        command,
                        matched,
                    });
                }
                StepStatus::NoCommand { explanation } => match self.config.policy.on_no_command {
                    NoCommandPolicy::Abort => {
                        return Ok(RunOutcome::NoCommandOnStep {
                            step: step.index,
                            explanation,
                        });
                    }
                    NoCommandPolicy::Skip => {
                        debug!(step = step.index + 1, "skipping step without command");
                        on_event(AgentEvent::StepSkipped {
                            step,
                            explanation: &explanation,
                        });
                        context.note_skipped(step.index, &step.description, &explanation);
                    }
                },
                StepStatus::Ran(record) => {
                    on_event(AgentEvent::CommandFinished(&record));
                    let failure = (!record.succeeded())
                        .then(|| (record.command.clone(), record.exit_code));
                    context.record(record);

                    if let Some((command, exit_code)) = failure {
                        warn!(step = step.index + 1, exit_code, "step command failed");
                        if self.config.policy.on_failure == FailurePolicy::Abort {
                            return Ok(RunOutcome::StepFailed {
                                step: step.index,
                                command,
                                exit_code,
                            });
                        }
                    }
                }
            }
        }

        Ok(RunOutcome::Completed)
    }
}
