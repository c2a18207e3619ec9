//! Planner agent: turns a goal into an ordered plan with a single oracle call.

use anyhow::{Context, Result};
use tracing::{debug, info, instrument, warn};

use crate::core::plan::StepExtractor;
use crate::core::types::Plan;
use crate::io::oracle::Oracle;
use crate::io::prompt::PromptEngine;

/// Planner wrapper that owns the step delimiter settings.
#[derive(Debug, Clone)]
pub struct PlannerAgent {
    extractor: StepExtractor,
}

impl PlannerAgent {
    pub fn new(step_tag: &str) -> Result<Self> {
        Ok(Self {
            extractor: StepExtractor::new(step_tag)?,
        })
    }

    /// Ask the oracle for a plan and extract its delimited steps.
    ///
    /// Malformed output is not retried; it simply yields fewer (or zero) steps.
    #[instrument(skip_all, fields(tag = self.extractor.tag()))]
    pub fn run<O: Oracle>(
        &self,
        oracle: &O,
        prompts: &PromptEngine,
        system: &str,
        goal: &str,
    ) -> Result<Plan> {
        let prompt = prompts.render_plan(system, goal, self.extractor.tag())?;
        let response = oracle
            .propose(&prompt.system, &prompt.user)
            .context("ask oracle for plan")?;
        debug!(response_bytes = response.len(), "plan response received");

        let plan = self.extractor.extract(&response);
        if plan.is_empty() {
            warn!("plan response contained no delimited steps");
        } else {
            info!(steps = plan.len(), "plan built");
        }
        Ok(plan)
    }
}
