//! Prompt rendering for every oracle call the agent makes.

use anyhow::{Context, Result};
use minijinja::{Environment, context};

use crate::core::parser::DONE_TOKEN;
use crate::core::safety::Denylist;
use crate::core::types::Step;

const SYSTEM_TEMPLATE: &str = include_str!("prompts/system.md");
const GOAL_TEMPLATE: &str = include_str!("prompts/goal.md");
const PLAN_TEMPLATE: &str = include_str!("prompts/plan.md");
const STEP_TEMPLATE: &str = include_str!("prompts/step.md");
const SIMULATE_TEMPLATE: &str = include_str!("prompts/simulate.md");

const GOAL_SYSTEM: &str = "You expertly understand problems and rewrite them as clear goals.";
const SIMULATE_SYSTEM: &str = "You are simulating CLI output.";

/// System and user halves of one oracle call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChatPrompt {
    pub system: String,
    pub user: String,
}

/// Template engine wrapper around minijinja.
pub struct PromptEngine {
    env: Environment<'static>,
}

impl Default for PromptEngine {
    fn default() -> Self {
        Self::new()
    }
}

impl PromptEngine {
    pub fn new() -> Self {
        let mut env = Environment::new();
        env.add_template("system", SYSTEM_TEMPLATE)
            .expect("system template should be valid");
        env.add_template("goal", GOAL_TEMPLATE)
            .expect("goal template should be valid");
        env.add_template("plan", PLAN_TEMPLATE)
            .expect("plan template should be valid");
        env.add_template("step", STEP_TEMPLATE)
            .expect("step template should be valid");
        env.add_template("simulate", SIMULATE_TEMPLATE)
            .expect("simulate template should be valid");
        Self { env }
    }

    /// Agent system prompt: capabilities, denylist, and output protocol.
    pub fn render_system(&self, denylist: &Denylist) -> Result<String> {
        let template = self.env.get_template("system")?;
        template
            .render(context! {
                denylist => denylist.entries(),
                done_token => DONE_TOKEN,
            })
            .context("render system prompt")
    }

    pub fn render_goal(&self, query: &str) -> Result<ChatPrompt> {
        let template = self.env.get_template("goal")?;
        let user = template
            .render(context! { query => query.trim() })
            .context("render goal prompt")?;
        Ok(ChatPrompt {
            system: GOAL_SYSTEM.to_string(),
            user,
        })
    }

    pub fn render_plan(&self, system: &str, goal: &str, tag: &str) -> Result<ChatPrompt> {
        let template = self.env.get_template("plan")?;
        let user = template
            .render(context! { goal => goal.trim(), tag => tag })
            .context("render plan prompt")?;
        Ok(ChatPrompt {
            system: system.to_string(),
            user,
        })
    }

    pub fn render_step(
        &self,
        system: &str,
        goal: &str,
        step: &Step,
        total: usize,
        rendered_context: &str,
    ) -> Result<ChatPrompt> {
        let template = self.env.get_template("step")?;
        let user = template
            .render(context! {
                goal => goal.trim(),
                step => step.description.as_str(),
                position => step.index + 1,
                total => total,
                context => rendered_context.trim_end(),
            })
            .context("render step prompt")?;
        Ok(ChatPrompt {
            system: system.to_string(),
            user,
        })
    }

    pub fn render_simulation(&self, command: &str) -> Result<ChatPrompt> {
        let template = self.env.get_template("simulate")?;
        let user = template
            .render(context! { command => command })
            .context("render simulation prompt")?;
        Ok(ChatPrompt {
            system: SIMULATE_SYSTEM.to_string(),
            user,
        })
    }
}
