//! Agent configuration stored in `stepwise.toml`.

use std::fs;
use std::path::Path;
use std::time::Duration;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::core::plan::DEFAULT_STEP_TAG;
use crate::core::safety::{DEFAULT_DENYLIST, Denylist};
use crate::core::types::{FailurePolicy, NoCommandPolicy};
use crate::error::AgentError;

pub const DEFAULT_CONFIG_FILE: &str = "stepwise.toml";

/// Agent configuration (TOML).
///
/// Missing fields default to the values below. The whole value is fixed once a
/// run starts.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct AgentConfig {
    /// Tokens (or whole commands) that are never executed. Case-insensitive.
    pub denylist: Vec<String>,

    pub oracle: OracleConfig,
    pub shell: ShellConfig,
    pub policy: PolicyConfig,
    pub plan: PlanConfig,
    pub context: ContextConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct OracleConfig {
    /// Program and leading arguments; the model is appended, prompt goes to stdin.
    pub command: Vec<String>,
    /// Model identifier passed as the last argument. Empty to omit.
    pub model: String,
    pub timeout_secs: u64,
    pub output_limit_bytes: usize,
}

impl Default for OracleConfig {
    fn default() -> Self {
        Self {
            command: vec!["ollama".to_string(), "run".to_string()],
            model: "gemma2:2b-instruct-q8_0".to_string(),
            timeout_secs: 5 * 60,
            output_limit_bytes: 200_000,
        }
    }
}

impl OracleConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct ShellConfig {
    /// Shell invocation; the command string is appended as the last argument.
    pub program: Vec<String>,
    pub timeout_secs: u64,
    pub output_limit_bytes: usize,
    /// Ask the oracle to simulate command output instead of executing.
    pub simulate: bool,
}

impl Default for ShellConfig {
    fn default() -> Self {
        Self {
            program: vec!["sh".to_string(), "-c".to_string()],
            timeout_secs: 10 * 60,
            output_limit_bytes: 100_000,
            simulate: false,
        }
    }
}

impl ShellConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct PolicyConfig {
    pub on_no_command: NoCommandPolicy,
    pub on_failure: FailurePolicy,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct PlanConfig {
    /// Tag name wrapping each plan step, e.g. `step` for `<step>...</step>`.
    pub step_tag: String,
}

impl Default for PlanConfig {
    fn default() -> Self {
        Self {
            step_tag: DEFAULT_STEP_TAG.to_string(),
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct ContextConfig {
    /// Render only the last N context entries in full. Unset renders all of them.
    pub window: Option<usize>,
}

impl Default for AgentConfig {
    fn default() -> Self {
        Self {
            denylist: DEFAULT_DENYLIST.iter().map(|s| s.to_string()).collect(),
            oracle: OracleConfig::default(),
            shell: ShellConfig::default(),
            policy: PolicyConfig::default(),
            plan: PlanConfig::default(),
            context: ContextConfig::default(),
        }
    }
}

impl AgentConfig {
    pub fn validate(&self) -> Result<()> {
        if self.oracle.command.is_empty() || self.oracle.command[0].trim().is_empty() {
            return Err(invalid("oracle.command must be a non-empty array"));
        }
        if self.oracle.timeout_secs == 0 {
            return Err(invalid("oracle.timeout_secs must be > 0"));
        }
        if self.oracle.output_limit_bytes == 0 {
            return Err(invalid("oracle.output_limit_bytes must be > 0"));
        }
        if self.shell.program.is_empty() || self.shell.program[0].trim().is_empty() {
            return Err(invalid("shell.program must be a non-empty array"));
        }
        if self.shell.timeout_secs == 0 {
            return Err(invalid("shell.timeout_secs must be > 0"));
        }
        if self.shell.output_limit_bytes == 0 {
            return Err(invalid("shell.output_limit_bytes must be > 0"));
        }
        if self.plan.step_tag.trim().is_empty() {
            return Err(invalid("plan.step_tag must not be empty"));
        }
        if self.context.window == Some(0) {
            return Err(invalid("context.window must be > 0 when set"));
        }
        Ok(())
    }

    pub fn denylist(&self) -> Denylist {
        Denylist::new(&self.denylist)
    }
}

fn invalid(reason: &str) -> anyhow::Error {
    AgentError::InvalidConfig {
        reason: reason.to_string(),
    }
    .into()
}

/// Load config from a TOML file.
///
/// If the file is missing, returns `AgentConfig::default()`.
pub fn load_config(path: &Path) -> Result<AgentConfig> {
    if !path.exists() {
        debug!(path = %path.display(), "config missing, using defaults");
        let cfg = AgentConfig::default();
        cfg.validate()?;
        return Ok(cfg);
    }
    let contents = fs::read_to_string(path).with_context(|| format!("read {}", path.display()))?;
    let cfg: AgentConfig =
        toml::from_str(&contents).with_context(|| format!("parse {}", path.display()))?;
    cfg.validate()?;
    Ok(cfg)
}
