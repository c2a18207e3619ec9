//! Test-only fakes for the oracle and command runner.

use std::cell::RefCell;
use std::collections::VecDeque;
use std::time::Duration;

use anyhow::Result;

use crate::core::types::CommandResult;
use crate::error::AgentError;
use crate::io::oracle::Oracle;
use crate::io::prompt::ChatPrompt;
use crate::io::shell::CommandRunner;

/// Oracle that replays queued responses and records every prompt it receives.
///
/// A queued `None` answers with `AgentError::OracleUnavailable`; so does an
/// exhausted queue.
#[derive(Debug, Default)]
pub struct ScriptedOracle {
    responses: RefCell<VecDeque<Option<String>>>,
    prompts: RefCell<Vec<ChatPrompt>>,
}

impl ScriptedOracle {
    pub fn new<I, S>(responses: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            responses: RefCell::new(responses.into_iter().map(|r| Some(r.into())).collect()),
            prompts: RefCell::new(Vec::new()),
        }
    }

    /// Queue an unavailable-oracle failure after the current responses.
    pub fn then_fail(self) -> Self {
        self.responses.borrow_mut().push_back(None);
        self
    }

    pub fn prompts(&self) -> Vec<ChatPrompt> {
        self.prompts.borrow().clone()
    }

    pub fn call_count(&self) -> usize {
        self.prompts.borrow().len()
    }
}

impl Oracle for ScriptedOracle {
    fn propose(&self, system: &str, user: &str) -> Result<String> {
        self.prompts.borrow_mut().push(ChatPrompt {
            system: system.to_string(),
            user: user.to_string(),
        });
        match self.responses.borrow_mut().pop_front() {
            Some(Some(response)) => Ok(response),
            Some(None) => Err(AgentError::OracleUnavailable {
                reason: "scripted failure".to_string(),
            }
            .into()),
            None => Err(AgentError::OracleUnavailable {
                reason: "scripted oracle exhausted".to_string(),
            }
            .into()),
        }
    }
}

/// Runner that records commands and replays queued results.
///
/// A queued `None` fails with `AgentError::CommandTimeout`. Once the queue is
/// empty every command succeeds with empty output.
#[derive(Debug, Default)]
pub struct RecordingRunner {
    results: RefCell<VecDeque<Option<CommandResult>>>,
    commands: RefCell<Vec<String>>,
}

impl RecordingRunner {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_results<I>(results: I) -> Self
    where
        I: IntoIterator<Item = (i32, &'static str)>,
    {
        Self {
            results: RefCell::new(
                results
                    .into_iter()
                    .map(|(exit_code, output)| {
                        Some(CommandResult {
                            exit_code,
                            output: output.to_string(),
                        })
                    })
                    .collect(),
            ),
            commands: RefCell::new(Vec::new()),
        }
    }

    /// Queue a timed-out command after the current results.
    pub fn then_fail(self) -> Self {
        self.results.borrow_mut().push_back(None);
        self
    }

    pub fn commands(&self) -> Vec<String> {
        self.commands.borrow().clone()
    }
}

impl CommandRunner for RecordingRunner {
    fn run(&self, command: &str) -> Result<CommandResult> {
        self.commands.borrow_mut().push(command.to_string());
        match self.results.borrow_mut().pop_front() {
            Some(Some(result)) => Ok(result),
            Some(None) => Err(AgentError::CommandTimeout {
                command: command.to_string(),
                timeout: Duration::ZERO,
            }
            .into()),
            None => Ok(CommandResult {
                exit_code: 0,
                output: String::new(),
            }),
        }
    }
}
