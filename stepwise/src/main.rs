//! Autonomous command-execution agent.
//!
//! Restates a free-text query as a goal, plans it into steps, and resolves each
//! step to one shell command that is gated against a denylist before it runs.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::Parser;
use stepwise::core::types::{FailurePolicy, NoCommandPolicy, PartialRun, RunOutcome};
use stepwise::exit_codes;
use stepwise::io::config::{AgentConfig, DEFAULT_CONFIG_FILE, load_config};
use stepwise::io::oracle::ProcessOracle;
use stepwise::io::shell::{ShellRunner, SimulatedRunner};
use stepwise::io::trace::write_trace;
use stepwise::logging;
use stepwise::looping::{AgentEvent, run_agent};

#[derive(Parser)]
#[command(
    name = "stepwise",
    version,
    about = "Plan, gate and execute shell commands for a free-text query"
)]
struct Cli {
    /// What you want done, in plain words.
    query: String,

    /// Path to the TOML config file. Missing file means defaults.
    #[arg(long, default_value = DEFAULT_CONFIG_FILE)]
    config: PathBuf,

    /// Model identifier passed to the oracle command.
    #[arg(long)]
    model: Option<String>,

    /// Directory commands run in (defaults to the current directory).
    #[arg(long)]
    workdir: Option<PathBuf>,

    /// What to do when a command exits non-zero.
    #[arg(long, value_enum)]
    on_failure: Option<FailurePolicy>,

    /// What to do when the oracle proposes no command.
    #[arg(long, value_enum)]
    on_no_command: Option<NoCommandPolicy>,

    /// Extra denylist entry (repeatable).
    #[arg(long = "deny", value_name = "TOKEN")]
    deny: Vec<String>,

    /// Ask the oracle to simulate command output instead of executing.
    #[arg(long)]
    simulate: bool,

    /// Write the goal, plan, context and outcome as JSON to this path.
    #[arg(long, value_name = "PATH")]
    trace: Option<PathBuf>,

    /// Log progress at info level (overridden by `RUST_LOG`).
    #[arg(short, long)]
    verbose: bool,
}

fn main() {
    let cli = Cli::parse();
    logging::init(cli.verbose);
    match run(&cli) {
        Ok(code) => std::process::exit(code),
        Err(err) => {
            eprintln!("error: {:#}", err);
            std::process::exit(exit_codes::INVALID);
        }
    }
}

fn run(cli: &Cli) -> Result<i32> {
    let mut config = load_config(&cli.config)?;
    apply_overrides(&mut config, cli);
    config.validate()?;

    let workdir = resolve_workdir(cli.workdir.as_deref())?;
    let working_dir = workdir.display().to_string();
    let oracle = ProcessOracle::from_config(&config.oracle);

    println!("Query: {}", cli.query);
    let result = if config.shell.simulate {
        let runner = SimulatedRunner::new(&oracle);
        run_agent(&cli.query, &working_dir, &oracle, &runner, &config, print_event)
    } else {
        let runner = ShellRunner::new(&config.shell, &workdir);
        run_agent(&cli.query, &working_dir, &oracle, &runner, &config, print_event)
    };

    let report = match result {
        Ok(report) => report,
        Err(err) => {
            if let (Some(path), Some(partial)) = (&cli.trace, err.downcast_ref::<PartialRun>()) {
                write_trace(path, partial)?;
            }
            return Err(err);
        }
    };
    if let Some(path) = &cli.trace {
        write_trace(path, &report)?;
    }
    Ok(report.outcome.exit_code())
}

fn apply_overrides(config: &mut AgentConfig, cli: &Cli) {
    if let Some(model) = &cli.model {
        config.oracle.model = model.clone();
    }
    if let Some(policy) = cli.on_failure {
        config.policy.on_failure = policy;
    }
    if let Some(policy) = cli.on_no_command {
        config.policy.on_no_command = policy;
    }
    config.denylist.extend(cli.deny.iter().cloned());
    if cli.simulate {
        config.shell.simulate = true;
    }
}

fn resolve_workdir(workdir: Option<&Path>) -> Result<PathBuf> {
    let dir = match workdir {
        Some(dir) => dir.to_path_buf(),
        None => std::env::current_dir().context("resolve current directory")?,
    };
    dir.canonicalize()
        .with_context(|| format!("resolve workdir {}", dir.display()))
}

fn print_event(event: AgentEvent<'_>) {
    match event {
        AgentEvent::Goal(goal) => println!("Goal: {goal}"),
        AgentEvent::Plan(plan) => {
            println!("Plan:");
            for step in plan.steps() {
                println!("  {}. {}", step.index + 1, step.description);
            }
        }
        AgentEvent::StepStarted { step, total } => {
            println!("\nStep {}/{}: {}", step.index + 1, total, step.description);
        }
        AgentEvent::CommandFinished(record) => {
            if !record.explanation.is_empty() {
                println!("{}", record.explanation);
            }
            println!("Executed: {}", record.command);
            if !record.output.is_empty() {
                println!("Output:\n{}", record.output);
            }
            if !record.succeeded() {
                println!("Command failed with exit code {}", record.exit_code);
            }
        }
        AgentEvent::StepSkipped { explanation, .. } => {
            println!("No command proposed, skipping: {explanation}");
        }
        AgentEvent::Finished(outcome) => match outcome {
            RunOutcome::Completed => println!("\n{outcome}."),
            _ => println!("\nStopped: {outcome}"),
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_query_only() {
        let cli = Cli::parse_from(["stepwise", "count from 1 to 10"]);
        assert_eq!(cli.query, "count from 1 to 10");
        assert_eq!(cli.config, PathBuf::from(DEFAULT_CONFIG_FILE));
        assert!(cli.on_failure.is_none());
        assert!(!cli.simulate);
    }

    #[test]
    fn parse_policies_and_denies() {
        let cli = Cli::parse_from([
            "stepwise",
            "--on-failure",
            "abort",
            "--on-no-command",
            "skip",
            "--deny",
            "curl",
            "--deny",
            "wget",
            "fix the file",
        ]);
        assert_eq!(cli.on_failure, Some(FailurePolicy::Abort));
        assert_eq!(cli.on_no_command, Some(NoCommandPolicy::Skip));
        assert_eq!(cli.deny, vec!["curl", "wget"]);
    }

    #[test]
    fn overrides_extend_config() {
        let cli = Cli::parse_from([
            "stepwise",
            "--model",
            "llama3",
            "--deny",
            "curl",
            "--simulate",
            "q",
        ]);
        let mut config = AgentConfig::default();
        apply_overrides(&mut config, &cli);

        assert_eq!(config.oracle.model, "llama3");
        assert!(config.shell.simulate);
        assert!(config.denylist().entries().contains(&"curl".to_string()));
        assert!(config.denylist().entries().contains(&"rm".to_string()));
    }
}
