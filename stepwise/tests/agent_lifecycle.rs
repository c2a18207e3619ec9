//! Loop-level harness tests for full agent run scenarios.
//!
//! These tests drive `run_agent` with a scripted oracle to verify end-to-end
//! behavior: goal and plan derivation, the safety gate, failure policies,
//! context accumulation, and termination.

use stepwise::core::types::{FailurePolicy, NoCommandPolicy, RunOutcome};
use stepwise::io::config::AgentConfig;
use stepwise::looping::run_agent;
use stepwise::test_support::{RecordingRunner, ScriptedOracle};

fn config_with(on_failure: FailurePolicy) -> AgentConfig {
    let mut config = AgentConfig::default();
    config.policy.on_failure = on_failure;
    config.policy.on_no_command = NoCommandPolicy::Abort;
    config
}

/// Counting scenario against the real shell.
///
/// Sequence:
/// 1. Goal restated from the query
/// 2. Plan of two steps
/// 3. Step 1 writes 1..10 to out.txt, step 2 reads it back
///
/// Tests: commands really run in the workdir, one record per step in order,
/// and the loop completes after the final step.
#[cfg(unix)]
#[test]
fn counting_query_writes_file_and_completes() {
    use stepwise::io::config::ShellConfig;
    use stepwise::io::shell::ShellRunner;

    let temp = tempfile::tempdir().expect("tempdir");
    let workdir = temp.path().display().to_string();
    let oracle = ScriptedOracle::new([
        "Write the numbers 1 through 10, one per line, into out.txt.",
        "<step>Write the numbers 1 to 10 into out.txt</step>\n<step>Show out.txt</step>",
        "EXPLANATION: Write the numbers with a loop.\nCOMMAND: for i in 1 2 3 4 5 6 7 8 9 10; do echo $i; done > out.txt",
        "EXPLANATION: Check the file.\nCOMMAND: cat out.txt",
    ]);
    let runner = ShellRunner::new(&ShellConfig::default(), temp.path());

    let report = run_agent(
        "count from 1 to 10 in a file named out.txt",
        &workdir,
        &oracle,
        &runner,
        &AgentConfig::default(),
        |_| {},
    )
    .expect("run");

    assert_eq!(report.outcome, RunOutcome::Completed);
    assert_eq!(
        report.goal,
        "Write the numbers 1 through 10, one per line, into out.txt."
    );
    assert_eq!(report.plan.len(), 2);

    let written = std::fs::read_to_string(temp.path().join("out.txt")).expect("read out.txt");
    let expected: String = (1..=10).map(|i| format!("{i}\n")).collect();
    assert_eq!(written, expected);

    let records: Vec<_> = report.context.records().collect();
    assert_eq!(records.len(), 2);
    assert_eq!(records[0].step_index, 0);
    assert_eq!(records[1].step_index, 1);
    assert!(records.iter().all(|r| r.exit_code == 0));
    assert_eq!(records[1].output, expected.trim_end());
}

/// A denylisted command ends the run and never reaches the runner.
#[test]
fn blocked_command_stops_run_without_execution() {
    let oracle = ScriptedOracle::new([
        "Clean up the temp directory.",
        "<step>List files</step><step>Delete files</step><step>Confirm</step>",
        "EXPLANATION: look\nCOMMAND: ls /tmp/x",
        "EXPLANATION: delete\nCOMMAND: sudo rm -rf /tmp/x",
    ]);
    let runner = RecordingRunner::new();

    let report = run_agent(
        "clean /tmp/x",
        "/w",
        &oracle,
        &runner,
        &AgentConfig::default(),
        |_| {},
    )
    .expect("run");

    assert_eq!(
        report.outcome,
        RunOutcome::BlockedOnStep {
            step: 1,
            command: "sudo rm -rf /tmp/x".to_string(),
            matched: "sudo".to_string(),
        }
    );
    assert_eq!(runner.commands(), vec!["ls /tmp/x"]);
    assert_eq!(report.context.record_count(), 1);
    // Third step is never asked about.
    assert_eq!(oracle.call_count(), 4);
}

/// Under the abort policy a non-zero exit stops the run at that step.
#[test]
fn failing_step_aborts_and_skips_remaining_steps() {
    let oracle = ScriptedOracle::new([
        "Run the script.",
        "<step>a</step><step>b</step><step>c</step>",
        "EXPLANATION: a\nCOMMAND: ls",
        "EXPLANATION: b\nCOMMAND: python3 codey.py",
    ]);
    let runner = RecordingRunner::with_results([(0, "codey.py"), (2, "SyntaxError")]);

    let report = run_agent(
        "run codey.py",
        "/w",
        &oracle,
        &runner,
        &config_with(FailurePolicy::Abort),
        |_| {},
    )
    .expect("run");

    assert_eq!(
        report.outcome,
        RunOutcome::StepFailed {
            step: 1,
            command: "python3 codey.py".to_string(),
            exit_code: 2,
        }
    );
    assert_eq!(report.context.record_count(), 2);
    assert_eq!(runner.commands().len(), 2);
    assert_eq!(oracle.call_count(), 4);
}

/// Zero delimited steps is vacuous success.
#[test]
fn empty_plan_is_vacuous_success() {
    let oracle = ScriptedOracle::new(["Goal.", "I cannot produce steps for this."]);
    let runner = RecordingRunner::new();

    let report = run_agent("q", "/w", &oracle, &runner, &AgentConfig::default(), |_| {})
        .expect("run");

    assert_eq!(report.outcome, RunOutcome::Completed);
    assert!(runner.commands().is_empty());
    assert_eq!(report.context.record_count(), 0);
}

/// Each step prompt carries every earlier record, in order.
#[test]
fn step_prompts_accumulate_prior_records_in_order() {
    let oracle = ScriptedOracle::new([
        "Goal.",
        "<step>one</step><step>two</step><step>three</step>",
        "EXPLANATION: first\nCOMMAND: echo alpha",
        "EXPLANATION: second\nCOMMAND: echo beta",
        "EXPLANATION: third\nCOMMAND: echo gamma",
    ]);
    let runner = RecordingRunner::with_results([(0, "alpha-out"), (0, "beta-out"), (0, "gamma")]);

    run_agent("q", "/w", &oracle, &runner, &AgentConfig::default(), |_| {}).expect("run");

    let prompts = oracle.prompts();
    let step_prompts: Vec<&str> = prompts[2..].iter().map(|p| p.user.as_str()).collect();
    assert_eq!(step_prompts.len(), 3);

    assert!(!step_prompts[0].contains("Executed:"));

    assert!(step_prompts[1].contains("Executed: echo alpha"));
    assert!(step_prompts[1].contains("Output: alpha-out"));
    assert!(!step_prompts[1].contains("echo beta"));

    let alpha = step_prompts[2].find("Executed: echo alpha").expect("alpha");
    let beta = step_prompts[2].find("Executed: echo beta").expect("beta");
    assert!(alpha < beta, "records must appear in step order");
}

/// Completion token from the oracle ends the run early as a success.
#[test]
fn done_token_completes_early() {
    let oracle = ScriptedOracle::new([
        "Goal.",
        "<step>one</step><step>two</step>",
        "EXPLANATION: first\nCOMMAND: touch a",
        "Already done.\n<|DONE|>",
    ]);
    let runner = RecordingRunner::new();

    let report = run_agent("q", "/w", &oracle, &runner, &AgentConfig::default(), |_| {})
        .expect("run");

    assert_eq!(report.outcome, RunOutcome::Completed);
    assert_eq!(runner.commands(), vec!["touch a"]);
    assert_eq!(report.context.record_count(), 1);
}

/// Concurrent runs keep independent plans and contexts.
#[test]
fn parallel_runs_do_not_share_context() {
    let handles: Vec<_> = (0..2)
        .map(|n| {
            std::thread::spawn(move || {
                let command = format!("echo run-{n}");
                let oracle = ScriptedOracle::new([
                    "Goal.".to_string(),
                    "<step>only</step>".to_string(),
                    format!("EXPLANATION: x\nCOMMAND: {command}"),
                ]);
                let runner = RecordingRunner::new();
                let report =
                    run_agent("q", "/w", &oracle, &runner, &AgentConfig::default(), |_| {})
                        .expect("run");
                (command, report)
            })
        })
        .collect();

    for handle in handles {
        let (command, report) = handle.join().expect("join");
        let records: Vec<_> = report.context.records().collect();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].command, command);
    }
}
