//! JSON trace of a run (`--trace <path>`).

use std::fs;
use std::path::Path;

use anyhow::{Context, Result};
use tracing::debug;

use serde::Serialize;

/// Write `report` as pretty JSON with a trailing newline, creating parent dirs.
///
/// `report` is a finished `RunReport` or the `PartialRun` of an aborted one.
pub fn write_trace<T: Serialize>(path: &Path, report: &T) -> Result<()> {
    if let Some(parent) = path.parent()
        && !parent.as_os_str().is_empty()
    {
        fs::create_dir_all(parent)
            .with_context(|| format!("create trace dir {}", parent.display()))?;
    }
    let mut buf = serde_json::to_string_pretty(report).context("serialize run trace")?;
    buf.push('\n');
    fs::write(path, buf).with_context(|| format!("write {}", path.display()))?;
    debug!(path = %path.display(), "run trace written");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::context::ExecutionContext;
    use crate::core::types::{ExecutionRecord, PartialRun, Plan, RunOutcome, RunReport};
    use serde_json::Value;

    #[test]
    fn trace_contains_goal_plan_records_and_outcome() {
        let temp = tempfile::tempdir().expect("tempdir");
        let path = temp.path().join("traces/run.json");

        let mut context = ExecutionContext::new("/work");
        context.record(ExecutionRecord {
            step_index: 0,
            step: "Write the file".to_string(),
            explanation: "write".to_string(),
            command: "seq 1 10 > out.txt".to_string(),
            exit_code: 0,
            output: String::new(),
        });
        let report = RunReport {
            query: "count to 10".to_string(),
            goal: "Write 1..10 to out.txt".to_string(),
            plan: Plan::from_descriptions(["Write the file"]),
            context,
            outcome: RunOutcome::Completed,
        };

        write_trace(&path, &report).expect("write trace");
        let value: Value =
            serde_json::from_str(&fs::read_to_string(&path).expect("read")).expect("json");

        assert_eq!(value["goal"], "Write 1..10 to out.txt");
        assert_eq!(value["plan"]["steps"][0]["description"], "Write the file");
        assert_eq!(value["context"]["working_dir"], "/work");
        assert_eq!(value["context"]["entries"][0]["kind"], "executed");
        assert_eq!(value["context"]["entries"][0]["command"], "seq 1 10 > out.txt");
        assert_eq!(value["outcome"]["status"], "completed");
    }

    #[test]
    fn partial_run_trace_names_failed_step_and_error() {
        let temp = tempfile::tempdir().expect("tempdir");
        let path = temp.path().join("run.json");
        let partial = PartialRun {
            query: "wait".to_string(),
            goal: "Wait a while".to_string(),
            plan: Plan::from_descriptions(["Sleep"]),
            context: ExecutionContext::new("/work"),
            failed_step: 0,
            error: "run command for step 1: timed out".to_string(),
        };

        write_trace(&path, &partial).expect("write trace");
        let value: Value =
            serde_json::from_str(&fs::read_to_string(&path).expect("read")).expect("json");

        assert_eq!(value["failed_step"], 0);
        assert_eq!(value["error"], "run command for step 1: timed out");
        assert_eq!(value["plan"]["steps"][0]["description"], "Sleep");
    }
}
