//! Append-only execution context shared by every step of a run.
//!
//! The context is owned by the agent loop, which is the sole mutator. Step
//! executors only ever see its rendered text. Entries are never rewritten or
//! pruned; a render window shortens what the oracle sees without touching the
//! stored entries.

use serde::Serialize;

use crate::core::types::ExecutionRecord;

/// One entry in the context log.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ContextEntry {
    /// A command ran and produced a result.
    Executed(ExecutionRecord),
    /// The oracle gave no command and the run continued under the skip policy.
    Skipped {
        step_index: usize,
        step: String,
        explanation: String,
    },
}

impl ContextEntry {
    pub fn step_index(&self) -> usize {
        match self {
            ContextEntry::Executed(record) => record.step_index,
            ContextEntry::Skipped { step_index, .. } => *step_index,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ExecutionContext {
    working_dir: String,
    entries: Vec<ContextEntry>,
}

impl ExecutionContext {
    /// Empty context seeded with the working directory of the run.
    pub fn new(working_dir: impl Into<String>) -> Self {
        Self {
            working_dir: working_dir.into(),
            entries: Vec::new(),
        }
    }

    pub fn working_dir(&self) -> &str {
        &self.working_dir
    }

    pub fn record(&mut self, record: ExecutionRecord) {
        self.entries.push(ContextEntry::Executed(record));
    }

    pub fn note_skipped(&mut self, step_index: usize, step: &str, explanation: &str) {
        self.entries.push(ContextEntry::Skipped {
            step_index,
            step: step.to_string(),
            explanation: explanation.to_string(),
        });
    }

    pub fn entries(&self) -> &[ContextEntry] {
        &self.entries
    }

    /// Executed records only, in step order.
    pub fn records(&self) -> impl Iterator<Item = &ExecutionRecord> {
        self.entries.iter().filter_map(|entry| match entry {
            ContextEntry::Executed(record) => Some(record),
            ContextEntry::Skipped { .. } => None,
        })
    }

    pub fn record_count(&self) -> usize {
        self.records().count()
    }

    /// Render the context as prompt text.
    ///
    /// With `window = Some(n)`, only the last `n` entries are rendered in full;
    /// earlier ones collapse to one summary line each.
    pub fn render(&self, window: Option<usize>) -> String {
        let mut buf = String::new();
        buf.push_str(&format!("Current working directory: {}\n", self.working_dir));

        let split = window
            .map(|n| self.entries.len().saturating_sub(n))
            .unwrap_or(0);
        let (summarized, full) = self.entries.split_at(split);

        if !summarized.is_empty() {
            buf.push_str("\nEarlier steps (output omitted):\n");
            for entry in summarized {
                buf.push_str(&format!("- {}\n", summary_line(entry)));
            }
        }

        for entry in full {
            buf.push('\n');
            render_entry(&mut buf, entry);
        }

        buf
    }
}

fn summary_line(entry: &ContextEntry) -> String {
    match entry {
        ContextEntry::Executed(record) => format!(
            "Step {}: `{}` (exit code {})",
            record.step_index + 1,
            record.command,
            record.exit_code
        ),
        ContextEntry::Skipped { step_index, .. } => {
            format!("Step {}: no command", step_index + 1)
        }
    }
}

fn render_entry(buf: &mut String, entry: &ContextEntry) {
    match entry {
        ContextEntry::Executed(record) => {
            buf.push_str(&format!("Step {}: {}\n", record.step_index + 1, record.step));
            if !record.explanation.is_empty() {
                buf.push_str(&format!("Explanation: {}\n", record.explanation));
            }
            buf.push_str(&format!("Executed: {}\n", record.command));
            buf.push_str(&format!("Exit code: {}\n", record.exit_code));
            buf.push_str(&format!("Output: {}\n", record.output.trim_end()));
        }
        ContextEntry::Skipped {
            step_index,
            step,
            explanation,
        } => {
            buf.push_str(&format!("Step {}: {step}\n", step_index + 1));
            buf.push_str(&format!("No command was proposed: {explanation}\n"));
        }
    }
}
