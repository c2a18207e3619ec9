//! Marker-based parsing of oracle step responses.
//!
//! Responses follow the `EXPLANATION: ... COMMAND: ...` protocol. Only the
//! first `COMMAND:` marker splits the text; anything after a second marker is
//! kept verbatim inside the command.

use crate::core::types::CommandDecision;

pub const COMMAND_MARKER: &str = "COMMAND:";
pub const EXPLANATION_LABEL: &str = "EXPLANATION:";
pub const DONE_TOKEN: &str = "<|DONE|>";

/// Parse one oracle response into a [`CommandDecision`].
///
/// - Contains [`DONE_TOKEN`] (any case): [`CommandDecision::PlanComplete`].
/// - No [`COMMAND_MARKER`]: [`CommandDecision::NoCommand`] carrying the whole
///   (trimmed) response, labels included.
/// - Nothing after the marker: [`CommandDecision::NoCommand`] carrying the
///   explanation before it.
/// - Otherwise: [`CommandDecision::Command`].
pub fn parse_response(text: &str) -> CommandDecision {
    if text.to_lowercase().contains(&DONE_TOKEN.to_lowercase()) {
        return CommandDecision::PlanComplete;
    }

    let Some((before, after)) = text.split_once(COMMAND_MARKER) else {
        return CommandDecision::NoCommand {
            explanation: text.trim().to_string(),
        };
    };

    let explanation = strip_label(before);
    let command = after.trim();
    if command.is_empty() {
        return CommandDecision::NoCommand { explanation };
    }

    CommandDecision::Command {
        explanation,
        command: command.to_string(),
    }
}

fn strip_label(text: &str) -> String {
    text.replace(EXPLANATION_LABEL, "").trim().to_string()
}
