//! Rendering normalized results as tool responses

use serde::Serialize;

use crate::output::{ClaudeResult, CodexResult, NormalizedResult};

/// Cap on the rendered response text, in characters.
pub const MAX_RESPONSE_CHARS: usize = 80_000;
pub const RESPONSE_TRUNCATION_MARKER: &str = "\n\n...[response truncated]";

/// Text handed back to the calling agent.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ToolResponse {
    pub text: String,
    pub is_error: bool,
}

impl ToolResponse {
    fn ok(text: String) -> Self {
        Self {
            text,
            is_error: false,
        }
    }

    /// Error response for results that failed without an answer.
    fn failure<R: NormalizedResult>(result: &R) -> Option<Self> {
        result.is_failure().then(|| Self {
            text: format!("Error: {}", result.errors().join("; ")),
            is_error: true,
        })
    }

    pub fn from_claude(result: &ClaudeResult) -> Self {
        Self::failure(result).unwrap_or_else(|| Self::ok(result.result_text.clone()))
    }

    /// Agent message followed by file change and command summaries.
    pub fn from_codex(result: &CodexResult) -> Self {
        if let Some(failure) = Self::failure(result) {
            return failure;
        }

        let mut text = result.agent_message.clone();

        if !result.file_changes.is_empty() {
            text.push_str("\n\n**Files changed:**\n");
            for change in &result.file_changes {
                text.push_str(&format!("- {}: {}\n", change.kind, change.path));
            }
        }

        if !result.commands_executed.is_empty() {
            text.push_str("\n\n**Commands executed:**\n");
            for cmd in &result.commands_executed {
                let exit = cmd
                    .exit_code
                    .map(|code| code.to_string())
                    .unwrap_or_else(|| "unknown".to_string());
                text.push_str(&format!("- `{}` (exit: {})\n", cmd.command, exit));
            }
        }

        Self::ok(truncate_response(text))
    }
}

fn truncate_response(text: String) -> String {
    match text.char_indices().nth(MAX_RESPONSE_CHARS) {
        Some((cut, _)) => format!("{}{}", &text[..cut], RESPONSE_TRUNCATION_MARKER),
        None => text,
    }
}
