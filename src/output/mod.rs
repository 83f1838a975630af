//! Normalization of agent output into uniform result records.
//!
//! - [`claude`] parses the single JSON object printed by Claude Code.
//! - [`codex`] folds the JSONL event stream printed by Codex.
//!
//! Parsing never fails: malformed input degrades to raw text or skipped
//! lines.

pub mod claude;
pub mod codex;
pub mod lines;

pub use claude::{ClaudeResult, parse_claude_output};
pub use codex::{
    CodexEvent, CodexResult, CommandExecution, FileChange, ItemDetail, ItemKind, TokenUsage,
    parse_codex_output,
};
pub use lines::{LineBuffer, split_lines};

/// Shape shared by every normalized agent result.
pub trait NormalizedResult {
    /// Free-text answer; empty when the agent produced none.
    fn answer(&self) -> &str;

    fn errors(&self) -> &[String];

    fn push_error(&mut self, error: String);

    /// The call failed: errors were recorded and no answer was produced.
    fn is_failure(&self) -> bool {
        !self.errors().is_empty() && self.answer().is_empty()
    }
}
