//! Claude Code adapter
//!
//! Runs `claude -p --output-format json [OPTIONS] PROMPT` and normalizes the
//! single JSON object it prints.

use std::path::PathBuf;

use tracing::{debug, info, warn};

use super::{Agent, annotate_failure};
use crate::error::BridgeError;
use crate::exec::{ExecRunner, ExecSpec, Launcher};
use crate::output::{ClaudeResult, parse_claude_output};

/// Tools that let Claude inspect a repository without changing it.
pub const READ_ONLY_TOOLS: &[&str] = &[
    "Read",
    "Grep",
    "Glob",
    "Bash(git diff *)",
    "Bash(git log *)",
    "Bash(git show *)",
];

/// Per-call options for a Claude run.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ClaudeOptions {
    pub working_directory: Option<PathBuf>,
    pub model: Option<String>,
    /// Turn limit; zero means no limit.
    pub max_turns: Option<u32>,
    /// Restricts the tools Claude may use. Empty means Claude's defaults.
    pub allowed_tools: Vec<String>,
}

impl ClaudeOptions {
    /// Options restricted to [`READ_ONLY_TOOLS`].
    pub fn read_only() -> Self {
        Self {
            allowed_tools: READ_ONLY_TOOLS.iter().map(|t| t.to_string()).collect(),
            ..Default::default()
        }
    }
}

/// Claude Code CLI adapter
#[derive(Debug, Clone)]
pub struct ClaudeAdapter {
    binary: String,
    default_model: Option<String>,
}

impl ClaudeAdapter {
    pub fn new() -> Self {
        Self {
            binary: Agent::Claude.default_binary().to_string(),
            default_model: None,
        }
    }

    pub fn with_binary(mut self, binary: impl Into<String>) -> Self {
        self.binary = binary.into();
        self
    }

    /// Model used when a call does not pick one.
    pub fn with_default_model(mut self, model: Option<String>) -> Self {
        self.default_model = model;
        self
    }

    pub fn binary(&self) -> &str {
        &self.binary
    }

    /// Build command arguments for Claude Code.
    pub fn build_args(&self, prompt: &str, options: &ClaudeOptions) -> Vec<String> {
        let mut args: Vec<String> = vec!["-p".into(), "--output-format".into(), "json".into()];

        if let Some(model) = options.model.as_ref().or(self.default_model.as_ref()) {
            args.push("--model".into());
            args.push(model.clone());
        }
        if let Some(turns) = options.max_turns.filter(|t| *t > 0) {
            args.push("--max-turns".into());
            args.push(turns.to_string());
        }
        for tool in &options.allowed_tools {
            args.push("--allowedTools".into());
            args.push(tool.clone());
        }

        args.push(prompt.to_string());
        args
    }

    pub fn spec(&self, prompt: &str, options: &ClaudeOptions) -> ExecSpec {
        let mut spec = ExecSpec::new(&self.binary).args(self.build_args(prompt, options));
        if let Some(dir) = &options.working_directory {
            spec = spec.cwd(dir);
        }
        spec
    }

    /// Run Claude and normalize its output.
    ///
    /// Timeouts and agent failures come back inside the result; only
    /// launch-level problems (missing binary, recursion limit) are raised.
    pub async fn run<L: Launcher>(
        &self,
        runner: &ExecRunner<L>,
        prompt: &str,
        options: &ClaudeOptions,
    ) -> Result<ClaudeResult, BridgeError> {
        let spec = self.spec(prompt, options);
        info!(binary = %self.binary, "running claude");

        let outcome = runner.execute(&spec).await?;
        if outcome.timed_out {
            warn!("claude timed out");
            return Ok(ClaudeResult::failed(Agent::Claude.timeout_message()));
        }

        let mut result = parse_claude_output(&outcome.stdout);
        annotate_failure(Agent::Claude, &mut result, &outcome);
        debug!(
            exit_code = outcome.exit_code,
            errors = result.errors.len(),
            session_id = ?result.session_id,
            "claude finished"
        );
        Ok(result)
    }
}

impl Default for ClaudeAdapter {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
#[path = "claude_tests.rs"]
mod tests;
