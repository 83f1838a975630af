//! Codex CLI adapter
//!
//! Codex CLI uses `codex exec --json [OPTIONS] PROMPT` for non-interactive
//! mode and prints JSONL events while it works. Those events are relayed as
//! progress labels as they arrive; the final result is parsed from the full
//! stdout once the process has exited.

use std::fmt;
use std::path::PathBuf;
use std::sync::Arc;

use clap::ValueEnum;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use super::{Agent, annotate_failure};
use crate::error::BridgeError;
use crate::exec::{ExecRunner, ExecSpec, Launcher};
use crate::output::{CodexResult, parse_codex_output};
use crate::progress::{ProgressRelay, ProgressSink};

/// How much of the machine Codex may modify.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "kebab-case")]
pub enum Sandbox {
    ReadOnly,
    WorkspaceWrite,
    DangerFullAccess,
}

impl Sandbox {
    pub fn as_str(&self) -> &'static str {
        match self {
            Sandbox::ReadOnly => "read-only",
            Sandbox::WorkspaceWrite => "workspace-write",
            Sandbox::DangerFullAccess => "danger-full-access",
        }
    }

    pub fn allows_writes(&self) -> bool {
        !matches!(self, Sandbox::ReadOnly)
    }
}

impl fmt::Display for Sandbox {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Per-call options for a Codex run.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CodexOptions {
    pub working_directory: Option<PathBuf>,
    pub model: Option<String>,
    pub sandbox: Option<Sandbox>,
    /// Unattended mode: no approval prompts.
    pub full_auto: bool,
}

/// Codex CLI adapter
#[derive(Debug, Clone)]
pub struct CodexAdapter {
    binary: String,
    default_model: Option<String>,
    default_sandbox: Option<Sandbox>,
}

impl CodexAdapter {
    pub fn new() -> Self {
        Self {
            binary: Agent::Codex.default_binary().to_string(),
            default_model: None,
            default_sandbox: None,
        }
    }

    pub fn with_binary(mut self, binary: impl Into<String>) -> Self {
        self.binary = binary.into();
        self
    }

    pub fn with_default_model(mut self, model: Option<String>) -> Self {
        self.default_model = model;
        self
    }

    pub fn with_default_sandbox(mut self, sandbox: Option<Sandbox>) -> Self {
        self.default_sandbox = sandbox;
        self
    }

    pub fn binary(&self) -> &str {
        &self.binary
    }

    /// Build command arguments for Codex CLI.
    pub fn build_args(&self, prompt: &str, options: &CodexOptions) -> Vec<String> {
        let mut args: Vec<String> = vec!["exec".into(), "--json".into()];

        if let Some(model) = options.model.as_ref().or(self.default_model.as_ref()) {
            args.push("--model".into());
            args.push(model.clone());
        }
        if let Some(sandbox) = options.sandbox.or(self.default_sandbox) {
            args.push("--sandbox".into());
            args.push(sandbox.as_str().into());
        }
        if options.full_auto {
            args.push("--full-auto".into());
        }

        args.push(prompt.to_string());
        args
    }

    pub fn spec(&self, prompt: &str, options: &CodexOptions) -> ExecSpec {
        let mut spec = ExecSpec::new(&self.binary)
            .args(self.build_args(prompt, options))
            .on_stderr(|chunk: &[u8]| {
                let text = String::from_utf8_lossy(chunk);
                let text = text.trim_end_matches('\n');
                if !text.is_empty() {
                    warn!(target: "codex::stderr", "{}", text);
                }
            });
        if let Some(dir) = &options.working_directory {
            spec = spec.cwd(dir);
        }
        spec
    }

    /// Run Codex and normalize its event stream.
    ///
    /// When `progress` is given it receives `Starting codex...`, one label
    /// per streamed event, then `Parsing response...`.
    pub async fn run<L: Launcher>(
        &self,
        runner: &ExecRunner<L>,
        prompt: &str,
        options: &CodexOptions,
        progress: Option<Arc<dyn ProgressSink>>,
    ) -> Result<CodexResult, BridgeError> {
        let mut spec = self.spec(prompt, options);
        let relay = progress.map(|sink| Arc::new(ProgressRelay::new(sink)));
        if let Some(relay) = &relay {
            spec.on_stdout = Some(relay.chunk_callback());
            relay.report("Starting codex...");
        }
        info!(binary = %self.binary, sandbox = ?options.sandbox, "running codex");

        let outcome = runner.execute(&spec).await?;
        if let Some(relay) = &relay {
            relay.flush();
        }

        if outcome.timed_out {
            warn!("codex timed out");
            return Ok(CodexResult::failed(Agent::Codex.timeout_message()));
        }

        if let Some(relay) = &relay {
            relay.report("Parsing response...");
        }
        let mut result = parse_codex_output(&outcome.stdout);
        annotate_failure(Agent::Codex, &mut result, &outcome);
        if result.raw_fallback && !result.errors.is_empty() {
            warn!(errors = ?result.errors, "codex reported errors but no agent message");
        }
        debug!(
            exit_code = outcome.exit_code,
            errors = result.errors.len(),
            file_changes = result.file_changes.len(),
            commands = result.commands_executed.len(),
            thread_id = ?result.thread_id,
            "codex finished"
        );
        Ok(result)
    }
}

impl Default for CodexAdapter {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
#[path = "codex_tests.rs"]
mod tests;
