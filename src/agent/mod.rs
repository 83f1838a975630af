//! Agent invocation on top of the execution core.
//!
//! Each adapter turns a prompt plus options into an [`ExecSpec`], runs it
//! through an [`ExecRunner`] and normalizes the output:
//!
//! - [`ClaudeAdapter`] - Claude Code via `claude -p --output-format json`
//! - [`CodexAdapter`] - Codex CLI via `codex exec --json`, with streamed
//!   progress labels
//!
//! [`ToolResponse`] renders either result as the text handed back to the
//! calling agent.
//!
//! [`ExecSpec`]: crate::exec::ExecSpec
//! [`ExecRunner`]: crate::exec::ExecRunner

mod claude;
mod codex;
mod response;

pub use claude::{ClaudeAdapter, ClaudeOptions, READ_ONLY_TOOLS};
pub use codex::{CodexAdapter, CodexOptions, Sandbox};
pub use response::{MAX_RESPONSE_CHARS, RESPONSE_TRUNCATION_MARKER, ToolResponse};

use crate::exec::ExecOutcome;
use crate::output::NormalizedResult;

/// stderr fragments that point at missing or rejected credentials.
const AUTH_MARKERS: &[&str] = &["api key", "authentication", "unauthorized"];

/// The two agents the bridge can drive.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Agent {
    Claude,
    Codex,
}

impl Agent {
    pub fn name(&self) -> &'static str {
        match self {
            Agent::Claude => "Claude",
            Agent::Codex => "Codex",
        }
    }

    pub fn default_binary(&self) -> &'static str {
        match self {
            Agent::Claude => "claude",
            Agent::Codex => "codex",
        }
    }

    /// Environment variable holding the agent's API key.
    pub fn key_env(&self) -> &'static str {
        match self {
            Agent::Claude => "ANTHROPIC_API_KEY",
            Agent::Codex => "OPENAI_API_KEY",
        }
    }

    pub fn timeout_message(&self) -> String {
        format!(
            "{} timed out. Increase BRIDGE_TIMEOUT_MS if needed.",
            self.name()
        )
    }

    pub fn auth_message(&self) -> String {
        format!(
            "{} API key issue. Ensure {} is set.",
            self.name(),
            self.key_env()
        )
    }
}

fn looks_like_auth_failure(stderr: &str) -> bool {
    let lower = stderr.to_lowercase();
    AUTH_MARKERS.iter().any(|marker| lower.contains(marker))
}

/// Explain a failed run that produced no answer, using what the agent
/// printed on stderr.
fn annotate_failure<R: NormalizedResult>(agent: Agent, result: &mut R, outcome: &ExecOutcome) {
    if outcome.exit_code == 0 || !result.answer().is_empty() {
        return;
    }
    if looks_like_auth_failure(&outcome.stderr) {
        result.push_error(agent.auth_message());
    } else {
        let stderr = outcome.stderr.trim();
        if !stderr.is_empty() {
            result.push_error(stderr.to_string());
        }
    }
}

#[cfg(test)]
pub(crate) mod testing {
    use std::sync::Mutex;

    use async_trait::async_trait;

    use crate::error::BridgeError;
    use crate::exec::{Attempt, ExecOutcome, ExecSpec, Launcher};

    /// Launcher that replays one canned outcome and records what it was
    /// asked to run. Stdout is pushed through the stdout callback in
    /// `chunk_size` pieces.
    pub struct CannedLauncher {
        pub outcome: ExecOutcome,
        pub chunk_size: usize,
        pub seen: Mutex<Vec<(String, Vec<String>, Option<std::path::PathBuf>)>>,
    }

    impl CannedLauncher {
        pub fn new(exit_code: i32, stdout: &str, stderr: &str) -> Self {
            Self {
                outcome: ExecOutcome {
                    exit_code,
                    stdout: stdout.to_string(),
                    stderr: stderr.to_string(),
                    timed_out: false,
                },
                chunk_size: 7,
                seen: Mutex::new(Vec::new()),
            }
        }

        pub fn timed_out() -> Self {
            let mut launcher = Self::new(1, "", "");
            launcher.outcome.timed_out = true;
            launcher
        }

        pub fn last_args(&self) -> Vec<String> {
            self.seen.lock().unwrap().last().unwrap().1.clone()
        }
    }

    #[async_trait]
    impl Launcher for CannedLauncher {
        async fn launch(&self, spec: &ExecSpec, _attempt: Attempt) -> Result<ExecOutcome, BridgeError> {
            self.seen
                .lock()
                .unwrap()
                .push((spec.command.clone(), spec.args.clone(), spec.cwd.clone()));
            if let Some(on_stdout) = &spec.on_stdout {
                for chunk in self.outcome.stdout.as_bytes().chunks(self.chunk_size) {
                    on_stdout(chunk);
                }
            }
            if let Some(on_stderr) = &spec.on_stderr {
                if !self.outcome.stderr.is_empty() {
                    on_stderr(self.outcome.stderr.as_bytes());
                }
            }
            Ok(self.outcome.clone())
        }
    }
}
