//! claude-codex-bridge - let Claude Code and Codex CLI call each other
//!
//! The crate launches one agent CLI on behalf of the other and hands back a
//! normalized result:
//!
//! 1. **Execution** ([`exec`]): subprocess launch with a timeout, SIGTERM then
//!    SIGKILL escalation, a nesting-depth guard carried in `BRIDGE_DEPTH`, and
//!    retries with exponential backoff for transient API failures.
//!
//! 2. **Normalization** ([`output`]): Claude's single JSON object and Codex's
//!    JSONL event stream both become flat result records.
//!
//! 3. **Progress** ([`progress`]): Codex events are turned into short labels
//!    while the process is still running.
//!
//! The [`agent`] adapters tie these together for each CLI.

pub mod agent;
pub mod config;
pub mod error;
pub mod exec;
pub mod logging;
pub mod output;
pub mod progress;

pub use agent::{
    Agent, ClaudeAdapter, ClaudeOptions, CodexAdapter, CodexOptions, READ_ONLY_TOOLS, Sandbox,
    ToolResponse,
};
pub use config::BridgeConfig;
pub use error::{BridgeError, ErrorCode};
pub use exec::{ExecOutcome, ExecRunner, ExecSettings, ExecSpec};
pub use output::{ClaudeResult, CodexResult, NormalizedResult};
pub use progress::{ChannelProgress, ProgressSink, ProgressUpdate};
