//! Subprocess execution with timeouts, recursion guard and retries.
//!
//! The entry point is [`ExecRunner::execute`], which turns one [`ExecSpec`]
//! into the [`ExecOutcome`] of the last attempt made:
//!
//! - the [`Depth`] of the current call chain is checked once per call and the
//!   incremented value is handed to every attempt;
//! - each attempt goes through a [`Launcher`] (the real one is
//!   [`ProcessLauncher`]);
//! - failed attempts whose stderr looks transient are retried with
//!   exponential backoff.

mod depth;
mod process;
mod transient;

pub use depth::{DEPTH_ENV, Depth, MAX_DEPTH};
pub use process::{ProcessLauncher, run_once};
pub use transient::{is_transient_error, retry_delay};

use std::collections::HashMap;
use std::fmt;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use tracing::{Instrument, debug, info_span, warn};

use crate::error::BridgeError;

/// Environment variable overriding the default per-attempt timeout (ms).
pub const TIMEOUT_ENV: &str = "BRIDGE_TIMEOUT_MS";
/// Environment variable overriding the default retry count.
pub const MAX_RETRIES_ENV: &str = "BRIDGE_MAX_RETRIES";

pub const DEFAULT_TIMEOUT: Duration = Duration::from_millis(600_000);
pub const DEFAULT_MAX_RETRIES: u32 = 2;
pub const DEFAULT_RETRY_BASE_DELAY: Duration = Duration::from_millis(1_000);
pub const DEFAULT_MAX_RETRY_DELAY: Duration = Duration::from_millis(10_000);
/// Time between the graceful stop signal and the forced kill.
pub const DEFAULT_KILL_GRACE: Duration = Duration::from_millis(5_000);

/// Callback invoked with every raw output chunk as it arrives.
pub type ChunkCallback = Arc<dyn Fn(&[u8]) + Send + Sync>;

/// What to run. Owned by the caller and borrowed by each attempt.
#[derive(Clone, Default)]
pub struct ExecSpec {
    pub command: String,
    pub args: Vec<String>,
    pub cwd: Option<PathBuf>,
    pub env: HashMap<String, String>,
    /// Per-call timeout; falls back to [`ExecSettings::timeout`].
    pub timeout: Option<Duration>,
    /// Per-call retry count; falls back to [`ExecSettings::max_retries`].
    pub max_retries: Option<u32>,
    pub on_stdout: Option<ChunkCallback>,
    pub on_stderr: Option<ChunkCallback>,
}

impl ExecSpec {
    pub fn new(command: impl Into<String>) -> Self {
        Self {
            command: command.into(),
            ..Default::default()
        }
    }

    pub fn arg(mut self, arg: impl Into<String>) -> Self {
        self.args.push(arg.into());
        self
    }

    pub fn args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.args.extend(args.into_iter().map(Into::into));
        self
    }

    pub fn cwd(mut self, cwd: impl Into<PathBuf>) -> Self {
        self.cwd = Some(cwd.into());
        self
    }

    pub fn env(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.env.insert(key.into(), value.into());
        self
    }

    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    pub fn max_retries(mut self, max_retries: u32) -> Self {
        self.max_retries = Some(max_retries);
        self
    }

    pub fn on_stdout(mut self, callback: impl Fn(&[u8]) + Send + Sync + 'static) -> Self {
        self.on_stdout = Some(Arc::new(callback));
        self
    }

    pub fn on_stderr(mut self, callback: impl Fn(&[u8]) + Send + Sync + 'static) -> Self {
        self.on_stderr = Some(Arc::new(callback));
        self
    }
}

impl fmt::Debug for ExecSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ExecSpec")
            .field("command", &self.command)
            .field("args", &self.args)
            .field("cwd", &self.cwd)
            .field("env", &self.env.keys().collect::<Vec<_>>())
            .field("timeout", &self.timeout)
            .field("max_retries", &self.max_retries)
            .field("on_stdout", &self.on_stdout.is_some())
            .field("on_stderr", &self.on_stderr.is_some())
            .finish()
    }
}

/// Result of a single attempt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExecOutcome {
    /// Exit code; 1 when the process was killed or reported none.
    pub exit_code: i32,
    pub stdout: String,
    pub stderr: String,
    /// The attempt was stopped by the timeout rather than exiting on its own.
    pub timed_out: bool,
}

impl ExecOutcome {
    pub fn success(&self) -> bool {
        self.exit_code == 0 && !self.timed_out
    }
}

/// Parameters resolved for one attempt.
#[derive(Debug, Clone, Copy)]
pub struct Attempt {
    /// Zero-based attempt number within the logical call.
    pub number: u32,
    pub timeout: Duration,
    pub kill_grace: Duration,
    /// Depth injected into the child environment.
    pub child_depth: Depth,
}

/// Runs one attempt of an [`ExecSpec`].
#[async_trait]
pub trait Launcher: Send + Sync {
    async fn launch(&self, spec: &ExecSpec, attempt: Attempt) -> Result<ExecOutcome, BridgeError>;
}

/// Defaults applied when an [`ExecSpec`] leaves a knob unset.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExecSettings {
    pub timeout: Duration,
    pub max_retries: u32,
    pub retry_base_delay: Duration,
    pub max_retry_delay: Duration,
    pub kill_grace: Duration,
    pub max_depth: u32,
    /// Depth of the current call chain.
    pub depth: Depth,
}

impl Default for ExecSettings {
    fn default() -> Self {
        Self {
            timeout: DEFAULT_TIMEOUT,
            max_retries: DEFAULT_MAX_RETRIES,
            retry_base_delay: DEFAULT_RETRY_BASE_DELAY,
            max_retry_delay: DEFAULT_MAX_RETRY_DELAY,
            kill_grace: DEFAULT_KILL_GRACE,
            max_depth: MAX_DEPTH,
            depth: Depth::ROOT,
        }
    }
}

impl ExecSettings {
    /// Built-in defaults overlaid with the process environment.
    pub fn from_env() -> Self {
        let mut settings = Self::default();
        settings.apply_env(
            std::env::var(TIMEOUT_ENV).ok().as_deref(),
            std::env::var(MAX_RETRIES_ENV).ok().as_deref(),
            std::env::var(DEPTH_ENV).ok().as_deref(),
        );
        settings
    }

    /// Overlay raw environment values. Invalid values leave the current
    /// setting untouched.
    pub fn apply_env(&mut self, timeout_ms: Option<&str>, max_retries: Option<&str>, depth: Option<&str>) {
        if let Some(timeout) = parse_timeout_ms(timeout_ms) {
            self.timeout = timeout;
        }
        if let Some(retries) = parse_max_retries(max_retries) {
            self.max_retries = retries;
        }
        self.depth = Depth::parse(depth);
    }
}

/// A positive integer number of milliseconds.
pub fn parse_timeout_ms(raw: Option<&str>) -> Option<Duration> {
    let ms = raw?.trim().parse::<i64>().ok()?;
    (ms > 0).then(|| Duration::from_millis(ms as u64))
}

/// A non-negative integer retry count.
pub fn parse_max_retries(raw: Option<&str>) -> Option<u32> {
    raw?.trim().parse::<u32>().ok()
}

/// Executes specs with retry orchestration on top of a [`Launcher`].
pub struct ExecRunner<L = ProcessLauncher> {
    settings: ExecSettings,
    launcher: L,
}

impl ExecRunner<ProcessLauncher> {
    pub fn new(settings: ExecSettings) -> Self {
        Self::with_launcher(settings, ProcessLauncher)
    }

    /// Runner configured from the process environment.
    pub fn from_env() -> Self {
        Self::new(ExecSettings::from_env())
    }
}

impl<L: Launcher> ExecRunner<L> {
    pub fn with_launcher(settings: ExecSettings, launcher: L) -> Self {
        Self { settings, launcher }
    }

    pub fn settings(&self) -> &ExecSettings {
        &self.settings
    }

    pub fn launcher(&self) -> &L {
        &self.launcher
    }

    /// Run `spec`, retrying transient failures.
    ///
    /// Fails without spawning anything when the recursion ceiling is
    /// reached. Timed-out attempts are returned as-is with `timed_out` set.
    pub async fn execute(&self, spec: &ExecSpec) -> Result<ExecOutcome, BridgeError> {
        let child_depth = self.settings.depth.enter(self.settings.max_depth)?;
        let max_retries = spec.max_retries.unwrap_or(self.settings.max_retries);
        let timeout = spec.timeout.unwrap_or(self.settings.timeout);

        let span = info_span!(
            "exec",
            call_id = %uuid::Uuid::new_v4(),
            command = %spec.command,
            depth = child_depth.get(),
        );

        async move {
            let mut number = 0u32;
            loop {
                let attempt = Attempt {
                    number,
                    timeout,
                    kill_grace: self.settings.kill_grace,
                    child_depth,
                };
                let outcome = self.launcher.launch(spec, attempt).await?;

                if number < max_retries && is_transient_error(&outcome) {
                    let delay = retry_delay(
                        number,
                        self.settings.retry_base_delay,
                        self.settings.max_retry_delay,
                    );
                    warn!(
                        attempt = number + 1,
                        max_attempts = max_retries + 1,
                        delay_ms = delay.as_millis() as u64,
                        "transient error detected, retrying"
                    );
                    tokio::time::sleep(delay).await;
                    number += 1;
                    continue;
                }

                debug!(
                    attempts = number + 1,
                    exit_code = outcome.exit_code,
                    timed_out = outcome.timed_out,
                    "exec finished"
                );
                return Ok(outcome);
            }
        }
        .instrument(span)
        .await
    }
}
