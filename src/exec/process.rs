//! Single-attempt process execution.
//!
//! Output is drained concurrently while the child runs so a chatty agent can
//! never block on a full pipe. A timeout escalates in two phases: a graceful
//! stop signal, then a forced kill if the process is still around after the
//! grace period.

use std::process::Stdio;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use tokio::io::{AsyncRead, AsyncReadExt};
use tokio::process::{Child, Command};
use tokio::task::JoinHandle;
use tracing::{debug, error, warn};

use super::{Attempt, ChunkCallback, DEPTH_ENV, ExecOutcome, ExecSpec, Launcher};
use crate::error::BridgeError;

/// How long to wait for pipe readers after the child exited. A grandchild
/// that inherited the pipes can keep them open indefinitely.
const DRAIN_GRACE: Duration = Duration::from_secs(2);

const READ_CHUNK_SIZE: usize = 8192;

/// [`Launcher`] that spawns a real subprocess.
#[derive(Debug, Clone, Copy, Default)]
pub struct ProcessLauncher;

#[async_trait]
impl Launcher for ProcessLauncher {
    async fn launch(&self, spec: &ExecSpec, attempt: Attempt) -> Result<ExecOutcome, BridgeError> {
        run_once(spec, attempt).await
    }
}

/// Spawn `spec` once and wait for it to exit or time out.
pub async fn run_once(spec: &ExecSpec, attempt: Attempt) -> Result<ExecOutcome, BridgeError> {
    let mut cmd = Command::new(&spec.command);
    cmd.args(&spec.args)
        .envs(&spec.env)
        .env(DEPTH_ENV, attempt.child_depth.to_env_value())
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .kill_on_drop(true);
    if let Some(cwd) = &spec.cwd {
        cmd.current_dir(cwd);
    }

    debug!(
        command = %spec.command,
        args = %spec.args.join(" "),
        cwd = ?spec.cwd,
        timeout_ms = attempt.timeout.as_millis() as u64,
        attempt = attempt.number + 1,
        "spawning agent process"
    );

    let mut child = cmd.spawn().map_err(|e| {
        error!(command = %spec.command, err = %e, "failed to spawn process");
        BridgeError::from_spawn(&spec.command, e)
    })?;

    let stdout = child
        .stdout
        .take()
        .ok_or_else(|| process_error("stdout was not piped"))?;
    let stderr = child
        .stderr
        .take()
        .ok_or_else(|| process_error("stderr was not piped"))?;

    let stdout_capture = StreamCapture::spawn(stdout, spec.on_stdout.clone());
    let stderr_capture = StreamCapture::spawn(stderr, spec.on_stderr.clone());

    let (status, timed_out) = wait_with_timeout(&mut child, attempt.timeout, attempt.kill_grace).await?;

    let stdout = stdout_capture.finish().await;
    let stderr = stderr_capture.finish().await;

    let exit_code = status.code().unwrap_or(1);
    debug!(exit_code, timed_out, stdout_bytes = stdout.len(), "process finished");

    Ok(ExecOutcome {
        exit_code,
        stdout: String::from_utf8_lossy(&stdout).into_owned(),
        stderr: String::from_utf8_lossy(&stderr).into_owned(),
        timed_out,
    })
}

/// Wait for `child`, escalating termination once `timeout` elapses.
///
/// The escalation lives inside this future, so it is dropped as soon as the
/// child has been reaped and never signals a stale pid.
async fn wait_with_timeout(
    child: &mut Child,
    timeout: Duration,
    kill_grace: Duration,
) -> Result<(std::process::ExitStatus, bool), BridgeError> {
    tokio::select! {
        status = child.wait() => {
            let status = status.map_err(|e| BridgeError::from_io("wait for process", e))?;
            return Ok((status, false));
        }
        _ = tokio::time::sleep(timeout) => {}
    }

    warn!(timeout_ms = timeout.as_millis() as u64, "process timed out, sending SIGTERM");
    request_stop(child);

    tokio::select! {
        status = child.wait() => {
            let status = status.map_err(|e| BridgeError::from_io("wait for process", e))?;
            Ok((status, true))
        }
        _ = tokio::time::sleep(kill_grace) => {
            warn!("process did not exit after SIGTERM, sending SIGKILL");
            if let Err(e) = child.start_kill() {
                warn!(err = %e, "failed to kill process");
            }
            let status = child
                .wait()
                .await
                .map_err(|e| BridgeError::from_io("wait for killed process", e))?;
            Ok((status, true))
        }
    }
}

/// Ask the child to terminate gracefully.
#[cfg(unix)]
fn request_stop(child: &mut Child) {
    let Some(pid) = child.id() else {
        return;
    };
    // SAFETY: `pid` belongs to a child we have not reaped yet.
    let rc = unsafe { libc::kill(pid as libc::pid_t, libc::SIGTERM) };
    if rc != 0 {
        warn!(pid, err = %std::io::Error::last_os_error(), "failed to send SIGTERM");
    }
}

#[cfg(not(unix))]
fn request_stop(child: &mut Child) {
    if let Err(e) = child.start_kill() {
        warn!(err = %e, "failed to stop process");
    }
}

fn process_error(message: &str) -> BridgeError {
    BridgeError::Process {
        message: message.to_string(),
        os_code: None,
    }
}

/// Background reader that buffers one pipe and forwards chunks to a callback.
struct StreamCapture {
    buffer: Arc<Mutex<Vec<u8>>>,
    handle: JoinHandle<()>,
}

impl StreamCapture {
    fn spawn<R>(mut reader: R, callback: Option<ChunkCallback>) -> Self
    where
        R: AsyncRead + Unpin + Send + 'static,
    {
        let buffer = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&buffer);
        let handle = tokio::spawn(async move {
            let mut chunk = [0u8; READ_CHUNK_SIZE];
            loop {
                let n = match reader.read(&mut chunk).await {
                    Ok(0) => break,
                    Ok(n) => n,
                    Err(e) => {
                        warn!(err = %e, "failed to read process output");
                        break;
                    }
                };
                sink.lock()
                    .unwrap_or_else(|e| e.into_inner())
                    .extend_from_slice(&chunk[..n]);
                if let Some(callback) = &callback {
                    callback(&chunk[..n]);
                }
            }
        });
        Self { buffer, handle }
    }

    /// Wait for the pipe to close and return everything read so far.
    async fn finish(self) -> Vec<u8> {
        let Self { buffer, mut handle } = self;
        if tokio::time::timeout(DRAIN_GRACE, &mut handle).await.is_err() {
            warn!("output pipe still open after process exit, abandoning reader");
            handle.abort();
        }
        let mut guard = buffer.lock().unwrap_or_else(|e| e.into_inner());
        std::mem::take(&mut *guard)
    }
}

#[cfg(all(test, unix))]
#[path = "process_tests.rs"]
mod tests;
