//! Error taxonomy for bridge calls.
//!
//! Only conditions where no meaningful output exists are raised as
//! [`BridgeError`]. Everything that happens after the agent process ran
//! (timeouts, agent-reported failures, unparseable output) is folded into the
//! normalized result's error list instead.

use std::fmt;

use serde::Serialize;

/// Stable error codes shared with callers of the bridge.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorCode {
    CliNotFound,
    ApiKeyMissing,
    Timeout,
    ParseError,
    ProcessError,
    RecursionLimit,
}

impl ErrorCode {
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorCode::CliNotFound => "CLI_NOT_FOUND",
            ErrorCode::ApiKeyMissing => "API_KEY_MISSING",
            ErrorCode::Timeout => "TIMEOUT",
            ErrorCode::ParseError => "PARSE_ERROR",
            ErrorCode::ProcessError => "PROCESS_ERROR",
            ErrorCode::RecursionLimit => "RECURSION_LIMIT",
        }
    }
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Failures raised before or instead of producing an [`ExecOutcome`].
///
/// [`ExecOutcome`]: crate::exec::ExecOutcome
#[derive(Debug, thiserror::Error)]
pub enum BridgeError {
    #[error("\"{command}\" not found. Is it installed and on your PATH? ({detail})")]
    CliNotFound { command: String, detail: String },

    #[error(
        "Maximum bridge nesting depth reached ({depth} >= {max}). This prevents infinite recursion between Claude and Codex."
    )]
    RecursionLimit { depth: u32, max: u32 },

    #[error("Process error: {message}")]
    Process {
        message: String,
        /// Raw OS error number, when the OS reported one.
        os_code: Option<i32>,
    },
}

impl BridgeError {
    pub fn code(&self) -> ErrorCode {
        match self {
            BridgeError::CliNotFound { .. } => ErrorCode::CliNotFound,
            BridgeError::RecursionLimit { .. } => ErrorCode::RecursionLimit,
            BridgeError::Process { .. } => ErrorCode::ProcessError,
        }
    }

    /// Classify an I/O error raised while spawning `command`.
    pub(crate) fn from_spawn(command: &str, err: std::io::Error) -> Self {
        if err.kind() == std::io::ErrorKind::NotFound {
            BridgeError::CliNotFound {
                command: command.to_string(),
                detail: err.to_string(),
            }
        } else {
            BridgeError::Process {
                message: format!("failed to spawn \"{}\": {}", command, err),
                os_code: err.raw_os_error(),
            }
        }
    }

    /// Wrap an I/O error raised after the process started.
    pub(crate) fn from_io(context: &str, err: std::io::Error) -> Self {
        BridgeError::Process {
            message: format!("{}: {}", context, err),
            os_code: err.raw_os_error(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn spawn_not_found_maps_to_cli_not_found() {
        let err = BridgeError::from_spawn(
            "codex",
            std::io::Error::new(std::io::ErrorKind::NotFound, "No such file or directory"),
        );
        assert_eq!(err.code(), ErrorCode::CliNotFound);
        assert!(err.to_string().contains("not found"));
        assert!(err.to_string().contains("No such file or directory"));
    }

    #[test]
    fn other_spawn_errors_keep_os_code() {
        let err = BridgeError::from_spawn("claude", std::io::Error::from_raw_os_error(13));
        assert_eq!(err.code(), ErrorCode::ProcessError);
        match err {
            BridgeError::Process { os_code, .. } => assert_eq!(os_code, Some(13)),
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn codes_render_in_screaming_snake_case() {
        assert_eq!(ErrorCode::RecursionLimit.to_string(), "RECURSION_LIMIT");
        assert_eq!(
            serde_json::to_string(&ErrorCode::CliNotFound).unwrap(),
            "\"CLI_NOT_FOUND\""
        );
    }
}
