//! Bridge configuration
//!
//! Settings come from four layers, lowest to highest precedence: built-in
//! defaults, the TOML config file, `BRIDGE_*` environment variables, and
//! per-call options on [`ExecSpec`](crate::exec::ExecSpec).
//!
//! ```toml
//! [exec]
//! timeout_ms = 300000
//! max_retries = 1
//!
//! [codex]
//! binary = "/usr/local/bin/codex"
//! sandbox = "read-only"
//! ```

use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use crate::agent::{ClaudeAdapter, CodexAdapter, Sandbox};
use crate::exec::{DEPTH_ENV, ExecSettings, MAX_RETRIES_ENV, TIMEOUT_ENV};

/// Execution knobs. Unset keys keep the built-in defaults.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ExecSection {
    pub timeout_ms: Option<u64>,
    pub max_retries: Option<u32>,
    pub retry_base_delay_ms: Option<u64>,
    pub max_retry_delay_ms: Option<u64>,
    pub kill_grace_ms: Option<u64>,
    pub max_depth: Option<u32>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ClaudeSection {
    /// Binary name or path; defaults to `claude` on `PATH`.
    pub binary: Option<String>,
    pub model: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CodexSection {
    /// Binary name or path; defaults to `codex` on `PATH`.
    pub binary: Option<String>,
    pub model: Option<String>,
    pub sandbox: Option<Sandbox>,
}

/// Contents of `config.toml`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct BridgeConfig {
    pub exec: ExecSection,
    pub claude: ClaudeSection,
    pub codex: CodexSection,
}

impl BridgeConfig {
    /// Get the global config directory path (~/.claude-codex-bridge/)
    pub fn global_config_dir() -> PathBuf {
        dirs::home_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join(".claude-codex-bridge")
    }

    /// Get the global config file path (~/.claude-codex-bridge/config.toml)
    pub fn global_config_path() -> PathBuf {
        Self::global_config_dir().join("config.toml")
    }

    pub fn from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;

        let config: BridgeConfig = toml::from_str(&content)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))?;

        Ok(config)
    }

    /// Load an explicit config file, or the global one if it exists.
    ///
    /// A missing global file is not an error; a missing explicit file is.
    pub fn load(explicit: Option<&Path>) -> Result<Self> {
        match explicit {
            Some(path) => Self::from_file(path),
            None => {
                let path = Self::global_config_path();
                if path.is_file() {
                    Self::from_file(&path)
                } else {
                    Ok(Self::default())
                }
            }
        }
    }

    /// Defaults overlaid with the file's `[exec]` table.
    pub fn file_exec_settings(&self) -> ExecSettings {
        let mut settings = ExecSettings::default();
        let exec = &self.exec;

        if let Some(ms) = exec.timeout_ms.filter(|ms| *ms > 0) {
            settings.timeout = Duration::from_millis(ms);
        }
        if let Some(retries) = exec.max_retries {
            settings.max_retries = retries;
        }
        if let Some(ms) = exec.retry_base_delay_ms {
            settings.retry_base_delay = Duration::from_millis(ms);
        }
        if let Some(ms) = exec.max_retry_delay_ms {
            settings.max_retry_delay = Duration::from_millis(ms);
        }
        if let Some(ms) = exec.kill_grace_ms {
            settings.kill_grace = Duration::from_millis(ms);
        }
        if let Some(depth) = exec.max_depth {
            settings.max_depth = depth;
        }
        settings
    }

    /// Effective settings: file values, then the process environment.
    pub fn exec_settings(&self) -> ExecSettings {
        let mut settings = self.file_exec_settings();
        settings.apply_env(
            std::env::var(TIMEOUT_ENV).ok().as_deref(),
            std::env::var(MAX_RETRIES_ENV).ok().as_deref(),
            std::env::var(DEPTH_ENV).ok().as_deref(),
        );
        settings
    }

    pub fn claude_adapter(&self) -> ClaudeAdapter {
        let mut adapter = ClaudeAdapter::new().with_default_model(self.claude.model.clone());
        if let Some(binary) = &self.claude.binary {
            adapter = adapter.with_binary(binary);
        }
        adapter
    }

    pub fn codex_adapter(&self) -> CodexAdapter {
        let mut adapter = CodexAdapter::new()
            .with_default_model(self.codex.model.clone())
            .with_default_sandbox(self.codex.sandbox);
        if let Some(binary) = &self.codex.binary {
            adapter = adapter.with_binary(binary);
        }
        adapter
    }
}
