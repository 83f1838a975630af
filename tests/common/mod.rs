//! Shared test utilities: fake agent CLIs written as shell scripts

use std::fs;
use std::os::unix::fs::PermissionsExt;
use std::path::PathBuf;
use std::time::Duration;

use claude_codex_bridge::ExecSettings;
use tempfile::TempDir;

/// A temporary directory holding one executable fake agent.
pub struct FakeAgent {
    pub dir: TempDir,
    pub path: PathBuf,
}

impl FakeAgent {
    /// Write `body` as an executable `sh` script named `name`.
    pub fn new(name: &str, body: &str) -> Self {
        let dir = TempDir::new().expect("Failed to create temp dir");
        let path = dir.path().join(name);
        fs::write(&path, format!("#!/bin/sh\n{}\n", body)).expect("Failed to write fake agent");
        fs::set_permissions(&path, fs::Permissions::from_mode(0o755))
            .expect("Failed to make fake agent executable");
        Self { dir, path }
    }

    pub fn binary(&self) -> String {
        self.path.display().to_string()
    }

    /// A file next to the script, for scripts that leave traces.
    pub fn sibling(&self, name: &str) -> PathBuf {
        self.dir.path().join(name)
    }
}

/// Root-depth settings with millisecond backoff.
pub fn fast_settings() -> ExecSettings {
    ExecSettings {
        retry_base_delay: Duration::from_millis(1),
        max_retry_delay: Duration::from_millis(5),
        kill_grace: Duration::from_millis(200),
        ..Default::default()
    }
}
