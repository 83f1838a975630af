use std::sync::Mutex;

use super::*;
use crate::agent::testing::CannedLauncher;
use crate::exec::ExecSettings;
use serde_json::json;

#[derive(Default)]
struct Labels(Mutex<Vec<String>>);

impl ProgressSink for Labels {
    fn report(&self, message: &str) {
        self.0.lock().unwrap().push(message.to_string());
    }
}

fn runner(launcher: CannedLauncher) -> ExecRunner<CannedLauncher> {
    ExecRunner::with_launcher(ExecSettings::default(), launcher)
}

fn stream() -> String {
    [
        json!({"type": "thread.started", "thread_id": "th-1"}),
        json!({"type": "item.completed", "item": {"type": "command_execution", "command": "cargo test", "exit_code": 0}}),
        json!({"type": "item.completed", "item": {"type": "file_change", "kind": "add", "path": "src/new.rs"}}),
        json!({"type": "item.completed", "item": {"type": "agent_message", "text": "All done"}}),
    ]
    .iter()
    .map(|v| v.to_string())
    .collect::<Vec<_>>()
    .join("\n")
}

#[test]
fn builds_minimal_args() {
    let args = CodexAdapter::new().build_args("fix it", &CodexOptions::default());
    assert_eq!(args, vec!["exec", "--json", "fix it"]);
}

#[test]
fn builds_full_args_in_order() {
    let options = CodexOptions {
        model: Some("gpt-5-codex".to_string()),
        sandbox: Some(Sandbox::WorkspaceWrite),
        full_auto: true,
        ..Default::default()
    };
    let args = CodexAdapter::new().build_args("implement", &options);
    assert_eq!(
        args,
        vec![
            "exec",
            "--json",
            "--model",
            "gpt-5-codex",
            "--sandbox",
            "workspace-write",
            "--full-auto",
            "implement",
        ]
    );
}

#[test]
fn adapter_defaults_apply_when_options_are_unset() {
    let adapter = CodexAdapter::new()
        .with_default_model(Some("o4".to_string()))
        .with_default_sandbox(Some(Sandbox::ReadOnly));
    let args = adapter.build_args("q", &CodexOptions::default());
    assert_eq!(args, vec!["exec", "--json", "--model", "o4", "--sandbox", "read-only", "q"]);

    let options = CodexOptions {
        sandbox: Some(Sandbox::DangerFullAccess),
        ..Default::default()
    };
    assert!(
        adapter
            .build_args("q", &options)
            .contains(&"danger-full-access".to_string())
    );
}

#[test]
fn sandbox_names() {
    assert_eq!(Sandbox::ReadOnly.to_string(), "read-only");
    assert!(!Sandbox::ReadOnly.allows_writes());
    assert!(Sandbox::WorkspaceWrite.allows_writes());
    let parsed: Sandbox = serde_json::from_str("\"danger-full-access\"").unwrap();
    assert_eq!(parsed, Sandbox::DangerFullAccess);
}

#[tokio::test]
async fn run_streams_progress_and_parses_result() {
    let runner = runner(CannedLauncher::new(0, &stream(), ""));
    let labels = Arc::new(Labels::default());

    let result = CodexAdapter::new()
        .run(&runner, "go", &CodexOptions::default(), Some(labels.clone()))
        .await
        .unwrap();

    assert_eq!(result.agent_message, "All done");
    assert_eq!(result.thread_id.as_deref(), Some("th-1"));
    assert_eq!(result.file_changes.len(), 1);
    assert_eq!(result.commands_executed.len(), 1);

    // The last event has no trailing newline and only shows up on flush.
    assert_eq!(
        *labels.0.lock().unwrap(),
        vec![
            "Starting codex...",
            "thread.started",
            "command_execution: cargo test",
            "file_change: add src/new.rs",
            "agent_message: All done",
            "Parsing response...",
        ]
    );
    assert_eq!(runner.launcher().last_args().last().map(String::as_str), Some("go"));
}

#[tokio::test]
async fn run_without_progress_still_parses() {
    let runner = runner(CannedLauncher::new(0, &stream(), ""));
    let result = CodexAdapter::new()
        .run(&runner, "go", &CodexOptions::default(), None)
        .await
        .unwrap();
    assert_eq!(result.agent_message, "All done");
}

#[tokio::test]
async fn timeout_skips_parsing() {
    let runner = runner(CannedLauncher::timed_out());
    let labels = Arc::new(Labels::default());
    let result = CodexAdapter::new()
        .run(&runner, "slow", &CodexOptions::default(), Some(labels.clone()))
        .await
        .unwrap();

    assert_eq!(
        result.errors,
        vec!["Codex timed out. Increase BRIDGE_TIMEOUT_MS if needed.".to_string()]
    );
    assert_eq!(*labels.0.lock().unwrap(), vec!["Starting codex..."]);
}

#[tokio::test]
async fn failed_run_reports_stderr() {
    let runner = runner(CannedLauncher::new(1, "", "fatal: sandbox denied\n"));
    let result = CodexAdapter::new()
        .run(&runner, "go", &CodexOptions::default(), None)
        .await
        .unwrap();

    assert_eq!(result.errors, vec!["fatal: sandbox denied".to_string()]);
    assert_eq!(result.agent_message, "");
}

#[tokio::test]
async fn event_only_failure_keeps_raw_fallback_flagged() {
    let failure = json!({"type": "turn.failed", "error": {"message": "model overloaded"}}).to_string();
    let runner = runner(CannedLauncher::new(1, &failure, "unauthorized"));
    let result = CodexAdapter::new()
        .run(&runner, "go", &CodexOptions::default(), None)
        .await
        .unwrap();

    // The raw stream stands in for the answer, so stderr is not consulted.
    assert_eq!(result.errors, vec!["model overloaded".to_string()]);
    assert!(result.raw_fallback);
    assert!(result.agent_message.contains("turn.failed"));
}
