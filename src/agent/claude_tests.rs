use super::*;
use crate::agent::testing::CannedLauncher;
use crate::exec::ExecSettings;
use crate::output::NormalizedResult;
use serde_json::json;

fn runner(launcher: CannedLauncher) -> ExecRunner<CannedLauncher> {
    ExecRunner::with_launcher(ExecSettings::default(), launcher)
}

#[test]
fn builds_minimal_args() {
    let args = ClaudeAdapter::new().build_args("hello", &ClaudeOptions::default());
    assert_eq!(args, vec!["-p", "--output-format", "json", "hello"]);
}

#[test]
fn builds_full_args_in_order() {
    let options = ClaudeOptions {
        model: Some("opus".to_string()),
        max_turns: Some(5),
        allowed_tools: vec!["Read".to_string(), "Bash(git diff *)".to_string()],
        ..Default::default()
    };
    let args = ClaudeAdapter::new().build_args("review", &options);
    assert_eq!(
        args,
        vec![
            "-p",
            "--output-format",
            "json",
            "--model",
            "opus",
            "--max-turns",
            "5",
            "--allowedTools",
            "Read",
            "--allowedTools",
            "Bash(git diff *)",
            "review",
        ]
    );
}

#[test]
fn zero_turns_and_default_model() {
    let adapter = ClaudeAdapter::new().with_default_model(Some("sonnet".to_string()));
    let options = ClaudeOptions {
        max_turns: Some(0),
        ..Default::default()
    };
    let args = adapter.build_args("q", &options);
    assert_eq!(args, vec!["-p", "--output-format", "json", "--model", "sonnet", "q"]);

    let options = ClaudeOptions {
        model: Some("haiku".to_string()),
        ..Default::default()
    };
    assert!(adapter.build_args("q", &options).contains(&"haiku".to_string()));
}

#[test]
fn read_only_preset_uses_read_only_tools() {
    let options = ClaudeOptions::read_only();
    assert_eq!(options.allowed_tools.len(), READ_ONLY_TOOLS.len());
    assert_eq!(options.allowed_tools[0], "Read");
}

#[tokio::test]
async fn run_parses_result_and_passes_cwd() {
    let stdout = json!({"type": "result", "result": "42", "session_id": "s1"}).to_string();
    let runner = runner(CannedLauncher::new(0, &stdout, ""));
    let adapter = ClaudeAdapter::new().with_binary("/opt/bin/claude");
    let options = ClaudeOptions {
        working_directory: Some(PathBuf::from("/tmp/project")),
        ..Default::default()
    };

    let result = adapter.run(&runner, "what?", &options).await.unwrap();
    assert_eq!(result.result_text, "42");
    assert_eq!(result.session_id.as_deref(), Some("s1"));

    let (command, args, cwd) = runner.launcher().seen.lock().unwrap()[0].clone();
    assert_eq!(command, "/opt/bin/claude");
    assert_eq!(args.last().map(String::as_str), Some("what?"));
    assert_eq!(cwd, Some(PathBuf::from("/tmp/project")));
}

#[tokio::test]
async fn timeout_becomes_result_error() {
    let runner = runner(CannedLauncher::timed_out());
    let result = ClaudeAdapter::new()
        .run(&runner, "slow", &ClaudeOptions::default())
        .await
        .unwrap();
    assert_eq!(
        result.errors,
        vec!["Claude timed out. Increase BRIDGE_TIMEOUT_MS if needed.".to_string()]
    );
    assert_eq!(result.result_text, "");
}

#[tokio::test]
async fn auth_failure_adds_guidance() {
    let runner = runner(CannedLauncher::new(1, "", "Invalid API key"));
    let result = ClaudeAdapter::new()
        .run(&runner, "hi", &ClaudeOptions::default())
        .await
        .unwrap();
    assert_eq!(
        result.errors,
        vec![
            "Empty output from Claude CLI".to_string(),
            "Claude API key issue. Ensure ANTHROPIC_API_KEY is set.".to_string(),
        ]
    );
    assert!(result.is_failure());
}
