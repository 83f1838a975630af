//! Codex CLI JSONL output parsing
//!
//! `codex exec --json` prints one JSON event per line:
//! - `thread.started` - carries the thread id
//! - `item.completed` - agent messages, file changes, command executions
//! - `turn.completed` - usage stats
//! - `turn.failed` / `error` - failures
//!
//! Current CLIs nest item details under `item`; older ones flattened them onto
//! the event (`itemType`, `text`, `exitCode`, ...). Both shapes decode into the
//! same [`CodexEvent`].

use serde::Serialize;
use serde_json::{Map, Value};
use tracing::debug;

use super::NormalizedResult;
use super::lines::split_lines;

/// Command output kept per execution, in characters.
pub const MAX_COMMAND_OUTPUT_CHARS: usize = 10_000;
pub const TRUNCATION_MARKER: &str = "\n...[truncated]";

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FileChange {
    pub path: String,
    pub kind: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CommandExecution {
    pub command: String,
    pub exit_code: Option<i64>,
    pub output: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TokenUsage {
    pub input_tokens: u64,
    pub output_tokens: u64,
}

/// Normalized result of a Codex run.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CodexResult {
    pub thread_id: Option<String>,
    pub agent_message: String,
    pub file_changes: Vec<FileChange>,
    pub commands_executed: Vec<CommandExecution>,
    pub usage: Option<TokenUsage>,
    pub errors: Vec<String>,
    /// No agent message event was seen and `agent_message` holds the raw
    /// output instead.
    pub raw_fallback: bool,
}

impl CodexResult {
    /// Result carrying only an error.
    pub fn failed(error: impl Into<String>) -> Self {
        Self {
            errors: vec![error.into()],
            ..Default::default()
        }
    }
}

impl NormalizedResult for CodexResult {
    fn answer(&self) -> &str {
        &self.agent_message
    }

    fn errors(&self) -> &[String] {
        &self.errors
    }

    fn push_error(&mut self, error: String) {
        self.errors.push(error);
    }
}

/// Kinds of completed items the bridge understands.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ItemKind {
    AgentMessage,
    FileChange,
    CommandExecution,
    Other(String),
}

impl ItemKind {
    fn parse(raw: &str) -> Self {
        match raw {
            "agent_message" | "message" => ItemKind::AgentMessage,
            "file_change" => ItemKind::FileChange,
            "command_execution" => ItemKind::CommandExecution,
            other => ItemKind::Other(other.to_string()),
        }
    }

    pub fn as_str(&self) -> &str {
        match self {
            ItemKind::AgentMessage => "agent_message",
            ItemKind::FileChange => "file_change",
            ItemKind::CommandExecution => "command_execution",
            ItemKind::Other(raw) => raw,
        }
    }
}

/// Item details, whichever shape they arrived in.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ItemDetail {
    /// Item type exactly as reported (`agent_message`, `message`, ...).
    pub item_type: Option<String>,
    pub text: Option<String>,
    pub path: Option<String>,
    pub change_kind: Option<String>,
    pub command: Option<String>,
    pub exit_code: Option<i64>,
    pub output: Option<String>,
}

impl ItemDetail {
    /// Decode an event carrying an item, preferring the nested `item` object
    /// and falling back to the legacy flat fields per field.
    pub fn decode(event: &Map<String, Value>) -> Self {
        let nested = event.get("item").and_then(Value::as_object);
        let probe = Probe { nested, flat: event };

        Self {
            item_type: probe
                .nested_str("type")
                .or_else(|| probe.flat_str("itemType"))
                .map(str::to_string),
            text: probe
                .nested_str("text")
                .or_else(|| probe.flat_str("text"))
                .or_else(|| probe.nested_str("content"))
                .or_else(|| probe.flat_str("content"))
                .map(str::to_string),
            path: probe.str_either("path").map(str::to_string),
            change_kind: probe.str_either("kind").map(str::to_string),
            command: probe.str_either("command").map(str::to_string),
            exit_code: probe
                .nested_i64("exit_code")
                .or_else(|| probe.nested_i64("exitCode"))
                .or_else(|| probe.flat_i64("exit_code"))
                .or_else(|| probe.flat_i64("exitCode")),
            output: probe
                .nested_str("aggregated_output")
                .or_else(|| probe.nested_str("output"))
                .or_else(|| probe.flat_str("aggregated_output"))
                .or_else(|| probe.flat_str("output"))
                .map(str::to_string),
        }
    }

    pub fn kind(&self) -> Option<ItemKind> {
        self.item_type.as_deref().map(ItemKind::parse)
    }
}

/// Field lookup over the nested and flat item shapes.
struct Probe<'a> {
    nested: Option<&'a Map<String, Value>>,
    flat: &'a Map<String, Value>,
}

impl<'a> Probe<'a> {
    fn nested_str(&self, key: &str) -> Option<&'a str> {
        self.nested?.get(key).and_then(Value::as_str)
    }

    fn flat_str(&self, key: &str) -> Option<&'a str> {
        self.flat.get(key).and_then(Value::as_str)
    }

    fn str_either(&self, key: &str) -> Option<&'a str> {
        self.nested_str(key).or_else(|| self.flat_str(key))
    }

    fn nested_i64(&self, key: &str) -> Option<i64> {
        self.nested?.get(key).and_then(Value::as_i64)
    }

    fn flat_i64(&self, key: &str) -> Option<i64> {
        self.flat.get(key).and_then(Value::as_i64)
    }
}

/// One decoded line of Codex output.
#[derive(Debug, Clone, PartialEq)]
pub enum CodexEvent {
    ThreadStarted { thread_id: Option<String> },
    ItemCompleted(ItemDetail),
    TurnCompleted { usage: Option<TokenUsage> },
    TurnFailed(String),
    Error(String),
    /// Any other typed event (`item.started`, `turn.started`, ...).
    Other {
        event_type: String,
        item: ItemDetail,
    },
}

impl CodexEvent {
    /// Decode a single line. Returns `None` for non-JSON lines and objects
    /// without a `type`.
    pub fn parse_line(line: &str) -> Option<Self> {
        let value: Value = serde_json::from_str(line.trim()).ok()?;
        let event = value.as_object()?;
        let event_type = event.get("type").and_then(Value::as_str)?;
        if event_type.is_empty() {
            return None;
        }

        let decoded = match event_type {
            "thread.started" => CodexEvent::ThreadStarted {
                thread_id: ["thread_id", "threadId"]
                    .iter()
                    .find_map(|key| event.get(*key).and_then(Value::as_str))
                    .map(str::to_string),
            },
            "item.completed" => CodexEvent::ItemCompleted(ItemDetail::decode(event)),
            "turn.completed" => CodexEvent::TurnCompleted {
                usage: event
                    .get("usage")
                    .and_then(Value::as_object)
                    .map(decode_usage),
            },
            "turn.failed" => CodexEvent::TurnFailed(failure_message(event)),
            "error" => CodexEvent::Error(failure_message(event)),
            other => CodexEvent::Other {
                event_type: other.to_string(),
                item: ItemDetail::decode(event),
            },
        };
        Some(decoded)
    }

    /// Event type as it appeared on the wire.
    pub fn event_type(&self) -> &str {
        match self {
            CodexEvent::ThreadStarted { .. } => "thread.started",
            CodexEvent::ItemCompleted(_) => "item.completed",
            CodexEvent::TurnCompleted { .. } => "turn.completed",
            CodexEvent::TurnFailed(_) => "turn.failed",
            CodexEvent::Error(_) => "error",
            CodexEvent::Other { event_type, .. } => event_type,
        }
    }

    /// Item details carried by this event, if any.
    pub fn item(&self) -> Option<&ItemDetail> {
        match self {
            CodexEvent::ItemCompleted(item) | CodexEvent::Other { item, .. } => Some(item),
            _ => None,
        }
    }
}

fn decode_usage(usage: &Map<String, Value>) -> TokenUsage {
    let count = |snake: &str, camel: &str| {
        usage
            .get(snake)
            .or_else(|| usage.get(camel))
            .and_then(Value::as_u64)
            .unwrap_or(0)
    };
    TokenUsage {
        input_tokens: count("input_tokens", "inputTokens"),
        output_tokens: count("output_tokens", "outputTokens"),
    }
}

fn failure_message(event: &Map<String, Value>) -> String {
    match event.get("error") {
        Some(Value::String(s)) => return s.clone(),
        Some(Value::Object(obj)) => {
            if let Some(msg) = obj.get("message").and_then(Value::as_str) {
                return msg.to_string();
            }
            return Value::Object(obj.clone()).to_string();
        }
        _ => {}
    }
    if let Some(msg) = event.get("message").and_then(Value::as_str) {
        return msg.to_string();
    }
    Value::Object(event.clone()).to_string()
}

/// Cap command output at [`MAX_COMMAND_OUTPUT_CHARS`], flagging any cut.
pub fn truncate_output(output: &str) -> String {
    match output.char_indices().nth(MAX_COMMAND_OUTPUT_CHARS) {
        Some((cut, _)) => format!("{}{}", &output[..cut], TRUNCATION_MARKER),
        None => output.to_string(),
    }
}

impl CodexResult {
    /// Fold one event into the running result.
    pub fn apply(&mut self, event: CodexEvent) {
        match event {
            CodexEvent::ThreadStarted { thread_id } => self.thread_id = thread_id,
            CodexEvent::ItemCompleted(item) => self.apply_item(item),
            CodexEvent::TurnCompleted { usage } => {
                if usage.is_some() {
                    self.usage = usage;
                }
            }
            CodexEvent::TurnFailed(message) | CodexEvent::Error(message) => {
                self.errors.push(message)
            }
            CodexEvent::Other { .. } => {}
        }
    }

    fn apply_item(&mut self, item: ItemDetail) {
        match item.kind() {
            Some(ItemKind::AgentMessage) => {
                if let Some(text) = item.text.filter(|t| !t.is_empty()) {
                    self.agent_message = text;
                }
            }
            Some(ItemKind::FileChange) => {
                if let Some(path) = item.path.filter(|p| !p.is_empty()) {
                    self.file_changes.push(FileChange {
                        path,
                        kind: item.change_kind.unwrap_or_else(|| "update".to_string()),
                    });
                }
            }
            Some(ItemKind::CommandExecution) => {
                self.commands_executed.push(CommandExecution {
                    command: item.command.unwrap_or_default(),
                    exit_code: item.exit_code,
                    output: truncate_output(item.output.as_deref().unwrap_or("")),
                });
            }
            Some(ItemKind::Other(_)) | None => {}
        }
    }
}

/// Parse the complete stdout of a Codex run.
pub fn parse_codex_output(raw: &str) -> CodexResult {
    let mut result = CodexResult::default();

    for line in split_lines(raw) {
        match CodexEvent::parse_line(line) {
            Some(event) => result.apply(event),
            None => {
                let preview: String = line.chars().take(100).collect();
                debug!(line = %preview, "skipping non-event line");
            }
        }
    }

    // Codex occasionally prints plain text instead of JSONL.
    let trimmed = raw.trim();
    if result.agent_message.is_empty() && !trimmed.is_empty() {
        debug!("no agent message in Codex output, using raw output");
        result.agent_message = trimmed.to_string();
        result.raw_fallback = true;
    }

    result
}

#[cfg(test)]
#[path = "codex_tests.rs"]
mod tests;
