//! Claude Code JSON output parsing
//!
//! `claude -p --output-format json` prints one JSON object when it finishes.
//! The answer normally lives in `result`, either as a string or as an object
//! with content blocks. Older and newer CLI versions disagree on key casing,
//! so metadata is probed under several names.

use serde::Serialize;
use serde_json::{Map, Value};
use tracing::debug;

use super::NormalizedResult;

/// Normalized result of a Claude run.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ClaudeResult {
    pub result_text: String,
    pub session_id: Option<String>,
    pub cost_usd: Option<f64>,
    pub errors: Vec<String>,
}

impl ClaudeResult {
    /// Result carrying only an error.
    pub fn failed(error: impl Into<String>) -> Self {
        Self {
            errors: vec![error.into()],
            ..Default::default()
        }
    }
}

impl NormalizedResult for ClaudeResult {
    fn answer(&self) -> &str {
        &self.result_text
    }

    fn errors(&self) -> &[String] {
        &self.errors
    }

    fn push_error(&mut self, error: String) {
        self.errors.push(error);
    }
}

/// Parse the captured stdout of a Claude run.
pub fn parse_claude_output(raw: &str) -> ClaudeResult {
    let mut result = ClaudeResult::default();

    let trimmed = raw.trim();
    if trimmed.is_empty() {
        result.errors.push("Empty output from Claude CLI".to_string());
        return result;
    }

    // Claude sometimes answers with plain text instead of JSON.
    let parsed = match serde_json::from_str::<Value>(trimmed) {
        Ok(Value::Object(map)) => map,
        Ok(_) | Err(_) => {
            debug!("Claude output is not a JSON object, using raw text");
            result.result_text = trimmed.to_string();
            return result;
        }
    };

    result.result_text = extract_result_text(&parsed);

    result.session_id = first_str(&parsed, &["session_id", "sessionId"]).map(str::to_string);
    result.cost_usd = ["cost_usd", "costUsd", "total_cost_usd"]
        .iter()
        .find_map(|key| parsed.get(*key).and_then(Value::as_f64));

    if let Some(error) = parsed.get("error").and_then(error_message) {
        result.errors.push(error);
    }

    result
}

fn extract_result_text(parsed: &Map<String, Value>) -> String {
    let text = match parsed.get("result") {
        Some(Value::String(s)) => s.clone(),
        Some(Value::Object(obj)) => obj
            .get("content")
            .and_then(Value::as_array)
            .map(|blocks| text_blocks(blocks))
            .unwrap_or_default(),
        _ => String::new(),
    };
    if !text.is_empty() {
        return text;
    }

    if let Some(text) = first_str(parsed, &["message", "text", "output"]) {
        if !text.is_empty() {
            return text.to_string();
        }
    }

    if parsed.is_empty() {
        return String::new();
    }
    serde_json::to_string_pretty(parsed).unwrap_or_default()
}

/// Newline-joined text of every `{"type": "text"}` block.
fn text_blocks(blocks: &[Value]) -> String {
    blocks
        .iter()
        .filter(|block| block.get("type").and_then(Value::as_str) == Some("text"))
        .filter_map(|block| block.get("text").and_then(Value::as_str))
        .collect::<Vec<_>>()
        .join("\n")
}

fn first_str<'a>(map: &'a Map<String, Value>, keys: &[&str]) -> Option<&'a str> {
    keys.iter().find_map(|key| map.get(*key).and_then(Value::as_str))
}

fn error_message(error: &Value) -> Option<String> {
    match error {
        Value::Null | Value::Bool(false) => None,
        Value::String(s) if s.is_empty() => None,
        Value::String(s) => Some(s.clone()),
        Value::Object(obj) => Some(
            obj.get("message")
                .and_then(Value::as_str)
                .map(str::to_string)
                .unwrap_or_else(|| error.to_string()),
        ),
        other => Some(other.to_string()),
    }
}

#[cfg(test)]
#[path = "claude_tests.rs"]
mod tests;
