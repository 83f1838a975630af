use super::*;
use serde_json::json;

#[test]
fn string_result_is_used_verbatim() {
    let raw = json!({
        "type": "result",
        "result": "  The answer is 42.\n",
        "session_id": "sess-1",
        "cost_usd": 0.0123,
    })
    .to_string();

    let result = parse_claude_output(&raw);
    assert_eq!(result.result_text, "  The answer is 42.\n");
    assert_eq!(result.session_id.as_deref(), Some("sess-1"));
    assert_eq!(result.cost_usd, Some(0.0123));
    assert!(result.errors.is_empty());
}

#[test]
fn content_blocks_are_joined_and_filtered() {
    let raw = json!({
        "result": {
            "content": [
                {"type": "text", "text": "First"},
                {"type": "tool_use", "id": "t1", "name": "Read", "input": {}},
                {"type": "text", "text": "Second"},
            ]
        }
    })
    .to_string();

    let result = parse_claude_output(&raw);
    assert_eq!(result.result_text, "First\nSecond");
}

#[test]
fn empty_output_is_an_error() {
    for raw in ["", "   \n\t"] {
        let result = parse_claude_output(raw);
        assert_eq!(result.result_text, "");
        assert_eq!(result.errors, vec!["Empty output from Claude CLI".to_string()]);
        assert!(result.is_failure());
    }
}

#[test]
fn plain_text_falls_back_to_trimmed_input() {
    let result = parse_claude_output("  Just some text\n");
    assert_eq!(result.result_text, "Just some text");
    assert!(result.errors.is_empty());
}

#[test]
fn non_object_json_is_treated_as_text() {
    let result = parse_claude_output("42");
    assert_eq!(result.result_text, "42");
    assert!(result.errors.is_empty());
}

#[test]
fn falls_back_to_message_text_output_fields() {
    let result = parse_claude_output(&json!({"text": "from text", "output": "from output"}).to_string());
    assert_eq!(result.result_text, "from text");

    let result = parse_claude_output(&json!({"output": "from output"}).to_string());
    assert_eq!(result.result_text, "from output");

    let result = parse_claude_output(&json!({"message": "from message", "text": "t"}).to_string());
    assert_eq!(result.result_text, "from message");
}

#[test]
fn unknown_object_is_pretty_printed() {
    let raw = json!({"foo": 1}).to_string();
    let result = parse_claude_output(&raw);
    assert_eq!(result.result_text, "{\n  \"foo\": 1\n}");
}

#[test]
fn empty_object_yields_no_answer() {
    let result = parse_claude_output("{}");
    assert_eq!(result.result_text, "");
    assert!(result.errors.is_empty());
}

#[test]
fn camel_case_metadata_is_accepted() {
    let raw = json!({"result": "ok", "sessionId": "abc", "costUsd": 1.5}).to_string();
    let result = parse_claude_output(&raw);
    assert_eq!(result.session_id.as_deref(), Some("abc"));
    assert_eq!(result.cost_usd, Some(1.5));

    let raw = json!({"result": "ok", "total_cost_usd": 0.5}).to_string();
    assert_eq!(parse_claude_output(&raw).cost_usd, Some(0.5));

    let raw = json!({"result": "ok"}).to_string();
    let result = parse_claude_output(&raw);
    assert_eq!(result.session_id, None);
    assert_eq!(result.cost_usd, None);
}

#[test]
fn error_field_variants() {
    let raw = json!({"result": "", "error": "boom"}).to_string();
    assert_eq!(parse_claude_output(&raw).errors, vec!["boom".to_string()]);

    let raw = json!({"error": {"message": "nested boom", "code": 7}}).to_string();
    assert_eq!(parse_claude_output(&raw).errors, vec!["nested boom".to_string()]);

    let raw = json!({"error": {"code": 7}}).to_string();
    assert_eq!(parse_claude_output(&raw).errors, vec![r#"{"code":7}"#.to_string()]);

    let raw = json!({"result": "fine", "error": null}).to_string();
    assert!(parse_claude_output(&raw).errors.is_empty());
}
