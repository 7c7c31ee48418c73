//! Unit tests for projecting collaborator steps and outcomes into updates.

use serde_json::json;

use job_relay::emitter::projection::{COMPLETED_MESSAGE, FAILURE_MESSAGE};
use job_relay::emitter::{failure_update, final_update, project_step};
use job_relay::models::step::{AgentOutcome, StepReport, TokenUsage, ToolCall, ToolResult};

fn call(name: &str) -> ToolCall {
    ToolCall {
        tool_name: name.into(),
        input: json!({ "query": "weather" }),
    }
}

fn result(name: &str, output: serde_json::Value) -> ToolResult {
    ToolResult {
        tool_name: name.into(),
        input: json!({}),
        output,
    }
}

// ── Steps ────────────────────────────────────────────────────────────────────

#[test]
fn step_messages_follow_reasoning_calls_results_order() {
    let step = StepReport {
        reasoning: Some("Looking up the forecast".into()),
        tool_calls: vec![call("web_search"), call("web_scrape")],
        tool_results: vec![result("web_search", json!({ "results": ["secret"] }))],
        usage: TokenUsage::new(12, 4),
        finish_reason: Some("tool-calls".into()),
    };

    let update = project_step("job-1", &step);

    assert_eq!(update.job_id, "job-1");
    assert_eq!(
        update.messages,
        vec![
            "Looking up the forecast".to_owned(),
            "Called tool \"web_search\"".to_owned(),
            "Called tool \"web_scrape\"".to_owned(),
            "web_search returned a response".to_owned(),
        ]
    );
    assert!(!update.is_terminal());
    assert_eq!(update.input_tokens, Some(12));
    assert_eq!(update.output_tokens, Some(4));
}

#[test]
fn tool_result_content_is_not_echoed() {
    let step = StepReport {
        tool_results: vec![result("web_scrape", json!({ "content": "page body" }))],
        ..StepReport::default()
    };
    let update = project_step("job-1", &step);
    assert!(update.messages.iter().all(|m| !m.contains("page body")));
}

#[test]
fn empty_reasoning_is_skipped() {
    let step = StepReport {
        reasoning: Some(String::new()),
        tool_calls: vec![call("web_search")],
        ..StepReport::default()
    };
    let update = project_step("job-1", &step);
    assert_eq!(update.messages, vec!["Called tool \"web_search\"".to_owned()]);
}

#[test]
fn step_without_usage_carries_no_token_fields() {
    let update = project_step("job-1", &StepReport::default());
    assert_eq!(update.input_tokens, None);
    assert_eq!(update.output_tokens, None);
    assert!(update.messages.is_empty());
}

// ── Final update ─────────────────────────────────────────────────────────────

#[test]
fn final_prefers_free_text_answer() {
    let outcome = AgentOutcome {
        text: Some("It is sunny.".into()),
        tool_results: vec![result("send_result", json!({ "result": "ignored" }))],
        usage: TokenUsage::new(20, 9),
    };

    let update = final_update("job-1", &outcome);

    assert_eq!(update.messages, vec!["It is sunny.".to_owned()]);
    assert!(update.is_terminal());
    assert_eq!(update.input_tokens, Some(20));
    assert_eq!(update.output_tokens, Some(9));
}

#[test]
fn final_falls_back_to_declared_result() {
    let outcome = AgentOutcome {
        text: Some("   ".into()),
        tool_results: vec![
            result("web_search", json!({ "results": [] })),
            result("send_result", json!({ "result": "Declared answer" })),
        ],
        usage: TokenUsage::default(),
    };

    let update = final_update("job-1", &outcome);
    assert_eq!(update.messages, vec!["Declared answer".to_owned()]);
}

#[test]
fn declared_result_is_read_from_input_when_output_lacks_it() {
    let outcome = AgentOutcome {
        tool_results: vec![ToolResult {
            tool_name: "send_result".into(),
            input: json!({ "result": "From input" }),
            output: json!(null),
        }],
        ..AgentOutcome::default()
    };
    assert_eq!(
        final_update("job-1", &outcome).messages,
        vec!["From input".to_owned()]
    );
}

#[test]
fn final_without_answer_uses_generic_notice() {
    let update = final_update("job-1", &AgentOutcome::default());
    assert_eq!(update.messages, vec![COMPLETED_MESSAGE.to_owned()]);
    assert!(update.is_terminal());
}

// ── Failure update ───────────────────────────────────────────────────────────

#[test]
fn failure_update_is_final_without_tokens() {
    let update = failure_update("job-9");
    assert_eq!(update.job_id, "job-9");
    assert_eq!(update.messages, vec![FAILURE_MESSAGE.to_owned()]);
    assert!(update.is_terminal());
    assert_eq!(update.input_tokens, None);
    assert_eq!(update.output_tokens, None);
}
