//! Unit tests for the wire and request models.

use chrono::{TimeZone, Timelike, Utc};
use serde_json::json;

use job_relay::models::job::JobRequest;
use job_relay::models::progress::{ProgressUpdate, TokenTotals};
use job_relay::AppError;

// ── ProgressUpdate wire shape ────────────────────────────────────────────────

#[test]
fn update_serializes_with_camel_case_fields() {
    let mut update = ProgressUpdate::new("job-1", vec!["It is sunny.".into()])
        .into_final()
        .with_tokens(Some(20), Some(9));
    update.timestamp = Utc.with_ymd_and_hms(2026, 3, 1, 12, 30, 0).unwrap();

    let value = serde_json::to_value(&update).expect("serialize");

    assert_eq!(
        value,
        json!({
            "jobId": "job-1",
            "messages": ["It is sunny."],
            "timestamp": "2026-03-01T12:30:00Z",
            "isFinal": true,
            "inputTokens": 20,
            "outputTokens": 9
        })
    );
}

#[test]
fn absent_optional_fields_are_omitted() {
    let update = ProgressUpdate::new("job-1", Vec::new());
    let value = serde_json::to_value(&update).expect("serialize");
    let object = value.as_object().expect("object");

    assert!(!object.contains_key("isFinal"));
    assert!(!object.contains_key("inputTokens"));
    assert!(!object.contains_key("outputTokens"));
}

#[test]
fn timestamp_parses_into_a_time_value() {
    let update: ProgressUpdate = serde_json::from_str(
        r#"{"jobId":"j","messages":[],"timestamp":"2026-03-01T12:30:00.250+02:00"}"#,
    )
    .expect("parse");

    assert_eq!(
        update.timestamp,
        Utc.with_ymd_and_hms(2026, 3, 1, 10, 30, 0)
            .unwrap()
            .with_nanosecond(250_000_000)
            .unwrap()
    );
    assert!(!update.is_terminal());
}

#[test]
fn explicit_false_is_not_terminal() {
    let update: ProgressUpdate = serde_json::from_str(
        r#"{"jobId":"j","messages":[],"timestamp":"2026-03-01T12:30:00Z","isFinal":false}"#,
    )
    .expect("parse");
    assert!(!update.is_terminal());
}

// ── TokenTotals ──────────────────────────────────────────────────────────────

#[test]
fn totals_sum_present_values_and_treat_absent_as_zero() {
    let mut totals = TokenTotals::default();
    for (input, output) in [(Some(10), Some(2)), (None, None), (Some(5), None), (Some(3), Some(1))] {
        totals.record(&ProgressUpdate::new("j", Vec::new()).with_tokens(input, output));
    }
    assert_eq!(totals, TokenTotals { input: 18, output: 3 });
    assert_eq!(totals.total(), 21);
}

#[test]
fn totals_saturate_instead_of_overflowing() {
    let mut totals = TokenTotals {
        input: u64::MAX,
        output: 0,
    };
    totals.record(&ProgressUpdate::new("j", Vec::new()).with_tokens(Some(1), None));
    assert_eq!(totals.input, u64::MAX);
    assert_eq!(totals.total(), u64::MAX);
}

// ── JobRequest ───────────────────────────────────────────────────────────────

#[test]
fn generated_request_trims_prompt() {
    let request = JobRequest::with_generated_id("  weather in Oslo \n").expect("valid");
    assert_eq!(request.prompt, "weather in Oslo");
    assert!(!request.id.is_empty());
}

#[test]
fn generated_ids_are_unique() {
    let a = JobRequest::with_generated_id("x").expect("valid");
    let b = JobRequest::with_generated_id("x").expect("valid");
    assert_ne!(a.id, b.id);
}

#[test]
fn whitespace_prompt_is_invalid() {
    let result = JobRequest::with_generated_id(" \t\n");
    assert!(matches!(result, Err(AppError::InvalidRequest(msg)) if msg.contains("prompt")));
}

#[test]
fn empty_id_is_invalid() {
    let request = JobRequest {
        id: String::new(),
        prompt: "weather".into(),
    };
    assert!(matches!(request.validate(), Err(AppError::InvalidRequest(msg)) if msg.contains("id")));
}
