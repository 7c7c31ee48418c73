//! Projection of collaborator steps and outcomes into progress updates.

use serde_json::Value;

use crate::models::progress::ProgressUpdate;
use crate::models::step::{AgentOutcome, StepReport};
use crate::tools::SEND_RESULT_TOOL;

/// Final message used when the collaborator finished without an answer.
pub const COMPLETED_MESSAGE: &str = "Job completed.";

/// Final message used when the collaborator failed.
pub const FAILURE_MESSAGE: &str = "An error occurred while processing the job.";

/// Project one step into a non-final update.
///
/// Emits the rationale (if any), then one message per tool invocation, then
/// one message per tool result. Result content is not echoed. Token fields
/// carry this step's usage only.
#[must_use]
pub fn project_step(job_id: &str, step: &StepReport) -> ProgressUpdate {
    let mut messages = Vec::with_capacity(1 + step.tool_calls.len() + step.tool_results.len());

    if let Some(reasoning) = step.reasoning.as_deref().filter(|r| !r.is_empty()) {
        messages.push(reasoning.to_owned());
    }
    for call in &step.tool_calls {
        messages.push(format!("Called tool \"{}\"", call.tool_name));
    }
    for result in &step.tool_results {
        messages.push(format!("{} returned a response", result.tool_name));
    }

    ProgressUpdate::new(job_id, messages)
        .with_tokens(step.usage.input_tokens, step.usage.output_tokens)
}

/// Build the terminal update for a finished run.
///
/// The message prefers the free-text answer, then the result declared via
/// the completion tool, then [`COMPLETED_MESSAGE`]. Token fields carry the
/// cumulative usage of the run.
#[must_use]
pub fn final_update(job_id: &str, outcome: &AgentOutcome) -> ProgressUpdate {
    let message = outcome
        .text
        .as_deref()
        .filter(|text| !text.trim().is_empty())
        .map(str::to_owned)
        .or_else(|| declared_result(outcome))
        .unwrap_or_else(|| COMPLETED_MESSAGE.to_owned());

    ProgressUpdate::new(job_id, vec![message])
        .into_final()
        .with_tokens(outcome.usage.input_tokens, outcome.usage.output_tokens)
}

/// Build the terminal update for a failed run. Carries no token fields.
#[must_use]
pub fn failure_update(job_id: &str) -> ProgressUpdate {
    ProgressUpdate::new(job_id, vec![FAILURE_MESSAGE.to_owned()]).into_final()
}

/// The `result` declared through the completion tool, if it was invoked.
fn declared_result(outcome: &AgentOutcome) -> Option<String> {
    let result = outcome
        .tool_results
        .iter()
        .find(|r| r.tool_name == SEND_RESULT_TOOL)?;

    result_field(&result.output)
        .or_else(|| result_field(&result.input))
        .filter(|text| !text.trim().is_empty())
}

fn result_field(value: &Value) -> Option<String> {
    value.get("result").and_then(Value::as_str).map(str::to_owned)
}
