//! Declare-completion tool.

use serde_json::{json, Value};
use tracing::info;

use super::{Tool, ToolFuture, SEND_RESULT_TOOL};

/// `send_result`: declares the job finished and carries its final result.
///
/// The tool has no side effect; it echoes `{"result": ...}` so the emitter
/// can read the declared result from the run's tool outputs.
#[derive(Debug, Clone, Copy, Default)]
pub struct SendResultTool;

impl Tool for SendResultTool {
    fn name(&self) -> &'static str {
        SEND_RESULT_TOOL
    }

    fn description(&self) -> &'static str {
        "Declare that the job is finished and provide the final result."
    }

    fn input_schema(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "result": { "type": "string", "description": "Final answer for the user" }
            },
            "required": ["result"]
        })
    }

    fn execute(&self, input: Value) -> ToolFuture<'_> {
        Box::pin(async move {
            info!("job completed, final result sent");
            let result = input
                .get("result")
                .and_then(Value::as_str)
                .unwrap_or_default()
                .to_owned();
            json!({ "result": result })
        })
    }
}
