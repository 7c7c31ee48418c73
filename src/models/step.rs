//! Step reports and terminal outcomes produced by the agent collaborator.

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Token usage reported for one step or for a whole run.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct TokenUsage {
    /// Input (prompt) tokens, when the collaborator reports them.
    pub input_tokens: Option<u64>,
    /// Output (completion) tokens, when the collaborator reports them.
    pub output_tokens: Option<u64>,
}

impl TokenUsage {
    /// Usage with both counts present.
    #[must_use]
    pub fn new(input_tokens: u64, output_tokens: u64) -> Self {
        Self {
            input_tokens: Some(input_tokens),
            output_tokens: Some(output_tokens),
        }
    }
}

/// A tool invocation requested during a step.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ToolCall {
    /// Registered tool name.
    pub tool_name: String,
    /// Arguments passed to the tool.
    pub input: Value,
}

/// The output a tool produced during a step.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ToolResult {
    /// Name of the tool that produced the output.
    pub tool_name: String,
    /// Arguments the tool was called with.
    pub input: Value,
    /// Tool output.
    pub output: Value,
}

/// One reasoning/tool-call step reported by the collaborator.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct StepReport {
    /// Free-text rationale for the step, if any.
    pub reasoning: Option<String>,
    /// Tools invoked in this step, in invocation order.
    pub tool_calls: Vec<ToolCall>,
    /// Tool outputs received in this step, in arrival order.
    pub tool_results: Vec<ToolResult>,
    /// Usage attributable to this step alone.
    pub usage: TokenUsage,
    /// Why the step ended (e.g. `tool-calls`, `stop`).
    pub finish_reason: Option<String>,
}

/// Terminal result of a collaborator run.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct AgentOutcome {
    /// Free-text answer, if the collaborator produced one.
    pub text: Option<String>,
    /// Tool outputs from the last step.
    pub tool_results: Vec<ToolResult>,
    /// Cumulative usage across the whole run.
    pub usage: TokenUsage,
}
