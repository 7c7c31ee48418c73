//! Progress update wire entity and client-side token accounting.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// One step of job progress, as streamed from the server.
///
/// Serialized with camelCase field names. Optional fields are omitted from
/// the wire when absent, so a step without token usage carries neither
/// `inputTokens` nor `outputTokens`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct ProgressUpdate {
    /// Identifier of the originating job; stable for all updates of one job.
    pub job_id: String,
    /// Human-readable descriptions of what happened in this step.
    #[serde(default)]
    pub messages: Vec<String>,
    /// When the update was produced. Encoded as ISO-8601 on the wire.
    pub timestamp: DateTime<Utc>,
    /// Marks the last update for the job.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub is_final: Option<bool>,
    /// Input tokens attributable to this step.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub input_tokens: Option<u64>,
    /// Output tokens attributable to this step.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub output_tokens: Option<u64>,
}

impl ProgressUpdate {
    /// Construct a non-final update stamped with the current time.
    #[must_use]
    pub fn new(job_id: impl Into<String>, messages: Vec<String>) -> Self {
        Self {
            job_id: job_id.into(),
            messages,
            timestamp: Utc::now(),
            is_final: None,
            input_tokens: None,
            output_tokens: None,
        }
    }

    /// Mark this update as the terminal one for its job.
    #[must_use]
    pub fn into_final(mut self) -> Self {
        self.is_final = Some(true);
        self
    }

    /// Attach token counts to this update.
    #[must_use]
    pub fn with_tokens(mut self, input: Option<u64>, output: Option<u64>) -> Self {
        self.input_tokens = input;
        self.output_tokens = output;
        self
    }

    /// Whether this is the terminal update (`isFinal` present and `true`).
    #[must_use]
    pub fn is_terminal(&self) -> bool {
        self.is_final == Some(true)
    }
}

/// Running token totals for one job session.
///
/// The server reports per-step usage, so totals are the sum of every present
/// value across all received updates, the final one included.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct TokenTotals {
    /// Summed input tokens.
    pub input: u64,
    /// Summed output tokens.
    pub output: u64,
}

impl TokenTotals {
    /// Add the counts carried by `update`; absent fields count as zero.
    pub fn record(&mut self, update: &ProgressUpdate) {
        self.input = self.input.saturating_add(update.input_tokens.unwrap_or(0));
        self.output = self
            .output
            .saturating_add(update.output_tokens.unwrap_or(0));
    }

    /// Combined input and output tokens.
    #[must_use]
    pub fn total(&self) -> u64 {
        self.input.saturating_add(self.output)
    }
}
