//! Fixed search → scrape → declare pipeline.
//!
//! Lets the server run end to end without an LLM behind it. Each stage is
//! reported as one step, and the run ends by invoking `send_result`, so the
//! final update carries the declared result.

use std::fmt::Write as _;

use serde_json::{json, Value};
use tracing::info;

use super::{AgentCollaborator, AgentFuture, StepSink};
use crate::models::step::{AgentOutcome, StepReport, TokenUsage, ToolCall, ToolResult};
use crate::tools::{Toolbox, SEND_RESULT_TOOL, WEB_SCRAPE_TOOL, WEB_SEARCH_TOOL};
use crate::Result;

/// Search results listed in the declared result.
const LISTED_RESULTS: usize = 5;

/// Characters of scraped content quoted in the declared result.
const EXCERPT_CHARS: usize = 600;

/// Collaborator that searches for the prompt, scrapes the top hit and
/// declares a summary as the result.
#[derive(Debug, Clone, Copy, Default)]
pub struct SearchAgent;

impl AgentCollaborator for SearchAgent {
    fn run<'a>(&'a self, prompt: &'a str, toolbox: &'a Toolbox, steps: StepSink) -> AgentFuture<'a> {
        Box::pin(run_pipeline(prompt, toolbox, steps))
    }
}

async fn run_pipeline(prompt: &str, toolbox: &Toolbox, steps: StepSink) -> Result<AgentOutcome> {
    let search_input = json!({ "query": prompt });
    let search_output = toolbox.execute(WEB_SEARCH_TOOL, search_input.clone()).await;
    steps.report(tool_step(
        Some(format!("Searching the web for \"{prompt}\"")),
        WEB_SEARCH_TOOL,
        search_input,
        search_output.clone(),
    ));

    let hits = search_output
        .get("results")
        .and_then(Value::as_array)
        .cloned()
        .unwrap_or_default();

    let mut excerpt = String::new();
    if let Some(url) = hits.first().and_then(|hit| hit.get("url")).and_then(Value::as_str) {
        let scrape_input = json!({ "url": url });
        let scrape_output = toolbox.execute(WEB_SCRAPE_TOOL, scrape_input.clone()).await;
        excerpt = scrape_output
            .get("content")
            .and_then(Value::as_str)
            .unwrap_or_default()
            .chars()
            .take(EXCERPT_CHARS)
            .collect();
        steps.report(tool_step(
            Some(format!("Reading the top result at {url}")),
            WEB_SCRAPE_TOOL,
            scrape_input,
            scrape_output,
        ));
    }

    let summary = summarize(prompt, &hits, excerpt.trim());
    let send_input = json!({ "result": summary });
    let send_output = toolbox.execute(SEND_RESULT_TOOL, send_input.clone()).await;
    steps.report(tool_step(None, SEND_RESULT_TOOL, send_input.clone(), send_output.clone()));

    info!(hits = hits.len(), "search pipeline finished");

    Ok(AgentOutcome {
        text: None,
        tool_results: vec![ToolResult {
            tool_name: SEND_RESULT_TOOL.to_owned(),
            input: send_input,
            output: send_output,
        }],
        usage: TokenUsage::default(),
    })
}

fn tool_step(reasoning: Option<String>, tool: &str, input: Value, output: Value) -> StepReport {
    StepReport {
        reasoning,
        tool_calls: vec![ToolCall {
            tool_name: tool.to_owned(),
            input: input.clone(),
        }],
        tool_results: vec![ToolResult {
            tool_name: tool.to_owned(),
            input,
            output,
        }],
        usage: TokenUsage::default(),
        finish_reason: Some("tool-calls".into()),
    }
}

fn summarize(prompt: &str, hits: &[Value], excerpt: &str) -> String {
    if hits.is_empty() {
        return format!("No web results found for \"{prompt}\".");
    }

    let mut out = format!("Top results for \"{prompt}\":");
    for hit in hits.iter().take(LISTED_RESULTS) {
        let title = hit.get("title").and_then(Value::as_str).unwrap_or_default();
        let url = hit.get("url").and_then(Value::as_str).unwrap_or_default();
        let _ = write!(out, "\n- {title} ({url})");
    }
    if !excerpt.is_empty() {
        let _ = write!(out, "\n\n{excerpt}");
    }
    out
}
