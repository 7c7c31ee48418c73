//! Tools offered to the agent collaborator.
//!
//! Every tool follows the same contract: `execute(input) -> output`, where
//! both sides are JSON values. Tools never fail outward; on any error they
//! log and return a neutral output (`{"results": []}`, `{"content": ""}`),
//! so one broken provider degrades the job instead of aborting it.

pub mod scrape;
pub mod search;
pub mod send_result;

use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use std::time::Duration;

use serde_json::Value;
use tracing::warn;

use crate::config::ToolsConfig;
use crate::{AppError, Result};

pub use scrape::FirecrawlScrapeTool;
pub use search::BraveSearchTool;
pub use send_result::SendResultTool;

/// Name of the web search tool.
pub const WEB_SEARCH_TOOL: &str = "web_search";

/// Name of the web page scrape tool.
pub const WEB_SCRAPE_TOOL: &str = "web_scrape";

/// Name of the declare-completion tool. Invoking it ends a run.
pub const SEND_RESULT_TOOL: &str = "send_result";

/// Future returned by [`Tool::execute`].
pub type ToolFuture<'a> = Pin<Box<dyn Future<Output = Value> + Send + 'a>>;

/// A named capability the collaborator may invoke.
pub trait Tool: Send + Sync {
    /// Registered tool name.
    fn name(&self) -> &'static str;

    /// One-line description shown to the collaborator.
    fn description(&self) -> &'static str;

    /// JSON schema of the accepted input.
    fn input_schema(&self) -> Value;

    /// Run the tool. Never fails; errors map to a neutral output.
    fn execute(&self, input: Value) -> ToolFuture<'_>;
}

/// Description of a tool as handed to the collaborator.
#[derive(Debug, Clone, PartialEq)]
pub struct ToolDefinition {
    /// Registered tool name.
    pub name: &'static str,
    /// One-line description.
    pub description: &'static str,
    /// JSON schema of the accepted input.
    pub input_schema: Value,
}

/// The set of tools available to one collaborator run.
#[derive(Clone, Default)]
pub struct Toolbox {
    tools: Vec<Arc<dyn Tool>>,
}

impl std::fmt::Debug for Toolbox {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_list()
            .entries(self.tools.iter().map(|t| t.name()))
            .finish()
    }
}

impl Toolbox {
    /// Create an empty toolbox.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Build the standard toolbox (`web_search`, `web_scrape`, `send_result`).
    ///
    /// # Errors
    ///
    /// Returns `AppError::Config` if the HTTP client cannot be built.
    pub fn standard(config: &ToolsConfig) -> Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.request_timeout_seconds))
            .build()
            .map_err(|err| AppError::Config(format!("failed to build tool http client: {err}")))?;

        Ok(Self::new()
            .with_tool(BraveSearchTool::new(http.clone(), config))
            .with_tool(FirecrawlScrapeTool::new(http, config))
            .with_tool(SendResultTool))
    }

    /// Register a tool. A later tool with the same name shadows earlier ones.
    #[must_use]
    pub fn with_tool(mut self, tool: impl Tool + 'static) -> Self {
        self.tools.push(Arc::new(tool));
        self
    }

    /// Look up a tool by name.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&Arc<dyn Tool>> {
        self.tools.iter().rev().find(|t| t.name() == name)
    }

    /// Definitions of every registered tool.
    #[must_use]
    pub fn definitions(&self) -> Vec<ToolDefinition> {
        self.tools
            .iter()
            .map(|t| ToolDefinition {
                name: t.name(),
                description: t.description(),
                input_schema: t.input_schema(),
            })
            .collect()
    }

    /// Execute the named tool.
    ///
    /// An unknown name yields `Value::Null` rather than an error.
    pub async fn execute(&self, name: &str, input: Value) -> Value {
        match self.get(name) {
            Some(tool) => tool.execute(input).await,
            None => {
                warn!(tool = name, "unknown tool requested");
                Value::Null
            }
        }
    }
}
