//! Firecrawl web page scrape tool.

use reqwest::Client;
use serde::Deserialize;
use serde_json::{json, Value};
use tracing::{error, info, warn};

use super::{Tool, ToolFuture, WEB_SCRAPE_TOOL};
use crate::config::ToolsConfig;

#[derive(Debug, Deserialize)]
struct ScrapeArgs {
    url: String,
}

#[derive(Debug, Deserialize)]
struct ScrapeResponse {
    data: Option<ScrapeData>,
}

#[derive(Debug, Deserialize)]
struct ScrapeData {
    markdown: Option<String>,
}

/// `web_scrape`: fetch a page's main content as markdown via Firecrawl.
#[derive(Debug, Clone)]
pub struct FirecrawlScrapeTool {
    http: Client,
    base_url: String,
    api_key: String,
}

impl FirecrawlScrapeTool {
    /// Create the tool from configuration. An empty API key disables it.
    #[must_use]
    pub fn new(http: Client, config: &ToolsConfig) -> Self {
        Self {
            http,
            base_url: config.scrape_base_url.clone(),
            api_key: config.firecrawl_api_key.clone(),
        }
    }

    async fn scrape(&self, input: Value) -> Value {
        let args: ScrapeArgs = match serde_json::from_value(input) {
            Ok(args) => args,
            Err(err) => {
                warn!(%err, "web_scrape: invalid arguments");
                return content("");
            }
        };
        info!(url = %args.url, "executing web scrape");

        if self.api_key.is_empty() {
            warn!("missing FIRECRAWL_API_KEY, returning empty content");
            return content("");
        }

        let result = self
            .http
            .post(&self.base_url)
            .bearer_auth(&self.api_key)
            .json(&json!({ "url": args.url, "formats": ["markdown"] }))
            .send()
            .await
            .and_then(reqwest::Response::error_for_status);

        let response = match result {
            Ok(response) => response,
            Err(err) => {
                error!(%err, "web_scrape: request failed");
                return content("");
            }
        };

        match response.json::<ScrapeResponse>().await {
            Ok(body) => content(
                body.data
                    .and_then(|d| d.markdown)
                    .as_deref()
                    .unwrap_or_default(),
            ),
            Err(err) => {
                error!(%err, "web_scrape: unexpected response shape");
                content("")
            }
        }
    }
}

impl Tool for FirecrawlScrapeTool {
    fn name(&self) -> &'static str {
        WEB_SCRAPE_TOOL
    }

    fn description(&self) -> &'static str {
        "Scrape the main content from a webpage URL."
    }

    fn input_schema(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "url": { "type": "string", "description": "Page to scrape" }
            },
            "required": ["url"]
        })
    }

    fn execute(&self, input: Value) -> ToolFuture<'_> {
        Box::pin(self.scrape(input))
    }
}

fn content(text: &str) -> Value {
    json!({ "content": text })
}
