//! Brave web search tool.

use reqwest::header::ACCEPT;
use reqwest::{Client, Url};
use serde::Deserialize;
use serde_json::{json, Value};
use tracing::{debug, error, info, warn};

use super::{Tool, ToolFuture, WEB_SEARCH_TOOL};
use crate::config::ToolsConfig;

/// Header carrying the Brave subscription token.
const TOKEN_HEADER: &str = "X-Subscription-Token";

/// Arguments accepted by `web_search`.
#[derive(Debug, Deserialize)]
struct SearchArgs {
    query: String,
}

/// `web_search`: query the Brave Search API and return titled links.
#[derive(Debug, Clone)]
pub struct BraveSearchTool {
    http: Client,
    base_url: String,
    api_key: String,
    max_results: usize,
}

impl BraveSearchTool {
    /// Create the tool from configuration. An empty API key disables it.
    #[must_use]
    pub fn new(http: Client, config: &ToolsConfig) -> Self {
        Self {
            http,
            base_url: config.search_base_url.clone(),
            api_key: config.brave_api_key.clone(),
            max_results: config.search_max_results,
        }
    }

    async fn search(&self, input: Value) -> Value {
        let args: SearchArgs = match serde_json::from_value(input) {
            Ok(args) => args,
            Err(err) => {
                warn!(%err, "web_search: invalid arguments");
                return empty_results();
            }
        };
        info!(query = %args.query, "executing web search");

        if self.api_key.is_empty() {
            warn!("missing BRAVE_SEARCH_API_KEY, returning empty results");
            return empty_results();
        }

        let count = self.max_results.to_string();
        let url = match Url::parse_with_params(
            &self.base_url,
            [("q", args.query.as_str()), ("count", count.as_str())],
        ) {
            Ok(url) => url,
            Err(err) => {
                error!(%err, base_url = %self.base_url, "web_search: invalid base url");
                return empty_results();
            }
        };

        let response = match self
            .http
            .get(url)
            .header(ACCEPT, "application/json")
            .header(TOKEN_HEADER, &self.api_key)
            .send()
            .await
        {
            Ok(response) => response,
            Err(err) => {
                error!(%err, "web_search: request failed");
                return empty_results();
            }
        };

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            error!(status = status.as_u16(), body = %body, "brave search api error");
            return empty_results();
        }

        match response.json::<Value>().await {
            Ok(body) => {
                let results = map_search_results(&body, self.max_results);
                debug!(count = results.len(), "web_search: mapped results");
                json!({ "results": results })
            }
            Err(err) => {
                error!(%err, "web_search: response was not json");
                empty_results()
            }
        }
    }
}

impl Tool for BraveSearchTool {
    fn name(&self) -> &'static str {
        WEB_SEARCH_TOOL
    }

    fn description(&self) -> &'static str {
        "Search the web for relevant information and links."
    }

    fn input_schema(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "query": { "type": "string", "description": "The search query" }
            },
            "required": ["query"]
        })
    }

    fn execute(&self, input: Value) -> ToolFuture<'_> {
        Box::pin(self.search(input))
    }
}

/// Normalize a Brave response body into `{title, url, description?}` entries.
///
/// Results are read from `web.results`, falling back to a top-level
/// `results` array. Entries missing a title or url are dropped and the list
/// is capped at `max_results`.
#[must_use]
pub fn map_search_results(body: &Value, max_results: usize) -> Vec<Value> {
    let raw = body
        .pointer("/web/results")
        .and_then(Value::as_array)
        .or_else(|| body.get("results").and_then(Value::as_array));

    let Some(raw) = raw else {
        return Vec::new();
    };

    raw.iter()
        .filter_map(|item| {
            let title = first_string(item, &["title", "heading", "name"])?;
            let url = first_string(item, &["url", "link", "canonical_url"])?;
            let mut entry = json!({ "title": title, "url": url });
            if let Some(description) =
                first_string(item, &["description", "snippet", "excerpt", "summary"])
            {
                entry["description"] = Value::String(description);
            }
            Some(entry)
        })
        .take(max_results)
        .collect()
}

/// First non-empty trimmed string among `keys`.
fn first_string(item: &Value, keys: &[&str]) -> Option<String> {
    keys.iter()
        .filter_map(|key| item.get(*key).and_then(Value::as_str))
        .map(str::trim)
        .find(|s| !s.is_empty())
        .map(str::to_owned)
}

fn empty_results() -> Value {
    json!({ "results": [] })
}
