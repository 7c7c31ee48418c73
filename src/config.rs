//! Global configuration parsing, validation, and credential loading.

use std::env;
use std::fs;
use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::path::Path;

use reqwest::Url;
use serde::Deserialize;
use tracing::warn;

use crate::{AppError, Result};

/// Upper bound for `tools.search_max_results`.
pub const MAX_SEARCH_RESULTS: usize = 20;

/// Which client transport strategy to use.
#[derive(Debug, Clone, Copy, Default, Deserialize, PartialEq, Eq, clap::ValueEnum)]
#[serde(rename_all = "kebab-case")]
pub enum TransportPreference {
    /// Probe capabilities and take the best available strategy.
    #[default]
    Auto,
    /// Native event-stream client.
    EventSource,
    /// Progressive byte-stream reader.
    ByteStream,
    /// Progressive polling reader over a growing body buffer.
    Polling,
    /// Single blocking read of the whole body.
    Buffered,
}

/// HTTP server settings.
#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
#[serde(default, rename_all = "snake_case")]
pub struct ServerConfig {
    /// Address to bind.
    pub host: IpAddr,
    /// Port to bind; 0 lets the OS choose.
    pub http_port: u16,
    /// Idle interval before a keep-alive comment frame; 0 disables.
    pub keep_alive_seconds: u64,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: IpAddr::V4(Ipv4Addr::LOCALHOST),
            http_port: 3000,
            keep_alive_seconds: 15,
        }
    }
}

impl ServerConfig {
    /// Socket address the server binds.
    #[must_use]
    pub fn bind_addr(&self) -> SocketAddr {
        SocketAddr::new(self.host, self.http_port)
    }
}

/// Client settings.
#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
#[serde(default, rename_all = "snake_case")]
pub struct ClientConfig {
    /// Base URL of the job server.
    pub server_url: String,
    /// Transport strategy selection.
    pub transport: TransportPreference,
    /// TCP connect timeout.
    pub connect_timeout_seconds: u64,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            server_url: "http://localhost:3000".into(),
            transport: TransportPreference::Auto,
            connect_timeout_seconds: 10,
        }
    }
}

/// Tool provider settings.
///
/// API keys are loaded at runtime from environment variables, not from the
/// TOML config file.
#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
#[serde(default, rename_all = "snake_case")]
pub struct ToolsConfig {
    /// Brave web search endpoint.
    pub search_base_url: String,
    /// Maximum search results returned to the collaborator.
    pub search_max_results: usize,
    /// Firecrawl scrape endpoint.
    pub scrape_base_url: String,
    /// Per-request timeout for tool HTTP calls.
    pub request_timeout_seconds: u64,
    /// Brave subscription token (populated at runtime).
    #[serde(skip)]
    pub brave_api_key: String,
    /// Firecrawl API key (populated at runtime).
    #[serde(skip)]
    pub firecrawl_api_key: String,
}

impl Default for ToolsConfig {
    fn default() -> Self {
        Self {
            search_base_url: "https://api.search.brave.com/res/v1/web/search".into(),
            search_max_results: 10,
            scrape_base_url: "https://api.firecrawl.dev/v1/scrape".into(),
            request_timeout_seconds: 30,
            brave_api_key: String::new(),
            firecrawl_api_key: String::new(),
        }
    }
}

/// Global configuration parsed from `config.toml`.
#[derive(Debug, Clone, Default, Deserialize, PartialEq, Eq)]
#[serde(default, rename_all = "snake_case")]
pub struct GlobalConfig {
    /// HTTP server settings.
    pub server: ServerConfig,
    /// Client settings.
    pub client: ClientConfig,
    /// Tool provider settings.
    pub tools: ToolsConfig,
}

impl GlobalConfig {
    /// Load and validate configuration from a TOML file path.
    ///
    /// # Errors
    ///
    /// Returns `AppError::Config` if the file cannot be read or contains
    /// invalid TOML, or if validation fails.
    pub fn load_from_path(path: impl AsRef<Path>) -> Result<Self> {
        let raw = fs::read_to_string(path)
            .map_err(|err| AppError::Config(format!("failed to read config: {err}")))?;
        Self::from_toml_str(&raw)
    }

    /// Parse configuration from a TOML string and validate it.
    ///
    /// # Errors
    ///
    /// Returns `AppError::Config` if parsing or validation fails.
    pub fn from_toml_str(raw: &str) -> Result<Self> {
        let config: Self = toml::from_str(raw)?;
        config.validate()?;
        Ok(config)
    }

    /// Load tool API keys from environment variables.
    ///
    /// A missing key is not an error: the tool that needs it degrades to its
    /// neutral output.
    pub fn load_credentials(&mut self) {
        self.tools.brave_api_key = load_credential("BRAVE_SEARCH_API_KEY");
        self.tools.firecrawl_api_key = load_credential("FIRECRAWL_API_KEY");
    }

    /// Validate cross-field constraints.
    ///
    /// # Errors
    ///
    /// Returns `AppError::Config` naming the offending setting.
    pub fn validate(&self) -> Result<()> {
        validate_server_url(&self.client.server_url)?;

        if !(1..=MAX_SEARCH_RESULTS).contains(&self.tools.search_max_results) {
            return Err(AppError::Config(format!(
                "tools.search_max_results must be between 1 and {MAX_SEARCH_RESULTS}"
            )));
        }

        Ok(())
    }
}

/// Check that `raw` is an absolute http(s) URL.
///
/// # Errors
///
/// Returns `AppError::Config` if it is not.
pub fn validate_server_url(raw: &str) -> Result<()> {
    let url = Url::parse(raw)
        .map_err(|err| AppError::Config(format!("client.server_url invalid: {err}")))?;
    if !matches!(url.scheme(), "http" | "https") {
        return Err(AppError::Config(format!(
            "client.server_url must use http or https, got {}",
            url.scheme()
        )));
    }
    Ok(())
}

/// Read one credential from the environment, warning when absent.
fn load_credential(env_key: &str) -> String {
    match env::var(env_key) {
        Ok(value) if !value.trim().is_empty() => value,
        _ => {
            warn!(key = env_key, "credential not set; dependent tool disabled");
            String::new()
        }
    }
}
