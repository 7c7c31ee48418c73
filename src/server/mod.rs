//! HTTP transport for job runs.
//!
//! Mounts the job endpoint behind an axum router. Each request drives one
//! collaborator run and streams its progress as event-stream frames on the
//! open response.

pub mod routes;

use std::sync::Arc;
use std::time::Duration;

use axum::middleware;
use axum::routing::get;
use axum::Router;
use tokio_util::sync::CancellationToken;
use tracing::info;

use crate::agent::AgentCollaborator;
use crate::config::ServerConfig;
use crate::tools::Toolbox;
use crate::{AppError, Result};

/// Shared state handed to every request handler.
#[derive(Clone)]
pub struct AppState {
    /// Collaborator that executes jobs.
    pub agent: Arc<dyn AgentCollaborator>,
    /// Tools offered to the collaborator.
    pub toolbox: Arc<Toolbox>,
    /// Idle interval before a keep-alive frame; `None` disables them.
    pub keep_alive: Option<Duration>,
}

impl AppState {
    /// Build state from server configuration.
    #[must_use]
    pub fn new(agent: Arc<dyn AgentCollaborator>, toolbox: Toolbox, config: &ServerConfig) -> Self {
        let keep_alive =
            (config.keep_alive_seconds > 0).then(|| Duration::from_secs(config.keep_alive_seconds));
        Self {
            agent,
            toolbox: Arc::new(toolbox),
            keep_alive,
        }
    }
}

/// Build the application router.
#[must_use]
pub fn router(state: AppState) -> Router {
    Router::new()
        .route(
            "/v1/run",
            get(routes::run_job_query)
                .post(routes::run_job_json)
                .options(routes::preflight),
        )
        .route("/health", get(routes::health))
        .layer(middleware::from_fn(routes::cors))
        .with_state(state)
}

/// Serve the router on `config`'s address until `ct` is cancelled.
///
/// Shutdown stops accepting connections and waits for open job responses
/// to finish streaming.
///
/// # Errors
///
/// Returns `AppError::Config` if the listener cannot bind, or
/// `AppError::Io` if the server fails while running.
pub async fn serve_http(state: AppState, config: &ServerConfig, ct: CancellationToken) -> Result<()> {
    let bind = config.bind_addr();
    let listener = tokio::net::TcpListener::bind(bind)
        .await
        .map_err(|err| AppError::Config(format!("failed to bind HTTP on {bind}: {err}")))?;

    info!(%bind, "starting HTTP job transport");

    axum::serve(listener, router(state))
        .with_graceful_shutdown(async move { ct.cancelled().await })
        .await
        .map_err(|err| AppError::Io(format!("HTTP server error: {err}")))?;

    info!("HTTP job transport shut down");
    Ok(())
}
