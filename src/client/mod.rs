//! Client side of the job stream: transport selection, frame reassembly and
//! the per-run session controller.

pub mod reassembler;
pub mod session;
pub mod transport;

use std::sync::Arc;
use std::time::Duration;

use tracing::info;

use crate::config::{validate_server_url, ClientConfig};
use crate::{AppError, Result};

pub use reassembler::FrameReassembler;
pub use session::{JobSession, SessionState};
pub use transport::{Transport, TransportCapabilities, TransportKind};

/// Select a reception strategy for `config` and build it.
///
/// The runtime's capabilities are probed once and narrowed to the
/// configured preference; the chosen strategy serves every job started
/// through it.
///
/// # Errors
///
/// Returns `AppError::Config` if the server URL is invalid or the HTTP
/// client cannot be built.
pub fn connect(config: &ClientConfig) -> Result<Arc<dyn Transport>> {
    validate_server_url(&config.server_url)?;

    let http = reqwest::Client::builder()
        .connect_timeout(Duration::from_secs(config.connect_timeout_seconds))
        .build()
        .map_err(|err| AppError::Config(format!("failed to build http client: {err}")))?;

    let capabilities = TransportCapabilities::probe().restricted_to(config.transport);
    let kind = TransportKind::select(capabilities);
    info!(
        transport = %kind,
        server_url = %config.server_url,
        preference = ?config.transport,
        "reception strategy selected"
    );

    transport::build_transport(kind, http, &config.server_url)
}

/// Message shown to the user when a run fails at the transport level.
#[must_use]
pub fn failure_message(server_url: &str) -> String {
    format!("Failed to connect or stream updates. Ensure the server is running on {server_url}.")
}
