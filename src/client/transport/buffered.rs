//! Blocking fallback strategy.

use super::{check_status, spawn_delivery, Endpoint, Transport, TransportHandle, TransportKind, TransportSink};
use crate::models::job::JobRequest;
use crate::Result;

/// Reads the whole `POST` response body once it completes and delivers it
/// as a single fragment. No incremental updates.
#[derive(Debug, Clone)]
pub struct BufferedTransport {
    endpoint: Endpoint,
}

impl BufferedTransport {
    /// Create the strategy for `endpoint`.
    #[must_use]
    pub fn new(endpoint: Endpoint) -> Self {
        Self { endpoint }
    }
}

impl Transport for BufferedTransport {
    fn kind(&self) -> TransportKind {
        TransportKind::Buffered
    }

    fn deliver(&self, request: &JobRequest, sink: TransportSink) -> TransportHandle {
        let endpoint = self.endpoint.clone();
        let request = request.clone();
        spawn_delivery(self.kind(), sink.clone(), read_whole(endpoint, request, sink))
    }
}

async fn read_whole(endpoint: Endpoint, request: JobRequest, sink: TransportSink) -> Result<()> {
    let response = check_status(endpoint.post(&request).send().await?)?;
    let body = response.bytes().await?;
    sink.fragment(body);
    Ok(())
}
