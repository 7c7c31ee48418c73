//! Progressive byte-stream strategy.

use futures_util::StreamExt;

use super::{check_status, spawn_delivery, Endpoint, Transport, TransportHandle, TransportKind, TransportSink};
use crate::models::job::JobRequest;
use crate::Result;

/// Reads the `POST` response body chunk by chunk and forwards each chunk
/// untouched.
#[derive(Debug, Clone)]
pub struct ByteStreamTransport {
    endpoint: Endpoint,
}

impl ByteStreamTransport {
    /// Create the strategy for `endpoint`.
    #[must_use]
    pub fn new(endpoint: Endpoint) -> Self {
        Self { endpoint }
    }
}

impl Transport for ByteStreamTransport {
    fn kind(&self) -> TransportKind {
        TransportKind::ByteStream
    }

    fn deliver(&self, request: &JobRequest, sink: TransportSink) -> TransportHandle {
        let endpoint = self.endpoint.clone();
        let request = request.clone();
        spawn_delivery(self.kind(), sink.clone(), stream_chunks(endpoint, request, sink))
    }
}

async fn stream_chunks(endpoint: Endpoint, request: JobRequest, sink: TransportSink) -> Result<()> {
    let response = check_status(endpoint.post(&request).send().await?)?;
    let mut body = response.bytes_stream();

    while let Some(chunk) = body.next().await {
        if !sink.fragment(chunk?) {
            break;
        }
    }
    Ok(())
}
