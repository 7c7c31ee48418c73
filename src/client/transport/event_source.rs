//! Native event-stream strategy.
//!
//! Opens the job with `GET /v1/run?id=..&prompt=..` and lets
//! [`eventsource_stream`] handle framing, so the session only has to decode
//! payloads.

use eventsource_stream::Eventsource;
use futures_util::StreamExt;
use reqwest::header::ACCEPT;
use reqwest::Url;

use super::{check_status, spawn_delivery, Endpoint, Transport, TransportHandle, TransportKind, TransportSink};
use crate::models::job::JobRequest;
use crate::{AppError, Result};

/// Event-stream client over a `GET` request.
#[derive(Debug, Clone)]
pub struct EventSourceTransport {
    endpoint: Endpoint,
}

impl EventSourceTransport {
    /// Create the strategy for `endpoint`.
    #[must_use]
    pub fn new(endpoint: Endpoint) -> Self {
        Self { endpoint }
    }
}

impl Transport for EventSourceTransport {
    fn kind(&self) -> TransportKind {
        TransportKind::EventSource
    }

    fn deliver(&self, request: &JobRequest, sink: TransportSink) -> TransportHandle {
        let endpoint = self.endpoint.clone();
        let request = request.clone();
        spawn_delivery(self.kind(), sink.clone(), stream_events(endpoint, request, sink))
    }
}

async fn stream_events(endpoint: Endpoint, request: JobRequest, sink: TransportSink) -> Result<()> {
    let url = Url::parse_with_params(
        endpoint.run_url().as_str(),
        [("id", request.id.as_str()), ("prompt", request.prompt.as_str())],
    )
    .map_err(|err| AppError::Transport(format!("cannot build event-stream url: {err}")))?;

    let response = endpoint
        .http
        .get(url)
        .header(ACCEPT, "text/event-stream")
        .send()
        .await?;
    let mut events = check_status(response)?.bytes_stream().eventsource();

    while let Some(event) = events.next().await {
        let event = event.map_err(|err| AppError::Transport(format!("event stream error: {err}")))?;
        if event.data.is_empty() {
            continue;
        }
        if !sink.payload(event.data) {
            break;
        }
    }
    Ok(())
}
