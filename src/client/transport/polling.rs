//! Progressive polling strategy.
//!
//! Models a client that can only re-read a response buffer as it grows: a
//! pump appends body chunks to a shared [`GrowingBody`] and publishes a
//! progress notification through a [`watch`] channel. The reader wakes on
//! each notification, reads everything past its last offset, and forwards
//! only that new suffix. Notifications coalesce, so several chunks may be
//! read at once, but no byte is ever delivered twice. The reader reports
//! its offset back to the pump, which releases the delivered prefix before
//! appending the next chunk.

use bytes::Bytes;
use futures_util::StreamExt;
use tokio::sync::watch;
use tracing::trace;

use super::{check_status, spawn_delivery, Endpoint, Transport, TransportHandle, TransportKind, TransportSink};
use crate::models::job::JobRequest;
use crate::{AppError, Result};

/// Completion state of a [`GrowingBody`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
enum BodyState {
    #[default]
    Receiving,
    Complete,
    Failed(String),
}

/// Response body as observed so far.
///
/// Holds only the bytes the reader has not yet delivered: `base` is the
/// absolute body offset of `bytes[0]`.
#[derive(Debug, Default)]
struct GrowingBody {
    base: usize,
    bytes: Vec<u8>,
    state: BodyState,
}

impl GrowingBody {
    /// Drop every held byte before absolute offset `delivered`.
    fn release_through(&mut self, delivered: usize) {
        let count = delivered.saturating_sub(self.base).min(self.bytes.len());
        self.bytes.drain(..count);
        self.base += count;
    }
}

/// Polling reader over a `POST` response.
#[derive(Debug, Clone)]
pub struct PollingTransport {
    endpoint: Endpoint,
}

impl PollingTransport {
    /// Create the strategy for `endpoint`.
    #[must_use]
    pub fn new(endpoint: Endpoint) -> Self {
        Self { endpoint }
    }
}

impl Transport for PollingTransport {
    fn kind(&self) -> TransportKind {
        TransportKind::Polling
    }

    fn deliver(&self, request: &JobRequest, sink: TransportSink) -> TransportHandle {
        let endpoint = self.endpoint.clone();
        let request = request.clone();
        spawn_delivery(self.kind(), sink.clone(), poll_body(endpoint, request, sink))
    }
}

async fn poll_body(endpoint: Endpoint, request: JobRequest, sink: TransportSink) -> Result<()> {
    let (progress_tx, progress_rx) = watch::channel(GrowingBody::default());
    let (delivered_tx, delivered_rx) = watch::channel(0);
    let ((), result) = tokio::join!(
        pump_body(&endpoint, &request, &progress_tx, &delivered_rx),
        read_suffixes(progress_rx, &delivered_tx, &sink),
    );
    result
}

/// Append the response body to the shared buffer as it arrives.
async fn pump_body(
    endpoint: &Endpoint,
    request: &JobRequest,
    progress: &watch::Sender<GrowingBody>,
    delivered: &watch::Receiver<usize>,
) {
    let outcome: Result<()> = async {
        let response = check_status(endpoint.post(request).send().await?)?;
        let mut body = response.bytes_stream();
        while let Some(chunk) = body.next().await {
            append_chunk(progress, delivered, &chunk?);
        }
        Ok(())
    }
    .await;

    progress.send_modify(|grown| {
        grown.state = match outcome {
            Ok(()) => BodyState::Complete,
            Err(err) => BodyState::Failed(err.to_string()),
        };
    });
}

/// Publish `chunk`, first releasing whatever the reader has delivered.
fn append_chunk(progress: &watch::Sender<GrowingBody>, delivered: &watch::Receiver<usize>, chunk: &[u8]) {
    let delivered = *delivered.borrow();
    progress.send_modify(|grown| {
        grown.release_through(delivered);
        grown.bytes.extend_from_slice(chunk);
    });
}

/// Forward the unseen suffix of the body on every progress notification,
/// then report the new offset back to the pump.
async fn read_suffixes(
    mut progress: watch::Receiver<GrowingBody>,
    delivered: &watch::Sender<usize>,
    sink: &TransportSink,
) -> Result<()> {
    let mut offset = 0;
    loop {
        let closed = progress.changed().await.is_err();

        let (suffix, state) = {
            let body = progress.borrow_and_update();
            (body.bytes[offset - body.base..].to_vec(), body.state.clone())
        };
        offset += suffix.len();
        trace!(offset, new_bytes = suffix.len(), "polling reader progress");

        if !suffix.is_empty() {
            if !sink.fragment(Bytes::from(suffix)) {
                return Ok(());
            }
            delivered.send_replace(offset);
        }

        match state {
            BodyState::Complete => return Ok(()),
            BodyState::Failed(reason) => return Err(AppError::Transport(reason)),
            BodyState::Receiving if closed => {
                return Err(AppError::Transport("response body closed unexpectedly".into()));
            }
            BodyState::Receiving => {}
        }
    }
}
