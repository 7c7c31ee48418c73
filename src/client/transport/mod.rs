//! Reception strategies for a job's streamed response.
//!
//! Every strategy implements [`Transport`]: `deliver` starts one job's
//! request and pushes [`TransportEvent`]s into an ordered channel until the
//! body ends, fails, or the returned [`TransportHandle`] is released. The
//! strategy is chosen once per client through a capability probe
//! ([`TransportKind::select`]) and never changes mid-job.
//!
//! | Strategy                | Request | Delivers                         |
//! |-------------------------|---------|----------------------------------|
//! | [`EventSourceTransport`]| `GET`   | decoded payloads (no buffering)  |
//! | [`ByteStreamTransport`] | `POST`  | raw body chunks                  |
//! | [`PollingTransport`]    | `POST`  | new suffixes of a growing body   |
//! | [`BufferedTransport`]   | `POST`  | the whole body, once             |

pub mod buffered;
pub mod byte_stream;
pub mod event_source;
pub mod polling;

use std::fmt::{Display, Formatter};
use std::future::Future;
use std::sync::Arc;

use bytes::Bytes;
use reqwest::{Client, RequestBuilder, Response, Url};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::debug;

use crate::config::TransportPreference;
use crate::models::job::JobRequest;
use crate::{AppError, Result};

pub use buffered::BufferedTransport;
pub use byte_stream::ByteStreamTransport;
pub use event_source::EventSourceTransport;
pub use polling::PollingTransport;

/// Path of the job endpoint, relative to the server URL.
pub const RUN_PATH: &str = "/v1/run";

/// One unit of input delivered by a transport, in arrival order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TransportEvent {
    /// Raw body bytes with no alignment to frame boundaries.
    Fragment(Bytes),
    /// One already-framed payload (native event-stream strategy only).
    Payload(String),
    /// The transport failed; no further events follow.
    Error(String),
    /// The body ended; no further events follow.
    Done,
}

/// Sending half of a job's event channel.
#[derive(Debug, Clone)]
pub struct TransportSink {
    tx: mpsc::UnboundedSender<TransportEvent>,
}

impl TransportSink {
    /// Create a sink and its receiver.
    #[must_use]
    pub fn channel() -> (Self, mpsc::UnboundedReceiver<TransportEvent>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self { tx }, rx)
    }

    /// Push one event. Returns `false` once the receiver is gone.
    pub fn send(&self, event: TransportEvent) -> bool {
        self.tx.send(event).is_ok()
    }

    /// Push raw body bytes. Returns `false` once the receiver is gone.
    pub fn fragment(&self, bytes: Bytes) -> bool {
        self.send(TransportEvent::Fragment(bytes))
    }

    /// Push a framed payload. Returns `false` once the receiver is gone.
    pub fn payload(&self, payload: String) -> bool {
        self.send(TransportEvent::Payload(payload))
    }
}

/// Ownership of one in-flight delivery.
///
/// Released exactly once: the first [`release`](Self::release) cancels the
/// delivery and aborts its task; later calls do nothing. Dropping an
/// unreleased handle releases it.
#[derive(Debug)]
pub struct TransportHandle {
    cancel: CancellationToken,
    task: Option<JoinHandle<()>>,
    released: bool,
}

impl TransportHandle {
    /// Wrap a delivery's cancellation token and, if any, its task.
    #[must_use]
    pub fn new(cancel: CancellationToken, task: Option<JoinHandle<()>>) -> Self {
        Self {
            cancel,
            task,
            released: false,
        }
    }

    /// Stop the delivery and free its connection.
    ///
    /// Returns `true` if this call released the handle, `false` if it had
    /// already been released.
    pub fn release(&mut self) -> bool {
        if self.released {
            return false;
        }
        self.released = true;
        self.cancel.cancel();
        if let Some(task) = self.task.take() {
            task.abort();
        }
        true
    }

    /// Whether the handle has been released.
    #[must_use]
    pub fn is_released(&self) -> bool {
        self.released
    }
}

impl Drop for TransportHandle {
    fn drop(&mut self) {
        self.release();
    }
}

/// A reception strategy.
pub trait Transport: Send + Sync {
    /// Which strategy this is.
    fn kind(&self) -> TransportKind;

    /// Start delivering `request`'s response into `sink`.
    ///
    /// Must be called from within a tokio runtime. Events end with exactly
    /// one `Done` or `Error`, unless the handle is released first, in which
    /// case nothing more is sent.
    fn deliver(&self, request: &JobRequest, sink: TransportSink) -> TransportHandle;
}

/// The available reception strategies, best first.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransportKind {
    /// Native event-stream client.
    EventSource,
    /// Progressive byte-stream reader.
    ByteStream,
    /// Progressive polling reader.
    Polling,
    /// Single blocking read at completion.
    Buffered,
}

impl TransportKind {
    /// Pick the best strategy the capabilities allow.
    ///
    /// Precedence: event-source, byte-stream, polling; buffered when none
    /// of them is available.
    #[must_use]
    pub fn select(capabilities: TransportCapabilities) -> Self {
        if capabilities.event_source {
            Self::EventSource
        } else if capabilities.byte_stream {
            Self::ByteStream
        } else if capabilities.progress_polling {
            Self::Polling
        } else {
            Self::Buffered
        }
    }

    /// Stable lowercase name.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::EventSource => "event-source",
            Self::ByteStream => "byte-stream",
            Self::Polling => "polling",
            Self::Buffered => "buffered",
        }
    }
}

impl Display for TransportKind {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Which incremental reception primitives the runtime offers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TransportCapabilities {
    /// A native event-stream client is available.
    pub event_source: bool,
    /// The response body can be read as a progressive byte stream.
    pub byte_stream: bool,
    /// The response body can be re-read as it grows.
    pub progress_polling: bool,
}

impl TransportCapabilities {
    /// Capabilities of this build: the HTTP client streams bodies and an
    /// event-stream parser is linked in, so every primitive is present.
    #[must_use]
    pub fn probe() -> Self {
        Self {
            event_source: true,
            byte_stream: true,
            progress_polling: true,
        }
    }

    /// No incremental primitive at all.
    #[must_use]
    pub fn none() -> Self {
        Self {
            event_source: false,
            byte_stream: false,
            progress_polling: false,
        }
    }

    /// Narrow to the single strategy named by `preference`.
    ///
    /// `Auto` keeps everything; an explicit preference keeps only its own
    /// capability (if present). `Buffered` keeps none.
    #[must_use]
    pub fn restricted_to(self, preference: TransportPreference) -> Self {
        let none = Self::none();
        match preference {
            TransportPreference::Auto => self,
            TransportPreference::EventSource => Self {
                event_source: self.event_source,
                ..none
            },
            TransportPreference::ByteStream => Self {
                byte_stream: self.byte_stream,
                ..none
            },
            TransportPreference::Polling => Self {
                progress_polling: self.progress_polling,
                ..none
            },
            TransportPreference::Buffered => none,
        }
    }
}

/// Build the transport for `kind` against `server_url`.
///
/// # Errors
///
/// Returns `AppError::Config` if `server_url` is not a valid base URL.
pub fn build_transport(kind: TransportKind, http: Client, server_url: &str) -> Result<Arc<dyn Transport>> {
    let endpoint = Endpoint::new(http, server_url)?;
    Ok(match kind {
        TransportKind::EventSource => Arc::new(EventSourceTransport::new(endpoint)),
        TransportKind::ByteStream => Arc::new(ByteStreamTransport::new(endpoint)),
        TransportKind::Polling => Arc::new(PollingTransport::new(endpoint)),
        TransportKind::Buffered => Arc::new(BufferedTransport::new(endpoint)),
    })
}

/// HTTP client plus the resolved job endpoint URL.
#[derive(Debug, Clone)]
pub struct Endpoint {
    http: Client,
    run_url: Url,
}

impl Endpoint {
    /// Resolve [`RUN_PATH`] against `server_url`.
    ///
    /// # Errors
    ///
    /// Returns `AppError::Config` if `server_url` is not a valid base URL.
    pub fn new(http: Client, server_url: &str) -> Result<Self> {
        let run_url = Url::parse(server_url)
            .and_then(|base| base.join(RUN_PATH))
            .map_err(|err| AppError::Config(format!("invalid server url {server_url}: {err}")))?;
        Ok(Self { http, run_url })
    }

    /// The resolved job endpoint.
    #[must_use]
    pub fn run_url(&self) -> &Url {
        &self.run_url
    }

    /// `POST` the request as a JSON body.
    fn post(&self, request: &JobRequest) -> RequestBuilder {
        self.http.post(self.run_url.clone()).json(request)
    }
}

/// Reject non-success responses.
fn check_status(response: Response) -> Result<Response> {
    let status = response.status();
    if status.is_success() {
        Ok(response)
    } else {
        Err(AppError::Transport(format!("server responded with status {status}")))
    }
}

/// Run `delivery` on its own task, closing the event sequence with `Done`
/// or `Error`, unless cancelled first.
fn spawn_delivery<F>(kind: TransportKind, sink: TransportSink, delivery: F) -> TransportHandle
where
    F: Future<Output = Result<()>> + Send + 'static,
{
    let cancel = CancellationToken::new();
    let token = cancel.clone();
    let task = tokio::spawn(async move {
        tokio::select! {
            biased;

            () = token.cancelled() => {
                debug!(transport = %kind, "delivery cancelled");
            }

            result = delivery => {
                let closing = match result {
                    Ok(()) => TransportEvent::Done,
                    Err(err) => TransportEvent::Error(err.to_string()),
                };
                if !sink.send(closing) {
                    debug!(transport = %kind, "event receiver closed before delivery ended");
                }
            }
        }
    });
    TransportHandle::new(cancel, Some(task))
}
