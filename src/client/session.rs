//! Client-side controller for one job run.
//!
//! A [`JobSession`] owns everything a run needs: the transport handle, the
//! event receiver, the frame reassembler and the accumulated updates. Only
//! the session mutates them, always from the task that owns it, so no
//! locking is involved.
//!
//! ```text
//!            start()
//!   Idle ────────────► Running ──► Completed   (terminal update)
//!    ▲                    │    ──► Failed      (transport error / early end)
//!    │                    └──────► Cancelled   (cancel() or drop)
//!    └──── start() from any terminal state
//! ```

use std::collections::VecDeque;
use std::fmt::{Display, Formatter};
use std::sync::Arc;

use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use super::reassembler::FrameReassembler;
use super::transport::{Transport, TransportEvent, TransportHandle, TransportKind, TransportSink};
use crate::models::job::JobRequest;
use crate::models::progress::{ProgressUpdate, TokenTotals};
use crate::{AppError, Result};

/// Lifecycle state of a [`JobSession`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum SessionState {
    /// No job has been started.
    #[default]
    Idle,
    /// A job is streaming.
    Running,
    /// The terminal update arrived.
    Completed,
    /// The transport failed or ended early.
    Failed,
    /// The client stopped listening.
    Cancelled,
}

impl SessionState {
    /// Whether the state ends a run.
    #[must_use]
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Completed | Self::Failed | Self::Cancelled)
    }

    /// Stable lowercase name.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Idle => "idle",
            Self::Running => "running",
            Self::Completed => "completed",
            Self::Failed => "failed",
            Self::Cancelled => "cancelled",
        }
    }
}

impl Display for SessionState {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Controller for sequential job runs over one transport strategy.
pub struct JobSession {
    transport: Arc<dyn Transport>,
    server_url: String,
    state: SessionState,
    job_id: Option<String>,
    updates: Vec<ProgressUpdate>,
    pending: VecDeque<ProgressUpdate>,
    tokens: TokenTotals,
    error: Option<String>,
    reassembler: FrameReassembler,
    events: Option<mpsc::UnboundedReceiver<TransportEvent>>,
    handle: Option<TransportHandle>,
    canceller: CancellationToken,
}

impl JobSession {
    /// Create an idle session that will deliver jobs through `transport`.
    ///
    /// `server_url` only appears in the user-facing failure message.
    #[must_use]
    pub fn new(transport: Arc<dyn Transport>, server_url: impl Into<String>) -> Self {
        Self {
            transport,
            server_url: server_url.into(),
            state: SessionState::Idle,
            job_id: None,
            updates: Vec::new(),
            pending: VecDeque::new(),
            tokens: TokenTotals::default(),
            error: None,
            reassembler: FrameReassembler::new(),
            events: None,
            handle: None,
            canceller: CancellationToken::new(),
        }
    }

    /// Start a new job for `prompt` and return its identifier.
    ///
    /// Clears the updates, error and token totals of any previous run. Must
    /// be called from within a tokio runtime.
    ///
    /// # Errors
    ///
    /// Returns `AppError::InvalidRequest`, without touching the session or
    /// the network, if `prompt` is blank or a job is already running.
    pub fn start(&mut self, prompt: &str) -> Result<String> {
        if self.state == SessionState::Running {
            return Err(AppError::InvalidRequest("a job is already running".into()));
        }
        let request = JobRequest::with_generated_id(prompt)?;

        self.updates.clear();
        self.pending.clear();
        self.tokens = TokenTotals::default();
        self.error = None;
        self.reassembler = FrameReassembler::new();
        self.canceller = CancellationToken::new();

        let (sink, events) = TransportSink::channel();
        self.handle = Some(self.transport.deliver(&request, sink));
        self.events = Some(events);
        self.job_id = Some(request.id.clone());
        self.state = SessionState::Running;

        info!(job_id = %request.id, transport = %self.transport.kind(), "job started");
        Ok(request.id)
    }

    /// Wait for the next progress update.
    ///
    /// Returns `None` once the run has reached a terminal state and every
    /// update has been handed out, or immediately when idle. A
    /// [`canceller`](Self::canceller) firing while waiting cancels the run.
    pub async fn recv(&mut self) -> Option<ProgressUpdate> {
        loop {
            if let Some(update) = self.pending.pop_front() {
                return Some(update);
            }
            if self.state != SessionState::Running {
                return None;
            }
            let events = self.events.as_mut()?;

            let event = tokio::select! {
                biased;

                () = self.canceller.cancelled() => None,
                event = events.recv() => Some(event),
            };

            match event {
                None => {
                    self.cancel();
                }
                Some(Some(event)) => self.apply(event),
                Some(None) => self.fail("transport closed without completing"),
            }
        }
    }

    /// Stop listening to the running job.
    ///
    /// Releases the transport and moves to `Cancelled` without recording an
    /// error. The server may keep working on the job. Returns `false` when
    /// no job was running.
    pub fn cancel(&mut self) -> bool {
        if self.state != SessionState::Running {
            return false;
        }
        self.release_transport();
        self.pending.clear();
        self.state = SessionState::Cancelled;
        self.canceller.cancel();
        info!(job_id = self.job_id.as_deref().unwrap_or_default(), "job cancelled");
        true
    }

    /// Token that cancels the current run from another task.
    ///
    /// Each [`start`](Self::start) creates a fresh token, so obtain it after
    /// starting. Cancellation takes effect inside [`recv`](Self::recv).
    #[must_use]
    pub fn canceller(&self) -> CancellationToken {
        self.canceller.clone()
    }

    /// Current lifecycle state.
    #[must_use]
    pub fn state(&self) -> SessionState {
        self.state
    }

    /// Identifier of the current or last job.
    #[must_use]
    pub fn job_id(&self) -> Option<&str> {
        self.job_id.as_deref()
    }

    /// Every update received for the current or last job, in arrival order.
    #[must_use]
    pub fn updates(&self) -> &[ProgressUpdate] {
        &self.updates
    }

    /// User-facing error of a failed run.
    #[must_use]
    pub fn error(&self) -> Option<&str> {
        self.error.as_deref()
    }

    /// Dismiss the recorded error.
    pub fn clear_error(&mut self) {
        self.error = None;
    }

    /// Token totals summed over every received update.
    #[must_use]
    pub fn total_tokens(&self) -> TokenTotals {
        self.tokens
    }

    /// The strategy this session delivers through.
    #[must_use]
    pub fn transport_kind(&self) -> TransportKind {
        self.transport.kind()
    }

    fn apply(&mut self, event: TransportEvent) {
        match event {
            TransportEvent::Fragment(bytes) => {
                for update in self.reassembler.push(&bytes) {
                    self.accept(update);
                }
            }
            TransportEvent::Payload(payload) => {
                if let Some(update) = self.reassembler.accept_payload(&payload) {
                    self.accept(update);
                }
            }
            TransportEvent::Done => {
                for update in self.reassembler.finish() {
                    self.accept(update);
                }
                if self.state == SessionState::Running {
                    self.fail("stream ended before the final update");
                }
            }
            TransportEvent::Error(detail) => self.fail(&detail),
        }
    }

    fn accept(&mut self, update: ProgressUpdate) {
        if self.state != SessionState::Running {
            debug!("ignoring update outside a running job");
            return;
        }
        self.tokens.record(&update);
        let terminal = update.is_terminal();
        self.updates.push(update.clone());
        self.pending.push_back(update);

        if terminal {
            self.release_transport();
            self.state = SessionState::Completed;
            info!(
                job_id = self.job_id.as_deref().unwrap_or_default(),
                updates = self.updates.len(),
                input_tokens = self.tokens.input,
                output_tokens = self.tokens.output,
                "job completed"
            );
        }
    }

    fn fail(&mut self, detail: &str) {
        if self.state != SessionState::Running {
            return;
        }
        warn!(job_id = self.job_id.as_deref().unwrap_or_default(), detail, "job failed");
        self.release_transport();
        self.state = SessionState::Failed;
        self.error = Some(super::failure_message(&self.server_url));
    }

    fn release_transport(&mut self) {
        if let Some(mut handle) = self.handle.take() {
            handle.release();
        }
        self.events = None;
    }
}

impl Drop for JobSession {
    fn drop(&mut self) {
        self.cancel();
    }
}
