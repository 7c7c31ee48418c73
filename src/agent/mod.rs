//! Agent collaborator abstraction.
//!
//! The [`AgentCollaborator`] trait is the seam between the emitter and
//! whatever executes the reasoning/tool loop. A collaborator receives the
//! prompt and a [`Toolbox`], reports each finished step through a
//! [`StepSink`], and resolves with an [`AgentOutcome`] or an error.
//!
//! A collaborator backed by a language model advertises the toolbox to the
//! model through [`Toolbox::definitions`] (name, description and input
//! schema of each tool) and dispatches the model's calls with
//! [`Toolbox::execute`]. Fixed pipelines such as [`SearchAgent`] only
//! execute.

pub mod scripted;
pub mod search;

use std::future::Future;
use std::pin::Pin;

use tokio::sync::mpsc;
use tracing::debug;

use crate::models::step::{AgentOutcome, StepReport};
use crate::tools::Toolbox;
use crate::Result;

pub use scripted::ScriptedAgent;
pub use search::SearchAgent;

/// Future returned by [`AgentCollaborator::run`].
pub type AgentFuture<'a> = Pin<Box<dyn Future<Output = Result<AgentOutcome>> + Send + 'a>>;

/// External agent execution framework, as seen by the emitter.
pub trait AgentCollaborator: Send + Sync {
    /// Run the agent on `prompt` until it declares completion.
    ///
    /// Must report every step through `steps` before resolving, in order.
    ///
    /// # Errors
    ///
    /// Returns [`AppError::Agent`](crate::AppError::Agent) when the run
    /// fails before producing a terminal result.
    fn run<'a>(&'a self, prompt: &'a str, toolbox: &'a Toolbox, steps: StepSink) -> AgentFuture<'a>;
}

/// Inbound side of the per-step callback boundary.
///
/// Reports are forwarded over a channel and projected by the emitter as they
/// arrive; the collaborator never waits on the consumer.
#[derive(Debug, Clone)]
pub struct StepSink {
    tx: mpsc::UnboundedSender<StepReport>,
}

impl StepSink {
    /// Create a sink and the receiver the emitter drains.
    #[must_use]
    pub fn channel() -> (Self, mpsc::UnboundedReceiver<StepReport>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self { tx }, rx)
    }

    /// Report one finished step.
    pub fn report(&self, step: StepReport) {
        if self.tx.send(step).is_err() {
            debug!("step receiver closed, dropping step report");
        }
    }
}
