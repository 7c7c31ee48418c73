//! Server-side progress emitter.
//!
//! Drives one collaborator run per job and turns each reported step, then
//! the terminal outcome, into an ordered sequence of [`OutboundFrame`]s.
//! Exactly one terminal frame is produced per job, whether the collaborator
//! succeeds or fails.

pub mod projection;

use std::sync::Arc;

use tokio::sync::mpsc;
use tracing::{debug, error, info, info_span, Instrument};

use crate::agent::{AgentCollaborator, StepSink};
use crate::frame::OutboundFrame;
use crate::models::job::JobRequest;
use crate::models::progress::ProgressUpdate;
use crate::models::step::StepReport;
use crate::tools::Toolbox;

pub use projection::{failure_update, final_update, project_step};

/// Ordered, fire-and-forget writer for one job's frames.
///
/// A closed receiver (client went away) is not an error: the run keeps
/// going, and its frames are dropped.
#[derive(Debug, Clone)]
pub struct FrameWriter {
    tx: mpsc::UnboundedSender<OutboundFrame>,
}

impl FrameWriter {
    /// Create a writer and the receiver the response body drains.
    #[must_use]
    pub fn channel() -> (Self, mpsc::UnboundedReceiver<OutboundFrame>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self { tx }, rx)
    }

    /// Queue one update for the response.
    pub fn write(&self, update: ProgressUpdate) {
        debug!(job_id = %update.job_id, messages = ?update.messages, "streaming update");
        if self.tx.send(OutboundFrame::Update(update)).is_err() {
            debug!("response closed, dropping frame");
        }
    }
}

/// Run `request` through `agent`, writing every frame to `writer`.
///
/// Steps are forwarded in the order the collaborator reports them, all of
/// them before the terminal frame. The writer is dropped on return, which
/// closes the response.
pub async fn run_job(
    agent: Arc<dyn AgentCollaborator>,
    toolbox: Arc<Toolbox>,
    request: JobRequest,
    writer: FrameWriter,
) {
    let span = info_span!("run_job", job_id = %request.id);
    drive(agent.as_ref(), &toolbox, &request, &writer)
        .instrument(span)
        .await;
}

async fn drive(
    agent: &dyn AgentCollaborator,
    toolbox: &Toolbox,
    request: &JobRequest,
    writer: &FrameWriter,
) {
    let job_id = request.id.as_str();
    let (sink, mut steps) = StepSink::channel();
    let run = agent.run(&request.prompt, toolbox, sink);
    tokio::pin!(run);

    let result = loop {
        tokio::select! {
            biased;

            Some(step) = steps.recv() => forward_step(job_id, &step, writer),

            result = &mut run => break result,
        }
    };

    // Steps reported just before the run resolved.
    while let Ok(step) = steps.try_recv() {
        forward_step(job_id, &step, writer);
    }

    match result {
        Ok(outcome) => {
            info!("agent generation complete");
            writer.write(final_update(job_id, &outcome));
        }
        Err(err) => {
            error!(%err, "error executing job");
            writer.write(failure_update(job_id));
        }
    }
}

fn forward_step(job_id: &str, step: &StepReport, writer: &FrameWriter) {
    info!(finish_reason = ?step.finish_reason, "finished step");
    if step.reasoning.is_some() {
        debug!("step contained reasoning text");
    }
    for call in &step.tool_calls {
        info!(tool = %call.tool_name, "called tool");
    }
    for result in &step.tool_results {
        info!(tool = %result.tool_name, "tool returned a response");
    }
    writer.write(project_step(job_id, step));
}
