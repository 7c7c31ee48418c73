//! Collaborator that replays a fixed script.

use std::time::Duration;

use super::{AgentCollaborator, AgentFuture, StepSink};
use crate::models::step::{AgentOutcome, StepReport};
use crate::tools::Toolbox;
use crate::AppError;

/// Replays canned steps, then resolves with a canned outcome or failure.
///
/// Useful wherever a deterministic run is needed, such as exercising the
/// streaming path without calling any external service.
#[derive(Debug, Clone, Default)]
pub struct ScriptedAgent {
    steps: Vec<StepReport>,
    outcome: Option<AgentOutcome>,
    failure: Option<String>,
    step_delay: Duration,
}

impl ScriptedAgent {
    /// A script that reports `steps` and then succeeds with `outcome`.
    #[must_use]
    pub fn succeeding(steps: Vec<StepReport>, outcome: AgentOutcome) -> Self {
        Self {
            steps,
            outcome: Some(outcome),
            ..Self::default()
        }
    }

    /// A script that reports `steps` and then fails with `reason`.
    #[must_use]
    pub fn failing(steps: Vec<StepReport>, reason: impl Into<String>) -> Self {
        Self {
            steps,
            failure: Some(reason.into()),
            ..Self::default()
        }
    }

    /// Pause between steps, e.g. to give keep-alive or cancellation a window.
    #[must_use]
    pub fn with_step_delay(mut self, delay: Duration) -> Self {
        self.step_delay = delay;
        self
    }
}

impl AgentCollaborator for ScriptedAgent {
    fn run<'a>(&'a self, _prompt: &'a str, _toolbox: &'a Toolbox, steps: StepSink) -> AgentFuture<'a> {
        Box::pin(async move {
            for step in &self.steps {
                if !self.step_delay.is_zero() {
                    tokio::time::sleep(self.step_delay).await;
                }
                steps.report(step.clone());
            }
            if let Some(reason) = &self.failure {
                return Err(AppError::Agent(reason.clone()));
            }
            Ok(self.outcome.clone().unwrap_or_default())
        })
    }
}
