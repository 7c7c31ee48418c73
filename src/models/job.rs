//! Job request model.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{AppError, Result};

/// A request to run one job, accepted as a JSON body or query parameters.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct JobRequest {
    /// Opaque client-generated job identifier.
    pub id: String,
    /// Natural-language task for the agent.
    pub prompt: String,
}

impl JobRequest {
    /// Build a request with a freshly generated identifier.
    ///
    /// The prompt is trimmed of surrounding whitespace.
    ///
    /// # Errors
    ///
    /// Returns `AppError::InvalidRequest` if the prompt is empty or
    /// whitespace-only.
    pub fn with_generated_id(prompt: &str) -> Result<Self> {
        let request = Self {
            id: Uuid::new_v4().simple().to_string(),
            prompt: prompt.trim().to_owned(),
        };
        request.validate()?;
        Ok(request)
    }

    /// Check that both fields carry content.
    ///
    /// # Errors
    ///
    /// Returns `AppError::InvalidRequest` naming the offending field.
    pub fn validate(&self) -> Result<()> {
        if self.id.trim().is_empty() {
            return Err(AppError::InvalidRequest("id must not be empty".into()));
        }
        if self.prompt.trim().is_empty() {
            return Err(AppError::InvalidRequest("prompt must not be empty".into()));
        }
        Ok(())
    }
}
