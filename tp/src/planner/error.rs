//! Planner errors

use thiserror::Error;

use crate::llm::LlmError;

#[derive(Debug, Error)]
pub enum PlannerError {
    #[error("LLM error: {0}")]
    Llm(#[from] LlmError),

    #[error("Invalid draft: {0}")]
    Draft(String),

    #[error("Prompt error: {0}")]
    Prompt(String),

    #[error("Could not locate {city}, {country}")]
    NoAnchor { city: String, country: String },

    /// A newer generation superseded this one
    #[error("Generation superseded")]
    Stale,

    #[error("Generation cancelled")]
    Cancelled,
}

impl PlannerError {
    /// Errors that are dropped silently instead of being written to the job
    pub fn is_superseded(&self) -> bool {
        matches!(self, Self::Stale | Self::Cancelled)
    }
}
