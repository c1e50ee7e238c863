use loopwise_core::CompletionError;
use loopwise_feedback::ExportError;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::content::{FALLBACK_DECISION, FALLBACK_RECOMMENDATIONS};

#[derive(Debug, Error)]
pub enum AgentError {
    #[error("Completion failed: {0}")]
    Completion(#[from] CompletionError),
    #[error("Metric '{key}' is not a finite number")]
    NonFiniteMetric { key: String },
    #[error("Unknown decision id: {0}")]
    UnknownDecision(String),
    #[error("Export failed: {0}")]
    Export(#[from] ExportError),
}

impl AgentError {
    /// Generic, success-shaped result for callers that never want to see an
    /// error from a decision request.
    #[must_use]
    pub fn fallback(&self) -> FallbackDecision {
        FallbackDecision {
            error: self.to_string(),
            decision: FALLBACK_DECISION.to_string(),
            recommendations: FALLBACK_RECOMMENDATIONS
                .iter()
                .map(ToString::to_string)
                .collect(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FallbackDecision {
    pub error: String,
    pub decision: String,
    pub recommendations: Vec<String>,
}

pub type Result<T> = std::result::Result<T, AgentError>;
