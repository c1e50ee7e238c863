//! Schnittstelle zum externen Text-Completion-Dienst.
//!
//! Der Agent behandelt den Dienst als Blackbox: Betriebsdaten und
//! Entscheidungstyp hinein, Text heraus. Wiederholungen und Timeouts sind
//! Sache der jeweiligen Implementierung.

use crate::record::DataMap;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use thiserror::Error;

/// Konfidenz, wenn der Dienst keine eigene liefert.
pub const DEFAULT_CONFIDENCE: f64 = 0.8;

/// Eingabe für einen Completion-Aufruf.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct CompletionRequest {
    pub operational_data: DataMap,
    pub decision_type: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub context: Option<DataMap>,
}

/// Antwort eines Completion-Aufrufs.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct CompletionResponse {
    pub content: String,
    #[serde(default)]
    pub confidence: Option<f64>,
    #[serde(default)]
    pub model: String,
    #[serde(default)]
    pub tokens_used: u64,
}

impl CompletionResponse {
    /// Gelieferte Konfidenz auf `[0, 1]` begrenzt, sonst [`DEFAULT_CONFIDENCE`].
    #[must_use]
    pub fn confidence_or_default(&self) -> f64 {
        match self.confidence {
            Some(c) if c.is_finite() => c.clamp(0.0, 1.0),
            _ => DEFAULT_CONFIDENCE,
        }
    }
}

#[derive(Debug, Error)]
pub enum CompletionError {
    #[error("Transport error: {0}")]
    Transport(String),
    #[error("Completion timed out after {0:?}")]
    Timeout(Duration),
    #[error("Provider returned HTTP {status}: {body}")]
    Status { status: u16, body: String },
    #[error("Invalid completion response: {0}")]
    InvalidResponse(String),
    #[error("Nothing to ask: decision type is empty")]
    EmptyPrompt,
}

impl CompletionError {
    /// Netzwerkfehler, Timeouts, 429 und 5xx dürfen wiederholt werden.
    #[must_use]
    pub fn is_retryable(&self) -> bool {
        match self {
            CompletionError::Transport(_) | CompletionError::Timeout(_) => true,
            CompletionError::Status { status, .. } => *status == 429 || *status >= 500,
            CompletionError::InvalidResponse(_) | CompletionError::EmptyPrompt => false,
        }
    }
}

pub trait Completion {
    fn complete(
        &mut self,
        request: &CompletionRequest,
    ) -> Result<CompletionResponse, CompletionError>;
}

impl<F> Completion for F
where
    F: FnMut(&CompletionRequest) -> Result<CompletionResponse, CompletionError>,
{
    fn complete(
        &mut self,
        request: &CompletionRequest,
    ) -> Result<CompletionResponse, CompletionError> {
        self(request)
    }
}
