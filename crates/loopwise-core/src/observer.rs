//! Injizierbarer Beobachter statt globalem Logger.
//!
//! Loop und Agent melden jedes relevante Ereignis an einen [`Observer`], der
//! beim Erzeugen übergeben wird. [`TracingObserver`] leitet die Ereignisse an
//! `tracing` weiter, [`NoopObserver`] verwirft sie.

use crate::record::Outcome;
use std::error::Error;
use std::path::Path;

#[derive(Debug)]
pub enum LoopEvent<'a> {
    DecisionRecorded {
        decision_id: &'a str,
        decision_type: &'a str,
        confidence: f64,
    },
    DecisionFailed {
        decision_type: &'a str,
        error: &'a (dyn Error + 'static),
    },
    FeedbackRecorded {
        decision_id: &'a str,
        outcome: &'a Outcome,
        feedback_score: f64,
    },
    FeedbackRejected {
        decision_id: &'a str,
        error: &'a (dyn Error + 'static),
    },
    /// Erfolg gemeldet, obwohl bereits jede Entscheidung als erfolgreich zählt.
    SuccessCountCapped {
        decision_id: &'a str,
        total_decisions: u64,
    },
    ParametersUpdated {
        learning_rate: f64,
        confidence_threshold: f64,
    },
    Exported {
        path: &'a Path,
        decisions: usize,
        feedback: usize,
    },
}

pub trait Observer: Send + Sync {
    fn observe(&self, event: &LoopEvent<'_>);
}

/// Leitet Ereignisse als strukturierte `tracing`-Events weiter.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingObserver;

impl Observer for TracingObserver {
    fn observe(&self, event: &LoopEvent<'_>) {
        match event {
            LoopEvent::DecisionRecorded {
                decision_id,
                decision_type,
                confidence,
            } => tracing::info!(decision_id, decision_type, confidence, "recorded decision"),
            LoopEvent::DecisionFailed {
                decision_type,
                error,
            } => tracing::error!(decision_type, error = %error, "error making decision"),
            LoopEvent::FeedbackRecorded {
                decision_id,
                outcome,
                feedback_score,
            } => tracing::info!(
                decision_id,
                outcome = %outcome,
                feedback_score,
                "recorded feedback"
            ),
            LoopEvent::FeedbackRejected { decision_id, error } => {
                tracing::warn!(decision_id, error = %error, "feedback rejected");
            }
            LoopEvent::SuccessCountCapped {
                decision_id,
                total_decisions,
            } => tracing::warn!(
                decision_id,
                total_decisions,
                "success not counted: every decision is already marked successful"
            ),
            LoopEvent::ParametersUpdated {
                learning_rate,
                confidence_threshold,
            } => tracing::debug!(learning_rate, confidence_threshold, "learning parameters updated"),
            LoopEvent::Exported {
                path,
                decisions,
                feedback,
            } => tracing::info!(
                path = %path.display(),
                decisions,
                feedback,
                "exported feedback loop data"
            ),
        }
    }
}

#[derive(Debug, Default, Clone, Copy)]
pub struct NoopObserver;

impl Observer for NoopObserver {
    fn observe(&self, _event: &LoopEvent<'_>) {}
}
