#![warn(clippy::unwrap_used, clippy::expect_used)]

//! Decision agent: turns an operational snapshot into a recorded decision via
//! a text-completion collaborator, and folds observed feedback back into its
//! learning parameters.
//!
//! Errors are returned, not swallowed: [`DecisionAgent::make_decision`] and
//! [`DecisionAgent::receive_feedback`] report every failure to the observer
//! and hand it to the caller. [`AgentError::fallback`] reproduces the generic
//! decision text for callers that must always show something.

pub mod canned;
pub mod config;
pub mod content;
pub mod error;
pub mod learning;
pub mod prompt;

pub use canned::CannedCompletion;
pub use config::AgentConfig;
pub use error::{AgentError, FallbackDecision, Result};

use loopwise_core::{
    AgentState, Completion, CompletionRequest, DataMap, Decision, Feedback, LoopEvent, Observer,
    Outcome, TracingObserver,
};
use loopwise_feedback::{write_json, FeedbackLoop};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::ffi::OsString;
use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use time::OffsetDateTime;

/// What [`DecisionAgent::make_decision`] hands back on success.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DecisionReport {
    pub decision_id: String,
    pub decision: String,
    pub reasoning: String,
    pub confidence: f64,
    pub recommendations: Vec<String>,
    pub next_actions: Vec<String>,
    pub model: String,
    pub tokens_used: u64,
}

/// One entry of the agent's own decision log.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DecisionHistoryEntry {
    pub decision_id: String,
    #[serde(with = "time::serde::rfc3339")]
    pub timestamp: OffsetDateTime,
    pub decision_type: String,
    pub operational_data: DataMap,
    pub decision: String,
    pub reasoning: String,
    pub confidence: f64,
    pub model: String,
    pub tokens_used: u64,
}

/// Loop insights enriched with the agent's own counters and parameters.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PerformanceInsights {
    pub agent_type: String,
    pub total_decisions: usize,
    pub total_feedback: usize,
    /// Successful decisions over `max(1, total_decisions)`, in percent.
    pub success_rate: f64,
    /// Successful feedback over all feedback, in percent.
    pub feedback_success_rate: f64,
    pub performance_trends: BTreeMap<String, f64>,
    pub recommendations: Vec<String>,
    pub learning_rate: f64,
    pub confidence_threshold: f64,
    pub recent_decisions: usize,
}

#[derive(Serialize)]
struct AgentInfo<'a> {
    agent_type: &'a str,
    state: &'a AgentState,
}

#[derive(Serialize)]
struct AgentExport<'a> {
    agent_info: AgentInfo<'a>,
    decision_history: &'a [DecisionHistoryEntry],
    feedback_export: String,
}

pub struct DecisionAgent<C> {
    config: AgentConfig,
    completion: C,
    feedback_loop: FeedbackLoop,
    state: AgentState,
    history: Vec<DecisionHistoryEntry>,
    observer: Arc<dyn Observer>,
}

impl<C> fmt::Debug for DecisionAgent<C> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DecisionAgent")
            .field("config", &self.config)
            .field("state", &self.state)
            .field("feedback_loop", &self.feedback_loop)
            .finish_non_exhaustive()
    }
}

impl<C: Completion> DecisionAgent<C> {
    /// Create an agent that reports to `tracing`.
    pub fn new(config: AgentConfig, completion: C) -> Self {
        Self::with_observer(config, completion, Arc::new(TracingObserver))
    }

    /// The observer is shared with the agent's feedback loop.
    pub fn with_observer(config: AgentConfig, completion: C, observer: Arc<dyn Observer>) -> Self {
        let config = config.normalized();
        let feedback_loop =
            FeedbackLoop::with_observer(Arc::clone(&observer)).with_window(config.improvement_window);
        let state = AgentState::new(config.learning_rate, config.confidence_threshold);
        Self {
            config,
            completion,
            feedback_loop,
            state,
            history: Vec::new(),
            observer,
        }
    }

    /// Ask the completion collaborator for a decision and record it.
    ///
    /// On a completion failure nothing is recorded and the state is left
    /// untouched.
    pub fn make_decision(
        &mut self,
        operational_data: DataMap,
        decision_type: &str,
        context: Option<DataMap>,
    ) -> Result<DecisionReport> {
        let request = CompletionRequest {
            operational_data,
            decision_type: decision_type.to_string(),
            context,
        };

        let response = match self.completion.complete(&request) {
            Ok(response) => response,
            Err(err) => {
                self.observer.observe(&LoopEvent::DecisionFailed {
                    decision_type,
                    error: &err,
                });
                return Err(AgentError::Completion(err));
            }
        };

        let reasoning = content::extract_reasoning(&response.content);
        let recommendations = content::extract_recommendations(&response.content);
        let next_actions = content::next_actions(decision_type);
        let confidence = response.confidence_or_default();

        let decision = Decision::new(
            decision_type,
            request.operational_data,
            response.content,
            reasoning,
            confidence,
        );
        let timestamp = decision.timestamp;
        let entry_data = decision.input_data.clone();
        let decision_text = decision.decision.clone();
        let reasoning = decision.reasoning.clone();
        let confidence = decision.confidence;

        let decision_id = self.feedback_loop.record_decision(decision);
        self.state.total_decisions += 1;
        self.state.last_decision_time = Some(timestamp);

        self.history.push(DecisionHistoryEntry {
            decision_id: decision_id.clone(),
            timestamp,
            decision_type: decision_type.to_string(),
            operational_data: entry_data,
            decision: decision_text.clone(),
            reasoning: reasoning.clone(),
            confidence,
            model: response.model.clone(),
            tokens_used: response.tokens_used,
        });

        Ok(DecisionReport {
            decision_id,
            decision: decision_text,
            reasoning,
            confidence,
            recommendations,
            next_actions,
            model: response.model,
            tokens_used: response.tokens_used,
        })
    }

    /// Record feedback for `decision_id` and adjust the learning parameters.
    ///
    /// Returns the computed feedback score. Rejected feedback leaves the loop
    /// and the state unchanged.
    pub fn receive_feedback(
        &mut self,
        decision_id: &str,
        outcome: impl Into<Outcome>,
        metrics: BTreeMap<String, f64>,
        actual_result: Option<DataMap>,
    ) -> Result<f64> {
        let outcome = outcome.into();

        if let Some(key) = metrics
            .iter()
            .find(|(_, value)| !value.is_finite())
            .map(|(key, _)| key.clone())
        {
            return Err(self.reject(decision_id, AgentError::NonFiniteMetric { key }));
        }
        if self.config.strict_decision_ids && !self.feedback_loop.contains_decision(decision_id) {
            return Err(self.reject(
                decision_id,
                AgentError::UnknownDecision(decision_id.to_string()),
            ));
        }

        let feedback_score = learning::feedback_score(&outcome, &metrics);
        let is_success = outcome.is_success();
        let feedback = Feedback {
            decision_id: decision_id.to_string(),
            timestamp: OffsetDateTime::now_utc(),
            outcome: outcome.clone(),
            metrics,
            actual_result: actual_result.unwrap_or_default(),
            feedback_score,
        };
        self.feedback_loop.record_feedback(decision_id, feedback);

        if is_success {
            if self.state.successful_decisions < self.state.total_decisions {
                self.state.successful_decisions += 1;
            } else {
                self.observer.observe(&LoopEvent::SuccessCountCapped {
                    decision_id,
                    total_decisions: self.state.total_decisions,
                });
            }
        }

        learning::update_parameters(&mut self.state, feedback_score, &outcome);
        self.observer.observe(&LoopEvent::ParametersUpdated {
            learning_rate: self.state.learning_rate,
            confidence_threshold: self.state.confidence_threshold,
        });

        Ok(feedback_score)
    }

    fn reject(&self, decision_id: &str, err: AgentError) -> AgentError {
        self.observer.observe(&LoopEvent::FeedbackRejected {
            decision_id,
            error: &err,
        });
        err
    }
}

impl<C> DecisionAgent<C> {
    #[must_use]
    pub fn performance_insights(&self) -> PerformanceInsights {
        let insights = self.feedback_loop.get_learning_insights();
        PerformanceInsights {
            agent_type: self.config.agent_type.clone(),
            total_decisions: insights.total_decisions,
            total_feedback: insights.total_feedback,
            success_rate: self.state.success_rate(),
            feedback_success_rate: insights.success_rate,
            performance_trends: insights.performance_trends,
            recommendations: insights.recommendations,
            learning_rate: self.state.learning_rate,
            confidence_threshold: self.state.confidence_threshold,
            recent_decisions: self.history.len().min(self.config.history_limit),
        }
    }

    /// Write agent info and decision history to `path`, and the feedback
    /// loop export to `<path>_feedback.json`.
    pub fn export_agent_data(&self, path: impl AsRef<Path>) -> Result<PathBuf> {
        let path = path.as_ref();
        let feedback_path = feedback_export_path(path);
        self.feedback_loop.export_data(&feedback_path)?;

        write_json(
            path,
            &AgentExport {
                agent_info: AgentInfo {
                    agent_type: &self.config.agent_type,
                    state: &self.state,
                },
                decision_history: &self.history,
                feedback_export: feedback_path.display().to_string(),
            },
        )?;
        Ok(feedback_path)
    }

    #[must_use]
    pub fn state(&self) -> &AgentState {
        &self.state
    }

    #[must_use]
    pub fn config(&self) -> &AgentConfig {
        &self.config
    }

    #[must_use]
    pub fn feedback_loop(&self) -> &FeedbackLoop {
        &self.feedback_loop
    }

    #[must_use]
    pub fn decision_history(&self) -> &[DecisionHistoryEntry] {
        &self.history
    }

    #[must_use]
    pub fn completion(&self) -> &C {
        &self.completion
    }
}

fn feedback_export_path(path: &Path) -> PathBuf {
    let mut os: OsString = path.as_os_str().to_owned();
    os.push("_feedback.json");
    PathBuf::from(os)
}
