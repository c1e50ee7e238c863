use loopwise_feedback::DEFAULT_IMPROVEMENT_WINDOW;
use serde::{Deserialize, Serialize};

use crate::learning::clamp_learning_rate;

const DEFAULT_LEARNING_RATE: f64 = 0.1;
const DEFAULT_CONFIDENCE_THRESHOLD: f64 = 0.7;
const DEFAULT_HISTORY_LIMIT: usize = 10;

/// Agent settings; every field falls back to its default when missing.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AgentConfig {
    pub agent_type: String,
    pub learning_rate: f64,
    pub confidence_threshold: f64,
    /// Trailing window for performance trends and recommendations.
    pub improvement_window: usize,
    /// Reject feedback for decision ids this agent never issued.
    pub strict_decision_ids: bool,
    /// How many history entries count as "recent" in performance insights.
    pub history_limit: usize,
}

impl Default for AgentConfig {
    fn default() -> Self {
        Self {
            agent_type: "general".to_string(),
            learning_rate: DEFAULT_LEARNING_RATE,
            confidence_threshold: DEFAULT_CONFIDENCE_THRESHOLD,
            improvement_window: DEFAULT_IMPROVEMENT_WINDOW,
            strict_decision_ids: false,
            history_limit: DEFAULT_HISTORY_LIMIT,
        }
    }
}

impl AgentConfig {
    #[must_use]
    pub fn new(agent_type: impl Into<String>) -> Self {
        Self {
            agent_type: agent_type.into(),
            ..Self::default()
        }
    }

    #[must_use]
    pub fn with_learning_rate(mut self, learning_rate: f64) -> Self {
        self.learning_rate = learning_rate;
        self
    }

    #[must_use]
    pub fn strict(mut self, strict_decision_ids: bool) -> Self {
        self.strict_decision_ids = strict_decision_ids;
        self
    }

    /// Clamp parameters into the ranges the agent maintains. Non-finite
    /// values fall back to the defaults.
    #[must_use]
    pub fn normalized(mut self) -> Self {
        self.learning_rate = if self.learning_rate.is_finite() {
            clamp_learning_rate(self.learning_rate)
        } else {
            DEFAULT_LEARNING_RATE
        };
        self.confidence_threshold = if self.confidence_threshold.is_finite() {
            self.confidence_threshold.clamp(0.0, 1.0)
        } else {
            DEFAULT_CONFIDENCE_THRESHOLD
        };
        self.improvement_window = self.improvement_window.max(2);
        if self.agent_type.trim().is_empty() {
            self.agent_type = "general".to_string();
        }
        self
    }
}
