//! Feedback scoring and the learning-parameter update rule.

use loopwise_core::{AgentState, Metric, Outcome};
use std::collections::BTreeMap;

/// Cost savings are scaled by this before being added to the score
const COST_SAVINGS_SCALE: f64 = 1000.0;

/// Scores above this anneal the learning rate
const HIGH_SCORE: f64 = 0.8;
/// Scores below this amplify the learning rate
const LOW_SCORE: f64 = 0.3;
const LEARNING_RATE_ANNEAL: f64 = 0.95;
const LEARNING_RATE_AMPLIFY: f64 = 1.05;
const LEARNING_RATE_MIN: f64 = 0.01;
const LEARNING_RATE_MAX: f64 = 1.0;

const THRESHOLD_RAISE: f64 = 1.02;
const THRESHOLD_LOWER: f64 = 0.98;
/// Ceiling a success can push the confidence threshold to
const THRESHOLD_CEILING: f64 = 0.95;
/// Floor a non-success can push the confidence threshold to
const THRESHOLD_FLOOR: f64 = 0.5;

/// Base score per outcome plus `accuracy`, `efficiency` and
/// `min(1, cost_savings / 1000)`, clamped into `[0, 1]`.
///
/// Metric values are added as given; callers are expected to reject
/// non-finite input beforehand. A NaN sum still maps to 0.0.
#[must_use]
pub fn feedback_score(outcome: &Outcome, metrics: &BTreeMap<String, f64>) -> f64 {
    let mut score = outcome.base_score();

    if let Some(accuracy) = metrics.get(Metric::Accuracy.as_str()) {
        score += accuracy;
    }
    if let Some(efficiency) = metrics.get(Metric::Efficiency.as_str()) {
        score += efficiency;
    }
    if let Some(cost_savings) = metrics.get(Metric::CostSavings.as_str()) {
        score += (cost_savings / COST_SAVINGS_SCALE).min(1.0);
    }

    if score.is_nan() {
        0.0
    } else {
        score.clamp(0.0, 1.0)
    }
}

/// Apply one feedback event to the learning rate and confidence threshold.
pub fn update_parameters(state: &mut AgentState, feedback_score: f64, outcome: &Outcome) {
    if feedback_score > HIGH_SCORE {
        state.learning_rate *= LEARNING_RATE_ANNEAL;
    } else if feedback_score < LOW_SCORE {
        state.learning_rate *= LEARNING_RATE_AMPLIFY;
    }

    state.confidence_threshold = if outcome.is_success() {
        (state.confidence_threshold * THRESHOLD_RAISE).min(THRESHOLD_CEILING)
    } else {
        (state.confidence_threshold * THRESHOLD_LOWER).max(THRESHOLD_FLOOR)
    };

    state.learning_rate = state.learning_rate.clamp(LEARNING_RATE_MIN, LEARNING_RATE_MAX);
    state.confidence_threshold = state.confidence_threshold.clamp(0.0, 1.0);
}

/// Clamp a configured learning rate into the range the update rule keeps.
pub(crate) fn clamp_learning_rate(learning_rate: f64) -> f64 {
    learning_rate.clamp(LEARNING_RATE_MIN, LEARNING_RATE_MAX)
}
