#![warn(clippy::unwrap_used, clippy::expect_used)]

//! Decision/feedback ledger with derived learning signals.
//!
//! The [`FeedbackLoop`] keeps two append-only lists (decisions and feedback)
//! plus three metric series, and derives improvement percentages, a success
//! rate and rule-based recommendations from them. Its only side effect is
//! [`FeedbackLoop::export_data`], a one-way JSON dump; nothing reads it back
//! into a live loop.

use loopwise_core::{Decision, Feedback, LoopEvent, Metric, Observer, TracingObserver};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};
use std::fmt;
use std::fs::File;
use std::io::{BufReader, BufWriter, Write};
use std::path::Path;
use std::sync::Arc;
use thiserror::Error;
use time::{macros::format_description, OffsetDateTime};

/// Trailing window used for performance trends unless configured otherwise.
pub const DEFAULT_IMPROVEMENT_WINDOW: usize = 10;

// Recommendation thresholds
/// Success rate (percent) below which input quality should be reviewed
const RECOMMEND_SUCCESS_RATE_BELOW: f64 = 70.0;
/// Accuracy improvement (percent) below which algorithms should be refined
const RECOMMEND_ACCURACY_IMPROVEMENT_BELOW: f64 = 5.0;
/// Efficiency improvement (percent) below which parameters should be tuned
const RECOMMEND_EFFICIENCY_IMPROVEMENT_BELOW: f64 = 10.0;

pub const RECOMMENDATION_INPUT_QUALITY: &str =
    "Consider improving decision criteria and input data quality";
pub const RECOMMENDATION_ALGORITHMS: &str = "Review and refine the decision-making algorithms";
pub const RECOMMENDATION_OPERATIONS: &str = "Optimize operational parameters and response times";

/// Fallback id suffix when timestamp formatting fails
const FALLBACK_ID_SUFFIX: &str = "19700101_000000";

#[derive(Debug, Error)]
pub enum ExportError {
    #[error("Export I/O failed: {0}")]
    Io(#[from] std::io::Error),
    #[error("Export serialization failed: {0}")]
    Json(#[from] serde_json::Error),
}

/// The three named metric series, in insertion order.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PerformanceMetrics {
    #[serde(default)]
    pub accuracy: Vec<f64>,
    #[serde(default)]
    pub efficiency: Vec<f64>,
    #[serde(default)]
    pub cost_savings: Vec<f64>,
}

impl PerformanceMetrics {
    #[must_use]
    pub fn series(&self, metric: Metric) -> &[f64] {
        match metric {
            Metric::Accuracy => &self.accuracy,
            Metric::Efficiency => &self.efficiency,
            Metric::CostSavings => &self.cost_savings,
        }
    }

    fn series_mut(&mut self, metric: Metric) -> &mut Vec<f64> {
        match metric {
            Metric::Accuracy => &mut self.accuracy,
            Metric::Efficiency => &mut self.efficiency,
            Metric::CostSavings => &mut self.cost_savings,
        }
    }

    /// Appends every known metric present in `metrics`; absent keys leave
    /// their series untouched and unknown keys are ignored.
    fn fold(&mut self, metrics: &BTreeMap<String, f64>) {
        for metric in Metric::ALL {
            if let Some(value) = metrics.get(metric.as_str()) {
                self.series_mut(metric).push(*value);
            }
        }
    }
}

/// Summary produced by [`FeedbackLoop::get_learning_insights`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LearningInsights {
    pub total_decisions: usize,
    pub total_feedback: usize,
    /// Percentage of feedback with outcome "success" (0.0 without feedback).
    pub success_rate: f64,
    /// Metric name → improvement percentage over the trailing window.
    pub performance_trends: BTreeMap<String, f64>,
    pub recommendations: Vec<String>,
}

#[derive(Serialize)]
struct ExportView<'a> {
    decisions: &'a [Decision],
    feedback: &'a [Feedback],
    performance_metrics: &'a PerformanceMetrics,
}

/// Layout of a file written by [`FeedbackLoop::export_data`].
#[derive(Debug, Clone, Deserialize)]
pub struct ExportSnapshot {
    pub decisions: Vec<Decision>,
    pub feedback: Vec<Feedback>,
    pub performance_metrics: PerformanceMetrics,
}

impl ExportSnapshot {
    /// Parse an export file, e.g. for offline analysis.
    pub fn read(path: impl AsRef<Path>) -> Result<Self, ExportError> {
        let file = File::open(path)?;
        Ok(serde_json::from_reader(BufReader::new(file))?)
    }
}

/// In-memory ledger of decisions and feedback.
pub struct FeedbackLoop {
    decisions: Vec<Decision>,
    decision_ids: Vec<String>,
    index: HashMap<String, usize>,
    feedback: Vec<Feedback>,
    metrics: PerformanceMetrics,
    window: usize,
    observer: Arc<dyn Observer>,
}

impl fmt::Debug for FeedbackLoop {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FeedbackLoop")
            .field("decisions", &self.decisions.len())
            .field("feedback", &self.feedback.len())
            .field("metrics", &self.metrics)
            .field("window", &self.window)
            .finish_non_exhaustive()
    }
}

impl Default for FeedbackLoop {
    fn default() -> Self {
        Self::new()
    }
}

impl FeedbackLoop {
    /// Create a loop that reports to `tracing`.
    #[must_use]
    pub fn new() -> Self {
        Self::with_observer(Arc::new(TracingObserver))
    }

    #[must_use]
    pub fn with_observer(observer: Arc<dyn Observer>) -> Self {
        Self {
            decisions: Vec::new(),
            decision_ids: Vec::new(),
            index: HashMap::new(),
            feedback: Vec::new(),
            metrics: PerformanceMetrics::default(),
            window: DEFAULT_IMPROVEMENT_WINDOW,
            observer,
        }
    }

    /// Window used by [`performance_trends`](Self::performance_trends) and
    /// the recommendations.
    #[must_use]
    pub fn with_window(mut self, window: usize) -> Self {
        self.window = window;
        self
    }

    /// Append a decision and return its identity
    /// `decision_{sequence_index}_{YYYYmmdd_HHMMSS}`.
    pub fn record_decision(&mut self, decision: Decision) -> String {
        let decision_id = decision_id(self.decisions.len(), decision.timestamp);
        self.observer.observe(&LoopEvent::DecisionRecorded {
            decision_id: &decision_id,
            decision_type: &decision.decision_type,
            confidence: decision.confidence,
        });
        self.index.insert(decision_id.clone(), self.decisions.len());
        self.decision_ids.push(decision_id.clone());
        self.decisions.push(decision);
        decision_id
    }

    /// Append feedback for `decision_id` and fold its known metrics into the
    /// series. The id is not checked against recorded decisions.
    pub fn record_feedback(&mut self, decision_id: &str, mut feedback: Feedback) {
        feedback.decision_id = decision_id.to_string();
        self.metrics.fold(&feedback.metrics);
        self.observer.observe(&LoopEvent::FeedbackRecorded {
            decision_id,
            outcome: &feedback.outcome,
            feedback_score: feedback.feedback_score,
        });
        self.feedback.push(feedback);
    }

    /// Endpoint-delta percentage of the trailing `window` values of `metric`.
    ///
    /// Returns 0.0 for unknown metric names, for fewer than two values and
    /// when the first value of the window is zero.
    #[must_use]
    pub fn calculate_improvement(&self, metric: &str, window: usize) -> f64 {
        Metric::from_name(metric).map_or(0.0, |m| self.improvement(m, window))
    }

    #[must_use]
    pub fn improvement(&self, metric: Metric, window: usize) -> f64 {
        endpoint_improvement(self.metrics.series(metric), window)
    }

    #[must_use]
    pub fn success_rate(&self) -> f64 {
        if self.feedback.is_empty() {
            return 0.0;
        }
        let successes = self
            .feedback
            .iter()
            .filter(|f| f.outcome.is_success())
            .count();
        #[allow(clippy::cast_precision_loss)]
        {
            successes as f64 / self.feedback.len() as f64 * 100.0
        }
    }

    #[must_use]
    pub fn performance_trends(&self) -> BTreeMap<String, f64> {
        Metric::ALL
            .into_iter()
            .map(|m| (m.as_str().to_string(), self.improvement(m, self.window)))
            .collect()
    }

    /// Independent rules; zero to three messages.
    #[must_use]
    pub fn recommendations(&self) -> Vec<String> {
        let mut recommendations = Vec::new();

        if self.success_rate() < RECOMMEND_SUCCESS_RATE_BELOW {
            recommendations.push(RECOMMENDATION_INPUT_QUALITY.to_string());
        }
        if self.improvement(Metric::Accuracy, self.window) < RECOMMEND_ACCURACY_IMPROVEMENT_BELOW {
            recommendations.push(RECOMMENDATION_ALGORITHMS.to_string());
        }
        if self.improvement(Metric::Efficiency, self.window) < RECOMMEND_EFFICIENCY_IMPROVEMENT_BELOW
        {
            recommendations.push(RECOMMENDATION_OPERATIONS.to_string());
        }

        recommendations
    }

    #[must_use]
    pub fn get_learning_insights(&self) -> LearningInsights {
        LearningInsights {
            total_decisions: self.decisions.len(),
            total_feedback: self.feedback.len(),
            success_rate: self.success_rate(),
            performance_trends: self.performance_trends(),
            recommendations: self.recommendations(),
        }
    }

    /// Write decisions, feedback and metric series to `path` as pretty JSON.
    ///
    /// Overwrites an existing file; the write is not atomic.
    pub fn export_data(&self, path: impl AsRef<Path>) -> Result<(), ExportError> {
        let path = path.as_ref();
        write_json(
            path,
            &ExportView {
                decisions: &self.decisions,
                feedback: &self.feedback,
                performance_metrics: &self.metrics,
            },
        )?;
        self.observer.observe(&LoopEvent::Exported {
            path,
            decisions: self.decisions.len(),
            feedback: self.feedback.len(),
        });
        Ok(())
    }

    #[must_use]
    pub fn decisions(&self) -> &[Decision] {
        &self.decisions
    }

    /// Identities in insertion order, parallel to [`decisions`](Self::decisions).
    #[must_use]
    pub fn decision_ids(&self) -> &[String] {
        &self.decision_ids
    }

    #[must_use]
    pub fn decision(&self, decision_id: &str) -> Option<&Decision> {
        self.index.get(decision_id).map(|&i| &self.decisions[i])
    }

    #[must_use]
    pub fn contains_decision(&self, decision_id: &str) -> bool {
        self.index.contains_key(decision_id)
    }

    #[must_use]
    pub fn feedback(&self) -> &[Feedback] {
        &self.feedback
    }

    pub fn feedback_for<'a>(&'a self, decision_id: &'a str) -> impl Iterator<Item = &'a Feedback> {
        self.feedback
            .iter()
            .filter(move |f| f.decision_id == decision_id)
    }

    #[must_use]
    pub fn metrics(&self) -> &PerformanceMetrics {
        &self.metrics
    }
}

/// Serialize `value` as pretty JSON into `path`, creating parent directories.
pub fn write_json<T: Serialize + ?Sized>(path: &Path, value: &T) -> Result<(), ExportError> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent)?;
        }
    }
    let mut writer = BufWriter::new(File::create(path)?);
    serde_json::to_writer_pretty(&mut writer, value)?;
    writer.flush()?;
    Ok(())
}

fn decision_id(sequence_index: usize, timestamp: OffsetDateTime) -> String {
    let suffix = timestamp
        .format(format_description!(
            "[year][month][day]_[hour][minute][second]"
        ))
        .unwrap_or_else(|_| FALLBACK_ID_SUFFIX.to_string());
    format!("decision_{sequence_index}_{suffix}")
}

fn endpoint_improvement(values: &[f64], window: usize) -> f64 {
    let recent = &values[values.len().saturating_sub(window)..];
    let (Some(first), Some(last)) = (recent.first(), recent.last()) else {
        return 0.0;
    };
    if recent.len() < 2 || *first == 0.0 {
        return 0.0;
    }
    let improvement = (last - first) / first * 100.0;
    if improvement.is_finite() {
        improvement
    } else {
        0.0
    }
}
