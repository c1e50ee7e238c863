//! Datensätze, die zwischen Agent und Feedback-Loop ausgetauscht werden.
//!
//! Dieses Modul definiert die [`Decision`] (eine getroffene Entscheidung),
//! das [`Feedback`] (das beobachtete Ergebnis dazu) und den [`AgentState`]
//! mit den Zählern und Lernparametern eines Agenten. Alle Typen lassen sich
//! über `serde` als JSON exportieren.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;
use std::fmt;
use time::OffsetDateTime;

/// Betriebsdaten oder Ergebnisse als Schlüssel → beliebiger JSON-Wert.
pub type DataMap = BTreeMap<String, Value>;

/// Eine Entscheidung des Agenten. Nach dem Eintragen in den Loop wird sie
/// nicht mehr verändert.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Decision {
    /// Zeitpunkt, zu dem die Entscheidung erzeugt wurde.
    #[serde(with = "time::serde::rfc3339")]
    pub timestamp: OffsetDateTime,
    /// Kategorie, z. B. "maintenance", "energy_optimization" oder
    /// "fault_diagnosis". Freitext, keine geschlossene Menge.
    pub decision_type: String,
    /// Momentaufnahme der Betriebsdaten, die zur Entscheidung geführt hat.
    pub input_data: DataMap,
    /// Der erzeugte Entscheidungstext.
    pub decision: String,
    /// Kurze Begründung, aus dem Entscheidungstext abgeleitet.
    pub reasoning: String,
    /// Konfidenz im Bereich `[0, 1]`.
    pub confidence: f64,
}

impl Decision {
    /// Erzeugt eine Entscheidung mit dem aktuellen UTC-Zeitstempel.
    ///
    /// Die Konfidenz wird auf `[0, 1]` begrenzt; nicht-endliche Werte werden
    /// zu `0.0`.
    #[must_use]
    pub fn new(
        decision_type: impl Into<String>,
        input_data: DataMap,
        decision: impl Into<String>,
        reasoning: impl Into<String>,
        confidence: f64,
    ) -> Self {
        Self {
            timestamp: OffsetDateTime::now_utc(),
            decision_type: decision_type.into(),
            input_data,
            decision: decision.into(),
            reasoning: reasoning.into(),
            confidence: if confidence.is_finite() {
                confidence.clamp(0.0, 1.0)
            } else {
                0.0
            },
        }
    }

    /// Ersetzt den Zeitstempel, z. B. für reproduzierbare Tests.
    #[must_use]
    pub fn at(mut self, timestamp: OffsetDateTime) -> Self {
        self.timestamp = timestamp;
        self
    }
}

/// Ergebnisklasse einer Rückmeldung.
///
/// Im JSON ein offener String: `"success"`, `"failure"` und `"partial"`
/// steuern die Bewertung, jeder andere Wert bleibt als [`Outcome::Other`]
/// erhalten.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum Outcome {
    Success,
    Failure,
    Partial,
    Other(String),
}

impl Outcome {
    #[must_use]
    pub fn as_str(&self) -> &str {
        match self {
            Outcome::Success => "success",
            Outcome::Failure => "failure",
            Outcome::Partial => "partial",
            Outcome::Other(s) => s,
        }
    }

    /// Basiswert für den Feedback-Score: success=1.0, partial=0.5, sonst 0.0.
    #[must_use]
    pub fn base_score(&self) -> f64 {
        match self {
            Outcome::Success => 1.0,
            Outcome::Partial => 0.5,
            Outcome::Failure | Outcome::Other(_) => 0.0,
        }
    }

    #[must_use]
    pub fn is_success(&self) -> bool {
        matches!(self, Outcome::Success)
    }
}

impl From<String> for Outcome {
    fn from(s: String) -> Self {
        match s.as_str() {
            "success" => Outcome::Success,
            "failure" => Outcome::Failure,
            "partial" => Outcome::Partial,
            _ => Outcome::Other(s),
        }
    }
}

impl From<&str> for Outcome {
    fn from(s: &str) -> Self {
        Outcome::from(s.to_string())
    }
}

impl From<Outcome> for String {
    fn from(outcome: Outcome) -> Self {
        match outcome {
            Outcome::Other(s) => s,
            known => known.as_str().to_string(),
        }
    }
}

impl fmt::Display for Outcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Rückmeldung zu einer früheren Entscheidung.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Feedback {
    /// Verweis auf die Kennung der Entscheidung. Der Loop prüft nicht, ob
    /// diese Entscheidung existiert.
    pub decision_id: String,
    #[serde(with = "time::serde::rfc3339")]
    pub timestamp: OffsetDateTime,
    pub outcome: Outcome,
    /// Erwartete (optionale) Schlüssel: `accuracy`, `efficiency`,
    /// `cost_savings`.
    pub metrics: BTreeMap<String, f64>,
    /// Frei strukturiertes, tatsächlich beobachtetes Ergebnis.
    pub actual_result: DataMap,
    /// Beim Einreichen berechnet, immer in `[0, 1]`.
    pub feedback_score: f64,
}

/// Die drei Kennzahlen-Reihen, die der Feedback-Loop führt.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Metric {
    Accuracy,
    Efficiency,
    CostSavings,
}

impl Metric {
    pub const ALL: [Metric; 3] = [Metric::Accuracy, Metric::Efficiency, Metric::CostSavings];

    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Metric::Accuracy => "accuracy",
            Metric::Efficiency => "efficiency",
            Metric::CostSavings => "cost_savings",
        }
    }

    /// Liefert `None` für unbekannte Namen.
    #[must_use]
    pub fn from_name(name: &str) -> Option<Self> {
        Metric::ALL.into_iter().find(|m| m.as_str() == name)
    }
}

impl fmt::Display for Metric {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Veränderlicher Zustand eines Agenten.
///
/// Invariante: `successful_decisions <= total_decisions`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct AgentState {
    /// Wird bei jeder erfolgreich erzeugten Entscheidung erhöht.
    pub total_decisions: u64,
    /// Wird nur bei Feedback mit Ergebnis "success" erhöht.
    pub successful_decisions: u64,
    pub learning_rate: f64,
    pub confidence_threshold: f64,
    #[serde(default, with = "time::serde::rfc3339::option")]
    pub last_decision_time: Option<OffsetDateTime>,
}

impl Default for AgentState {
    fn default() -> Self {
        Self::new(0.1, 0.7)
    }
}

impl AgentState {
    #[must_use]
    pub fn new(learning_rate: f64, confidence_threshold: f64) -> Self {
        Self {
            total_decisions: 0,
            successful_decisions: 0,
            learning_rate,
            confidence_threshold,
            last_decision_time: None,
        }
    }

    /// Anteil erfolgreicher Entscheidungen in Prozent, bezogen auf
    /// `max(1, total_decisions)`.
    #[must_use]
    pub fn success_rate(&self) -> f64 {
        #[allow(clippy::cast_precision_loss)]
        {
            self.successful_decisions as f64 / self.total_decisions.max(1) as f64 * 100.0
        }
    }
}
