//! Replay of a JSONL session script against one agent.
//!
//! Each line is either a decision request or feedback for an earlier
//! decision:
//!
//! ```json
//! {"op":"decide","decision_type":"maintenance","data":{"motor_vibration":4.8}}
//! {"op":"feedback","decision":0,"outcome":"success","metrics":{"accuracy":0.9}}
//! ```
//!
//! Feedback refers to a decision either by its 0-based position among the
//! script's `decide` steps or by an explicit `decision_id`.

use anyhow::{Context, Result};
use loopwise_agent::DecisionAgent;
use loopwise_core::{Completion, DataMap};
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::collections::BTreeMap;
use std::io::{BufRead, Write};
use time::OffsetDateTime;

#[derive(Debug, Deserialize)]
#[serde(tag = "op", rename_all = "lowercase")]
pub enum Step {
    Decide {
        decision_type: String,
        #[serde(default)]
        data: DataMap,
        #[serde(default)]
        context: Option<DataMap>,
    },
    Feedback {
        #[serde(default)]
        decision: Option<usize>,
        #[serde(default)]
        decision_id: Option<String>,
        outcome: String,
        #[serde(default)]
        metrics: BTreeMap<String, f64>,
        #[serde(default)]
        actual_result: Option<DataMap>,
    },
}

#[derive(Debug, Serialize)]
pub struct SessionSummary {
    pub steps: usize,
    pub decisions_made: usize,
    pub decisions_failed: usize,
    pub feedback_recorded: usize,
    pub feedback_rejected: usize,
    #[serde(with = "time::serde::rfc3339")]
    pub finished_at: OffsetDateTime,
}

/// Run every script line through `agent`, writing one JSON line per step.
///
/// Malformed lines abort the replay; failed decisions and rejected feedback
/// are reported in the output and the replay continues.
pub fn replay<C: Completion>(
    agent: &mut DecisionAgent<C>,
    script: impl BufRead,
    mut out: impl Write,
) -> Result<SessionSummary> {
    let mut issued: Vec<Option<String>> = Vec::new();
    let mut summary = SessionSummary {
        steps: 0,
        decisions_made: 0,
        decisions_failed: 0,
        feedback_recorded: 0,
        feedback_rejected: 0,
        finished_at: OffsetDateTime::now_utc(),
    };

    for (idx, line) in script.lines().enumerate() {
        let line = line.context("Failed to read session script")?;
        if line.trim().is_empty() {
            continue;
        }
        let step: Step = serde_json::from_str(&line)
            .with_context(|| format!("Invalid session step on line {}", idx + 1))?;
        summary.steps += 1;

        let record = match step {
            Step::Decide {
                decision_type,
                data,
                context,
            } => match agent.make_decision(data, &decision_type, context) {
                Ok(report) => {
                    summary.decisions_made += 1;
                    issued.push(Some(report.decision_id.clone()));
                    json!({"line": idx + 1, "op": "decide", "report": report})
                }
                Err(err) => {
                    summary.decisions_failed += 1;
                    issued.push(None);
                    json!({"line": idx + 1, "op": "decide", "fallback": err.fallback()})
                }
            },
            Step::Feedback {
                decision,
                decision_id,
                outcome,
                metrics,
                actual_result,
            } => {
                let target = match (decision_id, decision) {
                    (Some(id), _) => Ok(id),
                    (None, Some(i)) => match issued.get(i) {
                        Some(Some(id)) => Ok(id.clone()),
                        Some(None) => Err(format!("decision {} failed and has no id", i)),
                        None => Err(format!("no decision with index {}", i)),
                    },
                    (None, None) => Err("feedback needs `decision` or `decision_id`".to_string()),
                };
                let result = target.and_then(|id| {
                    agent
                        .receive_feedback(&id, outcome.as_str(), metrics, actual_result)
                        .map(|score| (id, score))
                        .map_err(|e| e.to_string())
                });
                match result {
                    Ok((id, score)) => {
                        summary.feedback_recorded += 1;
                        json!({"line": idx + 1, "op": "feedback", "decision_id": id, "feedback_score": score})
                    }
                    Err(error) => {
                        summary.feedback_rejected += 1;
                        json!({"line": idx + 1, "op": "feedback", "error": error})
                    }
                }
            }
        };

        serde_json::to_writer(&mut out, &record)?;
        writeln!(out)?;
    }

    summary.finished_at = OffsetDateTime::now_utc();
    Ok(summary)
}

#[cfg(test)]
mod tests {
    use super::*;
    use loopwise_agent::{AgentConfig, CannedCompletion};
    use loopwise_core::NoopObserver;
    use serde_json::Value;
    use std::sync::Arc;

    fn agent() -> DecisionAgent<CannedCompletion> {
        DecisionAgent::with_observer(
            AgentConfig::default(),
            CannedCompletion::new(),
            Arc::new(NoopObserver),
        )
    }

    fn output_lines(out: &[u8]) -> Vec<Value> {
        String::from_utf8_lossy(out)
            .lines()
            .map(|l| serde_json::from_str(l).unwrap_or(Value::Null))
            .collect()
    }

    #[test]
    fn replays_decide_and_feedback_steps() {
        let script = r#"{"op":"decide","decision_type":"maintenance","data":{"motor_vibration":4.8}}

{"op":"decide","decision_type":"fault_diagnosis"}
{"op":"feedback","decision":1,"outcome":"success","metrics":{"accuracy":0.9}}
{"op":"feedback","decision":5,"outcome":"failure"}
{"op":"feedback","decision_id":"external_7","outcome":"partial"}"#;
        let mut agent = agent();
        let mut out = Vec::new();

        let summary = replay(&mut agent, script.as_bytes(), &mut out).unwrap_or_else(|e| {
            panic!("replay failed: {e:#}");
        });

        assert_eq!(summary.steps, 5);
        assert_eq!(summary.decisions_made, 2);
        assert_eq!(summary.feedback_recorded, 2);
        assert_eq!(summary.feedback_rejected, 1);

        let lines = output_lines(&out);
        assert_eq!(lines.len(), 5);
        assert_eq!(lines[0]["line"], 1);
        let second_id = lines[1]["report"]["decision_id"].as_str().unwrap_or_default();
        assert!(second_id.starts_with("decision_1_"));
        assert_eq!(lines[2]["decision_id"], second_id);
        assert_eq!(lines[2]["feedback_score"], 1.0);
        assert!(lines[3]["error"]
            .as_str()
            .is_some_and(|e| e.contains("no decision with index 5")));
        assert_eq!(lines[4]["decision_id"], "external_7");

        assert_eq!(agent.state().successful_decisions, 1);
    }

    #[test]
    fn malformed_line_aborts_with_line_number() {
        let script = "{\"op\":\"decide\",\"decision_type\":\"x\"}\n{\"op\":\"teleport\"}\n";
        let mut agent = agent();
        let err = match replay(&mut agent, script.as_bytes(), Vec::new()) {
            Ok(_) => panic!("unknown op should fail"),
            Err(e) => e,
        };
        assert!(err.to_string().contains("line 2"));
    }

    #[test]
    fn failed_decisions_produce_fallback_lines() {
        let failing = |_req: &loopwise_core::CompletionRequest| -> Result<
            loopwise_core::CompletionResponse,
            loopwise_core::CompletionError,
        > { Err(loopwise_core::CompletionError::Transport("offline".into())) };
        let mut agent =
            DecisionAgent::with_observer(AgentConfig::default(), failing, Arc::new(NoopObserver));
        let script = "{\"op\":\"decide\",\"decision_type\":\"maintenance\"}\n\
                      {\"op\":\"feedback\",\"decision\":0,\"outcome\":\"success\"}\n";
        let mut out = Vec::new();

        let summary = match replay(&mut agent, script.as_bytes(), &mut out) {
            Ok(s) => s,
            Err(e) => panic!("replay failed: {e:#}"),
        };

        assert_eq!(summary.decisions_failed, 1);
        assert_eq!(summary.feedback_rejected, 1);
        let lines = output_lines(&out);
        assert_eq!(
            lines[0]["fallback"]["decision"],
            "Unable to make decision due to system error"
        );
        assert!(lines[1]["error"]
            .as_str()
            .is_some_and(|e| e.contains("has no id")));
    }
}
