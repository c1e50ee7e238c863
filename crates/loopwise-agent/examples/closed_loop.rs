//! Offline walk through one decide → feedback cycle per decision type.
//!
//! Run with: cargo run -p loopwise-agent --example closed_loop

use loopwise_agent::{AgentConfig, CannedCompletion, DecisionAgent};
use loopwise_core::{DataMap, NoopObserver};
use serde_json::json;
use std::collections::BTreeMap;
use std::error::Error;
use std::sync::Arc;

fn main() -> Result<(), Box<dyn Error>> {
    println!("=== loopwise: closed-loop demo (offline) ===\n");

    let mut agent = DecisionAgent::with_observer(
        AgentConfig::new("building").with_learning_rate(0.15),
        CannedCompletion::new(),
        Arc::new(NoopObserver),
    );

    let scenarios = [
        (
            "maintenance",
            json!({"motor_vibration": 4.9, "bearing_temperature": 81.0}),
            "success",
            [("accuracy", 0.72), ("efficiency", 0.8)],
        ),
        (
            "energy_optimization",
            json!({"hvac_load_kw": 118.0, "occupancy": 0.2}),
            "partial",
            [("accuracy", 0.8), ("cost_savings", 340.0)],
        ),
        (
            "fault_diagnosis",
            json!({"oil_pressure": 1.1, "alarm": "low pressure"}),
            "failure",
            [("accuracy", 0.65), ("efficiency", 0.7)],
        ),
    ];

    for (decision_type, data, outcome, metrics) in scenarios {
        let data: DataMap = serde_json::from_value(data)?;
        let report = agent.make_decision(data, decision_type, None)?;
        println!("📋 {} → {}", decision_type, report.decision_id);
        println!("  Confidence: {:.2}", report.confidence);
        println!("  Reasoning: {}", report.reasoning);
        for rec in &report.recommendations {
            println!("  • {}", rec);
        }

        let metrics: BTreeMap<String, f64> = metrics
            .iter()
            .map(|(k, v)| ((*k).to_string(), *v))
            .collect();
        let score = agent.receive_feedback(&report.decision_id, outcome, metrics, None)?;
        println!("  Feedback: {} (score {:.2})\n", outcome, score);
    }

    let insights = agent.performance_insights();
    println!("📈 Insights:");
    println!("{}", serde_json::to_string_pretty(&insights)?);

    Ok(())
}
