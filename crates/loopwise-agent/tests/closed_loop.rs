use loopwise_agent::{AgentConfig, AgentError, DecisionAgent};
use loopwise_core::{
    Completion, CompletionError, CompletionRequest, CompletionResponse, DataMap, NoopObserver,
};
use loopwise_feedback::ExportSnapshot;
use serde_json::json;
use std::collections::{BTreeMap, VecDeque};
use std::sync::Arc;
use std::time::Duration;

/// Replays queued responses; an exhausted queue behaves like a timeout.
struct ScriptedCompletion {
    responses: VecDeque<Result<CompletionResponse, CompletionError>>,
    seen: Vec<CompletionRequest>,
}

impl ScriptedCompletion {
    fn new(responses: Vec<Result<CompletionResponse, CompletionError>>) -> Self {
        Self {
            responses: responses.into(),
            seen: Vec::new(),
        }
    }
}

impl Completion for ScriptedCompletion {
    fn complete(
        &mut self,
        request: &CompletionRequest,
    ) -> Result<CompletionResponse, CompletionError> {
        self.seen.push(request.clone());
        self.responses
            .pop_front()
            .unwrap_or(Err(CompletionError::Timeout(Duration::from_secs(30))))
    }
}

fn answer(content: &str, confidence: Option<f64>) -> Result<CompletionResponse, CompletionError> {
    Ok(CompletionResponse {
        content: content.to_string(),
        confidence,
        model: "scripted".to_string(),
        tokens_used: 42,
    })
}

fn metrics(pairs: &[(&str, f64)]) -> BTreeMap<String, f64> {
    pairs.iter().map(|(k, v)| ((*k).to_string(), *v)).collect()
}

#[test]
fn decisions_and_feedback_drive_insights_and_export() {
    let completion = ScriptedCompletion::new(vec![
        answer(
            "We recommend cleaning the condenser coils.\nReasoning: approach temperature drifted.",
            Some(0.9),
        ),
        answer("Lower the supply air temperature. Zones are overheating.", None),
        Err(CompletionError::Status {
            status: 503,
            body: "overloaded".to_string(),
        }),
    ]);
    let mut agent = DecisionAgent::with_observer(
        AgentConfig::new("energy").with_learning_rate(0.12),
        completion,
        Arc::new(NoopObserver),
    );

    let mut data = DataMap::new();
    data.insert("chiller_kw".to_string(), json!(310.0));
    let mut context = DataMap::new();
    context.insert("season".to_string(), json!("summer"));

    let first = agent
        .make_decision(data.clone(), "energy_optimization", Some(context))
        .expect("first decision");
    let second = agent
        .make_decision(data.clone(), "energy_optimization", None)
        .expect("second decision");
    let third = agent.make_decision(data, "energy_optimization", None);

    assert!(first.decision_id.starts_with("decision_0_"));
    assert!(second.decision_id.starts_with("decision_1_"));
    assert_eq!(first.reasoning, "approach temperature drifted");
    assert_eq!(
        second.reasoning,
        "Lower the supply air temperature. Zones are overheating"
    );
    assert!((second.confidence - 0.8).abs() < 1e-12);
    let err = third.expect_err("scripted 503");
    assert!(matches!(err, AgentError::Completion(_)));
    assert_eq!(err.fallback().recommendations.len(), 2);

    assert_eq!(
        agent.completion().seen[0]
            .context
            .as_ref()
            .and_then(|c| c.get("season")),
        Some(&json!("summer"))
    );

    agent
        .receive_feedback(
            &first.decision_id,
            "success",
            metrics(&[("accuracy", 0.5), ("efficiency", 0.6), ("cost_savings", 200.0)]),
            Some(DataMap::from([("kwh_saved".to_string(), json!(85))])),
        )
        .expect("valid feedback");
    agent
        .receive_feedback(
            &second.decision_id,
            "failure",
            metrics(&[("accuracy", 0.7), ("efficiency", 0.63)]),
            None,
        )
        .expect("valid feedback");

    let state = agent.state();
    assert_eq!(state.total_decisions, 2);
    assert_eq!(state.successful_decisions, 1);
    assert!(state.successful_decisions <= state.total_decisions);
    // Both scores clamp to 1.0, so the rate is annealed twice.
    assert!((state.learning_rate - 0.12 * 0.95 * 0.95).abs() < 1e-12);

    let insights = agent.performance_insights();
    assert!((insights.performance_trends["accuracy"] - 40.0).abs() < 1e-9);
    assert!((insights.performance_trends["efficiency"] - 5.0).abs() < 1e-9);
    assert!((insights.feedback_success_rate - 50.0).abs() < 1e-9);
    // success rate 50 < 70, accuracy 40 >= 5, efficiency 5 < 10
    assert_eq!(insights.recommendations.len(), 2);

    let path = std::env::temp_dir().join(format!("loopwise_agent_export_{}.json", std::process::id()));
    let feedback_path = agent.export_agent_data(&path).expect("export");

    let agent_file: serde_json::Value =
        serde_json::from_str(&std::fs::read_to_string(&path).expect("agent export exists"))
            .expect("agent export is json");
    assert_eq!(agent_file["agent_info"]["agent_type"], json!("energy"));
    assert_eq!(agent_file["agent_info"]["state"]["total_decisions"], json!(2));
    assert_eq!(agent_file["decision_history"].as_array().map(Vec::len), Some(2));
    assert_eq!(agent_file["decision_history"][0]["model"], json!("scripted"));

    let snapshot = ExportSnapshot::read(&feedback_path).expect("feedback export parses");
    assert_eq!(snapshot.decisions.len(), 2);
    assert_eq!(snapshot.feedback.len(), 2);
    assert_eq!(snapshot.performance_metrics.accuracy, vec![0.5, 0.7]);
    assert_eq!(snapshot.performance_metrics.cost_savings, vec![200.0]);

    let _ = std::fs::remove_file(&path);
    let _ = std::fs::remove_file(&feedback_path);
}

#[test]
fn invariants_hold_over_mixed_sequences() {
    let mut agent = DecisionAgent::with_observer(
        AgentConfig::default(),
        loopwise_agent::CannedCompletion::new(),
        Arc::new(NoopObserver),
    );
    let outcomes = ["success", "failure", "partial", "success", "unknown", "success"];
    let mut ids = Vec::new();

    for (round, outcome) in outcomes.iter().cycle().take(30).enumerate() {
        if round % 3 != 2 {
            let report = agent
                .make_decision(DataMap::new(), "fault_diagnosis", None)
                .expect("canned");
            ids.push(report.decision_id);
        }
        let target = ids
            .get(round % ids.len().max(1))
            .cloned()
            .unwrap_or_else(|| "decision_missing".to_string());
        let score = agent
            .receive_feedback(
                &target,
                *outcome,
                metrics(&[("accuracy", 0.1 * (round % 7) as f64)]),
                None,
            )
            .expect("finite metrics");

        let state = agent.state();
        assert!((0.0..=1.0).contains(&score));
        assert!(state.successful_decisions <= state.total_decisions);
        assert!((0.0..=1.0).contains(&state.confidence_threshold));
        assert!((0.01..=1.0).contains(&state.learning_rate));
    }

    let unique: std::collections::HashSet<&String> = ids.iter().collect();
    assert_eq!(unique.len(), ids.len());
}
