#![allow(clippy::expect_used, clippy::unwrap_used)]

use assert_cmd::Command;
use predicates::prelude::*;
use serde_json::Value;
use std::fs;
use std::path::PathBuf;

const SESSION_SCRIPT: &str = concat!(
    env!("CARGO_MANIFEST_DIR"),
    "/../../tests/fixtures/session/sample.jsonl"
);
const MAINTENANCE_DATA: &str = concat!(
    env!("CARGO_MANIFEST_DIR"),
    "/../../tests/fixtures/decide/maintenance.json"
);
const STRICT_CONFIG: &str = concat!(
    env!("CARGO_MANIFEST_DIR"),
    "/../../tests/fixtures/decide/config.json"
);

fn loopwise() -> Command {
    let mut cmd = Command::cargo_bin("loopwise").unwrap();
    cmd.env_remove("RUST_LOG").env_remove("LOOPWISE_LLM_API_KEY");
    cmd
}

fn temp_path(name: &str) -> PathBuf {
    std::env::temp_dir().join(format!("loopwise_cli_{}_{}", std::process::id(), name))
}

fn json_lines(stdout: &[u8]) -> Vec<Value> {
    String::from_utf8(stdout.to_vec())
        .unwrap()
        .lines()
        .map(|line| serde_json::from_str(line).unwrap())
        .collect()
}

#[test]
fn decide_offline_prints_report() {
    let output = loopwise()
        .args(["decide", "--type", "maintenance", "--data", MAINTENANCE_DATA])
        .output()
        .unwrap();
    assert!(output.status.success());

    let report: Value = serde_json::from_slice(&output.stdout).unwrap();
    assert!(report["decision_id"]
        .as_str()
        .unwrap()
        .starts_with("decision_0_"));
    assert_eq!(report["model"], "canned");
    assert_eq!(report["next_actions"].as_array().unwrap().len(), 4);
    assert!(report["reasoning"].as_str().unwrap().contains("vibration"));
}

#[test]
fn decide_reads_data_from_stdin() {
    loopwise()
        .args(["decide", "--type", "lighting", "--data", "-"])
        .write_stdin(r#"{"lux": 320}"#)
        .assert()
        .success()
        .stdout(predicate::str::contains("Review decision outcomes"));
}

#[test]
fn decide_rejects_non_object_data() {
    loopwise()
        .args(["decide", "--type", "maintenance", "--data", "-"])
        .write_stdin("[1, 2, 3]")
        .assert()
        .failure()
        .stderr(predicate::str::contains("Expected a JSON object"));
}

#[test]
fn http_provider_requires_api_key() {
    loopwise()
        .args([
            "decide",
            "--type",
            "maintenance",
            "--data",
            MAINTENANCE_DATA,
            "--provider",
            "http",
        ])
        .assert()
        .failure()
        .stderr(predicate::str::contains("LOOPWISE_LLM_API_KEY"));
}

#[test]
fn http_provider_failure_prints_fallback() {
    let output = loopwise()
        .args([
            "decide",
            "--type",
            "maintenance",
            "--data",
            MAINTENANCE_DATA,
            "--provider",
            "http",
        ])
        .env("LOOPWISE_LLM_API_KEY", "test-key")
        .env("LOOPWISE_LLM_URL", "http://127.0.0.1:9/generate")
        .env("LOOPWISE_LLM_RETRIES", "1")
        .env("LOOPWISE_LLM_TIMEOUT_SECS", "2")
        .output()
        .unwrap();
    assert!(output.status.success());

    let fallback: Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(
        fallback["decision"],
        "Unable to make decision due to system error"
    );
    assert_eq!(fallback["recommendations"].as_array().unwrap().len(), 2);
    assert!(fallback["error"]
        .as_str()
        .unwrap()
        .starts_with("Completion failed"));
}

#[test]
fn session_replays_script_and_exports() {
    let export = temp_path("session_loop.json");
    let agent_export = temp_path("session_agent.json");
    let agent_feedback = PathBuf::from(format!("{}_feedback.json", agent_export.display()));
    for path in [&export, &agent_export, &agent_feedback] {
        let _ = fs::remove_file(path);
    }

    let output = loopwise()
        .arg("session")
        .arg("--script")
        .arg(SESSION_SCRIPT)
        .arg("--export")
        .arg(&export)
        .arg("--agent-export")
        .arg(&agent_export)
        .output()
        .unwrap();
    assert!(output.status.success());

    let lines = json_lines(&output.stdout);
    assert_eq!(lines.len(), 7);
    assert_eq!(lines[2]["feedback_score"], 1.0);
    assert_eq!(lines[3]["feedback_score"], 1.0);
    assert!((lines[5]["feedback_score"].as_f64().unwrap() - 0.95).abs() < 1e-9);

    let last = &lines[6];
    assert_eq!(last["summary"]["steps"], 6);
    assert_eq!(last["summary"]["decisions_made"], 3);
    assert_eq!(last["summary"]["feedback_recorded"], 3);
    let insights = &last["insights"];
    assert_eq!(insights["total_decisions"], 3);
    assert_eq!(insights["total_feedback"], 3);
    assert!((insights["success_rate"].as_f64().unwrap() - 100.0 / 3.0).abs() < 1e-9);
    assert!((insights["learning_rate"].as_f64().unwrap() - 0.1 * 0.95_f64.powi(3)).abs() < 1e-9);
    // accuracy 0.82 -> 0.95 over the window
    assert!(
        (insights["performance_trends"]["accuracy"].as_f64().unwrap() - 15.853_658_536_585_366).abs()
            < 1e-6
    );

    let loop_export: Value = serde_json::from_str(&fs::read_to_string(&export).unwrap()).unwrap();
    assert_eq!(loop_export["decisions"].as_array().unwrap().len(), 3);
    assert_eq!(
        loop_export["performance_metrics"]["cost_savings"],
        serde_json::json!([1500.0])
    );

    let agent: Value = serde_json::from_str(&fs::read_to_string(&agent_export).unwrap()).unwrap();
    assert_eq!(agent["agent_info"]["agent_type"], "general");
    assert_eq!(agent["agent_info"]["state"]["successful_decisions"], 1);
    assert_eq!(agent["decision_history"].as_array().unwrap().len(), 3);
    assert!(agent_feedback.exists());

    for path in [&export, &agent_export, &agent_feedback] {
        let _ = fs::remove_file(path);
    }
}

#[test]
fn strict_config_rejects_unknown_ids_in_session() {
    let script = temp_path("strict.jsonl");
    fs::write(
        &script,
        "{\"op\":\"decide\",\"decision_type\":\"maintenance\"}\n\
         {\"op\":\"feedback\",\"decision_id\":\"decision_9_20200101_000000\",\"outcome\":\"success\"}\n",
    )
    .unwrap();

    let output = loopwise()
        .arg("session")
        .arg("--script")
        .arg(&script)
        .arg("--config")
        .arg(STRICT_CONFIG)
        .output()
        .unwrap();
    let _ = fs::remove_file(&script);
    assert!(output.status.success());

    let lines = json_lines(&output.stdout);
    assert!(lines[1]["error"]
        .as_str()
        .unwrap()
        .contains("Unknown decision id"));
    let insights = &lines[2]["insights"];
    assert_eq!(insights["agent_type"], "plant-maintenance");
    assert_eq!(insights["total_feedback"], 0);
    assert!((insights["learning_rate"].as_f64().unwrap() - 0.2).abs() < 1e-12);
}

#[test]
fn malformed_script_fails_with_line_number() {
    loopwise()
        .args(["session", "--script", "-"])
        .write_stdin("{\"op\":\"decide\",\"decision_type\":\"x\"}\nnot json\n")
        .assert()
        .failure()
        .stderr(predicate::str::contains("line 2"));
}
