use serde_json::Value;
use std::fs;
use std::process::Command;

const ONE_WAY: &str = r#"{
  "title": "one-way",
  "states": ["A", "B"],
  "transitions": [ { "pre": ["A", "B"], "post": ["B", "B"] } ],
  "initialStates": ["A", "B"],
  "trueStates": ["B"],
  "falseStates": ["A"]
}"#;

fn ppspeed(args: &[&str]) -> std::process::Output {
    Command::new(env!("CARGO_BIN_EXE_ppspeed"))
        .args(args)
        .env_remove("RUST_LOG")
        .output()
        .expect("failed to execute ppspeed")
}

#[test]
fn analyze_json_file_reports_speed_and_writes_dot() {
    let dir = tempfile::tempdir().expect("tempdir");
    let protocol = dir.path().join("one_way.json");
    let dot = dir.path().join("tree.dot");
    fs::write(&protocol, ONE_WAY).expect("write protocol");

    let output = ppspeed(&[
        "analyze",
        protocol.to_str().expect("utf-8 path"),
        "--out",
        "--tree",
        dot.to_str().expect("utf-8 path"),
    ]);
    assert!(
        output.status.success(),
        "stderr: {}",
        String::from_utf8_lossy(&output.stderr)
    );

    let report: Value = serde_json::from_slice(&output.stdout).expect("JSON report");
    assert_eq!(report["termination"], Value::Bool(true));
    assert_eq!(report["witness"], Value::Bool(true));
    assert_eq!(report["speed"], "QUADRATIC_LOG");
    assert_eq!(report["max-depth"], 1);
    assert!(report["elapsed"]["tree"].is_number());
    let stages = report["tree"].as_array().expect("stage list");
    assert_eq!(stages.len(), report["stages"].as_u64().expect("count") as usize);
    assert_eq!(stages[0]["K"], serde_json::json!([["A", "B"]]));

    let dot = fs::read_to_string(dot).expect("dot written");
    assert!(dot.starts_with("digraph stages {"));
    assert!(dot.contains("K_C"));
}

#[test]
fn analyze_generator_prints_summary() {
    let output = ppspeed(&["analyze", "flock", "[1]"]);
    assert!(output.status.success());
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("Protocol termination:"));
    assert!(stdout.contains("Expected termination time:"));
}

#[test]
fn show_reexports_generated_protocol_as_json() {
    let output = ppspeed(&["show", "majority", "--json"]);
    assert!(output.status.success());
    let protocol: Value = serde_json::from_slice(&output.stdout).expect("protocol JSON");
    assert_eq!(protocol["states"], serde_json::json!(["A", "B", "a", "b"]));
    assert_eq!(protocol["initialStates"], serde_json::json!(["A", "B"]));
}

#[test]
fn bad_sources_fail_with_diagnostics() {
    let unknown = ppspeed(&["analyze", "no-such-generator"]);
    assert!(!unknown.status.success());
    assert!(String::from_utf8_lossy(&unknown.stderr).contains("Unknown generator"));

    let bad_args = ppspeed(&["analyze", "flock", "[0]"]);
    assert!(!bad_args.status.success());

    let dir = tempfile::tempdir().expect("tempdir");
    let malformed = dir.path().join("broken.json");
    fs::write(&malformed, "{ \"states\": [").expect("write");
    let output = ppspeed(&["show", malformed.to_str().expect("utf-8 path")]);
    assert!(!output.status.success());
}
