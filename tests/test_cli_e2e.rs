//! Runs the `twinstep` binary end to end.

use std::io::Write;
use std::process::{Command, Output, Stdio};

fn twinstep(args: &[&str]) -> Output {
    Command::new(env!("CARGO_BIN_EXE_twinstep"))
        .args(args)
        .env_remove("TWINSTEP_CONFIG")
        .env_remove("TWINSTEP_LOG_LEVEL")
        .stdin(Stdio::null())
        .output()
        .expect("failed to run twinstep")
}

fn stdout(output: &Output) -> String {
    String::from_utf8_lossy(&output.stdout).into_owned()
}

// ============================================================================
// version / scenarios
// ============================================================================

#[test]
fn version_json() {
    let output = twinstep(&["version", "--format", "json"]);
    assert!(output.status.success());
    let parsed: serde_json::Value =
        serde_json::from_str(&stdout(&output)).expect("version JSON should be valid");
    assert_eq!(parsed["name"], "twinstep");
}

#[test]
fn scenarios_list_json_includes_builtins() {
    let output = twinstep(&["scenarios", "list", "--format", "json"]);
    assert!(output.status.success());
    let parsed: serde_json::Value = serde_json::from_str(&stdout(&output)).unwrap();
    let names: Vec<&str> = parsed
        .as_array()
        .unwrap()
        .iter()
        .filter_map(|s| s["name"].as_str())
        .collect();
    assert!(names.contains(&"diagnose-system-issue"));
    assert!(names.contains(&"minimal"));
}

#[test]
fn scenarios_show_prints_yaml_that_validates() {
    let output = twinstep(&["scenarios", "show", "minimal"]);
    assert!(output.status.success());

    let mut file = tempfile::NamedTempFile::new().unwrap();
    file.write_all(&output.stdout).unwrap();
    let path = file.path().to_str().unwrap();

    let output = twinstep(&["validate", path]);
    assert!(
        output.status.success(),
        "shown YAML should validate: {}",
        String::from_utf8_lossy(&output.stderr)
    );
    assert!(stdout(&output).contains("valid (4 phases, 1 diagrams)"));
}

#[test]
fn scenarios_show_unknown_is_usage_error() {
    let output = twinstep(&["scenarios", "show", "minimall"]);
    assert_eq!(output.status.code(), Some(64));
    assert!(String::from_utf8_lossy(&output.stderr).contains("Did you mean 'minimal'?"));
}

// ============================================================================
// validate / timeline
// ============================================================================

#[test]
fn validate_reports_config_errors_with_exit_code() {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    file.write_all(b"title: Broken\nsteps: [a, b]\ndurations: { a: 1s }\n")
        .unwrap();
    let output = twinstep(&["validate", "--format", "json", file.path().to_str().unwrap()]);
    assert_eq!(output.status.code(), Some(2));

    let parsed: serde_json::Value = serde_json::from_str(&stdout(&output)).unwrap();
    assert_eq!(parsed[0]["valid"], false);
    assert!(!parsed[0]["errors"].as_array().unwrap().is_empty());
}

#[test]
fn timeline_plans_a_cycle() {
    let output = twinstep(&["timeline", "minimal", "--speed", "2", "--format", "json"]);
    assert!(output.status.success());
    let parsed: serde_json::Value = serde_json::from_str(&stdout(&output)).unwrap();
    // (1000 + 1500 + 2500 + 3000) / 2 + 1000 settle
    assert_eq!(parsed["cycle_ms"], 5000);
    assert_eq!(parsed["phases"][1]["starts_at"], 500);
}

// ============================================================================
// play
// ============================================================================

#[test]
fn play_unknown_diagram_is_usage_error() {
    let output = twinstep(&["play", "minimal", "--diagram", "flwo", "--no-input"]);
    assert_eq!(output.status.code(), Some(64));
    assert!(String::from_utf8_lossy(&output.stderr).contains("did you mean 'flow'"));
}

#[test]
fn play_one_cycle_as_json_frames() {
    let output = twinstep(&[
        "play",
        "minimal",
        "--speed",
        "3",
        "--cycles",
        "1",
        "--no-input",
        "--format",
        "json",
    ]);
    assert!(
        output.status.success(),
        "play should exit 0: {}",
        String::from_utf8_lossy(&output.stderr)
    );

    let frames: Vec<serde_json::Value> = stdout(&output)
        .lines()
        .map(|l| serde_json::from_str(l).unwrap())
        .collect();
    let phases: Vec<&str> = frames
        .iter()
        .filter_map(|f| f["steady"]["phase_name"].as_str())
        .collect();
    assert_eq!(phases, ["idle", "input", "action", "complete", "idle"]);
    assert!(frames.iter().all(|f| f["speed"] == 3.0));
}
