use assert_cmd::prelude::*;
use rstest::rstest;
use std::fs;
use std::path::PathBuf;
use std::process::Command;
use tempfile::tempdir;

// Fast simulated cell: 1 kHz control loop and short trajectories.
const FAST: &str = r#"
[control]
rate_hz = 1000

[initial]
joints = [0.0, -0.785, 0.0, -2.356, 0.0, 1.571, 0.785]
position = [0.5, 0.0, 0.1]

[descent]
max_distance_m = 0.1
points = 200

[spiral]
points = 400

[insertion]
depth_m = 0.03
points = 100
straighten_points = 20
wiggle_cycles = 2
wiggle_points = 60
retract_m = 0.05
retract_points = 50

[sensor]
sample_rate_hz = 1000
read_timeout_ms = 100

[safety]
max_run_ms = 20000
phase_timeout_ms = 5000

[impedance.default]
stiffness = [1000.0, 1000.0, 1000.0, 30.0, 30.0, 30.0]
damping = [63.0, 63.0, 63.0, 10.0, 10.0, 10.0]
[impedance.move_to_initial]
stiffness = [1000.0, 1000.0, 1000.0, 30.0, 30.0, 30.0]
damping = [63.0, 63.0, 63.0, 10.0, 10.0, 10.0]
[impedance.external_down_movement]
stiffness = [1000.0, 1000.0, 1000.0, 30.0, 30.0, 30.0]
damping = [63.0, 63.0, 63.0, 10.0, 10.0, 10.0]
[impedance.spiral_motion]
stiffness = [600.0, 600.0, 1000.0, 30.0, 30.0, 30.0]
damping = [49.0, 49.0, 63.0, 10.0, 10.0, 10.0]
[impedance.internal_down_movement]
stiffness = [1000.0, 1000.0, 1000.0, 30.0, 30.0, 30.0]
damping = [63.0, 63.0, 63.0, 10.0, 10.0, 10.0]
[impedance.straightening]
stiffness = [1000.0, 1000.0, 1000.0, 30.0, 30.0, 30.0]
damping = [63.0, 63.0, 63.0, 10.0, 10.0, 10.0]
[impedance.insertion_wiggle]
stiffness = [1000.0, 1000.0, 1000.0, 30.0, 30.0, 30.0]
damping = [63.0, 63.0, 63.0, 10.0, 10.0, 10.0]
[impedance.internal_up_movement]
stiffness = [1000.0, 1000.0, 1000.0, 30.0, 30.0, 30.0]
damping = [63.0, 63.0, 63.0, 10.0, 10.0, 10.0]
"#;

fn write_config(dir: &tempfile::TempDir, extra: &str) -> PathBuf {
    let path = dir.path().join("cfg.toml");
    fs::write(&path, format!("{FAST}\n{extra}")).unwrap();
    path
}

fn json_line(stdout: &[u8], key: &str) -> serde_json::Value {
    let stdout = String::from_utf8_lossy(stdout);
    let line = stdout
        .lines()
        .find(|l| l.contains(key))
        .unwrap_or("")
        .to_string();
    assert!(
        !line.is_empty(),
        "no JSON line with {key} found; stdout was: {stdout}"
    );
    serde_json::from_str(&line).expect("valid JSON")
}

/// Validate the JSON schema for a completed insertion.
#[rstest]
fn json_success_schema() {
    let dir = tempdir().unwrap();
    let cfg = write_config(&dir, "");

    let mut cmd = Command::cargo_bin("insertion").unwrap();
    cmd.arg("--json")
        .arg("--log-level")
        .arg("error")
        .arg("--config")
        .arg(&cfg)
        .arg("run");

    let out = cmd.assert().success().get_output().stdout.clone();
    let v = json_line(&out, "\"outcome\"");

    assert!(v.get("timestamp").and_then(|x| x.as_u64()).is_some());
    assert!(v.get("duration_ms").and_then(|x| x.as_u64()).is_some());
    assert!(v.get("ticks").and_then(|x| x.as_u64()).unwrap_or(0) > 0);
    assert!(v.get("force_samples").and_then(|x| x.as_u64()).unwrap_or(0) > 0);
    assert_eq!(v["outcome"], "complete");

    let pose = v["final_pose"].as_array().expect("final_pose array");
    assert_eq!(pose.len(), 3);
    assert!(pose.iter().all(|c| c.as_f64().is_some()));

    let phases: Vec<&str> = v["phases"]
        .as_array()
        .expect("phases array")
        .iter()
        .filter_map(|p| p.as_str())
        .collect();
    assert_eq!(phases.first(), Some(&"Start"));
    assert_eq!(phases.last(), Some(&"Finish"));

    assert!(v.get("abort_reason").is_some());
    assert!(v["abort_reason"].is_null());
}

/// Validate the JSON error object for a run cut short by the max-run cap.
#[rstest]
fn json_abort_schema() {
    let dir = tempdir().unwrap();
    let cfg = write_config(&dir, "");

    let mut cmd = Command::cargo_bin("insertion").unwrap();
    cmd.arg("--json")
        .arg("--log-level")
        .arg("error")
        .arg("--config")
        .arg(&cfg)
        .arg("run")
        .arg("--max-run-ms")
        .arg("1");

    let out = cmd.assert().code(4).get_output().stdout.clone();
    let v = json_line(&out, "\"reason\"");

    assert_eq!(v["reason"], "MaxRuntime");
    assert_eq!(v["details"]["max_run_ms"], 1);
    assert!(v["message"].as_str().unwrap_or("").contains("max run time"));
}
