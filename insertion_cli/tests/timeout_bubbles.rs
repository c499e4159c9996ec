use assert_cmd::prelude::*;
use predicates::prelude::*;
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

#[rstest]
fn silent_force_sensor_bubbles_to_cli() {
    let dir = tempdir().unwrap();
    // Long descent keeps the run alive until the stall watchdog fires.
    let cfg = write_config(&dir, "[sim]\nsensor_offline = true");
    let text = fs::read_to_string(&cfg)
        .unwrap()
        .replace("points = 200", "points = 4000");
    fs::write(&cfg, text).unwrap();

    let mut cmd = Command::cargo_bin("insertion").unwrap();
    cmd.arg("--config").arg(&cfg).arg("run");
    cmd.assert()
        .code(6)
        .stderr(predicate::str::contains("What happened: Timed out"));
}

#[rstest]
fn self_check_times_out_on_silent_sensor() {
    let dir = tempdir().unwrap();
    let cfg = write_config(&dir, "[sim]\nsensor_offline = true");

    let mut cmd = Command::cargo_bin("insertion").unwrap();
    cmd.arg("--config").arg(&cfg).arg("self-check");
    cmd.assert()
        .failure()
        .stderr(predicate::str::contains("force sensor probe failed"));
}
