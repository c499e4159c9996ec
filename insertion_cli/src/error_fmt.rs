//! Human-readable error descriptions and structured JSON error formatting.

use crate::cli::LAST_SAFETY;
use crate::run::abort_reason_name;

/// Map an eyre::Report to a human-readable explanation with likely causes and fix hints.
pub fn humanize(err: &eyre::Report) -> String {
    use insertion_core::error::{AbortReason, BuildError, InsertionError};

    if let Some(be) = err.downcast_ref::<BuildError>() {
        return match be {
            BuildError::MissingArm => {
                "What happened: No arm was provided to the supervisor.\nLikely causes: The arm driver failed to initialize or was not wired into the builder.\nHow to fix: Ensure the arm is created successfully and passed via with_arm(...).".to_string()
            }
            BuildError::MissingControllers => {
                "What happened: No controller manager was provided to the supervisor.\nLikely causes: The controller manager failed to initialize.\nHow to fix: Pass a controller manager via with_controllers(...).".to_string()
            }
            BuildError::MissingSchedule => {
                "What happened: No impedance schedule was provided.\nLikely causes: The [impedance] table is missing or was not wired into the builder.\nHow to fix: Add an [impedance.default] row plus one row per motion phase.".to_string()
            }
            BuildError::InvalidConfig(msg) => format!(
                "What happened: Invalid configuration ({msg}).\nLikely causes: Missing or out-of-range values in the TOML.\nHow to fix: Edit the config file, then rerun. See etc/insertion.toml for a sample."
            ),
        };
    }

    if let Some(ie) = err.downcast_ref::<InsertionError>() {
        return match ie {
            InsertionError::Timeout(what) => format!(
                "What happened: Timed out ({what}).\nLikely causes: Force sensor not publishing, arm not reaching its goal, or timeouts configured too low.\nHow to fix: Check the sensor and arm, and consider raising sensor.read_timeout_ms or safety.phase_timeout_ms."
            ),
            InsertionError::ControllerSwitchFailed { from, to, reason } => format!(
                "What happened: The controller manager refused to switch {from} -> {to} ({reason}).\nLikely causes: Controller not loaded, wrong controller active, or a driver fault.\nHow to fix: Check [controllers] names, then request the phase again."
            ),
            InsertionError::MissingConfiguration(phase) => format!(
                "What happened: No impedance row for phase {phase}.\nLikely causes: The [impedance] table lacks an entry for this phase.\nHow to fix: Add a row for this phase under [impedance] in the config."
            ),
            InsertionError::SafetyBoundExceeded(what) => format!(
                "What happened: Safety bound exceeded ({what}).\nLikely causes: Peg jammed in the hole, no surface within the descent range, or a misplaced hole.\nHow to fix: Inspect the workpiece; adjust contact.jam_force_n or descent.max_distance_m if needed."
            ),
            InsertionError::Aborted(reason) => match reason {
                AbortReason::Shutdown => "What happened: Shutdown was requested.\nLikely causes: Ctrl-C or a supervising process stopped the run.\nHow to fix: Start a new run when ready.".to_string(),
                AbortReason::Paused => "What happened: The run was parked in Idle before finishing.\nLikely causes: An operator requested Idle.\nHow to fix: Start a new run, or request a phase to resume.".to_string(),
                AbortReason::MaxRuntime => "max run time was exceeded.\nLikely causes: Slow control rate, long trajectories, or a search that never found the hole.\nHow to fix: Increase safety.max_run_ms or shorten the trajectories.".to_string(),
            },
            other => format!(
                "What happened: {other}.\nLikely causes: See logs.\nHow to fix: Re-run with --log-level=debug or set RUST_LOG for more detail."
            ),
        };
    }

    let msg = err.to_string();
    let lower = msg.to_ascii_lowercase();

    if lower.contains("invalid configuration") {
        let cause = err.root_cause();
        return format!(
            "What happened: Configuration is invalid or incomplete ({cause}).\nLikely causes: Missing sections such as [initial] or [impedance], or out-of-range values.\nHow to fix: Edit the TOML config and try again."
        );
    }
    if lower.contains("failed to parse config") || lower.contains("failed to read config") {
        let cause = err.root_cause();
        return format!(
            "What happened: {msg}.\nLikely causes: {cause}\nHow to fix: Check the path given to --config and the TOML syntax."
        );
    }

    let mut cause = String::new();
    if let Some(src) = err.source() {
        cause = format!(" Cause: {src}");
    }
    format!(
        "Something went wrong.{cause}\nHow to fix: Re-run with --log-level=debug for details. Original: {msg}"
    )
}

/// Stable exit codes per failure kind; anything untyped exits with 1.
pub fn exit_code_for_error(err: &eyre::Report) -> i32 {
    use insertion_core::error::{AbortReason, InsertionError};
    match err.downcast_ref::<InsertionError>() {
        Some(InsertionError::Aborted(AbortReason::Shutdown)) => 2,
        Some(InsertionError::Aborted(AbortReason::Paused)) => 3,
        Some(InsertionError::Aborted(AbortReason::MaxRuntime)) => 4,
        Some(InsertionError::SafetyBoundExceeded(_)) => 5,
        Some(InsertionError::Timeout(_)) => 6,
        Some(InsertionError::ControllerSwitchFailed { .. }) => 7,
        _ => 1,
    }
}

/// Structured JSON for errors when --json is enabled.
pub fn format_error_json(err: &eyre::Report) -> String {
    use insertion_core::error::{AbortReason, InsertionError};
    use serde_json::json;

    let msg = humanize(err);
    let details = LAST_SAFETY.get();
    let (reason, detail_obj) = match err.downcast_ref::<InsertionError>() {
        Some(InsertionError::Aborted(r)) => {
            let d = match r {
                AbortReason::MaxRuntime => details.map(|s| json!({ "max_run_ms": s.max_run_ms })),
                _ => None,
            };
            (abort_reason_name(r), d)
        }
        Some(InsertionError::SafetyBoundExceeded(_)) => (
            "SafetyBound",
            details.map(|s| json!({ "jam_force_n": s.jam_force_n, "max_descent_m": s.max_descent_m })),
        ),
        Some(InsertionError::Timeout(_)) => (
            "Timeout",
            details.map(|s| json!({ "phase_timeout_ms": s.phase_timeout_ms })),
        ),
        Some(InsertionError::ControllerSwitchFailed { .. }) => ("ControllerSwitchFailed", None),
        _ => ("Error", None),
    };

    match detail_obj {
        Some(d) => json!({ "reason": reason, "details": d, "message": msg }),
        None => json!({ "reason": reason, "message": msg }),
    }
    .to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use insertion_core::error::{AbortReason, InsertionError};
    use rstest::rstest;

    #[rstest]
    #[case(InsertionError::Aborted(AbortReason::Shutdown), 2)]
    #[case(InsertionError::Aborted(AbortReason::Paused), 3)]
    #[case(InsertionError::Aborted(AbortReason::MaxRuntime), 4)]
    #[case(InsertionError::SafetyBoundExceeded("jam".into()), 5)]
    #[case(InsertionError::Timeout("sensor".into()), 6)]
    #[case(
        InsertionError::ControllerSwitchFailed { from: "a".into(), to: "b".into(), reason: "no".into() },
        7
    )]
    #[case(InsertionError::InvalidStateName("x".into()), 1)]
    fn exit_codes(#[case] e: InsertionError, #[case] code: i32) {
        assert_eq!(exit_code_for_error(&eyre::Report::new(e)), code);
    }

    #[test]
    fn untyped_errors_exit_with_one() {
        assert_eq!(exit_code_for_error(&eyre::eyre!("boom")), 1);
    }

    #[test]
    fn max_runtime_mentions_max_run_time() {
        let e = eyre::Report::new(InsertionError::Aborted(AbortReason::MaxRuntime));
        assert!(humanize(&e).contains("max run time"));
    }

    #[test]
    fn json_error_has_reason_and_message() {
        let e = eyre::Report::new(InsertionError::Timeout("force sensor".into()));
        let v: serde_json::Value = serde_json::from_str(&format_error_json(&e)).unwrap();
        assert_eq!(v["reason"], "Timeout");
        assert!(v["message"].as_str().unwrap().contains("Timed out"));
    }
}
