//! Configuration types for the insertion supervisor.
//!
//! These are the runtime configuration structs used by the state machine.
//! They are separate from the TOML-deserialized config in `insertion_config`.

use std::time::Duration;

use insertion_traits::{JointPositions, Point};

use crate::trajectory::SpiralParams;

/// Loop rate and motion-completion tolerances.
#[derive(Debug, Clone)]
pub struct ControlCfg {
    pub rate_hz: u32,
    /// A Cartesian target counts as reached within this distance.
    pub position_tolerance_m: f64,
    /// Every joint must be within this distance of the joint goal.
    pub joint_tolerance_rad: f64,
}

impl Default for ControlCfg {
    fn default() -> Self {
        Self {
            rate_hz: 100,
            position_tolerance_m: 0.001,
            joint_tolerance_rad: 0.01,
        }
    }
}

/// How `MoveToInitial` reaches the start pose.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum InitialMode {
    /// Joint-space move through the joint trajectory controller.
    #[default]
    Joint,
    /// Straight Cartesian approach through the impedance controller.
    Cartesian,
}

#[derive(Debug, Clone)]
pub struct InitialMove {
    pub mode: InitialMode,
    pub joints: JointPositions,
    pub position: Point,
    pub points: usize,
    pub duration: Duration,
    pub timeout_ms: u64,
}

impl Default for InitialMove {
    fn default() -> Self {
        Self {
            mode: InitialMode::Joint,
            // Tool-down ready pose of a 7-DoF arm.
            joints: [0.0, -0.785, 0.0, -2.356, 0.0, 1.571, 0.785],
            position: Point::new(0.5, 0.0, 0.1),
            points: 100,
            duration: Duration::from_millis(3_000),
            timeout_ms: 10_000,
        }
    }
}

#[derive(Debug, Clone)]
pub struct DescentCfg {
    /// Safety bound on travel below the entry pose without contact.
    pub max_distance_m: f64,
    pub points: usize,
}

impl Default for DescentCfg {
    fn default() -> Self {
        Self {
            max_distance_m: 0.10,
            points: 400,
        }
    }
}

#[derive(Debug, Clone)]
pub struct SpiralCfg {
    pub params: SpiralParams,
    /// The spiral plane sits this far below the contact height.
    pub press_depth_m: f64,
}

impl Default for SpiralCfg {
    fn default() -> Self {
        Self {
            params: SpiralParams::default(),
            press_depth_m: 0.002,
        }
    }
}

#[derive(Debug, Clone)]
pub struct InsertionCfg {
    pub depth_m: f64,
    pub points: usize,
    /// Drop below the contact height that counts as the peg entering the hole.
    pub hole_depth_threshold_m: f64,
    pub straighten_points: usize,
    pub wiggle_amplitude_m: f64,
    pub wiggle_cycles: u32,
    pub wiggle_points: usize,
    pub retract_m: f64,
    pub retract_points: usize,
}

impl Default for InsertionCfg {
    fn default() -> Self {
        Self {
            depth_m: 0.02,
            points: 200,
            hole_depth_threshold_m: 0.001,
            straighten_points: 50,
            wiggle_amplitude_m: 0.0005,
            wiggle_cycles: 3,
            wiggle_points: 150,
            retract_m: 0.05,
            retract_points: 200,
        }
    }
}

/// Everything that shapes the motion primitives of one insertion.
#[derive(Debug, Clone, Default)]
pub struct MotionCfg {
    pub control: ControlCfg,
    pub initial: InitialMove,
    pub descent: DescentCfg,
    pub spiral: SpiralCfg,
    pub insertion: InsertionCfg,
}

/// Force thresholds for contact classification.
#[derive(Debug, Clone)]
pub struct ContactCfg {
    pub force_threshold_n: f64,
    pub lateral_threshold_n: f64,
    pub bottom_threshold_n: f64,
    pub jam_force_n: f64,
    /// Consecutive samples over threshold needed to raise a flag (>= 1).
    pub debounce_n: u8,
}

impl Default for ContactCfg {
    fn default() -> Self {
        Self {
            force_threshold_n: 5.0,
            lateral_threshold_n: 3.0,
            bottom_threshold_n: 5.0,
            jam_force_n: 40.0,
            debounce_n: 2,
        }
    }
}

/// Safety configuration for runtime and per-phase bounds.
#[derive(Debug, Clone)]
pub struct SafetyCfg {
    /// Hard cap on a single insertion run in milliseconds.
    pub max_run_ms: u64,
    /// Bound on each motion phase after the initial move. 0 disables it.
    pub phase_timeout_ms: u64,
}

impl Default for SafetyCfg {
    fn default() -> Self {
        Self {
            max_run_ms: 120_000,
            phase_timeout_ms: 30_000,
        }
    }
}

/// Force sensor sampling.
#[derive(Debug, Clone)]
pub struct Timeouts {
    /// Max sensor wait per read (ms).
    pub sensor_ms: u64,
    pub sample_rate_hz: u32,
}

impl Default for Timeouts {
    fn default() -> Self {
        Self {
            sensor_ms: 20,
            sample_rate_hz: 500,
        }
    }
}

/// Low-level controller names as known to the controller manager.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ControllerNames {
    pub joint: String,
    pub impedance: String,
}

impl Default for ControllerNames {
    fn default() -> Self {
        Self {
            joint: "position_joint_trajectory_controller".to_string(),
            impedance: "cartesian_impedance_controller".to_string(),
        }
    }
}
