#![cfg_attr(all(not(debug_assertions), not(test)), deny(warnings))]
#![cfg_attr(
    all(not(debug_assertions), not(test)),
    deny(clippy::all, clippy::pedantic, clippy::nursery)
)]
#![allow(clippy::module_name_repetitions, clippy::missing_errors_doc)]
//! Config schema for the insertion supervisor.
//!
//! - `Config` and sub-structs are deserialized from TOML and validated.
//! - Impedance tables are keyed by snake_case phase name; the core crate
//!   checks that every motion phase has an entry when it builds the schedule.
use std::collections::BTreeMap;

use serde::Deserialize;
use serde::de::Deserializer;

/// Phase keys accepted under `[impedance.<key>]`.
pub const IMPEDANCE_PHASE_KEYS: [&str; 7] = [
    "move_to_initial",
    "external_down_movement",
    "spiral_motion",
    "internal_down_movement",
    "straightening",
    "insertion_wiggle",
    "internal_up_movement",
];

#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct ControlCfg {
    /// Tick rate of the supervisory loop.
    pub rate_hz: u32,
    /// Cartesian distance at which a motion target counts as reached.
    pub position_tolerance_m: f64,
    /// Per-joint distance at which the initial joint move counts as reached.
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

#[derive(Debug, Deserialize, Clone, Copy, Default, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum InitialMode {
    /// Joint-space move through the joint trajectory controller.
    #[default]
    Joint,
    /// Cartesian approach streamed through the impedance controller.
    Cartesian,
}

#[derive(Debug, Deserialize)]
pub struct InitialCfg {
    #[serde(default)]
    pub mode: InitialMode,
    /// Joint goal for the joint-space move (7 angles, rad).
    pub joints: [f64; 7],
    /// Cartesian start pose above the search area. Accepts `[x, y, z]` or `{ x, y, z }`.
    #[serde(deserialize_with = "de_point")]
    pub position: [f64; 3],
    #[serde(default = "default_initial_points")]
    pub points: usize,
    /// Duration of the joint-space move.
    #[serde(default = "default_initial_duration_ms")]
    pub duration_ms: u64,
    #[serde(default = "default_initial_timeout_ms")]
    pub timeout_ms: u64,
}

fn default_initial_points() -> usize {
    100
}
fn default_initial_duration_ms() -> u64 {
    3_000
}
fn default_initial_timeout_ms() -> u64 {
    10_000
}

#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct DescentCfg {
    /// Safety bound: maximum descent from the start pose without contact.
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

#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct SpiralCfg {
    /// Initial radius offset (m).
    pub a: f64,
    /// Radial growth per radian (m/rad).
    pub b: f64,
    pub points: usize,
    /// Number of turns; ignored when `search_radius_m` is set.
    pub revolutions: f64,
    /// Radius the search must cover; derives the number of turns from `a` and `b`.
    pub search_radius_m: Option<f64>,
    /// Helical variant: descent per revolution (0 keeps z constant).
    pub pitch_m: f64,
    /// Offset below the contact height so the peg stays pressed on the surface.
    pub press_depth_m: f64,
}

impl Default for SpiralCfg {
    fn default() -> Self {
        Self {
            a: 0.0,
            b: 0.0004,
            points: 1000,
            revolutions: 5.0,
            search_radius_m: None,
            pitch_m: 0.0,
            press_depth_m: 0.002,
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct InsertionCfg {
    pub depth_m: f64,
    pub points: usize,
    /// Drop below the contact height that counts as finding the hole.
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

#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct ContactCfg {
    /// Axial force that counts as surface contact during descent.
    pub force_threshold_n: f64,
    /// In-plane force that counts as the peg catching the hole rim.
    pub lateral_threshold_n: f64,
    /// Axial force that counts as the peg bottoming out in the hole.
    pub bottom_threshold_n: f64,
    /// Axial force that aborts insertion as jammed.
    pub jam_force_n: f64,
    /// Consecutive samples over threshold needed to raise a contact flag.
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

#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct SensorCfg {
    pub sample_rate_hz: u32,
    pub read_timeout_ms: u64,
}

impl Default for SensorCfg {
    fn default() -> Self {
        Self {
            sample_rate_hz: 500,
            read_timeout_ms: 20,
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct Safety {
    /// Hard cap on one insertion run (0 selects the core default).
    pub max_run_ms: u64,
    /// Bound on every motion phase after the initial move.
    pub phase_timeout_ms: u64,
}

impl Default for Safety {
    fn default() -> Self {
        Self {
            max_run_ms: 0,
            phase_timeout_ms: 30_000,
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct Controllers {
    pub joint: String,
    pub impedance: String,
}

impl Default for Controllers {
    fn default() -> Self {
        Self {
            joint: "position_joint_trajectory_controller".to_string(),
            impedance: "cartesian_impedance_controller".to_string(),
        }
    }
}

#[derive(Debug, Deserialize, Clone, Copy, PartialEq)]
pub struct ImpedanceRow {
    /// Translational x, y, z then rotational x, y, z.
    pub stiffness: [f64; 6],
    pub damping: [f64; 6],
}

#[derive(Debug, Deserialize)]
pub struct ImpedanceTable {
    /// Controller default, used for Start, Finish and Idle.
    pub default: ImpedanceRow,
    #[serde(flatten)]
    pub phases: BTreeMap<String, ImpedanceRow>,
}

#[derive(Debug, Deserialize, Default)]
#[serde(default)]
pub struct Logging {
    pub file: Option<String>,  // path to .log (JSON lines)
    pub level: Option<String>, // "info","debug"
    /// Log rotation policy: "never" | "daily" | "hourly" (default: never)
    pub rotation: Option<String>,
}

/// Optional CSV dump of generated Cartesian trajectories.
#[derive(Debug, Deserialize)]
pub struct TrajectoryLog {
    pub path: String,
    #[serde(default)]
    pub append: bool,
}

/// Simulated backend parameters (CLI only).
#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct SimCfg {
    pub surface_z: f64,
    pub hole_x: f64,
    pub hole_y: f64,
    pub hole_radius_m: f64,
    pub hole_depth_m: f64,
    #[serde(deserialize_with = "de_point")]
    pub start_position: [f64; 3],
    /// Controller name whose switch is rejected (failure injection).
    pub fail_switch_to: Option<String>,
    /// Start with a silent force sensor (failure injection).
    pub sensor_offline: bool,
}

impl Default for SimCfg {
    fn default() -> Self {
        Self {
            surface_z: 0.05,
            hole_x: 0.5025,
            hole_y: 0.0025,
            hole_radius_m: 0.0015,
            hole_depth_m: 0.015,
            start_position: [0.3, 0.0, 0.3],
            fail_switch_to: None,
            sensor_offline: false,
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub control: ControlCfg,
    pub initial: InitialCfg,
    #[serde(default)]
    pub descent: DescentCfg,
    #[serde(default)]
    pub spiral: SpiralCfg,
    #[serde(default)]
    pub insertion: InsertionCfg,
    #[serde(default)]
    pub contact: ContactCfg,
    #[serde(default)]
    pub sensor: SensorCfg,
    #[serde(default)]
    pub safety: Safety,
    #[serde(default)]
    pub controllers: Controllers,
    pub impedance: ImpedanceTable,
    #[serde(default)]
    pub logging: Logging,
    #[serde(default)]
    pub trajectory_log: Option<TrajectoryLog>,
    #[serde(default)]
    pub sim: SimCfg,
}

pub fn load_toml(s: &str) -> Result<Config, toml::de::Error> {
    toml::from_str::<Config>(s)
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum PointToml {
    Array([f64; 3]),
    Table { x: f64, y: f64, z: f64 },
}

fn de_point<'de, D>(deserializer: D) -> Result<[f64; 3], D::Error>
where
    D: Deserializer<'de>,
{
    Ok(match PointToml::deserialize(deserializer)? {
        PointToml::Array(p) => p,
        PointToml::Table { x, y, z } => [x, y, z],
    })
}

fn check_row(name: &str, row: &ImpedanceRow) -> eyre::Result<()> {
    for (label, values) in [("stiffness", &row.stiffness), ("damping", &row.damping)] {
        if values.iter().any(|v| !v.is_finite() || *v < 0.0) {
            eyre::bail!("impedance.{name}.{label} components must be finite and >= 0");
        }
    }
    Ok(())
}

impl Config {
    pub fn validate(&self) -> eyre::Result<()> {
        // Control
        if self.control.rate_hz == 0 {
            eyre::bail!("control.rate_hz must be > 0");
        }
        if self.control.rate_hz > 10_000 {
            eyre::bail!("control.rate_hz is unreasonably large (>10kHz)");
        }
        if !(self.control.position_tolerance_m > 0.0) {
            eyre::bail!("control.position_tolerance_m must be > 0");
        }
        if !(self.control.joint_tolerance_rad > 0.0) {
            eyre::bail!("control.joint_tolerance_rad must be > 0");
        }

        // Initial move
        if self.initial.points < 2 {
            eyre::bail!("initial.points must be >= 2");
        }
        if self.initial.timeout_ms == 0 {
            eyre::bail!("initial.timeout_ms must be >= 1");
        }
        if self.initial.duration_ms >= self.initial.timeout_ms {
            eyre::bail!("initial.duration_ms must be shorter than initial.timeout_ms");
        }
        if self.initial.joints.iter().any(|j| !j.is_finite()) {
            eyre::bail!("initial.joints must be finite");
        }
        if self.initial.position.iter().any(|v| !v.is_finite()) {
            eyre::bail!("initial.position must be finite");
        }

        // Descent
        if !(self.descent.max_distance_m > 0.0) {
            eyre::bail!("descent.max_distance_m must be > 0");
        }
        if self.descent.points < 2 {
            eyre::bail!("descent.points must be >= 2");
        }

        // Spiral
        if self.spiral.points == 0 {
            eyre::bail!("spiral.points must be >= 1");
        }
        if !(self.spiral.b > 0.0) {
            eyre::bail!("spiral.b must be > 0");
        }
        if !(self.spiral.a >= 0.0) {
            eyre::bail!("spiral.a must be >= 0");
        }
        match self.spiral.search_radius_m {
            Some(r) if !(r > self.spiral.a) => {
                eyre::bail!("spiral.search_radius_m must exceed spiral.a");
            }
            Some(_) => {}
            None if !(self.spiral.revolutions > 0.0) => {
                eyre::bail!("spiral.revolutions must be > 0");
            }
            None => {}
        }
        if !(self.spiral.pitch_m >= 0.0) {
            eyre::bail!("spiral.pitch_m must be >= 0");
        }
        if !(self.spiral.press_depth_m >= 0.0) {
            eyre::bail!("spiral.press_depth_m must be >= 0");
        }
        // The spiral plays one point per tick; it must fit inside the phase bound.
        let spiral_ms = (self.spiral.points as u64).saturating_mul(1000)
            / u64::from(self.control.rate_hz.max(1));
        if self.safety.phase_timeout_ms > 0 && spiral_ms >= self.safety.phase_timeout_ms {
            eyre::bail!(
                "spiral.points at control.rate_hz takes {spiral_ms} ms, exceeding safety.phase_timeout_ms"
            );
        }

        // Insertion
        if !(self.insertion.depth_m > 0.0) {
            eyre::bail!("insertion.depth_m must be > 0");
        }
        if self.insertion.points < 2 {
            eyre::bail!("insertion.points must be >= 2");
        }
        if !(self.insertion.hole_depth_threshold_m > 0.0) {
            eyre::bail!("insertion.hole_depth_threshold_m must be > 0");
        }
        // The deepest point of the spiral has to reach past the drop that
        // counts as finding the hole, or the search can never succeed.
        let revolutions = match self.spiral.search_radius_m {
            Some(r) => ((r - self.spiral.a) / (std::f64::consts::TAU * self.spiral.b)).ceil(),
            None => self.spiral.revolutions,
        };
        let reach = self.spiral.press_depth_m + self.spiral.pitch_m * revolutions;
        if !(reach > self.insertion.hole_depth_threshold_m) {
            eyre::bail!(
                "spiral.press_depth_m + spiral.pitch_m * revolutions ({reach}) must exceed insertion.hole_depth_threshold_m"
            );
        }
        if self.insertion.straighten_points == 0 {
            eyre::bail!("insertion.straighten_points must be >= 1");
        }
        if !(self.insertion.wiggle_amplitude_m >= 0.0) {
            eyre::bail!("insertion.wiggle_amplitude_m must be >= 0");
        }
        if self.insertion.wiggle_cycles == 0 {
            eyre::bail!("insertion.wiggle_cycles must be >= 1");
        }
        if self.insertion.wiggle_points < 2 {
            eyre::bail!("insertion.wiggle_points must be >= 2");
        }
        if !(self.insertion.retract_m > 0.0) {
            eyre::bail!("insertion.retract_m must be > 0");
        }
        if self.insertion.retract_points < 2 {
            eyre::bail!("insertion.retract_points must be >= 2");
        }

        // Contact
        if !(self.contact.force_threshold_n > 0.0) {
            eyre::bail!("contact.force_threshold_n must be > 0");
        }
        if !(self.contact.lateral_threshold_n > 0.0) {
            eyre::bail!("contact.lateral_threshold_n must be > 0");
        }
        if !(self.contact.bottom_threshold_n > 0.0) {
            eyre::bail!("contact.bottom_threshold_n must be > 0");
        }
        if !(self.contact.jam_force_n > self.contact.bottom_threshold_n) {
            eyre::bail!("contact.jam_force_n must exceed contact.bottom_threshold_n");
        }
        if self.contact.debounce_n == 0 {
            eyre::bail!("contact.debounce_n must be >= 1");
        }

        // Sensor
        if self.sensor.sample_rate_hz == 0 {
            eyre::bail!("sensor.sample_rate_hz must be > 0");
        }
        if self.sensor.read_timeout_ms == 0 {
            eyre::bail!("sensor.read_timeout_ms must be >= 1");
        }

        // Controllers
        if self.controllers.joint.trim().is_empty() || self.controllers.impedance.trim().is_empty()
        {
            eyre::bail!("controllers.joint and controllers.impedance must be non-empty");
        }
        if self.controllers.joint == self.controllers.impedance {
            eyre::bail!("controllers.joint and controllers.impedance must differ");
        }

        // Impedance
        check_row("default", &self.impedance.default)?;
        for (name, row) in &self.impedance.phases {
            if !IMPEDANCE_PHASE_KEYS.contains(&name.as_str()) {
                eyre::bail!("impedance.{name} is not a known phase");
            }
            check_row(name, row)?;
        }

        // Trajectory log
        if let Some(log) = &self.trajectory_log
            && log.path.trim().is_empty()
        {
            eyre::bail!("trajectory_log.path must be non-empty");
        }

        // Sim
        if !(self.sim.hole_radius_m > 0.0) {
            eyre::bail!("sim.hole_radius_m must be > 0");
        }
        if !(self.sim.hole_depth_m > 0.0) {
            eyre::bail!("sim.hole_depth_m must be > 0");
        }

        Ok(())
    }
}
