//! `From`/`TryFrom` implementations bridging `insertion_config` types to `insertion_core` types.

use std::time::Duration;

use insertion_traits::Point;

use crate::config::{
    ContactCfg, ControlCfg, ControllerNames, DescentCfg, InitialMode, InitialMove, InsertionCfg,
    MotionCfg, SafetyCfg, SpiralCfg, Timeouts,
};
use crate::error::InsertionError;
use crate::impedance::{Axes6, ImpedanceParameters, ImpedanceSchedule};
use crate::phase::Phase;
use crate::trajectory::{SpiralParams, revolutions_to_cover};

fn point(p: [f64; 3]) -> Point {
    Point::new(p[0], p[1], p[2])
}

// ── Motion ───────────────────────────────────────────────────────────────────

impl From<&insertion_config::ControlCfg> for ControlCfg {
    fn from(c: &insertion_config::ControlCfg) -> Self {
        Self {
            rate_hz: c.rate_hz,
            position_tolerance_m: c.position_tolerance_m,
            joint_tolerance_rad: c.joint_tolerance_rad,
        }
    }
}

impl From<insertion_config::InitialMode> for InitialMode {
    fn from(m: insertion_config::InitialMode) -> Self {
        match m {
            insertion_config::InitialMode::Joint => InitialMode::Joint,
            insertion_config::InitialMode::Cartesian => InitialMode::Cartesian,
        }
    }
}

impl From<&insertion_config::InitialCfg> for InitialMove {
    fn from(c: &insertion_config::InitialCfg) -> Self {
        Self {
            mode: c.mode.into(),
            joints: c.joints,
            position: point(c.position),
            points: c.points,
            duration: Duration::from_millis(c.duration_ms),
            timeout_ms: c.timeout_ms,
        }
    }
}

impl From<&insertion_config::DescentCfg> for DescentCfg {
    fn from(c: &insertion_config::DescentCfg) -> Self {
        Self {
            max_distance_m: c.max_distance_m,
            points: c.points,
        }
    }
}

/// Fails when `search_radius_m` cannot be covered by the configured spiral.
impl TryFrom<&insertion_config::SpiralCfg> for SpiralCfg {
    type Error = InsertionError;

    fn try_from(c: &insertion_config::SpiralCfg) -> Result<Self, Self::Error> {
        let revolutions = match c.search_radius_m {
            Some(r) => revolutions_to_cover(r, c.a, c.b)?,
            None => c.revolutions,
        };
        Ok(Self {
            params: SpiralParams {
                a: c.a,
                b: c.b,
                points: c.points,
                revolutions,
                pitch_m: c.pitch_m,
            },
            press_depth_m: c.press_depth_m,
        })
    }
}

impl From<&insertion_config::InsertionCfg> for InsertionCfg {
    fn from(c: &insertion_config::InsertionCfg) -> Self {
        Self {
            depth_m: c.depth_m,
            points: c.points,
            hole_depth_threshold_m: c.hole_depth_threshold_m,
            straighten_points: c.straighten_points,
            wiggle_amplitude_m: c.wiggle_amplitude_m,
            wiggle_cycles: c.wiggle_cycles,
            wiggle_points: c.wiggle_points,
            retract_m: c.retract_m,
            retract_points: c.retract_points,
        }
    }
}

impl TryFrom<&insertion_config::Config> for MotionCfg {
    type Error = InsertionError;

    fn try_from(c: &insertion_config::Config) -> Result<Self, Self::Error> {
        Ok(Self {
            control: (&c.control).into(),
            initial: (&c.initial).into(),
            descent: (&c.descent).into(),
            spiral: SpiralCfg::try_from(&c.spiral)?,
            insertion: (&c.insertion).into(),
        })
    }
}

// ── Contact / safety / sensor ────────────────────────────────────────────────

impl From<&insertion_config::ContactCfg> for ContactCfg {
    fn from(c: &insertion_config::ContactCfg) -> Self {
        Self {
            force_threshold_n: c.force_threshold_n,
            lateral_threshold_n: c.lateral_threshold_n,
            bottom_threshold_n: c.bottom_threshold_n,
            jam_force_n: c.jam_force_n,
            debounce_n: c.debounce_n,
        }
    }
}

/// `max_run_ms = 0` in TOML selects the core default.
impl From<&insertion_config::Safety> for SafetyCfg {
    fn from(c: &insertion_config::Safety) -> Self {
        let default = SafetyCfg::default();
        Self {
            max_run_ms: if c.max_run_ms == 0 {
                default.max_run_ms
            } else {
                c.max_run_ms
            },
            phase_timeout_ms: c.phase_timeout_ms,
        }
    }
}

impl From<&insertion_config::SensorCfg> for Timeouts {
    fn from(c: &insertion_config::SensorCfg) -> Self {
        Self {
            sensor_ms: c.read_timeout_ms,
            sample_rate_hz: c.sample_rate_hz,
        }
    }
}

impl From<&insertion_config::Controllers> for ControllerNames {
    fn from(c: &insertion_config::Controllers) -> Self {
        Self {
            joint: c.joint.clone(),
            impedance: c.impedance.clone(),
        }
    }
}

// ── Impedance ────────────────────────────────────────────────────────────────

impl From<&insertion_config::ImpedanceRow> for ImpedanceParameters {
    fn from(r: &insertion_config::ImpedanceRow) -> Self {
        Self::new(Axes6::from_array(r.stiffness), Axes6::from_array(r.damping))
    }
}

/// Reports `MissingConfiguration` for the first motion phase without a row.
impl TryFrom<&insertion_config::ImpedanceTable> for ImpedanceSchedule {
    type Error = InsertionError;

    fn try_from(t: &insertion_config::ImpedanceTable) -> Result<Self, Self::Error> {
        let mut rows = Vec::with_capacity(t.phases.len());
        for (key, row) in &t.phases {
            let phase: Phase = key.parse().map_err(|_| {
                InsertionError::InvalidParameter(format!("impedance.{key} is not a known phase"))
            })?;
            rows.push((phase, ImpedanceParameters::from(row)));
        }
        ImpedanceSchedule::new((&t.default).into(), rows)
    }
}
