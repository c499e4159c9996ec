//! Pure waypoint generators.
//!
//! Every generator is deterministic in its inputs and holds no state, so the
//! same parameters always replay the same motion. Cartesian trajectories keep
//! the tool orientation fixed; only positions are produced.

use std::f64::consts::TAU;
use std::time::Duration;

use insertion_traits::{JOINT_COUNT, JointPositions, Point};

use crate::error::InsertionError;

/// Ordered, immutable sequence of Cartesian waypoints. Index order is execution order.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Trajectory {
    points: Vec<Point>,
}

impl Trajectory {
    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    pub fn points(&self) -> &[Point] {
        &self.points
    }

    pub fn first(&self) -> Option<&Point> {
        self.points.first()
    }

    pub fn last(&self) -> Option<&Point> {
        self.points.last()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Point> {
        self.points.iter()
    }

    pub fn into_points(self) -> Vec<Point> {
        self.points
    }
}

impl<'a> IntoIterator for &'a Trajectory {
    type Item = &'a Point;
    type IntoIter = std::slice::Iter<'a, Point>;

    fn into_iter(self) -> Self::IntoIter {
        self.points.iter()
    }
}

/// Joint-space waypoints with a fixed spacing in time.
#[derive(Debug, Clone, PartialEq)]
pub struct JointTrajectory {
    pub waypoints: Vec<JointPositions>,
    pub interval: Duration,
}

impl JointTrajectory {
    pub fn goal(&self) -> Option<&JointPositions> {
        self.waypoints.last()
    }
}

/// Archimedean spiral parameters: r(θ) = a + bθ over `revolutions` turns.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SpiralParams {
    /// Radius at θ = 0 (m).
    pub a: f64,
    /// Radial growth per radian (m/rad).
    pub b: f64,
    pub points: usize,
    pub revolutions: f64,
    /// z drop per revolution; 0 keeps the spiral planar.
    pub pitch_m: f64,
}

impl Default for SpiralParams {
    fn default() -> Self {
        Self {
            a: 0.0,
            b: 0.0004,
            points: 1000,
            revolutions: 5.0,
            pitch_m: 0.0,
        }
    }
}

fn invalid(msg: impl Into<String>) -> InsertionError {
    InsertionError::InvalidParameter(msg.into())
}

fn check_points(n: usize, min: usize, what: &str) -> Result<(), InsertionError> {
    if n < min {
        return Err(invalid(format!("{what}: need at least {min} points, got {n}")));
    }
    Ok(())
}

fn check_point(p: &Point, what: &str) -> Result<(), InsertionError> {
    if !p.is_finite() {
        return Err(invalid(format!("{what}: non-finite coordinate")));
    }
    Ok(())
}

/// Turns needed for the spiral to reach `radius`, rounded up to a whole turn.
pub fn revolutions_to_cover(radius: f64, a: f64, b: f64) -> Result<f64, InsertionError> {
    if !(b > 0.0) || !b.is_finite() {
        return Err(invalid("spiral: b must be > 0"));
    }
    if !(a >= 0.0) || !(radius > a) || !radius.is_finite() {
        return Err(invalid("spiral: search radius must exceed a >= 0"));
    }
    Ok(((radius - a) / (TAU * b)).ceil())
}

/// Spiral around `origin` in the horizontal plane, first point at θ = 0.
pub fn generate_archimedean_spiral(
    origin: Point,
    params: &SpiralParams,
) -> Result<Trajectory, InsertionError> {
    let SpiralParams {
        a,
        b,
        points: n,
        revolutions,
        pitch_m,
    } = *params;
    check_points(n, 1, "spiral")?;
    check_point(&origin, "spiral origin")?;
    if !(b > 0.0) || !b.is_finite() {
        return Err(invalid("spiral: b must be > 0"));
    }
    if !(a >= 0.0) || !a.is_finite() {
        return Err(invalid("spiral: a must be >= 0"));
    }
    if !(revolutions > 0.0) || !revolutions.is_finite() {
        return Err(invalid("spiral: revolutions must be > 0"));
    }
    if !(pitch_m >= 0.0) || !pitch_m.is_finite() {
        return Err(invalid("spiral: pitch must be >= 0"));
    }

    let theta_max = TAU * revolutions;
    let step = if n > 1 {
        theta_max / (n - 1) as f64
    } else {
        0.0
    };
    let points = (0..n)
        .map(|i| {
            let theta = step * i as f64;
            let r = a + b * theta;
            Point {
                x: origin.x + r * theta.cos(),
                y: origin.y + r * theta.sin(),
                z: origin.z - pitch_m * theta / TAU,
            }
        })
        .collect();
    Ok(Trajectory { points })
}

fn linear(from: Point, to: Point, n: usize, what: &str) -> Result<Trajectory, InsertionError> {
    check_points(n, 2, what)?;
    check_point(&from, what)?;
    check_point(&to, what)?;
    let last = (n - 1) as f64;
    let points = (0..n).map(|i| from.lerp(&to, i as f64 / last)).collect();
    Ok(Trajectory { points })
}

fn check_distance(distance: f64, what: &str) -> Result<(), InsertionError> {
    if !(distance > 0.0) || !distance.is_finite() {
        return Err(invalid(format!("{what}: distance must be > 0")));
    }
    Ok(())
}

/// Straight-line approach from the current pose to the start pose.
pub fn generate_initial_position_trajectory(
    from: Point,
    to: Point,
    n: usize,
) -> Result<Trajectory, InsertionError> {
    linear(from, to, n, "initial position")
}

/// Vertical descent of `distance` towards the surface.
pub fn generate_external_down_trajectory(
    from: Point,
    distance: f64,
    n: usize,
) -> Result<Trajectory, InsertionError> {
    check_distance(distance, "external down")?;
    let to = Point { z: from.z - distance, ..from };
    linear(from, to, n, "external down")
}

/// Vertical push of `distance` into the hole.
pub fn generate_internal_down_trajectory(
    from: Point,
    distance: f64,
    n: usize,
) -> Result<Trajectory, InsertionError> {
    check_distance(distance, "internal down")?;
    let to = Point { z: from.z - distance, ..from };
    linear(from, to, n, "internal down")
}

/// Vertical retract of `distance` out of the hole.
pub fn generate_internal_up_trajectory(
    from: Point,
    distance: f64,
    n: usize,
) -> Result<Trajectory, InsertionError> {
    check_distance(distance, "internal up")?;
    let to = Point { z: from.z + distance, ..from };
    linear(from, to, n, "internal up")
}

/// Joint-space interpolation for the initial move; `duration` is spread evenly over the segments.
pub fn generate_joint_trajectory(
    from: JointPositions,
    to: JointPositions,
    n: usize,
    duration: Duration,
) -> Result<JointTrajectory, InsertionError> {
    check_points(n, 2, "joint trajectory")?;
    if from.iter().chain(to.iter()).any(|q| !q.is_finite()) {
        return Err(invalid("joint trajectory: non-finite joint angle"));
    }
    let steps = u32::try_from(n - 1)
        .map_err(|_| invalid("joint trajectory: too many points for one duration"))?;
    let last = (n - 1) as f64;
    let waypoints = (0..n)
        .map(|i| {
            let t = i as f64 / last;
            let mut q = [0.0; JOINT_COUNT];
            for (j, q_j) in q.iter_mut().enumerate() {
                *q_j = from[j] + (to[j] - from[j]) * t;
            }
            q
        })
        .collect();
    let interval = duration / steps;
    Ok(JointTrajectory {
        waypoints,
        interval,
    })
}

/// `n` repetitions of `point`: the arm re-asserts one equilibrium for `n` ticks.
pub fn generate_hold(point: Point, n: usize) -> Result<Trajectory, InsertionError> {
    check_points(n, 1, "hold")?;
    check_point(&point, "hold")?;
    Ok(Trajectory {
        points: vec![point; n],
    })
}

/// Sinusoidal x/y oscillation about `center`, starting and ending on it.
pub fn generate_wiggle(
    center: Point,
    amplitude: f64,
    cycles: u32,
    n: usize,
) -> Result<Trajectory, InsertionError> {
    check_points(n, 2, "wiggle")?;
    check_point(&center, "wiggle")?;
    if !(amplitude >= 0.0) || !amplitude.is_finite() {
        return Err(invalid("wiggle: amplitude must be >= 0"));
    }
    if cycles == 0 {
        return Err(invalid("wiggle: cycles must be >= 1"));
    }
    let last = (n - 1) as f64;
    let points = (0..n)
        .map(|i| {
            let phase = TAU * f64::from(cycles) * i as f64 / last;
            Point {
                x: center.x + amplitude * phase.sin(),
                // Double frequency in y traces a figure-eight.
                y: center.y + 0.5 * amplitude * (2.0 * phase).sin(),
                z: center.z,
            }
        })
        .collect();
    Ok(Trajectory { points })
}

#[cfg(test)]
mod tests {
    use super::*;

    const ORIGIN: Point = Point::new(0.5, 0.0, 0.05);

    #[test]
    fn spiral_starts_at_origin_offset_by_a() {
        let p = SpiralParams {
            a: 0.001,
            points: 10,
            ..SpiralParams::default()
        };
        let t = generate_archimedean_spiral(ORIGIN, &p).unwrap();
        let first = t.first().unwrap();
        assert!((first.x - (ORIGIN.x + 0.001)).abs() < 1e-12);
        assert!((first.y - ORIGIN.y).abs() < 1e-12);
        assert_eq!(t.len(), 10);
    }

    #[test]
    fn spiral_final_radius_matches_revolutions() {
        let p = SpiralParams {
            a: 0.0,
            b: 0.001,
            points: 101,
            revolutions: 2.0,
            pitch_m: 0.0,
        };
        let t = generate_archimedean_spiral(ORIGIN, &p).unwrap();
        let last = t.last().unwrap();
        let expected = 0.001 * TAU * 2.0;
        assert!((last.planar_distance(&ORIGIN) - expected).abs() < 1e-9);
    }

    #[test]
    fn helical_spiral_descends_per_revolution() {
        let p = SpiralParams {
            points: 11,
            revolutions: 1.0,
            pitch_m: 0.002,
            ..SpiralParams::default()
        };
        let t = generate_archimedean_spiral(ORIGIN, &p).unwrap();
        assert!((t.last().unwrap().z - (ORIGIN.z - 0.002)).abs() < 1e-12);
        assert!(t.points().windows(2).all(|w| w[1].z < w[0].z));
    }

    #[test]
    fn spiral_rejects_degenerate_inputs() {
        for p in [
            SpiralParams {
                points: 0,
                ..SpiralParams::default()
            },
            SpiralParams {
                b: 0.0,
                ..SpiralParams::default()
            },
            SpiralParams {
                b: -0.1,
                ..SpiralParams::default()
            },
            SpiralParams {
                a: -0.1,
                ..SpiralParams::default()
            },
            SpiralParams {
                revolutions: 0.0,
                ..SpiralParams::default()
            },
        ] {
            assert!(matches!(
                generate_archimedean_spiral(ORIGIN, &p),
                Err(InsertionError::InvalidParameter(_))
            ));
        }
    }

    #[test]
    fn revolutions_cover_search_radius() {
        let turns = revolutions_to_cover(0.01, 0.0, 0.0004).unwrap();
        assert!(0.0004 * TAU * turns >= 0.01);
        assert!(revolutions_to_cover(0.001, 0.002, 0.0004).is_err());
    }

    #[test]
    fn linear_generators_hit_both_ends() {
        let down = generate_external_down_trajectory(ORIGIN, 0.1, 5).unwrap();
        assert_eq!(down.first(), Some(&ORIGIN));
        assert!((down.last().unwrap().z - (ORIGIN.z - 0.1)).abs() < 1e-12);

        let up = generate_internal_up_trajectory(ORIGIN, 0.05, 3).unwrap();
        assert!((up.last().unwrap().z - (ORIGIN.z + 0.05)).abs() < 1e-12);
        assert_eq!(up.points()[1].x, ORIGIN.x);
    }

    #[test]
    fn linear_generators_reject_short_counts() {
        for n in [0, 1] {
            assert!(generate_initial_position_trajectory(ORIGIN, ORIGIN, n).is_err());
            assert!(generate_external_down_trajectory(ORIGIN, 0.1, n).is_err());
            assert!(generate_internal_down_trajectory(ORIGIN, 0.1, n).is_err());
            assert!(generate_internal_up_trajectory(ORIGIN, 0.1, n).is_err());
        }
        assert!(generate_external_down_trajectory(ORIGIN, 0.0, 4).is_err());
    }

    #[test]
    fn joint_trajectory_spreads_duration() {
        let from = [0.0; JOINT_COUNT];
        let to = [1.0; JOINT_COUNT];
        let jt = generate_joint_trajectory(from, to, 5, Duration::from_millis(400)).unwrap();
        assert_eq!(jt.waypoints.len(), 5);
        assert_eq!(jt.interval, Duration::from_millis(100));
        assert_eq!(jt.goal(), Some(&to));
        assert!((jt.waypoints[2][3] - 0.5).abs() < 1e-12);
    }

    #[cfg(target_pointer_width = "64")]
    #[test]
    fn joint_trajectory_rejects_segment_count_beyond_u32() {
        let n = u32::MAX as usize + 2;
        let err = generate_joint_trajectory(
            [0.0; JOINT_COUNT],
            [1.0; JOINT_COUNT],
            n,
            Duration::from_secs(1),
        )
        .unwrap_err();
        assert!(matches!(err, InsertionError::InvalidParameter(_)));
    }

    #[test]
    fn wiggle_returns_to_center() {
        let w = generate_wiggle(ORIGIN, 0.001, 3, 61).unwrap();
        let last = w.last().unwrap();
        assert!(last.distance(&ORIGIN) < 1e-12);
        let max_dx = w
            .iter()
            .map(|p| (p.x - ORIGIN.x).abs())
            .fold(0.0_f64, f64::max);
        assert!(max_dx <= 0.001 + 1e-12);
        assert!(generate_wiggle(ORIGIN, 0.001, 0, 10).is_err());
    }

    #[test]
    fn hold_repeats_point() {
        let h = generate_hold(ORIGIN, 4).unwrap();
        assert!(h.iter().all(|p| *p == ORIGIN));
        assert!(generate_hold(ORIGIN, 0).is_err());
    }
}
