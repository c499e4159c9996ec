//! Quasi-static peg-in-hole world.
//!
//! The peg follows the commanded equilibrium except where the surface or the
//! bore walls stop it; the force sensor reports the impedance spring force
//! between where the peg is and where it was told to be. One `SimWorld` is
//! shared by the arm, the controller manager and the force sensor handed out
//! from it.

use std::sync::Arc;
use std::time::Duration;

use insertion_traits::{
    Arm, BoxError, ControllerManager, ForceSensor, JointPositions, Point, Wrench,
};
use parking_lot::Mutex;

use crate::error::HwError;
use crate::util::wait_until_with_timeout;

const POLL: Duration = Duration::from_micros(200);
const EPS: f64 = 1e-9;

#[derive(Debug, Clone)]
pub struct SimParams {
    pub surface_z: f64,
    pub hole_x: f64,
    pub hole_y: f64,
    pub hole_radius_m: f64,
    pub hole_depth_m: f64,
    pub start_pose: Point,
    pub start_joints: JointPositions,
    /// Pose reached when a joint trajectory completes.
    pub home_pose: Point,
    pub joint_controller: String,
    pub impedance_controller: String,
    /// Reject every switch to this controller.
    pub fail_switch_to: Option<String>,
}

impl Default for SimParams {
    fn default() -> Self {
        Self {
            surface_z: 0.05,
            hole_x: 0.5025,
            hole_y: 0.0025,
            hole_radius_m: 0.0015,
            hole_depth_m: 0.015,
            start_pose: Point::new(0.3, 0.0, 0.3),
            start_joints: [0.0; 7],
            home_pose: Point::new(0.5, 0.0, 0.1),
            joint_controller: "position_joint_trajectory_controller".to_string(),
            impedance_controller: "cartesian_impedance_controller".to_string(),
            fail_switch_to: None,
        }
    }
}

#[derive(Debug)]
struct World {
    params: SimParams,
    pose: Point,
    target: Point,
    joints: JointPositions,
    stiffness: [f64; 6],
    loaded: Vec<String>,
    active: String,
    sensor_online: bool,
}

impl World {
    fn hole_center(&self) -> Point {
        Point::new(self.params.hole_x, self.params.hole_y, self.params.surface_z)
    }

    fn in_bore(&self) -> bool {
        self.pose.z < self.params.surface_z - EPS
    }

    /// Where the peg ends up when asked to go to `target`.
    fn resolve(&self, target: Point) -> Point {
        let p = &self.params;
        let hole = self.hole_center();
        let mut next = target;
        if self.in_bore() {
            let off = next.planar_distance(&hole);
            if off > p.hole_radius_m {
                let s = p.hole_radius_m / off;
                next.x = hole.x + (next.x - hole.x) * s;
                next.y = hole.y + (next.y - hole.y) * s;
            }
        }
        let over_hole = next.planar_distance(&hole) <= p.hole_radius_m + EPS;
        let floor = if over_hole {
            p.surface_z - p.hole_depth_m
        } else {
            p.surface_z
        };
        next.z = next.z.max(floor);
        next
    }

    fn wrench(&self) -> Wrench {
        let k = self.stiffness;
        Wrench::from_force(
            k[0] * (self.pose.x - self.target.x),
            k[1] * (self.pose.y - self.target.y),
            k[2] * (self.pose.z - self.target.z),
        )
    }

    fn require_active(&self, expected: &str) -> Result<(), HwError> {
        if self.active != expected {
            return Err(HwError::WrongController {
                expected: expected.to_string(),
                active: self.active.clone(),
            });
        }
        Ok(())
    }
}

/// Shared simulated world; hands out the three hardware handles.
#[derive(Debug, Clone)]
pub struct SimWorld {
    inner: Arc<Mutex<World>>,
}

impl Default for SimWorld {
    fn default() -> Self {
        Self::new(SimParams::default())
    }
}

impl SimWorld {
    pub fn new(params: SimParams) -> Self {
        let world = World {
            pose: params.start_pose,
            target: params.start_pose,
            joints: params.start_joints,
            stiffness: [1000.0, 1000.0, 1000.0, 30.0, 30.0, 30.0],
            loaded: vec![params.joint_controller.clone()],
            active: params.joint_controller.clone(),
            sensor_online: true,
            params,
        };
        Self {
            inner: Arc::new(Mutex::new(world)),
        }
    }

    pub fn arm(&self) -> SimulatedArm {
        SimulatedArm {
            world: self.clone(),
        }
    }

    pub fn controllers(&self) -> SimulatedControllers {
        SimulatedControllers {
            world: self.clone(),
        }
    }

    pub fn force_sensor(&self) -> SimulatedForceSensor {
        SimulatedForceSensor {
            world: self.clone(),
        }
    }

    pub fn pose(&self) -> Point {
        self.inner.lock().pose
    }

    pub fn target(&self) -> Point {
        self.inner.lock().target
    }

    pub fn active_controller(&self) -> String {
        self.inner.lock().active.clone()
    }

    /// Depth of the peg tip below the surface, 0 when above it.
    pub fn inserted_depth(&self) -> f64 {
        let g = self.inner.lock();
        (g.params.surface_z - g.pose.z).max(0.0)
    }

    /// Offline sensors block until the read timeout expires.
    pub fn set_sensor_online(&self, online: bool) {
        self.inner.lock().sensor_online = online;
    }

    pub fn wrench(&self) -> Wrench {
        self.inner.lock().wrench()
    }
}

pub struct SimulatedArm {
    world: SimWorld,
}

impl Arm for SimulatedArm {
    fn pose(&mut self) -> Result<Point, BoxError> {
        Ok(self.world.pose())
    }

    fn joint_positions(&mut self) -> Result<JointPositions, BoxError> {
        Ok(self.world.inner.lock().joints)
    }

    fn command_pose(&mut self, target: Point) -> Result<(), BoxError> {
        let mut g = self.world.inner.lock();
        let name = g.params.impedance_controller.clone();
        g.require_active(&name)?;
        let next = g.resolve(target);
        if next.z > target.z + EPS {
            tracing::trace!(z = next.z, target_z = target.z, "peg blocked");
        }
        g.target = target;
        g.pose = next;
        Ok(())
    }

    fn command_joint_trajectory(
        &mut self,
        waypoints: &[JointPositions],
        _interval: Duration,
    ) -> Result<(), BoxError> {
        let mut g = self.world.inner.lock();
        let name = g.params.joint_controller.clone();
        g.require_active(&name)?;
        if let Some(goal) = waypoints.last() {
            g.joints = *goal;
            g.pose = g.params.home_pose;
            g.target = g.pose;
            tracing::debug!(pose = ?g.pose, "joint trajectory complete (simulated)");
        }
        Ok(())
    }

    fn set_impedance(&mut self, stiffness: [f64; 6], _damping: [f64; 6]) -> Result<(), BoxError> {
        let mut g = self.world.inner.lock();
        let name = g.params.impedance_controller.clone();
        g.require_active(&name)?;
        g.stiffness = stiffness;
        Ok(())
    }
}

pub struct SimulatedControllers {
    world: SimWorld,
}

impl ControllerManager for SimulatedControllers {
    fn load_controller(&mut self, name: &str) -> Result<(), BoxError> {
        let mut g = self.world.inner.lock();
        if name != g.params.joint_controller && name != g.params.impedance_controller {
            return Err(Box::new(HwError::UnknownController(name.to_string())));
        }
        if !g.loaded.iter().any(|n| n == name) {
            g.loaded.push(name.to_string());
        }
        Ok(())
    }

    fn switch_controller(&mut self, from: &str, to: &str) -> Result<(), BoxError> {
        let mut g = self.world.inner.lock();
        if !g.loaded.iter().any(|n| n == to) {
            return Err(Box::new(HwError::NotLoaded(to.to_string())));
        }
        if g.params.fail_switch_to.as_deref() == Some(to) {
            return Err(Box::new(HwError::SwitchRejected { to: to.to_string() }));
        }
        g.require_active(from)?;
        g.active = to.to_string();
        // The new controller holds the current pose.
        g.target = g.pose;
        Ok(())
    }
}

pub struct SimulatedForceSensor {
    world: SimWorld,
}

impl ForceSensor for SimulatedForceSensor {
    fn read(&mut self, timeout: Duration) -> Result<Wrench, BoxError> {
        let world = &self.world;
        wait_until_with_timeout(|| world.inner.lock().sensor_online, timeout, POLL)?;
        Ok(world.wrench())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    fn impedance_world() -> (SimWorld, SimulatedArm) {
        let w = SimWorld::default();
        let mut cm = w.controllers();
        let p = SimParams::default();
        cm.load_controller(&p.impedance_controller).unwrap();
        cm.switch_controller(&p.joint_controller, &p.impedance_controller)
            .unwrap();
        (w.clone(), w.arm())
    }

    #[test]
    fn surface_stops_descent_and_pushes_back() {
        let (w, mut arm) = impedance_world();
        arm.command_pose(Point::new(0.5, 0.0, 0.04)).unwrap();
        assert!((w.pose().z - 0.05).abs() < 1e-12);
        let f = w.wrench();
        assert!((f.axial() - 1000.0 * 0.01).abs() < 1e-9);
        assert!(f.lateral() < 1e-9);
    }

    #[test]
    fn peg_drops_into_hole_and_stops_at_bottom() {
        let (w, mut arm) = impedance_world();
        arm.command_pose(Point::new(0.5025, 0.0025, 0.048)).unwrap();
        assert!((w.inserted_depth() - 0.002).abs() < 1e-12);
        arm.command_pose(Point::new(0.5025, 0.0025, 0.0)).unwrap();
        assert!((w.inserted_depth() - 0.015).abs() < 1e-12);
        assert!(w.wrench().axial() > 30.0);
    }

    #[test]
    fn bore_walls_hold_peg_laterally() {
        let (w, mut arm) = impedance_world();
        arm.command_pose(Point::new(0.5025, 0.0025, 0.045)).unwrap();
        arm.command_pose(Point::new(0.51, 0.0025, 0.045)).unwrap();
        let off = w.pose().planar_distance(&Point::new(0.5025, 0.0025, 0.0));
        assert!(off <= 0.0015 + 1e-12);
        assert!(w.wrench().lateral() > 1.0);
    }

    #[rstest]
    #[case("nonexistent_controller")]
    #[case("")]
    fn loading_unknown_controller_fails(#[case] name: &str) {
        let w = SimWorld::default();
        let err = w.controllers().load_controller(name).unwrap_err();
        assert!(matches!(
            err.downcast_ref::<HwError>(),
            Some(HwError::UnknownController(_))
        ));
    }

    #[test]
    fn switch_requires_load_and_honours_rejection() {
        let p = SimParams {
            fail_switch_to: Some("cartesian_impedance_controller".into()),
            ..SimParams::default()
        };
        let w = SimWorld::new(p.clone());
        let mut cm = w.controllers();
        let err = cm
            .switch_controller(&p.joint_controller, &p.impedance_controller)
            .unwrap_err();
        assert!(matches!(err.downcast_ref::<HwError>(), Some(HwError::NotLoaded(_))));
        cm.load_controller(&p.impedance_controller).unwrap();
        let err = cm
            .switch_controller(&p.joint_controller, &p.impedance_controller)
            .unwrap_err();
        assert!(matches!(
            err.downcast_ref::<HwError>(),
            Some(HwError::SwitchRejected { .. })
        ));
        assert_eq!(w.active_controller(), p.joint_controller);
    }

    #[test]
    fn cartesian_command_needs_impedance_controller() {
        let w = SimWorld::default();
        let err = w.arm().command_pose(Point::new(0.5, 0.0, 0.2)).unwrap_err();
        assert!(matches!(
            err.downcast_ref::<HwError>(),
            Some(HwError::WrongController { .. })
        ));
    }

    #[test]
    fn joint_trajectory_reaches_home() {
        let w = SimWorld::default();
        let goal = [0.1; 7];
        w.arm()
            .command_joint_trajectory(&[[0.0; 7], goal], Duration::from_millis(10))
            .unwrap();
        assert_eq!(w.arm().joint_positions().unwrap(), goal);
        assert_eq!(w.pose(), SimParams::default().home_pose);
    }

    #[test]
    fn offline_sensor_times_out() {
        let w = SimWorld::default();
        w.set_sensor_online(false);
        let err = w
            .force_sensor()
            .read(Duration::from_millis(2))
            .unwrap_err();
        assert!(matches!(err.downcast_ref::<HwError>(), Some(HwError::Timeout)));
    }
}
