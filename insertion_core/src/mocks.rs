//! Test and helper mocks for insertion_core.
//!
//! Each mock is a cheap `Clone` over shared state so a test can hand one copy
//! to the state machine and inspect the other.

use std::sync::Arc;
use std::time::Duration;

use insertion_traits::{Arm, BoxError, ControllerManager, ForceSensor, JointPositions, Point, Wrench};
use parking_lot::Mutex;

/// Everything the supervisor asked the arm to do, in order.
#[derive(Debug, Clone, PartialEq)]
pub enum ArmCall {
    Pose(Point),
    /// Number of waypoints in the joint trajectory.
    JointTrajectory(usize),
    Impedance([f64; 6], [f64; 6]),
}

#[derive(Debug)]
struct ArmInner {
    pose: Point,
    joints: JointPositions,
    track: bool,
    fail_reads: bool,
    calls: Vec<ArmCall>,
}

/// Arm that tracks commands perfectly (unless told not to) and records them.
#[derive(Debug, Clone)]
pub struct RecordingArm {
    inner: Arc<Mutex<ArmInner>>,
}

impl RecordingArm {
    pub fn new(pose: Point) -> Self {
        Self {
            inner: Arc::new(Mutex::new(ArmInner {
                pose,
                joints: [0.0; 7],
                track: true,
                fail_reads: false,
                calls: Vec::new(),
            })),
        }
    }

    /// When false, commanded poses are recorded but the measured pose stays put.
    pub fn set_tracking(&self, track: bool) {
        self.inner.lock().track = track;
    }

    pub fn set_pose(&self, pose: Point) {
        self.inner.lock().pose = pose;
    }

    pub fn fail_reads(&self, fail: bool) {
        self.inner.lock().fail_reads = fail;
    }

    pub fn calls(&self) -> Vec<ArmCall> {
        self.inner.lock().calls.clone()
    }

    pub fn commanded_poses(&self) -> Vec<Point> {
        self.inner
            .lock()
            .calls
            .iter()
            .filter_map(|c| match c {
                ArmCall::Pose(p) => Some(*p),
                _ => None,
            })
            .collect()
    }
}

impl Arm for RecordingArm {
    fn pose(&mut self) -> Result<Point, BoxError> {
        let g = self.inner.lock();
        if g.fail_reads {
            return Err(Box::new(std::io::Error::other("arm state unavailable")));
        }
        Ok(g.pose)
    }

    fn joint_positions(&mut self) -> Result<JointPositions, BoxError> {
        let g = self.inner.lock();
        if g.fail_reads {
            return Err(Box::new(std::io::Error::other("arm state unavailable")));
        }
        Ok(g.joints)
    }

    fn command_pose(&mut self, target: Point) -> Result<(), BoxError> {
        let mut g = self.inner.lock();
        if g.track {
            g.pose = target;
        }
        g.calls.push(ArmCall::Pose(target));
        Ok(())
    }

    fn command_joint_trajectory(
        &mut self,
        waypoints: &[JointPositions],
        _interval: Duration,
    ) -> Result<(), BoxError> {
        let mut g = self.inner.lock();
        if g.track
            && let Some(goal) = waypoints.last()
        {
            g.joints = *goal;
        }
        g.calls.push(ArmCall::JointTrajectory(waypoints.len()));
        Ok(())
    }

    fn set_impedance(&mut self, stiffness: [f64; 6], damping: [f64; 6]) -> Result<(), BoxError> {
        self.inner.lock().calls.push(ArmCall::Impedance(stiffness, damping));
        Ok(())
    }
}

#[derive(Debug, Default)]
struct ControllersInner {
    calls: Vec<String>,
    fail_switch_to: Option<String>,
    fail_load: Option<String>,
}

/// Controller manager that records requests and rejects scripted targets.
#[derive(Debug, Clone, Default)]
pub struct ScriptedControllers {
    inner: Arc<Mutex<ControllersInner>>,
}

impl ScriptedControllers {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn fail_switch_to(&self, name: &str) {
        self.inner.lock().fail_switch_to = Some(name.to_string());
    }

    pub fn fail_load(&self, name: &str) {
        self.inner.lock().fail_load = Some(name.to_string());
    }

    pub fn clear_failures(&self) {
        let mut g = self.inner.lock();
        g.fail_switch_to = None;
        g.fail_load = None;
    }

    pub fn calls(&self) -> Vec<String> {
        self.inner.lock().calls.clone()
    }

    pub fn switch_attempts(&self) -> usize {
        self.inner
            .lock()
            .calls
            .iter()
            .filter(|c| c.starts_with("switch"))
            .count()
    }
}

impl ControllerManager for ScriptedControllers {
    fn load_controller(&mut self, name: &str) -> Result<(), BoxError> {
        let mut g = self.inner.lock();
        if g.fail_load.as_deref() == Some(name) {
            return Err(Box::new(std::io::Error::other(format!("cannot load {name}"))));
        }
        g.calls.push(format!("load {name}"));
        Ok(())
    }

    fn switch_controller(&mut self, from: &str, to: &str) -> Result<(), BoxError> {
        let mut g = self.inner.lock();
        g.calls.push(format!("switch {from} -> {to}"));
        if g.fail_switch_to.as_deref() == Some(to) {
            return Err(Box::new(std::io::Error::other(format!("switch to {to} rejected"))));
        }
        Ok(())
    }
}

/// A force sensor that always errors on read; drives the stall watchdog in tests.
pub struct NoopForceSensor;

impl ForceSensor for NoopForceSensor {
    fn read(&mut self, _timeout: Duration) -> Result<Wrench, BoxError> {
        Err(Box::new(std::io::Error::other("noop force sensor")))
    }
}

/// Replays a fixed wrench on every read.
#[derive(Debug, Clone, Default)]
pub struct ConstantForceSensor {
    wrench: Arc<Mutex<Wrench>>,
}

impl ConstantForceSensor {
    pub fn new(wrench: Wrench) -> Self {
        Self {
            wrench: Arc::new(Mutex::new(wrench)),
        }
    }

    pub fn set(&self, wrench: Wrench) {
        *self.wrench.lock() = wrench;
    }
}

impl ForceSensor for ConstantForceSensor {
    fn read(&mut self, timeout: Duration) -> Result<Wrench, BoxError> {
        std::thread::sleep(timeout.min(Duration::from_millis(1)));
        Ok(*self.wrench.lock())
    }
}
