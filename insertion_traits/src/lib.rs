pub mod clock;
pub mod geometry;

pub use clock::{Clock, MonotonicClock};
pub use geometry::{JOINT_COUNT, JointPositions, Point, Wrench};

/// Error type crossing the hardware boundary.
pub type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// Arm state stream and command sink.
///
/// Orientation is fixed tool-down; only the Cartesian position is commanded.
pub trait Arm {
    /// Latest end-effector position in the base frame.
    fn pose(&mut self) -> Result<Point, BoxError>;

    /// Latest measured joint angles.
    fn joint_positions(&mut self) -> Result<JointPositions, BoxError>;

    /// Publish a Cartesian equilibrium target for the active controller.
    fn command_pose(&mut self, target: Point) -> Result<(), BoxError>;

    /// Publish a joint-space trajectory; `interval` is the time between waypoints.
    fn command_joint_trajectory(
        &mut self,
        waypoints: &[JointPositions],
        interval: std::time::Duration,
    ) -> Result<(), BoxError>;

    /// Push translational/rotational stiffness and damping (x, y, z, rx, ry, rz).
    fn set_impedance(&mut self, stiffness: [f64; 6], damping: [f64; 6]) -> Result<(), BoxError>;
}

/// Low-level controller lifecycle (load, then switch).
pub trait ControllerManager {
    fn load_controller(&mut self, name: &str) -> Result<(), BoxError>;
    fn switch_controller(&mut self, from: &str, to: &str) -> Result<(), BoxError>;
}

/// External force/torque stream at the tool.
pub trait ForceSensor {
    fn read(&mut self, timeout: std::time::Duration) -> Result<Wrench, BoxError>;
}

impl<A: Arm + ?Sized> Arm for Box<A> {
    fn pose(&mut self) -> Result<Point, BoxError> {
        (**self).pose()
    }
    fn joint_positions(&mut self) -> Result<JointPositions, BoxError> {
        (**self).joint_positions()
    }
    fn command_pose(&mut self, target: Point) -> Result<(), BoxError> {
        (**self).command_pose(target)
    }
    fn command_joint_trajectory(
        &mut self,
        waypoints: &[JointPositions],
        interval: std::time::Duration,
    ) -> Result<(), BoxError> {
        (**self).command_joint_trajectory(waypoints, interval)
    }
    fn set_impedance(&mut self, stiffness: [f64; 6], damping: [f64; 6]) -> Result<(), BoxError> {
        (**self).set_impedance(stiffness, damping)
    }
}

impl<C: ControllerManager + ?Sized> ControllerManager for Box<C> {
    fn load_controller(&mut self, name: &str) -> Result<(), BoxError> {
        (**self).load_controller(name)
    }
    fn switch_controller(&mut self, from: &str, to: &str) -> Result<(), BoxError> {
        (**self).switch_controller(from, to)
    }
}

impl<F: ForceSensor + ?Sized> ForceSensor for Box<F> {
    fn read(&mut self, timeout: std::time::Duration) -> Result<Wrench, BoxError> {
        (**self).read(timeout)
    }
}
