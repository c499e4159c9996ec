//! Controller selection, compliance updates and point-by-point playback.

use std::collections::VecDeque;

use insertion_traits::{Arm, ControllerManager, JointPositions, Point};

use crate::config::ControllerNames;
use crate::error::InsertionError;
use crate::hw_error::boxed;
use crate::impedance::{ImpedanceParameters, ImpedanceSchedule};
use crate::phase::Phase;
use crate::trajectory::{JointTrajectory, Trajectory};

/// Low-level execution primitive.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ControllerKind {
    JointTrajectory,
    Impedance,
}

impl ControllerKind {
    const fn slot(self) -> usize {
        match self {
            ControllerKind::JointTrajectory => 0,
            ControllerKind::Impedance => 1,
        }
    }
}

impl ControllerNames {
    pub fn name(&self, kind: ControllerKind) -> &str {
        match kind {
            ControllerKind::JointTrajectory => &self.joint,
            ControllerKind::Impedance => &self.impedance,
        }
    }
}

/// The motion a phase entry hands to the controller.
#[derive(Debug, Clone, PartialEq)]
pub enum Motion {
    /// Equilibrium targets streamed one per tick through the impedance controller.
    Cartesian(Trajectory),
    /// Sent once to the joint trajectory controller.
    Joint(JointTrajectory),
    /// No motion; keeps whichever controller is active.
    None,
}

impl Motion {
    fn controller(&self) -> Option<ControllerKind> {
        match self {
            Motion::Cartesian(_) => Some(ControllerKind::Impedance),
            Motion::Joint(_) => Some(ControllerKind::JointTrajectory),
            Motion::None => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StepStatus {
    /// A point was commanded this step.
    InProgress,
    /// Nothing left to command.
    Exhausted,
}

pub struct MotionController<A: Arm, C: ControllerManager> {
    arm: A,
    controllers: C,
    names: ControllerNames,
    schedule: ImpedanceSchedule,
    active: ControllerKind,
    loaded: [bool; 2],
    applied: Option<ImpedanceParameters>,
    queue: VecDeque<Point>,
    joint_goal: Option<JointPositions>,
    last_target: Option<Point>,
    issued: usize,
}

impl<A: Arm, C: ControllerManager> MotionController<A, C> {
    /// The arm is assumed to come up under the joint trajectory controller.
    pub fn new(arm: A, controllers: C, names: ControllerNames, schedule: ImpedanceSchedule) -> Self {
        Self {
            arm,
            controllers,
            names,
            schedule,
            active: ControllerKind::JointTrajectory,
            loaded: [true, false],
            applied: None,
            queue: VecDeque::new(),
            joint_goal: None,
            last_target: None,
            issued: 0,
        }
    }

    /// Set up `phase`: switch controller if the motion needs another one,
    /// push the phase's compliance, then prime playback.
    ///
    /// Nothing is recorded when this fails; the caller decides whether to
    /// retry on a later entry.
    pub fn execute_phase_entry(&mut self, phase: Phase, motion: Motion) -> Result<(), InsertionError> {
        let params = self.schedule.parameters_for(phase)?;
        if let Some(kind) = motion.controller() {
            self.ensure_controller(kind)?;
        }
        if self.active == ControllerKind::Impedance {
            self.apply(params)?;
        }

        self.cancel();
        match motion {
            Motion::Cartesian(t) => {
                tracing::debug!(%phase, points = t.len(), "trajectory primed");
                self.queue = t.into_points().into();
            }
            Motion::Joint(jt) => {
                tracing::debug!(%phase, points = jt.waypoints.len(), "joint trajectory sent");
                self.arm
                    .command_joint_trajectory(&jt.waypoints, jt.interval)
                    .map_err(boxed)?;
                self.joint_goal = jt.goal().copied();
            }
            Motion::None => {}
        }
        Ok(())
    }

    /// Command the next queued point.
    pub fn step(&mut self) -> Result<StepStatus, InsertionError> {
        let Some(p) = self.queue.pop_front() else {
            return Ok(StepStatus::Exhausted);
        };
        self.arm.command_pose(p).map_err(boxed)?;
        self.last_target = Some(p);
        self.issued += 1;
        Ok(StepStatus::InProgress)
    }

    /// Drop queued motion without touching compliance.
    pub fn cancel(&mut self) {
        if !self.queue.is_empty() {
            tracing::debug!(dropped = self.queue.len(), "trajectory cancelled");
        }
        self.queue.clear();
        self.joint_goal = None;
        self.issued = 0;
    }

    /// Cancel playback and return to the default compliance.
    pub fn abandon(&mut self) -> Result<(), InsertionError> {
        self.cancel();
        if self.active == ControllerKind::Impedance {
            self.apply(self.schedule.default_parameters())?;
        }
        Ok(())
    }

    fn ensure_controller(&mut self, kind: ControllerKind) -> Result<(), InsertionError> {
        if self.active == kind {
            return Ok(());
        }
        let from = self.names.name(self.active).to_string();
        let to = self.names.name(kind).to_string();
        let fail = |reason: String| InsertionError::ControllerSwitchFailed {
            from: from.clone(),
            to: to.clone(),
            reason,
        };
        if !self.loaded[kind.slot()] {
            self.controllers
                .load_controller(&to)
                .map_err(|e| fail(format!("load failed: {e}")))?;
            self.loaded[kind.slot()] = true;
            tracing::info!(controller = %to, "controller loaded");
        }
        self.controllers
            .switch_controller(&from, &to)
            .map_err(|e| fail(e.to_string()))?;
        tracing::info!(%from, %to, "controller switched");
        self.active = kind;
        self.applied = None;
        Ok(())
    }

    fn apply(&mut self, params: ImpedanceParameters) -> Result<(), InsertionError> {
        if self.applied == Some(params) {
            return Ok(());
        }
        self.arm
            .set_impedance(params.stiffness.to_array(), params.damping.to_array())
            .map_err(boxed)?;
        self.applied = Some(params);
        Ok(())
    }

    pub fn pose(&mut self) -> Result<Point, InsertionError> {
        self.arm.pose().map_err(boxed)
    }

    pub fn joint_positions(&mut self) -> Result<JointPositions, InsertionError> {
        self.arm.joint_positions().map_err(boxed)
    }

    pub fn last_target(&self) -> Option<Point> {
        self.last_target
    }

    pub fn remaining(&self) -> usize {
        self.queue.len()
    }

    /// Points commanded since the current phase entry.
    pub fn issued(&self) -> usize {
        self.issued
    }

    pub fn joint_goal(&self) -> Option<&JointPositions> {
        self.joint_goal.as_ref()
    }

    pub fn active_controller(&self) -> ControllerKind {
        self.active
    }

    pub fn applied_impedance(&self) -> Option<ImpedanceParameters> {
        self.applied
    }

    pub fn schedule(&self) -> &ImpedanceSchedule {
        &self.schedule
    }
}
