//! The insertion supervisor: phase dispatch, guards and the shared state handle.
//!
//! Phase, epoch and contact state live behind one `parking_lot::Mutex` owned
//! by a [`StateHandle`]. The tick copies a [`Snapshot`], runs the phase
//! handler without holding the lock (handlers talk to hardware), then commits
//! the transition only if the epoch it read is still current. Any external
//! `change_state` bumps the epoch, so an operator request always wins a race
//! with an in-flight tick.

use std::sync::Arc;
use std::time::Instant;

use insertion_traits::{Arm, Clock, ControllerManager, Point, Wrench};
use parking_lot::Mutex;

use crate::config::{ContactCfg, InitialMode, MotionCfg, SafetyCfg};
use crate::contact::{ContactEvent, ContactMonitor, ContactState};
use crate::error::InsertionError;
use crate::motion::{Motion, MotionController, StepStatus};
use crate::phase::Phase;
use crate::sink::TrajectorySink;
use crate::status::TickStatus;
use crate::trajectory::{
    Trajectory, generate_archimedean_spiral, generate_external_down_trajectory, generate_hold,
    generate_initial_position_trajectory, generate_internal_down_trajectory,
    generate_internal_up_trajectory, generate_joint_trajectory, generate_wiggle,
};

/// Consistent copy of the shared state.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Snapshot {
    pub phase: Phase,
    pub contact: ContactState,
    /// Incremented on every phase write.
    pub epoch: u64,
}

#[derive(Debug)]
struct Shared {
    phase: Phase,
    epoch: u64,
    monitor: ContactMonitor,
}

/// Cloneable handle for threads other than the tick: operator requests and
/// the force sampler.
#[derive(Debug, Clone)]
pub struct StateHandle {
    inner: Arc<Mutex<Shared>>,
}

impl StateHandle {
    pub fn new(contact: ContactCfg) -> Self {
        Self {
            inner: Arc::new(Mutex::new(Shared {
                phase: Phase::Start,
                epoch: 0,
                monitor: ContactMonitor::new(contact),
            })),
        }
    }

    /// Jump to the phase named `name` (canonical or snake_case). Unknown
    /// names leave the phase untouched.
    pub fn change_state(&self, name: &str) -> Result<Phase, InsertionError> {
        let to: Phase = name.parse()?;
        let from = {
            let mut g = self.inner.lock();
            let from = g.phase;
            g.phase = to;
            g.epoch = g.epoch.wrapping_add(1);
            from
        };
        tracing::info!(%from, %to, "phase changed by request");
        Ok(to)
    }

    /// Feed one force sample to the contact monitor.
    pub fn on_force_sample(&self, wrench: &Wrench) -> ContactEvent {
        self.inner.lock().monitor.observe(wrench)
    }

    pub fn phase(&self) -> Phase {
        self.inner.lock().phase
    }

    pub fn snapshot(&self) -> Snapshot {
        let g = self.inner.lock();
        Snapshot {
            phase: g.phase,
            contact: g.monitor.state(),
            epoch: g.epoch,
        }
    }

    /// Write `to` only if nobody else wrote a phase since `epoch` was read.
    fn commit(&self, epoch: u64, to: Phase) -> bool {
        let mut g = self.inner.lock();
        if g.epoch != epoch {
            return false;
        }
        g.phase = to;
        g.epoch = g.epoch.wrapping_add(1);
        true
    }

    fn force(&self, to: Phase) {
        let mut g = self.inner.lock();
        g.phase = to;
        g.epoch = g.epoch.wrapping_add(1);
    }

    fn reset_contact(&self) {
        self.inner.lock().monitor.reset();
    }
}

#[derive(Debug, Clone, Copy)]
struct Entry {
    epoch: u64,
    at: Instant,
    origin: Option<Point>,
}

struct TickCtx {
    snap: Snapshot,
    fresh: bool,
    now: Instant,
}

enum Outcome {
    Stay,
    Advance(Phase),
    Complete,
    Park,
}

type Handler<A, C> =
    fn(&mut InsertionStateMachine<A, C>, &TickCtx) -> Result<Outcome, InsertionError>;

pub struct InsertionStateMachine<A: Arm, C: ControllerManager> {
    pub(crate) state: StateHandle,
    pub(crate) motion: MotionController<A, C>,
    pub(crate) cfg: MotionCfg,
    pub(crate) contact: ContactCfg,
    pub(crate) safety: SafetyCfg,
    pub(crate) clock: Arc<dyn Clock + Send + Sync>,
    pub(crate) sink: Option<Box<dyn TrajectorySink + Send>>,
    entry: Option<Entry>,
    contact_z: Option<f64>,
    latched: Option<(u64, InsertionError)>,
    completed: bool,
    history: Vec<Phase>,
    ticks: u64,
}

impl<A: Arm, C: ControllerManager> std::fmt::Debug for InsertionStateMachine<A, C> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("InsertionStateMachine")
            .field("completed", &self.completed)
            .field("history", &self.history)
            .field("ticks", &self.ticks)
            .finish_non_exhaustive()
    }
}

impl<A: Arm, C: ControllerManager> InsertionStateMachine<A, C> {
    /// Indexed by `Phase::index`.
    const HANDLERS: [Handler<A, C>; 10] = [
        Self::start,
        Self::move_to_initial_position,
        Self::external_down_movement,
        Self::spiral_motion,
        Self::internal_down_movement,
        Self::straightening,
        Self::insertion_wiggle,
        Self::internal_up_movement,
        Self::finish_phase,
        Self::idle,
    ];

    pub(crate) fn from_parts(
        state: StateHandle,
        motion: MotionController<A, C>,
        cfg: MotionCfg,
        contact: ContactCfg,
        safety: SafetyCfg,
        clock: Arc<dyn Clock + Send + Sync>,
        sink: Option<Box<dyn TrajectorySink + Send>>,
    ) -> Self {
        Self {
            state,
            motion,
            cfg,
            contact,
            safety,
            clock,
            sink,
            entry: None,
            contact_z: None,
            latched: None,
            completed: false,
            history: Vec::new(),
            ticks: 0,
        }
    }

    /// One supervisory step: dispatch on the current phase, evaluate its
    /// guard, and commit at most one transition.
    pub fn tick(&mut self) -> TickStatus {
        self.ticks = self.ticks.saturating_add(1);
        let snap = self.state.snapshot();

        if let Some((epoch, err)) = &self.latched {
            if *epoch == snap.epoch {
                return TickStatus::Halted(err.clone());
            }
            self.latched = None;
        }

        let fresh = self.entry.is_none_or(|e| e.epoch != snap.epoch);
        if fresh {
            self.motion.cancel();
            self.state.reset_contact();
        }
        let ctx = TickCtx {
            snap,
            fresh,
            now: self.clock.now(),
        };

        let handler = Self::HANDLERS[snap.phase.index()];
        match handler(self, &ctx) {
            Ok(Outcome::Stay) => TickStatus::Running(snap.phase),
            Ok(Outcome::Park) => TickStatus::Idle,
            Ok(Outcome::Advance(to)) => self.transition(&snap, to),
            Ok(Outcome::Complete) => {
                let status = self.transition(&snap, Phase::Idle);
                if matches!(status, TickStatus::Transitioned { .. }) {
                    self.completed = true;
                    tracing::info!(ticks = self.ticks, "insertion complete");
                }
                status
            }
            Err(e) => self.fail(&snap, e),
        }
    }

    /// Operator jump; see [`StateHandle::change_state`].
    pub fn change_state(&self, name: &str) -> Result<Phase, InsertionError> {
        self.state.change_state(name)
    }

    /// Abandon motion and park in `Idle`.
    pub fn finish(&mut self) {
        self.release();
        self.state.force(Phase::Idle);
        self.entry = None;
    }

    pub fn phase(&self) -> Phase {
        self.state.phase()
    }

    pub fn handle(&self) -> StateHandle {
        self.state.clone()
    }

    /// True once `Finish` has run to completion.
    pub fn is_completed(&self) -> bool {
        self.completed
    }

    /// Phases entered so far, in order.
    pub fn history(&self) -> &[Phase] {
        &self.history
    }

    pub fn ticks(&self) -> u64 {
        self.ticks
    }

    pub fn motion(&self) -> &MotionController<A, C> {
        &self.motion
    }

    pub fn current_pose(&mut self) -> Result<Point, InsertionError> {
        self.motion.pose()
    }

    pub fn clock(&self) -> Arc<dyn Clock + Send + Sync> {
        self.clock.clone()
    }

    pub fn motion_cfg(&self) -> &MotionCfg {
        &self.cfg
    }

    pub fn safety(&self) -> &SafetyCfg {
        &self.safety
    }

    fn transition(&mut self, snap: &Snapshot, to: Phase) -> TickStatus {
        let from = snap.phase;
        if self.state.commit(snap.epoch, to) {
            tracing::info!(%from, %to, "phase transition");
            TickStatus::Transitioned { from, to }
        } else {
            tracing::debug!(%from, %to, "transition superseded by request");
            TickStatus::Running(self.state.phase())
        }
    }

    fn fail(&mut self, snap: &Snapshot, err: InsertionError) -> TickStatus {
        let phase = snap.phase;
        if matches!(err, InsertionError::ControllerSwitchFailed { .. }) {
            tracing::error!(%phase, error = %err, "controller switch failed; holding phase");
            self.latched = Some((snap.epoch, err.clone()));
            return TickStatus::Halted(err);
        }
        tracing::error!(%phase, error = %err, "phase halted; parking in Idle");
        self.release();
        self.state.force(Phase::Idle);
        self.entry = None;
        TickStatus::Halted(err)
    }

    fn release(&mut self) {
        if let Err(e) = self.motion.abandon() {
            tracing::warn!(error = %e, "failed to restore default impedance");
        }
    }

    fn enter(
        &mut self,
        ctx: &TickCtx,
        motion: Motion,
        origin: Option<Point>,
    ) -> Result<(), InsertionError> {
        self.motion.execute_phase_entry(ctx.snap.phase, motion)?;
        self.record_entry(ctx, origin);
        Ok(())
    }

    fn record_entry(&mut self, ctx: &TickCtx, origin: Option<Point>) {
        self.entry = Some(Entry {
            epoch: ctx.snap.epoch,
            at: ctx.now,
            origin,
        });
        self.history.push(ctx.snap.phase);
        tracing::info!(phase = %ctx.snap.phase, "phase entered");
    }

    fn log_trajectory(&mut self, phase: Phase, trajectory: &Trajectory) {
        if let Some(sink) = self.sink.as_mut()
            && let Err(e) = sink.record(phase, trajectory)
        {
            tracing::warn!(%phase, error = %e, "trajectory sink failed");
        }
    }

    fn enter_cartesian(
        &mut self,
        ctx: &TickCtx,
        trajectory: Trajectory,
        origin: Point,
    ) -> Result<Outcome, InsertionError> {
        let logged = self.sink.is_some().then(|| trajectory.clone());
        self.enter(ctx, Motion::Cartesian(trajectory), Some(origin))?;
        if let Some(t) = logged {
            self.log_trajectory(ctx.snap.phase, &t);
        }
        Ok(Outcome::Stay)
    }

    fn check_timeout(&self, ctx: &TickCtx, limit_ms: u64) -> Result<(), InsertionError> {
        let Some(entry) = self.entry else {
            return Ok(());
        };
        if limit_ms > 0 && self.clock.ms_since(entry.at) >= limit_ms {
            return Err(InsertionError::Timeout(format!(
                "{} did not complete within {limit_ms} ms",
                ctx.snap.phase
            )));
        }
        Ok(())
    }

    /// Stream the queued trajectory, then wait for the arm to settle on the
    /// last target.
    fn play_then_settle(&mut self, next: Phase) -> Result<Outcome, InsertionError> {
        if self.motion.step()? == StepStatus::InProgress {
            return Ok(Outcome::Stay);
        }
        let Some(target) = self.motion.last_target() else {
            return Ok(Outcome::Advance(next));
        };
        let pose = self.motion.pose()?;
        if pose.distance(&target) <= self.cfg.control.position_tolerance_m {
            Ok(Outcome::Advance(next))
        } else {
            Ok(Outcome::Stay)
        }
    }

    fn check_jam(&self, ctx: &TickCtx) -> Result<(), InsertionError> {
        let peak = ctx.snap.contact.peak_axial_n;
        let limit = self.contact.jam_force_n;
        if peak >= limit {
            return Err(InsertionError::SafetyBoundExceeded(format!(
                "jammed in {}: axial force {peak:.1} N >= {limit:.1} N",
                ctx.snap.phase
            )));
        }
        Ok(())
    }

    // ── Phase handlers ───────────────────────────────────────────────────────

    fn start(&mut self, ctx: &TickCtx) -> Result<Outcome, InsertionError> {
        if ctx.fresh {
            self.contact_z = None;
            self.completed = false;
            self.enter(ctx, Motion::None, None)?;
            return Ok(Outcome::Stay);
        }
        Ok(Outcome::Advance(ctx.snap.phase.next()))
    }

    fn move_to_initial_position(&mut self, ctx: &TickCtx) -> Result<Outcome, InsertionError> {
        let initial = self.cfg.initial.clone();
        if ctx.fresh {
            match initial.mode {
                InitialMode::Joint => {
                    let from = self.motion.joint_positions()?;
                    let jt = generate_joint_trajectory(
                        from,
                        initial.joints,
                        initial.points,
                        initial.duration,
                    )?;
                    self.enter(ctx, Motion::Joint(jt), None)?;
                    return Ok(Outcome::Stay);
                }
                InitialMode::Cartesian => {
                    let from = self.motion.pose()?;
                    let t =
                        generate_initial_position_trajectory(from, initial.position, initial.points)?;
                    return self.enter_cartesian(ctx, t, from);
                }
            }
        }
        self.check_timeout(ctx, initial.timeout_ms)?;
        match initial.mode {
            InitialMode::Joint => {
                let q = self.motion.joint_positions()?;
                let goal = self.motion.joint_goal().copied().unwrap_or(initial.joints);
                let tol = self.cfg.control.joint_tolerance_rad;
                if q.iter().zip(goal.iter()).all(|(a, b)| (a - b).abs() <= tol) {
                    Ok(Outcome::Advance(ctx.snap.phase.next()))
                } else {
                    Ok(Outcome::Stay)
                }
            }
            InitialMode::Cartesian => self.play_then_settle(ctx.snap.phase.next()),
        }
    }

    fn external_down_movement(&mut self, ctx: &TickCtx) -> Result<Outcome, InsertionError> {
        let max = self.cfg.descent.max_distance_m;
        if ctx.fresh {
            let from = self.motion.pose()?;
            let t = generate_external_down_trajectory(from, max, self.cfg.descent.points)?;
            return self.enter_cartesian(ctx, t, from);
        }
        self.check_timeout(ctx, self.safety.phase_timeout_ms)?;

        let pose = self.motion.pose()?;
        if ctx.snap.contact.contact {
            self.contact_z = Some(pose.z);
            tracing::info!(z = pose.z, axial_n = ctx.snap.contact.axial_n, "surface contact");
            return Ok(Outcome::Advance(ctx.snap.phase.next()));
        }
        let origin = self.entry.and_then(|e| e.origin).unwrap_or(pose);
        let travelled = origin.z - pose.z;
        if travelled >= max - f64::EPSILON.sqrt() || self.motion.step()? == StepStatus::Exhausted {
            return Err(InsertionError::SafetyBoundExceeded(format!(
                "descended {travelled:.4} m without contact (limit {max:.4} m)"
            )));
        }
        Ok(Outcome::Stay)
    }

    fn spiral_motion(&mut self, ctx: &TickCtx) -> Result<Outcome, InsertionError> {
        if ctx.fresh {
            let pose = self.motion.pose()?;
            let surface = *self.contact_z.get_or_insert(pose.z);
            let origin = Point::new(pose.x, pose.y, surface - self.cfg.spiral.press_depth_m);
            let t = generate_archimedean_spiral(origin, &self.cfg.spiral.params)?;
            return self.enter_cartesian(ctx, t, pose);
        }
        self.check_timeout(ctx, self.safety.phase_timeout_ms)?;

        if ctx.snap.contact.lateral {
            tracing::info!(
                lateral_n = ctx.snap.contact.lateral_n,
                issued = self.motion.issued(),
                skipped = self.motion.remaining(),
                "hole rim contact"
            );
            return Ok(Outcome::Advance(ctx.snap.phase.next()));
        }
        let pose = self.motion.pose()?;
        let surface = self.contact_z.unwrap_or(pose.z);
        if surface - pose.z >= self.cfg.insertion.hole_depth_threshold_m {
            tracing::info!(
                drop_m = surface - pose.z,
                issued = self.motion.issued(),
                skipped = self.motion.remaining(),
                "peg dropped into hole"
            );
            return Ok(Outcome::Advance(ctx.snap.phase.next()));
        }
        match self.motion.step()? {
            StepStatus::InProgress => Ok(Outcome::Stay),
            StepStatus::Exhausted => {
                // Search over; the descent below decides whether the hole was found.
                tracing::warn!("spiral exhausted without locating the hole");
                Ok(Outcome::Advance(ctx.snap.phase.next()))
            }
        }
    }

    fn internal_down_movement(&mut self, ctx: &TickCtx) -> Result<Outcome, InsertionError> {
        if ctx.fresh {
            let from = self.motion.pose()?;
            let ins = &self.cfg.insertion;
            let t = generate_internal_down_trajectory(from, ins.depth_m, ins.points)?;
            return self.enter_cartesian(ctx, t, from);
        }
        self.check_timeout(ctx, self.safety.phase_timeout_ms)?;
        self.check_jam(ctx)?;

        let peak = ctx.snap.contact.peak_axial_n;
        let bottom = self.contact.bottom_threshold_n;
        if peak >= bottom {
            self.check_in_hole(ctx)?;
            tracing::info!(axial_n = peak, "peg bottomed out");
            return Ok(Outcome::Advance(ctx.snap.phase.next()));
        }
        match self.play_then_settle(ctx.snap.phase.next())? {
            Outcome::Advance(next) => {
                self.check_in_hole(ctx)?;
                Ok(Outcome::Advance(next))
            }
            other => Ok(other),
        }
    }

    /// The peg must sit at least the hole-depth threshold below the surface
    /// contact height. Without a recorded contact (phase entered by request)
    /// there is no reference and the check passes.
    fn check_in_hole(&mut self, ctx: &TickCtx) -> Result<(), InsertionError> {
        let Some(surface) = self.contact_z else {
            return Ok(());
        };
        let depth = surface - self.motion.pose()?.z;
        let need = self.cfg.insertion.hole_depth_threshold_m;
        if depth < need {
            return Err(InsertionError::SafetyBoundExceeded(format!(
                "{} stopped {depth:.4} m below the surface (need {need:.4} m): hole not found",
                ctx.snap.phase
            )));
        }
        Ok(())
    }

    fn straightening(&mut self, ctx: &TickCtx) -> Result<Outcome, InsertionError> {
        if ctx.fresh {
            let from = self.motion.pose()?;
            let t = generate_hold(from, self.cfg.insertion.straighten_points)?;
            return self.enter_cartesian(ctx, t, from);
        }
        self.check_timeout(ctx, self.safety.phase_timeout_ms)?;
        match self.motion.step()? {
            StepStatus::InProgress => Ok(Outcome::Stay),
            StepStatus::Exhausted => Ok(Outcome::Advance(ctx.snap.phase.next())),
        }
    }

    fn insertion_wiggle(&mut self, ctx: &TickCtx) -> Result<Outcome, InsertionError> {
        if ctx.fresh {
            let from = self.motion.pose()?;
            let ins = &self.cfg.insertion;
            let t = generate_wiggle(
                from,
                ins.wiggle_amplitude_m,
                ins.wiggle_cycles,
                ins.wiggle_points,
            )?;
            return self.enter_cartesian(ctx, t, from);
        }
        self.check_timeout(ctx, self.safety.phase_timeout_ms)?;
        self.check_jam(ctx)?;
        match self.motion.step()? {
            StepStatus::InProgress => Ok(Outcome::Stay),
            StepStatus::Exhausted => Ok(Outcome::Advance(ctx.snap.phase.next())),
        }
    }

    fn internal_up_movement(&mut self, ctx: &TickCtx) -> Result<Outcome, InsertionError> {
        if ctx.fresh {
            let from = self.motion.pose()?;
            let ins = &self.cfg.insertion;
            let t = generate_internal_up_trajectory(from, ins.retract_m, ins.retract_points)?;
            return self.enter_cartesian(ctx, t, from);
        }
        self.check_timeout(ctx, self.safety.phase_timeout_ms)?;
        self.play_then_settle(ctx.snap.phase.next())
    }

    fn finish_phase(&mut self, ctx: &TickCtx) -> Result<Outcome, InsertionError> {
        if ctx.fresh {
            self.release();
            self.record_entry(ctx, None);
        }
        Ok(Outcome::Complete)
    }

    fn idle(&mut self, ctx: &TickCtx) -> Result<Outcome, InsertionError> {
        if ctx.fresh {
            self.release();
            self.record_entry(ctx, None);
        }
        Ok(Outcome::Park)
    }
}
