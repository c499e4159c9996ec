//! Type-state builder for `InsertionStateMachine` and generic `build_machine` constructor.
//!
//! The builder enforces at compile time that the arm, controller manager and
//! impedance schedule are provided before `build()` is available.
//! `try_build()` is always available for dynamic checks.

use std::marker::PhantomData;
use std::sync::Arc;

use insertion_traits::clock::{Clock, MonotonicClock};
use insertion_traits::{Arm, ControllerManager};

use crate::config::{ContactCfg, ControllerNames, MotionCfg, SafetyCfg, SpiralCfg};
use crate::error::{BuildError, Result};
use crate::impedance::ImpedanceSchedule;
use crate::machine::{InsertionStateMachine, StateHandle};
use crate::motion::MotionController;
use crate::sink::TrajectorySink;

/// Boxed arm accepted by the builder.
pub type DynArm = Box<dyn Arm + Send>;
/// Boxed controller manager accepted by the builder.
pub type DynControllers = Box<dyn ControllerManager + Send>;
/// Dynamically dispatched supervisor produced by the builder.
pub type Supervisor = InsertionStateMachine<DynArm, DynControllers>;

impl Supervisor {
    pub fn builder() -> InsertionBuilder<Missing, Missing, Missing> {
        InsertionBuilder::default()
    }
}

// ── Type-state markers ───────────────────────────────────────────────────────

pub struct Missing;
pub struct Set;

/// Optional pieces shared by the builder and `build_machine`.
#[derive(Default)]
pub struct MachineOptions {
    pub motion: MotionCfg,
    pub contact: ContactCfg,
    pub safety: SafetyCfg,
    pub controllers: ControllerNames,
    pub clock: Option<Arc<dyn Clock + Send + Sync>>,
    pub sink: Option<Box<dyn TrajectorySink + Send>>,
}

pub struct InsertionBuilder<A, C, S> {
    arm: Option<DynArm>,
    controllers: Option<DynControllers>,
    schedule: Option<ImpedanceSchedule>,
    options: MachineOptions,
    _a: PhantomData<A>,
    _c: PhantomData<C>,
    _s: PhantomData<S>,
}

impl Default for InsertionBuilder<Missing, Missing, Missing> {
    fn default() -> Self {
        Self {
            arm: None,
            controllers: None,
            schedule: None,
            options: MachineOptions::default(),
            _a: PhantomData,
            _c: PhantomData,
            _s: PhantomData,
        }
    }
}

fn invalid(msg: &'static str) -> eyre::Report {
    eyre::Report::new(BuildError::InvalidConfig(msg))
}

fn validate(o: &MachineOptions) -> Result<()> {
    let m = &o.motion;
    if m.control.rate_hz == 0 {
        return Err(invalid("rate_hz must be > 0"));
    }
    if !(m.control.position_tolerance_m > 0.0) || !(m.control.joint_tolerance_rad > 0.0) {
        return Err(invalid("tolerances must be > 0"));
    }
    if !m.initial.position.is_finite() {
        return Err(invalid("initial position must be finite"));
    }
    if m.initial.timeout_ms == 0 {
        return Err(invalid("initial timeout must be >= 1 ms"));
    }
    if !(m.descent.max_distance_m > 0.0) {
        return Err(invalid("max descent must be > 0"));
    }
    if !(m.spiral.press_depth_m >= 0.0) {
        return Err(invalid("press depth must be >= 0"));
    }
    if !(m.insertion.hole_depth_threshold_m > 0.0) {
        return Err(invalid("hole depth threshold must be > 0"));
    }
    let sp = &m.spiral;
    if !(sp.press_depth_m + sp.params.pitch_m * sp.params.revolutions
        > m.insertion.hole_depth_threshold_m)
    {
        return Err(invalid(
            "spiral press depth plus total pitch must exceed the hole depth threshold",
        ));
    }
    let c = &o.contact;
    if c.debounce_n == 0 {
        return Err(invalid("debounce_n must be >= 1"));
    }
    if !(c.force_threshold_n > 0.0) || !(c.lateral_threshold_n > 0.0) {
        return Err(invalid("contact thresholds must be > 0"));
    }
    if !(c.jam_force_n > c.bottom_threshold_n) {
        return Err(invalid("jam force must exceed bottom threshold"));
    }
    if o.safety.max_run_ms == 0 {
        return Err(invalid("max_run_ms must be >= 1"));
    }
    if o.controllers.joint == o.controllers.impedance {
        return Err(invalid("controller names must differ"));
    }
    Ok(())
}

/// Build a statically dispatched machine from concrete hardware.
///
/// Shares validation with `InsertionBuilder::try_build`.
pub fn build_machine<A: Arm, C: ControllerManager>(
    arm: A,
    controllers: C,
    schedule: ImpedanceSchedule,
    options: MachineOptions,
) -> Result<InsertionStateMachine<A, C>> {
    validate(&options)?;
    let MachineOptions {
        motion,
        contact,
        safety,
        controllers: names,
        clock,
        sink,
    } = options;
    let clock: Arc<dyn Clock + Send + Sync> = match clock {
        Some(c) => c,
        None => Arc::new(MonotonicClock::new()),
    };
    let state = StateHandle::new(contact.clone());
    let motion_ctl = MotionController::new(arm, controllers, names, schedule);
    Ok(InsertionStateMachine::from_parts(
        state, motion_ctl, motion, contact, safety, clock, sink,
    ))
}

impl<A, C, S> InsertionBuilder<A, C, S> {
    /// Fallible build available in any type-state; returns detailed error for missing pieces.
    pub fn try_build(self) -> Result<Supervisor> {
        let arm = self
            .arm
            .ok_or_else(|| eyre::Report::new(BuildError::MissingArm))?;
        let controllers = self
            .controllers
            .ok_or_else(|| eyre::Report::new(BuildError::MissingControllers))?;
        let schedule = self
            .schedule
            .ok_or_else(|| eyre::Report::new(BuildError::MissingSchedule))?;
        build_machine(arm, controllers, schedule, self.options)
    }

    pub fn with_motion_cfg(mut self, motion: MotionCfg) -> Self {
        self.options.motion = motion;
        self
    }
    /// Replace only the spiral search settings of the motion config.
    pub fn with_spiral(mut self, spiral: SpiralCfg) -> Self {
        self.options.motion.spiral = spiral;
        self
    }
    pub fn with_contact(mut self, contact: ContactCfg) -> Self {
        self.options.contact = contact;
        self
    }
    pub fn with_safety(mut self, safety: SafetyCfg) -> Self {
        self.options.safety = safety;
        self
    }
    pub fn with_controller_names(mut self, names: ControllerNames) -> Self {
        self.options.controllers = names;
        self
    }
    /// Provide a custom clock implementation; defaults to `MonotonicClock` when not provided.
    pub fn with_clock(mut self, clock: impl Clock + Send + Sync + 'static) -> Self {
        self.options.clock = Some(Arc::new(clock));
        self
    }
    pub fn with_trajectory_sink(mut self, sink: impl TrajectorySink + Send + 'static) -> Self {
        self.options.sink = Some(Box::new(sink));
        self
    }
}

// Setters that advance type-state
impl<C, S> InsertionBuilder<Missing, C, S> {
    pub fn with_arm(self, arm: impl Arm + Send + 'static) -> InsertionBuilder<Set, C, S> {
        InsertionBuilder {
            arm: Some(Box::new(arm)),
            controllers: self.controllers,
            schedule: self.schedule,
            options: self.options,
            _a: PhantomData,
            _c: PhantomData,
            _s: PhantomData,
        }
    }
}

impl<A, S> InsertionBuilder<A, Missing, S> {
    pub fn with_controllers(
        self,
        controllers: impl ControllerManager + Send + 'static,
    ) -> InsertionBuilder<A, Set, S> {
        InsertionBuilder {
            arm: self.arm,
            controllers: Some(Box::new(controllers)),
            schedule: self.schedule,
            options: self.options,
            _a: PhantomData,
            _c: PhantomData,
            _s: PhantomData,
        }
    }
}

impl<A, C> InsertionBuilder<A, C, Missing> {
    pub fn with_schedule(self, schedule: ImpedanceSchedule) -> InsertionBuilder<A, C, Set> {
        InsertionBuilder {
            arm: self.arm,
            controllers: self.controllers,
            schedule: Some(schedule),
            options: self.options,
            _a: PhantomData,
            _c: PhantomData,
            _s: PhantomData,
        }
    }
}

impl InsertionBuilder<Set, Set, Set> {
    /// Validate and build. Only available when arm, controllers and schedule are set.
    pub fn build(self) -> Result<Supervisor> {
        self.try_build()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::impedance::{Axes6, ImpedanceParameters};
    use crate::mocks::{RecordingArm, ScriptedControllers};
    use crate::phase::Phase;
    use insertion_traits::Point;

    fn schedule() -> ImpedanceSchedule {
        ImpedanceSchedule::uniform(ImpedanceParameters::new(
            Axes6::new([1000.0; 3], [30.0; 3]),
            Axes6::new([60.0; 3], [10.0; 3]),
        ))
        .unwrap()
    }

    #[test]
    fn try_build_reports_missing_pieces() {
        let err = Supervisor::builder()
            .with_controllers(ScriptedControllers::new())
            .try_build()
            .unwrap_err();
        assert!(matches!(
            err.downcast_ref::<BuildError>(),
            Some(BuildError::MissingArm)
        ));

        let err = Supervisor::builder()
            .with_arm(RecordingArm::new(Point::default()))
            .with_controllers(ScriptedControllers::new())
            .try_build()
            .unwrap_err();
        assert!(matches!(
            err.downcast_ref::<BuildError>(),
            Some(BuildError::MissingSchedule)
        ));
    }

    #[test]
    fn build_rejects_inverted_force_thresholds() {
        let err = Supervisor::builder()
            .with_arm(RecordingArm::new(Point::default()))
            .with_controllers(ScriptedControllers::new())
            .with_schedule(schedule())
            .with_contact(ContactCfg {
                jam_force_n: 1.0,
                bottom_threshold_n: 5.0,
                ..ContactCfg::default()
            })
            .build()
            .unwrap_err();
        assert!(matches!(
            err.downcast_ref::<BuildError>(),
            Some(BuildError::InvalidConfig(_))
        ));
    }

    #[test]
    fn build_rejects_spiral_that_cannot_reach_hole_depth() {
        let err = Supervisor::builder()
            .with_arm(RecordingArm::new(Point::default()))
            .with_controllers(ScriptedControllers::new())
            .with_schedule(schedule())
            .with_spiral(SpiralCfg {
                press_depth_m: 0.0,
                ..SpiralCfg::default()
            })
            .build()
            .unwrap_err();
        assert!(matches!(
            err.downcast_ref::<BuildError>(),
            Some(BuildError::InvalidConfig(_))
        ));
    }

    #[test]
    fn built_machine_starts_in_start() {
        let m = Supervisor::builder()
            .with_arm(RecordingArm::new(Point::default()))
            .with_controllers(ScriptedControllers::new())
            .with_schedule(schedule())
            .build()
            .unwrap();
        assert_eq!(m.phase(), Phase::Start);
        assert!(!m.is_completed());
    }
}
