//! Config mapping, simulated hardware assembly, and command execution.

use std::path::Path;
use std::sync::Arc;
use std::sync::atomic::AtomicBool;
use std::time::Duration;

use insertion_config::Config;
use insertion_core::error::Result as CoreResult;
use insertion_core::runner::{RunParams, RunReport};
use insertion_core::trajectory::generate_archimedean_spiral;
use insertion_core::{
    AbortReason, CsvTrajectorySink, ImpedanceSchedule, InsertionStateMachine, MachineOptions,
    MotionCfg, SafetyCfg, SpiralCfg, Timeouts, TrajectorySink, build_machine,
};
use insertion_hardware::{SimParams, SimWorld, SimulatedArm, SimulatedControllers};
use insertion_traits::{ForceSensor, Point};

use crate::cli::{CliSafety, LAST_SAFETY};

pub fn abort_reason_name(r: &AbortReason) -> &'static str {
    match r {
        AbortReason::MaxRuntime => "MaxRuntime",
        AbortReason::Shutdown => "Shutdown",
        AbortReason::Paused => "Paused",
    }
}

fn point(p: [f64; 3]) -> Point {
    Point::new(p[0], p[1], p[2])
}

/// The simulated cell: surface and hole from `[sim]`, controller names from
/// `[controllers]`, and the joint-space home at the configured Cartesian
/// start position.
pub fn sim_params(cfg: &Config) -> SimParams {
    SimParams {
        surface_z: cfg.sim.surface_z,
        hole_x: cfg.sim.hole_x,
        hole_y: cfg.sim.hole_y,
        hole_radius_m: cfg.sim.hole_radius_m,
        hole_depth_m: cfg.sim.hole_depth_m,
        start_pose: point(cfg.sim.start_position),
        start_joints: [0.0; 7],
        home_pose: point(cfg.initial.position),
        joint_controller: cfg.controllers.joint.clone(),
        impedance_controller: cfg.controllers.impedance.clone(),
        fail_switch_to: cfg.sim.fail_switch_to.clone(),
    }
}

fn sim_world(cfg: &Config) -> SimWorld {
    let world = SimWorld::new(sim_params(cfg));
    if cfg.sim.sensor_offline {
        world.set_sensor_online(false);
    }
    world
}

fn trajectory_sink(
    cfg: &Config,
    csv_override: Option<&Path>,
) -> Option<Box<dyn TrajectorySink + Send>> {
    match (csv_override, cfg.trajectory_log.as_ref()) {
        (Some(path), _) => Some(Box::new(CsvTrajectorySink::new(path, false))),
        (None, Some(log)) => Some(Box::new(CsvTrajectorySink::new(&log.path, log.append))),
        (None, None) => None,
    }
}

fn build(
    cfg: &Config,
    world: &SimWorld,
    max_run_ms_override: Option<u64>,
    csv_override: Option<&Path>,
) -> CoreResult<InsertionStateMachine<SimulatedArm, SimulatedControllers>> {
    let schedule = ImpedanceSchedule::try_from(&cfg.impedance)?;
    let motion = MotionCfg::try_from(cfg)?;
    let mut safety: SafetyCfg = (&cfg.safety).into();
    if let Some(ms) = max_run_ms_override {
        safety.max_run_ms = ms;
    }
    let _ = LAST_SAFETY.set(CliSafety {
        max_run_ms: safety.max_run_ms,
        phase_timeout_ms: safety.phase_timeout_ms,
        jam_force_n: cfg.contact.jam_force_n,
        max_descent_m: motion.descent.max_distance_m,
    });

    build_machine(
        world.arm(),
        world.controllers(),
        schedule,
        MachineOptions {
            motion,
            contact: (&cfg.contact).into(),
            safety,
            controllers: (&cfg.controllers).into(),
            clock: None,
            sink: trajectory_sink(cfg, csv_override),
        },
    )
}

/// One insertion against the simulated cell, ticked until it completes or stops.
pub fn run_insertion(
    cfg: &Config,
    max_run_ms_override: Option<u64>,
    csv_override: Option<&Path>,
    shutdown: Arc<AtomicBool>,
) -> CoreResult<RunReport> {
    let world = sim_world(cfg);
    let mut machine = build(cfg, &world, max_run_ms_override, csv_override)?;
    tracing::info!(
        hole_x = cfg.sim.hole_x,
        hole_y = cfg.sim.hole_y,
        surface_z = cfg.sim.surface_z,
        "simulated cell ready"
    );

    let report = insertion_core::runner::run(
        &mut machine,
        world.force_sensor(),
        RunParams {
            timeouts: Timeouts::from(&cfg.sensor),
            shutdown: Some(shutdown),
            prefer_timeout_first: max_run_ms_override.is_none(),
        },
    )?;
    tracing::info!(
        ticks = report.ticks,
        elapsed_ms = report.elapsed_ms,
        inserted_m = world.inserted_depth(),
        "insertion complete"
    );
    Ok(report)
}

/// Build the supervisor and take one force reading without moving the arm.
pub fn self_check(cfg: &Config) -> CoreResult<String> {
    let world = sim_world(cfg);
    let machine = build(cfg, &world, None, None)?;
    let timeouts = Timeouts::from(&cfg.sensor);
    let mut sensor = world.force_sensor();
    let wrench = sensor
        .read(Duration::from_millis(timeouts.sensor_ms))
        .map_err(|e| eyre::eyre!("force sensor probe failed: {e}"))?;
    let pose = world.pose();
    tracing::debug!(phase = %machine.phase(), "self-check built supervisor");
    Ok(format!(
        "self-check ok: phase={} pose=({:.4}, {:.4}, {:.4}) force_z={:.3} N controller={}",
        machine.phase(),
        pose.x,
        pose.y,
        pose.z,
        wrench.force[2],
        world.active_controller()
    ))
}

/// Generate the configured search spiral around `origin`; writes CSV to
/// `out`, or returns it as text when `out` is `None`.
pub fn spiral(cfg: &Config, origin: Point, out: Option<&Path>) -> CoreResult<Option<String>> {
    let spiral = SpiralCfg::try_from(&cfg.spiral)?;
    let trajectory = generate_archimedean_spiral(origin, &spiral.params)?;
    tracing::info!(points = trajectory.len(), "spiral generated");
    if let Some(path) = out {
        CsvTrajectorySink::write_all(path, &trajectory, false)?;
        return Ok(None);
    }
    let mut w = csv::Writer::from_writer(Vec::new());
    w.write_record(["x", "y", "z"])?;
    for p in &trajectory {
        w.write_record([p.x.to_string(), p.y.to_string(), p.z.to_string()])?;
    }
    let bytes = w
        .into_inner()
        .map_err(|e| eyre::eyre!("flush spiral csv: {}", e.error()))?;
    Ok(Some(String::from_utf8(bytes)?))
}
