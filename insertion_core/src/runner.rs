use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::{Duration, Instant};

use insertion_traits::clock::MonotonicClock;
use insertion_traits::{Arm, ControllerManager, ForceSensor, Point};

use crate::config::Timeouts;
use crate::error::{AbortReason, InsertionError, Report, Result as CoreResult};
use crate::machine::InsertionStateMachine;
use crate::phase::Phase;
use crate::sampler::ForceSampler;
use crate::status::TickStatus;

/// Run-level knobs that are not part of the machine itself.
#[derive(Debug, Clone, Default)]
pub struct RunParams {
    pub timeouts: Timeouts,
    /// Set from another thread (Ctrl-C handler) to stop the run.
    pub shutdown: Option<Arc<AtomicBool>>,
    /// Check the sensor stall watchdog before the max-run cap.
    pub prefer_timeout_first: bool,
}

/// Summary of a completed insertion.
#[derive(Debug, Clone)]
pub struct RunReport {
    pub ticks: u64,
    pub elapsed_ms: u64,
    pub final_pose: Option<Point>,
    pub history: Vec<Phase>,
    pub force_samples: u64,
}

/// Compute the stall watchdog threshold in milliseconds.
///
/// Starts from four sensor timeouts, never shorter than two sampling periods
/// so a single missed sample does not trip it, and always strictly below
/// `max_run_ms` so the watchdog can fire before the hard cap.
#[inline]
fn compute_stall_threshold_ms(sensor_timeout_ms: u64, period_ms: u64, max_run_ms: u64) -> u64 {
    debug_assert!((1..=crate::util::MILLIS_PER_SEC).contains(&period_ms));

    let fast = fast_threshold_ms(sensor_timeout_ms);
    let two_p = two_periods_ms(period_ms);

    if max_run_ms < two_p {
        return cap_below_max_run(fast, max_run_ms);
    }

    let safe = std::cmp::max(fast, two_p);
    cap_below_max_run(safe, max_run_ms)
}

#[inline]
fn fast_threshold_ms(sensor_timeout_ms: u64) -> u64 {
    sensor_timeout_ms.saturating_mul(4)
}

#[inline]
fn two_periods_ms(period_ms: u64) -> u64 {
    period_ms.saturating_mul(2)
}

/// Cap a threshold to be strictly below `max_run_ms` and at least 1ms.
#[inline]
fn cap_below_max_run(threshold: u64, max_run_ms: u64) -> u64 {
    threshold.min(max_run_ms.saturating_sub(1)).max(1)
}

#[inline]
fn stalled_now(elapsed_ms: u64, stalled_ms: u64, threshold_ms: u64) -> bool {
    elapsed_ms >= threshold_ms && stalled_ms > threshold_ms
}

fn abort<A: Arm, C: ControllerManager>(
    machine: &mut InsertionStateMachine<A, C>,
    err: InsertionError,
) -> Report {
    tracing::error!(error = %err, phase = %machine.phase(), "insertion aborted");
    machine.finish();
    Report::new(err)
}

/// Tick `machine` at its control rate until the insertion completes or stops.
///
/// The force sensor is moved onto a sampler thread for the duration of the
/// run and released when this returns.
pub fn run<A, C, F>(
    machine: &mut InsertionStateMachine<A, C>,
    sensor: F,
    params: RunParams,
) -> CoreResult<RunReport>
where
    A: Arm,
    C: ControllerManager,
    F: ForceSensor + Send + 'static,
{
    let rate_hz = machine.motion_cfg().control.rate_hz;
    let period = crate::util::period(rate_hz);
    let max_run_ms = machine.safety().max_run_ms;
    let sample_period_ms = crate::util::period_ms(params.timeouts.sample_rate_hz);
    let stall_threshold_ms =
        compute_stall_threshold_ms(params.timeouts.sensor_ms, sample_period_ms, max_run_ms);

    let sampler = ForceSampler::spawn(
        sensor,
        machine.handle(),
        params.timeouts.sample_rate_hz,
        Duration::from_millis(params.timeouts.sensor_ms),
        MonotonicClock::new(),
    );

    let clock = machine.clock();
    let start = clock.now();
    let real_start = Instant::now();
    let mut next = start;
    tracing::info!(rate_hz, max_run_ms, stall_threshold_ms, "insertion start");

    loop {
        if params
            .shutdown
            .as_ref()
            .is_some_and(|f| f.load(Ordering::Relaxed))
        {
            return Err(abort(machine, InsertionError::Aborted(AbortReason::Shutdown)));
        }

        let elapsed_ms = clock.ms_since(start);
        let real_elapsed_ms = real_start.elapsed().as_millis().min(u128::from(u64::MAX)) as u64;
        let stalled_ms = sampler.stalled_for_now();
        let stalled = stalled_now(real_elapsed_ms, stalled_ms, stall_threshold_ms);
        let stall_err = || InsertionError::Timeout(format!("force sensor stalled for {stalled_ms} ms"));

        if params.prefer_timeout_first && stalled {
            return Err(abort(machine, stall_err()));
        }
        if elapsed_ms >= max_run_ms {
            return Err(abort(machine, InsertionError::Aborted(AbortReason::MaxRuntime)));
        }
        if stalled {
            return Err(abort(machine, stall_err()));
        }

        match machine.tick() {
            TickStatus::Running(_) | TickStatus::Transitioned { .. } => {}
            TickStatus::Idle if !machine.is_completed() => {
                tracing::warn!("insertion paused in Idle");
                return Err(Report::new(InsertionError::Aborted(AbortReason::Paused)));
            }
            TickStatus::Idle => {}
            TickStatus::Halted(e) => {
                tracing::error!(error = %e, phase = %machine.phase(), "insertion halted");
                return Err(Report::new(e));
            }
        }

        if machine.is_completed() {
            let report = RunReport {
                ticks: machine.ticks(),
                elapsed_ms: clock.ms_since(start),
                final_pose: machine.current_pose().ok(),
                history: machine.history().to_vec(),
                force_samples: sampler.samples(),
            };
            tracing::info!(
                ticks = report.ticks,
                elapsed_ms = report.elapsed_ms,
                samples = report.force_samples,
                "insertion finished"
            );
            return Ok(report);
        }

        next += period;
        let now = clock.now();
        if now > next + period {
            tracing::debug!(overrun_us = (now - next).as_micros() as u64, "tick overrun");
            next = now;
        }
        clock.sleep_until(next);
    }
}
