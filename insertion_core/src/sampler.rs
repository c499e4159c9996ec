//! Background force sampling.
//!
//! Spawns a thread that owns the `ForceSensor`, feeds every wrench to the
//! shared state through `StateHandle::on_force_sample`, and tracks the
//! last-ok timestamp for watchdog logic.
//!
//! Each `ForceSampler` owns exactly one thread, which is shut down and joined
//! when the sampler is dropped.
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, Instant};

use crossbeam_channel as xch;
use insertion_traits::ForceSensor;
use insertion_traits::clock::Clock;

use crate::machine::StateHandle;

pub struct ForceSampler {
    last_ok: Arc<AtomicU64>,
    samples: Arc<AtomicU64>,
    errors: Arc<AtomicU64>,
    epoch: Instant,
    /// Dropping the sender wakes the thread out of its pacing wait.
    shutdown: Option<xch::Sender<()>>,
    join_handle: Option<std::thread::JoinHandle<()>>,
}

impl ForceSampler {
    pub fn spawn<F: ForceSensor + Send + 'static, C: Clock + Send + Sync + 'static>(
        mut sensor: F,
        handle: StateHandle,
        hz: u32,
        timeout: Duration,
        clock: C,
    ) -> Self {
        let (stop_tx, stop_rx) = xch::bounded::<()>(0);
        let last_ok = Arc::new(AtomicU64::new(0));
        let samples = Arc::new(AtomicU64::new(0));
        let errors = Arc::new(AtomicU64::new(0));
        let (last_ok_t, samples_t, errors_t) = (last_ok.clone(), samples.clone(), errors.clone());
        let period = crate::util::period(hz);
        let epoch = clock.now();

        let join_handle = std::thread::spawn(move || {
            loop {
                match sensor.read(timeout) {
                    Ok(w) => {
                        let ev = handle.on_force_sample(&w);
                        if ev.contact || ev.lateral {
                            tracing::trace!(axial_n = w.axial(), lateral_n = w.lateral(), "contact sample");
                        }
                        last_ok_t.store(clock.ms_since(epoch), Ordering::Relaxed);
                        samples_t.fetch_add(1, Ordering::Relaxed);
                    }
                    Err(e) => {
                        // The runner's stall watchdog decides when this matters.
                        errors_t.fetch_add(1, Ordering::Relaxed);
                        tracing::debug!(error = %e, "force read failed");
                    }
                }

                match stop_rx.recv_timeout(period) {
                    Err(xch::RecvTimeoutError::Timeout) => {}
                    Ok(()) | Err(xch::RecvTimeoutError::Disconnected) => break,
                }
            }
            tracing::trace!("force sampler thread exiting cleanly");
        });

        Self {
            last_ok,
            samples,
            errors,
            epoch,
            shutdown: Some(stop_tx),
            join_handle: Some(join_handle),
        }
    }

    /// Milliseconds since the last successful read, as of `now_ms` on the sampler's clock.
    pub fn stalled_for(&self, now_ms: u64) -> u64 {
        now_ms.saturating_sub(self.last_ok.load(Ordering::Relaxed))
    }

    /// Convenience helper: compute stall using this sampler's epoch and a real monotonic clock.
    pub fn stalled_for_now(&self) -> u64 {
        let ms = Instant::now().saturating_duration_since(self.epoch).as_millis();
        self.stalled_for(ms.min(u128::from(u64::MAX)) as u64)
    }

    pub fn samples(&self) -> u64 {
        self.samples.load(Ordering::Relaxed)
    }

    pub fn errors(&self) -> u64 {
        self.errors.load(Ordering::Relaxed)
    }

    pub fn is_running(&self) -> bool {
        self.join_handle.as_ref().is_some_and(|h| !h.is_finished())
    }
}

impl Drop for ForceSampler {
    fn drop(&mut self) {
        // Disconnect first; the thread exits after at most one in-flight read.
        drop(self.shutdown.take());
        if let Some(handle) = self.join_handle.take() {
            match handle.join() {
                Ok(()) => tracing::trace!("force sampler thread joined"),
                Err(e) => tracing::warn!(?e, "force sampler thread panicked during shutdown"),
            }
        }
    }
}
