//! Force sampler thread lifecycle.
//!
//! Verifies that:
//! - The sampler thread is joined promptly when the sampler is dropped
//! - Repeated spawn/drop cycles do not accumulate threads
//! - Samples reach the shared contact state through the handle
//! - Read errors are counted and show up as a growing stall

use std::time::{Duration, Instant};

use insertion_core::mocks::{ConstantForceSensor, NoopForceSensor};
use insertion_core::sampler::ForceSampler;
use insertion_core::{ContactCfg, StateHandle};
use insertion_traits::Wrench;
use insertion_traits::clock::MonotonicClock;

fn handle() -> StateHandle {
    StateHandle::new(ContactCfg::default())
}

#[test]
fn sampler_thread_exits_on_drop() {
    let sampler = ForceSampler::spawn(
        ConstantForceSensor::default(),
        handle(),
        100,
        Duration::from_millis(5),
        MonotonicClock::new(),
    );
    std::thread::sleep(Duration::from_millis(30));
    assert!(sampler.is_running());

    let t0 = Instant::now();
    drop(sampler);
    assert!(
        t0.elapsed() < Duration::from_millis(200),
        "drop blocked for {:?}",
        t0.elapsed()
    );
}

#[test]
fn slow_rate_does_not_delay_shutdown() {
    // 1 Hz pacing: the thread spends almost all its time in the pacing wait.
    let sampler = ForceSampler::spawn(
        ConstantForceSensor::default(),
        handle(),
        1,
        Duration::from_millis(5),
        MonotonicClock::new(),
    );
    std::thread::sleep(Duration::from_millis(20));
    let t0 = Instant::now();
    drop(sampler);
    assert!(t0.elapsed() < Duration::from_millis(200));
}

#[test]
fn multiple_samplers_dont_leak_threads() {
    let clock = MonotonicClock::new();
    for _ in 0..10 {
        let sampler = ForceSampler::spawn(
            NoopForceSensor,
            handle(),
            200,
            Duration::from_millis(2),
            clock.clone(),
        );
        std::thread::sleep(Duration::from_millis(5));
        let _ = sampler.errors();
        drop(sampler);
    }
}

#[test]
fn samples_update_contact_state() {
    let h = handle();
    let sensor = ConstantForceSensor::new(Wrench::from_force(0.0, 0.0, -12.0));
    let sampler = ForceSampler::spawn(
        sensor.clone(),
        h.clone(),
        500,
        Duration::from_millis(2),
        MonotonicClock::new(),
    );

    let deadline = Instant::now() + Duration::from_secs(2);
    while !h.snapshot().contact.contact && Instant::now() < deadline {
        std::thread::sleep(Duration::from_millis(2));
    }
    let snap = h.snapshot();
    assert!(snap.contact.contact);
    assert!((snap.contact.axial_n - 12.0).abs() < 1e-9);
    assert!(sampler.samples() >= 2);
    assert_eq!(sampler.errors(), 0);

    // Free space clears contact on the next clean sample.
    sensor.set(Wrench::default());
    let deadline = Instant::now() + Duration::from_secs(2);
    while h.snapshot().contact.contact && Instant::now() < deadline {
        std::thread::sleep(Duration::from_millis(2));
    }
    assert!(!h.snapshot().contact.contact);
}

#[test]
fn failing_sensor_counts_errors_and_stalls() {
    let sampler = ForceSampler::spawn(
        NoopForceSensor,
        handle(),
        200,
        Duration::from_millis(2),
        MonotonicClock::new(),
    );
    std::thread::sleep(Duration::from_millis(60));
    assert_eq!(sampler.samples(), 0);
    assert!(sampler.errors() > 0);
    assert!(sampler.stalled_for_now() >= 50);
}
