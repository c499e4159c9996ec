#![no_main]
use insertion_core::trajectory::{
    generate_archimedean_spiral, generate_external_down_trajectory, generate_wiggle,
};
use insertion_core::SpiralParams;
use insertion_traits::Point;
use libfuzzer_sys::arbitrary::Arbitrary;
use libfuzzer_sys::fuzz_target;

#[derive(Debug, Arbitrary)]
struct Input {
    origin: (f64, f64, f64),
    a: f64,
    b: f64,
    revolutions: f64,
    pitch_m: f64,
    distance: f64,
    amplitude: f64,
    cycles: u8,
    points: u16,
}

fuzz_target!(|input: Input| {
    let origin = Point::new(input.origin.0, input.origin.1, input.origin.2);
    let n = usize::from(input.points);

    let spiral = SpiralParams {
        a: input.a,
        b: input.b,
        points: n,
        revolutions: input.revolutions,
        pitch_m: input.pitch_m,
    };
    if let Ok(t) = generate_archimedean_spiral(origin, &spiral) {
        assert_eq!(t.len(), n);
    }
    if let Ok(t) = generate_external_down_trajectory(origin, input.distance, n) {
        assert_eq!(t.len(), n);
        assert!(t.iter().all(|p| p.x == origin.x && p.y == origin.y));
    }
    let _ = generate_wiggle(origin, input.amplitude, u32::from(input.cycles), n);
});
