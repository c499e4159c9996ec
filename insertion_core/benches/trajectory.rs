use criterion::{BatchSize, Criterion, black_box, criterion_group, criterion_main};
use insertion_core::trajectory::{SpiralParams, generate_archimedean_spiral, generate_wiggle};
use insertion_traits::Point;

pub fn bench_generators(c: &mut Criterion) {
    let mut g = c.benchmark_group("generators");
    // Allow quick tweaking without CLI flags (Criterion 0.5):
    //   BENCH_SAMPLE_SIZE=10 BENCH_MEAS_MS=50 cargo bench -p insertion_core --bench trajectory
    if let Ok(ss) = std::env::var("BENCH_SAMPLE_SIZE") {
        if let Ok(n) = ss.parse::<usize>() {
            g.sample_size(n.max(1));
        }
    } else {
        g.sample_size(50);
    }
    if let Ok(ms) = std::env::var("BENCH_MEAS_MS")
        && let Ok(ms_u64) = ms.parse::<u64>()
    {
        g.measurement_time(std::time::Duration::from_millis(ms_u64));
    }

    let origin = Point::new(0.5, 0.0, 0.05);
    for &points in &[1_000usize, 10_000, 100_000] {
        let params = SpiralParams {
            points,
            ..SpiralParams::default()
        };
        g.bench_function(format!("spiral_{points}"), |b| {
            b.iter_batched(
                || params,
                |p| {
                    let t = generate_archimedean_spiral(black_box(origin), &p);
                    black_box(t).ok();
                },
                BatchSize::SmallInput,
            )
        });
    }
    g.bench_function("wiggle_10000", |b| {
        b.iter(|| black_box(generate_wiggle(black_box(origin), 0.0005, 3, 10_000)).ok())
    });
    g.finish();
}

criterion_group!(trajectory, bench_generators);
criterion_main!(trajectory);
