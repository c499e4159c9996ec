use insertion_core::InsertionError;
use insertion_core::trajectory::{
    SpiralParams, generate_archimedean_spiral, generate_external_down_trajectory, generate_hold,
    generate_initial_position_trajectory, generate_internal_up_trajectory, generate_wiggle,
};
use insertion_traits::Point;
use proptest::prelude::*;

prop_compose! {
    fn point_strategy()(
        x in -1.0f64..1.0,
        y in -1.0f64..1.0,
        z in -0.5f64..1.5,
    ) -> Point {
        Point::new(x, y, z)
    }
}

prop_compose! {
    fn spiral_strategy()(
        a in 0.0f64..0.002,
        b in 0.0001f64..0.002,
        points in 2usize..2_000,
        revolutions in 1.0f64..10.0,
        pitch_m in 0.0f64..0.001,
    ) -> SpiralParams {
        SpiralParams { a, b, points, revolutions, pitch_m }
    }
}

proptest! {
    #[test]
    fn linear_moves_are_evenly_spaced(from in point_strategy(), to in point_strategy(), n in 2usize..500) {
        let t = generate_initial_position_trajectory(from, to, n).unwrap();
        prop_assert_eq!(t.len(), n);
        prop_assert_eq!(t.first().copied(), Some(from));
        prop_assert!(t.last().unwrap().distance(&to) < 1e-9);

        let expected = from.distance(&to) / (n - 1) as f64;
        for w in t.points().windows(2) {
            prop_assert!((w[0].distance(&w[1]) - expected).abs() < 1e-9);
        }
    }

    #[test]
    fn vertical_moves_only_change_z(from in point_strategy(), d in 0.001f64..0.2, n in 2usize..500) {
        let down = generate_external_down_trajectory(from, d, n).unwrap();
        let up = generate_internal_up_trajectory(from, d, n).unwrap();
        for p in down.iter().chain(up.iter()) {
            prop_assert_eq!((p.x, p.y), (from.x, from.y));
        }
        prop_assert!((from.z - down.last().unwrap().z - d).abs() < 1e-12);
        prop_assert!((up.last().unwrap().z - from.z - d).abs() < 1e-12);
        for w in down.points().windows(2) {
            prop_assert!(w[1].z < w[0].z);
        }
    }

    #[test]
    fn too_few_points_is_invalid(from in point_strategy(), to in point_strategy(), n in 0usize..2) {
        let is_invalid = matches!(
            generate_initial_position_trajectory(from, to, n),
            Err(InsertionError::InvalidParameter(_))
        );
        prop_assert!(is_invalid);
        let is_invalid = matches!(
            generate_external_down_trajectory(from, 0.01, n),
            Err(InsertionError::InvalidParameter(_))
        );
        prop_assert!(is_invalid);
    }

    #[test]
    fn spiral_radius_grows_strictly(origin in point_strategy(), params in spiral_strategy()) {
        let t = generate_archimedean_spiral(origin, &params).unwrap();
        prop_assert_eq!(t.len(), params.points);
        prop_assert!((t.first().unwrap().planar_distance(&origin) - params.a).abs() < 1e-12);

        let radii: Vec<f64> = t.iter().map(|p| p.planar_distance(&origin)).collect();
        for w in radii.windows(2) {
            prop_assert!(w[1] > w[0], "radius shrank: {} -> {}", w[0], w[1]);
        }
        let outer = params.a + params.b * std::f64::consts::TAU * params.revolutions;
        prop_assert!((radii[radii.len() - 1] - outer).abs() < 1e-9);
        for w in t.points().windows(2) {
            prop_assert!(w[1].z <= w[0].z);
        }
    }

    #[test]
    fn hold_and_wiggle_stay_on_their_center(
        center in point_strategy(),
        amplitude in 0.0f64..0.002,
        cycles in 1u32..6,
        n in 2usize..400,
    ) {
        let hold = generate_hold(center, n).unwrap();
        prop_assert!(hold.iter().all(|p| *p == center));

        let w = generate_wiggle(center, amplitude, cycles, n).unwrap();
        prop_assert_eq!(w.len(), n);
        prop_assert!(w.first().unwrap().distance(&center) < 1e-12);
        prop_assert!(w.last().unwrap().distance(&center) < 1e-9);
        for p in w.iter() {
            prop_assert!(p.planar_distance(&center) <= amplitude * 1.2 + 1e-12);
            prop_assert_eq!(p.z, center.z);
        }
    }
}
