//! Separating-axis resolution against meshes stored in an arena

use approx::assert_relative_eq;

use super::unit_cube;
use crate::core::SatConfig;
use crate::foundation::collections::RidgeHandle;
use crate::foundation::math::{tait_bryan_angles_to_matrix, Transformation3, Vector3};
use crate::physics::collision::{
    get_overlap2, resolve_ridge, AxisSource, IntersectableMesh, MeshArena, MeshQuery, SatTracker,
};

#[test]
fn test_overlap_never_grows_with_keep_threshold() {
    let cube0 = unit_cube("cube0");
    let trafo = Transformation3::new(
        tait_bryan_angles_to_matrix(&Vector3::new(0.1, 0.2, 0.05)),
        Vector3::new(0.95, 0.1, 0.05),
    );
    let cube1 = unit_cube("cube1").transformed(&trafo);
    let config = SatConfig::default();
    let thresholds = [-1.0, -0.1, -1e-2, 0.0, 1e-2, 0.1, 1.0];
    let mut compared = 0;
    for ridge in cube1.ridges() {
        let overlaps: Vec<_> = thresholds
            .iter()
            .filter_map(|&t| get_overlap2(&cube0, ridge, t, &config).unwrap().map(|o| (t, o)))
            .collect();
        for (t, o) in &overlaps {
            if o.source == AxisSource::KeptNormal {
                assert!(o.overlap < *t);
            }
            assert_relative_eq!(o.normal.norm(), 1.0, epsilon = 1e-12);
        }
        for pair in overlaps.windows(2) {
            assert!(pair[1].1.overlap <= pair[0].1.overlap);
            compared += 1;
        }
    }
    assert!(compared > 0);
}

#[test]
fn test_single_and_double_precision_agree() {
    let cube0 = unit_cube("cube0");
    let cube1 = unit_cube("cube1").transformed(&Transformation3::from_translation(Vector3::new(0.968_75, 0.25, 0.0)));
    let cube0_f32 = cube0.convert::<f32>();
    let config = SatConfig::default();
    for (ridge, ridge_f32) in cube1.ridges().iter().zip(cube1.convert::<f32>().ridges()) {
        let wide = get_overlap2(&cube0, ridge, 1e-2, &config).unwrap();
        let narrow = get_overlap2(&cube0_f32, ridge_f32, 1e-2, &config).unwrap();
        match (wide, narrow) {
            (Some(a), Some(b)) => assert_relative_eq!(a.overlap, b.overlap, epsilon = 1e-5),
            (None, None) => {}
            (a, b) => panic!("precision changed candidate set: {a:?} vs {b:?}"),
        }
    }
}

#[test]
fn test_arena_meshes_resolve_ridges_and_planes() {
    crate::foundation::logging::try_init();
    let mut arena = MeshArena::<f64>::default();
    let k0 = arena.insert(unit_cube("ground").into());
    let k1 = arena.insert(
        unit_cube("crate")
            .transformed(&Transformation3::from_translation(Vector3::new(0.2, 0.0, 0.9)))
            .into(),
    );

    let mut tracker = SatTracker::new(SatConfig::default());
    let (overlap, normal) = tracker.get_collision_plane(k0, &arena[k0], k1, &arena[k1]).unwrap();
    assert_relative_eq!(overlap, 0.1, epsilon = 1e-10);
    assert_relative_eq!(normal, Vector3::z(), epsilon = 1e-10);

    let handle = RidgeHandle::new(k1, 0);
    let ridge = *resolve_ridge(&arena, handle).unwrap();
    assert!(get_overlap2(&arena[k0], &ridge, 1e-2, &SatConfig::default()).is_ok());

    arena.remove(k1);
    assert!(resolve_ridge(&arena, handle).is_none());
    assert!(matches!(arena.get(k0), Some(IntersectableMesh::TriangleMesh(_))));
    assert_eq!(arena[k0].name(), "ground");
}
