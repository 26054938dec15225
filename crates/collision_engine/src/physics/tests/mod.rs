//! Scenario tests spanning several physics modules

mod grid_scenarios;
mod sat_scenarios;

use crate::foundation::math::Vector3;
use crate::physics::collision::{PhysicsMaterial, TriangleMesh};

/// cos(170°), the usual ridge threshold for car and terrain meshes
const MAX_MIN_COS_RIDGE: f64 = -0.984_807_753_012_208;

/// Axis-aligned unit cube at the origin with outward-wound triangles
fn unit_cube(name: &str) -> TriangleMesh<f64> {
    let p: Vec<Vector3<f64>> = (0..8)
        .map(|i| Vector3::new((i & 1) as f64, ((i >> 1) & 1) as f64, ((i >> 2) & 1) as f64))
        .collect();
    let faces = [
        [0, 2, 3], [0, 3, 1],
        [4, 5, 7], [4, 7, 6],
        [0, 1, 5], [0, 5, 4],
        [2, 6, 7], [2, 7, 3],
        [0, 4, 6], [0, 6, 2],
        [1, 3, 7], [1, 7, 5],
    ];
    TriangleMesh::from_indexed(name, &p, &faces, PhysicsMaterial::ATTR_COLLIDE, MAX_MIN_COS_RIDGE).unwrap()
}
