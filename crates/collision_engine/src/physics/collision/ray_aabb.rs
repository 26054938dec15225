//! Slab-method segment/AABB intersection with precomputed inverse directions

use crate::foundation::math::{Scalar, Vector3};

use super::aabb::Aabb3;
use super::primitives::RaySegment3D;

/// `|1/d|` above which a direction component counts as axis-parallel
const PARALLEL_THRESHOLD: f64 = 1e12;

/// A segment prepared for repeated AABB tests
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RaySegment3DForAabb<T: Scalar> {
    /// Underlying segment
    pub ray: RaySegment3D<T>,
    inv_direction: Vector3<T>,
    parallel: [bool; 3],
}

impl<T: Scalar> RaySegment3DForAabb<T> {
    /// Precompute the inverse direction of `ray`
    pub fn new(ray: RaySegment3D<T>) -> Self {
        let inv_direction = ray.direction.map(|d| T::lit(1.0) / d);
        let threshold = T::lit(PARALLEL_THRESHOLD);
        let parallel = [0, 1, 2].map(|i| inv_direction[i].abs() > threshold);
        Self {
            ray,
            inv_direction,
            parallel,
        }
    }

    /// Entry and exit distances `(t_enter, t_exit)` clipped to the segment
    pub fn intersection(&self, aabb: &Aabb3<T>) -> Option<(T, T)> {
        let mut t_enter = T::lit(0.0);
        let mut t_exit = self.ray.length;
        for i in 0..3 {
            let start = self.ray.start[i];
            if self.parallel[i] {
                // Containment only
                if start < aabb.min[i] || start > aabb.max[i] {
                    return None;
                }
                continue;
            }
            let mut t0 = (aabb.min[i] - start) * self.inv_direction[i];
            let mut t1 = (aabb.max[i] - start) * self.inv_direction[i];
            if t0 > t1 {
                std::mem::swap(&mut t0, &mut t1);
            }
            t_enter = t_enter.max(t0);
            t_exit = t_exit.min(t1);
            if t_enter > t_exit {
                return None;
            }
        }
        Some((t_enter, t_exit))
    }

    /// Whether the segment touches the box
    pub fn intersects(&self, aabb: &Aabb3<T>) -> bool {
        self.intersection(aabb).is_some()
    }
}
