//! Closest-point and distance queries between points, segments, polygons and boxes
//!
//! All shape/box queries assume the shapes are disjoint. When two candidate
//! closest points coincide the shapes intersect and the query reports
//! [`PhysicsError::ShapesIntersect`] instead of a meaningless zero distance.

use crate::foundation::math::{Scalar, Transformation3, Vector3};
use crate::physics::error::{PhysicsError, Result};

use super::aabb::Aabb3;
use super::primitives::Plane3;

/// Squared distance below which two closest points count as coincident
const MIN_DISTANCE2: f64 = 1e-12;

fn clamp01<T: Scalar>(x: T) -> T {
    x.max(T::lit(0.0)).min(T::lit(1.0))
}

/// Point of segment `[a, b]` closest to `p`
pub fn closest_point_to_line<T: Scalar>(p: &Vector3<T>, a: &Vector3<T>, b: &Vector3<T>) -> Vector3<T> {
    let ab = b - a;
    let len2 = ab.norm_squared();
    if len2 == T::lit(0.0) {
        return *a;
    }
    a + ab * clamp01((p - a).dot(&ab) / len2)
}

/// Closest points `(on [p0, p1], on [q0, q1])` of two segments
pub fn closest_points_line_line<T: Scalar>(
    p0: &Vector3<T>,
    p1: &Vector3<T>,
    q0: &Vector3<T>,
    q1: &Vector3<T>,
) -> (Vector3<T>, Vector3<T>) {
    let zero = T::lit(0.0);
    let one = T::lit(1.0);
    let d1 = p1 - p0;
    let d2 = q1 - q0;
    let r = p0 - q0;
    let a = d1.norm_squared();
    let e = d2.norm_squared();
    let f = d2.dot(&r);

    let (s, t) = if a == zero && e == zero {
        (zero, zero)
    } else if a == zero {
        (zero, clamp01(f / e))
    } else {
        let c = d1.dot(&r);
        if e == zero {
            (clamp01(-c / a), zero)
        } else {
            let b = d1.dot(&d2);
            let denom = a * e - b * b;
            let s = if denom == zero { zero } else { clamp01((b * f - c * e) / denom) };
            let t = (b * s + f) / e;
            if t < zero {
                (clamp01(-c / a), zero)
            } else if t > one {
                (clamp01((b - c) / a), one)
            } else {
                (s, t)
            }
        }
    };
    (p0 + d1 * s, q0 + d2 * t)
}

/// Distance between two segments
pub fn distance_line_line<T: Scalar>(p0: &Vector3<T>, p1: &Vector3<T>, q0: &Vector3<T>, q1: &Vector3<T>) -> T {
    let (a, b) = closest_points_line_line(p0, p1, q0, q1);
    (a - b).norm()
}

/// Running minimum over candidate point pairs
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ClosestPoint<T: Scalar> {
    /// Squared distance of the best pair so far
    pub distance2: T,
    /// Point on the first shape
    pub point0: Vector3<T>,
    /// Point on the second shape
    pub point1: Vector3<T>,
}

impl<T: Scalar> Default for ClosestPoint<T> {
    fn default() -> Self {
        Self {
            distance2: T::infinity(),
            point0: Vector3::repeat(T::infinity()),
            point1: Vector3::repeat(T::infinity()),
        }
    }
}

impl<T: Scalar> ClosestPoint<T> {
    /// Offer a candidate pair
    pub fn update(&mut self, point0: &Vector3<T>, point1: &Vector3<T>) -> Result<()> {
        let d2 = (point1 - point0).norm_squared();
        if d2.is_nan_value() {
            return Err(PhysicsError::NanInput { context: "ClosestPoint::update" });
        }
        if d2 < T::lit(MIN_DISTANCE2) {
            return Err(PhysicsError::ShapesIntersect);
        }
        if d2 < self.distance2 {
            self.distance2 = d2;
            self.point0 = *point0;
            self.point1 = *point1;
        }
        Ok(())
    }

    /// Merge another accumulator
    pub fn merge(&mut self, other: &Self) {
        if other.distance2 < self.distance2 {
            *self = *other;
        }
    }

    /// Distance of the best pair
    pub fn distance(&self) -> T {
        self.distance2.sqrt()
    }

    /// Unit vector from `point0` towards `point1`
    pub fn direction(&self) -> Vector3<T> {
        (self.point1 - self.point0) / self.distance()
    }
}

/// Distance and closest box point for a point
pub fn distance_point_aabb<T: Scalar>(p: &Vector3<T>, aabb: &Aabb3<T>) -> (T, Vector3<T>) {
    let closest = aabb.closest_point(p);
    ((p - closest).norm(), closest)
}

/// Closest points `(on segment, on box)` of a segment outside a box
pub fn distance_line_aabb<T: Scalar>(a: &Vector3<T>, b: &Vector3<T>, aabb: &Aabb3<T>) -> Result<ClosestPoint<T>> {
    let mut result = ClosestPoint::default();
    for p in [a, b] {
        result.update(p, &aabb.closest_point(p))?;
    }
    let mut status = Ok(());
    aabb.for_each_edge(|e0, e1| {
        if status.is_ok() {
            let (on_line, on_edge) = closest_points_line_line(a, b, e0, e1);
            status = result.update(&on_line, &on_edge);
        }
    });
    status.map(|()| result)
}

/// Point of a convex polygon closest to `p`
pub fn closest_point_on_polygon<T: Scalar, const N: usize>(p: &Vector3<T>, corners: &[Vector3<T>; N]) -> Vector3<T> {
    if let Some(plane) = Plane3::from_points(&corners[0], &corners[1], &corners[2]) {
        let projected = p - plane.normal * plane.signed_distance(p);
        let inside = (0..N).all(|i| {
            let edge = corners[(i + 1) % N] - corners[i];
            plane.normal.cross(&edge).dot(&(projected - corners[i])) >= T::lit(0.0)
        });
        if inside {
            return projected;
        }
    }
    (0..N)
        .map(|i| closest_point_to_line(p, &corners[i], &corners[(i + 1) % N]))
        .fold(None, |best: Option<Vector3<T>>, q| match best {
            Some(b) if (b - p).norm_squared() <= (q - p).norm_squared() => Some(b),
            _ => Some(q),
        })
        .unwrap_or(corners[0])
}

/// Closest points `(on polygon, on box)` of a convex polygon outside a box
pub fn distance_polygon_aabb<T: Scalar, const N: usize>(
    corners: &[Vector3<T>; N],
    aabb: &Aabb3<T>,
) -> Result<ClosestPoint<T>> {
    let mut result = ClosestPoint::default();
    for i in 0..N {
        result.merge(&distance_line_aabb(&corners[i], &corners[(i + 1) % N], aabb)?);
    }
    let mut status = Ok(());
    aabb.for_each_corner(|c| {
        if status.is_ok() {
            status = result.update(&closest_point_on_polygon(c, corners), c);
        }
    });
    status.map(|()| result)
}

/// Closest points `(on transformed box, on box)` of two disjoint boxes
pub fn distance_aabb_aabb<T: Scalar>(
    moving: &Aabb3<T>,
    trafo: &Transformation3<T>,
    fixed: &Aabb3<T>,
) -> Result<ClosestPoint<T>> {
    let mut result = ClosestPoint::default();
    let mut status = Ok(());
    moving.for_each_face(|quad| {
        if status.is_ok() {
            let moved = quad.map(|c| trafo.transform_point(&c));
            match distance_polygon_aabb(&moved, fixed) {
                Ok(c) => result.merge(&c),
                Err(e) => status = Err(e),
            }
        }
    });
    status.map(|()| result)
}
