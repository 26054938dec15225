//! Primitive collision shapes and intersection algorithms
//!
//! Provides basic geometric primitives (spheres, planes, ray segments, convex
//! polygons) together with the Möller-Trumbore ray/triangle test. Every type is
//! generic over [`Scalar`] so that stored geometry can use the compressed
//! position type while physics code runs in full precision.

use crate::foundation::math::{convert_vector, Scalar, Transformation3, Vector3};
use crate::physics::error::{PhysicsError, Result};

/// Determinant below which a ray counts as parallel to a triangle
const MOLLER_TRUMBORE_EPSILON: f64 = 1e-7;

/// A bounding sphere for collision detection
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BoundingSphere<T: Scalar> {
    /// The center position of the sphere
    pub center: Vector3<T>,
    /// The radius of the sphere, never negative
    pub radius: T,
}

impl<T: Scalar> BoundingSphere<T> {
    /// Creates a new bounding sphere with the given center and radius
    pub fn new(center: Vector3<T>, radius: T) -> Self {
        debug_assert!(radius >= T::lit(0.0), "negative sphere radius {radius}");
        Self { center, radius }
    }

    /// Sphere around the centroid of `points` reaching the farthest point
    ///
    /// # Panics
    ///
    /// Panics if `points` is empty.
    pub fn from_points(points: &[Vector3<T>]) -> Self {
        assert!(!points.is_empty(), "cannot bound an empty point set");
        let sum = points.iter().fold(Vector3::zeros(), |acc, p| acc + p);
        let center = sum / T::lit(points.len() as f64);
        let radius = points
            .iter()
            .map(|p| (p - center).norm())
            .fold(T::lit(0.0), |a, b| a.max(b));
        Self { center, radius }
    }

    /// Check if this sphere intersects with another
    pub fn intersects(&self, other: &Self) -> bool {
        let distance_squared = (self.center - other.center).norm_squared();
        let radius_sum = self.radius + other.radius;
        distance_squared <= radius_sum * radius_sum
    }

    /// Check if the plane passes through this sphere
    pub fn intersects_plane(&self, plane: &Plane3<T>) -> bool {
        plane.signed_distance(&self.center).abs() <= self.radius
    }

    /// Check if a point lies inside or on the sphere
    pub fn contains(&self, point: &Vector3<T>) -> bool {
        (point - self.center).norm_squared() <= self.radius * self.radius
    }

    /// Sphere moved by a rigid transformation
    pub fn transformed(&self, trafo: &Transformation3<T>) -> Self {
        Self {
            center: trafo.transform_point(&self.center),
            radius: self.radius,
        }
    }

    /// Convert to another scalar type
    pub fn convert<U: Scalar>(&self) -> BoundingSphere<U> {
        BoundingSphere {
            center: convert_vector(&self.center),
            radius: self.radius.convert(),
        }
    }
}

/// Plane `normal · x + intercept = 0`
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Plane3<T: Scalar> {
    /// Unit normal
    pub normal: Vector3<T>,
    /// Negative distance of the plane from the origin along the normal
    pub intercept: T,
}

impl<T: Scalar> Plane3<T> {
    /// Create a plane from unit normal and intercept
    pub fn new(normal: Vector3<T>, intercept: T) -> Self {
        Self { normal, intercept }
    }

    /// Plane through `point` with unit normal `normal`
    pub fn from_normal_and_point(normal: Vector3<T>, point: &Vector3<T>) -> Self {
        Self {
            intercept: -normal.dot(point),
            normal,
        }
    }

    /// Plane through three counter-clockwise points, `None` if they are collinear
    pub fn from_points(a: &Vector3<T>, b: &Vector3<T>, c: &Vector3<T>) -> Option<Self> {
        let normal = (b - a).cross(&(c - a)).try_normalize(T::lit(0.0))?;
        Some(Self::from_normal_and_point(normal, a))
    }

    /// Signed distance of a point, positive on the normal side
    pub fn signed_distance(&self, p: &Vector3<T>) -> T {
        self.normal.dot(p) + self.intercept
    }

    /// Plane moved by a rigid transformation
    pub fn transformed(&self, trafo: &Transformation3<T>) -> Self {
        let point = self.normal * (-self.intercept);
        Self::from_normal_and_point(trafo.rotate(&self.normal), &trafo.transform_point(&point))
    }

    /// Convert to another scalar type
    pub fn convert<U: Scalar>(&self) -> Plane3<U> {
        Plane3 {
            normal: convert_vector(&self.normal),
            intercept: self.intercept.convert(),
        }
    }
}

/// Finite segment stored as start point, unit direction and length
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RaySegment3D<T: Scalar> {
    /// Start point
    pub start: Vector3<T>,
    /// Unit direction
    pub direction: Vector3<T>,
    /// Length of the segment
    pub length: T,
}

impl<T: Scalar> RaySegment3D<T> {
    /// Create a segment from start, unit direction and length
    pub fn new(start: Vector3<T>, direction: Vector3<T>, length: T) -> Self {
        Self { start, direction, length }
    }

    /// Segment from `start` to `stop`
    pub fn from_points(start: &Vector3<T>, stop: &Vector3<T>) -> Result<Self> {
        let delta = stop - start;
        let length = delta.norm();
        if length == T::lit(0.0) {
            return Err(PhysicsError::DegenerateRay);
        }
        if length.is_nan_value() {
            return Err(PhysicsError::NanInput { context: "RaySegment3D::from_points" });
        }
        Ok(Self {
            start: *start,
            direction: delta / length,
            length,
        })
    }

    /// End point
    pub fn stop(&self) -> Vector3<T> {
        self.start + self.direction * self.length
    }

    /// Point at distance `t` from the start
    pub fn point_at(&self, t: T) -> Vector3<T> {
        self.start + self.direction * t
    }

    /// Smallest sphere containing the segment
    pub fn bounding_sphere(&self) -> BoundingSphere<T> {
        BoundingSphere::new(self.point_at(self.length / T::lit(2.0)), self.length / T::lit(2.0))
    }

    /// Intersection with a convex polygon as `(t, point)`
    pub fn intersects_polygon<const N: usize>(&self, polygon: &ConvexPolygon3D<T, N>) -> Option<(T, Vector3<T>)> {
        polygon.intersects_segment(self)
    }

    /// Intersection with a triangle via Möller-Trumbore
    pub fn intersects_triangle(&self, triangle: &[Vector3<T>; 3]) -> Option<(T, Vector3<T>)> {
        ray_intersects_triangle(&self.start, &self.direction, triangle, self.length)
    }

    /// Segment moved by a rigid transformation
    pub fn transformed(&self, trafo: &Transformation3<T>) -> Self {
        Self {
            start: trafo.transform_point(&self.start),
            direction: trafo.rotate(&self.direction),
            length: self.length,
        }
    }

    /// Convert to another scalar type
    pub fn convert<U: Scalar>(&self) -> RaySegment3D<U> {
        RaySegment3D {
            start: convert_vector(&self.start),
            direction: convert_vector(&self.direction),
            length: self.length.convert(),
        }
    }
}

/// Möller-Trumbore ray/triangle intersection
///
/// `direction` must be unit length. Returns the ray parameter and the hit
/// point when the hit lies strictly between `ε` and `t_max`.
pub fn ray_intersects_triangle<T: Scalar>(
    origin: &Vector3<T>,
    direction: &Vector3<T>,
    triangle: &[Vector3<T>; 3],
    t_max: T,
) -> Option<(T, Vector3<T>)> {
    let epsilon = T::lit(MOLLER_TRUMBORE_EPSILON);
    let zero = T::lit(0.0);
    let one = T::lit(1.0);

    let edge1 = triangle[1] - triangle[0];
    let edge2 = triangle[2] - triangle[0];

    let h = direction.cross(&edge2);
    let a = edge1.dot(&h);

    // Ray parallel to triangle
    if a.abs() < epsilon {
        return None;
    }

    let f = one / a;
    let s = origin - triangle[0];
    let u = f * s.dot(&h);
    if u < zero || u > one {
        return None;
    }

    let q = s.cross(&edge1);
    let v = f * direction.dot(&q);
    if v < zero || u + v > one {
        return None;
    }

    let t = f * edge2.dot(&q);
    if t > epsilon && t < t_max {
        Some((t, origin + direction * t))
    } else {
        None
    }
}

/// Segment/triangle intersection, normalizing the segment into ray form
pub fn line_intersects_triangle<T: Scalar>(
    start: &Vector3<T>,
    stop: &Vector3<T>,
    triangle: &[Vector3<T>; 3],
) -> Option<(T, Vector3<T>)> {
    let delta = stop - start;
    let length = delta.norm();
    if length == T::lit(0.0) {
        return None;
    }
    ray_intersects_triangle(start, &(delta / length), triangle, length)
}

/// Planar convex polygon with counter-clockwise corners
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ConvexPolygon3D<T: Scalar, const N: usize> {
    /// Corners, counter-clockwise around the plane normal
    pub corners: [Vector3<T>; N],
    /// Supporting plane
    pub plane: Plane3<T>,
    /// Per-edge planes whose normals point into the polygon
    pub edge_planes: [Plane3<T>; N],
}

impl<T: Scalar, const N: usize> ConvexPolygon3D<T, N> {
    /// Build a polygon, `None` if the first three corners are collinear
    pub fn new(corners: [Vector3<T>; N]) -> Option<Self> {
        let plane = Plane3::from_points(&corners[0], &corners[1], &corners[2])?;
        Some(Self::from_plane(corners, plane))
    }

    /// Build a polygon with a known supporting plane
    pub fn from_plane(corners: [Vector3<T>; N], plane: Plane3<T>) -> Self {
        let edge_planes = std::array::from_fn(|i| {
            let a = corners[i];
            let b = corners[(i + 1) % N];
            let inward = plane.normal.cross(&(b - a)).normalize();
            Plane3::from_normal_and_point(inward, &a)
        });
        Self {
            corners,
            plane,
            edge_planes,
        }
    }

    /// Whether a point lies inside the infinite prism spanned by the polygon
    pub fn contains(&self, point: &Vector3<T>) -> bool {
        self.edge_planes
            .iter()
            .all(|p| p.signed_distance(point) >= T::lit(0.0))
    }

    /// Intersection with a finite segment as `(t, point)`
    pub fn intersects_segment(&self, ray: &RaySegment3D<T>) -> Option<(T, Vector3<T>)> {
        let denom = self.plane.normal.dot(&ray.direction);
        if denom.abs() < T::lit(MOLLER_TRUMBORE_EPSILON) {
            return None;
        }
        let t = -self.plane.signed_distance(&ray.start) / denom;
        if t < T::lit(0.0) || t > ray.length {
            return None;
        }
        let p = ray.point_at(t);
        self.contains(&p).then_some((t, p))
    }

    /// Polygon moved by a rigid transformation
    pub fn transformed(&self, trafo: &Transformation3<T>) -> Self {
        Self {
            corners: self.corners.map(|c| trafo.transform_point(&c)),
            plane: self.plane.transformed(trafo),
            edge_planes: self.edge_planes.map(|p| p.transformed(trafo)),
        }
    }

    /// Convert to another scalar type
    pub fn convert<U: Scalar>(&self) -> ConvexPolygon3D<U, N> {
        ConvexPolygon3D {
            corners: self.corners.map(|c| convert_vector(&c)),
            plane: self.plane.convert(),
            edge_planes: self.edge_planes.map(|p| p.convert()),
        }
    }
}
