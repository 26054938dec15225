//! Collision polygons: triangles and quads annotated for broad and narrow phase

use crate::foundation::math::{convert_vector, Scalar, Transformation3, Vector3};

use super::aabb::Aabb3;
use super::material::PhysicsMaterial;
use super::primitives::{BoundingSphere, ConvexPolygon3D, Plane3, RaySegment3D};

/// Convex polygon with bounding volumes, material and per-corner normals
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CollisionPolygonSphere<T: Scalar, const N: usize> {
    /// Sphere around the corners
    pub bounding_sphere: BoundingSphere<T>,
    /// Corners, supporting plane and edge planes
    pub polygon: ConvexPolygon3D<T, N>,
    /// Material flags
    pub physics_material: PhysicsMaterial,
    /// Per-corner normals for smooth shading of contact normals
    pub corner_normals: [Vector3<T>; N],
    /// Box used for grid insertion
    pub aabb: Aabb3<T>,
}

/// Collision triangle
pub type CollisionTriangleSphere<T> = CollisionPolygonSphere<T, 3>;

/// Collision quad
pub type CollisionQuadSphere<T> = CollisionPolygonSphere<T, 4>;

impl<T: Scalar, const N: usize> CollisionPolygonSphere<T, N> {
    /// Build a flat-shaded polygon, `None` if it has no area
    pub fn new(corners: [Vector3<T>; N], physics_material: PhysicsMaterial) -> Option<Self> {
        let polygon = ConvexPolygon3D::new(corners)?;
        let normal = polygon.plane.normal;
        Some(Self::from_parts(polygon, physics_material, [normal; N]))
    }

    /// Build a polygon with explicit corner normals, `None` if it has no area
    pub fn with_corner_normals(
        corners: [Vector3<T>; N],
        corner_normals: [Vector3<T>; N],
        physics_material: PhysicsMaterial,
    ) -> Option<Self> {
        let polygon = ConvexPolygon3D::new(corners)?;
        Some(Self::from_parts(polygon, physics_material, corner_normals))
    }

    fn from_parts(polygon: ConvexPolygon3D<T, N>, physics_material: PhysicsMaterial, corner_normals: [Vector3<T>; N]) -> Self {
        Self {
            bounding_sphere: BoundingSphere::from_points(&polygon.corners),
            aabb: Aabb3::from_points(polygon.corners.iter()),
            polygon,
            physics_material,
            corner_normals,
        }
    }

    /// Corners
    pub fn corners(&self) -> &[Vector3<T>; N] {
        &self.polygon.corners
    }

    /// Supporting plane
    pub fn plane(&self) -> &Plane3<T> {
        &self.polygon.plane
    }

    /// Face normal
    pub fn normal(&self) -> &Vector3<T> {
        &self.polygon.plane.normal
    }

    /// Segment intersection as `(t, point)`; triangles use Möller-Trumbore
    pub fn intersects_segment(&self, ray: &RaySegment3D<T>) -> Option<(T, Vector3<T>)> {
        let c = &self.polygon.corners;
        if N == 3 {
            ray.intersects_triangle(&[c[0], c[1], c[2]])
        } else {
            ray.intersects_polygon(&self.polygon)
        }
    }

    /// Smooth normal at a point on the polygon
    ///
    /// Triangles interpolate barycentrically, larger polygons weight the
    /// corner normals by inverse distance.
    pub fn interpolated_normal(&self, point: &Vector3<T>) -> Vector3<T> {
        let c = &self.polygon.corners;
        let blended = if N == 3 {
            let n = (c[1] - c[0]).cross(&(c[2] - c[0]));
            let area2 = n.norm_squared();
            let w0 = (c[1] - point).cross(&(c[2] - point)).dot(&n) / area2;
            let w1 = (c[2] - point).cross(&(c[0] - point)).dot(&n) / area2;
            let w2 = T::lit(1.0) - w0 - w1;
            self.corner_normals[0] * w0 + self.corner_normals[1] * w1 + self.corner_normals[2] * w2
        } else {
            let mut sum = Vector3::zeros();
            for (corner, normal) in c.iter().zip(self.corner_normals.iter()) {
                let d = (corner - point).norm();
                if d == T::lit(0.0) {
                    return *normal;
                }
                sum += normal / d;
            }
            sum
        };
        blended.try_normalize(T::lit(0.0)).unwrap_or(*self.normal())
    }

    /// Polygon moved by a rigid transformation
    pub fn transformed(&self, trafo: &Transformation3<T>) -> Self {
        let polygon = self.polygon.transformed(trafo);
        Self {
            bounding_sphere: self.bounding_sphere.transformed(trafo),
            aabb: Aabb3::from_points(polygon.corners.iter()),
            polygon,
            physics_material: self.physics_material,
            corner_normals: self.corner_normals.map(|n| trafo.rotate(&n)),
        }
    }

    /// Convert to another scalar type
    pub fn convert<U: Scalar>(&self) -> CollisionPolygonSphere<U, N> {
        CollisionPolygonSphere {
            bounding_sphere: self.bounding_sphere.convert(),
            polygon: self.polygon.convert(),
            physics_material: self.physics_material,
            corner_normals: self.corner_normals.map(|n| convert_vector(&n)),
            aabb: self.aabb.convert(),
        }
    }
}
