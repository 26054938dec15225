//! Rounded boxes: an AABB swept by a sphere
//!
//! Used for intersectables that are not triangle meshes (barrels, crates,
//! hitboxes). Contacts come from the closest-point queries in
//! [`distance`](super::distance): the overlap is the rounding radius minus the
//! distance between the shrunk box and the other shape.

use crate::foundation::math::{Scalar, Transformation3, Vector3};
use crate::physics::error::{PhysicsError, Result};

use super::aabb::Aabb3;
use super::distance::{distance_aabb_aabb, distance_line_aabb, distance_polygon_aabb, ClosestPoint};
use super::material::PhysicsMaterial;
use super::polygon::CollisionPolygonSphere;
use super::primitives::BoundingSphere;
use super::ridge::CollisionRidgeSphere;

/// Smallest edge length of the shrunk box
const MIN_SMALL_SIZE: f64 = 1e-3;

/// Penetration of a shape into a rounded box
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct IntersectionContact<T: Scalar> {
    /// Penetration depth, positive when touching
    pub overlap: T,
    /// Contact point
    pub point: Vector3<T>,
    /// Unit normal pointing from the other shape towards the box
    pub normal: Vector3<T>,
}

/// Box `aabb_small` inflated by a sphere of `radius`
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SweptSphereAabb<T: Scalar> {
    /// Core box, the full box shrunk by the radius
    pub aabb_small: Aabb3<T>,
    /// Rounding radius
    pub radius: T,
    /// Sphere around the rounded box
    pub bounding_sphere: BoundingSphere<T>,
    /// Material flags
    pub physics_material: PhysicsMaterial,
}

impl<T: Scalar> SweptSphereAabb<T> {
    /// Round the corners of `aabb` with `radius`
    pub fn new(aabb: &Aabb3<T>, radius: T, physics_material: PhysicsMaterial) -> Result<Self> {
        let aabb_small = aabb.dilated(&Vector3::repeat(-radius));
        let size = aabb_small.size().min();
        if size < T::lit(MIN_SMALL_SIZE) {
            return Err(PhysicsError::BoxTooSmall {
                size: size.as_f64(),
                radius: radius.as_f64(),
            });
        }
        Ok(Self {
            aabb_small,
            radius,
            bounding_sphere: BoundingSphere::new(aabb.center(), aabb.half_width().norm()),
            physics_material,
        })
    }

    fn contact(&self, closest: &ClosestPoint<T>) -> Option<IntersectionContact<T>> {
        let overlap = self.radius - closest.distance();
        (overlap > T::lit(0.0)).then(|| IntersectionContact {
            overlap,
            point: closest.point0,
            normal: closest.direction(),
        })
    }

    /// Contact with a polygon
    pub fn intersects_polygon<const N: usize>(
        &self,
        polygon: &CollisionPolygonSphere<T, N>,
    ) -> Result<Option<IntersectionContact<T>>> {
        if !self.bounding_sphere.intersects(&polygon.bounding_sphere) {
            return Ok(None);
        }
        let closest = distance_polygon_aabb(polygon.corners(), &self.aabb_small)?;
        Ok(self.contact(&closest))
    }

    /// Contact with a ridge
    pub fn intersects_ridge(&self, ridge: &CollisionRidgeSphere<T>) -> Result<Option<IntersectionContact<T>>> {
        if !self.bounding_sphere.intersects(&ridge.bounding_sphere) {
            return Ok(None);
        }
        let closest = distance_line_aabb(&ridge.edge[0], &ridge.edge[1], &self.aabb_small)?;
        Ok(self.contact(&closest))
    }

    /// Contact with another rounded box in the same frame
    ///
    /// The contact point divides the gap between the two core boxes in the
    /// ratio of their radii.
    pub fn intersects_swept(&self, other: &Self) -> Result<Option<IntersectionContact<T>>> {
        if !self.bounding_sphere.intersects(&other.bounding_sphere) {
            return Ok(None);
        }
        let closest = distance_aabb_aabb(&other.aabb_small, &Transformation3::identity(), &self.aabb_small)?;
        let overlap = self.radius + other.radius - closest.distance();
        if overlap <= T::lit(0.0) {
            return Ok(None);
        }
        let point = closest.point0.lerp(&closest.point1, other.radius / (self.radius + other.radius));
        Ok(Some(IntersectionContact {
            overlap,
            point,
            normal: closest.direction(),
        }))
    }

    /// Rounded box moved by a translation-only transformation
    pub fn translated(&self, offset: &Vector3<T>) -> Self {
        Self {
            aabb_small: self.aabb_small.translated(offset),
            bounding_sphere: BoundingSphere::new(self.bounding_sphere.center + offset, self.bounding_sphere.radius),
            ..*self
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::physics::collision::aabb::AxisAlignedBoundingBox;
    use approx::assert_relative_eq;

    const EPSILON: f64 = 1e-10;

    fn rounded_cube(offset: Vector3<f64>, radius: f64) -> SweptSphereAabb<f64> {
        let aabb = AxisAlignedBoundingBox::from_min_max(Vector3::zeros(), Vector3::repeat(2.0)).translated(&offset);
        SweptSphereAabb::new(&aabb, radius, PhysicsMaterial::ATTR_COLLIDE).unwrap()
    }

    #[test]
    fn test_radius_too_large_is_rejected() {
        let aabb = AxisAlignedBoundingBox::from_min_max(Vector3::zeros(), Vector3::repeat(1.0));
        assert!(matches!(
            SweptSphereAabb::new(&aabb, 0.5, PhysicsMaterial::empty()),
            Err(PhysicsError::BoxTooSmall { .. })
        ));
    }

    #[test]
    fn test_polygon_grazing_rounded_face() {
        let b = rounded_cube(Vector3::zeros(), 0.5);
        // Floor triangle 0.2 below the rounded box
        let floor = CollisionPolygonSphere::new(
            [Vector3::new(-5.0, -5.0, -0.2), Vector3::new(5.0, -5.0, -0.2), Vector3::new(0.0, 5.0, -0.2)],
            PhysicsMaterial::ATTR_COLLIDE,
        )
        .unwrap();
        assert!(b.intersects_polygon(&floor).unwrap().is_none());

        let raised = floor.transformed(&Transformation3::from_translation(Vector3::new(0.0, 0.0, 0.3)));
        let contact = b.intersects_polygon(&raised).unwrap().unwrap();
        assert_relative_eq!(contact.overlap, 0.1, epsilon = EPSILON);
        assert_relative_eq!(contact.normal, Vector3::z(), epsilon = EPSILON);
    }

    #[test]
    fn test_ridge_contact() {
        let b = rounded_cube(Vector3::zeros(), 0.5);
        let ridge = CollisionRidgeSphere::new(
            &Vector3::new(1.0, -3.0, 1.75),
            &Vector3::new(1.0, 3.0, 1.75),
            &Vector3::z(),
            PhysicsMaterial::ATTR_COLLIDE,
        )
        .unwrap();
        let contact = b.intersects_ridge(&ridge).unwrap().unwrap();
        assert_relative_eq!(contact.overlap, 0.25, epsilon = EPSILON);
        assert_relative_eq!(contact.normal, -Vector3::z(), epsilon = EPSILON);
    }

    #[test]
    fn test_swept_boxes_split_contact_point_by_radius() {
        let a = rounded_cube(Vector3::zeros(), 0.5);
        let b = rounded_cube(Vector3::new(2.5, 0.0, 0.0), 0.25);
        // Core boxes: a up to x = 1.5, b from x = 2.75, gap 1.25 exceeds 0.75
        assert!(a.intersects_swept(&b).unwrap().is_none());

        let c = rounded_cube(Vector3::new(2.0, 0.0, 0.0), 0.5);
        // Core boxes: a up to x = 1.5, c from x = 2.5; gap 1.0 = r0 + r1
        assert!(a.intersects_swept(&c).unwrap().is_none());

        let d = c.translated(&Vector3::new(-0.2, 0.0, 0.0));
        let contact = a.intersects_swept(&d).unwrap().unwrap();
        assert_relative_eq!(contact.overlap, 0.2, epsilon = EPSILON);
        assert_relative_eq!(contact.point.x, 1.9, epsilon = EPSILON);
    }
}
