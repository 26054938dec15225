//! Collision geometry and narrow phase
//!
//! Primitives, collision polygons and ridges, meshes built from them and the
//! separating-axis routines that turn them into contact planes. Every type
//! is generic over [`Scalar`](crate::foundation::math::Scalar) so geometry
//! can be stored in compressed precision and converted for physics.

pub mod aabb;
pub mod distance;
pub mod material;
pub mod mesh;
pub mod polygon;
pub mod primitives;
pub mod ray_aabb;
pub mod ridge;
pub mod sat;
pub mod swept_sphere_aabb;

pub use aabb::{Aabb3, AxisAlignedBoundingBox};
pub use distance::ClosestPoint;
pub use material::PhysicsMaterial;
pub use mesh::{resolve_ridge, IntersectableList, IntersectableMesh, MeshArena, MeshQuery, RidgeMesh, TriangleMesh};
pub use polygon::{CollisionPolygonSphere, CollisionQuadSphere, CollisionTriangleSphere};
pub use primitives::{ray_intersects_triangle, line_intersects_triangle, BoundingSphere, ConvexPolygon3D, Plane3, RaySegment3D};
pub use ray_aabb::RaySegment3DForAabb;
pub use ridge::{CollisionRidgeSphere, CollisionRidges, RidgeState, SingleFaceBehavior, RIDGE_COS_TOLERANCE};
pub use sat::{get_overlap2, sat_overlap_signed, sat_overlap_unsigned, AxisSource, SatOverlap, SatTracker};
pub use swept_sphere_aabb::{IntersectionContact, SweptSphereAabb};
