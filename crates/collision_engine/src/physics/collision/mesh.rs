//! Collision meshes
//!
//! Three kinds of intersectable geometry exist: triangle meshes (with the
//! ridges derived from their edges), bare ridge meshes and lists of rounded
//! boxes. They share the [`MeshQuery`] trait and are stored as the closed enum
//! [`IntersectableMesh`] inside a [`MeshArena`].

use crate::foundation::collections::{MeshKey, RidgeHandle, SlotMap};
use crate::foundation::math::{Scalar, Transformation3, Vector3};
use crate::physics::error::{PhysicsError, Result};

use super::aabb::Aabb3;
use super::material::PhysicsMaterial;
use super::polygon::{CollisionQuadSphere, CollisionTriangleSphere};
use super::primitives::{BoundingSphere, Plane3};
use super::ridge::{CollisionRidgeSphere, CollisionRidges};
use super::swept_sphere_aabb::SweptSphereAabb;

/// Read access shared by every mesh kind
pub trait MeshQuery<T: Scalar> {
    /// Debug name
    fn name(&self) -> &str;

    /// Sphere around the whole mesh
    fn bounding_sphere(&self) -> &BoundingSphere<T>;

    /// Box around the whole mesh
    fn aabb(&self) -> &Aabb3<T>;

    /// Collision triangles
    fn triangles(&self) -> &[CollisionTriangleSphere<T>] {
        &[]
    }

    /// Collision quads
    fn quads(&self) -> &[CollisionQuadSphere<T>] {
        &[]
    }

    /// Finalized ridges
    fn ridges(&self) -> &[CollisionRidgeSphere<T>] {
        &[]
    }

    /// Rounded boxes
    fn intersectables(&self) -> &[SweptSphereAabb<T>] {
        &[]
    }

    /// Whether the mesh may touch a sphere
    fn intersects_sphere(&self, sphere: &BoundingSphere<T>) -> bool {
        self.bounding_sphere().intersects(sphere)
    }

    /// Whether the mesh may touch a plane
    fn intersects_plane(&self, plane: &Plane3<T>) -> bool {
        self.bounding_sphere().intersects_plane(plane)
    }
}

fn bounds_of<'a, T: Scalar>(points: impl Iterator<Item = &'a Vector3<T>>) -> (BoundingSphere<T>, Aabb3<T>) {
    let points: Vec<Vector3<T>> = points.copied().collect();
    if points.is_empty() {
        return (BoundingSphere::new(Vector3::zeros(), T::lit(0.0)), Aabb3::empty());
    }
    (BoundingSphere::from_points(&points), Aabb3::from_points(points.iter()))
}

/// Triangles and quads together with the ridges of their edges
#[derive(Debug, Clone)]
pub struct TriangleMesh<T: Scalar> {
    name: String,
    triangles: Vec<CollisionTriangleSphere<T>>,
    quads: Vec<CollisionQuadSphere<T>>,
    ridges: Vec<CollisionRidgeSphere<T>>,
    bounding_sphere: BoundingSphere<T>,
    aabb: Aabb3<T>,
}

impl<T: Scalar> TriangleMesh<T> {
    /// Build a mesh and derive its ridges
    ///
    /// Edges shared by two faces are combined with `max_min_cos_ridge`;
    /// one-sided border edges are dropped.
    pub fn new(
        name: impl Into<String>,
        triangles: Vec<CollisionTriangleSphere<T>>,
        quads: Vec<CollisionQuadSphere<T>>,
        max_min_cos_ridge: f64,
    ) -> Self {
        let mut builder = CollisionRidges::new();
        for t in &triangles {
            builder.insert(t.corners(), t.normal(), max_min_cos_ridge, t.physics_material);
        }
        for q in &quads {
            builder.insert(q.corners(), q.normal(), max_min_cos_ridge, q.physics_material);
        }
        let name = name.into();
        let ridges = builder.into_finalized();
        log::debug!(
            "Mesh \"{name}\": {} triangles, {} quads, {} ridges",
            triangles.len(),
            quads.len(),
            ridges.len()
        );
        let (bounding_sphere, aabb) = bounds_of(
            triangles
                .iter()
                .flat_map(|t| t.corners().iter())
                .chain(quads.iter().flat_map(|q| q.corners().iter())),
        );
        Self {
            name,
            triangles,
            quads,
            ridges,
            bounding_sphere,
            aabb,
        }
    }

    /// Build a triangle mesh from positions and index triples, skipping faces without area
    ///
    /// Fails with [`PhysicsError::VertexIndexOutOfRange`] if a face points past `positions`.
    pub fn from_indexed(
        name: impl Into<String>,
        positions: &[Vector3<T>],
        faces: &[[usize; 3]],
        physics_material: PhysicsMaterial,
        max_min_cos_ridge: f64,
    ) -> Result<Self> {
        let mut triangles = Vec::with_capacity(faces.len());
        for face in faces {
            let mut corners = [Vector3::zeros(); 3];
            for (corner, &index) in corners.iter_mut().zip(face) {
                *corner = *positions.get(index).ok_or(PhysicsError::VertexIndexOutOfRange {
                    index,
                    len: positions.len(),
                })?;
            }
            triangles.extend(CollisionTriangleSphere::new(corners, physics_material));
        }
        Ok(Self::new(name, triangles, Vec::new(), max_min_cos_ridge))
    }

    /// Mesh moved by a rigid transformation, ridge classification carried through
    pub fn transformed(&self, trafo: &Transformation3<T>) -> Self {
        Self {
            name: self.name.clone(),
            triangles: self.triangles.iter().map(|t| t.transformed(trafo)).collect(),
            quads: self.quads.iter().map(|q| q.transformed(trafo)).collect(),
            ridges: self.ridges.iter().map(|r| r.transformed(trafo)).collect(),
            bounding_sphere: self.bounding_sphere.transformed(trafo),
            aabb: self.aabb.transformed(trafo),
        }
    }

    /// Convert to another scalar type
    pub fn convert<U: Scalar>(&self) -> TriangleMesh<U> {
        TriangleMesh {
            name: self.name.clone(),
            triangles: self.triangles.iter().map(CollisionTriangleSphere::convert).collect(),
            quads: self.quads.iter().map(CollisionQuadSphere::convert).collect(),
            ridges: self.ridges.iter().map(CollisionRidgeSphere::convert).collect(),
            bounding_sphere: self.bounding_sphere.convert(),
            aabb: self.aabb.convert(),
        }
    }
}

impl<T: Scalar> MeshQuery<T> for TriangleMesh<T> {
    fn name(&self) -> &str {
        &self.name
    }

    fn bounding_sphere(&self) -> &BoundingSphere<T> {
        &self.bounding_sphere
    }

    fn aabb(&self) -> &Aabb3<T> {
        &self.aabb
    }

    fn triangles(&self) -> &[CollisionTriangleSphere<T>] {
        &self.triangles
    }

    fn quads(&self) -> &[CollisionQuadSphere<T>] {
        &self.quads
    }

    fn ridges(&self) -> &[CollisionRidgeSphere<T>] {
        &self.ridges
    }
}

/// Ridges without faces, e.g. tire contact lines
#[derive(Debug, Clone)]
pub struct RidgeMesh<T: Scalar> {
    name: String,
    ridges: Vec<CollisionRidgeSphere<T>>,
    bounding_sphere: BoundingSphere<T>,
    aabb: Aabb3<T>,
}

impl<T: Scalar> RidgeMesh<T> {
    /// Wrap finalized ridges
    pub fn new(name: impl Into<String>, ridges: Vec<CollisionRidgeSphere<T>>) -> Self {
        let (bounding_sphere, aabb) = bounds_of(ridges.iter().flat_map(|r| r.edge.iter()));
        Self {
            name: name.into(),
            ridges,
            bounding_sphere,
            aabb,
        }
    }

    /// Mesh moved by a rigid transformation
    pub fn transformed(&self, trafo: &Transformation3<T>) -> Self {
        Self::new(self.name.clone(), self.ridges.iter().map(|r| r.transformed(trafo)).collect())
    }
}

impl<T: Scalar> MeshQuery<T> for RidgeMesh<T> {
    fn name(&self) -> &str {
        &self.name
    }

    fn bounding_sphere(&self) -> &BoundingSphere<T> {
        &self.bounding_sphere
    }

    fn aabb(&self) -> &Aabb3<T> {
        &self.aabb
    }

    fn ridges(&self) -> &[CollisionRidgeSphere<T>] {
        &self.ridges
    }
}

/// Rounded boxes sharing one mesh slot
#[derive(Debug, Clone)]
pub struct IntersectableList<T: Scalar> {
    name: String,
    items: Vec<SweptSphereAabb<T>>,
    bounding_sphere: BoundingSphere<T>,
    aabb: Aabb3<T>,
}

impl<T: Scalar> IntersectableList<T> {
    /// Wrap a list of rounded boxes
    pub fn new(name: impl Into<String>, items: Vec<SweptSphereAabb<T>>) -> Self {
        let mut aabb = Aabb3::empty();
        for item in &items {
            aabb.extend(&item.aabb_small.dilated(&Vector3::repeat(item.radius)));
        }
        let bounding_sphere = if items.is_empty() {
            BoundingSphere::new(Vector3::zeros(), T::lit(0.0))
        } else {
            BoundingSphere::new(aabb.center(), aabb.half_width().norm())
        };
        Self {
            name: name.into(),
            items,
            bounding_sphere,
            aabb,
        }
    }

    /// List moved by a translation
    pub fn translated(&self, offset: &Vector3<T>) -> Self {
        Self::new(self.name.clone(), self.items.iter().map(|i| i.translated(offset)).collect())
    }
}

impl<T: Scalar> MeshQuery<T> for IntersectableList<T> {
    fn name(&self) -> &str {
        &self.name
    }

    fn bounding_sphere(&self) -> &BoundingSphere<T> {
        &self.bounding_sphere
    }

    fn aabb(&self) -> &Aabb3<T> {
        &self.aabb
    }

    fn intersectables(&self) -> &[SweptSphereAabb<T>] {
        &self.items
    }
}

/// Any collision mesh
#[derive(Debug, Clone)]
pub enum IntersectableMesh<T: Scalar> {
    /// Faces and derived ridges
    TriangleMesh(TriangleMesh<T>),
    /// Ridges only
    RidgeMesh(RidgeMesh<T>),
    /// Rounded boxes
    IntersectableList(IntersectableList<T>),
}

impl<T: Scalar> IntersectableMesh<T> {
    fn as_query(&self) -> &dyn MeshQuery<T> {
        match self {
            Self::TriangleMesh(m) => m,
            Self::RidgeMesh(m) => m,
            Self::IntersectableList(m) => m,
        }
    }
}

impl<T: Scalar> MeshQuery<T> for IntersectableMesh<T> {
    fn name(&self) -> &str {
        self.as_query().name()
    }

    fn bounding_sphere(&self) -> &BoundingSphere<T> {
        self.as_query().bounding_sphere()
    }

    fn aabb(&self) -> &Aabb3<T> {
        self.as_query().aabb()
    }

    fn triangles(&self) -> &[CollisionTriangleSphere<T>] {
        self.as_query().triangles()
    }

    fn quads(&self) -> &[CollisionQuadSphere<T>] {
        self.as_query().quads()
    }

    fn ridges(&self) -> &[CollisionRidgeSphere<T>] {
        self.as_query().ridges()
    }

    fn intersectables(&self) -> &[SweptSphereAabb<T>] {
        self.as_query().intersectables()
    }
}

impl<T: Scalar> From<TriangleMesh<T>> for IntersectableMesh<T> {
    fn from(mesh: TriangleMesh<T>) -> Self {
        Self::TriangleMesh(mesh)
    }
}

impl<T: Scalar> From<RidgeMesh<T>> for IntersectableMesh<T> {
    fn from(mesh: RidgeMesh<T>) -> Self {
        Self::RidgeMesh(mesh)
    }
}

impl<T: Scalar> From<IntersectableList<T>> for IntersectableMesh<T> {
    fn from(mesh: IntersectableList<T>) -> Self {
        Self::IntersectableList(mesh)
    }
}

/// Owner of every collision mesh; ridges are addressed through [`RidgeHandle`]
pub type MeshArena<T> = SlotMap<MeshKey, IntersectableMesh<T>>;

/// Look up a ridge, `None` if the mesh was removed or the index is out of range
pub fn resolve_ridge<T: Scalar>(arena: &MeshArena<T>, handle: RidgeHandle) -> Option<&CollisionRidgeSphere<T>> {
    arena.get(handle.mesh)?.ridges().get(handle.index)
}
