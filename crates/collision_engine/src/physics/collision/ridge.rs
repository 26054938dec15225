//! Collision ridges: mesh edges as first-class collision features
//!
//! Every edge of a triangle mesh becomes a [`CollisionRidgeSphere`] carrying a
//! [`RidgeState`]. The state records whether the edge may take part in
//! edge/edge separating-axis tests and, if so, which contact normals are
//! legitimate at that edge:
//!
//! ```text
//!                 combine (second face)
//!  Unfinalized ─────────────────────────────► Oriented(cos) ──┐
//!      │   │                                                  │ combine (third face)
//!      │   └──── combine, knife edge ───────► Untouchable ────┤
//!      │                                                      ▼
//!      └──── finalize (border edge) ────────► Oriented(0)   Seam360
//! ```
//!
//! The cosine stored in [`RidgeState::Oriented`] is the dot product of the
//! two adjacent outward face normals: `1` for a flat continuation, `0` for a
//! right-angle edge, approaching `-1` for a knife edge.

use std::collections::BTreeMap;

use crate::foundation::math::{convert_vector, Scalar, Transformation3, Vector3};
use crate::physics::error::Result;

use super::material::PhysicsMaterial;
use super::primitives::{BoundingSphere, RaySegment3D};

/// Margin by which a face-normal cosine must clear `max_min_cos_ridge`
pub const RIDGE_COS_TOLERANCE: f64 = 1e-4;

/// Classification of a ridge
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum RidgeState {
    /// Seen from exactly one face so far
    Unfinalized,
    /// Excluded from collision
    Untouchable,
    /// Closed seam or ambiguous topology; every incident normal is accepted
    Seam360,
    /// Genuine edge with the cosine between its two outward face normals
    ///
    /// `1` on a flat seam, `-1/3` on a regular tetrahedron edge.
    Oriented(f64),
}

/// How still unfinalized single-face ridges are treated by [`CollisionRidgeSphere::is_touchable`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SingleFaceBehavior {
    /// Single-face ridges take part in collisions
    Touchable,
    /// Single-face ridges are rejected unless two-sided
    Untouchable,
}

/// One mesh edge with bounding sphere, material, normal and classification
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CollisionRidgeSphere<T: Scalar> {
    /// Sphere around the edge
    pub bounding_sphere: BoundingSphere<T>,
    /// Material flags
    pub physics_material: PhysicsMaterial,
    /// Endpoints in the winding order of the first face
    pub edge: [Vector3<T>; 2],
    /// Segment view of the edge
    pub ray: RaySegment3D<T>,
    /// Face normal while unfinalized, contact normal afterwards
    pub normal: Vector3<T>,
    /// Classification
    pub state: RidgeState,
}

impl<T: Scalar> CollisionRidgeSphere<T> {
    /// Ridge for the edge `a -> b` of a face with outward normal `normal`
    pub fn new(a: &Vector3<T>, b: &Vector3<T>, normal: &Vector3<T>, physics_material: PhysicsMaterial) -> Result<Self> {
        let ray = RaySegment3D::from_points(a, b)?;
        Ok(Self {
            bounding_sphere: ray.bounding_sphere(),
            physics_material,
            edge: [*a, *b],
            ray,
            normal: *normal,
            state: RidgeState::Unfinalized,
        })
    }

    /// In-plane unit vector perpendicular to the edge, pointing away from the face
    ///
    /// Only meaningful while the normal is still the face normal.
    pub fn tangent(&self) -> Vector3<T> {
        self.ray.direction.cross(&self.normal).normalize()
    }

    /// Whether the material makes the ridge collide from both sides
    pub fn is_two_sided(&self) -> bool {
        self.physics_material.is_two_sided()
    }

    /// Whether the ridge may take part in collisions
    pub fn is_touchable(&self, behavior: SingleFaceBehavior) -> bool {
        match self.state {
            RidgeState::Untouchable => false,
            RidgeState::Unfinalized => behavior == SingleFaceBehavior::Touchable || self.is_two_sided(),
            RidgeState::Seam360 | RidgeState::Oriented(_) => true,
        }
    }

    /// Whether the ridge restricts contact normals to a cone
    ///
    /// # Panics
    ///
    /// Panics if the ridge is unfinalized or untouchable, which means mesh
    /// preprocessing skipped a step.
    pub fn is_oriented(&self) -> bool {
        match self.state {
            RidgeState::Oriented(_) => true,
            RidgeState::Seam360 => false,
            RidgeState::Unfinalized => panic!("orientation queried on unfinalized ridge {:?}", self.edge),
            RidgeState::Untouchable => panic!("orientation queried on untouchable ridge {:?}", self.edge),
        }
    }

    /// Cosine of an oriented ridge
    pub fn min_cos(&self) -> Option<f64> {
        match self.state {
            RidgeState::Oriented(c) => Some(c),
            _ => None,
        }
    }

    /// Merge the contribution of another face sharing this edge
    pub fn combine(&mut self, other: &Self, max_min_cos_ridge: f64) {
        match self.state {
            RidgeState::Seam360 => return,
            RidgeState::Oriented(_) | RidgeState::Untouchable => {
                log::warn!("Ridge {:?} is shared by more than two faces, accepting all normals", self.edge);
                self.state = RidgeState::Seam360;
                return;
            }
            RidgeState::Unfinalized => {}
        }
        if self.is_two_sided() != other.is_two_sided() {
            log::warn!("Ridge {:?} joins a one-sided and a two-sided face", self.edge);
        }
        self.physics_material |= other.physics_material & PhysicsMaterial::ATTR_TWO_SIDED;

        let cos = self.normal.dot(&other.normal).as_f64();
        if cos - max_min_cos_ridge < RIDGE_COS_TOLERANCE {
            self.state = RidgeState::Untouchable;
            return;
        }
        let tangent = self.tangent();
        match (self.normal + other.normal).try_normalize(T::lit(1e-6)) {
            Some(n) => {
                self.normal = n;
                self.state = RidgeState::Oriented(cos);
            }
            None => {
                log::trace!("Ridge {:?} has opposing normals, using the tangent", self.edge);
                self.normal = tangent;
                self.state = RidgeState::Oriented(0.0);
            }
        }
    }

    /// Turn a border edge into an oriented ridge whose normal is the tangent
    ///
    /// Oriented and 360° ridges are left unchanged.
    ///
    /// # Panics
    ///
    /// Panics on an untouchable ridge.
    pub fn finalize(&mut self) {
        match self.state {
            RidgeState::Unfinalized => {
                self.normal = self.tangent();
                self.state = RidgeState::Oriented(0.0);
            }
            RidgeState::Untouchable => panic!("finalize called on untouchable ridge {:?}", self.edge),
            RidgeState::Seam360 | RidgeState::Oriented(_) => {}
        }
    }

    /// Ridge moved by a rigid transformation, classification unchanged
    pub fn transformed(&self, trafo: &Transformation3<T>) -> Self {
        Self {
            bounding_sphere: self.bounding_sphere.transformed(trafo),
            physics_material: self.physics_material,
            edge: self.edge.map(|p| trafo.transform_point(&p)),
            ray: self.ray.transformed(trafo),
            normal: trafo.rotate(&self.normal),
            state: self.state,
        }
    }

    /// Convert to another scalar type
    pub fn convert<U: Scalar>(&self) -> CollisionRidgeSphere<U> {
        CollisionRidgeSphere {
            bounding_sphere: self.bounding_sphere.convert(),
            physics_material: self.physics_material,
            edge: self.edge.map(|p| convert_vector(&p)),
            ray: self.ray.convert(),
            normal: convert_vector(&self.normal),
            state: self.state,
        }
    }
}

type EdgeKey = ([u64; 3], [u64; 3]);

fn point_key<T: Scalar>(p: &Vector3<T>) -> [u64; 3] {
    // +0.0 and -0.0 must map to the same key
    [p.x, p.y, p.z].map(|c| (c.as_f64() + 0.0).to_bits())
}

/// Builder collecting the ridges of a mesh face by face
#[derive(Debug, Clone)]
pub struct CollisionRidges<T: Scalar> {
    ridges: BTreeMap<EdgeKey, CollisionRidgeSphere<T>>,
}

impl<T: Scalar> Default for CollisionRidges<T> {
    fn default() -> Self {
        Self { ridges: BTreeMap::new() }
    }
}

impl<T: Scalar> CollisionRidges<T> {
    /// Create an empty builder
    pub fn new() -> Self {
        Self::default()
    }

    /// Add every edge of a face, combining with edges seen before
    pub fn insert<const N: usize>(
        &mut self,
        corners: &[Vector3<T>; N],
        normal: &Vector3<T>,
        max_min_cos_ridge: f64,
        physics_material: PhysicsMaterial,
    ) {
        for i in 0..N {
            let a = &corners[i];
            let b = &corners[(i + 1) % N];
            let Ok(ridge) = CollisionRidgeSphere::new(a, b, normal, physics_material) else {
                log::trace!("Skipping zero-length edge at {a:?}");
                continue;
            };
            let (ka, kb) = (point_key(a), point_key(b));
            let key = if ka <= kb { (ka, kb) } else { (kb, ka) };
            self.ridges
                .entry(key)
                .and_modify(|existing| existing.combine(&ridge, max_min_cos_ridge))
                .or_insert(ridge);
        }
    }

    /// Number of distinct edges
    pub fn len(&self) -> usize {
        self.ridges.len()
    }

    /// Whether no edge was inserted
    pub fn is_empty(&self) -> bool {
        self.ridges.is_empty()
    }

    /// Iterate the ridges in their current state
    pub fn iter(&self) -> impl Iterator<Item = &CollisionRidgeSphere<T>> {
        self.ridges.values()
    }

    /// Keep the ridges touchable under [`SingleFaceBehavior::Untouchable`] and finalize them
    pub fn into_finalized(self) -> Vec<CollisionRidgeSphere<T>> {
        self.ridges
            .into_values()
            .filter(|r| r.is_touchable(SingleFaceBehavior::Untouchable))
            .map(|mut r| {
                r.finalize();
                r
            })
            .collect()
    }
}
