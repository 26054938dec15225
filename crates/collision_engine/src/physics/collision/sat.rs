//! Separating-axis overlap
//!
//! [`get_overlap2`] resolves a single ridge against a mesh and is the
//! narrow phase used for ridge contacts. [`SatTracker`] resolves two convex
//! meshes against each other and caches the result per mesh pair.
//!
//! All computations run in [`ScenePos`] precision regardless of the mesh
//! scalar type.

use std::collections::{BTreeSet, HashMap};

use crate::core::SatConfig;
use crate::foundation::collections::MeshKey;
use crate::foundation::math::{convert_vector, Scalar, ScenePos, Vector3};
use crate::physics::error::{PhysicsError, Result};

use super::mesh::MeshQuery;
use super::ridge::CollisionRidgeSphere;

/// Where the winning axis of [`get_overlap2`] came from
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AxisSource {
    /// The reversed normal of the incoming ridge
    KeptNormal,
    /// A face normal of the mesh
    FaceNormal,
    /// Cross product of two edge directions
    EdgeCross,
}

/// Minimum overlap and the axis it was found on
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SatOverlap {
    /// Penetration depth along `normal`, negative when separated
    pub overlap: ScenePos,
    /// Unit axis
    pub normal: Vector3<ScenePos>,
    /// Axis origin
    pub source: AxisSource,
}

/// Overlap of `vertices0` and `vertices1` along the oriented axis `normal`
///
/// Positive when the projections overlap, i.e. how far `vertices1` would
/// have to move along `normal` to separate. A NaN in the axis or in any
/// vertex yields NaN.
pub fn sat_overlap_signed(
    normal: &Vector3<ScenePos>,
    vertices0: &[Vector3<ScenePos>],
    vertices1: &[Vector3<ScenePos>],
) -> ScenePos {
    let max0 = vertices0.iter().map(|v| normal.dot(v)).fold(f64::NEG_INFINITY, nan_max);
    let min1 = vertices1.iter().map(|v| normal.dot(v)).fold(f64::INFINITY, |a, b| -nan_max(-a, -b));
    max0 - min1
}

/// `f64::max` that keeps NaN instead of discarding it
fn nan_max(a: ScenePos, b: ScenePos) -> ScenePos {
    if a.is_nan() || b.is_nan() {
        f64::NAN
    } else {
        a.max(b)
    }
}

/// Overlap along the unoriented axis `normal`, returned with the direction giving the smaller value
pub fn sat_overlap_unsigned(
    normal: &Vector3<ScenePos>,
    vertices0: &[Vector3<ScenePos>],
    vertices1: &[Vector3<ScenePos>],
) -> (ScenePos, Vector3<ScenePos>) {
    let forward = sat_overlap_signed(normal, vertices0, vertices1);
    let backward = sat_overlap_signed(&-normal, vertices0, vertices1);
    if backward < forward {
        (backward, -normal)
    } else {
        (forward, *normal)
    }
}

fn point_key(p: &Vector3<ScenePos>) -> [u64; 3] {
    [p.x, p.y, p.z].map(|c| (c + 0.0).to_bits())
}

#[derive(Default)]
struct Candidate {
    best: Option<SatOverlap>,
}

impl Candidate {
    fn offer(&mut self, overlap: ScenePos, normal: Vector3<ScenePos>, source: AxisSource) -> Result<()> {
        if overlap.is_nan() {
            return Err(PhysicsError::NanInput { context: "separating axis overlap" });
        }
        if self.best.map_or(true, |b| overlap < b.overlap) {
            self.best = Some(SatOverlap { overlap, normal, source });
        }
        Ok(())
    }
}

/// Minimum overlap of a ridge against the nearby features of a mesh
///
/// Candidate axes, in order:
/// 1. the reversed normal of `ridge1`, only if its overlap is below `max_keep_normal`
/// 2. face normals of mesh polygons near the ridge
/// 3. cross products of nearby mesh ridge directions with `ridge1`, restricted to
///    the normal cone of the oriented mesh ridge
///
/// Ties go to the earlier candidate. Returns `None` when nothing of the
/// mesh is near the ridge.
///
/// # Panics
///
/// Panics if the mesh carries unfinalized or untouchable ridges.
pub fn get_overlap2<T, M>(
    mesh0: &M,
    ridge1: &CollisionRidgeSphere<T>,
    max_keep_normal: ScenePos,
    config: &SatConfig,
) -> Result<Option<SatOverlap>>
where
    T: Scalar,
    M: MeshQuery<T> + ?Sized,
{
    let sphere1 = &ridge1.bounding_sphere;
    let mut vertices0 = Vec::new();
    let mut face_normals = Vec::new();
    for t in mesh0.triangles() {
        if t.bounding_sphere.intersects(sphere1) && sphere1.intersects_plane(t.plane()) {
            vertices0.extend(t.corners().iter().map(convert_vector::<T, ScenePos, 3>));
            face_normals.push(convert_vector::<T, ScenePos, 3>(t.normal()));
        }
    }
    for q in mesh0.quads() {
        if q.bounding_sphere.intersects(sphere1) && sphere1.intersects_plane(q.plane()) {
            vertices0.extend(q.corners().iter().map(convert_vector::<T, ScenePos, 3>));
            face_normals.push(convert_vector::<T, ScenePos, 3>(q.normal()));
        }
    }
    let ridges0: Vec<&CollisionRidgeSphere<T>> =
        mesh0.ridges().iter().filter(|r| r.bounding_sphere.intersects(sphere1)).collect();
    for r in &ridges0 {
        vertices0.extend(r.edge.iter().map(convert_vector::<T, ScenePos, 3>));
    }
    if vertices0.is_empty() {
        return Ok(None);
    }
    let vertices1 = ridge1.edge.map(|p| convert_vector::<T, ScenePos, 3>(&p));

    let mut candidate = Candidate::default();

    let kept = -convert_vector::<T, ScenePos, 3>(&ridge1.normal);
    let kept_overlap = sat_overlap_signed(&kept, &vertices0, &vertices1);
    if kept_overlap.is_nan() {
        return Err(PhysicsError::NanInput { context: "get_overlap2 kept normal" });
    }
    if kept_overlap < max_keep_normal {
        candidate.offer(kept_overlap, kept, AxisSource::KeptNormal)?;
    }

    for n in face_normals {
        candidate.offer(sat_overlap_signed(&n, &vertices0, &vertices1), n, AxisSource::FaceNormal)?;
    }

    let dir1 = convert_vector::<T, ScenePos, 3>(&ridge1.ray.direction);
    for r0 in ridges0 {
        let axis = convert_vector::<T, ScenePos, 3>(&r0.ray.direction).cross(&dir1);
        if axis.norm_squared() < config.min_axis_length2 {
            continue;
        }
        let ridge_normal = convert_vector::<T, ScenePos, 3>(&r0.normal);
        let mut axis = axis.normalize();
        if axis.dot(&ridge_normal) < 0.0 {
            axis = -axis;
        }
        if r0.is_oriented() {
            let min_cos = r0.min_cos().unwrap_or(-1.0);
            if axis.dot(&ridge_normal) < min_cos - config.min_cos_tolerance {
                continue;
            }
        }
        candidate.offer(sat_overlap_signed(&axis, &vertices0, &vertices1), axis, AxisSource::EdgeCross)?;
    }
    Ok(candidate.best)
}

/// Distinct corners of all polygons of a mesh
fn mesh_vertices<T: Scalar, M: MeshQuery<T> + ?Sized>(mesh: &M) -> Vec<Vector3<ScenePos>> {
    let mut seen = BTreeSet::new();
    mesh.triangles()
        .iter()
        .flat_map(|t| t.corners().iter())
        .chain(mesh.quads().iter().flat_map(|q| q.corners().iter()))
        .chain(mesh.ridges().iter().flat_map(|r| r.edge.iter()))
        .map(convert_vector::<T, ScenePos, 3>)
        .filter(|p| seen.insert(point_key(p)))
        .collect()
}

/// Distinct edge directions of a mesh, each up to sign
fn mesh_edge_directions<T: Scalar, M: MeshQuery<T> + ?Sized>(mesh: &M) -> Vec<Vector3<ScenePos>> {
    let mut seen = BTreeSet::new();
    mesh.ridges()
        .iter()
        .map(|r| convert_vector::<T, ScenePos, 3>(&r.ray.direction))
        .map(|d| {
            let flip = d.iter().find(|c| **c != 0.0).map_or(false, |c| *c < 0.0);
            if flip {
                -d
            } else {
                d
            }
        })
        .filter(|d| seen.insert(point_key(d)))
        .collect()
}

/// Cached separating-axis resolution between pairs of convex meshes
#[derive(Debug, Default)]
pub struct SatTracker {
    config: SatConfig,
    cache: HashMap<(MeshKey, MeshKey), (ScenePos, Vector3<ScenePos>)>,
}

impl SatTracker {
    /// Create an empty tracker
    pub fn new(config: SatConfig) -> Self {
        Self {
            config,
            cache: HashMap::new(),
        }
    }

    /// Collision plane `(overlap, normal)` between two convex meshes
    ///
    /// The normal points from `mesh0` towards `mesh1`. Results are cached
    /// under the key pair until [`clear`](Self::clear).
    pub fn get_collision_plane<T, M0, M1>(
        &mut self,
        key0: MeshKey,
        mesh0: &M0,
        key1: MeshKey,
        mesh1: &M1,
    ) -> Result<(ScenePos, Vector3<ScenePos>)>
    where
        T: Scalar,
        M0: MeshQuery<T> + ?Sized,
        M1: MeshQuery<T> + ?Sized,
    {
        if let Some(cached) = self.cache.get(&(key0, key1)) {
            return Ok(*cached);
        }
        let vertices0 = mesh_vertices(mesh0);
        let vertices1 = mesh_vertices(mesh1);
        let mut candidate = Candidate::default();

        for t in mesh0.triangles() {
            let n = convert_vector::<T, ScenePos, 3>(t.normal());
            candidate.offer(sat_overlap_signed(&n, &vertices0, &vertices1), n, AxisSource::FaceNormal)?;
        }
        for q in mesh0.quads() {
            let n = convert_vector::<T, ScenePos, 3>(q.normal());
            candidate.offer(sat_overlap_signed(&n, &vertices0, &vertices1), n, AxisSource::FaceNormal)?;
        }
        for t in mesh1.triangles() {
            let n = -convert_vector::<T, ScenePos, 3>(t.normal());
            candidate.offer(sat_overlap_signed(&n, &vertices0, &vertices1), n, AxisSource::FaceNormal)?;
        }
        for q in mesh1.quads() {
            let n = -convert_vector::<T, ScenePos, 3>(q.normal());
            candidate.offer(sat_overlap_signed(&n, &vertices0, &vertices1), n, AxisSource::FaceNormal)?;
        }

        let edges1 = mesh_edge_directions(mesh1);
        for e0 in mesh_edge_directions(mesh0) {
            for e1 in &edges1 {
                let axis = e0.cross(e1);
                if axis.norm_squared() < self.config.min_axis_length2 {
                    continue;
                }
                let (overlap, normal) = sat_overlap_unsigned(&axis.normalize(), &vertices0, &vertices1);
                candidate.offer(overlap, normal, AxisSource::EdgeCross)?;
            }
        }

        let best = candidate.best.ok_or_else(|| PhysicsError::NoOverlapCandidates {
            mesh0: mesh0.name().to_string(),
            mesh1: mesh1.name().to_string(),
        })?;
        log::debug!(
            "SAT {} / {}: overlap {} along {:?} ({:?})",
            mesh0.name(),
            mesh1.name(),
            best.overlap,
            best.normal,
            best.source
        );
        self.cache.insert((key0, key1), (best.overlap, best.normal));
        Ok((best.overlap, best.normal))
    }

    /// Number of cached pairs
    pub fn len(&self) -> usize {
        self.cache.len()
    }

    /// Whether nothing is cached
    pub fn is_empty(&self) -> bool {
        self.cache.is_empty()
    }

    /// Forget every cached pair
    pub fn clear(&mut self) {
        self.cache.clear();
    }
}
