//! Line-of-sight queries against the collision scene
//!
//! The path between two points is cut into steps no longer than twice the
//! configured static radius. Each step is bounded by a sphere that first
//! filters whole meshes, then individual polygons, before the exact
//! segment test runs.

use crate::core::{GridConfig, QueryConfig};
use crate::foundation::collections::{BodyKey, MeshKey, SlotMap};
use crate::foundation::math::{convert_vector, Scalar, ScenePos, Vector3};
use crate::physics::collision::{
    Aabb3, BoundingSphere, MeshArena, MeshQuery, PhysicsMaterial, RaySegment3D, RaySegment3DForAabb,
};
use crate::physics::rigid_body::RigidBodyPulses;
use crate::spatial::IntersectionGrid;

/// A body as seen by visibility queries
#[derive(Debug, Clone)]
pub struct QueryBody {
    /// Motion state, used to predict positions
    pub pulses: RigidBodyPulses,
    /// Collision meshes in world coordinates with their materials
    pub meshes: Vec<(PhysicsMaterial, MeshKey)>,
    /// Whether the body never moves, making it eligible for the static grid
    pub is_static: bool,
}

impl QueryBody {
    /// Moving body
    pub fn new(pulses: RigidBodyPulses, meshes: Vec<(PhysicsMaterial, MeshKey)>) -> Self {
        Self {
            pulses,
            meshes,
            is_static: false,
        }
    }

    /// Body that never moves
    pub fn new_static(pulses: RigidBodyPulses, meshes: Vec<(PhysicsMaterial, MeshKey)>) -> Self {
        Self {
            pulses,
            meshes,
            is_static: true,
        }
    }
}

/// Polygon of a static mesh
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PolygonRef {
    /// Index into the mesh's triangles
    Triangle(usize),
    /// Index into the mesh's quads
    Quad(usize),
}

/// Entry of the static grid
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StaticPolygon {
    /// Owning body
    pub body: BodyKey,
    /// Owning mesh
    pub mesh: MeshKey,
    /// Material of the mesh
    pub material: PhysicsMaterial,
    /// Polygon within the mesh
    pub polygon: PolygonRef,
}

/// Meshes and bodies visible to [`CollisionQuery`]
#[derive(Debug, Default)]
pub struct QueryScene<T: Scalar> {
    /// Collision meshes in world coordinates
    pub meshes: MeshArena<T>,
    /// Bodies referencing the meshes
    pub bodies: SlotMap<BodyKey, QueryBody>,
    static_grid: Option<IntersectionGrid<T, 3, StaticPolygon>>,
    /// Static polygons too large for the grid
    oversized: Vec<StaticPolygon>,
}

impl<T: Scalar> QueryScene<T> {
    /// Empty scene
    pub fn new() -> Self {
        Self {
            meshes: MeshArena::default(),
            bodies: SlotMap::with_key(),
            static_grid: None,
            oversized: Vec::new(),
        }
    }

    /// Whether static polygons are served by the grid
    pub fn has_static_grid(&self) -> bool {
        self.static_grid.is_some()
    }

    /// Index the polygons of all static bodies
    ///
    /// The dilation radius equals `query.static_radius`, so every step of a
    /// visibility ray fits. Polygons larger than that are checked directly.
    /// Rebuild after adding or moving static geometry.
    pub fn build_static_grid(&mut self, query: &QueryConfig, grid: &GridConfig) {
        self.static_grid = None;
        self.oversized.clear();

        let mut entries = Vec::new();
        let mut boundary = Aabb3::empty();
        for (body_key, body) in self.bodies.iter().filter(|(_, b)| b.is_static) {
            for &(material, mesh_key) in &body.meshes {
                let Some(mesh) = self.meshes.get(mesh_key) else {
                    log::warn!("Static body references a removed mesh");
                    continue;
                };
                boundary.extend(mesh.aabb());
                let entry = |polygon| StaticPolygon {
                    body: body_key,
                    mesh: mesh_key,
                    material,
                    polygon,
                };
                entries.extend(mesh.triangles().iter().enumerate().map(|(i, t)| (t.aabb, entry(PolygonRef::Triangle(i)))));
                entries.extend(mesh.quads().iter().enumerate().map(|(i, q)| (q.aabb, entry(PolygonRef::Quad(i)))));
            }
        }
        if boundary.is_empty() {
            return;
        }
        let radius = T::lit(query.static_radius);
        // Query centers lie within one radius of any polygon they touch
        let boundary = boundary.dilated(&Vector3::repeat(radius));
        let mut result = IntersectionGrid::new(boundary, grid.ncells, Vector3::repeat(radius));
        for (aabb, entry) in entries {
            if aabb.half_width().iter().any(|w| *w > radius) {
                self.oversized.push(entry);
            } else {
                result.insert(aabb, entry);
            }
        }
        log::debug!(
            "Static grid holds {} polygons, {} oversized",
            result.len(),
            self.oversized.len()
        );
        self.static_grid = Some(result);
    }

    fn polygon_hit(&self, entry: &StaticPolygon, ray: &RaySegment3D<T>, sphere: &BoundingSphere<T>) -> Option<(T, Vector3<T>)> {
        let mesh = self.meshes.get(entry.mesh)?;
        match entry.polygon {
            PolygonRef::Triangle(i) => {
                let t = mesh.triangles().get(i)?;
                t.bounding_sphere.intersects(sphere).then(|| t.intersects_segment(ray)).flatten()
            }
            PolygonRef::Quad(i) => {
                let q = mesh.quads().get(i)?;
                q.bounding_sphere.intersects(sphere).then(|| q.intersects_segment(ray)).flatten()
            }
        }
    }
}

/// Closest obstacle found by [`CollisionQuery::first_hit`]
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct QueryHit {
    /// Distance from the start point
    pub t: ScenePos,
    /// Hit point
    pub point: Vector3<ScenePos>,
    /// Body that was hit
    pub body: BodyKey,
    /// Mesh that was hit
    pub mesh: MeshKey,
}

/// Bodies and materials a query ignores
#[derive(Debug, Clone, Copy)]
struct Filter {
    excluded0: Option<BodyKey>,
    excluded1: Option<BodyKey>,
    mask: PhysicsMaterial,
}

impl Filter {
    fn accepts_body(&self, key: BodyKey) -> bool {
        Some(key) != self.excluded0 && Some(key) != self.excluded1
    }

    fn accepts_material(&self, material: PhysicsMaterial) -> bool {
        !material.contains(PhysicsMaterial::OBJ_TIRE_LINE) && material.intersects(self.mask)
    }
}

/// Visibility queries over a borrowed scene
#[derive(Debug, Clone, Copy)]
pub struct CollisionQuery<'a, T: Scalar> {
    scene: &'a QueryScene<T>,
    config: QueryConfig,
}

impl<'a, T: Scalar> CollisionQuery<'a, T> {
    /// Create a query over `scene`
    pub fn new(scene: &'a QueryScene<T>, config: QueryConfig) -> Self {
        Self { scene, config }
    }

    /// Whether the straight path from `watcher` to `watched` is free
    ///
    /// Bodies `excluded0` and `excluded1` (usually watcher and watched) and
    /// meshes without a material in `mask` are ignored, as are tire lines.
    pub fn can_see_points(
        &self,
        watcher: &Vector3<ScenePos>,
        watched: &Vector3<ScenePos>,
        excluded0: Option<BodyKey>,
        excluded1: Option<BodyKey>,
        mask: PhysicsMaterial,
    ) -> bool {
        let filter = Filter {
            excluded0,
            excluded1,
            mask,
        };
        let mut blocked = false;
        self.for_each_step(watcher, watched, |_, ray, sphere| {
            blocked = self.step_hit(ray, sphere, &filter, true).is_some();
            !blocked
        });
        !blocked
    }

    /// Whether `watched` is visible from `watcher` after `time_offset` seconds
    ///
    /// Both positions are predicted from the bodies' current motion and raised
    /// by the configured eye heights. Returns `None` if a body does not exist.
    pub fn can_see_bodies(&self, watcher: BodyKey, watched: BodyKey, time_offset: ScenePos) -> Option<bool> {
        let predict = |key: BodyKey, y_offset: ScenePos| {
            let mut pulses = self.scene.bodies.get(key)?.pulses;
            if time_offset != 0.0 {
                pulses.advance_time(time_offset);
            }
            Some(pulses.abs_position() + Vector3::new(0.0, y_offset, 0.0))
        };
        let p0 = predict(watcher, self.config.watcher_y_offset)?;
        let p1 = predict(watched, self.config.watched_y_offset)?;
        Some(self.can_see_points(&p0, &p1, Some(watcher), Some(watched), self.config.collidable_mask))
    }

    /// Closest obstacle on the path from `start` to `stop`
    pub fn first_hit(
        &self,
        start: &Vector3<ScenePos>,
        stop: &Vector3<ScenePos>,
        excluded0: Option<BodyKey>,
        excluded1: Option<BodyKey>,
        mask: PhysicsMaterial,
    ) -> Option<QueryHit> {
        let filter = Filter {
            excluded0,
            excluded1,
            mask,
        };
        let mut result = None;
        self.for_each_step(start, stop, |offset, ray, sphere| {
            result = self.step_hit(ray, sphere, &filter, false).map(|(t, point, body, mesh)| QueryHit {
                t: offset + t.as_f64(),
                point: convert_vector(&point),
                body,
                mesh,
            });
            result.is_none()
        });
        result
    }

    /// Call `f(offset, step, sphere)` for every step until it returns `false`
    fn for_each_step(
        &self,
        start: &Vector3<ScenePos>,
        stop: &Vector3<ScenePos>,
        mut f: impl FnMut(ScenePos, &RaySegment3D<T>, &BoundingSphere<T>) -> bool,
    ) {
        let delta = stop - start;
        let length = delta.norm();
        if length == 0.0 || length.is_nan() {
            return;
        }
        // Strictly below the static radius so each step fits the grid dilation
        let nsteps = (length / (2.0 * self.config.static_radius)).floor() as usize + 1;
        let step = length / nsteps as ScenePos;
        let direction = delta / length;
        for i in 0..nsteps {
            let offset = step * i as ScenePos;
            let ray = RaySegment3D::new(
                convert_vector(&(start + direction * offset)),
                convert_vector(&direction),
                T::lit(step),
            );
            let sphere = ray.bounding_sphere();
            if !f(offset, &ray, &sphere) {
                return;
            }
        }
    }

    /// Hit within one step; the closest unless `any` is set
    fn step_hit(&self, ray: &RaySegment3D<T>, sphere: &BoundingSphere<T>, filter: &Filter, any: bool) -> Option<StepHit<T>> {
        let scene = self.scene;
        let segment = RaySegment3DForAabb::new(*ray);
        let mut best = None;

        for (body_key, body) in &scene.bodies {
            if !filter.accepts_body(body_key) || (body.is_static && scene.has_static_grid()) {
                continue;
            }
            for &(material, mesh_key) in &body.meshes {
                if !filter.accepts_material(material) {
                    continue;
                }
                let Some(mesh) = scene.meshes.get(mesh_key) else {
                    continue;
                };
                if !mesh.intersects_sphere(sphere) || !segment.intersects(mesh.aabb()) {
                    continue;
                }
                let triangles = mesh
                    .triangles()
                    .iter()
                    .filter(|t| t.bounding_sphere.intersects(sphere))
                    .filter_map(|t| t.intersects_segment(ray));
                let quads = mesh
                    .quads()
                    .iter()
                    .filter(|q| q.bounding_sphere.intersects(sphere))
                    .filter_map(|q| q.intersects_segment(ray));
                for (t, point) in triangles.chain(quads) {
                    keep_closest(&mut best, (t, point, body_key, mesh_key));
                    if any {
                        return best;
                    }
                }
            }
        }

        if let Some(grid) = &scene.static_grid {
            let accepted = |entry: &StaticPolygon| filter.accepts_body(entry.body) && filter.accepts_material(entry.material);
            let query = Aabb3::from_center_and_radius(&sphere.center, &Vector3::repeat(sphere.radius));
            let finished = !grid.visit(&query, |entry| {
                if accepted(entry) {
                    if let Some((t, point)) = scene.polygon_hit(entry, ray, sphere) {
                        keep_closest(&mut best, (t, point, entry.body, entry.mesh));
                        return !any;
                    }
                }
                true
            });
            if finished {
                return best;
            }
            for entry in scene.oversized.iter().filter(|e| accepted(e)) {
                if let Some((t, point)) = scene.polygon_hit(entry, ray, sphere) {
                    keep_closest(&mut best, (t, point, entry.body, entry.mesh));
                    if any {
                        return best;
                    }
                }
            }
        }
        best
    }
}

/// `(t, point, body, mesh)` relative to the start of a step
type StepHit<T> = (T, Vector3<T>, BodyKey, MeshKey);

fn keep_closest<T: Scalar>(best: &mut Option<StepHit<T>>, candidate: StepHit<T>) {
    if best.map_or(true, |b| candidate.0 < b.0) {
        *best = Some(candidate);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::physics::collision::{CollisionQuadSphere, TriangleMesh};
    use crate::physics::rigid_body::MassProperties;
    use approx::assert_relative_eq;

    /// Wall in the plane x = `x`, spanning y, z in [-5, 5]
    fn wall(x: f64) -> TriangleMesh<f64> {
        let quad = CollisionQuadSphere::new(
            [
                Vector3::new(x, -5.0, -5.0),
                Vector3::new(x, 5.0, -5.0),
                Vector3::new(x, 5.0, 5.0),
                Vector3::new(x, -5.0, 5.0),
            ],
            PhysicsMaterial::ATTR_COLLIDE,
        )
        .unwrap();
        TriangleMesh::new("wall", Vec::new(), vec![quad], -0.9848)
    }

    fn pulses_at(p: Vector3<f64>) -> RigidBodyPulses {
        RigidBodyPulses::new(MassProperties::solid_box(1.0, Vector3::repeat(1.0)), p, Vector3::zeros())
    }

    struct Fixture {
        scene: QueryScene<f64>,
        wall: BodyKey,
        watcher: BodyKey,
        watched: BodyKey,
    }

    fn fixture(static_wall: bool, material: PhysicsMaterial) -> Fixture {
        let mut scene = QueryScene::new();
        let mesh = scene.meshes.insert(wall(5.0).into());
        let body = if static_wall {
            QueryBody::new_static(pulses_at(Vector3::zeros()), vec![(material, mesh)])
        } else {
            QueryBody::new(pulses_at(Vector3::zeros()), vec![(material, mesh)])
        };
        let wall = scene.bodies.insert(body);
        let watcher = scene.bodies.insert(QueryBody::new(pulses_at(Vector3::zeros()), Vec::new()));
        let watched = scene.bodies.insert(QueryBody::new(pulses_at(Vector3::new(10.0, 0.0, 0.0)), Vec::new()));
        Fixture {
            scene,
            wall,
            watcher,
            watched,
        }
    }

    #[test]
    fn test_wall_blocks_line_of_sight() {
        let f = fixture(false, PhysicsMaterial::ATTR_COLLIDE);
        let query = CollisionQuery::new(&f.scene, QueryConfig::default().with_static_radius(0.5));
        let a = Vector3::zeros();
        assert!(!query.can_see_points(&a, &Vector3::new(10.0, 0.0, 0.0), None, None, PhysicsMaterial::ATTR_COLLIDE));
        assert!(query.can_see_points(&a, &Vector3::new(4.0, 3.0, 0.0), None, None, PhysicsMaterial::ATTR_COLLIDE));
        // Path passes beside the wall
        assert!(query.can_see_points(&a, &Vector3::new(0.0, 10.0, 0.0), None, None, PhysicsMaterial::ATTR_COLLIDE));
    }

    #[test]
    fn test_segment_beside_mesh_box_is_visible() {
        let f = fixture(false, PhysicsMaterial::ATTR_COLLIDE);
        // A single step whose bounding sphere overlaps the wall's
        let query = CollisionQuery::new(&f.scene, QueryConfig::default().with_static_radius(10.0));
        let mask = PhysicsMaterial::ATTR_COLLIDE;
        assert!(query.can_see_points(&Vector3::new(0.0, 6.0, 0.0), &Vector3::new(10.0, 6.0, 0.0), None, None, mask));
        assert!(!query.can_see_points(&Vector3::new(0.0, 4.9, 0.0), &Vector3::new(10.0, 4.9, 0.0), None, None, mask));
        let hit = query
            .first_hit(&Vector3::new(0.0, 0.0, -4.0), &Vector3::new(10.0, 0.0, 6.0), None, None, mask)
            .unwrap();
        assert_relative_eq!(hit.point, Vector3::new(5.0, 0.0, 1.0), epsilon = 1e-9);
    }

    #[test]
    fn test_exclusion_and_mask() {
        let f = fixture(false, PhysicsMaterial::ATTR_COLLIDE);
        let query = CollisionQuery::new(&f.scene, QueryConfig::default());
        let (a, b) = (Vector3::zeros(), Vector3::new(10.0, 0.0, 0.0));
        assert!(query.can_see_points(&a, &b, Some(f.wall), None, PhysicsMaterial::ATTR_COLLIDE));
        assert!(query.can_see_points(&a, &b, None, None, PhysicsMaterial::OBJ_GRASS));
    }

    #[test]
    fn test_tire_lines_never_block() {
        let f = fixture(false, PhysicsMaterial::ATTR_COLLIDE | PhysicsMaterial::OBJ_TIRE_LINE);
        let query = CollisionQuery::new(&f.scene, QueryConfig::default());
        assert!(query.can_see_points(
            &Vector3::zeros(),
            &Vector3::new(10.0, 0.0, 0.0),
            None,
            None,
            PhysicsMaterial::ATTR_COLLIDE
        ));
    }

    #[test]
    fn test_static_grid_gives_same_answers() {
        // Radius 6 puts the wall into the grid, radius 2 makes it oversized
        for radius in [6.0, 2.0] {
            let config = QueryConfig::default().with_static_radius(radius);
            let mut f = fixture(true, PhysicsMaterial::ATTR_COLLIDE);
            let (start, stop) = (Vector3::new(0.0, 1.0, 1.0), Vector3::new(10.0, 1.0, 1.0));
            let without_grid =
                CollisionQuery::new(&f.scene, config).first_hit(&start, &stop, None, None, PhysicsMaterial::ATTR_COLLIDE);
            f.scene.build_static_grid(&config, &GridConfig::default());
            assert!(f.scene.has_static_grid());
            let query = CollisionQuery::new(&f.scene, config);
            let with_grid = query.first_hit(&start, &stop, None, None, PhysicsMaterial::ATTR_COLLIDE);
            assert_eq!(without_grid, with_grid);
            let hit = with_grid.unwrap();
            assert_relative_eq!(hit.t, 5.0, epsilon = 1e-9);
            assert_eq!(hit.body, f.wall);
            assert_eq!(query.can_see_bodies(f.watcher, f.watched, 0.0), Some(false));
            assert!(query.can_see_points(&start, &stop, Some(f.wall), None, PhysicsMaterial::ATTR_COLLIDE));
        }
    }

    #[test]
    fn test_first_hit_picks_closest() {
        let mut f = fixture(false, PhysicsMaterial::ATTR_COLLIDE);
        let near = f.scene.meshes.insert(wall(2.0).into());
        let near_body = f
            .scene
            .bodies
            .insert(QueryBody::new(pulses_at(Vector3::zeros()), vec![(PhysicsMaterial::ATTR_COLLIDE, near)]));
        let query = CollisionQuery::new(&f.scene, QueryConfig::default());
        let hit = query
            .first_hit(&Vector3::zeros(), &Vector3::new(10.0, 0.0, 0.0), None, None, PhysicsMaterial::ATTR_COLLIDE)
            .unwrap();
        assert_relative_eq!(hit.t, 2.0, epsilon = 1e-9);
        assert_eq!(hit.body, near_body);
        assert_eq!(hit.mesh, near);
    }

    #[test]
    fn test_can_see_bodies_predicts_motion() {
        let mut f = fixture(false, PhysicsMaterial::ATTR_COLLIDE);
        // Watched body drives from behind the wall towards the watcher side
        f.scene.bodies[f.watched].pulses = pulses_at(Vector3::new(10.0, 0.0, 0.0))
            .with_velocity(Vector3::new(-2.0, 0.0, 0.0), Vector3::zeros());
        let query = CollisionQuery::new(&f.scene, QueryConfig::default());
        assert_eq!(query.can_see_bodies(f.watcher, f.watched, 0.0), Some(false));
        assert_eq!(query.can_see_bodies(f.watcher, f.watched, 4.0), Some(true));
    }

    #[test]
    fn test_missing_body() {
        let mut f = fixture(false, PhysicsMaterial::ATTR_COLLIDE);
        let removed = f.scene.bodies.insert(QueryBody::new(pulses_at(Vector3::zeros()), Vec::new()));
        f.scene.bodies.remove(removed);
        let query = CollisionQuery::new(&f.scene, QueryConfig::default());
        assert_eq!(query.can_see_bodies(f.watcher, removed, 0.0), None);
        assert!(query.can_see_points(
            &Vector3::zeros(),
            &Vector3::zeros(),
            None,
            None,
            PhysicsMaterial::ATTR_COLLIDE
        ));
    }

    #[test]
    fn test_eye_height_clears_low_wall() {
        let mut scene = QueryScene::new();
        let quad = CollisionQuadSphere::new(
            [
                Vector3::new(5.0, 0.0, -5.0),
                Vector3::new(5.0, 1.0, -5.0),
                Vector3::new(5.0, 1.0, 5.0),
                Vector3::new(5.0, 0.0, 5.0),
            ],
            PhysicsMaterial::ATTR_COLLIDE,
        )
        .unwrap();
        let mesh = scene.meshes.insert(TriangleMesh::new("low wall", Vec::new(), vec![quad], -0.9848).into());
        scene
            .bodies
            .insert(QueryBody::new(pulses_at(Vector3::zeros()), vec![(PhysicsMaterial::ATTR_COLLIDE, mesh)]));
        let watcher = scene.bodies.insert(QueryBody::new(pulses_at(Vector3::new(0.0, 0.5, 0.0)), Vec::new()));
        let watched = scene.bodies.insert(QueryBody::new(pulses_at(Vector3::new(10.0, 0.5, 0.0)), Vec::new()));
        let low = CollisionQuery::new(&scene, QueryConfig::default());
        assert_eq!(low.can_see_bodies(watcher, watched, 0.0), Some(false));
        let raised = CollisionQuery::new(&scene, QueryConfig::default().with_y_offsets(1.0, 1.0));
        assert_eq!(raised.can_see_bodies(watcher, watched, 0.0), Some(true));
    }
}
