//! Broad-phase coverage of the intersection grid

use crate::core::GridConfig;
use crate::foundation::math::Vector3;
use crate::physics::collision::Aabb3;
use crate::spatial::IntersectionGrid;

/// Small deterministic generator so the scenarios are reproducible
struct Lcg(u64);

impl Lcg {
    fn next_unit(&mut self) -> f64 {
        self.0 = self.0.wrapping_mul(6_364_136_223_846_793_005).wrapping_add(1_442_695_040_888_963_407);
        (self.0 >> 11) as f64 / (1u64 << 53) as f64
    }

    fn next_box(&mut self, extent: f64, max_half_width: f64) -> Aabb3<f64> {
        let center = Vector3::from_fn(|_, _| self.next_unit() * extent);
        let half_width = Vector3::from_fn(|_, _| self.next_unit() * max_half_width);
        Aabb3::from_center_and_radius(&center, &half_width)
    }
}

fn boundary(extent: f64) -> Aabb3<f64> {
    Aabb3::from_min_max(Vector3::zeros(), Vector3::repeat(extent))
}

#[test]
fn test_inserted_boxes_are_found_by_themselves() {
    crate::foundation::logging::try_init();
    let radius = 2.0;
    let mut grid = IntersectionGrid::new(boundary(100.0), [16, 4, 16], Vector3::repeat(radius));
    let mut rng = Lcg(7);
    let boxes: Vec<_> = (0..200).map(|_| rng.next_box(100.0, radius)).collect();
    for (i, aabb) in boxes.iter().enumerate() {
        grid.insert(*aabb, i);
    }
    assert_eq!(grid.len(), boxes.len());
    for (i, aabb) in boxes.iter().enumerate() {
        let mut found = false;
        grid.visit(aabb, |&j| {
            found |= i == j;
            !found
        });
        assert!(found, "box {i} not found");
    }
}

#[test]
fn test_overlapping_queries_find_entry_and_disjoint_ones_do_not() {
    let radius = 1.5;
    let config = GridConfig {
        ncells: [8, 8, 8],
        dilation_radius: [radius; 3],
    };
    let mut grid = IntersectionGrid::from_config(boundary(50.0), &config);
    let mut rng = Lcg(42);
    let boxes: Vec<_> = (0..100).map(|_| rng.next_box(50.0, radius)).collect();
    for (i, aabb) in boxes.iter().enumerate() {
        grid.insert(*aabb, i);
    }
    for _ in 0..500 {
        let query = rng.next_box(50.0, radius);
        let mut visited = Vec::new();
        grid.visit(&query, |&j| {
            visited.push(j);
            true
        });
        for (i, aabb) in boxes.iter().enumerate() {
            assert_eq!(
                visited.contains(&i),
                aabb.intersects(&query),
                "box {i} against query {query:?}"
            );
        }
        // No entry is reported twice within one query
        let mut unique = visited.clone();
        unique.sort_unstable();
        unique.dedup();
        assert_eq!(unique.len(), visited.len());
    }
}

#[test]
fn test_grid_results_do_not_depend_on_cell_count() {
    let radius = 1.0;
    let mut rng = Lcg(3);
    let boxes: Vec<_> = (0..60).map(|_| rng.next_box(20.0, radius)).collect();
    let queries: Vec<_> = (0..100).map(|_| rng.next_box(20.0, radius)).collect();
    let results = |ncells: [usize; 3]| {
        let mut grid = IntersectionGrid::new(boundary(20.0), ncells, Vector3::repeat(radius));
        for (i, aabb) in boxes.iter().enumerate() {
            grid.insert(*aabb, i);
        }
        queries
            .iter()
            .map(|q| {
                let mut hits = Vec::new();
                grid.visit(q, |&j| {
                    hits.push(j);
                    true
                });
                hits.sort_unstable();
                hits
            })
            .collect::<Vec<_>>()
    };
    assert_eq!(results([1, 1, 1]), results([20, 3, 11]));
}
