//! Spatial partitioning data structures
//!
//! Broad-phase indexing of static collision geometry.

mod intersection_grid;

pub use intersection_grid::{IntersectionGrid, IntersectionGridCell};
