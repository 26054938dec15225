//! Recoverable physics errors

use crate::config::ConfigError;

/// Errors reported by collision and integration routines
#[derive(thiserror::Error, Debug)]
pub enum PhysicsError {
    /// NaN reached a geometric computation
    #[error("NaN encountered in {context}")]
    NanInput {
        /// Where the NaN was detected
        context: &'static str,
    },

    /// A convex pair produced no separating-axis candidate
    #[error("No separating axis candidates between {mesh0} and {mesh1}")]
    NoOverlapCandidates {
        /// Name of the first mesh
        mesh0: String,
        /// Name of the second mesh
        mesh1: String,
    },

    /// A face referenced a vertex that does not exist
    #[error("Vertex index {index} out of range for {len} positions")]
    VertexIndexOutOfRange {
        /// Offending index
        index: usize,
        /// Number of positions
        len: usize,
    },

    /// A segment was built from two identical points
    #[error("Ray segment has zero length")]
    DegenerateRay,

    /// An impulse exceeded the sanity threshold
    #[error("Impulse component {magnitude} exceeds threshold {threshold}")]
    ImpulseOutOfBounds {
        /// Largest absolute impulse component
        magnitude: f64,
        /// Allowed maximum
        threshold: f64,
    },

    /// Two closest-point candidates coincide, so the shapes already intersect
    #[error("Polygon intersects AABB")]
    ShapesIntersect,

    /// A rounded box was built with a radius larger than half its size
    #[error("Box of size {size} too small for radius {radius}")]
    BoxTooSmall {
        /// Smallest edge length after shrinking
        size: f64,
        /// Rounding radius
        radius: f64,
    },

    /// Configuration problem
    #[error(transparent)]
    Config(#[from] ConfigError),
}

/// Result alias for physics operations
pub type Result<T> = std::result::Result<T, PhysicsError>;
