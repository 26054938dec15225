//! Physics module for collision detection and rigid body motion
//!
//! Collision geometry and the separating-axis narrow phase live in
//! [`collision`], body state in [`rigid_body`], and visibility queries
//! over a whole scene in [`collision_query`].

pub mod collision;
pub mod collision_query;
pub mod error;
pub mod rigid_body;

pub use collision::{
    get_overlap2,
    AxisAlignedBoundingBox,
    BoundingSphere,
    CollisionRidgeSphere,
    IntersectableMesh,
    MeshArena,
    MeshQuery,
    PhysicsMaterial,
    RaySegment3D,
    SatTracker,
    TriangleMesh,
};
pub use collision_query::{CollisionQuery, QueryBody, QueryHit, QueryScene};
pub use error::{PhysicsError, Result};
pub use rigid_body::{MassProperties, RigidBodyIntegrator, RigidBodyPulses};

#[cfg(test)]
mod tests;
