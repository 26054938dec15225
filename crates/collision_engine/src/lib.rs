//! # Collision Engine
//!
//! Collision detection and contact geometry for real-time rigid-body
//! simulation of vehicles and props on large static scenes.
//!
//! ## Features
//!
//! - **Ridges**: mesh edges classified by dihedral angle so contacts only
//!   use normals inside each edge's normal cone
//! - **Separating axes**: minimum overlap of a ridge against a mesh, and a
//!   cached collision plane between two convex meshes
//! - **Broad phase**: a uniform intersection grid for static geometry
//! - **Rigid bodies**: impulse and force based integrators
//! - **Visibility**: line-of-sight queries between points and bodies
//! - **Dual precision**: geometry is generic over `f32` and `f64`
//!
//! ## Quick Start
//!
//! ```rust
//! use collision_engine::prelude::*;
//!
//! let config = PhysicsEngineConfig::default();
//! let ridge = CollisionRidgeSphere::new(
//!     &Vector3::new(0.0, 0.0, 0.0),
//!     &Vector3::new(0.0, 1.0, 0.0),
//!     &Vector3::z(),
//!     PhysicsMaterial::ATTR_COLLIDE,
//! )?;
//! let mut other = ridge;
//! other.normal = Vector3::x();
//! let mut combined = ridge;
//! combined.combine(&other, config.ridge.max_min_cos_ridge);
//! assert_eq!(combined.min_cos(), Some(0.0));
//! # Ok::<(), PhysicsError>(())
//! ```

#![warn(missing_docs)]
#![warn(clippy::all, clippy::pedantic, clippy::nursery)]
#![allow(clippy::module_name_repetitions, clippy::similar_names, clippy::too_many_arguments)]

pub mod config;
pub mod core;
pub mod foundation;
pub mod physics;
pub mod spatial;

/// Common imports for engine users
pub mod prelude {
    pub use crate::{
        core::{Config, GridConfig, IntegratorConfig, PhysicsEngineConfig, QueryConfig, RidgeConfig, SatConfig},
        foundation::{
            collections::{BodyKey, MeshKey, RidgeHandle},
            math::{CompressedScenePos, Scalar, SceneDir, ScenePos, Transformation3, Vector3},
        },
        physics::{
            collision::{
                get_overlap2, resolve_ridge, CollisionQuadSphere, CollisionRidgeSphere, CollisionTriangleSphere,
                IntersectableMesh, MeshArena, MeshQuery, PhysicsMaterial, RidgeState, SatTracker, TriangleMesh,
            },
            collision_query::{CollisionQuery, QueryBody, QueryScene},
            error::{PhysicsError, Result},
            rigid_body::{MassProperties, RigidBodyIntegrator, RigidBodyPulses},
        },
        spatial::IntersectionGrid,
    };
}
