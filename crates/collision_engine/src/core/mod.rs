//! # Core Module
//!
//! Shared settings used by every subsystem of the collision core.
//!
//! ## Organization
//!
//! - **Config**: thresholds and sizes for ridges, SAT, integration, queries and grids

pub mod config;

pub use crate::foundation;

pub use config::{
    Config,
    ConfigError,
    GridConfig,
    IntegratorConfig,
    PenetrationLimits,
    PhysicsEngineConfig,
    QueryConfig,
    RidgeConfig,
    SatConfig,
};
