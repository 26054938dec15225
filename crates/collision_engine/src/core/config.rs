//! # Physics Configuration
//!
//! Every empirically tuned threshold of the collision core lives here instead
//! of being hard-coded at call sites, so that callers can sweep them.
//!
//! ## Configuration Categories
//!
//! - **Ridge Config**: when combining two faces makes an edge untouchable
//! - **SAT Config**: axis selection tolerances
//! - **Integrator Config**: small-motion cutoff and velocity clamps
//! - **Query Config**: visibility ray stepping and material filtering
//! - **Grid Config**: broad-phase cell layout

use serde::{Serialize, Deserialize};

pub use crate::config::{Config, ConfigError};
use crate::physics::collision::PhysicsMaterial;

/// Edge classification thresholds
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RidgeConfig {
    /// Lowest cosine between the two face normals of an edge that keeps it touchable
    pub max_min_cos_ridge: f64,
}

impl Default for RidgeConfig {
    fn default() -> Self {
        Self {
            // cos(170°)
            max_min_cos_ridge: -0.984_807_753_012_208,
        }
    }
}

/// Separating-axis selection tolerances
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SatConfig {
    /// Overlap along an incoming ridge's own normal below which that normal is kept
    pub max_keep_normal: f64,
    /// Slack added to a ridge's cosine before an edge-cross axis is rejected
    pub min_cos_tolerance: f64,
    /// Squared length below which an edge-cross axis counts as parallel
    pub min_axis_length2: f64,
}

impl Default for SatConfig {
    fn default() -> Self {
        Self {
            max_keep_normal: 1e-2,
            min_cos_tolerance: 1e-4,
            min_axis_length2: 1e-6,
        }
    }
}

impl SatConfig {
    /// Set the keep-normal threshold
    pub fn with_max_keep_normal(mut self, value: f64) -> Self {
        self.max_keep_normal = value;
        self
    }
}

/// Per-tick motion limits that keep a body from tunnelling into contacts
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PenetrationLimits {
    /// Largest distance travelled per tick, `inf` disables the clamp
    pub max_translation: f64,
    /// Largest rotation angle per tick in radians, `inf` disables the clamp
    pub max_rotation: f64,
}

impl Default for PenetrationLimits {
    fn default() -> Self {
        Self {
            max_translation: f64::INFINITY,
            max_rotation: f64::INFINITY,
        }
    }
}

impl PenetrationLimits {
    /// Maximum linear speed for a tick of length `dt`
    pub fn vmax_translation(&self, dt: f64) -> f64 {
        self.max_translation / dt
    }

    /// Maximum angular speed for a tick of length `dt`
    pub fn wmax(&self, dt: f64) -> f64 {
        self.max_rotation / dt
    }
}

/// Rigid body integration thresholds
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct IntegratorConfig {
    /// Speed below which a body may come to rest
    pub min_velocity: f64,
    /// Angular speed below which a body may come to rest
    pub min_angular_velocity: f64,
    /// Acceleration below which a body may come to rest
    pub min_acceleration: f64,
    /// Velocity clamps
    pub penetration: PenetrationLimits,
}

impl Default for IntegratorConfig {
    fn default() -> Self {
        Self {
            min_velocity: 1e-3,
            min_angular_velocity: 1e-3,
            min_acceleration: 2e-3,
            penetration: PenetrationLimits::default(),
        }
    }
}

impl IntegratorConfig {
    /// Disable the small-motion cutoff
    pub fn without_rest_cutoff(mut self) -> Self {
        self.min_velocity = 0.0;
        self.min_angular_velocity = 0.0;
        self.min_acceleration = 0.0;
        self
    }
}

/// Visibility query settings
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct QueryConfig {
    /// Largest half-length of one ray step, also the static grid dilation radius
    pub static_radius: f64,
    /// Materials that block visibility
    pub collidable_mask: PhysicsMaterial,
    /// Height added to the watcher's position (eye height)
    pub watcher_y_offset: f64,
    /// Height added to the watched body's position
    pub watched_y_offset: f64,
}

impl Default for QueryConfig {
    fn default() -> Self {
        Self {
            static_radius: 20.0,
            collidable_mask: PhysicsMaterial::ATTR_COLLIDE,
            watcher_y_offset: 0.0,
            watched_y_offset: 0.0,
        }
    }
}

impl QueryConfig {
    /// Set the static radius
    pub fn with_static_radius(mut self, radius: f64) -> Self {
        self.static_radius = radius;
        self
    }

    /// Set eye heights of watcher and watched body
    pub fn with_y_offsets(mut self, watcher: f64, watched: f64) -> Self {
        self.watcher_y_offset = watcher;
        self.watched_y_offset = watched;
        self
    }
}

/// Broad-phase grid layout
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GridConfig {
    /// Number of cells per axis
    pub ncells: [usize; 3],
    /// Per-axis dilation radius
    pub dilation_radius: [f64; 3],
}

impl Default for GridConfig {
    fn default() -> Self {
        Self {
            ncells: [64, 16, 64],
            dilation_radius: [20.0, 20.0, 20.0],
        }
    }
}

/// # Physics Engine Configuration
///
/// Top-level settings of the collision core. Loadable from TOML or RON via
/// [`Config`].
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct PhysicsEngineConfig {
    /// Ridge classification
    pub ridge: RidgeConfig,
    /// SAT tolerances
    pub sat: SatConfig,
    /// Rigid body integration
    pub integrator: IntegratorConfig,
    /// Visibility queries
    pub query: QueryConfig,
    /// Broad-phase grid
    pub grid: GridConfig,
}

impl PhysicsEngineConfig {
    /// Create a configuration with default values
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace the ridge settings
    pub fn with_ridge(mut self, ridge: RidgeConfig) -> Self {
        self.ridge = ridge;
        self
    }

    /// Replace the SAT settings
    pub fn with_sat(mut self, sat: SatConfig) -> Self {
        self.sat = sat;
        self
    }

    /// Replace the integrator settings
    pub fn with_integrator(mut self, integrator: IntegratorConfig) -> Self {
        self.integrator = integrator;
        self
    }

    /// Replace the query settings
    pub fn with_query(mut self, query: QueryConfig) -> Self {
        self.query = query;
        self
    }

    /// Check every value for NaN or an out-of-range setting
    pub fn validate(&self) -> Result<(), ConfigError> {
        fn finite_or_inf(field: &'static str, value: f64) -> Result<(), ConfigError> {
            if value.is_nan() {
                return Err(ConfigError::Invalid { field, reason: "value is NaN".to_string() });
            }
            Ok(())
        }
        fn non_negative(field: &'static str, value: f64) -> Result<(), ConfigError> {
            finite_or_inf(field, value)?;
            if value < 0.0 {
                return Err(ConfigError::Invalid { field, reason: format!("{value} is negative") });
            }
            Ok(())
        }

        finite_or_inf("ridge.max_min_cos_ridge", self.ridge.max_min_cos_ridge)?;
        if self.ridge.max_min_cos_ridge > 1.0 {
            return Err(ConfigError::Invalid {
                field: "ridge.max_min_cos_ridge",
                reason: format!("cosine {} is above 1", self.ridge.max_min_cos_ridge),
            });
        }
        finite_or_inf("sat.max_keep_normal", self.sat.max_keep_normal)?;
        non_negative("sat.min_cos_tolerance", self.sat.min_cos_tolerance)?;
        non_negative("sat.min_axis_length2", self.sat.min_axis_length2)?;
        non_negative("integrator.min_velocity", self.integrator.min_velocity)?;
        non_negative("integrator.min_angular_velocity", self.integrator.min_angular_velocity)?;
        non_negative("integrator.min_acceleration", self.integrator.min_acceleration)?;
        non_negative("integrator.penetration.max_translation", self.integrator.penetration.max_translation)?;
        non_negative("integrator.penetration.max_rotation", self.integrator.penetration.max_rotation)?;
        non_negative("query.static_radius", self.query.static_radius)?;
        if self.query.static_radius == 0.0 {
            return Err(ConfigError::Invalid {
                field: "query.static_radius",
                reason: "radius must be positive".to_string(),
            });
        }
        if self.grid.ncells.contains(&0) {
            return Err(ConfigError::Invalid {
                field: "grid.ncells",
                reason: format!("{:?} contains a zero cell count", self.grid.ncells),
            });
        }
        for r in self.grid.dilation_radius {
            non_negative("grid.dilation_radius", r)?;
        }
        Ok(())
    }
}

impl Config for PhysicsEngineConfig {}
