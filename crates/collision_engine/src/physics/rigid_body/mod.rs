//! Rigid body state
//!
//! Two representations of the same body motion:
//!
//! - [`RigidBodyPulses`] stores linear and angular velocity directly and is
//!   driven by impulses from the contact resolver.
//! - [`RigidBodyIntegrator`] accumulates forces and torques over a tick and
//!   stores angular momentum, recovering the angular velocity from it.
//!
//! Both run in full scene precision.

mod integrator;
mod pulses;

pub use integrator::RigidBodyIntegrator;
pub use pulses::RigidBodyPulses;

use nalgebra::{Cholesky, Matrix3};

use crate::foundation::math::{
    constants::{KG, KPH},
    ScenePos, Vector3,
};
use crate::physics::error::{PhysicsError, Result};

/// Largest impulse component accepted before the input is treated as corrupt
pub const MAX_IMPULSE: ScenePos = 10e3 * KG * 1000.0 * KPH;

/// Mass, body-frame inertia tensor and center of mass
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MassProperties {
    /// Mass in kg
    pub mass: ScenePos,
    /// Inertia tensor in body coordinates
    pub inertia: Matrix3<ScenePos>,
    /// Center of mass in body coordinates
    pub com: Vector3<ScenePos>,
    /// Whether `inertia` is diagonal, allowing infinite entries for locked axes
    pub inertia_is_diagonal: bool,
}

impl MassProperties {
    /// Diagonal inertia, entries may be infinite
    pub fn diagonal(mass: ScenePos, inertia: Vector3<ScenePos>, com: Vector3<ScenePos>) -> Self {
        Self {
            mass,
            inertia: Matrix3::from_diagonal(&inertia),
            com,
            inertia_is_diagonal: true,
        }
    }

    /// Full symmetric inertia tensor
    pub fn full(mass: ScenePos, inertia: Matrix3<ScenePos>, com: Vector3<ScenePos>) -> Self {
        Self {
            mass,
            inertia,
            com,
            inertia_is_diagonal: false,
        }
    }

    /// Solid box of uniform density centred at the origin
    pub fn solid_box(mass: ScenePos, size: Vector3<ScenePos>) -> Self {
        let s2 = size.component_mul(&size);
        let inertia = Vector3::new(s2.y + s2.z, s2.x + s2.z, s2.x + s2.y) * (mass / 12.0);
        Self::diagonal(mass, inertia, Vector3::zeros())
    }
}

/// Inertia tensor together with its world-frame rotation
#[derive(Debug, Clone, Copy, PartialEq)]
pub(crate) struct WorldInertia {
    pub(crate) props: MassProperties,
    abs_inertia: Matrix3<ScenePos>,
}

impl WorldInertia {
    pub(crate) fn new(props: MassProperties, rotation: &Matrix3<ScenePos>) -> Self {
        let mut result = Self {
            props,
            abs_inertia: props.inertia,
        };
        result.update(rotation);
        result
    }

    /// Refresh `R I Rᵀ` after the rotation changed
    pub(crate) fn update(&mut self, rotation: &Matrix3<ScenePos>) {
        if !self.props.inertia_is_diagonal {
            self.abs_inertia = rotation * self.props.inertia * rotation.transpose();
        }
    }

    /// Solve `R I Rᵀ w = x` for `w`
    pub(crate) fn solve(&self, rotation: &Matrix3<ScenePos>, x: &Vector3<ScenePos>) -> Vector3<ScenePos> {
        if self.props.inertia_is_diagonal {
            let diag = self.props.inertia.diagonal();
            rotation * (rotation.transpose() * x).component_div(&diag)
        } else {
            match Cholesky::new(self.abs_inertia) {
                Some(c) => c.solve(x),
                None => {
                    log::warn!("Inertia tensor is not positive definite, zeroing angular response");
                    Vector3::zeros()
                }
            }
        }
    }

    /// `R I Rᵀ x`
    ///
    /// Infinite diagonal entries mark locked axes. Those never rotate, so
    /// they contribute zero instead of amplifying rounding noise in `x`.
    pub(crate) fn dot(&self, rotation: &Matrix3<ScenePos>, x: &Vector3<ScenePos>) -> Vector3<ScenePos> {
        if self.props.inertia_is_diagonal {
            let local = rotation.transpose() * x;
            let diag = self.props.inertia.diagonal();
            let scaled = Vector3::from_fn(|i, _| if diag[i].is_infinite() { 0.0 } else { diag[i] * local[i] });
            rotation * scaled
        } else {
            self.abs_inertia * x
        }
    }
}

pub(crate) fn check_impulse(j: &Vector3<ScenePos>) -> Result<()> {
    if j.iter().any(|c| c.is_nan()) {
        return Err(PhysicsError::NanInput { context: "impulse" });
    }
    let magnitude = j.amax();
    if magnitude > MAX_IMPULSE {
        return Err(PhysicsError::ImpulseOutOfBounds {
            magnitude,
            threshold: MAX_IMPULSE,
        });
    }
    Ok(())
}

pub(crate) fn clamp_norm(v: &mut Vector3<ScenePos>, max: ScenePos) {
    if max.is_finite() {
        let l = v.norm();
        if l > max {
            *v *= max / l;
        }
    }
}
