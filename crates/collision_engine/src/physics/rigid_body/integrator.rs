//! Force-based rigid body state with angular momentum

use nalgebra::Matrix3;

use crate::core::IntegratorConfig;
use crate::foundation::math::{
    orthonormalized, rodrigues, tait_bryan_angles_to_matrix, ScenePos, Transformation3, Vector3, VectorAtPosition,
};
use crate::physics::error::Result;

use super::{check_impulse, clamp_norm, MassProperties, WorldInertia};

/// Rigid body that accumulates forces over a tick
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RigidBodyIntegrator {
    inertia: WorldInertia,
    rotation: Matrix3<ScenePos>,
    abs_com: Vector3<ScenePos>,
    /// Linear velocity of the center of mass
    v: Vector3<ScenePos>,
    /// Angular velocity, derived from `l`
    w: Vector3<ScenePos>,
    /// Angular momentum
    l: Vector3<ScenePos>,
    /// Accumulated acceleration
    a: Vector3<ScenePos>,
    /// Accumulated torque
    t: Vector3<ScenePos>,
}

impl RigidBodyIntegrator {
    /// Body at rest at `position` with orientation given by Tait-Bryan angles
    pub fn new(props: MassProperties, position: Vector3<ScenePos>, rotation: Vector3<ScenePos>) -> Self {
        let rotation = tait_bryan_angles_to_matrix(&rotation);
        Self {
            inertia: WorldInertia::new(props, &rotation),
            abs_com: rotation * props.com + position,
            rotation,
            v: Vector3::zeros(),
            w: Vector3::zeros(),
            l: Vector3::zeros(),
            a: Vector3::zeros(),
            t: Vector3::zeros(),
        }
    }

    /// Set linear and angular velocity, deriving the angular momentum
    pub fn with_velocity(mut self, v: Vector3<ScenePos>, w: Vector3<ScenePos>) -> Self {
        self.v = v;
        self.w = w;
        self.l = self.inertia.dot(&self.rotation, &w);
        self
    }

    /// Mass in kg
    pub fn mass(&self) -> ScenePos {
        self.inertia.props.mass
    }

    /// Velocity of the center of mass
    pub fn v(&self) -> &Vector3<ScenePos> {
        &self.v
    }

    /// Angular velocity
    pub fn w(&self) -> &Vector3<ScenePos> {
        &self.w
    }

    /// Angular momentum
    pub fn angular_momentum(&self) -> &Vector3<ScenePos> {
        &self.l
    }

    /// Accumulated acceleration
    pub fn acceleration(&self) -> &Vector3<ScenePos> {
        &self.a
    }

    /// Accumulated torque
    pub fn torque(&self) -> &Vector3<ScenePos> {
        &self.t
    }

    /// Orientation
    pub fn rotation(&self) -> &Matrix3<ScenePos> {
        &self.rotation
    }

    /// Center of mass in world coordinates
    pub fn abs_com(&self) -> &Vector3<ScenePos> {
        &self.abs_com
    }

    /// World position of the body origin
    pub fn abs_position(&self) -> Vector3<ScenePos> {
        self.abs_com - self.rotation * self.inertia.props.com
    }

    /// Body-to-world transformation
    pub fn abs_transformation(&self) -> Transformation3<ScenePos> {
        Transformation3::new(self.rotation, self.abs_position())
    }

    /// Velocity of the body point currently at `position`
    pub fn velocity_at_position(&self, position: &Vector3<ScenePos>) -> Vector3<ScenePos> {
        self.v + self.w.cross(&(position - self.abs_com))
    }

    /// Place the body origin at `position` with orientation `rotation`
    pub fn set_pose(&mut self, rotation: &Matrix3<ScenePos>, position: &Vector3<ScenePos>) {
        self.rotation = *rotation;
        self.abs_com = rotation * self.inertia.props.com + position;
        self.inertia.update(&self.rotation);
    }

    /// Clear the force and torque accumulators
    pub fn reset_forces(&mut self) {
        self.a = Vector3::zeros();
        self.t = Vector3::zeros();
    }

    /// Accumulate a force applied at a world position
    pub fn integrate_force(&mut self, f: &VectorAtPosition<ScenePos>) {
        self.a += f.vector / self.mass();
        self.t += (f.position - self.abs_com).cross(&f.vector);
    }

    /// Accumulate a contact force and damp the motion along the contact normal `n`
    ///
    /// Normal components of velocity and acceleration are scaled by
    /// `1 - damping`, tangential ones by `1 - friction`. Angular momentum and
    /// torque are scaled by `1 - damping`.
    pub fn integrate_force_damped(
        &mut self,
        f: &VectorAtPosition<ScenePos>,
        n: &Vector3<ScenePos>,
        damping: ScenePos,
        friction: ScenePos,
    ) {
        self.integrate_force(f);
        if damping != 0.0 {
            let damp = |x: &Vector3<ScenePos>| {
                let normal = n * x.dot(n);
                normal * (1.0 - damping) + (x - normal) * (1.0 - friction)
            };
            self.v = damp(&self.v);
            self.a = damp(&self.a);
            self.l *= 1.0 - damping;
            self.t *= 1.0 - damping;
        }
    }

    /// Accumulate gravity
    pub fn integrate_gravity(&mut self, g: &Vector3<ScenePos>) {
        self.a += g;
    }

    /// Apply an impulse at a world position
    pub fn integrate_impulse(&mut self, j: &VectorAtPosition<ScenePos>) -> Result<()> {
        check_impulse(&j.vector)?;
        self.v += j.vector / self.mass();
        self.l += (j.position - self.abs_com).cross(&j.vector);
        self.w = self.inertia.solve(&self.rotation, &self.l);
        Ok(())
    }

    /// Integrate the accumulated forces over `dt` and move the body
    ///
    /// When speed, angular speed and acceleration all fall below the
    /// configured thresholds the body is brought to rest instead.
    pub fn advance_time(&mut self, dt: ScenePos, config: &IntegratorConfig) {
        self.v += self.a * dt;
        self.l += self.t * dt;
        self.w = self.inertia.solve(&self.rotation, &self.l);
        clamp_norm(&mut self.v, config.penetration.vmax_translation(dt));
        clamp_norm(&mut self.w, config.penetration.wmax(dt));

        if self.v.norm() < config.min_velocity
            && self.w.norm() < config.min_angular_velocity
            && self.a.norm() < config.min_acceleration
        {
            log::trace!("Body at {:?} came to rest", self.abs_com.as_slice());
            self.v = Vector3::zeros();
            self.w = Vector3::zeros();
            self.l = Vector3::zeros();
            return;
        }
        self.abs_com += self.v * dt;
        if self.w != Vector3::zeros() {
            self.rotation = orthonormalized(&(rodrigues(&(self.w * dt)) * self.rotation));
            self.inertia.update(&self.rotation);
        }
    }

    /// Kinetic energy
    pub fn energy(&self) -> ScenePos {
        0.5 * (self.mass() * self.v.norm_squared() + self.w.dot(&self.inertia.dot(&self.rotation, &self.w)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::PenetrationLimits;
    use approx::assert_relative_eq;

    const EPSILON: f64 = 1e-10;

    fn ball() -> RigidBodyIntegrator {
        let props = MassProperties::diagonal(3.0, Vector3::repeat(2.0), Vector3::zeros());
        RigidBodyIntegrator::new(props, Vector3::zeros(), Vector3::zeros())
    }

    #[test]
    fn test_zero_forcing_keeps_motion() {
        let config = IntegratorConfig::default().without_rest_cutoff();
        for dt in [1e-3, 0.016, 0.5] {
            let mut b = ball().with_velocity(Vector3::new(1.0, 0.0, 0.0), Vector3::new(0.0, 0.0, 0.7));
            let energy = b.energy();
            b.advance_time(dt, &config);
            assert_relative_eq!(*b.v(), Vector3::new(1.0, 0.0, 0.0), epsilon = EPSILON);
            assert_relative_eq!(*b.w(), Vector3::new(0.0, 0.0, 0.7), epsilon = EPSILON);
            assert_relative_eq!(b.energy(), energy, epsilon = EPSILON);
        }
    }

    #[test]
    fn test_gravity_free_fall() {
        let config = IntegratorConfig::default();
        let mut b = ball();
        for _ in 0..100 {
            b.reset_forces();
            b.integrate_gravity(&Vector3::new(0.0, -9.8, 0.0));
            b.advance_time(0.01, &config);
        }
        assert_relative_eq!(b.v().y, -9.8, epsilon = 1e-9);
        // Semi-implicit Euler: sum_{k=1}^{100} k * g * dt^2
        assert_relative_eq!(b.abs_com().y, -9.8 * 0.01 * 0.01 * 5050.0, epsilon = 1e-9);
    }

    #[test]
    fn test_small_motion_comes_to_rest() {
        let config = IntegratorConfig::default();
        let mut b = ball().with_velocity(Vector3::new(1e-4, 0.0, 0.0), Vector3::new(0.0, 1e-4, 0.0));
        b.advance_time(0.01, &config);
        assert_eq!(*b.v(), Vector3::zeros());
        assert_eq!(*b.w(), Vector3::zeros());
        assert_eq!(*b.angular_momentum(), Vector3::zeros());
        assert_eq!(*b.abs_com(), Vector3::zeros());
    }

    #[test]
    fn test_off_center_force_creates_torque() {
        let mut b = ball();
        b.integrate_force(&VectorAtPosition::new(Vector3::new(0.0, 6.0, 0.0), Vector3::new(1.0, 0.0, 0.0)));
        assert_relative_eq!(*b.acceleration(), Vector3::new(0.0, 2.0, 0.0), epsilon = EPSILON);
        assert_relative_eq!(*b.torque(), Vector3::new(0.0, 0.0, 6.0), epsilon = EPSILON);
        b.advance_time(0.5, &IntegratorConfig::default());
        assert_relative_eq!(*b.w(), Vector3::new(0.0, 0.0, 1.5), epsilon = EPSILON);
        b.reset_forces();
        assert_eq!(*b.torque(), Vector3::zeros());
    }

    #[test]
    fn test_damping_splits_normal_and_tangent() {
        let mut b = ball().with_velocity(Vector3::new(2.0, -4.0, 0.0), Vector3::zeros());
        let f = VectorAtPosition::new(Vector3::zeros(), Vector3::zeros());
        b.integrate_force_damped(&f, &Vector3::y(), 0.5, 0.25);
        assert_relative_eq!(*b.v(), Vector3::new(1.5, -2.0, 0.0), epsilon = EPSILON);
    }

    #[test]
    fn test_impulse_updates_angular_velocity() {
        let mut b = ball();
        b.integrate_impulse(&VectorAtPosition::new(Vector3::new(0.0, 0.0, 3.0), Vector3::new(0.0, 1.0, 0.0)))
            .unwrap();
        assert_relative_eq!(*b.v(), Vector3::new(0.0, 0.0, 1.0), epsilon = EPSILON);
        assert_relative_eq!(*b.w(), Vector3::new(1.5, 0.0, 0.0), epsilon = EPSILON);
    }

    #[test]
    fn test_velocity_clamp_in_advance() {
        let mut config = IntegratorConfig::default();
        config.penetration = PenetrationLimits {
            max_translation: 0.01,
            max_rotation: f64::INFINITY,
        };
        let mut b = ball().with_velocity(Vector3::new(5.0, 0.0, 0.0), Vector3::zeros());
        b.advance_time(0.01, &config);
        assert_relative_eq!(b.v().norm(), 1.0, epsilon = EPSILON);
        assert_relative_eq!(b.abs_com().x, 0.01, epsilon = EPSILON);
    }

    #[test]
    fn test_locked_axis_keeps_momentum_and_energy_finite() {
        let props = MassProperties::diagonal(2.0, Vector3::new(1.0, f64::INFINITY, 3.0), Vector3::zeros());
        let b = RigidBodyIntegrator::new(props, Vector3::zeros(), Vector3::new(0.1, 0.2, 0.3));
        let mut b = b.with_velocity(Vector3::zeros(), Vector3::new(0.0, 0.0, 0.5));
        assert!(b.angular_momentum().iter().all(|c| c.is_finite()));
        b.integrate_impulse(&VectorAtPosition::new(Vector3::new(0.0, 0.0, 1.0), Vector3::new(1.0, 0.5, 0.0)))
            .unwrap();
        assert!(b.w().iter().all(|c| c.is_finite()));
        assert!(b.energy().is_finite());
        assert!(b.energy() > 0.0);
    }

    #[test]
    fn test_non_diagonal_inertia_uses_full_tensor() {
        let tensor = Matrix3::new(4.0, 1.0, 0.0, 1.0, 3.0, 0.0, 0.0, 0.0, 2.0);
        let props = MassProperties::full(1.0, tensor, Vector3::zeros());
        let mut b = RigidBodyIntegrator::new(props, Vector3::zeros(), Vector3::zeros());
        b.integrate_impulse(&VectorAtPosition::new(Vector3::new(0.0, 0.0, 1.0), Vector3::new(0.0, 1.0, 0.0)))
            .unwrap();
        assert_relative_eq!(tensor * b.w(), *b.angular_momentum(), epsilon = EPSILON);
    }
}
