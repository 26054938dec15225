//! Velocity-based rigid body state driven by impulses

use std::fmt;

use nalgebra::Matrix3;

use crate::core::PenetrationLimits;
use crate::foundation::math::{
    orthonormalized, rodrigues, tait_bryan_angles_to_matrix, ScenePos, Transformation3, Vector3, VectorAtPosition,
};
use crate::physics::error::Result;

use super::{check_impulse, clamp_norm, MassProperties, WorldInertia};

/// Pose, linear velocity of the center of mass and angular velocity
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RigidBodyPulses {
    inertia: WorldInertia,
    v_com: Vector3<ScenePos>,
    w: Vector3<ScenePos>,
    rotation: Matrix3<ScenePos>,
    abs_com: Vector3<ScenePos>,
    penetration_limits: PenetrationLimits,
}

impl RigidBodyPulses {
    /// Body at rest at `position` with orientation given by Tait-Bryan angles
    pub fn new(props: MassProperties, position: Vector3<ScenePos>, rotation: Vector3<ScenePos>) -> Self {
        let rotation = tait_bryan_angles_to_matrix(&rotation);
        Self {
            inertia: WorldInertia::new(props, &rotation),
            v_com: Vector3::zeros(),
            w: Vector3::zeros(),
            abs_com: rotation * props.com + position,
            rotation,
            penetration_limits: PenetrationLimits::default(),
        }
    }

    /// Set linear velocity of the center of mass and angular velocity
    pub fn with_velocity(mut self, v_com: Vector3<ScenePos>, w: Vector3<ScenePos>) -> Self {
        self.v_com = v_com;
        self.w = w;
        self
    }

    /// Set the per-tick velocity clamps
    pub fn with_penetration_limits(mut self, limits: PenetrationLimits) -> Self {
        self.penetration_limits = limits;
        self
    }

    /// Mass properties
    pub fn mass_properties(&self) -> &MassProperties {
        &self.inertia.props
    }

    /// Mass in kg
    pub fn mass(&self) -> ScenePos {
        self.inertia.props.mass
    }

    /// Velocity of the center of mass
    pub fn v_com(&self) -> &Vector3<ScenePos> {
        &self.v_com
    }

    /// Angular velocity
    pub fn w(&self) -> &Vector3<ScenePos> {
        &self.w
    }

    /// Orientation
    pub fn rotation(&self) -> &Matrix3<ScenePos> {
        &self.rotation
    }

    /// Center of mass in world coordinates
    pub fn abs_com(&self) -> &Vector3<ScenePos> {
        &self.abs_com
    }

    /// Move the body by one tick of length `dt`
    pub fn advance_time(&mut self, dt: ScenePos) {
        self.abs_com += self.v_com * dt;
        if self.w != Vector3::zeros() {
            self.rotation = orthonormalized(&(rodrigues(&(self.w * dt)) * self.rotation));
            self.inertia.update(&self.rotation);
        }
    }

    /// Velocity of the body origin
    pub fn velocity(&self) -> Vector3<ScenePos> {
        self.v_com - self.w.cross(&(self.rotation * self.inertia.props.com))
    }

    /// Velocity of the body point currently at `position`
    pub fn velocity_at_position(&self, position: &Vector3<ScenePos>) -> Vector3<ScenePos> {
        self.v_com + self.w.cross(&(position - self.abs_com))
    }

    /// World position of the body origin
    pub fn abs_position(&self) -> Vector3<ScenePos> {
        self.abs_com - self.rotation * self.inertia.props.com
    }

    /// Body-to-world transformation
    pub fn abs_transformation(&self) -> Transformation3<ScenePos> {
        Transformation3::new(self.rotation, self.abs_position())
    }

    /// Map a point from body to world coordinates
    pub fn transform_to_world_coordinates(&self, v: &Vector3<ScenePos>) -> Vector3<ScenePos> {
        self.rotation * (v - self.inertia.props.com) + self.abs_com
    }

    /// Body z axis in world coordinates
    pub fn abs_z(&self) -> Vector3<ScenePos> {
        self.rotation.column(2).into_owned()
    }

    /// Place the body origin at `position` with orientation `rotation`
    pub fn set_pose(&mut self, rotation: &Matrix3<ScenePos>, position: &Vector3<ScenePos>) {
        self.rotation = *rotation;
        self.abs_com = rotation * self.inertia.props.com + position;
        self.inertia.update(&self.rotation);
    }

    /// Solve `I_abs w = x`
    pub fn solve_abs_i(&self, x: &Vector3<ScenePos>) -> Vector3<ScenePos> {
        self.inertia.solve(&self.rotation, x)
    }

    /// `I_abs x`
    pub fn dot_abs_i(&self, x: &Vector3<ScenePos>) -> Vector3<ScenePos> {
        self.inertia.dot(&self.rotation, x)
    }

    /// Add a velocity change, clamped to the tick's translation limit
    pub fn integrate_delta_v(&mut self, dv: &Vector3<ScenePos>, dt: ScenePos) {
        self.v_com += dv;
        clamp_norm(&mut self.v_com, self.penetration_limits.vmax_translation(dt));
    }

    /// Add an angular momentum change, clamped to the tick's rotation limit
    ///
    /// `extra_w` scales the resulting angular velocity change by `1 + extra_w`.
    pub fn integrate_delta_angular_momentum(&mut self, dl: &Vector3<ScenePos>, extra_w: ScenePos, dt: ScenePos) {
        self.w += self.solve_abs_i(dl) * (1.0 + extra_w);
        clamp_norm(&mut self.w, self.penetration_limits.wmax(dt));
    }

    /// Accelerate by `g` for `dt`
    pub fn integrate_gravity(&mut self, g: &Vector3<ScenePos>, dt: ScenePos) {
        self.v_com += g * dt;
    }

    /// Apply an impulse at a world position
    pub fn integrate_impulse(&mut self, j: &VectorAtPosition<ScenePos>, extra_w: ScenePos, dt: ScenePos) -> Result<()> {
        check_impulse(&j.vector)?;
        self.integrate_delta_v(&(j.vector / self.mass()), dt);
        let dl = (j.position - self.abs_com).cross(&j.vector);
        self.integrate_delta_angular_momentum(&dl, extra_w, dt);
        Ok(())
    }

    /// Kinetic energy
    pub fn energy(&self) -> ScenePos {
        0.5 * (self.mass() * self.v_com.norm_squared() + self.w.dot(&self.dot_abs_i(&self.w)))
    }

    /// Mass felt by an impulse along `vp.vector` applied at `vp.position`
    pub fn effective_mass(&self, vp: &VectorAtPosition<ScenePos>) -> ScenePos {
        let j2 = (vp.position - self.abs_com).cross(&vp.vector);
        1.0 / (1.0 / self.mass() + j2.dot(&self.solve_abs_i(&j2)))
    }
}

impl fmt::Display for RigidBodyPulses {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let props = &self.inertia.props;
        writeln!(f, "RigidBodyPulses")?;
        writeln!(f, "mass {}", props.mass)?;
        writeln!(f, "I {:?}", props.inertia.as_slice())?;
        writeln!(f, "com {:?}", props.com.as_slice())?;
        writeln!(f, "v (com) {:?}", self.v_com.as_slice())?;
        writeln!(f, "w {:?}", self.w.as_slice())?;
        writeln!(f, "rotation {:?}", self.rotation.as_slice())?;
        writeln!(f, "abs_com {:?}", self.abs_com.as_slice())?;
        write!(f, "I_is_diagonal {}", props.inertia_is_diagonal)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::physics::error::PhysicsError;
    use crate::physics::rigid_body::MAX_IMPULSE;
    use approx::assert_relative_eq;

    const EPSILON: f64 = 1e-10;

    fn body() -> RigidBodyPulses {
        let props = MassProperties::diagonal(2.0, Vector3::new(1.0, 2.0, 3.0), Vector3::new(0.0, 0.5, 0.0));
        RigidBodyPulses::new(props, Vector3::new(10.0, 0.0, -5.0), Vector3::new(0.1, 0.2, 0.3))
    }

    #[test]
    fn test_advance_without_forcing_keeps_velocities_and_orientation() {
        for dt in [1e-3, 0.016, 1.0, 100.0] {
            let mut b = body().with_velocity(Vector3::new(1.0, -2.0, 0.5), Vector3::zeros());
            let rotation = *b.rotation();
            b.advance_time(dt);
            assert_eq!(*b.v_com(), Vector3::new(1.0, -2.0, 0.5));
            assert_eq!(*b.w(), Vector3::zeros());
            assert_eq!(*b.rotation(), rotation);
        }
    }

    #[test]
    fn test_rotation_stays_orthonormal() {
        let mut b = body().with_velocity(Vector3::zeros(), Vector3::new(0.3, 2.0, -1.0));
        for _ in 0..1000 {
            b.advance_time(0.01);
        }
        let r = b.rotation();
        assert_relative_eq!(r.transpose() * r, Matrix3::identity(), epsilon = 1e-9);
        assert_relative_eq!(r.determinant(), 1.0, epsilon = 1e-9);
    }

    #[test]
    fn test_pose_accessors_are_consistent() {
        let b = body().with_velocity(Vector3::new(1.0, 0.0, 0.0), Vector3::new(0.0, 0.0, 2.0));
        let com = b.mass_properties().com;
        assert_relative_eq!(b.transform_to_world_coordinates(&com), *b.abs_com(), epsilon = EPSILON);
        assert_relative_eq!(b.transform_to_world_coordinates(&Vector3::zeros()), b.abs_position(), epsilon = EPSILON);
        assert_relative_eq!(b.abs_position(), Vector3::new(10.0, 0.0, -5.0), epsilon = EPSILON);
        assert_relative_eq!(b.velocity(), b.velocity_at_position(&b.abs_position()), epsilon = EPSILON);
        assert_relative_eq!(b.abs_z(), b.abs_transformation().rotate(&Vector3::z()), epsilon = EPSILON);
    }

    #[test]
    fn test_set_pose() {
        let mut b = body();
        b.set_pose(&Matrix3::identity(), &Vector3::new(1.0, 2.0, 3.0));
        assert_relative_eq!(b.abs_position(), Vector3::new(1.0, 2.0, 3.0), epsilon = EPSILON);
        assert_relative_eq!(*b.abs_com(), Vector3::new(1.0, 2.5, 3.0), epsilon = EPSILON);
    }

    #[test]
    fn test_central_impulse_changes_only_linear_velocity() {
        let mut b = body();
        let j = VectorAtPosition::new(Vector3::new(4.0, 0.0, 0.0), *b.abs_com());
        b.integrate_impulse(&j, 0.0, 0.01).unwrap();
        assert_relative_eq!(*b.v_com(), Vector3::new(2.0, 0.0, 0.0), epsilon = EPSILON);
        assert_eq!(*b.w(), Vector3::zeros());
        assert_relative_eq!(b.energy(), 4.0, epsilon = EPSILON);
    }

    #[test]
    fn test_huge_impulse_is_rejected() {
        let mut b = body();
        let j = VectorAtPosition::new(Vector3::new(0.0, 2.0 * MAX_IMPULSE, 0.0), *b.abs_com());
        assert!(matches!(b.integrate_impulse(&j, 0.0, 0.01), Err(PhysicsError::ImpulseOutOfBounds { .. })));
    }

    #[test]
    fn test_velocity_clamp() {
        let limits = PenetrationLimits {
            max_translation: 0.1,
            max_rotation: 0.01,
        };
        let mut b = body().with_penetration_limits(limits);
        b.integrate_delta_v(&Vector3::new(100.0, 0.0, 0.0), 0.01);
        assert_relative_eq!(b.v_com().norm(), 10.0, epsilon = EPSILON);
        b.integrate_delta_angular_momentum(&Vector3::new(0.0, 0.0, 300.0), 0.0, 0.01);
        assert_relative_eq!(b.w().norm(), 1.0, epsilon = EPSILON);
    }

    #[test]
    fn test_effective_mass_at_com_is_mass() {
        let b = body();
        let vp = VectorAtPosition::new(Vector3::x(), *b.abs_com());
        assert_relative_eq!(b.effective_mass(&vp), 2.0, epsilon = EPSILON);
        let lever = VectorAtPosition::new(Vector3::x(), b.abs_com() + b.rotation() * Vector3::y());
        assert!(b.effective_mass(&lever) < 2.0);
    }

    #[test]
    fn test_locked_axis_keeps_energy_finite() {
        let props = MassProperties::diagonal(2.0, Vector3::new(1.0, f64::INFINITY, 3.0), Vector3::zeros());
        let mut b = RigidBodyPulses::new(props, Vector3::zeros(), Vector3::new(0.1, 0.2, 0.3));
        let j = VectorAtPosition::new(Vector3::new(0.0, 0.0, 1.0), b.abs_com() + Vector3::new(1.0, 0.5, 0.0));
        b.integrate_impulse(&j, 0.0, 0.01).unwrap();

        let local_w = b.rotation().transpose() * b.w();
        assert!(local_w.y.abs() < EPSILON);
        let expected = 0.5 * (2.0 * b.v_com().norm_squared() + local_w.x * local_w.x + 3.0 * local_w.z * local_w.z);
        assert!(b.energy().is_finite());
        assert_relative_eq!(b.energy(), expected, epsilon = EPSILON);
    }

    #[test]
    fn test_display_lists_mass() {
        assert!(body().to_string().contains("mass 2"));
    }
}
