//! Math utilities and types
//!
//! Provides the scalar abstraction shared by every geometric type, the
//! scene position aliases and a handful of rotation helpers.

use std::fmt;

pub use nalgebra::{Matrix3, Rotation3, SVector, Vector3};

/// Numeric type usable as a coordinate of collision geometry.
///
/// Implemented for `f32` (compressed, memory-dense world storage) and `f64`
/// (full precision for physics-critical computation).
pub trait Scalar: nalgebra::RealField + Copy + fmt::Display + Default {
    /// Converts an `f64` literal into this type.
    fn lit(value: f64) -> Self;

    /// Widens this value to `f64`.
    fn as_f64(self) -> f64;

    /// Converts this value into another scalar type.
    fn convert<U: Scalar>(self) -> U {
        U::lit(self.as_f64())
    }

    /// Positive infinity.
    fn infinity() -> Self;

    /// Machine epsilon of the type.
    fn epsilon() -> Self;

    /// Returns `true` for NaN.
    fn is_nan_value(self) -> bool {
        self.as_f64().is_nan()
    }
}

impl Scalar for f32 {
    fn lit(value: f64) -> Self {
        value as f32
    }

    fn as_f64(self) -> f64 {
        f64::from(self)
    }

    fn infinity() -> Self {
        f32::INFINITY
    }

    fn epsilon() -> Self {
        f32::EPSILON
    }
}

impl Scalar for f64 {
    fn lit(value: f64) -> Self {
        value
    }

    fn as_f64(self) -> f64 {
        self
    }

    fn infinity() -> Self {
        f64::INFINITY
    }

    fn epsilon() -> Self {
        f64::EPSILON
    }
}

/// Reduced precision position used for stored world geometry
pub type CompressedScenePos = f32;

/// Full precision position used by the physics core
pub type ScenePos = f64;

/// Direction and normal component type
pub type SceneDir = f32;

/// Converts every component of a fixed-size vector to another scalar type.
pub fn convert_vector<T: Scalar, U: Scalar, const D: usize>(v: &SVector<T, D>) -> SVector<U, D> {
    v.map(|x| x.convert::<U>())
}

/// Converts every component of a 3x3 matrix to another scalar type.
pub fn convert_matrix<T: Scalar, U: Scalar>(m: &Matrix3<T>) -> Matrix3<U> {
    m.map(|x| x.convert::<U>())
}

/// Rigid transformation: rotation followed by translation
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Transformation3<T: Scalar> {
    /// Orthonormal rotation matrix
    pub rotation: Matrix3<T>,
    /// Translation applied after the rotation
    pub translation: Vector3<T>,
}

impl<T: Scalar> Default for Transformation3<T> {
    fn default() -> Self {
        Self::identity()
    }
}

impl<T: Scalar> Transformation3<T> {
    /// Create a transformation from rotation and translation
    pub fn new(rotation: Matrix3<T>, translation: Vector3<T>) -> Self {
        Self { rotation, translation }
    }

    /// Identity transformation
    pub fn identity() -> Self {
        Self {
            rotation: Matrix3::identity(),
            translation: Vector3::zeros(),
        }
    }

    /// Pure translation
    pub fn from_translation(translation: Vector3<T>) -> Self {
        Self {
            rotation: Matrix3::identity(),
            translation,
        }
    }

    /// Transform a point
    pub fn transform_point(&self, p: &Vector3<T>) -> Vector3<T> {
        self.rotation * p + self.translation
    }

    /// Rotate a direction
    pub fn rotate(&self, v: &Vector3<T>) -> Vector3<T> {
        self.rotation * v
    }

    /// Inverse transformation (assumes an orthonormal rotation)
    pub fn inverse(&self) -> Self {
        let rt = self.rotation.transpose();
        Self {
            translation: -(rt * self.translation),
            rotation: rt,
        }
    }

    /// `self ∘ other`: applies `other` first
    pub fn compose(&self, other: &Self) -> Self {
        Self {
            rotation: self.rotation * other.rotation,
            translation: self.rotation * other.translation + self.translation,
        }
    }

    /// Convert to another scalar type
    pub fn convert<U: Scalar>(&self) -> Transformation3<U> {
        Transformation3 {
            rotation: convert_matrix(&self.rotation),
            translation: convert_vector(&self.translation),
        }
    }
}

/// A force or impulse vector applied at a world position
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct VectorAtPosition<T: Scalar> {
    /// The applied vector
    pub vector: Vector3<T>,
    /// Point of application
    pub position: Vector3<T>,
}

impl<T: Scalar> VectorAtPosition<T> {
    /// Create a new vector at a position
    pub fn new(vector: Vector3<T>, position: Vector3<T>) -> Self {
        Self { vector, position }
    }
}

/// Rotation matrix for the rotation vector `w` (axis times angle).
///
/// Returns the identity for a zero vector.
pub fn rodrigues<T: Scalar>(w: &Vector3<T>) -> Matrix3<T> {
    let angle = w.norm();
    if angle == T::lit(0.0) {
        return Matrix3::identity();
    }
    let k = (w / angle).cross_matrix();
    Matrix3::identity() + k * angle.sin() + k * k * (T::lit(1.0) - angle.cos())
}

/// Rotation matrix from Tait-Bryan angles `(roll, pitch, yaw)`, composed as `Rz * Ry * Rx`.
pub fn tait_bryan_angles_to_matrix<T: Scalar>(angles: &Vector3<T>) -> Matrix3<T> {
    Rotation3::from_euler_angles(angles.x, angles.y, angles.z).into_inner()
}

/// Inverse of [`tait_bryan_angles_to_matrix`].
pub fn matrix_to_tait_bryan_angles<T: Scalar>(m: &Matrix3<T>) -> Vector3<T> {
    let (roll, pitch, yaw) = Rotation3::from_matrix_unchecked(*m).euler_angles();
    Vector3::new(roll, pitch, yaw)
}

/// Gram-Schmidt re-orthonormalization of a nearly orthonormal matrix.
pub fn orthonormalized<T: Scalar>(m: &Matrix3<T>) -> Matrix3<T> {
    let x = m.column(0).normalize();
    let y = (m.column(1) - x * x.dot(&m.column(1))).normalize();
    let z = x.cross(&y);
    Matrix3::from_columns(&[x, y, z])
}

/// Math constants
pub mod constants {
    /// Degrees to radians conversion factor
    pub const DEG_TO_RAD: f64 = std::f64::consts::PI / 180.0;

    /// Radians to degrees conversion factor
    pub const RAD_TO_DEG: f64 = 180.0 / std::f64::consts::PI;

    /// Kilograms per unit mass used by the physics core
    pub const KG: f64 = 1.0;

    /// Meters per second per km/h
    pub const KPH: f64 = 1.0 / 3.6;
}

/// Math utility functions
pub mod utils {
    use super::constants;

    /// Convert degrees to radians
    pub fn deg_to_rad(degrees: f64) -> f64 {
        degrees * constants::DEG_TO_RAD
    }

    /// Convert radians to degrees
    pub fn rad_to_deg(radians: f64) -> f64 {
        radians * constants::RAD_TO_DEG
    }

    /// Linear interpolation
    pub fn lerp(a: f64, b: f64, t: f64) -> f64 {
        a + (b - a) * t
    }
}
