//! Axis-aligned bounding boxes in any dimension

use crate::foundation::math::{convert_vector, Scalar, SVector, Transformation3, Vector3};

/// Axis-aligned box `[min, max]`; the empty box uses `+∞`/`-∞` sentinels
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AxisAlignedBoundingBox<T: Scalar, const D: usize> {
    /// Lower corner
    pub min: SVector<T, D>,
    /// Upper corner
    pub max: SVector<T, D>,
}

/// Three-dimensional box
pub type Aabb3<T> = AxisAlignedBoundingBox<T, 3>;

impl<T: Scalar, const D: usize> AxisAlignedBoundingBox<T, D> {
    /// Box containing nothing; extending it by a point yields that point
    pub fn empty() -> Self {
        Self {
            min: SVector::repeat(T::infinity()),
            max: SVector::repeat(-T::infinity()),
        }
    }

    /// Box from its corners
    pub fn from_min_max(min: SVector<T, D>, max: SVector<T, D>) -> Self {
        debug_assert!(
            min.iter().zip(max.iter()).all(|(a, b)| a <= b),
            "AABB min exceeds max"
        );
        Self { min, max }
    }

    /// Degenerate box around a single point
    pub fn from_point(p: &SVector<T, D>) -> Self {
        Self { min: *p, max: *p }
    }

    /// Box `center ± radius`
    pub fn from_center_and_radius(center: &SVector<T, D>, radius: &SVector<T, D>) -> Self {
        Self {
            min: center - radius,
            max: center + radius,
        }
    }

    /// Smallest box containing every point
    pub fn from_points<'a>(points: impl IntoIterator<Item = &'a SVector<T, D>>) -> Self {
        let mut result = Self::empty();
        for p in points {
            result.extend_point(p);
        }
        result
    }

    /// Whether the box was never extended
    pub fn is_empty(&self) -> bool {
        self.min.iter().zip(self.max.iter()).any(|(a, b)| a > b)
    }

    /// Grow to contain `p`
    pub fn extend_point(&mut self, p: &SVector<T, D>) {
        self.min = self.min.inf(p);
        self.max = self.max.sup(p);
    }

    /// Grow to contain `other`
    pub fn extend(&mut self, other: &Self) {
        self.min = self.min.inf(&other.min);
        self.max = self.max.sup(&other.max);
    }

    /// Box grown by `radius` on every side
    pub fn dilated(&self, radius: &SVector<T, D>) -> Self {
        Self {
            min: self.min - radius,
            max: self.max + radius,
        }
    }

    /// Closed-interval overlap test
    pub fn intersects(&self, other: &Self) -> bool {
        (0..D).all(|i| self.min[i] <= other.max[i] && other.min[i] <= self.max[i])
    }

    /// Whether `other` lies completely inside
    pub fn contains_box(&self, other: &Self) -> bool {
        (0..D).all(|i| self.min[i] <= other.min[i] && other.max[i] <= self.max[i])
    }

    /// Whether `p` lies inside or on the boundary
    pub fn contains_point(&self, p: &SVector<T, D>) -> bool {
        (0..D).all(|i| self.min[i] <= p[i] && p[i] <= self.max[i])
    }

    /// Point of the box closest to `p`
    pub fn closest_point(&self, p: &SVector<T, D>) -> SVector<T, D> {
        p.sup(&self.min).inf(&self.max)
    }

    /// Center point
    pub fn center(&self) -> SVector<T, D> {
        (self.min + self.max) / T::lit(2.0)
    }

    /// Edge lengths
    pub fn size(&self) -> SVector<T, D> {
        self.max - self.min
    }

    /// Half of the edge lengths
    pub fn half_width(&self) -> SVector<T, D> {
        self.size() / T::lit(2.0)
    }

    /// Box moved by `offset`
    pub fn translated(&self, offset: &SVector<T, D>) -> Self {
        Self {
            min: self.min + offset,
            max: self.max + offset,
        }
    }

    /// Call `f` for each of the `2^D` corners; bit `i` of the corner index selects `max[i]`
    pub fn for_each_corner(&self, mut f: impl FnMut(&SVector<T, D>)) {
        for mask in 0..(1usize << D) {
            f(&self.corner(mask));
        }
    }

    /// Corner selected by a bit mask, see [`Self::for_each_corner`]
    pub fn corner(&self, mask: usize) -> SVector<T, D> {
        SVector::from_fn(|i, _| if mask & (1 << i) == 0 { self.min[i] } else { self.max[i] })
    }

    /// Convert to another scalar type
    pub fn convert<U: Scalar>(&self) -> AxisAlignedBoundingBox<U, D> {
        AxisAlignedBoundingBox {
            min: convert_vector(&self.min),
            max: convert_vector(&self.max),
        }
    }
}

impl<T: Scalar> AxisAlignedBoundingBox<T, 3> {
    /// Bounding box of the transformed corners
    pub fn transformed(&self, trafo: &Transformation3<T>) -> Self {
        let mut result = Self::empty();
        self.for_each_corner(|c| result.extend_point(&trafo.transform_point(c)));
        result
    }

    /// Call `f` for each of the 12 edges
    pub fn for_each_edge(&self, mut f: impl FnMut(&Vector3<T>, &Vector3<T>)) {
        for axis in 0..3 {
            let b = (axis + 1) % 3;
            let c = (axis + 2) % 3;
            for other in 0..4usize {
                let base = ((other & 1) << b) | (((other >> 1) & 1) << c);
                f(&self.corner(base), &self.corner(base | (1 << axis)));
            }
        }
    }

    /// Call `f` for each of the 6 faces, corners counter-clockwise seen from outside
    pub fn for_each_face(&self, mut f: impl FnMut(&[Vector3<T>; 4])) {
        for axis in 0..3 {
            let b = 1 << ((axis + 1) % 3);
            let c = 1 << ((axis + 2) % 3);
            for side in 0..2usize {
                let s = side << axis;
                let ccw = [s, s | b, s | b | c, s | c];
                let quad = if side == 1 {
                    ccw.map(|m| self.corner(m))
                } else {
                    [ccw[0], ccw[3], ccw[2], ccw[1]].map(|m| self.corner(m))
                };
                f(&quad);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::physics::collision::primitives::Plane3;
    use approx::assert_relative_eq;

    fn unit_box() -> Aabb3<f64> {
        AxisAlignedBoundingBox::from_min_max(Vector3::zeros(), Vector3::new(1.0, 1.0, 1.0))
    }

    #[test]
    fn test_empty_box_extends_to_point() {
        let mut b = Aabb3::<f64>::empty();
        assert!(b.is_empty());
        b.extend_point(&Vector3::new(1.0, 2.0, 3.0));
        assert_eq!(b.min, b.max);
        assert!(!b.is_empty());
    }

    #[test]
    fn test_intersects_and_contains() {
        let a = unit_box();
        let b = a.translated(&Vector3::new(1.0, 0.5, 0.5));
        let c = a.translated(&Vector3::new(1.01, 0.0, 0.0));
        assert!(a.intersects(&b));
        assert!(!a.intersects(&c));
        assert!(a.dilated(&Vector3::repeat(0.5)).contains_box(&AxisAlignedBoundingBox::from_center_and_radius(
            &Vector3::repeat(0.5),
            &Vector3::repeat(0.9),
        )));
        assert!(a.contains_point(&Vector3::new(1.0, 0.0, 0.5)));
    }

    #[test]
    fn test_closest_point_clamps() {
        let p = unit_box().closest_point(&Vector3::new(2.0, -1.0, 0.5));
        assert_eq!(p, Vector3::new(1.0, 0.0, 0.5));
    }

    #[test]
    fn test_corners_edges_faces_counts() {
        let b = unit_box();
        let mut corners = 0;
        b.for_each_corner(|_| corners += 1);
        let mut edges = 0;
        b.for_each_edge(|p, q| {
            assert_relative_eq!((q - p).norm(), 1.0);
            edges += 1;
        });
        let mut faces = 0;
        b.for_each_face(|quad| {
            let plane = Plane3::from_points(&quad[0], &quad[1], &quad[2]).unwrap();
            // Outward normal: the box center lies behind every face
            assert!(plane.signed_distance(&b.center()) < 0.0);
            faces += 1;
        });
        assert_eq!((corners, edges, faces), (8, 12, 6));
    }

    #[test]
    fn test_two_dimensional_box() {
        let b = AxisAlignedBoundingBox::<f32, 2>::from_points(&[
            nalgebra::Vector2::new(0.0, 1.0),
            nalgebra::Vector2::new(2.0, -1.0),
        ]);
        assert_eq!(b.center(), nalgebra::Vector2::new(1.0, 0.0));
        assert_eq!(b.half_width(), nalgebra::Vector2::new(1.0, 1.0));
    }

    #[test]
    fn test_transformed_box_contains_rotated_corners() {
        let trafo = Transformation3::new(
            crate::foundation::math::rodrigues(&Vector3::new(0.0, 0.0, std::f64::consts::FRAC_PI_4)),
            Vector3::new(3.0, 0.0, 0.0),
        );
        let moved = unit_box().transformed(&trafo);
        unit_box().for_each_corner(|c| {
            let p = trafo.transform_point(c);
            assert!(moved.dilated(&Vector3::repeat(1e-12)).contains_point(&p));
        });
        assert_relative_eq!(moved.size().x, std::f64::consts::SQRT_2, epsilon = 1e-12);
    }
}
