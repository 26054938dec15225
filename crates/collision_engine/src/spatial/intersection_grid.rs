//! Uniform intersection grid
//!
//! Broad phase for static geometry. Every entry is inserted into all cells
//! covered by its box dilated by the grid's dilation radius; a query then only
//! has to look at the single cell that contains its own center. This holds as
//! long as the query box is not larger than the dilation radius.
//!
//! Cells can additionally reference finer sub-grids, which are visited
//! transitively.

use nalgebra::SVector;

use crate::core::GridConfig;
use crate::foundation::math::Scalar;
use crate::physics::collision::AxisAlignedBoundingBox;

/// Entries of a single cell
#[derive(Debug, Clone)]
pub struct IntersectionGridCell<T: Scalar, const D: usize, Data> {
    /// Boxes and payloads checked directly
    pub non_recursive: Vec<(AxisAlignedBoundingBox<T, D>, Data)>,
    /// Indices of sub-grids overlapping this cell
    pub recursive: Vec<usize>,
}

impl<T: Scalar, const D: usize, Data> Default for IntersectionGridCell<T, D, Data> {
    fn default() -> Self {
        Self {
            non_recursive: Vec::new(),
            recursive: Vec::new(),
        }
    }
}

/// Uniform grid over `boundary` with `ncells` cells per axis
#[derive(Debug, Clone)]
pub struct IntersectionGrid<T: Scalar, const D: usize, Data: Clone> {
    boundary: AxisAlignedBoundingBox<T, D>,
    ncells: [usize; D],
    dilation_radius: SVector<T, D>,
    cells: Vec<IntersectionGridCell<T, D, Data>>,
    subgrids: Vec<(AxisAlignedBoundingBox<T, D>, IntersectionGrid<T, D, Data>)>,
    len: usize,
}

impl<T: Scalar, const D: usize, Data: Clone> IntersectionGrid<T, D, Data> {
    /// Create an empty grid
    ///
    /// # Panics
    ///
    /// Panics if a cell count is zero or the boundary is empty.
    pub fn new(boundary: AxisAlignedBoundingBox<T, D>, ncells: [usize; D], dilation_radius: SVector<T, D>) -> Self {
        assert!(ncells.iter().all(|&n| n > 0), "grid cell counts must be positive, got {ncells:?}");
        assert!(!boundary.is_empty(), "grid boundary is empty");
        let total = ncells.iter().product();
        log::debug!("Creating intersection grid with {ncells:?} cells");
        Self {
            boundary,
            ncells,
            dilation_radius,
            cells: (0..total).map(|_| IntersectionGridCell::default()).collect(),
            subgrids: Vec::new(),
            len: 0,
        }
    }

    /// Region covered by the grid
    pub fn boundary(&self) -> &AxisAlignedBoundingBox<T, D> {
        &self.boundary
    }

    /// Cells per axis
    pub fn ncells(&self) -> &[usize; D] {
        &self.ncells
    }

    /// Largest supported query half-width
    pub fn dilation_radius(&self) -> &SVector<T, D> {
        &self.dilation_radius
    }

    /// Number of inserted entries, counting each once
    pub fn len(&self) -> usize {
        self.len
    }

    /// Whether nothing was inserted
    pub fn is_empty(&self) -> bool {
        self.len == 0 && self.subgrids.is_empty()
    }

    /// Cell at a multi-index
    pub fn cell(&self, index: &[usize; D]) -> &IntersectionGridCell<T, D, Data> {
        &self.cells[self.linear_index(index)]
    }

    fn linear_index(&self, index: &[usize; D]) -> usize {
        let mut result = 0;
        for d in 0..D {
            result = result * self.ncells[d] + index[d];
        }
        result
    }

    /// Position of `x` along axis `d` with the boundary mapped to `[0, 1]`
    ///
    /// A flat axis maps everything to `0`.
    fn normalized(&self, x: T, d: usize) -> f64 {
        let min = self.boundary.min[d].as_f64();
        let max = self.boundary.max[d].as_f64();
        if max == min {
            return 0.0;
        }
        (x.as_f64() - min) / (max - min)
    }

    fn clamped_cell(&self, normalized: f64, d: usize) -> usize {
        let n = self.ncells[d];
        let i = (normalized * n as f64).floor();
        if i < 0.0 {
            0
        } else {
            (i as usize).min(n - 1)
        }
    }

    /// Multi-index ranges `[lower, upper]` of the cells covered by `aabb` dilated by the radius
    fn covered_cells(&self, aabb: &AxisAlignedBoundingBox<T, D>) -> ([usize; D], [usize; D]) {
        let dilated = aabb.dilated(&self.dilation_radius);
        let mut lower = [0; D];
        let mut upper = [0; D];
        for d in 0..D {
            lower[d] = self.clamped_cell(self.normalized(dilated.min[d], d), d);
            upper[d] = self.clamped_cell(self.normalized(dilated.max[d], d), d);
        }
        (lower, upper)
    }

    fn for_each_covered_cell(&mut self, aabb: &AxisAlignedBoundingBox<T, D>, mut f: impl FnMut(&mut IntersectionGridCell<T, D, Data>)) {
        let (lower, upper) = self.covered_cells(aabb);
        let mut index = lower;
        loop {
            let i = self.linear_index(&index);
            f(&mut self.cells[i]);
            // Odometer increment over the covered range
            let mut d = D;
            loop {
                if d == 0 {
                    return;
                }
                d -= 1;
                if index[d] < upper[d] {
                    index[d] += 1;
                    break;
                }
                index[d] = lower[d];
            }
        }
    }

    fn assert_within_dilation(&self, aabb: &AxisAlignedBoundingBox<T, D>, operation: &str) {
        let half_width = aabb.half_width();
        assert!(
            (0..D).all(|d| half_width[d] <= self.dilation_radius[d]),
            "{operation}: box half-width {:?} exceeds dilation radius {:?}",
            half_width.as_slice(),
            self.dilation_radius.as_slice()
        );
    }

    /// Insert an entry into every cell its dilated box covers
    ///
    /// # Panics
    ///
    /// Panics if the box is larger than the dilation radius.
    pub fn insert(&mut self, aabb: AxisAlignedBoundingBox<T, D>, data: Data) {
        self.assert_within_dilation(&aabb, "insert");
        self.for_each_covered_cell(&aabb, |cell| cell.non_recursive.push((aabb, data.clone())));
        self.len += 1;
    }

    /// Attach a finer grid covering `aabb`
    ///
    /// # Panics
    ///
    /// Panics if the sub-grid's dilation radius is smaller than this grid's.
    pub fn insert_subgrid(&mut self, aabb: AxisAlignedBoundingBox<T, D>, grid: IntersectionGrid<T, D, Data>) {
        assert!(
            (0..D).all(|d| grid.dilation_radius[d] >= self.dilation_radius[d]),
            "sub-grid dilation radius must not be smaller than the parent's"
        );
        let index = self.subgrids.len();
        self.subgrids.push((aabb, grid));
        self.for_each_covered_cell(&aabb, |cell| cell.recursive.push(index));
    }

    /// Call `visitor` for entries whose box intersects `aabb` until it returns `false`
    ///
    /// Entries spanning several cells are reported once per query, since only
    /// the cell containing the query center is visited. A query centered
    /// outside the boundary finds nothing. Sub-grids clamp the center to
    /// their nearest cell instead, since they are only entered when their box
    /// meets the query. Returns `false` if the visitor stopped early.
    ///
    /// # Panics
    ///
    /// Panics if the query box is larger than the dilation radius.
    pub fn visit(&self, aabb: &AxisAlignedBoundingBox<T, D>, mut visitor: impl FnMut(&Data) -> bool) -> bool {
        self.visit_dyn(aabb, &mut visitor, false)
    }

    fn visit_dyn(
        &self,
        aabb: &AxisAlignedBoundingBox<T, D>,
        visitor: &mut dyn FnMut(&Data) -> bool,
        nested: bool,
    ) -> bool {
        self.assert_within_dilation(aabb, "visit");
        let center = aabb.center();
        let mut index = [0; D];
        for d in 0..D {
            let c = self.normalized(center[d], d);
            if !nested && !(0.0..=1.0).contains(&c) {
                return true;
            }
            index[d] = self.clamped_cell(c, d);
        }
        let cell = &self.cells[self.linear_index(&index)];
        for (entry, data) in &cell.non_recursive {
            if entry.intersects(aabb) && !visitor(data) {
                return false;
            }
        }
        for &i in &cell.recursive {
            let (sub_aabb, grid) = &self.subgrids[i];
            if sub_aabb.intersects(aabb) && !grid.visit_dyn(aabb, visitor, true) {
                return false;
            }
        }
        true
    }

    /// Remove every entry and sub-grid
    pub fn clear(&mut self) {
        for cell in &mut self.cells {
            cell.non_recursive.clear();
            cell.recursive.clear();
        }
        self.subgrids.clear();
        self.len = 0;
    }
}

impl<T: Scalar, Data: Clone> IntersectionGrid<T, 3, Data> {
    /// Create a 3-D grid with the layout from `config`
    pub fn from_config(boundary: AxisAlignedBoundingBox<T, 3>, config: &GridConfig) -> Self {
        let radius = SVector::<f64, 3>::from(config.dilation_radius).map(T::lit);
        Self::new(boundary, config.ncells, radius)
    }
}
