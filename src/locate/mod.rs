//! Locating sample points inside an unstructured mesh
//!
//! A [`CellLocator`] bins the bounding boxes of every element into a uniform
//! bucket grid. A query looks up the bucket that holds the point and tests the
//! few candidate elements it lists with the exact inverse map from [`element`].
//!
//! Locating points is independent of the timestep, so a whole sampling grid is
//! located once into a [`Stencil`], which then interpolates any number of nodal or
//! element fields with a cheap gather.

pub mod element;

pub use element::{ElementKind, MAX_CORNERS};

use crate::grid::UniformGrid;

/// upper bound on buckets along one axis
const MAX_BUCKETS_PER_AXIS: usize = 512;

/// a single element reduced to its corner nodes
#[derive(Debug, Clone)]
pub struct Cell {
    pub kind: ElementKind,
    /// zero based node indices of the corners
    pub nodes: Vec<usize>,
    /// global (zero based) element index in the mesh
    pub element: usize,
}

/// where a sample point landed in the mesh
#[derive(Debug, Clone, PartialEq)]
pub struct Location {
    /// global (zero based) element index
    pub cell: usize,
    pub nodes: [usize; MAX_CORNERS],
    pub weights: [f64; MAX_CORNERS],
    pub len: usize,
}

impl Location {
    /// interpolate a nodal field at this location
    pub fn interpolate(&self, nodal: &[f64]) -> f64 {
        self.nodes[..self.len]
            .iter()
            .zip(self.weights[..self.len].iter())
            .map(|(node, weight)| nodal[*node] * weight)
            .sum()
    }
}

#[derive(Debug, Clone, Copy)]
struct BoundingBox {
    min: [f64; 3],
    max: [f64; 3],
}

impl BoundingBox {
    fn empty() -> Self {
        Self {
            min: [f64::INFINITY; 3],
            max: [f64::NEG_INFINITY; 3],
        }
    }

    fn include(&mut self, point: &[f64; 3]) {
        for axis in 0..3 {
            self.min[axis] = self.min[axis].min(point[axis]);
            self.max[axis] = self.max[axis].max(point[axis]);
        }
    }

    fn grown(mut self, tolerance: f64) -> Self {
        for axis in 0..3 {
            self.min[axis] -= tolerance;
            self.max[axis] += tolerance;
        }
        self
    }

    fn contains(&self, point: &[f64; 3]) -> bool {
        (0..3).all(|axis| point[axis] >= self.min[axis] && point[axis] <= self.max[axis])
    }

    fn diagonal(&self) -> f64 {
        (0..3)
            .map(|axis| (self.max[axis] - self.min[axis]).powi(2))
            .sum::<f64>()
            .sqrt()
    }
}

/// Bucket grid over the element bounding boxes of a mesh
pub struct CellLocator {
    points: Vec<[f64; 3]>,
    cells: Vec<Cell>,
    cell_boxes: Vec<BoundingBox>,
    bounds: BoundingBox,
    counts: [usize; 3],
    bucket_size: [f64; 3],
    buckets: Vec<Vec<usize>>,
}

impl CellLocator {
    /// Bin every cell of the mesh.
    ///
    /// `points` are the node coordinates and every cell references them by zero
    /// based index. Cells with out of range node indices are skipped.
    pub fn new(points: Vec<[f64; 3]>, cells: Vec<Cell>) -> Self {
        let cells: Vec<Cell> = cells
            .into_iter()
            .filter(|cell| {
                cell.nodes.len() == cell.kind.corner_count()
                    && cell.nodes.iter().all(|node| *node < points.len())
            })
            .collect();

        let mut bounds = BoundingBox::empty();
        let cell_boxes: Vec<BoundingBox> = cells
            .iter()
            .map(|cell| {
                let mut bbox = BoundingBox::empty();
                for node in &cell.nodes {
                    bbox.include(&points[*node]);
                }
                bounds.include(&bbox.min);
                bounds.include(&bbox.max);
                bbox
            })
            .collect();

        if cells.is_empty() {
            bounds = BoundingBox {
                min: [0.; 3],
                max: [0.; 3],
            };
        }

        let tolerance = tolerance_for(&bounds);
        let bounds = bounds.grown(tolerance);
        let cell_boxes: Vec<BoundingBox> = cell_boxes
            .into_iter()
            .map(|bbox| bbox.grown(tolerance))
            .collect();

        let counts = bucket_counts(&bounds, cells.len());
        let mut bucket_size = [0.; 3];
        for axis in 0..3 {
            bucket_size[axis] = (bounds.max[axis] - bounds.min[axis]) / counts[axis] as f64;
        }

        let mut locator = Self {
            points,
            cells,
            cell_boxes,
            bounds,
            counts,
            bucket_size,
            buckets: vec![Vec::new(); counts[0] * counts[1] * counts[2]],
        };

        for (index, bbox) in locator.cell_boxes.iter().enumerate() {
            let low = locator.bucket_of(&bbox.min);
            let high = locator.bucket_of(&bbox.max);

            for k in low[2]..=high[2] {
                for j in low[1]..=high[1] {
                    for i in low[0]..=high[0] {
                        let flat = locator.flat_bucket([i, j, k]);
                        locator.buckets[flat].push(index);
                    }
                }
            }
        }

        log::debug!(
            "binned {} cells into {}x{}x{} buckets",
            locator.cells.len(),
            counts[0],
            counts[1],
            counts[2]
        );

        locator
    }

    pub fn cell_count(&self) -> usize {
        self.cells.len()
    }

    fn bucket_of(&self, point: &[f64; 3]) -> [usize; 3] {
        let mut index = [0; 3];

        for axis in 0..3 {
            if self.bucket_size[axis] > 0. {
                let position = (point[axis] - self.bounds.min[axis]) / self.bucket_size[axis];
                let position = position.floor().max(0.) as usize;
                index[axis] = position.min(self.counts[axis] - 1);
            }
        }

        index
    }

    fn flat_bucket(&self, index: [usize; 3]) -> usize {
        index[0] + self.counts[0] * (index[1] + self.counts[1] * index[2])
    }

    /// find the first cell containing `point`, with interpolation weights of its corners
    pub fn locate(&self, point: [f64; 3]) -> Option<Location> {
        if !self.bounds.contains(&point) {
            return None;
        }

        let bucket = self.flat_bucket(self.bucket_of(&point));

        for cell_index in &self.buckets[bucket] {
            if !self.cell_boxes[*cell_index].contains(&point) {
                continue;
            }

            let cell = &self.cells[*cell_index];
            let mut corners = [[0.; 3]; MAX_CORNERS];
            for (corner, node) in corners.iter_mut().zip(cell.nodes.iter()) {
                *corner = self.points[*node];
            }

            let len = cell.nodes.len();
            if let Some(weights) = cell.kind.weights(&corners[..len], point) {
                let mut nodes = [0; MAX_CORNERS];
                nodes[..len].copy_from_slice(&cell.nodes);

                return Some(Location {
                    cell: cell.element,
                    nodes,
                    weights,
                    len,
                });
            }
        }

        None
    }

    /// locate every point of a uniform grid
    pub fn stencil(&self, grid: &UniformGrid) -> Stencil {
        let locations: Vec<Option<Location>> = grid.points().map(|point| self.locate(point)).collect();

        let found = locations.iter().filter(|l| l.is_some()).count();
        log::debug!("{} of {} grid points are inside the mesh", found, locations.len());

        Stencil {
            grid: grid.clone(),
            locations,
        }
    }
}

fn tolerance_for(bounds: &BoundingBox) -> f64 {
    let diagonal = bounds.diagonal();
    if diagonal > 0. && diagonal.is_finite() {
        diagonal * 1e-9
    } else {
        1e-12
    }
}

/// Choose roughly one bucket per cell, distributed along the axes in proportion
/// to their extents. Degenerate axes get a single bucket.
fn bucket_counts(bounds: &BoundingBox, cells: usize) -> [usize; 3] {
    let extents: Vec<f64> = (0..3).map(|axis| bounds.max[axis] - bounds.min[axis]).collect();
    let largest = extents.iter().cloned().fold(0., f64::max);

    let active: Vec<usize> = (0..3)
        .filter(|axis| extents[*axis] > largest * 1e-6)
        .collect();

    let mut counts = [1; 3];
    if active.is_empty() || cells == 0 {
        return counts;
    }

    let measure: f64 = active.iter().map(|axis| extents[*axis]).product();
    let edge = (measure / cells as f64).powf(1. / active.len() as f64);

    for axis in active {
        let count = (extents[axis] / edge).ceil() as usize;
        counts[axis] = count.clamp(1, MAX_BUCKETS_PER_AXIS);
    }

    counts
}

/// The located points of one uniform grid
#[derive(Debug, Clone)]
pub struct Stencil {
    grid: UniformGrid,
    locations: Vec<Option<Location>>,
}

impl Stencil {
    pub fn grid(&self) -> &UniformGrid {
        &self.grid
    }

    /// one entry per grid point in grid order (x fastest)
    pub fn locations(&self) -> &[Option<Location>] {
        &self.locations
    }

    /// whether each grid point is inside the mesh
    pub fn mask(&self) -> Vec<bool> {
        self.locations.iter().map(Option::is_some).collect()
    }

    /// interpolate a nodal field; points outside the mesh get zero
    pub fn sample_nodal(&self, nodal: &[f64]) -> Vec<f64> {
        self.locations
            .iter()
            .map(|location| match location {
                Some(location) => location.interpolate(nodal),
                None => 0.,
            })
            .collect()
    }

    /// Sample an element field, piecewise constant over each element. `None`
    /// entries (element blocks without the variable) are treated like points
    /// outside the mesh.
    pub fn sample_cells(&self, cells: &[Option<f64>]) -> (Vec<f64>, Vec<bool>) {
        self.locations
            .iter()
            .map(|location| {
                match location.as_ref().and_then(|l| cells.get(l.cell).copied().flatten()) {
                    Some(value) => (value, true),
                    None => (0., false),
                }
            })
            .unzip()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::plan::AxisSample;
    use approx::assert_abs_diff_eq;

    /// two unit hexahedra side by side along x
    fn two_hexes() -> CellLocator {
        let mut points = Vec::new();
        for z in 0..2 {
            for y in 0..2 {
                for x in 0..3 {
                    points.push([x as f64, y as f64, z as f64]);
                }
            }
        }

        let id = |x: usize, y: usize, z: usize| x + 3 * (y + 2 * z);
        let hex = |x0: usize| Cell {
            kind: ElementKind::Hex8,
            element: x0,
            nodes: vec![
                id(x0, 0, 0),
                id(x0 + 1, 0, 0),
                id(x0 + 1, 1, 0),
                id(x0, 1, 0),
                id(x0, 0, 1),
                id(x0 + 1, 0, 1),
                id(x0 + 1, 1, 1),
                id(x0, 1, 1),
            ],
        };

        CellLocator::new(points, vec![hex(0), hex(1)])
    }

    #[test]
    fn locates_points_in_the_right_cell() {
        let locator = two_hexes();

        assert_eq!(locator.locate([0.5, 0.5, 0.5]).unwrap().cell, 0);
        assert_eq!(locator.locate([1.5, 0.2, 0.9]).unwrap().cell, 1);
        assert!(locator.locate([2.5, 0.5, 0.5]).is_none());
        assert!(locator.locate([1.0, 0.5, -0.1]).is_none());
    }

    #[test]
    fn shared_face_goes_to_first_cell() {
        let locator = two_hexes();
        assert_eq!(locator.locate([1.0, 0.5, 0.5]).unwrap().cell, 0);
    }

    #[test]
    fn linear_field_is_reproduced() {
        let locator = two_hexes();
        let nodal: Vec<f64> = locator
            .points
            .iter()
            .map(|p| 2. * p[0] - p[1] + 0.5 * p[2])
            .collect();

        let grid = UniformGrid::new(
            AxisSample::new(0., 2., 5),
            AxisSample::new(0., 1., 3),
            AxisSample::new(0.25, 0.25, 1),
        );
        let stencil = locator.stencil(&grid);
        let values = stencil.sample_nodal(&nodal);

        assert!(stencil.mask().iter().all(|inside| *inside));
        for (value, point) in values.iter().zip(grid.points()) {
            assert_abs_diff_eq!(*value, 2. * point[0] - point[1] + 0.5 * point[2], epsilon = 1e-9);
        }
    }

    #[test]
    fn cell_values_are_piecewise_constant() {
        let locator = two_hexes();
        let grid = UniformGrid::new(
            AxisSample::new(0.5, 2.5, 3),
            AxisSample::new(0.5, 0.5, 1),
            AxisSample::new(0.5, 0.5, 1),
        );
        let stencil = locator.stencil(&grid);

        let (values, mask) = stencil.sample_cells(&[Some(7.), None]);
        assert_eq!(values, vec![7., 0., 0.]);
        assert_eq!(mask, vec![true, false, false]);
    }
}
