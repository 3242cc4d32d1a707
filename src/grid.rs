//! Uniform sampling grids and the dense field values sampled on them

use ndarray::{Array3, Array4, ArrayView3, ShapeError};
use serde::{Deserialize, Serialize};

use crate::plan::AxisSample;

/// one of the three cartesian axes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Axis {
    X,
    Y,
    Z,
}

impl Axis {
    pub fn index(&self) -> usize {
        match self {
            Self::X => 0,
            Self::Y => 1,
            Self::Z => 2,
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            Self::X => "x",
            Self::Y => "y",
            Self::Z => "z",
        }
    }
}

impl std::fmt::Display for Axis {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.name())
    }
}

impl std::str::FromStr for Axis {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "x" => Ok(Self::X),
            "y" => Ok(Self::Y),
            "z" => Ok(Self::Z),
            other => Err(format!("`{}` is not an axis, expected x, y or z", other)),
        }
    }
}

/// axis aligned bounding box of a dataset
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Bounds {
    pub min: [f64; 3],
    pub max: [f64; 3],
}

impl Bounds {
    /// bounds of a set of points, all zero for an empty set
    pub fn from_points<'a>(points: impl IntoIterator<Item = &'a [f64; 3]>) -> Self {
        let mut min = [f64::INFINITY; 3];
        let mut max = [f64::NEG_INFINITY; 3];

        for point in points {
            for axis in 0..3 {
                min[axis] = min[axis].min(point[axis]);
                max[axis] = max[axis].max(point[axis]);
            }
        }

        if min[0] > max[0] {
            return Self {
                min: [0.; 3],
                max: [0.; 3],
            };
        }

        Self { min, max }
    }

    pub fn extent(&self, axis: Axis) -> f64 {
        self.max[axis.index()] - self.min[axis.index()]
    }

    /// the sample covering the full extent of an axis with `count` points
    pub fn axis_sample(&self, axis: Axis, count: usize) -> AxisSample {
        AxisSample::new(self.min[axis.index()], self.max[axis.index()], count)
    }
}

impl std::fmt::Display for Bounds {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "x=[{}, {}], y=[{}, {}], z=[{}, {}]",
            self.min[0], self.max[0], self.min[1], self.max[1], self.min[2], self.max[2]
        )
    }
}

/// A rectilinear grid with uniformly spaced samples along each axis
#[derive(Debug, Clone, PartialEq)]
pub struct UniformGrid {
    pub x: AxisSample,
    pub y: AxisSample,
    pub z: AxisSample,
}

impl UniformGrid {
    pub fn new(x: AxisSample, y: AxisSample, z: AxisSample) -> Self {
        Self { x, y, z }
    }

    pub fn axis(&self, axis: Axis) -> &AxisSample {
        match axis {
            Axis::X => &self.x,
            Axis::Y => &self.y,
            Axis::Z => &self.z,
        }
    }

    /// number of samples along x, y and z
    pub fn counts(&self) -> [usize; 3] {
        [self.x.count, self.y.count, self.z.count]
    }

    pub fn len(&self) -> usize {
        self.x.count * self.y.count * self.z.count
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// every grid point, x varying fastest, then y, then z
    pub fn points(&self) -> impl Iterator<Item = [f64; 3]> + '_ {
        let xs = self.x.coordinates();
        let ys = self.y.coordinates();
        let zs = self.z.coordinates();

        (0..self.len()).map(move |flat| {
            let i = flat % xs.len();
            let j = (flat / xs.len()) % ys.len();
            let k = flat / (xs.len() * ys.len());
            [xs[i], ys[j], zs[k]]
        })
    }
}

/// Field values sampled on a [`UniformGrid`] at one timestep
#[derive(Debug, Clone, PartialEq)]
pub struct FieldGrid {
    /// shape `(nx, ny, nz, components)`
    values: Array4<f64>,
    /// shape `(nx, ny, nz)`, `false` where the point was outside the mesh
    mask: Array3<bool>,
}

impl FieldGrid {
    /// Build from point ordered values (x fastest, components interleaved per point)
    pub fn from_point_values(
        grid: &UniformGrid,
        components: usize,
        values: Vec<f64>,
        mask: Vec<bool>,
    ) -> Result<Self, ShapeError> {
        let [nx, ny, nz] = grid.counts();

        let values = Array4::from_shape_vec((nz, ny, nx, components), values)?
            .permuted_axes([2, 1, 0, 3])
            .as_standard_layout()
            .to_owned();

        let mask = Array3::from_shape_vec((nz, ny, nx), mask)?
            .permuted_axes([2, 1, 0])
            .as_standard_layout()
            .to_owned();

        Ok(Self { values, mask })
    }

    pub fn components(&self) -> usize {
        self.values.shape()[3]
    }

    pub fn values(&self) -> &Array4<f64> {
        &self.values
    }

    pub fn mask(&self) -> &Array3<bool> {
        &self.mask
    }

    /// a single component with shape `(nx, ny, nz)`
    pub fn component(&self, component: usize) -> Option<ArrayView3<'_, f64>> {
        if component >= self.components() {
            return None;
        }

        Some(self.values.index_axis(ndarray::Axis(3), component))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn points_are_x_fastest() {
        let grid = UniformGrid::new(
            AxisSample::new(0., 1., 2),
            AxisSample::new(10., 20., 2),
            AxisSample::new(5., 5., 1),
        );

        let points: Vec<[f64; 3]> = grid.points().collect();
        assert_eq!(
            points,
            vec![
                [0., 10., 5.],
                [1., 10., 5.],
                [0., 20., 5.],
                [1., 20., 5.]
            ]
        );
    }

    #[test]
    fn field_grid_reshapes_point_order() {
        let grid = UniformGrid::new(
            AxisSample::new(0., 2., 3),
            AxisSample::new(0., 1., 2),
            AxisSample::new(0., 0., 1),
        );

        // value encodes the point index, second component is its negative
        let values: Vec<f64> = (0..6).flat_map(|p| [p as f64, -(p as f64)]).collect();
        let mask = vec![true, true, false, true, true, true];

        let field = FieldGrid::from_point_values(&grid, 2, values, mask).unwrap();

        assert_eq!(field.values().shape(), &[3, 2, 1, 2]);
        assert_eq!(field.values()[[2, 1, 0, 0]], 5.);
        assert_eq!(field.values()[[1, 1, 0, 1]], -4.);
        assert!(!field.mask()[[2, 0, 0]]);
        assert_eq!(field.component(0).unwrap()[[1, 0, 0]], 1.);
        assert!(field.component(2).is_none());
    }

    #[test]
    fn wrong_value_count_is_rejected() {
        let grid = UniformGrid::new(
            AxisSample::new(0., 1., 2),
            AxisSample::single(0.),
            AxisSample::single(0.),
        );
        assert!(FieldGrid::from_point_values(&grid, 1, vec![1.], vec![true, true]).is_err());
    }

    #[test]
    fn empty_bounds_are_zero() {
        let bounds = Bounds::from_points(std::iter::empty());
        assert_eq!(bounds.extent(Axis::X), 0.);
    }

    #[test]
    fn axis_names_parse() {
        assert_eq!("Y".parse::<Axis>(), Ok(Axis::Y));
        assert!("w".parse::<Axis>().is_err());
    }
}
