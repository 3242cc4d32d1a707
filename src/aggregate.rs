//! Stacking per-timestep field grids into one array
//!
//! An aggregate is allocated once with its final shape and filled slice by
//! slice. A timestep whose field could not be sampled keeps its zero initialised
//! slice and is flagged in the `valid` vector, so the shape always matches the
//! coordinate vectors and the selected times.

use ndarray::{s, Array3, Array5, ArrayView4, Axis as NdAxis};

use crate::grid::{Axis, FieldGrid};
use crate::plan::{AxisRoles, PlanePlan};
use crate::traits::DataSource;
use crate::Error;

#[derive(Debug, thiserror::Error, PartialEq)]
pub enum AggregateError {
    #[error("timestep slot {step} is out of range for {steps} timesteps")]
    StepOutOfRange { step: usize, steps: usize },
    #[error("component {component} requested, but the field has {components} components")]
    ComponentOutOfRange { component: usize, components: usize },
    #[error("grid of shape {found:?} does not fit an aggregate slice of shape {expected:?}")]
    ShapeMismatch {
        found: Vec<usize>,
        expected: Vec<usize>,
    },
}

/// One component of a field on a plane, stacked over time
#[derive(Debug, Clone, PartialEq)]
pub struct PlaneAggregate {
    /// shape `(n_depth, nx, nt)`
    values: Array3<f64>,
    /// shape `(n_depth, nx, nt)`, `false` where a point was outside the mesh or the slice failed
    mask: Array3<bool>,
    /// one entry per timestep
    valid: Vec<bool>,
}

impl PlaneAggregate {
    pub fn new(n_depth: usize, nx: usize, nt: usize) -> Self {
        Self {
            values: Array3::zeros((n_depth, nx, nt)),
            mask: Array3::from_elem((n_depth, nx, nt), false),
            valid: vec![false; nt],
        }
    }

    /// Resample `field` at every selected timestep of `plan` and stack the results.
    ///
    /// Timesteps where the source cannot provide the field are logged together
    /// with the fields it does have and left at zero. Other errors abort.
    pub fn collect<S: DataSource>(
        source: &mut S,
        plan: &PlanePlan,
        field: &str,
        component: usize,
    ) -> Result<Self, Error> {
        if let Some(info) = source.field(field) {
            if component >= info.components {
                return Err(AggregateError::ComponentOutOfRange {
                    component,
                    components: info.components,
                }
                .into());
            }
        }

        let nt = plan.times.len();
        let mut aggregate = Self::new(plan.depth.count, plan.x.count, nt);

        for (step, time) in plan.times.times.iter().enumerate() {
            log::info!("processing timestep {}/{}: t={}", step + 1, nt, time);

            match source.resample(field, *time, &plan.grid) {
                Ok(grid) => aggregate.insert(step, &grid, plan.roles, component)?,
                Err(Error::FieldNotFound { available, .. }) => {
                    log::warn!("field `{}` not found at timestep {}", field, time);
                    for name in available {
                        log::warn!("    available: {}", name);
                    }
                }
                Err(other) => return Err(other),
            }
        }

        Ok(aggregate)
    }

    /// copy one component of a plane shaped field grid into timestep slot `step`
    pub fn insert(
        &mut self,
        step: usize,
        grid: &FieldGrid,
        roles: AxisRoles,
        component: usize,
    ) -> Result<(), AggregateError> {
        let steps = self.valid.len();
        if step >= steps {
            return Err(AggregateError::StepOutOfRange { step, steps });
        }

        let values = grid
            .component(component)
            .ok_or(AggregateError::ComponentOutOfRange {
                component,
                components: grid.components(),
            })?;

        let (n_depth, nx, _) = self.values.dim();
        let flat = NdAxis(roles.flat.index());
        let shape = values.shape().to_vec();

        if shape[roles.flat.index()] != 1
            || shape[Axis::X.index()] != nx
            || shape[roles.depth.index()] != n_depth
        {
            let mut expected = vec![nx, 0, 0];
            expected[roles.flat.index()] = 1;
            expected[roles.depth.index()] = n_depth;
            return Err(AggregateError::ShapeMismatch {
                found: shape,
                expected,
            });
        }

        // (nx, n_depth) after dropping the flat axis, transposed to (n_depth, nx)
        let plane = values.index_axis(flat, 0);
        let mask = grid.mask().index_axis(flat, 0);

        self.values.slice_mut(s![.., .., step]).assign(&plane.t());
        self.mask.slice_mut(s![.., .., step]).assign(&mask.t());
        self.valid[step] = true;

        Ok(())
    }

    pub fn values(&self) -> &Array3<f64> {
        &self.values
    }

    pub fn mask(&self) -> &Array3<bool> {
        &self.mask
    }

    pub fn valid(&self) -> &[bool] {
        &self.valid
    }

    pub fn shape(&self) -> (usize, usize, usize) {
        self.values.dim()
    }
}

/// Every component of a field on a three dimensional grid, stacked over time
#[derive(Debug, Clone, PartialEq)]
pub struct VolumeAggregate {
    /// shape `(nt, nx, ny, nz, components)`
    values: Array5<f64>,
    valid: Vec<bool>,
}

impl VolumeAggregate {
    pub fn new(nt: usize, counts: [usize; 3], components: usize) -> Self {
        let [nx, ny, nz] = counts;
        Self {
            values: Array5::zeros((nt, nx, ny, nz, components)),
            valid: vec![false; nt],
        }
    }

    /// copy a `(nx, ny, nz, components)` grid into timestep slot `step`
    pub fn insert(&mut self, step: usize, grid: ArrayView4<f64>) -> Result<(), AggregateError> {
        let steps = self.valid.len();
        if step >= steps {
            return Err(AggregateError::StepOutOfRange { step, steps });
        }

        let expected = self.values.shape()[1..].to_vec();
        if grid.shape() != expected.as_slice() {
            return Err(AggregateError::ShapeMismatch {
                found: grid.shape().to_vec(),
                expected,
            });
        }

        self.values.index_axis_mut(NdAxis(0), step).assign(&grid);
        self.valid[step] = true;
        Ok(())
    }

    pub fn values(&self) -> &Array5<f64> {
        &self.values
    }

    pub fn valid(&self) -> &[bool] {
        &self.valid
    }

    /// the values reordered to `(nx, ny, nz, nt, components)`
    pub fn spatial_major(&self) -> Array5<f64> {
        self.values
            .view()
            .permuted_axes([1, 2, 3, 0, 4])
            .as_standard_layout()
            .into_owned()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::grid::UniformGrid;
    use crate::plan::AxisSample;
    use ndarray::Array4;

    fn xz_grid() -> UniformGrid {
        UniformGrid::new(
            AxisSample::new(0., 1., 3),
            AxisSample::single(0.),
            AxisSample::new(0., 1., 2),
        )
    }

    fn roles(depth: Axis) -> AxisRoles {
        AxisRoles {
            depth,
            flat: if depth == Axis::Z { Axis::Y } else { Axis::Z },
        }
    }

    #[test]
    fn plane_slices_are_depth_by_x() {
        let grid = xz_grid();
        // value = 10 * k + i for point (i, 0, k)
        let values: Vec<f64> = grid.points().map(|p| 10. * p[2] + 2. * p[0]).collect();
        let mask = vec![true, true, true, true, false, true];
        let field = FieldGrid::from_point_values(&grid, 1, values, mask).unwrap();

        let mut aggregate = PlaneAggregate::new(2, 3, 2);
        aggregate.insert(1, &field, roles(Axis::Z), 0).unwrap();

        assert_eq!(aggregate.shape(), (2, 3, 2));
        assert_eq!(aggregate.values()[[1, 2, 1]], 12.);
        assert_eq!(aggregate.values()[[0, 1, 1]], 1.);
        assert!(!aggregate.mask()[[1, 1, 1]]);
        assert_eq!(aggregate.valid(), &[false, true]);

        // the untouched slice stays zero
        assert!(aggregate.values().slice(s![.., .., 0]).iter().all(|v| *v == 0.));
    }

    #[test]
    fn plane_shape_mismatch_is_rejected() {
        let field = FieldGrid::from_point_values(&xz_grid(), 1, vec![0.; 6], vec![true; 6]).unwrap();
        let mut aggregate = PlaneAggregate::new(2, 3, 1);

        assert!(matches!(
            aggregate.insert(0, &field, roles(Axis::Y), 0),
            Err(AggregateError::ShapeMismatch { .. })
        ));
        assert_eq!(
            aggregate.insert(3, &field, roles(Axis::Z), 0),
            Err(AggregateError::StepOutOfRange { step: 3, steps: 1 })
        );
        assert!(matches!(
            aggregate.insert(0, &field, roles(Axis::Z), 1),
            Err(AggregateError::ComponentOutOfRange { .. })
        ));
    }

    #[test]
    fn volume_reorders_time_axis() {
        let mut aggregate = VolumeAggregate::new(2, [2, 1, 1], 3);
        let grid = Array4::from_shape_fn((2, 1, 1, 3), |(i, _, _, c)| (i * 3 + c) as f64);

        aggregate.insert(1, grid.view()).unwrap();
        assert_eq!(aggregate.valid(), &[false, true]);

        let reordered = aggregate.spatial_major();
        assert_eq!(reordered.shape(), &[2, 1, 1, 2, 3]);
        assert_eq!(reordered[[1, 0, 0, 1, 2]], 5.);
        assert_eq!(reordered[[1, 0, 0, 0, 2]], 0.);

        let wrong = Array4::zeros((1, 1, 1, 3));
        assert!(aggregate.insert(0, wrong.view()).is_err());
    }
}
