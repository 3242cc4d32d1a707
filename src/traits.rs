//! # Traits
//!
//! The resampling pipeline only talks to a mesh through [`DataSource`]. The Exodus
//! reader in [`crate::exodus`] is the implementation shipped with the crate, but
//! anything that can report its extent, fields and timesteps and sample a field on
//! a [`UniformGrid`] can be plugged into [`crate::pipeline`].

use std::path::Path;

use crate::grid::{Bounds, FieldGrid, UniformGrid};
use crate::Error;

/// where the values of a field live on the mesh
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Association {
    /// nodal values, interpolated inside each element
    Point,
    /// one value per element, constant over the element
    Cell,
}

impl std::fmt::Display for Association {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Point => write!(f, "point"),
            Self::Cell => write!(f, "cell"),
        }
    }
}

/// a named field available in a dataset
#[derive(Debug, Clone, PartialEq)]
pub struct FieldInfo {
    pub name: String,
    pub components: usize,
    pub association: Association,
}

/// A mesh with time dependent fields that can be sampled on a uniform grid
pub trait DataSource {
    /// open a dataset by path
    fn open(path: &Path) -> Result<Self, Error>
    where
        Self: Sized;

    /// axis aligned bounds of the mesh
    fn bounds(&self) -> Bounds;

    fn fields(&self) -> &[FieldInfo];

    /// the discrete times stored in the dataset, in file order
    fn times(&self) -> &[f64];

    /// Sample `field` at `time` on every point of `grid`.
    ///
    /// A field that does not exist at `time` is reported with
    /// [`Error::FieldNotFound`] so that callers can skip the timestep.
    fn resample(&mut self, field: &str, time: f64, grid: &UniformGrid) -> Result<FieldGrid, Error>;

    fn field(&self, name: &str) -> Option<&FieldInfo> {
        self.fields().iter().find(|field| field.name == name)
    }

    fn field_names(&self) -> Vec<String> {
        self.fields().iter().map(|field| field.name.clone()).collect()
    }
}
