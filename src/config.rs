//! Run configuration for the resampling tools
//!
//! Every field has a default, so a YAML file only needs to name what differs:
//!
//! ```yaml
//! source_path: ./run.e
//! field_name: disp_y
//! time_ranges_or_all: !range { start: 0.0, end: 0.01, count: 11 }
//! ```

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::grid::{Axis, Bounds};
use crate::plan::{AxisRoles, AxisSample, PlanError, SpacingMode, SpatialRanges, TimeRequest};
use crate::vtr::{Encoding, Precision};
use crate::Error;

/// Settings for sampling one field on a plane over time (`exodus-to-mat`)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResampleConfig {
    #[serde(default)]
    pub source_path: PathBuf,

    #[serde(default = "default_plane_field")]
    pub field_name: String,

    /// component kept when the field has more than one
    #[serde(default)]
    pub component: usize,

    /// `x` and the depth axis (`z` unless `depth_axis` is `y`) are sampled
    #[serde(default = "default_plane_ranges")]
    pub spatial_ranges: SpatialRanges,

    #[serde(default = "default_plane_times")]
    pub time_ranges_or_all: TimeRequest,

    /// which of y and z is the out-of-plane axis, decided from the mesh extent when unset
    #[serde(default)]
    pub depth_axis: Option<Axis>,

    #[serde(default)]
    pub compress: bool,

    /// output file, `<input dir>/<input stem>_<field>.mat` when unset
    #[serde(default)]
    pub output: Option<PathBuf>,
}

fn default_plane_field() -> String {
    "disp_z".to_string()
}

fn default_plane_ranges() -> SpatialRanges {
    SpatialRanges {
        x: Some(AxisSample::new(-0.02, 0.02, 401)),
        y: None,
        z: Some(AxisSample::new(0.015, 0.035, 201)),
    }
}

fn default_plane_times() -> TimeRequest {
    TimeRequest::Range(AxisSample::new(0., 0.006, 25))
}

impl Default for ResampleConfig {
    fn default() -> Self {
        Self {
            source_path: PathBuf::new(),
            field_name: default_plane_field(),
            component: 0,
            spatial_ranges: default_plane_ranges(),
            time_ranges_or_all: default_plane_times(),
            depth_axis: None,
            compress: false,
            output: None,
        }
    }
}

impl ResampleConfig {
    pub fn from_yaml<P: AsRef<Path>>(path: P) -> Result<Self, Error> {
        read_yaml(path.as_ref())
    }

    /// The x range and the depth range for a mesh with `bounds`.
    ///
    /// The depth range is looked up under the depth axis and falls back to the
    /// range given for the other of y and z, so a config written for an x/z plane
    /// also works on a mesh whose depth runs along y.
    pub fn plane_samples(&self, bounds: &Bounds) -> Result<(AxisSample, AxisSample), PlanError> {
        let x = *self.spatial_ranges.get(Axis::X).ok_or(PlanError::MissingRange(Axis::X))?;

        let roles = AxisRoles::resolve(bounds, self.depth_axis)?;
        let depth = self
            .spatial_ranges
            .get(roles.depth)
            .or_else(|| self.spatial_ranges.get(roles.flat))
            .copied()
            .ok_or(PlanError::MissingRange(roles.depth))?;

        Ok((x, depth))
    }

    pub fn output_path(&self) -> PathBuf {
        match &self.output {
            Some(path) => path.clone(),
            None => sibling_path(&self.source_path, &format!("_{}.mat", self.field_name)),
        }
    }
}

/// Settings for sampling a field on a 3D grid, one file per timestep (`exodus-to-vtr`)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GridConfig {
    #[serde(default)]
    pub source_path: PathBuf,

    #[serde(default = "default_grid_field")]
    pub field_name: String,

    /// limits of the grid, the mesh bounds are used for missing axes
    #[serde(default)]
    pub spatial_ranges: SpatialRanges,

    #[serde(default = "default_spacing_mode")]
    pub spacing_mode: SpacingMode,

    #[serde(default = "default_grid_times")]
    pub time_ranges_or_all: TimeRequest,

    #[serde(default)]
    pub encoding: Encoding,

    #[serde(default)]
    pub precision: Precision,

    /// output directory, `<input dir>/<input stem>_resampled` when unset
    #[serde(default)]
    pub output: Option<PathBuf>,
}

fn default_grid_field() -> String {
    "vel".to_string()
}

fn default_spacing_mode() -> SpacingMode {
    SpacingMode::Counts {
        nx: 200,
        ny: 200,
        nz: 1,
    }
}

fn default_grid_times() -> TimeRequest {
    TimeRequest::All
}

impl Default for GridConfig {
    fn default() -> Self {
        Self {
            source_path: PathBuf::new(),
            field_name: default_grid_field(),
            spatial_ranges: SpatialRanges::default(),
            spacing_mode: default_spacing_mode(),
            time_ranges_or_all: default_grid_times(),
            encoding: Encoding::default(),
            precision: Precision::default(),
            output: None,
        }
    }
}

impl GridConfig {
    pub fn from_yaml<P: AsRef<Path>>(path: P) -> Result<Self, Error> {
        read_yaml(path.as_ref())
    }

    pub fn output_dir(&self) -> PathBuf {
        match &self.output {
            Some(path) => path.clone(),
            None => sibling_path(&self.source_path, "_resampled"),
        }
    }
}

/// Settings for stacking a directory of grid files into one MAT file (`vtr-to-mat`)
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AggregateConfig {
    /// directory holding the grid files
    #[serde(default)]
    pub source_path: PathBuf,

    /// array to stack, the first one whose name contains `vel` when unset
    #[serde(default)]
    pub field_name: Option<String>,

    #[serde(default)]
    pub compress: bool,

    /// output file, `<parent>/<dir name>_<field>.mat` when unset
    #[serde(default)]
    pub output: Option<PathBuf>,
}

impl AggregateConfig {
    pub fn from_yaml<P: AsRef<Path>>(path: P) -> Result<Self, Error> {
        read_yaml(path.as_ref())
    }

    pub fn output_path(&self, field: &str) -> PathBuf {
        match &self.output {
            Some(path) => path.clone(),
            None => sibling_path(&self.source_path, &format!("_{}.mat", field)),
        }
    }
}

fn read_yaml<T: serde::de::DeserializeOwned>(path: &Path) -> Result<T, Error> {
    if !path.exists() {
        return Err(Error::InputNotFound(path.to_path_buf()));
    }

    let content = std::fs::read_to_string(path)?;
    Ok(serde_yaml::from_str(&content)?)
}

/// `<dir of path>/<stem of path><suffix>`
fn sibling_path(path: &Path, suffix: &str) -> PathBuf {
    let stem = path
        .file_stem()
        .map(|stem| stem.to_string_lossy().into_owned())
        .unwrap_or_default();

    let dir = path.parent().unwrap_or_else(|| Path::new(""));
    dir.join(format!("{}{}", stem, suffix))
}
