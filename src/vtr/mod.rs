//! VTK XML rectilinear grid (`.vtr`) files
//!
//! One file holds the grid coordinates and any number of named point arrays
//! for a single timestep. The per-timestep files written by the grid
//! resampler are named after their time so that a directory of them can be
//! read back in time order. Image data (`.vti`) files, whose points are given by
//! an origin and a spacing, are read into the same structure.

mod array;
mod mesh;
pub mod parse;
mod write;

pub use array::{DataArray, Numeric, Precision, Unrepresentable};
pub use mesh::{Mesh3D, Spans3D};
pub use parse::{read_and_parse, ParseError};
pub use write::{write_vtr, Encoding};

use std::path::{Path, PathBuf};

use ndarray::Array4;

use crate::grid::{FieldGrid, UniformGrid};
use crate::Error;

/// name of the point array marking which grid points were inside the mesh
pub const VALID_MASK_NAME: &str = "vtkValidPointMask";

const FILE_PREFIX: &str = "resampled_t";
const FILE_EXTENSION: &str = "vtr";
/// extensions of the grid files that can be read
const READ_EXTENSIONS: [&str; 2] = [FILE_EXTENSION, "vti"];

/// A single rectilinear grid with its point data
#[derive(Debug, Clone, PartialEq)]
pub struct VtrFile {
    pub extent: Spans3D,
    pub mesh: Mesh3D,
    pub point_data: Vec<DataArray>,
}

impl VtrFile {
    /// a file covering the whole mesh, without point data
    pub fn new(mesh: Mesh3D) -> Self {
        Self {
            extent: mesh.spans(),
            mesh,
            point_data: Vec::new(),
        }
    }

    /// A file holding one resampled field and its validity mask
    pub fn from_field(grid: &UniformGrid, name: &str, field: &FieldGrid, precision: Precision) -> Self {
        let mut file = Self::new(Mesh3D::from(grid));

        // x fastest, components interleaved
        let values = field
            .values()
            .view()
            .permuted_axes([2, 1, 0, 3])
            .iter()
            .copied()
            .collect();

        let mask = field
            .mask()
            .view()
            .permuted_axes([2, 1, 0])
            .iter()
            .map(|inside| if *inside { 1. } else { 0. })
            .collect();

        file.push_array(DataArray::new(name, field.components(), precision, values));
        file.push_array(DataArray::new(VALID_MASK_NAME, 1, Precision::UInt8, mask));
        file
    }

    /// add or replace a point array
    pub fn push_array(&mut self, array: DataArray) {
        match self.point_data.iter_mut().find(|a| a.name == array.name) {
            Some(existing) => *existing = array,
            None => self.point_data.push(array),
        }
    }

    pub fn array(&self, name: &str) -> Option<&DataArray> {
        self.point_data.iter().find(|array| array.name == name)
    }

    pub fn array_names(&self) -> impl Iterator<Item = &str> {
        self.point_data.iter().map(|array| array.name.as_str())
    }

    /// number of points along x, y and z
    pub fn dimensions(&self) -> [usize; 3] {
        [self.extent.x_len(), self.extent.y_len(), self.extent.z_len()]
    }

    /// Values of a point array with shape `(nx, ny, nz, components)`
    pub fn array_grid(&self, name: &str) -> Option<Result<Array4<f64>, ndarray::ShapeError>> {
        let array = self.array(name)?;
        let [nx, ny, nz] = self.dimensions();

        let grid = Array4::from_shape_vec((nz, ny, nx, array.components), array.values.clone()).map(|values| {
            values
                .permuted_axes([2, 1, 0, 3])
                .as_standard_layout()
                .into_owned()
        });

        Some(grid)
    }

    pub fn read(path: &Path) -> Result<Self, Error> {
        read_and_parse(path)
    }

    pub fn to_bytes(&self, encoding: Encoding) -> Result<Vec<u8>, Error> {
        let mut output = Vec::new();
        write_vtr(&mut output, self, encoding)?;
        Ok(output)
    }

    /// Write the file to `path`, which is only created once the whole document is encoded
    pub fn write(&self, path: &Path, encoding: Encoding) -> Result<(), Error> {
        let bytes = self.to_bytes(encoding)?;

        std::fs::write(path, bytes).map_err(|source| Error::OutputWrite {
            path: path.to_path_buf(),
            source,
        })?;

        log::debug!("wrote {}", path.display());
        Ok(())
    }
}

/// `resampled_t<round(time * 1e9)>.vtr`, zero padded to nine digits
pub fn grid_file_name(time: f64) -> String {
    let nanos = (time * 1e9).round() as i64;
    format!("{FILE_PREFIX}{nanos:09}.{FILE_EXTENSION}")
}

/// the time encoded in a name produced by [`grid_file_name`], with either grid extension
pub fn time_from_file_name(name: &str) -> Option<f64> {
    let (stem, extension) = name.strip_prefix(FILE_PREFIX)?.rsplit_once('.')?;
    if !READ_EXTENSIONS.contains(&extension) {
        return None;
    }

    stem.parse::<i64>().ok().map(|nanos| nanos as f64 / 1e9)
}

/// Every grid file in `dir` with its time, sorted by time. Files whose
/// name does not carry a time are sorted by name after the timed ones.
pub fn grid_files(dir: &Path) -> Result<Vec<(Option<f64>, PathBuf)>, Error> {
    let mut files = Vec::new();

    for entry in std::fs::read_dir(dir)? {
        let path = entry?.path();

        match path.extension().and_then(|ext| ext.to_str()) {
            Some(ext) if READ_EXTENSIONS.contains(&ext) => (),
            _ => continue,
        }

        let time = path
            .file_name()
            .and_then(|name| name.to_str())
            .and_then(time_from_file_name);

        files.push((time, path));
    }

    files.sort_by(|(ta, pa), (tb, pb)| match (ta, tb) {
        (Some(a), Some(b)) => a.total_cmp(b).then_with(|| pa.cmp(pb)),
        (Some(_), None) => std::cmp::Ordering::Less,
        (None, Some(_)) => std::cmp::Ordering::Greater,
        (None, None) => pa.cmp(pb),
    });

    Ok(files)
}
