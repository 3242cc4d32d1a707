//! MATLAB level 5 MAT files
//!
//! Only the subset needed to exchange dense numeric arrays is covered: real
//! `double` matrices of any rank and `logical` masks, optionally zlib
//! compressed. Files are written little endian. One dimensional arrays are
//! stored as `1 x n` row vectors and scalars as `1 x 1` matrices, which is how
//! MATLAB itself represents them.
//!
//! Only writing is implemented. The tests read the files back with the
//! `matfile` crate.

mod error;
mod write;

pub use error::MatError;

use ndarray::{ArrayBase, ArrayD, Data, Dimension, IxDyn, ShapeBuilder};

/// longest variable name MATLAB accepts
pub const MAX_NAME_LEN: usize = 63;

pub(crate) const MI_INT8: u32 = 1;
pub(crate) const MI_UINT8: u32 = 2;
pub(crate) const MI_INT32: u32 = 5;
pub(crate) const MI_UINT32: u32 = 6;
pub(crate) const MI_DOUBLE: u32 = 9;
pub(crate) const MI_MATRIX: u32 = 14;
pub(crate) const MI_COMPRESSED: u32 = 15;

pub(crate) const MX_DOUBLE_CLASS: u8 = 6;
pub(crate) const MX_UINT8_CLASS: u8 = 9;

pub(crate) const FLAG_LOGICAL: u32 = 0x0200;

/// values of an array in column major (MATLAB) order
#[derive(Debug, Clone, PartialEq)]
pub enum MatData {
    Double(Vec<f64>),
    Logical(Vec<bool>),
}

impl MatData {
    pub fn len(&self) -> usize {
        match self {
            Self::Double(values) => values.len(),
            Self::Logical(values) => values.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// a dense MATLAB array
#[derive(Debug, Clone, PartialEq)]
pub struct MatArray {
    pub dims: Vec<usize>,
    pub data: MatData,
}

impl MatArray {
    /// Values as an `f64` array in the usual row major memory layout. Logical
    /// arrays become zeros and ones.
    pub fn to_ndarray(&self) -> Result<ArrayD<f64>, ndarray::ShapeError> {
        let values = match &self.data {
            MatData::Double(values) => values.clone(),
            MatData::Logical(values) => values.iter().map(|v| if *v { 1. } else { 0. }).collect(),
        };

        let array = ArrayD::from_shape_vec(IxDyn(&self.dims).f(), values)?;
        Ok(array.as_standard_layout().into_owned())
    }

    pub fn as_doubles(&self) -> Option<&[f64]> {
        match &self.data {
            MatData::Double(values) => Some(values),
            MatData::Logical(_) => None,
        }
    }

    pub fn as_logical(&self) -> Option<&[bool]> {
        match &self.data {
            MatData::Logical(values) => Some(values),
            MatData::Double(_) => None,
        }
    }

    /// the single value of a `1 x 1` double array
    pub fn scalar(&self) -> Option<f64> {
        match self.as_doubles() {
            Some([value]) => Some(*value),
            _ => None,
        }
    }
}

/// A set of named arrays, kept in insertion order
#[derive(Debug, Clone, PartialEq)]
pub struct MatFile {
    description: String,
    variables: Vec<(String, MatArray)>,
}

impl Default for MatFile {
    fn default() -> Self {
        Self::new()
    }
}

impl MatFile {
    pub fn new() -> Self {
        Self {
            description: format!(
                "MATLAB 5.0 MAT-file, Platform: {}, Created by: {} {}",
                std::env::consts::OS,
                env!("CARGO_PKG_NAME"),
                env!("CARGO_PKG_VERSION")
            ),
            variables: Vec::new(),
        }
    }

    /// text of the 116 byte descriptive header
    pub fn description(&self) -> &str {
        &self.description
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.variables.iter().map(|(name, _)| name.as_str())
    }

    pub fn get(&self, name: &str) -> Option<&MatArray> {
        self.variables
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, array)| array)
    }

    pub fn len(&self) -> usize {
        self.variables.len()
    }

    pub fn is_empty(&self) -> bool {
        self.variables.is_empty()
    }

    /// add or replace a variable
    pub fn insert(&mut self, name: &str, array: MatArray) -> Result<(), MatError> {
        validate_name(name)?;

        let expected: usize = array.dims.iter().product();
        if array.dims.len() < 2 || expected != array.data.len() {
            return Err(MatError::DimsMismatch {
                name: name.to_string(),
                dims: array.dims,
                values: array.data.len(),
                expected,
            });
        }

        match self.variables.iter_mut().find(|(n, _)| n == name) {
            Some((_, existing)) => *existing = array,
            None => self.variables.push((name.to_string(), array)),
        }

        Ok(())
    }

    /// add a double array of any rank
    pub fn insert_array<S, D>(&mut self, name: &str, array: &ArrayBase<S, D>) -> Result<(), MatError>
    where
        S: Data<Elem = f64>,
        D: Dimension,
    {
        let values = array.t().iter().copied().collect();
        self.insert(
            name,
            MatArray {
                dims: matlab_dims(array.shape()),
                data: MatData::Double(values),
            },
        )
    }

    /// add a logical (boolean) array of any rank
    pub fn insert_logical<S, D>(&mut self, name: &str, array: &ArrayBase<S, D>) -> Result<(), MatError>
    where
        S: Data<Elem = bool>,
        D: Dimension,
    {
        let values = array.t().iter().copied().collect();
        self.insert(
            name,
            MatArray {
                dims: matlab_dims(array.shape()),
                data: MatData::Logical(values),
            },
        )
    }

    /// add a `1 x n` row vector
    pub fn insert_row_vector(&mut self, name: &str, values: &[f64]) -> Result<(), MatError> {
        self.insert(
            name,
            MatArray {
                dims: vec![1, values.len()],
                data: MatData::Double(values.to_vec()),
            },
        )
    }

    pub fn insert_scalar(&mut self, name: &str, value: f64) -> Result<(), MatError> {
        self.insert(
            name,
            MatArray {
                dims: vec![1, 1],
                data: MatData::Double(vec![value]),
            },
        )
    }
}

/// MATLAB arrays have at least two dimensions
fn matlab_dims(shape: &[usize]) -> Vec<usize> {
    match shape.len() {
        0 => vec![1, 1],
        1 => vec![1, shape[0]],
        _ => shape.to_vec(),
    }
}

/// a letter followed by letters, digits or underscores, at most 63 characters
pub fn validate_name(name: &str) -> Result<(), MatError> {
    let mut chars = name.chars();
    let starts_with_letter = chars.next().map_or(false, |c| c.is_ascii_alphabetic());

    if starts_with_letter
        && name.len() <= MAX_NAME_LEN
        && chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
    {
        Ok(())
    } else {
        Err(MatError::InvalidName(name.to_string()))
    }
}

/// Read a written file back through the `matfile` crate. Double arrays stay
/// double and `uint8` arrays are taken as logical masks.
#[cfg(test)]
pub(crate) fn read_back(path: &std::path::Path) -> MatFile {
    let file = std::fs::File::open(path).unwrap();
    let parsed = matfile::MatFile::parse(file).unwrap();

    let mut mat = MatFile::new();
    for array in parsed.arrays() {
        let data = match array.data() {
            matfile::NumericData::Double { real, .. } => MatData::Double(real.clone()),
            matfile::NumericData::UInt8 { real, .. } => {
                MatData::Logical(real.iter().map(|v| *v != 0).collect())
            }
            _ => panic!("`{}` is neither double nor logical", array.name()),
        };

        let dims = array.size().to_vec();
        mat.insert(array.name(), MatArray { dims, data }).unwrap();
    }
    mat
}
