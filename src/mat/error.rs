use std::path::PathBuf;

/// Failure while encoding or storing a MAT file
#[derive(Debug, thiserror::Error)]
pub enum MatError {
    #[error("An io error occured while writing MAT data: `{0}`")]
    Io(#[from] std::io::Error),
    #[error("could not write MAT file `{path}`: {source}")]
    Write {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("`{0}` is not a valid MATLAB variable name")]
    InvalidName(String),
    #[error("array `{name}` has {values} values, but its dimensions {dims:?} hold {expected}")]
    DimsMismatch {
        name: String,
        dims: Vec<usize>,
        values: usize,
        expected: usize,
    },
    #[error("element of {0} bytes does not fit in a 32 bit MAT tag")]
    ElementTooLarge(usize),
    #[error("array `{name}` has a dimension of {dim}, larger than MAT files can store")]
    DimensionTooLarge { name: String, dim: usize },
}
