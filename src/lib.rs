#![doc = include_str!("../README.md")]

pub mod aggregate;
pub mod cli;
pub mod config;
pub mod exodus;
pub mod grid;
pub mod locate;
pub mod mat;
pub mod pipeline;
pub mod plan;
pub mod prelude;
mod traits;
pub mod vtr;

pub use traits::{Association, DataSource, FieldInfo};

pub use aggregate::{PlaneAggregate, VolumeAggregate};
pub use config::{AggregateConfig, GridConfig, ResampleConfig};
pub use exodus::ExodusFile;
pub use grid::{Axis, Bounds, FieldGrid, UniformGrid};
pub use mat::MatFile;
pub use plan::{AxisSample, PlanePlan, SpacingMode, TimeRequest, VolumePlan};
pub use vtr::VtrFile;

pub use ndarray;

use std::path::PathBuf;

/// general purpose error enumeration for possible causes of failure.
#[derive(thiserror::Error, Debug)]
pub enum Error {
    #[error("An io error occured: `{0}`")]
    Io(#[from] std::io::Error),
    #[error("input file `{0}` does not exist")]
    InputNotFound(PathBuf),
    #[error("could not write `{path}`: {source}")]
    OutputWrite {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("field `{field}` is not available at t={time}")]
    FieldNotFound {
        field: String,
        time: f64,
        available: Vec<String>,
    },
    #[error("no grid files found in `{0}`")]
    NoGridFiles(PathBuf),
    #[error("no array matching `{name}` in `{path}`, available arrays: {available:?}")]
    ArrayNotFound {
        name: String,
        path: PathBuf,
        available: Vec<String>,
    },
    #[error("Error while reading Exodus data: {0}")]
    Exodus(#[from] exodus::ExodusError),
    #[error("Invalid sampling plan: {0}")]
    Plan(#[from] plan::PlanError),
    #[error("{0}")]
    Aggregate(#[from] aggregate::AggregateError),
    #[error("{0}")]
    Mat(#[from] mat::MatError),
    #[error("Error while parsing VTK xml: {0}")]
    Parse(#[from] vtr::ParseError),
    #[error("array `{array}` cannot be written: {source}")]
    Unrepresentable {
        array: String,
        source: vtr::Unrepresentable,
    },
    #[error("Could not write XML data to file: `{0}`")]
    XmlWrite(#[from] quick_xml::Error),
    #[error("array has an unexpected shape: {0}")]
    Shape(#[from] ndarray::ShapeError),
    #[error("Could not read the configuration file: {0}")]
    Config(#[from] serde_yaml::Error),
}
