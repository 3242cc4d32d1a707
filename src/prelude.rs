//! Common traits and types that are useful for resampling a dataset
//!
//! ```
//! use exodus_resample::prelude::*;
//! ```

pub use crate::traits::{Association, DataSource, FieldInfo};

pub use crate::aggregate::{PlaneAggregate, VolumeAggregate};
pub use crate::config::{AggregateConfig, GridConfig, ResampleConfig};
pub use crate::exodus::ExodusFile;
pub use crate::grid::{Axis, Bounds, FieldGrid, UniformGrid};
pub use crate::mat::{MatArray, MatData, MatFile};
pub use crate::plan::{AxisSample, PlanePlan, SpacingMode, SpatialRanges, TimeRequest, VolumePlan};
pub use crate::vtr::{DataArray, Encoding, Precision, VtrFile};
pub use crate::Error;
