//! Sampling plans: coordinate vectors along each axis and the timesteps to read

use ndarray::Array1;
use serde::{Deserialize, Serialize};

use crate::grid::{Axis, Bounds, UniformGrid};

/// absolute time tolerance used when the requested time spacing is zero
const TIME_EPSILON: f64 = 1e-9;

/// relative difference below which two extents are considered equal
const AMBIGUOUS_EXTENT: f64 = 1e-6;

#[derive(Debug, thiserror::Error, PartialEq)]
pub enum PlanError {
    #[error("sample count along {0} must be at least 1")]
    EmptyAxis(String),
    #[error("sample range along {axis} is not finite: [{start}, {end}]")]
    NonFiniteRange { axis: String, start: f64, end: f64 },
    #[error("sample range along {axis} runs backwards: start {start} is after end {end}")]
    DescendingRange { axis: String, start: f64, end: f64 },
    #[error("grid spacing along {axis} must be positive and finite, got {spacing}")]
    InvalidSpacing { axis: Axis, spacing: f64 },
    #[error("no sample range given for the {0} axis")]
    MissingRange(Axis),
    #[error(
        "cannot tell which axis is out of plane: y extent {y_extent} and z extent {z_extent} are equal. \
         Set `depth_axis` to y or z"
    )]
    AmbiguousAxes { y_extent: f64, z_extent: f64 },
    #[error("the depth axis must be y or z, got {0}")]
    InvalidDepthAxis(Axis),
}

/// `count` samples spaced linearly from `start` to `end` inclusive
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct AxisSample {
    pub start: f64,
    pub end: f64,
    pub count: usize,
}

impl AxisSample {
    pub fn new(start: f64, end: f64, count: usize) -> Self {
        Self { start, end, count }
    }

    /// a single sample at `value`
    pub fn single(value: f64) -> Self {
        Self::new(value, value, 1)
    }

    /// Cover `[min, max]` with a sample every `spacing`. The count is
    /// `round((max - min) / spacing) + 1` and the samples are then spread evenly
    /// over the range, so the realised spacing can differ slightly.
    pub fn from_spacing(axis: Axis, min: f64, max: f64, spacing: f64) -> Result<Self, PlanError> {
        if !(spacing > 0.) || !spacing.is_finite() {
            return Err(PlanError::InvalidSpacing { axis, spacing });
        }

        let extent = max - min;
        if extent <= 0. {
            return Ok(Self::single(min));
        }

        let count = (extent / spacing).round() as usize + 1;
        Ok(Self::new(min, max, count))
    }

    pub(crate) fn validate(&self, axis: &str) -> Result<(), PlanError> {
        if self.count == 0 {
            return Err(PlanError::EmptyAxis(axis.to_string()));
        }

        if !self.start.is_finite() || !self.end.is_finite() {
            return Err(PlanError::NonFiniteRange {
                axis: axis.to_string(),
                start: self.start,
                end: self.end,
            });
        }

        if self.start > self.end {
            return Err(PlanError::DescendingRange {
                axis: axis.to_string(),
                start: self.start,
                end: self.end,
            });
        }

        Ok(())
    }

    /// distance between neighbouring samples, zero for a single sample
    pub fn spacing(&self) -> f64 {
        if self.count > 1 {
            (self.end - self.start) / (self.count - 1) as f64
        } else {
            0.
        }
    }

    pub fn coordinate(&self, index: usize) -> f64 {
        if self.count <= 1 || index == 0 {
            self.start
        } else if index == self.count - 1 {
            self.end
        } else {
            self.start + index as f64 * self.spacing()
        }
    }

    pub fn coordinates(&self) -> Array1<f64> {
        (0..self.count).map(|i| self.coordinate(i)).collect()
    }
}

/// `start,end,count`, as given on the command line
impl std::str::FromStr for AxisSample {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let parts: Vec<&str> = s.split(',').map(str::trim).collect();

        let [start, end, count] = parts.as_slice() else {
            return Err(format!("`{}` is not of the form start,end,count", s));
        };

        let number = |part: &str| {
            part.parse::<f64>()
                .map_err(|e| format!("`{}` is not a number: {}", part, e))
        };

        let count = count
            .parse::<usize>()
            .map_err(|e| format!("`{}` is not a sample count: {}", count, e))?;

        Ok(Self::new(number(*start)?, number(*end)?, count))
    }
}

/// which timesteps of a dataset to resample
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TimeRequest {
    /// every timestep in the file
    All,
    /// the timesteps closest to evenly spaced requested times
    Range(AxisSample),
}

/// `all` or `start,end,count`
impl std::str::FromStr for TimeRequest {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s.trim().eq_ignore_ascii_case("all") {
            Ok(Self::All)
        } else {
            s.parse().map(Self::Range)
        }
    }
}

/// a requested time with no timestep within tolerance
#[derive(Debug, Clone, PartialEq)]
pub struct Fallback {
    pub requested: f64,
    pub chosen: f64,
    /// false when the nearest timestep was already selected and so was skipped
    pub used: bool,
}

/// The timesteps chosen for a run, in selection order
#[derive(Debug, Clone, PartialEq, Default)]
pub struct TimeSelection {
    pub times: Vec<f64>,
    /// index of each selected time in the dataset's time list
    pub indices: Vec<usize>,
    pub fallbacks: Vec<Fallback>,
    /// spacing of the requested times, zero when every timestep is used
    pub spacing: f64,
}

impl TimeSelection {
    pub fn len(&self) -> usize {
        self.times.len()
    }

    pub fn is_empty(&self) -> bool {
        self.times.is_empty()
    }

    fn push(&mut self, index: usize, time: f64) -> bool {
        if self.indices.contains(&index) {
            return false;
        }

        self.indices.push(index);
        self.times.push(time);
        true
    }
}

/// Choose timesteps from `available` for a request.
///
/// For every requested time the first available time (in file order) closer
/// than a tenth of the requested spacing is used. Without such a match the
/// nearest available time is used instead and the fallback is logged. A
/// timestep is never selected twice.
pub fn select_timesteps(available: &[f64], request: &TimeRequest) -> TimeSelection {
    let samples = match request {
        TimeRequest::All => {
            let mut selection = TimeSelection::default();
            for (index, time) in available.iter().enumerate() {
                selection.push(index, *time);
            }
            return selection;
        }
        TimeRequest::Range(samples) => samples,
    };

    let spacing = samples.spacing();
    let tolerance = if spacing > 0. { spacing / 10. } else { TIME_EPSILON };

    let mut selection = TimeSelection {
        spacing,
        ..Default::default()
    };

    if available.is_empty() {
        log::warn!("dataset has no timesteps, nothing can be selected");
        return selection;
    }

    for requested in samples.coordinates() {
        let exact = available
            .iter()
            .position(|time| (time - requested).abs() < tolerance);

        if let Some(index) = exact {
            selection.push(index, available[index]);
            continue;
        }

        let mut nearest = 0;
        for (index, time) in available.iter().enumerate() {
            if (time - requested).abs() < (available[nearest] - requested).abs() {
                nearest = index;
            }
        }

        let chosen = available[nearest];
        let used = selection.push(nearest, chosen);

        if used {
            log::warn!(
                "no exact match for t={:.6}, using nearest t={:.6}",
                requested,
                chosen
            );
        } else {
            log::debug!(
                "nearest timestep t={:.6} for requested t={:.6} is already selected",
                chosen,
                requested
            );
        }

        selection.fallbacks.push(Fallback {
            requested,
            chosen,
            used,
        });
    }

    selection
}

/// Which of y and z is sampled as the out-of-plane (depth) axis of a plane
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AxisRoles {
    pub depth: Axis,
    /// the axis that gets a single sample at its minimum
    pub flat: Axis,
}

impl AxisRoles {
    /// The depth axis is the longer of y and z, unless overridden. Equal extents
    /// are rejected since either choice would be a guess.
    pub fn resolve(bounds: &Bounds, depth_override: Option<Axis>) -> Result<Self, PlanError> {
        let depth = match depth_override {
            Some(Axis::X) => return Err(PlanError::InvalidDepthAxis(Axis::X)),
            Some(axis) => axis,
            None => {
                let y_extent = bounds.extent(Axis::Y);
                let z_extent = bounds.extent(Axis::Z);
                let largest = y_extent.max(z_extent);

                if (y_extent - z_extent).abs() <= AMBIGUOUS_EXTENT * largest || largest <= 0. {
                    return Err(PlanError::AmbiguousAxes { y_extent, z_extent });
                }

                if z_extent > y_extent {
                    Axis::Z
                } else {
                    Axis::Y
                }
            }
        };

        let flat = if depth == Axis::Z { Axis::Y } else { Axis::Z };
        Ok(Self { depth, flat })
    }
}

/// sampling plan for a plane through the mesh, stacked over time
#[derive(Debug, Clone, PartialEq)]
pub struct PlanePlan {
    pub x: AxisSample,
    pub depth: AxisSample,
    pub roles: AxisRoles,
    pub times: TimeSelection,
    pub grid: UniformGrid,
}

impl PlanePlan {
    pub fn new(
        bounds: &Bounds,
        x: AxisSample,
        depth: AxisSample,
        available_times: &[f64],
        request: &TimeRequest,
        depth_override: Option<Axis>,
    ) -> Result<Self, PlanError> {
        x.validate("x")?;
        depth.validate("depth")?;
        if let TimeRequest::Range(samples) = request {
            samples.validate("time")?;
        }

        let roles = AxisRoles::resolve(bounds, depth_override)?;
        let flat = AxisSample::single(bounds.min[roles.flat.index()]);

        let grid = match roles.depth {
            Axis::Z => UniformGrid::new(x, flat, depth),
            _ => UniformGrid::new(x, depth, flat),
        };

        log::info!(
            "sampling the x/{} plane, {} fixed at {}",
            roles.depth,
            roles.flat,
            flat.start
        );

        let times = select_timesteps(available_times, request);

        Ok(Self {
            x,
            depth,
            roles,
            times,
            grid,
        })
    }
}

/// how the extent of a three dimensional grid is divided into samples
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SpacingMode {
    /// use the explicit `(start, end, count)` range of every axis
    Ranges,
    /// a fixed spacing along each axis over the dataset extent
    Spacing { dx: f64, dy: f64, dz: f64 },
    /// a fixed sample count along each axis over the dataset extent
    Counts { nx: usize, ny: usize, nz: usize },
}

/// optional explicit ranges per axis
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SpatialRanges {
    #[serde(default)]
    pub x: Option<AxisSample>,
    #[serde(default)]
    pub y: Option<AxisSample>,
    #[serde(default)]
    pub z: Option<AxisSample>,
}

impl SpatialRanges {
    pub fn get(&self, axis: Axis) -> Option<&AxisSample> {
        match axis {
            Axis::X => self.x.as_ref(),
            Axis::Y => self.y.as_ref(),
            Axis::Z => self.z.as_ref(),
        }
    }
}

/// sampling plan for a full three dimensional grid over time
#[derive(Debug, Clone, PartialEq)]
pub struct VolumePlan {
    pub grid: UniformGrid,
    pub times: TimeSelection,
}

impl VolumePlan {
    /// Explicit ranges take precedence over the dataset extent in the spacing and
    /// count modes, where only their start and end are used.
    pub fn new(
        bounds: &Bounds,
        ranges: &SpatialRanges,
        mode: &SpacingMode,
        available_times: &[f64],
        request: &TimeRequest,
    ) -> Result<Self, PlanError> {
        let mut samples = [AxisSample::single(0.); 3];

        for axis in [Axis::X, Axis::Y, Axis::Z] {
            let i = axis.index();
            let (min, max) = match ranges.get(axis) {
                Some(range) if range.start > range.end => {
                    return Err(PlanError::DescendingRange {
                        axis: axis.name().to_string(),
                        start: range.start,
                        end: range.end,
                    })
                }
                Some(range) => (range.start, range.end),
                None => (bounds.min[i], bounds.max[i]),
            };

            let sample = match mode {
                SpacingMode::Ranges => *ranges.get(axis).ok_or(PlanError::MissingRange(axis))?,
                SpacingMode::Spacing { dx, dy, dz } => {
                    let spacing = [*dx, *dy, *dz][i];
                    AxisSample::from_spacing(axis, min, max, spacing)?
                }
                SpacingMode::Counts { nx, ny, nz } => {
                    let count = [*nx, *ny, *nz][i];
                    // a single sample sits at the minimum of the range
                    if count == 1 {
                        AxisSample::single(min)
                    } else {
                        AxisSample::new(min, max, count)
                    }
                }
            };

            sample.validate(axis.name())?;
            samples[i] = sample;
        }

        if let TimeRequest::Range(samples) = request {
            samples.validate("time")?;
        }

        let [x, y, z] = samples;
        Ok(Self {
            grid: UniformGrid::new(x, y, z),
            times: select_timesteps(available_times, request),
        })
    }
}
