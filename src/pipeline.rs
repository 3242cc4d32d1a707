//! The resampling runs behind each binary
//!
//! Each run opens its input, builds a sampling plan, resamples or reads every
//! selected timestep, stacks the results and writes a single output. The
//! returned summaries implement `Display` and print what was written together
//! with how to load it in MATLAB.

use std::fmt;
use std::path::{Path, PathBuf};

use ndarray::Array1;

use crate::aggregate::{PlaneAggregate, VolumeAggregate};
use crate::config::{AggregateConfig, GridConfig, ResampleConfig};
use crate::exodus::ExodusFile;
use crate::grid::Axis;
use crate::mat::{MatFile, MAX_NAME_LEN};
use crate::plan::{AxisSample, PlanePlan, VolumePlan};
use crate::traits::DataSource;
use crate::vtr::{self, VtrFile};
use crate::Error;

/// What a plane resampling run wrote
#[derive(Debug, Clone, PartialEq)]
pub struct PlaneSummary {
    pub output: PathBuf,
    pub field: String,
    pub depth_axis: Axis,
    /// `(n_depth, nx, nt)`
    pub shape: (usize, usize, usize),
    pub x: AxisSample,
    pub depth: AxisSample,
    pub times: Vec<f64>,
    pub dt: f64,
    /// timesteps the field could not be sampled at
    pub missing: usize,
}

/// Sample one field of an Exodus file on a plane over time and save it as a MAT file
pub fn exodus_to_mat(config: &ResampleConfig) -> Result<PlaneSummary, Error> {
    log::info!("Reading exodus file: {}", config.source_path.display());
    let mut source = ExodusFile::open(&config.source_path)?;
    plane_to_mat(&mut source, config)
}

/// [`exodus_to_mat`] for any [`DataSource`]
pub fn plane_to_mat<S: DataSource>(source: &mut S, config: &ResampleConfig) -> Result<PlaneSummary, Error> {
    let bounds = source.bounds();
    log::info!("Mesh bounds: {}", bounds);

    let names = source.field_names();
    log::info!("Available fields: {:?}", names);
    if source.field(&config.field_name).is_none() {
        log::warn!(
            "field `{}` is not in the file, every timestep will be left at zero",
            config.field_name
        );
    }

    let times = source.times().to_vec();
    if let (Some(first), Some(last)) = (times.first(), times.last()) {
        log::info!("File contains {} timesteps: {} to {}", times.len(), first, last);
    }

    let (x, depth) = config.plane_samples(&bounds)?;
    let plan = PlanePlan::new(
        &bounds,
        x,
        depth,
        &times,
        &config.time_ranges_or_all,
        config.depth_axis,
    )?;

    let depth_name = plan.roles.depth.name();
    log::info!(
        "Requested sampling: nx={}, n{}={}, nt={}",
        x.count,
        depth_name,
        depth.count,
        plan.times.len()
    );
    log::info!(
        "Increments: dx={:.6}, d{}={:.6}, dt={:.6}",
        x.spacing(),
        depth_name,
        depth.spacing(),
        plan.times.spacing
    );
    log::info!("Using {} timesteps", plan.times.len());

    let aggregate = PlaneAggregate::collect(source, &plan, &config.field_name, config.component)?;

    let key = matlab_name(&config.field_name);
    let mut mat = MatFile::new();
    mat.insert_array(&key, aggregate.values())?;
    mat.insert_row_vector("xs", &x.coordinates().to_vec())?;
    mat.insert_row_vector(&format!("{}s", depth_name), &depth.coordinates().to_vec())?;
    mat.insert_row_vector("ts", &plan.times.times)?;
    mat.insert_scalar("dx", x.spacing())?;
    mat.insert_scalar(&format!("d{}", depth_name), depth.spacing())?;
    mat.insert_scalar("dt", plan.times.spacing)?;
    mat.insert_logical("valid", &Array1::from(aggregate.valid().to_vec()))?;
    mat.insert_logical("mask", aggregate.mask())?;

    let output = config.output_path();
    mat.write(&output, config.compress)?;
    log::info!("wrote {}", output.display());

    Ok(PlaneSummary {
        output,
        field: key,
        depth_axis: plan.roles.depth,
        shape: aggregate.shape(),
        x,
        depth,
        times: plan.times.times.clone(),
        dt: plan.times.spacing,
        missing: aggregate.valid().iter().filter(|valid| !**valid).count(),
    })
}

fn range_line(f: &mut fmt::Formatter<'_>, name: &str, values: &[f64], spacing: f64) -> fmt::Result {
    let axis = name.trim_end_matches('s');
    match (values.first(), values.last()) {
        (Some(first), Some(last)) => writeln!(
            f,
            "{}: {} points, range [{:.6}, {:.6}], d{}={:.6}",
            name,
            values.len(),
            first,
            last,
            axis,
            spacing
        ),
        _ => writeln!(f, "{}: 0 points", name),
    }
}

impl fmt::Display for PlaneSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let (n_depth, nx, nt) = self.shape;
        let depth = self.depth_axis.name();
        let depth_key = format!("{}s", depth);
        let file_name = self
            .output
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_default();

        writeln!(f, "\n=== Summary ===")?;
        writeln!(f, "Output file: {}", self.output.display())?;
        writeln!(
            f,
            "Array '{}' shape: ({}, {}, {}) (n{}, nx, nt)",
            self.field, n_depth, nx, nt, depth
        )?;
        range_line(f, "xs", &self.x.coordinates().to_vec(), self.x.spacing())?;
        range_line(f, &depth_key, &self.depth.coordinates().to_vec(), self.depth.spacing())?;
        range_line(f, "ts", &self.times, self.dt)?;
        if self.missing > 0 {
            writeln!(
                f,
                "{} of {} timesteps could not be sampled, see `valid`",
                self.missing, nt
            )?;
        }

        writeln!(f, "\nMATLAB usage:")?;
        writeln!(f, "  data = load('{}');", file_name)?;
        writeln!(
            f,
            "  {0} = data.{0};  % ({1}, {2}, {3})",
            self.field, n_depth, nx, nt
        )?;
        writeln!(f, "  xs = data.xs;  % ({},)", nx)?;
        writeln!(f, "  {0} = data.{0};  % ({1},)", depth_key, n_depth)?;
        write!(f, "  ts = data.ts;  % ({},)", nt)
    }
}

/// What a grid resampling run wrote
#[derive(Debug, Clone, PartialEq)]
pub struct GridSummary {
    pub output_dir: PathBuf,
    pub dimensions: [usize; 3],
    pub files: Vec<PathBuf>,
    /// times the field could not be sampled at
    pub skipped: Vec<f64>,
}

impl fmt::Display for GridSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let [nx, ny, nz] = self.dimensions;
        writeln!(f, "Grid dimensions (points): {} {} {}", nx, ny, nz)?;
        writeln!(f, "Wrote {} files to {}", self.files.len(), self.output_dir.display())?;
        if !self.skipped.is_empty() {
            writeln!(f, "Skipped {} timesteps: {:?}", self.skipped.len(), self.skipped)?;
        }
        write!(f, "Done.")
    }
}

/// Sample one field of an Exodus file on a 3D grid and write a grid file per timestep
pub fn exodus_to_grids(config: &GridConfig) -> Result<GridSummary, Error> {
    log::info!("Reading exodus file: {}", config.source_path.display());
    let mut source = ExodusFile::open(&config.source_path)?;
    write_grids(&mut source, config)
}

/// [`exodus_to_grids`] for any [`DataSource`]
pub fn write_grids<S: DataSource>(source: &mut S, config: &GridConfig) -> Result<GridSummary, Error> {
    let bounds = source.bounds();
    log::info!("Mesh bounds: {}", bounds);

    let plan = VolumePlan::new(
        &bounds,
        &config.spatial_ranges,
        &config.spacing_mode,
        source.times(),
        &config.time_ranges_or_all,
    )?;
    log::info!("Found time steps: {:?}", plan.times.times);

    let output_dir = config.output_dir();
    std::fs::create_dir_all(&output_dir).map_err(|source| Error::OutputWrite {
        path: output_dir.clone(),
        source,
    })?;

    let nt = plan.times.len();
    let mut files = Vec::with_capacity(nt);
    let mut skipped = Vec::new();

    for (step, time) in plan.times.times.iter().enumerate() {
        log::info!("Processing time {} ({}/{})", time, step + 1, nt);

        let field = match source.resample(&config.field_name, *time, &plan.grid) {
            Ok(field) => field,
            Err(Error::FieldNotFound { available, .. }) => {
                log::warn!("field `{}` not found at timestep {}, skipping", config.field_name, time);
                for name in available {
                    log::warn!("    available: {}", name);
                }
                skipped.push(*time);
                continue;
            }
            Err(other) => return Err(other),
        };

        let path = output_dir.join(vtr::grid_file_name(*time));
        VtrFile::from_field(&plan.grid, &config.field_name, &field, config.precision)
            .write(&path, config.encoding)?;

        log::info!("Wrote {}", path.display());
        files.push(path);
    }

    Ok(GridSummary {
        output_dir,
        dimensions: plan.grid.counts(),
        files,
        skipped,
    })
}

/// What an aggregation run wrote
#[derive(Debug, Clone, PartialEq)]
pub struct AggregateSummary {
    pub output: PathBuf,
    pub field: String,
    /// `(nx, ny, nz, nt, components)`
    pub shape: [usize; 5],
    pub missing: usize,
}

impl fmt::Display for AggregateSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let [nx, ny, nz, nt, nc] = self.shape;
        let file_name = self
            .output
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_default();

        writeln!(f, "Saved {}", self.output.display())?;
        writeln!(
            f,
            "Array '{}' shape: ({}, {}, {}, {}, {}) (nx, ny, nz, nt, components)",
            self.field, nx, ny, nz, nt, nc
        )?;
        if self.missing > 0 {
            writeln!(f, "{} of {} files did not hold the array, see `valid`", self.missing, nt)?;
        }
        writeln!(f, "\nMATLAB usage:")?;
        writeln!(f, "  data = load('{}');", file_name)?;
        write!(f, "  {0} = data.{0};  % ({1}, {2}, {3}, {4}, {5})", self.field, nx, ny, nz, nt, nc)
    }
}

/// Stack the grid files of a directory into one `(nx, ny, nz, nt, components)` array
pub fn grids_to_mat(config: &AggregateConfig) -> Result<AggregateSummary, Error> {
    let dir = &config.source_path;
    if !dir.is_dir() {
        return Err(Error::InputNotFound(dir.clone()));
    }

    let files = vtr::grid_files(dir)?;
    let (_, first_path) = files.first().ok_or_else(|| Error::NoGridFiles(dir.clone()))?;

    let first = VtrFile::read(first_path)?;
    let dimensions = first.dimensions();
    let [nx, ny, nz] = dimensions;
    log::info!("Grid dimensions (points): {} {} {}", nx, ny, nz);

    let names: Vec<String> = first.array_names().map(str::to_string).collect();
    log::info!("Available arrays: {:?}", names);

    let field = match &config.field_name {
        Some(name) => name.clone(),
        None => find_velocity(&names).ok_or_else(|| Error::ArrayNotFound {
            name: "vel".to_string(),
            path: first_path.clone(),
            available: names.clone(),
        })?,
    };

    let components = first
        .array(&field)
        .map(|array| array.components)
        .ok_or_else(|| Error::ArrayNotFound {
            name: field.clone(),
            path: first_path.clone(),
            available: names.clone(),
        })?;
    log::info!("Using field: {} ({} components)", field, components);

    let nt = files.len();
    let mut aggregate = VolumeAggregate::new(nt, dimensions, components);
    let mut times = Vec::with_capacity(nt);

    for (step, (time, path)) in files.iter().enumerate() {
        log::info!("Reading {}", path.display());

        match time {
            Some(time) => times.push(*time),
            None => {
                log::warn!("no time in the name of {}, its time is stored as NaN", path.display());
                times.push(f64::NAN);
            }
        }

        // the first file is already parsed
        let read;
        let file = if step == 0 {
            &first
        } else {
            read = VtrFile::read(path)?;
            &read
        };

        match file.array_grid(&field) {
            Some(grid) => aggregate.insert(step, grid?.view())?,
            None => log::warn!("array `{}` is missing from {}", field, path.display()),
        }
    }

    let key = matlab_name(&field);
    let values = aggregate.spatial_major();

    let mut mat = MatFile::new();
    mat.insert_array(&key, &values)?;
    mat.insert_row_vector("xs", &first.mesh.x_locations)?;
    mat.insert_row_vector("ys", &first.mesh.y_locations)?;
    mat.insert_row_vector("zs", &first.mesh.z_locations)?;
    mat.insert_row_vector("ts", &times)?;
    mat.insert_logical("valid", &Array1::from(aggregate.valid().to_vec()))?;

    let output = config.output_path(&key);
    mat.write(&output, config.compress)?;
    log::info!("Saved {}", output.display());

    let shape = values.shape();
    Ok(AggregateSummary {
        output,
        field: key,
        shape: [shape[0], shape[1], shape[2], shape[3], shape[4]],
        missing: aggregate.valid().iter().filter(|valid| !**valid).count(),
    })
}

/// first array whose name contains `vel`, ignoring case
fn find_velocity(names: &[String]) -> Option<String> {
    names
        .iter()
        .find(|name| name.to_ascii_lowercase().contains("vel"))
        .cloned()
}

/// `name` with every character MATLAB rejects in a variable name replaced by `_`
fn matlab_name(name: &str) -> String {
    let mut cleaned: String = name
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() || c == '_' { c } else { '_' })
        .collect();

    if !cleaned.starts_with(|c: char| c.is_ascii_alphabetic()) {
        cleaned.insert(0, 'f');
    }

    cleaned.truncate(MAX_NAME_LEN);
    cleaned
}

/// The timesteps stored in an Exodus file
#[derive(Debug, Clone, PartialEq)]
pub struct TimeSummary {
    pub times: Vec<f64>,
}

impl fmt::Display for TimeSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Number of timesteps: {}", self.times.len())?;
        if let (Some(first), Some(last)) = (self.times.first(), self.times.last()) {
            write!(f, "\nFirst time: {}\nFinal time: {}", first, last)?;
        }
        Ok(())
    }
}

/// Read `time_whole` without loading the mesh
pub fn exodus_times(path: &Path) -> Result<TimeSummary, Error> {
    if !path.exists() {
        return Err(Error::InputNotFound(path.to_path_buf()));
    }

    let times = ExodusFile::read_times(path)?;
    Ok(TimeSummary { times })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::grid::{Bounds, FieldGrid, UniformGrid};
    use crate::mat;
    use crate::plan::{SpacingMode, SpatialRanges, TimeRequest};
    use crate::traits::{Association, FieldInfo};
    use approx::assert_abs_diff_eq;

    /// `u = (x + 10 y + 100 z + 1000 t, -x)` on a box, missing at `gap`
    struct Analytic {
        fields: Vec<FieldInfo>,
        times: Vec<f64>,
        gap: Option<f64>,
    }

    impl Analytic {
        fn new(times: Vec<f64>, gap: Option<f64>) -> Self {
            Self {
                fields: vec![FieldInfo {
                    name: "u".to_string(),
                    components: 2,
                    association: Association::Point,
                }],
                times,
                gap,
            }
        }
    }

    impl DataSource for Analytic {
        fn open(_: &Path) -> Result<Self, Error> {
            Ok(Self::new(vec![0.], None))
        }

        fn bounds(&self) -> Bounds {
            Bounds {
                min: [0., 0., 0.],
                max: [1., 0.1, 2.],
            }
        }

        fn fields(&self) -> &[FieldInfo] {
            &self.fields
        }

        fn times(&self) -> &[f64] {
            &self.times
        }

        fn resample(&mut self, field: &str, time: f64, grid: &UniformGrid) -> Result<FieldGrid, Error> {
            if field != "u" || Some(time) == self.gap {
                return Err(Error::FieldNotFound {
                    field: field.to_string(),
                    time,
                    available: self.field_names(),
                });
            }

            let values = grid
                .points()
                .flat_map(|[x, y, z]| [x + 10. * y + 100. * z + 1000. * time, -x])
                .collect();
            let mask = vec![true; grid.len()];

            Ok(FieldGrid::from_point_values(grid, 2, values, mask)?)
        }
    }

    #[test]
    fn plane_run_writes_every_key() {
        let dir = tempfile::tempdir().unwrap();
        let mut source = Analytic::new(vec![0., 0.001, 0.002], Some(0.001));

        let config = ResampleConfig {
            source_path: dir.path().join("case.e"),
            field_name: "u".to_string(),
            spatial_ranges: SpatialRanges {
                x: Some(AxisSample::new(0., 1., 3)),
                y: None,
                z: Some(AxisSample::new(0., 2., 2)),
            },
            time_ranges_or_all: TimeRequest::All,
            ..Default::default()
        };

        let summary = plane_to_mat(&mut source, &config).unwrap();
        assert_eq!(summary.shape, (2, 3, 3));
        assert_eq!(summary.missing, 1);
        assert_eq!(summary.output, dir.path().join("case_u.mat"));

        let mat = mat::read_back(&summary.output);
        let names: Vec<_> = mat.names().collect();
        assert_eq!(names, vec!["u", "xs", "zs", "ts", "dx", "dz", "dt", "valid", "mask"]);

        let values = mat.get("u").unwrap().to_ndarray().unwrap();
        assert_eq!(values.shape(), &[2, 3, 3]);
        // depth z = 2, x = 0.5, t = 0.002
        assert_abs_diff_eq!(values[[1, 1, 2]], 0.5 + 200. + 2., epsilon = 1e-9);
        // the missing timestep stays zero
        assert!(values.index_axis(ndarray::Axis(2), 1).iter().all(|v| *v == 0.));

        assert_eq!(mat.get("valid").unwrap().as_logical(), Some(&[true, false, true][..]));
        assert_eq!(mat.get("dz").unwrap().scalar(), Some(2.));
        assert_eq!(mat.get("dt").unwrap().scalar(), Some(0.));

        let text = summary.to_string();
        assert!(text.contains("=== Summary ==="));
        assert!(text.contains("Array 'u' shape: (2, 3, 3) (nz, nx, nt)"));
        assert!(text.contains("data = load('case_u.mat');"));
        assert!(text.contains("1 of 3 timesteps could not be sampled"));
    }

    #[test]
    fn plane_run_keeps_the_requested_component() {
        let dir = tempfile::tempdir().unwrap();
        let mut source = Analytic::new(vec![0.], None);

        let config = ResampleConfig {
            source_path: dir.path().join("case.e"),
            field_name: "u".to_string(),
            component: 1,
            spatial_ranges: SpatialRanges {
                x: Some(AxisSample::new(0., 1., 2)),
                y: None,
                z: Some(AxisSample::single(1.)),
            },
            time_ranges_or_all: TimeRequest::All,
            ..Default::default()
        };

        let summary = plane_to_mat(&mut source, &config).unwrap();
        let mat = mat::read_back(&summary.output);
        let values = mat.get("u").unwrap().as_doubles().unwrap().to_vec();

        assert_eq!(values, vec![-0., -1.]);
    }

    #[test]
    fn component_out_of_range() {
        let dir = tempfile::tempdir().unwrap();
        let mut source = Analytic::new(vec![0.], None);

        let config = ResampleConfig {
            source_path: dir.path().join("case.e"),
            field_name: "u".to_string(),
            component: 2,
            ..Default::default()
        };

        let err = plane_to_mat(&mut source, &config).unwrap_err();
        assert!(matches!(err, Error::Aggregate(_)));
        assert!(!dir.path().join("case_u.mat").exists());
    }

    #[test]
    fn grids_then_aggregate() {
        let dir = tempfile::tempdir().unwrap();
        let mut source = Analytic::new(vec![0., 0.5, 1.], Some(0.5));

        let config = GridConfig {
            source_path: dir.path().join("case.e"),
            field_name: "u".to_string(),
            spacing_mode: SpacingMode::Counts { nx: 3, ny: 1, nz: 2 },
            ..Default::default()
        };

        let grids = write_grids(&mut source, &config).unwrap();
        assert_eq!(grids.dimensions, [3, 1, 2]);
        assert_eq!(grids.files.len(), 2);
        assert_eq!(grids.skipped, vec![0.5]);
        assert_eq!(grids.output_dir, dir.path().join("case_resampled"));

        let aggregate = AggregateConfig {
            source_path: grids.output_dir.clone(),
            ..Default::default()
        };
        let err = grids_to_mat(&aggregate).unwrap_err();
        assert!(matches!(err, Error::ArrayNotFound { .. }));

        let aggregate = AggregateConfig {
            field_name: Some("u".to_string()),
            ..aggregate
        };
        let summary = grids_to_mat(&aggregate).unwrap();
        assert_eq!(summary.shape, [3, 1, 2, 2, 2]);
        assert_eq!(summary.output, dir.path().join("case_resampled_u.mat"));

        let mat = mat::read_back(&summary.output);
        assert_eq!(mat.get("ts").unwrap().as_doubles(), Some(&[0., 1.][..]));
        assert_eq!(mat.get("zs").unwrap().as_doubles(), Some(&[0., 2.][..]));

        let values = mat.get("u").unwrap().to_ndarray().unwrap();
        // x = 1, z = 2, t = 1, first component
        assert_abs_diff_eq!(values[[2, 0, 1, 1, 0]], 1. + 200. + 1000., epsilon = 1e-9);
        assert_abs_diff_eq!(values[[2, 0, 1, 1, 1]], -1., epsilon = 1e-9);
    }

    #[test]
    fn aggregate_without_files() {
        let dir = tempfile::tempdir().unwrap();
        let config = AggregateConfig {
            source_path: dir.path().to_path_buf(),
            ..Default::default()
        };
        assert!(matches!(grids_to_mat(&config), Err(Error::NoGridFiles(_))));

        let config = AggregateConfig {
            source_path: dir.path().join("absent"),
            ..Default::default()
        };
        assert!(matches!(grids_to_mat(&config), Err(Error::InputNotFound(_))));
    }

    #[test]
    fn velocity_lookup() {
        let names = vec!["vtkValidPointMask".to_string(), "Velocity".to_string()];
        assert_eq!(find_velocity(&names), Some("Velocity".to_string()));
        assert_eq!(find_velocity(&names[..1]), None);
    }

    #[test]
    fn matlab_names() {
        assert_eq!(matlab_name("disp_z"), "disp_z");
        assert_eq!(matlab_name("vel magnitude"), "vel_magnitude");
        assert_eq!(matlab_name("2d"), "f2d");
        assert_eq!(matlab_name(&"a".repeat(80)).len(), MAX_NAME_LEN);
    }

    #[test]
    fn time_summary() {
        let summary = TimeSummary {
            times: vec![0., 0.5, 0.006],
        };
        assert_eq!(
            summary.to_string(),
            "Number of timesteps: 3\nFirst time: 0\nFinal time: 0.006"
        );

        let empty = TimeSummary { times: vec![] };
        assert_eq!(empty.to_string(), "Number of timesteps: 0");
    }
}
