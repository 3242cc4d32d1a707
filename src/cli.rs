//! Command line arguments shared by the binaries
//!
//! Each binary takes the input path as its only positional argument. Flags
//! override the values of an optional YAML config, which in turn override the
//! built in defaults.

use std::path::PathBuf;

use clap::{Args, Parser};

use crate::config::{AggregateConfig, GridConfig, ResampleConfig};
use crate::grid::Axis;
use crate::plan::{AxisSample, SpacingMode, TimeRequest};
use crate::vtr::{Encoding, Precision};
use crate::Error;

#[derive(Args, Debug, Clone, Default)]
pub struct Verbosity {
    /// Increase verbosity (-v debug, -vv trace)
    #[arg(short, long, action = clap::ArgAction::Count)]
    pub verbose: u8,

    /// Only print warnings and errors
    #[arg(short, long, conflicts_with = "verbose")]
    pub quiet: bool,
}

impl Verbosity {
    pub fn level(&self) -> log::LevelFilter {
        if self.quiet {
            return log::LevelFilter::Warn;
        }

        match self.verbose {
            0 => log::LevelFilter::Info,
            1 => log::LevelFilter::Debug,
            _ => log::LevelFilter::Trace,
        }
    }
}

/// Set up `env_logger` at the requested level, `RUST_LOG` takes precedence
pub fn init_logging(verbosity: &Verbosity) {
    env_logger::Builder::new()
        .filter_level(verbosity.level())
        .format_timestamp_secs()
        .parse_default_env()
        .init();
}

/// Parse the process arguments. Help and version requests exit with 0, any
/// other problem prints the usage and exits with 1.
pub fn parse_or_exit<T: Parser>() -> T {
    match T::try_parse() {
        Ok(args) => args,
        Err(err) => {
            let code = if err.use_stderr() { 1 } else { 0 };
            // nothing sensible is left to do if stdout / stderr are gone
            let _ = err.print();
            std::process::exit(code);
        }
    }
}

/// three comma separated values, one per axis
fn parse_triple<T>(s: &str) -> Result<[T; 3], String>
where
    T: std::str::FromStr + Copy + Default,
    T::Err: std::fmt::Display,
{
    let mut values = [T::default(); 3];
    let parts: Vec<&str> = s.split(',').map(str::trim).collect();

    if parts.len() != 3 {
        return Err(format!("expected three comma separated values, got `{}`", s));
    }

    for (value, part) in values.iter_mut().zip(parts) {
        *value = part
            .parse()
            .map_err(|e| format!("`{}` is not valid: {}", part, e))?;
    }

    Ok(values)
}

/// Sample a field of an Exodus file on an x / depth plane over time and save it as a MAT file
#[derive(Parser, Debug)]
#[command(name = "exodus-to-mat", version)]
pub struct ExodusToMatArgs {
    /// Exodus II file to read
    pub input: PathBuf,

    /// YAML file with sampling parameters
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    /// Field to sample
    #[arg(short, long)]
    pub field: Option<String>,

    /// Component kept from a vector field
    #[arg(long)]
    pub component: Option<usize>,

    /// x range as start,end,count
    #[arg(long, allow_hyphen_values = true)]
    pub x: Option<AxisSample>,

    /// depth range as start,end,count
    #[arg(long, allow_hyphen_values = true)]
    pub depth: Option<AxisSample>,

    /// Out-of-plane axis, y or z. Taken from the mesh extent when not given
    #[arg(long)]
    pub depth_axis: Option<Axis>,

    /// Requested times as start,end,count, or `all`
    #[arg(short, long, allow_hyphen_values = true)]
    pub time: Option<TimeRequest>,

    /// Compress the MAT file
    #[arg(long)]
    pub compress: bool,

    /// Output file, defaults to `<input stem>_<field>.mat` next to the input
    #[arg(short, long)]
    pub output: Option<PathBuf>,

    #[command(flatten)]
    pub verbosity: Verbosity,
}

impl ExodusToMatArgs {
    pub fn into_config(self) -> Result<ResampleConfig, Error> {
        let mut config = match &self.config {
            Some(path) => ResampleConfig::from_yaml(path)?,
            None => ResampleConfig::default(),
        };

        config.source_path = self.input;

        if let Some(field) = self.field {
            config.field_name = field;
        }
        if let Some(component) = self.component {
            config.component = component;
        }
        if let Some(x) = self.x {
            config.spatial_ranges.x = Some(x);
        }
        if let Some(axis) = self.depth_axis {
            config.depth_axis = Some(axis);
        }
        if let Some(depth) = self.depth {
            match config.depth_axis {
                Some(Axis::Y) => config.spatial_ranges.y = Some(depth),
                _ => config.spatial_ranges.z = Some(depth),
            }
        }
        if let Some(time) = self.time {
            config.time_ranges_or_all = time;
        }
        if self.compress {
            config.compress = true;
        }
        if self.output.is_some() {
            config.output = self.output;
        }

        Ok(config)
    }
}

/// Sample a field of an Exodus file on a 3D grid, writing one .vtr file per timestep
#[derive(Parser, Debug)]
#[command(name = "exodus-to-vtr", version)]
pub struct ExodusToVtrArgs {
    /// Exodus II file to read
    pub input: PathBuf,

    /// YAML file with sampling parameters
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    /// Field to sample
    #[arg(short, long)]
    pub field: Option<String>,

    /// x range as start,end,count
    #[arg(long, allow_hyphen_values = true)]
    pub x: Option<AxisSample>,

    /// y range as start,end,count
    #[arg(long, allow_hyphen_values = true)]
    pub y: Option<AxisSample>,

    /// z range as start,end,count
    #[arg(long, allow_hyphen_values = true)]
    pub z: Option<AxisSample>,

    /// Sample counts nx,ny,nz over the ranges (or the mesh bounds)
    #[arg(long, value_parser = parse_triple::<usize>, conflicts_with_all = ["spacing", "ranges"])]
    pub counts: Option<[usize; 3]>,

    /// Grid spacing dx,dy,dz over the ranges (or the mesh bounds)
    #[arg(long, value_parser = parse_triple::<f64>, conflicts_with = "ranges")]
    pub spacing: Option<[f64; 3]>,

    /// Use the x, y and z ranges exactly as given
    #[arg(long)]
    pub ranges: bool,

    /// Requested times as start,end,count, or `all`
    #[arg(short, long, allow_hyphen_values = true)]
    pub time: Option<TimeRequest>,

    /// Data array encoding: ascii, base64 or appended
    #[arg(short, long)]
    pub encoding: Option<Encoding>,

    /// Data type of the field array, e.g. Float32 or Float64
    #[arg(short, long)]
    pub precision: Option<Precision>,

    /// Output directory, defaults to `<input stem>_resampled` next to the input
    #[arg(short, long)]
    pub output: Option<PathBuf>,

    #[command(flatten)]
    pub verbosity: Verbosity,
}

impl ExodusToVtrArgs {
    pub fn into_config(self) -> Result<GridConfig, Error> {
        let mut config = match &self.config {
            Some(path) => GridConfig::from_yaml(path)?,
            None => GridConfig::default(),
        };

        config.source_path = self.input;

        if let Some(field) = self.field {
            config.field_name = field;
        }
        for (range, slot) in [
            (self.x, &mut config.spatial_ranges.x),
            (self.y, &mut config.spatial_ranges.y),
            (self.z, &mut config.spatial_ranges.z),
        ] {
            if range.is_some() {
                *slot = range;
            }
        }

        if let Some([nx, ny, nz]) = self.counts {
            config.spacing_mode = SpacingMode::Counts { nx, ny, nz };
        }
        if let Some([dx, dy, dz]) = self.spacing {
            config.spacing_mode = SpacingMode::Spacing { dx, dy, dz };
        }
        if self.ranges {
            config.spacing_mode = SpacingMode::Ranges;
        }

        if let Some(time) = self.time {
            config.time_ranges_or_all = time;
        }
        if let Some(encoding) = self.encoding {
            config.encoding = encoding;
        }
        if let Some(precision) = self.precision {
            config.precision = precision;
        }
        if self.output.is_some() {
            config.output = self.output;
        }

        Ok(config)
    }
}

/// Stack a directory of per-timestep .vtr or .vti files into one MAT file
#[derive(Parser, Debug)]
#[command(name = "vtr-to-mat", version)]
pub struct VtrToMatArgs {
    /// Directory holding the .vtr or .vti files
    pub input: PathBuf,

    /// YAML file with aggregation parameters
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    /// Array to stack, defaults to the first one whose name contains `vel`
    #[arg(short, long)]
    pub field: Option<String>,

    /// Compress the MAT file
    #[arg(long)]
    pub compress: bool,

    /// Output file, defaults to `<dir name>_<field>.mat` next to the directory
    #[arg(short, long)]
    pub output: Option<PathBuf>,

    #[command(flatten)]
    pub verbosity: Verbosity,
}

impl VtrToMatArgs {
    pub fn into_config(self) -> Result<AggregateConfig, Error> {
        let mut config = match &self.config {
            Some(path) => AggregateConfig::from_yaml(path)?,
            None => AggregateConfig::default(),
        };

        config.source_path = self.input;

        if self.field.is_some() {
            config.field_name = self.field;
        }
        if self.compress {
            config.compress = true;
        }
        if self.output.is_some() {
            config.output = self.output;
        }

        Ok(config)
    }
}

/// Print the number of timesteps and the first and final time of an Exodus file
#[derive(Parser, Debug)]
#[command(name = "exodus-times", version)]
pub struct ExodusTimesArgs {
    /// Exodus II file to read
    pub input: PathBuf,

    #[command(flatten)]
    pub verbosity: Verbosity,
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn commands_are_consistent() {
        ExodusToMatArgs::command().debug_assert();
        ExodusToVtrArgs::command().debug_assert();
        VtrToMatArgs::command().debug_assert();
        ExodusTimesArgs::command().debug_assert();
    }

    #[test]
    fn missing_input_is_an_error() {
        let err = ExodusToMatArgs::try_parse_from(["exodus-to-mat"]).unwrap_err();
        assert!(err.use_stderr());
    }

    #[test]
    fn plane_flags_override_defaults() {
        let args = ExodusToMatArgs::try_parse_from([
            "exodus-to-mat",
            "case.e",
            "--field",
            "disp_y",
            "--x",
            "-0.01,0.01,11",
            "--depth-axis",
            "y",
            "--depth",
            "0,0.02,5",
            "--time",
            "all",
            "-vv",
        ])
        .unwrap();

        assert_eq!(args.verbosity.level(), log::LevelFilter::Trace);

        let config = args.into_config().unwrap();
        assert_eq!(config.source_path, PathBuf::from("case.e"));
        assert_eq!(config.field_name, "disp_y");
        assert_eq!(config.spatial_ranges.x, Some(AxisSample::new(-0.01, 0.01, 11)));
        assert_eq!(config.spatial_ranges.y, Some(AxisSample::new(0., 0.02, 5)));
        assert_eq!(config.time_ranges_or_all, TimeRequest::All);
        assert_eq!(config.output_path(), PathBuf::from("case_disp_y.mat"));
    }

    #[test]
    fn grid_flags_override_defaults() {
        let args = ExodusToVtrArgs::try_parse_from([
            "exodus-to-vtr",
            "case.e",
            "--counts",
            "10,20,1",
            "--encoding",
            "ascii",
            "--precision",
            "f32",
            "-q",
        ])
        .unwrap();

        assert_eq!(args.verbosity.level(), log::LevelFilter::Warn);

        let config = args.into_config().unwrap();
        assert_eq!(config.spacing_mode, SpacingMode::Counts { nx: 10, ny: 20, nz: 1 });
        assert_eq!(config.encoding, Encoding::Ascii);
        assert_eq!(config.precision, Precision::Float32);
        assert_eq!(config.field_name, "vel");
    }

    #[test]
    fn triples() {
        assert_eq!(parse_triple::<usize>("1, 2,3"), Ok([1, 2, 3]));
        assert!(parse_triple::<usize>("1,2").is_err());
        assert!(parse_triple::<f64>("0.1,x,0.2").is_err());
    }

    #[test]
    fn conflicting_grid_modes() {
        let err = ExodusToVtrArgs::try_parse_from([
            "exodus-to-vtr",
            "case.e",
            "--counts",
            "1,1,1",
            "--ranges",
        ]);
        assert!(err.is_err());
    }
}
