use anyhow::Context;

use exodus_resample::cli::{self, VtrToMatArgs};
use exodus_resample::pipeline;

fn main() -> anyhow::Result<()> {
    let args: VtrToMatArgs = cli::parse_or_exit();
    cli::init_logging(&args.verbosity);

    let config = args.into_config().context("could not read the configuration")?;

    let summary = pipeline::grids_to_mat(&config).with_context(|| {
        format!("failed to aggregate the grid files in `{}`", config.source_path.display())
    })?;

    println!("{}", summary);
    Ok(())
}
