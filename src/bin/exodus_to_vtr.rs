use anyhow::Context;

use exodus_resample::cli::{self, ExodusToVtrArgs};
use exodus_resample::pipeline;

fn main() -> anyhow::Result<()> {
    let args: ExodusToVtrArgs = cli::parse_or_exit();
    cli::init_logging(&args.verbosity);

    let config = args.into_config().context("could not assemble the sampling parameters")?;

    let summary = pipeline::exodus_to_grids(&config)
        .with_context(|| format!("failed to resample `{}`", config.source_path.display()))?;

    println!("{}", summary);
    Ok(())
}
