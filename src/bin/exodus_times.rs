use anyhow::Context;

use exodus_resample::cli::{self, ExodusTimesArgs};
use exodus_resample::pipeline;

fn main() -> anyhow::Result<()> {
    let args: ExodusTimesArgs = cli::parse_or_exit();
    cli::init_logging(&args.verbosity);

    let summary = pipeline::exodus_times(&args.input)
        .with_context(|| format!("could not read the times of `{}`", args.input.display()))?;

    println!("{}", summary);
    Ok(())
}
