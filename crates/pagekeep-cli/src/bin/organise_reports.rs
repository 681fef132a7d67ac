#![forbid(unsafe_code)]

use clap::Parser;
use pagekeep_cli::cmd::organise::{OrganiseArgs, load_organise_config, run_organise};
use pagekeep_cli::logging::init_tracing;
use std::process::ExitCode;
use tracing::debug;

fn main() -> anyhow::Result<ExitCode> {
    let args = OrganiseArgs::parse();
    let config = load_organise_config(&args)?;

    init_tracing(args.verbose, None);
    debug!(?config, "configuration loaded");

    let output = args.output_mode();
    let mut stdout = std::io::stdout().lock();
    run_organise(&args, &config, output, &mut stdout)
}
