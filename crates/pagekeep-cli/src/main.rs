#![forbid(unsafe_code)]

use clap::Parser;
use pagekeep_cli::cmd::retention::{RetentionArgs, load_retention_config, run_retention};
use pagekeep_cli::logging::init_tracing;
use std::process::ExitCode;
use tracing::debug;

fn main() -> anyhow::Result<ExitCode> {
    let args = RetentionArgs::parse();
    let config = load_retention_config(&args)?;

    init_tracing(args.verbose, Some(args.log_file(&config)));
    debug!(?config, "configuration loaded");

    let output = args.output_mode();
    let mut stdout = std::io::stdout().lock();
    run_retention(&args, &config, output, &mut stdout)
}
