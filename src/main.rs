//! search-agent command-line entry point.

use std::io::Write;
use std::process::ExitCode;

use anyhow::Context as _;
use clap::Parser;
use search_agent::cli::{Cli, execute};
use search_agent::logging::init_logging;

fn run(cli: &Cli) -> anyhow::Result<String> {
    init_logging(cli.log_level.as_deref(), cli.verbose, cli.no_color)
        .context("failed to initialize logging")?;
    Ok(execute(cli)?)
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    match run(&cli) {
        Ok(output) => {
            let mut stdout = std::io::stdout().lock();
            let _ = stdout.write_all(output.as_bytes());
            if !output.is_empty() && !output.ends_with('\n') {
                let _ = stdout.write_all(b"\n");
            }
            ExitCode::SUCCESS
        }
        Err(e) => {
            let _ = writeln!(std::io::stderr(), "Error: {e:#}");
            ExitCode::FAILURE
        }
    }
}
