use std::process::ExitCode;

use clap::Parser;
use palsprite::cli::{Cli, Job, RunError, run};
use palsprite::config::Config;
use tracing_subscriber::{EnvFilter, fmt};

fn main() -> ExitCode {
    let cli = Cli::parse();
    // Load config first so we can honor logging.filter directive.
    let config = match Config::load(cli.config.as_deref()) {
        Ok(c) => c,
        Err(e) => {
            eprintln!("error: {e:#}");
            return ExitCode::from(RunError::Usage(e).exit_code());
        }
    };
    fmt()
        .with_env_filter(EnvFilter::new(cli.log_directive(&config)))
        .init();

    let result = Job::from_cli(&cli, &config)
        .map_err(RunError::Usage)
        .and_then(|job| run(&job));
    match result {
        Ok(written) => {
            tracing::debug!(files = ?written, "done");
            ExitCode::SUCCESS
        }
        Err(e) => {
            tracing::error!("{e}");
            ExitCode::from(e.exit_code())
        }
    }
}
