//! ML Baseline CLI
//!
//! Train a tabular binary classifier into a versioned run and serve
//! predictions from it.
//!
//! # Usage
//!
//! ```bash
//! # Generate a synthetic training table
//! ml-baseline make-sample-data --rows 200
//!
//! # Train and record a new run (becomes "latest")
//! ml-baseline train --data data/processed/features.csv --target is_high_value
//!
//! # Score a table with the latest run
//! ml-baseline predict --input data/new_users.csv --output output/predictions.csv
//!
//! # Inspect runs
//! ml-baseline list-runs
//! ml-baseline show-run --run latest --format json
//! ```
//!
//! # Exit Codes
//!
//! - 0: Success
//! - 1: Input broke the run's schema contract
//! - 3: Invalid configuration, arguments or input data
//! - 4: Run or run artifact not found
//! - 10: Internal error

mod cli;

use clap::Parser;
use cli::commands::LogFormat;
use cli::{run_cli, BaselineCli};
use tracing_subscriber::EnvFilter;

/// `RUST_LOG` wins unless `-v` is given; without either the level is WARN
fn log_filter(verbose: u8, rust_log: Option<&str>) -> EnvFilter {
    let filter = EnvFilter::new(rust_log.unwrap_or_default());
    if verbose == 0 && rust_log.is_some() {
        return filter;
    }
    let level = match verbose {
        0 => tracing::Level::WARN,
        1 => tracing::Level::INFO,
        _ => tracing::Level::DEBUG,
    };
    filter.add_directive(level.into())
}

fn init_tracing(verbose: u8, format: LogFormat) -> anyhow::Result<()> {
    let rust_log = std::env::var(EnvFilter::DEFAULT_ENV).ok();
    let filter = log_filter(verbose, rust_log.as_deref());
    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr);

    match format {
        LogFormat::Text => builder.try_init(),
        LogFormat::Json => builder.json().try_init(),
    }
    .map_err(|e| anyhow::anyhow!("{}", e))
}

fn main() {
    let cli = BaselineCli::parse();

    if let Err(e) = init_tracing(cli.verbose, cli.log_format) {
        eprintln!("warning: logging disabled: {}", e);
    }

    let exit_code = run_cli(cli);
    std::process::exit(exit_code.into());
}
