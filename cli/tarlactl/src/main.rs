//! tarlactl - operator CLI for the field-survey scheduling engine.
//!
//! Runs the engine over JSON snapshot files: dispatch, segmentation,
//! capacity queries, reschedule checks and replan queue drains.

use anyhow::Result;
use clap::Parser;
use tarla_scheduling::SchedulingConfig;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

mod commands;
mod error;
mod output;
mod snapshot;

use commands::Cli;

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let config = match SchedulingConfig::from_env() {
        Ok(config) => config,
        Err(e) => {
            error::print_error(&error::CliError::from(e).into());
            std::process::exit(2);
        }
    };

    // Logs go to stderr so table and JSON output stay clean on stdout.
    // RUST_LOG wins over TARLA_LOG_LEVEL.
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| config.log_level.clone().into());
    let registry = tracing_subscriber::registry().with(filter);
    if cli.log_json() {
        registry
            .with(tracing_subscriber::fmt::layer().json().with_writer(std::io::stderr))
            .init();
    } else {
        registry
            .with(tracing_subscriber::fmt::layer().compact().with_writer(std::io::stderr))
            .init();
    }

    if let Err(e) = cli.run(config).await {
        error::print_error(&e);
        std::process::exit(1);
    }

    Ok(())
}
