//! CLI commands.

mod capacity;
mod dispatch;
mod replan;
mod reschedule;
mod segment;

use anyhow::Result;
use clap::{Parser, Subcommand};
use tarla_scheduling::SchedulingConfig;

use crate::output::OutputFormat;

/// tarlactl - plan, dispatch and replan field-survey missions.
#[derive(Debug, Parser)]
#[command(name = "tarlactl")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Output format.
    #[arg(long, global = true, value_enum, default_value_t = OutputFormat::Table)]
    format: OutputFormat,

    /// Emit logs as JSON lines on stderr.
    #[arg(long, global = true, env = "TARLA_LOG_JSON")]
    log_json: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// Match unassigned missions to pilots in their territory.
    Dispatch(dispatch::DispatchCommand),

    /// Split a field area into capacity-bounded segments.
    Segment(segment::SegmentCommand),

    /// List the days a pilot still has capacity.
    Slots(capacity::SlotsCommand),

    /// Share of a pilot's capacity used over a date range.
    Utilization(capacity::UtilizationCommand),

    /// Check whether a mission can move to a new date.
    Reschedule(reschedule::RescheduleCommand),

    /// Drain replan tasks through the replan worker.
    Replan(replan::ReplanCommand),

    /// Show CLI version.
    Version,
}

impl Cli {
    pub fn log_json(&self) -> bool {
        self.log_json
    }

    /// Run the CLI command.
    pub async fn run(self, config: SchedulingConfig) -> Result<()> {
        let ctx = CommandContext {
            config,
            format: self.format,
        };

        match self.command {
            Commands::Dispatch(cmd) => cmd.run(ctx),
            Commands::Segment(cmd) => cmd.run(ctx),
            Commands::Slots(cmd) => cmd.run(ctx),
            Commands::Utilization(cmd) => cmd.run(ctx),
            Commands::Reschedule(cmd) => cmd.run(ctx),
            Commands::Replan(cmd) => cmd.run(ctx).await,
            Commands::Version => {
                println!("tarlactl {}", env!("CARGO_PKG_VERSION"));
                Ok(())
            }
        }
    }
}

/// Shared command context.
pub struct CommandContext {
    pub config: SchedulingConfig,
    pub format: OutputFormat,
}
