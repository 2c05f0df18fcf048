//! Error handling and display for the CLI.

use std::path::PathBuf;

use colored::Colorize;
use tarla_scheduling::{ConfigError, SchedulingError};
use thiserror::Error;

/// CLI-specific errors.
#[derive(Debug, Error)]
pub enum CliError {
    #[error("Cannot read snapshot {path}: {source}")]
    SnapshotRead {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Invalid snapshot {path}: {source}")]
    SnapshotParse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("Cannot write snapshot {path}: {source}")]
    SnapshotWrite {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Not found: {0}")]
    NotFound(String),

    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Scheduling(#[from] SchedulingError),
}

/// Print an error in a user-friendly format.
pub fn print_error(err: &anyhow::Error) {
    eprintln!("{} {}", "Error:".red().bold(), err);

    let Some(cli_err) = err.downcast_ref::<CliError>() else {
        return;
    };

    match cli_err {
        CliError::SnapshotRead { .. } => {
            eprintln!("\n{}", "Hint: Check the file path and permissions.".yellow());
        }
        CliError::SnapshotParse { source, .. } => {
            eprintln!(
                "\n{}",
                format!(
                    "Hint: Line {}, column {}. Ids carry their prefix (msn_, plt_, ...); dates are YYYY-MM-DD.",
                    source.line(),
                    source.column()
                )
                .yellow()
            );
        }
        CliError::Config(ConfigError::Invalid { var, .. }) => {
            eprintln!("\n{}", format!("Hint: Unset {var} to use the default.").yellow());
        }
        CliError::Scheduling(e) if e.is_internal() => {
            eprintln!(
                "\n{}",
                "Hint: This is an invariant violation in the input snapshot, not a business outcome."
                    .yellow()
            );
        }
        _ => {}
    }
}
