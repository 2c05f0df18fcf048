//! Output formatting for CLI commands.

use colored::Colorize;
use serde::Serialize;
use tabled::{Table, Tabled};

/// Output format.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, clap::ValueEnum)]
pub enum OutputFormat {
    /// Human-readable table format.
    #[default]
    Table,
    /// JSON format.
    Json,
}

/// Print rows in the specified format.
pub fn print_output<T: Serialize + Tabled>(data: &[T], format: OutputFormat) {
    match format {
        OutputFormat::Table => {
            if data.is_empty() {
                println!("{}", "No items found.".dimmed());
            } else {
                println!("{}", Table::new(data));
            }
        }
        OutputFormat::Json => println!("{}", format_json(data)),
    }
}

/// Print a single item as JSON, whatever the format.
pub fn print_single<T: Serialize>(data: &T) {
    println!("{}", format_json(data));
}

pub fn print_success(message: &str) {
    println!("{} {}", "Success:".green().bold(), message);
}

pub fn print_info(message: &str) {
    println!("{} {}", "Info:".blue().bold(), message);
}

pub fn print_warning(message: &str) {
    println!("{} {}", "Warning:".yellow().bold(), message);
}

fn format_json<T: Serialize + ?Sized>(data: &T) -> String {
    // Serialization of our own types cannot fail; fall back to null if it ever does.
    serde_json::to_string_pretty(data).unwrap_or_else(|_| "null".to_string())
}

pub fn display_option<T: std::fmt::Display>(opt: &Option<T>) -> String {
    opt.as_ref()
        .map(|v| v.to_string())
        .unwrap_or_else(|| "-".to_string())
}
