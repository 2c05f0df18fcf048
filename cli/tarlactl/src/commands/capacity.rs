//! Capacity query commands.

use std::path::PathBuf;

use anyhow::Result;
use chrono::NaiveDate;
use clap::Args;
use serde::Serialize;
use tabled::Tabled;
use tarla_id::PilotId;
use tarla_scheduling::{AvailabilitySlot, CapacityManager, Pilot, PilotAssignment, PilotCapacity};

use crate::error::CliError;
use crate::output::{print_output, print_single, OutputFormat};
use crate::snapshot;

use super::CommandContext;

/// Arguments shared by the capacity queries.
#[derive(Debug, Args)]
struct CapacityArgs {
    /// Pilot to query.
    #[arg(long)]
    pilot: PilotId,

    /// Pilot roster snapshot (JSON array).
    #[arg(long)]
    pilots: PathBuf,

    /// First day of the range (YYYY-MM-DD).
    #[arg(long)]
    from: NaiveDate,

    /// Last day of the range, inclusive.
    #[arg(long)]
    to: NaiveDate,

    /// Existing assignments snapshot (JSON array). Empty when omitted.
    #[arg(long)]
    assignments: Option<PathBuf>,
}

impl CapacityArgs {
    fn load(&self) -> Result<(PilotCapacity, Vec<PilotAssignment>), CliError> {
        let roster: Vec<Pilot> = snapshot::load(&self.pilots)?;
        let pilot = roster
            .iter()
            .find(|p| p.id() == self.pilot)
            .map(Pilot::capacity)
            .ok_or_else(|| CliError::NotFound(format!("pilot {} in {}", self.pilot, self.pilots.display())))?;

        let assignments = snapshot::load_or_default(self.assignments.as_deref())?;
        Ok((pilot, assignments))
    }
}

#[derive(Debug, Args)]
pub struct SlotsCommand {
    #[command(flatten)]
    args: CapacityArgs,
}

#[derive(Debug, Serialize, Tabled)]
struct SlotRow {
    #[tabled(rename = "Date")]
    date: NaiveDate,
    #[tabled(rename = "Weekday")]
    weekday: String,
    #[tabled(rename = "Remaining")]
    remaining_capacity: u32,
}

impl From<AvailabilitySlot> for SlotRow {
    fn from(slot: AvailabilitySlot) -> Self {
        Self {
            date: slot.date,
            weekday: chrono::Datelike::weekday(&slot.date).to_string(),
            remaining_capacity: slot.remaining_capacity,
        }
    }
}

impl SlotsCommand {
    pub fn run(self, ctx: CommandContext) -> Result<()> {
        let (pilot, assignments) = self.args.load()?;

        let slots = CapacityManager::new()
            .find_available_slots(&pilot, self.args.from, self.args.to, &assignments)
            .map_err(CliError::from)?;

        let rows: Vec<SlotRow> = slots.into_iter().map(SlotRow::from).collect();
        print_output(&rows, ctx.format);
        Ok(())
    }
}

#[derive(Debug, Args)]
pub struct UtilizationCommand {
    #[command(flatten)]
    args: CapacityArgs,
}

#[derive(Debug, Serialize)]
struct UtilizationReport {
    pilot_id: PilotId,
    from: NaiveDate,
    to: NaiveDate,
    utilization: f64,
}

impl UtilizationCommand {
    pub fn run(self, ctx: CommandContext) -> Result<()> {
        let (pilot, assignments) = self.args.load()?;

        let utilization = CapacityManager::new()
            .calculate_utilization(&pilot, self.args.from, self.args.to, &assignments)
            .map_err(CliError::from)?;

        match ctx.format {
            OutputFormat::Table => println!(
                "{} {} .. {}: {:.1}%",
                pilot.pilot_id,
                self.args.from,
                self.args.to,
                utilization * 100.0
            ),
            OutputFormat::Json => print_single(&UtilizationReport {
                pilot_id: pilot.pilot_id,
                from: self.args.from,
                to: self.args.to,
                utilization,
            }),
        }
        Ok(())
    }
}
