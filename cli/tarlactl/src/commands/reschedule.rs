//! Reschedule command.

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Result;
use chrono::NaiveDate;
use clap::Args;
use colored::Colorize;
use serde::Serialize;
use tarla_events::MissionRescheduledPayload;
use tarla_id::MissionId;
use tarla_scheduling::{
    CapacityAvailability, Mission, Pilot, RescheduleOutcome, RescheduleService, Subscription,
};

use crate::error::CliError;
use crate::output::{print_single, print_success, OutputFormat};
use crate::snapshot;

use super::CommandContext;

#[derive(Debug, Args)]
pub struct RescheduleCommand {
    /// Mission to move.
    #[arg(long)]
    mission: MissionId,

    /// Requested date (YYYY-MM-DD).
    #[arg(long)]
    date: NaiveDate,

    /// Subscription snapshot (JSON object).
    #[arg(long)]
    subscription: PathBuf,

    /// Missions snapshot (JSON array). Also the assignment load for the
    /// availability check.
    #[arg(long)]
    missions: PathBuf,

    /// Pilot roster snapshot (JSON array).
    #[arg(long)]
    pilots: PathBuf,

    /// On approval, write the new date and remaining tokens back.
    #[arg(long)]
    write: bool,
}

#[derive(Debug, Serialize)]
struct RescheduleReport {
    mission_id: MissionId,
    outcome: RescheduleOutcome,
    #[serde(skip_serializing_if = "Option::is_none")]
    event: Option<MissionRescheduledPayload>,
}

impl RescheduleCommand {
    pub fn run(self, ctx: CommandContext) -> Result<()> {
        let mut subscription: Subscription = snapshot::load(&self.subscription)?;
        let mut missions: Vec<Mission> = snapshot::load(&self.missions)?;
        let pilots: Vec<Pilot> = snapshot::load(&self.pilots)?;

        let mission = missions
            .iter()
            .find(|m| m.id == self.mission)
            .cloned()
            .ok_or_else(|| CliError::NotFound(format!("mission {} in {}", self.mission, self.missions.display())))?;

        let availability = CapacityAvailability::from_roster(&pilots, &missions);
        let service = RescheduleService::new(Arc::new(availability));
        let outcome = service.reschedule(&subscription, &mission, self.date);

        match ctx.format {
            OutputFormat::Table => print_outcome(&mission, &outcome),
            OutputFormat::Json => print_single(&RescheduleReport {
                mission_id: mission.id,
                outcome,
                event: outcome.rescheduled_event(&mission),
            }),
        }

        if let (true, RescheduleOutcome::Approved { new_date, tokens_remaining }) = (self.write, outcome) {
            subscription.reschedule_tokens_remaining = tokens_remaining;
            if let Some(stored) = missions.iter_mut().find(|m| m.id == mission.id) {
                stored.scheduled_date = new_date;
            }
            snapshot::store(&self.subscription, &subscription)?;
            snapshot::store(&self.missions, &missions)?;
            if ctx.format == OutputFormat::Table {
                print_success("Snapshots updated");
            }
        }

        Ok(())
    }
}

fn print_outcome(mission: &Mission, outcome: &RescheduleOutcome) {
    match outcome {
        RescheduleOutcome::Approved {
            new_date,
            tokens_remaining,
        } => println!(
            "{} {} {} -> {} ({} token(s) left)",
            "APPROVED".green().bold(),
            mission.id,
            mission.scheduled_date,
            new_date,
            tokens_remaining
        ),
        RescheduleOutcome::Denied { reason } => println!(
            "{} {} {}",
            "DENIED".red().bold(),
            mission.id,
            reason.code()
        ),
    }
}
