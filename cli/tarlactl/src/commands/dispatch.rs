//! Dispatch command.

use std::collections::HashMap;
use std::path::PathBuf;

use anyhow::Result;
use clap::Args;
use serde::Serialize;
use tabled::Tabled;
use tarla_scheduling::{AutoDispatcher, DispatchDecision, Mission, MissionStatus, Pilot};

use crate::output::{print_info, print_output, print_success, print_warning, OutputFormat};
use crate::snapshot;

use super::CommandContext;

#[derive(Debug, Args)]
pub struct DispatchCommand {
    /// Missions snapshot (JSON array).
    #[arg(long)]
    missions: PathBuf,

    /// Pilot roster snapshot (JSON array).
    #[arg(long)]
    pilots: PathBuf,

    /// Write the missions back with the decisions applied.
    #[arg(long)]
    write: bool,
}

#[derive(Debug, Serialize, Tabled)]
struct DecisionRow {
    #[tabled(rename = "Mission")]
    mission_id: String,
    #[tabled(rename = "Territory")]
    territory: String,
    #[tabled(rename = "Pilot")]
    pilot_id: String,
    #[tabled(rename = "Reliability")]
    reliability: String,
    #[tabled(rename = "Source")]
    source: String,
    #[tabled(rename = "Reason")]
    reason: String,
}

impl DispatchCommand {
    pub fn run(self, ctx: CommandContext) -> Result<()> {
        let mut missions: Vec<Mission> = snapshot::load(&self.missions)?;
        let pilots: Vec<Pilot> = snapshot::load(&self.pilots)?;

        let open: Vec<Mission> = missions
            .iter()
            .filter(|m| m.status == MissionStatus::Planned && m.assigned_pilot.is_none())
            .cloned()
            .collect();

        let decisions = AutoDispatcher::new().dispatch(&open, &pilots);
        let rows = decision_rows(&open, &pilots, &decisions);
        print_output(&rows, ctx.format);

        if ctx.format == OutputFormat::Table {
            let unmatched = open.len() - decisions.len();
            if unmatched > 0 {
                print_warning(&format!(
                    "{unmatched} mission(s) have no pilot in their territory"
                ));
            }
        }

        if self.write {
            let by_mission: HashMap<_, _> = decisions
                .iter()
                .map(|d| (d.mission_id, d.pilot_id))
                .collect();
            for mission in missions.iter_mut() {
                if let Some(pilot_id) = by_mission.get(&mission.id) {
                    mission.assign(*pilot_id)?;
                }
            }
            snapshot::store(&self.missions, &missions)?;
            if ctx.format == OutputFormat::Table {
                print_success(&format!(
                    "Wrote {} assignment(s) to {}",
                    decisions.len(),
                    self.missions.display()
                ));
            }
        } else if ctx.format == OutputFormat::Table && !decisions.is_empty() {
            print_info("Dry run. Pass --write to commit the assignments.");
        }

        Ok(())
    }
}

fn decision_rows(missions: &[Mission], pilots: &[Pilot], decisions: &[DispatchDecision]) -> Vec<DecisionRow> {
    let missions: HashMap<_, _> = missions.iter().map(|m| (m.id, m)).collect();
    let pilots: HashMap<_, _> = pilots.iter().map(|p| (p.id(), p)).collect();

    decisions
        .iter()
        .map(|d| DecisionRow {
            mission_id: d.mission_id.to_string(),
            territory: missions
                .get(&d.mission_id)
                .map(|m| m.territory.clone())
                .unwrap_or_default(),
            pilot_id: d.pilot_id.to_string(),
            reliability: pilots
                .get(&d.pilot_id)
                .map(|p| format!("{:.2}", p.reliability().value()))
                .unwrap_or_default(),
            source: d.policy.source.to_string(),
            reason: d.policy.reason.to_string(),
        })
        .collect()
}
