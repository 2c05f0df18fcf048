//! Segment command.

use anyhow::Result;
use clap::Args;
use serde::Serialize;
use tabled::Tabled;
use tarla_id::MissionId;
use tarla_scheduling::MissionSegment;

use crate::error::CliError;
use crate::output::{display_option, print_info, print_output, OutputFormat};

use super::CommandContext;

#[derive(Debug, Args)]
pub struct SegmentCommand {
    /// Total field area in donum.
    area: u32,

    /// Tag every segment with this mission.
    #[arg(long)]
    mission: Option<MissionId>,
}

#[derive(Debug, Serialize, Tabled)]
struct SegmentRow {
    #[tabled(rename = "Seq")]
    seq: u32,
    #[tabled(rename = "Area (donum)")]
    area_donum: u32,
    #[tabled(rename = "Mission", display = "display_option")]
    mission_id: Option<MissionId>,
}

impl From<MissionSegment> for SegmentRow {
    fn from(segment: MissionSegment) -> Self {
        Self {
            seq: segment.seq,
            area_donum: segment.area_donum,
            mission_id: segment.mission_id,
        }
    }
}

impl SegmentCommand {
    pub fn run(self, ctx: CommandContext) -> Result<()> {
        let segmenter = ctx.config.segmenter().map_err(CliError::from)?;

        let segments = match self.mission {
            Some(mission_id) => segmenter.segment_mission(mission_id, self.area),
            None => segmenter.segment(self.area),
        };

        if ctx.format == OutputFormat::Table && segments.len() == 1 {
            print_info(&format!(
                "{} donum is within the {} donum threshold; no split needed.",
                self.area,
                segmenter.threshold_donum()
            ));
        }

        let rows: Vec<SegmentRow> = segments.into_iter().map(SegmentRow::from).collect();
        print_output(&rows, ctx.format);
        Ok(())
    }
}
