//! Splitting oversized mission areas into capacity-bounded segments.

use tarla_id::MissionId;

use crate::error::{SchedulingError, SchedulingResult};
use crate::mission::MissionSegment;

/// Areas at or under this are flown as one segment.
pub const DEFAULT_SEGMENT_THRESHOLD_DONUM: u32 = 10_000;

/// Largest segment carved from an oversized area.
pub const DEFAULT_SEGMENT_SIZE_DONUM: u32 = 2_500;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PlanWindowSegmenter {
    threshold_donum: u32,
    segment_size_donum: u32,
}

impl Default for PlanWindowSegmenter {
    fn default() -> Self {
        Self {
            threshold_donum: DEFAULT_SEGMENT_THRESHOLD_DONUM,
            segment_size_donum: DEFAULT_SEGMENT_SIZE_DONUM,
        }
    }
}

impl PlanWindowSegmenter {
    pub fn new(threshold_donum: u32, segment_size_donum: u32) -> SchedulingResult<Self> {
        if segment_size_donum == 0 {
            return Err(SchedulingError::ZeroSegmentSize);
        }
        Ok(Self {
            threshold_donum,
            segment_size_donum,
        })
    }

    pub fn threshold_donum(&self) -> u32 {
        self.threshold_donum
    }

    pub fn segment_size_donum(&self) -> u32 {
        self.segment_size_donum
    }

    /// Splits `total_area_donum` into segments numbered from 1.
    ///
    /// At or under the threshold the whole area is a single segment.
    /// Otherwise segments of `segment_size` are carved off until the area is
    /// used up; the last one may be smaller. Segments come back unassigned.
    pub fn segment(&self, total_area_donum: u32) -> Vec<MissionSegment> {
        if total_area_donum <= self.threshold_donum {
            return vec![unassigned(1, total_area_donum)];
        }

        let mut segments = Vec::new();
        let mut remaining = total_area_donum;
        let mut seq = 1;
        while remaining > 0 {
            let area = remaining.min(self.segment_size_donum);
            segments.push(unassigned(seq, area));
            remaining -= area;
            seq += 1;
        }
        segments
    }

    /// Like [`segment`](Self::segment), with every segment linked to `mission_id`.
    pub fn segment_mission(&self, mission_id: MissionId, total_area_donum: u32) -> Vec<MissionSegment> {
        self.segment(total_area_donum)
            .into_iter()
            .map(|s| MissionSegment {
                mission_id: Some(mission_id),
                ..s
            })
            .collect()
    }
}

fn unassigned(seq: u32, area_donum: u32) -> MissionSegment {
    MissionSegment {
        mission_id: None,
        seq,
        area_donum,
        assigned_pilot: None,
    }
}
