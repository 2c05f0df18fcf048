//! Mission lifecycle state machine.
//!
//! ```text
//! PLANNED -> ASSIGNED -> ACKED -> FLOWN -> UPLOADED -> ANALYZING -> DONE
//!    |          |          |                                   \-> FAILED
//!    +----------+----------+--> CANCELLED
//! ```
//!
//! DONE, FAILED and CANCELLED are terminal.

use serde::{Deserialize, Serialize};

use crate::error::{SchedulingError, SchedulingResult};

/// Status of a mission.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum MissionStatus {
    #[default]
    Planned,
    Assigned,
    Acked,
    Flown,
    Uploaded,
    Analyzing,
    Done,
    Failed,
    Cancelled,
}

impl MissionStatus {
    /// Every status, in lifecycle order.
    pub const ALL: [MissionStatus; 9] = [
        Self::Planned,
        Self::Assigned,
        Self::Acked,
        Self::Flown,
        Self::Uploaded,
        Self::Analyzing,
        Self::Done,
        Self::Failed,
        Self::Cancelled,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Planned => "PLANNED",
            Self::Assigned => "ASSIGNED",
            Self::Acked => "ACKED",
            Self::Flown => "FLOWN",
            Self::Uploaded => "UPLOADED",
            Self::Analyzing => "ANALYZING",
            Self::Done => "DONE",
            Self::Failed => "FAILED",
            Self::Cancelled => "CANCELLED",
        }
    }

    /// Statuses reachable in one step.
    pub fn allowed_transitions(&self) -> &'static [MissionStatus] {
        use MissionStatus::*;

        match self {
            Planned => &[Assigned, Cancelled],
            Assigned => &[Acked, Cancelled],
            Acked => &[Flown, Cancelled],
            Flown => &[Uploaded],
            Uploaded => &[Analyzing],
            Analyzing => &[Done, Failed],
            Done | Failed | Cancelled => &[],
        }
    }

    pub fn can_transition_to(&self, next: MissionStatus) -> bool {
        self.allowed_transitions().contains(&next)
    }

    /// Returns the next status, or an error naming the attempted transition
    /// and the allowed set.
    pub fn transition_to(self, next: MissionStatus) -> SchedulingResult<MissionStatus> {
        if self.can_transition_to(next) {
            Ok(next)
        } else {
            Err(SchedulingError::InvalidTransition {
                from: self,
                to: next,
                allowed: self.allowed_transitions().to_vec(),
            })
        }
    }

    pub fn is_terminal(&self) -> bool {
        self.allowed_transitions().is_empty()
    }
}

impl std::fmt::Display for MissionStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}
