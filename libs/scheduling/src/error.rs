//! Error types for the scheduling engine.
//!
//! Three channels, kept apart:
//! - [`SchedulingError`]: invariant and validation failures, never retried.
//! - [`PortError`]: failures reported by injected collaborators.
//! - [`ReplanError`]: replanner failures, classified for the queue worker.
//!
//! Business denials (reschedule) are not errors; see `RescheduleOutcome`.

use chrono::NaiveDate;
use tarla_id::{MissionId, PilotId};
use thiserror::Error;

use crate::lifecycle::MissionStatus;

/// Result alias for engine operations.
pub type SchedulingResult<T> = Result<T, SchedulingError>;

/// Invariant and validation failures.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum SchedulingError {
    /// A capacity view with zero daily capacity reached the capacity manager.
    #[error("pilot {pilot_id} has non-positive daily capacity")]
    NonPositiveCapacity { pilot_id: PilotId },

    /// A date range whose start is after its end.
    #[error("invalid date range: start {start} is after end {end}")]
    InvalidDateRange { start: NaiveDate, end: NaiveDate },

    /// Work-day set is empty or longer than a six-day week.
    #[error("work days must contain 1 to {max} distinct days, got {count}")]
    InvalidWorkDays { count: usize, max: usize },

    /// Daily capacity outside the allowed band.
    #[error("daily capacity {capacity} donum is outside [{min}, {max}]")]
    CapacityOutOfRange { capacity: u32, min: u32, max: u32 },

    /// Seed quota larger than the daily capacity.
    #[error("seed quota {seed} donum exceeds daily capacity {capacity} donum")]
    SeedQuotaExceedsCapacity { seed: u32, capacity: u32 },

    /// Reliability score outside [0, 1] (or NaN).
    #[error("reliability score {0} is outside [0, 1]")]
    ReliabilityOutOfRange(f64),

    /// Registration without a province.
    #[error("pilot province cannot be empty")]
    EmptyProvince,

    /// Segmenter configured with a zero segment size.
    #[error("segment size must be positive")]
    ZeroSegmentSize,

    /// Status change not present in the lifecycle table.
    #[error("invalid status transition {from} -> {to}; allowed: [{}]", format_allowed(.allowed))]
    InvalidTransition {
        from: MissionStatus,
        to: MissionStatus,
        allowed: Vec<MissionStatus>,
    },

    /// Completion recorded for a mission nobody flew.
    #[error("mission {mission_id} has no assigned pilot")]
    MissingPilot { mission_id: MissionId },

    /// Assignment across territories.
    #[error("mission {mission_id} in '{mission_territory}' cannot go to pilot {pilot_id} in '{pilot_territory}'")]
    TerritoryMismatch {
        mission_id: MissionId,
        pilot_id: PilotId,
        mission_territory: String,
        pilot_territory: String,
    },
}

fn format_allowed(allowed: &[MissionStatus]) -> String {
    allowed
        .iter()
        .map(|s| s.as_str())
        .collect::<Vec<_>>()
        .join(", ")
}

impl SchedulingError {
    /// Returns true if the error is an internal invariant violation
    /// (5xx-class at an API boundary) rather than rejected input.
    pub fn is_internal(&self) -> bool {
        matches!(
            self,
            Self::NonPositiveCapacity { .. } | Self::InvalidDateRange { .. } | Self::ZeroSegmentSize
        )
    }
}

/// Failures reported by collaborator ports (queue, repository, planner, audit).
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum PortError {
    /// The backend could not be reached or timed out.
    #[error("backend unavailable: {0}")]
    Unavailable(String),

    /// The referenced record does not exist.
    #[error("not found: {0}")]
    NotFound(String),

    /// The backend refused the write.
    #[error("rejected: {0}")]
    Rejected(String),
}

impl PortError {
    /// Returns true if retrying the same call may succeed.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::Unavailable(_))
    }
}

/// Replanner failure, classified so the worker can requeue or dead-letter.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum ReplanError {
    /// May succeed on a later attempt (no pilot free yet, backend down).
    #[error("transient replan failure: {0}")]
    Transient(String),

    /// Will never succeed (mission gone, mission terminal, invariant broken).
    #[error("permanent replan failure: {0}")]
    Permanent(String),
}

impl ReplanError {
    pub fn is_transient(&self) -> bool {
        matches!(self, Self::Transient(_))
    }
}

impl From<PortError> for ReplanError {
    fn from(err: PortError) -> Self {
        if err.is_retryable() {
            Self::Transient(err.to_string())
        } else {
            Self::Permanent(err.to_string())
        }
    }
}

impl From<SchedulingError> for ReplanError {
    fn from(err: SchedulingError) -> Self {
        Self::Permanent(err.to_string())
    }
}
