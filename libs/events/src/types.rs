//! Event type definitions for mission and pilot events.
//!
//! Each event type has a corresponding payload struct with the event-specific data.

use chrono::{NaiveDate, Weekday};
use serde::{Deserialize, Serialize};
use tarla_id::{FieldId, MissionId, PilotId};

use crate::EventError;

// =============================================================================
// Event Type Constants
// =============================================================================

/// All event type names as constants.
pub mod event_types {
    // Mission
    pub const MISSION_ASSIGNED: &str = "mission.assigned";
    pub const MISSION_CANCELLED: &str = "mission.cancelled";
    pub const MISSION_REPLAN_QUEUED: &str = "mission.replan_queued";
    pub const MISSION_RESCHEDULED: &str = "mission.rescheduled";
    pub const MISSION_COMPLETED: &str = "mission.completed";

    // Pilot
    pub const PILOT_CAPACITY_UPDATED: &str = "pilot.capacity_updated";
}

// =============================================================================
// Reason and Source Enums
// =============================================================================

/// Which share of a pilot's daily capacity an assignment draws from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AssignmentSource {
    /// Mandatory system-assigned work (seed quota).
    SystemSeed,
    /// Farmer or pilot initiated work (pull quota).
    Pull,
}

impl AssignmentSource {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::SystemSeed => "SYSTEM_SEED",
            Self::Pull => "PULL",
        }
    }
}

impl std::fmt::Display for AssignmentSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Why a committed mission was cancelled.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CancelReason {
    WeatherBlock,
    PilotNotice,
    AdminOverride,
    NoShow,
}

impl CancelReason {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::WeatherBlock => "weather_block",
            Self::PilotNotice => "pilot_notice",
            Self::AdminOverride => "admin_override",
            Self::NoShow => "no_show",
        }
    }

    /// The replan reason this cancellation feeds into, if it is replanned at all.
    ///
    /// A no-show is closed out without a replan.
    pub fn replan_reason(&self) -> Option<ReplanReason> {
        match self {
            Self::WeatherBlock => Some(ReplanReason::WeatherBlock),
            Self::PilotNotice => Some(ReplanReason::PilotCancel),
            Self::AdminOverride => Some(ReplanReason::AdminOverride),
            Self::NoShow => None,
        }
    }
}

impl std::fmt::Display for CancelReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Reason code carried by a replan queue task.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ReplanReason {
    WeatherBlock,
    PilotCancel,
    AdminOverride,
}

impl ReplanReason {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::WeatherBlock => "WEATHER_BLOCK",
            Self::PilotCancel => "PILOT_CANCEL",
            Self::AdminOverride => "ADMIN_OVERRIDE",
        }
    }
}

impl std::fmt::Display for ReplanReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

// =============================================================================
// Event Payloads
// =============================================================================

// -----------------------------------------------------------------------------
// Mission Events
// -----------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MissionAssignedPayload {
    pub mission_id: MissionId,
    pub pilot_id: PilotId,
    pub field_id: FieldId,
    pub assignment_source: AssignmentSource,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MissionCancelledPayload {
    pub mission_id: MissionId,
    pub cancel_reason: CancelReason,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cancelled_by: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MissionReplanQueuedPayload {
    /// The cancelled mission.
    pub mission_id: MissionId,
    /// The planned mission that takes its place in the replan queue.
    pub successor_id: MissionId,
    pub replan_reason: ReplanReason,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MissionRescheduledPayload {
    pub mission_id: MissionId,
    pub previous_date: NaiveDate,
    pub new_date: NaiveDate,
    /// Remaining tokens after a voluntary reschedule; absent when weather forced.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tokens_remaining: Option<u32>,
    pub weather_forced: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MissionCompletedPayload {
    pub mission_id: MissionId,
    pub pilot_id: PilotId,
}

// -----------------------------------------------------------------------------
// Pilot Events
// -----------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PilotCapacityUpdatedPayload {
    pub pilot_id: PilotId,
    pub work_days: Vec<Weekday>,
    pub daily_capacity_donum: u32,
    pub seed_quota_donum: u32,
}

// =============================================================================
// Typed Event Union
// =============================================================================

/// Any event the scheduling engine emits.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum DomainEvent {
    MissionAssigned(MissionAssignedPayload),
    MissionCancelled(MissionCancelledPayload),
    MissionReplanQueued(MissionReplanQueuedPayload),
    MissionRescheduled(MissionRescheduledPayload),
    MissionCompleted(MissionCompletedPayload),
    PilotCapacityUpdated(PilotCapacityUpdatedPayload),
}

impl DomainEvent {
    /// The `event_type` string written to the envelope.
    pub fn event_type(&self) -> &'static str {
        match self {
            Self::MissionAssigned(_) => event_types::MISSION_ASSIGNED,
            Self::MissionCancelled(_) => event_types::MISSION_CANCELLED,
            Self::MissionReplanQueued(_) => event_types::MISSION_REPLAN_QUEUED,
            Self::MissionRescheduled(_) => event_types::MISSION_RESCHEDULED,
            Self::MissionCompleted(_) => event_types::MISSION_COMPLETED,
            Self::PilotCapacityUpdated(_) => event_types::PILOT_CAPACITY_UPDATED,
        }
    }

    /// The aggregate the event belongs to, as (type, id).
    pub fn aggregate(&self) -> (crate::AggregateType, String) {
        use crate::AggregateType;

        match self {
            Self::MissionAssigned(p) => (AggregateType::Mission, p.mission_id.to_string()),
            Self::MissionCancelled(p) => (AggregateType::Mission, p.mission_id.to_string()),
            Self::MissionReplanQueued(p) => (AggregateType::Mission, p.mission_id.to_string()),
            Self::MissionRescheduled(p) => (AggregateType::Mission, p.mission_id.to_string()),
            Self::MissionCompleted(p) => (AggregateType::Mission, p.mission_id.to_string()),
            Self::PilotCapacityUpdated(p) => (AggregateType::Pilot, p.pilot_id.to_string()),
        }
    }

    /// Decodes a stored payload using its envelope `event_type`.
    ///
    /// The payload is untagged on the wire, so the event type is what selects
    /// the payload struct.
    pub fn decode(event_type: &str, payload: serde_json::Value) -> Result<Self, EventError> {
        let event = match event_type {
            event_types::MISSION_ASSIGNED => Self::MissionAssigned(serde_json::from_value(payload)?),
            event_types::MISSION_CANCELLED => {
                Self::MissionCancelled(serde_json::from_value(payload)?)
            }
            event_types::MISSION_REPLAN_QUEUED => {
                Self::MissionReplanQueued(serde_json::from_value(payload)?)
            }
            event_types::MISSION_RESCHEDULED => {
                Self::MissionRescheduled(serde_json::from_value(payload)?)
            }
            event_types::MISSION_COMPLETED => {
                Self::MissionCompleted(serde_json::from_value(payload)?)
            }
            event_types::PILOT_CAPACITY_UPDATED => {
                Self::PilotCapacityUpdated(serde_json::from_value(payload)?)
            }
            other => return Err(EventError::UnknownEventType(other.to_string())),
        };
        Ok(event)
    }
}

// =============================================================================
// Tests
// =============================================================================
