//! Missions, segments and subscriptions.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use tarla_events::MissionCompletedPayload;
use tarla_id::{FieldId, MissionId, PilotId, SubscriptionId};

use crate::error::{SchedulingError, SchedulingResult};
use crate::lifecycle::MissionStatus;

/// Inclusive date range a mission may be flown in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "WindowRecord")]
pub struct ScheduleWindow {
    start: NaiveDate,
    end: NaiveDate,
}

#[derive(Deserialize)]
struct WindowRecord {
    start: NaiveDate,
    end: NaiveDate,
}

impl TryFrom<WindowRecord> for ScheduleWindow {
    type Error = SchedulingError;

    fn try_from(record: WindowRecord) -> Result<Self, Self::Error> {
        Self::new(record.start, record.end)
    }
}

impl ScheduleWindow {
    pub fn new(start: NaiveDate, end: NaiveDate) -> SchedulingResult<Self> {
        if start > end {
            return Err(SchedulingError::InvalidDateRange { start, end });
        }
        Ok(Self { start, end })
    }

    pub fn start(&self) -> NaiveDate {
        self.start
    }

    pub fn end(&self) -> NaiveDate {
        self.end
    }

    pub fn contains(&self, date: NaiveDate) -> bool {
        self.start <= date && date <= self.end
    }
}

impl std::fmt::Display for ScheduleWindow {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "[{}, {}]", self.start, self.end)
    }
}

/// A single survey flight over one field on one date.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Mission {
    pub id: MissionId,
    pub territory: String,
    pub field_id: FieldId,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub subscription_id: Option<SubscriptionId>,
    pub scheduled_date: NaiveDate,
    pub window: ScheduleWindow,
    pub area_donum: u32,
    pub crop_type: String,
    pub analysis_type: String,
    #[serde(default)]
    pub status: MissionStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub assigned_pilot: Option<PilotId>,
    /// The cancelled mission this one was planned to replace.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub replaces: Option<MissionId>,
}

impl Mission {
    /// A freshly planned mission: no pilot, status PLANNED.
    pub fn planned(
        territory: impl Into<String>,
        field_id: FieldId,
        scheduled_date: NaiveDate,
        window: ScheduleWindow,
        area_donum: u32,
    ) -> Self {
        Self {
            id: MissionId::new(),
            territory: territory.into(),
            field_id,
            subscription_id: None,
            scheduled_date,
            window,
            area_donum,
            crop_type: String::new(),
            analysis_type: String::new(),
            status: MissionStatus::Planned,
            assigned_pilot: None,
            replaces: None,
        }
    }

    /// A new PLANNED mission covering the same field, area and window.
    ///
    /// Cancelled missions are terminal; replanning happens on the successor.
    pub fn successor(&self) -> Self {
        Self {
            id: MissionId::new(),
            status: MissionStatus::Planned,
            assigned_pilot: None,
            replaces: Some(self.id),
            ..self.clone()
        }
    }

    pub fn with_subscription(mut self, subscription_id: SubscriptionId) -> Self {
        self.subscription_id = Some(subscription_id);
        self
    }

    pub fn with_analysis(
        mut self,
        crop_type: impl Into<String>,
        analysis_type: impl Into<String>,
    ) -> Self {
        self.crop_type = crop_type.into();
        self.analysis_type = analysis_type.into();
        self
    }

    pub fn is_terminal(&self) -> bool {
        self.status.is_terminal()
    }

    /// Moves the mission through the lifecycle table.
    pub fn transition(&mut self, next: MissionStatus) -> SchedulingResult<()> {
        self.status = self.status.transition_to(next)?;
        Ok(())
    }

    /// PLANNED -> ASSIGNED with the given pilot.
    pub fn assign(&mut self, pilot_id: PilotId) -> SchedulingResult<()> {
        self.transition(MissionStatus::Assigned)?;
        self.assigned_pilot = Some(pilot_id);
        Ok(())
    }

    /// Moves to CANCELLED. The pilot stays on record; cancelled missions
    /// no longer count against capacity.
    pub fn cancel(&mut self) -> SchedulingResult<()> {
        self.transition(MissionStatus::Cancelled)
    }

    /// ANALYZING -> DONE. Returns the `mission.completed` payload crediting
    /// the pilot who flew it. The mission is left unchanged on error.
    pub fn complete(&mut self) -> SchedulingResult<MissionCompletedPayload> {
        let pilot_id = self
            .assigned_pilot
            .ok_or(SchedulingError::MissingPilot { mission_id: self.id })?;
        self.transition(MissionStatus::Done)?;

        Ok(MissionCompletedPayload {
            mission_id: self.id,
            pilot_id,
        })
    }

    /// Whether the mission still occupies its pilot's day.
    pub fn holds_capacity(&self) -> bool {
        self.assigned_pilot.is_some() && !matches!(self.status, MissionStatus::Cancelled)
    }
}

/// A capacity-bounded slice of an oversized mission.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MissionSegment {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mission_id: Option<MissionId>,
    /// Starts at 1.
    pub seq: u32,
    pub area_donum: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub assigned_pilot: Option<PilotId>,
}

/// A seasonal subscription with a budget of voluntary date changes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Subscription {
    pub id: SubscriptionId,
    pub reschedule_tokens_remaining: u32,
    pub window: ScheduleWindow,
}

/// Tokens a new subscription starts with.
pub const DEFAULT_RESCHEDULE_TOKENS: u32 = 2;

impl Subscription {
    pub fn new(window: ScheduleWindow, reschedule_tokens: u32) -> Self {
        Self {
            id: SubscriptionId::new(),
            reschedule_tokens_remaining: reschedule_tokens,
            window,
        }
    }

    /// Subscription with the default token budget.
    pub fn seasonal(window: ScheduleWindow) -> Self {
        Self::new(window, DEFAULT_RESCHEDULE_TOKENS)
    }

    pub fn has_tokens(&self) -> bool {
        self.reschedule_tokens_remaining > 0
    }
}
