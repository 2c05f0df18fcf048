//! Voluntary, token-consuming date changes.
//!
//! Weather-forced changes never come through here; they go through the
//! disruption flow and leave the token budget alone.

use std::collections::HashMap;
use std::sync::Arc;

use chrono::NaiveDate;
use serde::Serialize;
use tarla_events::MissionRescheduledPayload;
use tarla_id::PilotId;
use tracing::{debug, warn};

use crate::capacity::{CapacityManager, PilotAssignment};
use crate::mission::{Mission, Subscription};
use crate::pilot::{Pilot, PilotCapacity};
use crate::ports::PilotAvailability;

/// Why a reschedule request was refused. Codes render verbatim.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum DenialReason {
    NoTokens,
    OutOfWindow,
    PilotNotAvailable,
}

impl DenialReason {
    pub fn code(&self) -> &'static str {
        match self {
            Self::NoTokens => "NO_TOKENS",
            Self::OutOfWindow => "OUT_OF_WINDOW",
            Self::PilotNotAvailable => "PILOT_NOT_AVAILABLE",
        }
    }
}

impl std::fmt::Display for DenialReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.code())
    }
}

/// Result of a reschedule request. Persisting an approval is the caller's job.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum RescheduleOutcome {
    Approved {
        new_date: NaiveDate,
        tokens_remaining: u32,
    },
    Denied {
        reason: DenialReason,
    },
}

impl RescheduleOutcome {
    pub fn is_ok(&self) -> bool {
        matches!(self, Self::Approved { .. })
    }

    /// `OK` for approvals, the denial code otherwise.
    pub fn reason_code(&self) -> &'static str {
        match self {
            Self::Approved { .. } => "OK",
            Self::Denied { reason } => reason.code(),
        }
    }

    /// Event describing an approved change of `mission`, `None` if denied.
    pub fn rescheduled_event(&self, mission: &Mission) -> Option<MissionRescheduledPayload> {
        match *self {
            Self::Approved {
                new_date,
                tokens_remaining,
            } => Some(MissionRescheduledPayload {
                mission_id: mission.id,
                previous_date: mission.scheduled_date,
                new_date,
                tokens_remaining: Some(tokens_remaining),
                weather_forced: false,
            }),
            Self::Denied { .. } => None,
        }
    }
}

/// Validates voluntary date changes against the token budget, the windows
/// and the assigned pilot's availability.
#[derive(Clone)]
pub struct RescheduleService {
    availability: Arc<dyn PilotAvailability>,
}

impl RescheduleService {
    pub fn new(availability: Arc<dyn PilotAvailability>) -> Self {
        Self { availability }
    }

    /// Checks, in order: tokens left, date inside both the subscription and
    /// mission windows, assigned pilot free on the new date.
    pub fn reschedule(
        &self,
        subscription: &Subscription,
        mission: &Mission,
        new_date: NaiveDate,
    ) -> RescheduleOutcome {
        if !subscription.has_tokens() {
            return denied(mission, DenialReason::NoTokens);
        }

        if !subscription.window.contains(new_date) || !mission.window.contains(new_date) {
            return denied(mission, DenialReason::OutOfWindow);
        }

        if let Some(pilot_id) = mission.assigned_pilot {
            if !self.availability.is_available(pilot_id, new_date) {
                return denied(mission, DenialReason::PilotNotAvailable);
            }
        }

        let tokens_remaining = subscription.reschedule_tokens_remaining - 1;
        debug!(
            mission_id = %mission.id,
            %new_date,
            tokens_remaining,
            "Reschedule approved"
        );

        RescheduleOutcome::Approved {
            new_date,
            tokens_remaining,
        }
    }
}

fn denied(mission: &Mission, reason: DenialReason) -> RescheduleOutcome {
    debug!(mission_id = %mission.id, reason = %reason, "Reschedule denied");
    RescheduleOutcome::Denied { reason }
}

/// Availability backed by the capacity manager over a fixed snapshot.
///
/// Unknown pilots are never available.
#[derive(Debug, Clone, Default)]
pub struct CapacityAvailability {
    manager: CapacityManager,
    pilots: HashMap<PilotId, PilotCapacity>,
    assignments: Vec<PilotAssignment>,
}

impl CapacityAvailability {
    pub fn new(pilots: impl IntoIterator<Item = PilotCapacity>, assignments: Vec<PilotAssignment>) -> Self {
        Self {
            manager: CapacityManager::new(),
            pilots: pilots.into_iter().map(|p| (p.pilot_id, p)).collect(),
            assignments,
        }
    }

    /// Builds the snapshot from a roster and the missions they hold.
    ///
    /// Each mission still holding capacity weighs its area in donum, so a
    /// pilot's day fills up against the donum capacity of their schedule.
    pub fn from_roster(pilots: &[Pilot], missions: &[Mission]) -> Self {
        let assignments = missions
            .iter()
            .filter(|m| m.holds_capacity())
            .filter_map(|m| {
                m.assigned_pilot.map(|pilot_id| {
                    PilotAssignment::new(pilot_id, m.id, m.scheduled_date).weighted(m.area_donum)
                })
            })
            .collect();

        Self::new(pilots.iter().map(Pilot::capacity), assignments)
    }
}

impl PilotAvailability for CapacityAvailability {
    fn is_available(&self, pilot_id: PilotId, date: NaiveDate) -> bool {
        let Some(pilot) = self.pilots.get(&pilot_id) else {
            return false;
        };

        match self.manager.check_availability(pilot, date, &self.assignments) {
            Ok(check) => check.available,
            Err(e) => {
                warn!(pilot_id = %pilot_id, error = %e, "Capacity check failed");
                false
            }
        }
    }
}
