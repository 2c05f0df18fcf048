//! Replanner that re-runs the dispatcher for a single mission.

use std::sync::Arc;

use async_trait::async_trait;
use tarla_events::{ActorType, AssignmentSource, DomainEvent, MissionAssignedPayload, ReplanReason};
use tarla_id::{FieldId, MissionId, PilotId};
use tracing::{debug, info};

use crate::dispatch::AutoDispatcher;
use crate::error::ReplanError;
use crate::lifecycle::MissionStatus;
use crate::ports::{EventSink, MissionReplanner, MissionRepository};
use crate::policy::AssignmentPolicy;

/// Actor id recorded on events this replanner publishes.
pub const REPLANNER_ACTOR: &str = "replan_worker";

/// Loads the mission, matches it against the current roster and commits the
/// result.
///
/// - missing or terminal mission: permanent failure
/// - already assigned: `mission.assigned` is published again and the task
///   succeeds, so a delivery whose event failed after the commit still
///   produces the event
/// - further along than assigned: nothing to do
/// - no pilot in the territory: transient failure
pub struct DispatchReplanner {
    repository: Arc<dyn MissionRepository>,
    events: Arc<dyn EventSink>,
    dispatcher: AutoDispatcher,
}

impl DispatchReplanner {
    pub fn new(
        repository: Arc<dyn MissionRepository>,
        events: Arc<dyn EventSink>,
        dispatcher: AutoDispatcher,
    ) -> Self {
        Self {
            repository,
            events,
            dispatcher,
        }
    }
}

#[async_trait]
impl MissionReplanner for DispatchReplanner {
    async fn replan(
        &self,
        mission_id: MissionId,
        reason: ReplanReason,
        correlation_id: &str,
    ) -> Result<(), ReplanError> {
        let mission = self
            .repository
            .get_mission(mission_id)
            .await?
            .ok_or_else(|| ReplanError::Permanent(format!("mission {mission_id} not found")))?;

        if mission.is_terminal() {
            return Err(ReplanError::Permanent(format!(
                "mission {mission_id} is {}",
                mission.status
            )));
        }

        if let (MissionStatus::Assigned, Some(pilot_id)) = (mission.status, mission.assigned_pilot) {
            debug!(
                mission_id = %mission_id,
                pilot_id = %pilot_id,
                "Mission already assigned, republishing assignment"
            );
            let source = AssignmentPolicy::reassignment().source;
            return self
                .publish_assigned(mission_id, pilot_id, mission.field_id, source, correlation_id)
                .await;
        }

        if mission.status != MissionStatus::Planned {
            debug!(
                mission_id = %mission_id,
                status = %mission.status,
                "Mission already past assignment, nothing to replan"
            );
            return Ok(());
        }

        let pilots = self.repository.list_available_pilots().await?;
        let decision = self
            .dispatcher
            .dispatch_with(
                std::slice::from_ref(&mission),
                &pilots,
                &AssignmentPolicy::reassignment(),
            )
            .into_iter()
            .next()
            .ok_or_else(|| {
                ReplanError::Transient(format!(
                    "no pilot available in territory '{}'",
                    mission.territory
                ))
            })?;

        self.repository
            .mark_reassigned(decision.mission_id, decision.pilot_id)
            .await?;

        info!(
            mission_id = %mission_id,
            pilot_id = %decision.pilot_id,
            reason = %reason,
            correlation_id = %correlation_id,
            "Mission reassigned"
        );

        self.publish_assigned(
            mission_id,
            decision.pilot_id,
            mission.field_id,
            decision.policy.source,
            correlation_id,
        )
        .await
    }
}

impl DispatchReplanner {
    async fn publish_assigned(
        &self,
        mission_id: MissionId,
        pilot_id: PilotId,
        field_id: FieldId,
        assignment_source: AssignmentSource,
        correlation_id: &str,
    ) -> Result<(), ReplanError> {
        let event = DomainEvent::MissionAssigned(MissionAssignedPayload {
            mission_id,
            pilot_id,
            field_id,
            assignment_source,
        });
        self.events
            .emit(event, ActorType::System, REPLANNER_ACTOR, correlation_id)
            .await?;
        Ok(())
    }
}
