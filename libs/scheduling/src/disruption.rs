//! Cancellation of committed missions and hand-off to the replan queue.

use std::sync::Arc;

use tarla_events::{
    ActorType, CancelReason, DomainEvent, MissionCancelledPayload, MissionReplanQueuedPayload,
    ReplanReason,
};
use tarla_id::MissionId;
use thiserror::Error;
use tracing::{info, instrument};

use crate::error::{PortError, SchedulingError};
use crate::lifecycle::MissionStatus;
use crate::mission::Mission;
use crate::ports::{EventSink, MissionRepository, ReplanQueue, ReplanTask};

const SYSTEM_ACTOR: &str = "disruption_handler";

#[derive(Debug, Error)]
pub enum DisruptionError {
    #[error("mission not found: {0}")]
    MissionNotFound(MissionId),

    #[error(transparent)]
    Scheduling(#[from] SchedulingError),

    #[error(transparent)]
    Port(#[from] PortError),
}

/// What a cancellation produced.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CancelOutcome {
    pub cancelled: Mission,
    /// Planned replacement, present when the reason triggers a replan.
    pub successor: Option<Mission>,
    /// Absent when a resumed cancel finds the successor already assigned.
    pub task: Option<ReplanTask>,
}

pub struct DisruptionHandler {
    repository: Arc<dyn MissionRepository>,
    queue: Arc<dyn ReplanQueue>,
    events: Arc<dyn EventSink>,
    replan_queue: String,
}

impl DisruptionHandler {
    pub fn new(
        repository: Arc<dyn MissionRepository>,
        queue: Arc<dyn ReplanQueue>,
        events: Arc<dyn EventSink>,
        replan_queue: impl Into<String>,
    ) -> Self {
        Self {
            repository,
            queue,
            events,
            replan_queue: replan_queue.into(),
        }
    }

    /// Cancels a mission and, unless it was a no-show, queues a planned
    /// successor for replanning.
    ///
    /// Writes land before events: the cancelled mission, then the successor,
    /// then the queue push, then `mission.cancelled` and
    /// `mission.replan_queued`. Calling again after a partial failure resumes
    /// from the first missing step; an already cancelled mission is accepted
    /// and its stored successor reused.
    ///
    /// Weather blocks never touch the subscription's reschedule tokens.
    #[instrument(skip(self, cancelled_by), fields(%mission_id, %cancel_reason))]
    pub async fn cancel(
        &self,
        mission_id: MissionId,
        cancel_reason: CancelReason,
        cancelled_by: Option<String>,
        correlation_id: &str,
    ) -> Result<CancelOutcome, DisruptionError> {
        let mut mission = self
            .repository
            .get_mission(mission_id)
            .await?
            .ok_or(DisruptionError::MissionNotFound(mission_id))?;

        if mission.status == MissionStatus::Cancelled {
            info!("Mission already cancelled, resuming hand-off");
        } else {
            mission.cancel()?;
            self.repository.save_mission(&mission).await?;
        }

        let handoff = match cancel_reason.replan_reason() {
            Some(replan_reason) => Some((
                replan_reason,
                self.hand_off(&mission, replan_reason, correlation_id)
                    .await?,
            )),
            None => None,
        };

        let actor_type = actor_for(cancel_reason);
        let actor_id = cancelled_by.clone().unwrap_or_else(|| SYSTEM_ACTOR.to_string());
        self.events
            .emit(
                DomainEvent::MissionCancelled(MissionCancelledPayload {
                    mission_id,
                    cancel_reason,
                    cancelled_by,
                }),
                actor_type,
                &actor_id,
                correlation_id,
            )
            .await?;

        let Some((replan_reason, (successor, task))) = handoff else {
            info!("Mission cancelled without replan");
            return Ok(CancelOutcome {
                cancelled: mission,
                successor: None,
                task: None,
            });
        };

        self.events
            .emit(
                DomainEvent::MissionReplanQueued(MissionReplanQueuedPayload {
                    mission_id,
                    successor_id: successor.id,
                    replan_reason,
                }),
                ActorType::System,
                SYSTEM_ACTOR,
                correlation_id,
            )
            .await?;

        info!(
            successor_id = %successor.id,
            task_id = ?task.as_ref().map(|t| t.task_id.to_string()),
            %replan_reason,
            "Mission cancelled and queued for replan"
        );

        Ok(CancelOutcome {
            cancelled: mission,
            successor: Some(successor),
            task,
        })
    }

    /// Stores the successor (once) and queues it while it still needs a pilot.
    async fn hand_off(
        &self,
        cancelled: &Mission,
        replan_reason: ReplanReason,
        correlation_id: &str,
    ) -> Result<(Mission, Option<ReplanTask>), DisruptionError> {
        let successor = match self.repository.find_successor(cancelled.id).await? {
            Some(existing) => existing,
            None => {
                let successor = cancelled.successor();
                self.repository.save_mission(&successor).await?;
                successor
            }
        };

        if successor.status != MissionStatus::Planned || successor.assigned_pilot.is_some() {
            return Ok((successor, None));
        }

        let task = ReplanTask::new(successor.id, replan_reason, correlation_id);
        self.queue.push(&self.replan_queue, task.clone()).await?;
        Ok((successor, Some(task)))
    }
}

fn actor_for(reason: CancelReason) -> ActorType {
    match reason {
        CancelReason::AdminOverride => ActorType::Admin,
        CancelReason::PilotNotice => ActorType::User,
        CancelReason::WeatherBlock | CancelReason::NoShow => ActorType::System,
    }
}
