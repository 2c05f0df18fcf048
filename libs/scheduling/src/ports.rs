//! Collaborator ports the engine consumes.
//!
//! Storage, the durable queue, the weekly planner and the audit log live
//! outside this crate. Everything the engine needs from them is expressed
//! here and injected through constructors.

use async_trait::async_trait;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use tarla_events::{ActorType, DomainEvent, EventEnvelope, ReplanReason};
use tarla_id::{MissionId, PilotId, ReplanTaskId};

use crate::error::{PortError, ReplanError};
use crate::mission::Mission;
use crate::pilot::Pilot;

/// Outcome written by the weekly job when the planner returns.
pub const JOB_OUTCOME_SUCCESS: &str = "SUCCESS";

/// A unit of replanning work pulled from the durable queue.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReplanTask {
    pub task_id: ReplanTaskId,
    pub mission_id: MissionId,
    pub reason: ReplanReason,
    pub correlation_id: String,
}

impl ReplanTask {
    pub fn new(mission_id: MissionId, reason: ReplanReason, correlation_id: impl Into<String>) -> Self {
        Self {
            task_id: ReplanTaskId::new(),
            mission_id,
            reason,
            correlation_id: correlation_id.into(),
        }
    }
}

/// Durable queue client.
///
/// `pop` returns `None` when the queue is empty rather than blocking.
#[async_trait]
pub trait ReplanQueue: Send + Sync {
    async fn pop(&self, queue: &str) -> Result<Option<ReplanTask>, PortError>;

    async fn ack(&self, queue: &str, task_id: ReplanTaskId) -> Result<(), PortError>;

    /// Negative acknowledgement. With `requeue` the task becomes poppable
    /// again; without it the task is dead-lettered.
    async fn nack(&self, queue: &str, task_id: ReplanTaskId, requeue: bool) -> Result<(), PortError>;

    async fn push(&self, queue: &str, task: ReplanTask) -> Result<(), PortError>;
}

/// Re-matches one disrupted mission.
#[async_trait]
pub trait MissionReplanner: Send + Sync {
    async fn replan(
        &self,
        mission_id: MissionId,
        reason: ReplanReason,
        correlation_id: &str,
    ) -> Result<(), ReplanError>;
}

/// Produces a full week's schedule. Returns the number of missions planned.
#[async_trait]
pub trait WeeklyPlanner: Send + Sync {
    async fn plan_week(&self, week_start: NaiveDate, correlation_id: &str) -> Result<u32, PortError>;
}

/// Append-only job log.
#[async_trait]
pub trait AuditWriter: Send + Sync {
    async fn append_job_log(
        &self,
        correlation_id: &str,
        outcome: &str,
        affected_count: u32,
    ) -> Result<(), PortError>;
}

/// Answers whether a pilot can take work on a date.
pub trait PilotAvailability: Send + Sync {
    fn is_available(&self, pilot_id: PilotId, date: NaiveDate) -> bool;
}

/// Mission and pilot storage.
#[async_trait]
pub trait MissionRepository: Send + Sync {
    /// Missions waiting for a (new) pilot.
    async fn list_reassign_queue(&self) -> Result<Vec<Mission>, PortError>;

    /// Pilots that may receive work right now.
    async fn list_available_pilots(&self) -> Result<Vec<Pilot>, PortError>;

    /// Commits an assignment and takes the mission off the reassign queue.
    async fn mark_reassigned(&self, mission_id: MissionId, pilot_id: PilotId) -> Result<(), PortError>;

    async fn get_mission(&self, mission_id: MissionId) -> Result<Option<Mission>, PortError>;

    /// Inserts or replaces a mission.
    async fn save_mission(&self, mission: &Mission) -> Result<(), PortError>;

    /// The mission planned to replace `mission_id`, if one was saved.
    async fn find_successor(&self, mission_id: MissionId) -> Result<Option<Mission>, PortError>;
}

/// Destination for domain events.
#[async_trait]
pub trait EventSink: Send + Sync {
    async fn publish(&self, envelope: EventEnvelope<DomainEvent>) -> Result<(), PortError>;

    /// Wraps `event` in an envelope for its aggregate and publishes it.
    async fn emit(
        &self,
        event: DomainEvent,
        actor_type: ActorType,
        actor_id: &str,
        correlation_id: &str,
    ) -> Result<(), PortError> {
        let (aggregate_type, aggregate_id) = event.aggregate();
        let envelope = EventEnvelope::builder()
            .aggregate(aggregate_type, aggregate_id)
            .event_type(event.event_type())
            .actor(actor_type, actor_id)
            .correlation_id(correlation_id)
            .payload(event)
            .build()
            .map_err(|e| PortError::Rejected(e.to_string()))?;

        self.publish(envelope).await
    }
}
