//! In-memory backends for development, the CLI and tests.

use std::collections::{BTreeMap, HashMap, VecDeque};

use async_trait::async_trait;
use tarla_events::{DomainEvent, EventEnvelope};
use tarla_id::{MissionId, PilotId, ReplanTaskId};
use tokio::sync::Mutex;

use crate::error::PortError;
use crate::lifecycle::MissionStatus;
use crate::mission::Mission;
use crate::pilot::Pilot;
use crate::ports::{AuditWriter, EventSink, MissionRepository, ReplanQueue, ReplanTask};

// =============================================================================
// Queue
// =============================================================================

#[derive(Debug, Default)]
struct QueueState {
    ready: VecDeque<ReplanTask>,
    in_flight: HashMap<ReplanTaskId, ReplanTask>,
    dead_letters: Vec<ReplanTask>,
}

/// FIFO queue with explicit in-flight tracking.
///
/// Popped tasks stay in flight until acked or nacked. A requeued task goes
/// to the back of the queue; a task nacked without requeue is dead-lettered.
#[derive(Debug, Default)]
pub struct InMemoryReplanQueue {
    queues: Mutex<HashMap<String, QueueState>>,
}

impl InMemoryReplanQueue {
    pub fn new() -> Self {
        Self::default()
    }

    /// Tasks waiting to be popped.
    pub async fn ready_len(&self, queue: &str) -> usize {
        self.queues
            .lock()
            .await
            .get(queue)
            .map(|q| q.ready.len())
            .unwrap_or(0)
    }

    /// Tasks popped but not yet settled.
    pub async fn in_flight_len(&self, queue: &str) -> usize {
        self.queues
            .lock()
            .await
            .get(queue)
            .map(|q| q.in_flight.len())
            .unwrap_or(0)
    }

    pub async fn dead_letters(&self, queue: &str) -> Vec<ReplanTask> {
        self.queues
            .lock()
            .await
            .get(queue)
            .map(|q| q.dead_letters.clone())
            .unwrap_or_default()
    }
}

#[async_trait]
impl ReplanQueue for InMemoryReplanQueue {
    async fn pop(&self, queue: &str) -> Result<Option<ReplanTask>, PortError> {
        let mut queues = self.queues.lock().await;
        let Some(state) = queues.get_mut(queue) else {
            return Ok(None);
        };

        let Some(task) = state.ready.pop_front() else {
            return Ok(None);
        };
        state.in_flight.insert(task.task_id, task.clone());
        Ok(Some(task))
    }

    async fn ack(&self, queue: &str, task_id: ReplanTaskId) -> Result<(), PortError> {
        let mut queues = self.queues.lock().await;
        queues
            .get_mut(queue)
            .and_then(|state| state.in_flight.remove(&task_id))
            .map(|_| ())
            .ok_or_else(|| PortError::NotFound(format!("task {task_id} not in flight on {queue}")))
    }

    async fn nack(&self, queue: &str, task_id: ReplanTaskId, requeue: bool) -> Result<(), PortError> {
        let mut queues = self.queues.lock().await;
        let state = queues
            .get_mut(queue)
            .ok_or_else(|| PortError::NotFound(format!("queue {queue}")))?;
        let task = state
            .in_flight
            .remove(&task_id)
            .ok_or_else(|| PortError::NotFound(format!("task {task_id} not in flight on {queue}")))?;

        if requeue {
            state.ready.push_back(task);
        } else {
            state.dead_letters.push(task);
        }
        Ok(())
    }

    async fn push(&self, queue: &str, task: ReplanTask) -> Result<(), PortError> {
        self.queues
            .lock()
            .await
            .entry(queue.to_string())
            .or_default()
            .ready
            .push_back(task);
        Ok(())
    }
}

// =============================================================================
// Missions and Pilots
// =============================================================================

/// Mission and pilot store.
///
/// The reassignment queue is every PLANNED mission without a pilot, in id
/// (creation) order.
#[derive(Debug, Default)]
pub struct InMemoryMissionStore {
    missions: Mutex<BTreeMap<MissionId, Mission>>,
    pilots: Mutex<Vec<Pilot>>,
}

impl InMemoryMissionStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_snapshot(missions: impl IntoIterator<Item = Mission>, pilots: Vec<Pilot>) -> Self {
        Self {
            missions: Mutex::new(missions.into_iter().map(|m| (m.id, m)).collect()),
            pilots: Mutex::new(pilots),
        }
    }

    pub async fn add_pilot(&self, pilot: Pilot) {
        self.pilots.lock().await.push(pilot);
    }

    pub async fn missions(&self) -> Vec<Mission> {
        self.missions.lock().await.values().cloned().collect()
    }
}

#[async_trait]
impl MissionRepository for InMemoryMissionStore {
    async fn list_reassign_queue(&self) -> Result<Vec<Mission>, PortError> {
        Ok(self
            .missions
            .lock()
            .await
            .values()
            .filter(|m| m.status == MissionStatus::Planned && m.assigned_pilot.is_none())
            .cloned()
            .collect())
    }

    async fn list_available_pilots(&self) -> Result<Vec<Pilot>, PortError> {
        Ok(self.pilots.lock().await.clone())
    }

    async fn mark_reassigned(&self, mission_id: MissionId, pilot_id: PilotId) -> Result<(), PortError> {
        let mut missions = self.missions.lock().await;
        let mission = missions
            .get_mut(&mission_id)
            .ok_or_else(|| PortError::NotFound(format!("mission {mission_id}")))?;

        mission
            .assign(pilot_id)
            .map_err(|e| PortError::Rejected(e.to_string()))
    }

    async fn get_mission(&self, mission_id: MissionId) -> Result<Option<Mission>, PortError> {
        Ok(self.missions.lock().await.get(&mission_id).cloned())
    }

    async fn save_mission(&self, mission: &Mission) -> Result<(), PortError> {
        self.missions
            .lock()
            .await
            .insert(mission.id, mission.clone());
        Ok(())
    }

    async fn find_successor(&self, mission_id: MissionId) -> Result<Option<Mission>, PortError> {
        Ok(self
            .missions
            .lock()
            .await
            .values()
            .find(|m| m.replaces == Some(mission_id))
            .cloned())
    }
}

// =============================================================================
// Audit and Events
// =============================================================================

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JobLogEntry {
    pub correlation_id: String,
    pub outcome: String,
    pub affected_count: u32,
}

#[derive(Debug, Default)]
pub struct InMemoryAuditLog {
    entries: Mutex<Vec<JobLogEntry>>,
}

impl InMemoryAuditLog {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn entries(&self) -> Vec<JobLogEntry> {
        self.entries.lock().await.clone()
    }
}

#[async_trait]
impl AuditWriter for InMemoryAuditLog {
    async fn append_job_log(
        &self,
        correlation_id: &str,
        outcome: &str,
        affected_count: u32,
    ) -> Result<(), PortError> {
        self.entries.lock().await.push(JobLogEntry {
            correlation_id: correlation_id.to_string(),
            outcome: outcome.to_string(),
            affected_count,
        });
        Ok(())
    }
}

/// Collects published envelopes in order.
#[derive(Debug, Default)]
pub struct InMemoryEventSink {
    events: Mutex<Vec<EventEnvelope<DomainEvent>>>,
}

impl InMemoryEventSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn events(&self) -> Vec<EventEnvelope<DomainEvent>> {
        self.events.lock().await.clone()
    }

    pub async fn event_types(&self) -> Vec<String> {
        self.events
            .lock()
            .await
            .iter()
            .map(|e| e.event_type.clone())
            .collect()
    }
}

#[async_trait]
impl EventSink for InMemoryEventSink {
    async fn publish(&self, envelope: EventEnvelope<DomainEvent>) -> Result<(), PortError> {
        self.events.lock().await.push(envelope);
        Ok(())
    }
}
