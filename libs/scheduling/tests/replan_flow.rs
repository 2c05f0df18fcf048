//! Disruption, replan and batch orchestration over the in-memory backends.

use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use chrono::{NaiveDate, Weekday};
use tarla_events::{event_types, CancelReason, DomainEvent, EventEnvelope, ReplanReason};
use tarla_id::{FieldId, MissionId, ReplanTaskId};
use tarla_scheduling::adapters::{
    InMemoryAuditLog, InMemoryEventSink, InMemoryMissionStore, InMemoryReplanQueue,
};
use tarla_scheduling::ports::{
    EventSink, MissionReplanner, MissionRepository, ReplanQueue, WeeklyPlanner,
};
use tarla_scheduling::{
    AssignmentReason, AutoDispatcher, DispatchReplanner, DisruptionError, DisruptionHandler,
    Mission, MissionStatus, Pilot, PilotSchedule, PortError, ReassignmentHandler, ReplanError,
    ReplanQueueWorker, ReplanTask, ScheduleWindow, WeeklyPlanningJob, WorkerConfig,
};

const QUEUE: &str = "mission.replan";

fn date(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).unwrap()
}

fn mission(territory: &str) -> Mission {
    let window = ScheduleWindow::new(date(2026, 1, 1), date(2026, 1, 31)).unwrap();
    Mission::planned(territory, FieldId::new(), date(2026, 1, 5), window, 1200)
        .with_analysis("wheat", "ndvi")
}

fn pilot(territory: &str, score: f64) -> Pilot {
    let schedule = PilotSchedule::with_defaults([Weekday::Mon, Weekday::Tue, Weekday::Wed]).unwrap();
    Pilot::register(territory, schedule, score).unwrap()
}

struct Harness {
    store: Arc<InMemoryMissionStore>,
    queue: Arc<InMemoryReplanQueue>,
    events: Arc<InMemoryEventSink>,
    disruptions: DisruptionHandler,
    worker: ReplanQueueWorker,
}

fn harness(missions: Vec<Mission>, pilots: Vec<Pilot>) -> Harness {
    let store = Arc::new(InMemoryMissionStore::with_snapshot(missions, pilots));
    let queue = Arc::new(InMemoryReplanQueue::new());
    let events = Arc::new(InMemoryEventSink::new());

    let disruptions = DisruptionHandler::new(store.clone(), queue.clone(), events.clone(), QUEUE);
    let replanner = DispatchReplanner::new(store.clone(), events.clone(), AutoDispatcher::new());
    let worker = ReplanQueueWorker::new(
        queue.clone(),
        Arc::new(replanner),
        WorkerConfig {
            queue: QUEUE.to_string(),
            poll_interval: Duration::from_millis(10),
            max_retries: 2,
            retry_window: Duration::from_secs(60),
        },
    );

    Harness {
        store,
        queue,
        events,
        disruptions,
        worker,
    }
}

async fn assigned(store: &InMemoryMissionStore, territory: &str) -> Mission {
    let mut m = mission(territory);
    let pilots = store.list_available_pilots().await.unwrap();
    m.assign(pilots[0].id()).unwrap();
    store.save_mission(&m).await.unwrap();
    m
}

#[tokio::test]
async fn test_weather_block_is_replanned_onto_successor() {
    let best = pilot("Konya", 0.95);
    let h = harness(vec![], vec![pilot("Konya", 0.5), best.clone()]);
    let original = assigned(&h.store, "Konya").await;

    let outcome = h
        .disruptions
        .cancel(original.id, CancelReason::WeatherBlock, None, "corr-weather")
        .await
        .unwrap();

    assert_eq!(outcome.cancelled.status, MissionStatus::Cancelled);
    let successor = outcome.successor.unwrap();
    assert_eq!(successor.replaces, Some(original.id));
    let task = outcome.task.unwrap();
    assert_eq!(task.mission_id, successor.id);
    assert_eq!(task.reason, ReplanReason::WeatherBlock);

    assert!(h.worker.run_once().await.unwrap());
    assert!(!h.worker.run_once().await.unwrap());

    let replanned = h.store.get_mission(successor.id).await.unwrap().unwrap();
    assert_eq!(replanned.status, MissionStatus::Assigned);
    assert_eq!(replanned.assigned_pilot, Some(best.id()));

    let stored_original = h.store.get_mission(original.id).await.unwrap().unwrap();
    assert_eq!(stored_original.status, MissionStatus::Cancelled);

    assert_eq!(
        h.events.event_types().await,
        vec![
            event_types::MISSION_CANCELLED,
            event_types::MISSION_REPLAN_QUEUED,
            event_types::MISSION_ASSIGNED,
        ]
    );

    let events = h.events.events().await;
    assert!(events.iter().all(|e| e.correlation_id.as_deref() == Some("corr-weather")));
    match &events[2].payload {
        DomainEvent::MissionAssigned(p) => {
            assert_eq!(p.mission_id, successor.id);
            assert_eq!(p.pilot_id, best.id());
            assert_eq!(p.field_id, original.field_id);
        }
        other => panic!("unexpected payload {other:?}"),
    }

    assert_eq!(h.worker.stats().await.acked, 1);
}

#[tokio::test]
async fn test_no_show_is_not_replanned() {
    let h = harness(vec![], vec![pilot("Konya", 0.5)]);
    let original = assigned(&h.store, "Konya").await;

    let outcome = h
        .disruptions
        .cancel(original.id, CancelReason::NoShow, Some("ops".into()), "corr-ns")
        .await
        .unwrap();

    assert!(outcome.successor.is_none());
    assert!(outcome.task.is_none());
    assert_eq!(h.queue.ready_len(QUEUE).await, 0);
    assert_eq!(h.events.event_types().await, vec![event_types::MISSION_CANCELLED]);
}

#[tokio::test]
async fn test_cancel_after_flight_is_rejected() {
    let h = harness(vec![], vec![pilot("Konya", 0.5)]);
    let mut flown = assigned(&h.store, "Konya").await;
    flown.transition(MissionStatus::Acked).unwrap();
    flown.transition(MissionStatus::Flown).unwrap();
    h.store.save_mission(&flown).await.unwrap();

    let err = h
        .disruptions
        .cancel(flown.id, CancelReason::PilotNotice, None, "corr")
        .await
        .unwrap_err();

    assert!(matches!(err, DisruptionError::Scheduling(_)));
    assert!(h.events.events().await.is_empty());
}

#[tokio::test]
async fn test_no_candidate_requeues_then_dead_letters() {
    // Nobody serves Van.
    let h = harness(vec![], vec![pilot("Konya", 0.5)]);
    let orphan = mission("Van");
    h.store.save_mission(&orphan).await.unwrap();
    h.queue
        .push(QUEUE, ReplanTask::new(orphan.id, ReplanReason::PilotCancel, "corr-van"))
        .await
        .unwrap();

    // max_retries = 2: two requeues, the third failure dead-letters.
    let stats = h.worker.drain().await.unwrap();
    assert_eq!(stats.requeued, 2);
    assert_eq!(stats.dead_lettered, 1);
    assert_eq!(stats.acked, 0);

    assert_eq!(h.queue.dead_letters(QUEUE).await.len(), 1);
    assert_eq!(h.queue.in_flight_len(QUEUE).await, 0);
}

#[tokio::test]
async fn test_missing_mission_dead_letters_immediately() {
    let h = harness(vec![], vec![pilot("Konya", 0.5)]);
    h.queue
        .push(QUEUE, ReplanTask::new(MissionId::new(), ReplanReason::AdminOverride, "corr"))
        .await
        .unwrap();

    assert!(h.worker.run_once().await.unwrap());
    let stats = h.worker.stats().await;
    assert_eq!(stats.dead_lettered, 1);
    assert_eq!(stats.requeued, 0);
}

#[tokio::test]
async fn test_redelivered_task_republishes_existing_assignment() {
    let h = harness(vec![], vec![pilot("Konya", 0.5), pilot("Konya", 0.99)]);
    let already = assigned(&h.store, "Konya").await;
    h.queue
        .push(QUEUE, ReplanTask::new(already.id, ReplanReason::WeatherBlock, "corr"))
        .await
        .unwrap();

    assert!(h.worker.run_once().await.unwrap());
    assert_eq!(h.worker.stats().await.acked, 1);

    // The stored assignment is kept, not re-dispatched to the better pilot.
    let stored = h.store.get_mission(already.id).await.unwrap().unwrap();
    assert_eq!(stored.assigned_pilot, already.assigned_pilot);

    let events = h.events.events().await;
    assert_eq!(events.len(), 1);
    match &events[0].payload {
        DomainEvent::MissionAssigned(p) => {
            assert_eq!(p.mission_id, already.id);
            assert_eq!(Some(p.pilot_id), already.assigned_pilot);
        }
        other => panic!("unexpected payload {other:?}"),
    }
}

/// Event sink that rejects the first `failures` publishes.
struct OutageSink {
    inner: InMemoryEventSink,
    failures: AtomicU32,
}

impl OutageSink {
    fn failing(failures: u32) -> Self {
        Self {
            inner: InMemoryEventSink::new(),
            failures: AtomicU32::new(failures),
        }
    }
}

#[async_trait]
impl EventSink for OutageSink {
    async fn publish(&self, envelope: EventEnvelope<DomainEvent>) -> Result<(), PortError> {
        if self
            .failures
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
            .is_ok()
        {
            return Err(PortError::Unavailable("bus down".into()));
        }
        self.inner.publish(envelope).await
    }
}

/// Replan queue whose `push` fails a set number of times and whose `nack`
/// fails while `nack_down` is set.
#[derive(Default)]
struct OutageQueue {
    inner: InMemoryReplanQueue,
    push_failures: AtomicU32,
    nack_down: AtomicBool,
}

#[async_trait]
impl ReplanQueue for OutageQueue {
    async fn pop(&self, queue: &str) -> Result<Option<ReplanTask>, PortError> {
        self.inner.pop(queue).await
    }

    async fn ack(&self, queue: &str, task_id: ReplanTaskId) -> Result<(), PortError> {
        self.inner.ack(queue, task_id).await
    }

    async fn nack(&self, queue: &str, task_id: ReplanTaskId, requeue: bool) -> Result<(), PortError> {
        if self.nack_down.load(Ordering::SeqCst) {
            return Err(PortError::Unavailable("queue broker down".into()));
        }
        self.inner.nack(queue, task_id, requeue).await
    }

    async fn push(&self, queue: &str, task: ReplanTask) -> Result<(), PortError> {
        if self
            .push_failures
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
            .is_ok()
        {
            return Err(PortError::Unavailable("queue broker down".into()));
        }
        self.inner.push(queue, task).await
    }
}

#[tokio::test]
async fn test_cancel_resumes_after_event_outage() {
    let store = Arc::new(InMemoryMissionStore::with_snapshot(vec![], vec![pilot("Konya", 0.7)]));
    let queue = Arc::new(InMemoryReplanQueue::new());
    let sink = Arc::new(OutageSink::failing(1));
    let handler = DisruptionHandler::new(store.clone(), queue.clone(), sink.clone(), QUEUE);
    let original = assigned(&store, "Konya").await;

    let err = handler
        .cancel(original.id, CancelReason::WeatherBlock, None, "corr-bus")
        .await
        .unwrap_err();
    assert!(matches!(err, DisruptionError::Port(PortError::Unavailable(_))));

    // Everything but the events is already durable.
    let first_successor = store.find_successor(original.id).await.unwrap().unwrap();
    assert_eq!(stored_status(&store, original.id).await, MissionStatus::Cancelled);
    assert_eq!(queue.ready_len(QUEUE).await, 1);
    assert!(sink.inner.events().await.is_empty());

    let outcome = handler
        .cancel(original.id, CancelReason::WeatherBlock, None, "corr-bus")
        .await
        .unwrap();
    assert_eq!(outcome.successor.map(|m| m.id), Some(first_successor.id));
    assert_eq!(store.missions().await.len(), 2);
    assert_eq!(
        sink.inner.event_types().await,
        vec![event_types::MISSION_CANCELLED, event_types::MISSION_REPLAN_QUEUED]
    );

    // The duplicate task is harmless: the second delivery finds the successor assigned.
    let replanner = DispatchReplanner::new(store.clone(), sink.clone(), AutoDispatcher::new());
    let worker = ReplanQueueWorker::new(queue.clone(), Arc::new(replanner), WorkerConfig::default());
    let stats = worker.drain().await.unwrap();
    assert_eq!(stats.acked, 2);
    assert_eq!(stored_status(&store, first_successor.id).await, MissionStatus::Assigned);
}

#[tokio::test]
async fn test_cancel_resumes_after_push_outage() {
    let store = Arc::new(InMemoryMissionStore::with_snapshot(vec![], vec![pilot("Konya", 0.7)]));
    let queue = Arc::new(OutageQueue {
        push_failures: AtomicU32::new(1),
        ..OutageQueue::default()
    });
    let events = Arc::new(InMemoryEventSink::new());
    let handler = DisruptionHandler::new(store.clone(), queue.clone(), events.clone(), QUEUE);
    let original = assigned(&store, "Konya").await;

    let err = handler
        .cancel(original.id, CancelReason::PilotNotice, Some("pilot-app".into()), "corr-q")
        .await
        .unwrap_err();
    assert!(matches!(err, DisruptionError::Port(_)));
    assert_eq!(stored_status(&store, original.id).await, MissionStatus::Cancelled);
    assert!(store.find_successor(original.id).await.unwrap().is_some());
    assert_eq!(queue.inner.ready_len(QUEUE).await, 0);
    assert!(events.events().await.is_empty());

    let outcome = handler
        .cancel(original.id, CancelReason::PilotNotice, Some("pilot-app".into()), "corr-q")
        .await
        .unwrap();
    let successor = outcome.successor.unwrap();
    assert_eq!(outcome.task.unwrap().mission_id, successor.id);
    assert_eq!(queue.inner.ready_len(QUEUE).await, 1);
    assert_eq!(store.missions().await.len(), 2);
    assert_eq!(
        events.event_types().await,
        vec![event_types::MISSION_CANCELLED, event_types::MISSION_REPLAN_QUEUED]
    );
}

#[tokio::test]
async fn test_assignment_event_survives_publish_failure() {
    let konya = pilot("Konya", 0.8);
    let planned = mission("Konya");
    let store = Arc::new(InMemoryMissionStore::with_snapshot(
        vec![planned.clone()],
        vec![konya.clone()],
    ));
    let queue = Arc::new(InMemoryReplanQueue::new());
    let sink = Arc::new(OutageSink::failing(1));
    let replanner = DispatchReplanner::new(store.clone(), sink.clone(), AutoDispatcher::new());
    let worker = ReplanQueueWorker::new(queue.clone(), Arc::new(replanner), WorkerConfig::default());
    queue
        .push(QUEUE, ReplanTask::new(planned.id, ReplanReason::PilotCancel, "corr-pub"))
        .await
        .unwrap();

    // The commit lands, the event does not; the task comes back.
    assert!(worker.run_once().await.unwrap());
    assert_eq!(worker.stats().await.requeued, 1);
    assert_eq!(stored_status(&store, planned.id).await, MissionStatus::Assigned);
    assert!(sink.inner.events().await.is_empty());

    assert!(worker.run_once().await.unwrap());
    assert_eq!(worker.stats().await.acked, 1);
    let events = sink.inner.events().await;
    assert_eq!(events.len(), 1);
    assert_eq!(events[0].correlation_id.as_deref(), Some("corr-pub"));
    match &events[0].payload {
        DomainEvent::MissionAssigned(p) => assert_eq!(p.pilot_id, konya.id()),
        other => panic!("unexpected payload {other:?}"),
    }
}

struct AlwaysTransient;

#[async_trait]
impl MissionReplanner for AlwaysTransient {
    async fn replan(&self, _: MissionId, _: ReplanReason, _: &str) -> Result<(), ReplanError> {
        Err(ReplanError::Transient("no pilot yet".into()))
    }
}

#[tokio::test]
async fn test_failed_nack_does_not_spend_retry_budget() {
    let queue = Arc::new(OutageQueue::default());
    queue.nack_down.store(true, Ordering::SeqCst);
    let worker = ReplanQueueWorker::new(
        queue.clone(),
        Arc::new(AlwaysTransient),
        WorkerConfig {
            max_retries: 2,
            ..WorkerConfig::default()
        },
    );
    let mission_id = MissionId::new();
    queue
        .push(QUEUE, ReplanTask::new(mission_id, ReplanReason::WeatherBlock, "corr"))
        .await
        .unwrap();

    let err = worker.run_once().await.unwrap_err();
    assert!(err.is_retryable());
    assert_eq!(worker.stats().await.total(), 0);
    assert_eq!(worker.retry_failures(mission_id).await, 0);

    // Once the broker is back, the full budget is still there.
    queue.nack_down.store(false, Ordering::SeqCst);
    queue
        .push(QUEUE, ReplanTask::new(mission_id, ReplanReason::WeatherBlock, "corr"))
        .await
        .unwrap();
    let stats = worker.drain().await.unwrap();
    assert_eq!(stats.requeued, 2);
    assert_eq!(stats.dead_lettered, 1);
}

async fn stored_status(store: &InMemoryMissionStore, mission_id: MissionId) -> MissionStatus {
    store.get_mission(mission_id).await.unwrap().unwrap().status
}

/// Fails transiently a fixed number of times, then succeeds.
struct Flaky {
    failures_left: AtomicU32,
}

#[async_trait]
impl MissionReplanner for Flaky {
    async fn replan(&self, _: MissionId, _: ReplanReason, _: &str) -> Result<(), ReplanError> {
        let left = self.failures_left.load(Ordering::SeqCst);
        if left > 0 {
            self.failures_left.store(left - 1, Ordering::SeqCst);
            return Err(ReplanError::Transient("backend timeout".into()));
        }
        Ok(())
    }
}

#[tokio::test]
async fn test_transient_failure_recovers_within_budget() {
    let queue = Arc::new(InMemoryReplanQueue::new());
    let worker = ReplanQueueWorker::new(
        queue.clone(),
        Arc::new(Flaky {
            failures_left: AtomicU32::new(2),
        }),
        WorkerConfig::default(),
    );
    queue
        .push(QUEUE, ReplanTask::new(MissionId::new(), ReplanReason::WeatherBlock, "corr"))
        .await
        .unwrap();

    let stats = worker.drain().await.unwrap();
    assert_eq!(stats.requeued, 2);
    assert_eq!(stats.acked, 1);
    assert!(queue.dead_letters(QUEUE).await.is_empty());
}

#[tokio::test]
async fn test_reassignment_handler_commits_matches_only() {
    let konya = pilot("Konya", 0.8);
    let matched = mission("Konya");
    let unmatched = mission("Van");
    let store = Arc::new(InMemoryMissionStore::with_snapshot(
        vec![matched.clone(), unmatched.clone()],
        vec![konya.clone()],
    ));

    let handler = ReassignmentHandler::new(store.clone(), AutoDispatcher::new());
    let decisions = handler.run_once().await.unwrap();

    assert_eq!(decisions.len(), 1);
    assert_eq!(decisions[0].mission_id, matched.id);
    assert_eq!(decisions[0].pilot_id, konya.id());
    assert_eq!(decisions[0].policy.reason, AssignmentReason::AutoDispatch);

    let queue: Vec<_> = store
        .list_reassign_queue()
        .await
        .unwrap()
        .into_iter()
        .map(|m| m.id)
        .collect();
    assert_eq!(queue, vec![unmatched.id]);

    // Second pass has nothing new to do.
    assert!(handler.run_once().await.unwrap().is_empty());
}

struct FixedPlanner(Result<u32, PortError>);

#[async_trait]
impl WeeklyPlanner for FixedPlanner {
    async fn plan_week(&self, _week_start: NaiveDate, _correlation_id: &str) -> Result<u32, PortError> {
        self.0.clone()
    }
}

#[tokio::test]
async fn test_weekly_job_audits_success() {
    let audit = Arc::new(InMemoryAuditLog::new());
    let job = WeeklyPlanningJob::new(Arc::new(FixedPlanner(Ok(42))), audit.clone());

    let planned = job.run(date(2026, 1, 5), "corr-week-2").await.unwrap();
    assert_eq!(planned, 42);

    let entries = audit.entries().await;
    assert_eq!(entries.len(), 1);
    assert_eq!(entries[0].correlation_id, "corr-week-2");
    assert_eq!(entries[0].outcome, "SUCCESS");
    assert_eq!(entries[0].affected_count, 42);
}

#[tokio::test]
async fn test_weekly_job_planner_failure_skips_audit() {
    let audit = Arc::new(InMemoryAuditLog::new());
    let job = WeeklyPlanningJob::new(
        Arc::new(FixedPlanner(Err(PortError::Unavailable("planner down".into())))),
        audit.clone(),
    );

    let err = job.run(date(2026, 1, 5), "corr").await.unwrap_err();
    assert!(err.is_retryable());
    assert!(audit.entries().await.is_empty());
}
