//! Replan queue consumer.
//!
//! Single consumer, polling. Each task goes through the replanner once per
//! delivery:
//! 1. Success acks the task
//! 2. A transient failure requeues it, until the mission's retry budget runs out
//! 3. A permanent failure (or an exhausted budget) dead-letters it
//!
//! The retry budget is only charged after the queue accepts the ack or nack.
//!
//! When the queue is empty the worker prunes expired retry history and sleeps
//! for the poll interval, waking early if shutdown is signaled.

use std::sync::Arc;
use std::time::Duration;

use tarla_id::MissionId;
use tarla_reconcile::{Disposition, PassStats, RetryTracker};
use tokio::sync::{watch, Mutex};
use tokio::time::sleep;
use tracing::{debug, error, info, instrument, warn};

use crate::config::{SchedulingConfig, DEFAULT_REPLAN_QUEUE};
use crate::error::{PortError, ReplanError};
use crate::ports::{MissionReplanner, ReplanQueue, ReplanTask};

/// Configuration for the replan worker.
#[derive(Debug, Clone)]
pub struct WorkerConfig {
    /// Queue to consume.
    pub queue: String,

    /// How long to sleep when the queue is empty.
    pub poll_interval: Duration,

    /// Transient failures allowed per mission inside `retry_window`.
    pub max_retries: u32,

    pub retry_window: Duration,
}

impl Default for WorkerConfig {
    fn default() -> Self {
        Self {
            queue: DEFAULT_REPLAN_QUEUE.to_string(),
            poll_interval: tarla_reconcile::DEFAULT_POLL_INTERVAL,
            max_retries: tarla_reconcile::DEFAULT_MAX_RETRIES,
            retry_window: tarla_reconcile::DEFAULT_RETRY_WINDOW,
        }
    }
}

impl From<&SchedulingConfig> for WorkerConfig {
    fn from(config: &SchedulingConfig) -> Self {
        Self {
            queue: config.replan_queue.clone(),
            poll_interval: config.poll_interval,
            max_retries: config.replan_max_retries,
            retry_window: config.replan_retry_window,
        }
    }
}

/// Background worker that pops replan tasks and settles them.
pub struct ReplanQueueWorker {
    queue: Arc<dyn ReplanQueue>,
    replanner: Arc<dyn MissionReplanner>,
    config: WorkerConfig,
    retries: Mutex<RetryTracker<MissionId>>,
    stats: Mutex<PassStats>,
}

impl ReplanQueueWorker {
    pub fn new(
        queue: Arc<dyn ReplanQueue>,
        replanner: Arc<dyn MissionReplanner>,
        config: WorkerConfig,
    ) -> Self {
        let retries = RetryTracker::new(config.max_retries, config.retry_window);
        Self {
            queue,
            replanner,
            config,
            retries: Mutex::new(retries),
            stats: Mutex::new(PassStats::default()),
        }
    }

    pub fn config(&self) -> &WorkerConfig {
        &self.config
    }

    /// Totals since the worker was created.
    pub async fn stats(&self) -> PassStats {
        *self.stats.lock().await
    }

    /// Pops and settles at most one task.
    ///
    /// Returns `Ok(false)` when the queue was empty, `Ok(true)` when a task
    /// was handled, whatever its outcome.
    pub async fn run_once(&self) -> Result<bool, PortError> {
        let Some(task) = self.queue.pop(&self.config.queue).await? else {
            return Ok(false);
        };

        debug!(
            task_id = %task.task_id,
            mission_id = %task.mission_id,
            reason = %task.reason,
            correlation_id = %task.correlation_id,
            "Replanning mission"
        );

        let result = self
            .replanner
            .replan(task.mission_id, task.reason, &task.correlation_id)
            .await;
        let disposition = self.classify(&task, result).await;

        // Retry budget and stats only move once the queue has accepted the outcome.
        match disposition.requeue_flag() {
            None => self.queue.ack(&self.config.queue, task.task_id).await?,
            Some(requeue) => {
                self.queue
                    .nack(&self.config.queue, task.task_id, requeue)
                    .await?
            }
        }

        self.retries
            .lock()
            .await
            .settle(&task.mission_id, disposition);
        self.stats.lock().await.record(disposition);
        Ok(true)
    }

    /// Transient failures recorded for a mission inside the retry window.
    pub async fn retry_failures(&self, mission_id: MissionId) -> u32 {
        self.retries.lock().await.failures(&mission_id)
    }

    async fn classify(&self, task: &ReplanTask, result: Result<(), ReplanError>) -> Disposition {
        match result {
            Ok(()) => {
                info!(
                    mission_id = %task.mission_id,
                    correlation_id = %task.correlation_id,
                    "Mission replanned"
                );
                Disposition::Ack
            }
            Err(ReplanError::Transient(reason)) => {
                let disposition = self
                    .retries
                    .lock()
                    .await
                    .transient_disposition(&task.mission_id);
                warn!(
                    mission_id = %task.mission_id,
                    correlation_id = %task.correlation_id,
                    %reason,
                    %disposition,
                    "Transient replan failure"
                );
                disposition
            }
            Err(ReplanError::Permanent(reason)) => {
                error!(
                    mission_id = %task.mission_id,
                    correlation_id = %task.correlation_id,
                    %reason,
                    "Permanent replan failure, dead-lettering"
                );
                Disposition::DeadLetter
            }
        }
    }

    /// Runs `run_once` until the queue is empty. Returns the totals for this call.
    pub async fn drain(&self) -> Result<PassStats, PortError> {
        let before = self.stats().await;
        while self.run_once().await? {}
        let after = self.stats().await;

        Ok(PassStats {
            acked: after.acked - before.acked,
            requeued: after.requeued - before.requeued,
            dead_lettered: after.dead_lettered - before.dead_lettered,
        })
    }

    /// Run the worker until shutdown is signaled.
    #[instrument(skip(self, shutdown), name = "replan_worker", fields(queue = %self.config.queue))]
    pub async fn run_forever(&self, mut shutdown: watch::Receiver<bool>) -> PassStats {
        info!(
            poll_interval_ms = self.config.poll_interval.as_millis() as u64,
            "Starting replan worker"
        );

        loop {
            if *shutdown.borrow() {
                break;
            }

            match self.run_once().await {
                Ok(true) => continue,
                Ok(false) => self.retries.lock().await.prune(),
                Err(e) => error!(error = %e, "Replan queue operation failed"),
            }

            tokio::select! {
                changed = shutdown.changed() => {
                    if changed.is_err() || *shutdown.borrow() {
                        break;
                    }
                }
                _ = sleep(self.config.poll_interval) => {}
            }
        }

        let stats = self.stats().await;
        info!(
            acked = stats.acked,
            requeued = stats.requeued,
            dead_lettered = stats.dead_lettered,
            "Replan worker shutting down"
        );
        stats
    }
}
