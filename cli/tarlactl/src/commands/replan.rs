//! Replan command: push tasks onto an in-memory replan queue and run the
//! worker over them.

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Result;
use clap::Args;
use serde::Serialize;
use tabled::Tabled;
use tarla_id::{MissionId, PilotId, ReplanTaskId};
use tarla_scheduling::adapters::{InMemoryEventSink, InMemoryMissionStore, InMemoryReplanQueue};
use tarla_scheduling::ports::{MissionRepository, ReplanQueue};
use tarla_scheduling::{
    AutoDispatcher, DispatchReplanner, Mission, MissionStatus, Pilot, ReplanQueueWorker,
    ReplanTask, WorkerConfig,
};
use tokio::sync::watch;
use tracing::info;

use crate::output::{display_option, print_info, print_output, print_single, print_warning, OutputFormat};
use crate::snapshot;

use super::CommandContext;

#[derive(Debug, Args)]
pub struct ReplanCommand {
    /// Replan tasks (JSON array).
    #[arg(long)]
    tasks: PathBuf,

    /// Missions snapshot (JSON array).
    #[arg(long)]
    missions: PathBuf,

    /// Pilot roster snapshot (JSON array).
    #[arg(long)]
    pilots: PathBuf,

    /// Keep polling the queue after it drains, until Ctrl+C.
    #[arg(long)]
    follow: bool,

    /// Write the missions back after the run.
    #[arg(long)]
    write: bool,
}

#[derive(Debug, Serialize, Tabled)]
struct TaskRow {
    #[tabled(rename = "Task")]
    task_id: ReplanTaskId,
    #[tabled(rename = "Mission")]
    mission_id: MissionId,
    #[tabled(rename = "Reason")]
    reason: String,
    #[tabled(rename = "Status", display = "display_option")]
    status: Option<MissionStatus>,
    #[tabled(rename = "Pilot", display = "display_option")]
    pilot_id: Option<PilotId>,
    #[tabled(rename = "Dead-lettered")]
    dead_lettered: bool,
}

#[derive(Debug, Serialize)]
struct ReplanReport {
    acked: u64,
    requeued: u64,
    dead_lettered: u64,
    events_published: usize,
    tasks: Vec<TaskRow>,
}

impl ReplanCommand {
    pub async fn run(self, ctx: CommandContext) -> Result<()> {
        let tasks: Vec<ReplanTask> = snapshot::load(&self.tasks)?;
        let missions: Vec<Mission> = snapshot::load(&self.missions)?;
        let pilots: Vec<Pilot> = snapshot::load(&self.pilots)?;

        let store = Arc::new(InMemoryMissionStore::with_snapshot(missions, pilots));
        let queue = Arc::new(InMemoryReplanQueue::new());
        let events = Arc::new(InMemoryEventSink::new());

        let config = WorkerConfig::from(&ctx.config);
        for task in &tasks {
            queue.push(&config.queue, task.clone()).await?;
        }
        info!(tasks = tasks.len(), queue = %config.queue, "Queued replan tasks");

        let replanner = DispatchReplanner::new(store.clone(), events.clone(), AutoDispatcher::new());
        let worker = ReplanQueueWorker::new(queue.clone(), Arc::new(replanner), config);

        let (shutdown_tx, mut shutdown_rx) = watch::channel(false);
        tokio::spawn(async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                let _ = shutdown_tx.send(true);
            }
        });

        let stats = if self.follow {
            if ctx.format == OutputFormat::Table {
                print_info("Following the replan queue. Press Ctrl+C to stop.");
            }
            worker.run_forever(shutdown_rx).await
        } else {
            tokio::select! {
                drained = worker.drain() => drained?,
                _ = shutdown_rx.changed() => {
                    print_warning("Interrupted; reporting partial results");
                    worker.stats().await
                }
            }
        };

        let dead: Vec<ReplanTaskId> = queue
            .dead_letters(&worker.config().queue)
            .await
            .into_iter()
            .map(|t| t.task_id)
            .collect();

        let mut rows = Vec::with_capacity(tasks.len());
        for task in &tasks {
            let mission = store.get_mission(task.mission_id).await?;
            rows.push(TaskRow {
                task_id: task.task_id,
                mission_id: task.mission_id,
                reason: task.reason.to_string(),
                status: mission.as_ref().map(|m| m.status),
                pilot_id: mission.and_then(|m| m.assigned_pilot),
                dead_lettered: dead.contains(&task.task_id),
            });
        }

        let events_published = events.events().await.len();
        match ctx.format {
            OutputFormat::Table => {
                print_output(&rows, ctx.format);
                println!(
                    "acked {} | requeued {} | dead-lettered {} | events {}",
                    stats.acked, stats.requeued, stats.dead_lettered, events_published
                );
            }
            OutputFormat::Json => print_single(&ReplanReport {
                acked: stats.acked,
                requeued: stats.requeued,
                dead_lettered: stats.dead_lettered,
                events_published,
                tasks: rows,
            }),
        }

        if self.write {
            snapshot::store(&self.missions, &store.missions().await)?;
        }

        Ok(())
    }
}
