//! # tarla-scheduling
//!
//! Scheduling, dispatch and replanning engine for field-survey missions.
//!
//! ## Components (leaf first)
//!
//! - [`PilotSchedule`]: work days, daily capacity and the seed/pull split
//! - [`CapacityManager`]: availability and utilization over an assignment snapshot
//! - [`AutoDispatcher`]: greedy, territory-bound, reliability-ranked matching
//! - [`PlanWindowSegmenter`]: splits oversized areas into bounded segments
//! - [`MissionStatus`]: the mission lifecycle state machine
//! - [`RescheduleService`]: token-consuming date changes
//! - [`ReassignmentHandler`], [`WeeklyPlanningJob`], [`ReplanQueueWorker`]:
//!   orchestration over injected [`ports`]
//! - [`DisruptionHandler`], [`DispatchReplanner`]: cancellation and replan flow
//!
//! ## Determinism
//!
//! Given the same inputs every decision is the same. Dispatch ties go to the
//! lowest pilot id; nothing depends on hash or iteration order.

pub mod adapters;
mod capacity;
mod config;
mod disruption;
mod dispatch;
mod error;
mod lifecycle;
mod mission;
mod pilot;
mod policy;
pub mod ports;
mod reassignment;
mod replanner;
mod reschedule;
mod segment;
mod weekly;
mod worker;

pub use capacity::{
    AvailabilitySlot, CapacityCheck, CapacityManager, PilotAssignment, REASON_CAPACITY_FULL,
    REASON_NOT_WORKING_DAY,
};
pub use config::{ConfigError, SchedulingConfig, DEFAULT_REPLAN_QUEUE};
pub use disruption::{CancelOutcome, DisruptionError, DisruptionHandler};
pub use dispatch::{AutoDispatcher, DispatchDecision};
pub use error::{PortError, ReplanError, SchedulingError, SchedulingResult};
pub use lifecycle::MissionStatus;
pub use mission::{Mission, MissionSegment, ScheduleWindow, Subscription, DEFAULT_RESCHEDULE_TOKENS};
pub use pilot::{
    Pilot, PilotCapacity, PilotSchedule, ReliabilityScore, DEFAULT_DAILY_CAPACITY_DONUM,
    DEFAULT_SEED_QUOTA_DONUM, MAX_DAILY_CAPACITY_DONUM, MAX_WORK_DAYS, MIN_DAILY_CAPACITY_DONUM,
};
pub use policy::{AssignmentPolicy, AssignmentReason, OverrideMetadata};
pub use ports::ReplanTask;
pub use reassignment::ReassignmentHandler;
pub use replanner::{DispatchReplanner, REPLANNER_ACTOR};
pub use reschedule::{CapacityAvailability, DenialReason, RescheduleOutcome, RescheduleService};
pub use segment::{PlanWindowSegmenter, DEFAULT_SEGMENT_SIZE_DONUM, DEFAULT_SEGMENT_THRESHOLD_DONUM};
pub use weekly::WeeklyPlanningJob;
pub use worker::{ReplanQueueWorker, WorkerConfig};
