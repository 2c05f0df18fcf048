//! Pilots and their capacity model.
//!
//! A pilot's day is measured in donum. The daily capacity splits into a
//! mandatory seed quota (system-assigned work) and the pull quota left over
//! for farmer or pilot initiated work.

use chrono::{Datelike, NaiveDate, Weekday};
use serde::{Deserialize, Serialize};
use tarla_events::{AssignmentSource, PilotCapacityUpdatedPayload};
use tarla_id::PilotId;

use crate::error::{SchedulingError, SchedulingResult};

/// Lowest daily capacity a pilot may register with.
pub const MIN_DAILY_CAPACITY_DONUM: u32 = 2500;

/// Highest daily capacity a pilot may register with.
pub const MAX_DAILY_CAPACITY_DONUM: u32 = 3000;

/// Daily capacity used when none is given.
pub const DEFAULT_DAILY_CAPACITY_DONUM: u32 = 2750;

/// Seed quota used when none is given.
pub const DEFAULT_SEED_QUOTA_DONUM: u32 = 1500;

/// At least one rest day per week.
pub const MAX_WORK_DAYS: usize = 6;

// =============================================================================
// Reliability
// =============================================================================

/// Reliability score in [0, 1]; higher wins dispatch.
#[derive(Debug, Clone, Copy, PartialEq, PartialOrd, Serialize, Deserialize)]
#[serde(try_from = "f64", into = "f64")]
pub struct ReliabilityScore(f64);

impl ReliabilityScore {
    pub const MIN: Self = Self(0.0);
    pub const MAX: Self = Self(1.0);

    pub fn new(score: f64) -> SchedulingResult<Self> {
        if (0.0..=1.0).contains(&score) {
            Ok(Self(score))
        } else {
            Err(SchedulingError::ReliabilityOutOfRange(score))
        }
    }

    pub fn value(&self) -> f64 {
        self.0
    }
}

impl TryFrom<f64> for ReliabilityScore {
    type Error = SchedulingError;

    fn try_from(value: f64) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<ReliabilityScore> for f64 {
    fn from(score: ReliabilityScore) -> Self {
        score.0
    }
}

impl std::fmt::Display for ReliabilityScore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:.2}", self.0)
    }
}

// =============================================================================
// Schedule
// =============================================================================

/// Validated working week and daily capacity split.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "ScheduleRecord")]
pub struct PilotSchedule {
    work_days: Vec<Weekday>,
    daily_capacity_donum: u32,
    seed_quota_donum: u32,
}

/// Unvalidated wire form of [`PilotSchedule`].
#[derive(Deserialize)]
struct ScheduleRecord {
    work_days: Vec<Weekday>,
    #[serde(default = "default_capacity")]
    daily_capacity_donum: u32,
    #[serde(default = "default_seed")]
    seed_quota_donum: u32,
}

fn default_capacity() -> u32 {
    DEFAULT_DAILY_CAPACITY_DONUM
}

fn default_seed() -> u32 {
    DEFAULT_SEED_QUOTA_DONUM
}

impl TryFrom<ScheduleRecord> for PilotSchedule {
    type Error = SchedulingError;

    fn try_from(record: ScheduleRecord) -> Result<Self, Self::Error> {
        Self::new(
            record.work_days,
            record.daily_capacity_donum,
            record.seed_quota_donum,
        )
    }
}

impl PilotSchedule {
    /// Validates and builds a schedule.
    ///
    /// Work days are deduplicated and kept in Monday-first order. There must
    /// be between one and [`MAX_WORK_DAYS`] of them, the capacity must fall in
    /// the allowed band and the seed quota must fit inside it.
    pub fn new(
        work_days: impl IntoIterator<Item = Weekday>,
        daily_capacity_donum: u32,
        seed_quota_donum: u32,
    ) -> SchedulingResult<Self> {
        let mut days: Vec<Weekday> = work_days.into_iter().collect();
        days.sort_by_key(|d| d.num_days_from_monday());
        days.dedup();

        if days.is_empty() || days.len() > MAX_WORK_DAYS {
            return Err(SchedulingError::InvalidWorkDays {
                count: days.len(),
                max: MAX_WORK_DAYS,
            });
        }

        if !(MIN_DAILY_CAPACITY_DONUM..=MAX_DAILY_CAPACITY_DONUM).contains(&daily_capacity_donum) {
            return Err(SchedulingError::CapacityOutOfRange {
                capacity: daily_capacity_donum,
                min: MIN_DAILY_CAPACITY_DONUM,
                max: MAX_DAILY_CAPACITY_DONUM,
            });
        }

        if seed_quota_donum > daily_capacity_donum {
            return Err(SchedulingError::SeedQuotaExceedsCapacity {
                seed: seed_quota_donum,
                capacity: daily_capacity_donum,
            });
        }

        Ok(Self {
            work_days: days,
            daily_capacity_donum,
            seed_quota_donum,
        })
    }

    /// Schedule with the default capacity and seed quota.
    pub fn with_defaults(work_days: impl IntoIterator<Item = Weekday>) -> SchedulingResult<Self> {
        Self::new(
            work_days,
            DEFAULT_DAILY_CAPACITY_DONUM,
            DEFAULT_SEED_QUOTA_DONUM,
        )
    }

    pub fn work_days(&self) -> &[Weekday] {
        &self.work_days
    }

    pub fn daily_capacity_donum(&self) -> u32 {
        self.daily_capacity_donum
    }

    pub fn seed_quota_donum(&self) -> u32 {
        self.seed_quota_donum
    }

    /// What remains after the seed quota. Never negative.
    pub fn pull_quota_donum(&self) -> u32 {
        self.daily_capacity_donum
            .saturating_sub(self.seed_quota_donum)
    }

    /// Share of the day reserved for the given assignment source.
    pub fn quota_for(&self, source: AssignmentSource) -> u32 {
        match source {
            AssignmentSource::SystemSeed => self.seed_quota_donum,
            AssignmentSource::Pull => self.pull_quota_donum(),
        }
    }

    pub fn works_on(&self, day: Weekday) -> bool {
        self.work_days.contains(&day)
    }
}

// =============================================================================
// Pilot
// =============================================================================

/// A registered field operator.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "PilotRecord")]
pub struct Pilot {
    id: PilotId,
    province: String,
    schedule: PilotSchedule,
    reliability: ReliabilityScore,
}

#[derive(Deserialize)]
struct PilotRecord {
    id: PilotId,
    province: String,
    schedule: PilotSchedule,
    reliability: ReliabilityScore,
}

impl TryFrom<PilotRecord> for Pilot {
    type Error = SchedulingError;

    fn try_from(record: PilotRecord) -> Result<Self, Self::Error> {
        Self::with_id(
            record.id,
            record.province,
            record.schedule,
            record.reliability.value(),
        )
    }
}

impl Pilot {
    /// Registers a new pilot under a fresh id.
    pub fn register(
        province: impl Into<String>,
        schedule: PilotSchedule,
        reliability: f64,
    ) -> SchedulingResult<Self> {
        Self::with_id(PilotId::new(), province, schedule, reliability)
    }

    /// Rebuilds a pilot from stored fields, validating them again.
    pub fn with_id(
        id: PilotId,
        province: impl Into<String>,
        schedule: PilotSchedule,
        reliability: f64,
    ) -> SchedulingResult<Self> {
        let province = province.into();
        if province.trim().is_empty() {
            return Err(SchedulingError::EmptyProvince);
        }

        Ok(Self {
            id,
            province,
            schedule,
            reliability: ReliabilityScore::new(reliability)?,
        })
    }

    pub fn id(&self) -> PilotId {
        self.id
    }

    pub fn province(&self) -> &str {
        &self.province
    }

    pub fn schedule(&self) -> &PilotSchedule {
        &self.schedule
    }

    pub fn reliability(&self) -> ReliabilityScore {
        self.reliability
    }

    /// Replaces the schedule and returns the event payload describing it.
    pub fn update_capacity(&mut self, schedule: PilotSchedule) -> PilotCapacityUpdatedPayload {
        self.schedule = schedule;
        PilotCapacityUpdatedPayload {
            pilot_id: self.id,
            work_days: self.schedule.work_days().to_vec(),
            daily_capacity_donum: self.schedule.daily_capacity_donum(),
            seed_quota_donum: self.schedule.seed_quota_donum(),
        }
    }

    /// The view the capacity manager works on.
    pub fn capacity(&self) -> PilotCapacity {
        PilotCapacity {
            pilot_id: self.id,
            province: self.province.clone(),
            work_days: self.schedule.work_days().to_vec(),
            daily_capacity: self.schedule.daily_capacity_donum(),
        }
    }
}

// =============================================================================
// Capacity View
// =============================================================================

/// Capacity facts about one pilot, as the capacity manager sees them.
///
/// Unlike [`PilotSchedule`] this is not range checked; a zero capacity is
/// caught when the view is used.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PilotCapacity {
    pub pilot_id: PilotId,
    pub province: String,
    pub work_days: Vec<Weekday>,
    pub daily_capacity: u32,
}

impl PilotCapacity {
    pub fn works_on(&self, date: NaiveDate) -> bool {
        self.work_days.contains(&date.weekday())
    }
}

impl From<&Pilot> for PilotCapacity {
    fn from(pilot: &Pilot) -> Self {
        pilot.capacity()
    }
}
