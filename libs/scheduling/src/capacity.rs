//! Pilot availability and utilization queries.
//!
//! Everything here is a pure function of a capacity view, a date (or range)
//! and a snapshot of existing assignments.

use chrono::{Days, NaiveDate};
use serde::{Deserialize, Serialize};
use tarla_id::{MissionId, PilotId};
use tracing::debug;

use crate::error::{SchedulingError, SchedulingResult};
use crate::pilot::PilotCapacity;

/// Reason given when the date is not one of the pilot's work days.
pub const REASON_NOT_WORKING_DAY: &str = "not a working day";

/// Reason given when the day's capacity is used up.
pub const REASON_CAPACITY_FULL: &str = "capacity full";

/// An existing commitment of a pilot on a date.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PilotAssignment {
    pub pilot_id: PilotId,
    pub mission_id: MissionId,
    pub date: NaiveDate,
    /// Capacity units the assignment occupies. One per assignment unless
    /// the snapshot weights assignments (for example by area).
    #[serde(default = "one_unit")]
    pub units: u32,
}

fn one_unit() -> u32 {
    1
}

impl PilotAssignment {
    pub fn new(pilot_id: PilotId, mission_id: MissionId, date: NaiveDate) -> Self {
        Self {
            pilot_id,
            mission_id,
            date,
            units: 1,
        }
    }

    pub fn weighted(mut self, units: u32) -> Self {
        self.units = units;
        self
    }
}

/// Result of a single-day availability check.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CapacityCheck {
    pub pilot_id: PilotId,
    pub date: NaiveDate,
    pub available: bool,
    pub current_load: u32,
    pub daily_capacity: u32,
    pub remaining: u32,
    /// Empty when available.
    pub reason: &'static str,
}

/// A day in a range on which the pilot can take more work.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AvailabilitySlot {
    pub pilot_id: PilotId,
    pub date: NaiveDate,
    pub remaining_capacity: u32,
}

/// Stateless capacity queries.
#[derive(Debug, Clone, Copy, Default)]
pub struct CapacityManager;

impl CapacityManager {
    pub fn new() -> Self {
        Self
    }

    /// Checks whether `pilot` can take more work on `date`.
    pub fn check_availability(
        &self,
        pilot: &PilotCapacity,
        date: NaiveDate,
        assignments: &[PilotAssignment],
    ) -> SchedulingResult<CapacityCheck> {
        ensure_positive(pilot)?;

        if !pilot.works_on(date) {
            return Ok(CapacityCheck {
                pilot_id: pilot.pilot_id,
                date,
                available: false,
                current_load: 0,
                daily_capacity: pilot.daily_capacity,
                remaining: 0,
                reason: REASON_NOT_WORKING_DAY,
            });
        }

        let current_load = load_on(pilot.pilot_id, date, assignments);
        let remaining = pilot.daily_capacity.saturating_sub(current_load);
        let available = remaining > 0;

        Ok(CapacityCheck {
            pilot_id: pilot.pilot_id,
            date,
            available,
            current_load,
            daily_capacity: pilot.daily_capacity,
            remaining,
            reason: if available { "" } else { REASON_CAPACITY_FULL },
        })
    }

    /// Every day in `[start, end]` the pilot still has room, in date order.
    pub fn find_available_slots(
        &self,
        pilot: &PilotCapacity,
        start: NaiveDate,
        end: NaiveDate,
        assignments: &[PilotAssignment],
    ) -> SchedulingResult<Vec<AvailabilitySlot>> {
        ensure_range(start, end)?;

        let mut slots = Vec::new();
        for date in days_inclusive(start, end) {
            let check = self.check_availability(pilot, date, assignments)?;
            if check.available {
                slots.push(AvailabilitySlot {
                    pilot_id: pilot.pilot_id,
                    date,
                    remaining_capacity: check.remaining,
                });
            }
        }

        debug!(
            pilot_id = %pilot.pilot_id,
            %start,
            %end,
            slots = slots.len(),
            "Computed availability slots"
        );

        Ok(slots)
    }

    /// Used share of capacity over the working days in `[start, end]`.
    ///
    /// Load is capped at the daily capacity per day. Returns 0.0 when the
    /// range holds no working day.
    pub fn calculate_utilization(
        &self,
        pilot: &PilotCapacity,
        start: NaiveDate,
        end: NaiveDate,
        assignments: &[PilotAssignment],
    ) -> SchedulingResult<f64> {
        ensure_range(start, end)?;

        let mut total_capacity: u64 = 0;
        let mut total_used: u64 = 0;

        for date in days_inclusive(start, end).filter(|d| pilot.works_on(*d)) {
            total_capacity += u64::from(pilot.daily_capacity);
            let load = load_on(pilot.pilot_id, date, assignments).min(pilot.daily_capacity);
            total_used += u64::from(load);
        }

        if total_capacity == 0 {
            return Ok(0.0);
        }

        Ok(total_used as f64 / total_capacity as f64)
    }

    /// Provinces match only on exact equality.
    pub fn is_province_authorized(&self, pilot: &PilotCapacity, province: &str) -> bool {
        pilot.province == province
    }
}

fn ensure_positive(pilot: &PilotCapacity) -> SchedulingResult<()> {
    if pilot.daily_capacity == 0 {
        return Err(SchedulingError::NonPositiveCapacity {
            pilot_id: pilot.pilot_id,
        });
    }
    Ok(())
}

fn ensure_range(start: NaiveDate, end: NaiveDate) -> SchedulingResult<()> {
    if start > end {
        return Err(SchedulingError::InvalidDateRange { start, end });
    }
    Ok(())
}

fn load_on(pilot_id: PilotId, date: NaiveDate, assignments: &[PilotAssignment]) -> u32 {
    assignments
        .iter()
        .filter(|a| a.pilot_id == pilot_id && a.date == date)
        .fold(0u32, |acc, a| acc.saturating_add(a.units))
}

/// Calendar days from `start` through `end`.
pub(crate) fn days_inclusive(start: NaiveDate, end: NaiveDate) -> impl Iterator<Item = NaiveDate> {
    std::iter::successors(Some(start), |d| d.checked_add_days(Days::new(1)))
        .take_while(move |d| *d <= end)
}
