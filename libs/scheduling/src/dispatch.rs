//! Greedy mission-to-pilot dispatch.
//!
//! One pass over the missions in input order. Each mission goes to the most
//! reliable pilot in its territory; equal scores go to the lowest pilot id.
//! No backtracking and no rebalancing across missions.

use std::cmp::Ordering;
use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use tarla_id::{MissionId, PilotId};
use tracing::{debug, info};

use crate::error::{SchedulingError, SchedulingResult};
use crate::mission::Mission;
use crate::pilot::Pilot;
use crate::policy::{AssignmentPolicy, OverrideMetadata};

/// One mission matched to one pilot.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DispatchDecision {
    pub mission_id: MissionId,
    pub pilot_id: PilotId,
    pub policy: AssignmentPolicy,
}

/// Rule-based dispatcher.
#[derive(Debug, Clone, Copy, Default)]
pub struct AutoDispatcher;

impl AutoDispatcher {
    pub fn new() -> Self {
        Self
    }

    /// Matches missions to pilots, tagging decisions `SYSTEM_SEED / AUTO_DISPATCH`.
    ///
    /// Missions whose territory has no pilot are skipped without a decision.
    pub fn dispatch(&self, missions: &[Mission], pilots: &[Pilot]) -> Vec<DispatchDecision> {
        self.dispatch_with(missions, pilots, &AssignmentPolicy::auto_dispatch())
    }

    /// Same matching as [`dispatch`](Self::dispatch) with a caller-chosen tag.
    pub fn dispatch_with(
        &self,
        missions: &[Mission],
        pilots: &[Pilot],
        policy: &AssignmentPolicy,
    ) -> Vec<DispatchDecision> {
        let mut by_territory: HashMap<&str, Vec<&Pilot>> = HashMap::new();
        for pilot in pilots {
            by_territory.entry(pilot.province()).or_default().push(pilot);
        }

        let mut decisions = Vec::with_capacity(missions.len());
        for mission in missions {
            let Some(chosen) = by_territory
                .get(mission.territory.as_str())
                .and_then(|pool| best_candidate(pool))
            else {
                debug!(
                    mission_id = %mission.id,
                    territory = %mission.territory,
                    "No candidate pilot in territory"
                );
                continue;
            };

            decisions.push(DispatchDecision {
                mission_id: mission.id,
                pilot_id: chosen.id(),
                policy: policy.clone(),
            });
        }

        info!(
            missions = missions.len(),
            pilots = pilots.len(),
            decisions = decisions.len(),
            reason = %policy.reason,
            "Dispatch pass complete"
        );

        decisions
    }

    /// Manual assignment by an admin. Territory still has to match.
    pub fn override_assignment(
        &self,
        mission: &Mission,
        pilot: &Pilot,
        meta: OverrideMetadata,
    ) -> SchedulingResult<DispatchDecision> {
        if mission.territory != pilot.province() {
            return Err(SchedulingError::TerritoryMismatch {
                mission_id: mission.id,
                pilot_id: pilot.id(),
                mission_territory: mission.territory.clone(),
                pilot_territory: pilot.province().to_string(),
            });
        }

        info!(
            mission_id = %mission.id,
            pilot_id = %pilot.id(),
            admin_id = %meta.admin_id,
            "Admin override assignment"
        );

        Ok(DispatchDecision {
            mission_id: mission.id,
            pilot_id: pilot.id(),
            policy: AssignmentPolicy::admin_override(meta.admin_id, meta.reason_text, meta.timestamp),
        })
    }
}

/// Highest reliability, then lowest id.
fn best_candidate<'a>(pool: &[&'a Pilot]) -> Option<&'a Pilot> {
    pool.iter().copied().max_by(|a, b| rank(a, b))
}

fn rank(a: &Pilot, b: &Pilot) -> Ordering {
    a.reliability()
        .value()
        .total_cmp(&b.reliability().value())
        // Reversed so the lower id ranks higher.
        .then_with(|| b.id().cmp(&a.id()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mission::ScheduleWindow;
    use crate::pilot::PilotSchedule;
    use crate::policy::AssignmentReason;
    use chrono::{NaiveDate, Utc, Weekday};
    use tarla_events::AssignmentSource;
    use tarla_id::{AdminId, FieldId, Ulid};

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn mission(territory: &str) -> Mission {
        let window = ScheduleWindow::new(date(2026, 1, 1), date(2026, 1, 31)).unwrap();
        Mission::planned(territory, FieldId::new(), date(2026, 1, 5), window, 900)
    }

    fn pilot_with(id: PilotId, territory: &str, score: f64) -> Pilot {
        let schedule = PilotSchedule::with_defaults([Weekday::Mon, Weekday::Tue]).unwrap();
        Pilot::with_id(id, territory, schedule, score).unwrap()
    }

    fn pilot(territory: &str, score: f64) -> Pilot {
        pilot_with(PilotId::new(), territory, score)
    }

    #[test]
    fn test_picks_most_reliable_in_territory() {
        let p1 = pilot("T1", 0.9);
        let p2 = pilot("T1", 0.7);
        let m1 = mission("T1");
        let m3 = mission("T3");

        let decisions = AutoDispatcher::new().dispatch(&[m1.clone(), m3], &[p2, p1.clone()]);

        assert_eq!(decisions.len(), 1);
        assert_eq!(decisions[0].mission_id, m1.id);
        assert_eq!(decisions[0].pilot_id, p1.id());
        assert_eq!(decisions[0].policy.source, AssignmentSource::SystemSeed);
        assert_eq!(decisions[0].policy.reason, AssignmentReason::AutoDispatch);
    }

    #[test]
    fn test_tie_breaks_on_lowest_pilot_id() {
        let low = PilotId::from_ulid(Ulid(1));
        let high = PilotId::from_ulid(Ulid(2));
        let pilots = [pilot_with(high, "T1", 0.8), pilot_with(low, "T1", 0.8)];

        let decisions = AutoDispatcher::new().dispatch(&[mission("T1")], &pilots);
        assert_eq!(decisions[0].pilot_id, low);

        // Input order does not matter.
        let reversed = [pilots[1].clone(), pilots[0].clone()];
        let decisions = AutoDispatcher::new().dispatch(&[mission("T1")], &reversed);
        assert_eq!(decisions[0].pilot_id, low);
    }

    #[test]
    fn test_decisions_follow_input_order() {
        let p = pilot("T1", 0.5);
        let missions = [mission("T1"), mission("T2"), mission("T1")];

        let decisions = AutoDispatcher::new().dispatch(&missions, &[p]);

        let ids: Vec<_> = decisions.iter().map(|d| d.mission_id).collect();
        assert_eq!(ids, vec![missions[0].id, missions[2].id]);
    }

    #[test]
    fn test_empty_inputs() {
        let dispatcher = AutoDispatcher::new();
        assert!(dispatcher.dispatch(&[], &[pilot("T1", 1.0)]).is_empty());
        assert!(dispatcher.dispatch(&[mission("T1")], &[]).is_empty());
    }

    #[test]
    fn test_dispatch_with_reassignment_tag() {
        let p = pilot("T1", 0.5);
        let decisions = AutoDispatcher::new().dispatch_with(
            &[mission("T1")],
            &[p],
            &AssignmentPolicy::reassignment(),
        );
        assert_eq!(decisions[0].policy.reason, AssignmentReason::Reassignment);
    }

    #[test]
    fn test_override_assignment() {
        let m = mission("T1");
        let p = pilot("T1", 0.1);
        let meta = OverrideMetadata {
            admin_id: AdminId::new(),
            reason_text: "farmer asked for this pilot".into(),
            timestamp: Utc::now(),
        };

        let decision = AutoDispatcher::new()
            .override_assignment(&m, &p, meta.clone())
            .unwrap();

        assert_eq!(decision.pilot_id, p.id());
        assert_eq!(decision.policy.source, AssignmentSource::Pull);
        assert_eq!(decision.policy.reason, AssignmentReason::AdminOverride);
        assert_eq!(decision.policy.override_meta, Some(meta));
    }

    #[test]
    fn test_override_rejects_other_territory() {
        let m = mission("T1");
        let p = pilot("T2", 1.0);
        let meta = OverrideMetadata {
            admin_id: AdminId::new(),
            reason_text: "test".into(),
            timestamp: Utc::now(),
        };

        let err = AutoDispatcher::new()
            .override_assignment(&m, &p, meta)
            .unwrap_err();
        assert!(matches!(err, SchedulingError::TerritoryMismatch { .. }));
        assert!(!err.is_internal());
    }
}
