//! Property tests over dispatch, reschedule and capacity invariants.

use std::sync::Arc;

use chrono::{Days, NaiveDate, Weekday};
use proptest::prelude::*;
use tarla_id::{FieldId, MissionId, PilotId};
use tarla_scheduling::ports::PilotAvailability;
use tarla_scheduling::{
    AutoDispatcher, CapacityManager, Mission, Pilot, PilotAssignment, PilotCapacity,
    PilotSchedule, RescheduleOutcome, RescheduleService, ScheduleWindow, Subscription,
};

const TERRITORIES: [&str; 4] = ["Konya", "Ankara", "Eskisehir", "Van"];

struct Availability(bool);

impl PilotAvailability for Availability {
    fn is_available(&self, _pilot_id: PilotId, _date: NaiveDate) -> bool {
        self.0
    }
}

fn base() -> NaiveDate {
    NaiveDate::from_ymd_opt(2026, 3, 1).unwrap()
}

fn march() -> ScheduleWindow {
    ScheduleWindow::new(base(), NaiveDate::from_ymd_opt(2026, 3, 31).unwrap()).unwrap()
}

fn assigned_mission() -> Mission {
    let mut mission = Mission::planned("Konya", FieldId::new(), base(), march(), 900);
    mission.assign(PilotId::new()).unwrap();
    mission
}

fn pilots_strategy() -> impl Strategy<Value = Vec<(usize, f64)>> {
    prop::collection::vec((0..TERRITORIES.len(), 0.0f64..=1.0), 0..8)
}

fn missions_strategy() -> impl Strategy<Value = Vec<usize>> {
    prop::collection::vec(0..TERRITORIES.len(), 0..12)
}

proptest! {
    #[test]
    fn prop_dispatch_never_crosses_territory(
        pilot_specs in pilots_strategy(),
        mission_specs in missions_strategy(),
    ) {
        let schedule = PilotSchedule::with_defaults([Weekday::Mon]).unwrap();
        let pilots: Vec<Pilot> = pilot_specs
            .iter()
            .map(|(t, score)| Pilot::register(TERRITORIES[*t], schedule.clone(), *score).unwrap())
            .collect();
        let missions: Vec<Mission> = mission_specs
            .iter()
            .map(|t| Mission::planned(TERRITORIES[*t], FieldId::new(), base(), march(), 500))
            .collect();

        let decisions = AutoDispatcher::new().dispatch(&missions, &pilots);

        for decision in &decisions {
            let mission = missions.iter().find(|m| m.id == decision.mission_id).unwrap();
            let pilot = pilots.iter().find(|p| p.id() == decision.pilot_id).unwrap();
            prop_assert_eq!(mission.territory.as_str(), pilot.province());

            // Nobody in the territory scores higher than the chosen pilot.
            let best = pilots
                .iter()
                .filter(|p| p.province() == mission.territory)
                .map(|p| p.reliability().value())
                .fold(f64::MIN, f64::max);
            prop_assert_eq!(pilot.reliability().value(), best);
        }

        let served = missions
            .iter()
            .filter(|m| pilots.iter().any(|p| p.province() == m.territory))
            .count();
        prop_assert_eq!(decisions.len(), served);
    }

    #[test]
    fn prop_no_tokens_denies_any_date(offset in 0u64..120, available in any::<bool>()) {
        let service = RescheduleService::new(Arc::new(Availability(available)));
        let subscription = Subscription::new(march(), 0);
        let new_date = base().checked_sub_days(Days::new(30)).unwrap() + Days::new(offset);

        let outcome = service.reschedule(&subscription, &assigned_mission(), new_date);
        prop_assert_eq!(outcome.reason_code(), "NO_TOKENS");
    }

    #[test]
    fn prop_window_is_checked_before_pilot(offset in 31u64..200, tokens in 1u32..5) {
        let service = RescheduleService::new(Arc::new(Availability(false)));
        let subscription = Subscription::new(march(), tokens);
        let new_date = base() + Days::new(offset);

        let outcome = service.reschedule(&subscription, &assigned_mission(), new_date);
        prop_assert_eq!(outcome.reason_code(), "OUT_OF_WINDOW");
    }

    #[test]
    fn prop_approval_consumes_exactly_one_token(offset in 0u64..31, tokens in 1u32..5) {
        let service = RescheduleService::new(Arc::new(Availability(true)));
        let subscription = Subscription::new(march(), tokens);
        let new_date = base() + Days::new(offset);

        match service.reschedule(&subscription, &assigned_mission(), new_date) {
            RescheduleOutcome::Approved { new_date: d, tokens_remaining } => {
                prop_assert_eq!(d, new_date);
                prop_assert_eq!(tokens_remaining, tokens - 1);
            }
            other => prop_assert!(false, "expected approval, got {:?}", other),
        }
    }

    #[test]
    fn prop_remaining_never_exceeds_capacity(capacity in 1u32..6, load in 0usize..10) {
        let pilot = PilotCapacity {
            pilot_id: PilotId::new(),
            province: "Konya".to_string(),
            work_days: vec![Weekday::Mon],
            daily_capacity: capacity,
        };
        // 2026-03-02 is a Monday.
        let day = NaiveDate::from_ymd_opt(2026, 3, 2).unwrap();
        let assignments: Vec<_> = (0..load)
            .map(|_| PilotAssignment::new(pilot.pilot_id, MissionId::new(), day))
            .collect();

        let check = CapacityManager::new()
            .check_availability(&pilot, day, &assignments)
            .unwrap();

        prop_assert!(check.remaining <= capacity);
        prop_assert_eq!(check.available, (load as u32) < capacity);
        prop_assert_eq!(check.remaining, capacity.saturating_sub(load as u32));
    }
}
