//! Batch recompute of the next session for every schedulable item.

use std::collections::HashMap;

use chrono::NaiveDate;
use uuid::Uuid;

use crate::history::latest;
use crate::library::Library;
use crate::scheduler::{ScheduleRequest, Scheduler};
use crate::session::ScheduledSession;
use crate::stability::StabilityRecord;

/// Score assumed for replanning an item that has never been practiced.
const NEUTRAL_SCORE: f64 = 5.0;

/// Plan one open session per schedulable item.
///
/// Each item is replanned in zero-rep mode anchored at its last practice
/// date (or `today`), so replanning never counts as a session. Dates are
/// never earlier than `today`. Existing open sessions keep their ids.
pub fn schedule_future_sessions(
    scheduler: &Scheduler,
    library: &Library,
    stability: &HashMap<Uuid, StabilityRecord>,
    current_sessions: &[ScheduledSession],
    today: NaiveDate,
) -> Vec<ScheduledSession> {
    let open_ids: HashMap<Uuid, Uuid> = current_sessions
        .iter()
        .filter(|s| s.is_open())
        .map(|s| (s.item_id, s.id))
        .collect();

    let mut planned = Vec::new();
    let mut skipped = 0usize;
    for item in library.items() {
        if !library.is_schedulable(item) {
            skipped += 1;
            continue;
        }
        let history = library.history_for_item(item.id);
        let anchor = item
            .last_practice_date
            .filter(|d| *d <= today)
            .unwrap_or(today);
        let score = latest(history)
            .map(|h| h.sanitized_score())
            .unwrap_or(NEUTRAL_SCORE);

        let request = ScheduleRequest::new(item, history, score, anchor)
            .with_stability(stability.get(&item.id));
        let decision = scheduler.calculate_next_practice_date(&request);
        let date = decision.next_date.max(today);

        let mut session = ScheduledSession::planned(item.id, item.owner_id, date, decision.tau);
        if let Some(id) = open_ids.get(&item.id) {
            session.id = *id;
        }
        planned.push(session);
    }

    tracing::info!(
        "planned {} sessions ({skipped} items skipped)",
        planned.len()
    );
    planned
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::history::{HistoryEntry, SessionOutcome};
    use crate::item::{Difficulty, LifecycleState, Owner, OwnerState, PracticeItem};

    fn day(d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2026, 4, d).unwrap()
    }

    #[test]
    fn test_plans_one_session_per_schedulable_item() {
        let owner = Owner::new("ana");
        let mut paused = Owner::new("ben");
        paused.state = OwnerState::Paused;
        let a = PracticeItem::new(owner.id, "a", Difficulty::Average);
        let mut retired = PracticeItem::new(owner.id, "b", Difficulty::Average);
        retired.lifecycle = LifecycleState::Inactive;
        let c = PracticeItem::new(paused.id, "c", Difficulty::Average);
        let lib = Library::from_parts(vec![owner, paused], vec![a.clone(), retired, c], vec![]);

        let plan = schedule_future_sessions(&Scheduler::default(), &lib, &HashMap::new(), &[], day(10));
        assert_eq!(plan.len(), 1);
        assert_eq!(plan[0].item_id, a.id);
        assert!(plan[0].scheduled_date >= day(10));
    }

    #[test]
    fn test_reuses_open_session_id_and_never_plans_in_past() {
        let owner = Owner::new("ana");
        let mut item = PracticeItem::new(owner.id, "a", Difficulty::Average);
        item.last_practice_date = Some(day(1));
        let history = vec![HistoryEntry {
            repetitions: 3,
            performance_score: 7.0,
            ..HistoryEntry::new(item.id, day(1), SessionOutcome::TargetReached)
        }];
        let existing = ScheduledSession::planned(item.id, owner.id, day(2), 5.0);
        let lib = Library::from_parts(vec![owner], vec![item], history);

        let plan = schedule_future_sessions(
            &Scheduler::default(),
            &lib,
            &HashMap::new(),
            std::slice::from_ref(&existing),
            day(15),
        );
        assert_eq!(plan.len(), 1);
        assert_eq!(plan[0].id, existing.id);
        assert_eq!(plan[0].scheduled_date, day(15));
    }
}
