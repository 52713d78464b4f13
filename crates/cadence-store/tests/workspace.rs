//! End-to-end tests over an on-disk workspace: library, schedule table and
//! stability table together.

use cadence_core::{
    Difficulty, MATURE_STAGE, Owner, OwnerState, PracticeItem, SchedulePath, SessionOutcome,
    SessionStatus, StabilityRecord,
};
use cadence_store::{Mutation, MutationContext, SessionLog, Workspace};
use chrono::NaiveDate;
use tempfile::TempDir;
use uuid::Uuid;

fn day(d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(2026, 5, d).unwrap()
}

fn workspace() -> (TempDir, Workspace) {
    let dir = tempfile::tempdir().unwrap();
    let ws = Workspace::open(Some(dir.path())).unwrap();
    (dir, ws)
}

fn seed(ws: &Workspace, names: &[&str]) -> (Owner, Vec<PracticeItem>) {
    let owner = Owner::new("mira");
    ws.library().add_owner(&owner).unwrap();
    let items = names
        .iter()
        .map(|name| {
            let item = PracticeItem::new(owner.id, name, Difficulty::Average);
            ws.library().upsert_item(&item).unwrap();
            item
        })
        .collect();
    (owner, items)
}

fn log(item_id: Uuid, score: f64, reps: u32) -> SessionLog {
    SessionLog {
        duration_seconds: 900,
        ..SessionLog::new(item_id, score, reps)
    }
}

#[test]
fn foundation_ramp_through_workspace() {
    let (_dir, ws) = workspace();
    let (_, items) = seed(&ws, &["scales"]);
    let id = items[0].id;

    for d in 1..=3 {
        let report = ws.record_session(&log(id, 7.0, 3), day(d)).unwrap();
        let decision = report.decision.unwrap();
        assert_eq!(decision.path, SchedulePath::Foundation);
        assert_eq!(decision.next_date, day(d + 1));
        assert_eq!(report.completed_session.is_some(), d > 1);
    }

    let item = ws.library().require_item(id).unwrap();
    assert_eq!(item.foundation_stage, MATURE_STAGE);
    assert_eq!(item.completed_repetitions, 9);
    assert_eq!(item.next_due_date, Some(day(4)));

    let sessions = ws.schedule().sessions();
    assert_eq!(sessions.iter().filter(|s| s.is_open()).count(), 1);
    assert_eq!(
        sessions
            .iter()
            .filter(|s| s.status == SessionStatus::Completed)
            .count(),
        2
    );
}

#[test]
fn extra_practice_keeps_due_date() {
    let (_dir, ws) = workspace();
    let (_, items) = seed(&ws, &["arpeggios"]);
    let id = items[0].id;

    ws.record_session(&log(id, 6.0, 2), day(1)).unwrap();
    let due = ws.schedule().open_for_item(id).unwrap().scheduled_date;

    let extra = SessionLog {
        context: MutationContext::PreserveDueDate,
        ..log(id, 9.0, 4)
    };
    let report = ws.record_session(&extra, day(1)).unwrap();
    assert_eq!(report.mutation, Mutation::Skipped);
    assert!(report.decision.is_none());

    assert_eq!(ws.schedule().open_for_item(id).unwrap().scheduled_date, due);
    let item = ws.library().require_item(id).unwrap();
    assert_eq!(item.completed_repetitions, 6);
    assert_eq!(item.next_due_date, Some(due));
    assert_eq!(ws.library().history_for_item(id).unwrap().len(), 2);
}

#[test]
fn paused_owner_records_without_scheduling() {
    let (_dir, ws) = workspace();
    let (owner, items) = seed(&ws, &["etude"]);
    ws.library()
        .set_owner_state(owner.id, OwnerState::Paused)
        .unwrap();

    let report = ws.record_session(&log(items[0].id, 7.0, 3), day(2)).unwrap();
    assert!(report.scheduled.is_none());
    assert!(ws.schedule().is_empty());
    assert_eq!(
        ws.library().require_item(items[0].id).unwrap().completed_repetitions,
        3
    );
}

#[test]
fn maintenance_moves_overdue_and_drops_orphans() {
    let (_dir, ws) = workspace();
    let (_, items) = seed(&ws, &["a", "b"]);
    for item in &items {
        ws.record_session(&log(item.id, 7.0, 3), day(1)).unwrap();
    }
    // Removing the row directly leaves its session behind.
    ws.library().remove_item(items[1].id).unwrap();

    let report = ws.run_maintenance(day(10)).unwrap();
    assert_eq!(report.orphans_removed, 1);
    assert_eq!(report.rescheduled, 1);
    assert_eq!(report.completed, 0);

    let open = ws.schedule().open_for_item(items[0].id).unwrap();
    assert!(open.scheduled_date > day(10));
    assert!(ws.schedule().open_for_item(items[1].id).is_none());
}

#[test]
fn maintenance_completes_todays_practice() {
    let (_dir, ws) = workspace();
    let (_, items) = seed(&ws, &["chorale"]);
    let id = items[0].id;
    ws.record_session(&log(id, 7.0, 3), day(1)).unwrap();

    // Practice logged straight into history, bypassing record_session.
    let mut entry = cadence_core::HistoryEntry::new(id, day(2), SessionOutcome::TargetNotReached);
    entry.repetitions = 2;
    ws.library().add_history(&entry).unwrap();

    let report = ws.run_maintenance(day(2)).unwrap();
    assert_eq!(report.completed, 1);
    assert_eq!(report.rescheduled, 0);
}

#[test]
fn remove_item_cascades() {
    let (_dir, ws) = workspace();
    let (_, items) = seed(&ws, &["sonata"]);
    let id = items[0].id;
    ws.record_session(&log(id, 7.0, 3), day(1)).unwrap();

    assert!(ws.remove_item(id).unwrap());
    assert!(ws.library().item(id).unwrap().is_none());
    assert!(ws.schedule().is_empty());
    assert!(!ws.remove_item(id).unwrap());
}

#[test]
fn merge_items_combines_progress() {
    let (_dir, ws) = workspace();
    let (_, items) = seed(&ws, &["left hand", "right hand"]);
    let (old, new) = (items[0].id, items[1].id);
    ws.record_session(&log(old, 7.0, 4), day(1)).unwrap();
    ws.record_session(&log(old, 7.0, 4), day(2)).unwrap();
    ws.record_session(&log(new, 6.0, 2), day(2)).unwrap();

    let report = ws.merge_items(&[old], new).unwrap();
    assert_eq!(report.merged_items, 1);
    assert_eq!(report.moved_history, 2);

    let merged = ws.library().require_item(new).unwrap();
    assert_eq!(merged.completed_repetitions, 10);
    assert_eq!(merged.foundation_stage, 2);
    assert_eq!(ws.library().history_for_item(new).unwrap().len(), 3);
    assert!(ws.library().item(old).unwrap().is_none());
    assert!(ws.schedule().open_for_item(old).is_none());
    assert!(ws.schedule().open_for_item(new).is_some());

    assert!(ws.merge_items(&[Uuid::new_v4()], new).is_err());
}

#[test]
fn merge_items_counts_repeated_ids_once() {
    let (_dir, ws) = workspace();
    let (_, items) = seed(&ws, &["verse", "chorus"]);
    let (old, new) = (items[0].id, items[1].id);
    ws.record_session(&log(old, 7.0, 4), day(1)).unwrap();
    ws.record_session(&log(new, 6.0, 2), day(2)).unwrap();
    for (id, stability, reviews) in [(old, 20.0, 10), (new, 5.0, 2)] {
        ws.stability()
            .upsert(StabilityRecord {
                item_id: id,
                stability,
                difficulty: 0.3,
                last_review_date: day(2),
                review_count: reviews,
                created_date: day(1),
            })
            .unwrap();
    }

    let report = ws.merge_items(&[old, old, new], new).unwrap();
    assert_eq!(report.merged_items, 1);
    assert_eq!(report.moved_history, 1);
    assert_eq!(report.stability.unwrap().review_count, 12);
    assert_eq!(ws.library().require_item(new).unwrap().completed_repetitions, 6);
    assert_eq!(ws.stability().len(), 1);
    assert!(ws.stability().get(old).is_none());
}

#[test]
fn replan_keeps_running_frustration_cooldown() {
    let (_dir, ws) = workspace();
    let (_, items) = seed(&ws, &["nocturne"]);
    let id = items[0].id;
    let frustrated = SessionLog {
        outcome: SessionOutcome::Frustration,
        ..log(id, 3.0, 2)
    };
    let report = ws.record_session(&frustrated, day(5)).unwrap();
    let decision = report.decision.unwrap();
    assert_eq!(decision.path, SchedulePath::FrustrationCooldown);
    assert_eq!(decision.next_date, day(8));

    ws.replan_all(day(6), MutationContext::Normal).unwrap();
    assert_eq!(ws.schedule().open_for_item(id).unwrap().scheduled_date, day(8));
    let item = ws.library().require_item(id).unwrap();
    assert_eq!(item.next_due_date, Some(day(8)));
    assert_eq!(item.last_frustration_date, Some(day(5)));
}

#[test]
fn replan_updates_sessions_and_items() {
    let (_dir, ws) = workspace();
    let (_, items) = seed(&ws, &["one", "two", "three"]);
    for item in &items {
        ws.record_session(&log(item.id, 5.0, 2), day(1)).unwrap();
    }

    assert_eq!(
        ws.replan_all(day(6), MutationContext::PreserveDueDate).unwrap(),
        Mutation::Skipped
    );
    assert_eq!(
        ws.replan_all(day(6), MutationContext::Normal).unwrap(),
        Mutation::Applied(3)
    );
    for item in &items {
        let open = ws.schedule().open_for_item(item.id).unwrap();
        assert!(open.scheduled_date >= day(6));
        let stored = ws.library().require_item(item.id).unwrap();
        assert_eq!(stored.next_due_date, Some(open.scheduled_date));
    }
}

#[test]
fn reopen_restores_everything() {
    let dir = tempfile::tempdir().unwrap();
    let id = {
        let ws = Workspace::open(Some(dir.path())).unwrap();
        let (_, items) = seed(&ws, &["fugue"]);
        ws.record_session(&log(items[0].id, 8.0, 3), day(3)).unwrap();
        items[0].id
    };

    let ws = Workspace::open(Some(dir.path())).unwrap();
    let stats = ws.stats().unwrap();
    assert_eq!(stats.owners, 1);
    assert_eq!(stats.items, 1);
    assert_eq!(stats.history_entries, 1);
    assert_eq!(stats.open_sessions, 1);
    assert_eq!(ws.schedule().open_for_item(id).unwrap().scheduled_date, day(4));
}

#[test]
fn retention_curve_is_monotone() {
    let (_dir, ws) = workspace();
    let (_, items) = seed(&ws, &["minuet"]);
    let curve = ws.retention_curve(items[0].id, 30).unwrap();
    assert_eq!(curve.len(), 31);
    assert!(curve.windows(2).all(|w| w[1] <= w[0]));
    assert!(ws.retention_curve(Uuid::new_v4(), 30).is_err());
}
