//! Persistent "next session" table with the one-open-entry-per-item rule.
//!
//! Every mutator takes the store mutex for the whole
//! copy → modify → persist → swap sequence. If the save fails the in-memory
//! table is left as it was.

use std::collections::{HashMap, HashSet};
use std::path::Path;
use std::sync::mpsc;

use chrono::NaiveDate;
use parking_lot::Mutex;
use uuid::Uuid;

use cadence_core::constants::PREP_ONLY_MIN_SECONDS;
use cadence_core::history::{classify_day, entries_on, latest};
use cadence_core::time::tomorrow;
use cadence_core::{
    CompletionReason, DayClassification, HistoryEntry, Library, ScheduleRequest,
    ScheduledSession, SchedulePath, Scheduler, SessionStatus, StabilityRecord,
};

use crate::error::Result;
use crate::json_table::JsonTable;

/// Whether a mutation may move due dates.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum MutationContext {
    #[default]
    Normal,
    /// Same-day bonus practice: date-moving calls become no-ops.
    PreserveDueDate,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mutation {
    /// Persisted; the count of records added, changed or removed.
    Applied(usize),
    Unchanged,
    /// Suppressed by [`MutationContext::PreserveDueDate`].
    Skipped,
}

impl Mutation {
    pub fn count(&self) -> usize {
        match self {
            Mutation::Applied(n) => *n,
            Mutation::Unchanged | Mutation::Skipped => 0,
        }
    }
}

/// Sent to subscribers after every persisted change.
#[derive(Debug, Clone, PartialEq)]
pub enum ScheduleChange {
    Added { item_id: Uuid, session_id: Uuid },
    StatusUpdated { session_id: Uuid, status: SessionStatus },
    Completed { item_id: Uuid, session_id: Uuid },
    Rescheduled { count: usize },
    Removed { count: usize },
    Repaired { count: usize },
    Replaced { count: usize },
}

/// Score assumed when rescheduling an item with no history.
const NEUTRAL_SCORE: f64 = 5.0;

pub struct ScheduleStore {
    table: JsonTable<ScheduledSession>,
    max_records: usize,
    sessions: Mutex<Vec<ScheduledSession>>,
    subscribers: Mutex<Vec<mpsc::Sender<ScheduleChange>>>,
}

impl ScheduleStore {
    pub fn open(path: &Path, max_records: usize) -> Result<Self> {
        let table = JsonTable::new(path);
        let mut sessions = table.load()?;
        let dropped = enforce_single_open(&mut sessions);
        if dropped > 0 {
            tracing::warn!(
                "{}: dropped {dropped} superseded open sessions on load",
                path.display()
            );
        }
        tracing::info!("loaded {} scheduled sessions", sessions.len());
        Ok(Self {
            table,
            max_records: max_records.max(1),
            sessions: Mutex::new(sessions),
            subscribers: Mutex::new(Vec::new()),
        })
    }

    /// Receive a [`ScheduleChange`] for every persisted mutation.
    pub fn subscribe(&self) -> mpsc::Receiver<ScheduleChange> {
        let (tx, rx) = mpsc::channel();
        self.subscribers.lock().push(tx);
        rx
    }

    fn notify(&self, change: ScheduleChange) {
        self.subscribers
            .lock()
            .retain(|tx| tx.send(change.clone()).is_ok());
    }

    /// Run `op` on a copy of the table; persist and swap if it reports a change.
    fn mutate<R>(
        &self,
        op: impl FnOnce(&mut Vec<ScheduledSession>) -> (R, Option<ScheduleChange>),
    ) -> Result<R> {
        let mut guard = self.sessions.lock();
        let mut next = guard.clone();
        let (out, change) = op(&mut next);
        let Some(change) = change else {
            return Ok(out);
        };
        self.prune(&mut next);
        if let Err(e) = self.table.save(&next) {
            tracing::error!(
                "failed to save {}: {e}; change not applied",
                self.table.path().display()
            );
            return Err(e);
        }
        *guard = next;
        drop(guard);
        self.notify(change);
        Ok(out)
    }

    /// Keep at most `max_records`, preferring open sessions, then the most
    /// recent by completion date (else scheduled date).
    fn prune(&self, sessions: &mut Vec<ScheduledSession>) {
        if sessions.len() <= self.max_records {
            return;
        }
        let mut ranked: Vec<&ScheduledSession> = sessions.iter().collect();
        ranked.sort_by(|a, b| {
            b.is_open()
                .cmp(&a.is_open())
                .then_with(|| b.recency_key().cmp(&a.recency_key()))
        });
        let keep: HashSet<Uuid> = ranked
            .iter()
            .take(self.max_records)
            .map(|s| s.id)
            .collect();
        let before = sessions.len();
        sessions.retain(|s| keep.contains(&s.id));
        tracing::info!(
            "pruned {} scheduled sessions (limit {})",
            before - sessions.len(),
            self.max_records
        );
    }

    // --- Reads ---

    pub fn sessions(&self) -> Vec<ScheduledSession> {
        self.sessions.lock().clone()
    }

    pub fn len(&self) -> usize {
        self.sessions.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.sessions.lock().is_empty()
    }

    pub fn open_for_item(&self, item_id: Uuid) -> Option<ScheduledSession> {
        self.sessions
            .lock()
            .iter()
            .find(|s| s.item_id == item_id && s.is_open())
            .cloned()
    }

    /// Open sessions due on or before `date`, earliest first.
    pub fn due_on_or_before(&self, date: NaiveDate) -> Vec<ScheduledSession> {
        let mut due: Vec<ScheduledSession> = self
            .sessions
            .lock()
            .iter()
            .filter(|s| s.is_open() && s.scheduled_date <= date)
            .cloned()
            .collect();
        due.sort_by_key(|s| (s.scheduled_date, s.item_id));
        due
    }

    // --- Mutations ---

    /// Insert a session, superseding any open entry for the same item. A
    /// session whose id already exists only updates that entry's status.
    pub fn add(&self, session: ScheduledSession, ctx: MutationContext) -> Result<Mutation> {
        if ctx == MutationContext::PreserveDueDate {
            tracing::info!(
                "preserving due date: skipped add for item {} on {}",
                session.item_id,
                session.scheduled_date
            );
            return Ok(Mutation::Skipped);
        }

        self.mutate(|sessions| {
            if let Some(existing) = sessions.iter_mut().find(|s| s.id == session.id) {
                if existing.status == session.status {
                    return (Mutation::Unchanged, None);
                }
                existing.status = session.status;
                if session.status == SessionStatus::Completed {
                    existing.completion_date = session.completion_date;
                    existing.completion_reason = session.completion_reason;
                } else {
                    existing.completion_date = None;
                    existing.completion_reason = None;
                }
                let item_id = existing.item_id;

                // A reopened entry supersedes the item's other open one.
                let mut superseded = 0usize;
                if session.status != SessionStatus::Completed {
                    let before = sessions.len();
                    sessions.retain(|s| s.id == session.id || !(s.item_id == item_id && s.is_open()));
                    superseded = before - sessions.len();
                    if superseded > 0 {
                        tracing::debug!(
                            "item {item_id}: reopened session {} superseded {superseded} open session(s)",
                            session.id
                        );
                    }
                }
                let change = ScheduleChange::StatusUpdated {
                    session_id: session.id,
                    status: session.status,
                };
                return (Mutation::Applied(1 + superseded), Some(change));
            }

            let before = sessions.len();
            sessions.retain(|s| !(s.item_id == session.item_id && s.is_open()));
            let superseded = before - sessions.len();
            if superseded > 0 {
                tracing::debug!(
                    "item {}: superseded {superseded} open session(s)",
                    session.item_id
                );
            }
            let change = ScheduleChange::Added {
                item_id: session.item_id,
                session_id: session.id,
            };
            sessions.push(session);
            (Mutation::Applied(1 + superseded), Some(change))
        })
    }

    /// Close the item's session planned for today (or earlier) if today's
    /// history counts as practice. Returns the completed session id.
    pub fn complete_today(
        &self,
        item_id: Uuid,
        history: &[HistoryEntry],
        today: NaiveDate,
    ) -> Result<Option<Uuid>> {
        let todays = entries_on(history, today);
        let classification = classify_day(&todays, PREP_ONLY_MIN_SECONDS);
        if !classification.is_complete() {
            tracing::debug!("item {item_id}: today's sessions are {classification:?}, not completing");
            return Ok(None);
        }
        let reason = if classification == DayClassification::TargetReached {
            CompletionReason::TargetReached
        } else {
            CompletionReason::Practiced
        };

        self.mutate(|sessions| {
            let mut candidates: Vec<(NaiveDate, Uuid)> = sessions
                .iter()
                .filter(|s| s.item_id == item_id && s.is_open() && s.scheduled_date <= today)
                .map(|s| (s.scheduled_date, s.id))
                .collect();
            if candidates.is_empty() {
                return (None, None);
            }
            candidates.sort();
            let keep = candidates[0].1;
            let duplicates: HashSet<Uuid> = candidates[1..].iter().map(|(_, id)| *id).collect();
            if !duplicates.is_empty() {
                tracing::warn!(
                    "item {item_id}: deleting {} duplicate open session(s) planned on or before {today}",
                    duplicates.len()
                );
                sessions.retain(|s| !duplicates.contains(&s.id));
            }
            if let Some(s) = sessions.iter_mut().find(|s| s.id == keep) {
                s.complete(today, reason);
            }
            let change = ScheduleChange::Completed {
                item_id,
                session_id: keep,
            };
            (Some(keep), Some(change))
        })
    }

    /// Recompute open sessions dated before `today`. New dates are never
    /// earlier than tomorrow; items of paused or removed owners are left
    /// alone.
    pub fn reschedule_overdue(
        &self,
        scheduler: &Scheduler,
        library: &Library,
        stability: &HashMap<Uuid, StabilityRecord>,
        today: NaiveDate,
        ctx: MutationContext,
    ) -> Result<Mutation> {
        if ctx == MutationContext::PreserveDueDate {
            tracing::info!("preserving due dates: skipped overdue rescheduling");
            return Ok(Mutation::Skipped);
        }
        let earliest = tomorrow(today);

        self.mutate(|sessions| {
            let mut count = 0usize;
            let mut fallbacks = 0usize;
            for session in sessions
                .iter_mut()
                .filter(|s| s.is_open() && s.scheduled_date < today)
            {
                let Some(item) = library.item(session.item_id) else {
                    continue;
                };
                if !library.is_schedulable(item) {
                    tracing::debug!("item {}: owner not active, not rescheduling", item.id);
                    continue;
                }
                let history = library.history_for_item(item.id);
                let score = latest(history)
                    .map(|h| h.sanitized_score())
                    .unwrap_or(NEUTRAL_SCORE);
                let request = ScheduleRequest::new(item, history, score, today)
                    .with_stability(stability.get(&item.id));
                let decision = scheduler.calculate_next_practice_date(&request);
                if decision.path == SchedulePath::Fallback {
                    fallbacks += 1;
                }
                session.scheduled_date = decision.next_date.max(earliest);
                session.tau = decision.tau;
                count += 1;
            }
            if count == 0 {
                return (Mutation::Unchanged, None);
            }
            tracing::info!("rescheduled {count} overdue sessions ({fallbacks} via fallback)");
            (
                Mutation::Applied(count),
                Some(ScheduleChange::Rescheduled { count }),
            )
        })
    }

    /// Remove sessions whose item or owner no longer exists.
    pub fn cleanup_orphans(&self, library: &Library) -> Result<usize> {
        self.mutate(|sessions| {
            let before = sessions.len();
            sessions.retain(|s| library.contains_item(s.item_id) && library.contains_owner(s.owner_id));
            let removed = before - sessions.len();
            if removed == 0 {
                return (0, None);
            }
            tracing::info!("removed {removed} orphaned sessions");
            (removed, Some(ScheduleChange::Removed { count: removed }))
        })
    }

    /// Give every item practiced today that is due (or has no due date) and
    /// lacks an open session a session for tomorrow.
    pub fn auto_repair(
        &self,
        scheduler: &Scheduler,
        library: &Library,
        today: NaiveDate,
    ) -> Result<usize> {
        let next = tomorrow(today);
        self.mutate(|sessions| {
            let open: HashSet<Uuid> = sessions
                .iter()
                .filter(|s| s.is_open())
                .map(|s| s.item_id)
                .collect();
            let mut repaired = 0usize;
            for item in library.items() {
                if open.contains(&item.id) || !library.is_schedulable(item) {
                    continue;
                }
                if item.next_due_date.is_some_and(|d| d > today) {
                    continue;
                }
                let todays = entries_on(library.history_for_item(item.id), today);
                if !classify_day(&todays, PREP_ONLY_MIN_SECONDS).is_complete() {
                    continue;
                }
                let tau = scheduler.retention().adjusted_tau(
                    item.difficulty,
                    item.completed_repetitions,
                    item.foundation_stage,
                );
                sessions.push(ScheduledSession::planned(item.id, item.owner_id, next, tau));
                repaired += 1;
            }
            if repaired == 0 {
                return (0, None);
            }
            tracing::info!("auto-repair inserted {repaired} missing sessions");
            (repaired, Some(ScheduleChange::Repaired { count: repaired }))
        })
    }

    /// Replace every open session with `plan` (one per item; later entries
    /// win). Completed history is kept.
    pub fn replace_planned(
        &self,
        plan: Vec<ScheduledSession>,
        ctx: MutationContext,
    ) -> Result<Mutation> {
        if ctx == MutationContext::PreserveDueDate {
            tracing::info!("preserving due dates: skipped replacing {} planned sessions", plan.len());
            return Ok(Mutation::Skipped);
        }
        self.mutate(|sessions| {
            let mut by_item: HashMap<Uuid, ScheduledSession> = HashMap::new();
            for mut s in plan {
                s.status = SessionStatus::Planned;
                s.completion_date = None;
                s.completion_reason = None;
                by_item.insert(s.item_id, s);
            }
            sessions.retain(|s| !s.is_open());
            let mut fresh: Vec<ScheduledSession> = by_item.into_values().collect();
            fresh.sort_by_key(|s| (s.scheduled_date, s.item_id));
            let count = fresh.len();
            sessions.extend(fresh);
            (
                Mutation::Applied(count),
                Some(ScheduleChange::Replaced { count }),
            )
        })
    }

    /// Cascade for item removal: drop every session of the item.
    pub fn remove_for_item(&self, item_id: Uuid) -> Result<usize> {
        self.mutate(|sessions| {
            let before = sessions.len();
            sessions.retain(|s| s.item_id != item_id);
            let removed = before - sessions.len();
            if removed == 0 {
                return (0, None);
            }
            (removed, Some(ScheduleChange::Removed { count: removed }))
        })
    }
}

/// Keep only the latest-dated open session per item; returns the number
/// dropped.
fn enforce_single_open(sessions: &mut Vec<ScheduledSession>) -> usize {
    let mut newest: HashMap<Uuid, (NaiveDate, Uuid)> = HashMap::new();
    for s in sessions.iter().filter(|s| s.is_open()) {
        let entry = newest.entry(s.item_id).or_insert((s.scheduled_date, s.id));
        if s.scheduled_date >= entry.0 {
            *entry = (s.scheduled_date, s.id);
        }
    }
    let before = sessions.len();
    sessions.retain(|s| !s.is_open() || newest.get(&s.item_id).is_some_and(|(_, id)| *id == s.id));
    before - sessions.len()
}
