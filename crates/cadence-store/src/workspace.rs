//! One data directory: library database, schedule and stability tables,
//! and the scheduler built from `config.toml`.
//!
//! ```text
//! ~/.cadence/
//! ├── config.toml               (optional)
//! ├── library.db
//! ├── scheduled_sessions.json
//! └── memory_stability.json
//! ```

use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::{env, fs};

use chrono::NaiveDate;
use uuid::Uuid;

use cadence_core::{
    Config, HistoryEntry, OverrideRequest, PracticeItem, SESSIONS_FILE,
    STABILITY_FILE, ScheduleDecision, ScheduleRequest, ScheduledSession, Scheduler,
    SessionClock, SessionOutcome, SessionStatus, StabilityRecord, schedule_future_sessions,
};

use crate::config::load_config;
use crate::error::{Result, StoreError};
use crate::library::{LibraryStore, LibraryTable};
use crate::schedule::{Mutation, MutationContext, ScheduleStore};
use crate::stability_store::StabilityStore;

pub const LIBRARY_FILE: &str = "library.db";

/// Default data directory, `~/.cadence`.
pub fn default_base_dir() -> PathBuf {
    dirs_home().join(".cadence")
}

fn dirs_home() -> PathBuf {
    env::var("HOME")
        .or_else(|_| env::var("USERPROFILE"))
        .map(PathBuf::from)
        .unwrap_or_else(|_| PathBuf::from("."))
}

/// A practice session as reported by the user.
#[derive(Debug, Clone)]
pub struct SessionLog {
    pub item_id: Uuid,
    pub performance_score: f64,
    pub repetitions: u32,
    pub duration_seconds: u32,
    pub outcome: SessionOutcome,
    pub total_failures: u32,
    pub override_request: Option<OverrideRequest>,
    pub context: MutationContext,
}

impl SessionLog {
    pub fn new(item_id: Uuid, performance_score: f64, repetitions: u32) -> Self {
        Self {
            item_id,
            performance_score,
            repetitions,
            duration_seconds: 0,
            outcome: SessionOutcome::TargetReached,
            total_failures: 0,
            override_request: None,
            context: MutationContext::Normal,
        }
    }
}

#[derive(Debug, Clone)]
pub struct SessionReport {
    pub history_id: Uuid,
    /// The planned session this practice fulfilled, if any.
    pub completed_session: Option<Uuid>,
    pub decision: Option<ScheduleDecision>,
    pub scheduled: Option<ScheduledSession>,
    pub mutation: Mutation,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MaintenanceReport {
    pub orphans_removed: usize,
    pub repaired: usize,
    pub completed: usize,
    pub rescheduled: usize,
}

#[derive(Debug, Clone, PartialEq)]
pub struct MergeReport {
    pub merged_items: usize,
    pub moved_history: usize,
    pub stability: Option<StabilityRecord>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Stats {
    pub owners: usize,
    pub items: usize,
    pub history_entries: usize,
    pub open_sessions: usize,
    pub completed_sessions: usize,
    pub stability_records: usize,
}

pub struct Workspace {
    base_dir: PathBuf,
    config: Config,
    clock: SessionClock,
    scheduler: Scheduler,
    library: LibraryStore,
    schedule: ScheduleStore,
    stability: StabilityStore,
}

impl Workspace {
    /// Open (creating as needed) the data directory. `base_dir` overrides
    /// [`default_base_dir`].
    pub fn open(base_dir: Option<&Path>) -> Result<Self> {
        let base = base_dir.map(PathBuf::from).unwrap_or_else(default_base_dir);
        fs::create_dir_all(&base).map_err(|e| {
            StoreError::InvalidData(format!("failed to create {}: {e}", base.display()))
        })?;

        let config = load_config(&base)?;
        let library = LibraryStore::open(&base.join(LIBRARY_FILE))?;
        let schedule = ScheduleStore::open(&base.join(SESSIONS_FILE), config.store.max_records)?;
        let stability = StabilityStore::open(&base.join(STABILITY_FILE))?;
        tracing::info!("opened workspace at {}", base.display());

        Ok(Self {
            clock: SessionClock::new(config.clock.day_start_hour),
            scheduler: Scheduler::new(&config),
            base_dir: base,
            config,
            library,
            schedule,
            stability,
        })
    }

    pub fn base_dir(&self) -> &Path {
        &self.base_dir
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn scheduler(&self) -> &Scheduler {
        &self.scheduler
    }

    pub fn library(&self) -> &LibraryStore {
        &self.library
    }

    pub fn schedule(&self) -> &ScheduleStore {
        &self.schedule
    }

    pub fn stability(&self) -> &StabilityStore {
        &self.stability
    }

    /// Current practice day according to the configured day start.
    pub fn today(&self) -> NaiveDate {
        self.clock.today()
    }

    /// Record a practice session, fulfil today's planned session and plan
    /// the next one.
    pub fn record_session(&self, log: &SessionLog, today: NaiveDate) -> Result<SessionReport> {
        let mut item = self.library.require_item(log.item_id)?;

        let mut entry = HistoryEntry::new(item.id, today, log.outcome);
        entry.duration = log.duration_seconds;
        entry.repetitions = log.repetitions;
        entry.performance_score = log.performance_score;
        entry.total_failures = log.total_failures;
        self.library.add_history(&entry)?;

        let history = self.library.history_for_item(item.id)?;
        let completed_session = self.schedule.complete_today(item.id, &history, today)?;

        let schedulable = self.is_schedulable(&item)?;
        if log.context == MutationContext::PreserveDueDate || !schedulable {
            if !schedulable {
                tracing::info!("item {}: not schedulable, recording practice only", item.id);
            }
            if log.repetitions > 0 {
                item.completed_repetitions =
                    item.completed_repetitions.saturating_add(log.repetitions);
                item.last_practice_date = Some(today);
                self.library.upsert_item(&item)?;
            }
            return Ok(SessionReport {
                history_id: entry.id,
                completed_session,
                decision: None,
                scheduled: None,
                mutation: Mutation::Skipped,
            });
        }

        let stability = self.stability.get(item.id);
        let mut request = ScheduleRequest::new(&item, &history, log.performance_score, today)
            .reps(log.repetitions)
            .with_stability(stability.as_ref());
        if let Some(o) = &log.override_request {
            request = request.with_override(o);
        }
        let decision = self.scheduler.calculate_next_practice_date(&request);

        if let Some(record) = &decision.stability_update {
            self.stability.upsert(record.clone())?;
        }
        if let Some(record) = &decision.override_record {
            self.library.record_override(record)?;
        }
        self.scheduler
            .record_session(&mut item, &decision, log.repetitions, today);
        self.library.upsert_item(&item)?;

        let session =
            ScheduledSession::planned(item.id, item.owner_id, decision.next_date, decision.tau);
        let mutation = self.schedule.add(session.clone(), MutationContext::Normal)?;
        tracing::info!(
            "item {}: next practice {} ({} days, {})",
            item.id,
            decision.next_date,
            decision.interval_days,
            decision.path.as_str()
        );

        Ok(SessionReport {
            history_id: entry.id,
            completed_session,
            decision: Some(decision),
            scheduled: Some(session),
            mutation,
        })
    }

    fn is_schedulable(&self, item: &PracticeItem) -> Result<bool> {
        let owner_active = self
            .library
            .owners()?
            .iter()
            .any(|o| o.id == item.owner_id && o.state.is_schedulable());
        Ok(owner_active && item.is_schedulable())
    }

    /// Delete an item with its sessions and stability record.
    pub fn remove_item(&self, item_id: Uuid) -> Result<bool> {
        let removed = self.library.remove_item(item_id)?;
        let sessions = self.schedule.remove_for_item(item_id)?;
        let had_record = self.stability.remove(item_id)?;
        if removed {
            tracing::info!(
                "removed item {item_id} ({sessions} sessions, stability record: {had_record})"
            );
        }
        Ok(removed)
    }

    /// Fold `old_ids` into `new_id`: stability data is review-weighted,
    /// history moves over, repetitions add up and the furthest foundation
    /// stage wins. Repeated ids count once.
    ///
    /// The library is updated before the stability table. If the stability
    /// save fails the library is already merged and the error is returned;
    /// the old stability records stay behind until their ids are merged or
    /// removed again.
    pub fn merge_items(&self, old_ids: &[Uuid], new_id: Uuid) -> Result<MergeReport> {
        let mut target = self.library.require_item(new_id)?;
        let mut seen = HashSet::new();
        let olds: Vec<PracticeItem> = old_ids
            .iter()
            .filter(|id| **id != new_id && seen.insert(**id))
            .map(|id| self.library.require_item(*id))
            .collect::<Result<_>>()?;
        let old_ids: Vec<Uuid> = olds.iter().map(|i| i.id).collect();

        let moved_history = self.library.reassign_history(&old_ids, new_id)?;
        for old in &olds {
            target.completed_repetitions = target
                .completed_repetitions
                .saturating_add(old.completed_repetitions);
            target.foundation_stage = target.foundation_stage.max(old.foundation_stage);
            target.last_practice_date = target.last_practice_date.max(old.last_practice_date);
        }
        self.library.upsert_item(&target)?;

        for id in &old_ids {
            self.library.remove_item(*id)?;
            self.schedule.remove_for_item(*id)?;
        }

        let mut sources = old_ids.clone();
        sources.push(new_id);
        let stability = self.stability.merge(&sources, new_id)?;

        tracing::info!(
            "merged {} items into {new_id} ({moved_history} history entries moved)",
            old_ids.len()
        );
        Ok(MergeReport {
            merged_items: old_ids.len(),
            moved_history,
            stability,
        })
    }

    /// Startup self-healing: drop orphans, repair missing sessions, mark
    /// today's practice complete, then push overdue sessions forward.
    pub fn run_maintenance(&self, today: NaiveDate) -> Result<MaintenanceReport> {
        let library = self.library.load_library()?;
        let orphans_removed = self.schedule.cleanup_orphans(&library)?;
        let repaired = self.schedule.auto_repair(&self.scheduler, &library, today)?;

        let mut completed = 0;
        for item in library.items() {
            if self
                .schedule
                .complete_today(item.id, library.history_for_item(item.id), today)?
                .is_some()
            {
                completed += 1;
            }
        }

        let rescheduled = self
            .schedule
            .reschedule_overdue(
                &self.scheduler,
                &library,
                &self.stability.snapshot(),
                today,
                MutationContext::Normal,
            )?
            .count();

        let report = MaintenanceReport {
            orphans_removed,
            repaired,
            completed,
            rescheduled,
        };
        tracing::info!("maintenance: {report:?}");
        Ok(report)
    }

    /// Recompute every open session from scratch and write the new due
    /// dates back to the items.
    pub fn replan_all(&self, today: NaiveDate, ctx: MutationContext) -> Result<Mutation> {
        let library = self.library.load_library()?;
        let plan = schedule_future_sessions(
            &self.scheduler,
            &library,
            &self.stability.snapshot(),
            &self.schedule.sessions(),
            today,
        );
        let due_dates: Vec<(Uuid, NaiveDate)> =
            plan.iter().map(|s| (s.item_id, s.scheduled_date)).collect();

        let mutation = self.schedule.replace_planned(plan, ctx)?;
        if mutation == Mutation::Skipped {
            return Ok(mutation);
        }
        for (item_id, date) in due_dates {
            if let Some(item) = library.item(item_id)
                && item.next_due_date != Some(date)
            {
                let mut item = item.clone();
                item.next_due_date = Some(date);
                self.library.upsert_item(&item)?;
            }
        }
        Ok(mutation)
    }

    /// Predicted recall for each of the next `days` days.
    pub fn retention_curve(&self, item_id: Uuid, days: u32) -> Result<Vec<f64>> {
        let item = self.library.require_item(item_id)?;
        let retention = self.scheduler.retention();
        let tau = retention.adjusted_tau(
            item.difficulty,
            item.completed_repetitions,
            item.foundation_stage,
        );
        Ok(retention.retention_curve(
            days,
            tau,
            item.completed_repetitions,
            item.difficulty,
            self.config.learner.experience,
        ))
    }

    pub fn stats(&self) -> Result<Stats> {
        let sessions = self.schedule.sessions();
        Ok(Stats {
            owners: self.library.count(LibraryTable::Owners)?,
            items: self.library.count(LibraryTable::Items)?,
            history_entries: self.library.count(LibraryTable::History)?,
            open_sessions: sessions.iter().filter(|s| s.is_open()).count(),
            completed_sessions: sessions
                .iter()
                .filter(|s| s.status == SessionStatus::Completed)
                .count(),
            stability_records: self.stability.len(),
        })
    }
}
