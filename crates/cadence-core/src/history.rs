//! Practice history as consumed by the scheduler.
//!
//! History is append-only; deleted entries stay in the log with
//! `is_deleted` set and are invisible to every calculation here.

use std::fmt;
use std::str::FromStr;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::constants::MAX_PERFORMANCE_SCORE;

/// How a practice session ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SessionOutcome {
    TargetReached,
    TargetNotReached,
    Frustration,
    ManualFrustration,
}

impl SessionOutcome {
    pub fn as_str(&self) -> &'static str {
        match self {
            SessionOutcome::TargetReached => "target-reached",
            SessionOutcome::TargetNotReached => "target-not-reached",
            SessionOutcome::Frustration => "frustration",
            SessionOutcome::ManualFrustration => "manual-frustration",
        }
    }

    pub fn is_frustration(&self) -> bool {
        matches!(
            self,
            SessionOutcome::Frustration | SessionOutcome::ManualFrustration
        )
    }
}

impl fmt::Display for SessionOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SessionOutcome {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let norm: String = s
            .trim()
            .chars()
            .filter(|c| c.is_alphanumeric())
            .collect::<String>()
            .to_ascii_lowercase();
        match norm.as_str() {
            "targetreached" | "reached" => Ok(SessionOutcome::TargetReached),
            "targetnotreached" | "notreached" => Ok(SessionOutcome::TargetNotReached),
            "frustration" => Ok(SessionOutcome::Frustration),
            "manualfrustration" | "manual" => Ok(SessionOutcome::ManualFrustration),
            _ => Err(format!("unknown session outcome '{s}'")),
        }
    }
}

/// One logged practice session.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HistoryEntry {
    pub id: Uuid,
    pub item_id: Uuid,
    pub date: NaiveDate,
    /// Session length in seconds.
    #[serde(default)]
    pub duration: u32,
    #[serde(default)]
    pub repetitions: u32,
    #[serde(default)]
    pub performance_score: f64,
    pub outcome: SessionOutcome,
    #[serde(default)]
    pub total_failures: u32,
    #[serde(default)]
    pub is_deleted: bool,
}

impl HistoryEntry {
    pub fn new(item_id: Uuid, date: NaiveDate, outcome: SessionOutcome) -> Self {
        Self {
            id: Uuid::new_v4(),
            item_id,
            date,
            duration: 0,
            repetitions: 0,
            performance_score: 0.0,
            outcome,
            total_failures: 0,
            is_deleted: false,
        }
    }

    /// Score on the 0–10 scale, with NaN/out-of-range values clamped.
    pub fn sanitized_score(&self) -> f64 {
        sanitize_score(self.performance_score)
    }
}

/// Clamp a raw performance score into [0, 10]; NaN becomes 0.
pub fn sanitize_score(score: f64) -> f64 {
    if score.is_nan() {
        tracing::debug!("InputClamp: performance score NaN -> 0");
        return 0.0;
    }
    let clamped = score.clamp(0.0, MAX_PERFORMANCE_SCORE);
    if clamped != score {
        tracing::debug!("InputClamp: performance score {score} -> {clamped}");
    }
    clamped
}

/// Non-deleted entries in chronological order (stable for equal dates).
pub fn live_entries(history: &[HistoryEntry]) -> Vec<&HistoryEntry> {
    let mut live: Vec<&HistoryEntry> = history.iter().filter(|h| !h.is_deleted).collect();
    live.sort_by_key(|h| h.date);
    live
}

/// Number of non-deleted entries.
pub fn live_count(history: &[HistoryEntry]) -> usize {
    history.iter().filter(|h| !h.is_deleted).count()
}

/// Most recent non-deleted entry.
pub fn latest(history: &[HistoryEntry]) -> Option<&HistoryEntry> {
    live_entries(history).last().copied()
}

/// Sanitized scores of the last `n` non-deleted sessions, oldest first.
pub fn recent_scores(history: &[HistoryEntry], n: usize) -> Vec<f64> {
    let live = live_entries(history);
    let start = live.len().saturating_sub(n);
    live[start..].iter().map(|h| h.sanitized_score()).collect()
}

/// Non-deleted entries logged on `date`.
pub fn entries_on(history: &[HistoryEntry], date: NaiveDate) -> Vec<&HistoryEntry> {
    history
        .iter()
        .filter(|h| !h.is_deleted && h.date == date)
        .collect()
}

/// Whether the day's sessions count as completing a planned practice.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DayClassification {
    /// An explicit target-reached session was logged.
    TargetReached,
    /// Repetitions were logged.
    Practiced,
    /// Time was spent but no repetitions: preparation, not practice.
    PrepOnly,
    /// Nothing that counts.
    NotPracticed,
}

impl DayClassification {
    pub fn is_complete(&self) -> bool {
        matches!(
            self,
            DayClassification::TargetReached | DayClassification::Practiced
        )
    }
}

/// Three-tier rule: explicit target reached, then prep-only, then any reps.
pub fn classify_day(entries: &[&HistoryEntry], prep_min_seconds: u32) -> DayClassification {
    if entries
        .iter()
        .any(|h| h.outcome == SessionOutcome::TargetReached)
    {
        return DayClassification::TargetReached;
    }
    let reps: u64 = entries.iter().map(|h| u64::from(h.repetitions)).sum();
    let seconds: u64 = entries.iter().map(|h| u64::from(h.duration)).sum();
    if reps == 0 && seconds >= u64::from(prep_min_seconds) {
        return DayClassification::PrepOnly;
    }
    if reps > 0 {
        return DayClassification::Practiced;
    }
    DayClassification::NotPracticed
}
