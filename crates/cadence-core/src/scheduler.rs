//! Next-practice-date state machine.
//!
//! Paths are tried in priority order: stability, frustration cool-down,
//! foundation ramp, mature Ebbinghaus. The scheduler is pure: it reads an
//! item snapshot and returns a [`ScheduleDecision`]; applying the decision
//! and persisting it are the caller's job.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::adjustments::{performance_adjustment, practice_pattern_adjustment};
use crate::config::{Config, LearnerProfile};
use crate::constants::{
    FOUNDATION_INTERVAL_DAYS, FRUSTRATION_COOLDOWN_DAYS, FRUSTRATION_WINDOW_DAYS,
    MANUAL_FRUSTRATION_COOLDOWN_DAYS, MATURE_STAGE, MAX_OVERRIDE_BIAS, MAX_TAU_CALIBRATION,
    MIN_OVERRIDE_BIAS, MIN_TAU_CALIBRATION, OVERRIDE_BIAS_WEIGHT, STABILITY_MIN_HISTORY,
    STABILITY_VARIANCE_THRESHOLD, TAU_LEARNING_RATE, TREND_WINDOW,
};
use crate::error::{Result, ScheduleError};
use crate::history::{HistoryEntry, SessionOutcome, live_entries, sanitize_score};
use crate::item::PracticeItem;
use crate::retention::{ClampReason, RetentionModel, TauContext, clamp_interval_to_bounds};
use crate::stability::{ReviewInput, StabilityModel, StabilityRecord};
use crate::time::{add_days, days_between, tomorrow};
use crate::trend::{TrendSummary, population_variance};

/// A user-requested interval that replaces the computed one.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OverrideRequest {
    pub interval_days: f64,
    pub reason: String,
}

/// Audit entry for an applied override.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OverrideRecord {
    pub item_id: Uuid,
    pub date: NaiveDate,
    pub computed_days: u32,
    pub requested_days: f64,
    pub final_days: u32,
    pub reason: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SchedulePath {
    Stability,
    FrustrationCooldown,
    Foundation,
    Ebbinghaus,
    /// An arithmetic fault forced the conservative default.
    Fallback,
}

impl SchedulePath {
    pub fn as_str(&self) -> &'static str {
        match self {
            SchedulePath::Stability => "stability",
            SchedulePath::FrustrationCooldown => "frustration-cooldown",
            SchedulePath::Foundation => "foundation",
            SchedulePath::Ebbinghaus => "ebbinghaus",
            SchedulePath::Fallback => "fallback",
        }
    }
}

/// Everything the scheduler reads for one item.
#[derive(Debug, Clone, Copy)]
pub struct ScheduleRequest<'a> {
    pub item: &'a PracticeItem,
    /// Full history for the item, deleted entries included.
    pub history: &'a [HistoryEntry],
    pub performance_score: f64,
    pub today: NaiveDate,
    /// Zero means batch replanning rather than a real session.
    pub reps_this_session: u32,
    pub override_request: Option<&'a OverrideRequest>,
    pub stability: Option<&'a StabilityRecord>,
}

impl<'a> ScheduleRequest<'a> {
    pub fn new(
        item: &'a PracticeItem,
        history: &'a [HistoryEntry],
        performance_score: f64,
        today: NaiveDate,
    ) -> Self {
        Self {
            item,
            history,
            performance_score,
            today,
            reps_this_session: 0,
            override_request: None,
            stability: None,
        }
    }

    pub fn reps(mut self, reps: u32) -> Self {
        self.reps_this_session = reps;
        self
    }

    pub fn with_override(mut self, request: &'a OverrideRequest) -> Self {
        self.override_request = Some(request);
        self
    }

    pub fn with_stability(mut self, record: Option<&'a StabilityRecord>) -> Self {
        self.stability = record;
        self
    }

    fn is_actual_session(&self) -> bool {
        self.reps_this_session > 0
    }
}

/// `(date, τ)` plus everything needed to explain and apply it.
#[derive(Debug, Clone, PartialEq)]
pub struct ScheduleDecision {
    pub next_date: NaiveDate,
    pub tau: f64,
    pub interval_days: u32,
    pub path: SchedulePath,
    pub clamp_reason: ClampReason,
    /// Stage the item should carry after this decision.
    pub foundation_stage: i32,
    pub performance_factor: Option<f64>,
    pub pattern_factor: Option<f64>,
    pub target_retention: Option<f64>,
    /// New per-item τ calibration, when a refinement signal was available.
    pub tau_calibration: Option<f64>,
    pub override_bias: Option<f64>,
    pub frustration_stamp: Option<NaiveDate>,
    /// New or updated stability record to persist.
    pub stability_update: Option<StabilityRecord>,
    pub override_record: Option<OverrideRecord>,
}

impl ScheduleDecision {
    fn fixed(today: NaiveDate, tau: f64, days: u32, path: SchedulePath, stage: i32) -> Self {
        let clamped = clamp_interval_to_bounds(f64::from(days), tau);
        Self {
            next_date: add_days(today, clamped.days),
            tau,
            interval_days: clamped.days,
            path,
            clamp_reason: clamped.reason,
            foundation_stage: stage,
            performance_factor: None,
            pattern_factor: None,
            target_retention: None,
            tau_calibration: None,
            override_bias: None,
            frustration_stamp: None,
            stability_update: None,
            override_record: None,
        }
    }
}

/// Orchestrates the retention and stability models for one item at a time.
#[derive(Debug, Clone, Default)]
pub struct Scheduler {
    retention: RetentionModel,
    stability: StabilityModel,
    learner: LearnerProfile,
}

impl Scheduler {
    /// Build from configuration as given. Callers loading user files should
    /// pass a [`Config::sanitized`] value.
    pub fn new(config: &Config) -> Self {
        Self {
            retention: RetentionModel::new(config.retention.clone()),
            stability: StabilityModel::new(config.stability.clone()),
            learner: config.learner.clone(),
        }
    }

    pub fn retention(&self) -> &RetentionModel {
        &self.retention
    }

    pub fn stability(&self) -> &StabilityModel {
        &self.stability
    }

    pub fn learner(&self) -> &LearnerProfile {
        &self.learner
    }

    /// Decide when the item is next due. Never fails: any arithmetic fault
    /// is logged and answered with "tomorrow".
    pub fn calculate_next_practice_date(&self, req: &ScheduleRequest<'_>) -> ScheduleDecision {
        match self.try_calculate(req) {
            Ok(decision) => {
                tracing::debug!(
                    "item {}: path={} interval={}d tau={:.2} clamp={}",
                    req.item.id,
                    decision.path.as_str(),
                    decision.interval_days,
                    decision.tau,
                    decision.clamp_reason.as_str()
                );
                decision
            }
            Err(e) => {
                tracing::error!(
                    "scheduling item {} failed ({e}); score={} reps={} stage={} difficulty={} calibration={} bias={}; falling back to tomorrow",
                    req.item.id,
                    req.performance_score,
                    req.reps_this_session,
                    req.item.foundation_stage,
                    req.item.difficulty,
                    req.item.tau_calibration,
                    req.item.override_bias
                );
                self.fallback(req)
            }
        }
    }

    fn fallback(&self, req: &ScheduleRequest<'_>) -> ScheduleDecision {
        let stage = req.item.foundation_stage.max(0);
        let tau = self
            .retention
            .adjusted_tau(req.item.difficulty, req.item.completed_repetitions, stage);
        ScheduleDecision {
            next_date: tomorrow(req.today),
            tau,
            interval_days: 1,
            path: SchedulePath::Fallback,
            clamp_reason: ClampReason::Invalid,
            ..ScheduleDecision::fixed(req.today, tau, 1, SchedulePath::Fallback, stage)
        }
    }

    fn try_calculate(&self, req: &ScheduleRequest<'_>) -> Result<ScheduleDecision> {
        let item = req.item;
        let live = live_entries(req.history);
        let history_count = live.len();

        let mut stage = item.foundation_stage;
        if stage < 0 {
            tracing::debug!("InputClamp: item {} foundation stage {stage} -> 0", item.id);
            stage = 0;
        }
        if !req.is_actual_session() && stage < MATURE_STAGE {
            let reconciled = stage.max(history_count.min(MATURE_STAGE as usize) as i32);
            if reconciled != stage {
                tracing::debug!(
                    "item {}: replanning raises stage {stage} -> {reconciled} to match history",
                    item.id
                );
            }
            stage = reconciled;
        }

        let start = live.len().saturating_sub(TREND_WINDOW);
        let recent: Vec<f64> = live[start..].iter().map(|h| h.sanitized_score()).collect();
        let trend = TrendSummary::from_scores(&recent);
        let ctx = TauContext {
            learner: &self.learner,
            tau_calibration: item.tau_calibration,
            override_bias: item.override_bias,
            recent_average: (!recent.is_empty()).then_some(trend.average),
        };
        let tau = self.retention.adjusted_tau_with_context(
            item.difficulty,
            item.completed_repetitions,
            stage,
            &ctx,
        )?;

        if stage >= MATURE_STAGE
            && history_count >= STABILITY_MIN_HISTORY
            && population_variance(&recent) > STABILITY_VARIANCE_THRESHOLD
        {
            return Ok(self.stability_path(req, &live, tau, stage));
        }

        let advanced = if req.is_actual_session() && stage < MATURE_STAGE {
            stage + 1
        } else {
            stage
        };

        if let Some(last) = live.last()
            && last.outcome.is_frustration()
        {
            let days = if last.outcome == SessionOutcome::ManualFrustration {
                MANUAL_FRUSTRATION_COOLDOWN_DAYS
            } else {
                FRUSTRATION_COOLDOWN_DAYS
            };
            let fired_on = item.last_frustration_date.filter(|d| {
                (0..=FRUSTRATION_WINDOW_DAYS).contains(&days_between(*d, req.today))
            });
            if let Some(stamp) = fired_on {
                // A running cool-down holds its end date; it is neither
                // restarted nor shortened.
                let mut running = ScheduleDecision::fixed(
                    stamp,
                    tau,
                    days,
                    SchedulePath::FrustrationCooldown,
                    advanced,
                );
                if running.next_date > req.today {
                    tracing::debug!(
                        "item {}: cool-down from {stamp} still runs until {}",
                        item.id,
                        running.next_date
                    );
                    running.interval_days =
                        u32::try_from(days_between(req.today, running.next_date)).unwrap_or(days);
                    return Ok(running);
                }
            } else {
                let mut decision = ScheduleDecision::fixed(
                    req.today,
                    tau,
                    days,
                    SchedulePath::FrustrationCooldown,
                    advanced,
                );
                decision.frustration_stamp = Some(req.today);
                return Ok(decision);
            }
        }

        if stage < MATURE_STAGE {
            return Ok(ScheduleDecision::fixed(
                req.today,
                tau,
                FOUNDATION_INTERVAL_DAYS,
                SchedulePath::Foundation,
                advanced,
            ));
        }

        if item.completed_repetitions == 0 && history_count == 0 {
            tracing::warn!(
                "item {} has mature stage {stage} but no repetitions or history; using {FOUNDATION_INTERVAL_DAYS} day",
                item.id
            );
            return Ok(ScheduleDecision::fixed(
                req.today,
                tau,
                FOUNDATION_INTERVAL_DAYS,
                SchedulePath::Foundation,
                stage,
            ));
        }

        self.ebbinghaus_path(req, &live, &trend, tau, stage)
    }

    fn stability_path(
        &self,
        req: &ScheduleRequest<'_>,
        live: &[&HistoryEntry],
        tau: f64,
        stage: i32,
    ) -> ScheduleDecision {
        let item = req.item;
        let todays = live.iter().rev().find(|h| h.date == req.today);
        let (record, changed) = if req.is_actual_session() {
            let input = ReviewInput {
                date: req.today,
                performance_score: sanitize_score(req.performance_score),
                repetitions: req.reps_this_session,
                outcome: todays
                    .map(|h| h.outcome)
                    .unwrap_or(SessionOutcome::TargetNotReached),
                duration_seconds: todays.map(|h| h.duration).unwrap_or(0),
            };
            (self.stability.review(item.id, req.stability, &input), true)
        } else {
            match req.stability {
                Some(existing) => (existing.clone(), false),
                None => (self.stability.new_record(item.id, req.today), true),
            }
        };

        let clamped = self.stability.optimal_interval(&record);
        tracing::debug!(
            "item {}: stability path S={:.2} D={:.2} reviews={}",
            item.id,
            record.stability,
            record.difficulty,
            record.review_count
        );
        ScheduleDecision {
            next_date: add_days(req.today, clamped.days),
            interval_days: clamped.days,
            clamp_reason: clamped.reason,
            stability_update: changed.then_some(record),
            ..ScheduleDecision::fixed(req.today, tau, 1, SchedulePath::Stability, stage)
        }
    }

    fn ebbinghaus_path(
        &self,
        req: &ScheduleRequest<'_>,
        live: &[&HistoryEntry],
        trend: &TrendSummary,
        tau: f64,
        stage: i32,
    ) -> Result<ScheduleDecision> {
        let item = req.item;
        let r_star = self
            .retention
            .target_retention_with_trend(item.difficulty, trend);
        let raw = self.retention.raw_interval(tau, r_star)?;
        let performance = performance_adjustment(req.performance_score);
        let pattern = practice_pattern_adjustment(trend);
        let adjusted =
            ScheduleError::check_finite("ebbinghaus_adjusted", raw * performance.factor * pattern)?;
        let computed = clamp_interval_to_bounds(adjusted, tau);

        let mut final_interval = computed;
        let mut override_record = None;
        let mut override_bias = None;
        if let Some(request) = req.override_request {
            if request.interval_days.is_finite() {
                final_interval = clamp_interval_to_bounds(request.interval_days, tau);
                if final_interval.days != request.interval_days.round() as u32 {
                    tracing::debug!(
                        "item {}: override {} clamped to {} ({})",
                        item.id,
                        request.interval_days,
                        final_interval.days,
                        final_interval.reason.as_str()
                    );
                }
                override_bias = Some(updated_override_bias(
                    item.override_bias,
                    computed.days,
                    final_interval.days,
                ));
                override_record = Some(OverrideRecord {
                    item_id: item.id,
                    date: req.today,
                    computed_days: computed.days,
                    requested_days: request.interval_days,
                    final_days: final_interval.days,
                    reason: request.reason.clone(),
                });
            } else {
                tracing::warn!(
                    "item {}: ignoring non-finite override {}",
                    item.id,
                    request.interval_days
                );
            }
        }

        let tau_calibration = self.refine_tau_calibration(req, live, tau, r_star);

        Ok(ScheduleDecision {
            next_date: add_days(req.today, final_interval.days),
            tau,
            interval_days: final_interval.days,
            path: SchedulePath::Ebbinghaus,
            clamp_reason: final_interval.reason,
            foundation_stage: stage,
            performance_factor: Some(performance.factor),
            pattern_factor: Some(pattern),
            target_retention: Some(r_star),
            tau_calibration,
            override_bias,
            frustration_stamp: None,
            stability_update: None,
            override_record,
        })
    }

    /// Nudge the item's τ multiplier toward what today's outcome says about
    /// the previous interval. Needs a session logged today and a previous
    /// practice date.
    fn refine_tau_calibration(
        &self,
        req: &ScheduleRequest<'_>,
        live: &[&HistoryEntry],
        tau: f64,
        r_star: f64,
    ) -> Option<f64> {
        let item = req.item;
        let todays = live.iter().rev().find(|h| h.date == req.today)?;
        let realized = days_between(item.last_practice_date?, req.today);
        if realized <= 0 {
            return None;
        }

        let predicted = self.retention.predicted_retention(realized as f64, tau);
        let observed = if todays.outcome == SessionOutcome::TargetReached {
            1.0
        } else {
            0.0
        };
        let weight = 1.0 + (r_star - predicted).abs();
        let current = if item.tau_calibration.is_finite() {
            item.tau_calibration
                .clamp(MIN_TAU_CALIBRATION, MAX_TAU_CALIBRATION)
        } else {
            1.0
        };
        let next = current * (1.0 + TAU_LEARNING_RATE * (observed - predicted) * weight);
        match ScheduleError::check_finite("tau_refinement", next) {
            Ok(v) => Some(v.clamp(MIN_TAU_CALIBRATION, MAX_TAU_CALIBRATION)),
            Err(e) => {
                tracing::error!(
                    "item {}: {e} (realized={realized}, predicted={predicted}); keeping calibration",
                    item.id
                );
                None
            }
        }
    }

    /// Apply a decision to the item after a session (or a replan).
    pub fn record_session(
        &self,
        item: &mut PracticeItem,
        decision: &ScheduleDecision,
        reps_this_session: u32,
        today: NaiveDate,
    ) {
        if reps_this_session > 0 {
            item.completed_repetitions = item.completed_repetitions.saturating_add(reps_this_session);
            item.last_practice_date = Some(today);
        }
        item.foundation_stage = decision.foundation_stage.max(0);
        if let Some(stamp) = decision.frustration_stamp {
            item.last_frustration_date = Some(stamp);
        }
        item.next_due_date = Some(decision.next_date);
        item.interval_days = decision.interval_days;
        if let Some(calibration) = decision.tau_calibration {
            item.tau_calibration = calibration;
        }
        if let Some(bias) = decision.override_bias {
            item.override_bias = bias;
        }
    }
}

/// Exponential moving average toward the ratio the user chose over the
/// computed interval.
fn updated_override_bias(current: f64, computed_days: u32, final_days: u32) -> f64 {
    let current = if current.is_finite() { current } else { 1.0 };
    let ratio = f64::from(final_days) / f64::from(computed_days.max(1));
    let target = ratio.clamp(MIN_OVERRIDE_BIAS, MAX_OVERRIDE_BIAS);
    ((1.0 - OVERRIDE_BIAS_WEIGHT) * current + OVERRIDE_BIAS_WEIGHT * target)
        .clamp(MIN_OVERRIDE_BIAS, MAX_OVERRIDE_BIAS)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::item::Difficulty;
    use crate::constants::{MAX_INTERVAL_DAYS, MAX_INTERVAL_TO_PARAMETER_RATIO};

    fn day(d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2026, 3, d).unwrap()
    }

    fn entry(item: &PracticeItem, date: NaiveDate, score: f64, outcome: SessionOutcome) -> HistoryEntry {
        let mut h = HistoryEntry::new(item.id, date, outcome);
        h.performance_score = score;
        h.repetitions = 3;
        h.duration = 600;
        h
    }

    fn mature_item() -> PracticeItem {
        let mut item = PracticeItem::new(Uuid::new_v4(), "etude", Difficulty::Average);
        item.completed_repetitions = 5;
        item.foundation_stage = MATURE_STAGE;
        item
    }

    #[test]
    fn test_fresh_item_gets_one_day() {
        let s = Scheduler::default();
        let item = PracticeItem::new(Uuid::new_v4(), "scale", Difficulty::Easy);
        let history = vec![entry(&item, day(1), 6.0, SessionOutcome::TargetReached)];
        let d = s.calculate_next_practice_date(&ScheduleRequest::new(&item, &history, 6.0, day(1)).reps(4));
        assert_eq!(d.path, SchedulePath::Foundation);
        assert_eq!(d.interval_days, 1);
        assert_eq!(d.next_date, day(2));
        assert_eq!(d.foundation_stage, 1);
    }

    #[test]
    fn test_negative_stage_corrected() {
        let s = Scheduler::default();
        let mut item = PracticeItem::new(Uuid::new_v4(), "scale", Difficulty::Average);
        item.foundation_stage = -7;
        let d = s.calculate_next_practice_date(&ScheduleRequest::new(&item, &[], 5.0, day(1)).reps(2));
        assert_eq!(d.path, SchedulePath::Foundation);
        assert_eq!(d.foundation_stage, 1);
    }

    #[test]
    fn test_replanning_reconciles_stage_with_history() {
        let s = Scheduler::default();
        let item = PracticeItem::new(Uuid::new_v4(), "scale", Difficulty::Average);
        let history = vec![
            entry(&item, day(1), 6.0, SessionOutcome::TargetReached),
            entry(&item, day(2), 6.0, SessionOutcome::TargetReached),
        ];
        let d = s.calculate_next_practice_date(&ScheduleRequest::new(&item, &history, 6.0, day(2)));
        assert_eq!(d.foundation_stage, 2);
        assert_eq!(d.interval_days, 1);
    }

    #[test]
    fn test_frustration_cooldowns() {
        let s = Scheduler::default();
        let item = mature_item();
        let auto = vec![entry(&item, day(5), 3.0, SessionOutcome::Frustration)];
        let d = s.calculate_next_practice_date(&ScheduleRequest::new(&item, &auto, 3.0, day(5)).reps(2));
        assert_eq!(d.path, SchedulePath::FrustrationCooldown);
        assert_eq!(d.interval_days, 3);
        assert_eq!(d.frustration_stamp, Some(day(5)));

        let manual = vec![entry(&item, day(5), 3.0, SessionOutcome::ManualFrustration)];
        let d = s.calculate_next_practice_date(&ScheduleRequest::new(&item, &manual, 3.0, day(5)).reps(2));
        assert_eq!(d.interval_days, 2);
    }

    #[test]
    fn test_repeat_frustration_keeps_running_window() {
        let s = Scheduler::default();
        let mut item = mature_item();
        item.last_frustration_date = Some(day(5));
        let history = vec![
            entry(&item, day(5), 3.0, SessionOutcome::Frustration),
            entry(&item, day(6), 3.0, SessionOutcome::Frustration),
        ];
        let d = s.calculate_next_practice_date(&ScheduleRequest::new(&item, &history, 3.0, day(6)).reps(1));
        assert_eq!(d.path, SchedulePath::FrustrationCooldown);
        assert_eq!(d.next_date, day(8));
        assert_eq!(d.interval_days, 2);
        assert_eq!(d.frustration_stamp, None);
    }

    #[test]
    fn test_replan_on_stamp_day_keeps_cooldown() {
        let s = Scheduler::default();
        let mut item = PracticeItem::new(Uuid::new_v4(), "etude", Difficulty::Average);
        item.last_frustration_date = Some(day(5));
        let history = vec![entry(&item, day(5), 3.0, SessionOutcome::Frustration)];
        let d = s.calculate_next_practice_date(&ScheduleRequest::new(&item, &history, 3.0, day(5)));
        assert_eq!(d.path, SchedulePath::FrustrationCooldown);
        assert_eq!(d.next_date, day(8));
        assert_eq!(d.frustration_stamp, None);
    }

    #[test]
    fn test_frustration_after_window_restarts_cooldown() {
        let s = Scheduler::default();
        let mut item = mature_item();
        item.last_frustration_date = Some(day(5));
        let history = vec![
            entry(&item, day(5), 3.0, SessionOutcome::Frustration),
            entry(&item, day(9), 3.0, SessionOutcome::Frustration),
        ];
        let d = s.calculate_next_practice_date(&ScheduleRequest::new(&item, &history, 3.0, day(9)).reps(1));
        assert_eq!(d.next_date, day(12));
        assert_eq!(d.frustration_stamp, Some(day(9)));
    }

    #[test]
    fn test_ebbinghaus_example() {
        let s = Scheduler::default();
        let item = mature_item();
        let history: Vec<_> = [6.0, 7.0, 8.0]
            .iter()
            .enumerate()
            .map(|(i, sc)| entry(&item, day(1 + i as u32 * 3), *sc, SessionOutcome::TargetReached))
            .collect();
        let d = s.calculate_next_practice_date(&ScheduleRequest::new(&item, &history, 7.0, day(7)).reps(3));
        assert_eq!(d.path, SchedulePath::Ebbinghaus);
        assert!(d.interval_days > 1 && d.interval_days < MAX_INTERVAL_DAYS);
        assert!(f64::from(d.interval_days) <= MAX_INTERVAL_TO_PARAMETER_RATIO * d.tau);
        assert!(d.performance_factor.unwrap() > 1.0);
        assert!(d.pattern_factor.unwrap() > 1.0);
    }

    #[test]
    fn test_erratic_scores_use_stability_path() {
        let s = Scheduler::default();
        let item = mature_item();
        let history: Vec<_> = [2.0, 9.0, 3.0, 9.0, 2.0]
            .iter()
            .enumerate()
            .map(|(i, sc)| entry(&item, day(1 + i as u32), *sc, SessionOutcome::TargetNotReached))
            .collect();
        let d = s.calculate_next_practice_date(&ScheduleRequest::new(&item, &history, 2.0, day(5)).reps(2));
        assert_eq!(d.path, SchedulePath::Stability);
        let record = d.stability_update.expect("stability record created");
        assert_eq!(record.item_id, item.id);
        assert!(f64::from(d.interval_days) <= (5.0 * record.stability).max(1.0));
    }

    #[test]
    fn test_override_is_clamped_and_recorded() {
        let s = Scheduler::default();
        let item = mature_item();
        let history = vec![entry(&item, day(1), 7.0, SessionOutcome::TargetReached)];
        let request = OverrideRequest {
            interval_days: 10_000.0,
            reason: "vacation".into(),
        };
        let d = s.calculate_next_practice_date(
            &ScheduleRequest::new(&item, &history, 7.0, day(1))
                .reps(3)
                .with_override(&request),
        );
        let record = d.override_record.expect("override recorded");
        assert_eq!(record.final_days, d.interval_days);
        assert!(f64::from(d.interval_days) <= MAX_INTERVAL_TO_PARAMETER_RATIO * d.tau);
        assert_eq!(record.reason, "vacation");
        assert!(d.override_bias.unwrap() > 1.0);
    }

    #[test]
    fn test_arithmetic_fault_falls_back_to_tomorrow() {
        let mut config = Config::default();
        config.retention.learning_strength = 0.0;
        let s = Scheduler::new(&config);
        let item = mature_item();
        let history = vec![entry(&item, day(1), 7.0, SessionOutcome::TargetReached)];
        let d = s.calculate_next_practice_date(&ScheduleRequest::new(&item, &history, 7.0, day(1)).reps(3));
        assert_eq!(d.path, SchedulePath::Fallback);
        assert_eq!(d.next_date, day(2));
        assert!(d.tau.is_finite());
    }

    #[test]
    fn test_tau_refinement_rewards_success_after_long_gap() {
        let s = Scheduler::default();
        let mut item = mature_item();
        item.last_practice_date = Some(day(1));
        let history = vec![
            entry(&item, day(1), 7.0, SessionOutcome::TargetReached),
            entry(&item, day(20), 7.0, SessionOutcome::TargetReached),
        ];
        let d = s.calculate_next_practice_date(&ScheduleRequest::new(&item, &history, 7.0, day(20)).reps(3));
        assert!(d.tau_calibration.unwrap() > 1.0);

        let failed = vec![
            entry(&item, day(1), 7.0, SessionOutcome::TargetReached),
            entry(&item, day(20), 4.0, SessionOutcome::TargetNotReached),
        ];
        let d = s.calculate_next_practice_date(&ScheduleRequest::new(&item, &failed, 4.0, day(20)).reps(3));
        assert!(d.tau_calibration.unwrap() < 1.0);
    }

    #[test]
    fn test_record_session_applies_decision() {
        let s = Scheduler::default();
        let mut item = PracticeItem::new(Uuid::new_v4(), "piece", Difficulty::Average);
        let history = vec![entry(&item, day(3), 3.0, SessionOutcome::Frustration)];
        let d = s.calculate_next_practice_date(&ScheduleRequest::new(&item, &history, 3.0, day(3)).reps(4));
        s.record_session(&mut item, &d, 4, day(3));
        assert_eq!(item.completed_repetitions, 4);
        assert_eq!(item.last_practice_date, Some(day(3)));
        assert_eq!(item.last_frustration_date, Some(day(3)));
        assert_eq!(item.next_due_date, Some(day(6)));
        assert_eq!(item.foundation_stage, 1);
    }
}
