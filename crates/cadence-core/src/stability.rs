//! Stability model for mature items with erratic performance.
//!
//! Each item carries a stability S (days until recall probability halves)
//! and a difficulty D ∈ [0, 1]. Retrievability after Δt days is
//! `R = e^(Δt·ln0.5/S)`. Successful reviews at low R grow S more than easy
//! ones; failures collapse S toward the initial value.
//!
//! The model is pure. Record tables, locking and persistence live in
//! `cadence-store`.

use std::f64::consts::LN_2;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::config::StabilityConfig;
use crate::history::{SessionOutcome, sanitize_score};
use crate::retention::{ClampedInterval, clamp_interval_to_bounds};
use crate::time::{add_days, days_between};

/// Stability never drops below half a day, keeping the 5×S interval cap ≥ 1.
pub const MIN_STABILITY: f64 = 0.5;
/// One hundred years.
pub const MAX_STABILITY: f64 = 36_500.0;

const SUCCESS_SCORE: f64 = 6.0;
const SUCCESS_MIN_SECONDS: u32 = 60;
const LONG_SESSION_SECONDS: u32 = 3600;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StabilityRecord {
    pub item_id: Uuid,
    pub stability: f64,
    pub difficulty: f64,
    pub last_review_date: NaiveDate,
    pub review_count: u32,
    pub created_date: NaiveDate,
}

/// The facts of one session the model needs.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ReviewInput {
    pub date: NaiveDate,
    pub performance_score: f64,
    pub repetitions: u32,
    pub outcome: SessionOutcome,
    pub duration_seconds: u32,
}

/// Retrievability `Δt` days after the last review.
pub fn retrievability(elapsed_days: f64, stability: f64) -> f64 {
    if elapsed_days.is_nan() || elapsed_days <= 0.0 {
        return 1.0;
    }
    let s = if stability.is_finite() {
        stability.max(MIN_STABILITY)
    } else {
        MAX_STABILITY
    };
    (-elapsed_days * LN_2 / s).exp()
}

/// A review succeeds when at least two of the four signals agree.
pub fn is_successful_review(input: &ReviewInput) -> bool {
    let signals = [
        sanitize_score(input.performance_score) >= SUCCESS_SCORE,
        input.repetitions > 0,
        input.outcome == SessionOutcome::TargetReached,
        input.duration_seconds >= SUCCESS_MIN_SECONDS,
    ];
    signals.iter().filter(|s| **s).count() >= 2
}

#[derive(Debug, Clone, Default)]
pub struct StabilityModel {
    config: StabilityConfig,
}

impl StabilityModel {
    pub fn new(config: StabilityConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &StabilityConfig {
        &self.config
    }

    pub fn new_record(&self, item_id: Uuid, date: NaiveDate) -> StabilityRecord {
        StabilityRecord {
            item_id,
            stability: self.config.initial_stability,
            difficulty: self.config.initial_difficulty,
            last_review_date: date,
            review_count: 0,
            created_date: date,
        }
    }

    /// Apply one review to `previous` (or a fresh record) and return the result.
    pub fn review(
        &self,
        item_id: Uuid,
        previous: Option<&StabilityRecord>,
        input: &ReviewInput,
    ) -> StabilityRecord {
        let mut record = previous
            .cloned()
            .unwrap_or_else(|| self.new_record(item_id, input.date));
        let prior_stability = sanitize_stability(record.stability);
        let difficulty = sanitize_difficulty(record.difficulty);

        let elapsed = days_between(record.last_review_date, input.date) as f64;
        let r = retrievability(elapsed, prior_stability);

        let (mut s, d) = if is_successful_review(input) {
            let recall_bonus = 1.0 + 1.5 * (1.0 - r);
            let ease = 1.2 - 0.6 * difficulty;
            let multiplier = (self.config.growth_factor * recall_bonus * ease).max(1.0);
            (prior_stability * multiplier, (difficulty - 0.05).max(0.0))
        } else {
            (
                (0.8 * self.config.initial_stability).max(0.3 * prior_stability),
                (difficulty + 0.1).min(1.0),
            )
        };

        let score = sanitize_score(input.performance_score);
        s *= 1.0 + 0.02 * ((score - 5.0) / 5.0);
        if input.duration_seconds < SUCCESS_MIN_SECONDS {
            s *= 0.97;
        } else if input.duration_seconds > LONG_SESSION_SECONDS {
            s *= 0.98;
        }

        if !s.is_finite() {
            tracing::error!(
                "stability update produced {s} for item {item_id} (S={prior_stability}, R={r}); keeping previous"
            );
            s = prior_stability;
        }

        record.item_id = item_id;
        record.stability = s.clamp(MIN_STABILITY, MAX_STABILITY);
        record.difficulty = d;
        record.last_review_date = input.date;
        record.review_count = record.review_count.saturating_add(1);
        record
    }

    /// Days after the last review at which R reaches the threshold, shrunk
    /// for difficult items.
    pub fn optimal_review_days(&self, record: &StabilityRecord) -> f64 {
        let s = sanitize_stability(record.stability);
        let days = s * self.config.threshold.ln() / 0.5f64.ln();
        days * (1.0 - 0.3 * sanitize_difficulty(record.difficulty))
    }

    /// Clamped interval governed by the record's stability.
    pub fn optimal_interval(&self, record: &StabilityRecord) -> ClampedInterval {
        clamp_interval_to_bounds(
            self.optimal_review_days(record),
            sanitize_stability(record.stability),
        )
    }

    pub fn optimal_review_date(&self, record: &StabilityRecord) -> NaiveDate {
        add_days(record.last_review_date, self.optimal_interval(record).days)
    }
}

fn sanitize_stability(s: f64) -> f64 {
    if s.is_nan() {
        tracing::debug!("InputClamp: stability NaN -> {MIN_STABILITY}");
        return MIN_STABILITY;
    }
    s.clamp(MIN_STABILITY, MAX_STABILITY)
}

fn sanitize_difficulty(d: f64) -> f64 {
    if d.is_nan() { 0.5 } else { d.clamp(0.0, 1.0) }
}

/// Combine records for items being merged into `new_id`.
///
/// Stability and difficulty are review-count-weighted averages (equal
/// weights when no record has reviews); the earliest creation date, latest
/// review date and summed review count are kept.
pub fn merge_records(records: &[StabilityRecord], new_id: Uuid) -> Option<StabilityRecord> {
    let first = records.first()?;
    let total_reviews: u64 = records.iter().map(|r| u64::from(r.review_count)).sum();
    let weight = |r: &StabilityRecord| {
        if total_reviews == 0 {
            1.0
        } else {
            f64::from(r.review_count)
        }
    };
    let total_weight: f64 = records.iter().map(weight).sum();

    let stability = records
        .iter()
        .map(|r| weight(r) * sanitize_stability(r.stability))
        .sum::<f64>()
        / total_weight;
    let difficulty = records
        .iter()
        .map(|r| weight(r) * sanitize_difficulty(r.difficulty))
        .sum::<f64>()
        / total_weight;

    Some(StabilityRecord {
        item_id: new_id,
        stability: sanitize_stability(stability),
        difficulty: difficulty.clamp(0.0, 1.0),
        last_review_date: records
            .iter()
            .map(|r| r.last_review_date)
            .max()
            .unwrap_or(first.last_review_date),
        review_count: u32::try_from(total_reviews).unwrap_or(u32::MAX),
        created_date: records
            .iter()
            .map(|r| r.created_date)
            .min()
            .unwrap_or(first.created_date),
    })
}
