//! Calibrated constants and learner settings.
//!
//! Every section deserializes with defaults so a partial `config.toml` is
//! valid. [`Config::sanitized`] repairs values that would break the model's
//! invariants instead of rejecting the file.

use serde::{Deserialize, Serialize};

use crate::constants::{MAX_TAU, MAX_TARGET_RETENTION, MIN_TAU, MIN_TARGET_RETENTION};
use crate::item::Difficulty;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct Config {
    pub retention: RetentionConfig,
    pub stability: StabilityConfig,
    pub learner: LearnerProfile,
    pub store: StoreConfig,
    pub clock: ClockConfig,
}

/// Forgetting-curve calibration: `R(t) = baseline + learning_strength·e^(−t/τ)`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RetentionConfig {
    pub baseline: f64,
    pub learning_strength: f64,
    pub base_tau: f64,
    pub targets: RetentionTargets,
}

impl Default for RetentionConfig {
    fn default() -> Self {
        Self {
            baseline: 0.1,
            learning_strength: 0.9,
            base_tau: 7.0,
            targets: RetentionTargets::default(),
        }
    }
}

/// Difficulty → desired recall probability at the next review.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RetentionTargets {
    pub easy: f64,
    pub average: f64,
    pub difficult: f64,
    pub mastered: f64,
}

impl Default for RetentionTargets {
    fn default() -> Self {
        Self {
            easy: 0.75,
            average: 0.80,
            difficult: 0.85,
            mastered: 0.70,
        }
    }
}

impl RetentionTargets {
    pub fn for_difficulty(&self, difficulty: Difficulty) -> f64 {
        match difficulty {
            Difficulty::Easy => self.easy,
            Difficulty::Average => self.average,
            Difficulty::Difficult => self.difficult,
            Difficulty::Mastered => self.mastered,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StabilityConfig {
    /// Base stability multiplier on a successful review.
    pub growth_factor: f64,
    /// Retrievability at which the next review is due.
    pub threshold: f64,
    /// Stability assigned to a fresh record, in days.
    pub initial_stability: f64,
    /// Difficulty assigned to a fresh record.
    pub initial_difficulty: f64,
}

impl Default for StabilityConfig {
    fn default() -> Self {
        Self {
            growth_factor: 1.9,
            threshold: 0.8,
            initial_stability: 2.0,
            initial_difficulty: 0.5,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum ExperienceLevel {
    Beginner,
    #[default]
    Intermediate,
    Advanced,
}

impl ExperienceLevel {
    /// Experienced learners consolidate faster: τ multiplier.
    pub fn tau_factor(&self) -> f64 {
        match self {
            ExperienceLevel::Beginner => 0.85,
            ExperienceLevel::Intermediate => 1.0,
            ExperienceLevel::Advanced => 1.15,
        }
    }
}

/// Settings-derived calibration of the learner.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct LearnerProfile {
    pub age: Option<u32>,
    pub experience: ExperienceLevel,
    /// Personalized τ multiplier, e.g. from a previous calibration run.
    pub tau_hint: Option<f64>,
}

impl LearnerProfile {
    /// Age adjustment to τ; neutral when unknown.
    pub fn age_factor(&self) -> f64 {
        match self.age {
            Some(age) if age < 18 => 1.05,
            Some(age) if age >= 65 => 0.85,
            Some(age) if age >= 50 => 0.92,
            _ => 1.0,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StoreConfig {
    /// Maximum scheduled-session records retained on disk.
    pub max_records: usize,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self { max_records: 5000 }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ClockConfig {
    pub day_start_hour: u32,
}

impl Default for ClockConfig {
    fn default() -> Self {
        Self { day_start_hour: 4 }
    }
}

fn repair(name: &str, value: f64, valid: bool, fallback: f64) -> f64 {
    if valid {
        value
    } else {
        tracing::warn!("config {name}={value} is out of range, using {fallback}");
        fallback
    }
}

impl Config {
    /// Replace out-of-range values with defaults, logging each repair.
    pub fn sanitized(mut self) -> Self {
        let d = RetentionConfig::default();
        let r = &mut self.retention;
        r.baseline = repair(
            "retention.baseline",
            r.baseline,
            r.baseline.is_finite() && (0.0..0.5).contains(&r.baseline),
            d.baseline,
        );
        r.learning_strength = repair(
            "retention.learning_strength",
            r.learning_strength,
            r.learning_strength.is_finite()
                && r.learning_strength > 0.0
                && r.baseline + r.learning_strength <= 1.0 + 1e-9,
            1.0 - r.baseline,
        );
        r.base_tau = repair(
            "retention.base_tau",
            r.base_tau,
            r.base_tau.is_finite() && (MIN_TAU..=MAX_TAU).contains(&r.base_tau),
            d.base_tau,
        );
        let upper = r.baseline + r.learning_strength;
        let lower = r.baseline;
        let dt = RetentionTargets::default();
        for (name, value, fallback) in [
            ("retention.targets.easy", &mut r.targets.easy, dt.easy),
            ("retention.targets.average", &mut r.targets.average, dt.average),
            (
                "retention.targets.difficult",
                &mut r.targets.difficult,
                dt.difficult,
            ),
            ("retention.targets.mastered", &mut r.targets.mastered, dt.mastered),
        ] {
            let ok = value.is_finite()
                && *value > lower
                && *value < upper
                && (MIN_TARGET_RETENTION..=MAX_TARGET_RETENTION).contains(&*value);
            *value = repair(name, *value, ok, fallback);
        }

        let ds = StabilityConfig::default();
        let s = &mut self.stability;
        s.growth_factor = repair(
            "stability.growth_factor",
            s.growth_factor,
            s.growth_factor.is_finite() && s.growth_factor > 1.0 && s.growth_factor <= 5.0,
            ds.growth_factor,
        );
        s.threshold = repair(
            "stability.threshold",
            s.threshold,
            s.threshold.is_finite() && s.threshold > 0.5 && s.threshold < 1.0,
            ds.threshold,
        );
        s.initial_stability = repair(
            "stability.initial_stability",
            s.initial_stability,
            s.initial_stability.is_finite() && s.initial_stability >= 0.5,
            ds.initial_stability,
        );
        s.initial_difficulty = repair(
            "stability.initial_difficulty",
            s.initial_difficulty,
            s.initial_difficulty.is_finite() && (0.0..=1.0).contains(&s.initial_difficulty),
            ds.initial_difficulty,
        );

        if let Some(hint) = self.learner.tau_hint
            && !(hint.is_finite() && (0.25..=4.0).contains(&hint))
        {
            tracing::warn!("config learner.tau_hint={hint} is out of range, ignoring");
            self.learner.tau_hint = None;
        }

        if self.store.max_records == 0 {
            tracing::warn!("config store.max_records=0 is invalid, using default");
            self.store.max_records = StoreConfig::default().max_records;
        }
        if self.clock.day_start_hour > 23 {
            tracing::warn!(
                "config clock.day_start_hour={} is invalid, using 23",
                self.clock.day_start_hour
            );
            self.clock.day_start_hour = 23;
        }
        self
    }
}
