//! Extended forgetting curve: `R(t) = baseline + learning_strength·e^(−t/τ)`.
//!
//! τ is the decay-rate parameter (larger ⇒ slower forgetting). Scheduling
//! inverts the curve: given a target recall probability R*, the raw interval
//! is the time at which predicted retention falls to R*. Every interval that
//! leaves this crate passes through [`clamp_interval_to_bounds`].

use crate::config::{ExperienceLevel, LearnerProfile, RetentionConfig};
use crate::constants::{
    EPSILON, MAX_INTERVAL_DAYS, MAX_INTERVAL_TO_PARAMETER_RATIO, MAX_OVERRIDE_BIAS,
    MAX_RETENTION_NUDGE, MAX_TARGET_RETENTION, MAX_TAU, MAX_TAU_CALIBRATION, MATURE_STAGE,
    MIN_INTERVAL_DAYS, MIN_OVERRIDE_BIAS, MIN_TARGET_RETENTION, MIN_TAU, MIN_TAU_CALIBRATION,
};
use crate::error::{Result, ScheduleError};
use crate::item::Difficulty;
use crate::trend::TrendSummary;

/// Which bound, if any, shaped a clamped interval.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ClampReason {
    None,
    LowBound,
    HighBound,
    /// Capped by the 5× governing-parameter rule.
    Extreme,
    /// Raw value or governing parameter was not usable.
    Invalid,
}

impl ClampReason {
    pub fn as_str(&self) -> &'static str {
        match self {
            ClampReason::None => "none",
            ClampReason::LowBound => "low-bound",
            ClampReason::HighBound => "high-bound",
            ClampReason::Extreme => "extreme",
            ClampReason::Invalid => "invalid",
        }
    }
}

/// A whole-day interval that satisfies every bound.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ClampedInterval {
    pub days: u32,
    pub reason: ClampReason,
}

/// Central interval clamp.
///
/// `days ∈ [1, 365]` and `days ≤ 5 × governing` for any governing parameter
/// of at least 0.2 days (τ is always ≥ 1, stability always ≥ 0.5).
pub fn clamp_interval_to_bounds(raw: f64, governing: f64) -> ClampedInterval {
    if !governing.is_finite() || governing <= 0.0 {
        tracing::warn!("interval clamp: invalid governing parameter {governing}, raw={raw}");
        return ClampedInterval {
            days: MIN_INTERVAL_DAYS,
            reason: ClampReason::Invalid,
        };
    }
    if !raw.is_finite() {
        tracing::warn!("interval clamp: invalid raw interval {raw}, governing={governing}");
        return ClampedInterval {
            days: MIN_INTERVAL_DAYS,
            reason: ClampReason::Invalid,
        };
    }
    if raw < f64::from(MIN_INTERVAL_DAYS) {
        tracing::debug!("interval clamp: {raw:.3} raised to {MIN_INTERVAL_DAYS}");
        return ClampedInterval {
            days: MIN_INTERVAL_DAYS,
            reason: ClampReason::LowBound,
        };
    }

    let ratio_cap = (MAX_INTERVAL_TO_PARAMETER_RATIO * governing).floor();
    let upper = ratio_cap
        .min(f64::from(MAX_INTERVAL_DAYS))
        .max(f64::from(MIN_INTERVAL_DAYS));
    let rounded = raw.round();

    if rounded > upper {
        let reason = if ratio_cap < f64::from(MAX_INTERVAL_DAYS) {
            ClampReason::Extreme
        } else {
            ClampReason::HighBound
        };
        tracing::debug!(
            "interval clamp: {raw:.3} capped to {upper} ({})",
            reason.as_str()
        );
        return ClampedInterval {
            days: upper as u32,
            reason,
        };
    }

    ClampedInterval {
        days: rounded as u32,
        reason: ClampReason::None,
    }
}

/// Clamp τ into [1, 180] days. Non-finite values collapse to the nearest
/// sensible bound.
pub fn clamp_tau(tau: f64) -> f64 {
    if tau.is_nan() {
        tracing::warn!("tau is NaN, using {MIN_TAU}");
        return MIN_TAU;
    }
    let clamped = tau.clamp(MIN_TAU, MAX_TAU);
    if clamped != tau {
        tracing::debug!("InputClamp: tau {tau} -> {clamped}");
    }
    clamped
}

fn difficulty_tau_factor(difficulty: Difficulty) -> f64 {
    match difficulty {
        Difficulty::Easy => 1.3,
        Difficulty::Average => 1.0,
        Difficulty::Difficult => 0.75,
        Difficulty::Mastered => 1.6,
    }
}

/// Inputs to the full adaptive τ pipeline beyond the item basics.
#[derive(Debug, Clone, Copy)]
pub struct TauContext<'a> {
    pub learner: &'a LearnerProfile,
    pub tau_calibration: f64,
    pub override_bias: f64,
    /// Mean of recent scores, when any history exists.
    pub recent_average: Option<f64>,
}

fn bounded_multiplier(name: &str, value: f64, min: f64, max: f64) -> f64 {
    if !value.is_finite() {
        tracing::debug!("InputClamp: {name} {value} -> 1");
        return 1.0;
    }
    let clamped = value.clamp(min, max);
    if clamped != value {
        tracing::debug!("InputClamp: {name} {value} -> {clamped}");
    }
    clamped
}

/// Stateless forgetting-curve model over a calibration.
#[derive(Debug, Clone, Default)]
pub struct RetentionModel {
    config: RetentionConfig,
}

impl RetentionModel {
    pub fn new(config: RetentionConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &RetentionConfig {
        &self.config
    }

    /// Base τ scaled by difficulty, repetitions and foundation stage, with
    /// graduated extra growth for mastered items.
    pub fn adjusted_tau(&self, difficulty: Difficulty, completed_reps: u32, stage: i32) -> f64 {
        let reps = f64::from(completed_reps);
        let rep_factor = 1.0 + 0.15 * reps.ln_1p();
        let mastery_factor = if difficulty == Difficulty::Mastered {
            1.0 + 0.5 * (1.0 - (-reps / 10.0).exp())
        } else {
            1.0
        };
        let stage = stage.max(0);
        let stage_factor = if stage >= MATURE_STAGE {
            1.0
        } else {
            0.6 + 0.1 * f64::from(stage)
        };
        clamp_tau(
            self.config.base_tau
                * difficulty_tau_factor(difficulty)
                * rep_factor
                * mastery_factor
                * stage_factor,
        )
    }

    /// τ through the whole pipeline: item basics, learner calibration,
    /// per-item refinement, learned override preference and recent history.
    pub fn adjusted_tau_with_context(
        &self,
        difficulty: Difficulty,
        completed_reps: u32,
        stage: i32,
        ctx: &TauContext<'_>,
    ) -> Result<f64> {
        let base = self.adjusted_tau(difficulty, completed_reps, stage);
        let learner = ctx.learner.age_factor()
            * ctx.learner.experience.tau_factor()
            * ctx.learner.tau_hint.unwrap_or(1.0);
        let calibration = bounded_multiplier(
            "tau_calibration",
            ctx.tau_calibration,
            MIN_TAU_CALIBRATION,
            MAX_TAU_CALIBRATION,
        );
        let bias = bounded_multiplier(
            "override_bias",
            ctx.override_bias,
            MIN_OVERRIDE_BIAS,
            MAX_OVERRIDE_BIAS,
        );
        let history = ctx
            .recent_average
            .map(|avg| 0.85 + 0.3 * (avg.clamp(0.0, 10.0) / 10.0))
            .unwrap_or(1.0);
        let tau = ScheduleError::check_finite(
            "adjusted_tau_with_context",
            base * learner * calibration * bias * history,
        )?;
        Ok(clamp_tau(tau))
    }

    /// Desired recall probability for a difficulty.
    pub fn target_retention(&self, difficulty: Difficulty) -> f64 {
        self.config.targets.for_difficulty(difficulty)
    }

    /// R* with the bounded trend nudge applied. Improving or strong
    /// performance lowers R* (longer wait), declining or weak raises it.
    pub fn target_retention_with_trend(&self, difficulty: Difficulty, trend: &TrendSummary) -> f64 {
        let base = self.target_retention(difficulty);
        if trend.count == 0 {
            return base.clamp(MIN_TARGET_RETENTION, MAX_TARGET_RETENTION);
        }
        let level = ((trend.average - 5.0) / 5.0).clamp(-1.0, 1.0);
        let nudge = -(0.03 * trend.normalized_slope + 0.02 * level)
            .clamp(-MAX_RETENTION_NUDGE, MAX_RETENTION_NUDGE);
        (base + nudge).clamp(MIN_TARGET_RETENTION, MAX_TARGET_RETENTION)
    }

    /// Predicted recall probability `t` days after practice.
    pub fn predicted_retention(&self, t: f64, tau: f64) -> f64 {
        let t = if t.is_finite() { t.max(0.0) } else { 0.0 };
        let tau = clamp_tau(tau);
        self.config.baseline + self.config.learning_strength * (-t / tau).exp()
    }

    /// Days until predicted retention decays to `r_star`.
    pub fn raw_interval(&self, tau: f64, r_star: f64) -> Result<f64> {
        let tau = if tau.is_finite() && tau > 0.0 {
            tau
        } else {
            let fixed = clamp_tau(tau);
            tracing::warn!("raw_interval: tau {tau} outside model domain, using {fixed}");
            fixed
        };

        let baseline = self.config.baseline;
        let strength = self.config.learning_strength;
        if !r_star.is_finite() {
            return Err(ScheduleError::Domain {
                stage: "raw_interval",
                value: r_star,
            });
        }
        if !baseline.is_finite() || !strength.is_finite() || strength <= 2e-6 {
            return Err(ScheduleError::Domain {
                stage: "raw_interval",
                value: strength,
            });
        }
        let lo = baseline + 1e-6;
        let hi = baseline + strength - 1e-6;
        let r = if r_star <= lo || r_star >= hi {
            let fixed = r_star.clamp(lo, hi);
            tracing::warn!(
                "raw_interval: R*={r_star} outside ({baseline}, {}), using {fixed}",
                baseline + strength
            );
            fixed
        } else {
            r_star
        };

        let ratio = (r - baseline) / strength;
        if ratio <= EPSILON {
            return Err(ScheduleError::Domain {
                stage: "raw_interval",
                value: ratio,
            });
        }
        ScheduleError::check_finite("raw_interval", -tau * ratio.ln())
    }

    /// Retention samples for days `0..=days_ahead`, for plotting. Never increases.
    pub fn retention_curve(
        &self,
        days_ahead: u32,
        tau: f64,
        reps: u32,
        difficulty: Difficulty,
        experience: ExperienceLevel,
    ) -> Vec<f64> {
        let days_ahead = days_ahead.min(MAX_INTERVAL_DAYS);
        let difficulty_factor = match difficulty {
            Difficulty::Easy => 1.1,
            Difficulty::Average => 1.0,
            Difficulty::Difficult => 0.9,
            Difficulty::Mastered => 1.2,
        };
        let effective_tau = clamp_tau(
            clamp_tau(tau)
                * experience.tau_factor()
                * (1.0 + 0.1 * f64::from(reps).ln_1p())
                * difficulty_factor,
        );

        let mut last = f64::INFINITY;
        (0..=days_ahead)
            .map(|day| {
                let r = self.predicted_retention(f64::from(day), effective_tau).min(last);
                last = r;
                r
            })
            .collect()
    }
}
