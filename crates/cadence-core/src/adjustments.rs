//! Multiplicative interval adjustments for the mature path.
//!
//! Both factors are 1.0-neutral: a mid-scale score with a flat trend leaves
//! the raw interval essentially unchanged.

use crate::constants::{
    MAX_PATTERN_FACTOR, MAX_PERFORMANCE_FACTOR, MAX_PERFORMANCE_SCORE, MIN_PATTERN_FACTOR,
    MIN_PERFORMANCE_FACTOR,
};
use crate::history::sanitize_score;
use crate::trend::TrendSummary;

const SIGMOID_STEEPNESS: f64 = 6.0;
const SIGMOID_MIDPOINT: f64 = 0.5;

const SIGMOID_WEIGHT: f64 = 0.5;
const CONFIDENCE_WEIGHT: f64 = 0.3;
const LOAD_WEIGHT: f64 = 0.2;

/// Components of the performance adjustment, kept for explanation output.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PerformanceAdjustment {
    pub sigmoid: f64,
    pub confidence: f64,
    pub cognitive_load: f64,
    /// Weighted composite, clamped to [0.3, 2.5].
    pub factor: f64,
}

/// Sigmoid component shifted so the midpoint maps to 1.0; range (0.5, 1.5).
fn sigmoid_component(p: f64) -> f64 {
    0.5 + 1.0 / (1.0 + (-SIGMOID_STEEPNESS * (p - SIGMOID_MIDPOINT)).exp())
}

/// Convex above the midpoint, concave below.
fn confidence_component(p: f64) -> f64 {
    if p >= 0.5 {
        1.0 + 2.0 * (p - 0.5).powi(2)
    } else {
        1.0 - 0.6 * (0.5 - p).sqrt()
    }
}

/// Heavy penalty for very low scores, near neutral in the middle, mild
/// bonus at the top.
fn cognitive_load_component(p: f64) -> f64 {
    if p < 0.3 {
        0.6 + p
    } else if p <= 0.7 {
        0.95 + 0.125 * (p - 0.3)
    } else {
        1.0 + 0.3 * (p - 0.7)
    }
}

/// Map a session score (0–10) to an interval multiplier.
pub fn performance_adjustment(score: f64) -> PerformanceAdjustment {
    let p = sanitize_score(score) / MAX_PERFORMANCE_SCORE;
    let sigmoid = sigmoid_component(p);
    let confidence = confidence_component(p);
    let cognitive_load = cognitive_load_component(p);
    let composite =
        SIGMOID_WEIGHT * sigmoid + CONFIDENCE_WEIGHT * confidence + LOAD_WEIGHT * cognitive_load;
    PerformanceAdjustment {
        sigmoid,
        confidence,
        cognitive_load,
        factor: composite.clamp(MIN_PERFORMANCE_FACTOR, MAX_PERFORMANCE_FACTOR),
    }
}

/// Interval multiplier from the shape of recent practice: a non-linear
/// level factor from the average score times a linear trend factor.
pub fn practice_pattern_adjustment(trend: &TrendSummary) -> f64 {
    if trend.count == 0 {
        return 1.0;
    }
    let level = (trend.average / MAX_PERFORMANCE_SCORE).clamp(0.0, 1.0);
    let base = 0.8 + 0.4 * level.powf(1.5);
    let slope = 1.0 + 0.15 * trend.normalized_slope;
    (base * slope).clamp(MIN_PATTERN_FACTOR, MAX_PATTERN_FACTOR)
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_midpoint_near_neutral() {
        let adj = performance_adjustment(5.0);
        assert_relative_eq!(adj.sigmoid, 1.0, epsilon = 1e-12);
        assert_relative_eq!(adj.confidence, 1.0, epsilon = 1e-12);
        assert!((adj.factor - 1.0).abs() < 0.01);
    }

    #[test]
    fn test_good_score_extends() {
        assert!(performance_adjustment(7.0).factor > 1.0);
        assert!(performance_adjustment(10.0).factor > performance_adjustment(7.0).factor);
    }

    #[test]
    fn test_poor_score_shortens() {
        let adj = performance_adjustment(1.0);
        assert!(adj.factor < 0.8);
        assert!(adj.cognitive_load < 0.9);
    }

    #[test]
    fn test_factor_always_clamped() {
        for s in [f64::NAN, -100.0, 0.0, 3.3, 10.0, 1e9, f64::INFINITY] {
            let f = performance_adjustment(s).factor;
            assert!((MIN_PERFORMANCE_FACTOR..=MAX_PERFORMANCE_FACTOR).contains(&f), "{s} -> {f}");
        }
    }

    #[test]
    fn test_components_monotone() {
        let mut last = 0.0;
        for i in 0..=100 {
            let f = performance_adjustment(f64::from(i) / 10.0).factor;
            assert!(f >= last - 1e-12);
            last = f;
        }
    }

    #[test]
    fn test_pattern_rewards_improvement() {
        let improving = TrendSummary::from_scores(&[6.0, 7.0, 8.0]);
        assert!(practice_pattern_adjustment(&improving) > 1.0);
        let declining = TrendSummary::from_scores(&[8.0, 5.0, 2.0]);
        assert!(practice_pattern_adjustment(&declining) < 1.0);
    }

    #[test]
    fn test_pattern_neutral_without_history() {
        assert_eq!(practice_pattern_adjustment(&TrendSummary::from_scores(&[])), 1.0);
    }

    #[test]
    fn test_pattern_clamped() {
        let best = TrendSummary::from_scores(&[0.0, 10.0, 10.0, 10.0, 10.0]);
        let worst = TrendSummary::from_scores(&[10.0, 0.0, 0.0, 0.0, 0.0]);
        assert!(practice_pattern_adjustment(&best) <= MAX_PATTERN_FACTOR);
        assert!(practice_pattern_adjustment(&worst) >= MIN_PATTERN_FACTOR);
    }
}
