//! Score statistics over a short window of recent sessions.

use crate::error::{Result, ScheduleError};

/// Slope (score points per session) that maps to a fully saturated trend.
const SLOPE_SATURATION: f64 = 2.0;

/// Least-squares slope of `values` against their index.
pub fn linear_regression_slope(values: &[f64]) -> Result<f64> {
    let n = values.len();
    if n < 2 {
        return Err(ScheduleError::Regression(format!("need 2 points, got {n}")));
    }
    let nf = n as f64;
    let mean_x = (nf - 1.0) / 2.0;
    let mean_y = mean(values);
    let mut cov = 0.0;
    let mut var_x = 0.0;
    for (i, y) in values.iter().enumerate() {
        let dx = i as f64 - mean_x;
        cov += dx * (y - mean_y);
        var_x += dx * dx;
    }
    if var_x <= 0.0 {
        return Err(ScheduleError::Regression("zero variance in x".into()));
    }
    ScheduleError::check_finite("linear_regression_slope", cov / var_x)
}

pub fn mean(values: &[f64]) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    values.iter().sum::<f64>() / values.len() as f64
}

/// Population variance; 0 for fewer than two values.
pub fn population_variance(values: &[f64]) -> f64 {
    if values.len() < 2 {
        return 0.0;
    }
    let m = mean(values);
    values.iter().map(|v| (v - m).powi(2)).sum::<f64>() / values.len() as f64
}

/// Direction and level of recent performance.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TrendSummary {
    /// Raw regression slope, `None` with fewer than two sessions.
    pub slope: Option<f64>,
    /// Slope scaled into [-1, 1]; 0 when unknown.
    pub normalized_slope: f64,
    /// Mean score on the 0–10 scale.
    pub average: f64,
    pub count: usize,
}

impl TrendSummary {
    pub fn from_scores(scores: &[f64]) -> Self {
        let slope = match linear_regression_slope(scores) {
            Ok(s) => Some(s),
            Err(ScheduleError::Regression(_)) => None,
            Err(e) => {
                tracing::error!("trend regression failed on {scores:?}: {e}");
                None
            }
        };
        let normalized_slope = slope
            .map(|s| (s / SLOPE_SATURATION).clamp(-1.0, 1.0))
            .unwrap_or(0.0);
        Self {
            slope,
            normalized_slope,
            average: mean(scores),
            count: scores.len(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_slope_of_increasing_series() {
        assert_relative_eq!(linear_regression_slope(&[6.0, 7.0, 8.0]).unwrap(), 1.0);
        assert_relative_eq!(linear_regression_slope(&[9.0, 7.0, 5.0, 3.0]).unwrap(), -2.0);
    }

    #[test]
    fn test_slope_needs_two_points() {
        assert!(linear_regression_slope(&[5.0]).is_err());
        assert!(linear_regression_slope(&[]).is_err());
    }

    #[test]
    fn test_flat_series_zero_slope() {
        assert_relative_eq!(linear_regression_slope(&[4.0, 4.0, 4.0]).unwrap(), 0.0);
    }

    #[test]
    fn test_variance() {
        assert_relative_eq!(population_variance(&[2.0, 4.0, 4.0, 4.0, 5.0, 5.0, 7.0, 9.0]), 4.0);
        assert_eq!(population_variance(&[3.0]), 0.0);
    }

    #[test]
    fn test_summary_saturates() {
        let s = TrendSummary::from_scores(&[0.0, 10.0]);
        assert_eq!(s.normalized_slope, 1.0);
        let single = TrendSummary::from_scores(&[7.0]);
        assert_eq!(single.slope, None);
        assert_eq!(single.normalized_slope, 0.0);
        assert_relative_eq!(single.average, 7.0);
    }
}
