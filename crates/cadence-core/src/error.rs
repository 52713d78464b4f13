use std::fmt;

/// Algorithmic failure inside a scheduling computation.
///
/// These never escape the public scheduler entry points: they are logged and
/// replaced with a conservative fallback.
#[derive(Debug, Clone, PartialEq)]
pub enum ScheduleError {
    /// A computation produced NaN or an infinity.
    NonFinite { stage: &'static str, value: f64 },
    /// A model parameter was outside the domain the formula accepts.
    Domain { stage: &'static str, value: f64 },
    /// Not enough points, or a degenerate spread, for a regression.
    Regression(String),
}

impl ScheduleError {
    /// Convenience check used after every floating-point step.
    pub fn check_finite(stage: &'static str, value: f64) -> Result<f64> {
        if value.is_finite() {
            Ok(value)
        } else {
            Err(ScheduleError::NonFinite { stage, value })
        }
    }
}

impl fmt::Display for ScheduleError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ScheduleError::NonFinite { stage, value } => {
                write!(f, "non-finite value {value} in {stage}")
            }
            ScheduleError::Domain { stage, value } => {
                write!(f, "value {value} outside model domain in {stage}")
            }
            ScheduleError::Regression(msg) => write!(f, "regression failed: {msg}"),
        }
    }
}

impl std::error::Error for ScheduleError {}

pub type Result<T> = std::result::Result<T, ScheduleError>;
