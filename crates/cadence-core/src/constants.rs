/// Lower bound for any scheduled interval, in days.
pub const MIN_INTERVAL_DAYS: u32 = 1;

/// Upper bound for any scheduled interval, in days.
pub const MAX_INTERVAL_DAYS: u32 = 365;

/// An interval may never exceed this multiple of its governing parameter (τ or S).
pub const MAX_INTERVAL_TO_PARAMETER_RATIO: f64 = 5.0;

/// τ bounds in days.
pub const MIN_TAU: f64 = 1.0;
pub const MAX_TAU: f64 = 180.0;

/// Target retention bounds after the trend nudge.
pub const MIN_TARGET_RETENTION: f64 = 0.60;
pub const MAX_TARGET_RETENTION: f64 = 0.90;

/// Largest absolute trend nudge applied to R*.
pub const MAX_RETENTION_NUDGE: f64 = 0.05;

/// Performance scores live on a 0–10 scale.
pub const MAX_PERFORMANCE_SCORE: f64 = 10.0;

/// Foundation stage at which an item is considered mature.
pub const MATURE_STAGE: i32 = 3;

/// Interval of every foundation-ramp session.
pub const FOUNDATION_INTERVAL_DAYS: u32 = 1;

/// Cool-down after an automatically detected frustrating session.
pub const FRUSTRATION_COOLDOWN_DAYS: u32 = 3;

/// Cool-down after a session the user explicitly marked as frustrating.
pub const MANUAL_FRUSTRATION_COOLDOWN_DAYS: u32 = 2;

/// A repeated frustration within this many days does not fire a new cool-down.
pub const FRUSTRATION_WINDOW_DAYS: i64 = 1;

/// Sessions considered by trend and pattern analysis.
pub const TREND_WINDOW: usize = 5;

/// Stability path gate: minimum history and score variance.
pub const STABILITY_MIN_HISTORY: usize = 5;
pub const STABILITY_VARIANCE_THRESHOLD: f64 = 1.0;

/// Performance adjustment clamp.
pub const MIN_PERFORMANCE_FACTOR: f64 = 0.3;
pub const MAX_PERFORMANCE_FACTOR: f64 = 2.5;

/// Practice-pattern adjustment clamp.
pub const MIN_PATTERN_FACTOR: f64 = 0.7;
pub const MAX_PATTERN_FACTOR: f64 = 1.3;

/// Per-item τ refinement bounds and learning rate.
pub const MIN_TAU_CALIBRATION: f64 = 0.5;
pub const MAX_TAU_CALIBRATION: f64 = 2.0;
pub const TAU_LEARNING_RATE: f64 = 0.1;

/// Learned override preference bounds and EMA weight.
pub const MIN_OVERRIDE_BIAS: f64 = 0.8;
pub const MAX_OVERRIDE_BIAS: f64 = 1.25;
pub const OVERRIDE_BIAS_WEIGHT: f64 = 0.3;

/// Sessions shorter than this with zero repetitions are not practice at all;
/// at or above it they count as preparation only.
pub const PREP_ONLY_MIN_SECONDS: u32 = 15;

/// Numerical epsilon for near-zero comparisons
pub const EPSILON: f64 = 1e-10;
