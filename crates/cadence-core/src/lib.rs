//! Adaptive spaced-repetition scheduling engine.
//!
//! Models retention with an extended forgetting curve
//! `R(t) = baseline + learning_strength·e^(−t/τ)`, ramps new items through a
//! fixed foundation stage, cools down after frustrating sessions, and hands
//! erratic mature items to a stability model. Every interval is clamped to
//! `[1, 365]` days and to 5× its governing parameter.
//!
//! Zero I/O: persistence and locking live in `cadence-store`.

pub mod adjustments;
pub mod config;
pub mod constants;
pub mod error;
pub mod history;
pub mod item;
pub mod library;
pub mod planner;
pub mod retention;
pub mod scheduler;
pub mod serde_compat;
pub mod session;
pub mod stability;
pub mod time;
pub mod trend;

pub use adjustments::{PerformanceAdjustment, performance_adjustment, practice_pattern_adjustment};
pub use config::{
    ClockConfig, Config, ExperienceLevel, LearnerProfile, RetentionConfig, RetentionTargets,
    StabilityConfig, StoreConfig,
};
pub use constants::{MATURE_STAGE, MAX_INTERVAL_DAYS, MIN_INTERVAL_DAYS};
pub use error::ScheduleError;
pub use history::{DayClassification, HistoryEntry, SessionOutcome, classify_day};
pub use item::{Difficulty, LifecycleState, Owner, OwnerState, PracticeItem};
pub use library::Library;
pub use planner::schedule_future_sessions;
pub use retention::{ClampReason, ClampedInterval, RetentionModel, clamp_interval_to_bounds};
pub use scheduler::{
    OverrideRecord, OverrideRequest, ScheduleDecision, SchedulePath, ScheduleRequest, Scheduler,
};
pub use serde_compat::{SESSIONS_FILE, STABILITY_FILE, export_json, import_json};
pub use session::{CompletionReason, ScheduledSession, SessionStatus};
pub use stability::{StabilityModel, StabilityRecord, merge_records};
pub use time::SessionClock;
