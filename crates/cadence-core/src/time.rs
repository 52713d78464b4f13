//! Session-date normalization.
//!
//! A practice day does not start at midnight: a session at 01:30 belongs to
//! the previous evening's practice. Everything that compares "today" against
//! due dates goes through [`SessionClock`] instead of the raw wall clock.

use chrono::{Days, Local, NaiveDate, NaiveDateTime, Timelike};

/// Maps wall-clock timestamps onto practice days.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SessionClock {
    day_start_hour: u32,
}

impl Default for SessionClock {
    fn default() -> Self {
        Self { day_start_hour: 4 }
    }
}

impl SessionClock {
    /// Hours outside 0..24 are clamped to 23.
    pub fn new(day_start_hour: u32) -> Self {
        if day_start_hour > 23 {
            tracing::debug!("InputClamp: day_start_hour {day_start_hour} -> 23");
        }
        Self {
            day_start_hour: day_start_hour.min(23),
        }
    }

    pub fn day_start_hour(&self) -> u32 {
        self.day_start_hour
    }

    /// Practice day for a local timestamp.
    pub fn session_date(&self, at: NaiveDateTime) -> NaiveDate {
        let date = at.date();
        if at.hour() < self.day_start_hour {
            date.pred_opt().unwrap_or(date)
        } else {
            date
        }
    }

    /// The current practice day.
    pub fn today(&self) -> NaiveDate {
        self.session_date(Local::now().naive_local())
    }
}

/// `date + days`, saturating at the calendar maximum.
pub fn add_days(date: NaiveDate, days: u32) -> NaiveDate {
    date.checked_add_days(Days::new(u64::from(days)))
        .unwrap_or(NaiveDate::MAX)
}

/// The day after `date`.
pub fn tomorrow(date: NaiveDate) -> NaiveDate {
    add_days(date, 1)
}

/// Signed whole days from `from` to `to`.
pub fn days_between(from: NaiveDate, to: NaiveDate) -> i64 {
    (to - from).num_days()
}
