use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub enum SessionStatus {
    #[default]
    Planned,
    Completed,
}

/// Why a planned session was closed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum CompletionReason {
    TargetReached,
    Practiced,
}

/// A "next session" entry for one item.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScheduledSession {
    pub id: Uuid,
    pub item_id: Uuid,
    pub owner_id: Uuid,
    pub scheduled_date: NaiveDate,
    #[serde(default)]
    pub status: SessionStatus,
    pub tau: f64,
    #[serde(default)]
    pub completion_date: Option<NaiveDate>,
    #[serde(default)]
    pub completion_reason: Option<CompletionReason>,
}

impl ScheduledSession {
    pub fn planned(item_id: Uuid, owner_id: Uuid, scheduled_date: NaiveDate, tau: f64) -> Self {
        Self {
            id: Uuid::new_v4(),
            item_id,
            owner_id,
            scheduled_date,
            status: SessionStatus::Planned,
            tau,
            completion_date: None,
            completion_reason: None,
        }
    }

    pub fn is_open(&self) -> bool {
        self.status != SessionStatus::Completed
    }

    pub fn complete(&mut self, date: NaiveDate, reason: CompletionReason) {
        self.status = SessionStatus::Completed;
        self.completion_date = Some(date);
        self.completion_reason = Some(reason);
    }

    /// Date used to rank records for retention: completion, else schedule.
    pub fn recency_key(&self) -> NaiveDate {
        self.completion_date.unwrap_or(self.scheduled_date)
    }
}
