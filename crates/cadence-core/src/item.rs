use std::fmt;
use std::str::FromStr;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::constants::MATURE_STAGE;

/// Self-assessed difficulty of a practice item.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub enum Difficulty {
    Easy,
    #[default]
    Average,
    Difficult,
    Mastered,
}

impl Difficulty {
    pub fn as_str(&self) -> &'static str {
        match self {
            Difficulty::Easy => "easy",
            Difficulty::Average => "average",
            Difficulty::Difficult => "difficult",
            Difficulty::Mastered => "mastered",
        }
    }
}

impl fmt::Display for Difficulty {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Difficulty {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "easy" => Ok(Difficulty::Easy),
            "average" => Ok(Difficulty::Average),
            "difficult" | "hard" => Ok(Difficulty::Difficult),
            "mastered" => Ok(Difficulty::Mastered),
            other => Err(format!("unknown difficulty '{other}'")),
        }
    }
}

/// Whether an item takes part in scheduling.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub enum LifecycleState {
    #[default]
    Active,
    Maintenance,
    Inactive,
}

impl LifecycleState {
    pub fn as_str(&self) -> &'static str {
        match self {
            LifecycleState::Active => "active",
            LifecycleState::Maintenance => "maintenance",
            LifecycleState::Inactive => "inactive",
        }
    }
}

impl FromStr for LifecycleState {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "active" => Ok(LifecycleState::Active),
            "maintenance" => Ok(LifecycleState::Maintenance),
            "inactive" => Ok(LifecycleState::Inactive),
            other => Err(format!("unknown lifecycle state '{other}'")),
        }
    }
}

/// State of the collection that owns a group of items.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub enum OwnerState {
    #[default]
    Active,
    Paused,
    Removed,
}

impl OwnerState {
    pub fn as_str(&self) -> &'static str {
        match self {
            OwnerState::Active => "active",
            OwnerState::Paused => "paused",
            OwnerState::Removed => "removed",
        }
    }

    /// Paused and removed owners keep their items out of rescheduling.
    pub fn is_schedulable(&self) -> bool {
        matches!(self, OwnerState::Active)
    }
}

impl FromStr for OwnerState {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "active" => Ok(OwnerState::Active),
            "paused" => Ok(OwnerState::Paused),
            "removed" => Ok(OwnerState::Removed),
            other => Err(format!("unknown owner state '{other}'")),
        }
    }
}

/// Parent collection of practice items.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Owner {
    pub id: Uuid,
    pub name: String,
    #[serde(default)]
    pub state: OwnerState,
}

impl Owner {
    pub fn new(name: &str) -> Self {
        Self {
            id: Uuid::new_v4(),
            name: name.to_string(),
            state: OwnerState::Active,
        }
    }
}

/// A discrete unit of practice with its scheduling state.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PracticeItem {
    pub id: Uuid,
    pub owner_id: Uuid,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub difficulty: Difficulty,
    #[serde(default)]
    pub completed_repetitions: u32,
    /// 0, 1, 2 = foundation ramp; 3 and above = mature. Signed so that bad
    /// data can be detected and corrected instead of wrapping.
    #[serde(default)]
    pub foundation_stage: i32,
    #[serde(default)]
    pub next_due_date: Option<NaiveDate>,
    #[serde(default)]
    pub interval_days: u32,
    #[serde(default)]
    pub last_practice_date: Option<NaiveDate>,
    #[serde(default)]
    pub last_frustration_date: Option<NaiveDate>,
    #[serde(default)]
    pub lifecycle: LifecycleState,
    #[serde(default)]
    pub target_repetitions: u32,
    #[serde(default)]
    pub attempts_till_success: u32,
    #[serde(default = "one")]
    pub tau_calibration: f64,
    #[serde(default = "one")]
    pub override_bias: f64,
}

fn one() -> f64 {
    1.0
}

impl PracticeItem {
    pub fn new(owner_id: Uuid, name: &str, difficulty: Difficulty) -> Self {
        Self {
            id: Uuid::new_v4(),
            owner_id,
            name: name.to_string(),
            difficulty,
            completed_repetitions: 0,
            foundation_stage: 0,
            next_due_date: None,
            interval_days: 0,
            last_practice_date: None,
            last_frustration_date: None,
            lifecycle: LifecycleState::Active,
            target_repetitions: 0,
            attempts_till_success: 0,
            tau_calibration: 1.0,
            override_bias: 1.0,
        }
    }

    pub fn is_mature(&self) -> bool {
        self.foundation_stage >= MATURE_STAGE
    }

    pub fn is_schedulable(&self) -> bool {
        self.lifecycle != LifecycleState::Inactive
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_difficulty_parse() {
        assert_eq!("Easy".parse::<Difficulty>().unwrap(), Difficulty::Easy);
        assert_eq!("hard".parse::<Difficulty>().unwrap(), Difficulty::Difficult);
        assert!("impossible".parse::<Difficulty>().is_err());
    }

    #[test]
    fn test_new_item_defaults() {
        let item = PracticeItem::new(Uuid::new_v4(), "scales", Difficulty::Average);
        assert_eq!(item.foundation_stage, 0);
        assert!(!item.is_mature());
        assert!(item.is_schedulable());
        assert_eq!(item.tau_calibration, 1.0);
    }

    #[test]
    fn test_item_json_defaults_missing_fields() {
        let id = Uuid::new_v4();
        let owner = Uuid::new_v4();
        let json = format!(r#"{{"id":"{id}","ownerId":"{owner}"}}"#);
        let item: PracticeItem = serde_json::from_str(&json).unwrap();
        assert_eq!(item.difficulty, Difficulty::Average);
        assert_eq!(item.override_bias, 1.0);
        assert_eq!(item.lifecycle, LifecycleState::Active);
    }

    #[test]
    fn test_owner_schedulable() {
        assert!(OwnerState::Active.is_schedulable());
        assert!(!OwnerState::Paused.is_schedulable());
        assert!(!OwnerState::Removed.is_schedulable());
    }
}
