use crate::date_key::parse_month_key;
use crate::errors::StreakError;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Archived streak figures for one finished month.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MonthlyRecord {
    pub streak: u32,
    pub month: String,
    pub complete_days: u32,
    pub year: i32,
    pub month_number: u32,
}

/// Per-user streak document. Passed by value through the engine and written
/// back whole; `version` grows by one with every persisted mutation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StreakState {
    pub current_streak: u32,
    pub longest_streak: u32,
    pub total_complete_days: u32,
    pub current_month_start: DateTime<Utc>,
    #[serde(default)]
    pub monthly_history: BTreeMap<String, MonthlyRecord>,
    #[serde(default)]
    pub version: u64,
}

impl StreakState {
    pub fn new(now: DateTime<Utc>) -> Self {
        Self {
            current_streak: 0,
            longest_streak: 0,
            total_complete_days: 0,
            current_month_start: now,
            monthly_history: BTreeMap::new(),
            version: 0,
        }
    }

    pub fn validate(&self) -> Result<(), StreakError> {
        if self.current_streak > self.longest_streak {
            return Err(StreakError::InvalidState(format!(
                "current streak {} exceeds longest streak {}",
                self.current_streak, self.longest_streak
            )));
        }

        for (key, record) in &self.monthly_history {
            let Some((year, month_number)) = parse_month_key(key) else {
                return Err(StreakError::InvalidState(format!(
                    "malformed history key '{key}'"
                )));
            };
            if record.year != year || record.month_number != month_number {
                return Err(StreakError::InvalidState(format!(
                    "history entry '{key}' holds {}-{:02}",
                    record.year, record.month_number
                )));
            }
        }

        Ok(())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct DayPoint {
    pub date: String,
    pub completed: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq, Eq)]
pub struct StreakStats {
    pub current_streak: u32,
    pub longest_streak: u32,
    pub total_complete_days: u32,
    pub monthly_history: Vec<MonthlyRecord>,
    pub recent_days: Vec<DayPoint>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct DayStatus {
    pub date: String,
    pub checked_in: bool,
    pub completed: bool,
}

#[derive(Debug, Clone, PartialEq)]
pub struct CompletionOutcome {
    pub day_key: String,
    pub newly_completed: bool,
    pub state: StreakState,
}

#[derive(Debug, Deserialize)]
pub struct AtQuery {
    pub at: Option<DateTime<Utc>>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct CompletionResponse {
    pub completed: bool,
    pub date: String,
    pub newly_completed: bool,
    pub current_streak: u32,
    pub longest_streak: u32,
    pub total_complete_days: u32,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct RolloverResponse {
    pub rolled_over: bool,
}
