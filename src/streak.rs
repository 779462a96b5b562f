//! Current-streak computation.
//!
//! A streak is the run of consecutive completed days ending at the anchor day,
//! never reaching back past the first of the anchor's month. The anchor is
//! `today` when today is completed and yesterday otherwise, so a streak built
//! up to yesterday still counts before today's session has happened.

use crate::date_key::{date_key, month_key, month_key_of, previous_day};
use crate::errors::StreakError;
use crate::store::CheckInStore;
use chrono::NaiveDate;
use std::collections::BTreeSet;
use tracing::debug;

pub async fn current_streak<S>(store: &S, user_id: &str, today: NaiveDate) -> Result<u32, StreakError>
where
    S: CheckInStore + ?Sized,
{
    let month = month_key_of(today);
    let completed = store.list_completed_day_keys(user_id, &month).await?;
    let streak = count_back(today, &completed);
    debug!(user_id, %today, completed = completed.len(), streak, "computed current streak");
    Ok(streak)
}

pub fn count_back(today: NaiveDate, completed: &BTreeSet<String>) -> u32 {
    if completed.is_empty() {
        return 0;
    }

    let month = month_key_of(today);
    let mut day = if completed.contains(&date_key(today)) {
        today
    } else {
        previous_day(today)
    };

    let mut streak = 0;
    loop {
        let key = date_key(day);
        if month_key(&key) != month || !completed.contains(&key) {
            break;
        }
        streak += 1;
        day = previous_day(day);
    }
    streak
}
