use crate::date_key::{date_key, month_key_of};
use crate::models::{DayPoint, MonthlyRecord, StreakState, StreakStats};
use chrono::{Duration, NaiveDate};
use std::collections::BTreeSet;

pub const RECENT_DAYS: i64 = 7;

/// Read model shown next to the streak counter. `longest_streak` is raised to
/// the fresh `current_streak` here without touching the stored value.
pub fn build_stats(
    state: &StreakState,
    current_streak: u32,
    today: NaiveDate,
    completed: &BTreeSet<String>,
) -> StreakStats {
    let mut monthly_history: Vec<MonthlyRecord> = state.monthly_history.values().cloned().collect();
    monthly_history.sort_by(|a, b| {
        b.year
            .cmp(&a.year)
            .then_with(|| b.month_number.cmp(&a.month_number))
    });

    let recent_days = recent_dates(today)
        .map(|date| {
            let key = date_key(date);
            DayPoint {
                completed: completed.contains(&key),
                date: key,
            }
        })
        .collect();

    StreakStats {
        current_streak,
        longest_streak: state.longest_streak.max(current_streak),
        total_complete_days: state.total_complete_days,
        monthly_history,
        recent_days,
    }
}

/// Oldest first, ending at `today`.
pub fn recent_dates(today: NaiveDate) -> impl Iterator<Item = NaiveDate> {
    (0..RECENT_DAYS)
        .rev()
        .map(move |offset| today - Duration::days(offset))
}

/// Month keys the recent-days window touches.
pub fn recent_months(today: NaiveDate) -> BTreeSet<String> {
    recent_dates(today).map(month_key_of).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};

    fn record(year: i32, month_number: u32, streak: u32) -> MonthlyRecord {
        MonthlyRecord {
            streak,
            month: format!("{year}-{month_number}"),
            complete_days: streak,
            year,
            month_number,
        }
    }

    fn state() -> StreakState {
        let mut state = StreakState::new(Utc.with_ymd_and_hms(2024, 3, 1, 7, 0, 0).single().unwrap());
        state.longest_streak = 4;
        state.total_complete_days = 11;
        for (key, rec) in [
            ("2023-12", record(2023, 12, 2)),
            ("2024-02", record(2024, 2, 4)),
            ("2023-11", record(2023, 11, 1)),
            ("2024-01", record(2024, 1, 3)),
        ] {
            state.monthly_history.insert(key.to_string(), rec);
        }
        state
    }

    #[test]
    fn history_is_newest_first() {
        let today = NaiveDate::from_ymd_opt(2024, 3, 5).unwrap();
        let stats = build_stats(&state(), 0, today, &BTreeSet::new());
        let order: Vec<(i32, u32)> = stats
            .monthly_history
            .iter()
            .map(|rec| (rec.year, rec.month_number))
            .collect();
        assert_eq!(order, [(2024, 2), (2024, 1), (2023, 12), (2023, 11)]);
    }

    #[test]
    fn longest_reflects_fresh_current() {
        let today = NaiveDate::from_ymd_opt(2024, 3, 5).unwrap();
        assert_eq!(build_stats(&state(), 2, today, &BTreeSet::new()).longest_streak, 4);
        assert_eq!(build_stats(&state(), 5, today, &BTreeSet::new()).longest_streak, 5);
    }

    #[test]
    fn recent_days_span_a_week() {
        let today = NaiveDate::from_ymd_opt(2024, 3, 2).unwrap();
        let completed: BTreeSet<String> = ["2024-02-27", "2024-03-02"]
            .into_iter()
            .map(String::from)
            .collect();
        let stats = build_stats(&state(), 1, today, &completed);

        assert_eq!(stats.recent_days.len(), 7);
        assert_eq!(stats.recent_days[0].date, "2024-02-25");
        assert_eq!(stats.recent_days[6].date, "2024-03-02");
        let done: Vec<&str> = stats
            .recent_days
            .iter()
            .filter(|day| day.completed)
            .map(|day| day.date.as_str())
            .collect();
        assert_eq!(done, ["2024-02-27", "2024-03-02"]);
    }

    #[test]
    fn window_months() {
        let today = NaiveDate::from_ymd_opt(2024, 3, 2).unwrap();
        let months: Vec<String> = recent_months(today).into_iter().collect();
        assert_eq!(months, ["2024-02", "2024-03"]);
        assert_eq!(recent_months(NaiveDate::from_ymd_opt(2024, 3, 20).unwrap()).len(), 1);
    }
}
