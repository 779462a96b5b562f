use crate::date_key::{TimezonePolicy, local_date, month_key_of, month_label};
use crate::models::{MonthlyRecord, StreakState};
use chrono::{DateTime, Datelike, Utc};
use std::collections::btree_map::Entry;
use tracing::{info, warn};

/// Whether `now` falls in a month after the one `state` tracks. A `now`
/// earlier than the tracked month (a backdated request or a clock step
/// back) never rolls the state over.
pub fn is_stale(state: &StreakState, now: DateTime<Utc>, policy: TimezonePolicy) -> bool {
    let tracked = local_date(state.current_month_start, policy);
    let current = local_date(now, policy);
    (current.year(), current.month()) > (tracked.year(), tracked.month())
}

/// Archives the tracked month and opens a new one at `now`.
///
/// Returns the state unchanged and `false` unless `now` is in a later month. An existing history entry for the archived month is left as is.
pub fn apply_rollover(
    mut state: StreakState,
    now: DateTime<Utc>,
    policy: TimezonePolicy,
) -> (StreakState, bool) {
    if !is_stale(&state, now, policy) {
        return (state, false);
    }

    let start = local_date(state.current_month_start, policy);
    let key = month_key_of(start);
    match state.monthly_history.entry(key) {
        Entry::Vacant(slot) => {
            info!(
                month = %slot.key(),
                streak = state.current_streak,
                complete_days = state.total_complete_days,
                "archived monthly streak"
            );
            slot.insert(MonthlyRecord {
                streak: state.current_streak,
                month: month_label(start),
                complete_days: state.total_complete_days,
                year: start.year(),
                month_number: start.month(),
            });
        }
        Entry::Occupied(slot) => {
            warn!(month = %slot.key(), "month already archived, keeping existing record");
        }
    }

    state.current_streak = 0;
    state.current_month_start = now;
    (state, true)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn at(y: i32, m: u32, d: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(y, m, d, 12, 0, 0).single().unwrap()
    }

    fn february_state() -> StreakState {
        let mut state = StreakState::new(at(2024, 2, 3));
        state.current_streak = 12;
        state.longest_streak = 12;
        state.total_complete_days = 20;
        state
    }

    #[test]
    fn same_month_is_a_no_op() {
        let state = february_state();
        let (next, rolled) = apply_rollover(state.clone(), at(2024, 2, 29), TimezonePolicy::Utc);
        assert!(!rolled);
        assert_eq!(next, state);
    }

    #[test]
    fn archives_previous_month_and_resets() {
        let now = at(2024, 3, 2);
        let (next, rolled) = apply_rollover(february_state(), now, TimezonePolicy::Utc);
        assert!(rolled);
        assert_eq!(next.current_streak, 0);
        assert_eq!(next.current_month_start, now);
        assert_eq!(next.longest_streak, 12);
        assert_eq!(
            next.monthly_history["2024-02"],
            MonthlyRecord {
                streak: 12,
                month: "February 2024".to_string(),
                complete_days: 20,
                year: 2024,
                month_number: 2,
            }
        );
    }

    #[test]
    fn second_call_in_month_is_a_no_op() {
        let now = at(2024, 3, 2);
        let (once, _) = apply_rollover(february_state(), now, TimezonePolicy::Utc);
        let (twice, rolled) = apply_rollover(once.clone(), at(2024, 3, 20), TimezonePolicy::Utc);
        assert!(!rolled);
        assert_eq!(once, twice);
    }

    #[test]
    fn earlier_month_is_a_no_op() {
        let state = StreakState::new(at(2024, 3, 4));
        let (next, rolled) = apply_rollover(state.clone(), at(2024, 2, 28), TimezonePolicy::Utc);
        assert!(!rolled);
        assert_eq!(next, state);
        assert!(!is_stale(&state, at(2023, 12, 31), TimezonePolicy::Utc));
        assert!(is_stale(&state, at(2025, 1, 2), TimezonePolicy::Utc));
    }

    #[test]
    fn never_overwrites_archived_month() {
        let mut state = february_state();
        state.monthly_history.insert(
            "2024-02".to_string(),
            MonthlyRecord {
                streak: 4,
                month: "February 2024".to_string(),
                complete_days: 9,
                year: 2024,
                month_number: 2,
            },
        );
        let (next, rolled) = apply_rollover(state, at(2024, 3, 1), TimezonePolicy::Utc);
        assert!(rolled);
        assert_eq!(next.monthly_history["2024-02"].streak, 4);
    }

    #[test]
    fn month_is_judged_in_policy_timezone() {
        // 23:30 UTC on Feb 29 is already March 1 at +01:00.
        let state = StreakState::new(at(2024, 2, 10));
        let late = Utc.with_ymd_and_hms(2024, 2, 29, 23, 30, 0).single().unwrap();
        assert!(!is_stale(&state, late, TimezonePolicy::Utc));
        assert!(is_stale(&state, late, "+01:00".parse().unwrap()));
    }
}
