//! Entry points the UI layer calls into.
//!
//! Every operation takes `now` explicitly and runs the lazy month rollover
//! before it touches current values. Read-modify-write cycles on a user's
//! [`StreakState`] are serialized through a per-user lock. A
//! [`StreakError::StoreUnavailable`] never leaves this module: each entry point
//! logs it and returns a zero/no-op result instead. `reset` is the exception.

use crate::date_key::{TimezonePolicy, date_key, local_date, month_key_of};
use crate::errors::StreakError;
use crate::models::{CompletionOutcome, DayStatus, StreakState, StreakStats};
use crate::rollover::apply_rollover;
use crate::stats::{build_stats, recent_months};
use crate::store::CheckInStore;
use crate::streak::{count_back, current_streak};
use chrono::{DateTime, Utc};
use std::collections::{BTreeSet, HashMap};
use std::future::Future;
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

pub struct StreakEngine<S: ?Sized> {
    policy: TimezonePolicy,
    user_locks: Mutex<HashMap<String, Arc<Mutex<()>>>>,
    store: Arc<S>,
}

impl<S> StreakEngine<S>
where
    S: CheckInStore + ?Sized,
{
    pub fn new(store: Arc<S>, policy: TimezonePolicy) -> Self {
        Self {
            policy,
            user_locks: Mutex::new(HashMap::new()),
            store,
        }
    }

    pub fn policy(&self) -> TimezonePolicy {
        self.policy
    }

    pub async fn get_stats(
        &self,
        user_id: &str,
        now: DateTime<Utc>,
    ) -> Result<StreakStats, StreakError> {
        let work = async {
            let (state, _) = self.rollover_locked(user_id, now).await?;
            let today = local_date(now, self.policy);
            let current = current_streak(&*self.store, user_id, today).await?;

            let mut completed = BTreeSet::new();
            for month in recent_months(today) {
                completed.extend(self.store.list_completed_day_keys(user_id, &month).await?);
            }
            Ok(build_stats(&state, current, today, &completed))
        };
        let result: Result<StreakStats, StreakError> = self.with_user_lock(user_id, work).await;

        fail_closed(user_id, "get_stats", result, StreakStats::default())
    }

    /// Records today as complete and folds it into the user's streak state.
    /// Returns `None` when the store could not be reached.
    pub async fn on_day_completed(
        &self,
        user_id: &str,
        now: DateTime<Utc>,
    ) -> Result<Option<CompletionOutcome>, StreakError> {
        let result = self
            .with_user_lock(user_id, self.complete_locked(user_id, now))
            .await
            .map(Some);
        fail_closed(user_id, "on_day_completed", result, None)
    }

    pub async fn check_and_handle_rollover(
        &self,
        user_id: &str,
        now: DateTime<Utc>,
    ) -> Result<bool, StreakError> {
        let result = self
            .with_user_lock(user_id, self.rollover_locked(user_id, now))
            .await
            .map(|(_, rolled)| rolled);
        fail_closed(user_id, "check_and_handle_rollover", result, false)
    }

    pub async fn check_in(
        &self,
        user_id: &str,
        now: DateTime<Utc>,
    ) -> Result<DayStatus, StreakError> {
        let day = day_key_at(now, self.policy);
        let result: Result<DayStatus, StreakError> = async {
            self.store.record_check_in(user_id, &day).await?;
            info!(user_id, day = %day, "checked in");
            self.read_day_status(user_id, &day).await
        }
        .await;

        fail_closed(user_id, "check_in", result, unknown_day(day))
    }

    /// Completes the day when a check-in was recorded on the same calendar
    /// day; otherwise nothing changes and `None` is returned.
    pub async fn check_out(
        &self,
        user_id: &str,
        now: DateTime<Utc>,
    ) -> Result<Option<CompletionOutcome>, StreakError> {
        let day = day_key_at(now, self.policy);
        let work = async {
            if !self.store.has_checked_in(user_id, &day).await? {
                info!(user_id, day = %day, "check-out without check-in, day not completed");
                return Ok(None);
            }
            self.complete_locked(user_id, now).await.map(Some)
        };
        let result: Result<Option<CompletionOutcome>, StreakError> =
            self.with_user_lock(user_id, work).await;

        fail_closed(user_id, "check_out", result, None)
    }

    pub async fn day_status(
        &self,
        user_id: &str,
        now: DateTime<Utc>,
    ) -> Result<DayStatus, StreakError> {
        let day = day_key_at(now, self.policy);
        let result = self.read_day_status(user_id, &day).await;
        fail_closed(user_id, "day_status", result, unknown_day(day))
    }

    /// Debug path: drops the user's streak state and check-in log.
    pub async fn reset(&self, user_id: &str) -> Result<(), StreakError> {
        self.with_user_lock(user_id, self.store.reset_user(user_id)).await?;
        warn!(user_id, "streak state reset");
        Ok(())
    }

    /// Runs `work` while holding the user's lock. The lock entry is dropped
    /// again once no other task holds or waits on it.
    async fn with_user_lock<T>(&self, user_id: &str, work: impl Future<Output = T>) -> T {
        let lock = {
            let mut locks = self.user_locks.lock().await;
            Arc::clone(locks.entry(user_id.to_string()).or_default())
        };

        let output = {
            let _guard = lock.lock().await;
            work.await
        };

        let mut locks = self.user_locks.lock().await;
        if Arc::strong_count(&lock) == 2 {
            locks.remove(user_id);
        }
        output
    }

    async fn read_day_status(&self, user_id: &str, day: &str) -> Result<DayStatus, StreakError> {
        Ok(DayStatus {
            date: day.to_string(),
            checked_in: self.store.has_checked_in(user_id, day).await?,
            completed: self.store.has_completed_day(user_id, day).await?,
        })
    }

    async fn complete_locked(
        &self,
        user_id: &str,
        now: DateTime<Utc>,
    ) -> Result<CompletionOutcome, StreakError> {
        let today = local_date(now, self.policy);
        let day_key = date_key(today);

        let (state, _) = self.rollover_locked(user_id, now).await?;
        let mut completed = self
            .store
            .list_completed_day_keys(user_id, &month_key_of(today))
            .await?;
        let newly_completed = completed.insert(day_key.clone());
        let current = count_back(today, &completed);

        let mut next = apply_completion(state.clone(), current, newly_completed);
        let state = if !newly_completed && next == state {
            debug!(user_id, day = %day_key, "completion left streak state unchanged");
            state
        } else {
            next.version += 1;
            self.store.commit_completion(user_id, &day_key, &next).await?;
            next
        };

        info!(
            user_id,
            day = %day_key,
            newly_completed,
            current = state.current_streak,
            longest = state.longest_streak,
            total = state.total_complete_days,
            "day completed"
        );

        Ok(CompletionOutcome {
            day_key,
            newly_completed,
            state,
        })
    }

    async fn rollover_locked(
        &self,
        user_id: &str,
        now: DateTime<Utc>,
    ) -> Result<(StreakState, bool), StreakError> {
        let state = self.load_state(user_id, now).await?;
        let (state, rolled) = apply_rollover(state, now, self.policy);
        if !rolled {
            return Ok((state, false));
        }
        let state = self.save_state(user_id, state).await?;
        Ok((state, true))
    }

    async fn load_state(
        &self,
        user_id: &str,
        now: DateTime<Utc>,
    ) -> Result<StreakState, StreakError> {
        match self.store.get_streak_state(user_id).await? {
            Some(state) => {
                state.validate()?;
                Ok(state)
            }
            None => {
                info!(user_id, "initializing streak state");
                self.save_state(user_id, StreakState::new(now)).await
            }
        }
    }

    async fn save_state(
        &self,
        user_id: &str,
        mut state: StreakState,
    ) -> Result<StreakState, StreakError> {
        state.version += 1;
        self.store.put_streak_state(user_id, &state).await?;
        Ok(state)
    }
}

/// Folds a freshly computed streak into the state. The lifetime total only
/// grows for a day the store had not seen before.
pub fn apply_completion(mut state: StreakState, current: u32, newly_completed: bool) -> StreakState {
    state.current_streak = current;
    state.longest_streak = state.longest_streak.max(current);
    if newly_completed {
        state.total_complete_days = state.total_complete_days.saturating_add(1);
    }
    state
}

fn day_key_at(now: DateTime<Utc>, policy: TimezonePolicy) -> String {
    date_key(local_date(now, policy))
}

fn unknown_day(date: String) -> DayStatus {
    DayStatus {
        date,
        checked_in: false,
        completed: false,
    }
}

fn fail_closed<T>(
    user_id: &str,
    operation: &str,
    result: Result<T, StreakError>,
    fallback: T,
) -> Result<T, StreakError> {
    match result {
        Err(StreakError::StoreUnavailable(reason)) => {
            warn!(user_id, operation, %reason, "check-in store unavailable, failing closed");
            Ok(fallback)
        }
        other => other,
    }
}
