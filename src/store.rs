use crate::errors::StreakError;
use crate::models::StreakState;
use async_trait::async_trait;
use std::collections::BTreeSet;

/// Per-user check-in log and streak document storage.
///
/// Day keys are `YYYY-MM-DD`, month keys `YYYY-MM`. Transient failures are
/// reported as [`StreakError::StoreUnavailable`]; retrying is up to the
/// implementation, never the caller. A user whose stored record cannot be
/// read yields [`StreakError::InvalidState`] until it is reset.
#[async_trait]
pub trait CheckInStore: Send + Sync {
    async fn has_completed_day(&self, user_id: &str, day_key: &str) -> Result<bool, StreakError>;

    async fn list_completed_day_keys(
        &self,
        user_id: &str,
        month_key: &str,
    ) -> Result<BTreeSet<String>, StreakError>;

    /// Marks the day complete. Idempotent; returns `true` only when the day
    /// was not already recorded.
    async fn record_completion(&self, user_id: &str, day_key: &str) -> Result<bool, StreakError>;

    /// Records the day and writes `state` as one atomic change: either both
    /// become visible or neither does. The version rule of
    /// [`CheckInStore::put_streak_state`] applies.
    async fn commit_completion(
        &self,
        user_id: &str,
        day_key: &str,
        state: &StreakState,
    ) -> Result<(), StreakError>;

    async fn record_check_in(&self, user_id: &str, day_key: &str) -> Result<(), StreakError>;

    async fn has_checked_in(&self, user_id: &str, day_key: &str) -> Result<bool, StreakError>;

    async fn get_streak_state(&self, user_id: &str) -> Result<Option<StreakState>, StreakError>;

    /// Writes the state if its version is newer than the stored one,
    /// otherwise fails with [`StreakError::Conflict`].
    async fn put_streak_state(&self, user_id: &str, state: &StreakState)
    -> Result<(), StreakError>;

    /// Drops the user's streak state, check-ins and completions.
    async fn reset_user(&self, user_id: &str) -> Result<(), StreakError>;
}
