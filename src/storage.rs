use crate::errors::StreakError;
use crate::models::StreakState;
use crate::store::CheckInStore;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::{BTreeMap, BTreeSet};
use std::path::{Path, PathBuf};
use tokio::fs;
use tokio::sync::Mutex;
use tracing::{debug, error};

#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct UserRecord {
    #[serde(default)]
    pub check_ins: BTreeSet<String>,
    #[serde(default)]
    pub completed_days: BTreeSet<String>,
    #[serde(default)]
    pub streak: Option<StreakState>,
}

/// A user's entry in the document. Entries that do not parse are kept
/// verbatim so that writes for other users never drop them.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(untagged)]
pub enum UserSlot {
    Valid(UserRecord),
    Unreadable(Value),
}

#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
pub struct StoreData {
    pub users: BTreeMap<String, UserSlot>,
}

impl StoreData {
    fn user(&self, user_id: &str) -> Result<Option<&UserRecord>, StreakError> {
        match self.users.get(user_id) {
            None => Ok(None),
            Some(UserSlot::Valid(record)) => Ok(Some(record)),
            Some(UserSlot::Unreadable(raw)) => Err(unreadable(user_id, raw)),
        }
    }

    fn user_mut(&mut self, user_id: &str) -> Result<&mut UserRecord, StreakError> {
        let slot = self
            .users
            .entry(user_id.to_string())
            .or_insert_with(|| UserSlot::Valid(UserRecord::default()));
        match slot {
            UserSlot::Valid(record) => Ok(record),
            UserSlot::Unreadable(raw) => Err(unreadable(user_id, raw)),
        }
    }

    pub fn unreadable_users(&self) -> impl Iterator<Item = &str> {
        self.users.iter().filter_map(|(user_id, slot)| match slot {
            UserSlot::Unreadable(_) => Some(user_id.as_str()),
            UserSlot::Valid(_) => None,
        })
    }
}

fn unreadable(user_id: &str, raw: &Value) -> StreakError {
    let reason = match serde_json::from_value::<UserRecord>(raw.clone()) {
        Err(err) => err.to_string(),
        Ok(_) => "unrecognized layout".to_string(),
    };
    StreakError::InvalidState(format!(
        "stored record for user '{user_id}' is unreadable: {reason}"
    ))
}

fn check_version(user_id: &str, user: &UserRecord, state: &StreakState) -> Result<(), StreakError> {
    match &user.streak {
        Some(existing) if existing.version >= state.version => Err(StreakError::Conflict {
            user_id: user_id.to_string(),
            stored: existing.version,
            attempted: state.version,
        }),
        _ => Ok(()),
    }
}

/// [`CheckInStore`] keeping every user in one JSON document.
///
/// Writes go to a copy of the data which replaces the live copy only after it
/// has been persisted, so a failed write leaves the previous state visible.
pub struct JsonFileStore {
    data_path: Option<PathBuf>,
    data: Mutex<StoreData>,
}

impl JsonFileStore {
    /// Fails with [`StreakError::InvalidState`] when the file exists but is
    /// not a readable document; the file is left as it is.
    pub async fn open(data_path: PathBuf) -> Result<Self, StreakError> {
        if let Some(parent) = data_path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)
                    .await
                    .map_err(StreakError::unavailable)?;
            }
        }
        let data = load_data(&data_path).await?;
        Ok(Self {
            data_path: Some(data_path),
            data: Mutex::new(data),
        })
    }

    pub fn in_memory() -> Self {
        Self {
            data_path: None,
            data: Mutex::new(StoreData::default()),
        }
    }

    async fn read<T>(
        &self,
        f: impl FnOnce(&StoreData) -> Result<T, StreakError>,
    ) -> Result<T, StreakError> {
        let data = self.data.lock().await;
        f(&data)
    }

    async fn update<T>(
        &self,
        f: impl FnOnce(&mut StoreData) -> Result<T, StreakError>,
    ) -> Result<T, StreakError> {
        let mut data = self.data.lock().await;
        let mut next = data.clone();
        let output = f(&mut next)?;
        if next == *data {
            return Ok(output);
        }
        if let Some(path) = &self.data_path {
            persist_data(path, &next).await?;
        }
        *data = next;
        Ok(output)
    }
}

#[async_trait]
impl CheckInStore for JsonFileStore {
    async fn has_completed_day(&self, user_id: &str, day_key: &str) -> Result<bool, StreakError> {
        self.read(|data| {
            Ok(data
                .user(user_id)?
                .is_some_and(|user| user.completed_days.contains(day_key)))
        })
        .await
    }

    async fn list_completed_day_keys(
        &self,
        user_id: &str,
        month_key: &str,
    ) -> Result<BTreeSet<String>, StreakError> {
        self.read(|data| {
            Ok(data
                .user(user_id)?
                .map(|user| {
                    user.completed_days
                        .iter()
                        .filter(|day| day.starts_with(month_key))
                        .cloned()
                        .collect()
                })
                .unwrap_or_default())
        })
        .await
    }

    async fn record_completion(&self, user_id: &str, day_key: &str) -> Result<bool, StreakError> {
        self.update(|data| {
            let user = data.user_mut(user_id)?;
            Ok(user.completed_days.insert(day_key.to_string()))
        })
        .await
    }

    async fn commit_completion(
        &self,
        user_id: &str,
        day_key: &str,
        state: &StreakState,
    ) -> Result<(), StreakError> {
        self.update(|data| {
            let user = data.user_mut(user_id)?;
            check_version(user_id, user, state)?;
            user.completed_days.insert(day_key.to_string());
            user.streak = Some(state.clone());
            Ok(())
        })
        .await
    }

    async fn record_check_in(&self, user_id: &str, day_key: &str) -> Result<(), StreakError> {
        self.update(|data| {
            let user = data.user_mut(user_id)?;
            user.check_ins.insert(day_key.to_string());
            Ok(())
        })
        .await
    }

    async fn has_checked_in(&self, user_id: &str, day_key: &str) -> Result<bool, StreakError> {
        self.read(|data| {
            Ok(data
                .user(user_id)?
                .is_some_and(|user| user.check_ins.contains(day_key)))
        })
        .await
    }

    async fn get_streak_state(&self, user_id: &str) -> Result<Option<StreakState>, StreakError> {
        self.read(|data| Ok(data.user(user_id)?.and_then(|user| user.streak.clone())))
            .await
    }

    async fn put_streak_state(
        &self,
        user_id: &str,
        state: &StreakState,
    ) -> Result<(), StreakError> {
        self.update(|data| {
            let user = data.user_mut(user_id)?;
            check_version(user_id, user, state)?;
            user.streak = Some(state.clone());
            Ok(())
        })
        .await
    }

    async fn reset_user(&self, user_id: &str) -> Result<(), StreakError> {
        self.update(|data| {
            data.users.remove(user_id);
            Ok(())
        })
        .await
    }
}

pub async fn load_data(path: &Path) -> Result<StoreData, StreakError> {
    match fs::read(path).await {
        Ok(bytes) => {
            let data: StoreData = serde_json::from_slice(&bytes).map_err(|err| {
                error!("failed to parse data file: {err}");
                StreakError::InvalidState(format!(
                    "data file {} is unreadable: {err}",
                    path.display()
                ))
            })?;
            for user_id in data.unreadable_users() {
                error!(user_id, "stored user record is unreadable, leaving it untouched");
            }
            Ok(data)
        }
        Err(err) if err.kind() == std::io::ErrorKind::NotFound => Ok(StoreData::default()),
        Err(err) => {
            error!("failed to read data file: {err}");
            Err(StreakError::unavailable(err))
        }
    }
}

pub async fn persist_data(path: &Path, data: &StoreData) -> Result<(), StreakError> {
    let payload = serde_json::to_vec_pretty(data).map_err(StreakError::unavailable)?;
    let tmp_path = path.with_extension("json.tmp");
    fs::write(&tmp_path, payload)
        .await
        .map_err(StreakError::unavailable)?;
    fs::rename(&tmp_path, path)
        .await
        .map_err(StreakError::unavailable)?;
    debug!(path = %path.display(), users = data.users.len(), "persisted check-in data");
    Ok(())
}
