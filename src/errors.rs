use axum::http::StatusCode;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum StreakError {
    /// Transient store failure. Engine entry points turn this into a safe default.
    #[error("check-in store unavailable: {0}")]
    StoreUnavailable(String),

    #[error("invalid streak state: {0}")]
    InvalidState(String),

    #[error("stale streak state for user '{user_id}': stored version {stored}, attempted {attempted}")]
    Conflict {
        user_id: String,
        stored: u64,
        attempted: u64,
    },
}

impl StreakError {
    pub fn unavailable(err: impl std::fmt::Display) -> Self {
        Self::StoreUnavailable(err.to_string())
    }
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("invalid PORT value '{0}'")]
    InvalidPort(String),

    #[error("invalid STREAK_TIMEZONE: {0}")]
    InvalidTimezone(String),
}

#[derive(Debug)]
pub struct AppError {
    pub status: StatusCode,
    pub message: String,
}

impl AppError {
    pub fn bad_request(message: impl Into<String>) -> Self {
        Self {
            status: StatusCode::BAD_REQUEST,
            message: message.into(),
        }
    }
}

impl From<StreakError> for AppError {
    fn from(err: StreakError) -> Self {
        let status = match err {
            StreakError::StoreUnavailable(_) => StatusCode::SERVICE_UNAVAILABLE,
            StreakError::InvalidState(_) => StatusCode::UNPROCESSABLE_ENTITY,
            StreakError::Conflict { .. } => StatusCode::CONFLICT,
        };
        Self {
            status,
            message: err.to_string(),
        }
    }
}

impl axum::response::IntoResponse for AppError {
    fn into_response(self) -> axum::response::Response {
        (self.status, self.message).into_response()
    }
}
