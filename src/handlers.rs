use crate::date_key::day_key;
use crate::errors::AppError;
use crate::models::{
    AtQuery, CompletionOutcome, CompletionResponse, DayStatus, RolloverResponse, StreakStats,
};
use crate::state::AppState;
use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use chrono::{DateTime, Utc};

pub async fn get_stats(
    State(state): State<AppState>,
    Path(user_id): Path<String>,
    Query(query): Query<AtQuery>,
) -> Result<Json<StreakStats>, AppError> {
    let user_id = validate_user(user_id)?;
    let stats = state.engine.get_stats(&user_id, resolve_now(&query)).await?;
    Ok(Json(stats))
}

pub async fn get_today(
    State(state): State<AppState>,
    Path(user_id): Path<String>,
    Query(query): Query<AtQuery>,
) -> Result<Json<DayStatus>, AppError> {
    let user_id = validate_user(user_id)?;
    let status = state.engine.day_status(&user_id, resolve_now(&query)).await?;
    Ok(Json(status))
}

pub async fn check_in(
    State(state): State<AppState>,
    Path(user_id): Path<String>,
    Query(query): Query<AtQuery>,
) -> Result<Json<DayStatus>, AppError> {
    let user_id = validate_user(user_id)?;
    let status = state.engine.check_in(&user_id, resolve_now(&query)).await?;
    Ok(Json(status))
}

pub async fn check_out(
    State(state): State<AppState>,
    Path(user_id): Path<String>,
    Query(query): Query<AtQuery>,
) -> Result<Json<CompletionResponse>, AppError> {
    let user_id = validate_user(user_id)?;
    let now = resolve_now(&query);
    let outcome = state.engine.check_out(&user_id, now).await?;
    Ok(Json(to_response(&state, &user_id, now, outcome).await?))
}

pub async fn complete(
    State(state): State<AppState>,
    Path(user_id): Path<String>,
    Query(query): Query<AtQuery>,
) -> Result<Json<CompletionResponse>, AppError> {
    let user_id = validate_user(user_id)?;
    let now = resolve_now(&query);
    let outcome = state.engine.on_day_completed(&user_id, now).await?;
    Ok(Json(to_response(&state, &user_id, now, outcome).await?))
}

pub async fn rollover(
    State(state): State<AppState>,
    Path(user_id): Path<String>,
    Query(query): Query<AtQuery>,
) -> Result<Json<RolloverResponse>, AppError> {
    let user_id = validate_user(user_id)?;
    let rolled_over = state
        .engine
        .check_and_handle_rollover(&user_id, resolve_now(&query))
        .await?;
    Ok(Json(RolloverResponse { rolled_over }))
}

pub async fn reset(
    State(state): State<AppState>,
    Path(user_id): Path<String>,
) -> Result<StatusCode, AppError> {
    let user_id = validate_user(user_id)?;
    state.engine.reset(&user_id).await?;
    Ok(StatusCode::NO_CONTENT)
}

fn validate_user(user_id: String) -> Result<String, AppError> {
    let user_id = user_id.trim();
    if user_id.is_empty() {
        return Err(AppError::bad_request("user id must not be empty"));
    }
    Ok(user_id.to_string())
}

fn resolve_now(query: &AtQuery) -> DateTime<Utc> {
    query.at.unwrap_or_else(Utc::now)
}

/// A day that was not completed still reports the user's current figures.
async fn to_response(
    state: &AppState,
    user_id: &str,
    now: DateTime<Utc>,
    outcome: Option<CompletionOutcome>,
) -> Result<CompletionResponse, AppError> {
    let response = match outcome {
        Some(outcome) => CompletionResponse {
            completed: true,
            date: outcome.day_key,
            newly_completed: outcome.newly_completed,
            current_streak: outcome.state.current_streak,
            longest_streak: outcome.state.longest_streak,
            total_complete_days: outcome.state.total_complete_days,
        },
        None => {
            let stats = state.engine.get_stats(user_id, now).await?;
            CompletionResponse {
                completed: false,
                date: day_key(now, state.engine.policy()),
                newly_completed: false,
                current_streak: stats.current_streak,
                longest_streak: stats.longest_streak,
                total_complete_days: stats.total_complete_days,
            }
        }
    };
    Ok(response)
}
