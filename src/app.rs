use crate::handlers;
use crate::state::AppState;
use axum::{routing::{delete, get, post}, Router};

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/api/users/:user_id/stats", get(handlers::get_stats))
        .route("/api/users/:user_id/today", get(handlers::get_today))
        .route("/api/users/:user_id/check-in", post(handlers::check_in))
        .route("/api/users/:user_id/check-out", post(handlers::check_out))
        .route("/api/users/:user_id/complete", post(handlers::complete))
        .route("/api/users/:user_id/rollover", post(handlers::rollover))
        .route("/api/users/:user_id/streak", delete(handlers::reset))
        .with_state(state)
}
