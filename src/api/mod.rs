pub mod auth;
pub mod coaching;

use axum::extract::State;
use axum::response::IntoResponse;
use axum::routing::get;
use axum::{Json, Router};
use serde_json::json;

use crate::error::ApiError;
use crate::store::{AppState, pool};

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(root))
        .route("/health", get(health))
        .merge(auth::router())
        .merge(coaching::router())
}

async fn root(State(state): State<AppState>) -> impl IntoResponse {
    Json(json!({ "message": format!("{} API is running!", state.config.app_name) }))
}

async fn health(State(state): State<AppState>) -> Result<impl IntoResponse, ApiError> {
    if !pool::ping(&state.pool).await {
        tracing::warn!("health check failed: database unreachable");
        return Err(ApiError::ServiceUnavailable("database unreachable".into()));
    }
    Ok(Json(json!({ "status": "healthy" })))
}
