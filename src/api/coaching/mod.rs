//! Coaching records: sessions, progress, exercises, workout plans, and
//! assessments. All routes live under `/api/v1/coaching` and require an
//! access token.

pub mod assessments;
pub mod exercises;
pub mod progress;
pub mod sessions;
pub mod workout_plans;

use axum::Router;

use crate::store::AppState;

pub fn router() -> Router<AppState> {
    Router::new()
        .merge(sessions::router())
        .merge(progress::router())
        .merge(exercises::router())
        .merge(workout_plans::router())
        .merge(assessments::router())
}
