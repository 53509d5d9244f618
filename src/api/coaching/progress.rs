use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::routing::{get, post};
use axum::{Json, Router};
use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::auth::middleware::{ClientIp, CurrentUser};
use crate::auth::rate_limit::per_minute;
use crate::error::ApiError;
use crate::store::AppState;
use crate::validation::FieldChecks;

const PROGRESS_COLUMNS: &str = "uid, client_uid, session_uid, date_recorded, weight, pain_level, \
    mobility_score, strength_score, notes, created_at";

/// Scores are recorded on a 0-10 scale.
const MAX_SCORE: i32 = 10;

#[derive(Debug, Serialize, sqlx::FromRow)]
pub struct ProgressEntry {
    pub uid: Uuid,
    pub client_uid: Uuid,
    pub session_uid: Option<Uuid>,
    pub date_recorded: NaiveDate,
    pub weight: Option<f64>,
    pub pain_level: Option<i32>,
    pub mobility_score: Option<i32>,
    pub strength_score: Option<i32>,
    pub notes: Option<String>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Deserialize)]
pub struct CreateProgressRequest {
    pub client_uid: Uuid,
    pub session_uid: Option<Uuid>,
    pub date_recorded: NaiveDate,
    pub weight: Option<f64>,
    pub pain_level: Option<i32>,
    pub mobility_score: Option<i32>,
    pub strength_score: Option<i32>,
    pub notes: Option<String>,
}

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/api/v1/coaching/progress", post(create_progress))
        .route(
            "/api/v1/coaching/progress/client/{client_uid}",
            get(list_client_progress),
        )
}

fn validate(body: &CreateProgressRequest) -> Result<(), ApiError> {
    FieldChecks::new()
        .positive("weight", body.weight)
        .range("pain_level", body.pain_level, 0, MAX_SCORE)
        .range("mobility_score", body.mobility_score, 0, MAX_SCORE)
        .range("strength_score", body.strength_score, 0, MAX_SCORE)
        .finish()
}

#[tracing::instrument(skip(state, user, body), fields(client_uid = %body.client_uid), err)]
async fn create_progress(
    State(state): State<AppState>,
    ClientIp(ip): ClientIp,
    user: CurrentUser,
    Json(body): Json<CreateProgressRequest>,
) -> Result<impl IntoResponse, ApiError> {
    per_minute(&state.valkey, "create_progress", &ip, 20).await?;
    user.require_self_or_admin(body.client_uid, "create progress entries for yourself")?;
    validate(&body)?;

    let entry: ProgressEntry = sqlx::query_as(&format!(
        "INSERT INTO client_progress (uid, client_uid, session_uid, date_recorded, weight,
                                      pain_level, mobility_score, strength_score, notes)
         VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
         RETURNING {PROGRESS_COLUMNS}"
    ))
    .bind(Uuid::new_v4())
    .bind(body.client_uid)
    .bind(body.session_uid)
    .bind(body.date_recorded)
    .bind(body.weight)
    .bind(body.pain_level)
    .bind(body.mobility_score)
    .bind(body.strength_score)
    .bind(&body.notes)
    .fetch_one(&state.pool)
    .await?;

    Ok((StatusCode::CREATED, Json(entry)))
}

#[tracing::instrument(skip(state, user), err)]
async fn list_client_progress(
    State(state): State<AppState>,
    ClientIp(ip): ClientIp,
    user: CurrentUser,
    Path(client_uid): Path<Uuid>,
) -> Result<impl IntoResponse, ApiError> {
    per_minute(&state.valkey, "list_progress", &ip, 30).await?;
    user.require_self_or_admin(client_uid, "view your own progress")?;

    let entries: Vec<ProgressEntry> = sqlx::query_as(&format!(
        "SELECT {PROGRESS_COLUMNS} FROM client_progress
         WHERE client_uid = $1
         ORDER BY date_recorded DESC, created_at DESC"
    ))
    .bind(client_uid)
    .fetch_all(&state.pool)
    .await?;

    Ok(Json(entries))
}
