use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::routing::{get, post, put};
use axum::{Json, Router};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::auth::middleware::{ClientIp, CurrentUser};
use crate::auth::rate_limit::per_minute;
use crate::error::ApiError;
use crate::store::AppState;
use crate::types::{SessionStatus, SessionType};
use crate::validation::FieldChecks;

const SESSION_COLUMNS: &str = "uid, client_uid, title, description, session_type, session_date, \
    duration_minutes, status, notes, price, location, meeting_link, created_at, updated_at";

// ---------------------------------------------------------------------------
// Types
// ---------------------------------------------------------------------------

#[derive(Debug, Serialize, sqlx::FromRow)]
pub struct CoachingSession {
    pub uid: Uuid,
    pub client_uid: Uuid,
    pub title: String,
    pub description: Option<String>,
    pub session_type: SessionType,
    pub session_date: DateTime<Utc>,
    pub duration_minutes: i32,
    pub status: SessionStatus,
    pub notes: Option<String>,
    pub price: Option<f64>,
    pub location: Option<String>,
    pub meeting_link: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

fn default_duration() -> i32 {
    60
}

#[derive(Debug, Deserialize)]
pub struct CreateSessionRequest {
    pub client_uid: Uuid,
    pub title: String,
    pub description: Option<String>,
    pub session_type: SessionType,
    pub session_date: DateTime<Utc>,
    #[serde(default = "default_duration")]
    pub duration_minutes: i32,
    pub price: Option<f64>,
    pub location: Option<String>,
    pub meeting_link: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
pub struct UpdateSessionRequest {
    pub title: Option<String>,
    pub description: Option<String>,
    pub session_date: Option<DateTime<Utc>>,
    pub duration_minutes: Option<i32>,
    pub status: Option<SessionStatus>,
    pub notes: Option<String>,
    pub location: Option<String>,
    pub meeting_link: Option<String>,
}

// ---------------------------------------------------------------------------
// Router
// ---------------------------------------------------------------------------

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/api/v1/coaching/sessions", post(create_session))
        .route(
            "/api/v1/coaching/sessions/client/{client_uid}",
            get(list_client_sessions),
        )
        .route("/api/v1/coaching/sessions/{session_uid}", put(update_session))
}

fn validate_create(body: &CreateSessionRequest) -> Result<(), ApiError> {
    FieldChecks::new()
        .length("title", &body.title, 1, 255)
        .at_least("duration_minutes", Some(body.duration_minutes), 1)
        .non_negative("price", body.price)
        .finish()
}

fn validate_update(body: &UpdateSessionRequest) -> Result<(), ApiError> {
    FieldChecks::new()
        .not_blank("title", body.title.as_deref())
        .max_length("title", body.title.as_deref(), 255)
        .at_least("duration_minutes", body.duration_minutes, 1)
        .finish()
}

// ---------------------------------------------------------------------------
// Handlers
// ---------------------------------------------------------------------------

#[tracing::instrument(skip(state, user, body), fields(client_uid = %body.client_uid), err)]
async fn create_session(
    State(state): State<AppState>,
    ClientIp(ip): ClientIp,
    user: CurrentUser,
    Json(body): Json<CreateSessionRequest>,
) -> Result<impl IntoResponse, ApiError> {
    per_minute(&state.valkey, "create_session", &ip, 10).await?;
    user.require_admin()?;
    validate_create(&body)?;

    let session: CoachingSession = sqlx::query_as(&format!(
        "INSERT INTO coaching_sessions (uid, client_uid, title, description, session_type,
                                        session_date, duration_minutes, price, location, meeting_link)
         VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10)
         RETURNING {SESSION_COLUMNS}"
    ))
    .bind(Uuid::new_v4())
    .bind(body.client_uid)
    .bind(&body.title)
    .bind(&body.description)
    .bind(body.session_type)
    .bind(body.session_date)
    .bind(body.duration_minutes)
    .bind(body.price)
    .bind(&body.location)
    .bind(&body.meeting_link)
    .fetch_one(&state.pool)
    .await?;

    tracing::info!(session_uid = %session.uid, "coaching session created");
    Ok((StatusCode::CREATED, Json(session)))
}

#[tracing::instrument(skip(state, user), err)]
async fn list_client_sessions(
    State(state): State<AppState>,
    ClientIp(ip): ClientIp,
    user: CurrentUser,
    Path(client_uid): Path<Uuid>,
) -> Result<impl IntoResponse, ApiError> {
    per_minute(&state.valkey, "list_sessions", &ip, 30).await?;
    user.require_self_or_admin(client_uid, "view your own sessions")?;

    let sessions: Vec<CoachingSession> = sqlx::query_as(&format!(
        "SELECT {SESSION_COLUMNS} FROM coaching_sessions
         WHERE client_uid = $1
         ORDER BY session_date DESC, created_at DESC"
    ))
    .bind(client_uid)
    .fetch_all(&state.pool)
    .await?;

    Ok(Json(sessions))
}

#[tracing::instrument(skip(state, user, body), err)]
async fn update_session(
    State(state): State<AppState>,
    ClientIp(ip): ClientIp,
    user: CurrentUser,
    Path(session_uid): Path<Uuid>,
    Json(body): Json<UpdateSessionRequest>,
) -> Result<impl IntoResponse, ApiError> {
    per_minute(&state.valkey, "update_session", &ip, 10).await?;
    user.require_admin()?;
    validate_update(&body)?;

    let session: CoachingSession = sqlx::query_as(&format!(
        "UPDATE coaching_sessions SET
            title = COALESCE($2, title),
            description = COALESCE($3, description),
            session_date = COALESCE($4, session_date),
            duration_minutes = COALESCE($5, duration_minutes),
            status = COALESCE($6, status),
            notes = COALESCE($7, notes),
            location = COALESCE($8, location),
            meeting_link = COALESCE($9, meeting_link),
            updated_at = now()
         WHERE uid = $1
         RETURNING {SESSION_COLUMNS}"
    ))
    .bind(session_uid)
    .bind(&body.title)
    .bind(&body.description)
    .bind(body.session_date)
    .bind(body.duration_minutes)
    .bind(body.status)
    .bind(&body.notes)
    .bind(&body.location)
    .bind(&body.meeting_link)
    .fetch_optional(&state.pool)
    .await?
    .ok_or_else(|| ApiError::NotFound("Session not found".into()))?;

    Ok(Json(session))
}
