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

const ASSESSMENT_COLUMNS: &str = "uid, client_uid, assessment_date, foot_type, gait_analysis, \
    pain_areas, medical_history, goals, lifestyle_factors, current_activity_level, \
    created_at, updated_at";

#[derive(Debug, Serialize, sqlx::FromRow)]
pub struct Assessment {
    pub uid: Uuid,
    pub client_uid: Uuid,
    pub assessment_date: NaiveDate,
    pub foot_type: Option<String>,
    pub gait_analysis: Option<String>,
    pub pain_areas: Option<String>,
    pub medical_history: Option<String>,
    pub goals: Option<String>,
    pub lifestyle_factors: Option<String>,
    pub current_activity_level: Option<i32>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Deserialize)]
pub struct CreateAssessmentRequest {
    pub client_uid: Uuid,
    pub assessment_date: NaiveDate,
    pub foot_type: Option<String>,
    pub gait_analysis: Option<String>,
    pub pain_areas: Option<String>,
    pub medical_history: Option<String>,
    pub goals: Option<String>,
    pub lifestyle_factors: Option<String>,
    pub current_activity_level: Option<i32>,
}

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/api/v1/coaching/assessments", post(create_assessment))
        .route(
            "/api/v1/coaching/assessments/client/{client_uid}",
            get(list_client_assessments),
        )
}

#[tracing::instrument(skip(state, user, body), fields(client_uid = %body.client_uid), err)]
async fn create_assessment(
    State(state): State<AppState>,
    ClientIp(ip): ClientIp,
    user: CurrentUser,
    Json(body): Json<CreateAssessmentRequest>,
) -> Result<impl IntoResponse, ApiError> {
    per_minute(&state.valkey, "create_assessment", &ip, 10).await?;
    user.require_admin()?;
    FieldChecks::new()
        .range("current_activity_level", body.current_activity_level, 1, 5)
        .finish()?;

    let assessment: Assessment = sqlx::query_as(&format!(
        "INSERT INTO client_assessments (uid, client_uid, assessment_date, foot_type,
                                         gait_analysis, pain_areas, medical_history, goals,
                                         lifestyle_factors, current_activity_level)
         VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10)
         RETURNING {ASSESSMENT_COLUMNS}"
    ))
    .bind(Uuid::new_v4())
    .bind(body.client_uid)
    .bind(body.assessment_date)
    .bind(&body.foot_type)
    .bind(&body.gait_analysis)
    .bind(&body.pain_areas)
    .bind(&body.medical_history)
    .bind(&body.goals)
    .bind(&body.lifestyle_factors)
    .bind(body.current_activity_level)
    .fetch_one(&state.pool)
    .await?;

    Ok((StatusCode::CREATED, Json(assessment)))
}

#[tracing::instrument(skip(state, user), err)]
async fn list_client_assessments(
    State(state): State<AppState>,
    ClientIp(ip): ClientIp,
    user: CurrentUser,
    Path(client_uid): Path<Uuid>,
) -> Result<impl IntoResponse, ApiError> {
    per_minute(&state.valkey, "list_assessments", &ip, 30).await?;
    user.require_self_or_admin(client_uid, "view your own assessments")?;

    let assessments: Vec<Assessment> = sqlx::query_as(&format!(
        "SELECT {ASSESSMENT_COLUMNS} FROM client_assessments
         WHERE client_uid = $1
         ORDER BY assessment_date DESC, created_at DESC"
    ))
    .bind(client_uid)
    .fetch_all(&state.pool)
    .await?;

    Ok(Json(assessments))
}
