use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::routing::{post, put};
use axum::{Json, Router};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::auth::middleware::{ClientIp, CurrentUser};
use crate::auth::rate_limit::per_minute;
use crate::error::ApiError;
use crate::store::AppState;
use crate::validation::FieldChecks;

const EXERCISE_COLUMNS: &str = "uid, name, description, instructions, difficulty_level, \
    target_area, equipment_needed, video_url, image_url, created_at, updated_at";

#[derive(Debug, Serialize, sqlx::FromRow)]
pub struct Exercise {
    pub uid: Uuid,
    pub name: String,
    pub description: String,
    pub instructions: String,
    pub difficulty_level: i32,
    pub target_area: String,
    pub equipment_needed: Option<String>,
    pub video_url: Option<String>,
    pub image_url: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Deserialize)]
pub struct CreateExerciseRequest {
    pub name: String,
    pub description: String,
    pub instructions: String,
    pub difficulty_level: i32,
    pub target_area: String,
    pub equipment_needed: Option<String>,
    pub video_url: Option<String>,
    pub image_url: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
pub struct UpdateExerciseRequest {
    pub name: Option<String>,
    pub description: Option<String>,
    pub instructions: Option<String>,
    pub difficulty_level: Option<i32>,
    pub target_area: Option<String>,
    pub equipment_needed: Option<String>,
    pub video_url: Option<String>,
    pub image_url: Option<String>,
}

pub fn router() -> Router<AppState> {
    Router::new()
        .route(
            "/api/v1/coaching/exercises",
            post(create_exercise).get(list_exercises),
        )
        .route(
            "/api/v1/coaching/exercises/{exercise_uid}",
            put(update_exercise),
        )
}

fn validate_create(body: &CreateExerciseRequest) -> Result<(), ApiError> {
    FieldChecks::new()
        .length("name", &body.name, 1, 255)
        .length("target_area", &body.target_area, 1, 255)
        .range("difficulty_level", Some(body.difficulty_level), 1, 5)
        .finish()
}

fn validate_update(body: &UpdateExerciseRequest) -> Result<(), ApiError> {
    FieldChecks::new()
        .not_blank("name", body.name.as_deref())
        .not_blank("target_area", body.target_area.as_deref())
        .range("difficulty_level", body.difficulty_level, 1, 5)
        .finish()
}

#[tracing::instrument(skip(state, user, body), fields(name = %body.name), err)]
async fn create_exercise(
    State(state): State<AppState>,
    ClientIp(ip): ClientIp,
    user: CurrentUser,
    Json(body): Json<CreateExerciseRequest>,
) -> Result<impl IntoResponse, ApiError> {
    per_minute(&state.valkey, "create_exercise", &ip, 10).await?;
    user.require_admin()?;
    validate_create(&body)?;

    let exercise: Exercise = sqlx::query_as(&format!(
        "INSERT INTO exercises (uid, name, description, instructions, difficulty_level,
                                target_area, equipment_needed, video_url, image_url)
         VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
         RETURNING {EXERCISE_COLUMNS}"
    ))
    .bind(Uuid::new_v4())
    .bind(&body.name)
    .bind(&body.description)
    .bind(&body.instructions)
    .bind(body.difficulty_level)
    .bind(&body.target_area)
    .bind(&body.equipment_needed)
    .bind(&body.video_url)
    .bind(&body.image_url)
    .fetch_one(&state.pool)
    .await?;

    Ok((StatusCode::CREATED, Json(exercise)))
}

#[tracing::instrument(skip(state, _user), err)]
async fn list_exercises(
    State(state): State<AppState>,
    ClientIp(ip): ClientIp,
    _user: CurrentUser,
) -> Result<impl IntoResponse, ApiError> {
    per_minute(&state.valkey, "list_exercises", &ip, 30).await?;

    let exercises: Vec<Exercise> = sqlx::query_as(&format!(
        "SELECT {EXERCISE_COLUMNS} FROM exercises ORDER BY name"
    ))
    .fetch_all(&state.pool)
    .await?;

    Ok(Json(exercises))
}

#[tracing::instrument(skip(state, user, body), err)]
async fn update_exercise(
    State(state): State<AppState>,
    ClientIp(ip): ClientIp,
    user: CurrentUser,
    Path(exercise_uid): Path<Uuid>,
    Json(body): Json<UpdateExerciseRequest>,
) -> Result<impl IntoResponse, ApiError> {
    per_minute(&state.valkey, "update_exercise", &ip, 10).await?;
    user.require_admin()?;
    validate_update(&body)?;

    let exercise: Exercise = sqlx::query_as(&format!(
        "UPDATE exercises SET
            name = COALESCE($2, name),
            description = COALESCE($3, description),
            instructions = COALESCE($4, instructions),
            difficulty_level = COALESCE($5, difficulty_level),
            target_area = COALESCE($6, target_area),
            equipment_needed = COALESCE($7, equipment_needed),
            video_url = COALESCE($8, video_url),
            image_url = COALESCE($9, image_url),
            updated_at = now()
         WHERE uid = $1
         RETURNING {EXERCISE_COLUMNS}"
    ))
    .bind(exercise_uid)
    .bind(&body.name)
    .bind(&body.description)
    .bind(&body.instructions)
    .bind(body.difficulty_level)
    .bind(&body.target_area)
    .bind(&body.equipment_needed)
    .bind(&body.video_url)
    .bind(&body.image_url)
    .fetch_optional(&state.pool)
    .await?
    .ok_or_else(|| ApiError::NotFound("Exercise not found".into()))?;

    Ok(Json(exercise))
}
