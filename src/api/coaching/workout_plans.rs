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

const PLAN_COLUMNS: &str =
    "uid, client_uid, name, description, start_date, end_date, is_active, created_at, updated_at";

// ---------------------------------------------------------------------------
// Types
// ---------------------------------------------------------------------------

#[derive(Debug, Serialize, sqlx::FromRow)]
pub struct WorkoutPlan {
    pub uid: Uuid,
    pub client_uid: Uuid,
    pub name: String,
    pub description: Option<String>,
    pub start_date: NaiveDate,
    pub end_date: Option<NaiveDate>,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// An exercise slot in a plan, joined with the exercise's name and target.
#[derive(Debug, Serialize, sqlx::FromRow)]
pub struct PlanExercise {
    pub uid: Uuid,
    pub workout_plan_uid: Uuid,
    pub exercise_uid: Uuid,
    pub exercise_name: String,
    pub target_area: String,
    pub sets: i32,
    pub reps: Option<i32>,
    pub duration_seconds: Option<i32>,
    pub rest_seconds: Option<i32>,
    pub order_index: i32,
    pub notes: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct CreatePlanRequest {
    pub client_uid: Uuid,
    pub name: String,
    pub description: Option<String>,
    pub start_date: NaiveDate,
    pub end_date: Option<NaiveDate>,
}

fn default_sets() -> i32 {
    1
}

#[allow(clippy::unnecessary_wraps)]
fn default_rest() -> Option<i32> {
    Some(30)
}

#[derive(Debug, Deserialize)]
pub struct AddPlanExerciseRequest {
    pub exercise_uid: Uuid,
    #[serde(default = "default_sets")]
    pub sets: i32,
    pub reps: Option<i32>,
    pub duration_seconds: Option<i32>,
    #[serde(default = "default_rest")]
    pub rest_seconds: Option<i32>,
    #[serde(default)]
    pub order_index: i32,
    pub notes: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct PlanExerciseAdded {
    pub message: String,
    pub uid: Uuid,
}

// ---------------------------------------------------------------------------
// Router
// ---------------------------------------------------------------------------

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/api/v1/coaching/workout-plans", post(create_plan))
        .route(
            "/api/v1/coaching/workout-plans/client/{client_uid}",
            get(list_client_plans),
        )
        .route(
            "/api/v1/coaching/workout-plans/{plan_uid}/exercises",
            post(add_exercise).get(list_plan_exercises),
        )
}

fn validate_plan(body: &CreatePlanRequest) -> Result<(), ApiError> {
    FieldChecks::new()
        .length("name", &body.name, 1, 255)
        .rule(
            body.end_date.is_none_or(|end| end >= body.start_date),
            "end_date must not be before start_date",
        )
        .finish()
}

fn validate_slot(body: &AddPlanExerciseRequest) -> Result<(), ApiError> {
    FieldChecks::new()
        .at_least("sets", Some(body.sets), 1)
        .at_least("reps", body.reps, 1)
        .at_least("duration_seconds", body.duration_seconds, 1)
        .at_least("rest_seconds", body.rest_seconds, 0)
        .at_least("order_index", Some(body.order_index), 0)
        .finish()
}

// ---------------------------------------------------------------------------
// Handlers
// ---------------------------------------------------------------------------

#[tracing::instrument(skip(state, user, body), fields(client_uid = %body.client_uid), err)]
async fn create_plan(
    State(state): State<AppState>,
    ClientIp(ip): ClientIp,
    user: CurrentUser,
    Json(body): Json<CreatePlanRequest>,
) -> Result<impl IntoResponse, ApiError> {
    per_minute(&state.valkey, "create_workout_plan", &ip, 10).await?;
    user.require_admin()?;
    validate_plan(&body)?;

    let plan: WorkoutPlan = sqlx::query_as(&format!(
        "INSERT INTO workout_plans (uid, client_uid, name, description, start_date, end_date)
         VALUES ($1, $2, $3, $4, $5, $6)
         RETURNING {PLAN_COLUMNS}"
    ))
    .bind(Uuid::new_v4())
    .bind(body.client_uid)
    .bind(&body.name)
    .bind(&body.description)
    .bind(body.start_date)
    .bind(body.end_date)
    .fetch_one(&state.pool)
    .await?;

    tracing::info!(plan_uid = %plan.uid, "workout plan created");
    Ok((StatusCode::CREATED, Json(plan)))
}

#[tracing::instrument(skip(state, user), err)]
async fn list_client_plans(
    State(state): State<AppState>,
    ClientIp(ip): ClientIp,
    user: CurrentUser,
    Path(client_uid): Path<Uuid>,
) -> Result<impl IntoResponse, ApiError> {
    per_minute(&state.valkey, "list_workout_plans", &ip, 30).await?;
    user.require_self_or_admin(client_uid, "view your own workout plans")?;

    let plans: Vec<WorkoutPlan> = sqlx::query_as(&format!(
        "SELECT {PLAN_COLUMNS} FROM workout_plans
         WHERE client_uid = $1
         ORDER BY created_at DESC"
    ))
    .bind(client_uid)
    .fetch_all(&state.pool)
    .await?;

    Ok(Json(plans))
}

#[tracing::instrument(skip(state, user, body), fields(exercise_uid = %body.exercise_uid), err)]
async fn add_exercise(
    State(state): State<AppState>,
    ClientIp(ip): ClientIp,
    user: CurrentUser,
    Path(plan_uid): Path<Uuid>,
    Json(body): Json<AddPlanExerciseRequest>,
) -> Result<impl IntoResponse, ApiError> {
    per_minute(&state.valkey, "add_plan_exercise", &ip, 20).await?;
    user.require_admin()?;
    validate_slot(&body)?;

    let plan_exists: bool =
        sqlx::query_scalar("SELECT EXISTS(SELECT 1 FROM workout_plans WHERE uid = $1)")
            .bind(plan_uid)
            .fetch_one(&state.pool)
            .await?;
    if !plan_exists {
        return Err(ApiError::NotFound("Workout plan not found".into()));
    }

    let exercise_exists: bool =
        sqlx::query_scalar("SELECT EXISTS(SELECT 1 FROM exercises WHERE uid = $1)")
            .bind(body.exercise_uid)
            .fetch_one(&state.pool)
            .await?;
    if !exercise_exists {
        return Err(ApiError::NotFound("Exercise not found".into()));
    }

    let uid = Uuid::new_v4();
    sqlx::query(
        "INSERT INTO workout_plan_exercises (uid, workout_plan_uid, exercise_uid, sets, reps,
                                             duration_seconds, rest_seconds, order_index, notes)
         VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)",
    )
    .bind(uid)
    .bind(plan_uid)
    .bind(body.exercise_uid)
    .bind(body.sets)
    .bind(body.reps)
    .bind(body.duration_seconds)
    .bind(body.rest_seconds)
    .bind(body.order_index)
    .bind(&body.notes)
    .execute(&state.pool)
    .await?;

    Ok((
        StatusCode::CREATED,
        Json(PlanExerciseAdded {
            message: "Exercise added to plan successfully".into(),
            uid,
        }),
    ))
}

#[tracing::instrument(skip(state, user), err)]
async fn list_plan_exercises(
    State(state): State<AppState>,
    ClientIp(ip): ClientIp,
    user: CurrentUser,
    Path(plan_uid): Path<Uuid>,
) -> Result<impl IntoResponse, ApiError> {
    per_minute(&state.valkey, "list_plan_exercises", &ip, 30).await?;

    let owner: Uuid = sqlx::query_scalar("SELECT client_uid FROM workout_plans WHERE uid = $1")
        .bind(plan_uid)
        .fetch_optional(&state.pool)
        .await?
        .ok_or_else(|| ApiError::NotFound("Workout plan not found".into()))?;
    user.require_self_or_admin(owner, "view your own workout plans")?;

    let slots: Vec<PlanExercise> = sqlx::query_as(
        "SELECT wpe.uid, wpe.workout_plan_uid, wpe.exercise_uid,
                e.name AS exercise_name, e.target_area,
                wpe.sets, wpe.reps, wpe.duration_seconds, wpe.rest_seconds,
                wpe.order_index, wpe.notes
         FROM workout_plan_exercises wpe
         JOIN exercises e ON e.uid = wpe.exercise_uid
         WHERE wpe.workout_plan_uid = $1
         ORDER BY wpe.order_index, e.name",
    )
    .bind(plan_uid)
    .fetch_all(&state.pool)
    .await?;

    Ok(Json(slots))
}
