use chrono::{DateTime, NaiveDate, Utc};
use serde::Serialize;
use sqlx::PgPool;
use uuid::Uuid;

use crate::auth::role::UserRole;
use crate::types::ActivityLevel;

/// Columns selected into [`UserProfile`]. Never includes the password hash.
pub const PROFILE_COLUMNS: &str = "uid, username, email, first_name, last_name, role, \
    phone_number, date_of_birth, height_cm, weight_kg, activity_level, \
    medical_conditions, medications, previous_injuries, shoe_size, foot_type, \
    primary_concerns, pain_areas, fitness_goals, preferred_workout_time, \
    exercise_experience, emergency_contact_name, emergency_contact_phone, \
    emergency_contact_relationship, profile_picture_url, bio, created_at, \
    updated_at, is_verified";

/// A user as returned by the API.
#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct UserProfile {
    pub uid: Uuid,
    pub username: String,
    pub email: String,
    pub first_name: String,
    pub last_name: String,
    pub role: UserRole,
    pub phone_number: Option<String>,

    pub date_of_birth: Option<NaiveDate>,
    pub height_cm: Option<f64>,
    pub weight_kg: Option<f64>,

    pub activity_level: Option<ActivityLevel>,
    pub medical_conditions: Option<String>,
    pub medications: Option<String>,
    pub previous_injuries: Option<String>,

    pub shoe_size: Option<String>,
    pub foot_type: Option<String>,
    pub primary_concerns: Option<String>,
    pub pain_areas: Option<String>,

    pub fitness_goals: Option<String>,
    pub preferred_workout_time: Option<String>,
    pub exercise_experience: Option<String>,

    pub emergency_contact_name: Option<String>,
    pub emergency_contact_phone: Option<String>,
    pub emergency_contact_relationship: Option<String>,

    pub profile_picture_url: Option<String>,
    pub bio: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub is_verified: bool,
}

/// The slice of a user needed to authenticate and authorize a request.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct Identity {
    pub uid: Uuid,
    pub username: String,
    pub email: String,
    pub first_name: String,
    pub last_name: String,
    pub role: UserRole,
    pub is_verified: bool,
}

#[derive(Debug, Clone, sqlx::FromRow)]
pub struct Credentials {
    #[sqlx(flatten)]
    pub identity: Identity,
    pub password_hash: String,
}

pub async fn find_profile_by_uid(
    pool: &PgPool,
    uid: Uuid,
) -> Result<Option<UserProfile>, sqlx::Error> {
    sqlx::query_as(&format!("SELECT {PROFILE_COLUMNS} FROM users WHERE uid = $1"))
        .bind(uid)
        .fetch_optional(pool)
        .await
}

#[tracing::instrument(skip(pool), err)]
pub async fn find_identity_by_email(
    pool: &PgPool,
    email: &str,
) -> Result<Option<Identity>, sqlx::Error> {
    let started = std::time::Instant::now();
    let identity: Option<Identity> = sqlx::query_as(
        "SELECT uid, username, email, first_name, last_name, role, is_verified
         FROM users WHERE email = $1",
    )
    .bind(email)
    .fetch_optional(pool)
    .await?;

    tracing::debug!(
        found = identity.is_some(),
        elapsed_ms = started.elapsed().as_millis(),
        "user lookup"
    );
    Ok(identity)
}

pub async fn find_credentials(
    pool: &PgPool,
    email: &str,
) -> Result<Option<Credentials>, sqlx::Error> {
    sqlx::query_as(
        "SELECT uid, username, email, first_name, last_name, role, is_verified, password_hash
         FROM users WHERE email = $1",
    )
    .bind(email)
    .fetch_optional(pool)
    .await
}

pub async fn email_exists(pool: &PgPool, email: &str) -> Result<bool, sqlx::Error> {
    sqlx::query_scalar("SELECT EXISTS(SELECT 1 FROM users WHERE email = $1)")
        .bind(email)
        .fetch_one(pool)
        .await
}
