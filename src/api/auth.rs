use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::routing::{get, post};
use axum::{Json, Router};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::auth::blocklist;
use crate::auth::middleware::{AccessClaims, ClientIp, CurrentUser, RefreshClaims};
use crate::auth::password::{self, WEAK_PASSWORD_MESSAGE};
use crate::auth::rate_limit::per_minute;
use crate::auth::role::UserRole;
use crate::auth::url_token::Purpose;
use crate::error::ApiError;
use crate::notify::email;
use crate::store::AppState;
use crate::types::ActivityLevel;
use crate::users::{self, PROFILE_COLUMNS, UserProfile};
use crate::validation::FieldChecks;

// ---------------------------------------------------------------------------
// Types
// ---------------------------------------------------------------------------

#[derive(Debug, Deserialize)]
pub struct SignupRequest {
    pub username: String,
    pub email: String,
    pub first_name: String,
    pub last_name: String,
    pub password: String,

    pub phone_number: Option<String>,
    pub date_of_birth: Option<NaiveDate>,
    pub height_cm: Option<f64>,
    pub weight_kg: Option<f64>,
    pub activity_level: Option<ActivityLevel>,
    pub medical_conditions: Option<String>,
    pub primary_concerns: Option<String>,
    pub fitness_goals: Option<String>,
    pub profile_picture_url: Option<String>,
    pub bio: Option<String>,
}

/// Partial profile update. Absent fields are left untouched.
#[derive(Debug, Default, Deserialize)]
pub struct ProfileUpdate {
    pub username: Option<String>,
    pub email: Option<String>,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
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
}

#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

#[derive(Debug, Deserialize)]
pub struct PasswordResetRequest {
    pub email: String,
}

#[derive(Debug, Deserialize)]
pub struct PasswordResetConfirm {
    pub new_password: String,
    pub confirm_new_password: String,
}

#[derive(Debug, Deserialize)]
pub struct SetRoleQuery {
    pub role: String,
}

#[derive(Debug, Serialize)]
pub struct MessageResponse {
    pub message: String,
}

impl MessageResponse {
    fn new(message: impl Into<String>) -> Json<Self> {
        Json(Self {
            message: message.into(),
        })
    }
}

#[derive(Debug, Serialize)]
pub struct SignupResponse {
    pub message: String,
    pub user: UserProfile,
}

/// Updated profile, with a notice when the change requires re-verification.
#[derive(Debug, Serialize)]
pub struct ProfileUpdated {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    #[serde(flatten)]
    pub user: UserProfile,
}

#[derive(Debug, Serialize)]
pub struct LoginUser {
    pub email: String,
    pub uid: Uuid,
    pub role: UserRole,
    pub first_name: String,
    pub last_name: String,
    pub username: String,
    pub is_verified: bool,
}

#[derive(Debug, Serialize)]
pub struct LoginResponse {
    pub message: String,
    pub access_token: String,
    pub refresh_token: String,
    pub user: LoginUser,
}

#[derive(Debug, Serialize)]
pub struct TokenPair {
    pub access_token: String,
    pub refresh_token: String,
}

#[derive(Debug, Serialize)]
pub struct ResetTokenStatus {
    pub message: String,
    pub email: String,
}

// ---------------------------------------------------------------------------
// Router
// ---------------------------------------------------------------------------

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/api/v1/auth/signup", post(signup))
        .route("/api/v1/auth/login", post(login))
        .route("/api/v1/auth/me", get(me).patch(update_me))
        .route("/api/v1/auth/logout", post(logout))
        .route("/api/v1/auth/refresh", post(refresh))
        .route("/api/v1/auth/verify/{token}", get(verify_email))
        .route(
            "/api/v1/auth/password-reset-request",
            post(request_password_reset),
        )
        .route(
            "/api/v1/auth/password-reset-confirm/{token}",
            get(check_reset_token).post(confirm_password_reset),
        )
        .route("/api/v1/auth/set-role/{user_email}", post(set_role))
}

// ---------------------------------------------------------------------------
// Validation
// ---------------------------------------------------------------------------

fn validate_signup(body: &SignupRequest) -> Result<(), ApiError> {
    FieldChecks::new()
        .username("username", &body.username)
        .email("email", &body.email)
        .length("first_name", &body.first_name, 1, 255)
        .length("last_name", &body.last_name, 1, 255)
        .max_length("phone_number", body.phone_number.as_deref(), 20)
        .positive("height_cm", body.height_cm)
        .positive("weight_kg", body.weight_kg)
        .max_length("profile_picture_url", body.profile_picture_url.as_deref(), 255)
        .finish()?;

    if !password::is_strong(&body.password) {
        return Err(ApiError::BadRequest(WEAK_PASSWORD_MESSAGE.into()));
    }
    Ok(())
}

fn validate_update(body: &ProfileUpdate) -> Result<(), ApiError> {
    let mut checks = FieldChecks::new();
    if let Some(ref username) = body.username {
        checks.username("username", username);
    }
    if let Some(ref email) = body.email {
        checks.email("email", email);
    }
    checks
        .not_blank("first_name", body.first_name.as_deref())
        .not_blank("last_name", body.last_name.as_deref())
        .max_length("phone_number", body.phone_number.as_deref(), 20)
        .positive("height_cm", body.height_cm)
        .positive("weight_kg", body.weight_kg)
        .max_length("shoe_size", body.shoe_size.as_deref(), 10)
        .max_length("emergency_contact_name", body.emergency_contact_name.as_deref(), 100)
        .max_length("emergency_contact_phone", body.emergency_contact_phone.as_deref(), 20)
        .max_length(
            "emergency_contact_relationship",
            body.emergency_contact_relationship.as_deref(),
            50,
        )
        .max_length("profile_picture_url", body.profile_picture_url.as_deref(), 255)
        .finish()
}

// ---------------------------------------------------------------------------
// Account lifecycle
// ---------------------------------------------------------------------------

#[tracing::instrument(skip(state, body), fields(email = %body.email), err)]
async fn signup(
    State(state): State<AppState>,
    ClientIp(ip): ClientIp,
    Json(body): Json<SignupRequest>,
) -> Result<impl IntoResponse, ApiError> {
    per_minute(&state.valkey, "signup", &ip, 3).await?;
    validate_signup(&body)?;

    if users::email_exists(&state.pool, &body.email).await? {
        return Err(ApiError::Conflict(
            "User with this email already exists".into(),
        ));
    }

    let password_hash = password::hash_password(&body.password)?;

    let user: UserProfile = sqlx::query_as(&format!(
        "INSERT INTO users (uid, username, email, first_name, last_name, password_hash, role,
                            phone_number, date_of_birth, height_cm, weight_kg, activity_level,
                            medical_conditions, primary_concerns, fitness_goals,
                            profile_picture_url, bio)
         VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15, $16, $17)
         RETURNING {PROFILE_COLUMNS}"
    ))
    .bind(Uuid::new_v4())
    .bind(&body.username)
    .bind(&body.email)
    .bind(&body.first_name)
    .bind(&body.last_name)
    .bind(&password_hash)
    .bind(UserRole::User)
    .bind(&body.phone_number)
    .bind(body.date_of_birth)
    .bind(body.height_cm)
    .bind(body.weight_kg)
    .bind(body.activity_level)
    .bind(&body.medical_conditions)
    .bind(&body.primary_concerns)
    .bind(&body.fitness_goals)
    .bind(&body.profile_picture_url)
    .bind(&body.bio)
    .fetch_one(&state.pool)
    .await?;

    let token = state.links.generate(&user.email, Purpose::EmailVerification)?;
    let (subject, html) = email::verification_email(&state.config, &token);
    email::send_in_background(state.config.clone(), user.email.clone(), subject, html);

    tracing::info!(user_uid = %user.uid, "user signed up");

    Ok((
        StatusCode::CREATED,
        Json(SignupResponse {
            message: "Account created! Please check your email for verification.".into(),
            user,
        }),
    ))
}

#[tracing::instrument(skip(state, token), err)]
async fn verify_email(
    State(state): State<AppState>,
    ClientIp(ip): ClientIp,
    Path(token): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    per_minute(&state.valkey, "verify", &ip, 5).await?;

    let email = state
        .links
        .verify(&token, Purpose::EmailVerification)
        .map_err(|e| {
            tracing::debug!(error = %e, "verification token rejected");
            ApiError::BadRequest("Invalid or expired verification link".into())
        })?;

    let result = sqlx::query(
        "UPDATE users SET is_verified = true, updated_at = now() WHERE email = $1",
    )
    .bind(&email)
    .execute(&state.pool)
    .await?;

    if result.rows_affected() == 0 {
        return Err(ApiError::NotFound("User not found".into()));
    }

    tracing::info!(%email, "email verified");
    Ok(MessageResponse::new("Email verified successfully."))
}

#[tracing::instrument(skip(state, body), fields(email = %body.email), err)]
async fn login(
    State(state): State<AppState>,
    ClientIp(ip): ClientIp,
    Json(body): Json<LoginRequest>,
) -> Result<impl IntoResponse, ApiError> {
    per_minute(&state.valkey, "login", &ip, 5).await?;

    let creds = users::find_credentials(&state.pool, &body.email).await?;

    // Timing-safe: always run argon2 verify even when user not found
    let hash_to_verify = creds
        .as_ref()
        .map_or_else(|| password::dummy_hash(), |c| c.password_hash.as_str());
    let password_valid = password::verify_password(&body.password, hash_to_verify)?;

    let identity = match creds {
        Some(c) if password_valid => c.identity,
        _ => {
            return Err(ApiError::Unauthorized(
                "Invalid email or password".into(),
            ));
        }
    };

    if !identity.is_verified {
        return Err(ApiError::Forbidden(
            "Please verify your email before logging in".into(),
        ));
    }

    let access_token = state
        .jwt
        .issue_access(&identity.email, identity.uid, identity.role)?;
    let refresh_token = state.jwt.issue_refresh(&identity.email, identity.uid)?;

    tracing::info!(user_uid = %identity.uid, "login succeeded");

    Ok(Json(LoginResponse {
        message: "Login successful".into(),
        access_token,
        refresh_token,
        user: LoginUser {
            email: identity.email,
            uid: identity.uid,
            role: identity.role,
            first_name: identity.first_name,
            last_name: identity.last_name,
            username: identity.username,
            is_verified: identity.is_verified,
        },
    }))
}

#[tracing::instrument(skip(state, claims), fields(email = %claims.user.email), err)]
async fn refresh(
    State(state): State<AppState>,
    ClientIp(ip): ClientIp,
    RefreshClaims(claims): RefreshClaims,
) -> Result<impl IntoResponse, ApiError> {
    per_minute(&state.valkey, "refresh", &ip, 5).await?;

    let identity = users::find_identity_by_email(&state.pool, &claims.user.email)
        .await?
        .ok_or_else(|| ApiError::NotFound("User not found".into()))?;

    if !identity.is_verified {
        return Err(ApiError::Forbidden(
            "Please verify your email before using the service".into(),
        ));
    }

    Ok(Json(TokenPair {
        access_token: state
            .jwt
            .issue_access(&identity.email, identity.uid, identity.role)?,
        refresh_token: state.jwt.issue_refresh(&identity.email, identity.uid)?,
    }))
}

#[tracing::instrument(skip(state, claims), fields(email = %claims.user.email), err)]
async fn logout(
    State(state): State<AppState>,
    ClientIp(ip): ClientIp,
    AccessClaims(claims): AccessClaims,
) -> Result<impl IntoResponse, ApiError> {
    per_minute(&state.valkey, "logout", &ip, 5).await?;
    blocklist::revoke(&state.valkey, &claims).await?;
    Ok(MessageResponse::new("Logged out successfully"))
}

// ---------------------------------------------------------------------------
// Profile
// ---------------------------------------------------------------------------

#[tracing::instrument(skip(state, user), fields(user_uid = %user.uid), err)]
async fn me(
    State(state): State<AppState>,
    ClientIp(ip): ClientIp,
    user: CurrentUser,
) -> Result<impl IntoResponse, ApiError> {
    per_minute(&state.valkey, "me", &ip, 30).await?;

    let profile = users::find_profile_by_uid(&state.pool, user.uid)
        .await?
        .ok_or_else(|| ApiError::NotFound("User not found".into()))?;
    Ok(Json(profile))
}

#[tracing::instrument(skip(state, user, body), fields(user_uid = %user.uid), err)]
async fn update_me(
    State(state): State<AppState>,
    ClientIp(ip): ClientIp,
    user: CurrentUser,
    Json(body): Json<ProfileUpdate>,
) -> Result<impl IntoResponse, ApiError> {
    per_minute(&state.valkey, "update_me", &ip, 10).await?;
    validate_update(&body)?;

    let email_changed = body.email.as_deref().is_some_and(|e| e != user.email);

    if let Some(ref new_email) = body.email {
        let taken: bool = sqlx::query_scalar(
            "SELECT EXISTS(SELECT 1 FROM users WHERE email = $1 AND uid <> $2)",
        )
        .bind(new_email)
        .bind(user.uid)
        .fetch_one(&state.pool)
        .await?;
        if taken {
            return Err(ApiError::Conflict(
                "User with this email already exists".into(),
            ));
        }
    }

    let profile: UserProfile = sqlx::query_as(&format!(
        "UPDATE users SET
            username = COALESCE($2, username),
            email = COALESCE($3, email),
            first_name = COALESCE($4, first_name),
            last_name = COALESCE($5, last_name),
            phone_number = COALESCE($6, phone_number),
            date_of_birth = COALESCE($7, date_of_birth),
            height_cm = COALESCE($8, height_cm),
            weight_kg = COALESCE($9, weight_kg),
            activity_level = COALESCE($10, activity_level),
            medical_conditions = COALESCE($11, medical_conditions),
            medications = COALESCE($12, medications),
            previous_injuries = COALESCE($13, previous_injuries),
            shoe_size = COALESCE($14, shoe_size),
            foot_type = COALESCE($15, foot_type),
            primary_concerns = COALESCE($16, primary_concerns),
            pain_areas = COALESCE($17, pain_areas),
            fitness_goals = COALESCE($18, fitness_goals),
            preferred_workout_time = COALESCE($19, preferred_workout_time),
            exercise_experience = COALESCE($20, exercise_experience),
            emergency_contact_name = COALESCE($21, emergency_contact_name),
            emergency_contact_phone = COALESCE($22, emergency_contact_phone),
            emergency_contact_relationship = COALESCE($23, emergency_contact_relationship),
            profile_picture_url = COALESCE($24, profile_picture_url),
            bio = COALESCE($25, bio),
            is_verified = is_verified AND NOT $26,
            updated_at = now()
         WHERE uid = $1
         RETURNING {PROFILE_COLUMNS}"
    ))
    .bind(user.uid)
    .bind(&body.username)
    .bind(&body.email)
    .bind(&body.first_name)
    .bind(&body.last_name)
    .bind(&body.phone_number)
    .bind(body.date_of_birth)
    .bind(body.height_cm)
    .bind(body.weight_kg)
    .bind(body.activity_level)
    .bind(&body.medical_conditions)
    .bind(&body.medications)
    .bind(&body.previous_injuries)
    .bind(&body.shoe_size)
    .bind(&body.foot_type)
    .bind(&body.primary_concerns)
    .bind(&body.pain_areas)
    .bind(&body.fitness_goals)
    .bind(&body.preferred_workout_time)
    .bind(&body.exercise_experience)
    .bind(&body.emergency_contact_name)
    .bind(&body.emergency_contact_phone)
    .bind(&body.emergency_contact_relationship)
    .bind(&body.profile_picture_url)
    .bind(&body.bio)
    .bind(email_changed)
    .fetch_optional(&state.pool)
    .await?
    .ok_or_else(|| ApiError::NotFound("User not found".into()))?;

    if !email_changed {
        return Ok(Json(ProfileUpdated {
            message: None,
            user: profile,
        }));
    }

    // Tokens carry the old address; the new one must be confirmed before login.
    blocklist::revoke(&state.valkey, &user.claims).await?;
    let token = state.links.generate(&profile.email, Purpose::EmailVerification)?;
    let (subject, html) = email::verification_email(&state.config, &token);
    email::send_in_background(state.config.clone(), profile.email.clone(), subject, html);

    tracing::info!(user_uid = %profile.uid, "email changed, verification required");

    Ok(Json(ProfileUpdated {
        message: Some(
            "Email updated. Please verify your new address and log in again.".into(),
        ),
        user: profile,
    }))
}

// ---------------------------------------------------------------------------
// Password reset
// ---------------------------------------------------------------------------

#[tracing::instrument(skip(state, body), err)]
async fn request_password_reset(
    State(state): State<AppState>,
    ClientIp(ip): ClientIp,
    Json(body): Json<PasswordResetRequest>,
) -> Result<impl IntoResponse, ApiError> {
    per_minute(&state.valkey, "password_reset_request", &ip, 2).await?;

    // Same answer either way so the endpoint cannot be used to probe for accounts
    if users::email_exists(&state.pool, &body.email).await? {
        let token = state.links.generate(&body.email, Purpose::PasswordReset)?;
        let (subject, html) = email::password_reset_email(&state.config, &token);
        email::send_in_background(state.config.clone(), body.email.clone(), subject, html);
    } else {
        tracing::debug!("password reset requested for unknown email");
    }

    Ok(MessageResponse::new(
        "If an account exists, password reset instructions have been sent",
    ))
}

fn reset_email_from(state: &AppState, token: &str) -> Result<String, ApiError> {
    state
        .links
        .verify(token, Purpose::PasswordReset)
        .map_err(|e| {
            tracing::debug!(error = %e, "reset token rejected");
            ApiError::BadRequest("Invalid or expired reset token".into())
        })
}

#[tracing::instrument(skip(state, token), err)]
async fn check_reset_token(
    State(state): State<AppState>,
    ClientIp(ip): ClientIp,
    Path(token): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    per_minute(&state.valkey, "password_reset_check", &ip, 10).await?;

    let email = reset_email_from(&state, &token)?;
    if !users::email_exists(&state.pool, &email).await? {
        return Err(ApiError::NotFound("User not found".into()));
    }

    Ok(Json(ResetTokenStatus {
        message: "Token is valid".into(),
        email,
    }))
}

#[tracing::instrument(skip(state, token, body), err)]
async fn confirm_password_reset(
    State(state): State<AppState>,
    ClientIp(ip): ClientIp,
    Path(token): Path<String>,
    Json(body): Json<PasswordResetConfirm>,
) -> Result<impl IntoResponse, ApiError> {
    per_minute(&state.valkey, "password_reset_confirm", &ip, 5).await?;

    if body.new_password != body.confirm_new_password {
        return Err(ApiError::BadRequest("Passwords do not match".into()));
    }
    if !password::is_strong(&body.new_password) {
        return Err(ApiError::BadRequest(WEAK_PASSWORD_MESSAGE.into()));
    }

    let email = reset_email_from(&state, &token)?;
    let password_hash = password::hash_password(&body.new_password)?;

    let result = sqlx::query(
        "UPDATE users SET password_hash = $2, updated_at = now() WHERE email = $1",
    )
    .bind(&email)
    .bind(&password_hash)
    .execute(&state.pool)
    .await?;

    if result.rows_affected() == 0 {
        return Err(ApiError::NotFound("User not found".into()));
    }

    tracing::info!(%email, "password reset");
    Ok(MessageResponse::new("Password has been reset successfully"))
}

// ---------------------------------------------------------------------------
// Administration
// ---------------------------------------------------------------------------

#[tracing::instrument(skip(state, admin), fields(admin_uid = %admin.uid), err)]
async fn set_role(
    State(state): State<AppState>,
    ClientIp(ip): ClientIp,
    admin: CurrentUser,
    Path(user_email): Path<String>,
    Query(query): Query<SetRoleQuery>,
) -> Result<impl IntoResponse, ApiError> {
    per_minute(&state.valkey, "set_role", &ip, 5).await?;
    admin.require_admin()?;

    let role: UserRole = query.role.parse().map_err(|_| {
        ApiError::BadRequest("Invalid role specified. Role must be 'user' or 'admin'.".into())
    })?;

    let profile: UserProfile = sqlx::query_as(&format!(
        "UPDATE users SET role = $2, updated_at = now() WHERE email = $1 RETURNING {PROFILE_COLUMNS}"
    ))
    .bind(&user_email)
    .bind(role)
    .fetch_optional(&state.pool)
    .await?
    .ok_or_else(|| ApiError::NotFound("User not found".into()))?;

    tracing::info!(target_uid = %profile.uid, %role, "role changed");
    Ok(Json(profile))
}
