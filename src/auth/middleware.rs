use std::convert::Infallible;

use axum::extract::FromRequestParts;
use axum::http::header::AUTHORIZATION;
use axum::http::request::Parts;
use uuid::Uuid;

use crate::auth::blocklist;
use crate::auth::jwt::{Claims, TokenError};
use crate::auth::role::UserRole;
use crate::error::ApiError;
use crate::store::AppState;
use crate::users;

/// Claims of a valid, unrevoked access token.
#[derive(Debug, Clone)]
pub struct AccessClaims(pub Claims);

/// Claims of a valid refresh token.
#[derive(Debug, Clone)]
pub struct RefreshClaims(pub Claims);

/// Authenticated user behind an access token.
#[derive(Debug, Clone)]
pub struct CurrentUser {
    pub uid: Uuid,
    pub username: String,
    pub email: String,
    pub role: UserRole,
    pub is_verified: bool,
    pub claims: Claims,
}

impl CurrentUser {
    pub fn is_admin(&self) -> bool {
        self.role.is_admin()
    }

    pub fn require_admin(&self) -> Result<(), ApiError> {
        if self.is_admin() {
            Ok(())
        } else {
            Err(ApiError::Forbidden("Operation not permitted".into()))
        }
    }

    /// Admins may act on any client; users only on themselves.
    /// `action` completes the sentence "You can only ...".
    pub fn require_self_or_admin(&self, client_uid: Uuid, action: &str) -> Result<(), ApiError> {
        if self.is_admin() || self.uid == client_uid {
            Ok(())
        } else {
            Err(ApiError::Forbidden(format!("You can only {action}")))
        }
    }
}

/// Client address used for rate limiting.
#[derive(Debug, Clone)]
pub struct ClientIp(pub String);

fn decode_bearer(parts: &Parts, state: &AppState) -> Result<Claims, ApiError> {
    let raw = extract_bearer_token(parts)
        .ok_or_else(|| ApiError::Unauthorized("Invalid authorization credentials".into()))?;

    state.jwt.decode(&raw).map_err(|e| {
        match &e {
            TokenError::Expired => tracing::debug!("token expired"),
            TokenError::Invalid(reason) => tracing::warn!(%reason, "invalid token"),
        }
        ApiError::Unauthorized("Invalid or expired token".into())
    })
}

impl FromRequestParts<AppState> for AccessClaims {
    type Rejection = ApiError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let claims = decode_bearer(parts, state)?;

        if claims.refresh {
            return Err(ApiError::Unauthorized(
                "Please provide an access token".into(),
            ));
        }

        if blocklist::is_revoked(&state.valkey, claims.jti).await? {
            return Err(ApiError::Unauthorized("Token has been revoked".into()));
        }

        Ok(Self(claims))
    }
}

impl FromRequestParts<AppState> for RefreshClaims {
    type Rejection = ApiError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let claims = decode_bearer(parts, state)?;

        if !claims.refresh {
            return Err(ApiError::Unauthorized(
                "Please provide a refresh token".into(),
            ));
        }

        Ok(Self(claims))
    }
}

impl FromRequestParts<AppState> for CurrentUser {
    type Rejection = ApiError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let AccessClaims(claims) = AccessClaims::from_request_parts(parts, state).await?;

        let identity = users::find_identity_by_email(&state.pool, &claims.user.email)
            .await?
            .ok_or_else(|| ApiError::NotFound("User not found".into()))?;

        Ok(Self {
            uid: identity.uid,
            username: identity.username,
            email: identity.email,
            role: identity.role,
            is_verified: identity.is_verified,
            claims,
        })
    }
}

impl FromRequestParts<AppState> for ClientIp {
    type Rejection = Infallible;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let ip = extract_ip(parts, state.config.trust_proxy_headers)
            .unwrap_or_else(|| "unknown".into());
        Ok(Self(ip))
    }
}

fn extract_bearer_token(parts: &Parts) -> Option<String> {
    let value = parts.headers.get(AUTHORIZATION)?.to_str().ok()?;
    let token = value.strip_prefix("Bearer ")?;
    if token.is_empty() {
        return None;
    }
    Some(token.to_owned())
}

fn extract_ip(parts: &Parts, trust_proxy: bool) -> Option<String> {
    // Only trust X-Forwarded-For when behind a configured reverse proxy
    if trust_proxy
        && let Some(forwarded) = parts.headers.get("x-forwarded-for")
        && let Ok(val) = forwarded.to_str()
        && let Some(first_ip) = val.split(',').next()
    {
        return Some(first_ip.trim().to_owned());
    }
    parts
        .extensions
        .get::<axum::extract::ConnectInfo<std::net::SocketAddr>>()
        .map(|ci| ci.0.ip().to_string())
}
