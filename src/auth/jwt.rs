use chrono::{Duration, Utc};
use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey, Header, Validation, decode, encode};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::auth::role::UserRole;

pub const ACCESS_TOKEN_TTL_SECS: i64 = 3600;
pub const REFRESH_TOKEN_TTL_DAYS: i64 = 2;

/// Identity embedded in every token. Refresh tokens omit the role so a role
/// change takes effect on the next access token.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenUser {
    pub email: String,
    pub user_uid: Uuid,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub role: Option<UserRole>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    pub user: TokenUser,
    pub exp: i64,
    pub jti: Uuid,
    pub refresh: bool,
}

impl Claims {
    /// Seconds until expiry, never negative.
    pub fn remaining_secs(&self) -> i64 {
        (self.exp - Utc::now().timestamp()).max(0)
    }
}

#[derive(Debug, thiserror::Error)]
pub enum TokenError {
    #[error("token expired")]
    Expired,

    #[error("invalid token: {0}")]
    Invalid(String),
}

/// Issues and validates signed JWTs with the configured HMAC key.
#[derive(Clone)]
pub struct TokenSigner {
    algorithm: Algorithm,
    encoding: EncodingKey,
    decoding: DecodingKey,
}

impl TokenSigner {
    pub fn new(secret: &str, algorithm: Algorithm) -> Self {
        Self {
            algorithm,
            encoding: EncodingKey::from_secret(secret.as_bytes()),
            decoding: DecodingKey::from_secret(secret.as_bytes()),
        }
    }

    pub fn issue(&self, user: TokenUser, ttl: Duration, refresh: bool) -> anyhow::Result<String> {
        let claims = Claims {
            user,
            exp: (Utc::now() + ttl).timestamp(),
            jti: Uuid::new_v4(),
            refresh,
        };
        let token = encode(&Header::new(self.algorithm), &claims, &self.encoding)?;
        tracing::debug!(
            email = %claims.user.email,
            kind = if refresh { "refresh" } else { "access" },
            "token issued"
        );
        Ok(token)
    }

    pub fn issue_access(&self, email: &str, user_uid: Uuid, role: UserRole) -> anyhow::Result<String> {
        self.issue(
            TokenUser {
                email: email.to_owned(),
                user_uid,
                role: Some(role),
            },
            Duration::seconds(ACCESS_TOKEN_TTL_SECS),
            false,
        )
    }

    pub fn issue_refresh(&self, email: &str, user_uid: Uuid) -> anyhow::Result<String> {
        self.issue(
            TokenUser {
                email: email.to_owned(),
                user_uid,
                role: None,
            },
            Duration::days(REFRESH_TOKEN_TTL_DAYS),
            true,
        )
    }

    pub fn decode(&self, token: &str) -> Result<Claims, TokenError> {
        let validation = Validation::new(self.algorithm);
        decode::<Claims>(token, &self.decoding, &validation)
            .map(|data| data.claims)
            .map_err(|e| match e.kind() {
                jsonwebtoken::errors::ErrorKind::ExpiredSignature => TokenError::Expired,
                _ => TokenError::Invalid(e.to_string()),
            })
    }
}
