use uuid::Uuid;

use crate::auth::jwt::Claims;
use crate::error::ApiError;
use crate::store::valkey;

fn key(jti: Uuid) -> String {
    format!("blocklist:{jti}")
}

/// Revoke a token until it would have expired anyway.
#[tracing::instrument(skip(pool, claims), fields(jti = %claims.jti), err)]
pub async fn revoke(pool: &fred::clients::Pool, claims: &Claims) -> Result<(), ApiError> {
    valkey::set_flag(pool, &key(claims.jti), claims.remaining_secs()).await?;
    tracing::info!(email = %claims.user.email, "token revoked");
    Ok(())
}

pub async fn is_revoked(pool: &fred::clients::Pool, jti: Uuid) -> Result<bool, ApiError> {
    Ok(valkey::has_flag(pool, &key(jti)).await?)
}
