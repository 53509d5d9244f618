use fred::interfaces::KeysInterface;
use fred::types::ExpireOptions;

use crate::error::ApiError;

/// Fixed-window rate limiter backed by Valkey.
///
/// Increments a counter keyed on `rate:{prefix}:{identifier}` and makes sure
/// it carries a TTL of `window_secs`. Returns `Err(ApiError::TooManyRequests)`
/// when the counter exceeds `max_attempts`.
pub async fn check_rate(
    valkey: &fred::clients::Pool,
    prefix: &str,
    identifier: &str,
    max_attempts: u64,
    window_secs: i64,
) -> Result<(), ApiError> {
    let key = format!("rate:{prefix}:{identifier}");

    let count: u64 = valkey.incr(&key).await?;

    // NX leaves a running window alone but repairs a key whose first EXPIRE was lost
    let _: bool = valkey
        .expire(&key, window_secs, Some(ExpireOptions::NX))
        .await?;

    if count > max_attempts {
        tracing::warn!(prefix, identifier, count, "rate limit exceeded");
        return Err(ApiError::TooManyRequests);
    }

    Ok(())
}

/// Per-minute budget keyed on the route name and client address.
pub async fn per_minute(
    valkey: &fred::clients::Pool,
    route: &str,
    client_ip: &str,
    max_attempts: u64,
) -> Result<(), ApiError> {
    check_rate(valkey, route, client_ip, max_attempts, 60).await
}
