use fred::prelude::*;

#[tracing::instrument(skip(url), err)]
pub async fn connect(url: &str) -> anyhow::Result<fred::clients::Pool> {
    let config = fred::types::config::Config::from_url(url)?;
    let pool = fred::clients::Pool::new(config, None, None, None, 4)?;
    pool.init().await?;

    tracing::info!("connected to valkey");
    Ok(pool)
}

/// Set `key` to a marker value that expires after `ttl_secs`.
pub async fn set_flag(
    pool: &fred::clients::Pool,
    key: &str,
    ttl_secs: i64,
) -> Result<(), fred::error::Error> {
    pool.set::<(), _, _>(key, "1", Some(Expiration::EX(ttl_secs.max(1))), None, false)
        .await
}

pub async fn has_flag(pool: &fred::clients::Pool, key: &str) -> Result<bool, fred::error::Error> {
    let count: i64 = pool.exists(key).await?;
    Ok(count > 0)
}
