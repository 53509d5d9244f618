use sqlx::PgPool;
use uuid::Uuid;

use crate::auth::password;
use crate::auth::role::UserRole;

/// Create the configured administrator on first run.
///
/// Does nothing when no admin credentials are configured or when a user with
/// the admin email already exists, so it is safe to call on every start.
#[tracing::instrument(skip(pool, admin_password), err)]
pub async fn run(
    pool: &PgPool,
    admin_email: Option<&str>,
    admin_password: Option<&str>,
) -> anyhow::Result<()> {
    let (Some(email), Some(plain)) = (admin_email, admin_password) else {
        tracing::debug!("no admin credentials configured, bootstrap skipped");
        return Ok(());
    };

    let exists: bool = sqlx::query_scalar("SELECT EXISTS(SELECT 1 FROM users WHERE email = $1)")
        .bind(email)
        .fetch_one(pool)
        .await?;

    if exists {
        tracing::info!("bootstrap skipped, admin already exists");
        return Ok(());
    }

    let password_hash = password::hash_password(plain)?;
    let admin_id = Uuid::new_v4();
    let username = email.split('@').next().unwrap_or("admin");

    sqlx::query(
        "INSERT INTO users (uid, username, email, first_name, last_name, password_hash, role, is_verified)
         VALUES ($1, $2, $3, 'Admin', 'User', $4, $5, true)",
    )
    .bind(admin_id)
    .bind(username)
    .bind(email)
    .bind(&password_hash)
    .bind(UserRole::Admin.as_str())
    .execute(pool)
    .await?;

    tracing::info!(user_id = %admin_id, "admin user created");

    Ok(())
}
