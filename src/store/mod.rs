pub mod bootstrap;
pub mod pool;
pub mod valkey;

use std::sync::Arc;

use sqlx::PgPool;

use crate::auth::jwt::TokenSigner;
use crate::auth::url_token::UrlTokenSigner;
use crate::config::Config;

#[derive(Clone)]
pub struct AppState {
    pub pool: PgPool,
    pub valkey: fred::clients::Pool,
    pub jwt: TokenSigner,
    pub links: UrlTokenSigner,
    pub config: Arc<Config>,
}

impl AppState {
    pub fn new(pool: PgPool, valkey: fred::clients::Pool, config: Config) -> Self {
        Self {
            pool,
            valkey,
            jwt: TokenSigner::new(&config.jwt_secret, config.jwt_algorithm),
            links: UrlTokenSigner::new(&config.jwt_secret),
            config: Arc::new(config),
        }
    }
}
