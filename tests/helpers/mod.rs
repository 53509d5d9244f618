#![allow(dead_code)]

use axum::Router;
use axum::body::Body;
use axum::http::{Method, Request, StatusCode};
use http_body_util::BodyExt;
use serde_json::Value;
use sqlx::PgPool;
use tower::ServiceExt;
use uuid::Uuid;

use footfit::auth::url_token::Purpose;
use footfit::config::Config;
use footfit::store::AppState;

pub const ADMIN_EMAIL: &str = "admin@footfit.test";
pub const ADMIN_PASSWORD: &str = "AdminPass123!";
pub const USER_PASSWORD: &str = "SecurePass123!";

/// Build a test `AppState` from the given pool.
///
/// - Bootstraps the admin user (`ADMIN_EMAIL` / `ADMIN_PASSWORD`)
/// - Connects to real Valkey; keys are scoped by per-request client
///   addresses and token ids, so no flush is needed between tests
/// - SMTP is unconfigured, so outgoing email is skipped
pub async fn test_state(pool: PgPool) -> AppState {
    footfit::store::bootstrap::run(&pool, Some(ADMIN_EMAIL), Some(ADMIN_PASSWORD))
        .await
        .expect("bootstrap failed");

    let redis_url =
        std::env::var("REDIS_URL").unwrap_or_else(|_| "redis://localhost:6379".into());
    let valkey = footfit::store::valkey::connect(&redis_url)
        .await
        .expect("valkey connection failed");

    let config = Config {
        listen: "127.0.0.1:0".into(),
        database_url: "postgres://localhost/test".into(),
        redis_url,
        jwt_secret: format!("test-secret-{}", Uuid::new_v4()),
        jwt_algorithm: jsonwebtoken::Algorithm::HS256,
        smtp_host: "localhost".into(),
        smtp_port: 587,
        smtp_username: None,
        smtp_password: None,
        app_name: "FootFit".into(),
        domain: "footfit.test".into(),
        cors_origins: vec![],
        trust_proxy_headers: true,
        admin_email: None,
        admin_password: None,
    };

    AppState::new(pool, valkey, config)
}

/// Build the full API router with the given state.
pub fn test_router(state: AppState) -> Router {
    footfit::api::router().with_state(state)
}

/// A fresh client address, so per-IP rate limits never collide across
/// requests unless a test pins one deliberately.
pub fn fresh_ip() -> String {
    let b = Uuid::new_v4();
    let b = b.as_bytes();
    format!("10.{}.{}.{}", b[0], b[1], b[2])
}

/// Login as the bootstrap admin user. Returns the access token.
pub async fn admin_login(app: &Router) -> String {
    let (status, body) = post_json(
        app,
        "",
        "/api/v1/auth/login",
        serde_json::json!({ "email": ADMIN_EMAIL, "password": ADMIN_PASSWORD }),
    )
    .await;
    assert_eq!(status, StatusCode::OK, "admin login failed: {body}");
    body["access_token"]
        .as_str()
        .expect("login response missing access_token")
        .to_owned()
}

/// Sign up a user with the minimal required fields.
pub async fn signup(app: &Router, username: &str, email: &str) -> (StatusCode, Value) {
    post_json(
        app,
        "",
        "/api/v1/auth/signup",
        serde_json::json!({
            "username": username,
            "email": email,
            "first_name": "Test",
            "last_name": "User",
            "password": USER_PASSWORD,
        }),
    )
    .await
}

/// Follow the emailed verification link for `email`.
pub async fn verify(app: &Router, state: &AppState, email: &str) {
    let token = state
        .links
        .generate(email, Purpose::EmailVerification)
        .unwrap();
    let (status, body) = get_json(app, "", &format!("/api/v1/auth/verify/{token}")).await;
    assert_eq!(status, StatusCode::OK, "verify failed: {body}");
}

/// Log in and return the whole response body.
pub async fn login(app: &Router, email: &str, password: &str) -> (StatusCode, Value) {
    post_json(
        app,
        "",
        "/api/v1/auth/login",
        serde_json::json!({ "email": email, "password": password }),
    )
    .await
}

/// Sign up, verify, and log in a user. Returns `(uid, access_token, refresh_token)`.
pub async fn create_user(
    app: &Router,
    state: &AppState,
    username: &str,
    email: &str,
) -> (Uuid, String, String) {
    let (status, body) = signup(app, username, email).await;
    assert_eq!(status, StatusCode::CREATED, "signup failed: {body}");
    let uid = Uuid::parse_str(body["user"]["uid"].as_str().unwrap()).unwrap();

    verify(app, state, email).await;

    let (status, body) = login(app, email, USER_PASSWORD).await;
    assert_eq!(status, StatusCode::OK, "user login failed: {body}");
    let access = body["access_token"].as_str().unwrap().to_owned();
    let refresh = body["refresh_token"].as_str().unwrap().to_owned();

    (uid, access, refresh)
}

/// Send a request from `ip` with optional Bearer auth and JSON body.
pub async fn send_from(
    app: &Router,
    ip: &str,
    method: Method,
    token: &str,
    path: &str,
    body: Option<Value>,
) -> (StatusCode, Value) {
    let mut builder = Request::builder()
        .method(method)
        .uri(path)
        .header("X-Forwarded-For", ip);
    if !token.is_empty() {
        builder = builder.header("Authorization", format!("Bearer {token}"));
    }
    let req = match body {
        Some(body) => builder
            .header("Content-Type", "application/json")
            .body(Body::from(serde_json::to_string(&body).unwrap()))
            .unwrap(),
        None => builder.body(Body::empty()).unwrap(),
    };

    let resp = app.clone().oneshot(req).await.unwrap();
    let status = resp.status();
    let body = body_json(resp).await;
    (status, body)
}

/// Send a GET request with Bearer auth.
pub async fn get_json(app: &Router, token: &str, path: &str) -> (StatusCode, Value) {
    send_from(app, &fresh_ip(), Method::GET, token, path, None).await
}

/// Send a POST request with Bearer auth and JSON body.
pub async fn post_json(app: &Router, token: &str, path: &str, body: Value) -> (StatusCode, Value) {
    send_from(app, &fresh_ip(), Method::POST, token, path, Some(body)).await
}

/// Send a POST request with Bearer auth and no body.
pub async fn post_empty(app: &Router, token: &str, path: &str) -> (StatusCode, Value) {
    send_from(app, &fresh_ip(), Method::POST, token, path, None).await
}

/// Send a PATCH request with Bearer auth and JSON body.
pub async fn patch_json(app: &Router, token: &str, path: &str, body: Value) -> (StatusCode, Value) {
    send_from(app, &fresh_ip(), Method::PATCH, token, path, Some(body)).await
}

/// Send a PUT request with Bearer auth and JSON body.
pub async fn put_json(app: &Router, token: &str, path: &str, body: Value) -> (StatusCode, Value) {
    send_from(app, &fresh_ip(), Method::PUT, token, path, Some(body)).await
}

/// Extract JSON body from a response.
async fn body_json(resp: axum::http::Response<Body>) -> Value {
    let bytes = resp.into_body().collect().await.unwrap().to_bytes();
    if bytes.is_empty() {
        return Value::Null;
    }
    serde_json::from_slice(&bytes).unwrap_or(Value::Null)
}
