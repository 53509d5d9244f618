use std::net::SocketAddr;

use axum::http::HeaderValue;
use clap::{Parser, Subcommand};
use tokio::signal;
use tower_http::cors::{AllowHeaders, AllowMethods, AllowOrigin, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

use footfit::config::Config;
use footfit::{api, store};

#[derive(Parser)]
#[command(name = "footfit")]
#[command(about = "Foot fitness coaching API server")]
struct Cli {
    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand)]
enum Command {
    /// Apply migrations, bootstrap the admin user, and serve the API (default)
    Serve,
    /// Apply pending database migrations and exit
    Migrate,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // SMTP STARTTLS needs a process-wide provider when several are linked.
    let _ = rustls::crypto::ring::default_provider().install_default();

    tracing_subscriber::registry()
        .with(EnvFilter::try_from_env("FOOTFIT_LOG").unwrap_or_else(|_| "info".into()))
        .with(fmt::layer().json())
        .init();

    let cfg = Config::load()?;

    match cli.command.unwrap_or(Command::Serve) {
        Command::Migrate => {
            let pool = store::pool::connect(&cfg.database_url).await?;
            store::pool::migrate(&pool).await?;
            Ok(())
        }
        Command::Serve => serve(cfg).await,
    }
}

async fn serve(cfg: Config) -> anyhow::Result<()> {
    let pool = store::pool::connect(&cfg.database_url).await?;
    store::pool::migrate(&pool).await?;

    let valkey = store::valkey::connect(&cfg.redis_url).await?;

    store::bootstrap::run(
        &pool,
        cfg.admin_email.as_deref(),
        cfg.admin_password.as_deref(),
    )
    .await?;

    if !cfg.smtp_configured() {
        tracing::warn!("SMTP credentials not set, outgoing email is disabled");
    }

    let addr: SocketAddr = cfg.listen.parse()?;
    let cors = cors_layer(&cfg.cors_origins);
    let state = store::AppState::new(pool, valkey, cfg);

    let app = api::router()
        .with_state(state)
        .layer(cors)
        .layer(TraceLayer::new_for_http());

    tracing::info!(%addr, "starting footfit");

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .with_graceful_shutdown(shutdown_signal())
    .await?;

    tracing::info!("footfit stopped");
    Ok(())
}

/// Configured origins with credentials; methods and headers are mirrored
/// from the preflight since wildcards are not allowed alongside credentials.
fn cors_layer(origins: &[String]) -> CorsLayer {
    let origins: Vec<HeaderValue> = origins
        .iter()
        .filter_map(|o| match o.parse() {
            Ok(v) => Some(v),
            Err(_) => {
                tracing::warn!(origin = %o, "ignoring invalid CORS origin");
                None
            }
        })
        .collect();

    CorsLayer::new()
        .allow_origin(AllowOrigin::list(origins))
        .allow_methods(AllowMethods::mirror_request())
        .allow_headers(AllowHeaders::mirror_request())
        .allow_credentials(true)
}

async fn shutdown_signal() {
    let ctrl_c = async {
        signal::ctrl_c()
            .await
            .expect("failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("failed to install SIGTERM handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {},
        () = terminate => {},
    }

    tracing::info!("shutdown signal received");
}
