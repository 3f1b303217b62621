//! Staff microservice
//!
//! A gRPC service exposing create/read/update/delete over staff members,
//! persisted in PostgreSQL and gated by a bearer-token check.

mod api;
mod auth;
mod config;
mod db;
mod errors;
mod models;
mod proto;

use std::future::Future;
use std::path::PathBuf;
use std::sync::Arc;

use clap::Parser;
use tokio::net::TcpListener;
use tonic::transport::server::TcpIncoming;
use tonic::transport::Server;
use tower_http::trace::TraceLayer;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use auth::AuthGate;
use config::{Config, LogFormat};
use db::{PgStaffRepository, StaffStore};

type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// Application state shared across all handlers.
#[derive(Clone)]
pub struct AppState {
    pub store: Arc<dyn StaffStore>,
    pub auth: Arc<AuthGate>,
}

/// Command line flags. Anything not given here comes from the environment.
#[derive(Debug, Parser)]
#[command(name = "staff-service", version, about)]
struct Cli {
    /// Load environment variables from this file before reading configuration
    #[arg(long)]
    env_file: Option<PathBuf>,

    /// Tracing filter, overrides LOG_LEVEL (e.g. "debug" or "staff_service=trace")
    #[arg(long)]
    log_level: Option<String>,

    /// Listen address, overrides STAFF_PORT / GRPC_PORT
    #[arg(long)]
    listen: Option<String>,
}

#[tokio::main]
async fn main() -> Result<(), BoxError> {
    let cli = Cli::parse();

    if let Some(path) = &cli.env_file {
        dotenvy::from_path(path)?;
    }

    // Load configuration
    let mut config = Config::from_env()?;
    if let Some(level) = cli.log_level {
        config.log_level = level;
    }
    if let Some(listen) = cli.listen {
        config.bind_addr = config::normalize_listen_addr(&listen);
    }

    init_tracing(&config);

    tracing::info!("Starting staff service");
    tracing::info!("Database name: {}", config.database_name);
    tracing::info!("Bind address: {}", config.bind_addr);

    // Bootstrap must finish before anything is served
    let pool = db::init_database(&config).await?;

    let state = AppState {
        store: Arc::new(PgStaffRepository::new(pool.clone())),
        auth: Arc::new(AuthGate::from_config(&config.auth).await?),
    };

    let listener = TcpListener::bind(&config.bind_addr).await?;
    tracing::info!("Server listening on {}", listener.local_addr()?);

    serve(state, listener, shutdown_signal()).await?;

    tracing::info!("Server stopped, closing database pool");
    pool.close().await;

    Ok(())
}

/// Initialize logging. `RUST_LOG` wins over the configured level.
fn init_tracing(config: &Config) {
    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&config.log_level));

    let (text, json) = match config.log_format {
        LogFormat::Text => (Some(tracing_subscriber::fmt::layer()), None),
        LogFormat::Json => (None, Some(tracing_subscriber::fmt::layer().json())),
    };

    tracing_subscriber::registry()
        .with(env_filter)
        .with(text)
        .with(json)
        .init();
}

/// Serve the staff service on `listener` until `shutdown` resolves.
///
/// In-flight requests are drained before this returns.
pub async fn serve(
    state: AppState,
    listener: TcpListener,
    shutdown: impl Future<Output = ()>,
) -> Result<(), BoxError> {
    let incoming = TcpIncoming::from_listener(listener, true, None)?;

    Server::builder()
        .layer(TraceLayer::new_for_grpc())
        .add_service(api::staff_service(state))
        .serve_with_incoming_shutdown(incoming, shutdown)
        .await?;

    Ok(())
}

/// Resolves on Ctrl+C or SIGTERM.
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!("Failed to listen for Ctrl+C: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        use tokio::signal::unix::{signal, SignalKind};

        match signal(SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                tracing::error!("Failed to listen for SIGTERM: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    tracing::info!("Shutdown signal received, draining in-flight requests");
}
