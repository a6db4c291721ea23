//! BiblioFlow Server - School Library Management
//!
//! REST API server for students, books and borrows.

use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::Context;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, Layer};

use biblioflow_server::{
    api,
    config::{AppConfig, LogFormat, LoggingConfig, StorageBackend},
    repository::{memory::MemoryRepository, postgres::PgRepository, Repository},
    AppState,
};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load environment variables from .env file
    dotenvy::dotenv().ok();

    // Load configuration
    let config = AppConfig::load().context("Failed to load configuration")?;

    // Initialize tracing; the guard flushes the file writer on exit
    let _guard = init_tracing(&config.logging);

    tracing::info!("Starting BiblioFlow Server v{}", env!("CARGO_PKG_VERSION"));

    let repository: Repository = match config.database.backend {
        StorageBackend::Postgres => {
            let store = PgRepository::connect(&config.database)
                .await
                .context("Failed to connect to database")?;
            tracing::info!("Connected to database");

            store.migrate().await.context("Failed to run database migrations")?;
            tracing::info!("Database migrations completed");
            Arc::new(store)
        }
        StorageBackend::Memory => {
            tracing::warn!("Using in-memory storage; data is lost on shutdown");
            Arc::new(MemoryRepository::new())
        }
    };

    let addr = SocketAddr::new(
        config.server.host.parse().context("Invalid host address")?,
        config.server.port,
    );

    let state = AppState::new(config, repository);
    let app = api::router(state);

    tracing::info!("Server listening on http://{}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}

fn init_tracing(logging: &LoggingConfig) -> Option<WorkerGuard> {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| format!("biblioflow_server={},tower_http=debug", logging.level).into());

    let stdout = match logging.format {
        LogFormat::Pretty => tracing_subscriber::fmt::layer().boxed(),
        LogFormat::Json => tracing_subscriber::fmt::layer().json().boxed(),
    };

    let (file, guard) = match &logging.directory {
        Some(dir) => {
            let appender = tracing_appender::rolling::daily(dir, "biblioflow.log");
            let (writer, guard) = tracing_appender::non_blocking(appender);
            let layer = tracing_subscriber::fmt::layer()
                .json()
                .with_ansi(false)
                .with_writer(writer);
            (Some(layer), Some(guard))
        }
        None => (None, None),
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(stdout)
        .with(file)
        .init();

    guard
}
