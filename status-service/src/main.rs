use anyhow::Context;
use axum::{routing::get, Router};
use clap::Parser;
use status_service::config::{Config, DEFAULT_LOG_FILTER};
use status_service::db::{self, PgStatusStore};
use status_service::{metrics, rest};
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() {
    let config = Config::parse();

    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new(DEFAULT_LOG_FILTER)),
        )
        .init();

    info!("Starting device status service");
    info!("HTTP server: {}", config.http_addr);
    info!("Database: {}", config.database.redacted_target());

    if let Err(e) = run(config).await {
        error!("{:#}", e);
        std::process::exit(1);
    }

    info!("Shutting down");
}

async fn run(config: Config) -> anyhow::Result<()> {
    metrics::init_metrics();

    // Schema must be in place before the first request is accepted.
    let pool = db::make_pool(&config.database)
        .await
        .context("Failed to initialize database")?;
    let store = PgStatusStore::new(pool);

    let app = Router::new()
        .route("/metrics", get(metrics_handler))
        .merge(rest::create_router(store));
    let app = rest::apply_layers(app, &config.http);

    let listener = tokio::net::TcpListener::bind(&config.http_addr)
        .await
        .with_context(|| format!("Failed to bind to {}", config.http_addr))?;

    info!("HTTP server listening on {}", config.http_addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("HTTP server error")?;

    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        error!("Failed to listen for shutdown signal: {}", e);
        std::future::pending::<()>().await;
    }
    info!("Received shutdown signal");
}

async fn metrics_handler() -> String {
    metrics::gather_metrics()
}
