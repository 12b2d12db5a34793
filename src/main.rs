//! Courtside Backend Service
//!
//! Serves the booking JSON API and runs the monthly settlement scheduler.

use anyhow::Context;
use courtside_backend::api::build_router;
use courtside_backend::config::AppConfig;
use courtside_backend::database::{create_pool, run_migrations};
use courtside_backend::services::SettlementScheduler;
use courtside_backend::{AppState, LOCAL_UPLOAD_DIR};
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::net::TcpListener;
use tower_http::services::ServeDir;
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

fn init_tracing(config: &AppConfig) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        format!(
            "courtside_backend={},sqlx=warn,tower_http=info",
            config.log_level
        )
        .into()
    });

    if config.is_production() {
        tracing_subscriber::fmt().json().with_env_filter(filter).init();
    } else {
        tracing_subscriber::fmt().with_env_filter(filter).init();
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenv::dotenv().ok();

    let config = AppConfig::from_env()
        .map_err(anyhow::Error::msg)
        .context("Invalid configuration")?;

    init_tracing(&config);

    info!("Courtside backend starting");
    info!("Environment: {}", config.environment);
    info!("Log level: {}", config.log_level);

    // Database
    info!("Connecting to database...");
    let pool = create_pool(&config.database)
        .await
        .context("Failed to create database pool")?;
    info!("Database pool ready (max {} connections)", config.database.max_connections);

    run_migrations(&pool, None)
        .await
        .context("Database migration failed")?;
    info!("Database migrations completed");

    // Services
    let state = Arc::new(AppState::new(pool, &config).context("Failed to initialize services")?);

    let scheduler_handle = if config.settlement.schedule_enabled {
        let scheduler = SettlementScheduler::new(state.settlement.clone());
        Some(tokio::spawn(async move {
            scheduler.start().await;
        }))
    } else {
        warn!("SETTLEMENT_SCHEDULE_ENABLED=false, monthly settlement must be run manually");
        None
    };

    // HTTP
    let mut app = build_router(state);
    if config.storage.url.is_none() {
        app = app.nest_service("/uploads", ServeDir::new(LOCAL_UPLOAD_DIR));
    }

    let addr = SocketAddr::from(([0, 0, 0, 0], config.http_port));
    let listener = TcpListener::bind(addr)
        .await
        .with_context(|| format!("Failed to bind {}", addr))?;
    info!("HTTP API listening on {}", addr);

    let server = async move {
        axum::serve(listener, app)
            .with_graceful_shutdown(async {
                tokio::signal::ctrl_c().await.ok();
                info!("Shutdown signal received, shutting down gracefully...");
            })
            .await
    };

    tokio::select! {
        result = server => {
            result.context("HTTP server error")?;
        }
        _ = async {
            match scheduler_handle {
                Some(handle) => {
                    handle.await.ok();
                }
                None => futures::future::pending::<()>().await,
            }
        } => {
            error!("Settlement scheduler exited unexpectedly");
        }
    }

    info!("Courtside backend shutdown complete");
    Ok(())
}
