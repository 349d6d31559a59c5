//! `autoguard-schedulerd`: the singleton scheduler process driving the
//! periodic ticks (blacklist re-materialize, expiry cleanup, stats
//! aggregation + cloak-log drain, delayed-queue promotion, retention
//! sweep, due-source enqueueing). Same composition-root and liveness
//! shape as `autoguard-workerd`; this process must run as exactly one
//! instance, since several ticks (retention sweep, due-source
//! enqueueing) are not idempotent under concurrent execution.

use std::sync::Arc;

use autoguard_blacklist::Materializer;
use autoguard_config::Config;
use autoguard_fast::FastStore;
use autoguard_jobs::Scheduler;
use autoguard_store::Database;
use axum::routing::get;
use axum::{Json, Router};
use serde::Serialize;
use tokio_util::sync::CancellationToken;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Serialize)]
struct HealthResponse {
    status: &'static str,
    version: &'static str,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = Arc::new(Config::from_env()?);

    let store = Arc::new(Database::connect(&config.database_url).await?);
    store.migrate().await?;
    let fast = Arc::new(FastStore::connect(&config.redis_url).await?);

    let materializer = Arc::new(Materializer::new(store.clone(), fast.clone()));
    let scheduler = Arc::new(Scheduler::new(store.clone(), fast.clone(), config.clone(), materializer));

    let shutdown = CancellationToken::new();

    let health_app = Router::new().route("/healthz", get(healthz));
    let health_port = config.health_port;
    let health_listener = tokio::net::TcpListener::bind(("0.0.0.0", health_port)).await?;
    let health_shutdown = shutdown.clone();
    let health_task = tokio::spawn(async move {
        axum::serve(health_listener, health_app)
            .with_graceful_shutdown(async move { health_shutdown.cancelled().await })
            .await
    });

    let scheduler_shutdown = shutdown.clone();
    let scheduler_task = tokio::spawn(async move { scheduler.run(scheduler_shutdown).await });

    tracing::info!(health_port, "autoguard-schedulerd running");
    wait_for_signal().await;
    tracing::info!("signal received, shutting down autoguard-schedulerd");
    shutdown.cancel();

    let _ = scheduler_task.await;
    let _ = health_task.await;
    Ok(())
}

async fn healthz() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "healthy",
        version: env!("CARGO_PKG_VERSION"),
    })
}

async fn wait_for_signal() {
    let ctrl_c = async {
        tokio::signal::ctrl_c().await.expect("failed to install SIGINT handler");
    };

    #[cfg(unix)]
    let terminate = async {
        use tokio::signal::unix::{signal, SignalKind};
        signal(SignalKind::terminate())
            .expect("failed to install SIGTERM handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {}
        _ = terminate => {}
    }
}
