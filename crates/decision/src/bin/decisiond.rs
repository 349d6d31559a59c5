//! `autoguard-decisiond`: the decision-engine-serving process. The edge
//! process (out of scope; it owns TLS termination, client-IP
//! extraction, and rendering the returned decision as either the money
//! or safe page) calls this process once per request with the request
//! context it trusts, and gets back a `DecisionRecord`. Composition
//! root wires `Database`/`FastStore`, bootstraps and refreshes the
//! hot-reloaded `DecisionSettings` snapshot, and constructs the engine
//! around whatever `IpIntelligence` collaborator is configured —
//! `NullIpIntelligence` until a real provider is wired in, matching the
//! job pipeline's placeholder collaborators.

use std::sync::Arc;

use autoguard_config::Config;
use autoguard_decision::{DecisionEngine, DecisionRequest, NullIpIntelligence, SettingsCache};
use autoguard_fast::FastStore;
use autoguard_store::Database;
use axum::extract::State;
use axum::http::StatusCode;
use axum::routing::{get, post};
use axum::{Json, Router};
use serde::{Deserialize, Serialize};
use tokio_util::sync::CancellationToken;
use tower_http::trace::TraceLayer;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

struct AppState {
    engine: DecisionEngine,
    store: Arc<Database>,
    fast: Arc<FastStore>,
}

#[derive(Debug, Serialize)]
struct HealthResponse {
    status: &'static str,
    version: &'static str,
}

/// Request context the edge process is trusted to have already
/// extracted — per `spec.md` §6, `clientIp` in particular is never
/// re-derived here from a proxy header.
#[derive(Debug, Deserialize)]
struct DecideRequest {
    host: String,
    client_ip: String,
    user_agent: String,
    #[serde(default)]
    referer: Option<String>,
    url: String,
}

#[derive(Debug, Serialize)]
#[serde(tag = "outcome")]
enum DecideResponse {
    #[serde(rename = "decided")]
    Decided(autoguard_decision::DecisionRecord),
    #[serde(rename = "unknown_host")]
    UnknownHost,
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

    let settings = SettingsCache::bootstrap(store.clone()).await;
    let settings_cell = settings.cell();
    let _settings_refresh = settings.spawn_refresh(store.clone(), config.settings_refresh_interval);

    let engine = DecisionEngine::new(fast.clone(), settings_cell, Arc::new(NullIpIntelligence));
    let state = Arc::new(AppState {
        engine,
        store: store.clone(),
        fast: fast.clone(),
    });

    let app = Router::new()
        .route("/healthz", get(healthz))
        .route("/v1/decide", post(decide))
        .layer(TraceLayer::new_for_http())
        .with_state(state);

    let shutdown = CancellationToken::new();
    let listener = tokio::net::TcpListener::bind(("0.0.0.0", config.health_port)).await?;
    tracing::info!(port = config.health_port, "autoguard-decisiond running");

    let shutdown_signal = shutdown.clone();
    let serve = axum::serve(listener, app)
        .with_graceful_shutdown(async move { shutdown_signal.cancelled().await });

    tokio::select! {
        result = serve => result?,
        _ = wait_for_signal() => {
            tracing::info!("signal received, shutting down autoguard-decisiond");
            shutdown.cancel();
        }
    }
    Ok(())
}

async fn healthz() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "healthy",
        version: env!("CARGO_PKG_VERSION"),
    })
}

async fn decide(
    State(state): State<Arc<AppState>>,
    Json(req): Json<DecideRequest>,
) -> Result<Json<DecideResponse>, StatusCode> {
    let routing = autoguard_decision::routing::resolve_offer(&state.fast, &state.store, &req.host).await;
    let Some(routing) = routing else {
        return Ok(Json(DecideResponse::UnknownHost));
    };

    let decision_request = DecisionRequest {
        ip: req.client_ip,
        user_agent: req.user_agent,
        referer: req.referer,
        url: req.url,
        headers: std::collections::HashMap::new(),
    };

    let record = state
        .engine
        .decide(&decision_request, &routing.as_offer_context())
        .await;

    Ok(Json(DecideResponse::Decided(record)))
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
