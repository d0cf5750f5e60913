//! NoiseNullifier API Server
//!
//! Receives PagerDuty webhooks and turns acknowledged incidents into
//! Alertmanager silences. Deliveries are accepted immediately and processed
//! in the background by the dispatcher's worker pool.

use axum::{
    body::Bytes,
    extract::State,
    http::{header, HeaderMap, StatusCode},
    response::IntoResponse,
    routing::{get, post},
    Json, Router,
};
use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusHandle};
use serde::Serialize;
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::net::TcpListener;
use tower::ServiceBuilder;
use tower_governor::GovernorLayer;
use tower_http::trace::TraceLayer;
use tracing::{debug, error, info, warn};
use tracing_subscriber::{EnvFilter, FmtSubscriber};

pub mod config;
pub mod rate_limit;

use alertmanager::AlertmanagerClient;
use dispatcher::{Pipeline, RawEvent, SubmitError, WorkerPool};
use pagerduty::{PagerDutyClient, SIGNATURE_HEADER};

use crate::config::{BridgeConfig, ConfigError};
use crate::rate_limit::{create_governor_config, RateLimitConfig};

/// Application state shared across handlers
pub struct AppState {
    /// Queue into the background pipeline
    pub pool: WorkerPool,
    /// Prometheus exporter, absent when no recorder was installed
    pub metrics: Option<PrometheusHandle>,
    /// Version string
    pub version: String,
    /// Start time
    pub start_time: std::time::Instant,
}

impl AppState {
    /// Create new application state
    pub fn new(pool: WorkerPool, metrics: Option<PrometheusHandle>) -> Self {
        Self {
            pool,
            metrics,
            version: env!("CARGO_PKG_VERSION").to_string(),
            start_time: std::time::Instant::now(),
        }
    }
}

/// Health response
#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: String,
    pub timestamp: u64,
    pub version: String,
    pub uptime_seconds: u64,
}

/// Create the application router
pub fn create_router(
    state: Arc<AppState>,
    rate_limit: &RateLimitConfig,
) -> Result<Router, ConfigError> {
    let governor = create_governor_config(rate_limit)?;

    let webhook = Router::new()
        .route("/webhook", post(webhook_handler))
        .layer(GovernorLayer { config: governor });

    Ok(Router::new()
        .route("/health", get(health_handler))
        .route("/metrics", get(metrics_handler))
        .merge(webhook)
        .layer(ServiceBuilder::new().layer(TraceLayer::new_for_http()))
        .with_state(state))
}

/// Accept a webhook delivery and queue it for processing
///
/// Answers before the payload is verified or parsed; processing failures
/// never reach PagerDuty.
async fn webhook_handler(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    body: Bytes,
) -> StatusCode {
    info!("Received webhook");
    let signature = headers
        .get(SIGNATURE_HEADER)
        .and_then(|value| value.to_str().ok())
        .map(str::to_string);

    match state.pool.try_submit(RawEvent::new(body.to_vec(), signature)) {
        Ok(()) => StatusCode::ACCEPTED,
        Err(SubmitError::QueueFull) => {
            warn!("Event queue is full, refusing webhook");
            StatusCode::SERVICE_UNAVAILABLE
        }
        Err(SubmitError::Closed) => {
            error!("Event dispatcher is not running, refusing webhook");
            StatusCode::SERVICE_UNAVAILABLE
        }
    }
}

/// Health check handler
async fn health_handler(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    let timestamp = std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or(0);

    Json(HealthResponse {
        status: "healthy".to_string(),
        timestamp,
        version: state.version.clone(),
        uptime_seconds: state.start_time.elapsed().as_secs(),
    })
}

/// Prometheus scrape handler
async fn metrics_handler(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    match &state.metrics {
        Some(handle) => (
            StatusCode::OK,
            [(header::CONTENT_TYPE, "text/plain; version=0.0.4")],
            handle.render(),
        )
            .into_response(),
        None => StatusCode::NOT_FOUND.into_response(),
    }
}

/// Initialize logging
///
/// Honors `RUST_LOG`, defaulting to `info`.
pub fn init_logging() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let subscriber = FmtSubscriber::builder()
        .with_env_filter(filter)
        .with_target(true)
        .finish();

    if tracing::subscriber::set_global_default(subscriber).is_err() {
        debug!("Tracing subscriber already installed");
    }
}

/// Install the global Prometheus recorder
pub fn init_metrics() -> Result<PrometheusHandle, metrics_exporter_prometheus::BuildError> {
    PrometheusBuilder::new().install_recorder()
}

/// Serve the router until Ctrl-C, then drain open connections
pub async fn serve(listener: TcpListener, app: Router) -> std::io::Result<()> {
    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .with_graceful_shutdown(shutdown_signal())
    .await
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        error!("Failed to listen for shutdown signal: {}", e);
        std::future::pending::<()>().await;
    }
    info!("Shutdown signal received");
}

/// Run the bridge with the given configuration
pub async fn run_server(config: BridgeConfig) -> Result<(), Box<dyn std::error::Error>> {
    info!("Starting NoiseNullifier with {:?}", config);
    let metrics = init_metrics()?;

    let timeout = config.request_timeout();
    let incidents = PagerDutyClient::new(&config.apikey, &config.pagerduty_api_url, timeout)?;
    let sink = AlertmanagerClient::new(timeout)?;
    let pipeline = Arc::new(Pipeline::new(config.secret.clone(), incidents, sink));

    let (pool, dispatcher) = WorkerPool::channel(config.pool_config());
    let worker = tokio::spawn(dispatcher.run(pipeline));

    let state = Arc::new(AppState::new(pool, Some(metrics)));
    let app = create_router(state, &config.rate_limit())?;

    let listener = TcpListener::bind(&config.listen_addr).await?;
    info!("Listening on {} for incoming webhooks", config.listen_addr);
    serve(listener, app).await?;

    worker.await?;
    info!("NoiseNullifier stopped");
    Ok(())
}
