//! HTTP API handlers.

use axum::{extract::State, http::StatusCode, response::IntoResponse, Json};
use metrics_exporter_prometheus::PrometheusHandle;
use serde::Serialize;
use std::sync::Arc;

use crate::engine::Engine;
use crate::ledger::{LedgerCounts, LedgerEntry};

/// Application state shared with handlers.
#[derive(Clone)]
pub struct AppState {
    /// Engine being observed.
    pub engine: Arc<Engine>,
    /// Prometheus recorder handle, when one is installed.
    pub metrics: Option<PrometheusHandle>,
}

impl std::fmt::Debug for AppState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppState")
            .field("engine", &self.engine)
            .field("metrics", &self.metrics.is_some())
            .finish()
    }
}

impl AppState {
    /// Create new app state.
    pub fn new(engine: Arc<Engine>) -> Self {
        Self {
            engine,
            metrics: None,
        }
    }

    /// Attach a Prometheus handle for `/metrics`.
    pub fn with_metrics(mut self, handle: PrometheusHandle) -> Self {
        self.metrics = Some(handle);
        self
    }

    /// Check if the engine has been initialized.
    pub fn is_ready(&self) -> bool {
        self.engine.is_initialized()
    }
}

/// Health check response.
#[derive(Debug, Serialize)]
pub struct HealthResponse {
    /// Status: "ok".
    pub status: &'static str,
}

/// Readiness check response.
#[derive(Debug, Serialize)]
pub struct ReadyResponse {
    /// Whether the engine is initialized.
    pub ready: bool,
}

/// Status response.
#[derive(Debug, Serialize)]
pub struct StatusResponse {
    /// Service status.
    pub status: &'static str,
    /// Whether `init` has run.
    pub initialized: bool,
    /// Directory holding `infos.yml`.
    pub resource_dir: String,
    /// Base URL requests are sent to.
    pub base_url: Option<String>,
    /// Whether the route file enables logs.
    pub logging_enabled: bool,
    /// Number of declared routes.
    pub routes: usize,
    /// Ledger entries per status.
    pub requests: LedgerCounts,
}

/// One declared route.
#[derive(Debug, Serialize)]
pub struct RouteInfo {
    /// Route key.
    pub name: String,
    /// Path template.
    pub url: String,
}

/// Health check handler - always returns 200.
pub async fn health() -> impl IntoResponse {
    Json(HealthResponse { status: "ok" })
}

/// Readiness check handler - returns 200 once initialized, 503 otherwise.
pub async fn ready(State(state): State<AppState>) -> impl IntoResponse {
    let ready = state.is_ready();
    let code = if ready {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    };

    (code, Json(ReadyResponse { ready }))
}

/// Status handler - engine summary and ledger counts.
pub async fn status(State(state): State<AppState>) -> impl IntoResponse {
    let engine = &state.engine;
    let status = if engine.is_initialized() { "running" } else { "starting" };

    Json(StatusResponse {
        status,
        initialized: engine.is_initialized(),
        resource_dir: engine.resource_dir().display().to_string(),
        base_url: engine.effective_base_url(),
        logging_enabled: engine.logging_enabled(),
        routes: engine.routes().len(),
        requests: engine.ledger().counts(),
    })
}

/// Routes handler - declared routes sorted by name.
pub async fn routes(State(state): State<AppState>) -> Json<Vec<RouteInfo>> {
    let routes = state
        .engine
        .routes()
        .iter()
        .map(|(name, url)| RouteInfo {
            name: name.to_string(),
            url: url.to_string(),
        })
        .collect();

    Json(routes)
}

/// Requests handler - ledger snapshot ordered by id.
pub async fn requests(State(state): State<AppState>) -> Json<Vec<LedgerEntry>> {
    Json(state.engine.ledger().list())
}

/// Metrics handler - Prometheus text format, 404 without a recorder.
pub async fn metrics(State(state): State<AppState>) -> impl IntoResponse {
    match &state.metrics {
        Some(handle) => (StatusCode::OK, handle.render()),
        None => (StatusCode::NOT_FOUND, "metrics recorder not installed".to_string()),
    }
}
