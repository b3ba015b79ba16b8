//! HTTP router: service info, health, stats, Prometheus metrics, and the
//! WebSocket upgrade endpoint.

use crate::matchmaking::Matchmaker;
use crate::metrics::MetricsCollector;
use crate::relay::MessagingRelay;
use crate::server::ws::ws_handler;
use crate::session::SessionTracker;
use axum::{
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::get,
    Json, Router,
};
use prometheus::{Encoder, TextEncoder};
use serde_json::json;
use std::sync::Arc;
use tracing::{debug, error};

/// Shared state for all HTTP and WebSocket handlers
#[derive(Clone)]
pub struct ServerState {
    pub matchmaker: Arc<Matchmaker>,
    pub relay: Arc<MessagingRelay>,
    pub sessions: Arc<SessionTracker>,
    pub metrics: Arc<MetricsCollector>,
    pub service_name: String,
}

/// Create the axum router with all endpoints
pub fn create_router(state: ServerState) -> Router {
    Router::new()
        .route("/", get(root_handler))
        .route("/health", get(health_handler))
        .route("/stats", get(stats_handler))
        .route("/metrics", get(metrics_handler))
        .route("/ws", get(ws_handler))
        .with_state(state)
}

/// Root endpoint handler - shows service information
async fn root_handler(State(state): State<ServerState>) -> impl IntoResponse {
    let info = json!({
        "service": state.service_name,
        "version": env!("CARGO_PKG_VERSION"),
        "endpoints": [
            "/health",
            "/stats",
            "/metrics",
            "/ws"
        ]
    });

    Json(info)
}

/// Lightweight health check endpoint handler. The process serving this
/// request is the whole system; reachable means healthy.
async fn health_handler(State(state): State<ServerState>) -> impl IntoResponse {
    debug!("Health check requested");

    (
        StatusCode::OK,
        Json(json!({
            "status": "healthy",
            "service": state.service_name,
            "version": env!("CARGO_PKG_VERSION")
        })),
    )
}

/// Detailed service statistics endpoint handler
async fn stats_handler(State(state): State<ServerState>) -> impl IntoResponse {
    debug!("Stats endpoint requested");

    let stats = match state.matchmaker.stats() {
        Ok(stats) => stats,
        Err(e) => {
            error!("Failed to read matchmaker stats: {}", e);
            return (
                StatusCode::SERVICE_UNAVAILABLE,
                Json(json!({ "error": "Failed to get service stats" })),
            );
        }
    };
    let waiting = state.matchmaker.waiting_count().await.unwrap_or(0);

    (
        StatusCode::OK,
        Json(json!({
            "service": {
                "name": state.service_name,
                "version": env!("CARGO_PKG_VERSION"),
            },
            "matchmaking": {
                "match_requests": stats.match_requests,
                "users_queued": stats.users_queued,
                "users_waiting": waiting,
            },
            "rooms": {
                "active": state.matchmaker.active_rooms(),
                "created": stats.rooms_created,
                "closed": stats.rooms_closed,
            },
            "sessions": {
                "active": state.sessions.len(),
            },
            "timestamp": chrono::Utc::now()
        })),
    )
}

/// Prometheus metrics endpoint handler
async fn metrics_handler(State(state): State<ServerState>) -> Response {
    debug!("Metrics endpoint requested");

    let metric_families = state.metrics.registry().gather();
    let encoder = TextEncoder::new();

    match encoder.encode_to_string(&metric_families) {
        Ok(metrics_output) => Response::builder()
            .status(StatusCode::OK)
            .header("content-type", encoder.format_type())
            .body(metrics_output.into())
            .unwrap_or_else(|_| StatusCode::INTERNAL_SERVER_ERROR.into_response()),
        Err(e) => {
            error!("Failed to encode metrics: {}", e);
            (StatusCode::INTERNAL_SERVER_ERROR, "Failed to encode metrics").into_response()
        }
    }
}
