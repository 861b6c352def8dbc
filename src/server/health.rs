//! Role, liveness, and metrics endpoints
//!
//! - `/` - Node role: `200 master`, `206 slave`, or `503 down`
//! - `/health` - Liveness: Is the process alive?
//! - `/metrics` - Prometheus metrics in text format

use crate::database::{DatabaseLink, NodeRole};
use crate::server::metrics::SharedMetrics;
use axum::{
    extract::State,
    http::{header::CONTENT_TYPE, StatusCode},
    response::IntoResponse,
    routing::get,
    Router,
};

/// Shared state for the request handlers
#[derive(Clone)]
pub struct ServerState {
    link: DatabaseLink,
    metrics: SharedMetrics,
}

impl ServerState {
    pub fn new(link: DatabaseLink, metrics: SharedMetrics) -> Self {
        Self { link, metrics }
    }
}

/// Status code and body reported for a role
pub fn role_response(role: NodeRole) -> (StatusCode, &'static str) {
    match role {
        NodeRole::Primary => (StatusCode::OK, "master"),
        NodeRole::Replica => (StatusCode::PARTIAL_CONTENT, "slave"),
        NodeRole::Unreachable => (StatusCode::SERVICE_UNAVAILABLE, "down"),
    }
}

/// Role handler
///
/// Queries the database on every request; an absent or failing connection
/// answers `503 down`.
async fn role(State(state): State<ServerState>) -> (StatusCode, &'static str) {
    let role = state.link.classify().await;
    state.metrics.record_classification(role);
    role_response(role)
}

/// Liveness probe handler
///
/// Always returns 200 OK - if this responds, the process is alive.
async fn health() -> (StatusCode, &'static str) {
    (StatusCode::OK, "ok")
}

/// Prometheus metrics handler
async fn metrics(State(state): State<ServerState>) -> impl IntoResponse {
    match state.metrics.encode() {
        Ok(body) => (
            StatusCode::OK,
            [(CONTENT_TYPE, "text/plain; version=0.0.4; charset=utf-8")],
            body,
        )
            .into_response(),
        Err(e) => (
            StatusCode::INTERNAL_SERVER_ERROR,
            format!("Failed to encode metrics: {}", e),
        )
            .into_response(),
    }
}

/// Build the router for the role, health, and metrics endpoints
///
/// Unknown paths fall through to the role handler, so any path a load
/// balancer is pointed at reports the role.
pub fn build_router(link: DatabaseLink, metrics: SharedMetrics) -> Router {
    let state = ServerState::new(link, metrics);

    Router::new()
        .route("/", get(role))
        .route("/health", get(health))
        .route("/metrics", get(self::metrics))
        .fallback(role)
        .with_state(state)
}
