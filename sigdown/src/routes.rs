//! HTTP routes for the demo server.
//!
//! `/health` reports `draining` once shutdown has started, so a load
//! balancer can stop routing new requests while cleanup runs.

use axum::extract::State;
use axum::http::StatusCode;
use axum::routing::get;
use axum::{Json, Router, response::IntoResponse};
use serde_json::json;
use tokio_util::sync::CancellationToken;

/// Creates the router. `shutdown` is the coordinator's shutdown token.
pub fn routes(shutdown: CancellationToken) -> Router {
    Router::new()
        .route("/", get(get_root))
        .route("/health", get(get_health))
        .with_state(shutdown)
}

/// `GET /` — simple greeting.
async fn get_root() -> impl IntoResponse {
    (
        StatusCode::OK,
        concat!("Hello from ", env!("CARGO_PKG_NAME"), "!"),
    )
}

/// `GET /health` — liveness, `503` while draining.
async fn get_health(State(shutdown): State<CancellationToken>) -> impl IntoResponse {
    if shutdown.is_cancelled() {
        (
            StatusCode::SERVICE_UNAVAILABLE,
            Json(json!({ "status": "draining" })),
        )
    } else {
        (StatusCode::OK, Json(json!({ "status": "ok" })))
    }
}
