//! HTTP surface: liveness text, health probe, session stats.

use std::sync::Arc;

use axum::extract::State;
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::routing::get;
use axum::{Json, Router};
use tower_http::cors::CorsLayer;

use crate::state::AppState;
use souschef_graph::GraphClient;

pub fn build_router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/", get(index))
        .nest("/api", api_routes())
        .layer(CorsLayer::permissive())
        .with_state(state)
}

fn api_routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/health", get(health))
        .route("/stats", get(stats))
}

async fn index() -> &'static str {
    "souschef is running"
}

/// Health check including a graph-store reachability probe.
async fn health(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    match state.graph.schema().await {
        Ok(schema) => (
            StatusCode::OK,
            Json(serde_json::json!({
                "status": "ok",
                "graphBackend": state.backend,
                "schemaRegistered": schema.map(|s| s.is_defined()).unwrap_or(false),
            })),
        ),
        Err(e) => (
            StatusCode::INTERNAL_SERVER_ERROR,
            Json(serde_json::json!({
                "status": "degraded",
                "graphBackend": state.backend,
                "error": e.to_string(),
            })),
        ),
    }
}

async fn stats(State(state): State<Arc<AppState>>) -> Json<serde_json::Value> {
    Json(serde_json::json!({
        "activeSessions": state.sessions.len(),
        "graphBackend": state.backend,
        "uptimeSecs": state.started_at.elapsed().as_secs(),
    }))
}
