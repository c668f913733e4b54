/**
 * Router Configuration
 *
 * This module provides the main router creation function that combines
 * all route configurations into a single Axum router.
 *
 * # Routes
 *
 * - `GET /ws` - WebSocket collaboration session (token via query or header)
 * - `GET /health` - Liveness plus connection count
 * - `/api/...` - Bearer-authenticated API, see `api_routes`
 *
 * Every request is traced through `tower_http::trace::TraceLayer`.
 */

use std::sync::Arc;

use axum::{extract::State, routing::get, Json, Router};
use serde_json::{json, Value};
use tower::ServiceBuilder;
use tower_http::trace::TraceLayer;

use crate::backend::realtime::{ws_handler, RealtimeHub};
use crate::backend::routes::api_routes::configure_api_routes;
use crate::backend::server::state::AppState;

/// Create the Axum router with all routes configured
pub fn create_router(app_state: AppState) -> Router<()> {
    Router::new()
        .route("/ws", get(ws_handler))
        .route("/health", get(health))
        .merge(configure_api_routes(app_state.clone()))
        .fallback(|| async { (axum::http::StatusCode::NOT_FOUND, "404 Not Found") })
        .layer(ServiceBuilder::new().layer(TraceLayer::new_for_http()))
        .with_state(app_state)
}

async fn health(State(hub): State<Arc<RealtimeHub>>) -> Json<Value> {
    let stats = hub.stats();
    Json(json!({
        "status": "ok",
        "connections": stats.connections,
        "users": stats.users,
    }))
}
