/**
 * API Route Handlers
 *
 * This module defines route handlers for the bearer-authenticated HTTP API.
 *
 * # Routes
 *
 * - `GET /api/realtime/stats` - Registry sizes
 * - `GET /api/projects/{project_id}/presence` - Online users of a project
 * - `POST /api/events` - Queue a domain event for fan-out (202 Accepted)
 */

use std::sync::Arc;

use axum::{
    extract::{Path, State},
    http::StatusCode,
    middleware,
    response::IntoResponse,
    routing::{get, post},
    Json, Router,
};
use serde_json::json;

use crate::backend::error::BackendError;
use crate::backend::middleware::auth::{auth_middleware, AuthUser};
use crate::backend::realtime::{HubStats, NotificationTrigger, RealtimeHub};
use crate::backend::server::state::AppState;
use crate::shared::event::DomainEvent;
use crate::shared::model::ProjectId;
use crate::shared::protocol::PresenceRecord;

/// Configure API routes
///
/// Every route here sits behind `auth_middleware`, which requires an
/// `Authorization: Bearer <token>` header.
pub fn configure_api_routes(state: AppState) -> Router<AppState> {
    Router::new()
        .route("/api/realtime/stats", get(get_stats))
        .route("/api/projects/{project_id}/presence", get(get_presence))
        .route("/api/events", post(post_event))
        .route_layer(middleware::from_fn_with_state(state, auth_middleware))
}

async fn get_stats(AuthUser(_user): AuthUser, State(hub): State<Arc<RealtimeHub>>) -> Json<HubStats> {
    Json(hub.stats())
}

async fn get_presence(
    AuthUser(user): AuthUser,
    State(hub): State<Arc<RealtimeHub>>,
    Path(project_id): Path<ProjectId>,
) -> Result<Json<Vec<PresenceRecord>>, BackendError> {
    let users = hub.project_presence_for(user.user_id, project_id).await?;
    Ok(Json(users))
}

async fn post_event(
    AuthUser(user): AuthUser,
    State(notifications): State<NotificationTrigger>,
    Json(event): Json<DomainEvent>,
) -> impl IntoResponse {
    let name = event.name();
    tracing::debug!(
        "[Notify] {} submitted by user {} (actor {})",
        name,
        user.user_id,
        event.actor_id()
    );
    notifications.submit(event);
    (StatusCode::ACCEPTED, Json(json!({ "queued": true, "event": name })))
}
