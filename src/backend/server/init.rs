/**
 * Server Initialization
 *
 * This module handles the initialization and setup of the Axum HTTP server,
 * including state creation, database loading, and route configuration.
 *
 * # Initialization Process
 *
 * 1. Load the optional database and pick a project directory
 * 2. Build the identity resolver from the JWT secret
 * 3. Create the realtime hub and start the notification worker
 * 4. Create and configure the router
 */

use std::sync::Arc;

use axum::Router;

use crate::backend::auth::identity::{IdentityResolver, JwtIdentityResolver};
use crate::backend::directory::ProjectDirectory;
use crate::backend::realtime::{NotificationTrigger, RealtimeHub};
use crate::backend::routes::router::create_router;
use crate::backend::server::config::{directory_for, load_database};
use crate::backend::server::state::AppState;
use crate::shared::config::RealtimeConfig;

/// Create and configure the Axum application from configuration
pub async fn create_app(config: RealtimeConfig) -> Router<()> {
    tracing::info!("[Server] Initializing realtime collaboration server");

    let pool = load_database(config.database_url.as_deref()).await;
    let directory = directory_for(pool);
    let identity: Arc<dyn IdentityResolver> = Arc::new(JwtIdentityResolver::new(config.jwt_secret.clone()));

    let state = build_state(config, identity, directory);
    let app = create_router(state);

    tracing::info!("[Server] Router configured");
    app
}

/// Assemble `AppState` from explicit collaborators.
///
/// Spawns the notification worker, so this must run inside a tokio runtime.
pub fn build_state(
    config: RealtimeConfig,
    identity: Arc<dyn IdentityResolver>,
    directory: Arc<dyn ProjectDirectory>,
) -> AppState {
    let hub = Arc::new(RealtimeHub::new(
        identity.clone(),
        directory,
        config.outbound_buffer,
    ));
    let (notifications, _worker) =
        NotificationTrigger::spawn(hub.clone(), config.notification_queue_capacity);

    tracing::info!(
        "[Server] Hub ready (outbound buffer {}, notification queue {})",
        config.outbound_buffer,
        config.notification_queue_capacity
    );

    AppState {
        hub,
        notifications,
        identity,
        config: Arc::new(config),
    }
}
