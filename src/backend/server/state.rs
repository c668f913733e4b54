/**
 * Application State Management
 *
 * This module defines the application state structure and implements
 * the necessary `FromRef` traits for Axum state extraction.
 *
 * # Architecture
 *
 * The `AppState` struct serves as the central state container for the
 * application, holding:
 * - The realtime hub (registries and dispatcher)
 * - The notification trigger feeding the fan-out worker
 * - The identity resolver used by the HTTP auth middleware
 * - The loaded configuration
 *
 * Everything is behind `Arc` (or is a cheap clone), so cloning `AppState`
 * per request is fine.
 *
 * # Example
 *
 * ```rust,no_run
 * use std::sync::Arc;
 * use axum::extract::State;
 * use taskcollab::backend::realtime::RealtimeHub;
 *
 * async fn handler(State(hub): State<Arc<RealtimeHub>>) -> String {
 *     format!("{} connections", hub.stats().connections)
 * }
 * ```
 */

use std::sync::Arc;

use axum::extract::FromRef;

use crate::backend::auth::identity::IdentityResolver;
use crate::backend::realtime::{NotificationTrigger, RealtimeHub};
use crate::shared::config::RealtimeConfig;

#[derive(Clone)]
pub struct AppState {
    pub hub: Arc<RealtimeHub>,
    pub notifications: NotificationTrigger,
    pub identity: Arc<dyn IdentityResolver>,
    pub config: Arc<RealtimeConfig>,
}

impl FromRef<AppState> for Arc<RealtimeHub> {
    fn from_ref(state: &AppState) -> Self {
        state.hub.clone()
    }
}

impl FromRef<AppState> for NotificationTrigger {
    fn from_ref(state: &AppState) -> Self {
        state.notifications.clone()
    }
}

impl FromRef<AppState> for Arc<RealtimeConfig> {
    fn from_ref(state: &AppState) -> Self {
        state.config.clone()
    }
}
