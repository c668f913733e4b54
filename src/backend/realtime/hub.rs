/**
 * Realtime Hub
 *
 * The single service object that owns every collaboration registry:
 * connections, subscriptions, presence and typing indicators. It is built
 * once at startup and shared through axum state as `Arc<RealtimeHub>`.
 *
 * # Locking
 *
 * All registries sit in one `HubState` behind a `std::sync::Mutex`. The lock
 * is never held across an `.await`: identity and directory lookups run first,
 * mutations and target snapshots run under the lock, and delivery to outbound
 * queues happens after it is released.
 *
 * # Cleanup
 *
 * `disconnect` is the only way a connection leaves the registries. A failed
 * delivery during cleanup schedules that connection for cleanup too, using a
 * worklist instead of recursion.
 */

use std::collections::{HashSet, VecDeque};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use chrono::Utc;
use serde::Serialize;
use tokio::sync::mpsc;
use uuid::Uuid;

use crate::backend::auth::identity::{AuthError, Identity, IdentityResolver};
use crate::backend::directory::ProjectDirectory;
use crate::backend::error::RealtimeError;
use crate::backend::realtime::presence::PresenceStore;
use crate::backend::realtime::registry::{
    ConnectionRegistry, OutboundReceiver, OutboundSender,
};
use crate::backend::realtime::subscription::SubscriptionIndex;
use crate::backend::realtime::typing::TypingTracker;
use crate::shared::config::MIN_OUTBOUND_BUFFER;
use crate::shared::model::{ConnectionId, ProjectId, Subject, SubjectKind, TaskId, UserId};
use crate::shared::protocol::{PresenceRecord, ServerMessage};

/// Close code sent when the handshake token is rejected
pub const AUTH_FAILURE_CLOSE_CODE: u16 = 4001;

/// Close code for an orderly shutdown
pub const NORMAL_CLOSE_CODE: u16 = 1000;

/// Default per-connection outbound queue size
pub const DEFAULT_OUTBOUND_BUFFER: usize = 256;

/// Every registry the hub guards
#[derive(Debug, Default)]
pub struct HubState {
    pub registry: ConnectionRegistry,
    pub subscriptions: SubscriptionIndex,
    pub presence: PresenceStore,
    pub typing: TypingTracker,
}

/// Snapshot of a delivery target taken under the lock
pub(crate) type Target = (ConnectionId, OutboundSender);

/// Registry sizes, as reported by `/health` and `/api/realtime/stats`
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct HubStats {
    pub connections: usize,
    pub users: usize,
    pub project_subscriptions: usize,
    pub task_subscriptions: usize,
    pub online_presence: usize,
    pub typing_indicators: usize,
}

pub struct RealtimeHub {
    state: Mutex<HubState>,
    identity: Arc<dyn IdentityResolver>,
    directory: Arc<dyn ProjectDirectory>,
    outbound_buffer: usize,
}

impl RealtimeHub {
    pub fn new(
        identity: Arc<dyn IdentityResolver>,
        directory: Arc<dyn ProjectDirectory>,
        outbound_buffer: usize,
    ) -> Self {
        Self {
            state: Mutex::new(HubState::default()),
            identity,
            directory,
            outbound_buffer: outbound_buffer.max(MIN_OUTBOUND_BUFFER),
        }
    }

    /// Lock the registries, recovering from a poisoned mutex
    pub(crate) fn lock(&self) -> MutexGuard<'_, HubState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn outbound_buffer(&self) -> usize {
        self.outbound_buffer
    }

    /// A bounded outbound queue sized for this hub
    pub fn channel(&self) -> (OutboundSender, OutboundReceiver) {
        mpsc::channel(self.outbound_buffer)
    }

    // ========================================================================
    // Connection lifecycle
    // ========================================================================

    /// Register a freshly accepted connection. It stays pending (no owner)
    /// until `authenticate` succeeds.
    pub fn connect(&self, sender: OutboundSender) -> ConnectionId {
        let connection_id = Uuid::new_v4();
        self.lock().registry.insert(connection_id, sender);
        tracing::debug!("[Realtime] Connection {} accepted", connection_id);
        connection_id
    }

    /// Resolve the handshake token and bind the connection to its user.
    ///
    /// On failure the client receives `auth_error`, the socket is closed with
    /// `AUTH_FAILURE_CLOSE_CODE` and the pending connection is removed.
    pub async fn authenticate(
        &self,
        connection_id: ConnectionId,
        token: Option<&str>,
    ) -> Result<Identity, RealtimeError> {
        let resolved = match token.map(str::trim).filter(|t| !t.is_empty()) {
            Some(token) => self.identity.resolve_identity(token).await,
            None => Err(AuthError::MissingToken),
        };

        let identity = match resolved {
            Ok(identity) => identity,
            Err(e) => {
                tracing::info!("[Auth] Handshake rejected for {}: {}", connection_id, e);
                self.unicast(
                    connection_id,
                    ServerMessage::AuthError {
                        error: e.to_string(),
                    },
                );
                self.close(connection_id, AUTH_FAILURE_CLOSE_CODE, "Authentication failed");
                self.disconnect(connection_id);
                return Err(e.into());
            }
        };

        let bound = self.lock().registry.bind_user(connection_id, identity.user_id);
        if !bound {
            return Err(RealtimeError::ConnectionClosed(connection_id));
        }

        tracing::info!(
            "[Realtime] User {} authenticated on {}",
            identity.user_id,
            connection_id
        );
        self.unicast(
            connection_id,
            ServerMessage::AuthSuccess {
                user_id: identity.user_id,
                connection_id,
            },
        );
        Ok(identity)
    }

    /// Remove a connection and everything that references it.
    ///
    /// Returns `false` if the connection was already gone.
    pub fn disconnect(&self, connection_id: ConnectionId) -> bool {
        let mut worklist = VecDeque::from([connection_id]);
        let mut removed = false;

        while let Some(next) = worklist.pop_front() {
            let Some(pending) = Self::remove_connection_locked(&mut self.lock(), next) else {
                continue;
            };
            if next == connection_id {
                removed = true;
            }
            for (targets, message) in pending {
                let (_, failed) = Self::enqueue_all(targets, message);
                worklist.extend(failed);
            }
        }
        removed
    }

    /// Drop one connection from every registry and collect the notifications
    /// that must go out once the lock is released.
    fn remove_connection_locked(
        state: &mut HubState,
        connection_id: ConnectionId,
    ) -> Option<Vec<(Vec<Target>, ServerMessage)>> {
        let entry = state.registry.remove(&connection_id)?;
        state.subscriptions.remove_connection(&connection_id);

        let mut pending = Vec::new();
        for (task_id, user_id) in state.typing.remove_connection(&connection_id) {
            let targets = Self::targets_locked(state, &[Subject::Task(task_id)], Some(user_id));
            pending.push((targets, ServerMessage::UserStoppedTyping { user_id, task_id }));
        }

        if let Some(user_id) = entry.user_id {
            if state.registry.user_connection_count(user_id) == 0 {
                for project_id in state.presence.mark_offline(user_id, Utc::now()) {
                    let targets =
                        Self::targets_locked(state, &[Subject::Project(project_id)], Some(user_id));
                    pending.push((targets, ServerMessage::UserLeft { user_id, project_id }));
                }
                tracing::info!("[Realtime] User {} went offline", user_id);
            }
        }

        tracing::debug!("[Realtime] Connection {} removed", connection_id);
        Some(pending)
    }

    /// Connections subscribed to any of `subjects`, each once, minus every
    /// connection owned by `exclude`.
    pub(crate) fn targets_locked(
        state: &HubState,
        subjects: &[Subject],
        exclude: Option<UserId>,
    ) -> Vec<Target> {
        let mut targets: Vec<Target> = Vec::new();
        let mut seen: HashSet<ConnectionId> = HashSet::new();
        for subject in subjects {
            for (user_id, connection_id) in state.subscriptions.subscribers(*subject) {
                if Some(user_id) == exclude || !seen.insert(connection_id) {
                    continue;
                }
                if let Some(sender) = state.registry.sender(&connection_id) {
                    targets.push((connection_id, sender));
                }
            }
        }
        targets
    }

    /// Ensure the connection still exists and belongs to `user_id`
    fn ensure_owner(state: &HubState, user_id: UserId, connection_id: ConnectionId) -> Result<(), RealtimeError> {
        if state.registry.is_owned_by(&connection_id, user_id) {
            Ok(())
        } else {
            Err(RealtimeError::ConnectionClosed(connection_id))
        }
    }

    // ========================================================================
    // Subscriptions and presence
    // ========================================================================

    pub async fn subscribe_project(
        &self,
        user_id: UserId,
        project_id: ProjectId,
        connection_id: ConnectionId,
    ) -> Result<(), RealtimeError> {
        if !self.directory.project_exists(project_id, user_id).await? {
            return Err(RealtimeError::validation(format!(
                "Project {} not found or access denied",
                project_id
            )));
        }

        let targets = {
            let mut state = self.lock();
            Self::ensure_owner(&state, user_id, connection_id)?;
            let subject = Subject::Project(project_id);
            let added = state.subscriptions.subscribe(subject, user_id, connection_id);
            state.presence.mark_online(project_id, user_id, Utc::now());
            if added {
                Some(Self::targets_locked(&state, &[subject], Some(user_id)))
            } else {
                None
            }
        };

        if let Some(targets) = targets {
            tracing::debug!("[Realtime] User {} joined project {}", user_id, project_id);
            self.deliver(targets, ServerMessage::UserJoined { user_id, project_id });
        }
        Ok(())
    }

    pub async fn subscribe_task(
        &self,
        user_id: UserId,
        task_id: TaskId,
        connection_id: ConnectionId,
    ) -> Result<(), RealtimeError> {
        if !self.directory.task_exists(task_id, user_id).await? {
            return Err(RealtimeError::validation(format!(
                "Task {} not found or access denied",
                task_id
            )));
        }

        let mut state = self.lock();
        Self::ensure_owner(&state, user_id, connection_id)?;
        state
            .subscriptions
            .subscribe(Subject::Task(task_id), user_id, connection_id);
        state.presence.set_current_task(user_id, task_id);
        Ok(())
    }

    /// Remove this connection from the project. Presence is left alone.
    pub fn unsubscribe_project(&self, user_id: UserId, project_id: ProjectId, connection_id: ConnectionId) -> bool {
        self.lock()
            .subscriptions
            .unsubscribe(Subject::Project(project_id), user_id, connection_id)
    }

    pub fn unsubscribe_task(&self, user_id: UserId, task_id: TaskId, connection_id: ConnectionId) -> bool {
        let mut state = self.lock();
        let removed = state
            .subscriptions
            .unsubscribe(Subject::Task(task_id), user_id, connection_id);
        if removed {
            state.presence.clear_current_task(user_id, task_id);
        }
        removed
    }

    /// Online presence records for a project, one per user
    pub fn get_project_presence(&self, project_id: ProjectId) -> Vec<PresenceRecord> {
        self.lock().presence.online(project_id)
    }

    /// Presence lookup on behalf of a user, checked against the directory
    pub async fn project_presence_for(
        &self,
        user_id: UserId,
        project_id: ProjectId,
    ) -> Result<Vec<PresenceRecord>, RealtimeError> {
        if !self.directory.project_exists(project_id, user_id).await? {
            return Err(RealtimeError::validation(format!(
                "Project {} not found or access denied",
                project_id
            )));
        }
        Ok(self.get_project_presence(project_id))
    }

    /// Refresh `last_seen` for every project the user is online in
    pub fn touch(&self, user_id: UserId) {
        self.lock().presence.touch(user_id, Utc::now());
    }

    /// Drop a user's subscriptions and presence for one project, on every
    /// connection they own.
    pub fn revoke_project_access(&self, user_id: UserId, project_id: ProjectId) -> usize {
        let mut state = self.lock();
        let removed = state
            .subscriptions
            .remove_user_from(Subject::Project(project_id), user_id);
        state.presence.remove(project_id, user_id);
        tracing::info!(
            "[Realtime] Revoked project {} for user {} ({} connections)",
            project_id,
            user_id,
            removed.len()
        );
        removed.len()
    }

    // ========================================================================
    // Typing indicators
    // ========================================================================

    pub fn start_typing(
        &self,
        user_id: UserId,
        task_id: TaskId,
        connection_id: ConnectionId,
    ) -> Result<(), RealtimeError> {
        let targets = {
            let mut state = self.lock();
            Self::ensure_owner(&state, user_id, connection_id)?;
            state.typing.start(task_id, user_id, connection_id, Utc::now());
            Self::targets_locked(&state, &[Subject::Task(task_id)], Some(user_id))
        };
        self.deliver(targets, ServerMessage::UserTyping { user_id, task_id });
        Ok(())
    }

    /// Clear the indicator and tell the task. The broadcast goes out even if
    /// no indicator was stored.
    pub fn stop_typing(
        &self,
        user_id: UserId,
        task_id: TaskId,
        connection_id: ConnectionId,
    ) -> Result<(), RealtimeError> {
        let targets = {
            let mut state = self.lock();
            Self::ensure_owner(&state, user_id, connection_id)?;
            state.typing.stop(task_id, user_id);
            Self::targets_locked(&state, &[Subject::Task(task_id)], Some(user_id))
        };
        self.deliver(targets, ServerMessage::UserStoppedTyping { user_id, task_id });
        Ok(())
    }

    // ========================================================================
    // Introspection
    // ========================================================================

    pub fn is_connected(&self, connection_id: ConnectionId) -> bool {
        self.lock().registry.contains(&connection_id)
    }

    pub fn connection_owner(&self, connection_id: ConnectionId) -> Option<UserId> {
        self.lock().registry.owner(&connection_id)
    }

    pub fn user_connections(&self, user_id: UserId) -> Vec<ConnectionId> {
        self.lock().registry.user_connections(user_id)
    }

    pub fn is_subscribed(&self, subject: Subject, user_id: UserId, connection_id: ConnectionId) -> bool {
        self.lock().subscriptions.is_subscribed(subject, user_id, connection_id)
    }

    pub fn typists(&self, task_id: TaskId) -> Vec<UserId> {
        self.lock().typing.typists(task_id)
    }

    pub fn stats(&self) -> HubStats {
        let state = self.lock();
        HubStats {
            connections: state.registry.connection_count(),
            users: state.registry.user_count(),
            project_subscriptions: state.subscriptions.entry_count(SubjectKind::Project),
            task_subscriptions: state.subscriptions.entry_count(SubjectKind::Task),
            online_presence: state.presence.online_count(),
            typing_indicators: state.typing.len(),
        }
    }
}
