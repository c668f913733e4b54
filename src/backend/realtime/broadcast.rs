/**
 * Dispatcher
 *
 * Fan-out of server messages onto per-connection outbound queues.
 *
 * # Delivery
 *
 * Targets are snapshotted under the hub lock and delivered after it is
 * released. Every enqueue is a `try_send` on a bounded queue, so a slow
 * client never blocks a broadcast. A full or closed queue counts as a
 * transport failure: the connection is handed to `disconnect` and the
 * remaining targets still get their copy.
 *
 * Ordering is per connection only. Two broadcasts to the same connection
 * arrive in the order they were enqueued; nothing is promised across
 * connections.
 */

use tokio::sync::mpsc::error::TrySendError;

use crate::backend::realtime::hub::{RealtimeHub, Target};
use crate::backend::realtime::registry::Outbound;
use crate::shared::model::{ConnectionId, ProjectId, Subject, TaskId, UserId};
use crate::shared::protocol::{Envelope, ServerMessage};

impl RealtimeHub {
    /// Enqueue one message on one connection
    pub fn unicast(&self, connection_id: ConnectionId, message: ServerMessage) -> bool {
        let Some(sender) = self.lock().registry.sender(&connection_id) else {
            return false;
        };
        self.deliver(vec![(connection_id, sender)], message) == 1
    }

    /// Enqueue on every connection the user owns. Returns how many accepted it.
    pub fn send_to_user(&self, user_id: UserId, message: ServerMessage) -> usize {
        let targets: Vec<Target> = {
            let state = self.lock();
            state
                .registry
                .user_connections(user_id)
                .into_iter()
                .filter_map(|id| state.registry.sender(&id).map(|sender| (id, sender)))
                .collect()
        };
        self.deliver(targets, message)
    }

    pub fn broadcast_to_project(
        &self,
        project_id: ProjectId,
        message: ServerMessage,
        exclude_user: Option<UserId>,
    ) -> usize {
        self.broadcast_to_subjects(&[Subject::Project(project_id)], message, exclude_user)
    }

    pub fn broadcast_to_task(&self, task_id: TaskId, message: ServerMessage, exclude_user: Option<UserId>) -> usize {
        self.broadcast_to_subjects(&[Subject::Task(task_id)], message, exclude_user)
    }

    /// Union of several subjects' subscribers; each connection gets one copy
    pub fn broadcast_to_subjects(
        &self,
        subjects: &[Subject],
        message: ServerMessage,
        exclude_user: Option<UserId>,
    ) -> usize {
        let targets = Self::targets_locked(&self.lock(), subjects, exclude_user);
        self.deliver(targets, message)
    }

    /// Queue a close frame. Anything queued before it is still written.
    pub fn close(&self, connection_id: ConnectionId, code: u16, reason: &str) -> bool {
        let Some(sender) = self.lock().registry.sender(&connection_id) else {
            return false;
        };
        let close = Outbound::Close {
            code,
            reason: reason.to_string(),
        };
        match sender.try_send(close) {
            Ok(()) => true,
            Err(e) => {
                tracing::warn!("[Realtime] Could not queue close for {}: {}", connection_id, e);
                self.disconnect(connection_id);
                false
            }
        }
    }

    /// Deliver to a snapshot of targets and disconnect the ones that failed
    pub(crate) fn deliver(&self, targets: Vec<Target>, message: ServerMessage) -> usize {
        if targets.is_empty() {
            return 0;
        }
        let (delivered, failed) = Self::enqueue_all(targets, message);
        for connection_id in failed {
            self.disconnect(connection_id);
        }
        delivered
    }

    /// Enqueue without touching the registries. Returns the delivered count
    /// and the connections whose queues rejected the message.
    pub(crate) fn enqueue_all(targets: Vec<Target>, message: ServerMessage) -> (usize, Vec<ConnectionId>) {
        let envelope = Envelope::new(message);
        let kind = envelope.kind();
        let mut delivered = 0;
        let mut failed = Vec::new();

        for (connection_id, sender) in targets {
            match sender.try_send(Outbound::Envelope(envelope.clone())) {
                Ok(()) => delivered += 1,
                Err(TrySendError::Full(_)) => {
                    tracing::warn!(
                        "[Realtime] Outbound queue full for {}, dropping connection ({})",
                        connection_id,
                        kind
                    );
                    failed.push(connection_id);
                }
                Err(TrySendError::Closed(_)) => {
                    tracing::debug!("[Realtime] Outbound queue closed for {} ({})", connection_id, kind);
                    failed.push(connection_id);
                }
            }
        }

        tracing::trace!("[Realtime] {} delivered to {} connections", kind, delivered);
        (delivered, failed)
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::backend::auth::identity::StaticIdentityResolver;
    use crate::backend::directory::InMemoryDirectory;
    use crate::backend::realtime::registry::OutboundReceiver;

    fn hub(buffer: usize) -> RealtimeHub {
        RealtimeHub::new(
            Arc::new(
                StaticIdentityResolver::new()
                    .with_token("alice", 1)
                    .with_token("bob", 2),
            ),
            Arc::new(InMemoryDirectory::allow_all()),
            buffer,
        )
    }

    async fn login(hub: &RealtimeHub, token: &str) -> (ConnectionId, OutboundReceiver) {
        let (tx, mut rx) = hub.channel();
        let conn = hub.connect(tx);
        hub.authenticate(conn, Some(token)).await.unwrap();
        rx.try_recv().unwrap();
        (conn, rx)
    }

    fn kinds(rx: &mut OutboundReceiver) -> Vec<&'static str> {
        let mut out = Vec::new();
        while let Ok(item) = rx.try_recv() {
            if let Outbound::Envelope(env) = item {
                out.push(env.kind());
            }
        }
        out
    }

    #[tokio::test]
    async fn test_subject_union_delivers_once() {
        let hub = hub(16);
        let (conn, mut rx) = login(&hub, "alice").await;
        hub.subscribe_project(1, 10, conn).await.unwrap();
        hub.subscribe_task(1, 100, conn).await.unwrap();

        let sent = hub.broadcast_to_subjects(
            &[Subject::Project(10), Subject::Task(100)],
            ServerMessage::error("x"),
            None,
        );
        assert_eq!(sent, 1);
        assert_eq!(kinds(&mut rx), vec!["error"]);
    }

    #[tokio::test]
    async fn test_closed_receiver_triggers_disconnect() {
        let hub = hub(16);
        let (alice, alice_rx) = login(&hub, "alice").await;
        let (bob, mut bob_rx) = login(&hub, "bob").await;
        hub.subscribe_project(1, 10, alice).await.unwrap();
        hub.subscribe_project(2, 10, bob).await.unwrap();
        kinds(&mut bob_rx);

        drop(alice_rx);
        let sent = hub.broadcast_to_project(10, ServerMessage::error("x"), None);
        assert_eq!(sent, 1);
        assert!(!hub.is_connected(alice));
        assert!(hub.is_connected(bob));
        assert_eq!(kinds(&mut bob_rx), vec!["error", "user_left"]);
    }

    #[tokio::test]
    async fn test_full_queue_is_a_transport_failure() {
        let hub = hub(1);
        let (tx, _rx) = hub.channel();
        let conn = hub.connect(tx);
        assert!(hub.unicast(conn, ServerMessage::Heartbeat {}));
        assert!(!hub.unicast(conn, ServerMessage::Heartbeat {}));
        assert!(!hub.is_connected(conn));
    }

    #[tokio::test]
    async fn test_unicast_unknown_connection() {
        let hub = hub(4);
        assert!(!hub.unicast(uuid::Uuid::new_v4(), ServerMessage::Heartbeat {}));
        assert!(!hub.close(uuid::Uuid::new_v4(), 1000, "bye"));
    }
}
