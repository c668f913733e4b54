/**
 * Inbound Message Handlers
 *
 * One table from `ClientMessage` to hub operation. `handle_text` decodes a
 * frame, runs the matching handler, and turns every outcome into at most one
 * reply on the sender's connection:
 *
 * - decode failure → `error` with the protocol message
 * - handler error → `error` with the client-facing text
 * - handler panic → `error` with a generic text
 *
 * None of these end the session.
 */

use std::panic::AssertUnwindSafe;

use futures_util::FutureExt;

use crate::backend::error::RealtimeError;
use crate::backend::realtime::hub::RealtimeHub;
use crate::shared::model::{ConnectionId, SubjectKind, UserId};
use crate::shared::protocol::{ClientMessage, ServerMessage};

pub const INTERNAL_ERROR_MESSAGE: &str = "Internal error processing message";

/// Who sent the frame
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SessionContext {
    pub user_id: UserId,
    pub connection_id: ConnectionId,
}

/// Decode and execute one text frame
pub async fn handle_text(hub: &RealtimeHub, ctx: SessionContext, text: &str) {
    let message = match ClientMessage::decode(text) {
        Ok(message) => message,
        Err(e) => {
            tracing::debug!("[Session] Rejected frame on {}: {}", ctx.connection_id, e);
            hub.unicast(ctx.connection_id, ServerMessage::error(e.to_string()));
            return;
        }
    };

    hub.touch(ctx.user_id);
    let kind = message.kind();

    let reply = match AssertUnwindSafe(dispatch(hub, ctx, message)).catch_unwind().await {
        Ok(Ok(reply)) => reply,
        Ok(Err(e)) => {
            tracing::debug!("[Session] {} failed for user {}: {}", kind.as_str(), ctx.user_id, e);
            Some(ServerMessage::error(e.client_message()))
        }
        Err(_) => {
            tracing::error!(
                "[Session] Handler for {} panicked on {}",
                kind.as_str(),
                ctx.connection_id
            );
            Some(ServerMessage::error(INTERNAL_ERROR_MESSAGE))
        }
    };

    if let Some(reply) = reply {
        hub.unicast(ctx.connection_id, reply);
    }
}

async fn dispatch(
    hub: &RealtimeHub,
    ctx: SessionContext,
    message: ClientMessage,
) -> Result<Option<ServerMessage>, RealtimeError> {
    let SessionContext {
        user_id,
        connection_id,
    } = ctx;

    let reply = match message {
        ClientMessage::SubscribeProject { project_id } => {
            hub.subscribe_project(user_id, project_id, connection_id).await?;
            Some(ServerMessage::Subscribed {
                subject: SubjectKind::Project,
                subject_id: project_id,
            })
        }
        ClientMessage::SubscribeTask { task_id } => {
            hub.subscribe_task(user_id, task_id, connection_id).await?;
            Some(ServerMessage::Subscribed {
                subject: SubjectKind::Task,
                subject_id: task_id,
            })
        }
        ClientMessage::UnsubscribeProject { project_id } => {
            hub.unsubscribe_project(user_id, project_id, connection_id);
            Some(ServerMessage::Unsubscribed {
                subject: SubjectKind::Project,
                subject_id: project_id,
            })
        }
        ClientMessage::UnsubscribeTask { task_id } => {
            hub.unsubscribe_task(user_id, task_id, connection_id);
            Some(ServerMessage::Unsubscribed {
                subject: SubjectKind::Task,
                subject_id: task_id,
            })
        }
        ClientMessage::TypingStart { task_id } => {
            hub.start_typing(user_id, task_id, connection_id)?;
            None
        }
        ClientMessage::TypingStop { task_id } => {
            hub.stop_typing(user_id, task_id, connection_id)?;
            None
        }
        ClientMessage::GetPresence { project_id } => {
            let users = hub.project_presence_for(user_id, project_id).await?;
            Some(ServerMessage::Presence { project_id, users })
        }
        ClientMessage::Heartbeat {} => Some(ServerMessage::Heartbeat {}),
    };
    Ok(reply)
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::backend::auth::identity::StaticIdentityResolver;
    use crate::backend::directory::{DirectoryError, InMemoryDirectory, ProjectDirectory};
    use crate::backend::realtime::registry::{Outbound, OutboundReceiver};
    use crate::shared::model::{ProjectId, TaskId};
    use async_trait::async_trait;
    use pretty_assertions::assert_eq;

    /// Directory whose project lookup blows up
    struct BrokenDirectory;

    #[async_trait]
    impl ProjectDirectory for BrokenDirectory {
        async fn project_exists(&self, _: ProjectId, _: UserId) -> Result<bool, DirectoryError> {
            panic!("directory lookup exploded");
        }

        async fn task_exists(&self, _: TaskId, _: UserId) -> Result<bool, DirectoryError> {
            Ok(true)
        }
    }

    async fn session() -> (RealtimeHub, SessionContext, OutboundReceiver) {
        let hub = RealtimeHub::new(
            Arc::new(StaticIdentityResolver::new().with_token("alice", 1)),
            Arc::new(InMemoryDirectory::new().with_project(10).with_task(100)),
            32,
        );
        let (tx, mut rx) = hub.channel();
        let connection_id = hub.connect(tx);
        hub.authenticate(connection_id, Some("alice")).await.unwrap();
        rx.try_recv().unwrap();
        (
            hub,
            SessionContext {
                user_id: 1,
                connection_id,
            },
            rx,
        )
    }

    fn next_message(rx: &mut OutboundReceiver) -> ServerMessage {
        match rx.try_recv() {
            Ok(Outbound::Envelope(env)) => env.message,
            other => panic!("expected envelope, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_invalid_json_reply() {
        let (hub, ctx, mut rx) = session().await;
        handle_text(&hub, ctx, "not-json").await;
        assert_eq!(next_message(&mut rx), ServerMessage::error("Invalid JSON message format"));
    }

    #[tokio::test]
    async fn test_unknown_type_reply() {
        let (hub, ctx, mut rx) = session().await;
        handle_text(&hub, ctx, r#"{"type":"dance","data":{}}"#).await;
        assert_eq!(next_message(&mut rx), ServerMessage::error("Unknown message type: dance"));
    }

    #[tokio::test]
    async fn test_subscribe_ack_and_validation() {
        let (hub, ctx, mut rx) = session().await;
        handle_text(&hub, ctx, r#"{"type":"subscribe_project","data":{"project_id":10}}"#).await;
        assert_eq!(
            next_message(&mut rx),
            ServerMessage::Subscribed {
                subject: SubjectKind::Project,
                subject_id: 10
            }
        );

        handle_text(&hub, ctx, r#"{"type":"subscribe_task","data":{"task_id":999}}"#).await;
        assert_eq!(
            next_message(&mut rx),
            ServerMessage::error("Task 999 not found or access denied")
        );
    }

    #[tokio::test]
    async fn test_heartbeat_without_data() {
        let (hub, ctx, mut rx) = session().await;
        handle_text(&hub, ctx, r#"{"type":"heartbeat"}"#).await;
        assert_eq!(next_message(&mut rx), ServerMessage::Heartbeat {});
    }

    #[tokio::test]
    async fn test_get_presence_lists_self() {
        let (hub, ctx, mut rx) = session().await;
        handle_text(&hub, ctx, r#"{"type":"subscribe_project","data":{"project_id":10}}"#).await;
        next_message(&mut rx);

        handle_text(&hub, ctx, r#"{"type":"get_presence","data":{"project_id":10}}"#).await;
        match next_message(&mut rx) {
            ServerMessage::Presence { project_id, users } => {
                assert_eq!(project_id, 10);
                assert_eq!(users.len(), 1);
                assert_eq!(users[0].user_id, 1);
            }
            other => panic!("unexpected reply {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_typing_has_no_reply_to_sender() {
        let (hub, ctx, mut rx) = session().await;
        handle_text(&hub, ctx, r#"{"type":"typing_start","data":{"task_id":100}}"#).await;
        assert!(rx.try_recv().is_err());
        assert_eq!(hub.typists(100), vec![1]);
    }

    #[tokio::test]
    async fn test_handler_panic_becomes_error_reply() {
        let hub = RealtimeHub::new(
            Arc::new(StaticIdentityResolver::new().with_token("alice", 1)),
            Arc::new(BrokenDirectory),
            32,
        );
        let (tx, mut rx) = hub.channel();
        let connection_id = hub.connect(tx);
        hub.authenticate(connection_id, Some("alice")).await.unwrap();
        rx.try_recv().unwrap();
        let ctx = SessionContext {
            user_id: 1,
            connection_id,
        };

        handle_text(&hub, ctx, r#"{"type":"subscribe_project","data":{"project_id":10}}"#).await;
        assert_eq!(next_message(&mut rx), ServerMessage::error(INTERNAL_ERROR_MESSAGE));
        assert_eq!(hub.stats().project_subscriptions, 0);

        handle_text(&hub, ctx, r#"{"type":"heartbeat"}"#).await;
        assert_eq!(next_message(&mut rx), ServerMessage::Heartbeat {});
        assert!(hub.is_connected(connection_id));
    }
}
