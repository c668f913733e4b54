//! In-process hub fixtures
//!
//! Three users (alice, bob, carol), two projects and two tasks. Clients are
//! plain outbound receivers, so tests observe exactly what a socket writer
//! would send.

use std::sync::Arc;

use taskcollab::backend::auth::identity::StaticIdentityResolver;
use taskcollab::backend::directory::InMemoryDirectory;
use taskcollab::backend::realtime::{Outbound, OutboundReceiver, RealtimeHub};
use taskcollab::shared::{ConnectionId, ProjectId, ServerMessage, TaskId, UserId};

pub const ALICE: UserId = 1;
pub const BOB: UserId = 2;
pub const CAROL: UserId = 3;

pub const PROJECT: ProjectId = 10;
pub const OTHER_PROJECT: ProjectId = 20;
pub const TASK: TaskId = 100;
pub const OTHER_TASK: TaskId = 200;

pub fn token_for(user_id: UserId) -> String {
    format!("user-{}-token", user_id)
}

pub fn test_hub() -> Arc<RealtimeHub> {
    test_hub_with_buffer(64)
}

pub fn test_hub_with_buffer(buffer: usize) -> Arc<RealtimeHub> {
    let identity = [ALICE, BOB, CAROL]
        .into_iter()
        .fold(StaticIdentityResolver::new(), |resolver, user| {
            resolver.with_token(token_for(user), user)
        });
    let directory = InMemoryDirectory::new()
        .with_project(PROJECT)
        .with_project(OTHER_PROJECT)
        .with_task(TASK)
        .with_task(OTHER_TASK);
    Arc::new(RealtimeHub::new(Arc::new(identity), Arc::new(directory), buffer))
}

/// One authenticated connection and the queue its writer would drain
pub struct TestClient {
    pub user_id: UserId,
    pub connection_id: ConnectionId,
    pub rx: OutboundReceiver,
}

impl TestClient {
    /// Connect and authenticate, consuming the `auth_success` reply
    pub async fn connect(hub: &RealtimeHub, user_id: UserId) -> Self {
        let (tx, rx) = hub.channel();
        let connection_id = hub.connect(tx);
        let token = token_for(user_id);
        hub.authenticate(connection_id, Some(&token))
            .await
            .expect("authentication should succeed");
        let mut client = Self {
            user_id,
            connection_id,
            rx,
        };
        let first = client.drain();
        assert_eq!(first.len(), 1);
        assert_eq!(first[0].kind(), "auth_success");
        client
    }

    /// Every envelope queued so far
    pub fn drain(&mut self) -> Vec<ServerMessage> {
        let mut messages = Vec::new();
        while let Ok(item) = self.rx.try_recv() {
            if let Outbound::Envelope(envelope) = item {
                messages.push(envelope.message);
            }
        }
        messages
    }

    pub async fn subscribe_project(&self, hub: &RealtimeHub, project_id: ProjectId) {
        hub.subscribe_project(self.user_id, project_id, self.connection_id)
            .await
            .expect("project subscription should succeed");
    }

    pub async fn subscribe_task(&self, hub: &RealtimeHub, task_id: TaskId) {
        hub.subscribe_task(self.user_id, task_id, self.connection_id)
            .await
            .expect("task subscription should succeed");
    }
}
