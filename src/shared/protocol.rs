//! Wire Protocol
//!
//! Every frame on a collaboration socket is one JSON envelope.
//!
//! Inbound (client → server):
//!
//! ```json
//! {"type": "subscribe_project", "data": {"project_id": 1}}
//! ```
//!
//! Outbound (server → client):
//!
//! ```json
//! {"type": "user_joined", "data": {"user_id": 4, "project_id": 1}, "timestamp": "2026-01-01T00:00:00Z"}
//! ```
//!
//! Inbound frames are decoded in two steps: the `type` string is looked up in the
//! closed [`ClientMessageKind`] table, then `data` is decoded into that kind's
//! payload. Outbound messages are the closed [`ServerMessage`] enum; serde's
//! adjacent tagging is the single mapping between variants and `type` strings.

use chrono::{DateTime, Utc};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::shared::error::ProtocolError;
use crate::shared::model::{
    CommentId, CommentSnapshot, ConnectionId, ProjectId, ProjectSnapshot, SubjectKind, TaskId,
    TaskSnapshot, TimeEntrySnapshot, UserId,
};

/// The closed set of inbound message types
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ClientMessageKind {
    SubscribeProject,
    SubscribeTask,
    UnsubscribeProject,
    UnsubscribeTask,
    TypingStart,
    TypingStop,
    GetPresence,
    Heartbeat,
}

impl ClientMessageKind {
    pub const ALL: [ClientMessageKind; 8] = [
        ClientMessageKind::SubscribeProject,
        ClientMessageKind::SubscribeTask,
        ClientMessageKind::UnsubscribeProject,
        ClientMessageKind::UnsubscribeTask,
        ClientMessageKind::TypingStart,
        ClientMessageKind::TypingStop,
        ClientMessageKind::GetPresence,
        ClientMessageKind::Heartbeat,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            ClientMessageKind::SubscribeProject => "subscribe_project",
            ClientMessageKind::SubscribeTask => "subscribe_task",
            ClientMessageKind::UnsubscribeProject => "unsubscribe_project",
            ClientMessageKind::UnsubscribeTask => "unsubscribe_task",
            ClientMessageKind::TypingStart => "typing_start",
            ClientMessageKind::TypingStop => "typing_stop",
            ClientMessageKind::GetPresence => "get_presence",
            ClientMessageKind::Heartbeat => "heartbeat",
        }
    }

    pub fn parse(kind: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|candidate| candidate.as_str() == kind)
    }
}

/// Raw inbound frame before the payload is interpreted
#[derive(Debug, Clone, Deserialize)]
pub struct InboundEnvelope {
    #[serde(rename = "type")]
    pub kind: String,
    #[serde(default)]
    pub data: Value,
}

impl InboundEnvelope {
    /// Parse a text frame. Anything that is not an object with a string `type`
    /// is reported as [`ProtocolError::InvalidJson`].
    pub fn parse(text: &str) -> Result<Self, ProtocolError> {
        serde_json::from_str(text).map_err(|_| ProtocolError::InvalidJson)
    }

    fn payload<T: DeserializeOwned>(&self) -> Result<T, ProtocolError> {
        // A missing or null `data` is treated as an empty object
        let data = match &self.data {
            Value::Null => Value::Object(Default::default()),
            other => other.clone(),
        };
        serde_json::from_value(data)
            .map_err(|e| ProtocolError::invalid_payload(self.kind.clone(), e.to_string()))
    }
}

#[derive(Debug, Deserialize)]
struct ProjectPayload {
    project_id: ProjectId,
}

#[derive(Debug, Deserialize)]
struct TaskPayload {
    task_id: TaskId,
}

/// Decoded inbound message
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "type", content = "data", rename_all = "snake_case")]
pub enum ClientMessage {
    SubscribeProject { project_id: ProjectId },
    SubscribeTask { task_id: TaskId },
    UnsubscribeProject { project_id: ProjectId },
    UnsubscribeTask { task_id: TaskId },
    TypingStart { task_id: TaskId },
    TypingStop { task_id: TaskId },
    GetPresence { project_id: ProjectId },
    Heartbeat {},
}

impl ClientMessage {
    /// Decode a text frame into a typed message
    pub fn decode(text: &str) -> Result<Self, ProtocolError> {
        let envelope = InboundEnvelope::parse(text)?;
        let kind = ClientMessageKind::parse(&envelope.kind)
            .ok_or_else(|| ProtocolError::unknown_type(envelope.kind.clone()))?;

        let message = match kind {
            ClientMessageKind::SubscribeProject => {
                let p: ProjectPayload = envelope.payload()?;
                ClientMessage::SubscribeProject { project_id: p.project_id }
            }
            ClientMessageKind::SubscribeTask => {
                let p: TaskPayload = envelope.payload()?;
                ClientMessage::SubscribeTask { task_id: p.task_id }
            }
            ClientMessageKind::UnsubscribeProject => {
                let p: ProjectPayload = envelope.payload()?;
                ClientMessage::UnsubscribeProject { project_id: p.project_id }
            }
            ClientMessageKind::UnsubscribeTask => {
                let p: TaskPayload = envelope.payload()?;
                ClientMessage::UnsubscribeTask { task_id: p.task_id }
            }
            ClientMessageKind::TypingStart => {
                let p: TaskPayload = envelope.payload()?;
                ClientMessage::TypingStart { task_id: p.task_id }
            }
            ClientMessageKind::TypingStop => {
                let p: TaskPayload = envelope.payload()?;
                ClientMessage::TypingStop { task_id: p.task_id }
            }
            ClientMessageKind::GetPresence => {
                let p: ProjectPayload = envelope.payload()?;
                ClientMessage::GetPresence { project_id: p.project_id }
            }
            ClientMessageKind::Heartbeat => ClientMessage::Heartbeat {},
        };
        Ok(message)
    }

    pub fn kind(&self) -> ClientMessageKind {
        match self {
            ClientMessage::SubscribeProject { .. } => ClientMessageKind::SubscribeProject,
            ClientMessage::SubscribeTask { .. } => ClientMessageKind::SubscribeTask,
            ClientMessage::UnsubscribeProject { .. } => ClientMessageKind::UnsubscribeProject,
            ClientMessage::UnsubscribeTask { .. } => ClientMessageKind::UnsubscribeTask,
            ClientMessage::TypingStart { .. } => ClientMessageKind::TypingStart,
            ClientMessage::TypingStop { .. } => ClientMessageKind::TypingStop,
            ClientMessage::GetPresence { .. } => ClientMessageKind::GetPresence,
            ClientMessage::Heartbeat {} => ClientMessageKind::Heartbeat,
        }
    }

    /// Encode as a text frame (used by clients and tests)
    pub fn encode(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }
}

/// Online/offline status of a user within a project
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PresenceStatus {
    Online,
    Offline,
}

/// Presence of one user in one project
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PresenceRecord {
    pub user_id: UserId,
    pub project_id: ProjectId,
    pub status: PresenceStatus,
    pub last_seen: DateTime<Utc>,
    pub current_task_id: Option<TaskId>,
}

/// Direction of an assignment change as seen by the recipient
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AssignmentAction {
    Assigned,
    Unassigned,
    Reassigned,
}

/// The closed set of outbound messages
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", content = "data", rename_all = "snake_case")]
pub enum ServerMessage {
    AuthSuccess {
        user_id: UserId,
        connection_id: ConnectionId,
    },
    AuthError {
        error: String,
    },
    Notification {
        title: String,
        message: String,
        project_id: Option<ProjectId>,
    },
    Error {
        error: String,
    },
    Heartbeat {},
    TaskCreated {
        task: TaskSnapshot,
        created_by: UserId,
    },
    TaskUpdated {
        task: TaskSnapshot,
        updated_by: UserId,
        changes: Vec<String>,
    },
    TaskDeleted {
        task_id: TaskId,
        project_id: ProjectId,
        deleted_by: UserId,
    },
    TaskStatusChanged {
        task_id: TaskId,
        project_id: ProjectId,
        old_status: String,
        new_status: String,
        changed_by: UserId,
    },
    TaskAssigned {
        task: TaskSnapshot,
        action: AssignmentAction,
        old_assignee_id: Option<UserId>,
        new_assignee_id: Option<UserId>,
        assigned_by: UserId,
    },
    CommentAdded {
        comment: CommentSnapshot,
        project_id: ProjectId,
    },
    CommentUpdated {
        comment: CommentSnapshot,
        project_id: ProjectId,
    },
    CommentDeleted {
        comment_id: CommentId,
        task_id: TaskId,
        project_id: ProjectId,
        deleted_by: UserId,
    },
    MentionCreated {
        comment: CommentSnapshot,
        project_id: ProjectId,
        mentioned_by: UserId,
    },
    TimeTrackingStarted {
        entry: TimeEntrySnapshot,
        project_id: ProjectId,
    },
    TimeTrackingStopped {
        entry: TimeEntrySnapshot,
        project_id: ProjectId,
    },
    UserJoined {
        user_id: UserId,
        project_id: ProjectId,
    },
    UserLeft {
        user_id: UserId,
        project_id: ProjectId,
    },
    UserTyping {
        user_id: UserId,
        task_id: TaskId,
    },
    UserStoppedTyping {
        user_id: UserId,
        task_id: TaskId,
    },
    ProjectUpdated {
        project: ProjectSnapshot,
        updated_by: UserId,
    },
    ProjectMemberAdded {
        project_id: ProjectId,
        user_id: UserId,
        role: Option<String>,
        added_by: UserId,
    },
    ProjectMemberRemoved {
        project_id: ProjectId,
        user_id: UserId,
        removed_by: UserId,
    },
    Subscribed {
        subject: SubjectKind,
        subject_id: i64,
    },
    Unsubscribed {
        subject: SubjectKind,
        subject_id: i64,
    },
    Presence {
        project_id: ProjectId,
        users: Vec<PresenceRecord>,
    },
}

impl ServerMessage {
    pub fn error(error: impl Into<String>) -> Self {
        ServerMessage::Error { error: error.into() }
    }

    /// The `type` string this message is sent under
    pub fn kind(&self) -> &'static str {
        match self {
            ServerMessage::AuthSuccess { .. } => "auth_success",
            ServerMessage::AuthError { .. } => "auth_error",
            ServerMessage::Notification { .. } => "notification",
            ServerMessage::Error { .. } => "error",
            ServerMessage::Heartbeat {} => "heartbeat",
            ServerMessage::TaskCreated { .. } => "task_created",
            ServerMessage::TaskUpdated { .. } => "task_updated",
            ServerMessage::TaskDeleted { .. } => "task_deleted",
            ServerMessage::TaskStatusChanged { .. } => "task_status_changed",
            ServerMessage::TaskAssigned { .. } => "task_assigned",
            ServerMessage::CommentAdded { .. } => "comment_added",
            ServerMessage::CommentUpdated { .. } => "comment_updated",
            ServerMessage::CommentDeleted { .. } => "comment_deleted",
            ServerMessage::MentionCreated { .. } => "mention_created",
            ServerMessage::TimeTrackingStarted { .. } => "time_tracking_started",
            ServerMessage::TimeTrackingStopped { .. } => "time_tracking_stopped",
            ServerMessage::UserJoined { .. } => "user_joined",
            ServerMessage::UserLeft { .. } => "user_left",
            ServerMessage::UserTyping { .. } => "user_typing",
            ServerMessage::UserStoppedTyping { .. } => "user_stopped_typing",
            ServerMessage::ProjectUpdated { .. } => "project_updated",
            ServerMessage::ProjectMemberAdded { .. } => "project_member_added",
            ServerMessage::ProjectMemberRemoved { .. } => "project_member_removed",
            ServerMessage::Subscribed { .. } => "subscribed",
            ServerMessage::Unsubscribed { .. } => "unsubscribed",
            ServerMessage::Presence { .. } => "presence",
        }
    }
}

/// Outbound envelope: a message stamped with its send time
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Envelope {
    pub message: ServerMessage,
    pub timestamp: DateTime<Utc>,
}

impl Envelope {
    pub fn new(message: ServerMessage) -> Self {
        Self {
            message,
            timestamp: Utc::now(),
        }
    }

    pub fn kind(&self) -> &'static str {
        self.message.kind()
    }

    pub fn to_value(&self) -> Result<Value, serde_json::Error> {
        let mut value = serde_json::to_value(&self.message)?;
        if let Value::Object(map) = &mut value {
            map.insert("timestamp".to_string(), serde_json::to_value(self.timestamp)?);
        }
        Ok(value)
    }

    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(&self.to_value()?)
    }

    /// Decode an outbound frame (client side)
    pub fn from_json(text: &str) -> Result<Self, ProtocolError> {
        let mut value: Value = serde_json::from_str(text).map_err(|_| ProtocolError::InvalidJson)?;
        let raw_timestamp = value
            .as_object_mut()
            .and_then(|map| map.remove("timestamp"))
            .ok_or(ProtocolError::InvalidJson)?;
        let timestamp: DateTime<Utc> = serde_json::from_value(raw_timestamp)
            .map_err(|e| ProtocolError::invalid_payload("timestamp", e.to_string()))?;
        let message = ServerMessage::deserialize(value)
            .map_err(|e| ProtocolError::invalid_payload("envelope", e.to_string()))?;
        Ok(Self { message, timestamp })
    }
}

impl From<ServerMessage> for Envelope {
    fn from(message: ServerMessage) -> Self {
        Envelope::new(message)
    }
}
