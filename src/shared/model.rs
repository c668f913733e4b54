//! Domain Snapshots
//!
//! Identifier aliases and the read-only snapshots the CRUD layer hands to the
//! real-time core after a commit. Nothing here is persisted by this crate; the
//! snapshots only travel inside outbound messages.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Numeric user id as issued by the identity provider
pub type UserId = i64;

/// Project id
pub type ProjectId = i64;

/// Task id
pub type TaskId = i64;

/// Comment id
pub type CommentId = i64;

/// Time entry id
pub type TimeEntryId = i64;

/// Opaque id of one live connection
pub type ConnectionId = Uuid;

/// Kind of subject a connection can subscribe to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SubjectKind {
    Project,
    Task,
}

/// A subscribable subject: a project or a task
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Subject {
    Project(ProjectId),
    Task(TaskId),
}

impl Subject {
    pub fn kind(&self) -> SubjectKind {
        match self {
            Subject::Project(_) => SubjectKind::Project,
            Subject::Task(_) => SubjectKind::Task,
        }
    }

    pub fn id(&self) -> i64 {
        match self {
            Subject::Project(id) | Subject::Task(id) => *id,
        }
    }
}

impl std::fmt::Display for Subject {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Subject::Project(id) => write!(f, "project:{}", id),
            Subject::Task(id) => write!(f, "task:{}", id),
        }
    }
}

/// Task as it looks right after the CRUD layer committed it
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaskSnapshot {
    pub id: TaskId,
    pub project_id: ProjectId,
    pub title: String,
    pub status: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub priority: Option<String>,
    #[serde(default)]
    pub assignee_id: Option<UserId>,
}

/// Comment on a task
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CommentSnapshot {
    pub id: CommentId,
    pub task_id: TaskId,
    pub author_id: UserId,
    pub content: String,
    pub created_at: DateTime<Utc>,
}

/// Time-tracking entry. `ended_at` and `duration_seconds` are set once stopped.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimeEntrySnapshot {
    pub id: TimeEntryId,
    pub task_id: TaskId,
    pub user_id: UserId,
    pub started_at: DateTime<Utc>,
    #[serde(default)]
    pub ended_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub duration_seconds: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

/// Project header fields
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProjectSnapshot {
    pub id: ProjectId,
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<String>,
}
