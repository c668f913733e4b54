/**
 * Domain Events
 *
 * This module defines the events the CRUD layer reports after a successful
 * commit. Each event carries the acting user and a snapshot of what changed;
 * the notification layer decides who hears about it.
 *
 * Events are also accepted as JSON on `POST /api/events`, tagged by `event`:
 *
 * ```json
 * {"event": "task_deleted", "actor_id": 3, "project_id": 1, "task_id": 9}
 * ```
 */
use serde::{Deserialize, Serialize};

use crate::shared::model::{
    CommentId, CommentSnapshot, ProjectId, ProjectSnapshot, TaskId, TaskSnapshot,
    TimeEntrySnapshot, UserId,
};

/// A committed mutation in the task/project domain
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum DomainEvent {
    TaskCreated {
        actor_id: UserId,
        task: TaskSnapshot,
    },
    TaskUpdated {
        actor_id: UserId,
        task: TaskSnapshot,
        #[serde(default)]
        changes: Vec<String>,
    },
    TaskDeleted {
        actor_id: UserId,
        project_id: ProjectId,
        task_id: TaskId,
    },
    TaskStatusChanged {
        actor_id: UserId,
        task: TaskSnapshot,
        old_status: String,
    },
    TaskAssigned {
        actor_id: UserId,
        task: TaskSnapshot,
        old_assignee_id: Option<UserId>,
    },
    CommentAdded {
        actor_id: UserId,
        project_id: ProjectId,
        comment: CommentSnapshot,
    },
    CommentUpdated {
        actor_id: UserId,
        project_id: ProjectId,
        comment: CommentSnapshot,
    },
    CommentDeleted {
        actor_id: UserId,
        project_id: ProjectId,
        task_id: TaskId,
        comment_id: CommentId,
    },
    MentionCreated {
        actor_id: UserId,
        project_id: ProjectId,
        mentioned_user_id: UserId,
        comment: CommentSnapshot,
    },
    TimeTrackingStarted {
        actor_id: UserId,
        project_id: ProjectId,
        entry: TimeEntrySnapshot,
    },
    TimeTrackingStopped {
        actor_id: UserId,
        project_id: ProjectId,
        entry: TimeEntrySnapshot,
    },
    ProjectUpdated {
        actor_id: UserId,
        project: ProjectSnapshot,
    },
    ProjectMemberAdded {
        actor_id: UserId,
        project_id: ProjectId,
        user_id: UserId,
        #[serde(default)]
        role: Option<String>,
    },
    ProjectMemberRemoved {
        actor_id: UserId,
        project_id: ProjectId,
        user_id: UserId,
    },
}

impl DomainEvent {
    /// Name used in logs
    pub fn name(&self) -> &'static str {
        match self {
            DomainEvent::TaskCreated { .. } => "task_created",
            DomainEvent::TaskUpdated { .. } => "task_updated",
            DomainEvent::TaskDeleted { .. } => "task_deleted",
            DomainEvent::TaskStatusChanged { .. } => "task_status_changed",
            DomainEvent::TaskAssigned { .. } => "task_assigned",
            DomainEvent::CommentAdded { .. } => "comment_added",
            DomainEvent::CommentUpdated { .. } => "comment_updated",
            DomainEvent::CommentDeleted { .. } => "comment_deleted",
            DomainEvent::MentionCreated { .. } => "mention_created",
            DomainEvent::TimeTrackingStarted { .. } => "time_tracking_started",
            DomainEvent::TimeTrackingStopped { .. } => "time_tracking_stopped",
            DomainEvent::ProjectUpdated { .. } => "project_updated",
            DomainEvent::ProjectMemberAdded { .. } => "project_member_added",
            DomainEvent::ProjectMemberRemoved { .. } => "project_member_removed",
        }
    }

    /// The user whose action produced the event
    pub fn actor_id(&self) -> UserId {
        match self {
            DomainEvent::TaskCreated { actor_id, .. }
            | DomainEvent::TaskUpdated { actor_id, .. }
            | DomainEvent::TaskDeleted { actor_id, .. }
            | DomainEvent::TaskStatusChanged { actor_id, .. }
            | DomainEvent::TaskAssigned { actor_id, .. }
            | DomainEvent::CommentAdded { actor_id, .. }
            | DomainEvent::CommentUpdated { actor_id, .. }
            | DomainEvent::CommentDeleted { actor_id, .. }
            | DomainEvent::MentionCreated { actor_id, .. }
            | DomainEvent::TimeTrackingStarted { actor_id, .. }
            | DomainEvent::TimeTrackingStopped { actor_id, .. }
            | DomainEvent::ProjectUpdated { actor_id, .. }
            | DomainEvent::ProjectMemberAdded { actor_id, .. }
            | DomainEvent::ProjectMemberRemoved { actor_id, .. } => *actor_id,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_event_json_tag() {
        let event: DomainEvent = serde_json::from_value(serde_json::json!({
            "event": "task_deleted",
            "actor_id": 3,
            "project_id": 1,
            "task_id": 9
        }))
        .unwrap();
        assert_eq!(
            event,
            DomainEvent::TaskDeleted { actor_id: 3, project_id: 1, task_id: 9 }
        );
        assert_eq!(event.name(), "task_deleted");
        assert_eq!(event.actor_id(), 3);
    }

    #[test]
    fn test_member_added_role_is_optional() {
        let event: DomainEvent = serde_json::from_value(serde_json::json!({
            "event": "project_member_added",
            "actor_id": 1,
            "project_id": 2,
            "user_id": 5
        }))
        .unwrap();
        match event {
            DomainEvent::ProjectMemberAdded { role, .. } => assert!(role.is_none()),
            _ => panic!("Expected ProjectMemberAdded"),
        }
    }

    #[test]
    fn test_unknown_event_rejected() {
        let result: Result<DomainEvent, _> =
            serde_json::from_value(serde_json::json!({"event": "task_exploded", "actor_id": 1}));
        assert!(result.is_err());
    }
}
