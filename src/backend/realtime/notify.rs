/**
 * Notification Trigger Layer
 *
 * Fire-and-forget bridge from the CRUD layer to connected clients. Callers
 * invoke one adapter per committed mutation; the adapter builds a
 * `DomainEvent` and pushes it onto a bounded queue. A single worker task
 * drains the queue and runs `fan_out`, which maps the event to scoped
 * deliveries on the hub.
 *
 * Adapters never fail and never block. A full queue or a stopped worker is
 * logged and counted in `dropped_count`.
 */

use std::panic::AssertUnwindSafe;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use tokio::sync::mpsc;
use tokio::task::JoinHandle;

use crate::backend::realtime::hub::RealtimeHub;
use crate::shared::event::DomainEvent;
use crate::shared::model::{
    CommentId, CommentSnapshot, ProjectId, ProjectSnapshot, Subject, TaskId, TaskSnapshot,
    TimeEntrySnapshot, UserId,
};
use crate::shared::protocol::{AssignmentAction, ServerMessage};

/// Default notification queue size
pub const DEFAULT_QUEUE_CAPACITY: usize = 1024;

#[derive(Clone)]
pub struct NotificationTrigger {
    tx: mpsc::Sender<DomainEvent>,
    dropped: Arc<AtomicU64>,
}

impl NotificationTrigger {
    /// Start the fan-out worker for `hub`
    pub fn spawn(hub: Arc<RealtimeHub>, capacity: usize) -> (Self, JoinHandle<()>) {
        Self::spawn_with(hub, capacity, fan_out)
    }

    /// Start a worker that routes each event through `route`. A panic in
    /// `route` is logged and the worker moves on to the next event.
    pub fn spawn_with<F>(hub: Arc<RealtimeHub>, capacity: usize, route: F) -> (Self, JoinHandle<()>)
    where
        F: Fn(&RealtimeHub, DomainEvent) -> usize + Send + 'static,
    {
        let (trigger, mut rx) = Self::with_channel(capacity);
        let handle = tokio::spawn(async move {
            tracing::info!("[Notify] Worker started");
            while let Some(event) = rx.recv().await {
                let name = event.name();
                match std::panic::catch_unwind(AssertUnwindSafe(|| route(&hub, event))) {
                    Ok(delivered) => {
                        tracing::debug!("[Notify] {} delivered to {} connections", name, delivered)
                    }
                    Err(_) => tracing::error!("[Notify] Panic while fanning out {}", name),
                }
            }
            tracing::info!("[Notify] Worker stopped");
        });
        (trigger, handle)
    }

    /// Trigger plus the raw receiving end, with no worker attached
    pub fn with_channel(capacity: usize) -> (Self, mpsc::Receiver<DomainEvent>) {
        let (tx, rx) = mpsc::channel(capacity.max(1));
        (
            Self {
                tx,
                dropped: Arc::new(AtomicU64::new(0)),
            },
            rx,
        )
    }

    /// Queue an event. Never fails; overflow is counted.
    pub fn submit(&self, event: DomainEvent) {
        if let Err(e) = self.tx.try_send(event) {
            let (reason, event) = match e {
                mpsc::error::TrySendError::Full(event) => ("queue full", event),
                mpsc::error::TrySendError::Closed(event) => ("worker stopped", event),
            };
            self.dropped.fetch_add(1, Ordering::Relaxed);
            tracing::warn!("[Notify] Dropped {} ({})", event.name(), reason);
        }
    }

    /// Events lost to overflow or a stopped worker
    pub fn dropped_count(&self) -> u64 {
        self.dropped.load(Ordering::Relaxed)
    }

    pub fn task_created(&self, actor_id: UserId, task: TaskSnapshot) {
        self.submit(DomainEvent::TaskCreated { actor_id, task });
    }

    pub fn task_updated(&self, actor_id: UserId, task: TaskSnapshot, changes: Vec<String>) {
        self.submit(DomainEvent::TaskUpdated {
            actor_id,
            task,
            changes,
        });
    }

    pub fn task_deleted(&self, actor_id: UserId, project_id: ProjectId, task_id: TaskId) {
        self.submit(DomainEvent::TaskDeleted {
            actor_id,
            project_id,
            task_id,
        });
    }

    pub fn task_status_changed(&self, actor_id: UserId, task: TaskSnapshot, old_status: impl Into<String>) {
        self.submit(DomainEvent::TaskStatusChanged {
            actor_id,
            task,
            old_status: old_status.into(),
        });
    }

    /// `task.assignee_id` is the new assignee
    pub fn task_assigned(&self, actor_id: UserId, task: TaskSnapshot, old_assignee_id: Option<UserId>) {
        self.submit(DomainEvent::TaskAssigned {
            actor_id,
            task,
            old_assignee_id,
        });
    }

    pub fn comment_added(&self, actor_id: UserId, project_id: ProjectId, comment: CommentSnapshot) {
        self.submit(DomainEvent::CommentAdded {
            actor_id,
            project_id,
            comment,
        });
    }

    pub fn comment_updated(&self, actor_id: UserId, project_id: ProjectId, comment: CommentSnapshot) {
        self.submit(DomainEvent::CommentUpdated {
            actor_id,
            project_id,
            comment,
        });
    }

    pub fn comment_deleted(&self, actor_id: UserId, project_id: ProjectId, task_id: TaskId, comment_id: CommentId) {
        self.submit(DomainEvent::CommentDeleted {
            actor_id,
            project_id,
            task_id,
            comment_id,
        });
    }

    pub fn mention_created(
        &self,
        actor_id: UserId,
        project_id: ProjectId,
        mentioned_user_id: UserId,
        comment: CommentSnapshot,
    ) {
        self.submit(DomainEvent::MentionCreated {
            actor_id,
            project_id,
            mentioned_user_id,
            comment,
        });
    }

    pub fn time_tracking_started(&self, actor_id: UserId, project_id: ProjectId, entry: TimeEntrySnapshot) {
        self.submit(DomainEvent::TimeTrackingStarted {
            actor_id,
            project_id,
            entry,
        });
    }

    pub fn time_tracking_stopped(&self, actor_id: UserId, project_id: ProjectId, entry: TimeEntrySnapshot) {
        self.submit(DomainEvent::TimeTrackingStopped {
            actor_id,
            project_id,
            entry,
        });
    }

    pub fn project_updated(&self, actor_id: UserId, project: ProjectSnapshot) {
        self.submit(DomainEvent::ProjectUpdated { actor_id, project });
    }

    pub fn project_member_added(&self, actor_id: UserId, project_id: ProjectId, user_id: UserId, role: Option<String>) {
        self.submit(DomainEvent::ProjectMemberAdded {
            actor_id,
            project_id,
            user_id,
            role,
        });
    }

    pub fn project_member_removed(&self, actor_id: UserId, project_id: ProjectId, user_id: UserId) {
        self.submit(DomainEvent::ProjectMemberRemoved {
            actor_id,
            project_id,
            user_id,
        });
    }
}

/// Action shown to project/task watchers for an assignment change
fn broadcast_action(old: Option<UserId>, new: Option<UserId>) -> AssignmentAction {
    match (old, new) {
        (Some(old), Some(new)) if old != new => AssignmentAction::Reassigned,
        (_, Some(_)) => AssignmentAction::Assigned,
        (_, None) => AssignmentAction::Unassigned,
    }
}

/// Route one event to its audience. Returns the number of enqueued copies.
pub fn fan_out(hub: &RealtimeHub, event: DomainEvent) -> usize {
    match event {
        DomainEvent::TaskCreated { actor_id, task } => hub.broadcast_to_project(
            task.project_id,
            ServerMessage::TaskCreated {
                task,
                created_by: actor_id,
            },
            Some(actor_id),
        ),
        DomainEvent::TaskUpdated {
            actor_id,
            task,
            changes,
        } => hub.broadcast_to_subjects(
            &[Subject::Project(task.project_id), Subject::Task(task.id)],
            ServerMessage::TaskUpdated {
                task,
                updated_by: actor_id,
                changes,
            },
            Some(actor_id),
        ),
        DomainEvent::TaskDeleted {
            actor_id,
            project_id,
            task_id,
        } => hub.broadcast_to_subjects(
            &[Subject::Project(project_id), Subject::Task(task_id)],
            ServerMessage::TaskDeleted {
                task_id,
                project_id,
                deleted_by: actor_id,
            },
            Some(actor_id),
        ),
        DomainEvent::TaskStatusChanged {
            actor_id,
            task,
            old_status,
        } => hub.broadcast_to_subjects(
            &[Subject::Project(task.project_id), Subject::Task(task.id)],
            ServerMessage::TaskStatusChanged {
                task_id: task.id,
                project_id: task.project_id,
                old_status,
                new_status: task.status.clone(),
                changed_by: actor_id,
            },
            Some(actor_id),
        ),
        DomainEvent::TaskAssigned {
            actor_id,
            task,
            old_assignee_id,
        } => fan_out_assignment(hub, actor_id, task, old_assignee_id),
        DomainEvent::CommentAdded {
            actor_id,
            project_id,
            comment,
        } => hub.broadcast_to_subjects(
            &[Subject::Task(comment.task_id), Subject::Project(project_id)],
            ServerMessage::CommentAdded {
                comment,
                project_id,
            },
            Some(actor_id),
        ),
        DomainEvent::CommentUpdated {
            actor_id,
            project_id,
            comment,
        } => hub.broadcast_to_subjects(
            &[Subject::Task(comment.task_id), Subject::Project(project_id)],
            ServerMessage::CommentUpdated {
                comment,
                project_id,
            },
            Some(actor_id),
        ),
        DomainEvent::CommentDeleted {
            actor_id,
            project_id,
            task_id,
            comment_id,
        } => hub.broadcast_to_subjects(
            &[Subject::Task(task_id), Subject::Project(project_id)],
            ServerMessage::CommentDeleted {
                comment_id,
                task_id,
                project_id,
                deleted_by: actor_id,
            },
            Some(actor_id),
        ),
        DomainEvent::MentionCreated {
            actor_id,
            project_id,
            mentioned_user_id,
            comment,
        } => hub.send_to_user(
            mentioned_user_id,
            ServerMessage::MentionCreated {
                comment,
                project_id,
                mentioned_by: actor_id,
            },
        ),
        DomainEvent::TimeTrackingStarted {
            actor_id,
            project_id,
            entry,
        } => hub.broadcast_to_subjects(
            &[Subject::Project(project_id), Subject::Task(entry.task_id)],
            ServerMessage::TimeTrackingStarted { entry, project_id },
            Some(actor_id),
        ),
        DomainEvent::TimeTrackingStopped {
            actor_id,
            project_id,
            entry,
        } => hub.broadcast_to_subjects(
            &[Subject::Project(project_id), Subject::Task(entry.task_id)],
            ServerMessage::TimeTrackingStopped { entry, project_id },
            Some(actor_id),
        ),
        DomainEvent::ProjectUpdated { actor_id, project } => hub.broadcast_to_project(
            project.id,
            ServerMessage::ProjectUpdated {
                project,
                updated_by: actor_id,
            },
            Some(actor_id),
        ),
        DomainEvent::ProjectMemberAdded {
            actor_id,
            project_id,
            user_id,
            role,
        } => {
            let broadcast = hub.broadcast_to_project(
                project_id,
                ServerMessage::ProjectMemberAdded {
                    project_id,
                    user_id,
                    role,
                    added_by: actor_id,
                },
                Some(actor_id),
            );
            let direct = hub.send_to_user(
                user_id,
                ServerMessage::Notification {
                    title: "Added to project".to_string(),
                    message: format!("You were added to project {}", project_id),
                    project_id: Some(project_id),
                },
            );
            broadcast + direct
        }
        DomainEvent::ProjectMemberRemoved {
            actor_id,
            project_id,
            user_id,
        } => {
            let message = ServerMessage::ProjectMemberRemoved {
                project_id,
                user_id,
                removed_by: actor_id,
            };
            let broadcast = hub.broadcast_to_project(project_id, message.clone(), Some(actor_id));
            let direct = hub.send_to_user(user_id, message);
            hub.revoke_project_access(user_id, project_id);
            broadcast + direct
        }
    }
}

fn fan_out_assignment(
    hub: &RealtimeHub,
    actor_id: UserId,
    task: TaskSnapshot,
    old_assignee_id: Option<UserId>,
) -> usize {
    let new_assignee_id = task.assignee_id;
    let message = |action| ServerMessage::TaskAssigned {
        task: task.clone(),
        action,
        old_assignee_id,
        new_assignee_id,
        assigned_by: actor_id,
    };

    let mut delivered = 0;
    if let Some(old) = old_assignee_id.filter(|old| Some(*old) != new_assignee_id) {
        delivered += hub.send_to_user(old, message(AssignmentAction::Unassigned));
    }
    if let Some(new) = new_assignee_id {
        delivered += hub.send_to_user(new, message(AssignmentAction::Assigned));
    }
    delivered += hub.broadcast_to_subjects(
        &[Subject::Project(task.project_id), Subject::Task(task.id)],
        message(broadcast_action(old_assignee_id, new_assignee_id)),
        Some(actor_id),
    );
    delivered
}
