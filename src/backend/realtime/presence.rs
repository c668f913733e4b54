/**
 * Presence Store
 *
 * Per-project, per-user presence. A record goes online when the user
 * subscribes to the project and offline when the user's last connection
 * closes, at which point every project the user was online in flips at once.
 * Offline records are kept so `last_seen` stays queryable.
 *
 * `current_task_id` describes the user, not the project: subscribing to a
 * task sets it on every project record where the user is online, since a task
 * subscription does not carry its project id.
 */

use std::collections::HashMap;

use chrono::{DateTime, Utc};

use crate::shared::model::{ProjectId, TaskId, UserId};
use crate::shared::protocol::{PresenceRecord, PresenceStatus};

#[derive(Debug, Default)]
pub struct PresenceStore {
    projects: HashMap<ProjectId, HashMap<UserId, PresenceRecord>>,
}

impl PresenceStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Upsert a record as online with `last_seen = now`
    pub fn mark_online(&mut self, project_id: ProjectId, user_id: UserId, now: DateTime<Utc>) {
        let record = self
            .projects
            .entry(project_id)
            .or_default()
            .entry(user_id)
            .or_insert_with(|| PresenceRecord {
                user_id,
                project_id,
                status: PresenceStatus::Online,
                last_seen: now,
                current_task_id: None,
            });
        record.status = PresenceStatus::Online;
        record.last_seen = now;
    }

    /// Flip every online record of the user to offline.
    /// Returns the projects that changed.
    pub fn mark_offline(&mut self, user_id: UserId, now: DateTime<Utc>) -> Vec<ProjectId> {
        let mut changed = Vec::new();
        for (project_id, users) in self.projects.iter_mut() {
            if let Some(record) = users.get_mut(&user_id) {
                if record.status == PresenceStatus::Online {
                    record.status = PresenceStatus::Offline;
                    record.last_seen = now;
                    record.current_task_id = None;
                    changed.push(*project_id);
                }
            }
        }
        changed.sort_unstable();
        changed
    }

    /// Refresh `last_seen` on the user's online records
    pub fn touch(&mut self, user_id: UserId, now: DateTime<Utc>) {
        for record in self.online_records_of(user_id) {
            record.last_seen = now;
        }
    }

    /// Point every online record of the user at `task_id`
    pub fn set_current_task(&mut self, user_id: UserId, task_id: TaskId) {
        for record in self.online_records_of(user_id) {
            record.current_task_id = Some(task_id);
        }
    }

    /// Clear `current_task_id` where it still points at `task_id`
    pub fn clear_current_task(&mut self, user_id: UserId, task_id: TaskId) {
        for record in self.online_records_of(user_id) {
            if record.current_task_id == Some(task_id) {
                record.current_task_id = None;
            }
        }
    }

    fn online_records_of(&mut self, user_id: UserId) -> impl Iterator<Item = &mut PresenceRecord> {
        self.projects
            .values_mut()
            .filter_map(move |users| users.get_mut(&user_id))
            .filter(|record| record.status == PresenceStatus::Online)
    }

    pub fn remove(&mut self, project_id: ProjectId, user_id: UserId) -> Option<PresenceRecord> {
        let users = self.projects.get_mut(&project_id)?;
        let record = users.remove(&user_id);
        if users.is_empty() {
            self.projects.remove(&project_id);
        }
        record
    }

    pub fn get(&self, project_id: ProjectId, user_id: UserId) -> Option<&PresenceRecord> {
        self.projects.get(&project_id).and_then(|users| users.get(&user_id))
    }

    /// Online records of a project, ordered by user id
    pub fn online(&self, project_id: ProjectId) -> Vec<PresenceRecord> {
        let mut records: Vec<PresenceRecord> = self
            .projects
            .get(&project_id)
            .map(|users| {
                users
                    .values()
                    .filter(|r| r.status == PresenceStatus::Online)
                    .cloned()
                    .collect()
            })
            .unwrap_or_default();
        records.sort_by_key(|r| r.user_id);
        records
    }

    pub fn online_count(&self) -> usize {
        self.projects
            .values()
            .flat_map(|users| users.values())
            .filter(|r| r.status == PresenceStatus::Online)
            .count()
    }
}
