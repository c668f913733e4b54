/**
 * Typing Indicator Tracker
 *
 * Ephemeral "user is typing on task" state, keyed by (task, user). Each entry
 * remembers the connection that started it so a dropped connection can clear
 * exactly the indicators it owns.
 *
 * Indicators do not expire on their own; they end on `typing_stop` or when the
 * owning connection is cleaned up.
 */

use std::collections::HashMap;

use chrono::{DateTime, Utc};

use crate::shared::model::{ConnectionId, TaskId, UserId};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TypingIndicator {
    pub started_at: DateTime<Utc>,
    pub connection_id: ConnectionId,
}

#[derive(Debug, Default)]
pub struct TypingTracker {
    entries: HashMap<(TaskId, UserId), TypingIndicator>,
}

impl TypingTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Start (or restart) an indicator. Returns the entry it replaced.
    pub fn start(
        &mut self,
        task_id: TaskId,
        user_id: UserId,
        connection_id: ConnectionId,
        now: DateTime<Utc>,
    ) -> Option<TypingIndicator> {
        self.entries.insert(
            (task_id, user_id),
            TypingIndicator {
                started_at: now,
                connection_id,
            },
        )
    }

    pub fn stop(&mut self, task_id: TaskId, user_id: UserId) -> Option<TypingIndicator> {
        self.entries.remove(&(task_id, user_id))
    }

    /// Remove every indicator started from this connection
    pub fn remove_connection(&mut self, connection_id: &ConnectionId) -> Vec<(TaskId, UserId)> {
        let stale: Vec<(TaskId, UserId)> = self
            .entries
            .iter()
            .filter(|(_, indicator)| indicator.connection_id == *connection_id)
            .map(|(key, _)| *key)
            .collect();
        for key in &stale {
            self.entries.remove(key);
        }
        stale
    }

    pub fn get(&self, task_id: TaskId, user_id: UserId) -> Option<&TypingIndicator> {
        self.entries.get(&(task_id, user_id))
    }

    pub fn typists(&self, task_id: TaskId) -> Vec<UserId> {
        let mut users: Vec<UserId> = self
            .entries
            .keys()
            .filter(|(task, _)| *task == task_id)
            .map(|(_, user)| *user)
            .collect();
        users.sort_unstable();
        users
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use uuid::Uuid;

    #[test]
    fn test_start_overwrites_connection_and_time() {
        let mut tracker = TypingTracker::new();
        let first = Uuid::new_v4();
        let second = Uuid::new_v4();
        let t0 = Utc::now();
        let t1 = t0 + chrono::Duration::seconds(2);

        assert!(tracker.start(7, 1, first, t0).is_none());
        let previous = tracker.start(7, 1, second, t1).unwrap();
        assert_eq!(previous.connection_id, first);

        let current = tracker.get(7, 1).unwrap();
        assert_eq!(current.connection_id, second);
        assert_eq!(current.started_at, t1);
        assert_eq!(tracker.len(), 1);
    }

    #[test]
    fn test_remove_connection_only_clears_its_own() {
        let mut tracker = TypingTracker::new();
        let dying = Uuid::new_v4();
        let alive = Uuid::new_v4();
        let now = Utc::now();
        tracker.start(7, 1, dying, now);
        tracker.start(8, 1, dying, now);
        tracker.start(7, 2, alive, now);

        let mut removed = tracker.remove_connection(&dying);
        removed.sort_unstable();
        assert_eq!(removed, vec![(7, 1), (8, 1)]);
        assert_eq!(tracker.typists(7), vec![2]);
    }

    #[test]
    fn test_restarted_elsewhere_survives_old_connection_cleanup() {
        let mut tracker = TypingTracker::new();
        let old = Uuid::new_v4();
        let new = Uuid::new_v4();
        tracker.start(7, 1, old, Utc::now());
        tracker.start(7, 1, new, Utc::now());

        assert!(tracker.remove_connection(&old).is_empty());
        assert_eq!(tracker.typists(7), vec![1]);
    }

    #[test]
    fn test_stop() {
        let mut tracker = TypingTracker::new();
        tracker.start(7, 1, Uuid::new_v4(), Utc::now());
        assert!(tracker.stop(7, 1).is_some());
        assert!(tracker.stop(7, 1).is_none());
        assert!(tracker.is_empty());
    }
}
