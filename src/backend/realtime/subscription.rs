/**
 * Subscription Index
 *
 * Maps a subject (project or task) to the users interested in it and, per
 * user, the connections that subscribed. A reverse index from connection to
 * subjects keeps disconnect cleanup proportional to what that connection
 * actually subscribed to.
 *
 * # Invariants
 *
 * - Subscribing the same (subject, user, connection) twice stores it once.
 * - Empty connection sets remove their user entry; empty user maps remove
 *   their subject entry.
 * - `by_connection` mirrors `subjects` exactly.
 */

use std::collections::{HashMap, HashSet};

use crate::shared::model::{ConnectionId, Subject, SubjectKind, UserId};

#[derive(Debug, Default)]
pub struct SubscriptionIndex {
    subjects: HashMap<Subject, HashMap<UserId, HashSet<ConnectionId>>>,
    by_connection: HashMap<ConnectionId, HashSet<(Subject, UserId)>>,
}

impl SubscriptionIndex {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns `true` if this (user, connection) pair was not yet subscribed
    pub fn subscribe(&mut self, subject: Subject, user_id: UserId, connection_id: ConnectionId) -> bool {
        let added = self
            .subjects
            .entry(subject)
            .or_default()
            .entry(user_id)
            .or_default()
            .insert(connection_id);
        if added {
            self.by_connection
                .entry(connection_id)
                .or_default()
                .insert((subject, user_id));
        }
        added
    }

    /// Remove one connection from a subject. Other connections of the same
    /// user stay subscribed.
    pub fn unsubscribe(&mut self, subject: Subject, user_id: UserId, connection_id: ConnectionId) -> bool {
        let removed = self.remove_entry(subject, user_id, connection_id);
        if removed {
            if let Some(set) = self.by_connection.get_mut(&connection_id) {
                set.remove(&(subject, user_id));
                if set.is_empty() {
                    self.by_connection.remove(&connection_id);
                }
            }
        }
        removed
    }

    /// Drop every subscription held by a connection
    pub fn remove_connection(&mut self, connection_id: &ConnectionId) -> Vec<(Subject, UserId)> {
        let Some(entries) = self.by_connection.remove(connection_id) else {
            return Vec::new();
        };
        for (subject, user_id) in &entries {
            self.remove_entry(*subject, *user_id, *connection_id);
        }
        entries.into_iter().collect()
    }

    /// Drop every connection a user has on one subject
    pub fn remove_user_from(&mut self, subject: Subject, user_id: UserId) -> Vec<ConnectionId> {
        let Some(users) = self.subjects.get_mut(&subject) else {
            return Vec::new();
        };
        let Some(connections) = users.remove(&user_id) else {
            return Vec::new();
        };
        if users.is_empty() {
            self.subjects.remove(&subject);
        }
        for connection_id in &connections {
            if let Some(set) = self.by_connection.get_mut(connection_id) {
                set.remove(&(subject, user_id));
                if set.is_empty() {
                    self.by_connection.remove(connection_id);
                }
            }
        }
        connections.into_iter().collect()
    }

    fn remove_entry(&mut self, subject: Subject, user_id: UserId, connection_id: ConnectionId) -> bool {
        let Some(users) = self.subjects.get_mut(&subject) else {
            return false;
        };
        let Some(connections) = users.get_mut(&user_id) else {
            return false;
        };
        let removed = connections.remove(&connection_id);
        if connections.is_empty() {
            users.remove(&user_id);
        }
        if users.is_empty() {
            self.subjects.remove(&subject);
        }
        removed
    }

    /// Snapshot of every (user, connection) subscribed to a subject
    pub fn subscribers(&self, subject: Subject) -> Vec<(UserId, ConnectionId)> {
        self.subjects
            .get(&subject)
            .map(|users| {
                users
                    .iter()
                    .flat_map(|(user_id, conns)| conns.iter().map(move |c| (*user_id, *c)))
                    .collect()
            })
            .unwrap_or_default()
    }

    pub fn is_subscribed(&self, subject: Subject, user_id: UserId, connection_id: ConnectionId) -> bool {
        self.subjects
            .get(&subject)
            .and_then(|users| users.get(&user_id))
            .is_some_and(|conns| conns.contains(&connection_id))
    }

    /// Users with at least one connection on the subject
    pub fn users(&self, subject: Subject) -> Vec<UserId> {
        self.subjects
            .get(&subject)
            .map(|users| users.keys().copied().collect())
            .unwrap_or_default()
    }

    /// Number of (user, connection) entries across all subjects of a kind
    pub fn entry_count(&self, kind: SubjectKind) -> usize {
        self.subjects
            .iter()
            .filter(|(subject, _)| subject.kind() == kind)
            .map(|(_, users)| users.values().map(HashSet::len).sum::<usize>())
            .sum()
    }

    pub fn is_empty(&self) -> bool {
        self.subjects.is_empty() && self.by_connection.is_empty()
    }
}
