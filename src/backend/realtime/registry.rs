/**
 * Connection Registry
 *
 * Tracks every open connection and, once authenticated, which user owns it.
 * A user may hold several connections at once (one per device or tab).
 *
 * # Invariants
 *
 * - A user's entry in `users` exists only while the user owns at least one
 *   connection; removing the last connection removes the entry.
 * - A connection appears in at most one user's set.
 *
 * The registry itself is not synchronized. It lives inside `HubState` and is
 * only touched while the hub lock is held.
 */

use std::collections::{HashMap, HashSet};

use chrono::{DateTime, Utc};
use tokio::sync::mpsc;

use crate::shared::model::{ConnectionId, UserId};
use crate::shared::protocol::Envelope;

/// One item on a connection's outbound queue
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outbound {
    /// A JSON envelope to write as a text frame
    Envelope(Envelope),
    /// Close the socket with this code; nothing queued after it is written
    Close { code: u16, reason: String },
}

pub type OutboundSender = mpsc::Sender<Outbound>;
pub type OutboundReceiver = mpsc::Receiver<Outbound>;

/// Registry entry for one connection
#[derive(Debug, Clone)]
pub struct ConnectionEntry {
    /// Owning user, `None` until the handshake succeeds
    pub user_id: Option<UserId>,
    pub sender: OutboundSender,
    pub connected_at: DateTime<Utc>,
}

#[derive(Debug, Default)]
pub struct ConnectionRegistry {
    connections: HashMap<ConnectionId, ConnectionEntry>,
    users: HashMap<UserId, HashSet<ConnectionId>>,
}

impl ConnectionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register an accepted, not yet authenticated connection
    pub fn insert(&mut self, connection_id: ConnectionId, sender: OutboundSender) {
        self.connections.insert(
            connection_id,
            ConnectionEntry {
                user_id: None,
                sender,
                connected_at: Utc::now(),
            },
        );
    }

    /// Attach a connection to its user. Returns `false` if the connection is
    /// unknown or already owned by someone else.
    pub fn bind_user(&mut self, connection_id: ConnectionId, user_id: UserId) -> bool {
        let Some(entry) = self.connections.get_mut(&connection_id) else {
            return false;
        };
        match entry.user_id {
            Some(existing) if existing != user_id => return false,
            _ => entry.user_id = Some(user_id),
        }
        self.users.entry(user_id).or_default().insert(connection_id);
        true
    }

    /// Remove a connection, dropping the user entry if it was the last one
    pub fn remove(&mut self, connection_id: &ConnectionId) -> Option<ConnectionEntry> {
        let entry = self.connections.remove(connection_id)?;
        if let Some(user_id) = entry.user_id {
            if let Some(set) = self.users.get_mut(&user_id) {
                set.remove(connection_id);
                if set.is_empty() {
                    self.users.remove(&user_id);
                }
            }
        }
        Some(entry)
    }

    pub fn get(&self, connection_id: &ConnectionId) -> Option<&ConnectionEntry> {
        self.connections.get(connection_id)
    }

    pub fn contains(&self, connection_id: &ConnectionId) -> bool {
        self.connections.contains_key(connection_id)
    }

    pub fn owner(&self, connection_id: &ConnectionId) -> Option<UserId> {
        self.connections.get(connection_id).and_then(|e| e.user_id)
    }

    pub fn is_owned_by(&self, connection_id: &ConnectionId, user_id: UserId) -> bool {
        self.owner(connection_id) == Some(user_id)
    }

    pub fn sender(&self, connection_id: &ConnectionId) -> Option<OutboundSender> {
        self.connections.get(connection_id).map(|e| e.sender.clone())
    }

    pub fn user_connections(&self, user_id: UserId) -> Vec<ConnectionId> {
        self.users
            .get(&user_id)
            .map(|set| set.iter().copied().collect())
            .unwrap_or_default()
    }

    pub fn user_connection_count(&self, user_id: UserId) -> usize {
        self.users.get(&user_id).map(HashSet::len).unwrap_or(0)
    }

    pub fn connection_count(&self) -> usize {
        self.connections.len()
    }

    pub fn user_count(&self) -> usize {
        self.users.len()
    }
}
