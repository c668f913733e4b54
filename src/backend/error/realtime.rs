/**
 * Real-time Error Types
 *
 * Errors raised by the collaboration core. Every variant is resolved at the
 * boundary where it happens: per message (an `error` envelope to the sender)
 * or per connection (close and clean up). None of them escape into the
 * shared registries.
 */

use thiserror::Error;

use crate::backend::auth::identity::AuthError;
use crate::backend::directory::DirectoryError;
use crate::shared::error::ProtocolError;
use crate::shared::model::ConnectionId;

#[derive(Debug, Error)]
pub enum RealtimeError {
    /// Handshake token missing, invalid or expired
    #[error("Authentication failed: {0}")]
    Authentication(#[from] AuthError),

    /// Malformed frame, bad payload or unknown message type
    #[error(transparent)]
    Protocol(#[from] ProtocolError),

    /// Referenced project or task does not exist or is not accessible
    #[error("{message}")]
    Validation { message: String },

    /// The connection went away while the operation was in flight
    #[error("Connection {0} is closed")]
    ConnectionClosed(ConnectionId),

    /// The project/task directory could not answer
    #[error("Directory lookup failed: {0}")]
    Directory(#[from] DirectoryError),
}

impl RealtimeError {
    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation {
            message: message.into(),
        }
    }

    /// Text sent to the client inside an `error` envelope
    pub fn client_message(&self) -> String {
        match self {
            Self::Directory(_) => "Unable to verify access, please retry".to_string(),
            other => other.to_string(),
        }
    }
}
