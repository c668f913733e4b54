//! Shared Error Types
//!
//! This module defines the errors raised while decoding wire envelopes. They are
//! shared between the server session loop and any Rust client that speaks the
//! same protocol.
//!
//! # Error Categories
//!
//! - `InvalidJson` - The frame is not a JSON object with a string `type`
//! - `UnknownType` - The `type` is not part of the inbound message set
//! - `InvalidPayload` - The `data` object does not match the message kind
//!
//! # Usage
//!
//! ```rust
//! use taskcollab::shared::error::ProtocolError;
//!
//! let error = ProtocolError::unknown_type("dance");
//! assert_eq!(error.to_string(), "Unknown message type: dance");
//! ```
//!
//! The `Display` text of each variant is exactly what the server sends back
//! inside an `error` envelope.
use thiserror::Error;

/// Envelope decoding failures
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ProtocolError {
    /// Frame is not valid JSON or lacks a string `type` field
    #[error("Invalid JSON message format")]
    InvalidJson,

    /// `type` names no known message
    #[error("Unknown message type: {kind}")]
    UnknownType {
        /// The offending type string
        kind: String,
    },

    /// `data` does not fit the declared message kind
    #[error("Invalid payload for {kind}: {message}")]
    InvalidPayload {
        /// The message kind being decoded
        kind: String,
        /// Human-readable decoder message
        message: String,
    },
}

impl ProtocolError {
    /// Create a new unknown-type error
    pub fn unknown_type(kind: impl Into<String>) -> Self {
        Self::UnknownType { kind: kind.into() }
    }

    /// Create a new invalid-payload error
    pub fn invalid_payload(kind: impl Into<String>, message: impl Into<String>) -> Self {
        Self::InvalidPayload {
            kind: kind.into(),
            message: message.into(),
        }
    }
}
