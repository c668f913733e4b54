//! Shared Module
//!
//! This module contains types and data structures that are shared between
//! the server and any Rust client of the collaboration socket. These types
//! define the wire format and the domain snapshots carried inside it.
//!
//! # Overview
//!
//! The shared module provides platform-agnostic types that can be used
//! in both server and client code. All types are designed for serialization
//! and transmission over the WebSocket protocol.

/// Identifiers and domain snapshots
pub mod model;

/// Inbound/outbound envelope types
pub mod protocol;

/// Domain events reported by the CRUD layer
pub mod event;

/// Shared error types
pub mod error;

/// Application configuration
pub mod config;

/// Re-export commonly used types for convenience
pub use model::{ConnectionId, ProjectId, Subject, SubjectKind, TaskId, UserId};
pub use protocol::{ClientMessage, ClientMessageKind, Envelope, ServerMessage};
pub use event::DomainEvent;
pub use error::ProtocolError;
pub use config::{RealtimeConfig, RealtimeConfigBuilder, ConfigError};
