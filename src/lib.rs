//! TaskCollab - Real-time Collaboration Core
//!
//! TaskCollab is the live-update side of a task/project-management backend. It
//! tracks connected clients, their project and task subscriptions, per-project
//! presence and typing indicators, and turns committed domain events into
//! fan-out messages over WebSocket.
//!
//! # Module Structure
//!
//! - **`shared`** - Types shared between server and clients
//!   - Wire envelopes, domain snapshots and events
//!   - Protocol error types
//!   - Configuration
//!
//! - **`backend`** - Server-side code (only compiled with `ssr` feature)
//!   - Axum server with the `/ws` collaboration socket
//!   - Connection registry, subscriptions, presence and typing state
//!   - Notification trigger layer for the CRUD layer
//!   - JWT identity and project/task directory collaborators
//!
//! # Feature Flags
//!
//! - **`ssr`** (default) - Enables the `backend` module and the server binary
//!
//! # Usage
//!
//! ```rust,no_run
//! use taskcollab::backend::server::init::create_app;
//! use taskcollab::shared::RealtimeConfig;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let config = RealtimeConfig::load()?;
//! let app = create_app(config).await;
//! // Serve with axum::serve
//! # Ok(())
//! # }
//! ```
//!
//! # Thread Safety
//!
//! All connection state lives in one `RealtimeHub` behind a single mutex and is
//! shared with handlers through `Arc`. Per-connection output goes through a
//! bounded `mpsc` queue drained by a dedicated writer task.

/// Shared types and data structures
pub mod shared;

/// Backend server-side code
#[cfg(feature = "ssr")]
pub mod backend;
