//! Backend Module
//!
//! This module contains all server-side code for TaskCollab. It provides
//! an Axum HTTP server hosting the collaboration WebSocket, the in-memory
//! collaboration registries and the notification fan-out.
//!
//! This module is only compiled when the `ssr` feature is enabled.
//!
//! # Architecture
//!
//! - **`server`** - Server initialization, application state, configuration
//! - **`routes`** - HTTP route configuration and router assembly
//! - **`realtime`** - Hub, registries, dispatcher, notifications, session loop
//! - **`auth`** - JWT tokens and identity resolution
//! - **`directory`** - Project/task access checks (Postgres or in-memory)
//! - **`middleware`** - Request processing middleware
//! - **`error`** - Backend-specific error types
//!
//! # Module Structure
//!
//! ```text
//! backend/
//! ├── mod.rs          - Module exports and documentation
//! ├── main.rs         - Server binary
//! ├── server/         - Server initialization and state
//! ├── routes/         - Route configuration
//! ├── realtime/       - Collaboration core
//! ├── auth/           - Authentication
//! ├── directory.rs    - Access checks
//! ├── middleware/     - Request middleware
//! └── error/          - Error types
//! ```
//!
//! # Thread Safety
//!
//! - `RealtimeHub` keeps every registry behind one `std::sync::Mutex` that
//!   is never held across an `.await`
//! - Outbound traffic goes through bounded `tokio::sync::mpsc` queues
//! - Domain events go through one bounded queue drained by a worker task
//!
//! # Error Handling
//!
//! - `RealtimeError` for collaboration operations, turned into `error`
//!   envelopes on the socket
//! - `BackendError` for HTTP handlers, turned into JSON responses

/// Server setup and configuration
pub mod server;

/// Route configuration
pub mod routes;

/// Real-time collaboration core
pub mod realtime;

/// Backend error types
pub mod error;

/// Authentication and identity
pub mod auth;

/// Project/task access directory
pub mod directory;

/// Middleware for request processing
pub mod middleware;

/// Re-export commonly used types
pub use error::{BackendError, RealtimeError};
pub use realtime::{NotificationTrigger, RealtimeHub};
pub use server::create_app;
