//! Backend Error Module
//!
//! This module defines error types specific to the backend server.
//!
//! # Module Structure
//!
//! ```text
//! error/
//! ├── mod.rs        - Module exports and documentation
//! ├── types.rs      - HTTP-facing BackendError
//! ├── realtime.rs   - RealtimeError for the collaboration core
//! └── conversion.rs - IntoResponse for BackendError
//! ```

/// Error type definitions
pub mod types;

/// Collaboration core errors
pub mod realtime;

/// Error conversion implementations
pub mod conversion;

// Re-export commonly used types
pub use types::BackendError;
pub use realtime::RealtimeError;
