//! Middleware Module
//!
//! HTTP middleware for the backend server.
//!
//! - **`auth`** - bearer-token authentication for the `/api` routes

pub mod auth;

pub use auth::{auth_middleware, bearer_token, AuthUser, AuthenticatedUser};
