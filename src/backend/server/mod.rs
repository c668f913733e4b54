//! Server Module
//!
//! Server initialization, application state and startup configuration.
//!
//! - **`init`** - `create_app` and `build_state`
//! - **`state`** - `AppState` and its `FromRef` impls
//! - **`config`** - database pool and directory selection

pub mod config;
pub mod init;
pub mod state;

pub use init::{build_state, create_app};
pub use state::AppState;
