//! Common test utilities and helpers
//!
//! This module provides shared utilities for all tests including:
//! - An in-process hub with fixed users, projects and tasks
//! - A real server on an ephemeral port for WebSocket tests
//! - Custom assertion macros

#![allow(dead_code)]

#[macro_use]
pub mod assertions;
pub mod hub;
pub mod server;

// Re-export commonly used utilities
pub use hub::*;
pub use server::*;
