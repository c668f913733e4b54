//! Route Configuration Module
//!
//! This module configures all HTTP routes for the backend server.
//!
//! - **`router`** - Main router creation, `/ws` and `/health`
//! - **`api_routes`** - Authenticated `/api` endpoints
//!
//! ```text
//! routes/
//! ├── mod.rs          - Module exports and documentation
//! ├── router.rs       - Main router creation
//! └── api_routes.rs   - API endpoint handlers
//! ```

pub mod api_routes;
pub mod router;

pub use router::create_router;
