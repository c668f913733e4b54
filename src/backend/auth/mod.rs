//! Authentication Module
//!
//! Token handling for the realtime server. The main application issues
//! HS256 JWTs whose `sub` is the numeric user id; this module verifies them.
//!
//! - **`sessions`** - JWT creation and verification
//! - **`identity`** - `IdentityResolver` and its JWT/static implementations

pub mod identity;
pub mod sessions;

pub use identity::{AuthError, Identity, IdentityResolver, JwtIdentityResolver, StaticIdentityResolver};
pub use sessions::{create_token, verify_token, Claims};
