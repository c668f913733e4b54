/**
 * Session Tokens
 *
 * This module handles JWT token generation and validation. The `sub` claim
 * carries the numeric user id issued by the main application.
 */

use jsonwebtoken::{decode, encode, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};

use crate::shared::model::UserId;

/// Default token lifetime: 30 days
pub const DEFAULT_TOKEN_TTL_SECS: i64 = 30 * 24 * 60 * 60;

/// JWT claims structure
#[derive(Debug, Serialize, Deserialize)]
pub struct Claims {
    /// User ID
    pub sub: String,
    /// Email (optional)
    #[serde(default)]
    pub email: Option<String>,
    /// Expiration time (Unix timestamp)
    pub exp: u64,
    /// Issued at time (Unix timestamp)
    pub iat: u64,
}

/// Create a JWT token for a user
///
/// # Arguments
/// * `user_id` - Numeric user id
/// * `email` - Optional email claim
/// * `secret` - HS256 signing secret
/// * `ttl_secs` - Lifetime in seconds (negative values produce an expired token)
pub fn create_token(
    user_id: UserId,
    email: Option<String>,
    secret: &str,
    ttl_secs: i64,
) -> Result<String, jsonwebtoken::errors::Error> {
    let now = chrono::Utc::now().timestamp();
    let claims = Claims {
        sub: user_id.to_string(),
        email,
        exp: now.saturating_add(ttl_secs).max(0) as u64,
        iat: now.max(0) as u64,
    };

    let key = EncodingKey::from_secret(secret.as_bytes());
    encode(&Header::default(), &claims, &key)
}

/// Verify and decode a JWT token
pub fn verify_token(token: &str, secret: &str) -> Result<Claims, jsonwebtoken::errors::Error> {
    let key = DecodingKey::from_secret(secret.as_bytes());
    let validation = Validation::default();

    let token_data = decode::<Claims>(token, &key, &validation)?;
    Ok(token_data.claims)
}
