/**
 * Identity Resolution
 *
 * Turns a bearer token into a user identity. The WebSocket handshake and the
 * HTTP auth middleware both go through `IdentityResolver`, so the token
 * format is swappable without touching the collaboration core.
 */

use std::collections::HashMap;

use async_trait::async_trait;
use thiserror::Error;

use crate::backend::auth::sessions::verify_token;
use crate::shared::model::UserId;

/// Authenticated principal
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Identity {
    pub user_id: UserId,
    pub email: Option<String>,
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum AuthError {
    #[error("Missing authentication token")]
    MissingToken,
    #[error("Invalid or expired token")]
    InvalidToken,
    #[error("Invalid user id in token: {0}")]
    InvalidSubject(String),
}

#[async_trait]
pub trait IdentityResolver: Send + Sync {
    async fn resolve_identity(&self, token: &str) -> Result<Identity, AuthError>;
}

/// Resolves HS256 JWTs signed with a shared secret
#[derive(Clone)]
pub struct JwtIdentityResolver {
    secret: String,
}

impl JwtIdentityResolver {
    pub fn new(secret: impl Into<String>) -> Self {
        Self {
            secret: secret.into(),
        }
    }
}

#[async_trait]
impl IdentityResolver for JwtIdentityResolver {
    async fn resolve_identity(&self, token: &str) -> Result<Identity, AuthError> {
        if token.is_empty() {
            return Err(AuthError::MissingToken);
        }
        let claims = verify_token(token, &self.secret).map_err(|e| {
            tracing::debug!("[Auth] Token rejected: {:?}", e);
            AuthError::InvalidToken
        })?;
        let user_id = claims
            .sub
            .parse::<UserId>()
            .map_err(|_| AuthError::InvalidSubject(claims.sub.clone()))?;
        Ok(Identity {
            user_id,
            email: claims.email,
        })
    }
}

/// Fixed token → user table
#[derive(Debug, Clone, Default)]
pub struct StaticIdentityResolver {
    tokens: HashMap<String, Identity>,
}

impl StaticIdentityResolver {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_token(mut self, token: impl Into<String>, user_id: UserId) -> Self {
        self.tokens.insert(
            token.into(),
            Identity {
                user_id,
                email: None,
            },
        );
        self
    }
}

#[async_trait]
impl IdentityResolver for StaticIdentityResolver {
    async fn resolve_identity(&self, token: &str) -> Result<Identity, AuthError> {
        if token.is_empty() {
            return Err(AuthError::MissingToken);
        }
        self.tokens.get(token).cloned().ok_or(AuthError::InvalidToken)
    }
}
