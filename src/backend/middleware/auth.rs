/**
 * Authentication Middleware
 *
 * This module provides middleware for protecting the HTTP API. It extracts
 * the bearer token from the Authorization header, resolves it through the
 * configured `IdentityResolver` and provides the user to handlers.
 */

use axum::{
    extract::{Request, State},
    http::{header::AUTHORIZATION, HeaderMap, StatusCode},
    middleware::Next,
    response::Response,
};

use crate::backend::server::state::AppState;
use crate::shared::model::UserId;

/// Authenticated user data extracted from the bearer token
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct AuthenticatedUser {
    pub user_id: UserId,
    pub email: Option<String>,
}

/// Token from an `Authorization: Bearer <token>` header
pub fn bearer_token(headers: &HeaderMap) -> Option<&str> {
    headers
        .get(AUTHORIZATION)
        .and_then(|h| h.to_str().ok())
        .and_then(|h| h.strip_prefix("Bearer "))
        .map(str::trim)
        .filter(|t| !t.is_empty())
}

/// Authentication middleware
///
/// Returns 401 Unauthorized if the token is missing or rejected.
pub async fn auth_middleware(
    State(app_state): State<AppState>,
    mut request: Request,
    next: Next,
) -> Result<Response, StatusCode> {
    let token = bearer_token(request.headers()).ok_or_else(|| {
        tracing::warn!("[Auth] Missing or malformed Authorization header");
        StatusCode::UNAUTHORIZED
    })?;

    let identity = app_state.identity.resolve_identity(token).await.map_err(|e| {
        tracing::warn!("[Auth] Invalid token: {}", e);
        StatusCode::UNAUTHORIZED
    })?;

    request.extensions_mut().insert(AuthenticatedUser {
        user_id: identity.user_id,
        email: identity.email,
    });

    Ok(next.run(request).await)
}

/// Axum extractor for the user attached by `auth_middleware`
#[derive(Clone, Debug)]
pub struct AuthUser(pub AuthenticatedUser);

impl<S> axum::extract::FromRequestParts<S> for AuthUser
where
    S: Send + Sync,
{
    type Rejection = StatusCode;

    async fn from_request_parts(
        parts: &mut axum::http::request::Parts,
        _state: &S,
    ) -> Result<Self, Self::Rejection> {
        let user = parts
            .extensions
            .get::<AuthenticatedUser>()
            .cloned()
            .ok_or_else(|| {
                tracing::warn!("[Auth] AuthenticatedUser not found in request extensions");
                StatusCode::UNAUTHORIZED
            })?;

        Ok(AuthUser(user))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    #[test]
    fn test_bearer_token() {
        let mut headers = HeaderMap::new();
        assert_eq!(bearer_token(&headers), None);

        headers.insert(AUTHORIZATION, HeaderValue::from_static("Bearer abc.def"));
        assert_eq!(bearer_token(&headers), Some("abc.def"));

        headers.insert(AUTHORIZATION, HeaderValue::from_static("Basic xyz"));
        assert_eq!(bearer_token(&headers), None);

        headers.insert(AUTHORIZATION, HeaderValue::from_static("Bearer "));
        assert_eq!(bearer_token(&headers), None);
    }
}
