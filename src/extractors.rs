//! Authentication Extractors
//!
//! Axum extractors for the authenticated caller and request metadata.

use crate::error::AuthError;
use crate::models::TokenClaims;

use axum::{async_trait, extract::FromRequestParts, http::request::Parts};
use uuid::Uuid;

/// Authenticated caller, as established by [`require_auth`](crate::middleware::require_auth)
#[derive(Debug, Clone)]
pub struct AuthUser {
    pub id: Uuid,
    pub username: String,
}

impl AuthUser {
    pub fn from_claims(claims: &TokenClaims) -> Self {
        Self {
            id: claims.user_id,
            username: claims.username.clone(),
        }
    }

    /// Only the account owner may modify an account
    pub fn ensure_is(&self, user_id: Uuid) -> Result<(), AuthError> {
        if self.id != user_id {
            return Err(AuthError::Forbidden);
        }
        Ok(())
    }
}

#[async_trait]
impl<S> FromRequestParts<S> for AuthUser
where
    S: Send + Sync,
{
    type Rejection = AuthError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts
            .extensions
            .get::<TokenClaims>()
            .map(AuthUser::from_claims)
            .ok_or(AuthError::InvalidToken)
    }
}

/// Client information (IP, user agent), used for log context
#[derive(Debug, Clone)]
pub struct ClientInfo {
    pub ip: Option<String>,
    pub user_agent: Option<String>,
}

#[async_trait]
impl<S> FromRequestParts<S> for ClientInfo
where
    S: Send + Sync,
{
    type Rejection = std::convert::Infallible;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let ip = parts
            .headers
            .get("X-Forwarded-For")
            .and_then(|h| h.to_str().ok())
            .map(|s| s.split(',').next().unwrap_or(s).trim().to_string())
            .or_else(|| {
                parts
                    .headers
                    .get("X-Real-IP")
                    .and_then(|h| h.to_str().ok())
                    .map(String::from)
            });

        let user_agent = parts
            .headers
            .get("User-Agent")
            .and_then(|h| h.to_str().ok())
            .map(String::from);

        Ok(ClientInfo { ip, user_agent })
    }
}
