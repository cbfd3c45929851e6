//! Authentication Middleware
//!
//! Bearer token validation for protected routes.

use crate::error::AuthError;
use crate::handlers::AppState;

use axum::{
    extract::{Request, State},
    http::header::AUTHORIZATION,
    middleware::Next,
    response::Response,
};

/// Pull the token out of an `Authorization: Bearer <token>` header value
pub fn bearer_token(header: Option<&str>) -> Result<&str, AuthError> {
    let header = header.ok_or(AuthError::InvalidToken)?;

    header
        .strip_prefix("Bearer ")
        .map(str::trim)
        .filter(|t| !t.is_empty())
        .ok_or(AuthError::InvalidToken)
}

/// Require authenticated user
///
/// Validates the access token from the Authorization header and stores the
/// resulting [`TokenClaims`](crate::models::TokenClaims) in request
/// extensions for the [`AuthUser`](crate::extractors::AuthUser) extractor.
pub async fn require_auth(
    State(state): State<AppState>,
    mut req: Request,
    next: Next,
) -> Result<Response, AuthError> {
    let auth_header = req
        .headers()
        .get(AUTHORIZATION)
        .and_then(|h| h.to_str().ok());

    let token = bearer_token(auth_header)?;
    let claims = state.auth.validate_token(token)?;

    req.extensions_mut().insert(claims);

    Ok(next.run(req).await)
}
