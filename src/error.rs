//! Authentication Error Types
//!
//! Outward error taxonomy for every engine operation, plus the conversions
//! from the component-level errors (password, token, store).

use crate::password::PasswordError;
use crate::store::StoreError;
use crate::token::TokenError;

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};

/// Authentication errors
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum AuthError {
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// Bad username/password or an unusable refresh token. Deliberately vague.
    #[error("Invalid credentials")]
    InvalidCredentials,

    #[error("Token has expired")]
    ExpiredToken,

    #[error("Session has expired")]
    ExpiredSession,

    #[error("Invalid token")]
    InvalidToken,

    #[error("User not found")]
    UserNotFound,

    #[error("User already exists")]
    UserAlreadyExists,

    #[error("Access denied")]
    Forbidden,

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Infrastructure error: {0}")]
    Infrastructure(String),
}

impl AuthError {
    /// Stable machine-readable code sent to clients
    pub fn code(&self) -> &'static str {
        match self {
            AuthError::InvalidInput(_) => "invalid_input",
            AuthError::InvalidCredentials => "invalid_credentials",
            AuthError::ExpiredToken => "expired_token",
            AuthError::ExpiredSession => "expired_session",
            AuthError::InvalidToken => "invalid_token",
            AuthError::UserNotFound => "user_not_found",
            AuthError::UserAlreadyExists => "user_exists",
            AuthError::Forbidden => "forbidden",
            AuthError::Config(_) => "configuration_error",
            AuthError::Infrastructure(_) => "internal_error",
        }
    }

    /// Whether the failure is attributable to the server rather than the caller
    pub fn is_infrastructure(&self) -> bool {
        matches!(self, AuthError::Infrastructure(_) | AuthError::Config(_))
    }
}

impl IntoResponse for AuthError {
    fn into_response(self) -> Response {
        let (status, message) = match &self {
            AuthError::InvalidInput(msg) => (StatusCode::BAD_REQUEST, msg.clone()),
            AuthError::InvalidCredentials
            | AuthError::ExpiredToken
            | AuthError::ExpiredSession
            | AuthError::InvalidToken => (StatusCode::UNAUTHORIZED, self.to_string()),
            AuthError::Forbidden => (StatusCode::FORBIDDEN, self.to_string()),
            AuthError::UserNotFound => (StatusCode::NOT_FOUND, self.to_string()),
            AuthError::UserAlreadyExists => (StatusCode::CONFLICT, self.to_string()),
            // Never echo storage or signing detail to untrusted callers
            AuthError::Config(_) | AuthError::Infrastructure(_) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                "An internal error occurred".to_string(),
            ),
        };

        (
            status,
            Json(serde_json::json!({
                "error": self.code(),
                "message": message
            })),
        )
            .into_response()
    }
}

impl From<TokenError> for AuthError {
    fn from(err: TokenError) -> Self {
        match err {
            TokenError::Expired => AuthError::ExpiredToken,
            TokenError::Signing(msg) => {
                tracing::error!("Token signing error: {}", msg);
                AuthError::Infrastructure(msg)
            }
            other => {
                tracing::debug!("Token rejected: {}", other);
                AuthError::InvalidToken
            }
        }
    }
}

impl From<PasswordError> for AuthError {
    fn from(err: PasswordError) -> Self {
        tracing::error!("Password hashing error: {}", err);
        AuthError::Infrastructure(err.to_string())
    }
}

impl AuthError {
    /// Store failure the caller could not turn into a domain outcome.
    ///
    /// `op` names the engine operation, e.g. `"AuthService.refresh_tokens"`.
    pub fn store(op: &'static str, err: StoreError) -> Self {
        tracing::error!(op, error = %err, "Store operation failed");
        AuthError::Infrastructure(format!("{}: {}", op, err))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_token_errors_collapse() {
        assert_eq!(AuthError::from(TokenError::Expired), AuthError::ExpiredToken);
        assert_eq!(
            AuthError::from(TokenError::SignatureMismatch),
            AuthError::InvalidToken
        );
        assert_eq!(AuthError::from(TokenError::Malformed), AuthError::InvalidToken);
        assert_eq!(
            AuthError::from(TokenError::UnexpectedAlgorithm("RS256".into())),
            AuthError::InvalidToken
        );
        assert!(AuthError::from(TokenError::Signing("boom".into())).is_infrastructure());
    }

    #[test]
    fn test_store_failure_keeps_operation() {
        let err = AuthError::store(
            "AuthService.logout",
            StoreError::Backend("connection reset".into()),
        );
        assert!(err.is_infrastructure());
        assert_eq!(
            err,
            AuthError::Infrastructure("AuthService.logout: storage backend error: connection reset".into())
        );
    }

    #[test]
    fn test_status_mapping() {
        let cases = [
            (AuthError::InvalidInput("x".into()), StatusCode::BAD_REQUEST),
            (AuthError::InvalidCredentials, StatusCode::UNAUTHORIZED),
            (AuthError::ExpiredSession, StatusCode::UNAUTHORIZED),
            (AuthError::InvalidToken, StatusCode::UNAUTHORIZED),
            (AuthError::Forbidden, StatusCode::FORBIDDEN),
            (AuthError::UserNotFound, StatusCode::NOT_FOUND),
            (AuthError::UserAlreadyExists, StatusCode::CONFLICT),
            (
                AuthError::Infrastructure("db down".into()),
                StatusCode::INTERNAL_SERVER_ERROR,
            ),
        ];

        for (err, status) in cases {
            assert_eq!(err.into_response().status(), status);
        }
    }

    #[tokio::test]
    async fn test_infrastructure_detail_is_hidden() {
        let response =
            AuthError::Infrastructure("relation \"sessions\" does not exist".into())
                .into_response();
        let body = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        let text = String::from_utf8(body.to_vec()).unwrap();
        assert!(!text.contains("sessions"));
        assert!(text.contains("internal_error"));
    }
}
