//! Authentication Models
//!
//! Stored entities, token claims, and the request/response DTOs of the HTTP surface.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;
use validator::Validate;

// ============================================
// Stored Entities
// ============================================

/// User record owned by the credential store
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct User {
    pub id: Uuid,
    pub username: String,
    #[serde(skip_serializing)]
    pub password_hash: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Server-side record binding a refresh token to a user
#[derive(Debug, Clone, PartialEq, Eq, FromRow)]
pub struct Session {
    pub id: Uuid,
    pub user_id: Uuid,
    pub refresh_token: String,
    pub expires_at: DateTime<Utc>,
    pub created_at: DateTime<Utc>,
}

impl Session {
    /// Whether the session has outlived its expiry as of `now`
    pub fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
        now >= self.expires_at
    }
}

/// Fields needed to persist a new session
#[derive(Debug, Clone)]
pub struct NewSession {
    pub user_id: Uuid,
    pub refresh_token: String,
    pub expires_at: DateTime<Utc>,
}

/// Fields needed to persist a new user
#[derive(Debug, Clone)]
pub struct NewUser {
    pub username: String,
    pub password_hash: String,
}

// ============================================
// Token Types
// ============================================

/// JWT claims for access tokens
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccessTokenClaims {
    /// User ID
    pub user_id: Uuid,
    /// Username at issuance
    pub username: String,
    /// Issued at timestamp
    pub iat: i64,
    /// Not before timestamp
    pub nbf: i64,
    /// Expiration timestamp
    pub exp: i64,
    /// Issuer
    pub iss: String,
    /// Subject (user ID)
    pub sub: String,
}

/// Identity extracted from a validated access token
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TokenClaims {
    pub user_id: Uuid,
    pub username: String,
    pub expires_at: DateTime<Utc>,
}

impl From<AccessTokenClaims> for TokenClaims {
    fn from(claims: AccessTokenClaims) -> Self {
        Self {
            user_id: claims.user_id,
            username: claims.username,
            expires_at: DateTime::from_timestamp(claims.exp, 0).unwrap_or_default(),
        }
    }
}

/// Output of one issuance: login or refresh
#[derive(Debug, Clone, Serialize)]
pub struct TokenPair {
    pub user_id: Uuid,
    pub access_token: String,
    pub refresh_token: String,
}

/// Result of an authorization check
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AccessDecision {
    pub is_valid: bool,
    /// Empty when the token is not valid
    pub user_id: String,
}

impl AccessDecision {
    pub fn granted(user_id: Uuid) -> Self {
        Self {
            is_valid: true,
            user_id: user_id.to_string(),
        }
    }

    pub fn denied() -> Self {
        Self {
            is_valid: false,
            user_id: String::new(),
        }
    }
}

// ============================================
// Request DTOs
// ============================================

/// Login request
#[derive(Debug, Clone, Deserialize, Validate)]
pub struct LoginRequest {
    #[validate(length(min = 1, message = "Username is required"))]
    pub username: String,

    #[validate(length(min = 1, message = "Password is required"))]
    pub password: String,
}

/// Refresh / logout request
#[derive(Debug, Clone, Deserialize, Validate)]
pub struct RefreshTokenRequest {
    #[validate(length(min = 1, message = "Refresh token is required"))]
    pub refresh_token: String,
}

/// Access check request
#[derive(Debug, Clone, Deserialize, Validate)]
pub struct CheckAccessRequest {
    #[validate(length(min = 1, message = "Access token is required"))]
    pub access_token: String,
}

/// User creation request
#[derive(Debug, Clone, Deserialize, Validate)]
pub struct CreateUserRequest {
    #[validate(length(min = 1, max = 100, message = "Username must be 1-100 characters"))]
    pub username: String,

    #[validate(length(min = 8, message = "Password must be at least 8 characters"))]
    pub password: String,
}

/// User update request; absent fields are left unchanged
#[derive(Debug, Clone, Default, Deserialize, Validate)]
pub struct UpdateUserRequest {
    #[validate(length(min = 1, max = 100, message = "Username must be 1-100 characters"))]
    pub username: Option<String>,

    #[validate(length(min = 8, message = "Password must be at least 8 characters"))]
    pub password: Option<String>,
}

// ============================================
// Response DTOs
// ============================================

/// User response (public user data without the password hash)
#[derive(Debug, Clone, Serialize)]
pub struct UserResponse {
    pub id: Uuid,
    pub username: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<User> for UserResponse {
    fn from(user: User) -> Self {
        Self {
            id: user.id,
            username: user.username,
            created_at: user.created_at,
            updated_at: user.updated_at,
        }
    }
}

/// Simple message response
#[derive(Debug, Clone, Serialize)]
pub struct MessageResponse {
    pub message: String,
}

impl MessageResponse {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}
