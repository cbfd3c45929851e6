//! Persistence contracts for users and sessions
//!
//! Every operation reports a missing record as [`StoreError::NotFound`], kept
//! apart from backend failures so callers can turn it into a domain outcome.
//! A single create, lookup or delete is atomic; nothing spans several calls.

pub mod memory;
pub mod postgres;

pub use memory::{MemorySessionStore, MemoryUserStore};
pub use postgres::{PgSessionStore, PgUserStore};

use crate::models::{NewSession, NewUser, Session, User};

use async_trait::async_trait;
use uuid::Uuid;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum StoreError {
    #[error("record not found")]
    NotFound,

    /// A uniqueness constraint (username, refresh token) was violated
    #[error("conflicting record: {0}")]
    Conflict(String),

    #[error("storage backend error: {0}")]
    Backend(String),
}

impl From<sqlx::Error> for StoreError {
    fn from(err: sqlx::Error) -> Self {
        match err {
            sqlx::Error::RowNotFound => StoreError::NotFound,
            sqlx::Error::Database(db_err) if db_err.is_unique_violation() => {
                StoreError::Conflict(db_err.message().to_string())
            }
            other => StoreError::Backend(other.to_string()),
        }
    }
}

/// Credential store
#[async_trait]
pub trait UserStore: Send + Sync {
    /// Insert a user; a taken username is [`StoreError::Conflict`]
    async fn create_user(&self, user: NewUser) -> Result<User, StoreError>;

    async fn user_by_id(&self, id: Uuid) -> Result<User, StoreError>;

    /// Exact, case-sensitive match
    async fn user_by_username(&self, username: &str) -> Result<User, StoreError>;

    /// Overwrite username and password hash of an existing user
    async fn update_user(&self, user: &User) -> Result<User, StoreError>;

    async fn delete_user(&self, id: Uuid) -> Result<(), StoreError>;
}

/// Session store keyed by refresh-token value
#[async_trait]
pub trait SessionStore: Send + Sync {
    /// Insert a session; a refresh token already in use is [`StoreError::Conflict`]
    async fn create_session(&self, session: NewSession) -> Result<Session, StoreError>;

    async fn session_by_refresh_token(&self, refresh_token: &str)
        -> Result<Session, StoreError>;

    /// Delete one session. Of two concurrent deletes of the same id exactly one
    /// succeeds; the other gets [`StoreError::NotFound`].
    async fn delete_session(&self, id: Uuid) -> Result<(), StoreError>;

    /// Delete every session of a user, returning how many were removed
    async fn delete_all_sessions_for_user(&self, user_id: Uuid) -> Result<u64, StoreError>;
}
