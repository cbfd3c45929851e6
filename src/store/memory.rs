//! In-process stores
//!
//! Hash-map backed implementations of the store contracts, guarded by a
//! `tokio::sync::RwLock`. Each operation holds the lock for its whole
//! check-and-mutate step, which gives the same per-row atomicity as the
//! Postgres unique indexes and `DELETE ... WHERE id = $1`.

use super::{SessionStore, StoreError, UserStore};
use crate::models::{NewSession, NewUser, Session, User};

use async_trait::async_trait;
use chrono::Utc;
use std::collections::HashMap;
use tokio::sync::RwLock;
use uuid::Uuid;

#[derive(Debug, Default)]
pub struct MemoryUserStore {
    users: RwLock<HashMap<Uuid, User>>,
}

impl MemoryUserStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl UserStore for MemoryUserStore {
    async fn create_user(&self, user: NewUser) -> Result<User, StoreError> {
        let mut users = self.users.write().await;

        if users.values().any(|u| u.username == user.username) {
            return Err(StoreError::Conflict(format!(
                "username {} is taken",
                user.username
            )));
        }

        let now = Utc::now();
        let user = User {
            id: Uuid::new_v4(),
            username: user.username,
            password_hash: user.password_hash,
            created_at: now,
            updated_at: now,
        };
        users.insert(user.id, user.clone());

        Ok(user)
    }

    async fn user_by_id(&self, id: Uuid) -> Result<User, StoreError> {
        self.users
            .read()
            .await
            .get(&id)
            .cloned()
            .ok_or(StoreError::NotFound)
    }

    async fn user_by_username(&self, username: &str) -> Result<User, StoreError> {
        self.users
            .read()
            .await
            .values()
            .find(|u| u.username == username)
            .cloned()
            .ok_or(StoreError::NotFound)
    }

    async fn update_user(&self, user: &User) -> Result<User, StoreError> {
        let mut users = self.users.write().await;

        if users
            .values()
            .any(|u| u.id != user.id && u.username == user.username)
        {
            return Err(StoreError::Conflict(format!(
                "username {} is taken",
                user.username
            )));
        }

        let stored = users.get_mut(&user.id).ok_or(StoreError::NotFound)?;
        stored.username = user.username.clone();
        stored.password_hash = user.password_hash.clone();
        stored.updated_at = Utc::now();

        Ok(stored.clone())
    }

    async fn delete_user(&self, id: Uuid) -> Result<(), StoreError> {
        self.users
            .write()
            .await
            .remove(&id)
            .map(|_| ())
            .ok_or(StoreError::NotFound)
    }
}

#[derive(Debug, Default)]
pub struct MemorySessionStore {
    /// Keyed by refresh token, which is unique across live sessions
    sessions: RwLock<HashMap<String, Session>>,
}

impl MemorySessionStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored sessions, expired ones included
    pub async fn len(&self) -> usize {
        self.sessions.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.sessions.read().await.is_empty()
    }

    /// Store a fully specified session as-is
    pub async fn insert(&self, session: Session) -> Result<(), StoreError> {
        let mut sessions = self.sessions.write().await;
        if sessions.contains_key(&session.refresh_token) {
            return Err(StoreError::Conflict("refresh token in use".to_string()));
        }
        sessions.insert(session.refresh_token.clone(), session);
        Ok(())
    }
}

#[async_trait]
impl SessionStore for MemorySessionStore {
    async fn create_session(&self, session: NewSession) -> Result<Session, StoreError> {
        let session = Session {
            id: Uuid::new_v4(),
            user_id: session.user_id,
            refresh_token: session.refresh_token,
            expires_at: session.expires_at,
            created_at: Utc::now(),
        };
        self.insert(session.clone()).await?;
        Ok(session)
    }

    async fn session_by_refresh_token(
        &self,
        refresh_token: &str,
    ) -> Result<Session, StoreError> {
        self.sessions
            .read()
            .await
            .get(refresh_token)
            .cloned()
            .ok_or(StoreError::NotFound)
    }

    async fn delete_session(&self, id: Uuid) -> Result<(), StoreError> {
        let mut sessions = self.sessions.write().await;
        let before = sessions.len();
        sessions.retain(|_, s| s.id != id);

        if sessions.len() == before {
            return Err(StoreError::NotFound);
        }
        Ok(())
    }

    async fn delete_all_sessions_for_user(&self, user_id: Uuid) -> Result<u64, StoreError> {
        let mut sessions = self.sessions.write().await;
        let before = sessions.len();
        sessions.retain(|_, s| s.user_id != user_id);
        Ok((before - sessions.len()) as u64)
    }
}
