//! PostgreSQL stores

use super::{SessionStore, StoreError, UserStore};
use crate::models::{NewSession, NewUser, Session, User};

use async_trait::async_trait;
use sqlx::PgPool;
use uuid::Uuid;

/// Create the users and sessions tables if they do not exist yet
pub async fn run_migrations(db: &PgPool) -> Result<(), StoreError> {
    tracing::info!("Running authentication database migrations");

    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS users (
            id UUID PRIMARY KEY DEFAULT gen_random_uuid(),
            username VARCHAR(100) NOT NULL UNIQUE,
            password_hash VARCHAR(255) NOT NULL,
            created_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
            updated_at TIMESTAMPTZ NOT NULL DEFAULT NOW()
        );
        "#,
    )
    .execute(db)
    .await?;

    // No FK cascade: sessions are removed explicitly when a user is deleted
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS sessions (
            id UUID PRIMARY KEY DEFAULT gen_random_uuid(),
            user_id UUID NOT NULL,
            refresh_token VARCHAR(255) NOT NULL UNIQUE,
            expires_at TIMESTAMPTZ NOT NULL,
            created_at TIMESTAMPTZ NOT NULL DEFAULT NOW()
        );
        "#,
    )
    .execute(db)
    .await?;

    sqlx::query("CREATE INDEX IF NOT EXISTS idx_sessions_user ON sessions(user_id);")
        .execute(db)
        .await?;

    tracing::info!("Authentication migrations completed successfully");
    Ok(())
}

#[derive(Debug, Clone)]
pub struct PgUserStore {
    db: PgPool,
}

impl PgUserStore {
    pub fn new(db: PgPool) -> Self {
        Self { db }
    }
}

#[async_trait]
impl UserStore for PgUserStore {
    async fn create_user(&self, user: NewUser) -> Result<User, StoreError> {
        let user = sqlx::query_as::<_, User>(
            r#"
            INSERT INTO users (username, password_hash)
            VALUES ($1, $2)
            RETURNING id, username, password_hash, created_at, updated_at
            "#,
        )
        .bind(&user.username)
        .bind(&user.password_hash)
        .fetch_one(&self.db)
        .await?;

        Ok(user)
    }

    async fn user_by_id(&self, id: Uuid) -> Result<User, StoreError> {
        sqlx::query_as(
            "SELECT id, username, password_hash, created_at, updated_at FROM users WHERE id = $1",
        )
        .bind(id)
        .fetch_optional(&self.db)
        .await?
        .ok_or(StoreError::NotFound)
    }

    async fn user_by_username(&self, username: &str) -> Result<User, StoreError> {
        sqlx::query_as(
            "SELECT id, username, password_hash, created_at, updated_at FROM users WHERE username = $1",
        )
        .bind(username)
        .fetch_optional(&self.db)
        .await?
        .ok_or(StoreError::NotFound)
    }

    async fn update_user(&self, user: &User) -> Result<User, StoreError> {
        sqlx::query_as(
            r#"
            UPDATE users SET
                username = $2,
                password_hash = $3,
                updated_at = NOW()
            WHERE id = $1
            RETURNING id, username, password_hash, created_at, updated_at
            "#,
        )
        .bind(user.id)
        .bind(&user.username)
        .bind(&user.password_hash)
        .fetch_optional(&self.db)
        .await?
        .ok_or(StoreError::NotFound)
    }

    async fn delete_user(&self, id: Uuid) -> Result<(), StoreError> {
        let result = sqlx::query("DELETE FROM users WHERE id = $1")
            .bind(id)
            .execute(&self.db)
            .await?;

        if result.rows_affected() == 0 {
            return Err(StoreError::NotFound);
        }
        Ok(())
    }
}

#[derive(Debug, Clone)]
pub struct PgSessionStore {
    db: PgPool,
}

impl PgSessionStore {
    pub fn new(db: PgPool) -> Self {
        Self { db }
    }
}

#[async_trait]
impl SessionStore for PgSessionStore {
    async fn create_session(&self, session: NewSession) -> Result<Session, StoreError> {
        let session = sqlx::query_as::<_, Session>(
            r#"
            INSERT INTO sessions (user_id, refresh_token, expires_at)
            VALUES ($1, $2, $3)
            RETURNING id, user_id, refresh_token, expires_at, created_at
            "#,
        )
        .bind(session.user_id)
        .bind(&session.refresh_token)
        .bind(session.expires_at)
        .fetch_one(&self.db)
        .await?;

        Ok(session)
    }

    async fn session_by_refresh_token(
        &self,
        refresh_token: &str,
    ) -> Result<Session, StoreError> {
        sqlx::query_as(
            r#"
            SELECT id, user_id, refresh_token, expires_at, created_at
            FROM sessions
            WHERE refresh_token = $1
            "#,
        )
        .bind(refresh_token)
        .fetch_optional(&self.db)
        .await?
        .ok_or(StoreError::NotFound)
    }

    async fn delete_session(&self, id: Uuid) -> Result<(), StoreError> {
        let result = sqlx::query("DELETE FROM sessions WHERE id = $1")
            .bind(id)
            .execute(&self.db)
            .await?;

        if result.rows_affected() == 0 {
            return Err(StoreError::NotFound);
        }
        Ok(())
    }

    async fn delete_all_sessions_for_user(&self, user_id: Uuid) -> Result<u64, StoreError> {
        let result = sqlx::query("DELETE FROM sessions WHERE user_id = $1")
            .bind(user_id)
            .execute(&self.db)
            .await?;

        Ok(result.rows_affected())
    }
}
