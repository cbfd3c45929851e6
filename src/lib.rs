//! Session Authentication Service
//!
//! Issues, validates and rotates authentication credentials:
//! - Username/password login with Argon2id password hashing
//! - Short-lived HMAC-signed JWT access tokens
//! - Long-lived opaque refresh tokens, rotated on every use
//! - Stateless access checks for downstream authorization
//! - User management with session cleanup on delete and password change
//!
//! # Configuration
//!
//! All configuration is loaded from environment variables:
//! - `JWT_SECRET` - Secret key for signing JWTs (required, min 32 chars)
//! - `JWT_PREVIOUS_SECRETS` - Retired secrets still accepted for verification (comma separated)
//! - `ACCESS_TOKEN_TTL` - Access token lifetime, e.g. `900`, `15m` (default: 15m)
//! - `REFRESH_TOKEN_TTL` - Refresh session lifetime (default: 24h)
//! - `JWT_ISSUER` - JWT issuer claim (default: "auth.service")
//! - `ARGON2_MEMORY_COST`, `ARGON2_TIME_COST`, `ARGON2_PARALLELISM` - hashing cost
//!
//! # Usage
//!
//! ```rust,ignore
//! use session_auth::{AuthConfig, AuthModule};
//!
//! let config = AuthConfig::from_env()?;
//! let module = AuthModule::with_postgres(db_pool, config).await?;
//!
//! let pair = module.auth.login("alice", "correct-pw").await?;
//! let decision = module.access.check(&pair.access_token);
//! let router = module.routes();
//! ```

pub mod access;
pub mod config;
pub mod error;
pub mod extractors;
pub mod handlers;
pub mod middleware;
pub mod models;
pub mod password;
pub mod service;
pub mod store;
pub mod token;
pub mod users;

// Re-export commonly used types
pub use access::AccessChecker;
pub use config::AuthConfig;
pub use error::AuthError;
pub use extractors::{AuthUser, ClientInfo};
pub use handlers::AppState;
pub use models::*;
pub use service::AuthService;
pub use store::{SessionStore, StoreError, UserStore};
pub use users::UserService;

use axum::Router;
use sqlx::PgPool;
use std::sync::Arc;

/// Fully wired authentication services sharing one pair of stores
#[derive(Clone)]
pub struct AuthModule {
    pub auth: Arc<AuthService>,
    pub users: Arc<UserService>,
    pub access: AccessChecker,
}

impl AuthModule {
    /// Validate the configuration and wire the services over the given stores
    pub fn new(
        config: AuthConfig,
        users: Arc<dyn UserStore>,
        sessions: Arc<dyn SessionStore>,
    ) -> Result<Self, AuthError> {
        config.validate()?;

        let auth = Arc::new(AuthService::new(config, users.clone(), sessions)?);
        let user_service = Arc::new(UserService::new(users, auth.clone()));
        let access = AccessChecker::new(auth.clone());

        Ok(Self {
            auth,
            users: user_service,
            access,
        })
    }

    /// Run migrations and wire the services over PostgreSQL
    pub async fn with_postgres(db: PgPool, config: AuthConfig) -> Result<Self, AuthError> {
        tracing::info!("Activating authentication module");

        store::postgres::run_migrations(&db)
            .await
            .map_err(|e| AuthError::store("AuthModule.with_postgres", e))?;

        let module = Self::new(
            config,
            Arc::new(store::PgUserStore::new(db.clone())),
            Arc::new(store::PgSessionStore::new(db)),
        )?;

        tracing::info!("Authentication module activated successfully");
        Ok(module)
    }

    /// Wire the services over in-process stores
    pub fn in_memory(config: AuthConfig) -> Result<Self, AuthError> {
        Self::new(
            config,
            Arc::new(store::MemoryUserStore::new()),
            Arc::new(store::MemorySessionStore::new()),
        )
    }

    /// Router with all authentication endpoints
    pub fn routes(&self) -> Router {
        handlers::create_routes(AppState {
            auth: self.auth.clone(),
            users: self.users.clone(),
            access: self.access.clone(),
        })
    }
}

// ============================================
// Module Tests
// ============================================
