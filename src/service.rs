//! Authentication Service
//!
//! Credential verification, token pair issuance, single-use refresh rotation
//! and stateless access token validation.
//!
//! The service keeps no mutable state of its own; the user and session stores
//! are the only shared resources, so every operation may run concurrently.

use crate::config::AuthConfig;
use crate::error::AuthError;
use crate::models::*;
use crate::password::PasswordHasher;
use crate::store::{SessionStore, StoreError, UserStore};
use crate::token::TokenSigner;

use chrono::{DateTime, Duration, Utc};
use rand::Rng;
use std::sync::Arc;
use uuid::Uuid;

/// Authentication service
pub struct AuthService {
    users: Arc<dyn UserStore>,
    sessions: Arc<dyn SessionStore>,
    passwords: PasswordHasher,
    /// Verified against when the username is unknown, so every login costs one Argon2 run
    dummy_hash: String,
    signer: TokenSigner,
    config: AuthConfig,
}

impl AuthService {
    /// Create a new authentication service
    pub fn new(
        config: AuthConfig,
        users: Arc<dyn UserStore>,
        sessions: Arc<dyn SessionStore>,
    ) -> Result<Self, AuthError> {
        let passwords =
            PasswordHasher::from_config(&config).map_err(|e| AuthError::Config(e.to_string()))?;
        let dummy_hash = passwords
            .hash(&generate_refresh_token())
            .map_err(|e| AuthError::Config(e.to_string()))?;
        let signer = TokenSigner::new(&config);

        Ok(Self {
            users,
            sessions,
            passwords,
            dummy_hash,
            signer,
            config,
        })
    }

    /// Get reference to config
    pub fn config(&self) -> &AuthConfig {
        &self.config
    }

    pub fn passwords(&self) -> &PasswordHasher {
        &self.passwords
    }

    fn refresh_ttl(&self) -> Duration {
        Duration::seconds(self.config.refresh_token_expiration)
    }

    // ============================================
    // Login / Logout
    // ============================================

    /// Verify username and password and open a new session.
    ///
    /// An unknown username and a wrong password both fail with
    /// [`AuthError::InvalidCredentials`] after the same amount of hashing work.
    pub async fn login(&self, username: &str, password: &str) -> Result<TokenPair, AuthError> {
        if username.is_empty() || password.is_empty() {
            return Err(AuthError::InvalidInput(
                "username and password are required".to_string(),
            ));
        }

        let user = match self.users.user_by_username(username).await {
            Ok(user) => Some(user),
            Err(StoreError::NotFound) => {
                tracing::debug!("Login attempt for unknown username");
                None
            }
            Err(e) => {
                tracing::error!(op = "AuthService.login", error = %e, "User lookup failed");
                None
            }
        };

        let digest = user
            .as_ref()
            .map_or(self.dummy_hash.as_str(), |u| u.password_hash.as_str());
        let matched = self.passwords.verify_async(password, digest).await?;

        let user = match user {
            Some(user) if matched => user,
            Some(user) => {
                tracing::debug!(user_id = %user.id, "Login attempt with wrong password");
                return Err(AuthError::InvalidCredentials);
            }
            None => return Err(AuthError::InvalidCredentials),
        };

        let pair = self.issue_pair(&user, Utc::now()).await?;
        tracing::info!(user_id = %user.id, "User logged in");

        Ok(pair)
    }

    /// End the session a refresh token belongs to
    pub async fn logout(&self, refresh_token: &str) -> Result<(), AuthError> {
        if refresh_token.is_empty() {
            return Err(AuthError::InvalidInput(
                "refresh token is required".to_string(),
            ));
        }

        let session = self.find_session(refresh_token).await?;

        match self.sessions.delete_session(session.id).await {
            Ok(()) => {
                tracing::info!(user_id = %session.user_id, session_id = %session.id, "Session ended");
                Ok(())
            }
            Err(StoreError::NotFound) => Err(AuthError::InvalidCredentials),
            Err(e) => Err(AuthError::store("AuthService.logout", e)),
        }
    }

    // ============================================
    // Token Refresh
    // ============================================

    /// Exchange a refresh token for a new token pair (with rotation).
    ///
    /// The presented session is consumed: a second call with the same token
    /// fails with [`AuthError::InvalidCredentials`].
    pub async fn refresh_tokens(&self, refresh_token: &str) -> Result<TokenPair, AuthError> {
        if refresh_token.is_empty() {
            return Err(AuthError::InvalidInput(
                "refresh token is required".to_string(),
            ));
        }

        let now = Utc::now();
        let session = self.find_session(refresh_token).await?;

        if session.is_expired_at(now) {
            tracing::debug!(session_id = %session.id, "Refresh with expired session");
            self.discard_session(&session).await;
            return Err(AuthError::ExpiredSession);
        }

        let user = match self.users.user_by_id(session.user_id).await {
            Ok(user) => user,
            Err(StoreError::NotFound) => {
                tracing::warn!(
                    user_id = %session.user_id,
                    session_id = %session.id,
                    "Session references a missing user, removing it"
                );
                self.discard_session(&session).await;
                return Err(AuthError::UserNotFound);
            }
            Err(e) => return Err(AuthError::store("AuthService.refresh_tokens", e)),
        };

        // Whoever deletes the session owns the rotation
        match self.sessions.delete_session(session.id).await {
            Ok(()) => {}
            Err(StoreError::NotFound) => {
                tracing::warn!(
                    user_id = %user.id,
                    session_id = %session.id,
                    "Refresh token was consumed concurrently"
                );
                return Err(AuthError::InvalidCredentials);
            }
            Err(e) => return Err(AuthError::store("AuthService.refresh_tokens", e)),
        }

        let pair = self.issue_pair(&user, now).await?;
        tracing::debug!(user_id = %user.id, "Session rotated");

        Ok(pair)
    }

    // ============================================
    // Token Validation
    // ============================================

    /// Validate an access token against the current time
    pub fn validate_token(&self, access_token: &str) -> Result<TokenClaims, AuthError> {
        self.validate_token_at(access_token, Utc::now())
    }

    /// Validate an access token as seen at `now`
    pub fn validate_token_at(
        &self,
        access_token: &str,
        now: DateTime<Utc>,
    ) -> Result<TokenClaims, AuthError> {
        let claims = self.signer.verify(access_token, now)?;
        Ok(claims.into())
    }

    // ============================================
    // Session Management
    // ============================================

    /// Remove every session of a user, returning how many were removed
    pub async fn revoke_all_sessions(&self, user_id: Uuid) -> Result<u64, AuthError> {
        let removed = self
            .sessions
            .delete_all_sessions_for_user(user_id)
            .await
            .map_err(|e| AuthError::store("AuthService.revoke_all_sessions", e))?;
        if removed > 0 {
            tracing::info!(user_id = %user_id, removed, "Revoked all sessions");
        }
        Ok(removed)
    }

    async fn find_session(&self, refresh_token: &str) -> Result<Session, AuthError> {
        match self.sessions.session_by_refresh_token(refresh_token).await {
            Ok(session) => Ok(session),
            Err(StoreError::NotFound) => Err(AuthError::InvalidCredentials),
            Err(e) => Err(AuthError::store("AuthService.find_session", e)),
        }
    }

    /// Best-effort delete used for cleanup paths that already have an outcome
    async fn discard_session(&self, session: &Session) {
        match self.sessions.delete_session(session.id).await {
            Ok(()) | Err(StoreError::NotFound) => {}
            Err(e) => {
                tracing::error!(session_id = %session.id, error = %e, "Failed to remove session");
            }
        }
    }

    /// Sign an access token and persist a fresh session for `user`
    async fn issue_pair(&self, user: &User, now: DateTime<Utc>) -> Result<TokenPair, AuthError> {
        let access_token = self.signer.issue(user.id, &user.username, now)?;
        let refresh_token = generate_refresh_token();

        // A collision here is treated as a fault, not retried
        let session = self
            .sessions
            .create_session(NewSession {
                user_id: user.id,
                refresh_token: refresh_token.clone(),
                expires_at: now + self.refresh_ttl(),
            })
            .await
            .map_err(|e| AuthError::store("AuthService.issue_pair", e))?;

        tracing::debug!(user_id = %user.id, session_id = %session.id, "Session created");

        Ok(TokenPair {
            user_id: user.id,
            access_token,
            refresh_token,
        })
    }
}

/// 256 bits from the thread-local CSPRNG, hex encoded
fn generate_refresh_token() -> String {
    let bytes: [u8; 32] = rand::thread_rng().gen();
    bytes.iter().map(|b| format!("{:02x}", b)).collect()
}
