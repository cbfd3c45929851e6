//! User management
//!
//! Thin layer over the credential store. Its one job beyond CRUD is keeping
//! sessions consistent with users: deleting a user or changing a password
//! removes every session the user still has.

use crate::error::AuthError;
use crate::models::{NewUser, UpdateUserRequest, User};
use crate::service::AuthService;
use crate::store::{StoreError, UserStore};

use std::sync::Arc;
use uuid::Uuid;

/// Matches the `users.username` column width
pub const MAX_USERNAME_LEN: usize = 100;

fn check_username(username: &str) -> Result<(), AuthError> {
    if username.is_empty() {
        return Err(AuthError::InvalidInput("username must not be empty".to_string()));
    }
    if username.chars().count() > MAX_USERNAME_LEN {
        return Err(AuthError::InvalidInput(format!(
            "username must be at most {} characters",
            MAX_USERNAME_LEN
        )));
    }
    Ok(())
}

pub struct UserService {
    users: Arc<dyn UserStore>,
    auth: Arc<AuthService>,
}

impl UserService {
    pub fn new(users: Arc<dyn UserStore>, auth: Arc<AuthService>) -> Self {
        Self { users, auth }
    }

    /// Register a new user
    pub async fn create_user(&self, username: &str, password: &str) -> Result<User, AuthError> {
        check_username(username)?;
        if password.is_empty() {
            return Err(AuthError::InvalidInput("password is required".to_string()));
        }

        match self.users.user_by_username(username).await {
            Ok(_) => return Err(AuthError::UserAlreadyExists),
            Err(StoreError::NotFound) => {}
            Err(e) => return Err(AuthError::store("UserService.create_user", e)),
        }

        let password_hash = self.auth.passwords().hash_async(password).await?;

        let user = match self
            .users
            .create_user(NewUser {
                username: username.to_string(),
                password_hash,
            })
            .await
        {
            Ok(user) => user,
            // Lost a race with another registration of the same name
            Err(StoreError::Conflict(_)) => return Err(AuthError::UserAlreadyExists),
            Err(e) => return Err(AuthError::store("UserService.create_user", e)),
        };

        tracing::info!(user_id = %user.id, "User created");
        Ok(user)
    }

    /// Get user by ID
    pub async fn get_user(&self, user_id: Uuid) -> Result<User, AuthError> {
        match self.users.user_by_id(user_id).await {
            Ok(user) => Ok(user),
            Err(StoreError::NotFound) => Err(AuthError::UserNotFound),
            Err(e) => Err(AuthError::store("UserService.get_user", e)),
        }
    }

    /// Change username and/or password. A password change ends all sessions.
    pub async fn update_user(
        &self,
        user_id: Uuid,
        req: UpdateUserRequest,
    ) -> Result<User, AuthError> {
        let mut user = self.get_user(user_id).await?;
        let mut changed = false;
        let mut password_changed = false;

        if let Some(username) = req.username.filter(|u| *u != user.username) {
            check_username(&username)?;
            match self.users.user_by_username(&username).await {
                Ok(_) => return Err(AuthError::UserAlreadyExists),
                Err(StoreError::NotFound) => {}
                Err(e) => return Err(AuthError::store("UserService.update_user", e)),
            }
            user.username = username;
            changed = true;
        }

        if let Some(password) = req.password.filter(|p| !p.is_empty()) {
            user.password_hash = self.auth.passwords().hash_async(&password).await?;
            changed = true;
            password_changed = true;
        }

        if !changed {
            return Ok(user);
        }

        let user = match self.users.update_user(&user).await {
            Ok(user) => user,
            Err(StoreError::NotFound) => return Err(AuthError::UserNotFound),
            Err(StoreError::Conflict(_)) => return Err(AuthError::UserAlreadyExists),
            Err(e) => return Err(AuthError::store("UserService.update_user", e)),
        };

        if password_changed {
            self.auth.revoke_all_sessions(user.id).await?;
        }

        tracing::info!(user_id = %user.id, password_changed, "User updated");
        Ok(user)
    }

    /// Delete a user and every session that still references it
    pub async fn delete_user(&self, user_id: Uuid) -> Result<(), AuthError> {
        match self.users.delete_user(user_id).await {
            Ok(()) => {}
            Err(StoreError::NotFound) => return Err(AuthError::UserNotFound),
            Err(e) => return Err(AuthError::store("UserService.delete_user", e)),
        }

        let removed = self.auth.revoke_all_sessions(user_id).await?;
        tracing::info!(user_id = %user_id, sessions_removed = removed, "User deleted");

        Ok(())
    }
}
