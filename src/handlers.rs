//! Authentication HTTP Handlers
//!
//! REST endpoints for login, refresh, logout, access checks and user
//! management. Handlers validate the request body, call into the services and
//! let [`AuthError`] pick the status code.

use crate::access::AccessChecker;
use crate::error::AuthError;
use crate::extractors::{AuthUser, ClientInfo};
use crate::middleware;
use crate::models::*;
use crate::service::AuthService;
use crate::users::UserService;

use axum::{
    extract::{Path, State},
    http::StatusCode,
    middleware as axum_middleware,
    response::IntoResponse,
    routing::{get, post},
    Json, Router,
};
use std::sync::Arc;
use tower_http::trace::TraceLayer;
use uuid::Uuid;
use validator::Validate;

/// Shared service state
#[derive(Clone)]
pub struct AppState {
    pub auth: Arc<AuthService>,
    pub users: Arc<UserService>,
    pub access: AccessChecker,
}

impl AppState {
    pub fn new(auth: Arc<AuthService>, users: Arc<UserService>) -> Self {
        let access = AccessChecker::new(auth.clone());
        Self {
            auth,
            users,
            access,
        }
    }
}

fn validate<T: Validate>(req: &T) -> Result<(), AuthError> {
    req.validate()
        .map_err(|e| AuthError::InvalidInput(e.to_string()))
}

// ============================================
// Route Builder
// ============================================

/// Create authentication routes
pub fn create_routes(state: AppState) -> Router {
    // Public routes (no authentication required)
    let public = Router::new()
        .route("/auth/login", post(login))
        .route("/auth/refresh", post(refresh_token))
        .route("/auth/logout", post(logout))
        .route("/access/check", post(check_access))
        .route("/users", post(create_user));

    // Protected routes (require authentication)
    let protected = Router::new()
        .route(
            "/users/:id",
            get(get_user).put(update_user).delete(delete_user),
        )
        .route_layer(axum_middleware::from_fn_with_state(
            state.clone(),
            middleware::require_auth,
        ));

    Router::new()
        .merge(public)
        .merge(protected)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

// ============================================
// Login / Logout
// ============================================

/// POST /auth/login
///
/// Authenticate user and return access/refresh tokens
pub async fn login(
    State(state): State<AppState>,
    client: ClientInfo,
    Json(req): Json<LoginRequest>,
) -> Result<impl IntoResponse, AuthError> {
    validate(&req)?;

    let pair = state
        .auth
        .login(&req.username, &req.password)
        .await
        .inspect_err(|e| {
            tracing::debug!(ip = ?client.ip, user_agent = ?client.user_agent, "Login failed: {}", e)
        })?;

    Ok(Json(pair))
}

/// POST /auth/logout
///
/// End the session behind a refresh token
pub async fn logout(
    State(state): State<AppState>,
    Json(req): Json<RefreshTokenRequest>,
) -> Result<impl IntoResponse, AuthError> {
    validate(&req)?;

    state.auth.logout(&req.refresh_token).await?;

    Ok(Json(MessageResponse::new("Logged out successfully")))
}

// ============================================
// Token Refresh
// ============================================

/// POST /auth/refresh
///
/// Exchange a refresh token for a new token pair
pub async fn refresh_token(
    State(state): State<AppState>,
    client: ClientInfo,
    Json(req): Json<RefreshTokenRequest>,
) -> Result<impl IntoResponse, AuthError> {
    validate(&req)?;

    let pair = state
        .auth
        .refresh_tokens(&req.refresh_token)
        .await
        .inspect_err(|e| {
            tracing::debug!(ip = ?client.ip, user_agent = ?client.user_agent, "Refresh failed: {}", e)
        })?;

    Ok(Json(pair))
}

// ============================================
// Access Check
// ============================================

/// POST /access/check
///
/// Report whether an access token is valid and whom it identifies
pub async fn check_access(
    State(state): State<AppState>,
    Json(req): Json<CheckAccessRequest>,
) -> Result<impl IntoResponse, AuthError> {
    validate(&req)?;

    Ok(Json(state.access.check(&req.access_token)))
}

// ============================================
// Users
// ============================================

/// POST /users
pub async fn create_user(
    State(state): State<AppState>,
    Json(req): Json<CreateUserRequest>,
) -> Result<impl IntoResponse, AuthError> {
    validate(&req)?;

    let user = state.users.create_user(&req.username, &req.password).await?;

    Ok((StatusCode::CREATED, Json(UserResponse::from(user))))
}

/// GET /users/:id
pub async fn get_user(
    State(state): State<AppState>,
    _caller: AuthUser,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, AuthError> {
    let user = state.users.get_user(id).await?;

    Ok(Json(UserResponse::from(user)))
}

/// PUT /users/:id
pub async fn update_user(
    State(state): State<AppState>,
    caller: AuthUser,
    Path(id): Path<Uuid>,
    Json(req): Json<UpdateUserRequest>,
) -> Result<impl IntoResponse, AuthError> {
    caller.ensure_is(id)?;
    validate(&req)?;

    let user = state.users.update_user(id, req).await?;

    Ok(Json(UserResponse::from(user)))
}

/// DELETE /users/:id
pub async fn delete_user(
    State(state): State<AppState>,
    caller: AuthUser,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, AuthError> {
    caller.ensure_is(id)?;

    state.users.delete_user(id).await?;

    Ok(StatusCode::NO_CONTENT)
}
