//! Account REST API Routes
//!
//! Registration, login, and token refresh. These are the only JSON routes
//! that accept anonymous requests.

use std::sync::Arc;

use axum::{extract::State, http::StatusCode, response::IntoResponse, routing::post, Json, Router};
use serde::{Deserialize, Serialize};
use stockroom_core::{RegisterFields, StorageError, User, UserId};
use stockroom_storage::UserStore;

use crate::{
    auth::{issue_token_pair, refresh_access_token, AuthConfig, TokenPair},
    error::{ApiError, ApiResult},
    extractors::ApiJson,
    passwords::{hash_password_async, verify_password_async},
    state::AppState,
};

// ============================================================================
// TYPES
// ============================================================================

/// Public view of a newly registered account.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
pub struct RegisteredUser {
    pub id: UserId,
    pub username: String,
    pub email: String,
    pub first_name: String,
    pub last_name: String,
}

impl From<User> for RegisteredUser {
    fn from(user: User) -> Self {
        Self {
            id: user.id,
            username: user.username,
            email: user.email,
            first_name: user.first_name,
            last_name: user.last_name,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
pub struct LoginRequest {
    pub username: String,
    pub password: String,
}

#[derive(Debug, Clone, Deserialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
pub struct RefreshRequest {
    pub refresh: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
pub struct AccessToken {
    pub access: String,
}

// ============================================================================
// ACCOUNT HELPERS (shared with the web routes)
// ============================================================================

/// Validate, hash, and store a new account.
///
/// A taken username is reported as a validation failure on `username`,
/// like any other bad registration field.
pub(crate) async fn register_user(
    users: &dyn UserStore,
    fields: RegisterFields,
) -> ApiResult<User> {
    fields.validate()?;
    let password_hash = hash_password_async(fields.password.clone()).await?;

    match users.insert(fields.into_new_user(password_hash)).await {
        Ok(user) => {
            tracing::info!(user_id = %user.id, username = %user.username, "New user registered");
            Ok(user)
        }
        Err(StorageError::Conflict { .. }) => Err(ApiError::validation_failed(
            "A user with that username already exists.",
        )
        .with_details(serde_json::json!({ "field": "username" }))),
        Err(e) => Err(e.into()),
    }
}

/// Look a user up and check the password.
///
/// Unknown usernames and wrong passwords fail identically.
pub(crate) async fn check_credentials(
    users: &dyn UserStore,
    username: &str,
    password: &str,
) -> ApiResult<User> {
    let Some(user) = users.find_by_username(username.trim()).await? else {
        tracing::info!(username = %username, "Login failed: unknown user");
        return Err(ApiError::invalid_credentials());
    };

    if !verify_password_async(password.to_string(), user.password_hash.clone()).await? {
        tracing::info!(user_id = %user.id, "Login failed: wrong password");
        return Err(ApiError::invalid_credentials());
    }

    Ok(user)
}

// ============================================================================
// ROUTE HANDLERS
// ============================================================================

/// POST /api/register/ - Create an account
#[utoipa::path(
    post,
    path = "/api/register/",
    tag = "Auth",
    request_body = RegisterFields,
    responses(
        (status = 201, description = "Account created", body = RegisteredUser),
        (status = 400, description = "Invalid registration fields", body = ApiError),
    ),
)]
pub async fn register(
    State(users): State<Arc<dyn UserStore>>,
    ApiJson(fields): ApiJson<RegisterFields>,
) -> ApiResult<impl IntoResponse> {
    let user = register_user(users.as_ref(), fields).await?;
    Ok((StatusCode::CREATED, Json(RegisteredUser::from(user))))
}

/// POST /api/login/ - Exchange credentials for tokens
#[utoipa::path(
    post,
    path = "/api/login/",
    tag = "Auth",
    request_body = LoginRequest,
    responses(
        (status = 200, description = "Access and refresh tokens", body = TokenPair),
        (status = 401, description = "Invalid credentials", body = ApiError),
    ),
)]
pub async fn login(
    State(users): State<Arc<dyn UserStore>>,
    State(auth_config): State<Arc<AuthConfig>>,
    ApiJson(request): ApiJson<LoginRequest>,
) -> ApiResult<Json<TokenPair>> {
    let user = check_credentials(users.as_ref(), &request.username, &request.password).await?;
    tracing::info!(user_id = %user.id, "User logged in via API");
    Ok(Json(issue_token_pair(&auth_config, &user)?))
}

/// POST /api/token/refresh/ - Exchange a refresh token for an access token
#[utoipa::path(
    post,
    path = "/api/token/refresh/",
    tag = "Auth",
    request_body = RefreshRequest,
    responses(
        (status = 200, description = "New access token", body = AccessToken),
        (status = 401, description = "Invalid or expired refresh token", body = ApiError),
    ),
)]
pub async fn refresh(
    State(auth_config): State<Arc<AuthConfig>>,
    ApiJson(request): ApiJson<RefreshRequest>,
) -> ApiResult<Json<AccessToken>> {
    let access = refresh_access_token(&auth_config, &request.refresh)?;
    Ok(Json(AccessToken { access }))
}

// ============================================================================
// ROUTER SETUP
// ============================================================================

pub fn create_router() -> Router<AppState> {
    Router::new()
        .route("/api/register/", post(register))
        .route("/api/login/", post(login))
        .route("/api/token/refresh/", post(refresh))
}
