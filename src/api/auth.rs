//! Authentication API endpoints
//!
//! - POST /api/auth/register - Register a new user
//! - POST /api/auth/login - Login with email and password
//! - POST /api/auth/logout - Forget a refresh token (requires auth)
//! - GET /api/auth/me - Get current user info (requires auth)

use axum::{
    extract::State,
    http::StatusCode,
    response::IntoResponse,
    routing::{get, post},
    Json, Router,
};
use serde::Deserialize;

use crate::api::middleware::{ApiError, AppState, JsonBody};
use crate::api::responses::{ApiResponse, AuthResponse};
use crate::services::{LoginInput, Principal, RegisterInput, UserServiceError};

/// Build public auth routes (no authentication required)
pub fn public_router() -> Router<AppState> {
    Router::new()
        .route("/auth/register", post(register))
        .route("/auth/login", post(login))
}

/// Build protected auth routes (authentication required)
pub fn protected_router() -> Router<AppState> {
    Router::new()
        .route("/auth/logout", post(logout))
        .route("/auth/me", get(me))
}

// ============================================================================
// Request types
// ============================================================================

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RegisterRequest {
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub username: String,
    #[serde(default)]
    pub password: String,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
}

impl From<RegisterRequest> for RegisterInput {
    fn from(req: RegisterRequest) -> Self {
        RegisterInput {
            email: req.email,
            username: req.username,
            password: req.password,
            first_name: req.first_name,
            last_name: req.last_name,
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub password: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LogoutRequest {
    #[serde(default)]
    pub refresh_token: String,
}

// ============================================================================
// Handlers
// ============================================================================

/// POST /api/auth/register
async fn register(
    State(state): State<AppState>,
    JsonBody(body): JsonBody<RegisterRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let session = state.user_service.register(body.into()).await?;

    Ok((
        StatusCode::CREATED,
        Json(ApiResponse::ok(AuthResponse::from(session))),
    ))
}

/// POST /api/auth/login
async fn login(
    State(state): State<AppState>,
    JsonBody(body): JsonBody<LoginRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let session = state
        .user_service
        .login(LoginInput::new(body.email, body.password))
        .await?;

    Ok(Json(ApiResponse::ok(AuthResponse::from(session))))
}

/// POST /api/auth/logout
///
/// Every malformed body, including an empty token, gets the same bare message.
async fn logout(
    State(state): State<AppState>,
    principal: Principal,
    body: Result<JsonBody<LogoutRequest>, ApiError>,
) -> Result<impl IntoResponse, ApiError> {
    let JsonBody(body) = body.map_err(|_| invalid_logout_request())?;

    state
        .user_service
        .logout(&principal, &body.refresh_token)
        .await
        .map_err(|e| match e {
            UserServiceError::ValidationError(_) => invalid_logout_request(),
            other => other.into(),
        })?;

    Ok(Json(ApiResponse::message("Logged out successfully")))
}

fn invalid_logout_request() -> ApiError {
    ApiError::validation_error("Invalid request data")
}

/// GET /api/auth/me
async fn me(
    State(state): State<AppState>,
    principal: Principal,
) -> Result<impl IntoResponse, ApiError> {
    let user = state.user_service.me(&principal).await?;
    Ok(Json(ApiResponse::ok(user)))
}
