//! API middleware and shared request plumbing
//!
//! - `AppState` shared by every handler
//! - `ApiError`, rendered as the `{success: false, error}` envelope
//! - `require_auth`, which turns a bearer access token into a [`Principal`]
//! - `JsonBody` and `parse_id` for request parsing

use axum::{
    extract::{FromRequest, FromRequestParts, Request, State},
    http::{header, request::Parts, HeaderMap, StatusCode},
    middleware::Next,
    response::{IntoResponse, Response},
    Json,
};
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::fmt;
use std::sync::Arc;

use crate::config::AuthConfig;
use crate::db::repositories::{
    SqlxCommentRepository, SqlxPostRepository, SqlxRefreshTokenRepository, SqlxUserRepository,
};
use crate::db::DynDatabasePool;
use crate::services::{
    CommentService, CommentServiceError, PostService, PostServiceError, Principal, TokenService,
    UserService, UserServiceError,
};

/// Application state containing shared services
#[derive(Clone)]
pub struct AppState {
    pub tokens: Arc<TokenService>,
    pub user_service: Arc<UserService>,
    pub post_service: Arc<PostService>,
    pub comment_service: Arc<CommentService>,
}

impl AppState {
    /// Wire repositories and services over one database pool
    pub fn new(pool: DynDatabasePool, auth: &AuthConfig) -> anyhow::Result<Self> {
        let tokens = Arc::new(TokenService::new(auth)?);

        let user_repo = SqlxUserRepository::boxed(pool.clone());
        let post_repo = SqlxPostRepository::boxed(pool.clone());
        let comment_repo = SqlxCommentRepository::boxed(pool.clone());
        let refresh_token_repo = SqlxRefreshTokenRepository::boxed(pool);

        Ok(Self {
            user_service: Arc::new(UserService::new(
                user_repo.clone(),
                refresh_token_repo,
                tokens.clone(),
            )),
            post_service: Arc::new(PostService::new(post_repo.clone())),
            comment_service: Arc::new(CommentService::new(comment_repo, post_repo, user_repo)),
            tokens,
        })
    }
}

/// Error kinds, one per response status
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ApiErrorKind {
    Validation,
    Unauthorized,
    Forbidden,
    NotFound,
    Conflict,
    Internal,
}

impl ApiErrorKind {
    pub fn status(&self) -> StatusCode {
        match self {
            ApiErrorKind::Validation => StatusCode::BAD_REQUEST,
            ApiErrorKind::Unauthorized => StatusCode::UNAUTHORIZED,
            ApiErrorKind::Forbidden => StatusCode::FORBIDDEN,
            ApiErrorKind::NotFound => StatusCode::NOT_FOUND,
            ApiErrorKind::Conflict => StatusCode::CONFLICT,
            ApiErrorKind::Internal => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

/// Error response for API errors
#[derive(Debug)]
pub struct ApiError {
    pub kind: ApiErrorKind,
    pub message: String,
}

#[derive(Serialize)]
struct ErrorBody<'a> {
    success: bool,
    error: &'a str,
}

impl ApiError {
    pub fn new(kind: ApiErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }

    pub fn validation_error(message: impl Into<String>) -> Self {
        Self::new(ApiErrorKind::Validation, message)
    }

    /// 400 with the `Invalid request data: ...` prefix
    pub fn invalid_request(reason: impl fmt::Display) -> Self {
        Self::validation_error(format!("Invalid request data: {}", reason))
    }

    pub fn unauthorized(message: impl Into<String>) -> Self {
        Self::new(ApiErrorKind::Unauthorized, message)
    }

    pub fn forbidden(message: impl Into<String>) -> Self {
        Self::new(ApiErrorKind::Forbidden, message)
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        Self::new(ApiErrorKind::NotFound, message)
    }

    pub fn conflict(message: impl Into<String>) -> Self {
        Self::new(ApiErrorKind::Conflict, message)
    }

    /// 500 with a generic message. The cause is only logged.
    pub fn internal_error(cause: impl fmt::Display) -> Self {
        tracing::error!("Internal error: {}", cause);
        Self::new(ApiErrorKind::Internal, "internal server error")
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let body = ErrorBody {
            success: false,
            error: &self.message,
        };
        (self.kind.status(), Json(body)).into_response()
    }
}

impl From<UserServiceError> for ApiError {
    fn from(err: UserServiceError) -> Self {
        match err {
            UserServiceError::ValidationError(reason) => ApiError::invalid_request(reason),
            e @ UserServiceError::UserExists => ApiError::conflict(e.to_string()),
            e @ UserServiceError::InvalidCredentials => ApiError::unauthorized(e.to_string()),
            e @ UserServiceError::UserNotFound => ApiError::not_found(e.to_string()),
            UserServiceError::InternalError(e) => ApiError::internal_error(format!("{:#}", e)),
        }
    }
}

impl From<PostServiceError> for ApiError {
    fn from(err: PostServiceError) -> Self {
        match err {
            PostServiceError::ValidationError(reason) => ApiError::invalid_request(reason),
            e @ PostServiceError::NotFound => ApiError::not_found(e.to_string()),
            e @ PostServiceError::Forbidden => ApiError::forbidden(e.to_string()),
            PostServiceError::InternalError(e) => ApiError::internal_error(format!("{:#}", e)),
        }
    }
}

impl From<CommentServiceError> for ApiError {
    fn from(err: CommentServiceError) -> Self {
        match err {
            CommentServiceError::ValidationError(reason) => ApiError::invalid_request(reason),
            e @ (CommentServiceError::PostNotFound | CommentServiceError::ParentNotFound) => {
                ApiError::not_found(e.to_string())
            }
            CommentServiceError::InternalError(e) => ApiError::internal_error(format!("{:#}", e)),
        }
    }
}

/// Extract the token from an `Authorization: Bearer <token>` header
fn extract_bearer_token(headers: &HeaderMap) -> Result<&str, ApiError> {
    let value = headers
        .get(header::AUTHORIZATION)
        .ok_or_else(|| ApiError::unauthorized("Authorization header required"))?;

    let value = value
        .to_str()
        .map_err(|_| ApiError::unauthorized("Invalid authorization header format"))?;
    if value.is_empty() {
        return Err(ApiError::unauthorized("Authorization header required"));
    }

    let mut parts = value.split(' ');
    match (parts.next(), parts.next(), parts.next()) {
        (Some("Bearer"), Some(token), None) => Ok(token),
        _ => Err(ApiError::unauthorized("Invalid authorization header format")),
    }
}

/// Authentication middleware
///
/// Validates the access token and stores the caller's [`Principal`] in the
/// request extensions.
pub async fn require_auth(
    State(state): State<AppState>,
    mut request: Request,
    next: Next,
) -> Result<Response, ApiError> {
    let token = extract_bearer_token(request.headers())?;

    let claims = state.tokens.validate(token).map_err(|e| {
        tracing::debug!("Rejected access token: {}", e);
        ApiError::unauthorized("Invalid or expired token")
    })?;

    request.extensions_mut().insert(Principal::from(claims));
    Ok(next.run(request).await)
}

impl<S> FromRequestParts<S> for Principal
where
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts
            .extensions
            .get::<Principal>()
            .cloned()
            .ok_or_else(|| ApiError::unauthorized("Authorization header required"))
    }
}

/// JSON body extractor whose rejections use the API error envelope
pub struct JsonBody<T>(pub T);

impl<S, T> FromRequest<S> for JsonBody<T>
where
    T: DeserializeOwned,
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        Json::<T>::from_request(req, state)
            .await
            .map(|Json(value)| JsonBody(value))
            .map_err(|rejection| ApiError::invalid_request(rejection.body_text()))
    }
}

/// Parse a path ID as an unsigned 32-bit integer
pub fn parse_id(raw: &str, message: &str) -> Result<i64, ApiError> {
    raw.parse::<u32>()
        .map(i64::from)
        .map_err(|_| ApiError::validation_error(message))
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    fn headers_with_auth(value: &str) -> HeaderMap {
        let mut headers = HeaderMap::new();
        headers.insert(header::AUTHORIZATION, HeaderValue::from_str(value).unwrap());
        headers
    }

    #[test]
    fn test_extract_bearer_token() {
        let headers = headers_with_auth("Bearer test-token-123");
        assert_eq!(extract_bearer_token(&headers).unwrap(), "test-token-123");
    }

    #[test]
    fn test_extract_bearer_token_missing() {
        let err = extract_bearer_token(&HeaderMap::new()).unwrap_err();
        assert_eq!(err.kind, ApiErrorKind::Unauthorized);
        assert_eq!(err.message, "Authorization header required");
    }

    #[test]
    fn test_extract_bearer_token_bad_format() {
        for value in ["Basic abc", "Bearer", "bearer abc", "Bearer a b", "Token"] {
            let err = extract_bearer_token(&headers_with_auth(value)).unwrap_err();
            assert_eq!(err.message, "Invalid authorization header format", "{}", value);
        }
    }

    #[test]
    fn test_parse_id() {
        assert_eq!(parse_id("42", "Invalid post ID").unwrap(), 42);
        assert_eq!(parse_id("4294967295", "Invalid post ID").unwrap(), 4294967295);

        for raw in ["", "abc", "-1", "4294967296", "1.5"] {
            let err = parse_id(raw, "Invalid post ID").unwrap_err();
            assert_eq!(err.kind, ApiErrorKind::Validation);
            assert_eq!(err.message, "Invalid post ID");
        }
    }

    #[test]
    fn test_service_errors_map_to_statuses() {
        let cases: Vec<(ApiError, StatusCode, &str)> = vec![
            (
                UserServiceError::UserExists.into(),
                StatusCode::CONFLICT,
                "user with this email or username already exists",
            ),
            (
                UserServiceError::InvalidCredentials.into(),
                StatusCode::UNAUTHORIZED,
                "invalid email or password",
            ),
            (
                UserServiceError::ValidationError("email is required".to_string()).into(),
                StatusCode::BAD_REQUEST,
                "Invalid request data: email is required",
            ),
            (PostServiceError::Forbidden.into(), StatusCode::FORBIDDEN, "permission denied"),
            (PostServiceError::NotFound.into(), StatusCode::NOT_FOUND, "post not found"),
            (
                CommentServiceError::ParentNotFound.into(),
                StatusCode::NOT_FOUND,
                "parent comment not found",
            ),
            (
                PostServiceError::InternalError(anyhow::anyhow!("disk on fire")).into(),
                StatusCode::INTERNAL_SERVER_ERROR,
                "internal server error",
            ),
        ];

        for (err, status, message) in cases {
            assert_eq!(err.kind.status(), status);
            assert_eq!(err.message, message);
        }
    }

    #[tokio::test]
    async fn test_error_envelope() {
        let response = ApiError::forbidden("permission denied").into_response();
        assert_eq!(response.status(), StatusCode::FORBIDDEN);

        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let json: serde_json::Value = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(json, serde_json::json!({"success": false, "error": "permission denied"}));
    }
}
