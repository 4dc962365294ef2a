//! Comment API endpoints
//!
//! - GET /api/comments/count - Number of live comments
//! - GET /api/comments/post/{postId} - Threaded comments of a post
//! - POST /api/comments/post/{postId} - Comment or reply (requires auth)

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
    routing::{get, post},
    Json, Router,
};
use serde::Deserialize;

use crate::api::common::PaginationQuery;
use crate::api::middleware::{parse_id, ApiError, AppState, JsonBody};
use crate::api::responses::{
    ApiResponse, CommentResponse, PaginatedCommentsResponse, TotalResponse,
};
use crate::services::{CreateCommentInput, Principal};

pub fn public_router() -> Router<AppState> {
    Router::new()
        .route("/comments/count", get(count_comments))
        .route("/comments/post/{post_id}", get(list_comments))
}

pub fn protected_router() -> Router<AppState> {
    Router::new().route("/comments/post/{post_id}", post(create_comment))
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateCommentRequest {
    #[serde(default)]
    pub content: String,
    pub parent_id: Option<i64>,
}

/// GET /api/comments/count
async fn count_comments(State(state): State<AppState>) -> Result<impl IntoResponse, ApiError> {
    let total = state.comment_service.count().await?;
    Ok(Json(ApiResponse::ok(TotalResponse { total })))
}

/// GET /api/comments/post/{postId}
async fn list_comments(
    State(state): State<AppState>,
    Path(raw_post_id): Path<String>,
    Query(query): Query<PaginationQuery>,
) -> Result<impl IntoResponse, ApiError> {
    let post_id = parse_id(&raw_post_id, "Invalid post ID")?;
    let page = state
        .comment_service
        .list_for_post(post_id, &query.to_params())
        .await?;
    Ok(Json(ApiResponse::ok(PaginatedCommentsResponse::from(page))))
}

/// POST /api/comments/post/{postId}
async fn create_comment(
    State(state): State<AppState>,
    principal: Principal,
    Path(raw_post_id): Path<String>,
    JsonBody(body): JsonBody<CreateCommentRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let post_id = parse_id(&raw_post_id, "Invalid post ID")?;
    let input = CreateCommentInput {
        content: body.content,
        parent_id: body.parent_id,
    };

    let created = state
        .comment_service
        .create(&principal, post_id, input)
        .await?;
    Ok((
        StatusCode::CREATED,
        Json(ApiResponse::ok(CommentResponse::from(created))),
    ))
}
