//! Post API endpoints
//!
//! - GET /api/posts - Published posts, paginated
//! - GET /api/posts/user/{userId} - Published posts of one user
//! - GET /api/posts/{id} - One post by ID
//! - POST /api/posts - Create a post (requires auth)
//! - PUT /api/posts/{id} - Partially update a post (owner or admin)
//! - DELETE /api/posts/{id} - Soft-delete a post (owner or admin)

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
use crate::api::responses::{ApiResponse, PaginatedPostsResponse, PostResponse};
use crate::models::{PostPatch, PostStatus};
use crate::services::{CreatePostInput, Principal};

pub fn public_router() -> Router<AppState> {
    Router::new()
        .route("/posts", get(list_posts))
        .route("/posts/user/{user_id}", get(list_user_posts))
        .route("/posts/{id}", get(get_post))
}

pub fn protected_router() -> Router<AppState> {
    Router::new()
        .route("/posts", post(create_post))
        .route("/posts/{id}", axum::routing::put(update_post).delete(delete_post))
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreatePostRequest {
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub content: String,
    pub excerpt: Option<String>,
    pub image_url: Option<String>,
    pub status: Option<String>,
}

impl From<CreatePostRequest> for CreatePostInput {
    fn from(req: CreatePostRequest) -> Self {
        CreatePostInput {
            title: req.title,
            content: req.content,
            excerpt: req.excerpt,
            image_url: req.image_url,
            status: req.status,
        }
    }
}

/// Every field optional; absent fields are left unchanged
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdatePostRequest {
    pub title: Option<String>,
    pub content: Option<String>,
    pub excerpt: Option<String>,
    pub image_url: Option<String>,
    pub status: Option<String>,
}

impl From<UpdatePostRequest> for PostPatch {
    fn from(req: UpdatePostRequest) -> Self {
        PostPatch {
            title: req.title,
            content: req.content,
            excerpt: req.excerpt,
            image_url: req.image_url,
            status: req
                .status
                .map(|s| PostStatus::from_request(Some(s.as_str()))),
        }
    }
}

/// GET /api/posts
async fn list_posts(
    State(state): State<AppState>,
    Query(query): Query<PaginationQuery>,
) -> Result<impl IntoResponse, ApiError> {
    let page = state.post_service.list_published(&query.to_params()).await?;
    Ok(Json(ApiResponse::ok(PaginatedPostsResponse::from(page))))
}

/// GET /api/posts/user/{userId}
async fn list_user_posts(
    State(state): State<AppState>,
    Path(raw_user_id): Path<String>,
    Query(query): Query<PaginationQuery>,
) -> Result<impl IntoResponse, ApiError> {
    let user_id = parse_id(&raw_user_id, "Invalid user ID")?;
    let page = state
        .post_service
        .list_by_user(user_id, &query.to_params())
        .await?;
    Ok(Json(ApiResponse::ok(PaginatedPostsResponse::from(page))))
}

/// GET /api/posts/{id}
async fn get_post(
    State(state): State<AppState>,
    Path(raw_id): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    let id = parse_id(&raw_id, "Invalid post ID")?;
    let post = state.post_service.get(id).await?;
    Ok(Json(ApiResponse::ok(PostResponse::from(post))))
}

/// POST /api/posts
async fn create_post(
    State(state): State<AppState>,
    principal: Principal,
    JsonBody(body): JsonBody<CreatePostRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let post = state.post_service.create(&principal, body.into()).await?;
    Ok((
        StatusCode::CREATED,
        Json(ApiResponse::ok(PostResponse::from(post))),
    ))
}

/// PUT /api/posts/{id}
async fn update_post(
    State(state): State<AppState>,
    principal: Principal,
    Path(raw_id): Path<String>,
    JsonBody(body): JsonBody<UpdatePostRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let id = parse_id(&raw_id, "Invalid post ID")?;
    let post = state
        .post_service
        .update(&principal, id, body.into())
        .await?;
    Ok(Json(ApiResponse::ok(PostResponse::from(post))))
}

/// DELETE /api/posts/{id}
async fn delete_post(
    State(state): State<AppState>,
    principal: Principal,
    Path(raw_id): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    let id = parse_id(&raw_id, "Invalid post ID")?;
    state.post_service.delete(&principal, id).await?;
    Ok(Json(ApiResponse::message("Post deleted successfully")))
}
