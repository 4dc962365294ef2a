//! Shared API response types
//!
//! Every success body is wrapped in [`ApiResponse`]. Absent optional fields
//! are omitted rather than sent as `null`.

use serde::Serialize;

use crate::models::{Comment, CommentWithMeta, PagedResult, Post, PostWithAuthor, User};
use crate::services::{AuthSession, CreatedComment};

// ============================================================================
// Envelope
// ============================================================================

/// `{success, data?, message?}` success envelope
#[derive(Debug, Serialize)]
pub struct ApiResponse<T> {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<T>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

impl<T: Serialize> ApiResponse<T> {
    pub fn ok(data: T) -> Self {
        Self {
            success: true,
            data: Some(data),
            message: None,
        }
    }
}

impl ApiResponse<()> {
    pub fn message(message: impl Into<String>) -> Self {
        Self {
            success: true,
            data: None,
            message: Some(message.into()),
        }
    }
}

// ============================================================================
// Auth
// ============================================================================

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AuthResponse {
    pub access_token: String,
    pub refresh_token: String,
    pub user: User,
}

impl From<AuthSession> for AuthResponse {
    fn from(session: AuthSession) -> Self {
        Self {
            access_token: session.tokens.access_token,
            refresh_token: session.tokens.refresh_token,
            user: session.user,
        }
    }
}

// ============================================================================
// Posts
// ============================================================================

/// A post with its author's public fields under `user`
#[derive(Debug, Serialize)]
pub struct PostResponse {
    #[serde(flatten)]
    pub post: Post,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub user: Option<User>,
}

impl From<PostWithAuthor> for PostResponse {
    fn from(value: PostWithAuthor) -> Self {
        Self {
            post: value.post,
            user: value.author,
        }
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PaginatedPostsResponse {
    pub posts: Vec<PostResponse>,
    pub total: i64,
    pub page: u32,
    pub page_size: u32,
    pub total_pages: i64,
}

impl From<PagedResult<PostWithAuthor>> for PaginatedPostsResponse {
    fn from(page: PagedResult<PostWithAuthor>) -> Self {
        let total_pages = page.total_pages();
        let page = page.map(PostResponse::from);
        Self {
            posts: page.items,
            total: page.total,
            page: page.page,
            page_size: page.page_size,
            total_pages,
        }
    }
}

// ============================================================================
// Comments
// ============================================================================

#[derive(Debug, Serialize)]
pub struct CommentResponse {
    #[serde(flatten)]
    pub comment: Comment,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub user: Option<User>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub post: Option<Post>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub replies: Vec<CommentResponse>,
}

impl From<CommentWithMeta> for CommentResponse {
    fn from(value: CommentWithMeta) -> Self {
        Self {
            comment: value.comment,
            user: value.author,
            post: None,
            replies: value.replies.into_iter().map(CommentResponse::from).collect(),
        }
    }
}

impl From<CreatedComment> for CommentResponse {
    fn from(value: CreatedComment) -> Self {
        Self {
            comment: value.comment,
            user: value.author,
            post: Some(value.post),
            replies: Vec::new(),
        }
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PaginatedCommentsResponse {
    pub comments: Vec<CommentResponse>,
    pub total: i64,
    pub page: u32,
    pub page_size: u32,
    pub total_pages: i64,
}

impl From<PagedResult<CommentWithMeta>> for PaginatedCommentsResponse {
    fn from(page: PagedResult<CommentWithMeta>) -> Self {
        let total_pages = page.total_pages();
        let page = page.map(CommentResponse::from);
        Self {
            comments: page.items,
            total: page.total,
            page: page.page,
            page_size: page.page_size,
            total_pages,
        }
    }
}

// ============================================================================
// Counts
// ============================================================================

#[derive(Debug, Serialize)]
pub struct TotalResponse {
    pub total: i64,
}
