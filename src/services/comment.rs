//! Comment service
//!
//! Comments hang off a live post. Listing returns one page of top-level
//! comments with their direct replies attached.

use crate::db::repositories::{CommentRepository, PostRepository, UserRepository};
use crate::models::{Comment, CommentWithMeta, ListParams, PagedResult, Post, User};
use crate::services::token::Principal;
use anyhow::Context;
use std::collections::HashMap;
use std::sync::Arc;

/// Error types for comment service operations
#[derive(Debug, thiserror::Error)]
pub enum CommentServiceError {
    /// Validation error (invalid input)
    #[error("{0}")]
    ValidationError(String),

    /// Target post does not exist or was deleted
    #[error("post not found")]
    PostNotFound,

    /// `parentId` does not name a live comment on the same post
    #[error("parent comment not found")]
    ParentNotFound,

    /// Internal error
    #[error("Internal error: {0}")]
    InternalError(#[from] anyhow::Error),
}

/// Input for creating a comment
#[derive(Debug, Clone)]
pub struct CreateCommentInput {
    pub content: String,
    pub parent_id: Option<i64>,
}

impl CreateCommentInput {
    pub fn new(content: impl Into<String>) -> Self {
        Self {
            content: content.into(),
            parent_id: None,
        }
    }

    pub fn reply_to(content: impl Into<String>, parent_id: i64) -> Self {
        Self {
            content: content.into(),
            parent_id: Some(parent_id),
        }
    }
}

/// A freshly created comment with its author and post
#[derive(Debug, Clone)]
pub struct CreatedComment {
    pub comment: Comment,
    pub author: Option<User>,
    pub post: Post,
}

/// Comment service
pub struct CommentService {
    comment_repo: Arc<dyn CommentRepository>,
    post_repo: Arc<dyn PostRepository>,
    user_repo: Arc<dyn UserRepository>,
}

impl CommentService {
    pub fn new(
        comment_repo: Arc<dyn CommentRepository>,
        post_repo: Arc<dyn PostRepository>,
        user_repo: Arc<dyn UserRepository>,
    ) -> Self {
        Self {
            comment_repo,
            post_repo,
            user_repo,
        }
    }

    /// Comment on a post as the caller
    pub async fn create(
        &self,
        principal: &Principal,
        post_id: i64,
        input: CreateCommentInput,
    ) -> Result<CreatedComment, CommentServiceError> {
        if input.content.trim().is_empty() {
            return Err(CommentServiceError::ValidationError(
                "content is required".to_string(),
            ));
        }

        let post = self
            .post_repo
            .get_by_id(post_id)
            .await
            .context("Failed to get post")?
            .ok_or(CommentServiceError::PostNotFound)?
            .post;

        if let Some(parent_id) = input.parent_id {
            let parent = self
                .comment_repo
                .get_by_id(parent_id)
                .await
                .context("Failed to get parent comment")?;
            if !parent.is_some_and(|p| p.post_id == post_id) {
                return Err(CommentServiceError::ParentNotFound);
            }
        }

        let comment = self
            .comment_repo
            .create(&Comment::new(
                post_id,
                principal.user_id,
                input.content,
                input.parent_id,
            ))
            .await
            .context("Failed to create comment")?;

        let author = self
            .user_repo
            .get_by_id(principal.user_id)
            .await
            .context("Failed to get comment author")?;

        Ok(CreatedComment {
            comment,
            author,
            post,
        })
    }

    /// One page of top-level comments, newest first, each with its replies
    /// oldest first
    pub async fn list_for_post(
        &self,
        post_id: i64,
        params: &ListParams,
    ) -> Result<PagedResult<CommentWithMeta>, CommentServiceError> {
        let mut page = self
            .comment_repo
            .list_top_level_for_post(post_id, params)
            .await
            .context("Failed to list comments")?;

        let parent_ids: Vec<i64> = page.items.iter().map(|c| c.comment.id).collect();
        let replies = self
            .comment_repo
            .replies_for(&parent_ids)
            .await
            .context("Failed to list comment replies")?;

        attach_replies(&mut page.items, replies);
        Ok(page)
    }

    /// Total number of live comments
    pub async fn count(&self) -> Result<i64, CommentServiceError> {
        Ok(self
            .comment_repo
            .count()
            .await
            .context("Failed to count comments")?)
    }
}

/// Move each reply under its parent, keeping the replies' order
fn attach_replies(parents: &mut [CommentWithMeta], replies: Vec<CommentWithMeta>) {
    let index: HashMap<i64, usize> = parents
        .iter()
        .enumerate()
        .map(|(i, c)| (c.comment.id, i))
        .collect();

    for reply in replies {
        let slot = reply.comment.parent_id.and_then(|id| index.get(&id));
        if let Some(&i) = slot {
            parents[i].replies.push(reply);
        }
    }
}
