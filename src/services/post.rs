//! Post service
//!
//! Post CRUD with ownership checks on update and delete. Deleting is a soft
//! delete; listings only show published posts.

use crate::db::repositories::PostRepository;
use crate::models::{ListParams, PagedResult, Post, PostPatch, PostStatus, PostWithAuthor};
use crate::services::permission::can_modify;
use crate::services::token::Principal;
use anyhow::Context;
use std::sync::Arc;

/// Error types for post service operations
#[derive(Debug, thiserror::Error)]
pub enum PostServiceError {
    /// Validation error (invalid input)
    #[error("{0}")]
    ValidationError(String),

    /// Post not found
    #[error("post not found")]
    NotFound,

    /// Caller neither owns the post nor is an admin
    #[error("permission denied")]
    Forbidden,

    /// Internal error
    #[error("Internal error: {0}")]
    InternalError(#[from] anyhow::Error),
}

/// Input for creating a post
#[derive(Debug, Clone, Default)]
pub struct CreatePostInput {
    pub title: String,
    pub content: String,
    pub excerpt: Option<String>,
    pub image_url: Option<String>,
    /// Raw status; only `"draft"` creates a draft
    pub status: Option<String>,
}

impl CreatePostInput {
    pub fn new(title: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            content: content.into(),
            ..Default::default()
        }
    }
}

/// Post service
pub struct PostService {
    repo: Arc<dyn PostRepository>,
}

impl PostService {
    pub fn new(repo: Arc<dyn PostRepository>) -> Self {
        Self { repo }
    }

    /// Create a post owned by the caller
    pub async fn create(
        &self,
        principal: &Principal,
        input: CreatePostInput,
    ) -> Result<PostWithAuthor, PostServiceError> {
        if input.title.trim().is_empty() {
            return Err(PostServiceError::ValidationError(
                "title is required".to_string(),
            ));
        }
        if input.content.trim().is_empty() {
            return Err(PostServiceError::ValidationError(
                "content is required".to_string(),
            ));
        }

        let mut post = Post::new(
            principal.user_id,
            input.title,
            input.content,
            PostStatus::from_request(input.status.as_deref()),
        );
        post.excerpt = input.excerpt;
        post.image_url = input.image_url;

        let created = self
            .repo
            .create(&post)
            .await
            .context("Failed to create post")?;

        self.reload(created.id).await
    }

    /// Get a post by ID, whatever its status
    pub async fn get(&self, id: i64) -> Result<PostWithAuthor, PostServiceError> {
        self.repo
            .get_by_id(id)
            .await
            .context("Failed to get post")?
            .ok_or(PostServiceError::NotFound)
    }

    /// Published posts, newest first
    pub async fn list_published(
        &self,
        params: &ListParams,
    ) -> Result<PagedResult<PostWithAuthor>, PostServiceError> {
        Ok(self
            .repo
            .list_published(None, params)
            .await
            .context("Failed to list posts")?)
    }

    /// Published posts of one user, newest first
    pub async fn list_by_user(
        &self,
        user_id: i64,
        params: &ListParams,
    ) -> Result<PagedResult<PostWithAuthor>, PostServiceError> {
        Ok(self
            .repo
            .list_published(Some(user_id), params)
            .await
            .context("Failed to list user posts")?)
    }

    /// Apply a partial update. The caller must own the post or be an admin.
    pub async fn update(
        &self,
        principal: &Principal,
        id: i64,
        patch: PostPatch,
    ) -> Result<PostWithAuthor, PostServiceError> {
        let PostWithAuthor { mut post, author } = self.get(id).await?;
        self.authorize(principal, &post)?;

        if !patch.has_changes() {
            return Ok(PostWithAuthor { post, author });
        }

        patch.apply(&mut post);
        if !self
            .repo
            .update(&post)
            .await
            .context("Failed to update post")?
        {
            return Err(PostServiceError::NotFound);
        }

        self.reload(id).await
    }

    /// Soft-delete a post. The caller must own the post or be an admin.
    pub async fn delete(&self, principal: &Principal, id: i64) -> Result<(), PostServiceError> {
        let PostWithAuthor { post, .. } = self.get(id).await?;
        self.authorize(principal, &post)?;

        if !self
            .repo
            .soft_delete(id)
            .await
            .context("Failed to delete post")?
        {
            return Err(PostServiceError::NotFound);
        }

        tracing::debug!("Post {} deleted by user {}", id, principal.user_id);
        Ok(())
    }

    fn authorize(&self, principal: &Principal, post: &Post) -> Result<(), PostServiceError> {
        if can_modify(post.user_id, principal.user_id, principal.role) {
            Ok(())
        } else {
            Err(PostServiceError::Forbidden)
        }
    }

    async fn reload(&self, id: i64) -> Result<PostWithAuthor, PostServiceError> {
        self.repo
            .get_by_id(id)
            .await
            .context("Failed to reload post")?
            .ok_or_else(|| PostServiceError::InternalError(anyhow::anyhow!("Post {} vanished after write", id)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::repositories::{SqlxPostRepository, SqlxUserRepository, UserRepository};
    use crate::db::{create_test_pool, migrations, DynDatabasePool};
    use crate::models::{User, UserRole};

    async fn setup_test_service() -> (DynDatabasePool, PostService) {
        let pool = create_test_pool().await.expect("Failed to create test pool");
        migrations::run_migrations(&pool, None)
            .await
            .expect("Failed to run migrations");

        let service = PostService::new(SqlxPostRepository::boxed(pool.clone()));
        (pool, service)
    }

    async fn create_principal(pool: &DynDatabasePool, username: &str, role: UserRole) -> Principal {
        let user = SqlxUserRepository::new(pool.clone())
            .create(&User::new(
                format!("{}@example.com", username),
                username.to_string(),
                "hashed_password".to_string(),
                role,
            ))
            .await
            .expect("Failed to create user");

        Principal {
            user_id: user.id,
            email: user.email,
            role: user.role,
        }
    }

    fn params() -> ListParams {
        ListParams {
            page: 1,
            page_size: 10,
        }
    }

    #[tokio::test]
    async fn test_create_defaults_to_published_with_author() {
        let (pool, service) = setup_test_service().await;
        let alice = create_principal(&pool, "alice", UserRole::User).await;

        let created = service
            .create(&alice, CreatePostInput::new("Hanoi", "Street food"))
            .await
            .expect("Failed to create post");

        assert_eq!(created.post.status, PostStatus::Published);
        assert_eq!(created.post.user_id, alice.user_id);
        assert_eq!(created.author.map(|u| u.username), Some("alice".to_string()));
    }

    #[tokio::test]
    async fn test_create_draft_and_unknown_status() {
        let (pool, service) = setup_test_service().await;
        let alice = create_principal(&pool, "alice", UserRole::User).await;

        let mut draft = CreatePostInput::new("Draft", "Body");
        draft.status = Some("draft".to_string());
        let draft = service.create(&alice, draft).await.unwrap();
        assert_eq!(draft.post.status, PostStatus::Draft);

        let mut odd = CreatePostInput::new("Odd", "Body");
        odd.status = Some("archived".to_string());
        let odd = service.create(&alice, odd).await.unwrap();
        assert_eq!(odd.post.status, PostStatus::Published);
    }

    #[tokio::test]
    async fn test_create_requires_title_and_content() {
        let (pool, service) = setup_test_service().await;
        let alice = create_principal(&pool, "alice", UserRole::User).await;

        for input in [CreatePostInput::new("", "Body"), CreatePostInput::new("Title", " ")] {
            assert!(matches!(
                service.create(&alice, input).await,
                Err(PostServiceError::ValidationError(_))
            ));
        }
    }

    #[tokio::test]
    async fn test_get_missing_post() {
        let (_pool, service) = setup_test_service().await;
        assert!(matches!(service.get(42).await, Err(PostServiceError::NotFound)));
    }

    #[tokio::test]
    async fn test_drafts_hidden_from_listings_but_readable_by_id() {
        let (pool, service) = setup_test_service().await;
        let alice = create_principal(&pool, "alice", UserRole::User).await;

        let mut draft = CreatePostInput::new("Draft", "Body");
        draft.status = Some("draft".to_string());
        let draft = service.create(&alice, draft).await.unwrap();
        service
            .create(&alice, CreatePostInput::new("Public", "Body"))
            .await
            .unwrap();

        let all = service.list_published(&params()).await.unwrap();
        assert_eq!(all.total, 1);
        let mine = service.list_by_user(alice.user_id, &params()).await.unwrap();
        assert_eq!(mine.total, 1);
        assert_eq!(mine.items[0].post.title, "Public");

        assert!(service.get(draft.post.id).await.is_ok());
    }

    #[tokio::test]
    async fn test_owner_updates_only_present_fields() {
        let (pool, service) = setup_test_service().await;
        let alice = create_principal(&pool, "alice", UserRole::User).await;

        let mut input = CreatePostInput::new("Old", "Body");
        input.excerpt = Some("Teaser".to_string());
        let post = service.create(&alice, input).await.unwrap();

        let updated = service
            .update(
                &alice,
                post.post.id,
                PostPatch {
                    title: Some("New".to_string()),
                    status: Some(PostStatus::from_request(Some("draft"))),
                    ..Default::default()
                },
            )
            .await
            .expect("Failed to update");

        assert_eq!(updated.post.title, "New");
        assert_eq!(updated.post.status, PostStatus::Draft);
        assert_eq!(updated.post.content, "Body");
        assert_eq!(updated.post.excerpt.as_deref(), Some("Teaser"));
        assert!(updated.author.is_some());
    }

    #[tokio::test]
    async fn test_stranger_cannot_update_or_delete() {
        let (pool, service) = setup_test_service().await;
        let alice = create_principal(&pool, "alice", UserRole::User).await;
        let mallory = create_principal(&pool, "mallory", UserRole::User).await;

        let post = service
            .create(&alice, CreatePostInput::new("Mine", "Body"))
            .await
            .unwrap();

        let update = service
            .update(
                &mallory,
                post.post.id,
                PostPatch {
                    title: Some("Hijacked".to_string()),
                    ..Default::default()
                },
            )
            .await;
        assert!(matches!(update, Err(PostServiceError::Forbidden)));

        let delete = service.delete(&mallory, post.post.id).await;
        assert!(matches!(delete, Err(PostServiceError::Forbidden)));

        let unchanged = service.get(post.post.id).await.unwrap();
        assert_eq!(unchanged.post.title, "Mine");
    }

    #[tokio::test]
    async fn test_admin_can_update_and_delete_any_post() {
        let (pool, service) = setup_test_service().await;
        let alice = create_principal(&pool, "alice", UserRole::User).await;
        let admin = create_principal(&pool, "root", UserRole::Admin).await;

        let post = service
            .create(&alice, CreatePostInput::new("Mine", "Body"))
            .await
            .unwrap();

        let updated = service
            .update(
                &admin,
                post.post.id,
                PostPatch {
                    content: Some("Moderated".to_string()),
                    ..Default::default()
                },
            )
            .await
            .unwrap();
        assert_eq!(updated.post.content, "Moderated");
        assert_eq!(updated.post.user_id, alice.user_id);

        service.delete(&admin, post.post.id).await.unwrap();
        assert!(matches!(
            service.get(post.post.id).await,
            Err(PostServiceError::NotFound)
        ));
    }

    #[tokio::test]
    async fn test_delete_twice_is_not_found() {
        let (pool, service) = setup_test_service().await;
        let alice = create_principal(&pool, "alice", UserRole::User).await;
        let post = service
            .create(&alice, CreatePostInput::new("Mine", "Body"))
            .await
            .unwrap();

        service.delete(&alice, post.post.id).await.unwrap();
        assert!(matches!(
            service.delete(&alice, post.post.id).await,
            Err(PostServiceError::NotFound)
        ));
        assert_eq!(service.list_published(&params()).await.unwrap().total, 0);
    }
}
