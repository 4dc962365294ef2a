//! Comment repository

use crate::config::DatabaseDriver;
use crate::db::repositories::user::{AuthorColumns, AUTHOR_COLUMNS};
use crate::db::DynDatabasePool;
use crate::models::{Comment, CommentWithMeta, ListParams, PagedResult};
use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{MySqlPool, SqlitePool};
use std::sync::Arc;

/// Comment repository trait
#[async_trait]
pub trait CommentRepository: Send + Sync {
    /// Create a new comment
    async fn create(&self, comment: &Comment) -> Result<Comment>;

    /// Get a non-deleted comment by ID
    async fn get_by_id(&self, id: i64) -> Result<Option<Comment>>;

    /// Top-level comments of a post with their authors, newest first.
    ///
    /// `total` counts top-level comments only; `replies` are left empty.
    async fn list_top_level_for_post(
        &self,
        post_id: i64,
        params: &ListParams,
    ) -> Result<PagedResult<CommentWithMeta>>;

    /// Direct replies to any of `parent_ids` with their authors, oldest first
    async fn replies_for(&self, parent_ids: &[i64]) -> Result<Vec<CommentWithMeta>>;

    /// Count all non-deleted comments
    async fn count(&self) -> Result<i64>;
}

/// SQLx-based comment repository implementation
pub struct SqlxCommentRepository {
    pool: DynDatabasePool,
}

impl SqlxCommentRepository {
    pub fn new(pool: DynDatabasePool) -> Self {
        Self { pool }
    }

    pub fn boxed(pool: DynDatabasePool) -> Arc<dyn CommentRepository> {
        Arc::new(Self::new(pool))
    }
}

const INSERT_COMMENT: &str = r#"
    INSERT INTO comments (content, post_id, user_id, parent_id, created_at, updated_at)
    VALUES (?, ?, ?, ?, ?, ?)
"#;

const SELECT_COMMENT_BY_ID: &str = r#"
    SELECT id, content, post_id, user_id, parent_id, created_at, updated_at, deleted_at
    FROM comments
    WHERE id = ? AND deleted_at IS NULL
"#;

const COUNT_COMMENTS: &str = "SELECT COUNT(*) FROM comments WHERE deleted_at IS NULL";

const COUNT_TOP_LEVEL: &str =
    "SELECT COUNT(*) FROM comments WHERE post_id = ? AND parent_id IS NULL AND deleted_at IS NULL";

fn select_with_author(filter: &str, order: &str) -> String {
    format!(
        "SELECT c.id, c.content, c.post_id, c.user_id, c.parent_id, c.created_at, c.updated_at, \
         c.deleted_at, {AUTHOR_COLUMNS} \
         FROM comments c LEFT JOIN users u ON u.id = c.user_id \
         WHERE c.deleted_at IS NULL AND {filter} \
         ORDER BY {order}"
    )
}

fn top_level_sql() -> String {
    select_with_author(
        "c.post_id = ? AND c.parent_id IS NULL",
        "c.created_at DESC, c.id DESC LIMIT ? OFFSET ?",
    )
}

fn replies_sql(parent_count: usize) -> String {
    let placeholders = vec!["?"; parent_count].join(", ");
    select_with_author(
        &format!("c.parent_id IN ({})", placeholders),
        "c.created_at ASC, c.id ASC",
    )
}

#[async_trait]
impl CommentRepository for SqlxCommentRepository {
    async fn create(&self, comment: &Comment) -> Result<Comment> {
        let id = match self.pool.driver() {
            DatabaseDriver::Sqlite => insert_comment_sqlite(self.pool.sqlite()?, comment).await?,
            DatabaseDriver::Mysql => insert_comment_mysql(self.pool.mysql()?, comment).await?,
        };

        Ok(Comment {
            id,
            ..comment.clone()
        })
    }

    async fn get_by_id(&self, id: i64) -> Result<Option<Comment>> {
        let row = match self.pool.driver() {
            DatabaseDriver::Sqlite => {
                sqlx::query_as::<_, CommentRow>(SELECT_COMMENT_BY_ID)
                    .bind(id)
                    .fetch_optional(self.pool.sqlite()?)
                    .await
            }
            DatabaseDriver::Mysql => {
                sqlx::query_as::<_, CommentRow>(SELECT_COMMENT_BY_ID)
                    .bind(id)
                    .fetch_optional(self.pool.mysql()?)
                    .await
            }
        }
        .context("Failed to get comment by ID")?;

        Ok(row.map(Comment::from))
    }

    async fn list_top_level_for_post(
        &self,
        post_id: i64,
        params: &ListParams,
    ) -> Result<PagedResult<CommentWithMeta>> {
        let (rows, total) = match self.pool.driver() {
            DatabaseDriver::Sqlite => {
                list_top_level_sqlite(self.pool.sqlite()?, post_id, params).await?
            }
            DatabaseDriver::Mysql => {
                list_top_level_mysql(self.pool.mysql()?, post_id, params).await?
            }
        };

        let items = rows
            .into_iter()
            .map(CommentWithMeta::try_from)
            .collect::<Result<Vec<_>>>()?;

        Ok(PagedResult::new(items, total, params))
    }

    async fn replies_for(&self, parent_ids: &[i64]) -> Result<Vec<CommentWithMeta>> {
        if parent_ids.is_empty() {
            return Ok(Vec::new());
        }

        let sql = replies_sql(parent_ids.len());
        let rows = match self.pool.driver() {
            DatabaseDriver::Sqlite => {
                let mut query = sqlx::query_as::<_, CommentWithAuthorRow>(&sql);
                for id in parent_ids {
                    query = query.bind(*id);
                }
                query.fetch_all(self.pool.sqlite()?).await
            }
            DatabaseDriver::Mysql => {
                let mut query = sqlx::query_as::<_, CommentWithAuthorRow>(&sql);
                for id in parent_ids {
                    query = query.bind(*id);
                }
                query.fetch_all(self.pool.mysql()?).await
            }
        }
        .context("Failed to load comment replies")?;

        rows.into_iter().map(CommentWithMeta::try_from).collect()
    }

    async fn count(&self) -> Result<i64> {
        match self.pool.driver() {
            DatabaseDriver::Sqlite => {
                sqlx::query_scalar::<_, i64>(COUNT_COMMENTS)
                    .fetch_one(self.pool.sqlite()?)
                    .await
            }
            DatabaseDriver::Mysql => {
                sqlx::query_scalar::<_, i64>(COUNT_COMMENTS)
                    .fetch_one(self.pool.mysql()?)
                    .await
            }
        }
        .context("Failed to count comments")
    }
}

// ============================================================================
// Driver-specific queries
// ============================================================================

async fn insert_comment_sqlite(pool: &SqlitePool, comment: &Comment) -> Result<i64> {
    let result = sqlx::query(INSERT_COMMENT)
        .bind(&comment.content)
        .bind(comment.post_id)
        .bind(comment.user_id)
        .bind(comment.parent_id)
        .bind(comment.created_at)
        .bind(comment.updated_at)
        .execute(pool)
        .await
        .context("Failed to create comment")?;

    Ok(result.last_insert_rowid())
}

async fn insert_comment_mysql(pool: &MySqlPool, comment: &Comment) -> Result<i64> {
    let result = sqlx::query(INSERT_COMMENT)
        .bind(&comment.content)
        .bind(comment.post_id)
        .bind(comment.user_id)
        .bind(comment.parent_id)
        .bind(comment.created_at)
        .bind(comment.updated_at)
        .execute(pool)
        .await
        .context("Failed to create comment")?;

    Ok(result.last_insert_id() as i64)
}

async fn list_top_level_sqlite(
    pool: &SqlitePool,
    post_id: i64,
    params: &ListParams,
) -> Result<(Vec<CommentWithAuthorRow>, i64)> {
    let rows = sqlx::query_as::<_, CommentWithAuthorRow>(&top_level_sql())
        .bind(post_id)
        .bind(params.limit())
        .bind(params.offset())
        .fetch_all(pool)
        .await
        .context("Failed to list comments")?;

    let total = sqlx::query_scalar::<_, i64>(COUNT_TOP_LEVEL)
        .bind(post_id)
        .fetch_one(pool)
        .await
        .context("Failed to count comments for post")?;

    Ok((rows, total))
}

async fn list_top_level_mysql(
    pool: &MySqlPool,
    post_id: i64,
    params: &ListParams,
) -> Result<(Vec<CommentWithAuthorRow>, i64)> {
    let rows = sqlx::query_as::<_, CommentWithAuthorRow>(&top_level_sql())
        .bind(post_id)
        .bind(params.limit())
        .bind(params.offset())
        .fetch_all(pool)
        .await
        .context("Failed to list comments")?;

    let total = sqlx::query_scalar::<_, i64>(COUNT_TOP_LEVEL)
        .bind(post_id)
        .fetch_one(pool)
        .await
        .context("Failed to count comments for post")?;

    Ok((rows, total))
}

#[derive(sqlx::FromRow)]
struct CommentRow {
    id: i64,
    content: String,
    post_id: i64,
    user_id: i64,
    parent_id: Option<i64>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
    deleted_at: Option<DateTime<Utc>>,
}

impl From<CommentRow> for Comment {
    fn from(row: CommentRow) -> Self {
        Comment {
            id: row.id,
            content: row.content,
            post_id: row.post_id,
            user_id: row.user_id,
            parent_id: row.parent_id,
            created_at: row.created_at,
            updated_at: row.updated_at,
            deleted_at: row.deleted_at,
        }
    }
}

#[derive(sqlx::FromRow)]
struct CommentWithAuthorRow {
    #[sqlx(flatten)]
    comment: CommentRow,
    #[sqlx(flatten)]
    author: AuthorColumns,
}

impl TryFrom<CommentWithAuthorRow> for CommentWithMeta {
    type Error = anyhow::Error;

    fn try_from(row: CommentWithAuthorRow) -> Result<Self> {
        let comment = Comment::from(row.comment);
        let author = row.author.into_user(comment.user_id)?;
        Ok(CommentWithMeta::new(comment, author))
    }
}
